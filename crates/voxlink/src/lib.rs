//! Client-side speech-synthesis control bridge
//!
//! This crate implements the sandboxed-process half of a cross-process
//! speech-synthesis protocol: a [`SynthesisProxy`] forwards playback
//! commands (speak/pause/resume/cancel) over a [`CommandChannel`] to a
//! privileged owner process and relays the owner's asynchronous
//! lifecycle notifications to a local [`SynthesisObserver`]. Completions
//! that arrive after the proxy is torn down are dropped, never
//! dispatched into freed state.
//!
//! The transport itself is a seam: implement [`CommandChannel`] over
//! your IPC layer. An in-process implementation for tests lives in the
//! `voxlink-loopback` crate.

pub mod channel;
pub mod clock;
pub mod error;
pub mod observer;
pub mod pending;
pub mod proxy;
pub mod registry;
pub mod state;
pub mod voices;

pub use channel::{ChannelError, CommandChannel, ReplyHandler};
pub use clock::{real_clock, Clock, RealClock, SharedClock, TestClock};
pub use error::{ProxyError, ProxyResult};
pub use observer::SynthesisObserver;
pub use pending::{ExpiredOperation, OperationKind, PendingSet};
pub use proxy::{ProxyConfig, SynthesisProxy};
pub use registry::{ContextId, InMemoryOperationRegistry, OperationRegistry};
pub use state::SynthesisState;
pub use voices::VoiceDirectory;

pub use voxlink_protocol::{RequestId, SynthesisCommand, SynthesisReply, Utterance, Voice};
