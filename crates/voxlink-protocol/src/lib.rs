//! Wire types for the voxlink speech-synthesis control bridge
//!
//! This crate holds the value objects and command/reply shapes that cross
//! the channel between the sandboxed client side and the privileged owner
//! side. It carries no behavior beyond construction helpers; both ends of
//! the bridge depend on it so neither depends on the other.

pub mod types;
pub mod wire;

pub use types::{Utterance, Voice};
pub use wire::{RequestId, SynthesisCommand, SynthesisReply};
