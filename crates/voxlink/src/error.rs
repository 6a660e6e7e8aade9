//! Error types for the bridge

use std::time::Duration;

use thiserror::Error;

use crate::channel::ChannelError;
use crate::pending::OperationKind;
use crate::state::SynthesisState;

/// Bridge-level error taxonomy.
///
/// The source protocol swallowed every failure silently; these variants
/// make the failure modes explicit so callers and observers can react
/// instead of perceiving a stuck "speaking" state.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Transport failure surfaced at send time
    #[error("channel failure: {0}")]
    Channel(#[from] ChannelError),

    /// No reply arrived within the configured bound
    #[error("no reply for {kind:?} within {waited:?}")]
    ReplyTimeout {
        kind: OperationKind,
        waited: Duration,
    },

    /// The utterance names a voice absent from the last fetched
    /// directory snapshot
    #[error("voice {uri:?} is not in the current voice directory")]
    UnknownVoice { uri: String },

    /// `speak` was invoked while an utterance is already current
    #[error("cannot speak while {state:?}")]
    NotIdle { state: SynthesisState },

    /// An operation of this kind is already awaiting its reply
    #[error("a {kind:?} operation is already in flight")]
    InFlight { kind: OperationKind },
}

/// Result type for bridge operations.
pub type ProxyResult<T> = Result<T, ProxyError>;
