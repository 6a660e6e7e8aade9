//! Transport seam between the client side and the owner process
//!
//! The channel offers exactly three primitives: fire-and-forget send, a
//! blocking synchronous round trip, and a non-blocking round trip whose
//! completion is invoked when (and only if) a reply arrives. Replies on
//! one channel are assumed to arrive in request order; nothing survives
//! peer failure.

use thiserror::Error;
use voxlink_protocol::{RequestId, SynthesisCommand, SynthesisReply};

/// Transport-level failures.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The peer process is gone; nothing sent on this channel will be
    /// delivered or replied to
    #[error("channel closed, peer process is gone")]
    Closed,

    /// Transport-specific failure
    #[error("transport error: {0}")]
    Transport(String),
}

/// Completion invoked when a reply for an asynchronous round trip
/// arrives.
///
/// Handlers are `Fn`, not `FnOnce`: a misbehaving peer may deliver a
/// reply twice, and at-most-once semantics are enforced by the caller
/// (see the pending-operation bookkeeping), not by the transport.
pub type ReplyHandler = Box<dyn Fn(SynthesisReply) + Send + Sync>;

/// A bidirectional request/response transport to the owner process.
pub trait CommandChannel: Send + Sync {
    /// Send a command without expecting a reply.
    fn send(&self, command: SynthesisCommand) -> Result<(), ChannelError>;

    /// Send a command and block the calling thread until the owner
    /// replies or the channel reports failure.
    fn send_sync(&self, command: SynthesisCommand) -> Result<SynthesisReply, ChannelError>;

    /// Send a command and register a completion for its eventual reply.
    /// The caller allocates `id` so it can correlate the completion with
    /// its own bookkeeping before the send happens.
    fn send_with_reply(
        &self,
        id: RequestId,
        command: SynthesisCommand,
        handler: ReplyHandler,
    ) -> Result<(), ChannelError>;
}
