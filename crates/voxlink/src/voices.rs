//! Cached voice enumeration

use parking_lot::Mutex;
use tracing::{debug, warn};
use voxlink_protocol::{SynthesisCommand, SynthesisReply, Voice};

use crate::channel::{ChannelError, CommandChannel};
use crate::error::ProxyResult;

/// Caches the most recent voice enumeration fetched from the owner.
///
/// Each fetch wholesale-replaces the snapshot; there is no cache-hit
/// short-circuit and no incremental merge. A failed fetch leaves the
/// previous snapshot untouched and surfaces the error to the caller.
#[derive(Default)]
pub struct VoiceDirectory {
    // None until the first successful fetch; an engine with no voices
    // yields Some(vec![]), which is a different thing.
    snapshot: Mutex<Option<Vec<Voice>>>,
}

impl VoiceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the voice list with a blocking round trip and replace the
    /// cached snapshot.
    ///
    /// This blocks the calling thread for the duration of a cross-process
    /// round trip; callers on latency-sensitive loops should fetch ahead
    /// of time.
    pub fn fetch(&self, channel: &dyn CommandChannel) -> ProxyResult<Vec<Voice>> {
        match channel.send_sync(SynthesisCommand::VoiceList) {
            Ok(SynthesisReply::Voices(voices)) => {
                debug!(count = voices.len(), "voice directory refreshed");
                *self.snapshot.lock() = Some(voices.clone());
                Ok(voices)
            }
            Ok(reply) => {
                warn!(?reply, "unexpected reply to voice enumeration");
                Err(ChannelError::Transport(format!(
                    "unexpected reply to voice enumeration: {:?}",
                    reply
                ))
                .into())
            }
            Err(err) => {
                // Stale snapshot is retained; better a dated list than
                // none while the owner is unreachable.
                warn!(error = %err, "voice enumeration failed, keeping stale snapshot");
                Err(err.into())
            }
        }
    }

    /// The last successfully fetched snapshot, if any.
    pub fn snapshot(&self) -> Option<Vec<Voice>> {
        self.snapshot.lock().clone()
    }

    /// Whether a fetch has ever succeeded.
    pub fn is_populated(&self) -> bool {
        self.snapshot.lock().is_some()
    }

    /// Whether `voice_uri` names a voice in the current snapshot.
    pub fn contains(&self, voice_uri: &str) -> bool {
        self.snapshot
            .lock()
            .as_ref()
            .is_some_and(|voices| voices.iter().any(|v| v.voice_uri == voice_uri))
    }
}
