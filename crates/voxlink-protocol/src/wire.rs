//! Command and reply shapes carried over the channel

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::types::{Utterance, Voice};

static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifier the sending side assigns to a round-trip request so a
/// later reply can be matched to its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(u64);

impl RequestId {
    /// Allocate the next process-unique request id.
    pub fn next() -> Self {
        Self(REQUEST_ID_COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Commands the client side sends to the owner process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SynthesisCommand {
    /// Enumerate the voices the engine offers (synchronous round trip)
    VoiceList,
    /// Start speaking one utterance; replied to with a completion signal
    /// when playback finishes
    Speak {
        text: String,
        lang: String,
        volume: f32,
        rate: f32,
        pitch: f32,
        start_time: f64,
        /// Identity fields of the chosen voice
        voice: Voice,
    },
    /// Suspend playback; replied to with a completion signal
    Pause,
    /// Continue suspended playback; replied to with a completion signal
    Resume,
    /// Abort playback; fire-and-forget, never replied to
    Cancel,
}

impl SynthesisCommand {
    /// Build a `Speak` command from a caller-supplied utterance.
    pub fn speak(utterance: &Utterance) -> Self {
        Self::Speak {
            text: utterance.text.clone(),
            lang: utterance.lang.clone(),
            volume: utterance.volume,
            rate: utterance.rate,
            pitch: utterance.pitch,
            start_time: utterance.start_time,
            voice: utterance.voice.clone(),
        }
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::VoiceList => "voice-list",
            Self::Speak { .. } => "speak",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Cancel => "cancel",
        }
    }
}

/// Replies the owner process sends back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SynthesisReply {
    /// Response to `VoiceList`
    Voices(Vec<Voice>),
    /// Bare completion signal for `Speak`, `Pause`, and `Resume`
    Done,
}
