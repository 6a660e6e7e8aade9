//! Value objects shared by both ends of the bridge

use serde::{Deserialize, Serialize};

/// One voice offered by the owner-side synthesis engine.
///
/// `voice_uri` is the identity within a directory snapshot; the remaining
/// fields are presentation data. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    /// Unique identifier within a directory snapshot
    pub voice_uri: String,
    /// Human-readable voice name
    pub name: String,
    /// Language code (e.g., "en-US", "fr-FR")
    pub lang: String,
    /// Whether synthesis runs locally rather than via a network service
    pub local_service: bool,
    /// Whether this is the engine's default voice
    pub is_default: bool,
}

impl Voice {
    pub fn new(
        voice_uri: impl Into<String>,
        name: impl Into<String>,
        lang: impl Into<String>,
        local_service: bool,
        is_default: bool,
    ) -> Self {
        Self {
            voice_uri: voice_uri.into(),
            name: name.into(),
            lang: lang.into(),
            local_service,
            is_default,
        }
    }
}

/// One text-to-speech request with its parameters and chosen voice.
///
/// Constructed by the caller, consumed by a single `speak` call. Immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub text: String,
    pub lang: String,
    /// Volume (0.0-1.0)
    pub volume: f32,
    /// Speaking rate multiplier (1.0 is normal)
    pub rate: f32,
    /// Voice pitch (0.0-2.0, 1.0 is normal)
    pub pitch: f32,
    /// Offset into the utterance at which playback starts, in seconds
    pub start_time: f64,
    pub voice: Voice,
}

impl Utterance {
    /// Build an utterance with neutral parameters, taking the language
    /// from the chosen voice.
    pub fn new(text: impl Into<String>, voice: Voice) -> Self {
        Self {
            text: text.into(),
            lang: voice.lang.clone(),
            volume: 1.0,
            rate: 1.0,
            pitch: 1.0,
            start_time: 0.0,
            voice,
        }
    }
}
