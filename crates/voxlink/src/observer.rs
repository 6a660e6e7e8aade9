//! Observer interface for speech lifecycle events

use crate::error::ProxyError;
use crate::pending::OperationKind;

/// Local listener for page-visible speech-synthesis state.
///
/// The four lifecycle methods mirror the wire protocol one to one.
/// `did_encounter_error` is an extension with a default empty body: the
/// protocol itself defines no failure signal, so consumers that only
/// want the original surface implement four methods, while hardened
/// consumers can learn about timeouts and channel failures instead of
/// perceiving a stuck "speaking" state.
pub trait SynthesisObserver: Send + Sync {
    /// Speaking has begun. Invoked optimistically when the command is
    /// issued, not upon remote confirmation.
    fn did_start_speaking(&self);

    /// The owner confirmed a pause took effect.
    fn did_pause_speaking(&self);

    /// The owner confirmed playback resumed.
    fn did_resume_speaking(&self);

    /// The current utterance finished playing.
    fn did_finish_speaking(&self);

    /// An in-flight operation failed or was given up on.
    fn did_encounter_error(&self, _kind: OperationKind, _error: &ProxyError) {}
}
