//! The synthesis proxy: command dispatch, state bookkeeping, and
//! completion-lifetime safety
//!
//! The proxy lives in the sandboxed client process and forwards playback
//! commands to the owner over a [`CommandChannel`]. Completions for the
//! asynchronous round trips capture a `Weak` handle to the proxy's shared
//! state, so a completion delivered after the proxy is torn down is a
//! no-op rather than a dispatch into freed state.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use voxlink_protocol::{RequestId, SynthesisCommand, Utterance, Voice};

use crate::channel::{CommandChannel, ReplyHandler};
use crate::clock::{real_clock, SharedClock};
use crate::error::{ProxyError, ProxyResult};
use crate::observer::SynthesisObserver;
use crate::pending::{OperationKind, PendingSet};
use crate::registry::{ContextId, OperationRegistry};
use crate::state::SynthesisState;
use crate::voices::VoiceDirectory;

/// Configuration for one proxy instance.
#[derive(Clone)]
pub struct ProxyConfig {
    /// Identifier of the owning context (page, session), used when
    /// reporting in-flight operations to a registry
    pub context: ContextId,
    /// Give up on a round trip that has produced no reply within this
    /// bound. `None` preserves the wait-forever behavior of the wire
    /// protocol.
    pub reply_timeout: Option<Duration>,
    /// Time source for stamping pending operations
    pub clock: SharedClock,
    /// Optional per-context ledger of in-flight operations
    pub registry: Option<Arc<dyn OperationRegistry>>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            context: ContextId::next(),
            reply_timeout: None,
            clock: real_clock(),
            registry: None,
        }
    }
}

/// State shared between the proxy and its in-flight completions.
///
/// Completions hold this only weakly; the proxy holds the sole strong
/// reference, so dropping the proxy disarms every outstanding completion.
struct ProxyInner {
    observer: Arc<dyn SynthesisObserver>,
    state: Mutex<SynthesisState>,
    current: Mutex<Option<Utterance>>,
    pending: PendingSet,
    config: ProxyConfig,
}

impl ProxyInner {
    fn set_state(&self, next: SynthesisState) {
        let mut state = self.state.lock();
        if *state == next {
            return;
        }
        info!(from = ?*state, to = ?next, "synthesis state transition");
        *state = next;
    }

    fn finish_confirmed(&self, id: RequestId) {
        if !self.pending.consume(OperationKind::Speak, id) {
            debug!(%id, "stale or duplicate speak completion ignored");
            return;
        }
        self.set_state(SynthesisState::Idle);
        self.current.lock().take();
        self.observer.did_finish_speaking();
    }

    fn pause_confirmed(&self, id: RequestId) {
        if !self.pending.consume(OperationKind::Pause, id) {
            debug!(%id, "stale or duplicate pause completion ignored");
            return;
        }
        let speaking = *self.state.lock() == SynthesisState::Speaking;
        if !speaking {
            // A pause issued while nothing was playing confirms into
            // nothing; the observer hears only about real transitions.
            debug!(%id, "pause confirmed outside Speaking, no effect");
            return;
        }
        self.set_state(SynthesisState::Paused);
        self.observer.did_pause_speaking();
    }

    fn resume_confirmed(&self, id: RequestId) {
        if !self.pending.consume(OperationKind::Resume, id) {
            debug!(%id, "stale or duplicate resume completion ignored");
            return;
        }
        let paused = *self.state.lock() == SynthesisState::Paused;
        if !paused {
            debug!(%id, "resume confirmed outside Paused, no effect");
            return;
        }
        self.set_state(SynthesisState::Speaking);
        self.observer.did_resume_speaking();
    }

    fn record_issue(&self, kind: OperationKind, id: RequestId) {
        if let Some(registry) = &self.config.registry {
            registry.append(self.config.context, kind, id);
        }
    }

    fn abort_issue(&self, kind: OperationKind, id: RequestId, err: ProxyError) -> ProxyError {
        self.pending.consume(kind, id);
        self.observer.did_encounter_error(kind, &err);
        err
    }
}

/// Client-side stand-in for the owner's synthesis engine.
///
/// Owned by its page/session context and destroyed with it; destruction
/// does not cancel in-flight requests at the channel level, it only
/// disables their local effect.
pub struct SynthesisProxy {
    channel: Arc<dyn CommandChannel>,
    directory: VoiceDirectory,
    inner: Arc<ProxyInner>,
}

impl SynthesisProxy {
    pub fn new(channel: Arc<dyn CommandChannel>, observer: Arc<dyn SynthesisObserver>) -> Self {
        Self::with_config(channel, observer, ProxyConfig::default())
    }

    pub fn with_config(
        channel: Arc<dyn CommandChannel>,
        observer: Arc<dyn SynthesisObserver>,
        config: ProxyConfig,
    ) -> Self {
        Self {
            channel,
            directory: VoiceDirectory::new(),
            inner: Arc::new(ProxyInner {
                observer,
                state: Mutex::new(SynthesisState::Idle),
                current: Mutex::new(None),
                pending: PendingSet::new(),
                config,
            }),
        }
    }

    /// Current playback state.
    pub fn state(&self) -> SynthesisState {
        *self.inner.state.lock()
    }

    /// The utterance currently being spoken, if any.
    pub fn current_utterance(&self) -> Option<Utterance> {
        self.inner.current.lock().clone()
    }

    /// Re-fetch the voice list from the owner with a blocking round trip.
    /// Always hits the wire; the cached snapshot only serves lookups.
    pub fn fetch_voices(&self) -> ProxyResult<Vec<Voice>> {
        self.directory.fetch(self.channel.as_ref())
    }

    /// The last successfully fetched voice snapshot.
    pub fn voices(&self) -> Option<Vec<Voice>> {
        self.directory.snapshot()
    }

    /// Start speaking `utterance`.
    ///
    /// The observer is told speaking has begun before the command goes
    /// out; confirmation only ever arrives as the finish completion.
    /// Rejected while an utterance is already current.
    pub fn speak(&self, utterance: Utterance) -> ProxyResult<()> {
        {
            let state = self.inner.state.lock();
            if *state != SynthesisState::Idle {
                return Err(ProxyError::NotIdle { state: *state });
            }
        }
        if self.directory.is_populated() && !self.directory.contains(&utterance.voice.voice_uri) {
            return Err(ProxyError::UnknownVoice {
                uri: utterance.voice.voice_uri.clone(),
            });
        }

        let id = RequestId::next();
        self.inner
            .pending
            .register(OperationKind::Speak, id, self.inner.config.clock.now())?;

        let command = SynthesisCommand::speak(&utterance);
        self.inner.set_state(SynthesisState::Speaking);
        *self.inner.current.lock() = Some(utterance);
        debug!(%id, "speak dispatched");
        self.inner.observer.did_start_speaking();
        self.inner.record_issue(OperationKind::Speak, id);

        let weak = Arc::downgrade(&self.inner);
        let handler: ReplyHandler = Box::new(move |_reply| match weak.upgrade() {
            Some(inner) => inner.finish_confirmed(id),
            None => debug!(%id, "speak completion after proxy teardown, dropped"),
        });

        if let Err(err) = self.channel.send_with_reply(id, command, handler) {
            self.inner.set_state(SynthesisState::Idle);
            self.inner.current.lock().take();
            return Err(self.inner.abort_issue(OperationKind::Speak, id, err.into()));
        }
        Ok(())
    }

    /// Ask the owner to suspend playback. The Speaking → Paused
    /// transition and the observer callback happen only when the owner
    /// confirms.
    pub fn pause(&self) -> ProxyResult<()> {
        self.round_trip(OperationKind::Pause, SynthesisCommand::Pause, ProxyInner::pause_confirmed)
    }

    /// Ask the owner to continue suspended playback. Confirmed
    /// completions transition Paused → Speaking.
    pub fn resume(&self) -> ProxyResult<()> {
        self.round_trip(
            OperationKind::Resume,
            SynthesisCommand::Resume,
            ProxyInner::resume_confirmed,
        )
    }

    fn round_trip(
        &self,
        kind: OperationKind,
        command: SynthesisCommand,
        confirmed: fn(&ProxyInner, RequestId),
    ) -> ProxyResult<()> {
        let id = RequestId::next();
        self.inner
            .pending
            .register(kind, id, self.inner.config.clock.now())?;
        debug!(%id, command = command.name(), "round trip dispatched");
        self.inner.record_issue(kind, id);

        let weak: Weak<ProxyInner> = Arc::downgrade(&self.inner);
        let handler: ReplyHandler = Box::new(move |_reply| match weak.upgrade() {
            Some(inner) => confirmed(&inner, id),
            None => debug!(%id, "completion after proxy teardown, dropped"),
        });

        if let Err(err) = self.channel.send_with_reply(id, command, handler) {
            return Err(self.inner.abort_issue(kind, id, err.into()));
        }
        Ok(())
    }

    /// Abort playback. Fire-and-forget: the wire protocol defines no
    /// reply and no observer event for cancel. Locally the proxy returns
    /// to Idle and invalidates every outstanding completion, so a reply
    /// to a canceled operation that arrives later changes nothing.
    pub fn cancel(&self) -> ProxyResult<()> {
        let cleared = self.inner.pending.clear();
        if !cleared.is_empty() {
            debug!(count = cleared.len(), "pending completions invalidated by cancel");
        }
        if let Some(registry) = &self.inner.config.registry {
            registry.deactivate_all(self.inner.config.context);
        }
        self.inner.set_state(SynthesisState::Idle);
        self.inner.current.lock().take();
        self.channel.send(SynthesisCommand::Cancel)?;
        Ok(())
    }

    /// Give up on round trips that have outlived the configured reply
    /// timeout. Driven by the owning loop; a no-op when no timeout is
    /// configured, preserving the wire protocol's wait-forever behavior.
    pub fn expire_stale(&self) {
        let Some(timeout) = self.inner.config.reply_timeout else {
            return;
        };
        let now = self.inner.config.clock.now();
        for expired in self.inner.pending.take_expired(now, timeout) {
            warn!(
                kind = ?expired.kind,
                id = %expired.id,
                waited = ?expired.waited,
                "no reply within bound, giving up"
            );
            if expired.kind == OperationKind::Speak {
                self.inner.set_state(SynthesisState::Idle);
                self.inner.current.lock().take();
            }
            let err = ProxyError::ReplyTimeout {
                kind: expired.kind,
                waited: expired.waited,
            };
            self.inner.observer.did_encounter_error(expired.kind, &err);
        }
    }
}

impl Drop for SynthesisProxy {
    fn drop(&mut self) {
        if let Some(registry) = &self.inner.config.registry {
            registry.deactivate_all(self.inner.config.context);
        }
    }
}
