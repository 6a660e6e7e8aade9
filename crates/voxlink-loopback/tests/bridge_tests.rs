//! End-to-end tests driving a `SynthesisProxy` over the loopback
//! transport, with the owner end scripted by the test.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use voxlink::{
    ChannelError, ContextId, InMemoryOperationRegistry, OperationKind, ProxyConfig, ProxyError,
    RequestId, SynthesisCommand, SynthesisObserver, SynthesisProxy, SynthesisState, TestClock,
    Utterance, Voice,
};
use voxlink_loopback::{pair, LoopbackOwner};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Started,
    Paused,
    Resumed,
    Finished,
    Error(OperationKind),
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }
}

impl SynthesisObserver for RecordingObserver {
    fn did_start_speaking(&self) {
        self.events.lock().push(Event::Started);
    }

    fn did_pause_speaking(&self) {
        self.events.lock().push(Event::Paused);
    }

    fn did_resume_speaking(&self) {
        self.events.lock().push(Event::Resumed);
    }

    fn did_finish_speaking(&self) {
        self.events.lock().push(Event::Finished);
    }

    fn did_encounter_error(&self, kind: OperationKind, _error: &ProxyError) {
        self.events.lock().push(Event::Error(kind));
    }
}

fn voice(uri: &str) -> Voice {
    Voice::new(uri, "Alice", "en-US", true, false)
}

fn setup() -> (SynthesisProxy, LoopbackOwner, Arc<RecordingObserver>) {
    setup_with(ProxyConfig::default())
}

fn setup_with(config: ProxyConfig) -> (SynthesisProxy, LoopbackOwner, Arc<RecordingObserver>) {
    let (channel, owner) = pair();
    let observer = Arc::new(RecordingObserver::default());
    let proxy = SynthesisProxy::with_config(Arc::new(channel), observer.clone(), config);
    (proxy, owner, observer)
}

/// The id of the single round trip named `name` sent since the last
/// drain.
fn sent_id(owner: &LoopbackOwner, name: &str) -> RequestId {
    let ids: Vec<RequestId> = owner
        .drain_commands()
        .into_iter()
        .filter(|record| record.command.name() == name)
        .filter_map(|record| record.id)
        .collect();
    assert_eq!(ids.len(), 1, "expected exactly one {} command", name);
    ids[0]
}

#[test]
fn idle_pause_and_resume_never_reach_the_observer() {
    let (proxy, owner, observer) = setup();

    proxy.pause().unwrap();
    let pause_id = sent_id(&owner, "pause");
    proxy.resume().unwrap();
    let resume_id = sent_id(&owner, "resume");
    proxy.pause().unwrap_err(); // still in flight

    assert!(owner.complete(pause_id));
    assert!(owner.complete(resume_id));

    assert!(observer.events().is_empty());
    assert_eq!(proxy.state(), SynthesisState::Idle);
}

#[test]
fn fetch_twice_keeps_only_the_latest_snapshot() {
    let (proxy, owner, _observer) = setup();
    owner.enqueue_voice_reply(Ok(vec![voice("v1"), voice("v2")]));
    owner.enqueue_voice_reply(Ok(vec![voice("v3")]));

    assert_eq!(proxy.fetch_voices().unwrap().len(), 2);
    assert_eq!(proxy.fetch_voices().unwrap().len(), 1);

    let snapshot = proxy.voices().unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].voice_uri, "v3");
}

#[test]
fn failed_fetch_retains_the_stale_snapshot() {
    let (proxy, owner, _observer) = setup();
    owner.enqueue_voice_reply(Ok(vec![voice("v1")]));
    owner.enqueue_voice_reply(Err(ChannelError::Closed));

    proxy.fetch_voices().unwrap();
    assert!(matches!(
        proxy.fetch_voices().unwrap_err(),
        ProxyError::Channel(ChannelError::Closed)
    ));

    let snapshot = proxy.voices().unwrap();
    assert_eq!(snapshot[0].voice_uri, "v1");
}

#[test]
fn speak_produces_exactly_one_start_and_one_finish() {
    let (proxy, owner, observer) = setup();
    owner.enqueue_voice_reply(Ok(vec![voice("v1")]));
    proxy.fetch_voices().unwrap();
    owner.drain_commands();

    proxy.speak(Utterance::new("hi", voice("v1"))).unwrap();
    // the observer hears the start before any reply traffic exists
    assert_eq!(observer.events(), vec![Event::Started]);
    assert_eq!(proxy.state(), SynthesisState::Speaking);

    let speak_id = sent_id(&owner, "speak");
    assert!(owner.deliver(speak_id));
    assert_eq!(observer.events(), vec![Event::Started, Event::Finished]);
    assert_eq!(proxy.state(), SynthesisState::Idle);

    // a malformed peer delivering the same completion again is a no-op
    assert!(owner.deliver(speak_id));
    assert_eq!(observer.events(), vec![Event::Started, Event::Finished]);
}

#[test]
fn pause_then_resume_callbacks_arrive_strictly_in_order() {
    let (proxy, owner, observer) = setup();
    proxy.speak(Utterance::new("hi", voice("v1"))).unwrap();
    owner.drain_commands();

    proxy.pause().unwrap();
    assert!(owner.complete(sent_id(&owner, "pause")));
    assert_eq!(proxy.state(), SynthesisState::Paused);

    proxy.resume().unwrap();
    assert!(owner.complete(sent_id(&owner, "resume")));
    assert_eq!(proxy.state(), SynthesisState::Speaking);

    assert_eq!(
        observer.events(),
        vec![Event::Started, Event::Paused, Event::Resumed]
    );
}

#[test]
fn dropping_the_proxy_disarms_outstanding_completions() {
    let (proxy, owner, observer) = setup();
    proxy.speak(Utterance::new("hi", voice("v1"))).unwrap();
    let speak_id = sent_id(&owner, "speak");
    proxy.pause().unwrap();
    let pause_id = sent_id(&owner, "pause");

    drop(proxy);

    // the transport still holds the handlers; delivering them now must
    // not dispatch anywhere
    assert!(owner.deliver(speak_id));
    assert!(owner.deliver(pause_id));
    assert_eq!(observer.events(), vec![Event::Started]);
}

#[test]
fn cancel_triggers_no_callback_and_invalidates_pending_replies() {
    let (proxy, owner, observer) = setup();
    proxy.speak(Utterance::new("hi", voice("v1"))).unwrap();
    let speak_id = sent_id(&owner, "speak");

    proxy.cancel().unwrap();
    assert_eq!(proxy.state(), SynthesisState::Idle);

    let records = owner.drain_commands();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].command, SynthesisCommand::Cancel);

    // a late reply to the canceled speak changes nothing
    assert!(owner.deliver(speak_id));
    assert_eq!(observer.events(), vec![Event::Started]);
    assert_eq!(proxy.state(), SynthesisState::Idle);
}

#[test]
fn lost_reply_without_timeout_simply_never_fires() {
    let (proxy, owner, observer) = setup();
    proxy.speak(Utterance::new("hi", voice("v1"))).unwrap();
    let speak_id = sent_id(&owner, "speak");

    assert!(owner.drop_pending(speak_id));
    proxy.expire_stale(); // no timeout configured: nothing happens

    assert_eq!(observer.events(), vec![Event::Started]);
    assert_eq!(proxy.state(), SynthesisState::Speaking);
}

#[test]
fn configured_timeout_surfaces_the_stuck_speak() {
    let clock = Arc::new(TestClock::new());
    let config = ProxyConfig {
        reply_timeout: Some(Duration::from_secs(5)),
        clock: clock.clone(),
        ..ProxyConfig::default()
    };
    let (proxy, owner, observer) = setup_with(config);

    proxy.speak(Utterance::new("hi", voice("v1"))).unwrap();
    let speak_id = sent_id(&owner, "speak");

    clock.advance(Duration::from_secs(4));
    proxy.expire_stale();
    assert_eq!(observer.events(), vec![Event::Started]);

    clock.advance(Duration::from_secs(2));
    proxy.expire_stale();
    assert_eq!(
        observer.events(),
        vec![Event::Started, Event::Error(OperationKind::Speak)]
    );
    assert_eq!(proxy.state(), SynthesisState::Idle);

    // expiring again reports nothing further, and the reply arriving
    // after expiry is ignored
    proxy.expire_stale();
    assert!(owner.deliver(speak_id));
    assert_eq!(
        observer.events(),
        vec![Event::Started, Event::Error(OperationKind::Speak)]
    );
}

#[test]
fn dead_peer_is_surfaced_and_state_repaired() {
    let (proxy, owner, observer) = setup();
    owner.close();

    let err = proxy.speak(Utterance::new("hi", voice("v1"))).unwrap_err();
    assert!(matches!(err, ProxyError::Channel(ChannelError::Closed)));
    assert_eq!(proxy.state(), SynthesisState::Idle);
    // the optimistic start already fired; the failure follows it
    assert_eq!(
        observer.events(),
        vec![Event::Started, Event::Error(OperationKind::Speak)]
    );

    // subsequent speaks are clean rejections, not stuck state
    let err = proxy.speak(Utterance::new("again", voice("v1"))).unwrap_err();
    assert!(matches!(err, ProxyError::Channel(ChannelError::Closed)));
}

#[test]
fn registry_sees_operations_and_teardown_sweeps_them() {
    let registry = Arc::new(InMemoryOperationRegistry::new());
    let context = ContextId::next();
    let config = ProxyConfig {
        context,
        registry: Some(registry.clone()),
        ..ProxyConfig::default()
    };
    let (proxy, _owner, _observer) = setup_with(config);

    proxy.speak(Utterance::new("hi", voice("v1"))).unwrap();
    proxy.pause().unwrap();
    assert_eq!(registry.operations(context).len(), 2);

    drop(proxy);
    assert!(registry.operations(context).is_empty());
}

#[test]
fn cancel_deactivates_the_registry_context() {
    let registry = Arc::new(InMemoryOperationRegistry::new());
    let context = ContextId::next();
    let config = ProxyConfig {
        context,
        registry: Some(registry.clone()),
        ..ProxyConfig::default()
    };
    let (proxy, _owner, _observer) = setup_with(config);

    proxy.speak(Utterance::new("hi", voice("v1"))).unwrap();
    assert_eq!(registry.operations(context).len(), 1);

    proxy.cancel().unwrap();
    assert!(registry.operations(context).is_empty());
}
