//! In-process loopback transport for the voxlink bridge
//!
//! [`pair`] yields the two ends of a simulated process boundary: a
//! [`LoopbackChannel`] the proxy sends on, and a [`LoopbackOwner`] a test
//! drives to play the privileged process. Replies are delivered only
//! when the owner says so, which makes deferred completions, duplicate
//! deliveries, dropped replies, and peer death all expressible.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::debug;
use voxlink::{ChannelError, CommandChannel, ReplyHandler};
use voxlink_protocol::{RequestId, SynthesisCommand, SynthesisReply, Voice};

/// One command as the owner end saw it.
#[derive(Debug)]
pub struct CommandRecord {
    /// Present for round trips, absent for fire-and-forget sends
    pub id: Option<RequestId>,
    pub command: SynthesisCommand,
}

struct Shared {
    commands: Sender<CommandRecord>,
    parked: Mutex<HashMap<RequestId, ReplyHandler>>,
    voice_replies: Mutex<VecDeque<Result<Vec<Voice>, ChannelError>>>,
    closed: AtomicBool,
}

impl Shared {
    fn check_open(&self) -> Result<(), ChannelError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(ChannelError::Closed)
        } else {
            Ok(())
        }
    }
}

/// Client end: hand this to a `SynthesisProxy`.
pub struct LoopbackChannel {
    shared: Arc<Shared>,
}

/// Owner end: the test's stand-in for the privileged process.
pub struct LoopbackOwner {
    shared: Arc<Shared>,
    commands: Receiver<CommandRecord>,
}

/// Create a connected channel/owner pair.
pub fn pair() -> (LoopbackChannel, LoopbackOwner) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let shared = Arc::new(Shared {
        commands: tx,
        parked: Mutex::new(HashMap::new()),
        voice_replies: Mutex::new(VecDeque::new()),
        closed: AtomicBool::new(false),
    });
    (
        LoopbackChannel {
            shared: shared.clone(),
        },
        LoopbackOwner {
            shared,
            commands: rx,
        },
    )
}

impl CommandChannel for LoopbackChannel {
    fn send(&self, command: SynthesisCommand) -> Result<(), ChannelError> {
        self.shared.check_open()?;
        self.shared
            .commands
            .send(CommandRecord { id: None, command })
            .map_err(|e| ChannelError::Transport(e.to_string()))
    }

    fn send_sync(&self, command: SynthesisCommand) -> Result<SynthesisReply, ChannelError> {
        self.shared.check_open()?;
        match command {
            SynthesisCommand::VoiceList => {
                let scripted = self.shared.voice_replies.lock().pop_front();
                let reply = match scripted {
                    Some(Ok(voices)) => Ok(SynthesisReply::Voices(voices)),
                    Some(Err(err)) => Err(err),
                    None => Err(ChannelError::Transport(
                        "no scripted reply for voice enumeration".into(),
                    )),
                };
                self.shared
                    .commands
                    .send(CommandRecord {
                        id: None,
                        command: SynthesisCommand::VoiceList,
                    })
                    .map_err(|e| ChannelError::Transport(e.to_string()))?;
                reply
            }
            other => Err(ChannelError::Transport(format!(
                "command {:?} has no synchronous form",
                other
            ))),
        }
    }

    fn send_with_reply(
        &self,
        id: RequestId,
        command: SynthesisCommand,
        handler: ReplyHandler,
    ) -> Result<(), ChannelError> {
        self.shared.check_open()?;
        self.shared.parked.lock().insert(id, handler);
        self.shared
            .commands
            .send(CommandRecord {
                id: Some(id),
                command,
            })
            .map_err(|e| ChannelError::Transport(e.to_string()))
    }
}

impl LoopbackOwner {
    /// Everything sent since the last drain, in send order.
    pub fn drain_commands(&self) -> Vec<CommandRecord> {
        self.commands.try_iter().collect()
    }

    /// Script the reply for the next synchronous voice enumeration.
    pub fn enqueue_voice_reply(&self, reply: Result<Vec<Voice>, ChannelError>) {
        self.shared.voice_replies.lock().push_back(reply);
    }

    /// Deliver the completion for `id`, keeping the handler parked so a
    /// malformed peer can be simulated by delivering again. Returns
    /// whether a handler was found.
    pub fn deliver(&self, id: RequestId) -> bool {
        // The handler is taken out of the map before it runs so a
        // completion that re-enters the channel cannot deadlock on it.
        let handler = self.shared.parked.lock().remove(&id);
        match handler {
            Some(handler) => {
                handler(SynthesisReply::Done);
                self.shared.parked.lock().insert(id, handler);
                true
            }
            None => {
                debug!(%id, "deliver with no parked handler");
                false
            }
        }
    }

    /// Deliver the completion for `id` and forget the handler.
    pub fn complete(&self, id: RequestId) -> bool {
        let handler = self.shared.parked.lock().remove(&id);
        match handler {
            Some(handler) => {
                handler(SynthesisReply::Done);
                true
            }
            None => false,
        }
    }

    /// Drop the parked handler for `id` without invoking it, simulating
    /// a reply lost in transit.
    pub fn drop_pending(&self, id: RequestId) -> bool {
        self.shared.parked.lock().remove(&id).is_some()
    }

    /// Number of round trips still awaiting a reply.
    pub fn pending_count(&self) -> usize {
        self.shared.parked.lock().len()
    }

    /// Kill the peer: every later send fails with `Closed`, and parked
    /// handlers are dropped uninvoked.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.parked.lock().clear();
    }
}
