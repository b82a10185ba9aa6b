//! Fan-out of outbound events to connected participants.
//!
//! Each participant owns an unbounded queue drained by its socket writer, so
//! every recipient sees events in the order they were sent here.

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::models::SendMessage;
use crate::room::ParticipantId;

/// Serialized frames headed for one participant's socket.
pub type EventSender = mpsc::UnboundedSender<String>;
pub type EventReceiver = mpsc::UnboundedReceiver<String>;

#[derive(Debug, Default)]
pub struct Transport {
    peers: BTreeMap<ParticipantId, EventSender>,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: ParticipantId, sender: EventSender) {
        self.peers.insert(id, sender);
    }

    pub fn unregister(&mut self, id: ParticipantId) -> bool {
        self.peers.remove(&id).is_some()
    }

    /// Deliver to exactly one participant.
    pub fn send_to(&self, id: ParticipantId, msg: &SendMessage) {
        let Some(sender) = self.peers.get(&id) else {
            debug!(to = id, event = msg.name(), "Recipient gone, dropping event");
            return;
        };
        if let Some(frame) = encode(msg) {
            // A closed queue means the socket is going away; drop silently.
            let _ = sender.send(frame);
        }
    }

    /// Deliver to everyone except `originator`.
    pub fn send_to_others(&self, originator: ParticipantId, msg: &SendMessage) {
        self.fan_out(Some(originator), msg);
    }

    /// Deliver to everyone, the originator included.
    pub fn send_to_all(&self, msg: &SendMessage) {
        self.fan_out(None, msg);
    }

    fn fan_out(&self, skip: Option<ParticipantId>, msg: &SendMessage) {
        let Some(frame) = encode(msg) else { return };
        let mut sent = 0;
        for (id, sender) in &self.peers {
            if Some(*id) == skip {
                continue;
            }
            if sender.send(frame.clone()).is_ok() {
                sent += 1;
            }
        }
        debug!(event = msg.name(), sent, "Broadcast event");
    }
}

fn encode(msg: &SendMessage) -> Option<String> {
    match serde_json::to_string(msg) {
        Ok(frame) => Some(frame),
        Err(e) => {
            error!(event = msg.name(), "Failed to serialize event: {}", e);
            None
        }
    }
}
