//! Per-connection lifecycle: joined on open, left on close.

use std::sync::Arc;

use tracing::debug;

use super::coordinator::Room;
use super::signal::SignalEmitter;
use super::transport::EventSender;
use crate::room::{Participant, ParticipantId};

/// A joined participant. Owns the participant's volume feed and leaves the
/// room when closed or dropped.
pub struct Session {
    room: Arc<Room>,
    participant: Participant,
    signal: Option<SignalEmitter>,
    closed: bool,
}

impl Session {
    /// Join the room, which sends the welcome, and start the volume feed.
    pub async fn open(room: Arc<Room>, sender: EventSender) -> Self {
        let participant = room.join(sender).await;
        let signal = SignalEmitter::start(room.clone(), participant.id, room.options().signal_interval);
        Self {
            room,
            participant,
            signal: Some(signal),
            closed: false,
        }
    }

    pub fn id(&self) -> ParticipantId {
        self.participant.id
    }

    pub fn participant(&self) -> &Participant {
        &self.participant
    }

    pub fn room(&self) -> &Arc<Room> {
        &self.room
    }

    /// Stop the volume feed and leave the room.
    pub async fn close(mut self) {
        self.signal.take();
        self.room.leave(self.participant.id).await;
        self.closed = true;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.signal.take();
        let room = self.room.clone();
        let id = self.participant.id;
        debug!(id, "Session dropped without close, leaving in the background");
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                room.leave(id).await;
            });
        }
    }
}
