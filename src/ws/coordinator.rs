//! The room: single owner of presence, the shared document and the saved
//! states catalog.
//!
//! Every operation takes the room lock for its whole read-modify-broadcast
//! cycle, so events are applied one at a time and each participant's queue
//! receives the resulting broadcasts in mutation order.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use super::signal::random_volumes;
use super::transport::{EventSender, Transport};
use crate::config::Config;
use crate::models::{
    ParticipantsChangedMessage, PersistenceFailedMessage, SavedStatesChangedMessage, SendMessage,
    StateChangedMessage, VolumeChangedMessage, WelcomeMessage,
};
use crate::persistence::{CatalogStore, CatalogWriter, WriteFailure, WriterOptions};
use crate::room::{
    Document, Participant, ParticipantId, PresenceRegistry, SavedStateCatalog, SavedStates,
    StateStore,
};

#[derive(Debug, Clone, Copy)]
pub struct RoomOptions {
    pub signal_interval: Duration,
    pub writer: WriterOptions,
}

impl RoomOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            signal_interval: config.volume_interval(),
            writer: WriterOptions {
                timeout: config.persist_timeout(),
                retry_delay: config.persist_retry(),
            },
        }
    }
}

impl Default for RoomOptions {
    fn default() -> Self {
        Self {
            signal_interval: Duration::from_millis(2000),
            writer: WriterOptions::default(),
        }
    }
}

/// Point-in-time counters for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomStats {
    pub participants: usize,
    pub state_keys: usize,
    pub saved_states: usize,
    pub latest_generation: u64,
    pub persisted_generation: u64,
}

#[derive(Debug)]
struct RoomState {
    presence: PresenceRegistry,
    store: StateStore,
    catalog: SavedStateCatalog,
    transport: Transport,
}

pub struct Room {
    inner: Mutex<RoomState>,
    writer: CatalogWriter,
    options: RoomOptions,
    started_at: DateTime<Utc>,
}

impl Room {
    /// Build the room around a catalog already loaded from `store`. Later
    /// catalog changes are written back through `store`.
    pub fn new(saved_states: SavedStates, store: Arc<dyn CatalogStore>, options: RoomOptions) -> Arc<Self> {
        let (writer, failures) = CatalogWriter::spawn(store, options.writer);
        let room = Arc::new(Self {
            inner: Mutex::new(RoomState {
                presence: PresenceRegistry::new(),
                store: StateStore::new(),
                catalog: SavedStateCatalog::new(saved_states),
                transport: Transport::new(),
            }),
            writer,
            options,
            started_at: Utc::now(),
        });
        tokio::spawn(relay_write_failures(Arc::downgrade(&room), failures));
        room
    }

    pub fn options(&self) -> &RoomOptions {
        &self.options
    }

    pub fn writer(&self) -> &CatalogWriter {
        &self.writer
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Admit a participant: greet it with the full room state, then tell
    /// everyone else the participant list changed.
    pub async fn join(&self, sender: EventSender) -> Participant {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;

        let participant = state.presence.join();
        state.transport.register(participant.id, sender);
        let users = state.presence.list();

        let welcome = SendMessage::Welcome(WelcomeMessage {
            id: participant.id,
            state: state.store.current().clone(),
            users: users.clone(),
            saved_states: state.catalog.entries().clone(),
        });
        state.transport.send_to(participant.id, &welcome);
        state.transport.send_to_others(
            participant.id,
            &SendMessage::ParticipantsChanged(ParticipantsChangedMessage { users }),
        );

        info!(
            id = participant.id,
            name = %participant.display_identity,
            participants = state.presence.len(),
            "Participant joined the room"
        );
        participant
    }

    /// Remove a participant and tell the rest. Safe to call more than once.
    pub async fn leave(&self, id: ParticipantId) -> bool {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;

        state.transport.unregister(id);
        if !state.presence.leave(id) {
            debug!(id, "Participant already left");
            return false;
        }

        let users = state.presence.list();
        state
            .transport
            .send_to_all(&SendMessage::ParticipantsChanged(ParticipantsChangedMessage { users }));
        info!(id, participants = state.presence.len(), "Participant left the room");
        true
    }

    /// Merge a delta into the shared document and send the result to
    /// everyone, the submitter included.
    pub async fn apply_delta(&self, origin: ParticipantId, delta: Document, delete_keys: &[String]) {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;
        if !state.presence.contains(origin) {
            warn!(origin, "Ignoring delta from a participant that is not in the room");
            return;
        }

        let document = state.store.apply_delta(delta, delete_keys).clone();
        debug!(origin, keys = document.len(), "Applied delta");
        state
            .transport
            .send_to_all(&SendMessage::StateChanged(StateChangedMessage { state: document }));
    }

    /// Replace the shared document (empty when `document` is `None`) and send
    /// it to everyone.
    pub async fn reset(&self, origin: ParticipantId, document: Option<Document>) {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;
        if !state.presence.contains(origin) {
            warn!(origin, "Ignoring reset from a participant that is not in the room");
            return;
        }

        let document = state.store.reset(document).clone();
        info!(origin, keys = document.len(), "Shared state reset");
        state
            .transport
            .send_to_all(&SendMessage::StateChanged(StateChangedMessage { state: document }));
    }

    /// Store a named snapshot, queue the catalog for writing and send the
    /// catalog to everyone. Returns the write generation, or `None` when the
    /// origin is not in the room.
    pub async fn add_saved_state(&self, origin: ParticipantId, name: String, document: Document) -> Option<u64> {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;
        if !state.presence.contains(origin) {
            warn!(origin, "Ignoring saved state from a participant that is not in the room");
            return None;
        }

        info!(origin, name = %name, "Saving state");
        let saved_states = state.catalog.add(name, document).clone();
        let generation = self.writer.submit(saved_states.clone());
        state
            .transport
            .send_to_all(&SendMessage::SavedStatesChanged(SavedStatesChangedMessage { saved_states }));
        Some(generation)
    }

    /// Send `owner` a fresh random volume level for everyone in the room.
    /// Returns false once `owner` has left.
    pub async fn emit_volumes(&self, owner: ParticipantId) -> bool {
        let guard = self.inner.lock().await;
        if !guard.presence.contains(owner) {
            return false;
        }
        let volumes = random_volumes(&guard.presence.ids());
        guard
            .transport
            .send_to(owner, &SendMessage::VolumeChanged(VolumeChangedMessage { volumes }));
        true
    }

    async fn notify_write_failure(&self, failure: &WriteFailure) {
        let guard = self.inner.lock().await;
        guard.transport.send_to_all(&SendMessage::PersistenceFailed(PersistenceFailedMessage {
            message: failure.error.to_string(),
            attempt: failure.attempt,
            at: Utc::now(),
        }));
    }

    pub async fn participants(&self) -> Vec<Participant> {
        self.inner.lock().await.presence.list()
    }

    pub async fn current_state(&self) -> Document {
        self.inner.lock().await.store.current().clone()
    }

    pub async fn saved_states(&self) -> SavedStates {
        self.inner.lock().await.catalog.entries().clone()
    }

    pub async fn stats(&self) -> RoomStats {
        let guard = self.inner.lock().await;
        RoomStats {
            participants: guard.presence.len(),
            state_keys: guard.store.current().len(),
            saved_states: guard.catalog.entries().len(),
            latest_generation: self.writer.latest_generation(),
            persisted_generation: self.writer.persisted_generation(),
        }
    }

    /// Wait up to `limit` for every submitted catalog to reach disk.
    pub async fn flush(&self, limit: Duration) -> bool {
        let generation = self.writer.latest_generation();
        if generation == 0 {
            return true;
        }
        matches!(
            tokio::time::timeout(limit, self.writer.wait_persisted(generation)).await,
            Ok(true)
        )
    }
}

async fn relay_write_failures(room: Weak<Room>, mut failures: mpsc::UnboundedReceiver<WriteFailure>) {
    while let Some(failure) = failures.recv().await {
        let Some(room) = room.upgrade() else { break };
        room.notify_write_failure(&failure).await;
    }
}
