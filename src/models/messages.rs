use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::room::{Document, Participant, ParticipantId, SavedStates};

pub const SUBMIT_DELTA: &str = "submit-delta";
pub const RESET_STATE: &str = "reset-state";
pub const ADD_SAVED_STATE: &str = "add-saved-state";

/// Envelope of every frame on the socket.
#[derive(Deserialize, Debug)]
pub struct InboundFrame {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitDeltaMessage {
    pub delta: Document,
    pub delete_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResetStateMessage {
    pub state: Option<Document>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddSavedStateMessage {
    pub name: String,
    pub state: Document,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReceivedMessage {
    SubmitDelta(SubmitDeltaMessage),
    ResetState(ResetStateMessage),
    AddSavedState(AddSavedStateMessage),
}

#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("unknown event '{0}'")]
    UnknownEvent(String),
    #[error("'{event}' is missing a string '{field}'")]
    MissingField {
        event: &'static str,
        field: &'static str,
    },
}

impl TryFrom<InboundFrame> for ReceivedMessage {
    type Error = FrameError;

    /// Payload fields of the wrong shape are read as empty rather than
    /// rejected.
    fn try_from(frame: InboundFrame) -> Result<Self, Self::Error> {
        let mut payload = match frame.payload {
            Value::Object(map) => map,
            _ => Document::new(),
        };

        match frame.event.as_str() {
            SUBMIT_DELTA => {
                let delta = take_object(&mut payload, "delta").unwrap_or_default();
                let delete_keys = match payload.remove("deleteKeys") {
                    Some(Value::Array(keys)) => keys
                        .into_iter()
                        .filter_map(|k| match k {
                            Value::String(s) => Some(s),
                            _ => None,
                        })
                        .collect(),
                    _ => Vec::new(),
                };
                Ok(ReceivedMessage::SubmitDelta(SubmitDeltaMessage { delta, delete_keys }))
            }
            RESET_STATE => Ok(ReceivedMessage::ResetState(ResetStateMessage {
                state: take_object(&mut payload, "state"),
            })),
            ADD_SAVED_STATE => {
                let name = match payload.remove("name") {
                    Some(Value::String(name)) => name,
                    _ => {
                        return Err(FrameError::MissingField {
                            event: ADD_SAVED_STATE,
                            field: "name",
                        })
                    }
                };
                Ok(ReceivedMessage::AddSavedState(AddSavedStateMessage {
                    name,
                    state: take_object(&mut payload, "state").unwrap_or_default(),
                }))
            }
            _ => Err(FrameError::UnknownEvent(frame.event)),
        }
    }
}

fn take_object(payload: &mut Document, key: &str) -> Option<Document> {
    match payload.remove(key) {
        Some(Value::Object(map)) => Some(map),
        _ => None,
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeMessage {
    pub id: ParticipantId,
    pub state: Document,
    pub users: Vec<Participant>,
    pub saved_states: SavedStates,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ParticipantsChangedMessage {
    pub users: Vec<Participant>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StateChangedMessage {
    pub state: Document,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedStatesChangedMessage {
    pub saved_states: SavedStates,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VolumeChangedMessage {
    pub volumes: BTreeMap<ParticipantId, u8>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PersistenceFailedMessage {
    pub message: String,
    pub attempt: u32,
    pub at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum SendMessage {
    Welcome(WelcomeMessage),
    ParticipantsChanged(ParticipantsChangedMessage),
    StateChanged(StateChangedMessage),
    SavedStatesChanged(SavedStatesChangedMessage),
    VolumeChanged(VolumeChangedMessage),
    PersistenceFailed(PersistenceFailedMessage),
}

impl SendMessage {
    pub fn name(&self) -> &'static str {
        match self {
            SendMessage::Welcome(_) => "welcome",
            SendMessage::ParticipantsChanged(_) => "participants-changed",
            SendMessage::StateChanged(_) => "state-changed",
            SendMessage::SavedStatesChanged(_) => "saved-states-changed",
            SendMessage::VolumeChanged(_) => "volume-changed",
            SendMessage::PersistenceFailed(_) => "persistence-failed",
        }
    }
}
