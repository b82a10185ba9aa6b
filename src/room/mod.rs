//! The single room's data: who is here, the shared document, and the
//! catalog of saved states.

pub mod catalog;
pub mod document;
pub mod presence;

pub use catalog::{SavedStateCatalog, SavedStates};
pub use document::{Document, StateStore};
pub use presence::{Participant, ParticipantId, PresenceRegistry};
