use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

pub type ParticipantId = u32;

const ADJECTIVES: &[&str] = &[
    "Amber", "Brave", "Calm", "Dizzy", "Eager", "Fuzzy", "Gentle", "Happy", "Jolly", "Lucky",
    "Mellow", "Nimble", "Quiet", "Rusty", "Sunny", "Witty",
];

const ANIMALS: &[&str] = &[
    "Badger", "Crane", "Dolphin", "Ferret", "Gecko", "Heron", "Koala", "Lynx", "Marmot", "Narwhal",
    "Otter", "Puffin", "Quokka", "Raccoon", "Salmon", "Walrus",
];

/// Random picks tried before falling back to a scan of every name.
const RANDOM_NAME_ATTEMPTS: usize = 16;

/// A connected participant.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub display_identity: String,
}

/// Tracks the currently connected participants in connection order.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    participants: Vec<Participant>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a new participant with the lowest free id and a display
    /// identity nobody currently connected is using.
    pub fn join(&mut self) -> Participant {
        let participant = Participant {
            id: self.lowest_free_id(),
            display_identity: self.fresh_identity(),
        };
        debug!(id = participant.id, name = %participant.display_identity, "Participant joined");
        self.participants.push(participant.clone());
        participant
    }

    /// Remove a participant. Returns false if it was already gone.
    pub fn leave(&mut self, id: ParticipantId) -> bool {
        let before = self.participants.len();
        self.participants.retain(|p| p.id != id);
        self.participants.len() != before
    }

    pub fn list(&self) -> Vec<Participant> {
        self.participants.clone()
    }

    pub fn ids(&self) -> Vec<ParticipantId> {
        self.participants.iter().map(|p| p.id).collect()
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.participants.iter().any(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    fn lowest_free_id(&self) -> ParticipantId {
        let taken: HashSet<ParticipantId> = self.participants.iter().map(|p| p.id).collect();
        (1..).find(|id| !taken.contains(id)).unwrap_or(ParticipantId::MAX)
    }

    fn fresh_identity(&self) -> String {
        let taken: HashSet<&str> = self
            .participants
            .iter()
            .map(|p| p.display_identity.as_str())
            .collect();

        let mut rng = rand::rng();
        for _ in 0..RANDOM_NAME_ATTEMPTS {
            if let (Some(adj), Some(animal)) = (ADJECTIVES.choose(&mut rng), ANIMALS.choose(&mut rng)) {
                let name = format!("{adj} {animal}");
                if !taken.contains(name.as_str()) {
                    return name;
                }
            }
        }

        // Crowded room: walk every combination, then number them.
        let combos = ADJECTIVES
            .iter()
            .flat_map(|adj| ANIMALS.iter().map(move |animal| format!("{adj} {animal}")));
        for name in combos {
            if !taken.contains(name.as_str()) {
                return name;
            }
        }
        (2..)
            .map(|n| format!("Guest {n}"))
            .find(|name| !taken.contains(name.as_str()))
            .unwrap_or_else(|| "Guest".to_string())
    }
}
