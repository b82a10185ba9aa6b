//! Simulated per-participant volume feed.
//!
//! Purely cosmetic: it gives the UI something to animate and takes no part
//! in keeping the shared state consistent.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use super::coordinator::Room;
use crate::room::ParticipantId;

/// Volume levels are drawn from `0..VOLUME_LEVELS`.
pub const VOLUME_LEVELS: u8 = 6;

const MIN_PERIOD: Duration = Duration::from_millis(10);

pub type Volumes = BTreeMap<ParticipantId, u8>;

pub fn random_volumes(ids: &[ParticipantId]) -> Volumes {
    let mut rng = rand::rng();
    ids.iter()
        .map(|id| (*id, rng.random_range(0..VOLUME_LEVELS)))
        .collect()
}

/// Periodic volume updates for one participant. The task stops when the
/// emitter is dropped or the owner leaves the room.
pub struct SignalEmitter {
    task: JoinHandle<()>,
}

impl SignalEmitter {
    /// First update goes out one full `period` after the start.
    pub fn start(room: Arc<Room>, owner: ParticipantId, period: Duration) -> Self {
        let period = period.max(MIN_PERIOD);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !room.emit_volumes(owner).await {
                    debug!(owner, "Owner left, stopping volume feed");
                    break;
                }
            }
        });
        Self { task }
    }
}

impl Drop for SignalEmitter {
    fn drop(&mut self) {
        self.task.abort();
    }
}
