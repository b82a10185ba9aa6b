//! Background writer that keeps the saved states file in step with the
//! in-memory catalog without making the room wait on disk.
//!
//! Submissions go through a `watch` channel, so at most one snapshot is ever
//! pending and a burst of saves collapses into a single write of the newest
//! catalog. Only one write is in flight at a time: each write runs as its own
//! task, and a write that outlives its timeout is reported but still awaited
//! before the next attempt touches the file.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use super::CatalogStore;
use crate::error::PersistenceError;
use crate::room::SavedStates;

#[derive(Debug, Clone, Copy)]
pub struct WriterOptions {
    /// Upper bound on a single write.
    pub timeout: Duration,
    /// Pause before retrying a failed write.
    pub retry_delay: Duration,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// A write that did not make it to disk.
#[derive(Debug)]
pub struct WriteFailure {
    pub generation: u64,
    /// Consecutive failed attempts, starting at 1.
    pub attempt: u32,
    pub error: PersistenceError,
}

#[derive(Debug, Clone, Default)]
struct Pending {
    generation: u64,
    catalog: Option<Arc<SavedStates>>,
}

/// Handle used to submit catalog snapshots for persistence.
pub struct CatalogWriter {
    pending: watch::Sender<Pending>,
    persisted: watch::Receiver<u64>,
}

impl CatalogWriter {
    /// Start the writer task. Failed writes are reported on the returned
    /// receiver.
    pub fn spawn(
        store: Arc<dyn CatalogStore>,
        options: WriterOptions,
    ) -> (Self, mpsc::UnboundedReceiver<WriteFailure>) {
        let (pending_tx, pending_rx) = watch::channel(Pending::default());
        let (persisted_tx, persisted_rx) = watch::channel(0u64);
        let (failure_tx, failure_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_writer(store, options, pending_rx, persisted_tx, failure_tx));

        (
            Self {
                pending: pending_tx,
                persisted: persisted_rx,
            },
            failure_rx,
        )
    }

    /// Queue `catalog` for writing and return its generation number.
    pub fn submit(&self, catalog: SavedStates) -> u64 {
        let catalog = Arc::new(catalog);
        let mut generation = 0;
        self.pending.send_modify(|pending| {
            pending.generation += 1;
            pending.catalog = Some(catalog);
            generation = pending.generation;
        });
        generation
    }

    /// Generation of the newest submission, 0 if nothing was submitted.
    pub fn latest_generation(&self) -> u64 {
        self.pending.borrow().generation
    }

    /// Generation of the newest snapshot known to be on disk.
    pub fn persisted_generation(&self) -> u64 {
        *self.persisted.borrow()
    }

    /// Wait until `generation` (or a later one) has been written. Returns
    /// false if the writer stopped first.
    pub async fn wait_persisted(&self, generation: u64) -> bool {
        let mut persisted = self.persisted.clone();
        let reached = persisted.wait_for(|g| *g >= generation).await.is_ok();
        reached
    }
}

async fn run_writer(
    store: Arc<dyn CatalogStore>,
    options: WriterOptions,
    mut pending: watch::Receiver<Pending>,
    persisted: watch::Sender<u64>,
    failures: mpsc::UnboundedSender<WriteFailure>,
) {
    while pending.changed().await.is_ok() {
        let mut attempt = 0u32;
        loop {
            let Pending { generation, catalog } = pending.borrow_and_update().clone();
            let Some(catalog) = catalog else { break };
            attempt += 1;

            let mut write = spawn_save(store.clone(), catalog);
            match tokio::time::timeout(options.timeout, &mut write).await {
                Ok(joined) => match flatten(joined) {
                    Ok(()) => {
                        if attempt > 1 {
                            info!(generation, attempt, "Saved states written after retry");
                        } else {
                            debug!(generation, "Saved states written");
                        }
                        persisted.send_replace(generation);
                        break;
                    }
                    Err(error) => report_failure(&failures, generation, attempt, error),
                },
                Err(_) => {
                    report_failure(
                        &failures,
                        generation,
                        attempt,
                        PersistenceError::Timeout(options.timeout),
                    );
                    // The abandoned write still owns the temp file.
                    match flatten(write.await) {
                        Ok(()) => {
                            info!(generation, attempt, "Timed out saved states write finished late");
                            persisted.send_replace(generation);
                            break;
                        }
                        Err(error) => {
                            warn!(generation, attempt, "Timed out saved states write failed: {}", error)
                        }
                    }
                }
            }

            // Retry after the delay, or sooner with a newer snapshot.
            tokio::select! {
                _ = tokio::time::sleep(options.retry_delay) => {}
                changed = pending.changed() => {
                    if changed.is_err() {
                        warn!(generation, "Writer closed with saved states not on disk");
                        return;
                    }
                }
            }
        }
    }
    debug!("Saved states writer stopped");
}

fn spawn_save(
    store: Arc<dyn CatalogStore>,
    catalog: Arc<SavedStates>,
) -> JoinHandle<Result<(), PersistenceError>> {
    tokio::spawn(async move { store.save(&catalog).await })
}

fn flatten(joined: Result<Result<(), PersistenceError>, JoinError>) -> Result<(), PersistenceError> {
    joined?
}

fn report_failure(
    failures: &mpsc::UnboundedSender<WriteFailure>,
    generation: u64,
    attempt: u32,
    error: PersistenceError,
) {
    error!(generation, attempt, "Failed to write saved states: {}", error);
    // Nobody listening is fine; the write is still retried.
    let _ = failures.send(WriteFailure {
        generation,
        attempt,
        error,
    });
}
