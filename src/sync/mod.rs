//! Debounced write-back of a line's selected options to its cart record.
//!
//! Each configurable line owns one [`PersistenceSynchronizer`]. Every settled
//! mutation is projected into a [`CartOptionsUpdate`], fingerprinted and, if
//! it differs from the last successful write, sent to the [`CartRecordApi`].
//! Failures are not retried: the next mutation (or an explicit
//! [`PersistenceSynchronizer::save_now`]) tries again.
//!
//! Writes for one line go out one at a time in revision order, and the
//! ledger only ever moves forward, so a slow older write can neither land
//! after a newer one nor make a later payload look already sent.

mod scheduler;

pub use scheduler::DebounceScheduler;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

use crate::domain::aggregates::selection::{SelectionStore, StorePhase};
use crate::domain::options::{self, CartOptionsUpdate};
use crate::domain::value_objects::CartLineId;
use crate::StoreError;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(700);

/// The remote cart record's update calls.
#[async_trait]
pub trait CartRecordApi: Send + Sync {
    async fn update_options(&self, line: &CartLineId, update: &CartOptionsUpdate) -> Result<(), StoreError>;
    async fn update_quantity(&self, line: &CartLineId, quantity: u32) -> Result<(), StoreError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    pub debounce: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self { Self { debounce: DEFAULT_DEBOUNCE } }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Idle,
    Scheduled { revision: u64 },
    Persisting { revision: u64 },
    Saved { revision: u64 },
    /// Payload matched the last successful write.
    Skipped { revision: u64 },
    Failed { revision: u64, message: String },
}

/// Why a mutation did or did not arm the timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Scheduled,
    Hydrating,
    /// The store is not bound to this synchronizer's cart line.
    Unbound,
    NotReady,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    Skipped,
    Failed,
}

struct SyncJob {
    revision: u64,
    update: CartOptionsUpdate,
    baseline_quantity: u32,
}

#[derive(Default)]
struct Ledger {
    last_sent: Option<String>,
    /// Revision `last_sent` was built from.
    sent_revision: u64,
    synced_quantity: Option<u32>,
}

struct Shared {
    line_id: CartLineId,
    api: Arc<dyn CartRecordApi>,
    ledger: Mutex<Ledger>,
    /// Held for a whole dispatch.
    writer: tokio::sync::Mutex<()>,
    status: watch::Sender<SyncStatus>,
}

pub struct PersistenceSynchronizer {
    shared: Arc<Shared>,
    scheduler: Arc<DebounceScheduler<CartLineId>>,
}

impl PersistenceSynchronizer {
    pub fn new(line_id: CartLineId, api: Arc<dyn CartRecordApi>, config: SyncConfig) -> Self {
        let (status, _) = watch::channel(SyncStatus::Idle);
        let shared = Arc::new(Shared {
            line_id,
            api,
            ledger: Mutex::new(Ledger::default()),
            writer: tokio::sync::Mutex::new(()),
            status,
        });
        Self { shared, scheduler: Arc::new(DebounceScheduler::new(config.debounce)) }
    }

    pub fn line_id(&self) -> &CartLineId { &self.shared.line_id }
    pub fn status(&self) -> SyncStatus { self.shared.status.borrow().clone() }
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> { self.shared.status.subscribe() }
    pub fn is_pending(&self) -> bool { self.scheduler.is_armed(&self.shared.line_id) }

    /// Records the hydrated state as already saved, so an untouched reload
    /// never writes itself back. A store holding unsaved edits is not
    /// recorded; returns whether the state was.
    pub fn prime(&self, store: &SelectionStore) -> bool {
        let Some(catalog) = store.catalog() else { return false };
        let mut ledger = self.shared.ledger();
        ledger.synced_quantity = Some(store.quantity());
        if store.has_unsaved_changes() {
            return false;
        }
        let update = options::build_update(catalog, store.selection(), store.labels());
        ledger.last_sent = update.fingerprint().ok();
        ledger.sent_revision = store.revision();
        true
    }

    /// (Re)arms the debounce timer with the store's current state.
    pub fn notify(&self, store: &SelectionStore) -> ScheduleOutcome {
        let job = match self.prepare(store) {
            Ok(job) => job,
            Err(outcome) => {
                tracing::debug!(line_id = %self.shared.line_id, ?outcome, "not scheduling save");
                return outcome;
            }
        };
        self.shared.status.send_replace(SyncStatus::Scheduled { revision: job.revision });
        let shared = Arc::clone(&self.shared);
        self.scheduler.arm(self.shared.line_id.clone(), async move {
            shared.dispatch(job).await;
        });
        ScheduleOutcome::Scheduled
    }

    /// Explicit save: drops the pending timer and writes immediately.
    pub async fn save_now(&self, store: &SelectionStore) -> Result<DispatchOutcome, ScheduleOutcome> {
        let job = self.prepare(store)?;
        self.scheduler.disarm(&self.shared.line_id);
        Ok(self.shared.dispatch(job).await)
    }

    fn prepare(&self, store: &SelectionStore) -> Result<SyncJob, ScheduleOutcome> {
        match store.phase() {
            StorePhase::Hydrating => return Err(ScheduleOutcome::Hydrating),
            StorePhase::Uninitialized => return Err(ScheduleOutcome::NotReady),
            _ => {}
        }
        if store.line_id() != Some(&self.shared.line_id) {
            return Err(ScheduleOutcome::Unbound);
        }
        let catalog = store.catalog().ok_or(ScheduleOutcome::NotReady)?;
        Ok(SyncJob {
            revision: store.revision(),
            update: options::build_update(catalog, store.selection(), store.labels()),
            baseline_quantity: store.quantity(),
        })
    }
}

impl Drop for PersistenceSynchronizer {
    fn drop(&mut self) {
        self.scheduler.disarm(&self.shared.line_id);
    }
}

impl Shared {
    fn ledger(&self) -> std::sync::MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn dispatch(&self, job: SyncJob) -> DispatchOutcome {
        let _writing = self.writer.lock().await;
        let revision = job.revision;
        let fingerprint = match job.update.fingerprint() {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                tracing::warn!(line_id = %self.line_id, error = %e, "could not fingerprint options payload");
                self.status.send_replace(SyncStatus::Failed { revision, message: e.to_string() });
                return DispatchOutcome::Failed;
            }
        };

        let (stale, unchanged) = {
            let ledger = self.ledger();
            (revision < ledger.sent_revision, ledger.last_sent.as_deref() == Some(fingerprint.as_str()))
        };
        if stale {
            tracing::debug!(line_id = %self.line_id, revision, "newer options already saved, dropping write");
            return DispatchOutcome::Skipped;
        }
        if unchanged {
            tracing::debug!(line_id = %self.line_id, revision, "options unchanged since last save, skipping");
            self.status.send_replace(SyncStatus::Skipped { revision });
            return DispatchOutcome::Skipped;
        }

        self.status.send_replace(SyncStatus::Persisting { revision });
        if let Err(e) = self.api.update_options(&self.line_id, &job.update).await {
            tracing::warn!(line_id = %self.line_id, revision, error = %e, "saving selected options failed");
            self.status.send_replace(SyncStatus::Failed { revision, message: e.to_string() });
            return DispatchOutcome::Failed;
        }

        let quantity_change = {
            let mut ledger = self.ledger();
            ledger.last_sent = Some(fingerprint);
            ledger.sent_revision = revision;
            let known = ledger.synced_quantity.unwrap_or(job.baseline_quantity);
            job.update.quantity.filter(|q| *q != known)
        };
        tracing::info!(line_id = %self.line_id, revision, options = job.update.selected_options.len(), "selected options saved");

        if let Some(quantity) = quantity_change {
            let synced = self.api.update_quantity(&self.line_id, quantity).await;
            match synced {
                Ok(()) => {
                    self.ledger().synced_quantity = Some(quantity);
                }
                Err(e) => tracing::warn!(line_id = %self.line_id, quantity, error = %e, "quantity sync failed"),
            }
        }

        self.status.send_replace(SyncStatus::Saved { revision });
        DispatchOutcome::Sent
    }
}
