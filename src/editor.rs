//! One configurable line: catalog, selection store and (when the line already
//! lives in a cart) its synchronizer.

use std::sync::Arc;
use tokio::sync::watch;

use crate::domain::aggregates::cart::CartLineItem;
use crate::domain::aggregates::selection::{Selection, SelectionError, SelectionStore};
use crate::domain::catalog::{CatalogLoader, ProductSnapshot};
use crate::domain::options::FieldLabels;
use crate::domain::pricing::{self, LineFacts, PricingResult};
use crate::domain::validation;
use crate::domain::value_objects::{Money, ProductId};
use crate::sync::{CartRecordApi, DispatchOutcome, PersistenceSynchronizer, ScheduleOutcome, SyncConfig, SyncStatus};
use crate::Result;

pub struct LineEditor {
    store: SelectionStore,
    persisted_unit_price: Option<Money>,
    persisted_line_total: Option<Money>,
    sync: Option<PersistenceSynchronizer>,
    status: Option<watch::Receiver<SyncStatus>>,
}

impl LineEditor {
    /// Loads the catalog (reusing `snapshot`, or the product embedded in
    /// `saved`, when present) and hydrates from `saved` if given.
    pub async fn open(
        loader: &CatalogLoader,
        product_id: &ProductId,
        snapshot: Option<ProductSnapshot>,
        saved: Option<&CartLineItem>,
        labels: &FieldLabels,
    ) -> Result<Self> {
        let snapshot = snapshot.or_else(|| saved.and_then(|l| l.product.clone()));
        let loaded = loader.load(product_id, snapshot).await?;

        let mut store = SelectionStore::new(saved.map(|l| l.id.clone())).with_labels(labels.clone());
        store.attach(loaded, saved)?;

        Ok(Self {
            store,
            persisted_unit_price: saved.and_then(|l| l.unit_price),
            persisted_line_total: saved.and_then(|l| l.line_total),
            sync: None,
            status: None,
        })
    }

    /// Starts autosaving to the cart record. Lines not yet in a cart have
    /// nothing to bind to; returns whether a synchronizer was attached.
    /// Edits made before binding are scheduled for saving right away.
    pub fn bind(&mut self, api: Arc<dyn CartRecordApi>, config: SyncConfig) -> bool {
        let Some(line_id) = self.store.line_id().cloned() else { return false };
        let sync = PersistenceSynchronizer::new(line_id, api, config);
        if !sync.prime(&self.store) {
            sync.notify(&self.store);
        }
        self.status = Some(sync.subscribe());
        self.sync = Some(sync);
        true
    }

    pub fn store(&self) -> &SelectionStore { &self.store }
    pub fn selection(&self) -> &Selection { self.store.selection() }

    /// Applies one setter, then (re)arms the autosave. Returns the scheduling
    /// outcome when a synchronizer is bound.
    pub fn edit<F>(&mut self, mutation: F) -> std::result::Result<Option<ScheduleOutcome>, SelectionError>
    where
        F: FnOnce(&mut SelectionStore) -> std::result::Result<(), SelectionError>,
    {
        mutation(&mut self.store)?;
        Ok(self.sync.as_ref().map(|sync| sync.notify(&self.store)))
    }

    pub fn missing_fields(&self) -> Vec<String> {
        match self.store.catalog() {
            Some(catalog) => validation::validate_with_labels(catalog, self.store.selection(), self.store.labels()),
            None => Vec::new(),
        }
    }

    pub fn is_checkout_eligible(&self) -> bool {
        self.store.catalog().is_some() && self.missing_fields().is_empty()
    }

    pub fn pricing(&self) -> PricingResult {
        let Some(product) = self.store.product() else { return PricingResult::default() };
        let facts = LineFacts {
            quantity: self.store.quantity(),
            persisted_unit_price: self.persisted_unit_price,
            persisted_line_total: self.persisted_line_total,
        };
        pricing::price_with_labels(&product.catalog, self.store.selection(), &product.prices, facts, self.store.labels())
    }

    /// Explicit save action; `None` when the line is not bound.
    pub async fn save_now(&mut self) -> Option<std::result::Result<DispatchOutcome, ScheduleOutcome>> {
        let outcome = self.sync.as_ref()?.save_now(&self.store).await;
        self.refresh_sync_status();
        Some(outcome)
    }

    /// Folds the latest synchronizer status into the store's phase.
    pub fn refresh_sync_status(&mut self) -> Option<SyncStatus> {
        let status = self.status.as_mut()?.borrow_and_update().clone();
        match &status {
            SyncStatus::Persisting { revision } => self.store.mark_persisting(*revision),
            SyncStatus::Saved { revision } | SyncStatus::Skipped { revision } => self.store.mark_persisted(*revision),
            SyncStatus::Failed { revision, .. } => self.store.mark_persist_failed(*revision),
            SyncStatus::Idle | SyncStatus::Scheduled { .. } => {}
        }
        Some(status)
    }
}
