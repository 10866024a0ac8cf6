//! DataController — query state over any adapter
//!
//! Owns the current `DataQuery` and a state snapshot, and enforces the
//! request lifecycle: a new fetch supersedes the previous one (last write
//! wins, by generation), results landing after shutdown are discarded, and
//! mutations resynchronize by refetching instead of patching locally.

use crate::adapter::{CancellationToken, ChangeListener, DataAdapter, Operation, Subscription};
use crate::error::{AdapterError, AdapterResult};
use crate::query::{DataQuery, DataResponse, QueryPatch, Record, RecordKey};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Where the controller is in its load cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPhase {
    /// No fetch issued yet
    #[default]
    Idle,
    Loading,
    Loaded,
    Errored,
}

/// Snapshot of the controller's observable state.
#[derive(Debug, Clone, Default)]
pub struct ControllerState {
    pub data: Vec<Record>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub phase: LoadPhase,
    pub error: Option<AdapterError>,
    pub metadata: Option<Map<String, Value>>,
}

impl ControllerState {
    pub fn is_loading(&self) -> bool {
        self.phase == LoadPhase::Loading
    }
}

/// Callback fired after a successful mutation, before the resync fetch.
pub type SuccessCallback = Arc<dyn Fn(Operation, Option<&Record>) + Send + Sync>;
/// Callback fired when any operation fails.
pub type ErrorCallback = Arc<dyn Fn(&AdapterError) + Send + Sync>;
/// Callback fired when a realtime event delivered a fresh page.
pub type DataChangeCallback = Arc<dyn Fn(&DataResponse) + Send + Sync>;

/// Consumer options.
#[derive(Clone, Default)]
pub struct ControllerOptions {
    /// Subscribe to realtime push when the adapter supports it.
    pub realtime: bool,
    pub on_success: Option<SuccessCallback>,
    pub on_error: Option<ErrorCallback>,
    pub on_data_change: Option<DataChangeCallback>,
}

/// Stateful consumer over one adapter.
///
/// Cheap to clone; clones share state. Construct with
/// [`DataController::new`], then [`start`](Self::start) to issue the
/// initial fetch and (optionally) attach realtime. All state writes are
/// suppressed once [`shutdown`](Self::shutdown) has run.
#[derive(Clone)]
pub struct DataController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    adapter: Arc<dyn DataAdapter>,
    options: ControllerOptions,
    state: Mutex<ControllerState>,
    query: Mutex<DataQuery>,
    generation: AtomicU64,
    liveness: CancellationToken,
    subscription: Mutex<Option<Subscription>>,
}

impl DataController {
    pub fn new(
        adapter: Arc<dyn DataAdapter>,
        initial_query: DataQuery,
        options: ControllerOptions,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                adapter,
                options,
                state: Mutex::new(ControllerState::default()),
                query: Mutex::new(initial_query),
                generation: AtomicU64::new(0),
                liveness: CancellationToken::new(),
                subscription: Mutex::new(None),
            }),
        }
    }

    /// Issue the initial fetch and attach the realtime subscription when
    /// requested and supported.
    pub async fn start(&self) -> AdapterResult<DataResponse> {
        if self.inner.options.realtime && self.inner.adapter.supports(Operation::Subscribe) {
            let inner = Arc::clone(&self.inner);
            let listener: ChangeListener = Arc::new(move |response| {
                inner.apply_push(response);
            });
            let subscription = self.inner.adapter.subscribe(listener).await?;
            *self.inner.subscription.lock().expect("subscription lock") = Some(subscription);
        }
        self.refetch(None).await
    }

    /// Current state snapshot.
    pub fn state(&self) -> ControllerState {
        self.inner.state.lock().expect("state lock").clone()
    }

    /// The query currently held.
    pub fn query(&self) -> DataQuery {
        self.inner.query.lock().expect("query lock").clone()
    }

    /// Merge `patch` into the held query and fetch.
    ///
    /// Any in-flight fetch is superseded: its eventual result is reported
    /// to its own caller as a `Network` cancellation but never reaches
    /// state. After shutdown the result is discarded without callbacks.
    pub async fn refetch(&self, patch: Option<QueryPatch>) -> AdapterResult<DataResponse> {
        self.inner.refetch(patch).await
    }

    /// Create via the adapter, then refetch to resynchronize.
    ///
    /// Returns `Ok(None)` (with a warning) when the adapter does not
    /// support creation.
    pub async fn create(&self, item: Record) -> AdapterResult<Option<Record>> {
        if !self.inner.adapter.supports(Operation::Create) {
            tracing::warn!("adapter does not support create; ignoring");
            return Ok(None);
        }
        match self.inner.adapter.create(item).await {
            Ok(record) => {
                self.inner.notify_success(Operation::Create, record.as_ref());
                self.inner.resync().await;
                Ok(record)
            }
            Err(err) => {
                self.inner.report_error(&err);
                Err(err)
            }
        }
    }

    /// Update via the adapter, then refetch to resynchronize.
    pub async fn update(&self, key: &RecordKey, patch: Record) -> AdapterResult<Option<Record>> {
        if !self.inner.adapter.supports(Operation::Update) {
            tracing::warn!("adapter does not support update; ignoring");
            return Ok(None);
        }
        match self.inner.adapter.update(key, patch).await {
            Ok(record) => {
                self.inner.notify_success(Operation::Update, record.as_ref());
                self.inner.resync().await;
                Ok(record)
            }
            Err(err) => {
                self.inner.report_error(&err);
                Err(err)
            }
        }
    }

    /// Delete via the adapter, then refetch. `Ok(false)` when unsupported.
    pub async fn delete_item(&self, key: &RecordKey) -> AdapterResult<bool> {
        if !self.inner.adapter.supports(Operation::Delete) {
            tracing::warn!("adapter does not support delete; ignoring");
            return Ok(false);
        }
        match self.inner.adapter.delete(key).await {
            Ok(()) => {
                self.inner.notify_success(Operation::Delete, None);
                self.inner.resync().await;
                Ok(true)
            }
            Err(err) => {
                self.inner.report_error(&err);
                Err(err)
            }
        }
    }

    /// Bulk delete via the adapter, then refetch. `Ok(false)` when
    /// unsupported.
    pub async fn bulk_delete(&self, keys: &[RecordKey]) -> AdapterResult<bool> {
        if !self.inner.adapter.supports(Operation::BulkDelete) {
            tracing::warn!("adapter does not support bulk_delete; ignoring");
            return Ok(false);
        }
        match self.inner.adapter.bulk_delete(keys).await {
            Ok(()) => {
                self.inner.notify_success(Operation::BulkDelete, None);
                self.inner.resync().await;
                Ok(true)
            }
            Err(err) => {
                self.inner.report_error(&err);
                Err(err)
            }
        }
    }

    /// Tear down: supersede any in-flight fetch, drop the realtime
    /// subscription, and freeze state.
    pub fn shutdown(&self) {
        self.inner.liveness.cancel();
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(subscription) = self
            .inner
            .subscription
            .lock()
            .expect("subscription lock")
            .take()
        {
            subscription.unsubscribe();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.liveness.is_cancelled()
    }
}

impl ControllerInner {
    async fn refetch(&self, patch: Option<QueryPatch>) -> AdapterResult<DataResponse> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let query = {
            let mut held = self.query.lock().expect("query lock");
            if let Some(patch) = patch {
                patch.apply(&mut held);
            }
            held.clone()
        };

        self.with_live_state(|state| {
            state.phase = LoadPhase::Loading;
            state.error = None;
        });

        let result = self.adapter.fetch(&query).await;

        if self.liveness.is_cancelled() {
            // Torn down mid-flight: discard entirely, no callbacks.
            return Err(AdapterError::network("fetch discarded: consumer shut down"));
        }
        if self.generation.load(Ordering::SeqCst) != generation {
            return Err(AdapterError::network("fetch superseded by a newer request"));
        }

        match result {
            Ok(response) => {
                self.with_live_state(|state| {
                    state.data = response.data.clone();
                    state.total = response.total;
                    state.page = response.page;
                    state.page_size = response.page_size;
                    state.metadata = response.metadata.clone();
                    state.phase = LoadPhase::Loaded;
                    state.error = None;
                });
                Ok(response)
            }
            Err(err) => {
                self.report_error(&err);
                Err(err)
            }
        }
    }

    /// A realtime page replaces state wholesale (delivery order wins).
    fn apply_push(&self, response: DataResponse) {
        if self.liveness.is_cancelled() {
            return;
        }
        self.with_live_state(|state| {
            state.data = response.data.clone();
            state.total = response.total;
            state.page = response.page;
            state.page_size = response.page_size;
            state.metadata = response.metadata.clone();
            state.phase = LoadPhase::Loaded;
            state.error = None;
        });
        if let Some(on_data_change) = &self.options.on_data_change {
            on_data_change(&response);
        }
    }

    async fn resync(&self) {
        // Refetch errors already landed in state via report_error; the
        // mutation itself succeeded, so they are not propagated here.
        let _ = self.refetch(None).await;
    }

    fn notify_success(&self, operation: Operation, record: Option<&Record>) {
        if self.liveness.is_cancelled() {
            return;
        }
        if let Some(on_success) = &self.options.on_success {
            on_success(operation, record);
        }
    }

    fn report_error(&self, err: &AdapterError) {
        if self.liveness.is_cancelled() {
            return;
        }
        self.with_live_state(|state| {
            state.phase = LoadPhase::Errored;
            state.error = Some(err.clone());
        });
        if let Some(on_error) = &self.options.on_error {
            on_error(err);
        }
    }

    fn with_live_state(&self, apply: impl FnOnce(&mut ControllerState)) {
        if self.liveness.is_cancelled() {
            return;
        }
        let mut state = self.state.lock().expect("state lock");
        apply(&mut state);
    }
}

impl Drop for ControllerInner {
    fn drop(&mut self) {
        self.liveness.cancel();
    }
}
