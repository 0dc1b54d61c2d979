//! Picker session: state, transitions, and dispatch
//!
//! One `PickerSession` per widget instance. It owns the committed selection,
//! the candidate index, the provider, and the debounced query pipeline, and
//! it is the only place store mutations are dispatched from. All mutating
//! methods take `&mut self`, so reconcile batches are serialized by
//! construction and a stale response can never overwrite newer state.
//!
//! Backend failures are caught and logged here; the only errors callers see
//! are the recoverable ones: a label that cannot be resolved and metadata
//! that has not resolved yet.

use crate::backend::StoreBackend;
use crate::config::PickerConfig;
use crate::debounce::QueryDebouncer;
use crate::error::PickerResult;
use crate::provider::{build_provider, SearchProvider};
use crate::reconcile::{
    commit_selection, reconcile, CommitReport, MutationKind, MutationOutcome, ReconcilePlan,
};
use crate::types::{CandidateIndex, EntityMetadata, RecordRef, Selection};
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Notifications for the host surface
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Work is in flight; drives a progress indicator
    Busy(bool),
    /// The candidate list changed. `query` is `None` for the default view.
    Candidates {
        query: Option<String>,
        records: Vec<RecordRef>,
        total: Option<u64>,
    },
    /// The selection was seeded from the host's existing relationships
    SelectionLoaded { selection: Vec<RecordRef> },
    /// A reconcile batch settled and the selection was committed
    SelectionCommitted {
        selection: Vec<RecordRef>,
        report: CommitReport,
    },
}

/// Metadata resolved once per session
#[derive(Debug, Clone)]
struct ReadyState {
    host: EntityMetadata,
    target: EntityMetadata,
}

/// A live picker instance bound to one host record and relationship
///
/// Construct with [`PickerSession::new`] inside a Tokio runtime (the query
/// pipeline owns a background task). Feed keystrokes through
/// [`submit_input`](Self::submit_input), drive settled queries with
/// [`process_settled`](Self::process_settled), and change the selection with
/// [`set_selection`](Self::set_selection).
pub struct PickerSession<B> {
    backend: Arc<B>,
    config: PickerConfig,
    ready: Option<ReadyState>,
    provider: Option<SearchProvider<B>>,
    selection: Selection,
    index: CandidateIndex,
    latest_query: String,
    busy: bool,
    seeded: bool,
    debouncer: QueryDebouncer,
    settled_rx: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl<B: StoreBackend + 'static> PickerSession<B> {
    /// Create a session and the event stream the host listens on
    pub fn new(
        backend: Arc<B>,
        config: PickerConfig,
    ) -> PickerResult<(Self, mpsc::UnboundedReceiver<SessionEvent>)> {
        config.validate()?;
        let (debouncer, settled_rx) = QueryDebouncer::new(config.debounce);
        let (events, events_rx) = mpsc::unbounded_channel();

        let session = Self {
            backend,
            config,
            ready: None,
            provider: None,
            selection: Selection::new(),
            index: CandidateIndex::default(),
            latest_query: String::new(),
            busy: false,
            seeded: false,
            debouncer,
            settled_rx,
            events,
        };
        Ok((session, events_rx))
    }

    /// The committed selection
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// The most recent candidate snapshot
    pub fn candidates(&self) -> &CandidateIndex {
        &self.index
    }

    /// Whether a batch or search is in flight
    pub fn busy(&self) -> bool {
        self.busy
    }

    /// Whether metadata has resolved and a provider exists
    pub fn is_ready(&self) -> bool {
        self.ready.is_some()
    }

    /// The session configuration
    pub fn config(&self) -> &PickerConfig {
        &self.config
    }

    /// Resolved metadata for the related record type, once ready
    pub fn target_metadata(&self) -> Option<&EntityMetadata> {
        self.ready.as_ref().map(|r| &r.target)
    }

    /// Resolve metadata and build the provider, once
    ///
    /// Every public entry point goes through here, so a failed resolution is
    /// retried on the next call rather than wedging the session.
    async fn ensure_ready(&mut self) -> PickerResult<ReadyState> {
        if let Some(ready) = &self.ready {
            return Ok(ready.clone());
        }

        let target = self.backend.resolve(&self.config.target_type).await?;
        let host = self.backend.resolve(&self.config.host_type).await?;
        info!(
            target = %target.logical_name,
            host = %host.logical_name,
            "metadata resolved"
        );

        self.provider = Some(build_provider(
            self.backend.clone(),
            target.clone(),
            self.config.provider.clone(),
        ));
        let ready = ReadyState { host, target };
        self.ready = Some(ready.clone());
        Ok(ready)
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("event receiver dropped");
        }
    }

    fn set_busy(&mut self, busy: bool) {
        if self.busy != busy {
            self.busy = busy;
            self.emit(SessionEvent::Busy(busy));
        }
    }

    /// Load the default candidate view and, on first success, seed the
    /// selection from the host's existing relationships
    ///
    /// Backend failures are logged and degrade to an unchanged candidate
    /// list or an empty starting selection; only unresolved metadata is
    /// returned, and a later call retries it.
    pub async fn refresh(&mut self) -> PickerResult<()> {
        let ready = self.ensure_ready().await?;
        self.set_busy(true);

        if let Some(provider) = self.provider.as_ref() {
            match provider.initial_results().await {
                Ok(hits) => {
                    self.index = CandidateIndex::new(hits.records.clone());
                    self.emit(SessionEvent::Candidates {
                        query: None,
                        records: hits.records,
                        total: hits.total,
                    });
                }
                Err(e) => {
                    warn!(error = %e, "initial candidate fetch failed");
                }
            }
        }

        if !self.seeded {
            self.seed_selection(&ready).await;
        }

        self.set_busy(false);
        Ok(())
    }

    async fn seed_selection(&mut self, ready: &ReadyState) {
        match self
            .backend
            .load_related(
                &ready.host,
                &self.config.host_id,
                &self.config.relationship,
                &ready.target,
            )
            .await
        {
            Ok(records) => {
                debug!(count = records.len(), "selection seeded");
                self.selection = Selection::from_records(records);
                self.seeded = true;
                self.emit(SessionEvent::SelectionLoaded {
                    selection: self.selection.records().to_vec(),
                });
            }
            Err(e) => {
                warn!(error = %e, "loading existing relationships failed");
            }
        }
    }

    /// Feed one raw keystroke state into the query pipeline
    pub fn submit_input(&mut self, text: impl Into<String>) -> PickerResult<()> {
        let text = text.into();
        self.latest_query = text.clone();
        self.debouncer.submit(text)
    }

    /// Wait for the next settled query and run it
    ///
    /// Returns `false` when the pipeline has shut down. A settled value that
    /// the input has already moved past is discarded without a request.
    pub async fn process_settled(&mut self) -> bool {
        let Some(settled) = self.settled_rx.recv().await else {
            return false;
        };
        self.run_settled_query(settled).await;
        true
    }

    async fn run_settled_query(&mut self, settled: String) {
        if settled != self.latest_query {
            debug!(query = %settled, "settled query superseded before dispatch");
            return;
        }
        if let Err(e) = self.ensure_ready().await {
            warn!(error = %e, "search skipped, metadata not resolved");
            return;
        }

        self.set_busy(true);
        let Some(provider) = self.provider.as_ref() else {
            self.set_busy(false);
            return;
        };
        let snapshot = settled.clone();
        match provider.search(&snapshot).await {
            Ok(hits) => {
                // Apply only if the input has not moved on while we waited
                if self.latest_query == snapshot {
                    self.index = CandidateIndex::new(hits.records.clone());
                    self.emit(SessionEvent::Candidates {
                        query: Some(snapshot),
                        records: hits.records,
                        total: hits.total,
                    });
                }
            }
            Err(e) => {
                warn!(query = %snapshot, error = %e, "search failed");
            }
        }
        self.set_busy(false);
    }

    /// Reconcile the selection toward `desired` and commit what settles
    ///
    /// Fails with [`LookupMiss`](crate::error::PickerError::LookupMiss),
    /// before anything is dispatched, if a new label cannot be resolved in
    /// the candidate index. Otherwise
    /// one association per addition and one disassociation per removal are
    /// dispatched concurrently; when the whole batch has settled the
    /// selection is committed to `desired` minus the labels whose own
    /// mutation failed. Per-label results are returned and also emitted as
    /// [`SessionEvent::SelectionCommitted`].
    #[instrument(skip(self, desired))]
    pub async fn set_selection(
        &mut self,
        desired: impl IntoIterator<Item = String>,
    ) -> PickerResult<CommitReport> {
        let desired: BTreeSet<String> = desired.into_iter().collect();
        let plan = reconcile(&desired, &self.selection, &self.index)?;
        if plan.is_empty() {
            debug!("selection already reconciled");
            return Ok(CommitReport::default());
        }

        let ready = self.ensure_ready().await?;
        debug!(
            to_add = plan.to_add.len(),
            to_remove = plan.to_remove.len(),
            "dispatching reconcile batch"
        );
        self.set_busy(true);
        let report = self.dispatch(&ready, &plan).await;
        self.selection = commit_selection(&self.selection, &report);
        self.set_busy(false);

        if !report.all_succeeded() {
            warn!(
                failed = report.failures().count(),
                of = report.outcomes.len(),
                "reconcile batch settled with failures"
            );
        }
        self.emit(SessionEvent::SelectionCommitted {
            selection: self.selection.records().to_vec(),
            report: report.clone(),
        });
        Ok(report)
    }

    /// Dispatch every mutation in the plan concurrently and collect
    /// per-label outcomes
    async fn dispatch(&self, ready: &ReadyState, plan: &ReconcilePlan) -> CommitReport {
        let mut futures: Vec<BoxFuture<'static, MutationOutcome>> =
            Vec::with_capacity(plan.len());

        for record in &plan.to_add {
            let backend = self.backend.clone();
            let host = ready.host.clone();
            let target = ready.target.clone();
            let host_id = self.config.host_id.clone();
            let relationship = self.config.relationship.clone();
            let record = record.clone();
            futures.push(
                async move {
                    let result = backend
                        .associate(&host, &host_id, &relationship, &target, &record.id)
                        .await;
                    if let Err(e) = &result {
                        warn!(label = %record.label, error = %e, "associate failed");
                    }
                    MutationOutcome {
                        kind: MutationKind::Associate,
                        record,
                        error: result.err().map(|e| e.to_string()),
                    }
                }
                .boxed(),
            );
        }

        for record in &plan.to_remove {
            let backend = self.backend.clone();
            let host = ready.host.clone();
            let host_id = self.config.host_id.clone();
            let relationship = self.config.relationship.clone();
            let record = record.clone();
            futures.push(
                async move {
                    let result = backend
                        .disassociate(&host, &host_id, &relationship, &record.id)
                        .await;
                    if let Err(e) = &result {
                        warn!(label = %record.label, error = %e, "disassociate failed");
                    }
                    MutationOutcome {
                        kind: MutationKind::Disassociate,
                        record,
                        error: result.err().map(|e| e.to_string()),
                    }
                }
                .boxed(),
            );
        }

        CommitReport {
            outcomes: join_all(futures).await,
        }
    }
}
