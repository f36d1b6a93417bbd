//! Reconciliation engine
//!
//! Walks a desired-state document, consults the ledger for each declared
//! resource and asks the provider to create whatever is not recorded yet.
//! Each successful creation is recorded before the next resource is touched,
//! so a crash leaves at most one resource created but untracked.

use crate::error::{CloudError, Result};
use crate::provider::{ResourceProvider, create_resource};
use crate::report::{FailureKind, Outcome, ReconcileAction, ReconcileReport};
use crate::state::StateStore;
use futures_util::{StreamExt, stream};
use stackflow_core::{
    DeclaredKind, DeclaredResource, DesiredStateDocument, DocumentError, ResourceKind,
};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Options for a reconciliation pass
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Report intended actions without calling the provider or touching the ledger
    pub dry_run: bool,

    /// Maximum number of resources in flight; 1 is strictly sequential
    pub concurrency: usize,

    /// Per provider call limit; `None` waits indefinitely
    pub provider_timeout: Option<Duration>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            concurrency: 1,
            provider_timeout: None,
        }
    }
}

impl ReconcileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.provider_timeout = timeout;
        self
    }
}

/// Drives declared resources to "created, and recorded as created"
pub struct Reconciler {
    provider: Arc<dyn ResourceProvider>,
    store: Arc<StateStore>,
}

impl Reconciler {
    pub fn new(provider: Arc<dyn ResourceProvider>, store: Arc<StateStore>) -> Self {
        Self { provider, store }
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Create every declared resource that is not yet in the ledger
    ///
    /// Only a document error aborts the pass, and it does so before any
    /// resource is processed. Everything else lands in the report.
    #[instrument(skip_all, fields(provider = self.provider.name(), dry_run = options.dry_run))]
    pub async fn reconcile(
        &self,
        document: &DesiredStateDocument,
        options: &ReconcileOptions,
    ) -> std::result::Result<ReconcileReport, DocumentError> {
        let declared = document.declared_resources()?;
        info!("Reconciling {} declared resources", declared.len());

        let mut report = ReconcileReport::new(ReconcileAction::Provision, options.dry_run);
        let start = Instant::now();

        report.outcomes = stream::iter(declared.iter())
            .map(|resource| self.provision_one(resource, options))
            .buffered(options.concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        self.finish(&mut report, options, start).await;
        Ok(report)
    }

    /// Destroy every declared resource that is recorded in the ledger
    ///
    /// Resources are visited in reverse declaration order.
    #[instrument(skip_all, fields(provider = self.provider.name(), dry_run = options.dry_run))]
    pub async fn teardown(
        &self,
        document: &DesiredStateDocument,
        options: &ReconcileOptions,
    ) -> std::result::Result<ReconcileReport, DocumentError> {
        let mut declared = document.declared_resources()?;
        declared.reverse();
        info!("Tearing down {} declared resources", declared.len());

        let mut report = ReconcileReport::new(ReconcileAction::Teardown, options.dry_run);
        let start = Instant::now();

        report.outcomes = stream::iter(declared.iter())
            .map(|resource| self.destroy_one(resource, options))
            .buffered(options.concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        self.finish(&mut report, options, start).await;
        Ok(report)
    }

    async fn provision_one(&self, resource: &DeclaredResource, options: &ReconcileOptions) -> Outcome {
        let kind = match &resource.kind {
            DeclaredKind::Supported(kind) => *kind,
            DeclaredKind::Unsupported(tag) => {
                warn!("Unsupported resource type: {:?} ({})", tag, resource.id);
                return Outcome::unsupported(tag, &resource.id);
            }
        };
        let ledger_type = kind.ledger_type();
        let id = resource.id.as_str();

        if self.store.exists(ledger_type, id).await {
            debug!("{} '{}' already provisioned, skipping", kind, id);
            return Outcome::skipped(ledger_type, id);
        }

        if options.dry_run {
            debug!("Would create {} '{}'", kind, id);
            return Outcome::would_create(ledger_type, id);
        }

        info!("Creating {} '{}'", kind, id);
        let created = with_timeout(
            options.provider_timeout,
            create_resource(self.provider.as_ref(), kind, id, &resource.spec),
        )
        .await;

        match created {
            Ok(handle) => match self.store.record(ledger_type, id, handle.into_metadata()).await {
                Ok(()) => {
                    info!("Created {} '{}'", kind, id);
                    Outcome::created(ledger_type, id)
                }
                Err(e) => {
                    warn!("{} '{}' was created but could not be recorded: {}", kind, id, e);
                    Outcome::failed(
                        ledger_type,
                        id,
                        FailureKind::Ledger,
                        format!("{} (the provider resource may now be untracked)", e),
                    )
                }
            },
            Err(CloudError::ResourceAlreadyExists(message)) if kind == ResourceKind::Bucket => {
                warn!("Bucket '{}' already exists outside the ledger", id);
                Outcome::conflict(ledger_type, id, message)
            }
            Err(e) => {
                warn!("Failed to create {} '{}': {}", kind, id, e);
                Outcome::failed(ledger_type, id, failure_kind(&e), e.to_string())
            }
        }
    }

    async fn destroy_one(&self, resource: &DeclaredResource, options: &ReconcileOptions) -> Outcome {
        let kind = match &resource.kind {
            DeclaredKind::Supported(kind) => *kind,
            DeclaredKind::Unsupported(tag) => return Outcome::unsupported(tag, &resource.id),
        };
        let ledger_type = kind.ledger_type();
        let id = resource.id.as_str();

        let Some(metadata) = self.store.get(ledger_type, id).await else {
            debug!("{} '{}' is not in the ledger, skipping", kind, id);
            return Outcome::skipped(ledger_type, id).with_detail("not recorded in ledger");
        };

        if options.dry_run {
            return Outcome::would_delete(ledger_type, id);
        }

        info!("Destroying {} '{}'", kind, id);
        let destroyed = with_timeout(
            options.provider_timeout,
            self.provider.destroy(kind, id, &metadata),
        )
        .await;

        let note = match destroyed {
            Ok(()) => None,
            Err(CloudError::ResourceNotFound(message)) => {
                warn!("{} '{}' no longer exists at the provider: {}", kind, id, message);
                Some("already absent at provider")
            }
            Err(e) => {
                warn!("Failed to destroy {} '{}': {}", kind, id, e);
                return Outcome::failed(ledger_type, id, failure_kind(&e), e.to_string());
            }
        };

        match self.store.remove(ledger_type, id).await {
            Ok(()) => {
                let outcome = Outcome::deleted(ledger_type, id);
                match note {
                    Some(note) => outcome.with_detail(note),
                    None => outcome,
                }
            }
            Err(e) => Outcome::failed(
                ledger_type,
                id,
                FailureKind::Ledger,
                format!("{} (the ledger still lists a deleted resource)", e),
            ),
        }
    }

    async fn finish(&self, report: &mut ReconcileReport, options: &ReconcileOptions, start: Instant) {
        if !options.dry_run {
            match self.store.flush().await {
                Ok(()) => self.settle_ledger_failures(report).await,
                Err(e) => {
                    warn!("Final state flush failed: {}", e);
                    for outcome in ledger_failures(report) {
                        let detail = outcome.detail.take().unwrap_or_default();
                        outcome.detail = Some(format!("{}; final flush failed: {}", detail, e));
                    }
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!("Reconciliation finished: {}", report.summary());
    }

    /// Re-evaluate ledger failures once a flush has made memory and disk agree
    ///
    /// A later successful write or the final flush may have persisted an entry
    /// whose own write failed.
    async fn settle_ledger_failures(&self, report: &mut ReconcileReport) {
        let action = report.action;
        for outcome in ledger_failures(report) {
            let recorded = self
                .store
                .exists(&outcome.resource_type, &outcome.resource_id)
                .await;
            let settled = match (action, recorded) {
                (ReconcileAction::Provision, true) => {
                    Outcome::created(&outcome.resource_type, &outcome.resource_id)
                }
                (ReconcileAction::Teardown, false) => {
                    Outcome::deleted(&outcome.resource_type, &outcome.resource_id)
                }
                _ => continue,
            };
            info!(
                "{} '{}' was persisted by a later ledger write",
                outcome.resource_type, outcome.resource_id
            );
            *outcome = settled.with_detail("ledger write retried successfully");
        }
    }
}

fn ledger_failures(report: &mut ReconcileReport) -> impl Iterator<Item = &mut Outcome> {
    report
        .outcomes
        .iter_mut()
        .filter(|o| o.failure == Some(FailureKind::Ledger))
}

async fn with_timeout<T>(limit: Option<Duration>, call: impl Future<Output = Result<T>>) -> Result<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
            CloudError::Timeout(format!("provider call did not finish within {:?}", limit))
        })?,
        None => call.await,
    }
}

fn failure_kind(error: &CloudError) -> FailureKind {
    match error {
        CloudError::Timeout(_) => FailureKind::Timeout,
        _ => FailureKind::Provider,
    }
}
