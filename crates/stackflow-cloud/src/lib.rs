//! StackFlow Cloud Infrastructure
//!
//! This crate provides the reconciliation core for StackFlow: a provider
//! abstraction, the state ledger and the engine that drives declared
//! resources to "created, and recorded as created".
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  StackFlow CLI                   │
//! │            (stack provision / destroy)           │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                stackflow-cloud                   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │               Reconciler                  │   │
//! │  └──────┬──────────────────────────┬────────┘   │
//! │  ┌──────▼───────────────┐  ┌───────▼───────┐    │
//! │  │ trait ResourceProvider│  │  StateStore   │    │
//! │  └──────┬───────────────┘  └───────────────┘    │
//! └─────────┼───────────────────────────────────────┘
//!           │
//! ┌─────────▼─────┐
//! │  aws provider │
//! └───────────────┘
//! ```

pub mod error;
pub mod provider;
pub mod reconciler;
pub mod report;
pub mod state;

// Re-exports
pub use error::{CloudError, Result, StateError};
pub use provider::{
    AuthStatus, ProvisionedResource, ResourceProvider, ResourceSummary, create_resource,
};
pub use reconciler::{ReconcileOptions, Reconciler};
pub use report::{
    FailureKind, Outcome, OutcomeStatus, ReconcileAction, ReconcileReport, ReportSummary,
};
pub use state::{StateRecord, StateStore};
