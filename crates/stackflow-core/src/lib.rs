//! StackFlow core
//!
//! 宣言ドキュメント（instances / buckets / resources）のモデルとローダー

pub mod error;
pub mod loader;
pub mod model;

pub use error::{DocumentError, Result};
pub use loader::{load_document, parse_document};
pub use model::{
    DeclaredKind, DeclaredResource, DesiredStateDocument, ResourceGroup, ResourceKind,
    ResourceSpec,
};
