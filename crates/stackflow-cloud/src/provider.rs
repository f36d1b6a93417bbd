//! Resource provider trait definition

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stackflow_core::{ResourceKind, ResourceSpec};

/// Resource provider abstraction trait
///
/// The reconciler only talks to the outside world through this trait. A
/// provider instance is passed in at construction time, so tests can swap in
/// a double without touching a real cloud account.
///
/// `id` is the resolved identifier of the declared resource (for instances the
/// `instance_name`, falling back to `instance_id`); `spec` carries the
/// remaining provider-specific attributes.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Returns the provider name (e.g., "aws")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Check if the provider is properly configured and authenticated
    async fn check_auth(&self) -> Result<AuthStatus>;

    async fn create_instance(&self, id: &str, spec: &ResourceSpec) -> Result<ProvisionedResource>;

    async fn create_bucket(&self, id: &str, spec: &ResourceSpec) -> Result<ProvisionedResource>;

    async fn create_iam_user(&self, id: &str, spec: &ResourceSpec) -> Result<ProvisionedResource>;

    async fn create_iam_role(&self, id: &str, spec: &ResourceSpec) -> Result<ProvisionedResource>;

    async fn create_iam_policy(&self, id: &str, spec: &ResourceSpec)
    -> Result<ProvisionedResource>;

    async fn create_vpc(&self, id: &str, spec: &ResourceSpec) -> Result<ProvisionedResource>;

    async fn create_subnet(&self, id: &str, spec: &ResourceSpec) -> Result<ProvisionedResource>;

    /// Destroy a resource previously created by this tool
    ///
    /// `metadata` is whatever was recorded in the ledger at creation time.
    async fn destroy(&self, kind: ResourceKind, id: &str, metadata: &serde_json::Value)
    -> Result<()>;

    /// List live resources of a kind
    async fn list(&self, kind: ResourceKind) -> Result<Vec<ResourceSummary>>;
}

/// Dispatch a create call to the provider operation matching `kind`
pub async fn create_resource(
    provider: &dyn ResourceProvider,
    kind: ResourceKind,
    id: &str,
    spec: &ResourceSpec,
) -> Result<ProvisionedResource> {
    match kind {
        ResourceKind::Instance => provider.create_instance(id, spec).await,
        ResourceKind::Bucket => provider.create_bucket(id, spec).await,
        ResourceKind::IamUser => provider.create_iam_user(id, spec).await,
        ResourceKind::IamRole => provider.create_iam_role(id, spec).await,
        ResourceKind::IamPolicy => provider.create_iam_policy(id, spec).await,
        ResourceKind::Vpc => provider.create_vpc(id, spec).await,
        ResourceKind::Subnet => provider.create_subnet(id, spec).await,
    }
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account/user information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}

/// Handle returned by a successful create call
///
/// The attributes become the resource's ledger metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvisionedResource {
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl ProvisionedResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn get_attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }

    /// Ledger metadata (an empty mapping when the provider reported nothing)
    pub fn into_metadata(self) -> serde_json::Value {
        serde_json::Value::Object(self.attributes)
    }
}

/// A live resource as reported by the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSummary {
    /// Provider-side identifier
    pub id: String,

    /// Human readable name (tag, user name, ...)
    pub name: Option<String>,

    /// Provider-reported state (running, stopped, ...)
    pub status: Option<String>,

    pub created_at: Option<String>,
}

impl ResourceSummary {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            status: None,
            created_at: None,
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn with_status(mut self, status: Option<String>) -> Self {
        self.status = status;
        self
    }

    pub fn with_created_at(mut self, created_at: Option<String>) -> Self {
        self.created_at = created_at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_handle_is_empty_mapping() {
        assert_eq!(ProvisionedResource::new().into_metadata(), serde_json::json!({}));
    }

    #[test]
    fn test_handle_attributes() {
        let handle = ProvisionedResource::new()
            .with_attribute("instance_id", serde_json::json!("i-0abc"));

        assert_eq!(handle.get_attribute("instance_id"), Some("i-0abc"));
        assert_eq!(
            handle.into_metadata(),
            serde_json::json!({"instance_id": "i-0abc"})
        );
    }
}
