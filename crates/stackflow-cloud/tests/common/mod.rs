use async_trait::async_trait;
use stackflow_cloud::{
    AuthStatus, CloudError, ProvisionedResource, ResourceProvider, ResourceSummary, Result,
};
use stackflow_core::{ResourceKind, ResourceSpec};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// 失敗させ方
#[derive(Debug, Clone, Copy)]
#[allow(dead_code)]
pub enum Failure {
    Api,
    AlreadyExists,
    NotFound,
}

type Hook = Box<dyn FnOnce() + Send>;

/// 呼び出しを記録するテスト用プロバイダー
#[derive(Default)]
pub struct RecordingProvider {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, Failure>>,
    hooks: Mutex<HashMap<String, Hook>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[allow(dead_code)]
impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// 指定IDへの呼び出しを失敗させる
    pub fn fail(&self, id: &str, failure: Failure) {
        self.failures
            .lock()
            .unwrap()
            .insert(id.to_string(), failure);
    }

    /// 指定IDへの呼び出し時に一度だけ実行する処理を登録する
    pub fn on_call(&self, id: &str, hook: impl FnOnce() + Send + 'static) {
        self.hooks
            .lock()
            .unwrap()
            .insert(id.to_string(), Box::new(hook));
    }

    pub fn heal(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn call(&self, op: &str, kind: ResourceKind, id: &str) -> Result<()> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}:{}:{}", op, kind.ledger_type(), id));

        let hook = self.hooks.lock().unwrap().remove(id);
        if let Some(hook) = hook {
            hook();
        }

        let failure = self.failures.lock().unwrap().get(id).copied();
        match failure {
            None => Ok(()),
            Some(Failure::Api) => Err(CloudError::ApiError(format!("AccessDenied for {}", id))),
            Some(Failure::AlreadyExists) => Err(CloudError::ResourceAlreadyExists(format!(
                "BucketAlreadyExists: {}",
                id
            ))),
            Some(Failure::NotFound) => Err(CloudError::ResourceNotFound(id.to_string())),
        }
    }

    async fn create(&self, kind: ResourceKind, id: &str) -> Result<ProvisionedResource> {
        self.call("create", kind, id).await?;

        let handle = ProvisionedResource::new();
        Ok(match kind {
            ResourceKind::Instance => {
                handle.with_attribute("instance_id", serde_json::json!(format!("i-{}", id)))
            }
            _ => handle,
        })
    }
}

#[async_trait]
impl ResourceProvider for RecordingProvider {
    fn name(&self) -> &str {
        "recording"
    }

    fn display_name(&self) -> &str {
        "Recording provider"
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        Ok(AuthStatus::ok("test-account"))
    }

    async fn create_instance(&self, id: &str, _spec: &ResourceSpec) -> Result<ProvisionedResource> {
        self.create(ResourceKind::Instance, id).await
    }

    async fn create_bucket(&self, id: &str, _spec: &ResourceSpec) -> Result<ProvisionedResource> {
        self.create(ResourceKind::Bucket, id).await
    }

    async fn create_iam_user(&self, id: &str, _spec: &ResourceSpec) -> Result<ProvisionedResource> {
        self.create(ResourceKind::IamUser, id).await
    }

    async fn create_iam_role(&self, id: &str, _spec: &ResourceSpec) -> Result<ProvisionedResource> {
        self.create(ResourceKind::IamRole, id).await
    }

    async fn create_iam_policy(
        &self,
        id: &str,
        _spec: &ResourceSpec,
    ) -> Result<ProvisionedResource> {
        self.create(ResourceKind::IamPolicy, id).await
    }

    async fn create_vpc(&self, id: &str, _spec: &ResourceSpec) -> Result<ProvisionedResource> {
        self.create(ResourceKind::Vpc, id).await
    }

    async fn create_subnet(&self, id: &str, _spec: &ResourceSpec) -> Result<ProvisionedResource> {
        self.create(ResourceKind::Subnet, id).await
    }

    async fn destroy(
        &self,
        kind: ResourceKind,
        id: &str,
        _metadata: &serde_json::Value,
    ) -> Result<()> {
        self.call("destroy", kind, id).await
    }

    async fn list(&self, kind: ResourceKind) -> Result<Vec<ResourceSummary>> {
        Err(CloudError::Unsupported(format!("list {}", kind)))
    }
}
