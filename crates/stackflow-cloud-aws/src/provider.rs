//! AWS provider implementation

use crate::awscli::{AwsCli, CreateSubnetConfig, ImageInfo, RunInstanceConfig};
use crate::error::{AwsError, Result};
use async_trait::async_trait;
use serde_json::{Value, json};
use stackflow_cloud::{
    AuthStatus, CloudError, ProvisionedResource, ResourceProvider, ResourceSummary,
};
use stackflow_core::{ResourceKind, ResourceSpec};

/// Look up a string attribute of a resource spec
fn spec_str<'a>(spec: &'a ResourceSpec, key: &str) -> Option<&'a str> {
    spec.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn required_str<'a>(spec: &'a ResourceSpec, key: &str, id: &str) -> Result<&'a str> {
    spec_str(spec, key).ok_or_else(|| {
        AwsError::InvalidConfig(format!("'{}' is required for '{}'", key, id))
    })
}

fn spec_bool(spec: &ResourceSpec, key: &str) -> bool {
    spec.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// A string, or a list of strings
fn spec_str_list(spec: &ResourceSpec, key: &str) -> Vec<String> {
    match spec.get(key) {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Serialize an inline policy mapping, or pass a JSON string through
fn inline_policy(value: &Value) -> Option<String> {
    match value {
        Value::Object(_) => Some(value.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn metadata_str<'a>(metadata: &'a Value, key: &str) -> Option<&'a str> {
    metadata.get(key).and_then(Value::as_str)
}

/// Attribute naming the IAM entity at AWS, when it differs from the ledger id
fn iam_name_key(kind: ResourceKind) -> Option<&'static str> {
    match kind {
        ResourceKind::IamUser => Some("user_name"),
        ResourceKind::IamRole => Some("role_name"),
        ResourceKind::IamPolicy => Some("policy_name"),
        _ => None,
    }
}

/// IAM entity name to create: the kind's name attribute, else the ledger id
fn iam_entity_name<'a>(kind: ResourceKind, id: &'a str, spec: &'a ResourceSpec) -> &'a str {
    iam_name_key(kind)
        .and_then(|key| spec_str(spec, key))
        .unwrap_or(id)
}

/// IAM entity name to delete: the recorded name, else the ledger id
fn recorded_entity_name<'a>(kind: ResourceKind, id: &'a str, metadata: &'a Value) -> &'a str {
    iam_name_key(kind)
        .and_then(|key| metadata_str(metadata, key))
        .unwrap_or(id)
}

/// Ledger metadata for a created IAM entity
fn iam_metadata(kind: ResourceKind, name: &str, arn: &str) -> ProvisionedResource {
    let handle = ProvisionedResource::new().with_attribute("arn", json!(arn));
    match iam_name_key(kind) {
        Some(key) => handle.with_attribute(key, json!(name)),
        None => handle,
    }
}

/// AWS provider
pub struct AwsProvider {
    cli: AwsCli,
}

impl AwsProvider {
    pub fn new(region: Option<String>, profile: Option<String>) -> Self {
        Self {
            cli: AwsCli::new().with_region(region).with_profile(profile),
        }
    }

    pub fn cli(&self) -> &AwsCli {
        &self.cli
    }

    /// Stop an instance given its ID or its Name tag
    pub async fn stop_instance(&self, id_or_name: &str) -> Result<String> {
        let instance_id = self.resolve_instance_id(id_or_name, None).await?;
        tracing::info!("Stopping instance: {}", instance_id);
        self.cli.stop_instance(&instance_id).await?;
        Ok(instance_id)
    }

    /// AMI candidates matching a describe-images filter, newest first
    pub async fn suggest_images(
        &self,
        owners: &[String],
        filter_name: &str,
        filter_values: &[String],
        limit: usize,
    ) -> Result<Vec<ImageInfo>> {
        let mut images = self
            .cli
            .describe_images(owners, filter_name, filter_values)
            .await?;
        images.truncate(limit);
        Ok(images)
    }

    /// Resolve an instance ID from recorded metadata, a literal ID or a Name tag
    async fn resolve_instance_id(&self, id: &str, metadata: Option<&Value>) -> Result<String> {
        if let Some(instance_id) = metadata.and_then(|m| metadata_str(m, "instance_id")) {
            return Ok(instance_id.to_string());
        }
        if id.starts_with("i-") {
            return Ok(id.to_string());
        }

        self.cli
            .find_instance_by_name(id)
            .await?
            .map(|i| i.instance_id)
            .ok_or_else(|| AwsError::NotFound {
                code: "InstanceNotFound".to_string(),
                message: format!("no live instance tagged Name={}", id),
            })
    }

    async fn resolve_vpc_id(&self, name: &str, metadata: &Value) -> Result<String> {
        if let Some(vpc_id) = metadata_str(metadata, "vpc_id") {
            return Ok(vpc_id.to_string());
        }

        self.cli
            .describe_vpcs()
            .await?
            .into_iter()
            .find(|v| v.name() == Some(name))
            .map(|v| v.vpc_id)
            .ok_or_else(|| AwsError::NotFound {
                code: "VpcNotFound".to_string(),
                message: format!("no VPC tagged Name={}", name),
            })
    }

    async fn resolve_subnet_id(&self, name: &str, metadata: &Value) -> Result<String> {
        if let Some(subnet_id) = metadata_str(metadata, "subnet_id") {
            return Ok(subnet_id.to_string());
        }

        self.cli
            .describe_subnets()
            .await?
            .into_iter()
            .find(|s| s.name() == Some(name))
            .map(|s| s.subnet_id)
            .ok_or_else(|| AwsError::NotFound {
                code: "SubnetNotFound".to_string(),
                message: format!("no subnet tagged Name={}", name),
            })
    }

    async fn resolve_policy_arn(&self, name: &str, metadata: &Value) -> Result<String> {
        if let Some(arn) = metadata_str(metadata, "arn") {
            return Ok(arn.to_string());
        }

        self.cli
            .list_policies()
            .await?
            .into_iter()
            .find(|p| p.name == name)
            .map(|p| p.arn)
            .ok_or_else(|| AwsError::NotFound {
                code: "NoSuchEntity".to_string(),
                message: format!("no customer managed policy named {}", name),
            })
    }

    /// Policy document from an inline mapping, a JSON string or a file path
    async fn policy_document(&self, spec: &ResourceSpec, id: &str) -> Result<String> {
        let value = spec.get("policy_document").ok_or_else(|| {
            AwsError::InvalidConfig(format!("'policy_document' is required for '{}'", id))
        })?;

        match value {
            Value::String(s) if !s.trim_start().starts_with('{') => {
                tracing::debug!("Reading policy document from {}", s);
                Ok(tokio::fs::read_to_string(s).await?)
            }
            other => inline_policy(other).ok_or_else(|| {
                AwsError::InvalidConfig(format!(
                    "'policy_document' for '{}' must be a mapping, JSON or a file path",
                    id
                ))
            }),
        }
    }

    async fn do_create_instance(&self, id: &str, spec: &ResourceSpec) -> Result<ProvisionedResource> {
        let config = RunInstanceConfig {
            name: id.to_string(),
            image_id: required_str(spec, "image_id", id)?.to_string(),
            instance_type: required_str(spec, "instance_type", id)?.to_string(),
            key_name: spec_str(spec, "key_name").map(str::to_string),
            subnet_id: spec_str(spec, "subnet_id").map(str::to_string),
            security_group_ids: spec_str_list(spec, "security_group_ids"),
        };

        tracing::info!("Launching instance: {} ({})", id, config.instance_type);
        let instance = self.cli.run_instance(&config).await?;

        Ok(ProvisionedResource::new()
            .with_attribute("instance_id", json!(instance.instance_id))
            .with_attribute("image_id", json!(config.image_id))
            .with_attribute("instance_type", json!(config.instance_type)))
    }

    async fn do_create_bucket(&self, id: &str, spec: &ResourceSpec) -> Result<ProvisionedResource> {
        let region = spec_str(spec, "region").or(self.cli.region());

        tracing::info!("Creating bucket: {} (region: {:?})", id, region);
        self.cli.create_bucket(id, region).await?;

        let handle = ProvisionedResource::new();
        Ok(match region {
            Some(region) => handle.with_attribute("region", json!(region)),
            None => handle,
        })
    }

    async fn do_create_iam_role(&self, id: &str, spec: &ResourceSpec) -> Result<ProvisionedResource> {
        let document = spec
            .get("assume_role_policy")
            .and_then(inline_policy)
            .ok_or_else(|| {
                AwsError::InvalidConfig(format!("'assume_role_policy' is required for '{}'", id))
            })?;

        let name = iam_entity_name(ResourceKind::IamRole, id, spec);
        tracing::info!("Creating IAM role: {} ({})", id, name);
        let role = self.cli.create_role(name, &document).await?;
        Ok(iam_metadata(ResourceKind::IamRole, name, &role.arn))
    }

    async fn do_create_vpc(&self, id: &str, spec: &ResourceSpec) -> Result<ProvisionedResource> {
        let cidr_block = required_str(spec, "cidr_block", id)?;

        tracing::info!("Creating VPC: {} ({})", id, cidr_block);
        let vpc = self.cli.create_vpc(id, cidr_block).await?;
        let handle = ProvisionedResource::new().with_attribute("vpc_id", json!(vpc.vpc_id));

        if !spec_bool(spec, "enable_dns_hostnames") {
            return Ok(handle);
        }

        // The VPC already exists here, so a failed attribute change must not lose it
        let enabled = match self.cli.enable_dns_hostnames(&vpc.vpc_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Could not enable DNS hostnames on {}: {}", vpc.vpc_id, e);
                false
            }
        };
        Ok(handle.with_attribute("dns_hostnames", json!(enabled)))
    }

    async fn do_create_subnet(&self, id: &str, spec: &ResourceSpec) -> Result<ProvisionedResource> {
        let config = CreateSubnetConfig {
            vpc_id: required_str(spec, "vpc_id", id)?.to_string(),
            cidr_block: required_str(spec, "cidr_block", id)?.to_string(),
            availability_zone: spec_str(spec, "availability_zone").map(str::to_string),
        };

        tracing::info!("Creating subnet: {} in {}", id, config.vpc_id);
        let subnet = self.cli.create_subnet(id, &config).await?;
        Ok(ProvisionedResource::new().with_attribute("subnet_id", json!(subnet.subnet_id)))
    }

    async fn do_destroy(&self, kind: ResourceKind, id: &str, metadata: &Value) -> Result<()> {
        match kind {
            ResourceKind::Instance => {
                let instance_id = self.resolve_instance_id(id, Some(metadata)).await?;
                tracing::info!("Terminating instance: {} ({})", id, instance_id);
                self.cli.terminate_instance(&instance_id).await
            }
            ResourceKind::Bucket => {
                tracing::info!("Deleting bucket: {}", id);
                self.cli
                    .delete_bucket(id, metadata_str(metadata, "region"))
                    .await
            }
            ResourceKind::IamUser => {
                let name = recorded_entity_name(kind, id, metadata);
                tracing::info!("Deleting IAM user: {}", name);
                self.cli.delete_user(name).await
            }
            ResourceKind::IamRole => {
                let name = recorded_entity_name(kind, id, metadata);
                tracing::info!("Deleting IAM role: {}", name);
                self.cli.delete_role(name).await
            }
            ResourceKind::IamPolicy => {
                let name = recorded_entity_name(kind, id, metadata);
                let arn = self.resolve_policy_arn(name, metadata).await?;
                tracing::info!("Deleting IAM policy: {}", arn);
                self.cli.delete_policy(&arn).await
            }
            ResourceKind::Vpc => {
                let vpc_id = self.resolve_vpc_id(id, metadata).await?;
                tracing::info!("Deleting VPC: {} ({})", id, vpc_id);
                self.cli.delete_vpc(&vpc_id).await
            }
            ResourceKind::Subnet => {
                let subnet_id = self.resolve_subnet_id(id, metadata).await?;
                tracing::info!("Deleting subnet: {} ({})", id, subnet_id);
                self.cli.delete_subnet(&subnet_id).await
            }
        }
    }

    async fn do_list(&self, kind: ResourceKind) -> Result<Vec<ResourceSummary>> {
        let summaries = match kind {
            ResourceKind::Instance => self
                .cli
                .describe_instances()
                .await?
                .into_iter()
                .map(|i| {
                    let name = i.name().map(str::to_string);
                    let status = i.state_name().map(str::to_string);
                    ResourceSummary::new(i.instance_id)
                        .with_name(name)
                        .with_status(status)
                        .with_created_at(i.launch_time)
                })
                .collect(),
            ResourceKind::Bucket => self
                .cli
                .list_buckets()
                .await?
                .into_iter()
                .map(|b| ResourceSummary::new(b.name).with_created_at(b.creation_date))
                .collect(),
            ResourceKind::IamUser | ResourceKind::IamRole | ResourceKind::IamPolicy => {
                let entities = match kind {
                    ResourceKind::IamUser => self.cli.list_users().await?,
                    ResourceKind::IamRole => self.cli.list_roles().await?,
                    _ => self.cli.list_policies().await?,
                };
                entities
                    .into_iter()
                    .map(|e| {
                        ResourceSummary::new(e.arn)
                            .with_name(Some(e.name))
                            .with_created_at(e.create_date)
                    })
                    .collect()
            }
            ResourceKind::Vpc => self
                .cli
                .describe_vpcs()
                .await?
                .into_iter()
                .map(|v| {
                    let name = v.name().map(str::to_string);
                    ResourceSummary::new(v.vpc_id)
                        .with_name(name)
                        .with_status(v.state)
                })
                .collect(),
            ResourceKind::Subnet => self
                .cli
                .describe_subnets()
                .await?
                .into_iter()
                .map(|s| {
                    let name = s.name().map(str::to_string);
                    ResourceSummary::new(s.subnet_id)
                        .with_name(name)
                        .with_status(s.state)
                })
                .collect(),
        };

        Ok(summaries)
    }
}

#[async_trait]
impl ResourceProvider for AwsProvider {
    fn name(&self) -> &str {
        "aws"
    }

    fn display_name(&self) -> &str {
        "Amazon Web Services"
    }

    async fn check_auth(&self) -> stackflow_cloud::Result<AuthStatus> {
        match self.cli.check_auth().await {
            Ok(identity) => Ok(AuthStatus::ok(format!(
                "{} ({})",
                identity.arn, identity.account
            ))),
            Err(AwsError::CliNotFound) => {
                Ok(AuthStatus::failed("aws CLI がインストールされていません"))
            }
            Err(e) => Ok(AuthStatus::failed(e.to_string())),
        }
    }

    async fn create_instance(
        &self,
        id: &str,
        spec: &ResourceSpec,
    ) -> stackflow_cloud::Result<ProvisionedResource> {
        Ok(self.do_create_instance(id, spec).await?)
    }

    async fn create_bucket(
        &self,
        id: &str,
        spec: &ResourceSpec,
    ) -> stackflow_cloud::Result<ProvisionedResource> {
        Ok(self.do_create_bucket(id, spec).await?)
    }

    async fn create_iam_user(
        &self,
        id: &str,
        spec: &ResourceSpec,
    ) -> stackflow_cloud::Result<ProvisionedResource> {
        let name = iam_entity_name(ResourceKind::IamUser, id, spec);
        tracing::info!("Creating IAM user: {} ({})", id, name);
        let user = self.cli.create_user(name).await.map_err(CloudError::from)?;
        Ok(iam_metadata(ResourceKind::IamUser, name, &user.arn))
    }

    async fn create_iam_role(
        &self,
        id: &str,
        spec: &ResourceSpec,
    ) -> stackflow_cloud::Result<ProvisionedResource> {
        Ok(self.do_create_iam_role(id, spec).await?)
    }

    async fn create_iam_policy(
        &self,
        id: &str,
        spec: &ResourceSpec,
    ) -> stackflow_cloud::Result<ProvisionedResource> {
        let document = self.policy_document(spec, id).await?;

        let name = iam_entity_name(ResourceKind::IamPolicy, id, spec);
        tracing::info!("Creating IAM policy: {} ({})", id, name);
        let policy = self
            .cli
            .create_policy(name, &document)
            .await
            .map_err(CloudError::from)?;
        Ok(iam_metadata(ResourceKind::IamPolicy, name, &policy.arn))
    }

    async fn create_vpc(
        &self,
        id: &str,
        spec: &ResourceSpec,
    ) -> stackflow_cloud::Result<ProvisionedResource> {
        Ok(self.do_create_vpc(id, spec).await?)
    }

    async fn create_subnet(
        &self,
        id: &str,
        spec: &ResourceSpec,
    ) -> stackflow_cloud::Result<ProvisionedResource> {
        Ok(self.do_create_subnet(id, spec).await?)
    }

    async fn destroy(
        &self,
        kind: ResourceKind,
        id: &str,
        metadata: &Value,
    ) -> stackflow_cloud::Result<()> {
        Ok(self.do_destroy(kind, id, metadata).await?)
    }

    async fn list(&self, kind: ResourceKind) -> stackflow_cloud::Result<Vec<ResourceSummary>> {
        Ok(self.do_list(kind).await?)
    }
}
