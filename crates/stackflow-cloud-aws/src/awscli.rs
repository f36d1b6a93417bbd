//! aws CLI wrapper
//!
//! Wraps the aws CLI commands used by the provider. Every call runs with
//! `--output json` and is parsed with serde.

use crate::error::{AwsError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;

/// Map a region to the S3 `LocationConstraint` value
///
/// `us-east-1` is the default location and must not be sent at all.
pub fn location_constraint(region: &str) -> Option<&str> {
    match region {
        "us-east-1" => None,
        "eu-west-1" => Some("EU"),
        other => Some(other),
    }
}

/// aws CLI wrapper
#[derive(Debug, Clone, Default)]
pub struct AwsCli {
    region: Option<String>,
    profile: Option<String>,
}

impl AwsCli {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Check that the aws CLI is installed and the credentials resolve
    pub async fn check_auth(&self) -> Result<CallerIdentity> {
        let which = Command::new("which").arg("aws").output().await?;

        if !which.status.success() {
            return Err(AwsError::CliNotFound);
        }

        self.run_json(&["sts", "get-caller-identity"]).await
    }

    /// Run an aws command and return stdout
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        self.run_command_in(self.region.as_deref(), args).await
    }

    /// Run an aws command against an explicit region
    async fn run_command_in(&self, region: Option<&str>, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new("aws");
        cmd.args(args);
        cmd.arg("--output").arg("json");
        if let Some(region) = region {
            cmd.arg("--region").arg(region);
        }
        if let Some(profile) = &self.profile {
            cmd.arg("--profile").arg(profile);
        }
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!(
            "Running: aws {} (region: {:?}, profile: {:?})",
            args.join(" "),
            region,
            self.profile
        );

        let output = cmd.output().await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AwsError::CliNotFound,
            _ => AwsError::IoError(e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AwsError::from_stderr(&stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn run_json<T: DeserializeOwned>(&self, args: &[&str]) -> Result<T> {
        let output = self.run_command(args).await?;
        Ok(serde_json::from_str(&output)?)
    }

    // ---- EC2 instances ----

    /// Launch a single instance tagged with `Name`
    pub async fn run_instance(&self, config: &RunInstanceConfig) -> Result<InstanceInfo> {
        let tags = name_tag_spec("instance", &config.name);
        let mut args = vec![
            "ec2",
            "run-instances",
            "--image-id",
            config.image_id.as_str(),
            "--instance-type",
            config.instance_type.as_str(),
            "--count",
            "1",
            "--tag-specifications",
            tags.as_str(),
        ];

        if let Some(ref key_name) = config.key_name {
            args.push("--key-name");
            args.push(key_name.as_str());
        }

        if let Some(ref subnet_id) = config.subnet_id {
            args.push("--subnet-id");
            args.push(subnet_id.as_str());
        }

        if !config.security_group_ids.is_empty() {
            args.push("--security-group-ids");
            for id in &config.security_group_ids {
                args.push(id.as_str());
            }
        }

        let response: RunInstancesResponse = self.run_json(&args).await?;
        response
            .instances
            .into_iter()
            .next()
            .ok_or_else(|| AwsError::UnexpectedOutput("run-instances returned no instance".into()))
    }

    pub async fn terminate_instance(&self, instance_id: &str) -> Result<()> {
        self.run_command(&["ec2", "terminate-instances", "--instance-ids", instance_id])
            .await?;
        Ok(())
    }

    pub async fn stop_instance(&self, instance_id: &str) -> Result<()> {
        self.run_command(&["ec2", "stop-instances", "--instance-ids", instance_id])
            .await?;
        Ok(())
    }

    /// List all instances (flattened across reservations)
    pub async fn describe_instances(&self) -> Result<Vec<InstanceInfo>> {
        let response: DescribeInstancesResponse =
            self.run_json(&["ec2", "describe-instances"]).await?;
        Ok(response.instances())
    }

    /// Find a live instance by its `Name` tag
    pub async fn find_instance_by_name(&self, name: &str) -> Result<Option<InstanceInfo>> {
        let instances = self.describe_instances().await?;
        Ok(instances
            .into_iter()
            .filter(|i| !i.is_terminated())
            .find(|i| i.name() == Some(name)))
    }

    /// Describe images matching a filter, newest first
    pub async fn describe_images(
        &self,
        owners: &[String],
        filter_name: &str,
        filter_values: &[String],
    ) -> Result<Vec<ImageInfo>> {
        let filter = format!("Name={},Values={}", filter_name, filter_values.join(","));
        let mut args = vec!["ec2", "describe-images", "--filters", filter.as_str()];

        if !owners.is_empty() {
            args.push("--owners");
            for owner in owners {
                args.push(owner.as_str());
            }
        }

        let response: DescribeImagesResponse = self.run_json(&args).await?;
        let mut images = response.images;
        images.sort_by(|a, b| b.creation_date.cmp(&a.creation_date));
        Ok(images)
    }

    // ---- VPC / subnet ----

    pub async fn create_vpc(&self, name: &str, cidr_block: &str) -> Result<VpcInfo> {
        let tags = name_tag_spec("vpc", name);
        let response: CreateVpcResponse = self
            .run_json(&[
                "ec2",
                "create-vpc",
                "--cidr-block",
                cidr_block,
                "--tag-specifications",
                tags.as_str(),
            ])
            .await?;
        Ok(response.vpc)
    }

    pub async fn enable_dns_hostnames(&self, vpc_id: &str) -> Result<()> {
        self.run_command(&[
            "ec2",
            "modify-vpc-attribute",
            "--vpc-id",
            vpc_id,
            "--enable-dns-hostnames",
            "Value=true",
        ])
        .await?;
        Ok(())
    }

    pub async fn delete_vpc(&self, vpc_id: &str) -> Result<()> {
        self.run_command(&["ec2", "delete-vpc", "--vpc-id", vpc_id])
            .await?;
        Ok(())
    }

    pub async fn describe_vpcs(&self) -> Result<Vec<VpcInfo>> {
        let response: DescribeVpcsResponse = self.run_json(&["ec2", "describe-vpcs"]).await?;
        Ok(response.vpcs)
    }

    pub async fn create_subnet(&self, name: &str, config: &CreateSubnetConfig) -> Result<SubnetInfo> {
        let tags = name_tag_spec("subnet", name);
        let mut args = vec![
            "ec2",
            "create-subnet",
            "--vpc-id",
            config.vpc_id.as_str(),
            "--cidr-block",
            config.cidr_block.as_str(),
            "--tag-specifications",
            tags.as_str(),
        ];

        if let Some(ref zone) = config.availability_zone {
            args.push("--availability-zone");
            args.push(zone.as_str());
        }

        let response: CreateSubnetResponse = self.run_json(&args).await?;
        Ok(response.subnet)
    }

    pub async fn delete_subnet(&self, subnet_id: &str) -> Result<()> {
        self.run_command(&["ec2", "delete-subnet", "--subnet-id", subnet_id])
            .await?;
        Ok(())
    }

    pub async fn describe_subnets(&self) -> Result<Vec<SubnetInfo>> {
        let response: DescribeSubnetsResponse =
            self.run_json(&["ec2", "describe-subnets"]).await?;
        Ok(response.subnets)
    }

    // ---- S3 ----

    /// Create a bucket in `region` (or the CLI default region)
    pub async fn create_bucket(&self, name: &str, region: Option<&str>) -> Result<()> {
        let region = region.or(self.region.as_deref());
        let configuration = region
            .and_then(location_constraint)
            .map(|c| format!("LocationConstraint={}", c));

        let mut args = vec!["s3api", "create-bucket", "--bucket", name];
        if let Some(ref configuration) = configuration {
            args.push("--create-bucket-configuration");
            args.push(configuration.as_str());
        }

        self.run_command_in(region, &args).await?;
        Ok(())
    }

    pub async fn delete_bucket(&self, name: &str, region: Option<&str>) -> Result<()> {
        let region = region.or(self.region.as_deref());
        self.run_command_in(region, &["s3api", "delete-bucket", "--bucket", name])
            .await?;
        Ok(())
    }

    pub async fn list_buckets(&self) -> Result<Vec<BucketInfo>> {
        let response: ListBucketsResponse = self.run_json(&["s3api", "list-buckets"]).await?;
        Ok(response.buckets)
    }

    // ---- IAM ----

    pub async fn create_user(&self, user_name: &str) -> Result<IamEntity> {
        let response: CreateUserResponse = self
            .run_json(&["iam", "create-user", "--user-name", user_name])
            .await?;
        Ok(response.user)
    }

    pub async fn delete_user(&self, user_name: &str) -> Result<()> {
        self.run_command(&["iam", "delete-user", "--user-name", user_name])
            .await?;
        Ok(())
    }

    pub async fn list_users(&self) -> Result<Vec<IamEntity>> {
        let response: ListUsersResponse = self.run_json(&["iam", "list-users"]).await?;
        Ok(response.users)
    }

    pub async fn create_role(&self, role_name: &str, assume_role_policy: &str) -> Result<IamEntity> {
        let response: CreateRoleResponse = self
            .run_json(&[
                "iam",
                "create-role",
                "--role-name",
                role_name,
                "--assume-role-policy-document",
                assume_role_policy,
            ])
            .await?;
        Ok(response.role)
    }

    pub async fn delete_role(&self, role_name: &str) -> Result<()> {
        self.run_command(&["iam", "delete-role", "--role-name", role_name])
            .await?;
        Ok(())
    }

    pub async fn list_roles(&self) -> Result<Vec<IamEntity>> {
        let response: ListRolesResponse = self.run_json(&["iam", "list-roles"]).await?;
        Ok(response.roles)
    }

    pub async fn create_policy(&self, policy_name: &str, document: &str) -> Result<IamEntity> {
        let response: CreatePolicyResponse = self
            .run_json(&[
                "iam",
                "create-policy",
                "--policy-name",
                policy_name,
                "--policy-document",
                document,
            ])
            .await?;
        Ok(response.policy)
    }

    pub async fn delete_policy(&self, policy_arn: &str) -> Result<()> {
        self.run_command(&["iam", "delete-policy", "--policy-arn", policy_arn])
            .await?;
        Ok(())
    }

    /// List customer managed policies
    pub async fn list_policies(&self) -> Result<Vec<IamEntity>> {
        let response: ListPoliciesResponse = self
            .run_json(&["iam", "list-policies", "--scope", "Local"])
            .await?;
        Ok(response.policies)
    }
}

/// `--tag-specifications` shorthand carrying a single Name tag
fn name_tag_spec(resource_type: &str, name: &str) -> String {
    format!(
        "ResourceType={},Tags=[{{Key=Name,Value={}}}]",
        resource_type, name
    )
}

/// `Key`/`Value` pair as returned by EC2
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "Key")]
    pub key: String,

    #[serde(rename = "Value")]
    pub value: String,
}

fn name_from_tags(tags: &[Tag]) -> Option<&str> {
    tags.iter()
        .find(|t| t.key == "Name")
        .map(|t| t.value.as_str())
}

/// Result of `sts get-caller-identity`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallerIdentity {
    #[serde(rename = "UserId")]
    pub user_id: String,

    #[serde(rename = "Account")]
    pub account: String,

    #[serde(rename = "Arn")]
    pub arn: String,
}

/// Configuration for launching an instance
#[derive(Debug, Clone)]
pub struct RunInstanceConfig {
    pub name: String,
    pub image_id: String,
    pub instance_type: String,
    pub key_name: Option<String>,
    pub subnet_id: Option<String>,
    pub security_group_ids: Vec<String>,
}

/// Configuration for creating a subnet
#[derive(Debug, Clone)]
pub struct CreateSubnetConfig {
    pub vpc_id: String,
    pub cidr_block: String,
    pub availability_zone: Option<String>,
}

/// Instance information from EC2
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceInfo {
    #[serde(rename = "InstanceId")]
    pub instance_id: String,

    #[serde(rename = "InstanceType")]
    pub instance_type: Option<String>,

    #[serde(rename = "ImageId")]
    pub image_id: Option<String>,

    #[serde(rename = "State")]
    pub state: Option<InstanceState>,

    #[serde(rename = "LaunchTime")]
    pub launch_time: Option<String>,

    #[serde(rename = "Tags", default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceState {
    #[serde(rename = "Name")]
    pub name: String,
}

impl InstanceInfo {
    /// Value of the `Name` tag
    pub fn name(&self) -> Option<&str> {
        name_from_tags(&self.tags)
    }

    pub fn state_name(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.name.as_str())
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.state_name(), Some("terminated") | Some("shutting-down"))
    }
}

#[derive(Debug, Deserialize)]
struct RunInstancesResponse {
    #[serde(rename = "Instances", default)]
    instances: Vec<InstanceInfo>,
}

#[derive(Debug, Deserialize)]
struct DescribeInstancesResponse {
    #[serde(rename = "Reservations", default)]
    reservations: Vec<Reservation>,
}

#[derive(Debug, Deserialize)]
struct Reservation {
    #[serde(rename = "Instances", default)]
    instances: Vec<InstanceInfo>,
}

impl DescribeInstancesResponse {
    fn instances(self) -> Vec<InstanceInfo> {
        self.reservations
            .into_iter()
            .flat_map(|r| r.instances)
            .collect()
    }
}

/// AMI information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageInfo {
    #[serde(rename = "ImageId")]
    pub image_id: String,

    #[serde(rename = "Name")]
    pub name: Option<String>,

    #[serde(rename = "Description")]
    pub description: Option<String>,

    #[serde(rename = "CreationDate")]
    pub creation_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DescribeImagesResponse {
    #[serde(rename = "Images", default)]
    images: Vec<ImageInfo>,
}

/// VPC information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VpcInfo {
    #[serde(rename = "VpcId")]
    pub vpc_id: String,

    #[serde(rename = "CidrBlock")]
    pub cidr_block: Option<String>,

    #[serde(rename = "State")]
    pub state: Option<String>,

    #[serde(rename = "Tags", default)]
    pub tags: Vec<Tag>,
}

impl VpcInfo {
    pub fn name(&self) -> Option<&str> {
        name_from_tags(&self.tags)
    }
}

#[derive(Debug, Deserialize)]
struct CreateVpcResponse {
    #[serde(rename = "Vpc")]
    vpc: VpcInfo,
}

#[derive(Debug, Deserialize)]
struct DescribeVpcsResponse {
    #[serde(rename = "Vpcs", default)]
    vpcs: Vec<VpcInfo>,
}

/// Subnet information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubnetInfo {
    #[serde(rename = "SubnetId")]
    pub subnet_id: String,

    #[serde(rename = "VpcId")]
    pub vpc_id: Option<String>,

    #[serde(rename = "CidrBlock")]
    pub cidr_block: Option<String>,

    #[serde(rename = "AvailabilityZone")]
    pub availability_zone: Option<String>,

    #[serde(rename = "State")]
    pub state: Option<String>,

    #[serde(rename = "Tags", default)]
    pub tags: Vec<Tag>,
}

impl SubnetInfo {
    pub fn name(&self) -> Option<&str> {
        name_from_tags(&self.tags)
    }
}

#[derive(Debug, Deserialize)]
struct CreateSubnetResponse {
    #[serde(rename = "Subnet")]
    subnet: SubnetInfo,
}

#[derive(Debug, Deserialize)]
struct DescribeSubnetsResponse {
    #[serde(rename = "Subnets", default)]
    subnets: Vec<SubnetInfo>,
}

/// S3 bucket information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketInfo {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "CreationDate")]
    pub creation_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListBucketsResponse {
    #[serde(rename = "Buckets", default)]
    buckets: Vec<BucketInfo>,
}

/// IAM user, role or policy
///
/// The name field differs per entity type, so all three spellings are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IamEntity {
    #[serde(rename = "UserName", alias = "RoleName", alias = "PolicyName")]
    pub name: String,

    #[serde(rename = "Arn")]
    pub arn: String,

    #[serde(rename = "CreateDate")]
    pub create_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateUserResponse {
    #[serde(rename = "User")]
    user: IamEntity,
}

#[derive(Debug, Deserialize)]
struct ListUsersResponse {
    #[serde(rename = "Users", default)]
    users: Vec<IamEntity>,
}

#[derive(Debug, Deserialize)]
struct CreateRoleResponse {
    #[serde(rename = "Role")]
    role: IamEntity,
}

#[derive(Debug, Deserialize)]
struct ListRolesResponse {
    #[serde(rename = "Roles", default)]
    roles: Vec<IamEntity>,
}

#[derive(Debug, Deserialize)]
struct CreatePolicyResponse {
    #[serde(rename = "Policy")]
    policy: IamEntity,
}

#[derive(Debug, Deserialize)]
struct ListPoliciesResponse {
    #[serde(rename = "Policies", default)]
    policies: Vec<IamEntity>,
}
