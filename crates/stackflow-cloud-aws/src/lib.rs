//! AWS provider for StackFlow
//!
//! This crate implements the ResourceProvider trait for AWS,
//! enabling StackFlow to manage EC2, S3, IAM and VPC resources.
//!
//! # Features
//!
//! - EC2 instances (run, terminate, stop, describe) tagged by `Name`
//! - S3 buckets with region-aware location constraints
//! - IAM users, roles and customer managed policies
//! - VPCs and subnets tagged by `Name`
//! - AMI suggestions via describe-images
//!
//! # Requirements
//!
//! - `aws` CLI (v2) must be installed
//! - Credentials are resolved by the aws CLI (environment, profile, SSO, ...)
//!
//! # Example
//!
//! ```ignore
//! use stackflow_cloud_aws::AwsProvider;
//! use stackflow_cloud::ResourceProvider;
//!
//! let provider = AwsProvider::new(Some("ap-northeast-1".into()), None);
//!
//! let auth = provider.check_auth().await?;
//! if !auth.authenticated {
//!     panic!("Not authenticated: {:?}", auth.error);
//! }
//! ```

pub mod awscli;
pub mod error;
pub mod provider;

pub use awscli::{AwsCli, CallerIdentity, ImageInfo, location_constraint};
pub use error::{AwsError, Result};
pub use provider::AwsProvider;
