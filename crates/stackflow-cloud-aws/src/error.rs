//! AWS provider error types

use stackflow_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("aws CLI not found. Please install: https://aws.amazon.com/cli/")]
    CliNotFound,

    #[error("aws authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("{code}: {message}")]
    AlreadyExists { code: String, message: String },

    #[error("{code}: {message}")]
    NotFound { code: String, message: String },

    #[error("{code}: {message}")]
    Api { code: String, message: String },

    #[error("aws command failed: {0}")]
    CommandFailed(String),

    #[error("Invalid resource configuration: {0}")]
    InvalidConfig(String),

    #[error("Unexpected aws output: {0}")]
    UnexpectedOutput(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AwsError>;

/// Error codes meaning "a resource with this name already exists"
const ALREADY_EXISTS_CODES: &[&str] = &[
    "BucketAlreadyExists",
    "BucketAlreadyOwnedByYou",
    "EntityAlreadyExists",
];

const NOT_FOUND_CODES: &[&str] = &[
    "NoSuchEntity",
    "NoSuchBucket",
    "InvalidInstanceID.NotFound",
    "InvalidVpcID.NotFound",
    "InvalidSubnetID.NotFound",
];

const AUTH_CODES: &[&str] = &[
    "InvalidClientTokenId",
    "ExpiredToken",
    "AuthFailure",
    "SignatureDoesNotMatch",
    "UnrecognizedClientException",
];

impl AwsError {
    /// Classify the stderr of a failed aws CLI call
    ///
    /// The CLI reports service errors as
    /// `An error occurred (Code) when calling the Op operation: message`.
    pub fn from_stderr(stderr: &str) -> Self {
        let stderr = stderr.trim();

        if stderr.contains("Unable to locate credentials")
            || (stderr.contains("config profile") && stderr.contains("could not be found"))
        {
            return AwsError::AuthenticationFailed(stderr.to_string());
        }

        let Some((code, message)) = parse_service_error(stderr) else {
            return AwsError::CommandFailed(stderr.to_string());
        };

        if ALREADY_EXISTS_CODES.contains(&code.as_str()) {
            AwsError::AlreadyExists { code, message }
        } else if NOT_FOUND_CODES.contains(&code.as_str()) {
            AwsError::NotFound { code, message }
        } else if AUTH_CODES.contains(&code.as_str()) {
            AwsError::AuthenticationFailed(format!("{}: {}", code, message))
        } else {
            AwsError::Api { code, message }
        }
    }
}

fn parse_service_error(stderr: &str) -> Option<(String, String)> {
    let start = stderr.find("An error occurred (")? + "An error occurred (".len();
    let rest = &stderr[start..];
    let end = rest.find(')')?;
    let code = rest[..end].to_string();
    let message = rest[end..]
        .split_once(": ")
        .map(|(_, m)| m.trim().to_string())
        .unwrap_or_default();
    Some((code, message))
}

impl From<AwsError> for CloudError {
    fn from(err: AwsError) -> Self {
        match err {
            AwsError::AlreadyExists { .. } => CloudError::ResourceAlreadyExists(err.to_string()),
            AwsError::NotFound { .. } => CloudError::ResourceNotFound(err.to_string()),
            AwsError::CliNotFound | AwsError::AuthenticationFailed(_) => {
                CloudError::AuthenticationFailed(err.to_string())
            }
            AwsError::InvalidConfig(message) => CloudError::InvalidConfig(message),
            AwsError::CommandFailed(message) => CloudError::CommandFailed(message),
            AwsError::Api { .. } | AwsError::UnexpectedOutput(_) => {
                CloudError::ApiError(err.to_string())
            }
            AwsError::JsonError(e) => CloudError::Json(e),
            AwsError::IoError(e) => CloudError::Io(e),
        }
    }
}
