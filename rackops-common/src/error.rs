use crate::ResourceStatus;
use std::path::PathBuf;
use thiserror::Error;

/// Exit code for a run that finished but reported failures along the way.
pub const EXIT_COMPLETED_WITH_ERRORS: i32 = 1;

#[derive(Debug, Error)]
pub enum RackopsError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("credentials file '{}' not found", .0.display())]
    CredentialsNotFound(PathBuf),

    #[error(
        "authentication failed ({0}). Please check and confirm that the API username, key, and region are in place and correct."
    )]
    AuthenticationFailed(String),

    #[error("you have no domains/zones at this time, please create one first then try again")]
    NoZones,

    #[error("{kind} '{name}' not found, please check and try again")]
    NotFound { kind: &'static str, name: String },

    #[error("{kind} '{name}' did not become active (status: {status})")]
    BuildFailed {
        kind: &'static str,
        name: String,
        status: ResourceStatus,
    },

    #[error("container '{0}' already exists and the force flag is not set")]
    ContainerExists(String),

    #[error("no servers in an active state, cannot create load balancer")]
    NoActiveServers,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Api(#[from] anyhow::Error),
}

impl RackopsError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Process exit code; one table for every workflow.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidInput(_) => 2,
            Self::CredentialsNotFound(_) => 3,
            Self::AuthenticationFailed(_) => 4,
            Self::NoZones | Self::NotFound { .. } => 5,
            Self::BuildFailed { .. } => 6,
            Self::ContainerExists(_) => 7,
            Self::NoActiveServers => 8,
            Self::Io(_) => 9,
            Self::Api(_) => 10,
        }
    }
}
