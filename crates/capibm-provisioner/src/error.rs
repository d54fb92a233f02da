use std::fmt;
use std::time::Duration;

use capibm_core::{CoreError, ResourceKind};
use capibm_storage::StorageError;
use thiserror::Error;

use crate::client::CloudError;

#[derive(Debug, Error)]
pub enum ProvisionerError {
    #[error("{op} {kind} ({name})")]
    Cloud {
        op: &'static str,
        kind: ResourceKind,
        name: String,
        #[source]
        source: CloudError,
    },

    #[error("{step} for subnet {subnet}")]
    Teardown {
        step: TeardownStep,
        subnet: String,
        #[source]
        source: CloudError,
    },

    #[error(transparent)]
    Config(#[from] CoreError),

    #[error("not found a valid CIDR for VPC {vpc_id} in zone {zone}")]
    NoCidrForZone { vpc_id: String, zone: String },

    #[error("failed to find a {kind} ID for name {name}")]
    ReferenceNotFound { kind: ResourceKind, name: String },

    #[error("error retrieving bootstrap data: {0}")]
    BootstrapData(String),

    #[error("failed to read secret {namespace}/{name}")]
    Secret {
        namespace: String,
        name: String,
        #[source]
        source: CloudError,
    },

    #[error("missing {0} client for this reconcile scope")]
    MissingClient(&'static str),

    #[error("not ready: {0}")]
    NotReady(String),

    #[error("status persistence failed")]
    Storage(#[from] StorageError),
}

impl ProvisionerError {
    /// Wrap a remote failure with the operation and resource it was attempting.
    pub fn cloud(op: &'static str, kind: ResourceKind, name: &str, source: CloudError) -> Self {
        Self::Cloud {
            op,
            kind,
            name: name.to_string(),
            source,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Cloud { .. } | Self::Teardown { .. } | Self::Secret { .. } => {
                ErrorClass::Transient
            }
            Self::Config(_)
            | Self::NoCidrForZone { .. }
            | Self::ReferenceNotFound { .. }
            | Self::BootstrapData(_)
            | Self::MissingClient(_) => ErrorClass::Configuration,
            Self::NotReady(_) => ErrorClass::NotReady,
            Self::Storage(e) if e.is_conflict() => ErrorClass::Conflict,
            Self::Storage(_) => ErrorClass::Transient,
        }
    }
}

/// How the scheduler should react to a failed pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Network or API failure; requeue immediately.
    Transient,
    /// The spec cannot be satisfied as written; stop until it changes.
    Configuration,
    /// A dependency has not completed yet; requeue after a short delay.
    NotReady,
    /// The status object changed underneath us; re-read and retry.
    Conflict,
}

impl ErrorClass {
    pub const NOT_READY_DELAY: Duration = Duration::from_secs(10);

    /// `None` means do not requeue until the desired state changes.
    pub fn requeue_after(self) -> Option<Duration> {
        match self {
            ErrorClass::Transient | ErrorClass::Conflict => Some(Duration::ZERO),
            ErrorClass::NotReady => Some(Self::NOT_READY_DELAY),
            ErrorClass::Configuration => None,
        }
    }
}

/// Sub-steps of subnet teardown, named in errors for diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStep {
    LookupGateway,
    DetachGateway,
    DeleteGateway,
    DeleteSubnet,
}

impl fmt::Display for TeardownStep {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            TeardownStep::LookupGateway => "error when looking up public gateway",
            TeardownStep::DetachGateway => "error when detaching public gateway",
            TeardownStep::DeleteGateway => "error when deleting public gateway",
            TeardownStep::DeleteSubnet => "error when deleting subnet",
        })
    }
}

/// Walk the full error chain and join all causes into one string.
pub fn format_err_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
