use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Desired network topology for one cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSpec {
    /// Cluster name; the prefix of every derived resource name.
    pub name: String,
    /// Name of the VPC, used as its idempotency key.
    pub vpc: String,
    pub resource_group: String,
    pub zone: String,
    #[serde(default)]
    pub subnet_cidr: SubnetCidr,
    /// Create and attach a public gateway for the subnet's zone.
    #[serde(default = "default_true")]
    pub public_gateway: bool,
}

fn default_true() -> bool {
    true
}

/// Where the subnet's IPv4 block comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubnetCidr {
    /// Use the VPC's address prefix allocated to the target zone.
    #[default]
    ZoneAddressPrefix,
    /// Use this block verbatim.
    Block { cidr: String },
}

impl ClusterSpec {
    pub fn subnet_name(&self) -> String {
        format!("{}-subnet", self.name)
    }

    pub fn public_gateway_name(&self) -> String {
        format!("{}-public-gateway", self.name)
    }

    pub fn floating_ip_name(&self) -> String {
        format!("{}-control-plane", self.name)
    }

    /// Reject specs that cannot be provisioned no matter how often we retry.
    pub fn validate(&self) -> Result<(), CoreError> {
        require("name", &self.name)?;
        require("vpc", &self.vpc)?;
        require("resource_group", &self.resource_group)?;
        require("zone", &self.zone)?;
        if let SubnetCidr::Block { cidr } = &self.subnet_cidr {
            require("subnet_cidr.cidr", cidr)?;
        }
        Ok(())
    }
}

pub(crate) fn require(field: &'static str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::MissingField(field));
    }
    Ok(())
}
