use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::cluster::require;
use crate::models::reference::ResourceReference;
use crate::resource::ResourceKind;

/// Desired compute instance for one machine.
///
/// Memory and processor counts arrive as strings and are parsed per pass;
/// see [`MachineSpec::shape`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineSpec {
    /// Instance name, used as its idempotency key.
    pub name: String,
    /// The service instance that hosts the machine.
    pub service_instance_id: String,
    pub image: ResourceReference,
    pub network: ResourceReference,
    /// Memory in GB, e.g. "8".
    pub memory: String,
    /// Processor count, e.g. "0.25".
    pub processors: String,
    /// e.g. "shared", "dedicated", "capped".
    pub proc_type: String,
    /// e.g. "s922", "e980".
    pub sys_type: String,
    #[serde(default)]
    pub ssh_key: String,
    pub bootstrap: BootstrapRef,
}

/// Where the machine's bootstrap payload lives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapRef {
    pub namespace: String,
    /// Unset until the bootstrap provider has rendered the payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_secret_name: Option<String>,
}

/// Parsed numeric shape of a machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MachineShape {
    pub memory: f64,
    pub processors: f64,
}

impl MachineSpec {
    pub fn validate(&self) -> Result<(), CoreError> {
        require("name", &self.name)?;
        require("service_instance_id", &self.service_instance_id)?;
        require("proc_type", &self.proc_type)?;
        require("sys_type", &self.sys_type)?;
        if self.image.is_empty() {
            return Err(CoreError::EmptyReference(ResourceKind::Image));
        }
        if self.network.is_empty() {
            return Err(CoreError::EmptyReference(ResourceKind::Network));
        }
        Ok(())
    }

    /// Parse memory and processor counts.
    pub fn shape(&self) -> Result<MachineShape, CoreError> {
        Ok(MachineShape {
            memory: parse_quantity("memory", &self.memory)?,
            processors: parse_quantity("processors", &self.processors)?,
        })
    }
}

fn parse_quantity(field: &'static str, raw: &str) -> Result<f64, CoreError> {
    let value: f64 = raw.trim().parse().map_err(|_| CoreError::InvalidNumber {
        field,
        value: raw.to_string(),
    })?;
    if !value.is_finite() || value <= 0.0 {
        return Err(CoreError::OutOfRange {
            field,
            value: raw.to_string(),
        });
    }
    Ok(value)
}
