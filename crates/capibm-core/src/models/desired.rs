use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::cluster::ClusterSpec;
use crate::models::machine::MachineSpec;

/// Identity of the object whose status is persisted.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Input to one reconcile pass. Never mutated by the provisioner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredSpec {
    pub key: ObjectKey,
    pub topology: Topology,
    /// The owning object is being deleted; tear everything down.
    #[serde(default)]
    pub deletion_requested: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Topology {
    Cluster(ClusterSpec),
    Machine(MachineSpec),
}

impl DesiredSpec {
    pub fn validate(&self) -> Result<(), CoreError> {
        match &self.topology {
            Topology::Cluster(spec) => spec.validate(),
            Topology::Machine(spec) => spec.validate(),
        }
    }
}
