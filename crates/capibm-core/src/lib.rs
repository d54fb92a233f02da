//! capibm-core
//!
//! Pure domain types for the IBM Cloud cluster provisioner: the desired
//! topology handed in by the scheduler, the observed status persisted
//! between passes, and the resource vocabulary shared by every crate.
//! No I/O lives here.

pub mod error;
pub mod models;
pub mod resource;

pub use crate::error::CoreError;
pub use crate::models::cluster::{ClusterSpec, SubnetCidr};
pub use crate::models::desired::{DesiredSpec, ObjectKey, Topology};
pub use crate::models::machine::{BootstrapRef, MachineShape, MachineSpec};
pub use crate::models::reference::ResourceReference;
pub use crate::models::status::{NamedResource, ObservedStatus};
pub use crate::resource::{Resource, ResourceKind};
