//! capibm-provisioner
//!
//! Idempotent provisioning of IBM Cloud VPC networking and Power Systems
//! instances for cluster-api objects. Library driven by an external
//! scheduler that re-invokes [`reconcile()`] until it succeeds.
//!
//! Public API:
//! - `reconcile()`: run one pass (validate, provision or tear down, record status)
//! - `find_by_name()`: paginated exact-name scan used before every create
//! - `StatePersistence`: per-object status writes with optimistic concurrency
//! - `VpcClient` / `PowerVsClient` / `SecretReader`: the remote facade to implement

pub mod client;
pub mod error;
pub mod orchestrate;
pub mod persistence;
pub mod reconcile;
pub mod resolve;
pub mod resources;
pub mod scope;

pub use crate::client::{
    AddressPrefix, BoxFuture, CloudError, CreatedVpc, FloatingIpPrototype, InstancePrototype,
    Page, PowerVsClient, PublicGatewayPrototype, ResourceLister, SecretData, SecretReader,
    SecurityGroupRule, SubnetPrototype, VpcClient, VpcPrototype, with_deadline,
};
pub use crate::error::{ErrorClass, ProvisionerError, TeardownStep, format_err_chain};
pub use crate::persistence::StatePersistence;
pub use crate::reconcile::{ReconcileContext, ReconcileOptions, reconcile};
pub use crate::resolve::{find_by_name, resolve_reference};
pub use crate::scope::{ClusterScope, ClusterScopeParams, MachineScope, MachineScopeParams};
