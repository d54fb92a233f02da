//! Per-resource provisioning and deletion.
//!
//! Each file adds methods to the scope that owns the resource. Creates
//! follow the same shape: trust a recorded id, else find by name, else
//! create; then record the id and persist before returning. Deletes treat
//! "not found" as already done.

pub mod floating_ip;
pub mod instance;
pub mod public_gateway;
pub mod subnet;
pub mod vpc;
