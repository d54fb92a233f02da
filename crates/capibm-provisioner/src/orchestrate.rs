//! Dependency-ordered provisioning and its reverse.
//!
//! Steps run one after another with no fan-out. Each step persists the
//! status field it changed before the next one starts, so an error at any
//! point leaves the stored status matching what exists remotely and the
//! next pass resumes from there.

use crate::error::ProvisionerError;
use crate::scope::{ClusterScope, MachineScope};

impl ClusterScope<'_> {
    /// VPC, subnet, optional public gateway, then the control-plane
    /// floating IP.
    pub async fn provision(&mut self) -> Result<(), ProvisionerError> {
        self.ensure_vpc().await?;
        let subnet_id = self.ensure_subnet().await?;
        if self.ensure_public_gateway(&subnet_id).await?.is_none() {
            tracing::debug!(subnet = %subnet_id, "cluster has no public gateway");
        }
        self.ensure_floating_ip().await?;
        tracing::info!(cluster = %self.spec.name, "cluster network provisioned");
        Ok(())
    }

    /// Floating IP, subnet (with its attached gateway), any gateway the
    /// subnet teardown did not reach, then the VPC.
    pub async fn teardown(&mut self) -> Result<(), ProvisionerError> {
        self.delete_floating_ip().await?;
        self.delete_subnet().await?;
        self.delete_public_gateway().await?;
        self.delete_vpc().await?;
        tracing::info!(cluster = %self.spec.name, "cluster network torn down");
        Ok(())
    }
}

impl MachineScope<'_> {
    pub async fn provision(&mut self) -> Result<(), ProvisionerError> {
        self.ensure_instance().await?;
        Ok(())
    }

    pub async fn teardown(&mut self) -> Result<(), ProvisionerError> {
        self.delete_instance().await
    }
}
