use capibm_core::ResourceKind;

use crate::client::FloatingIpPrototype;
use crate::error::ProvisionerError;
use crate::resolve::find_by_name;
use crate::scope::{ClusterScope, absorb_not_found, returned_id};

const KIND: ResourceKind = ResourceKind::FloatingIp;

impl ClusterScope<'_> {
    /// Resolve or reserve the control-plane floating IP,
    /// `<cluster>-control-plane`, in the cluster's resource group and zone.
    pub async fn ensure_floating_ip(&mut self) -> Result<String, ProvisionerError> {
        if let Some(id) = self.status.id_of(KIND) {
            tracing::debug!(id, "floating ip already recorded");
            return Ok(id.to_string());
        }

        let spec = self.spec;
        let name = spec.floating_ip_name();
        let existing = find_by_name(self.client, KIND, None, &name, self.deadline)
            .await
            .map_err(|e| ProvisionerError::cloud("list", KIND, &name, e))?;

        let id = match existing.and_then(|r| r.id) {
            Some(id) => {
                tracing::info!(name = %name, id = %id, "adopting existing floating ip");
                id
            }
            None => {
                let proto = FloatingIpPrototype {
                    name: name.clone(),
                    resource_group: spec.resource_group.clone(),
                    zone: spec.zone.clone(),
                };
                let created = self
                    .call(self.client.create_floating_ip(&proto))
                    .await
                    .map_err(|e| ProvisionerError::cloud("reserve", KIND, &name, e))?;
                let id = returned_id(created, "reserve", &name)?;
                tracing::info!(name = %name, id = %id, "floating ip reserved");
                id
            }
        };

        self.status.record(KIND, &id, &name);
        self.persist().await?;
        Ok(id)
    }

    /// Release the recorded floating IP. An empty or missing id is a no-op.
    pub async fn delete_floating_ip(&mut self) -> Result<(), ProvisionerError> {
        let Some(id) = self.status.id_of(KIND).map(str::to_string) else {
            tracing::debug!("no floating ip recorded, nothing to delete");
            return Ok(());
        };
        let name = self.spec.floating_ip_name();

        let deleted = absorb_not_found(self.call(self.client.delete(KIND, &id)).await)
            .map_err(|e| ProvisionerError::cloud("delete", KIND, &name, e))?;
        if deleted {
            tracing::info!(name = %name, id = %id, "floating ip released");
        }

        self.status.clear(KIND);
        self.persist().await
    }
}
