use capibm_core::ResourceKind;

use crate::client::PublicGatewayPrototype;
use crate::error::ProvisionerError;
use crate::resolve::find_by_name;
use crate::scope::{ClusterScope, absorb_not_found};

const KIND: ResourceKind = ResourceKind::PublicGateway;

impl ClusterScope<'_> {
    /// Resolve or create the zone's public gateway and attach it to the
    /// subnet.
    ///
    /// Optional: returns `Ok(None)` when the cluster disables gateways or the
    /// service creates none. The gateway id is persisted before it is
    /// attached, and attachment is re-checked on every pass.
    pub async fn ensure_public_gateway(
        &mut self,
        subnet_id: &str,
    ) -> Result<Option<String>, ProvisionerError> {
        let spec = self.spec;
        if !spec.public_gateway {
            return Ok(None);
        }
        let name = spec.public_gateway_name();

        let attached = self
            .call(self.client.get_subnet_public_gateway(subnet_id))
            .await
            .map_err(|e| ProvisionerError::cloud("get attached", KIND, &name, e))?
            .and_then(|g| g.id);

        let gateway_id = match self.status.id_of(KIND).map(str::to_string) {
            Some(id) => id,
            None => {
                let Some(id) = self
                    .resolve_or_create_gateway(&name, attached.as_deref())
                    .await?
                else {
                    tracing::info!(
                        name = %name,
                        "no public gateway returned, continuing without one"
                    );
                    return Ok(None);
                };
                self.status.record(KIND, &id, &name);
                self.persist().await?;
                id
            }
        };

        match attached.as_deref() {
            Some(current) if current == gateway_id => {
                tracing::debug!(
                    subnet = subnet_id,
                    gateway = %gateway_id,
                    "public gateway already attached"
                );
            }
            Some(current) => {
                tracing::warn!(
                    subnet = subnet_id,
                    attached = current,
                    recorded = %gateway_id,
                    "subnet carries a different public gateway, leaving it in place"
                );
            }
            None => {
                self.call(self.client.attach_public_gateway(subnet_id, &gateway_id))
                    .await
                    .map_err(|e| ProvisionerError::cloud("attach", KIND, &name, e))?;
                tracing::info!(
                    subnet = subnet_id,
                    gateway = %gateway_id,
                    "public gateway attached"
                );
            }
        }

        Ok(Some(gateway_id))
    }

    async fn resolve_or_create_gateway(
        &self,
        name: &str,
        attached: Option<&str>,
    ) -> Result<Option<String>, ProvisionerError> {
        if let Some(id) = attached {
            tracing::info!(name, id, "adopting gateway already attached to subnet");
            return Ok(Some(id.to_string()));
        }

        let existing = find_by_name(self.client, KIND, None, name, self.deadline)
            .await
            .map_err(|e| ProvisionerError::cloud("list", KIND, name, e))?;
        if let Some(id) = existing.and_then(|r| r.id) {
            tracing::info!(name, id = %id, "adopting existing public gateway");
            return Ok(Some(id));
        }

        let vpc_id = self.dependency(KIND, ResourceKind::Vpc)?;
        let proto = PublicGatewayPrototype {
            name: name.to_string(),
            vpc_id,
            zone: self.spec.zone.clone(),
        };
        let created = self
            .call(self.client.create_public_gateway(&proto))
            .await
            .map_err(|e| ProvisionerError::cloud("create", KIND, name, e))?;

        let id = created.and_then(|g| g.id).filter(|id| !id.is_empty());
        if let Some(id) = &id {
            tracing::info!(name, id = %id, "public gateway created");
        }
        Ok(id)
    }

    /// Delete a recorded gateway that subnet teardown did not reach, e.g.
    /// one created but never attached.
    pub async fn delete_public_gateway(&mut self) -> Result<(), ProvisionerError> {
        let Some(id) = self.status.id_of(KIND).map(str::to_string) else {
            return Ok(());
        };
        let name = self.spec.public_gateway_name();

        let deleted = absorb_not_found(self.call(self.client.delete(KIND, &id)).await)
            .map_err(|e| ProvisionerError::cloud("delete", KIND, &name, e))?;
        if deleted {
            tracing::info!(name = %name, id = %id, "public gateway deleted");
        } else {
            tracing::info!(name = %name, id = %id, "public gateway already gone");
        }

        self.status.clear(KIND);
        self.persist().await
    }
}
