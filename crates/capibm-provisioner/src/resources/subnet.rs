use capibm_core::{ResourceKind, SubnetCidr};

use crate::client::SubnetPrototype;
use crate::error::{ProvisionerError, TeardownStep};
use crate::resolve::find_by_name;
use crate::scope::{ClusterScope, absorb_not_found, returned_id};

const KIND: ResourceKind = ResourceKind::Subnet;

impl ClusterScope<'_> {
    /// Resolve or create the cluster subnet inside the recorded VPC.
    ///
    /// Fails with `NotReady` if the VPC step has not completed, and with a
    /// configuration error if the VPC has no address prefix for the zone.
    pub async fn ensure_subnet(&mut self) -> Result<String, ProvisionerError> {
        if let Some(id) = self.status.id_of(KIND) {
            tracing::debug!(id, "subnet already recorded");
            return Ok(id.to_string());
        }

        let vpc_id = self.dependency(KIND, ResourceKind::Vpc)?;
        let spec = self.spec;
        let name = spec.subnet_name();

        let existing = find_by_name(self.client, KIND, None, &name, self.deadline)
            .await
            .map_err(|e| ProvisionerError::cloud("list", KIND, &name, e))?;

        let id = match existing.and_then(|r| r.id) {
            Some(id) => {
                tracing::info!(name = %name, id = %id, "adopting existing subnet");
                id
            }
            None => {
                let proto = SubnetPrototype {
                    name: name.clone(),
                    vpc_id: vpc_id.clone(),
                    zone: spec.zone.clone(),
                    ipv4_cidr_block: self.subnet_cidr(&vpc_id).await?,
                };
                let created = self
                    .call(self.client.create_subnet(&proto))
                    .await
                    .map_err(|e| ProvisionerError::cloud("create", KIND, &name, e))?;
                let id = returned_id(created, "create", &name)?;
                tracing::info!(
                    name = %name,
                    id = %id,
                    cidr = %proto.ipv4_cidr_block,
                    "subnet created"
                );
                id
            }
        };

        self.status.record(KIND, &id, &name);
        self.persist().await?;
        Ok(id)
    }

    /// The IPv4 block for the subnet: explicit, or the VPC's address
    /// prefix for the target zone.
    async fn subnet_cidr(&self, vpc_id: &str) -> Result<String, ProvisionerError> {
        let spec = self.spec;
        if let SubnetCidr::Block { cidr } = &spec.subnet_cidr {
            return Ok(cidr.clone());
        }

        let prefixes = self
            .call(self.client.list_address_prefixes(vpc_id))
            .await
            .map_err(|e| {
                ProvisionerError::cloud("list address prefixes of", ResourceKind::Vpc, &spec.vpc, e)
            })?;

        prefixes
            .into_iter()
            .find(|p| p.zone == spec.zone)
            .map(|p| p.cidr)
            .ok_or_else(|| ProvisionerError::NoCidrForZone {
                vpc_id: vpc_id.to_string(),
                zone: spec.zone.clone(),
            })
    }

    /// Delete the recorded subnet, detaching and deleting its public
    /// gateway first.
    pub async fn delete_subnet(&mut self) -> Result<(), ProvisionerError> {
        let Some(subnet_id) = self.status.id_of(KIND).map(str::to_string) else {
            tracing::debug!("no subnet recorded, nothing to delete");
            return Ok(());
        };
        let teardown = |step: TeardownStep| {
            let subnet = subnet_id.clone();
            move |source| ProvisionerError::Teardown {
                step,
                subnet,
                source,
            }
        };

        let gateway = match self
            .call(self.client.get_subnet_public_gateway(&subnet_id))
            .await
        {
            Ok(gateway) => gateway.and_then(|g| g.id),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(teardown(TeardownStep::LookupGateway)(e)),
        };

        if let Some(gateway_id) = gateway {
            absorb_not_found(self.call(self.client.detach_public_gateway(&subnet_id)).await)
                .map_err(teardown(TeardownStep::DetachGateway))?;
            tracing::info!(subnet = %subnet_id, gateway = %gateway_id, "public gateway detached");

            absorb_not_found(
                self.call(self.client.delete(ResourceKind::PublicGateway, &gateway_id))
                    .await,
            )
            .map_err(teardown(TeardownStep::DeleteGateway))?;
            tracing::info!(gateway = %gateway_id, "public gateway deleted");

            if self.status.id_of(ResourceKind::PublicGateway) == Some(gateway_id.as_str()) {
                self.status.clear(ResourceKind::PublicGateway);
                self.persist().await?;
            }
        } else {
            tracing::debug!(subnet = %subnet_id, "no public gateway attached");
        }

        let deleted = absorb_not_found(self.call(self.client.delete(KIND, &subnet_id)).await)
            .map_err(teardown(TeardownStep::DeleteSubnet))?;
        if deleted {
            tracing::info!(id = %subnet_id, "subnet deleted");
        } else {
            tracing::info!(id = %subnet_id, "subnet already gone");
        }

        self.status.clear(KIND);
        self.persist().await
    }
}
