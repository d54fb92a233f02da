use capibm_core::ResourceKind;

use crate::client::{SecurityGroupRule, VpcPrototype};
use crate::error::ProvisionerError;
use crate::resolve::find_by_name;
use crate::scope::{ClusterScope, absorb_not_found, returned_id};

const KIND: ResourceKind = ResourceKind::Vpc;

impl ClusterScope<'_> {
    /// Resolve or create the VPC and make sure its default security group
    /// allows inbound traffic. The id is persisted only after the policy
    /// step succeeds.
    pub async fn ensure_vpc(&mut self) -> Result<String, ProvisionerError> {
        if let Some(id) = self.status.id_of(KIND) {
            tracing::debug!(id, "vpc already recorded");
            return Ok(id.to_string());
        }

        let spec = self.spec;
        let name = spec.vpc.as_str();
        let existing = find_by_name(self.client, KIND, None, name, self.deadline)
            .await
            .map_err(|e| ProvisionerError::cloud("list", KIND, name, e))?;

        let id = match existing.and_then(|r| r.id) {
            Some(id) => {
                tracing::info!(name, id = %id, "adopting existing vpc");
                let group = self
                    .call(self.client.default_security_group(&id))
                    .await
                    .map_err(|e| {
                        ProvisionerError::cloud("get default security group of", KIND, name, e)
                    })?;
                self.ensure_default_policy(&group).await?;
                id
            }
            None => {
                let proto = VpcPrototype {
                    name: name.to_string(),
                    resource_group: spec.resource_group.clone(),
                };
                let created = self
                    .call(self.client.create_vpc(&proto))
                    .await
                    .map_err(|e| ProvisionerError::cloud("create", KIND, name, e))?;
                let id = returned_id(created.vpc, "create", name)?;
                tracing::info!(name, id = %id, "vpc created");
                self.apply_default_policy(&created.default_security_group).await?;
                id
            }
        };

        self.status.record(KIND, &id, name);
        self.persist().await?;
        Ok(id)
    }

    /// Add the open-inbound rule unless the group already carries it.
    async fn ensure_default_policy(&self, group: &str) -> Result<(), ProvisionerError> {
        let name = self.spec.vpc.as_str();
        let rules = self
            .call(self.client.list_security_group_rules(group))
            .await
            .map_err(|e| ProvisionerError::cloud("list security group rules of", KIND, name, e))?;

        if rules.contains(&SecurityGroupRule::open_inbound_all()) {
            tracing::debug!(security_group = group, "default policy already present");
            return Ok(());
        }
        self.apply_default_policy(group).await
    }

    async fn apply_default_policy(&self, group: &str) -> Result<(), ProvisionerError> {
        let name = self.spec.vpc.as_str();
        let rule = SecurityGroupRule::open_inbound_all();
        self.call(self.client.create_security_group_rule(group, &rule))
            .await
            .map_err(|e| {
                ProvisionerError::cloud("update default security group of", KIND, name, e)
            })?;
        tracing::info!(security_group = group, "default security policy applied");
        Ok(())
    }

    /// Delete the recorded VPC.
    pub async fn delete_vpc(&mut self) -> Result<(), ProvisionerError> {
        let Some(id) = self.status.id_of(KIND).map(str::to_string) else {
            tracing::debug!("no vpc recorded, nothing to delete");
            return Ok(());
        };
        let spec = self.spec;
        let name = spec.vpc.as_str();

        let deleted = absorb_not_found(self.call(self.client.delete(KIND, &id)).await)
            .map_err(|e| ProvisionerError::cloud("delete", KIND, name, e))?;
        if deleted {
            tracing::info!(name, id = %id, "vpc deleted");
        } else {
            tracing::info!(name, id = %id, "vpc already gone");
        }

        self.status.clear(KIND);
        self.persist().await
    }
}
