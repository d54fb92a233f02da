use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use capibm_core::ResourceKind;

use crate::client::InstancePrototype;
use crate::error::ProvisionerError;
use crate::resolve::{find_by_name, resolve_reference};
use crate::scope::{MachineScope, absorb_not_found, returned_id};

const KIND: ResourceKind = ResourceKind::Instance;

/// Key of the bootstrap payload inside its secret.
const BOOTSTRAP_KEY: &str = "value";

impl MachineScope<'_> {
    /// Resolve or create the machine's instance.
    ///
    /// The shape is parsed before any remote call so a bad memory or
    /// processor value fails without touching the cloud.
    pub async fn ensure_instance(&mut self) -> Result<String, ProvisionerError> {
        let spec = self.spec;
        let shape = spec.shape()?;

        if let Some(id) = self.status.id_of(KIND) {
            tracing::debug!(id, "instance already recorded");
            return Ok(id.to_string());
        }

        let svc = self.service_instance();
        let name = spec.name.as_str();
        let existing = find_by_name(self.client, KIND, Some(svc), name, self.deadline)
            .await
            .map_err(|e| ProvisionerError::cloud("list", KIND, name, e))?;
        if let Some(id) = existing.and_then(|r| r.id) {
            tracing::info!(name, id = %id, "adopting existing instance");
            self.status.record(KIND, &id, name);
            self.persist().await?;
            return Ok(id);
        }

        let Some(secret_name) = spec.bootstrap.data_secret_name.as_deref() else {
            return Err(ProvisionerError::NotReady(
                "bootstrap data secret reference is not set yet".into(),
            ));
        };

        let image_id = resolve_reference(
            self.client,
            ResourceKind::Image,
            Some(svc),
            &spec.image,
            self.deadline,
        )
        .await?;
        let network_id = resolve_reference(
            self.client,
            ResourceKind::Network,
            Some(svc),
            &spec.network,
            self.deadline,
        )
        .await?;
        let user_data = self.bootstrap_data(secret_name).await?;

        let proto = InstancePrototype {
            name: name.to_string(),
            image_id,
            network_id,
            memory: shape.memory,
            processors: shape.processors,
            proc_type: spec.proc_type.clone(),
            sys_type: spec.sys_type.clone(),
            key_pair_name: Some(spec.ssh_key.clone()).filter(|k| !k.is_empty()),
            user_data,
        };
        let created = self
            .call(self.client.create_instance(svc, &proto))
            .await
            .map_err(|e| ProvisionerError::cloud("create", KIND, name, e))?;
        let id = returned_id(created, "create", name)?;
        tracing::info!(
            name,
            id = %id,
            memory = shape.memory,
            processors = shape.processors,
            "instance created"
        );

        self.status.record(KIND, &id, name);
        self.persist().await?;
        Ok(id)
    }

    /// Read the bootstrap payload and return it base64-encoded.
    async fn bootstrap_data(&self, secret_name: &str) -> Result<String, ProvisionerError> {
        let namespace = self.spec.bootstrap.namespace.as_str();
        let data = match self
            .call(self.secrets.get_secret(namespace, secret_name))
            .await
        {
            Ok(data) => data,
            Err(e) if e.is_not_found() => {
                return Err(ProvisionerError::NotReady(format!(
                    "bootstrap secret {namespace}/{secret_name} does not exist yet"
                )));
            }
            Err(source) => {
                return Err(ProvisionerError::Secret {
                    namespace: namespace.to_string(),
                    name: secret_name.to_string(),
                    source,
                });
            }
        };

        let value = data.get(BOOTSTRAP_KEY).ok_or_else(|| {
            ProvisionerError::BootstrapData(format!(
                "secret {namespace}/{secret_name} has no '{BOOTSTRAP_KEY}' key"
            ))
        })?;
        Ok(STANDARD.encode(value))
    }

    /// Delete the recorded instance. Without a recorded id there is
    /// nothing to delete.
    pub async fn delete_instance(&mut self) -> Result<(), ProvisionerError> {
        let Some(id) = self.status.id_of(KIND).map(str::to_string) else {
            tracing::debug!("no instance recorded, nothing to delete");
            return Ok(());
        };
        let name = self.spec.name.as_str();

        let deleted = absorb_not_found(
            self.call(self.client.delete_instance(self.service_instance(), &id))
                .await,
        )
        .map_err(|e| ProvisionerError::cloud("delete", KIND, name, e))?;
        if deleted {
            tracing::info!(name, id = %id, "instance deleted");
        }

        self.status.clear(KIND);
        self.persist().await
    }
}
