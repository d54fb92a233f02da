use std::future::Future;
use std::time::Duration;

use capibm_core::{ClusterSpec, MachineSpec, ObservedStatus, Resource, ResourceKind};

use crate::client::{CloudError, PowerVsClient, SecretReader, VpcClient, with_deadline};
use crate::error::ProvisionerError;
use crate::persistence::StatePersistence;

/// Inputs for a [`ClusterScope`].
pub struct ClusterScopeParams<'a> {
    pub spec: &'a ClusterSpec,
    pub status: ObservedStatus,
    pub client: &'a dyn VpcClient,
    pub persistence: &'a StatePersistence<ObservedStatus>,
    pub deadline: Option<Duration>,
}

/// Everything one reconcile pass needs for a cluster's network.
///
/// Built per pass and dropped at its end; nothing in here outlives the
/// pass or is shared with passes for other clusters.
pub struct ClusterScope<'a> {
    pub(crate) spec: &'a ClusterSpec,
    pub(crate) status: ObservedStatus,
    pub(crate) client: &'a dyn VpcClient,
    pub(crate) persistence: &'a StatePersistence<ObservedStatus>,
    pub(crate) deadline: Option<Duration>,
}

impl<'a> ClusterScope<'a> {
    pub fn new(params: ClusterScopeParams<'a>) -> Self {
        Self {
            spec: params.spec,
            status: params.status,
            client: params.client,
            persistence: params.persistence,
            deadline: params.deadline,
        }
    }

    pub fn spec(&self) -> &ClusterSpec {
        self.spec
    }

    pub fn status(&self) -> &ObservedStatus {
        &self.status
    }

    pub fn into_status(self) -> ObservedStatus {
        self.status
    }

    pub(crate) async fn call<T>(
        &self,
        call: impl Future<Output = Result<T, CloudError>>,
    ) -> Result<T, CloudError> {
        with_deadline(self.deadline, call).await
    }

    pub(crate) async fn persist(&self) -> Result<(), ProvisionerError> {
        self.persistence.persist(&self.status).await?;
        Ok(())
    }

    /// The recorded id of `needs`, a dependency of `of`.
    ///
    /// Fails with `NotReady` unless every dependency of `of` is recorded,
    /// so no create runs ahead of the steps it builds on.
    pub(crate) fn dependency(
        &self,
        of: ResourceKind,
        needs: ResourceKind,
    ) -> Result<String, ProvisionerError> {
        if let Some(missing) = of
            .dependencies()
            .iter()
            .find(|dep| self.status.id_of(**dep).is_none())
        {
            return Err(ProvisionerError::NotReady(format!(
                "{of} waits for {missing}, whose id is not recorded yet"
            )));
        }
        self.status
            .id_of(needs)
            .map(str::to_string)
            .ok_or_else(|| ProvisionerError::NotReady(format!("{needs} id is not recorded yet")))
    }
}

/// Inputs for a [`MachineScope`].
pub struct MachineScopeParams<'a> {
    pub spec: &'a MachineSpec,
    pub status: ObservedStatus,
    pub client: &'a dyn PowerVsClient,
    pub secrets: &'a dyn SecretReader,
    pub persistence: &'a StatePersistence<ObservedStatus>,
    pub deadline: Option<Duration>,
}

/// Everything one reconcile pass needs for a single machine.
pub struct MachineScope<'a> {
    pub(crate) spec: &'a MachineSpec,
    pub(crate) status: ObservedStatus,
    pub(crate) client: &'a dyn PowerVsClient,
    pub(crate) secrets: &'a dyn SecretReader,
    pub(crate) persistence: &'a StatePersistence<ObservedStatus>,
    pub(crate) deadline: Option<Duration>,
}

impl<'a> MachineScope<'a> {
    pub fn new(params: MachineScopeParams<'a>) -> Self {
        Self {
            spec: params.spec,
            status: params.status,
            client: params.client,
            secrets: params.secrets,
            persistence: params.persistence,
            deadline: params.deadline,
        }
    }

    pub fn spec(&self) -> &MachineSpec {
        self.spec
    }

    pub fn status(&self) -> &ObservedStatus {
        &self.status
    }

    pub fn into_status(self) -> ObservedStatus {
        self.status
    }

    /// The service instance every call of this scope runs inside.
    pub(crate) fn service_instance(&self) -> &'a str {
        &self.spec.service_instance_id
    }

    pub(crate) async fn call<T>(
        &self,
        call: impl Future<Output = Result<T, CloudError>>,
    ) -> Result<T, CloudError> {
        with_deadline(self.deadline, call).await
    }

    pub(crate) async fn persist(&self) -> Result<(), ProvisionerError> {
        self.persistence.persist(&self.status).await?;
        Ok(())
    }
}

/// The id of a resource the cloud just returned. A response without one
/// is malformed.
pub(crate) fn returned_id(
    resource: Resource,
    op: &'static str,
    name: &str,
) -> Result<String, ProvisionerError> {
    let kind = resource.kind;
    resource.id.filter(|id| !id.is_empty()).ok_or_else(|| {
        ProvisionerError::cloud(
            op,
            kind,
            name,
            CloudError::Malformed("response carried no resource id".into()),
        )
    })
}

/// Fold "already gone" into success for delete calls. Returns whether
/// the resource was actually deleted by this call.
pub(crate) fn absorb_not_found(result: Result<(), CloudError>) -> Result<bool, CloudError> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}
