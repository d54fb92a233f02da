//! The single entry point the scheduler calls.

use std::time::Duration;

use capibm_core::{DesiredSpec, ObservedStatus, Topology};
use jiff::Timestamp;

use crate::client::{PowerVsClient, SecretReader, VpcClient};
use crate::error::{ErrorClass, ProvisionerError, format_err_chain};
use crate::persistence::StatePersistence;
use crate::scope::{ClusterScope, ClusterScopeParams, MachineScope, MachineScopeParams};

/// Tunables for a reconcile pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    /// Upper bound on each remote call. `None` waits as long as the
    /// client does.
    pub call_timeout: Option<Duration>,
}

/// Client handles for one pass, built by the caller and borrowed for the
/// duration of the pass only.
///
/// A cluster pass needs `vpc`; a machine pass needs `power_vs` and
/// `secrets`. A missing handle fails the pass as a configuration error.
pub struct ReconcileContext<'a> {
    pub vpc: Option<&'a dyn VpcClient>,
    pub power_vs: Option<&'a dyn PowerVsClient>,
    pub secrets: Option<&'a dyn SecretReader>,
    pub persistence: &'a StatePersistence<ObservedStatus>,
    pub options: ReconcileOptions,
}

/// Drive the object described by `desired` one pass closer to its target.
///
/// Safe to call again with the same or an evolved spec: recorded ids are
/// trusted, unrecorded resources are looked up by name before creation,
/// and deletes treat "not found" as done. The returned status is always
/// the latest one, even on error; the error's [`class`] tells the
/// scheduler when to come back.
///
/// [`class`]: ProvisionerError::class
pub async fn reconcile(
    ctx: &ReconcileContext<'_>,
    desired: &DesiredSpec,
    status: ObservedStatus,
) -> (ObservedStatus, Result<(), ProvisionerError>) {
    tracing::info!(
        key = %desired.key,
        deleting = desired.deletion_requested,
        "reconcile started"
    );

    // Teardown only reads recorded ids and names, so a spec that has since
    // become invalid must not block deletion.
    let checked = if desired.deletion_requested {
        Ok(())
    } else {
        desired.validate()
    };
    let (mut status, result) = match checked {
        Ok(()) => run_pass(ctx, desired, status).await,
        Err(e) => (status, Err(e.into())),
    };

    status.last_reconciled_at = Some(Timestamp::now());
    match result {
        Ok(()) => {
            status.ready = !desired.deletion_requested;
            status.failure_message = None;
            if let Err(e) = ctx.persistence.persist(&status).await {
                return (status, Err(e.into()));
            }
            tracing::info!(key = %desired.key, ready = status.ready, "reconcile finished");
            (status, Ok(()))
        }
        Err(err) => {
            let class = err.class();
            let message = format_err_chain(&err);
            tracing::warn!(
                key = %desired.key,
                class = ?class,
                error = %message,
                "reconcile failed"
            );
            status.ready = false;
            status.failure_message = Some(message);
            if class != ErrorClass::Conflict
                && let Err(e) = ctx.persistence.persist(&status).await
            {
                tracing::warn!(
                    key = %desired.key,
                    error = %e,
                    "failed to record failure in status"
                );
            }
            (status, Err(err))
        }
    }
}

async fn run_pass(
    ctx: &ReconcileContext<'_>,
    desired: &DesiredSpec,
    status: ObservedStatus,
) -> (ObservedStatus, Result<(), ProvisionerError>) {
    let deadline = ctx.options.call_timeout;
    match &desired.topology {
        Topology::Cluster(spec) => {
            let Some(client) = ctx.vpc else {
                return (status, Err(ProvisionerError::MissingClient("vpc")));
            };
            let mut scope = ClusterScope::new(ClusterScopeParams {
                spec,
                status,
                client,
                persistence: ctx.persistence,
                deadline,
            });
            let result = if desired.deletion_requested {
                scope.teardown().await
            } else {
                scope.provision().await
            };
            (scope.into_status(), result)
        }
        Topology::Machine(spec) => {
            let Some(client) = ctx.power_vs else {
                return (status, Err(ProvisionerError::MissingClient("power vs")));
            };
            let Some(secrets) = ctx.secrets else {
                return (status, Err(ProvisionerError::MissingClient("secret")));
            };
            let mut scope = MachineScope::new(MachineScopeParams {
                spec,
                status,
                client,
                secrets,
                persistence: ctx.persistence,
                deadline,
            });
            let result = if desired.deletion_requested {
                scope.teardown().await
            } else {
                scope.provision().await
            };
            (scope.into_status(), result)
        }
    }
}
