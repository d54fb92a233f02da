//! Resource client facade.
//!
//! One trait per cloud service, each method a single remote call with a
//! normalized request and response shape. Implementations are thin RPC
//! stubs: no retries and no idempotency logic live behind these traits.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use capibm_core::{Resource, ResourceKind};
use thiserror::Error;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A remote call failure, normalized across services.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CloudError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("deadline of {0:?} elapsed")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl CloudError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Api { status: 404, .. })
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub resources: Vec<Resource>,
    /// Token for the next page; `None` on the last page.
    pub next_start: Option<String>,
}

/// Paginated listing shared by every service.
pub trait ResourceLister: Send + Sync {
    /// List one page of `kind`.
    ///
    /// `within` scopes the listing to a service instance for kinds that
    /// live inside one (instances, images, networks); VPC kinds ignore it.
    fn list_page<'a>(
        &'a self,
        kind: ResourceKind,
        within: Option<&'a str>,
        start: Option<String>,
    ) -> BoxFuture<'a, Result<Page, CloudError>>;
}

/// A security group rule as the VPC service reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroupRule {
    pub direction: String,
    pub protocol: String,
    pub ip_version: String,
}

impl SecurityGroupRule {
    /// Allow all inbound IPv4 traffic. Applied to every new VPC's default group.
    pub fn open_inbound_all() -> Self {
        Self {
            direction: "inbound".into(),
            protocol: "all".into(),
            ip_version: "ipv4".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedVpc {
    pub vpc: Resource,
    pub default_security_group: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressPrefix {
    pub zone: String,
    pub cidr: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpcPrototype {
    pub name: String,
    pub resource_group: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetPrototype {
    pub name: String,
    pub vpc_id: String,
    pub zone: String,
    pub ipv4_cidr_block: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicGatewayPrototype {
    pub name: String,
    pub vpc_id: String,
    pub zone: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloatingIpPrototype {
    pub name: String,
    pub resource_group: String,
    pub zone: String,
}

/// VPC service: networks, subnets, gateways, floating IPs.
pub trait VpcClient: ResourceLister {
    fn create_vpc<'a>(
        &'a self,
        proto: &'a VpcPrototype,
    ) -> BoxFuture<'a, Result<CreatedVpc, CloudError>>;

    /// Id of the VPC's default security group.
    fn default_security_group<'a>(
        &'a self,
        vpc_id: &'a str,
    ) -> BoxFuture<'a, Result<String, CloudError>>;

    fn list_security_group_rules<'a>(
        &'a self,
        security_group_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<SecurityGroupRule>, CloudError>>;

    fn create_security_group_rule<'a>(
        &'a self,
        security_group_id: &'a str,
        rule: &'a SecurityGroupRule,
    ) -> BoxFuture<'a, Result<(), CloudError>>;

    fn list_address_prefixes<'a>(
        &'a self,
        vpc_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<AddressPrefix>, CloudError>>;

    fn create_subnet<'a>(
        &'a self,
        proto: &'a SubnetPrototype,
    ) -> BoxFuture<'a, Result<Resource, CloudError>>;

    /// `Ok(None)` when the service accepted the request but returned no gateway.
    fn create_public_gateway<'a>(
        &'a self,
        proto: &'a PublicGatewayPrototype,
    ) -> BoxFuture<'a, Result<Option<Resource>, CloudError>>;

    fn attach_public_gateway<'a>(
        &'a self,
        subnet_id: &'a str,
        gateway_id: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>>;

    /// The gateway attached to a subnet, if any.
    fn get_subnet_public_gateway<'a>(
        &'a self,
        subnet_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Resource>, CloudError>>;

    fn detach_public_gateway<'a>(
        &'a self,
        subnet_id: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>>;

    fn create_floating_ip<'a>(
        &'a self,
        proto: &'a FloatingIpPrototype,
    ) -> BoxFuture<'a, Result<Resource, CloudError>>;

    /// Delete any VPC-service resource by id.
    fn delete<'a>(
        &'a self,
        kind: ResourceKind,
        id: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstancePrototype {
    pub name: String,
    pub image_id: String,
    pub network_id: String,
    pub memory: f64,
    pub processors: f64,
    pub proc_type: String,
    pub sys_type: String,
    pub key_pair_name: Option<String>,
    /// Base64-encoded bootstrap payload.
    pub user_data: String,
}

/// Compute service: instances inside a service instance.
pub trait PowerVsClient: ResourceLister {
    fn create_instance<'a>(
        &'a self,
        service_instance_id: &'a str,
        proto: &'a InstancePrototype,
    ) -> BoxFuture<'a, Result<Resource, CloudError>>;

    fn delete_instance<'a>(
        &'a self,
        service_instance_id: &'a str,
        instance_id: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>>;
}

pub type SecretData = BTreeMap<String, Vec<u8>>;

/// Reads secrets from the object store that owns the cluster objects.
pub trait SecretReader: Send + Sync {
    fn get_secret<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<SecretData, CloudError>>;
}

/// Bound a remote call by `deadline`. Expiry is reported as a timeout,
/// which callers treat as transient.
pub async fn with_deadline<T, F>(deadline: Option<Duration>, call: F) -> Result<T, CloudError>
where
    F: Future<Output = Result<T, CloudError>>,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| CloudError::Timeout(limit))?,
        None => call.await,
    }
}
