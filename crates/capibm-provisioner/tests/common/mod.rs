//! In-memory fake of the cloud services, shared by the integration tests.
//!
//! Records every call as a short label ("create subnet", "list vpc", ...),
//! pages its listings two at a time, and can fail or stall any labelled
//! call on demand.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use capibm_core::{
    BootstrapRef, ClusterSpec, DesiredSpec, MachineSpec, ObjectKey, ObservedStatus, Resource,
    ResourceKind, ResourceReference, SubnetCidr, Topology,
};
use capibm_provisioner::{
    AddressPrefix, BoxFuture, CloudError, CreatedVpc, FloatingIpPrototype, InstancePrototype,
    Page, PowerVsClient, PublicGatewayPrototype, ReconcileContext, ReconcileOptions,
    ResourceLister, SecretData, SecretReader, SecurityGroupRule, StatePersistence,
    SubnetPrototype, VpcClient, VpcPrototype,
};
use capibm_storage::MemoryStore;

pub const PAGE_SIZE: usize = 2;
pub const ZONE: &str = "us-south-1";
pub const SERVICE_INSTANCE: &str = "svc-1";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone)]
struct Entry {
    within: Option<String>,
    resource: Resource,
}

#[derive(Default)]
struct State {
    next_id: u64,
    entries: Vec<Entry>,
    default_groups: HashMap<String, String>,
    rules: HashMap<String, Vec<SecurityGroupRule>>,
    prefixes: HashMap<String, Vec<AddressPrefix>>,
    attachments: HashMap<String, String>,
    secrets: BTreeMap<(String, String), SecretData>,
    instances: Vec<InstancePrototype>,
    calls: Vec<String>,
    failures: HashMap<String, VecDeque<CloudError>>,
    stalls: HashMap<String, Duration>,
    gateway_returns_nothing: bool,
}

#[derive(Default)]
pub struct FakeCloud {
    state: Mutex<State>,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call, then apply any injected stall or failure.
    async fn enter(&self, label: String) -> Result<(), CloudError> {
        let (stall, failure) = {
            let mut state = self.lock();
            state.calls.push(label.clone());
            let failure = state.failures.get_mut(&label).and_then(VecDeque::pop_front);
            (state.stalls.get(&label).copied(), failure)
        };
        if let Some(stall) = stall {
            tokio::time::sleep(stall).await;
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn insert(&self, kind: ResourceKind, within: Option<&str>, name: &str) -> Resource {
        let mut state = self.lock();
        state.next_id += 1;
        let resource = Resource::new(kind, name).with_id(format!("{kind}-{}", state.next_id));
        state.entries.push(Entry {
            within: within.map(str::to_string),
            resource: resource.clone(),
        });
        resource
    }

    fn remove(&self, kind: ResourceKind, id: &str) -> Result<(), CloudError> {
        let mut state = self.lock();
        let before = state.entries.len();
        state
            .entries
            .retain(|e| !(e.resource.kind == kind && e.resource.id.as_deref() == Some(id)));
        if state.entries.len() == before {
            return Err(CloudError::NotFound(format!("{kind} {id}")));
        }
        Ok(())
    }

    // Seeding.

    /// Pre-existing resource, as if created outside this pass.
    pub fn seed(&self, kind: ResourceKind, name: &str) -> String {
        self.insert(kind, None, name).id_or_empty().to_string()
    }

    pub fn seed_within(&self, kind: ResourceKind, within: &str, name: &str) -> String {
        self.insert(kind, Some(within), name).id_or_empty().to_string()
    }

    /// Pre-existing VPC with its default group, optionally already open.
    pub fn seed_vpc(&self, name: &str, open: bool) -> String {
        let id = self.seed(ResourceKind::Vpc, name);
        let group = format!("sg-{id}");
        let mut state = self.lock();
        state.default_groups.insert(id.clone(), group.clone());
        let rules = if open {
            vec![SecurityGroupRule::open_inbound_all()]
        } else {
            Vec::new()
        };
        state.rules.insert(group, rules);
        id
    }

    pub fn add_prefix(&self, vpc_id: &str, zone: &str, cidr: &str) {
        self.lock()
            .prefixes
            .entry(vpc_id.to_string())
            .or_default()
            .push(AddressPrefix {
                zone: zone.into(),
                cidr: cidr.into(),
            });
    }

    pub fn put_secret(&self, namespace: &str, name: &str, data: SecretData) {
        self.lock()
            .secrets
            .insert((namespace.to_string(), name.to_string()), data);
    }

    pub fn attach(&self, subnet_id: &str, gateway_id: &str) {
        self.lock()
            .attachments
            .insert(subnet_id.to_string(), gateway_id.to_string());
    }

    // Fault injection.

    /// Fail the next call with `label`.
    pub fn fail_next(&self, label: &str, error: CloudError) {
        self.lock()
            .failures
            .entry(label.to_string())
            .or_default()
            .push_back(error);
    }

    /// Delay every call with `label`.
    pub fn stall(&self, label: &str, delay: Duration) {
        self.lock().stalls.insert(label.to_string(), delay);
    }

    pub fn gateway_returns_nothing(&self) {
        self.lock().gateway_returns_nothing = true;
    }

    // Inspection.

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn count(&self, label: &str) -> usize {
        self.lock().calls.iter().filter(|c| *c == label).count()
    }

    /// Index of the first call with `label`.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.lock().calls.iter().position(|c| c == label)
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn named(&self, kind: ResourceKind, name: &str) -> Vec<Resource> {
        self.lock()
            .entries
            .iter()
            .filter(|e| e.resource.kind == kind && e.resource.name == name)
            .map(|e| e.resource.clone())
            .collect()
    }

    pub fn exists(&self, kind: ResourceKind, id: &str) -> bool {
        self.lock()
            .entries
            .iter()
            .any(|e| e.resource.kind == kind && e.resource.id.as_deref() == Some(id))
    }

    pub fn attached_gateway(&self, subnet_id: &str) -> Option<String> {
        self.lock().attachments.get(subnet_id).cloned()
    }

    pub fn rules_of_vpc(&self, vpc_id: &str) -> Vec<SecurityGroupRule> {
        let state = self.lock();
        state
            .default_groups
            .get(vpc_id)
            .and_then(|g| state.rules.get(g))
            .cloned()
            .unwrap_or_default()
    }

    pub fn created_instances(&self) -> Vec<InstancePrototype> {
        self.lock().instances.clone()
    }
}

impl ResourceLister for FakeCloud {
    fn list_page<'a>(
        &'a self,
        kind: ResourceKind,
        within: Option<&'a str>,
        start: Option<String>,
    ) -> BoxFuture<'a, Result<Page, CloudError>> {
        Box::pin(async move {
            self.enter(format!("list {kind}")).await?;
            let offset = match start {
                Some(token) => token
                    .parse::<usize>()
                    .map_err(|_| CloudError::Malformed(format!("bad page token {token}")))?,
                None => 0,
            };
            let state = self.lock();
            let all: Vec<Resource> = state
                .entries
                .iter()
                .filter(|e| e.resource.kind == kind)
                .filter(|e| kind_is_global(kind) || e.within.as_deref() == within)
                .map(|e| e.resource.clone())
                .collect();
            let end = (offset + PAGE_SIZE).min(all.len());
            let resources = all.get(offset..end).map(<[Resource]>::to_vec).unwrap_or_default();
            let next_start = (end < all.len()).then(|| end.to_string());
            Ok(Page {
                resources,
                next_start,
            })
        })
    }
}

fn kind_is_global(kind: ResourceKind) -> bool {
    matches!(
        kind,
        ResourceKind::Vpc
            | ResourceKind::Subnet
            | ResourceKind::PublicGateway
            | ResourceKind::FloatingIp
    )
}

impl VpcClient for FakeCloud {
    fn create_vpc<'a>(
        &'a self,
        proto: &'a VpcPrototype,
    ) -> BoxFuture<'a, Result<CreatedVpc, CloudError>> {
        Box::pin(async move {
            self.enter("create vpc".into()).await?;
            let vpc = self.insert(ResourceKind::Vpc, None, &proto.name);
            let group = format!("sg-{}", vpc.id_or_empty());
            let mut state = self.lock();
            state
                .default_groups
                .insert(vpc.id_or_empty().to_string(), group.clone());
            state.rules.insert(group.clone(), Vec::new());
            // New VPCs get one address prefix per zone, as with automatic
            // prefix management.
            state.prefixes.insert(
                vpc.id_or_empty().to_string(),
                vec![AddressPrefix {
                    zone: ZONE.into(),
                    cidr: "10.240.0.0/18".into(),
                }],
            );
            Ok(CreatedVpc {
                vpc,
                default_security_group: group,
            })
        })
    }

    fn default_security_group<'a>(
        &'a self,
        vpc_id: &'a str,
    ) -> BoxFuture<'a, Result<String, CloudError>> {
        Box::pin(async move {
            self.enter("get default security group".into()).await?;
            self.lock()
                .default_groups
                .get(vpc_id)
                .cloned()
                .ok_or_else(|| CloudError::NotFound(format!("vpc {vpc_id}")))
        })
    }

    fn list_security_group_rules<'a>(
        &'a self,
        security_group_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<SecurityGroupRule>, CloudError>> {
        Box::pin(async move {
            self.enter("list security group rules".into()).await?;
            Ok(self
                .lock()
                .rules
                .get(security_group_id)
                .cloned()
                .unwrap_or_default())
        })
    }

    fn create_security_group_rule<'a>(
        &'a self,
        security_group_id: &'a str,
        rule: &'a SecurityGroupRule,
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.enter("create security group rule".into()).await?;
            self.lock()
                .rules
                .entry(security_group_id.to_string())
                .or_default()
                .push(rule.clone());
            Ok(())
        })
    }

    fn list_address_prefixes<'a>(
        &'a self,
        vpc_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<AddressPrefix>, CloudError>> {
        Box::pin(async move {
            self.enter("list address prefixes".into()).await?;
            Ok(self.lock().prefixes.get(vpc_id).cloned().unwrap_or_default())
        })
    }

    fn create_subnet<'a>(
        &'a self,
        proto: &'a SubnetPrototype,
    ) -> BoxFuture<'a, Result<Resource, CloudError>> {
        Box::pin(async move {
            self.enter("create subnet".into()).await?;
            Ok(self.insert(ResourceKind::Subnet, None, &proto.name))
        })
    }

    fn create_public_gateway<'a>(
        &'a self,
        proto: &'a PublicGatewayPrototype,
    ) -> BoxFuture<'a, Result<Option<Resource>, CloudError>> {
        Box::pin(async move {
            self.enter("create public_gateway".into()).await?;
            if self.lock().gateway_returns_nothing {
                return Ok(None);
            }
            Ok(Some(self.insert(ResourceKind::PublicGateway, None, &proto.name)))
        })
    }

    fn attach_public_gateway<'a>(
        &'a self,
        subnet_id: &'a str,
        gateway_id: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.enter("attach public_gateway".into()).await?;
            self.attach(subnet_id, gateway_id);
            Ok(())
        })
    }

    fn get_subnet_public_gateway<'a>(
        &'a self,
        subnet_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Resource>, CloudError>> {
        Box::pin(async move {
            self.enter("get subnet public_gateway".into()).await?;
            if !self.exists(ResourceKind::Subnet, subnet_id) {
                return Err(CloudError::NotFound(format!("subnet {subnet_id}")));
            }
            let state = self.lock();
            let attached = state.attachments.get(subnet_id).and_then(|gateway_id| {
                state
                    .entries
                    .iter()
                    .find(|e| e.resource.id.as_deref() == Some(gateway_id.as_str()))
                    .map(|e| e.resource.clone())
            });
            Ok(attached)
        })
    }

    fn detach_public_gateway<'a>(
        &'a self,
        subnet_id: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.enter("detach public_gateway".into()).await?;
            match self.lock().attachments.remove(subnet_id) {
                Some(_) => Ok(()),
                None => Err(CloudError::NotFound(format!("gateway of subnet {subnet_id}"))),
            }
        })
    }

    fn create_floating_ip<'a>(
        &'a self,
        proto: &'a FloatingIpPrototype,
    ) -> BoxFuture<'a, Result<Resource, CloudError>> {
        Box::pin(async move {
            self.enter("create floating_ip".into()).await?;
            Ok(self.insert(ResourceKind::FloatingIp, None, &proto.name))
        })
    }

    fn delete<'a>(
        &'a self,
        kind: ResourceKind,
        id: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.enter(format!("delete {kind}")).await?;
            if kind == ResourceKind::PublicGateway
                && self.lock().attachments.values().any(|g| g == id)
            {
                return Err(CloudError::Api {
                    status: 409,
                    message: format!("public gateway {id} is still attached"),
                });
            }
            self.remove(kind, id)
        })
    }
}

impl PowerVsClient for FakeCloud {
    fn create_instance<'a>(
        &'a self,
        service_instance_id: &'a str,
        proto: &'a InstancePrototype,
    ) -> BoxFuture<'a, Result<Resource, CloudError>> {
        Box::pin(async move {
            self.enter("create instance".into()).await?;
            self.lock().instances.push(proto.clone());
            Ok(self.insert(ResourceKind::Instance, Some(service_instance_id), &proto.name))
        })
    }

    fn delete_instance<'a>(
        &'a self,
        _service_instance_id: &'a str,
        instance_id: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.enter("delete instance".into()).await?;
            self.remove(ResourceKind::Instance, instance_id)
        })
    }
}

impl SecretReader for FakeCloud {
    fn get_secret<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<SecretData, CloudError>> {
        Box::pin(async move {
            self.enter("get secret".into()).await?;
            self.lock()
                .secrets
                .get(&(namespace.to_string(), name.to_string()))
                .cloned()
                .ok_or_else(|| CloudError::NotFound(format!("secret {namespace}/{name}")))
        })
    }
}

// Fixtures.

pub fn cluster_spec() -> ClusterSpec {
    ClusterSpec {
        name: "demo".into(),
        vpc: "demo-vpc".into(),
        resource_group: "rg-1".into(),
        zone: ZONE.into(),
        subnet_cidr: SubnetCidr::ZoneAddressPrefix,
        public_gateway: true,
    }
}

pub fn machine_spec() -> MachineSpec {
    MachineSpec {
        name: "demo-control-plane-0".into(),
        service_instance_id: SERVICE_INSTANCE.into(),
        image: ResourceReference::by_name("rhcos-4.14"),
        network: ResourceReference::by_name("demo-network"),
        memory: "8".into(),
        processors: "0.25".into(),
        proc_type: "shared".into(),
        sys_type: "s922".into(),
        ssh_key: "demo-key".into(),
        bootstrap: BootstrapRef {
            namespace: "default".into(),
            data_secret_name: Some("demo-bootstrap".into()),
        },
    }
}

pub fn desired(topology: Topology) -> DesiredSpec {
    DesiredSpec {
        key: ObjectKey::new("default", "demo"),
        topology,
        deletion_requested: false,
    }
}

/// A store, a persistence adapter bound to the demo key, and the fake.
pub struct Harness {
    pub cloud: FakeCloud,
    pub store: Arc<MemoryStore>,
    pub persistence: StatePersistence<ObservedStatus>,
    pub options: ReconcileOptions,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        let store = Arc::new(MemoryStore::new());
        let persistence = StatePersistence::new(store.clone(), ObjectKey::new("default", "demo"));
        Self {
            cloud: FakeCloud::new(),
            store,
            persistence,
            options: ReconcileOptions::default(),
        }
    }

    pub fn context(&self) -> ReconcileContext<'_> {
        ReconcileContext {
            vpc: Some(&self.cloud),
            power_vs: Some(&self.cloud),
            secrets: Some(&self.cloud),
            persistence: &self.persistence,
            options: self.options,
        }
    }

    /// What the store holds right now.
    pub async fn stored(&self) -> ObservedStatus {
        let reader = StatePersistence::<ObservedStatus>::new(
            self.store.clone(),
            self.persistence.key().clone(),
        );
        reader.load().await.unwrap()
    }
}
