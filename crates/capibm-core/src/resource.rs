use std::fmt;

use serde::{Deserialize, Serialize};

/// Every kind of remote object the provisioner touches.
///
/// `Vpc` is the cluster network; `Network` is the machine-side network an
/// instance attaches to inside its service instance.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Vpc,
    Subnet,
    PublicGateway,
    FloatingIp,
    Instance,
    Image,
    Network,
}

impl ResourceKind {
    /// Kinds whose identifiers must be known before this kind can be created.
    pub fn dependencies(self) -> &'static [ResourceKind] {
        match self {
            ResourceKind::Vpc => &[],
            ResourceKind::Subnet => &[ResourceKind::Vpc],
            ResourceKind::PublicGateway => &[ResourceKind::Vpc, ResourceKind::Subnet],
            ResourceKind::FloatingIp => &[],
            ResourceKind::Instance => &[ResourceKind::Image, ResourceKind::Network],
            ResourceKind::Image | ResourceKind::Network => &[],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Vpc => "vpc",
            ResourceKind::Subnet => "subnet",
            ResourceKind::PublicGateway => "public_gateway",
            ResourceKind::FloatingIp => "floating_ip",
            ResourceKind::Instance => "instance",
            ResourceKind::Image => "image",
            ResourceKind::Network => "network",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remote resource as the provisioner sees it.
///
/// The name is the idempotency key chosen by the caller. The id is assigned
/// by the cloud and is `None` until the resource has been created or found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ResourceKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Resource {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// The remote id, or an empty string for a resource not yet created.
    pub fn id_or_empty(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}.{} ({id})", self.kind, self.name),
            None => write!(f, "{}.{}", self.kind, self.name),
        }
    }
}
