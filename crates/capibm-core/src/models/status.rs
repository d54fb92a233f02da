use serde::{Deserialize, Serialize};

use crate::resource::ResourceKind;

/// What has actually been provisioned for one object.
///
/// Written after every individual create or delete, so a crash mid-pass
/// leaves this consistent with the resources that exist. An id recorded
/// here is trusted on the next pass; an absent id forces a by-name lookup
/// before anything is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_gateway: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floating_ip: Option<NamedResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<NamedResource>,

    #[serde(default)]
    pub ready: bool,
    /// Full error chain of the last failed pass; cleared on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reconciled_at: Option<jiff::Timestamp>,
}

/// An id together with the name used to look it up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedResource {
    pub id: String,
    pub name: String,
}

impl ObservedStatus {
    /// The recorded id for `kind`, ignoring empty strings.
    pub fn id_of(&self, kind: ResourceKind) -> Option<&str> {
        let id = match kind {
            ResourceKind::Vpc => self.vpc.as_deref(),
            ResourceKind::Subnet => self.subnet.as_deref(),
            ResourceKind::PublicGateway => self.public_gateway.as_deref(),
            ResourceKind::FloatingIp => self.floating_ip.as_ref().map(|r| r.id.as_str()),
            ResourceKind::Instance => self.instance.as_ref().map(|r| r.id.as_str()),
            ResourceKind::Image | ResourceKind::Network => None,
        };
        id.filter(|id| !id.is_empty())
    }

    /// Record the id of a created or adopted resource.
    pub fn record(&mut self, kind: ResourceKind, id: impl Into<String>, name: impl Into<String>) {
        let id = id.into();
        match kind {
            ResourceKind::Vpc => self.vpc = Some(id),
            ResourceKind::Subnet => self.subnet = Some(id),
            ResourceKind::PublicGateway => self.public_gateway = Some(id),
            ResourceKind::FloatingIp => {
                self.floating_ip = Some(NamedResource {
                    id,
                    name: name.into(),
                })
            }
            ResourceKind::Instance => {
                self.instance = Some(NamedResource {
                    id,
                    name: name.into(),
                })
            }
            ResourceKind::Image | ResourceKind::Network => {}
        }
    }

    /// Forget a resource after it has been deleted.
    pub fn clear(&mut self, kind: ResourceKind) {
        match kind {
            ResourceKind::Vpc => self.vpc = None,
            ResourceKind::Subnet => self.subnet = None,
            ResourceKind::PublicGateway => self.public_gateway = None,
            ResourceKind::FloatingIp => self.floating_ip = None,
            ResourceKind::Instance => self.instance = None,
            ResourceKind::Image | ResourceKind::Network => {}
        }
    }

    /// True when no resource is recorded.
    pub fn is_empty(&self) -> bool {
        [
            ResourceKind::Vpc,
            ResourceKind::Subnet,
            ResourceKind::PublicGateway,
            ResourceKind::FloatingIp,
            ResourceKind::Instance,
        ]
        .into_iter()
        .all(|kind| self.id_of(kind).is_none())
    }
}
