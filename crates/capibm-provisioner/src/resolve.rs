//! Existence resolver.
//!
//! The cloud APIs reject nothing on duplicate names, so a by-name scan is
//! the only thing standing between a retried pass and a second copy of a
//! resource. Every create whose target has no recorded id goes through
//! [`find_by_name`] first.

use std::collections::HashSet;
use std::time::Duration;

use capibm_core::{CoreError, Resource, ResourceKind, ResourceReference};

use crate::client::{CloudError, ResourceLister, with_deadline};
use crate::error::ProvisionerError;

/// Scan every page of `kind` and return the first resource named exactly
/// `name`.
///
/// Names compare case-sensitively. When several resources share the name,
/// the first one in listing order wins. Listing errors are returned as-is;
/// they never read as "absent".
pub async fn find_by_name<L>(
    lister: &L,
    kind: ResourceKind,
    within: Option<&str>,
    name: &str,
    deadline: Option<Duration>,
) -> Result<Option<Resource>, CloudError>
where
    L: ResourceLister + ?Sized,
{
    let mut start: Option<String> = None;
    let mut seen: HashSet<String> = HashSet::new();
    let mut pages = 0usize;
    loop {
        let page = with_deadline(deadline, lister.list_page(kind, within, start.clone())).await?;
        pages += 1;

        if let Some(found) = page.resources.into_iter().find(|r| r.name == name) {
            tracing::debug!(kind = %kind, name, pages, "existing resource found by name");
            return Ok(Some(found));
        }

        match page.next_start {
            Some(next) if seen.insert(next.clone()) => start = Some(next),
            Some(next) => {
                tracing::warn!(
                    kind = %kind,
                    token = %next,
                    "listing repeated a page token, stopping scan"
                );
                break;
            }
            None => break,
        }
    }

    tracing::debug!(kind = %kind, name, pages, "no resource with this name");
    Ok(None)
}

/// Resolve a reference to a remote id. A direct id wins; otherwise the
/// name is looked up and must match exactly.
pub async fn resolve_reference<L>(
    lister: &L,
    kind: ResourceKind,
    within: Option<&str>,
    reference: &ResourceReference,
    deadline: Option<Duration>,
) -> Result<String, ProvisionerError>
where
    L: ResourceLister + ?Sized,
{
    if let Some(id) = reference.id.as_deref().filter(|id| !id.is_empty()) {
        return Ok(id.to_string());
    }

    let Some(name) = reference.name.as_deref().filter(|n| !n.is_empty()) else {
        return Err(CoreError::EmptyReference(kind).into());
    };

    let found = find_by_name(lister, kind, within, name, deadline)
        .await
        .map_err(|e| ProvisionerError::cloud("list", kind, name, e))?;

    match found.and_then(|r| r.id) {
        Some(id) => {
            tracing::info!(kind = %kind, name, id = %id, "resolved reference by name");
            Ok(id)
        }
        None => Err(ProvisionerError::ReferenceNotFound {
            kind,
            name: name.to_string(),
        }),
    }
}
