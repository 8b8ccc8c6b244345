//! Paginated collection of repository releases and tags

use tracing::debug;

use crate::config::PER_PAGE;
use crate::version::error::{RegistryError, ResolveError};
use crate::version::registry::Registry;
use crate::version::types::{Page, RawItem, RepositoryId, ResourceKind};

/// Fetch the complete collection of `kind` for `repo`, following pagination.
///
/// Pages are requested in increasing order until the registry reports no
/// next page. A failure on any page discards everything fetched so far.
pub async fn fetch_all(
    registry: &dyn Registry,
    kind: ResourceKind,
    repo: &RepositoryId,
) -> Result<Vec<RawItem>, ResolveError> {
    debug!("Fetching {} for {}", kind, repo);

    let mut items = Vec::new();
    let mut page = 1;
    loop {
        let Page {
            items: page_items,
            next_page,
        } = fetch_page(registry, kind, repo, page)
            .await
            .map_err(ResolveError::Fetch)?;

        debug!(
            "Fetched page {} of {} for {}: {} items",
            page,
            kind,
            repo,
            page_items.len()
        );
        items.extend(page_items);

        match next_page {
            Some(next) if next > 0 => page = next,
            _ => break,
        }
    }

    debug!("Fetched {} {} for {}", items.len(), kind, repo);
    Ok(items)
}

async fn fetch_page(
    registry: &dyn Registry,
    kind: ResourceKind,
    repo: &RepositoryId,
    page: u32,
) -> Result<Page<RawItem>, RegistryError> {
    let (owner, name) = (repo.owner(), repo.name());
    let page = match kind {
        ResourceKind::Releases => {
            let p = registry.list_releases(owner, name, page, PER_PAGE).await?;
            Page::new(p.items.into_iter().map(RawItem::from).collect(), p.next_page)
        }
        ResourceKind::Tags => {
            let p = registry.list_tags(owner, name, page, PER_PAGE).await?;
            Page::new(p.items.into_iter().map(RawItem::from).collect(), p.next_page)
        }
    };
    Ok(page)
}
