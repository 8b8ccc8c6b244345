//! Registry trait for listing releases and tags of a hosted repository

#[cfg(test)]
use mockall::automock;

use crate::version::error::RegistryError;
use crate::version::types::{Page, RateLimit, Release, Tag};

/// Trait for reading paginated repository collections from a hosting API
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Fetches one page of releases
    ///
    /// # Arguments
    /// * `owner` - Repository owner (e.g., "actions")
    /// * `name` - Repository name (e.g., "checkout")
    /// * `page` - 1-based page number
    /// * `per_page` - Page size requested from the host
    ///
    /// # Returns
    /// * `Ok(Page<Release>)` - Releases in host order plus the next-page cursor
    /// * `Err(RegistryError)` - If the request fails
    async fn list_releases(
        &self,
        owner: &str,
        name: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Release>, RegistryError>;

    /// Fetches one page of tags, same contract as [`Registry::list_releases`]
    async fn list_tags(
        &self,
        owner: &str,
        name: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Tag>, RegistryError>;

    /// Returns the current core rate limit status
    async fn rate_limit(&self) -> Result<RateLimit, RegistryError>;
}
