//! Registry test utilities

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;

use remote_versions::config::{ExtractionConfig, RegexExtraction, RemoteVersion};
use remote_versions::version::budget::AtomicGauge;
use remote_versions::version::cache::Cache;
use remote_versions::version::error::RegistryError;
use remote_versions::version::registry::Registry;
use remote_versions::version::resolver::GitHubProvider;
use remote_versions::version::types::{Page, RateLimit, Release, Tag};

/// In-memory registry serving fixed releases and tags in pages
#[derive(Default)]
pub struct FakeRegistry {
    releases: HashMap<String, Vec<Release>>,
    tags: HashMap<String, Vec<Tag>>,
    remaining: u64,
    failing_page: Option<u32>,
    pub list_calls: AtomicUsize,
    pub rate_limit_calls: AtomicUsize,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self {
            remaining: 5000,
            ..Default::default()
        }
    }

    pub fn with_tags(mut self, repo: &str, names: Vec<&str>) -> Self {
        self.tags.insert(
            repo.to_string(),
            names
                .into_iter()
                .map(|n| Tag {
                    name: n.to_string(),
                })
                .collect(),
        );
        self
    }

    /// Releases as `(tag_name, name)` pairs
    pub fn with_releases(mut self, repo: &str, releases: Vec<(&str, &str)>) -> Self {
        self.releases.insert(
            repo.to_string(),
            releases
                .into_iter()
                .map(|(tag_name, name)| Release {
                    tag_name: tag_name.to_string(),
                    name: name.to_string(),
                })
                .collect(),
        );
        self
    }

    pub fn with_remaining(mut self, remaining: u64) -> Self {
        self.remaining = remaining;
        self
    }

    /// Make every request for `page` fail
    pub fn failing_on_page(mut self, page: u32) -> Self {
        self.failing_page = Some(page);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn rate_limit_calls(&self) -> usize {
        self.rate_limit_calls.load(Ordering::SeqCst)
    }

    fn paginate<T: Clone>(
        &self,
        all: Option<&Vec<T>>,
        repo: String,
        page: u32,
        per_page: u32,
    ) -> Result<Page<T>, RegistryError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_page == Some(page) {
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: 500 on page {}",
                page
            )));
        }

        let all = all.ok_or(RegistryError::NotFound(repo))?;
        let per_page = per_page as usize;
        let start = (page as usize - 1) * per_page;
        let items: Vec<T> = all.iter().skip(start).take(per_page).cloned().collect();
        let next_page = (start + per_page < all.len()).then_some(page + 1);

        Ok(Page::new(items, next_page))
    }
}

#[async_trait]
impl Registry for FakeRegistry {
    async fn list_releases(
        &self,
        owner: &str,
        name: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Release>, RegistryError> {
        let repo = format!("{}/{}", owner, name);
        self.paginate(self.releases.get(&repo), repo, page, per_page)
    }

    async fn list_tags(
        &self,
        owner: &str,
        name: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Tag>, RegistryError> {
        let repo = format!("{}/{}", owner, name);
        self.paginate(self.tags.get(&repo), repo, page, per_page)
    }

    async fn rate_limit(&self) -> Result<RateLimit, RegistryError> {
        self.rate_limit_calls.fetch_add(1, Ordering::SeqCst);
        Ok(RateLimit {
            limit: 5000,
            remaining: self.remaining,
            reset: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        })
    }
}

/// Build a provider around `registry` with a fresh cache
pub async fn create_test_provider(
    registry: Arc<FakeRegistry>,
) -> (GitHubProvider, Arc<Cache>, Arc<AtomicGauge>) {
    let cache = Arc::new(Cache::new(Duration::from_secs(3600)));
    let gauge = Arc::new(AtomicGauge::rate_limit_remaining());
    let provider = GitHubProvider::new(registry, cache.clone(), gauge.clone())
        .await
        .unwrap();
    (provider, cache, gauge)
}

pub fn remote_version(repo: &str, strategy: &str, pattern: &str, constraint: &str) -> RemoteVersion {
    RemoteVersion {
        repo: repo.to_string(),
        strategy: strategy.to_string(),
        extraction: ExtractionConfig {
            regex: RegexExtraction {
                pattern: pattern.to_string(),
                result: "$1".to_string(),
            },
        },
        constraint: constraint.to_string(),
    }
}
