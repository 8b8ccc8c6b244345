//! Remote version resolution
//!
//! Ties the rate budget monitor, cache, fetcher, extractor and constraint
//! evaluator together. Releases and tags go through the same pipeline and
//! only differ in the listing that is fetched and the cache namespace.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{ProviderConfig, RemoteVersion};
use crate::version::budget::{Gauge, RateBudgetMonitor};
use crate::version::cache::{Cache, CacheKey};
use crate::version::constraint::Constraint;
use crate::version::error::ResolveError;
use crate::version::extractor::Extraction;
use crate::version::fetcher::fetch_all;
use crate::version::registries::GitHubRegistry;
use crate::version::registry::Registry;
use crate::version::types::{RawItem, RepositoryId, ResourceKind};

/// A validated resolution request
#[derive(Debug, Clone)]
pub struct ResolutionRequest {
    pub repo: RepositoryId,
    pub kind: ResourceKind,
    pub extraction: Extraction,
    pub constraint: Option<Constraint>,
}

impl ResolutionRequest {
    /// Build a request from its declarative form.
    ///
    /// The strategy is checked first so an unsupported strategy is reported
    /// before anything else about the request.
    pub fn from_config(conf: &RemoteVersion) -> Result<Self, ResolveError> {
        let kind = ResourceKind::from_strategy(&conf.strategy)?;
        let repo = RepositoryId::parse(&conf.repo)?;
        let extraction = Extraction::new(
            &conf.extraction.regex.pattern,
            &conf.extraction.regex.result,
        )?;
        let constraint = match conf.constraint.trim() {
            "" => None,
            expr => Some(Constraint::parse(expr)?),
        };

        Ok(Self {
            repo,
            kind,
            extraction,
            constraint,
        })
    }
}

/// Resolves remote versions from GitHub releases and tags
pub struct GitHubProvider {
    registry: Arc<dyn Registry>,
    cache: Arc<Cache>,
    budget: RateBudgetMonitor,
}

impl GitHubProvider {
    /// Create a provider, failing if the rate budget cannot be read
    pub async fn new(
        registry: Arc<dyn Registry>,
        cache: Arc<Cache>,
        gauge: Arc<dyn Gauge>,
    ) -> Result<Self, ResolveError> {
        let budget = RateBudgetMonitor::new(registry.clone(), gauge);
        let remaining = budget.check().await?;
        info!("GitHub provider ready, {} requests remaining", remaining);

        Ok(Self {
            registry,
            cache,
            budget,
        })
    }

    /// Create a provider talking to the GitHub REST API described by `config`
    pub async fn from_config(
        config: &ProviderConfig,
        cache: Arc<Cache>,
        gauge: Arc<dyn Gauge>,
    ) -> Result<Self, ResolveError> {
        let registry = GitHubRegistry::new(&config.base_url, config.token.clone());
        if !registry.is_authenticated() {
            debug!("no authentication provided. You might encounter Github API rate limiting issues.");
        }
        Self::new(Arc::new(registry), cache, gauge).await
    }

    /// Resolve the versions described by `conf`
    pub async fn get_versions(&self, conf: &RemoteVersion) -> Result<Vec<String>, ResolveError> {
        let request = ResolutionRequest::from_config(conf)?;
        self.resolve(&request).await
    }

    /// Resolve the versions for a validated request
    pub async fn resolve(&self, request: &ResolutionRequest) -> Result<Vec<String>, ResolveError> {
        self.budget.check().await?;

        let items = self.raw_items(request.kind, &request.repo).await?;
        let matched = extract_versions(&items, &request.extraction);
        debug!(
            repo = %request.repo,
            kind = %request.kind,
            "{} of {} items matched the extraction pattern",
            matched.len(),
            items.len()
        );

        filter_versions(matched, request.constraint.as_ref())
    }

    /// Cached items for `(kind, repo)`, fetching and caching them on a miss
    async fn raw_items(
        &self,
        kind: ResourceKind,
        repo: &RepositoryId,
    ) -> Result<Arc<[RawItem]>, ResolveError> {
        let key = CacheKey::new(kind, repo.clone());

        if let Some(items) = self.cache.get(&key)? {
            debug!(repo = %repo, "found {} in cache", kind);
            return Ok(items);
        }

        debug!(repo = %repo, "getting {}", kind);
        let items: Arc<[RawItem]> = fetch_all(self.registry.as_ref(), kind, repo)
            .await?
            .into();
        self.cache.set(key, items.clone())?;

        Ok(items)
    }
}

/// Run the extraction over every item, keeping matches in source order
pub fn extract_versions(items: &[RawItem], extraction: &Extraction) -> Vec<String> {
    items
        .iter()
        .filter_map(RawItem::version_source)
        .filter(|source| !source.is_empty())
        .filter_map(|source| extraction.extract(source))
        .collect()
}

/// Keep the versions satisfying `constraint`; no constraint keeps everything
pub fn filter_versions(
    versions: Vec<String>,
    constraint: Option<&Constraint>,
) -> Result<Vec<String>, ResolveError> {
    let Some(constraint) = constraint else {
        return Ok(versions);
    };

    let mut filtered = Vec::with_capacity(versions.len());
    for version in versions {
        if constraint.satisfies(&version)? {
            filtered.push(version);
        }
    }
    Ok(filtered)
}
