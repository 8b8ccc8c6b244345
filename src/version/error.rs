use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Rate limited: retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Repository not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConstraintError {
    #[error("Invalid constraint: {0}")]
    InvalidConstraint(String),

    #[error("Invalid version: {0}")]
    InvalidVersion(String),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Invalid repo: {0}. it must be in the format of: owner/name")]
    InvalidRepository(String),

    #[error("Strategy {0} is not supported")]
    UnsupportedStrategy(String),

    #[error("Invalid extraction pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to fetch from registry: {0}")]
    Fetch(#[source] RegistryError),

    #[error("Failed to check rate limit: {0}")]
    BudgetCheck(#[source] RegistryError),

    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}
