//! Common types shared by the fetcher, cache and resolver

use std::fmt;

use chrono::{DateTime, Utc};

use crate::version::error::ResolveError;

/// Repository identity in the form `owner/name`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryId {
    owner: String,
    name: String,
}

impl RepositoryId {
    /// Parses `owner/name`, splitting on the first `/`.
    ///
    /// Both segments must be non-empty. Anything after the first `/` belongs
    /// to the name segment.
    pub fn parse(repo: &str) -> Result<Self, ResolveError> {
        let (owner, name) = split_repo(repo)?;
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Split a repository string into its owner and name segments
pub fn split_repo(repo: &str) -> Result<(&str, &str), ResolveError> {
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() => Ok((owner, name)),
        _ => Err(ResolveError::InvalidRepository(repo.to_string())),
    }
}

/// Which paginated collection of a repository to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Releases,
    Tags,
}

impl ResourceKind {
    /// Returns the string representation used in cache keys and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Releases => "releases",
            ResourceKind::Tags => "tags",
        }
    }

    /// Maps a configured strategy onto a resource kind
    pub fn from_strategy(strategy: &str) -> Result<Self, ResolveError> {
        match strategy {
            "releases" => Ok(ResourceKind::Releases),
            "tags" => Ok(ResourceKind::Tags),
            other => Err(ResolveError::UnsupportedStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A GitHub release as far as version resolution cares
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Release {
    pub tag_name: String,
    pub name: String,
}

/// A GitHub tag as far as version resolution cares
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tag {
    pub name: String,
}

/// One raw item from a repository listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawItem {
    Release(Release),
    Tag(Tag),
}

impl RawItem {
    /// Returns the string the extraction pattern runs against.
    ///
    /// Releases without a tag are skipped; for tagged releases the display
    /// name is used. Tags are skipped when their name is empty.
    pub fn version_source(&self) -> Option<&str> {
        match self {
            RawItem::Release(release) if release.tag_name.is_empty() => None,
            RawItem::Release(release) => Some(&release.name),
            RawItem::Tag(tag) if tag.name.is_empty() => None,
            RawItem::Tag(tag) => Some(&tag.name),
        }
    }
}

impl From<Release> for RawItem {
    fn from(release: Release) -> Self {
        RawItem::Release(release)
    }
}

impl From<Tag> for RawItem {
    fn from(tag: Tag) -> Self {
        RawItem::Tag(tag)
    }
}

/// One page of a listing together with the next-page cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// `None` when the host reports no further page
    pub next_page: Option<u32>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_page: Option<u32>) -> Self {
        Self { items, next_page }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }
}

/// Core API rate limit status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    pub reset: DateTime<Utc>,
}
