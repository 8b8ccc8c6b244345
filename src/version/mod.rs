//! Remote version resolution for GitHub-hosted repositories
//!
//! This module fetches releases or tags of a repository, caches the raw
//! listings, and turns their names into normalized version strings filtered
//! by an optional constraint.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Resolver   │────▶│    Cache    │     │   Budget    │
//! │ (pipeline)  │     │ (TTL, mem)  │     │  (gauge)    │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                                       │
//!        ▼                                       ▼
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Fetcher   │────▶│  Registry   │◀────│   GitHub    │
//! │ (paginate)  │     │   (trait)   │     │   (REST)    │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │
//!        ▼
//! ┌─────────────┐     ┌─────────────┐
//! │  Extractor  │────▶│ Constraint  │
//! │ (regex)     │     │ (semver)    │
//! └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`budget`]: Rate limit observation and the remaining-quota gauge
//! - [`cache`]: In-memory TTL cache of raw listings
//! - [`constraint`]: Version range expressions
//! - [`error`]: Error types for every layer
//! - [`extractor`]: Regex extraction of versions from names
//! - [`fetcher`]: Paginated collection of releases and tags
//! - [`registry`]: Registry trait for the hosting API
//! - [`registries`]: Concrete registry implementations (GitHub)
//! - [`resolver`]: The resolution pipeline
//! - [`semver`]: Shared semver utilities
//! - [`types`]: Repository identity, raw items and pages

pub mod budget;
pub mod cache;
pub mod constraint;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod registries;
pub mod registry;
pub mod resolver;
pub mod semver;
pub mod types;
