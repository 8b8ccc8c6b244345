//! Registry implementations for listing repository releases and tags

pub mod github;

pub use github::GitHubRegistry;
