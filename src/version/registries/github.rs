//! GitHub REST API registry implementation

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::version::error::RegistryError;
use crate::version::registry::Registry;
use crate::version::types::{Page, RateLimit, Release, Tag};

/// Default base URL for GitHub API
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Response item from the GitHub Releases API
#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    #[serde(default)]
    tag_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// Response item from the GitHub Tags API
#[derive(Debug, Deserialize)]
struct TagResponse {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    resources: RateLimitResources,
}

#[derive(Debug, Deserialize)]
struct RateLimitResources {
    core: RateLimitCore,
}

#[derive(Debug, Deserialize)]
struct RateLimitCore {
    limit: u64,
    remaining: u64,
    reset: i64,
}

/// Registry implementation for the GitHub REST API
pub struct GitHubRegistry {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubRegistry {
    /// Creates a new GitHubRegistry with a custom base URL and optional token
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("remote-versions")
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    /// Returns true when requests are signed with a token
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, url: &str, resource: &str) -> Result<Response, RegistryError> {
        let response = self.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(resource.to_string()));
        }

        if status == StatusCode::TOO_MANY_REQUESTS
            || (status == StatusCode::FORBIDDEN && is_budget_exhausted(response.headers()))
        {
            return Err(RegistryError::RateLimited {
                retry_after_secs: retry_after_secs(response.headers(), Utc::now()),
            });
        }

        if !status.is_success() {
            warn!("GitHub API returned status {}: {}", status, url);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        Ok(response)
    }

    async fn list_page<T: DeserializeOwned>(
        &self,
        owner: &str,
        name: &str,
        collection: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page<T>, RegistryError> {
        let url = format!(
            "{}/repos/{}/{}/{}?per_page={}&page={}",
            self.base_url, owner, name, collection, per_page, page
        );
        debug!("GET {}", url);

        let response = self.send(&url, &format!("{}/{}", owner, name)).await?;
        let next_page = response
            .headers()
            .get("link")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_next_page);

        let items: Vec<T> = response.json().await.map_err(|e| {
            warn!("Failed to parse GitHub {} response: {}", collection, e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        Ok(Page::new(items, next_page))
    }
}

impl Default for GitHubRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, None)
    }
}

#[async_trait::async_trait]
impl Registry for GitHubRegistry {
    async fn list_releases(
        &self,
        owner: &str,
        name: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Release>, RegistryError> {
        let page: Page<ReleaseResponse> = self
            .list_page(owner, name, "releases", page, per_page)
            .await?;

        let releases = page
            .items
            .into_iter()
            .map(|r| Release {
                tag_name: r.tag_name.unwrap_or_default(),
                name: r.name.unwrap_or_default(),
            })
            .collect();

        Ok(Page::new(releases, page.next_page))
    }

    async fn list_tags(
        &self,
        owner: &str,
        name: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Tag>, RegistryError> {
        let page: Page<TagResponse> = self.list_page(owner, name, "tags", page, per_page).await?;

        let tags = page
            .items
            .into_iter()
            .map(|t| Tag {
                name: t.name.unwrap_or_default(),
            })
            .collect();

        Ok(Page::new(tags, page.next_page))
    }

    async fn rate_limit(&self) -> Result<RateLimit, RegistryError> {
        let url = format!("{}/rate_limit", self.base_url);
        let response = self.send(&url, "rate_limit").await?;

        let body: RateLimitResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse GitHub rate limit response: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        let core = body.resources.core;
        let reset = DateTime::from_timestamp(core.reset, 0).ok_or_else(|| {
            RegistryError::InvalidResponse(format!("Invalid reset timestamp: {}", core.reset))
        })?;

        Ok(RateLimit {
            limit: core.limit,
            remaining: core.remaining,
            reset,
        })
    }
}

/// Extract the page number of the `rel="next"` link from a `Link` header
fn parse_next_page(link: &str) -> Option<u32> {
    link.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|p| p.trim() == r#"rel="next""#);
        if !is_next {
            return None;
        }

        let url = Url::parse(target.strip_prefix('<')?.strip_suffix('>')?).ok()?;
        url.query_pairs()
            .find(|(k, _)| k == "page")
            .and_then(|(_, v)| v.parse().ok())
            .filter(|page| *page > 0)
    })
}

fn is_budget_exhausted(headers: &HeaderMap) -> bool {
    headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "0")
}

/// Seconds to wait, from `retry-after` or else the `x-ratelimit-reset` epoch
fn retry_after_secs(headers: &HeaderMap, now: DateTime<Utc>) -> Option<u64> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    if let Some(secs) = header("retry-after").and_then(|v| v.parse().ok()) {
        return Some(secs);
    }

    let reset: i64 = header("x-ratelimit-reset")?.parse().ok()?;
    Some(reset.saturating_sub(now.timestamp()).max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use rstest::rstest;

    #[rstest]
    #[case(
        r#"<https://api.github.com/repositories/1/tags?per_page=100&page=2>; rel="next", <https://api.github.com/repositories/1/tags?per_page=100&page=5>; rel="last""#,
        Some(2)
    )]
    #[case(
        r#"<https://api.github.com/repositories/1/tags?page=1>; rel="prev", <https://api.github.com/repositories/1/tags?page=1>; rel="first""#,
        None
    )]
    #[case(r#"<https://api.github.com/x?page=0>; rel="next""#, None)]
    #[case("garbage", None)]
    #[case("", None)]
    fn parse_next_page_returns_expected(#[case] link: &str, #[case] expected: Option<u32>) {
        assert_eq!(parse_next_page(link), expected);
    }

    #[tokio::test]
    async fn list_releases_returns_page_with_next_cursor() {
        let mut server = Server::new_async().await;
        let link = format!(
            r#"<{}/repos/actions/checkout/releases?per_page=100&page=2>; rel="next""#,
            server.url()
        );

        let mock = server
            .mock("GET", "/repos/actions/checkout/releases")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("per_page".into(), "100".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("link", &link)
            .with_body(
                r#"[
                    {"tag_name": "v4.1.0", "name": "v4.1.0"},
                    {"tag_name": "v4.0.0", "name": null},
                    {"tag_name": "", "name": "Draft"}
                ]"#,
            )
            .create_async()
            .await;

        let registry = GitHubRegistry::new(&server.url(), None);
        let page = registry
            .list_releases("actions", "checkout", 1, 100)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(page.next_page, Some(2));
        assert_eq!(
            page.items,
            vec![
                Release {
                    tag_name: "v4.1.0".to_string(),
                    name: "v4.1.0".to_string()
                },
                Release {
                    tag_name: "v4.0.0".to_string(),
                    name: String::new()
                },
                Release {
                    tag_name: String::new(),
                    name: "Draft".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn list_tags_returns_last_page_without_link_header() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/golang/go/tags")
            .match_query(Matcher::UrlEncoded("page".into(), "3".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"name": "go1.22.0"}, {"name": "go1.21.7"}]"#)
            .create_async()
            .await;

        let registry = GitHubRegistry::new(&server.url(), None);
        let page = registry.list_tags("golang", "go", 3, 100).await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.next_page, None);
        assert_eq!(
            page.items,
            vec![
                Tag {
                    name: "go1.22.0".to_string()
                },
                Tag {
                    name: "go1.21.7".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn requests_carry_bearer_token_when_configured() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/some/repo/tags")
            .match_query(Matcher::Any)
            .match_header("authorization", "Bearer secret-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let registry = GitHubRegistry::new(&server.url(), Some("secret-token".to_string()));
        let page = registry.list_tags("some", "repo", 1, 100).await.unwrap();

        mock.assert_async().await;
        assert!(registry.is_authenticated());
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn empty_token_is_treated_as_anonymous() {
        let registry = GitHubRegistry::new(DEFAULT_BASE_URL, Some(String::new()));
        assert!(!registry.is_authenticated());
    }

    #[tokio::test]
    async fn list_releases_returns_not_found_for_nonexistent_repo() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/nonexistent/repo/releases")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": "Not Found"}"#)
            .create_async()
            .await;

        let registry = GitHubRegistry::new(&server.url(), None);
        let result = registry.list_releases("nonexistent", "repo", 1, 100).await;

        mock.assert_async().await;
        assert!(matches!(result, Err(RegistryError::NotFound(r)) if r == "nonexistent/repo"));
    }

    #[tokio::test]
    async fn list_tags_returns_rate_limited_for_exhausted_budget() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/actions/checkout/tags")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_header("content-type", "application/json")
            .with_header("x-ratelimit-remaining", "0")
            .with_header("retry-after", "60")
            .with_body(r#"{"message": "API rate limit exceeded"}"#)
            .create_async()
            .await;

        let registry = GitHubRegistry::new(&server.url(), None);
        let result = registry.list_tags("actions", "checkout", 1, 100).await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(RegistryError::RateLimited {
                retry_after_secs: Some(60)
            })
        ));
    }

    #[tokio::test]
    async fn forbidden_with_remaining_budget_is_invalid_response() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/private/repo/tags")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_header("x-ratelimit-remaining", "4999")
            .with_body(r#"{"message": "Forbidden"}"#)
            .create_async()
            .await;

        let registry = GitHubRegistry::new(&server.url(), None);
        let result = registry.list_tags("private", "repo", 1, 100).await;

        mock.assert_async().await;
        assert!(matches!(result, Err(RegistryError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn rate_limit_returns_core_budget() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/rate_limit")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "resources": {
                        "core": {"limit": 5000, "remaining": 4321, "reset": 1700000000, "used": 679},
                        "search": {"limit": 30, "remaining": 30, "reset": 1700000000, "used": 0}
                    },
                    "rate": {"limit": 5000, "remaining": 4321, "reset": 1700000000, "used": 679}
                }"#,
            )
            .create_async()
            .await;

        let registry = GitHubRegistry::new(&server.url(), None);
        let limit = registry.rate_limit().await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            limit,
            RateLimit {
                limit: 5000,
                remaining: 4321,
                reset: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            }
        );
    }

    #[tokio::test]
    async fn rate_limit_returns_invalid_response_for_malformed_body() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/rate_limit")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"unexpected": true}"#)
            .create_async()
            .await;

        let registry = GitHubRegistry::new(&server.url(), None);
        let result = registry.rate_limit().await;

        mock.assert_async().await;
        assert!(matches!(result, Err(RegistryError::InvalidResponse(_))));
    }

    #[test]
    fn retry_after_falls_back_to_reset_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-reset", "1700000090".parse().unwrap());
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        assert_eq!(retry_after_secs(&headers, now), Some(90));
    }
}
