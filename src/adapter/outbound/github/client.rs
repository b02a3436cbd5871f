//! GitHub REST API client.
//!
//! Owns transport concerns only: authentication headers, URL building,
//! JSON decoding and rate-limit header parsing. Each call sends exactly
//! one request. Waiting and retrying belong to the governed layer above.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_LENGTH, USER_AGENT};
use reqwest::{Client as HttpClient, Method, Response};
use tracing::debug;
use url::Url;

use super::dto::{ErrorBody, UserDto};
use crate::config::{GithubConfig, TOKEN_ENV};
use crate::domain::{Entity, Handle, MutationKind, RelationKind};
use crate::error::{ApiError, ConfigError, Result};
use crate::port::{ApiResponse, GraphApi, RateSnapshot};

const API_VERSION: &str = "2022-11-28";
const MEDIA_TYPE: &str = "application/vnd.github+json";

/// HTTP client for the GitHub REST API.
pub struct GithubClient {
    http: HttpClient,
    base_url: Url,
}

impl GithubClient {
    /// Build a client authenticated with `token`.
    #[allow(clippy::result_large_err)]
    pub fn new(config: &GithubConfig, token: &str) -> Result<Self> {
        let base_url = Url::parse(&config.api_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidValue {
                field: "api_url",
                reason: "must be an http(s) base URL".into(),
            }
            .into());
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.trim())).map_err(|_| {
            ConfigError::InvalidValue {
                field: TOKEN_ENV,
                reason: "contains characters not allowed in a header".into(),
            }
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static(MEDIA_TYPE));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("followgraph/", env!("CARGO_PKG_VERSION"))),
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.http.timeout_ms))
            .connect_timeout(Duration::from_millis(config.http.connect_timeout_ms))
            .build()?;

        Ok(Self { http, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send one request. A request that never got a response maps to
    /// [`ApiError::Transient`].
    async fn send(&self, method: Method, url: Url) -> std::result::Result<Response, ApiError> {
        let mut request = self.http.request(method.clone(), url.clone());
        if method == Method::PUT {
            request = request.header(CONTENT_LENGTH, 0);
        }

        let response = request
            .send()
            .await
            .map_err(|err| ApiError::Transient(err.without_url().to_string()))?;
        debug!(
            %method,
            path = url.path(),
            status = response.status().as_u16(),
            "GitHub response"
        );
        Ok(response)
    }

    /// Decode a JSON body on 2xx; on anything else keep the error message.
    async fn decode<T>(response: Response) -> std::result::Result<ApiResponse<Option<T>>, ApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        let status = response.status().as_u16();
        let rate = rate_snapshot(response.headers());
        let text = response
            .text()
            .await
            .map_err(|err| ApiError::Transient(err.without_url().to_string()))?;

        if !(200..300).contains(&status) {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.message)
                .unwrap_or(text);
            return Ok(ApiResponse::new(status, None)
                .with_rate(rate)
                .with_message(message));
        }

        let body = serde_json::from_str::<T>(&text).map_err(|err| ApiError::Unexpected {
            status,
            message: format!("invalid response body: {err}"),
        })?;
        Ok(ApiResponse::new(status, Some(body)).with_rate(rate))
    }

    async fn get_user(
        &self,
        url: Url,
    ) -> std::result::Result<ApiResponse<Option<Entity>>, ApiError> {
        let response = self.send(Method::GET, url).await?;
        let decoded = Self::decode::<UserDto>(response).await?;
        Ok(map_body(decoded, |dto| dto.map(Entity::from)))
    }
}

#[async_trait]
impl GraphApi for GithubClient {
    async fn list_page(
        &self,
        kind: RelationKind,
        page: u32,
        per_page: u32,
    ) -> std::result::Result<ApiResponse<Vec<Entity>>, ApiError> {
        let mut url = self.endpoint(&["user", kind.as_str()]);
        url.query_pairs_mut()
            .append_pair("per_page", &per_page.to_string())
            .append_pair("page", &page.to_string());

        let response = self.send(Method::GET, url).await?;
        let decoded = Self::decode::<Vec<UserDto>>(response).await?;
        Ok(map_body(decoded, |users| {
            users
                .unwrap_or_default()
                .into_iter()
                .map(Entity::from)
                .collect()
        }))
    }

    async fn mutate(
        &self,
        kind: MutationKind,
        handle: &Handle,
    ) -> std::result::Result<ApiResponse<()>, ApiError> {
        let method = match kind {
            MutationKind::Follow => Method::PUT,
            MutationKind::Unfollow => Method::DELETE,
        };
        let url = self.endpoint(&["user", "following", handle.as_str()]);
        let response = self.send(method, url).await?;

        let status = response.status().as_u16();
        let rate = rate_snapshot(response.headers());
        let mut result = ApiResponse::new(status, ()).with_rate(rate);
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.message)
                .unwrap_or(text);
            result = result.with_message(message);
        }
        Ok(result)
    }

    async fn user(
        &self,
        handle: &Handle,
    ) -> std::result::Result<ApiResponse<Option<Entity>>, ApiError> {
        self.get_user(self.endpoint(&["users", handle.as_str()])).await
    }

    async fn viewer(&self) -> std::result::Result<ApiResponse<Option<Entity>>, ApiError> {
        self.get_user(self.endpoint(&["user"])).await
    }

    fn platform_name(&self) -> &'static str {
        "GitHub"
    }
}

fn map_body<T, U>(response: ApiResponse<T>, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
    ApiResponse {
        status: response.status,
        rate: response.rate,
        body: f(response.body),
        message: response.message,
    }
}

/// Read `X-RateLimit-*` and `Retry-After` headers.
///
/// Missing or malformed headers leave the corresponding field empty.
pub(crate) fn rate_snapshot(headers: &HeaderMap) -> RateSnapshot {
    fn number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
        headers.get(name)?.to_str().ok()?.trim().parse().ok()
    }

    RateSnapshot {
        limit: number(headers, "x-ratelimit-limit"),
        remaining: number(headers, "x-ratelimit-remaining"),
        reset: number::<i64>(headers, "x-ratelimit-reset")
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        retry_after: number::<u64>(headers, "retry-after").map(Duration::from_secs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_url: &str) -> GithubClient {
        let config = GithubConfig {
            api_url: api_url.into(),
            ..GithubConfig::default()
        };
        GithubClient::new(&config, "ghp_test").unwrap()
    }

    #[test]
    fn parses_rate_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", HeaderValue::from_static("5000"));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("4999"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1700000000"));
        headers.insert("retry-after", HeaderValue::from_static("30"));

        let rate = rate_snapshot(&headers);
        assert_eq!(rate.limit, Some(5_000));
        assert_eq!(rate.remaining, Some(4_999));
        assert_eq!(rate.reset.map(|r| r.timestamp()), Some(1_700_000_000));
        assert_eq!(rate.retry_after, Some(Duration::from_secs(30)));
    }

    #[test]
    fn malformed_headers_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("lots"));
        assert!(rate_snapshot(&headers).is_empty());
    }

    #[test]
    fn endpoint_escapes_handles() {
        let client = client("https://api.github.com");
        let url = client.endpoint(&["user", "following", "odd name"]);
        assert_eq!(url.as_str(), "https://api.github.com/user/following/odd%20name");
    }

    #[test]
    fn endpoint_keeps_enterprise_prefix() {
        let client = client("https://ghe.example.com/api/v3/");
        let url = client.endpoint(&["users", "octocat"]);
        assert_eq!(url.as_str(), "https://ghe.example.com/api/v3/users/octocat");
    }

    #[tokio::test]
    async fn unreachable_host_is_transient() {
        let client = client("http://127.0.0.1:1");
        let result = client.list_page(RelationKind::Followers, 1, 5).await;
        assert!(matches!(result, Err(ApiError::Transient(_))));
    }

    #[test]
    fn rejects_header_breaking_token() {
        let result = GithubClient::new(&GithubConfig::default(), "bad\ntoken");
        assert!(result.is_err());
    }
}
