//! Request/response exchange with the platform API
//!
//! Each attempt takes a rate-limit token for its resource path before it is
//! sent; the whole exchange runs under the retry executor.

use super::envelope::{parse_retry_after, ApiEnvelope, GatewayIndex};
use crate::error::{ApiError, HttpError, HttpResult};
use crate::ratelimit::RateLimiter;
use crate::retry::{RetryExecutor, RetryPolicy};
use chrono::Utc;
use kook_common::{ClientConfig, TokenType};
use reqwest::header::{HeaderMap, AUTHORIZATION, RETRY_AFTER, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const API_VERSION: &str = "v3";
const DEFAULT_BASE_URL: &str = "https://www.kookapp.cn/api";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Platform API client
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    authorization: String,
    user_agent: String,
    rate_limiter: Option<Arc<RateLimiter>>,
    retry: Option<RetryExecutor>,
}

impl HttpClient {
    #[must_use]
    pub fn builder(token: impl Into<String>) -> HttpClientBuilder {
        HttpClientBuilder::new(token)
    }

    /// Build a client from loaded configuration with default limits and retry
    pub fn from_config(config: &ClientConfig) -> HttpResult<Self> {
        Self::builder(config.token.clone())
            .token_type(config.token_type)
            .base_url(config.http.base_url.clone())
            .timeout(config.http.timeout)
            .user_agent(config.http.user_agent.clone())
            .build()
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn rate_limiter(&self) -> Option<&Arc<RateLimiter>> {
        self.rate_limiter.as_ref()
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> HttpResult<T> {
        self.request(Method::GET, path, query, None).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> HttpResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = encode_body(body)?;
        self.request(Method::POST, path, &[], Some(&body)).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> HttpResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = encode_body(body)?;
        self.request(Method::PUT, path, &[], Some(&body)).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> HttpResult<T> {
        self.request(Method::DELETE, path, query, None).await
    }

    /// Resolve the streaming gateway URL
    pub async fn gateway_url(&self, compress: bool) -> HttpResult<String> {
        let compress = if compress { "1" } else { "0" };
        let index: GatewayIndex = self.get("gateway/index", &[("compress", compress)]).await?;
        if index.url.is_empty() {
            return Err(HttpError::Decode("gateway/index returned an empty url".into()));
        }
        Ok(index.url)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> HttpResult<T> {
        let path = path.trim_start_matches('/');
        let url = format!("{}/{API_VERSION}/{path}", self.base_url);
        let url = url.as_str();

        let data = match &self.retry {
            Some(retry) => {
                retry
                    .execute(|attempt| self.send_once(method.clone(), path, url, query, body, attempt))
                    .await?
            }
            None => self.send_once(method, path, url, query, body, 1).await?,
        };

        serde_json::from_value(data).map_err(|e| HttpError::Decode(format!("{path}: {e}")))
    }

    async fn send_once(
        &self,
        method: Method,
        path: &str,
        url: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
        attempt: u32,
    ) -> HttpResult<Value> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire(path).await;
        }

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(AUTHORIZATION, &self.authorization)
            .header(USER_AGENT, &self.user_agent);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        tracing::debug!(method = %method, path, attempt, "Sending API request");

        let response = request.send().await.map_err(HttpError::from_transport)?;
        let status = response.status();
        let request_id = header_string(response.headers(), REQUEST_ID_HEADER);
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| parse_retry_after(v, Utc::now()));
        let bytes = response.bytes().await.map_err(HttpError::from_transport)?;

        let reject = |code: i32, message: String| {
            let err = ApiError::new(code, message)
                .with_status(status.as_u16())
                .with_context(method.as_str(), path)
                .with_request_id(request_id.clone())
                .with_retry_after(retry_after);
            tracing::warn!(
                code = err.code,
                status = err.http_status,
                request_id = ?err.request_id,
                error = %err,
                "API request rejected"
            );
            HttpError::Api(err)
        };

        match serde_json::from_slice::<ApiEnvelope>(&bytes) {
            Ok(envelope) if envelope.is_ok() && status.is_success() => Ok(envelope.data),
            Ok(envelope) => {
                let code = if envelope.code == 0 {
                    i32::from(status.as_u16())
                } else {
                    envelope.code
                };
                Err(reject(code, envelope.message))
            }
            Err(_) if !status.is_success() => Err(reject(
                i32::from(status.as_u16()),
                body_excerpt(&bytes, status),
            )),
            Err(e) => Err(HttpError::Decode(format!("{path}: {e}"))),
        }
    }
}

fn encode_body<B: Serialize + ?Sized>(body: &B) -> HttpResult<Value> {
    serde_json::to_value(body).map_err(|e| HttpError::Validation {
        field: "body",
        message: e.to_string(),
    })
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn body_excerpt(bytes: &[u8], status: StatusCode) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    if text.is_empty() {
        status.canonical_reason().unwrap_or("empty response").to_string()
    } else {
        text.chars().take(200).collect()
    }
}

/// Builder for [`HttpClient`]
#[derive(Debug)]
pub struct HttpClientBuilder {
    token: String,
    token_type: TokenType,
    base_url: String,
    timeout: Duration,
    user_agent: String,
    rate_limiter: Option<Arc<RateLimiter>>,
    retry: Option<RetryPolicy>,
}

impl HttpClientBuilder {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            token_type: TokenType::Bot,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("kook-rs/", env!("CARGO_PKG_VERSION")).to_string(),
            rate_limiter: Some(Arc::new(RateLimiter::default())),
            retry: Some(RetryPolicy::default()),
        }
    }

    #[must_use]
    pub fn token_type(mut self, token_type: TokenType) -> Self {
        self.token_type = token_type;
        self
    }

    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Share a limiter between clients
    #[must_use]
    pub fn rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    #[must_use]
    pub fn without_rate_limit(mut self) -> Self {
        self.rate_limiter = None;
        self
    }

    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Send every request exactly once
    #[must_use]
    pub fn without_retry(mut self) -> Self {
        self.retry = None;
        self
    }

    pub fn build(self) -> HttpResult<HttpClient> {
        if self.token.trim().is_empty() {
            return Err(HttpError::Validation {
                field: "token",
                message: "must not be empty".into(),
            });
        }
        let base_url = self.base_url.trim_end_matches('/').to_string();
        if reqwest::Url::parse(&base_url).is_err() {
            return Err(HttpError::Validation {
                field: "base_url",
                message: format!("not a valid URL: {base_url}"),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.timeout.min(MAX_CONNECT_TIMEOUT))
            .build()
            .map_err(HttpError::Network)?;

        Ok(HttpClient {
            http,
            base_url,
            authorization: self.token_type.authorization(&self.token),
            user_agent: self.user_agent,
            rate_limiter: self.rate_limiter,
            retry: self.retry.map(RetryExecutor::new),
        })
    }
}
