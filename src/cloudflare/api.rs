//! Low-level Cloudflare REST API client.
//!
//! [`Client::call`] is the single point where requests leave the process. It
//! never fails on a non-2xx status: the body is parsed whatever the status
//! and handed back alongside it, so callers can pass Cloudflare's envelope
//! straight through. The typed helpers layered on top interpret that
//! envelope and turn `success: false` into [`UpstreamError::Api`].
//!
//! # API Reference
//!
//! - [DNS Records](https://developers.cloudflare.com/api/resources/dns/subresources/records/)
//! - [Zones](https://developers.cloudflare.com/api/resources/zones/)

use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::HttpClientConfig;

/// The Cloudflare API base URL.
pub const CLOUDFLARE_API_URL: &str = "https://api.cloudflare.com/client/v4";

/// Page size used when walking zone listings. Cloudflare caps zones at 50.
const ZONES_PER_PAGE: u32 = 50;

/// Errors returned by the upstream client.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The request never produced a response (connection, TLS, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Cloudflare answered with `success: false`.
    #[error("API error (HTTP {status}): {}", join_errors(.errors))]
    Api {
        /// HTTP status of the response.
        status: u16,
        /// Errors reported in the envelope.
        errors: Vec<ApiError>,
    },

    /// The envelope's `result` did not have the expected shape.
    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
}

impl UpstreamError {
    /// Short machine-readable category: `transport`, `api` or `decode`.
    pub fn reason(&self) -> &'static str {
        match self {
            UpstreamError::Transport(_) => "transport",
            UpstreamError::Api { .. } => "api",
            UpstreamError::Decode(_) => "decode",
        }
    }

    /// JSON form used in merged outcomes.
    ///
    /// Logical failures keep Cloudflare's `errors` array; everything else
    /// becomes the error message.
    pub fn to_json(&self) -> Value {
        match self {
            UpstreamError::Api { errors, .. } if !errors.is_empty() => {
                serde_json::to_value(errors).unwrap_or_else(|_| Value::String(self.to_string()))
            }
            _ => Value::String(self.to_string()),
        }
    }
}

fn join_errors(errors: &[ApiError]) -> String {
    if errors.is_empty() {
        return "unknown error".to_string();
    }
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Cloudflare API error entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApiError {
    /// Error code.
    #[serde(default)]
    pub code: i64,
    /// Error message.
    #[serde(default)]
    pub message: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Pagination info attached to list responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultInfo {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub total_count: u32,
}

/// A parsed upstream response: HTTP status plus the JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body; `{}` when the body was empty or not JSON.
    pub body: Value,
}

impl UpstreamResponse {
    /// Returns `true` when the envelope says `success: true`.
    pub fn is_success(&self) -> bool {
        self.body.get("success").and_then(Value::as_bool) == Some(true)
    }

    /// Errors listed in the envelope, if any.
    pub fn errors(&self) -> Vec<ApiError> {
        self.body
            .get("errors")
            .cloned()
            .and_then(|errors| serde_json::from_value(errors).ok())
            .unwrap_or_default()
    }

    /// Pagination info, if present.
    pub fn result_info(&self) -> Option<ResultInfo> {
        self.body
            .get("result_info")
            .cloned()
            .and_then(|info| serde_json::from_value(info).ok())
    }

    /// Interprets the envelope, returning the deserialized `result`.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, UpstreamError> {
        if !self.is_success() {
            return Err(UpstreamError::Api {
                status: self.status,
                errors: self.errors(),
            });
        }

        let result = match self.body {
            Value::Object(mut map) => map.remove("result").unwrap_or(Value::Null),
            _ => Value::Null,
        };
        Ok(serde_json::from_value(result)?)
    }
}

// =============================================================================
// Zone and DNS Record Types
// =============================================================================

/// A Cloudflare zone.
#[derive(Debug, Clone, Deserialize)]
pub struct Zone {
    /// Zone ID (32-character hex string).
    pub id: String,
    /// Domain name.
    pub name: String,
    /// Zone status.
    #[serde(default)]
    pub status: Option<String>,
}

/// A DNS record from Cloudflare.
#[derive(Debug, Clone, Deserialize)]
pub struct DnsRecord {
    /// Record ID.
    pub id: String,
    /// Fully qualified record name.
    #[serde(default)]
    pub name: String,
    /// Record type (A, AAAA, CNAME, etc.).
    #[serde(rename = "type", default)]
    pub record_type: String,
    /// Record content.
    #[serde(default)]
    pub content: String,
    /// Whether the record is proxied through Cloudflare.
    #[serde(default)]
    pub proxied: bool,
    /// TTL in seconds. 1 = automatic.
    #[serde(default)]
    pub ttl: u32,
}

/// Request body for creating or updating a CNAME record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CnameRecordRequest {
    #[serde(rename = "type")]
    pub record_type: &'static str,
    pub name: String,
    pub content: String,
    pub proxied: bool,
    /// Omitted on updates so the existing TTL is kept.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
}

impl CnameRecordRequest {
    /// TTL value Cloudflare reads as "automatic".
    pub const AUTO_TTL: u32 = 1;

    /// Body for a new proxied CNAME with automatic TTL.
    pub fn create(name: &str, content: &str) -> Self {
        Self {
            record_type: "CNAME",
            name: name.to_string(),
            content: content.to_string(),
            proxied: true,
            ttl: Some(Self::AUTO_TTL),
        }
    }

    /// Body for repointing an existing CNAME.
    pub fn update(name: &str, content: &str) -> Self {
        Self {
            ttl: None,
            ..Self::create(name, content)
        }
    }
}

// =============================================================================
// API Client
// =============================================================================

/// Cloudflare API client.
///
/// Holds only the connection pool and base URL; the bearer token is passed
/// on every call so one client can serve Pages and zone credentials alike.
#[derive(Debug, Clone)]
pub struct Client {
    http_client: reqwest::Client,
    base_url: String,
}

impl Client {
    /// Creates a client for the public Cloudflare API.
    pub fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Self::with_base_url(CLOUDFLARE_API_URL, HttpClientConfig::default())
    }

    /// Creates a client with custom HTTP configuration.
    pub fn with_config(
        config: HttpClientConfig,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Self::with_base_url(CLOUDFLARE_API_URL, config)
    }

    /// Creates a client with a custom base URL.
    ///
    /// This is primarily useful for testing with mock servers.
    pub fn with_base_url(
        base_url: &str,
        config: HttpClientConfig,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(addr) = config.local_address {
            builder = builder.local_address(addr);
        }

        #[cfg(any(
            target_os = "android",
            target_os = "fuchsia",
            target_os = "linux",
            target_os = "macos",
            target_os = "ios",
            target_os = "tvos",
            target_os = "watchos",
            target_os = "illumos",
            target_os = "solaris",
        ))]
        if let Some(ref iface) = config.interface {
            builder = builder.interface(iface);
        }

        let http_client = builder.build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The base URL every path is appended to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issues one authenticated request.
    ///
    /// `path` is relative to the base URL and may carry a query string.
    /// Only transport failures are errors; the body is parsed regardless of
    /// status and falls back to `{}` when it is empty or not JSON.
    pub async fn call(
        &self,
        path: &str,
        method: Method,
        body: Option<&Value>,
        token: &str,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, path, "upstream request");

        let mut request = self
            .http_client
            .request(method, &url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let body = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::Object(Map::new()));

        debug!(status, path, "upstream response");
        Ok(UpstreamResponse { status, body })
    }

    /// GET `path` and deserialize the envelope's `result`.
    pub(crate) async fn get_result<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
    ) -> Result<T, UpstreamError> {
        self.call(path, Method::GET, None, token)
            .await?
            .into_result()
    }

    /// GET every page of a list endpoint.
    pub(crate) async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        per_page: u32,
        token: &str,
    ) -> Result<Vec<T>, UpstreamError> {
        let separator = if path.contains('?') { '&' } else { '?' };
        let mut all_results = Vec::new();
        let mut page = 1u32;

        loop {
            let page_path = format!("{path}{separator}page={page}&per_page={per_page}");
            let response = self.call(&page_path, Method::GET, None, token).await?;
            let info = response.result_info();
            let results: Option<Vec<T>> = response.into_result()?;

            let Some(results) = results else { break };
            let count = results.len();
            all_results.extend(results);

            match info {
                Some(info) if page < info.total_pages && count > 0 => page += 1,
                _ => break,
            }
        }

        Ok(all_results)
    }

    /// POST/PATCH a serializable body and deserialize the `result`.
    async fn send_result<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        method: Method,
        body: &Req,
        token: &str,
    ) -> Result<Resp, UpstreamError> {
        let body = serde_json::to_value(body)?;
        self.call(path, method, Some(&body), token)
            .await?
            .into_result()
    }

    // =========================================================================
    // Zone APIs
    // =========================================================================

    /// Lists every zone visible to `token`.
    pub async fn list_zones(&self, token: &str) -> Result<Vec<Zone>, UpstreamError> {
        self.get_all("/zones", ZONES_PER_PAGE, token).await
    }

    /// Looks zones up by exact name. Normally zero or one result.
    pub async fn find_zones_by_name(
        &self,
        name: &str,
        token: &str,
    ) -> Result<Vec<Zone>, UpstreamError> {
        let zones: Option<Vec<Zone>> = self
            .get_result(&format!("/zones?name={}", urlencoding::encode(name)), token)
            .await?;
        Ok(zones.unwrap_or_default())
    }

    // =========================================================================
    // DNS Record APIs
    // =========================================================================

    /// Lists CNAME records named `name` in a zone.
    pub async fn list_cname_records(
        &self,
        zone_id: &str,
        name: &str,
        token: &str,
    ) -> Result<Vec<DnsRecord>, UpstreamError> {
        let records: Option<Vec<DnsRecord>> = self
            .get_result(
                &format!(
                    "/zones/{}/dns_records?type=CNAME&name={}",
                    zone_id,
                    urlencoding::encode(name)
                ),
                token,
            )
            .await?;
        Ok(records.unwrap_or_default())
    }

    // Mutations are judged on the envelope's `success` flag alone; the
    // `result` is handed back as-is and may be `null` or partial.

    /// Creates a DNS record, returning the envelope's `result`.
    pub async fn create_record(
        &self,
        zone_id: &str,
        request: &CnameRecordRequest,
        token: &str,
    ) -> Result<Value, UpstreamError> {
        self.send_result(
            &format!("/zones/{}/dns_records", zone_id),
            Method::POST,
            request,
            token,
        )
        .await
    }

    /// Partially updates a DNS record, returning the envelope's `result`.
    pub async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        request: &CnameRecordRequest,
        token: &str,
    ) -> Result<Value, UpstreamError> {
        self.send_result(
            &format!("/zones/{}/dns_records/{}", zone_id, record_id),
            Method::PATCH,
            request,
            token,
        )
        .await
    }

    /// Deletes a DNS record, returning the envelope's `result`.
    pub async fn delete_record(
        &self,
        zone_id: &str,
        record_id: &str,
        token: &str,
    ) -> Result<Value, UpstreamError> {
        self.call(
            &format!("/zones/{}/dns_records/{}", zone_id, record_id),
            Method::DELETE,
            None,
            token,
        )
        .await?
        .into_result()
    }
}
