//! Cloudflare Pages custom-domain orchestration.
//!
//! `pagesdns` attaches custom domains to Cloudflare Pages projects and keeps a
//! matching CNAME record in the owning DNS zone. It is the core behind a small
//! administration API (see the `server` feature) but every building block is
//! usable on its own:
//!
//! - [`cloudflare::api::Client`] talks to the Cloudflare REST API.
//! - [`zone::ZoneResolver`] finds the zone that owns a hostname.
//! - [`dns::DnsUpserter`] creates or updates the CNAME record.
//! - [`orchestrator::Orchestrator`] ties them together for attachment and
//!   detachment, merging partial failures into one outcome.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pagesdns::cloudflare::Client;
//! use pagesdns::config::{HandlerConfig, MemoryConfigStore};
//! use pagesdns::orchestrator::{AttachRequest, Credentials, Orchestrator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let client = Client::new()?;
//! let store = Arc::new(MemoryConfigStore::default());
//! let orchestrator = Orchestrator::new(client, HandlerConfig::default(), store);
//!
//! let credentials = Credentials::new(Some("pages-token".into()), Some("zone-token".into()))?;
//! let outcome = orchestrator
//!     .attach_domain("account-id", "my-site", &AttachRequest::new("www.example.com"), &credentials)
//!     .await?;
//! println!("{} {}", outcome.status, outcome.to_json());
//! # Ok(())
//! # }
//! ```

use std::net::IpAddr;
use std::time::Duration;

pub mod cloudflare;
pub mod config;
pub mod dns;
pub mod orchestrator;
pub mod zone;

#[cfg(feature = "server")]
pub mod server;

pub use cloudflare::{Client, UpstreamError, UpstreamResponse};
pub use config::{ConfigStore, HandlerConfig, ZoneRegistry};
pub use dns::{DnsDeleteResult, DnsUpsertResult, DnsUpserter};
pub use orchestrator::{AttachmentOutcome, DetachmentOutcome, Orchestrator};
pub use zone::ZoneResolver;

/// Settings for the underlying HTTP client.
///
/// Requests have no timeout unless one is set here; a hanging upstream call
/// is bounded only by the caller dropping the future.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use pagesdns::HttpClientConfig;
///
/// let config = HttpClientConfig::new()
///     .local_address("127.0.0.1".parse().unwrap())
///     .timeout(Duration::from_secs(10));
/// assert_eq!(config.timeout, Some(Duration::from_secs(10)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpClientConfig {
    /// Local address to bind outgoing connections to.
    pub local_address: Option<IpAddr>,
    /// Network interface to bind outgoing connections to.
    pub interface: Option<String>,
    /// Per-request timeout.
    pub timeout: Option<Duration>,
}

impl HttpClientConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds outgoing connections to `addr`.
    pub fn local_address(mut self, addr: IpAddr) -> Self {
        self.local_address = Some(addr);
        self
    }

    /// Binds outgoing connections to the named interface.
    ///
    /// Only honoured on platforms where reqwest supports `SO_BINDTODEVICE`
    /// style binding.
    pub fn interface(mut self, name: impl Into<String>) -> Self {
        self.interface = Some(name.into());
        self
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
