//! Cloudflare API access.
//!
//! Uses Bearer token authentication. Pages calls need a token with
//! "Cloudflare Pages: Edit"; zone and record calls need "Zone: Read" and
//! "DNS: Edit" on the zones involved. The two are frequently different
//! tokens, which is why every call takes its token explicitly.
//!
//! # Example
//!
//! ```no_run
//! use pagesdns::cloudflare::Client;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let client = Client::new()?;
//!
//! for zone in client.list_zones("zone-token").await? {
//!     println!("Zone: {} (ID: {})", zone.name, zone.id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod pages;

pub use api::{
    ApiError, Client, CnameRecordRequest, DnsRecord, UpstreamError, UpstreamResponse, Zone,
    CLOUDFLARE_API_URL,
};
pub use pages::{deployment_hostname, Pagination, Project, DEPLOYMENT_SUFFIX};
