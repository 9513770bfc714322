//! Domain attachment and detachment.
//!
//! Each run is a strict sequence of upstream calls. The primary call
//! (registering or removing the Pages domain) decides the status code and
//! whether anything else happens; the DNS steps after it only ever add
//! fields to the outcome.

mod attach;
mod detach;

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::cloudflare::{Client, UpstreamError};
use crate::config::{ConfigError, ConfigStore, HandlerConfig, UserConfig, ZoneRegistry};
use crate::dns::{DnsDeleteResult, DnsUpsertResult};
use crate::zone::ZoneResolver;

/// A required credential is missing. Raised before any upstream call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Pages token not provided")]
    MissingPagesToken,
}

/// Tokens for one request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pages: String,
    zone: Option<String>,
}

impl Credentials {
    /// Builds credentials; the Pages token is mandatory. Empty strings
    /// count as absent.
    pub fn new(pages: Option<String>, zone: Option<String>) -> Result<Self, ConfigurationError> {
        let pages = pages
            .filter(|t| !t.is_empty())
            .ok_or(ConfigurationError::MissingPagesToken)?;
        Ok(Self {
            pages,
            zone: zone.filter(|t| !t.is_empty()),
        })
    }

    /// Token used for Pages calls.
    pub fn pages(&self) -> &str {
        &self.pages
    }

    /// Generic zone token, if any.
    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("pages", &"<redacted>")
            .field("zone", &self.zone.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Body of an attachment request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AttachRequest {
    pub name: String,
    /// Set to `false` to register the domain without touching DNS.
    #[serde(default = "default_create_dns")]
    pub create_dns: bool,
}

fn default_create_dns() -> bool {
    true
}

impl AttachRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            create_dns: true,
        }
    }

    pub fn without_dns(mut self) -> Self {
        self.create_dns = false;
        self
    }
}

/// Why the DNS step did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The request asked for no DNS changes.
    Disabled,
    /// Neither configuration nor discovery found an owning zone.
    NoMatchingZone,
    /// A zone was found but no token can edit it.
    NoZoneToken,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Disabled => write!(f, "DNS creation disabled"),
            SkipReason::NoMatchingZone => write!(f, "no matching zone"),
            SkipReason::NoZoneToken => write!(f, "no zone token"),
        }
    }
}

/// DNS part of an attachment.
#[derive(Debug)]
pub enum AttachDns {
    Skipped(SkipReason),
    Attempted {
        parent_zone: String,
        target: String,
        result: DnsUpsertResult,
    },
}

/// Merged result of [`Orchestrator::attach`].
#[derive(Debug)]
pub struct AttachmentOutcome {
    /// Status of the registration call.
    pub status: u16,
    /// Registration envelope as returned by Cloudflare.
    pub registration: Value,
    /// CNAME target for this project.
    pub deployment_hostname: String,
    /// `None` when registration failed and DNS was never considered.
    pub dns: Option<AttachDns>,
}

impl AttachmentOutcome {
    /// Whether the Pages domain was registered.
    pub fn is_registered(&self) -> bool {
        self.registration.get("success").and_then(Value::as_bool) == Some(true)
    }

    /// The registration envelope with the DNS fields merged in.
    pub fn to_json(&self) -> Value {
        let mut body = envelope_map(&self.registration);

        match &self.dns {
            None => {}
            Some(AttachDns::Skipped(reason)) => {
                body.insert("dns_created".into(), json!(false));
                body.insert("dns_skipped".into(), json!(true));
                body.insert("dns_error".into(), json!(reason.to_string()));
            }
            Some(AttachDns::Attempted {
                parent_zone,
                target,
                result,
            }) => {
                body.insert("parent_zone".into(), json!(parent_zone));
                match result {
                    DnsUpsertResult::Created { record_id, .. } => {
                        body.insert("dns_created".into(), json!(true));
                        body.insert("dns_target".into(), json!(target));
                        if let Some(id) = record_id {
                            body.insert("dns_record_id".into(), json!(id));
                        }
                    }
                    DnsUpsertResult::Updated { record_id, .. } => {
                        body.insert("dns_updated".into(), json!(true));
                        body.insert("dns_target".into(), json!(target));
                        body.insert("dns_record_id".into(), json!(record_id));
                    }
                    DnsUpsertResult::Failed {
                        attempted,
                        record_id,
                        error,
                    } => {
                        let flag = match attempted {
                            Some(crate::dns::UpsertAction::Updated) => "dns_updated",
                            _ => "dns_created",
                        };
                        body.insert(flag.into(), json!(false));
                        if attempted.is_some() {
                            body.insert("dns_target".into(), json!(target));
                        }
                        if let Some(id) = record_id {
                            body.insert("dns_record_id".into(), json!(id));
                        }
                        body.insert("dns_error".into(), error.to_json());
                    }
                }
            }
        }

        Value::Object(body)
    }
}

/// DNS part of a detachment.
#[derive(Debug)]
pub enum DetachDns {
    Skipped(SkipReason),
    Attempted {
        parent_zone: String,
        result: DnsDeleteResult,
    },
}

/// Merged result of [`Orchestrator::detach`].
#[derive(Debug)]
pub struct DetachmentOutcome {
    /// Status of the deletion call.
    pub status: u16,
    /// Deletion envelope as returned by Cloudflare.
    pub deletion: Value,
    /// `None` when deletion failed and DNS was never considered.
    pub dns: Option<DetachDns>,
}

impl DetachmentOutcome {
    /// Whether the Pages domain was removed.
    pub fn is_removed(&self) -> bool {
        self.deletion.get("success").and_then(Value::as_bool) == Some(true)
    }

    /// `Some(true)` if a record was deleted, `Some(false)` if deleting one
    /// failed, `None` if none was attempted.
    pub fn dns_deleted(&self) -> Option<bool> {
        match &self.dns {
            Some(DetachDns::Attempted { result, .. }) => match result {
                DnsDeleteResult::Deleted { .. } => Some(true),
                DnsDeleteResult::Failed { .. } => Some(false),
                DnsDeleteResult::NotPresent => None,
            },
            _ => None,
        }
    }

    /// The deletion envelope with the DNS fields merged in.
    pub fn to_json(&self) -> Value {
        let mut body = envelope_map(&self.deletion);

        if let Some(DetachDns::Attempted {
            parent_zone,
            result,
        }) = &self.dns
        {
            body.insert("parent_zone".into(), json!(parent_zone));
            match result {
                DnsDeleteResult::Deleted { record_id } => {
                    body.insert("dns_deleted".into(), json!(true));
                    body.insert("dns_record_id".into(), json!(record_id));
                }
                DnsDeleteResult::NotPresent => {}
                DnsDeleteResult::Failed { record_id, error } => {
                    body.insert("dns_deleted".into(), json!(false));
                    if let Some(id) = record_id {
                        body.insert("dns_record_id".into(), json!(id));
                    }
                    body.insert("dns_error".into(), error.to_json());
                }
            }
        }

        Value::Object(body)
    }
}

fn envelope_map(envelope: &Value) -> Map<String, Value> {
    match envelope {
        Value::Object(map) => map.clone(),
        other => {
            let mut map = Map::new();
            map.insert("result".into(), other.clone());
            map
        }
    }
}

/// Envelope standing in for a primary call that never got a response.
fn transport_failure(err: &UpstreamError) -> (u16, Value) {
    (
        502,
        json!({
            "success": false,
            "errors": [{ "code": 0, "message": err.to_string() }],
            "messages": [],
            "result": null,
        }),
    )
}

/// A zone chosen for the DNS step along with the token to edit it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResolvedZone {
    name: String,
    token: String,
    cached_id: Option<String>,
}

/// Runs attachment and detachment against one Cloudflare client.
///
/// The configuration store is read once per [`attach_domain`] or
/// [`detach_domain`] call; [`attach`] and [`detach`] take an already loaded
/// registry instead.
///
/// [`attach_domain`]: Orchestrator::attach_domain
/// [`detach_domain`]: Orchestrator::detach_domain
/// [`attach`]: Orchestrator::attach
/// [`detach`]: Orchestrator::detach
#[derive(Clone)]
pub struct Orchestrator {
    client: Client,
    config: HandlerConfig,
    store: Arc<dyn ConfigStore>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("client", &self.client)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(client: Client, config: HandlerConfig, store: Arc<dyn ConfigStore>) -> Self {
        Self {
            client,
            config,
            store,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ConfigStore> {
        &self.store
    }

    /// Loads the stored configuration for one request.
    pub async fn load_config(&self) -> Result<UserConfig, ConfigError> {
        self.store.load().await
    }

    /// [`attach`](Self::attach) with the registry read from the store.
    pub async fn attach_domain(
        &self,
        account_id: &str,
        project_name: &str,
        request: &AttachRequest,
        credentials: &Credentials,
    ) -> Result<AttachmentOutcome, ConfigError> {
        let config = self.load_config().await?;
        Ok(self
            .attach(account_id, project_name, request, credentials, &config.zones)
            .await)
    }

    /// [`detach`](Self::detach) with the registry read from the store.
    pub async fn detach_domain(
        &self,
        account_id: &str,
        project_name: &str,
        domain_name: &str,
        credentials: &Credentials,
    ) -> Result<DetachmentOutcome, ConfigError> {
        let config = self.load_config().await?;
        Ok(self
            .detach(account_id, project_name, domain_name, credentials, &config.zones)
            .await)
    }

    /// Finds the zone owning `domain_name` and a token that can edit it.
    async fn resolve_zone(
        &self,
        domain_name: &str,
        credentials: &Credentials,
        registry: &ZoneRegistry,
    ) -> Result<ResolvedZone, SkipReason> {
        let name = ZoneResolver::new(&self.client)
            .resolve_parent_zone(domain_name, registry.names(), credentials.zone())
            .await
            .ok_or(SkipReason::NoMatchingZone)?;

        let registry_token = registry.token_for(&name);
        let token = if self.config.zone_token_override {
            registry_token.or(credentials.zone())
        } else {
            credentials.zone().or(registry_token)
        }
        .ok_or(SkipReason::NoZoneToken)?
        .to_string();

        Ok(ResolvedZone {
            cached_id: registry.zone_id_for(&name).map(str::to_string),
            name,
            token,
        })
    }
}
