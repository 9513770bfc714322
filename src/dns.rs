//! CNAME upsert and removal.
//!
//! The upserter keeps at most one CNAME per `(zone, name)`: an existing
//! record is repointed, never duplicated. Failures at any step are returned
//! as values so the caller can merge them into a larger outcome.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cloudflare::{Client, CnameRecordRequest, UpstreamError};

/// Errors from the DNS step.
#[derive(Debug, Error)]
pub enum DnsError {
    /// No zone with this name is visible to the token.
    #[error("zone '{0}' not found")]
    ZoneNotFound(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl DnsError {
    /// Short machine-readable category.
    pub fn reason(&self) -> &'static str {
        match self {
            DnsError::ZoneNotFound(_) => "zone_not_found",
            DnsError::Upstream(err) => err.reason(),
        }
    }

    /// JSON form used in merged outcomes.
    pub fn to_json(&self) -> Value {
        match self {
            DnsError::ZoneNotFound(_) => Value::String(self.to_string()),
            DnsError::Upstream(err) => err.to_json(),
        }
    }
}

/// The zone a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneTarget<'a> {
    pub name: &'a str,
    /// Zone ID already known from configuration; skips the name lookup.
    pub cached_id: Option<&'a str>,
}

impl<'a> ZoneTarget<'a> {
    pub fn new(name: &'a str) -> Self {
        Self {
            name,
            cached_id: None,
        }
    }

    pub fn with_id(mut self, id: Option<&'a str>) -> Self {
        self.cached_id = id.filter(|id| !id.is_empty());
        self
    }
}

/// Which mutation an upsert performed or attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertAction {
    Created,
    Updated,
}

/// Result of [`DnsUpserter::upsert_cname`].
#[derive(Debug)]
pub enum DnsUpsertResult {
    Created {
        zone_id: String,
        /// `None` if Cloudflare reported success without returning an ID.
        record_id: Option<String>,
    },
    Updated {
        zone_id: String,
        record_id: String,
    },
    Failed {
        /// `None` when the failure came before any mutation was tried.
        attempted: Option<UpsertAction>,
        record_id: Option<String>,
        error: DnsError,
    },
}

impl DnsUpsertResult {
    /// The mutation performed or attempted, if any.
    pub fn action(&self) -> Option<UpsertAction> {
        match self {
            DnsUpsertResult::Created { .. } => Some(UpsertAction::Created),
            DnsUpsertResult::Updated { .. } => Some(UpsertAction::Updated),
            DnsUpsertResult::Failed { attempted, .. } => *attempted,
        }
    }

    pub fn is_ok(&self) -> bool {
        !matches!(self, DnsUpsertResult::Failed { .. })
    }

    pub fn record_id(&self) -> Option<&str> {
        match self {
            DnsUpsertResult::Updated { record_id, .. } => Some(record_id),
            DnsUpsertResult::Created { record_id, .. }
            | DnsUpsertResult::Failed { record_id, .. } => record_id.as_deref(),
        }
    }

    pub fn error(&self) -> Option<&DnsError> {
        match self {
            DnsUpsertResult::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Result of [`DnsUpserter::delete_cname`].
#[derive(Debug)]
pub enum DnsDeleteResult {
    Deleted {
        record_id: String,
    },
    /// No CNAME with that name exists. Not an error.
    NotPresent,
    Failed {
        record_id: Option<String>,
        error: DnsError,
    },
}

/// Creates, updates and removes CNAME records.
#[derive(Debug, Clone, Copy)]
pub struct DnsUpserter<'a> {
    client: &'a Client,
}

impl<'a> DnsUpserter<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Resolves a zone to its ID. Several zones sharing a name is not
    /// disambiguated: the first one returned wins.
    pub async fn zone_id(&self, zone: ZoneTarget<'_>, token: &str) -> Result<String, DnsError> {
        if let Some(id) = zone.cached_id {
            return Ok(id.to_string());
        }

        let zones = self.client.find_zones_by_name(zone.name, token).await?;
        if zones.len() > 1 {
            debug!(zone = zone.name, matches = zones.len(), "several zones share a name, using the first");
        }
        zones
            .into_iter()
            .next()
            .map(|z| z.id)
            .ok_or_else(|| DnsError::ZoneNotFound(zone.name.to_string()))
    }

    /// Points `record_name` at `target` with a proxied CNAME.
    ///
    /// Updates the first existing CNAME of that name, otherwise creates one
    /// with automatic TTL. Calling this twice with the same arguments
    /// reports `Created` then `Updated` and leaves the same record.
    pub async fn upsert_cname(
        &self,
        zone: ZoneTarget<'_>,
        record_name: &str,
        target: &str,
        token: &str,
    ) -> DnsUpsertResult {
        let zone_id = match self.zone_id(zone, token).await {
            Ok(id) => id,
            Err(error) => {
                warn!(zone = zone.name, error = %error, "zone lookup failed");
                return DnsUpsertResult::Failed {
                    attempted: None,
                    record_id: None,
                    error,
                };
            }
        };

        let existing = match self
            .client
            .list_cname_records(&zone_id, record_name, token)
            .await
        {
            Ok(records) => records,
            Err(err) => {
                warn!(zone = zone.name, record = record_name, error = %err, "listing CNAME records failed");
                return DnsUpsertResult::Failed {
                    attempted: None,
                    record_id: None,
                    error: err.into(),
                };
            }
        };

        if let Some(record) = existing.into_iter().next() {
            let request = CnameRecordRequest::update(record_name, target);
            return match self
                .client
                .update_record(&zone_id, &record.id, &request, token)
                .await
            {
                Ok(_) => {
                    info!(zone = zone.name, record = record_name, content = target, "updated CNAME record");
                    DnsUpsertResult::Updated {
                        zone_id,
                        record_id: record.id,
                    }
                }
                Err(err) => {
                    warn!(zone = zone.name, record = record_name, error = %err, "CNAME update failed");
                    DnsUpsertResult::Failed {
                        attempted: Some(UpsertAction::Updated),
                        record_id: Some(record.id),
                        error: err.into(),
                    }
                }
            };
        }

        let request = CnameRecordRequest::create(record_name, target);
        match self.client.create_record(&zone_id, &request, token).await {
            Ok(created) => {
                info!(zone = zone.name, record = record_name, content = target, "created CNAME record");
                DnsUpsertResult::Created {
                    zone_id,
                    record_id: created
                        .get("id")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                }
            }
            Err(err) => {
                warn!(zone = zone.name, record = record_name, error = %err, "CNAME creation failed");
                DnsUpsertResult::Failed {
                    attempted: Some(UpsertAction::Created),
                    record_id: None,
                    error: err.into(),
                }
            }
        }
    }

    /// Deletes the first CNAME named `record_name`, if there is one.
    pub async fn delete_cname(
        &self,
        zone: ZoneTarget<'_>,
        record_name: &str,
        token: &str,
    ) -> DnsDeleteResult {
        let zone_id = match self.zone_id(zone, token).await {
            Ok(id) => id,
            Err(DnsError::ZoneNotFound(name)) => {
                debug!(zone = %name, "zone not visible, nothing to delete");
                return DnsDeleteResult::NotPresent;
            }
            Err(error) => return DnsDeleteResult::Failed {
                record_id: None,
                error,
            },
        };

        let record = match self
            .client
            .list_cname_records(&zone_id, record_name, token)
            .await
        {
            Ok(records) => match records.into_iter().next() {
                Some(record) => record,
                None => return DnsDeleteResult::NotPresent,
            },
            Err(err) => {
                return DnsDeleteResult::Failed {
                    record_id: None,
                    error: err.into(),
                }
            }
        };

        match self
            .client
            .delete_record(&zone_id, &record.id, token)
            .await
        {
            Ok(_) => {
                info!(zone = zone.name, record = record_name, "deleted CNAME record");
                DnsDeleteResult::Deleted {
                    record_id: record.id,
                }
            }
            Err(err) => {
                warn!(zone = zone.name, record = record_name, error = %err, "CNAME deletion failed");
                DnsDeleteResult::Failed {
                    record_id: Some(record.id),
                    error: err.into(),
                }
            }
        }
    }
}
