//! Parent-zone resolution.
//!
//! A hostname belongs to the longest zone name it equals or ends in
//! (preceded by a dot). Longest-first matters when zones nest: with both
//! `us.kg` and `hyeri.us.kg` configured, `sub.hyeri.us.kg` must land in
//! `hyeri.us.kg`.
//!
//! Names are compared as exact, case-sensitive strings.

use tracing::{debug, warn};

use crate::cloudflare::Client;

/// Returns `true` if `hostname` is `zone` or a subdomain of it.
pub fn is_within_zone(hostname: &str, zone: &str) -> bool {
    if zone.is_empty() {
        return false;
    }
    hostname == zone
        || hostname
            .strip_suffix(zone)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Picks the longest zone in `zones` that owns `hostname`.
///
/// ```
/// use pagesdns::zone::longest_suffix_match;
///
/// let zones = ["us.kg", "hyeri.us.kg"];
/// assert_eq!(longest_suffix_match("sub.hyeri.us.kg", zones), Some("hyeri.us.kg"));
/// assert_eq!(longest_suffix_match("other.us.kg", zones), Some("us.kg"));
/// assert_eq!(longest_suffix_match("example.com", zones), None);
/// ```
pub fn longest_suffix_match<'a, I>(hostname: &str, zones: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut candidates: Vec<&str> = zones.into_iter().collect();
    candidates.sort_by(|a, b| b.len().cmp(&a.len()));
    candidates
        .into_iter()
        .find(|zone| is_within_zone(hostname, zone))
}

/// Resolves the zone owning a hostname from configuration, falling back to
/// the zones visible to a Cloudflare token.
#[derive(Debug, Clone, Copy)]
pub struct ZoneResolver<'a> {
    client: &'a Client,
}

impl<'a> ZoneResolver<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Finds the parent zone of `hostname`.
    ///
    /// `configured` is searched first. When nothing matches and a
    /// `discovery_token` is given, every zone visible to that token is
    /// listed and searched the same way. A failed listing is logged and
    /// treated as no match: this never errors.
    pub async fn resolve_parent_zone<'z, I>(
        &self,
        hostname: &str,
        configured: I,
        discovery_token: Option<&str>,
    ) -> Option<String>
    where
        I: IntoIterator<Item = &'z str>,
    {
        if let Some(zone) = longest_suffix_match(hostname, configured) {
            debug!(hostname, zone, "parent zone found in configuration");
            return Some(zone.to_string());
        }

        let token = discovery_token?;
        let zones = match self.client.list_zones(token).await {
            Ok(zones) => zones,
            Err(err) => {
                warn!(hostname, error = %err, "zone discovery failed");
                return None;
            }
        };

        let found = longest_suffix_match(hostname, zones.iter().map(|z| z.name.as_str()))
            .map(str::to_string);
        match &found {
            Some(zone) => debug!(hostname, zone = %zone, "parent zone discovered"),
            None => debug!(hostname, visible = zones.len(), "no visible zone owns hostname"),
        }
        found
    }
}
