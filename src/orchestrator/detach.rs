use tracing::{info, warn};

use super::{transport_failure, Credentials, DetachDns, DetachmentOutcome, Orchestrator};
use crate::config::ZoneRegistry;
use crate::dns::{DnsUpserter, ZoneTarget};

impl Orchestrator {
    /// Removes a custom domain from a Pages project and deletes its CNAME.
    ///
    /// Mirrors [`attach`](Self::attach): a failed deletion returns at once,
    /// and a missing DNS record is not an error.
    pub async fn detach(
        &self,
        account_id: &str,
        project_name: &str,
        domain_name: &str,
        credentials: &Credentials,
        registry: &ZoneRegistry,
    ) -> DetachmentOutcome {
        let (status, deletion) = match self
            .client
            .delete_domain(account_id, project_name, domain_name, credentials.pages())
            .await
        {
            Ok(response) => (response.status, response.body),
            Err(err) => {
                warn!(project = project_name, domain = domain_name, error = %err, "domain removal failed");
                transport_failure(&err)
            }
        };

        let mut outcome = DetachmentOutcome {
            status,
            deletion,
            dns: None,
        };

        if !outcome.is_removed() {
            info!(project = project_name, domain = domain_name, status, "domain removal rejected");
            return outcome;
        }
        info!(project = project_name, domain = domain_name, "domain removed");

        let zone = match self.resolve_zone(domain_name, credentials, registry).await {
            Ok(zone) => zone,
            Err(reason) => {
                info!(domain = domain_name, %reason, "skipping DNS cleanup");
                outcome.dns = Some(DetachDns::Skipped(reason));
                return outcome;
            }
        };

        let result = DnsUpserter::new(&self.client)
            .delete_cname(
                ZoneTarget::new(&zone.name).with_id(zone.cached_id.as_deref()),
                domain_name,
                &zone.token,
            )
            .await;

        outcome.dns = Some(DetachDns::Attempted {
            parent_zone: zone.name,
            result,
        });
        outcome
    }
}
