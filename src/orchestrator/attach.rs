use tracing::{info, warn};

use super::{
    transport_failure, AttachDns, AttachRequest, AttachmentOutcome, Credentials, Orchestrator,
    SkipReason,
};
use crate::cloudflare::deployment_hostname;
use crate::config::ZoneRegistry;
use crate::dns::{DnsUpserter, ZoneTarget};

impl Orchestrator {
    /// Attaches `request.name` to a Pages project and points a CNAME at the
    /// project's deployment hostname.
    ///
    /// The returned status is always the registration call's. If
    /// registration fails nothing else is attempted; DNS problems after a
    /// successful registration are reported in the outcome only.
    pub async fn attach(
        &self,
        account_id: &str,
        project_name: &str,
        request: &AttachRequest,
        credentials: &Credentials,
        registry: &ZoneRegistry,
    ) -> AttachmentOutcome {
        let domain_name = request.name.as_str();

        let target = match self
            .client
            .get_project(account_id, project_name, credentials.pages())
            .await
        {
            Ok(project) => deployment_hostname(project_name, project.subdomain.as_deref()),
            Err(err) => {
                warn!(project = project_name, error = %err, "project lookup failed, using default deployment hostname");
                deployment_hostname(project_name, None)
            }
        };

        let (status, registration) = match self
            .client
            .add_domain(account_id, project_name, domain_name, credentials.pages())
            .await
        {
            Ok(response) => (response.status, response.body),
            Err(err) => {
                warn!(project = project_name, domain = domain_name, error = %err, "domain registration failed");
                transport_failure(&err)
            }
        };

        let mut outcome = AttachmentOutcome {
            status,
            registration,
            deployment_hostname: target,
            dns: None,
        };

        if !outcome.is_registered() {
            info!(project = project_name, domain = domain_name, status, "domain registration rejected");
            return outcome;
        }
        info!(project = project_name, domain = domain_name, "domain registered");

        if !request.create_dns {
            outcome.dns = Some(AttachDns::Skipped(SkipReason::Disabled));
            return outcome;
        }

        let zone = match self.resolve_zone(domain_name, credentials, registry).await {
            Ok(zone) => zone,
            Err(reason) => {
                info!(domain = domain_name, %reason, "skipping DNS");
                outcome.dns = Some(AttachDns::Skipped(reason));
                return outcome;
            }
        };

        let result = DnsUpserter::new(&self.client)
            .upsert_cname(
                ZoneTarget::new(&zone.name).with_id(zone.cached_id.as_deref()),
                domain_name,
                &outcome.deployment_hostname,
                &zone.token,
            )
            .await;

        outcome.dns = Some(AttachDns::Attempted {
            parent_zone: zone.name,
            target: outcome.deployment_hostname.clone(),
            result,
        });
        outcome
    }
}
