//! Cloudflare Pages project and custom-domain calls.
//!
//! # API Reference
//!
//! - [Pages Projects](https://developers.cloudflare.com/api/resources/pages/subresources/projects/)
//! - [Pages Domains](https://developers.cloudflare.com/api/resources/pages/subresources/projects/subresources/domains/)

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use super::api::{Client, UpstreamError, UpstreamResponse};

/// Suffix every Pages deployment hostname ends in.
pub const DEPLOYMENT_SUFFIX: &str = "pages.dev";

/// How project listings are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum Pagination {
    /// Walk `?page=N` until `result_info.total_pages` is reached.
    #[default]
    AllPages,
    /// Fetch one page of `per_page` projects.
    SinglePage { per_page: u32 },
}

/// The subset of a Pages project this crate reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Project {
    /// Deployment hostname, e.g. `my-site.pages.dev`.
    #[serde(default)]
    pub subdomain: Option<String>,
}

/// Normalizes a project's deployment hostname.
///
/// A missing or empty `subdomain` falls back to `{project}.pages.dev`; a
/// bare label gets the suffix appended.
///
/// ```
/// use pagesdns::cloudflare::pages::deployment_hostname;
///
/// assert_eq!(deployment_hostname("site", Some("site-3f2.pages.dev")), "site-3f2.pages.dev");
/// assert_eq!(deployment_hostname("site", Some("site-3f2")), "site-3f2.pages.dev");
/// assert_eq!(deployment_hostname("site", None), "site.pages.dev");
/// ```
pub fn deployment_hostname(project_name: &str, subdomain: Option<&str>) -> String {
    match subdomain.filter(|s| !s.is_empty()) {
        Some(sub) if sub.ends_with(&format!(".{DEPLOYMENT_SUFFIX}")) => sub.to_string(),
        Some(sub) => format!("{sub}.{DEPLOYMENT_SUFFIX}"),
        None => format!("{project_name}.{DEPLOYMENT_SUFFIX}"),
    }
}

fn project_path(account_id: &str, project_name: &str) -> String {
    format!(
        "/accounts/{}/pages/projects/{}",
        urlencoding::encode(account_id),
        urlencoding::encode(project_name)
    )
}

impl Client {
    /// Fetches one project.
    pub async fn get_project(
        &self,
        account_id: &str,
        project_name: &str,
        token: &str,
    ) -> Result<Project, UpstreamError> {
        self.get_result(&project_path(account_id, project_name), token)
            .await
    }

    /// Lists an account's projects as raw JSON objects.
    ///
    /// With [`Pagination::AllPages`] a failure on the first page is returned;
    /// a failure on a later page ends the walk with what was collected.
    pub async fn list_projects(
        &self,
        account_id: &str,
        pagination: Pagination,
        token: &str,
    ) -> Result<Vec<Value>, UpstreamError> {
        let base = format!(
            "/accounts/{}/pages/projects",
            urlencoding::encode(account_id)
        );

        if let Pagination::SinglePage { per_page } = pagination {
            let projects: Option<Vec<Value>> = self
                .get_result(&format!("{base}?per_page={per_page}"), token)
                .await?;
            return Ok(projects.unwrap_or_default());
        }

        let mut all_projects = Vec::new();
        let mut page = 1u32;

        loop {
            let response = match self
                .call(&format!("{base}?page={page}"), Method::GET, None, token)
                .await
            {
                Ok(response) => response,
                Err(err) if page > 1 => {
                    warn!(account_id, page, error = %err, "stopping project listing early");
                    break;
                }
                Err(err) => return Err(err),
            };

            let info = response.result_info();
            let projects: Option<Vec<Value>> = match response.into_result() {
                Ok(projects) => projects,
                Err(err) if page > 1 => {
                    warn!(account_id, page, error = %err, "stopping project listing early");
                    break;
                }
                Err(err) => return Err(err),
            };

            let projects = projects.unwrap_or_default();
            if projects.is_empty() {
                break;
            }
            all_projects.extend(projects);

            match info {
                Some(info) if info.total_pages > page => page += 1,
                _ => break,
            }
        }

        Ok(all_projects)
    }

    /// Lists a project's custom domains, returning the raw envelope.
    pub async fn list_domains(
        &self,
        account_id: &str,
        project_name: &str,
        token: &str,
    ) -> Result<UpstreamResponse, UpstreamError> {
        self.call(
            &format!("{}/domains", project_path(account_id, project_name)),
            Method::GET,
            None,
            token,
        )
        .await
    }

    /// Registers a custom domain with a project, returning the raw envelope.
    pub async fn add_domain(
        &self,
        account_id: &str,
        project_name: &str,
        domain_name: &str,
        token: &str,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let body = json!({ "name": domain_name });
        self.call(
            &format!("{}/domains", project_path(account_id, project_name)),
            Method::POST,
            Some(&body),
            token,
        )
        .await
    }

    /// Removes a custom domain from a project, returning the raw envelope.
    pub async fn delete_domain(
        &self,
        account_id: &str,
        project_name: &str,
        domain_name: &str,
        token: &str,
    ) -> Result<UpstreamResponse, UpstreamError> {
        self.call(
            &format!(
                "{}/domains/{}",
                project_path(account_id, project_name),
                urlencoding::encode(domain_name)
            ),
            Method::DELETE,
            None,
            token,
        )
        .await
    }
}
