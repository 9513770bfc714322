//! Common test utilities shared across test modules.
//!
//! This module provides helpers for setting up mock servers, building
//! Cloudflare envelopes, and constructing clients and orchestrators pointed
//! at the mock server.

use std::sync::Arc;

use pagesdns::cloudflare::Client;
use pagesdns::config::{HandlerConfig, MemoryConfigStore};
use pagesdns::orchestrator::Credentials;
use pagesdns::{HttpClientConfig, Orchestrator};
use wiremock::MockServer;

/// Sets up a new mock server for testing.
///
/// This is the standard way to create a mock server in tests.
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Test constants used across multiple test modules.
#[allow(dead_code)]
pub mod constants {
    pub const ACCOUNT_ID: &str = "acct1";
    pub const PROJECT: &str = "siteA";

    pub const PAGES_TOKEN: &str = "pages-token";
    pub const ZONE_TOKEN: &str = "zone-token";
    pub const REGISTRY_TOKEN: &str = "registry-token";

    /// Cloudflare uses 32-char hex IDs.
    pub const ZONE_ID_1: &str = "aaaabbbbccccdddd1111222233334444";
    pub const ZONE_ID_2: &str = "eeeeffffaaaa00001111222233335555";
    pub const RECORD_ID_1: &str = "11112222333344445555666677778888";
    pub const RECORD_ID_2: &str = "88887777666655554444333322221111";
    pub const NEW_RECORD_ID: &str = "99990000aaaabbbbccccddddeeee0000";
}

/// Client pointed at the mock server.
#[allow(dead_code)]
pub fn client(server: &MockServer) -> Client {
    Client::with_base_url(&server.uri(), HttpClientConfig::default())
        .expect("Failed to create client")
}

/// Orchestrator pointed at the mock server with an empty in-memory store.
#[allow(dead_code)]
pub fn orchestrator(server: &MockServer) -> Orchestrator {
    orchestrator_with(server, HandlerConfig::default())
}

#[allow(dead_code)]
pub fn orchestrator_with(server: &MockServer, config: HandlerConfig) -> Orchestrator {
    Orchestrator::new(client(server), config, Arc::new(MemoryConfigStore::new()))
}

/// Pages token plus the generic zone token.
#[allow(dead_code)]
pub fn credentials() -> Credentials {
    Credentials::new(
        Some(constants::PAGES_TOKEN.to_string()),
        Some(constants::ZONE_TOKEN.to_string()),
    )
    .expect("pages token present")
}

/// Pages token only.
#[allow(dead_code)]
pub fn pages_only_credentials() -> Credentials {
    Credentials::new(Some(constants::PAGES_TOKEN.to_string()), None).expect("pages token present")
}

/// Cloudflare envelope builders.
#[allow(dead_code)]
pub mod cloudflare {
    use serde_json::{json, Value};

    /// Successful envelope around `result`.
    pub fn mock_success(result: Value) -> Value {
        json!({
            "success": true,
            "errors": [],
            "messages": [],
            "result": result
        })
    }

    /// Successful list envelope for one page of a paginated listing.
    pub fn mock_page(results: Vec<Value>, page: u32, total_pages: u32) -> Value {
        let count = results.len();
        json!({
            "success": true,
            "errors": [],
            "messages": [],
            "result": results,
            "result_info": {
                "page": page,
                "per_page": 50,
                "total_pages": total_pages,
                "count": count,
                "total_count": count
            }
        })
    }

    /// Failed envelope.
    pub fn mock_error_response(code: i32, message: &str) -> Value {
        json!({
            "success": false,
            "errors": [{"code": code, "message": message}],
            "messages": [],
            "result": null
        })
    }

    pub fn project(name: &str, subdomain: &str) -> Value {
        json!({
            "id": format!("{name}-id"),
            "name": name,
            "subdomain": subdomain,
            "domains": [subdomain],
            "production_branch": "main"
        })
    }

    pub fn pages_domain(name: &str) -> Value {
        json!({
            "id": format!("{name}-domain-id"),
            "name": name,
            "status": "initializing"
        })
    }

    pub fn zone(id: &str, name: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "status": "active",
            "paused": false,
            "type": "full"
        })
    }

    pub fn cname(id: &str, name: &str, content: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "type": "CNAME",
            "content": content,
            "proxied": true,
            "ttl": 1
        })
    }

    pub fn mock_zones_by_name(zones: Vec<(&str, &str)>) -> Value {
        mock_success(Value::Array(
            zones.into_iter().map(|(id, name)| zone(id, name)).collect(),
        ))
    }

    pub fn mock_records(records: Vec<Value>) -> Value {
        mock_success(Value::Array(records))
    }

    pub fn mock_delete_response(id: &str) -> Value {
        mock_success(json!({ "id": id }))
    }
}

/// Mounting shortcuts for the calls every orchestration makes.
#[allow(dead_code)]
pub mod mounts {
    use serde_json::Value;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::cloudflare::*;
    use super::constants::*;

    pub fn project_path() -> String {
        format!("/accounts/{ACCOUNT_ID}/pages/projects/{PROJECT}")
    }

    pub fn domains_path() -> String {
        format!("{}/domains", project_path())
    }

    pub async fn project(server: &MockServer, subdomain: &str) {
        Mock::given(method("GET"))
            .and(path(project_path()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(mock_success(super::cloudflare::project(
                    PROJECT, subdomain,
                ))),
            )
            .mount(server)
            .await;
    }

    pub async fn add_domain(server: &MockServer, domain: &str) {
        Mock::given(method("POST"))
            .and(path(domains_path()))
            .and(body_partial_json(serde_json::json!({ "name": domain })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(mock_success(pages_domain(domain))),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    pub async fn delete_domain(server: &MockServer, domain: &str) {
        Mock::given(method("DELETE"))
            .and(path(format!("{}/{}", domains_path(), domain)))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock_success(Value::Null)))
            .expect(1)
            .mount(server)
            .await;
    }

    pub async fn zone_lookup(server: &MockServer, name: &str, id: &str) {
        Mock::given(method("GET"))
            .and(path("/zones"))
            .and(query_param("name", name))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(mock_zones_by_name(vec![(id, name)])),
            )
            .mount(server)
            .await;
    }

    pub async fn cname_list(server: &MockServer, zone_id: &str, name: &str, records: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path(format!("/zones/{zone_id}/dns_records")))
            .and(query_param("type", "CNAME"))
            .and(query_param("name", name))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock_records(records)))
            .mount(server)
            .await;
    }

    /// Asserts that no zone or DNS record endpoint is ever called.
    pub async fn forbid_dns_calls(server: &MockServer) {
        Mock::given(wiremock::matchers::path_regex(r"^/zones"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .named("zone and record endpoints")
            .mount(server)
            .await;
    }
}
