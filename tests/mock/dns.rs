//! Mock tests for CNAME upsert and removal.

use pagesdns::dns::{DnsDeleteResult, DnsError, DnsUpsertResult, UpsertAction, ZoneTarget};
use pagesdns::DnsUpserter;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::cloudflare::*;
use crate::common::constants::*;
use crate::common::{client, mounts, setup_mock_server};

const NAME: &str = "www.example.com";
const TARGET: &str = "sitea.pages.dev";

fn records_path() -> String {
    format!("/zones/{ZONE_ID_1}/dns_records")
}

#[tokio::test]
async fn test_creates_when_no_record_exists() {
    let server = setup_mock_server().await;
    mounts::zone_lookup(&server, "example.com", ZONE_ID_1).await;
    mounts::cname_list(&server, ZONE_ID_1, NAME, vec![]).await;

    Mock::given(method("POST"))
        .and(path(records_path()))
        .and(body_partial_json(json!({
            "type": "CNAME",
            "name": NAME,
            "content": TARGET,
            "proxied": true,
            "ttl": 1
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(mock_success(cname(NEW_RECORD_ID, NAME, TARGET))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let result = DnsUpserter::new(&client)
        .upsert_cname(ZoneTarget::new("example.com"), NAME, TARGET, ZONE_TOKEN)
        .await;

    match result {
        DnsUpsertResult::Created { zone_id, record_id } => {
            assert_eq!(zone_id, ZONE_ID_1);
            assert_eq!(record_id.as_deref(), Some(NEW_RECORD_ID));
        }
        other => panic!("Expected Created, got {other:?}"),
    }
}

#[tokio::test]
async fn test_updates_first_existing_record() {
    let server = setup_mock_server().await;
    mounts::zone_lookup(&server, "example.com", ZONE_ID_1).await;
    mounts::cname_list(
        &server,
        ZONE_ID_1,
        NAME,
        vec![
            cname(RECORD_ID_1, NAME, "old.pages.dev"),
            cname(RECORD_ID_2, NAME, "older.pages.dev"),
        ],
    )
    .await;

    Mock::given(method("PATCH"))
        .and(path(format!("{}/{RECORD_ID_1}", records_path())))
        .and(body_partial_json(json!({ "content": TARGET, "proxied": true })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(mock_success(cname(RECORD_ID_1, NAME, TARGET))),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(records_path()))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server);
    let result = DnsUpserter::new(&client)
        .upsert_cname(ZoneTarget::new("example.com"), NAME, TARGET, ZONE_TOKEN)
        .await;

    assert_eq!(result.action(), Some(UpsertAction::Updated));
    assert_eq!(result.record_id(), Some(RECORD_ID_1));
}

#[tokio::test]
async fn test_upsert_twice_creates_then_updates() {
    let server = setup_mock_server().await;
    mounts::zone_lookup(&server, "example.com", ZONE_ID_1).await;

    // The first listing is empty; afterwards the created record is visible.
    Mock::given(method("GET"))
        .and(path(records_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_records(vec![])))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mounts::cname_list(
        &server,
        ZONE_ID_1,
        NAME,
        vec![cname(NEW_RECORD_ID, NAME, TARGET)],
    )
    .await;

    Mock::given(method("POST"))
        .and(path(records_path()))
        .and(body_partial_json(json!({ "name": NAME, "content": TARGET })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(mock_success(cname(NEW_RECORD_ID, NAME, TARGET))),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path(format!("{}/{NEW_RECORD_ID}", records_path())))
        .and(body_partial_json(json!({ "name": NAME, "content": TARGET })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(mock_success(cname(NEW_RECORD_ID, NAME, TARGET))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let upserter = DnsUpserter::new(&client);
    let zone = ZoneTarget::new("example.com");

    let first = upserter.upsert_cname(zone, NAME, TARGET, ZONE_TOKEN).await;
    let second = upserter.upsert_cname(zone, NAME, TARGET, ZONE_TOKEN).await;

    assert_eq!(first.action(), Some(UpsertAction::Created));
    assert_eq!(second.action(), Some(UpsertAction::Updated));
    assert_eq!(first.record_id(), second.record_id());
}

#[tokio::test]
async fn test_cached_zone_id_skips_lookup() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/zones"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    mounts::cname_list(&server, ZONE_ID_2, NAME, vec![]).await;

    Mock::given(method("POST"))
        .and(path(format!("/zones/{ZONE_ID_2}/dns_records")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(mock_success(cname(NEW_RECORD_ID, NAME, TARGET))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let result = DnsUpserter::new(&client)
        .upsert_cname(
            ZoneTarget::new("example.com").with_id(Some(ZONE_ID_2)),
            NAME,
            TARGET,
            ZONE_TOKEN,
        )
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_unknown_zone_fails_before_any_mutation() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/zones"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_success(json!([]))))
        .mount(&server)
        .await;

    let client = client(&server);
    let result = DnsUpserter::new(&client)
        .upsert_cname(ZoneTarget::new("example.com"), NAME, TARGET, ZONE_TOKEN)
        .await;

    assert_eq!(result.action(), None);
    assert!(matches!(result.error(), Some(DnsError::ZoneNotFound(name)) if name == "example.com"));
    assert_eq!(result.error().map(DnsError::reason), Some("zone_not_found"));
}

#[tokio::test]
async fn test_create_rejection_is_reported() {
    let server = setup_mock_server().await;
    mounts::zone_lookup(&server, "example.com", ZONE_ID_1).await;
    mounts::cname_list(&server, ZONE_ID_1, NAME, vec![]).await;

    Mock::given(method("POST"))
        .and(path(records_path()))
        .respond_with(ResponseTemplate::new(400).set_body_json(mock_error_response(
            81053,
            "An A, AAAA, or CNAME record with that host already exists.",
        )))
        .mount(&server)
        .await;

    let client = client(&server);
    let result = DnsUpserter::new(&client)
        .upsert_cname(ZoneTarget::new("example.com"), NAME, TARGET, ZONE_TOKEN)
        .await;

    assert!(!result.is_ok());
    assert_eq!(result.action(), Some(UpsertAction::Created));
    assert_eq!(result.record_id(), None);
}

#[tokio::test]
async fn test_delete_removes_first_record() {
    let server = setup_mock_server().await;
    mounts::zone_lookup(&server, "example.com", ZONE_ID_1).await;
    mounts::cname_list(
        &server,
        ZONE_ID_1,
        NAME,
        vec![
            cname(RECORD_ID_1, NAME, TARGET),
            cname(RECORD_ID_2, NAME, TARGET),
        ],
    )
    .await;

    Mock::given(method("DELETE"))
        .and(path(format!("{}/{RECORD_ID_1}", records_path())))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_delete_response(RECORD_ID_1)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(format!("{}/{RECORD_ID_2}", records_path())))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_delete_response(RECORD_ID_2)))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server);
    let result = DnsUpserter::new(&client)
        .delete_cname(ZoneTarget::new("example.com"), NAME, ZONE_TOKEN)
        .await;

    assert!(matches!(result, DnsDeleteResult::Deleted { ref record_id } if record_id == RECORD_ID_1));
}

#[tokio::test]
async fn test_delete_missing_record_is_not_present() {
    let server = setup_mock_server().await;
    mounts::zone_lookup(&server, "example.com", ZONE_ID_1).await;
    mounts::cname_list(&server, ZONE_ID_1, NAME, vec![]).await;

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server);
    let result = DnsUpserter::new(&client)
        .delete_cname(ZoneTarget::new("example.com"), NAME, ZONE_TOKEN)
        .await;

    assert!(matches!(result, DnsDeleteResult::NotPresent));
}

#[tokio::test]
async fn test_update_with_partial_result_counts_as_updated() {
    let server = setup_mock_server().await;
    mounts::zone_lookup(&server, "example.com", ZONE_ID_1).await;
    mounts::cname_list(
        &server,
        ZONE_ID_1,
        NAME,
        vec![cname(RECORD_ID_1, NAME, "old.pages.dev")],
    )
    .await;

    // Only `success` decides; the result carries nothing but the ID.
    Mock::given(method("PATCH"))
        .and(path(format!("{}/{RECORD_ID_1}", records_path())))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "errors": [],
            "result": { "id": RECORD_ID_1 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let result = DnsUpserter::new(&client)
        .upsert_cname(ZoneTarget::new("example.com"), NAME, TARGET, ZONE_TOKEN)
        .await;

    assert!(result.is_ok(), "Expected success, got {result:?}");
    assert_eq!(result.action(), Some(UpsertAction::Updated));
    assert_eq!(result.record_id(), Some(RECORD_ID_1));
}

#[tokio::test]
async fn test_create_without_result_id_counts_as_created() {
    let server = setup_mock_server().await;
    mounts::zone_lookup(&server, "example.com", ZONE_ID_1).await;
    mounts::cname_list(&server, ZONE_ID_1, NAME, vec![]).await;

    Mock::given(method("POST"))
        .and(path(records_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_success(json!(null))))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let result = DnsUpserter::new(&client)
        .upsert_cname(ZoneTarget::new("example.com"), NAME, TARGET, ZONE_TOKEN)
        .await;

    assert!(result.is_ok(), "Expected success, got {result:?}");
    assert_eq!(result.action(), Some(UpsertAction::Created));
    assert_eq!(result.record_id(), None);
}

#[tokio::test]
async fn test_delete_with_null_result_counts_as_deleted() {
    let server = setup_mock_server().await;
    mounts::zone_lookup(&server, "example.com", ZONE_ID_1).await;
    mounts::cname_list(&server, ZONE_ID_1, NAME, vec![cname(RECORD_ID_1, NAME, TARGET)]).await;

    Mock::given(method("DELETE"))
        .and(path(format!("{}/{RECORD_ID_1}", records_path())))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "errors": [],
            "result": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let result = DnsUpserter::new(&client)
        .delete_cname(ZoneTarget::new("example.com"), NAME, ZONE_TOKEN)
        .await;

    assert!(
        matches!(result, DnsDeleteResult::Deleted { ref record_id } if record_id == RECORD_ID_1),
        "Expected Deleted, got {result:?}"
    );
}
