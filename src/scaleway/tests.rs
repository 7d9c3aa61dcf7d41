//! Unit tests for the Instances API client.

use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::test_support::{ScriptedTransport, json_listing, scaleway_config};

const ZONE_URL: &str = "https://api.scaleway.com/instance/v1/zones/fr-par-1";

#[fixture]
fn transport() -> ScriptedTransport {
    ScriptedTransport::new()
}

fn client(transport: &ScriptedTransport, org: Option<&str>) -> ApiClient<ScriptedTransport> {
    ApiClient::new(&scaleway_config(org), transport.clone())
        .unwrap_or_else(|err| panic!("client should build: {err}"))
}

#[rstest]
fn new_rejects_blank_secret() {
    let config = ScalewayConfig {
        secret_key: String::from("  "),
        ..scaleway_config(None)
    };
    let err = ApiClient::new(&config, ScriptedTransport::new()).expect_err("blank secret");
    assert!(matches!(err, ConfigError::MissingField(_)));
}

#[rstest]
#[tokio::test]
async fn list_filters_by_organization(transport: ScriptedTransport) {
    transport.push_response(
        200,
        json_listing(
            "images",
            &[
                ("img-a", "nightly", "org-1"),
                ("img-b", "nightly", "org-2"),
                ("img-c", "weekly", "org-1"),
            ],
        ),
    );
    let mut log = ActivityLog::new();

    let records = client(&transport, Some("org-1"))
        .list_images(&mut log)
        .await
        .expect("listing should succeed");

    let ids: Vec<_> = records.iter().map(|record| record.id.as_str()).collect();
    assert_eq!(ids, ["img-a", "img-c"]);
    let requests = transport.requests();
    let request = requests.first().expect("one request");
    assert_eq!(request.method, HttpMethod::Get);
    assert_eq!(request.url, format!("{ZONE_URL}/images"));
    assert_eq!(request.auth_token, "SCWSECRETKEYEXAMPLE");
    assert!(request.body.is_none());
}

#[rstest]
#[tokio::test]
async fn list_without_organization_keeps_everything(transport: ScriptedTransport) {
    transport.push_response(
        200,
        json_listing(
            "snapshots",
            &[("snap-a", "daily", "org-1"), ("snap-b", "daily", "org-2")],
        ),
    );
    let mut log = ActivityLog::new();

    let records = client(&transport, None)
        .list_snapshots(&mut log)
        .await
        .expect("listing should succeed");

    assert_eq!(records.len(), 2);
    assert!(!log.has_errors());
}

#[rstest]
#[tokio::test]
async fn list_preserves_listing_order(transport: ScriptedTransport) {
    transport.push_response(
        200,
        json_listing(
            "volumes",
            &[("vol-z", "z", "o"), ("vol-a", "a", "o"), ("vol-m", "m", "o")],
        ),
    );
    let mut log = ActivityLog::new();

    let records = client(&transport, None)
        .list_volumes(&mut log)
        .await
        .expect("listing should succeed");

    let ids: Vec<_> = records.iter().map(|record| record.id.as_str()).collect();
    assert_eq!(ids, ["vol-z", "vol-a", "vol-m"]);
}

#[rstest]
#[case(401)]
#[case(404)]
#[case(500)]
#[tokio::test]
async fn non_success_status_is_logged_and_returned(
    transport: ScriptedTransport,
    #[case] status: u16,
) {
    transport.push_response(status, "{\"message\":\"denied\"}");
    let mut log = ActivityLog::new();

    let err = client(&transport, None)
        .list_servers(&mut log)
        .await
        .expect_err("non-2xx should fail");

    assert_eq!(err.status(), Some(status));
    assert!(log.has_errors());
    assert!(
        log.messages()
            .any(|message| message.contains(&format!("HTTP {status}"))),
        "log should mention the status: {:?}",
        log.entries()
    );
}

#[rstest]
#[case("not-json")]
#[case("true")]
#[case("{\"total_count\":0}")]
#[case("{\"servers\":[{\"name\":\"missing id\"}]}")]
#[tokio::test]
async fn unparsable_listing_is_a_parse_error(transport: ScriptedTransport, #[case] body: &str) {
    transport.push_response(200, body);
    let mut log = ActivityLog::new();

    let err = client(&transport, None)
        .list_servers(&mut log)
        .await
        .expect_err("malformed body should fail");

    assert!(matches!(err, ApiError::Parse { ref resource, .. } if resource == "servers"));
    assert!(log.has_errors());
}

#[rstest]
#[tokio::test]
async fn transport_failure_is_logged(transport: ScriptedTransport) {
    transport.push_transport_error(TransportError::Timeout(String::from("deadline elapsed")));
    let mut log = ActivityLog::new();

    let err = client(&transport, None)
        .delete_image("img-a", &mut log)
        .await
        .expect_err("timeout should fail");

    assert!(matches!(
        err,
        ApiError::Transport {
            source: TransportError::Timeout(_),
            ..
        }
    ));
    assert_eq!(err.status(), None);
    assert!(log.messages().any(|message| message.contains("deadline elapsed")));
}

#[rstest]
#[tokio::test]
async fn create_backup_posts_server_action(transport: ScriptedTransport) {
    transport.push_response(202, "{\"task\":{}}");
    let mut log = ActivityLog::new();

    let response = client(&transport, Some("org-1"))
        .create_backup("srv-1", Some("nightly"), &mut log)
        .await
        .expect("backup should succeed");

    assert_eq!(response.status, 202);
    let requests = transport.requests_with(HttpMethod::Post);
    let request = requests.first().expect("one POST");
    assert_eq!(request.url, format!("{ZONE_URL}/servers/srv-1/action"));
    assert_eq!(
        request.body,
        Some(json!({ "action": "backup", "name": "nightly" }))
    );
}

#[rstest]
#[case(None)]
#[case(Some(""))]
#[tokio::test]
async fn create_backup_omits_missing_name(
    transport: ScriptedTransport,
    #[case] name: Option<&str>,
) {
    transport.push_ok();
    let mut log = ActivityLog::new();

    client(&transport, None)
        .create_backup("srv-1", name, &mut log)
        .await
        .expect("backup should succeed");

    let requests = transport.requests();
    let request = requests.first().expect("one request");
    assert_eq!(request.body, Some(json!({ "action": "backup" })));
}

#[rstest]
#[case(Some("org-1"), json!({ "volume_id": "vol-1", "organization": "org-1", "name": "daily" }))]
#[case(None, json!({ "volume_id": "vol-1", "name": "daily" }))]
#[tokio::test]
async fn create_snapshot_posts_volume_and_organization(
    transport: ScriptedTransport,
    #[case] org: Option<&str>,
    #[case] expected: serde_json::Value,
) {
    transport.push_response(201, "{\"snapshot\":{\"id\":\"snap-new\"}}");
    let mut log = ActivityLog::new();

    client(&transport, org)
        .create_snapshot("vol-1", "daily", &mut log)
        .await
        .expect("snapshot should succeed");

    let requests = transport.requests();
    let request = requests.first().expect("one request");
    assert_eq!(request.url, format!("{ZONE_URL}/snapshots"));
    assert_eq!(request.body, Some(expected));
}

#[rstest]
#[case(ResourceKind::Images, "img-1", "images/img-1")]
#[case(ResourceKind::Snapshots, "snap-1", "snapshots/snap-1")]
#[tokio::test]
async fn delete_targets_resource_path(
    transport: ScriptedTransport,
    #[case] kind: ResourceKind,
    #[case] id: &str,
    #[case] suffix: &str,
) {
    transport.push_no_content();
    let mut log = ActivityLog::new();

    let response = client(&transport, None)
        .delete(kind, id, &mut log)
        .await
        .expect("delete should succeed");

    assert_eq!(response.status, 204);
    assert!(response.body.is_empty());
    assert_eq!(transport.deleted_urls(), [format!("{ZONE_URL}/{suffix}")]);
}

#[rstest]
#[tokio::test]
async fn every_request_logs_connect_and_finish(transport: ScriptedTransport) {
    transport.push_no_content();
    let mut log = ActivityLog::new();

    client(&transport, None)
        .delete_snapshot("snap-1", &mut log)
        .await
        .expect("delete should succeed");

    let messages: Vec<_> = log.messages().collect();
    assert_eq!(messages.len(), 2);
    assert!(messages.first().is_some_and(|m| m.contains("connecting")));
    assert!(messages.get(1).is_some_and(|m| m.contains("finished 204")));
}

#[rstest]
fn trailing_slash_in_api_url_is_ignored() {
    let config = ScalewayConfig {
        api_url: String::from("https://example.test/zones/"),
        ..scaleway_config(None)
    };
    let client = ApiClient::new(&config, ScriptedTransport::new()).expect("client");
    assert_eq!(client.url(&["images"]), "https://example.test/zones/fr-par-1/images");
}

#[rstest]
fn created_at_parses_rfc3339() {
    let record = ResourceRecord {
        id: String::from("img"),
        name: String::from("n"),
        organization: None,
        creation_date: Some(String::from("2025-01-02T03:04:05.123456+00:00")),
    };
    assert!(record.created_at().is_some());

    let malformed = ResourceRecord {
        creation_date: Some(String::from("yesterday")),
        ..record
    };
    assert!(malformed.created_at().is_none());
}
