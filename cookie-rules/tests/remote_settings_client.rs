use cookie_rules::remote_settings::RemoteSettingsClient;
use cookie_rules_core::compat::BrowserRelease;
use cookie_rules_core::config::RemoteConfig;
use cookie_rules_core::contract::{CollectionStatus, RecordStore};
use cookie_rules_core::error::StoreError;
use cookie_rules_core::synchronise::{synchronise, SyncOptions};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COLLECTION_PATH: &str = "/v1/buckets/main-workspace/collections/devtools-compatibility-browsers";
const AUTH: &str = "Bearer test-token";

fn remote_config(server: &MockServer) -> RemoteConfig {
    RemoteConfig {
        authorization: AUTH.to_string(),
        server: format!("{}/v1", server.uri()),
        environment: None,
        dry_run: false,
    }
}

fn client(server: &MockServer) -> RemoteSettingsClient {
    RemoteSettingsClient::new(
        &remote_config(server),
        "main-workspace",
        "devtools-compatibility-browsers",
    )
    .expect("client should build")
}

fn records_path() -> String {
    format!("{COLLECTION_PATH}/records")
}

#[tokio::test]
async fn test_list_records_sends_authorization_and_decodes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(records_path()))
        .and(header("authorization", AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "id": "abc", "last_modified": 1700000000000u64, "browserid": "firefox", "version": "130", "name": "Firefox", "status": "current" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let records = client(&server).list_records().await.expect("list should succeed");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "abc");
    assert_eq!(records[0].last_modified, Some(1_700_000_000_000));
    assert_eq!(records[0].str_field("browserid"), Some("firefox"));
}

#[tokio::test]
async fn test_list_records_failure_is_reported_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(records_path()))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    match client(&server).list_records().await {
        Err(StoreError::UnexpectedStatus { status, .. }) => assert_eq!(status, 401),
        other => panic!("expected an unexpected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_expects_created_status() {
    let server = MockServer::start().await;
    let release = BrowserRelease {
        browserid: "safari".into(),
        name: "Safari".into(),
        status: "current".into(),
        version: "18".into(),
    };
    Mock::given(method("POST"))
        .and(path(records_path()))
        .and(body_json(json!({ "data": {
            "browserid": "safari", "name": "Safari", "status": "current", "version": "18"
        } })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .create_record(&release.to_record_data())
        .await
        .expect("201 is success for create");
}

#[tokio::test]
async fn test_create_with_200_is_a_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(records_path()))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = client(&server)
        .create_record(&serde_json::Map::new())
        .await
        .expect_err("create must answer 201");
    assert!(err.is_rejection());
}

#[tokio::test]
async fn test_update_delete_and_patch_hit_expected_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("{}/rec-1", records_path())))
        .and(body_json(json!({ "data": { "status": "beta" } })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/rec-2", records_path())))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(COLLECTION_PATH))
        .and(body_json(json!({ "data": { "status": "to-review" } })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let data = json!({ "status": "beta" }).as_object().cloned().unwrap();
    client.update_record("rec-1", &data).await.unwrap();
    client.delete_record("rec-2").await.unwrap();
    client
        .transition_status(CollectionStatus::ToReview)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_server_info_reads_signer_capability() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "project_name": "Remote Settings",
            "capabilities": {
                "signer": {
                    "to_review_enabled": true,
                    "group_check_enabled": true,
                    "resources": [{ "source": { "bucket": "main-workspace", "collection": null } }]
                }
            }
        })))
        .mount(&server)
        .await;

    let info = client(&server).server_info().await.unwrap();
    let signer = info.capabilities.signer.expect("signer capability");
    assert!(signer.to_review_enabled);
    assert_eq!(signer.resources[0].source.bucket, "main-workspace");
    assert!(signer.resources[0].source.collection.is_none());
}

#[tokio::test]
async fn test_full_sync_against_http_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(records_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "id": "old", "browserid": "ie", "version": "11", "name": "IE", "status": "current" }
            ]
        })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(records_path()))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/old", records_path())))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(COLLECTION_PATH))
        .and(body_json(json!({ "data": { "status": "to-review" } })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let releases = vec![BrowserRelease {
        browserid: "firefox".into(),
        name: "Firefox".into(),
        status: "current".into(),
        version: "130".into(),
    }];
    let report = synchronise(&releases, &client(&server), &SyncOptions::default())
        .await
        .expect("a rejected create must not fail the run");

    assert!(report.added.is_empty());
    assert_eq!(report.removed.len(), 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.review, Some(CollectionStatus::ToReview));
}
