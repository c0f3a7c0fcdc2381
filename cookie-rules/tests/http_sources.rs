use cookie_rules::compat_source::load_compat_data;
use cookie_rules::schema_fetch::HttpSchemaFetcher;
use cookie_rules_core::contract::SchemaFetcher;
use cookie_rules_core::error::SchemaError;
use cookie_rules_core::rules::SchemaVersion;
use cookie_rules_core::validate::validate_rule_list;
use serde_json::json;
use std::fs::write;
use tempfile::NamedTempFile;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_schema_fetcher_returns_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Cookie.schema.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "type": "object" })))
        .mount(&server)
        .await;

    let uri = format!("{}/Cookie.schema.json", server.uri());
    let doc = HttpSchemaFetcher::new().fetch_schema(&uri).await.unwrap();
    assert_eq!(doc, json!({ "type": "object" }));
}

#[tokio::test]
async fn test_schema_fetcher_fails_on_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let uri = format!("{}/missing.json", server.uri());
    match HttpSchemaFetcher::new().fetch_schema(&uri).await {
        Err(SchemaError::Fetch { reason, .. }) => assert_eq!(reason, "Loading error: 404"),
        other => panic!("expected fetch error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_validation_resolves_remote_ref_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Rule.schema.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "object",
            "required": ["id", "domains"],
            "properties": { "id": { "type": "string" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let schema = json!({
        "type": "object",
        "properties": {
            "data": { "type": "array", "items": { "$ref": format!("{}/Rule.schema.json", server.uri()) } }
        }
    });
    let doc = json!({ "data": [{ "id": "x" }] }).to_string();
    let report = validate_rule_list(&doc, &schema, SchemaVersion::DomainsArray, &HttpSchemaFetcher::new())
        .await
        .expect("schema should compile");
    assert_eq!(report.schema_violations.len(), 1);
}

#[tokio::test]
async fn test_compat_data_from_file_and_url() {
    let body = r#"{ "browsers": { "firefox": { "name": "Firefox", "releases": { "130": { "status": "current" } } } } }"#;

    let file = NamedTempFile::new().unwrap();
    write(file.path(), body).unwrap();
    let from_file = load_compat_data(file.path().to_str().unwrap()).await.unwrap();
    assert_eq!(from_file.browsers["firefox"].releases.len(), 1);

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    let from_url = load_compat_data(&format!("{}/data.json", server.uri()))
        .await
        .unwrap();
    assert_eq!(from_url.browsers["firefox"].name.as_deref(), Some("Firefox"));

    assert!(load_compat_data("/definitely/not/here.json").await.is_err());
}
