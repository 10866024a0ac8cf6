//! Wire contract tests for the GraphQL adapter

mod common;

use common::record;
use rowset::{DataAdapter, DataQuery, GraphQLAdapter, GraphQLDocuments, RecordKey, SortEntry};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn page_envelope() -> serde_json::Value {
    json!({
        "data": {
            "parts": {
                "data": [{"id": 1, "name": "Bolt"}],
                "total": 9,
                "page": 1,
                "pageSize": 10,
            }
        }
    })
}

#[tokio::test]
async fn fetch_posts_query_and_variables() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({
            "variables": {
                "page": 1,
                "pageSize": 10,
                "search": "bolt",
                "sort": [{"field": "name", "direction": "ASC"}],
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_envelope()))
        .expect(1)
        .mount(&server)
        .await;

    let adapter =
        GraphQLAdapter::new(format!("{}/graphql", server.uri())).with_type_name("Part");
    let query = DataQuery::new()
        .with_page(1)
        .with_page_size(10)
        .with_search("bolt")
        .with_sort(SortEntry::asc("name"));

    let response = adapter.fetch(&query).await.unwrap();
    assert_eq!(response.total, 9);
    assert_eq!(response.data[0]["name"], "Bolt");
}

#[tokio::test]
async fn generated_document_is_sent_when_none_is_configured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "query": "query FetchData($page: Int, $pageSize: Int, $sort: [SortInput!], $filters: JSON, $search: String) {\n  parts(page: $page, pageSize: $pageSize, sort: $sort, filters: $filters, search: $search) {\n    data\n    total\n    page\n    pageSize\n  }\n}"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_envelope()))
        .expect(1)
        .mount(&server)
        .await;

    let adapter =
        GraphQLAdapter::new(format!("{}/graphql", server.uri())).with_type_name("Part");
    adapter.fetch(&DataQuery::new()).await.unwrap();
}

#[tokio::test]
async fn configured_documents_override_the_defaults() {
    let custom = "query Custom { things { data total page pageSize } }";
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"query": custom})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"things": {"data": [], "total": 0, "page": 1, "pageSize": 10}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = GraphQLAdapter::new(format!("{}/graphql", server.uri())).with_documents(
        GraphQLDocuments {
            fetch: Some(custom.to_string()),
            ..Default::default()
        },
    );
    adapter.fetch(&DataQuery::new()).await.unwrap();
}

#[tokio::test]
async fn payload_key_is_found_past_typename() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "__typename": "Query",
                "whatever": {"data": [{"id": 1}], "total": 1, "page": 1, "pageSize": 1},
            }
        })))
        .mount(&server)
        .await;

    let adapter = GraphQLAdapter::new(format!("{}/graphql", server.uri()));
    let response = adapter.fetch(&DataQuery::new()).await.unwrap();
    assert_eq!(response.total, 1);
}

#[tokio::test]
async fn bare_array_payloads_wrap_into_a_page() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"parts": [{"id": 1}, {"id": 2}]}
        })))
        .mount(&server)
        .await;

    let adapter = GraphQLAdapter::new(format!("{}/graphql", server.uri()));
    let response = adapter.fetch(&DataQuery::new()).await.unwrap();
    assert_eq!(response.total, 2);
}

#[tokio::test]
async fn variables_transform_replaces_the_default_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "variables": {"offset": 20, "limit": 10}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_envelope()))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = GraphQLAdapter::new(format!("{}/graphql", server.uri()))
        .with_variables_transform(std::sync::Arc::new(|query| {
            let mut variables = serde_json::Map::new();
            let page = query.page.unwrap_or(1);
            let size = query.page_size.unwrap_or(10);
            variables.insert("offset".into(), json!((page - 1) * size));
            variables.insert("limit".into(), json!(size));
            variables
        }));

    let query = DataQuery::new().with_page(3).with_page_size(10);
    adapter.fetch(&query).await.unwrap();
}

#[tokio::test]
async fn error_extensions_drive_classification() {
    let cases = [
        ("UNAUTHENTICATED", "AUTH_ERROR"),
        ("FORBIDDEN", "AUTH_ERROR"),
        ("BAD_USER_INPUT", "VALIDATION_ERROR"),
        ("INTERNAL_SERVER_ERROR", "INTERNAL_SERVER_ERROR"),
    ];
    for (extension, code) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": [{
                    "message": "rejected",
                    "extensions": {"code": extension},
                }]
            })))
            .mount(&server)
            .await;

        let adapter = GraphQLAdapter::new(format!("{}/graphql", server.uri()));
        let err = adapter.fetch(&DataQuery::new()).await.unwrap_err();
        assert_eq!(err.code(), code, "extension {extension}");
        assert_eq!(err.message(), "rejected");
        assert!(err.details().is_some());
    }
}

#[tokio::test]
async fn missing_data_is_a_structural_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": null})))
        .mount(&server)
        .await;

    let adapter = GraphQLAdapter::new(format!("{}/graphql", server.uri()));
    let err = adapter.fetch(&DataQuery::new()).await.unwrap_err();
    assert_eq!(err.code(), "GRAPHQL_NO_DATA");
}

#[tokio::test]
async fn transport_failures_are_network_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let adapter = GraphQLAdapter::new(format!("{}/graphql", server.uri()));
    let err = adapter.fetch(&DataQuery::new()).await.unwrap_err();
    assert_eq!(err.code(), "NETWORK_ERROR");
    assert!(err.message().contains("502"));
}

#[tokio::test]
async fn timeouts_name_the_configured_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_envelope())
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let adapter = GraphQLAdapter::new(format!("{}/graphql", server.uri()))
        .with_timeout(Duration::from_millis(100));
    let err = adapter.fetch(&DataQuery::new()).await.unwrap_err();
    assert_eq!(err.code(), "NETWORK_ERROR");
    assert!(err.message().contains("100ms"));
}

#[tokio::test]
async fn bearer_token_rides_the_post() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("Authorization", "Bearer gql-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_envelope()))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = GraphQLAdapter::new(format!("{}/graphql", server.uri()))
        .with_auth_token("gql-token");
    adapter.fetch(&DataQuery::new()).await.unwrap();
}

#[tokio::test]
async fn create_sends_the_item_as_input() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "variables": {"input": {"name": "Washer"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"createPart": {"id": 3, "name": "Washer"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter =
        GraphQLAdapter::new(format!("{}/graphql", server.uri())).with_type_name("Part");
    let created = adapter
        .create(record(json!({"name": "Washer"})))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created["id"], 3);
}

#[tokio::test]
async fn update_and_delete_target_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "variables": {"id": 5, "input": {"qty": 1}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"updatePart": {"id": 5, "qty": 1}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter =
        GraphQLAdapter::new(format!("{}/graphql", server.uri())).with_type_name("Part");
    let updated = adapter
        .update(&RecordKey::from(5), record(json!({"qty": 1})))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated["qty"], 1);

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"variables": {"id": 5}})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"deletePart": true}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let adapter =
        GraphQLAdapter::new(format!("{}/graphql", server.uri())).with_type_name("Part");
    adapter.delete(&RecordKey::from(5)).await.unwrap();
}
