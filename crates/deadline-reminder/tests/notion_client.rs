//! Contract tests for the Notion client against a mock server.

use deadline_reminder::config::NotionConfig;
use deadline_reminder::error::RemoteFailure;
use deadline_reminder::fetcher::fetch_all_tasks;
use deadline_reminder::notion_client::{NotionClient, TaskSource};
use deadline_reminder::ReminderError;
use reqwest::StatusCode;
use serde_json::json;
use std::error::Error as _;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{bearer_token, body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, timeout: Duration) -> NotionClient {
    let config = NotionConfig {
        api_key: "secret-key".to_string(),
        database_id: "db-1".to_string(),
        api_url: server.uri(),
    };
    NotionClient::new(&config, timeout).unwrap_or_else(|e| panic!("client: {e}"))
}

fn page(id: &str, title: &str, due: &str, complete: bool) -> serde_json::Value {
    json!({
        "object": "page",
        "id": id,
        "archived": false,
        "properties": {
            "Name": { "type": "title", "title": [{ "type": "text", "plain_text": title }] },
            "Due": { "type": "date", "date": { "start": due, "end": null, "time_zone": null } },
            "Complete": { "type": "checkbox", "checkbox": complete }
        }
    })
}

#[tokio::test]
async fn test_query_pages_through_cursor() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/databases/db-1/query"))
        .and(bearer_token("secret-key"))
        .and(header("Notion-Version", "2022-06-28"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "results": [page("p1", "Pay rent", "2024-05-01", false)],
            "has_more": true,
            "next_cursor": "c2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/databases/db-1/query"))
        .and(body_json(json!({ "start_cursor": "c2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "results": [
                page("p2", "Taxes", "2024-05-03T09:00:00.000-04:00", false),
                page("p3", "Dentist", "2024-05-07", true)
            ],
            "has_more": false,
            "next_cursor": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, Duration::from_secs(5));
    let tasks = assert_ok!(fetch_all_tasks(&client).await);

    let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Pay rent", "Taxes", "Dentist"]);
    assert_eq!(tasks[1].due_date.to_string(), "2024-05-03");
}

#[tokio::test]
async fn test_next_cursor_ignored_without_has_more() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/databases/db-1/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [],
            "has_more": false,
            "next_cursor": "stale"
        })))
        .mount(&server)
        .await;

    let client = client(&server, Duration::from_secs(5));
    let page = assert_ok!(client.query_tasks(None).await);
    assert!(page.records.is_empty());
    assert!(page.next_cursor.is_none());
}

#[tokio::test]
async fn test_query_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/databases/db-1/query"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let client = client(&server, Duration::from_secs(5));
    let err = assert_err!(fetch_all_tasks(&client).await);

    match err {
        ReminderError::RemoteStatus {
            context,
            status,
            body,
        } => {
            assert_eq!(context, "query database db-1");
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body, "unauthorized");
        }
        other => panic!("Expected RemoteStatus, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_retrieve_reads_completion_flag() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/pages/p3"))
        .and(bearer_token("secret-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page("p3", "Dentist", "2024-05-07", true)),
        )
        .mount(&server)
        .await;

    let client = client(&server, Duration::from_secs(5));
    let record = assert_ok!(client.retrieve("p3").await);

    assert_eq!(record.id, "p3");
    assert_eq!(record.complete(), Some(true));
}

#[tokio::test]
async fn test_archive_sends_patch() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/v1/pages/p3"))
        .and(body_json(json!({ "archived": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "p3", "archived": true })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, Duration::from_secs(5));
    assert_ok!(client.archive("p3").await);
}

#[tokio::test]
async fn test_archive_failure_is_an_update_error() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/v1/pages/p3"))
        .respond_with(ResponseTemplate::new(409).set_body_string("conflict"))
        .mount(&server)
        .await;

    let client = client(&server, Duration::from_secs(5));
    let err = assert_err!(client.archive("p3").await);
    match err {
        ReminderError::RemoteUpdate { context, source } => {
            assert_eq!(context, "archive page p3");
            assert_eq!(source.status(), Some(StatusCode::CONFLICT));
            assert!(matches!(source, RemoteFailure::Status { ref body, .. } if body == "conflict"));
        }
        other => panic!("Expected RemoteUpdate, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/pages/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page("slow", "Slow", "2024-05-07", false))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = client(&server, Duration::from_millis(200));
    let err = assert_err!(client.retrieve("slow").await);
    match &err {
        ReminderError::RemoteFetch { source, .. } => assert!(source.is_timeout()),
        other => panic!("Expected RemoteFetch, got: {other:?}"),
    }
    // The transport error stays reachable through the source chain
    assert!(err.source().is_some());
}
