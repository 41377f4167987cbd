mod common;

use std::fs;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use schoolfix::http::error::INTERNAL_ERROR_MESSAGE;
use schoolfix::http::{AppState, build_router};
use schoolfix_lib::{IssueStore, JsonFileStore, LocalStore};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use common::init_test_logging;

fn local_app() -> Router {
    let store: Arc<dyn IssueStore> = Arc::new(LocalStore::new("api_test"));
    build_router(AppState::new(store))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("router response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn test_report_triage_resolve_delete() {
    init_test_logging();
    let app = local_app();

    let (status, created) = send(
        &app,
        json_request(
            "POST",
            "/api/issues",
            &json!({
                "title": "A",
                "description": "B",
                "category": "อื่นๆ",
                "priority": "high",
                "location": "L",
                "status": "resolved"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().expect("id").to_string();
    assert!(id.starts_with("ISS-"));
    assert_eq!(created["status"], "pending");
    assert_eq!(created["priority"], "high");
    assert_eq!(created["createdAt"], created["updatedAt"]);
    assert!(created.get("resolvedAt").is_none());

    let (status, updated) = send(
        &app,
        json_request(
            "PUT",
            "/api/issues",
            &json!({ "id": id, "status": "resolved", "adminNote": "fixed" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "resolved");
    assert_eq!(updated["adminNote"], "fixed");
    assert_eq!(updated["resolvedAt"], updated["updatedAt"]);
    assert_eq!(updated["createdAt"], created["createdAt"]);

    let (status, listed) = send(&app, empty_request("GET", "/api/issues?status=resolved")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().expect("array").len(), 1);

    let (status, body) = send(&app, empty_request("DELETE", &format!("/api/issues?id={id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Issue deleted successfully");

    let (status, listed) = send(&app, empty_request("GET", "/api/issues")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        listed
            .as_array()
            .expect("array")
            .iter()
            .all(|issue| issue["id"] != id.as_str())
    );
}

#[tokio::test]
async fn test_list_filters_and_rejects_bad_values() {
    init_test_logging();
    let app = local_app();

    for (title, priority) in [("Projector", "low"), ("Fire door", "high"), ("Sink", "medium")] {
        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/api/issues",
                &json!({ "title": title, "description": "d", "category": "safety", "priority": priority }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, listed) = send(&app, empty_request("GET", "/api/issues?priority=all&sort=priority")).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = listed
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|issue| issue["title"].as_str())
        .collect();
    assert_eq!(titles, ["Fire door", "Sink", "Projector"]);

    let (status, listed) = send(&app, empty_request("GET", "/api/issues?q=door&limit=5")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().expect("array").len(), 1);

    let (status, body) = send(&app, empty_request("GET", "/api/issues?status=closed")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().expect("message").contains("closed"));
}

#[tokio::test]
async fn test_client_errors() {
    init_test_logging();
    let app = local_app();

    let (status, body) = send(
        &app,
        json_request("POST", "/api/issues", &json!({ "title": " ", "description": "d", "category": "other" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().expect("message").contains("title"));

    let (status, _) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/issues")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, json_request("PUT", "/api/issues", &json!({ "status": "resolved" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Issue ID is required");

    let (status, _) = send(
        &app,
        json_request("PUT", "/api/issues", &json!({ "id": "ISS-1-NOPE1", "status": "resolved" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, empty_request("DELETE", "/api/issues")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Issue ID is required");

    let (status, _) = send(&app, empty_request("DELETE", "/api/issues?id=ISS-1-NOPE1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stats_reflect_the_collection() {
    init_test_logging();
    let app = local_app();

    let (_, created) = send(
        &app,
        json_request("POST", "/api/issues", &json!({ "title": "t", "description": "d", "category": "network" })),
    )
    .await;
    send(
        &app,
        json_request("POST", "/api/issues", &json!({ "title": "u", "description": "d", "category": "hygiene", "priority": "high" })),
    )
    .await;
    send(
        &app,
        json_request("PUT", "/api/issues", &json!({ "id": created["id"], "status": "inprogress" })),
    )
    .await;

    let (status, stats) = send(&app, empty_request("GET", "/api/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["pending"], 1);
    assert_eq!(stats["inprogress"], 1);
    assert_eq!(stats["resolved"], 0);
    assert_eq!(stats["high"], 1);
    assert_eq!(stats["medium"], 1);
}

#[tokio::test]
async fn test_file_store_round_trip_and_corruption() {
    init_test_logging();
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("data").join("issues.json");
    let store: Arc<dyn IssueStore> = Arc::new(JsonFileStore::new(&path));
    let app = build_router(AppState::new(store));

    let (status, _) = send(
        &app,
        json_request("POST", "/api/issues", &json!({ "title": "t", "description": "d", "category": "building" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let on_disk: Value = serde_json::from_str(&fs::read_to_string(&path).expect("data file")).expect("json");
    assert_eq!(on_disk.as_array().expect("array").len(), 1);

    fs::write(&path, "[{broken").expect("corrupt file");
    let (status, body) = send(&app, empty_request("GET", "/api/issues")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], INTERNAL_ERROR_MESSAGE);

    let (status, _) = send(
        &app,
        json_request("POST", "/api/issues", &json!({ "title": "t", "description": "d", "category": "building" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(fs::read_to_string(&path).expect("data file"), "[{broken");
}

#[tokio::test]
async fn test_event_stream_starts_with_a_snapshot() {
    init_test_logging();
    let app = local_app();
    send(
        &app,
        json_request("POST", "/api/issues", &json!({ "title": "t", "description": "d", "category": "equipment" })),
    )
    .await;

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/api/issues/events"))
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/event-stream"
    );

    let mut body = response.into_body();
    let frame = body
        .frame()
        .await
        .expect("first frame")
        .expect("frame ok")
        .into_data()
        .expect("data frame");
    let text = String::from_utf8(frame.to_vec()).expect("utf8");
    assert!(text.starts_with("event: snapshot\n"), "got: {text}");
    assert!(text.contains("\"title\":\"t\""));
}
