use axum::http::StatusCode;
use axum::body::Body;
use http_body_util::BodyExt;
use tower::ServiceExt;
use serde_json::{json, Value};
use findings_gate::api::{build_router, create_app_state, AppState};
use findings_gate::backend::MemoryBackend;
use findings_gate::browser::{BrowseTarget, BrowserRegistry};
use findings_gate::models::{FolderBucket, IssueRow, VersionId};
use findings_gate::summary::{BuildRecord, BuildResult, BuildSummary, JobHistory, Qualifier};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn issue(id: u64, path: &str, line: u32) -> IssueRow {
    IssueRow {
        version_id: VersionId(0),
        issue_id: id,
        instance_id: format!("INST{}", id),
        file_path: path.to_string(),
        line_number: line,
        category: "SQL Injection".to_string(),
        severity: "Critical".to_string(),
        confidence: "5.0".to_string(),
        engine_type: "SCA".to_string(),
    }
}

fn create_test_state(builds: &Path) -> AppState {
    let backend = MemoryBackend::new()
        .with_version("billing", "2.1")
        .with_bucket(FolderBucket::new("c", "Critical", 3, 1))
        .with_bucket(FolderBucket::new("h", "High", 0, 0))
        .with_issues("c", vec![
            issue(1, "src/db/Users.java", 40),
            issue(2, "src/api/Orders.java", 12),
            issue(3, "src/api/orders.java", 3),
        ]);
    let registry = BrowserRegistry::new(
        Arc::new(backend),
        BrowseTarget {
            app_name: "billing".into(),
            app_version: "2.1".into(),
            filter_set: None,
            page_size: 2,
        },
    );
    create_app_state(registry, JobHistory::new(builds), Qualifier::new("billing", "2.1"))
}

fn app(state: &AppState) -> axum::Router {
    build_router(state.clone())
}

fn make_request(method: &str, uri: &str, session: Option<&str>, body: Option<Value>) -> axum::http::Request<Body> {
    let mut builder = axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(session) = session {
        builder = builder.header("x-session-id", session);
    }

    match body {
        Some(b) => builder.body(Body::from(serde_json::to_string(&b).unwrap())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn response_json(response: axum::http::Response<Body>) -> Value {
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        panic!("Empty response body. Status: {}, Headers: {:?}", parts.status, parts.headers);
    }
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("JSON parse error: {}. Body: {:?}", e, String::from_utf8_lossy(&bytes)))
}

async fn finished_build(builds: &Path, number: u64, summary: Option<BuildSummary>) {
    let mut record = BuildRecord::new(number);
    record.add_report(&Qualifier::new("billing", "2.1"));
    record.set_result(BuildResult::Success);
    record.finish();
    record.save(builds).await.unwrap();
    if let Some(summary) = summary {
        JobHistory::new(builds)
            .store()
            .save(number, &Qualifier::new("billing", "2.1"), &summary)
            .await
            .unwrap();
    }
}

fn summary(score: f64, high: u32) -> BuildSummary {
    BuildSummary {
        score,
        failed_count: 0,
        total_issues: high,
        folders: vec![FolderBucket::new("h", "High", high, 0)],
        log: None,
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(dir.path());
    let response = app(&state).oneshot(make_request("GET", "/api/health", None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["browser"], "Fortify Assessment (billing-2.1)");
}

#[tokio::test]
async fn test_issues_require_session_header() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(dir.path());
    let response = app(&state).oneshot(make_request("GET", "/api/issues", None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("x-session-id"));
}

#[tokio::test]
async fn test_issue_browsing_flow() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(dir.path());

    let response = app(&state)
        .oneshot(make_request("GET", "/api/issues", Some("s1"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["label"], "Critical (1 to 2 out of 3)");
    assert_eq!(body["has_next"], true);
    assert_eq!(body["issues"].as_array().unwrap().len(), 2);
    // Location order within the page: case-insensitive path, then line.
    assert_eq!(body["issues"][0]["display_name"], "Orders.java:12");
    assert_eq!(body["issues"][1]["display_name"], "Users.java:40");

    let response = app(&state)
        .oneshot(make_request("POST", "/api/issues/page", Some("s1"), Some(json!({"page": 1}))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(
        app(&state).oneshot(make_request("GET", "/api/issues", Some("s1"), None)).await.unwrap(),
    ).await;
    assert_eq!(body["label"], "Critical (3 to 3 out of 3)");
    assert_eq!(body["has_previous"], true);
    assert_eq!(body["issues"].as_array().unwrap().len(), 1);

    let body = response_json(
        app(&state).oneshot(make_request("GET", "/api/issues?first_time=yes", Some("s1"), None)).await.unwrap(),
    ).await;
    assert_eq!(body["page"], 0);
}

#[tokio::test]
async fn test_folder_switch_and_show_all() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(dir.path());

    let response = app(&state)
        .oneshot(make_request("POST", "/api/issues/folder", Some("s2"), Some(json!({"name": "High"}))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app(&state)
        .oneshot(make_request("POST", "/api/issues/show-all", Some("s2"), Some(json!({"show_all": false}))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(
        app(&state).oneshot(make_request("GET", "/api/issues", Some("s2"), None)).await.unwrap(),
    ).await;
    assert_eq!(body["folder"], "High");
    assert_eq!(body["label"], "High (No New Issues)");

    let response = app(&state)
        .oneshot(make_request("POST", "/api/issues/folder", Some("s2"), Some(json!({"name": "Nope"}))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sort_and_page_size() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(dir.path());

    let response = app(&state)
        .oneshot(make_request("POST", "/api/issues/sort", Some("s3"), Some(json!({"key": "bogus"}))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    for (uri, body) in [
        ("/api/issues/sort", json!({"key": "file", "descending": true})),
        ("/api/issues/page-size", json!({"size": -1})),
        ("/api/issues/grouping", json!({"grouping": "Analysis"})),
    ] {
        let response = app(&state).oneshot(make_request("POST", uri, Some("s3"), Some(body))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
    }

    let body = response_json(
        app(&state).oneshot(make_request("GET", "/api/issues", Some("s3"), None)).await.unwrap(),
    ).await;
    assert_eq!(body["label"], "Critical (1 to 3 out of 3)");
    assert_eq!(body["grouping"], "Analysis");
    assert_eq!(body["issues"][0]["display_name"], "Users.java:40");
    assert_eq!(body["issues"][2]["display_name"], "orders.java:3");
}

#[tokio::test]
async fn test_build_summary_endpoint() {
    let dir = TempDir::new().unwrap();
    finished_build(dir.path(), 1, Some(summary(7.5, 3))).await;
    let state = create_test_state(dir.path());

    let response = app(&state)
        .oneshot(make_request("GET", "/api/builds/1/summary", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["summary"]["score"], 7.5);

    let response = app(&state)
        .oneshot(make_request("GET", "/api/builds/1/summary?app=other&version=1", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_trend_and_history() {
    let dir = TempDir::new().unwrap();
    finished_build(dir.path(), 1, Some(summary(10.0, 8))).await;
    finished_build(dir.path(), 2, None).await;
    finished_build(dir.path(), 3, Some(summary(4.0, 3))).await;
    let state = create_test_state(dir.path());

    let body = response_json(
        app(&state).oneshot(make_request("GET", "/api/trend", None, None)).await.unwrap(),
    ).await;
    assert_eq!(body["build"], 3);
    assert_eq!(body["previous_build"], 2);
    // Build 2 has no summary, so there is nothing to compare against.
    assert_eq!(body["trend"]["folders"][0]["issues"]["previous"], Value::Null);

    let body = response_json(
        app(&state).oneshot(make_request("GET", "/api/history", None, None)).await.unwrap(),
    ).await;
    let points = body["points"].as_array().unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["build"], 1);
    assert_eq!(points[1]["score"], 4.0);
}

#[tokio::test]
async fn test_trend_when_last_build_has_no_summary() {
    let dir = TempDir::new().unwrap();
    finished_build(dir.path(), 1, Some(summary(10.0, 8))).await;
    finished_build(dir.path(), 2, None).await;
    let state = create_test_state(dir.path());

    let response = app(&state).oneshot(make_request("GET", "/api/trend", None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["build"], 2);
    assert_eq!(body["previous_build"], 1);
    assert_eq!(body["trend"]["score"]["current"], 0.0);
    assert_eq!(body["trend"]["score"]["previous"], 10.0);
    assert_eq!(body["trend"]["score"]["direction"], "less");
}

#[tokio::test]
async fn test_huge_page_number_is_served() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(dir.path());

    let response = app(&state)
        .oneshot(make_request("POST", "/api/issues/page", Some("s4"), Some(json!({"page": u64::MAX}))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app(&state).oneshot(make_request("GET", "/api/issues", Some("s4"), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["label"], "Critical (No Issues)");
    assert_eq!(body["has_next"], false);
    assert!(body["issues"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_trend_without_builds_is_not_found() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(dir.path());
    let response = app(&state).oneshot(make_request("GET", "/api/trend", None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
