use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use quarry_core::{
    hash_secret, AppConfig, RepositoryConfig, RouteConfig, RoutePermission, StorageConfig,
    TokenConfig, Visibility,
};
use quarry_server::{build_state, create_router};

const JAR: &str = "/releases/com/acme/lib/1.0/lib-1.0.jar";

fn repository(root: &TempDir, name: &str, visibility: Visibility) -> RepositoryConfig {
    RepositoryConfig {
        name: name.to_string(),
        visibility,
        redeployment: false,
        preserved_snapshots: 0,
        storage: StorageConfig::Filesystem {
            path: root.path().join(name),
        },
        proxied: Vec::new(),
    }
}

fn admin_token() -> TokenConfig {
    TokenConfig {
        name: "admin".to_string(),
        secret_hash: hash_secret("hunter2"),
        routes: vec![RouteConfig {
            path: String::new(),
            permission: RoutePermission::Write,
        }],
    }
}

async fn router(repositories: Vec<RepositoryConfig>) -> Router {
    let config = AppConfig {
        repositories,
        tokens: vec![admin_token()],
        ..Default::default()
    };
    create_router(build_state(config).await.unwrap())
}

fn basic_auth(name: &str, secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{name}:{secret}")))
}

fn put(uri: &str, body: &'static [u8], auth: Option<String>) -> Request<Body> {
    let mut request = Request::builder().method(Method::PUT).uri(uri);
    if let Some(auth) = auth {
        request = request.header(AUTHORIZATION, auth);
    }
    request.body(Body::from(body)).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn read_body(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let root = TempDir::new().unwrap();
    let app = router(vec![repository(&root, "releases", Visibility::Public)]).await;

    let response = app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn deploy_and_download_roundtrip() {
    let root = TempDir::new().unwrap();
    let app = router(vec![repository(&root, "releases", Visibility::Public)]).await;

    let response = app
        .clone()
        .oneshot(put(JAR, b"artifact bytes", Some(basic_auth("admin", "hunter2"))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Public repositories serve anonymous downloads.
    let response = app.oneshot(get(JAR)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).unwrap(),
        "application/java-archive"
    );
    assert_eq!(read_body(response).await.as_ref(), b"artifact bytes");
}

#[tokio::test]
async fn anonymous_deploy_is_rejected() {
    let root = TempDir::new().unwrap();
    let app = router(vec![repository(&root, "releases", Visibility::Public)]).await;

    let response = app.oneshot(put(JAR, b"bytes", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body: serde_json::Value = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(body["status"], 401);
    assert_eq!(body["message"], "Unauthorized access request");
}

#[tokio::test]
async fn invalid_credentials_are_rejected_outright() {
    let root = TempDir::new().unwrap();
    let app = router(vec![repository(&root, "releases", Visibility::Public)]).await;

    let response = app
        .oneshot(put(JAR, b"bytes", Some(basic_auth("admin", "wrong"))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body: serde_json::Value = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(body["message"], "Invalid authorization credentials");
}

#[tokio::test]
async fn missing_artifact_is_not_found() {
    let root = TempDir::new().unwrap();
    let app = router(vec![repository(&root, "releases", Visibility::Public)]).await;

    let response = app.oneshot(get(JAR)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: serde_json::Value = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn directory_requests_return_json_listings() {
    let root = TempDir::new().unwrap();
    let app = router(vec![repository(&root, "releases", Visibility::Public)]).await;

    app.clone()
        .oneshot(put(JAR, b"bytes", Some(basic_auth("admin", "hunter2"))))
        .await
        .unwrap();

    let response = app
        .oneshot(get("/releases/com/acme/lib/1.0"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(body["type"], "directory");
    assert_eq!(body["files"][0]["name"], "lib-1.0.jar");
}

#[tokio::test]
async fn head_reports_metadata_without_a_body() {
    let root = TempDir::new().unwrap();
    let app = router(vec![repository(&root, "releases", Visibility::Public)]).await;

    app.clone()
        .oneshot(put(JAR, b"twelve bytes", Some(basic_auth("admin", "hunter2"))))
        .await
        .unwrap();

    let request = Request::builder()
        .method(Method::HEAD)
        .uri(JAR)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(CONTENT_LENGTH).unwrap(), "12");
    assert!(read_body(response).await.is_empty());
}

#[tokio::test]
async fn private_repository_rejects_anonymous_reads() {
    let root = TempDir::new().unwrap();
    let app = router(vec![repository(&root, "internal", Visibility::Private)]).await;

    let response = app
        .oneshot(get("/internal/com/acme/lib/1.0/lib-1.0.jar"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn delete_requires_write_token() {
    let root = TempDir::new().unwrap();
    let app = router(vec![repository(&root, "releases", Visibility::Public)]).await;

    app.clone()
        .oneshot(put(JAR, b"bytes", Some(basic_auth("admin", "hunter2"))))
        .await
        .unwrap();

    let anonymous = Request::builder()
        .method(Method::DELETE)
        .uri(JAR)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(anonymous).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let authorized = Request::builder()
        .method(Method::DELETE)
        .uri(JAR)
        .header(AUTHORIZATION, basic_auth("admin", "hunter2"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(authorized).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get(JAR)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn redeployment_is_rejected_with_bad_request() {
    let root = TempDir::new().unwrap();
    let app = router(vec![repository(&root, "releases", Visibility::Public)]).await;

    app.clone()
        .oneshot(put(JAR, b"v1", Some(basic_auth("admin", "hunter2"))))
        .await
        .unwrap();

    let response = app
        .oneshot(put(JAR, b"v2", Some(basic_auth("admin", "hunter2"))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(body["message"], "Redeployment is not allowed");
}
