//! Gateway API Tests
//!
//! The gateway is tested against a stub authority that records every call,
//! so a rejected request can be shown to never leave the gateway. One test
//! runs the real authority behind it.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::{header::AUTHORIZATION, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use common::{bearer, current_otp, seed_user, sessions, TestAuthority, PASSWORD};
use fileshare::db::UserRepository;
use fileshare::gateway::{create_router, AuthorityClient, GatewayOptions, GatewayState, RateLimits};
use fileshare::Database;

const UID: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";

/// What the stub authority saw.
#[derive(Clone, Default)]
struct Stub {
    calls: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<Value>>>,
}

impl Stub {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last(&self) -> Value {
        self.last.lock().unwrap().clone().unwrap_or(Value::Null)
    }

    fn record(&self, seen: Value) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(seen);
    }
}

async fn echo(
    State(stub): State<Stub>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let seen = json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "auth": headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()),
        "body": String::from_utf8_lossy(&body),
    });
    stub.record(seen.clone());

    if uri.path().starts_with("/shares/download/") {
        let status = StatusCode::from_u16(498).unwrap();
        return (status, Json(json!({ "error": true, "code": "EXPIRED" }))).into_response();
    }
    Json(seen).into_response()
}

async fn upload(State(stub): State<Stub>, mut multipart: Multipart) -> Json<Value> {
    let field = multipart.next_field().await.unwrap().unwrap();
    let name = field.name().map(str::to_string);
    let filename = field.file_name().map(str::to_string);
    let data = field.bytes().await.unwrap();
    let seen = json!({
        "field": name,
        "filename": filename,
        "data": String::from_utf8_lossy(&data),
    });
    stub.record(seen.clone());
    Json(seen)
}

async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn spawn_stub() -> (Stub, String) {
    let stub = Stub::default();
    let router = Router::new()
        .route("/files/upload", post(upload))
        .fallback(echo)
        .with_state(stub.clone());
    (stub, spawn(router).await)
}

fn gateway(db: &Database, authority_url: &str) -> TestServer {
    let authority = AuthorityClient::new(authority_url, Duration::from_secs(5)).unwrap();
    let state = Arc::new(GatewayState::with_store(db, sessions(), authority));
    let limits = Arc::new(RateLimits::new(1000, 1000));
    let options = GatewayOptions {
        cors_origins: vec![],
        max_upload_size: 1024 * 1024,
    };
    TestServer::new(create_router(state, limits, &options)).unwrap()
}

struct Fixture {
    server: TestServer,
    stub: Stub,
    db: Database,
}

async fn fixture() -> Fixture {
    let db = Database::open_in_memory().await.unwrap();
    let (stub, url) = spawn_stub().await;
    Fixture {
        server: gateway(&db, &url),
        stub,
        db,
    }
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_missing_token_never_forwarded() {
    let f = fixture().await;

    let response = f.server.get("/api/files").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["reason"], "token_invalid");
    assert_eq!(f.stub.calls(), 0);
}

#[tokio::test]
async fn test_revoked_token_tells_client_to_clear_state() {
    let f = fixture().await;
    let alice = seed_user(&f.db, "alice", true).await;
    let token = bearer(&alice);
    UserRepository::new(f.db.pool()).delete(&alice.id).await.unwrap();

    let response = f
        .server
        .get("/api/auth/profile")
        .add_header(AUTHORIZATION, token)
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["reason"], "token_revoked");
    assert_eq!(body["deleteAccount"], true);
    assert_eq!(f.stub.calls(), 0);
}

#[tokio::test]
async fn test_token_is_propagated() {
    let f = fixture().await;
    let alice = seed_user(&f.db, "alice", true).await;
    let token = bearer(&alice);

    f.server
        .get("/api/auth/profile")
        .add_header(AUTHORIZATION, token.clone())
        .await
        .assert_status_ok();

    let seen = f.stub.last();
    assert_eq!(seen["path"], "/auth/profile");
    assert_eq!(seen["auth"], token);
}

#[tokio::test]
async fn test_login_skips_session_but_validates_body() {
    let f = fixture().await;

    f.server
        .post("/api/auth/login")
        .json(&json!({ "username": "alice" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(f.stub.calls(), 0);

    f.server
        .post("/api/auth/login")
        .json(&json!({ "username": "alice", "password": PASSWORD }))
        .await
        .assert_status_ok();
    let seen = f.stub.last();
    assert_eq!(seen["method"], "POST");
    assert_eq!(seen["path"], "/auth/login");
    assert!(seen["auth"].is_null());
    let forwarded: Value = serde_json::from_str(seen["body"].as_str().unwrap()).unwrap();
    assert_eq!(forwarded["username"], "alice");
}

// ============================================================================
// Structural validation
// ============================================================================

#[tokio::test]
async fn test_malformed_ids_never_reach_authority() {
    let f = fixture().await;
    let alice = seed_user(&f.db, "alice", true).await;
    let token = bearer(&alice);

    for path in [
        "/api/shares/not-a-uid".to_string(),
        "/api/shares/1%20OR%201=1/toggle-publish".to_string(),
        format!("/api/shares/{}", UID.replace('-', "")),
    ] {
        f.server
            .get(&path)
            .add_header(AUTHORIZATION, token.clone())
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
    f.server
        .delete("/api/files/..%2F..%2Fetc")
        .add_header(AUTHORIZATION, token.clone())
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    f.server
        .post("/api/shares/not-a-uid/give-access")
        .add_header(AUTHORIZATION, token.clone())
        .json(&json!({ "username": "bobby", "otp": "123456" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    assert_eq!(f.stub.calls(), 0);

    f.server
        .get(&format!("/api/shares/{UID}"))
        .add_header(AUTHORIZATION, token)
        .await
        .assert_status_ok();
    assert_eq!(f.stub.calls(), 1);
    assert_eq!(f.stub.last()["path"], format!("/shares/{UID}"));
}

#[tokio::test]
async fn test_list_fields_and_enums() {
    let f = fixture().await;
    let alice = seed_user(&f.db, "alice", true).await;
    let token = bearer(&alice);

    f.server
        .post("/api/shares")
        .add_header(AUTHORIZATION, token.clone())
        .json(&json!({ "name": "Holiday", "files": UID }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    f.server
        .post("/api/shares")
        .add_header(AUTHORIZATION, token.clone())
        .json(&json!({ "name": "Holiday", "files": ["../passwd"] }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    f.server
        .post("/api/shares")
        .add_header(AUTHORIZATION, token.clone())
        .json(&json!({ "name": "Holiday2", "files": [UID] }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    f.server
        .get("/api/shares")
        .add_query_param("scope", "everything")
        .add_header(AUTHORIZATION, token.clone())
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(f.stub.calls(), 0);

    f.server
        .get("/api/shares")
        .add_query_param("scope", "owned")
        .add_header(AUTHORIZATION, token)
        .await
        .assert_status_ok();
    let seen = f.stub.last();
    assert_eq!(seen["path"], "/shares");
    assert_eq!(seen["query"], "scope=owned");
}

#[tokio::test]
async fn test_query_ops_are_checked() {
    let f = fixture().await;
    let alice = seed_user(&f.db, "alice", true).await;
    let token = bearer(&alice);

    for body in [
        json!({ "op": "dropTables" }),
        json!({ "op": "share" }),
        json!({ "op": "share", "id": "nope" }),
        json!({ "op": "fileShare", "shareLink": "short", "fileId": UID }),
        json!({ "op": "giveAccess", "id": UID, "otp": "abc", "username": "bobby" }),
    ] {
        f.server
            .post("/api/query")
            .add_header(AUTHORIZATION, token.clone())
            .json(&body)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
    assert_eq!(f.stub.calls(), 0);

    f.server
        .post("/api/query")
        .add_header(AUTHORIZATION, token)
        .json(&json!({ "op": "share", "id": UID }))
        .await
        .assert_status_ok();
    assert_eq!(f.stub.last()["path"], "/query");
}

#[tokio::test]
async fn test_filenames_are_reduced_to_base_name() {
    let f = fixture().await;
    let alice = seed_user(&f.db, "alice", true).await;
    let token = bearer(&alice);

    f.server
        .get(&format!("/api/shares/{UID}/files/..%2F..%2Fetc%2Fpasswd"))
        .add_header(AUTHORIZATION, token.clone())
        .await
        .assert_status_ok();
    assert_eq!(f.stub.last()["path"], format!("/shares/{UID}/files/passwd"));

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"hello".to_vec()).file_name("../../notes.txt"),
    );
    let response = f
        .server
        .post("/api/files/upload")
        .add_header(AUTHORIZATION, token)
        .multipart(form)
        .await;
    response.assert_status_ok();
    let seen: Value = response.json();
    assert_eq!(seen["field"], "file");
    assert_eq!(seen["filename"], "notes.txt");
    assert_eq!(seen["data"], "hello");
}

// ============================================================================
// Relaying
// ============================================================================

#[tokio::test]
async fn test_public_download_relays_status_verbatim() {
    let f = fixture().await;
    let link = "a".repeat(64);

    f.server
        .get("/api/shares/download/short")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(f.stub.calls(), 0);

    let response = f.server.get(&format!("/api/shares/download/{link}")).await;
    response.assert_status(StatusCode::from_u16(498).unwrap());
    assert_eq!(response.json::<Value>()["code"], "EXPIRED");
    assert!(f.stub.last()["auth"].is_null());
}

#[tokio::test]
async fn test_unreachable_authority_is_internal_error() {
    let db = Database::open_in_memory().await.unwrap();
    let alice = seed_user(&db, "alice", true).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let server = gateway(&db, &dead);
    let response = server
        .get("/api/files")
        .add_header(AUTHORIZATION, bearer(&alice))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["message"], "Internal error.");
}

#[tokio::test]
async fn test_health_is_local() {
    let f = fixture().await;
    let body: Value = f.server.get("/health").await.json();
    assert_eq!(body["service"], "gateway");
    assert_eq!(f.stub.calls(), 0);
}

// ============================================================================
// Through to the real authority
// ============================================================================

#[tokio::test]
async fn test_share_flow_through_gateway() {
    let authority = TestAuthority::new().await;
    let url = spawn(fileshare::web::create_router(authority.state.clone())).await;
    let server = gateway(authority.db(), &url);

    let alice = authority.user("alice", true).await;
    let bob = authority.user("bobby", true).await;
    let token = bearer(&alice);

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"hello".to_vec()).file_name("notes.txt"),
    );
    let file: Value = server
        .post("/api/files/upload")
        .add_header(AUTHORIZATION, token.clone())
        .multipart(form)
        .await
        .json();
    let file_id = file["id"].as_str().unwrap().to_string();

    let created: Value = server
        .post("/api/shares")
        .add_header(AUTHORIZATION, token.clone())
        .json(&json!({ "name": "Holiday", "files": [file_id] }))
        .await
        .json();
    let share_id = created["uid"].as_str().unwrap().to_string();

    server
        .get(&format!("/api/shares/{share_id}"))
        .add_header(AUTHORIZATION, bearer(&bob))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let granted: Value = server
        .post(&format!("/api/shares/{share_id}/give-access"))
        .add_header(AUTHORIZATION, token.clone())
        .json(&json!({ "username": "bobby", "otp": current_otp(&alice) }))
        .await
        .json();
    assert_eq!(granted["success"], true);

    server
        .get(&format!("/api/shares/{share_id}"))
        .add_header(AUTHORIZATION, bearer(&bob))
        .await
        .assert_status_ok();

    let toggled: Value = server
        .get(&format!("/api/shares/{share_id}/toggle-publish"))
        .add_header(AUTHORIZATION, token.clone())
        .await
        .json();
    assert_eq!(toggled["isPublic"], true);

    let detail: Value = server
        .get(&format!("/api/shares/{share_id}"))
        .add_header(AUTHORIZATION, token)
        .await
        .json();
    let link = detail["link"].as_str().unwrap();

    let download = server.get(&format!("/api/shares/download/{link}")).await;
    download.assert_status_ok();
    assert_eq!(download.header("content-type"), "application/zip");
    assert!(download
        .header("content-disposition")
        .to_str()
        .unwrap()
        .contains("Holiday.zip"));
    assert_eq!(&download.as_bytes()[..2], b"PK");
}
