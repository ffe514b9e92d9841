//! The GCS backend against an in-process HTTP server that speaks the token
//! exchange and the JSON API media endpoints.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use pricing_core::Settings;
use pricing_storage::{
    credentials::STORAGE_SCOPE, GcsStore, ObjectStore, ServiceAccountKey, StorageError,
    StorageGateway,
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;

const PRIVATE_KEY: &str = include_str!("fixtures/service-account.pem");
const PUBLIC_KEY: &str = include_str!("fixtures/service-account.pub.pem");
const CLIENT_EMAIL: &str = "trainer@pricing.iam.gserviceaccount.com";
const ACCESS_TOKEN: &str = "ya29.mock-token";
const BUCKET: &str = "pricing-models";

#[derive(Clone)]
struct MockGcs {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    token_requests: Arc<AtomicUsize>,
    audience: String,
}

#[derive(Deserialize)]
struct Claims {
    iss: String,
    scope: String,
}

async fn token(State(mock): State<MockGcs>, Form(form): Form<HashMap<String, String>>) -> Response {
    mock.token_requests.fetch_add(1, Ordering::SeqCst);
    if form.get("grant_type").map(String::as_str)
        != Some("urn:ietf:params:oauth:grant-type:jwt-bearer")
    {
        return (StatusCode::BAD_REQUEST, "unsupported grant").into_response();
    }
    let Some(assertion) = form.get("assertion") else {
        return (StatusCode::BAD_REQUEST, "missing assertion").into_response();
    };

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[mock.audience.as_str()]);
    let key = DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap();
    match decode::<Claims>(assertion, &key, &validation) {
        Ok(data) if data.claims.iss == CLIENT_EMAIL && data.claims.scope == STORAGE_SCOPE => {
            Json(json!({ "access_token": ACCESS_TOKEN, "expires_in": 3600 })).into_response()
        }
        _ => (StatusCode::UNAUTHORIZED, "invalid_grant").into_response(),
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {ACCESS_TOKEN}"))
}

async fn download(
    State(mock): State<MockGcs>,
    Path((bucket, object)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if query.get("alt").map(String::as_str) != Some("media") {
        return StatusCode::BAD_REQUEST.into_response();
    }
    if object == "forbidden.bin" {
        return (StatusCode::FORBIDDEN, "access denied").into_response();
    }
    match mock.objects.lock().unwrap().get(&format!("{bucket}/{object}")) {
        Some(bytes) => bytes.clone().into_response(),
        None => (StatusCode::NOT_FOUND, "No such object").into_response(),
    }
}

async fn upload(
    State(mock): State<MockGcs>,
    Path(bucket): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let (Some("media"), Some(name)) = (query.get("uploadType").map(String::as_str), query.get("name"))
    else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    mock.objects
        .lock()
        .unwrap()
        .insert(format!("{bucket}/{name}"), body.to_vec());
    Json(json!({ "bucket": bucket, "name": name })).into_response()
}

async fn spawn_mock() -> (SocketAddr, MockGcs) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let mock = MockGcs {
        objects: Arc::default(),
        token_requests: Arc::default(),
        audience: format!("http://{addr}/token"),
    };
    let app = Router::new()
        .route("/token", post(token))
        .route("/storage/v1/b/{bucket}/o/{object}", get(download))
        .route("/upload/storage/v1/b/{bucket}/o", post(upload))
        .with_state(mock.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, mock)
}

fn key_json(addr: SocketAddr, client_email: &str) -> String {
    json!({
        "type": "service_account",
        "client_email": client_email,
        "private_key": PRIVATE_KEY,
        "token_uri": format!("http://{addr}/token"),
    })
    .to_string()
}

fn store(addr: SocketAddr) -> GcsStore {
    let key = ServiceAccountKey::from_json(&key_json(addr, CLIENT_EMAIL)).unwrap();
    GcsStore::new(&format!("http://{addr}"), BUCKET, key).unwrap()
}

#[tokio::test]
async fn gateway_round_trips_through_the_json_api_with_one_token_exchange() {
    let (addr, mock) = spawn_mock().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("sa.json"), key_json(addr, CLIENT_EMAIL)).unwrap();

    let settings = Settings {
        bucket_name: BUCKET.into(),
        storage_endpoint: format!("http://{addr}"),
        credentials_dir: dir.path().to_path_buf(),
        google_application_credentials: Some("sa.json".into()),
        model_staging_dir: dir.path().join("staging"),
        ..Settings::default()
    };
    let gateway = StorageGateway::from_settings(&settings).unwrap();
    assert_eq!(gateway.location(), "gs://pricing-models");

    let source = dir.path().join("model.bin");
    std::fs::write(&source, b"artifact-bytes").unwrap();
    gateway.upload(&source, "models/model.bin").await.unwrap();
    assert_eq!(
        mock.objects.lock().unwrap().get("pricing-models/models/model.bin"),
        Some(&b"artifact-bytes".to_vec())
    );

    let staged = gateway.download("models/model.bin").await.unwrap();
    assert_eq!(staged, dir.path().join("staging").join("model.bin"));
    assert_eq!(std::fs::read(staged).unwrap(), b"artifact-bytes");
    assert_eq!(mock.token_requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_object_is_not_found() {
    let (addr, mock) = spawn_mock().await;
    let store = store(addr);

    let err = store.get("models/absent.bin").await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
    assert_eq!(
        err.to_string(),
        "Object gs://pricing-models/models/absent.bin not found"
    );

    assert!(store.get("models/absent.bin").await.is_err());
    assert_eq!(mock.token_requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn other_failures_carry_status_and_body() {
    let (addr, _mock) = spawn_mock().await;
    let store = store(addr);

    match store.get("forbidden.bin").await {
        Err(StorageError::Status { status, body }) => {
            assert_eq!(status, 403);
            assert_eq!(body, "access denied");
        }
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn rejected_token_exchange_is_a_credentials_error() {
    let (addr, mock) = spawn_mock().await;
    let key = ServiceAccountKey::from_json(&key_json(addr, "intruder@example.com")).unwrap();
    let store = GcsStore::new(&format!("http://{addr}"), BUCKET, key).unwrap();

    match store.put("models/model.bin", b"bytes".to_vec()).await {
        Err(StorageError::Credentials(message)) => assert!(message.contains("401"), "{message}"),
        other => panic!("expected a credentials error, got {other:?}"),
    }
    assert!(mock.objects.lock().unwrap().is_empty());
}
