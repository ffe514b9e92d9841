use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use pricing_api::{create_router, load_model, ApiKeySet, AppState, HOME_MESSAGE};
use pricing_core::{Column, DataFrame, Sector, Settings, StorageBackend, CATEGORICAL_COLUMNS};
use pricing_model::{
    ColumnTransformer, GradientBoostingModel, GradientBoostingParams, Model, ModelError,
    Predictor,
};
use serde_json::{json, Value};

const KEY: &str = "test-secret-key";

/// Returns a fixed price and counts how often it was asked.
#[derive(Default)]
struct FixedPredictor {
    calls: AtomicUsize,
}

impl Predictor for FixedPredictor {
    fn predict(&self, features: &DataFrame) -> Result<Vec<f64>, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![12_345.0; features.height()])
    }
}

fn api_key_header() -> HeaderName {
    HeaderName::from_static("x-api-key")
}

fn server_with(predictor: Arc<dyn Predictor>) -> TestServer {
    let state = AppState::new(predictor, ApiKeySet::new([KEY, "rotated-key"]));
    TestServer::new(create_router(state)).unwrap()
}

fn record() -> Value {
    json!({
        "type": "casa",
        "sector": "la reina",
        "net_usable_area": 100.0,
        "net_area": 120.0,
        "n_rooms": 3,
        "n_bathroom": 2,
        "latitude": -33.45,
        "longitude": -70.6
    })
}

#[tokio::test]
async fn health_returns_ok_with_valid_key() {
    let server = server_with(Arc::new(FixedPredictor::default()));
    let resp = server
        .get("/health")
        .add_header(api_key_header(), HeaderValue::from_static(KEY))
        .await;
    assert_eq!(resp.status_code(), 200);
    assert_eq!(resp.json::<Value>(), json!({ "status": "ok" }));
}

#[tokio::test]
async fn home_describes_the_api() {
    let server = server_with(Arc::new(FixedPredictor::default()));
    let resp = server
        .get("/")
        .add_header(api_key_header(), HeaderValue::from_static("rotated-key"))
        .await;
    assert_eq!(resp.status_code(), 200);
    assert_eq!(resp.json::<Value>()["message"], HOME_MESSAGE);
}

#[tokio::test]
async fn wrong_or_missing_key_is_unauthorized_on_every_route() {
    let predictor = Arc::new(FixedPredictor::default());
    let server = server_with(predictor.clone());

    for path in ["/", "/health"] {
        let resp = server.get(path).await;
        assert_eq!(resp.status_code(), 401);
        assert_eq!(resp.json::<Value>(), json!({ "detail": "Invalid API Key" }));
    }

    let resp = server
        .post("/predict")
        .add_header(api_key_header(), HeaderValue::from_static("not-the-key"))
        .json(&record())
        .await;
    assert_eq!(resp.status_code(), 401);
    assert_eq!(resp.json::<Value>(), json!({ "detail": "Invalid API Key" }));

    let resp = server
        .post("/predict")
        .add_header(api_key_header(), HeaderValue::from_static("not-the-key"))
        .json(&json!({ "sector": "atlantis" }))
        .await;
    assert_eq!(resp.status_code(), 401);

    assert_eq!(predictor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn valid_record_is_forwarded_to_the_model() {
    let predictor = Arc::new(FixedPredictor::default());
    let server = server_with(predictor.clone());
    let resp = server
        .post("/predict")
        .add_header(api_key_header(), HeaderValue::from_static(KEY))
        .json(&record())
        .await;
    assert_eq!(resp.status_code(), 200);
    assert_eq!(resp.json::<Value>(), json!({ "prediction": 12345.0 }));
    assert_eq!(predictor.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn whole_number_floats_are_accepted_as_counts() {
    let predictor = Arc::new(FixedPredictor::default());
    let server = server_with(predictor.clone());
    let mut body = record();
    body["n_rooms"] = json!(3.0);
    body["n_bathroom"] = json!(2.0);

    let resp = server
        .post("/predict")
        .add_header(api_key_header(), HeaderValue::from_static(KEY))
        .json(&body)
        .await;
    assert_eq!(resp.status_code(), 200);

    body["n_bathroom"] = json!(1.5);
    let resp = server
        .post("/predict")
        .add_header(api_key_header(), HeaderValue::from_static(KEY))
        .json(&body)
        .await;
    assert_eq!(resp.status_code(), 422);
    assert_eq!(predictor.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn schema_violations_are_rejected_before_the_model() {
    let predictor = Arc::new(FixedPredictor::default());
    let server = server_with(predictor.clone());

    let mut bad_sector = record();
    bad_sector["sector"] = json!("santiago centro");
    let mut bad_type = record();
    bad_type["type"] = json!("castle");
    let mut missing = record();
    missing.as_object_mut().unwrap().remove("latitude");
    let mut wrong_type = record();
    wrong_type["n_rooms"] = json!("three");
    let mut negative_area = record();
    negative_area["net_area"] = json!(-1.0);
    let mut negative_rooms = record();
    negative_rooms["n_rooms"] = json!(-2);

    for body in [bad_sector, bad_type, missing, wrong_type, negative_area, negative_rooms] {
        let resp = server
            .post("/predict")
            .add_header(api_key_header(), HeaderValue::from_static(KEY))
            .json(&body)
            .await;
        assert_eq!(resp.status_code(), 422, "body {body} should be rejected");
        assert!(resp.json::<Value>()["detail"].is_string());
    }

    let resp = server
        .post("/predict")
        .add_header(api_key_header(), HeaderValue::from_static(KEY))
        .text("{not json")
        .content_type("application/json")
        .await;
    assert_eq!(resp.status_code(), 422);

    assert_eq!(predictor.calls.load(Ordering::SeqCst), 0);
}

fn training_frame(rows: usize) -> (DataFrame, Vec<f64>) {
    let mut types = Vec::new();
    let mut sectors = Vec::new();
    let mut numeric: [Vec<f64>; 6] = Default::default();
    let mut price = Vec::new();
    for i in 0..rows {
        let size = 50.0 + (i % 11) as f64 * 9.0;
        types.push(if i % 3 == 0 { "casa" } else { "departamento" }.to_string());
        sectors.push(Sector::ALL[i % Sector::ALL.len()].as_str().to_string());
        numeric[0].push(size);
        numeric[1].push(size * 1.1);
        numeric[2].push((1 + i % 4) as f64);
        numeric[3].push((1 + i % 2) as f64);
        numeric[4].push(-33.40 - (i % 6) as f64 * 0.01);
        numeric[5].push(-70.55 - (i % 3) as f64 * 0.01);
        price.push(size * 100.0 + (i % Sector::ALL.len()) as f64 * 500.0);
    }
    let [usable, area, rooms, baths, lat, lon] = numeric;
    let frame = DataFrame::from_columns([
        ("type", Column::Categorical(types)),
        ("sector", Column::Categorical(sectors)),
        ("net_usable_area", Column::Numeric(usable)),
        ("net_area", Column::Numeric(area)),
        ("n_rooms", Column::Numeric(rooms)),
        ("n_bathroom", Column::Numeric(baths)),
        ("latitude", Column::Numeric(lat)),
        ("longitude", Column::Numeric(lon)),
    ])
    .unwrap();
    (frame, price)
}

fn trained_model() -> GradientBoostingModel {
    let (features, target) = training_frame(60);
    let mut model = GradientBoostingModel::with_params(
        ColumnTransformer::new(CATEGORICAL_COLUMNS),
        GradientBoostingParams {
            n_estimators: 30,
            learning_rate: 0.1,
            ..GradientBoostingParams::default()
        },
    );
    model.train(&features, &target).unwrap();
    model
}

#[tokio::test]
async fn trained_model_answers_deterministically() {
    let trained = trained_model().into_trained().unwrap();
    let server = server_with(Arc::new(trained));

    let mut predictions = Vec::new();
    for _ in 0..3 {
        let resp = server
            .post("/predict")
            .add_header(api_key_header(), HeaderValue::from_static(KEY))
            .json(&record())
            .await;
        assert_eq!(resp.status_code(), 200);
        let value = resp.json::<Value>()["prediction"].as_f64().unwrap();
        assert!(value.is_finite());
        predictions.push(value);
    }
    assert!(predictions.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn model_is_loaded_from_the_configured_bucket() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("buckets");
    let artifact = root.join("pricing").join("models").join("model.bin");
    trained_model().save(&artifact).unwrap();

    let settings = Settings {
        storage_backend: StorageBackend::Local,
        bucket_name: "pricing".into(),
        local_storage_root: root,
        model_staging_dir: dir.path().join("staging"),
        ..Settings::default()
    };
    let loaded = load_model(&settings).await.unwrap();
    assert_eq!(loaded.feature_columns().len(), 8);
    assert!(dir.path().join("staging").join("model.bin").exists());

    let missing = Settings {
        bucket_model_path: "models/absent.bin".into(),
        ..settings
    };
    assert!(load_model(&missing).await.is_err());
}
