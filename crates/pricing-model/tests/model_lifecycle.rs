use pricing_core::{Column, DataFrame, PropertyRecord, PropertyType, Sector, CATEGORICAL_COLUMNS};
use pricing_model::{
    ColumnTransformer, GradientBoostingModel, GradientBoostingParams, Model, ModelError,
    Predictor, TrainedModel,
};

fn housing(rows: usize) -> (DataFrame, Vec<f64>) {
    let mut types = Vec::new();
    let mut sectors = Vec::new();
    let mut usable = Vec::new();
    let mut area = Vec::new();
    let mut rooms = Vec::new();
    let mut baths = Vec::new();
    let mut lat = Vec::new();
    let mut lon = Vec::new();
    let mut price = Vec::new();

    for i in 0..rows {
        let sector = Sector::ALL[i % Sector::ALL.len()];
        let is_house = i % 2 == 0;
        let size = 40.0 + (i % 17) as f64 * 10.0;
        types.push(if is_house { "casa" } else { "departamento" }.to_string());
        sectors.push(sector.as_str().to_string());
        usable.push(size);
        area.push(size * 1.2);
        rooms.push((1 + i % 4) as f64);
        baths.push((1 + i % 3) as f64);
        lat.push(-33.40 - (i % 7) as f64 * 0.01);
        lon.push(-70.55 - (i % 5) as f64 * 0.01);
        let sector_premium = (i % Sector::ALL.len()) as f64 * 800.0;
        price.push(size * 90.0 + sector_premium + if is_house { 1500.0 } else { 0.0 });
    }

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

fn small_model(seed: u64) -> GradientBoostingModel {
    GradientBoostingModel::with_params(
        ColumnTransformer::new(CATEGORICAL_COLUMNS),
        GradientBoostingParams {
            n_estimators: 60,
            learning_rate: 0.1,
            ..GradientBoostingParams::default().with_seed(seed)
        },
    )
}

#[test]
fn predict_before_train_is_not_fitted() {
    let (features, _) = housing(10);
    let model = GradientBoostingModel::from_preprocessor(ColumnTransformer::new(CATEGORICAL_COLUMNS), 0);
    assert!(matches!(model.predict(&features), Err(ModelError::NotFitted)));

    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        model.save(&dir.path().join("model.bin")),
        Err(ModelError::NotFitted)
    ));
}

#[test]
fn from_preprocessor_uses_default_hyperparameters() {
    let model = GradientBoostingModel::from_preprocessor(ColumnTransformer::new(CATEGORICAL_COLUMNS), 9);
    let params = model.params();
    assert_eq!(params.n_estimators, 300);
    assert_eq!(params.max_depth, 5);
    assert_eq!(params.learning_rate, 0.01);
    assert_eq!(params.random_seed, 9);
}

#[test]
fn saved_artifact_predicts_like_the_trained_model() {
    let (features, target) = housing(80);
    let mut model = small_model(0);
    model.train(&features, &target).unwrap();
    let expected = model.predict(&features).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("models").join("model.bin");
    model.save(&path).unwrap();

    let loaded = TrainedModel::load(&path).unwrap();
    assert_eq!(loaded.feature_columns(), features.column_names());
    assert_eq!(Predictor::predict(&loaded, &features).unwrap(), expected);
}

#[test]
fn same_seed_and_data_give_identical_artifacts() {
    let (features, target) = housing(60);
    let mut first = small_model(7);
    let mut second = small_model(7);
    first.train(&features, &target).unwrap();
    second.train(&features, &target).unwrap();
    assert_eq!(first.to_bytes().unwrap(), second.to_bytes().unwrap());
}

#[test]
fn retraining_refits_from_scratch() {
    let (features, target) = housing(60);
    let mut model = small_model(1);
    model.train(&features, &target).unwrap();
    let once = model.to_bytes().unwrap();
    model.train(&features, &target).unwrap();
    assert_eq!(model.to_bytes().unwrap(), once);
}

#[test]
fn single_record_prediction_is_repeatable() {
    let (features, target) = housing(80);
    let mut model = small_model(0);
    model.train(&features, &target).unwrap();
    let trained = model.into_trained().unwrap();

    let record = PropertyRecord {
        property_type: PropertyType::Casa,
        sector: Sector::LaReina,
        net_usable_area: 100.0,
        net_area: 120.0,
        n_rooms: 3,
        n_bathroom: 2,
        latitude: -33.45,
        longitude: -70.6,
    };
    let row = record.to_frame().unwrap();
    let first = trained.predict(&row).unwrap();
    let second = trained.predict(&row).unwrap();
    assert_eq!(first.len(), 1);
    assert!(first[0].is_finite());
    assert_eq!(first, second);
}

#[test]
fn missing_feature_column_is_reported() {
    let (features, target) = housing(40);
    let mut model = small_model(0);
    model.train(&features, &target).unwrap();

    let partial = features.select(&["type", "sector", "net_area"]).unwrap();
    let err = model.predict(&partial).unwrap_err();
    assert!(matches!(err, ModelError::FeatureMismatch(_)));
    assert!(err.to_string().contains("net_usable_area"));
}

#[test]
fn training_on_empty_frame_fails() {
    let (features, _) = housing(5);
    let empty = features.take(&[]).unwrap();
    let mut model = small_model(0);
    assert!(matches!(
        model.train(&empty, &[]),
        Err(ModelError::InvalidTrainingData(_))
    ));
    assert!(!model.is_fitted());
}
