//! Integration test: Prediction service endpoints

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use churn_pipeline::data::{generate_customer_data, GeneratorConfig};
use churn_pipeline::inference::ChurnPredictor;
use churn_pipeline::preprocessing::{target_to_vector, FeaturePreprocessor};
use churn_pipeline::server::{create_router, AppState, ServerConfig, MODEL_UNAVAILABLE_MESSAGE};
use churn_pipeline::training::{Classifier, ModelKind};
use serde_json::{json, Value};
use tower::ServiceExt;

fn trained_predictor() -> ChurnPredictor {
    let data = generate_customer_data(&GeneratorConfig::default().with_rows(200)).unwrap();
    let mut preprocessor = FeaturePreprocessor::new();
    let processed = preprocessor.fit_transform(&data).unwrap();
    let (features, target) = FeaturePreprocessor::split_features_target(&processed, "churn").unwrap();
    let x = preprocessor.to_matrix(&features).unwrap();
    let y = target_to_vector(&target).unwrap();

    let mut model = ModelKind::LogisticRegression.build(42);
    model.fit(&x, &y).unwrap();
    ChurnPredictor::new(preprocessor, model).unwrap()
}

fn missing_artifacts_config(dir: &Path) -> ServerConfig {
    ServerConfig::default()
        .with_host("127.0.0.1")
        .with_port(0)
        .with_model_path(dir.join("missing_model.json"))
        .with_preprocessor_path(dir.join("missing_preprocessor.json"))
}

fn customer() -> Value {
    json!({
        "tenure": 1,
        "monthly_charges": 80.0,
        "total_charges": 80.0,
        "contract_type": "Month-to-month",
        "payment_method": "Electronic check",
        "paperless_billing": "Yes",
        "internet_service": "Fiber optic",
        "online_security": "No",
        "online_backup": "No",
        "device_protection": "No",
        "tech_support": "No",
        "streaming_tv": "No",
        "streaming_movies": "No"
    })
}

async fn send(app: axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_root_reports_running() {
    let dir = tempfile::tempdir().unwrap();
    let state = Arc::new(AppState::new(missing_artifacts_config(dir.path())));
    let (status, body) = send(create_router(state), "GET", "/", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert_eq!(body["model_loaded"], false);
}

#[tokio::test]
async fn test_health_degraded_without_model() {
    let dir = tempfile::tempdir().unwrap();
    let state = Arc::new(AppState::load(missing_artifacts_config(dir.path())));
    let (status, body) = send(create_router(state), "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["model_loaded"], false);
    assert_eq!(body["preprocessor_loaded"], false);
}

#[tokio::test]
async fn test_predict_without_model_is_503() {
    let dir = tempfile::tempdir().unwrap();
    let state = Arc::new(AppState::new(missing_artifacts_config(dir.path())));
    let app = create_router(state);

    let (status, body) = send(app.clone(), "POST", "/predict", Some(customer())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], true);
    assert_eq!(body["message"], MODEL_UNAVAILABLE_MESSAGE);

    let (status, _) = send(app, "POST", "/predict_batch", Some(json!([customer()]))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_predict_with_model() {
    let dir = tempfile::tempdir().unwrap();
    let state = Arc::new(AppState::with_predictor(
        missing_artifacts_config(dir.path()),
        trained_predictor(),
    ));
    let (status, body) = send(create_router(state), "POST", "/predict", Some(customer())).await;

    assert_eq!(status, StatusCode::OK);
    let p = body["churn_probability"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&p));
    let expected = if p > 0.5 { "Yes" } else { "No" };
    assert_eq!(body["churn_prediction"], expected);
    assert!(["High", "Medium", "Low"].contains(&body["confidence"].as_str().unwrap()));
}

#[tokio::test]
async fn test_predict_batch_keeps_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let state = Arc::new(AppState::with_predictor(
        missing_artifacts_config(dir.path()),
        trained_predictor(),
    ));
    let app = create_router(state);

    let mut loyal = customer();
    loyal["tenure"] = json!(60);
    loyal["contract_type"] = json!("Two year");
    let (status, body) = send(app.clone(), "POST", "/predict_batch", Some(json!([customer(), loyal, customer()]))).await;

    assert_eq!(status, StatusCode::OK);
    let predictions = body["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 3);
    for (i, prediction) in predictions.iter().enumerate() {
        assert_eq!(prediction["customer_index"], i);
    }
    assert_eq!(predictions[0]["churn_probability"], predictions[2]["churn_probability"]);

    let (status, body) = send(app, "POST", "/predict_batch", Some(json!([]))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["predictions"], json!([]));
}

#[tokio::test]
async fn test_malformed_request_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let state = Arc::new(AppState::with_predictor(
        missing_artifacts_config(dir.path()),
        trained_predictor(),
    ));
    let (status, _) = send(create_router(state), "POST", "/predict", Some(json!({"tenure": 3}))).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_model_info() {
    let dir = tempfile::tempdir().unwrap();
    let predictor = trained_predictor();
    let features = predictor.feature_columns().to_vec();
    let state = Arc::new(AppState::with_predictor(missing_artifacts_config(dir.path()), predictor));
    let (status, body) = send(create_router(state), "GET", "/model_info", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["model_type"], "logistic_regression");
    assert_eq!(body["feature_columns"], json!(features));
    assert_eq!(body["api_version"], "1.0.0");
}

#[tokio::test]
async fn test_failed_reload_keeps_previous_predictor() {
    let dir = tempfile::tempdir().unwrap();
    let state = Arc::new(AppState::with_predictor(
        missing_artifacts_config(dir.path()),
        trained_predictor(),
    ));
    let app = create_router(Arc::clone(&state));

    let (status, body) = send(app.clone(), "POST", "/reload_model", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["model_loaded"], true);
    assert!(state.is_loaded().await);

    let (status, _) = send(app, "POST", "/predict", Some(customer())).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_reload_picks_up_new_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("best_model.json");
    let preprocessor_path = dir.path().join("preprocessor.json");
    let config = ServerConfig::default()
        .with_model_path(&model_path)
        .with_preprocessor_path(&preprocessor_path);

    let state = Arc::new(AppState::load(config));
    let app = create_router(Arc::clone(&state));
    let (status, _) = send(app.clone(), "POST", "/predict", Some(customer())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let predictor = trained_predictor();
    predictor.model().save(&model_path).unwrap();
    predictor.preprocessor().save(&preprocessor_path).unwrap();

    let (status, body) = send(app.clone(), "POST", "/reload_model", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let (status, body) = send(app.clone(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, _) = send(app, "POST", "/predict", Some(customer())).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_and_method() {
    let dir = tempfile::tempdir().unwrap();
    let state = Arc::new(AppState::new(missing_artifacts_config(dir.path())));
    let app = create_router(state);

    let (status, body) = send(app.clone(), "GET", "/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], true);

    let (status, _) = send(app, "GET", "/predict", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
