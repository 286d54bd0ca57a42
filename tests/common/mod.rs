use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use storefront_api::{
    config::{AppConfig, StoreBackend},
    models::NewProduct,
    AppState,
};
use tempfile::TempDir;
use tower::ServiceExt;

/// Helper harness for spinning up an application over a throwaway data
/// directory (file backend) or an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub config: AppConfig,
    /// Keeps the data directory alive for the lifetime of the app.
    pub data_dir: Option<TempDir>,
}

#[allow(dead_code)]
impl TestApp {
    /// Construct a new file-backed test application with an empty data directory.
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp data dir");
        let config = test_config(StoreBackend::File, dir.path().to_string_lossy().as_ref());
        Self::build(config, Some(dir)).await
    }

    /// Construct a test application backed by a fresh in-memory SQLite database.
    pub async fn with_database() -> Self {
        let config = test_config(StoreBackend::Database, "unused");
        Self::build(config, None).await
    }

    /// Rebuilds the application over the same data directory, as a restart would.
    pub async fn restart(self) -> Self {
        let TestApp {
            config, data_dir, ..
        } = self;
        Self::build(config, data_dir).await
    }

    async fn build(config: AppConfig, data_dir: Option<TempDir>) -> Self {
        let state = AppState::bootstrap(config.clone())
            .await
            .expect("failed to bootstrap test state");
        let router = storefront_api::app(state.clone());
        Self {
            router,
            state,
            config,
            data_dir,
        }
    }

    /// Send a request against the router with an optional JSON body.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Sends a request and returns the status with the decoded JSON body.
    pub async fn request_json(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body).await;
        let status = response.status();
        (status, read_json(response).await)
    }

    /// Creates a product through the catalog service.
    pub async fn seed_product(&self, code: &str) -> storefront_api::models::Product {
        self.state
            .services
            .products
            .create(new_product(code))
            .await
            .expect("seed product for tests")
    }
}

#[allow(dead_code)]
pub fn test_config(backend: StoreBackend, data_dir: &str) -> AppConfig {
    AppConfig {
        environment: "test".to_string(),
        store_backend: backend,
        data_dir: data_dir.to_string(),
        database_url: "sqlite::memory:".to_string(),
        persist_timeout_ms: 2_000,
        ..AppConfig::default()
    }
}

#[allow(dead_code)]
pub async fn read_json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to read response body")
        .to_bytes();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is not JSON")
    }
}

#[allow(dead_code)]
pub fn new_product(code: &str) -> NewProduct {
    NewProduct {
        title: format!("Product {}", code),
        description: "A product seeded for tests".to_string(),
        code: code.to_string(),
        price: 10.0,
        stock: 5,
        category: "general".to_string(),
        status: None,
        thumbnails: vec![],
    }
}

#[allow(dead_code)]
pub fn product_body(code: &str) -> Value {
    json!({
        "title": "A",
        "description": "first product",
        "code": code,
        "price": 10,
        "stock": 5,
        "category": "c"
    })
}
