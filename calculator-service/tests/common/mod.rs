#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use base64::{engine::general_purpose, Engine as _};
use calculator_service::config::CalculatorConfig;
use calculator_service::services::analyzers::mock::MockImageAnalyzer;
use calculator_service::startup::{build_router, AppState, Application};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::Value;
use service_core::config::Config;
use std::io::Cursor;
use std::sync::Arc;

/// Config bound to an ephemeral local port, with extra variables from `vars`.
pub fn test_config_with(vars: &[(&str, &str)]) -> CalculatorConfig {
    let common = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
    };
    CalculatorConfig::from_vars(common, |key| {
        vars.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    })
    .expect("Failed to build test config")
}

pub fn test_config() -> CalculatorConfig {
    test_config_with(&[])
}

/// Router backed by `analyzer`; the returned handle inspects its calls.
pub fn router_with(analyzer: MockImageAnalyzer) -> (axum::Router, Arc<MockImageAnalyzer>) {
    let analyzer = Arc::new(analyzer);
    let state = AppState::new(test_config(), analyzer.clone());
    (build_router(state), analyzer)
}

pub fn json_post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body")
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("Body is not JSON")
}

pub fn encode_image(format: ImageFormat) -> Vec<u8> {
    let image = RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]));
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buffer, format)
        .expect("Failed to encode test image");
    buffer.into_inner()
}

/// A real, decodable PNG as the web client sends it.
pub fn png_data_uri() -> String {
    format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(encode_image(ImageFormat::Png))
    )
}

/// Server running on a random port with a mock analyzer.
pub struct TestApp {
    pub address: String,
    pub analyzer: Arc<MockImageAnalyzer>,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn(analyzer: MockImageAnalyzer) -> Self {
        let analyzer = Arc::new(analyzer);
        let app = Application::build_with_analyzer(test_config(), analyzer.clone())
            .await
            .expect("Failed to build test application");

        let address = format!("http://127.0.0.1:{}", app.port());

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        Self {
            address,
            analyzer,
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}
