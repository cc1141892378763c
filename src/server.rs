//! HTTP surface for widget front-ends.
//!
//! This module provides an HTTP server that:
//! - Serves the displayed step count via GET /steps
//! - Resets the count via POST /reset (the widget's long press)
//! - Accepts step counter readings from the platform via POST /sensor
//! - Hands out pending user notices via GET /notices
//!
//! # Architecture
//!
//! ```text
//! Platform sensor ──→ POST /sensor ──→ StepCounter ──→ GET /steps ──→ Widget
//!                                          ↑
//!                        Widget ──→ POST /reset
//! ```

use crate::config::Config;
use crate::counter::{StepCounter, StepStatus};
use crate::sensor::{
    FeedSensor, NoopSensor, SensorAccuracy, SensorFeed, SensorReading, StepEvent, StepSensor,
};
use crate::store::{PreferenceStore, PREFS_NAME};
use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Step counter configuration
    pub app: Config,
    /// Whether the device has a step counter
    pub sensor_present: bool,
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new(port: u16, app: Config) -> Self {
        Self {
            port,
            app,
            sensor_present: true,
        }
    }
}

/// Shared server state
pub struct ServerState {
    /// The one step counter behind every endpoint
    counter: Mutex<StepCounter>,
    /// Entry point for platform readings, absent without a sensor
    feed: Option<SensorFeed>,
}

impl ServerState {
    /// Create new server state and start the counter
    pub fn new(config: &ServerConfig) -> Self {
        let store = PreferenceStore::open(&config.app.data_path, PREFS_NAME);

        let (sensor, feed): (Box<dyn StepSensor>, Option<SensorFeed>) = if config.sensor_present {
            let sensor = FeedSensor::new("http");
            let feed = sensor.feed();
            (Box::new(sensor), Some(feed))
        } else {
            (Box::new(NoopSensor::new()), None)
        };

        let mut counter = StepCounter::new(&config.app, Box::new(store), sensor);
        counter.start();

        Self {
            counter: Mutex::new(counter),
            feed,
        }
    }
}

/// A reading posted by the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cumulative: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<i32>,
    /// When the platform took the reading, defaults to arrival time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A pending user notice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeResponse {
    pub message: String,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>, code: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.to_string(),
        }),
    )
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /steps
async fn steps(State(state): State<Arc<ServerState>>) -> Json<StepStatus> {
    let mut counter = state.counter.lock().await;
    counter.pump();
    Json(counter.status())
}

/// POST /reset
async fn reset(State(state): State<Arc<ServerState>>) -> Json<StepStatus> {
    let mut counter = state.counter.lock().await;
    counter.pump();
    counter.reset();
    Json(counter.status())
}

/// POST /sensor
///
/// Accepts a cumulative step count and/or an accuracy change from the platform.
async fn sensor(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<SensorPayload>,
) -> Result<Json<StepStatus>, ApiError> {
    if payload.cumulative.is_none() && payload.accuracy.is_none() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Expected `cumulative` or `accuracy`",
            "EMPTY_READING",
        ));
    }

    let Some(feed) = state.feed.as_ref() else {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "No step counter sensor on this device",
            "SENSOR_UNAVAILABLE",
        ));
    };

    let mut counter = state.counter.lock().await;

    let accepted = payload
        .accuracy
        .map_or(true, |raw| feed.push_accuracy(SensorAccuracy::from_raw(raw)))
        && payload
            .cumulative
            .map_or(true, |cumulative| {
                let timestamp = payload.timestamp.unwrap_or_else(Utc::now);
                feed.push(SensorReading::Steps(StepEvent::at(cumulative, timestamp)))
            });
    if !accepted {
        return Err(api_error(
            StatusCode::CONFLICT,
            "Step counter is not listening",
            "SENSOR_NOT_LISTENING",
        ));
    }

    counter.pump();
    Ok(Json(counter.status()))
}

/// GET /notices
///
/// Drains notices raised since the last call.
async fn notices(State(state): State<Arc<ServerState>>) -> Json<Vec<NoticeResponse>> {
    let mut counter = state.counter.lock().await;
    counter.pump();
    let pending = counter
        .notices()
        .try_iter()
        .map(|notice| NoticeResponse {
            message: notice.message(),
        })
        .collect();
    Json(pending)
}

/// Build the router over a prepared state
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/steps", get(steps))
        .route("/reset", post(reset))
        .route("/sensor", post(sensor))
        .route("/notices", get(notices))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let state = Arc::new(ServerState::new(&config));
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Stepper server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
