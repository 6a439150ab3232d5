/**
 * HTTP SURFACE - what the Prometheus server talks to
 *
 * - GET /metrics        : runs a device pass, text exposition format
 * - GET /health         : liveness, never touches the devices
 * - GET /system/health  : JSON view of uptime, scrape count and device table
 *
 * No authentication, the endpoint is meant for a trusted LAN.
 */

use crate::exporter::Exporter;
use crate::health::{ExporterHealth, HealthTracker};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use std::sync::Arc;
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub exporter: Arc<Exporter>,
    pub health_tracker: HealthTracker,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/metrics", get(get_metrics))
        .with_state(app_state)
}

// GET /metrics
async fn get_metrics(State(app): State<AppState>) -> Response {
    match app.exporter.render().await {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!("failed to render metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to render metrics").into_response()
        }
    }
}

// GET /system/health
async fn get_system_health(State(app): State<AppState>) -> Json<ExporterHealth> {
    Json(app.health_tracker.get_health(app.exporter.devices()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::DeviceRegistry;
    use crate::fetcher::fake::ScriptedFetcher;
    use tokio::net::TcpListener;

    async fn serve() -> String {
        let fetcher = ScriptedFetcher::new()
            .room("a", "Kitchen")
            .reply("a", Some("OFDM ANI level: 47\nNoise Floor: -92 dBm (chain 0 ctl)"));
        let devices = DeviceRegistry::build(&["a".to_string()], &fetcher).await;
        let health_tracker = HealthTracker::new();
        let exporter = Exporter::new(devices, Arc::new(fetcher), health_tracker.clone()).unwrap();
        let app = build_router(AppState {
            exporter: Arc::new(exporter),
            health_tracker,
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let base = serve().await;
        let response = reqwest::get(format!("{}/metrics", base)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let content_type = response.headers()[reqwest::header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/plain"));

        let body = response.text().await.unwrap();
        assert!(body.contains("sonos_ani{host=\"Kitchen\"} 47"));
        assert!(body.contains("sonos_noise{ctl=\"0\",host=\"Kitchen\"} -92"));
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let base = serve().await;
        let ok = reqwest::get(format!("{}/health", base)).await.unwrap().text().await.unwrap();
        assert_eq!(ok, "ok");

        reqwest::get(format!("{}/metrics", base)).await.unwrap();
        let health: serde_json::Value = serde_json::from_str(
            &reqwest::get(format!("{}/system/health", base)).await.unwrap().text().await.unwrap(),
        )
        .unwrap();
        assert_eq!(health["scrapes_total"], 1);
        assert_eq!(health["devices"][0]["room_name"], "Kitchen");
    }
}
