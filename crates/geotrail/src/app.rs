use std::time::Duration;

use axum::{
    http::{header, HeaderName, Method, StatusCode},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    handlers::{
        cache_admin::{get_freshness, get_stats, refresh_cache},
        devices::{get_device_position, get_device_route, get_map_positions, list_devices},
        health::{healthz, livez},
        positions::ingest_positions,
    },
    state::AppState,
};

/// Create the application router with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    // CORS configuration for API endpoints
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-user-id"),
            HeaderName::from_static("x-staff"),
        ]);

    // API routes with CORS
    let api_routes = Router::new()
        // Device routes
        .route("/devices", get(list_devices))
        .route("/devices/{device_id}/position", get(get_device_position))
        .route("/devices/{device_id}/route", get(get_device_route))
        .route("/map/positions", get(get_map_positions))
        // Ingest route
        .route("/positions", post(ingest_positions))
        // Cache administration routes
        .route("/cache/refresh", post(refresh_cache))
        .route("/cache/freshness", get(get_freshness))
        .route("/cache/stats", get(get_stats))
        .layer(cors);

    // Main application router
    Router::new()
        .route("/livez", get(livez))
        .route("/healthz", get(healthz))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(10),
        ))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use geotrail_core::store::{NewDevice, NewPosition, PositionStore};

    use crate::{config::Config, storage::SqlitePositionStore};

    fn test_config() -> Config {
        Config {
            operational_max_age_seconds: 60,
            staleness_ceiling_seconds: 300,
            refresh_interval_seconds: 30,
            store_timeout_ms: 8000,
            staff_row_cap: 1000,
            batch_row_cap: 100,
            ingest_batch_cap: 500,
            sqlite_path: ":memory:".to_string(),
        }
    }

    async fn seeded_state() -> AppState {
        let store = Arc::new(SqlitePositionStore::new_in_memory().await.unwrap());

        for (device_id, name) in [("dev-1", "Keys"), ("dev-2", "Wallet")] {
            store
                .upsert_device(&NewDevice {
                    device_id: device_id.to_string(),
                    name: name.to_string(),
                    icon: "📱".to_string(),
                    device_type: "tracker".to_string(),
                })
                .await
                .unwrap();
        }
        store
            .insert_position(&NewPosition {
                device_id: "dev-1".to_string(),
                latitude: Some(40.7128),
                longitude: Some(-74.006),
                altitude: None,
                floor_level: None,
                horizontal_accuracy: Some(5.0),
                vertical_accuracy: None,
                position_type: "Wifi".to_string(),
                address: "".to_string(),
                city: "".to_string(),
                country: "".to_string(),
                timestamp: Some(chrono::Utc::now().timestamp_millis()),
                readable_datetime: Some("2026-01-01 00:00:00".to_string()),
                battery_level: Some(0.8),
                battery_status: "Normal".to_string(),
            })
            .await
            .unwrap();
        store.grant_access(7, "dev-1").await.unwrap();

        AppState::build(store, &test_config())
    }

    fn get_as(uri: &str, user_id: &str, staff: bool) -> Request<Body> {
        let mut builder = Request::builder().uri(uri).header("x-user-id", user_id);
        if staff {
            builder = builder.header("x-staff", "1");
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_devices_requires_identity() {
        let app = create_app(seeded_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/devices")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbled_identity_is_bad_request() {
        let app = create_app(seeded_state().await);

        let response = app
            .oneshot(get_as("/api/devices", "not-a-number", false))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_granted_user_sees_scoped_cached_listing() {
        let state = seeded_state().await;
        state.materializer.refresh().await;
        let app = create_app(state);

        let response = app
            .oneshot(get_as("/api/devices", "7", false))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["source"], "materialized_view");
        assert_eq!(json["is_stale"], false);
        let devices = json["devices"].as_array().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0]["device_id"], "dev-1");
        assert_eq!(devices[0]["latitude"], "40.7128");
        assert_eq!(devices[0]["longitude"], "-74.006");
    }

    #[tokio::test]
    async fn test_staff_listing_covers_whole_fleet() {
        let state = seeded_state().await;
        state.materializer.refresh().await;
        let app = create_app(state);

        let response = app.oneshot(get_as("/api/devices", "1", true)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["devices"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_device_position_access_mapping() {
        let app = create_app(seeded_state().await);

        // Not granted: forbidden.
        let response = app
            .clone()
            .oneshot(get_as("/api/devices/dev-2/position", "7", false))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // Staff, but the device does not exist: not found.
        let response = app
            .clone()
            .oneshot(get_as("/api/devices/ghost/position", "1", true))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // Granted: live row.
        let response = app
            .oneshot(get_as("/api/devices/dev-1/position", "7", false))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["device_id"], "dev-1");
    }

    #[tokio::test]
    async fn test_route_rejects_invalid_window() {
        let app = create_app(seeded_state().await);

        let response = app
            .oneshot(get_as("/api/devices/dev-1/route?hours=200", "7", false))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_route_returns_trail_points() {
        let app = create_app(seeded_state().await);

        let response = app
            .oneshot(get_as("/api/devices/dev-1/route?hours=24", "7", false))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["count"], 1);
        let points = json["points"].as_array().unwrap();
        assert_eq!(points[0]["latitude"], "40.7128");
    }

    #[tokio::test]
    async fn test_map_positions_drop_devices_without_coordinates() {
        let state = seeded_state().await;
        state.materializer.refresh().await;
        let app = create_app(state);

        let response = app
            .oneshot(get_as("/api/map/positions", "1", true))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        // dev-2 has no reported position.
        let devices = json.as_array().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0]["device_id"], "dev-1");
    }

    #[tokio::test]
    async fn test_cache_refresh_is_staff_only() {
        let app = create_app(seeded_state().await);

        let request = Request::builder()
            .method("POST")
            .uri("/api/cache/refresh")
            .header("x-user-id", "7")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let request = Request::builder()
            .method("POST")
            .uri("/api/cache/refresh")
            .header("x-user-id", "1")
            .header("x-staff", "1")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["rows_affected"], 2);
    }

    #[tokio::test]
    async fn test_freshness_and_stats_endpoints() {
        let state = seeded_state().await;
        state.materializer.refresh().await;
        let app = create_app(state);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/cache/freshness")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["is_stale"], false);
        assert_eq!(json["row_count"], 2);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/cache/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["total_refreshes"], 1);
        assert_eq!(json["successful_refreshes"], 1);
        assert_eq!(json["freshness"]["row_count"], 2);
    }

    #[tokio::test]
    async fn test_ingest_registers_device_and_position() {
        let state = seeded_state().await;
        let app = create_app(state.clone());

        let payload = serde_json::json!({
            "serialNumber": "dev-new",
            "name": {"label": "Backpack", "emoji": "🎒"},
            "location": {"latitude": 48.8566, "longitude": 2.3522},
            "timeStamp": chrono::Utc::now().timestamp_millis()
        });
        let request = Request::builder()
            .method("POST")
            .uri("/api/positions")
            .header("Content-Type", "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = json_body(response).await;
        assert_eq!(json["processed"], 1);

        // The new device shows up in a staff listing after a refresh.
        state.materializer.refresh().await;
        let response = app.oneshot(get_as("/api/devices", "1", true)).await.unwrap();
        let json = json_body(response).await;
        let devices = json["devices"].as_array().unwrap();
        assert!(devices.iter().any(|d| d["device_id"] == "dev-new"));
    }

    #[tokio::test]
    async fn test_ingest_batch_capped_independently_of_read_cap() {
        let store = Arc::new(SqlitePositionStore::new_in_memory().await.unwrap());
        let mut config = test_config();
        config.ingest_batch_cap = 1;
        let app = create_app(AppState::build(store, &config));

        let payload = serde_json::json!([
            {"serialNumber": "cap-1"},
            {"serialNumber": "cap-2"}
        ]);
        let request = Request::builder()
            .method("POST")
            .uri("/api/positions")
            .header("Content-Type", "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = json_body(response).await;
        assert_eq!(json["processed"], 1);
    }

    #[tokio::test]
    async fn test_health_probes() {
        let state = seeded_state().await;
        let app = create_app(state.clone());

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/livez").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Never-populated cache reports unavailable.
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        state.materializer.refresh().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
