//! HTTP surface: router construction and request handlers.
//!
//! Handlers stay thin: deserialize the typed request body, call the store,
//! and let [`ApiError`] translate the outcome into a status code and
//! `{"error": "..."}` body.  CORS is permissive on every route so the
//! single-page frontend can be served from anywhere.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use sundial_store::{
    Appointment, AppointmentUpdate, AppointmentWithClient, Client, ClientUpdate, Database,
    NewAppointment, NewClient, NewClientAppointment,
};

use crate::error::ApiError;

/// Shared application state.
///
/// The store handle is request-scoped through the mutex: each handler holds
/// the single SQLite connection only for the duration of its call, and the
/// guard's drop releases it on success and failure alike.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/clients", get(list_clients).post(create_client))
        .route(
            "/api/clients/{id}",
            put(update_client).delete(delete_client),
        )
        .route(
            "/api/appointments",
            get(list_appointments).post(create_appointment),
        )
        .route(
            "/api/appointments/with_clients",
            get(list_appointments_with_clients),
        )
        .route(
            "/api/appointments/with_new_client",
            post(create_appointment_with_new_client),
        )
        .route(
            "/api/appointments/{id}",
            put(update_appointment).delete(delete_appointment),
        )
        .route("/api/appointments/{id}/cancel", put(cancel_appointment))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: Utc::now(),
    })
}

// ---------------------------------------------------------------------------
// Clients
// ---------------------------------------------------------------------------

async fn list_clients(State(state): State<AppState>) -> Result<Json<Vec<Client>>, ApiError> {
    let db = state.db.lock().await;
    Ok(Json(db.list_clients()?))
}

async fn create_client(
    State(state): State<AppState>,
    Json(body): Json<NewClient>,
) -> Result<(StatusCode, Json<Client>), ApiError> {
    let db = state.db.lock().await;
    let client = db.create_client(&body).map_err(|e| {
        ApiError::new(
            e,
            "Unable to create client. Please try again or contact support if the problem persists.",
        )
    })?;

    Ok((StatusCode::CREATED, Json(client)))
}

async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ClientUpdate>,
) -> Result<Json<Client>, ApiError> {
    let db = state.db.lock().await;
    let client = db.update_client(&id, &body).map_err(|e| {
        ApiError::new(
            e,
            "Unable to update client. Please check your changes and try again.",
        )
    })?;

    Ok(Json(client))
}

async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let db = state.db.lock().await;
    db.delete_client(&id)
        .map_err(|e| ApiError::new(e, "Unable to delete client. Please try again."))?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Appointments
// ---------------------------------------------------------------------------

async fn list_appointments(
    State(state): State<AppState>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let db = state.db.lock().await;
    Ok(Json(db.list_appointments()?))
}

async fn list_appointments_with_clients(
    State(state): State<AppState>,
) -> Result<Json<Vec<AppointmentWithClient>>, ApiError> {
    let db = state.db.lock().await;
    Ok(Json(db.list_appointments_with_clients()?))
}

async fn create_appointment(
    State(state): State<AppState>,
    Json(body): Json<NewAppointment>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let db = state.db.lock().await;
    let appointment = db
        .create_appointment(&body)
        .map_err(|e| ApiError::new(e, "Unable to create appointment. Please try again."))?;

    Ok((StatusCode::CREATED, Json(appointment)))
}

async fn create_appointment_with_new_client(
    State(state): State<AppState>,
    Json(body): Json<NewClientAppointment>,
) -> Result<(StatusCode, Json<AppointmentWithClient>), ApiError> {
    let mut db = state.db.lock().await;
    let joined = db.create_appointment_with_new_client(&body).map_err(|e| {
        ApiError::new(
            e,
            "Unable to create appointment and client. Please try again.",
        )
    })?;

    Ok((StatusCode::CREATED, Json(joined)))
}

async fn update_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<AppointmentUpdate>,
) -> Result<Json<Appointment>, ApiError> {
    let db = state.db.lock().await;
    let appointment = db.update_appointment(&id, &body).map_err(|e| {
        ApiError::new(
            e,
            "Unable to update appointment. Please check your changes and try again.",
        )
    })?;

    Ok(Json(appointment))
}

async fn cancel_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, ApiError> {
    let db = state.db.lock().await;
    let appointment = db
        .cancel_appointment(&id)
        .map_err(|e| ApiError::new(e, "Unable to cancel appointment. Please try again."))?;

    Ok(Json(appointment))
}

async fn delete_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let db = state.db.lock().await;
    db.delete_appointment(&id)
        .map_err(|e| ApiError::new(e, "Unable to delete appointment. Please try again."))?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Serving
// ---------------------------------------------------------------------------

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, Response};
    use chrono::Duration;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_app() -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        let state = AppState {
            db: Arc::new(Mutex::new(db)),
        };
        (dir, build_router(state))
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn bare_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: Response<Body>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn tomorrow() -> String {
        (Utc::now() + Duration::days(1)).to_rfc3339()
    }

    async fn seed_client(app: &Router, email: &str) -> Value {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/clients",
                json!({"name": "Ada", "email": email}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (_dir, app) = test_app();

        let response = app.oneshot(bare_request("GET", "/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "OK");
    }

    #[tokio::test]
    async fn create_client_round_trip() {
        let (_dir, app) = test_app();

        let created = seed_client(&app, "Ada@Example.com").await;
        assert_eq!(created["name"], "Ada");
        assert_eq!(created["email"], "ada@example.com");
        assert!(created["external_id"].as_str().is_some());

        let response = app
            .oneshot(bare_request("GET", "/api/clients"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listed = body_json(response).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_email_returns_conflict() {
        let (_dir, app) = test_app();

        seed_client(&app, "ada@x.com").await;

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/clients",
                json!({"name": "Other Ada", "email": "ada@x.com"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("email"));
    }

    #[tokio::test]
    async fn missing_name_returns_field_specific_message() {
        let (_dir, app) = test_app();

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/clients",
                json!({"email": "ada@x.com"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("name is required"));
    }

    #[tokio::test]
    async fn delete_client_with_appointments_is_blocked() {
        let (_dir, app) = test_app();

        let client = seed_client(&app, "ada@x.com").await;
        let client_id = client["external_id"].as_str().unwrap();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/appointments",
                json!({"client_id": client_id, "time": tomorrow()}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(bare_request(
                "DELETE",
                &format!("/api/clients/{client_id}"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        // without appointments the delete goes through
        let other = seed_client(&app, "grace@x.com").await;
        let other_id = other["external_id"].as_str().unwrap();
        let response = app
            .oneshot(bare_request("DELETE", &format!("/api/clients/{other_id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn appointment_for_unknown_client_is_not_found() {
        let (_dir, app) = test_app();

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/appointments",
                json!({"client_id": "1700000000-12345", "time": tomorrow()}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn past_appointment_time_is_rejected() {
        let (_dir, app) = test_app();

        let client = seed_client(&app, "ada@x.com").await;
        let client_id = client["external_id"].as_str().unwrap();
        let yesterday = (Utc::now() - Duration::days(1)).to_rfc3339();

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/appointments",
                json!({"client_id": client_id, "time": yesterday}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("in the past"));
    }

    #[tokio::test]
    async fn with_new_client_returns_joined_record() {
        let (_dir, app) = test_app();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/appointments/with_new_client",
                json!({"name": "Ada", "email": "ada@x.com", "time": tomorrow()}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(body["client_name"], "Ada");
        assert_eq!(body["status"], "scheduled");
        assert!(!body["external_id"].as_str().unwrap().is_empty());
        assert!(!body["client_id"].as_str().unwrap().is_empty());

        let response = app
            .oneshot(bare_request("GET", "/api/appointments/with_clients"))
            .await
            .unwrap();
        let listed = body_json(response).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["client_email"], "ada@x.com");
    }

    #[tokio::test]
    async fn with_new_client_duplicate_email_creates_nothing() {
        let (_dir, app) = test_app();

        seed_client(&app, "ada@x.com").await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/appointments/with_new_client",
                json!({"name": "Ada Again", "email": "ADA@x.com", "time": tomorrow()}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app
            .oneshot(bare_request("GET", "/api/appointments"))
            .await
            .unwrap();
        let listed = body_json(response).await;
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancel_twice_returns_bad_request() {
        let (_dir, app) = test_app();

        let client = seed_client(&app, "ada@x.com").await;
        let client_id = client["external_id"].as_str().unwrap();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/appointments",
                json!({"client_id": client_id, "time": tomorrow()}),
            ))
            .await
            .unwrap();
        let appointment = body_json(response).await;
        let appointment_id = appointment["external_id"].as_str().unwrap();

        let cancel_uri = format!("/api/appointments/{appointment_id}/cancel");

        let response = app
            .clone()
            .oneshot(bare_request("PUT", &cancel_uri))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "cancelled");

        let response = app.oneshot(bare_request("PUT", &cancel_uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("already been cancelled"));
    }

    #[tokio::test]
    async fn update_appointment_status() {
        let (_dir, app) = test_app();

        let client = seed_client(&app, "ada@x.com").await;
        let client_id = client["external_id"].as_str().unwrap();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/appointments",
                json!({"client_id": client_id, "time": tomorrow()}),
            ))
            .await
            .unwrap();
        let appointment = body_json(response).await;
        let appointment_id = appointment["external_id"].as_str().unwrap();

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/appointments/{appointment_id}"),
                json!({"status": "completed"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "completed");

        let response = app
            .oneshot(json_request(
                "PUT",
                &format!("/api/appointments/{appointment_id}"),
                json!({"status": "postponed"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_appointment_is_not_found() {
        let (_dir, app) = test_app();

        let response = app
            .oneshot(bare_request("DELETE", "/api/appointments/1700000000-12345"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
