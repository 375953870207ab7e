pub mod appointments;
pub mod calendar;
pub mod catalog;
pub mod events;
pub mod health;

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::services::scheduling::SchedulingContext;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/api/appointments",
            get(appointments::list_appointments).post(appointments::create_appointment),
        )
        .route(
            "/api/appointments/:id",
            get(appointments::get_appointment)
                .patch(appointments::update_appointment)
                .delete(appointments::delete_appointment),
        )
        .route("/api/appointments/:id/move", post(appointments::move_appointment))
        .route("/api/appointments/:id/cancel", post(appointments::cancel_appointment))
        .route("/api/appointments/:id/complete", post(appointments::complete_appointment))
        .route("/api/calendar/week", get(calendar::week))
        .route("/api/calendar/slots", get(calendar::slots))
        .route("/api/barbers", get(catalog::list_barbers).post(catalog::create_barber))
        .route("/api/services", get(catalog::list_services).post(catalog::create_service))
        .route("/api/clients", get(catalog::list_clients).post(catalog::create_client))
        .route("/api/plans", get(catalog::list_plans).post(catalog::create_plan))
        .route("/api/locations", get(catalog::list_locations).post(catalog::create_location))
        .route("/api/events", get(events::events_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub(crate) fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

/// Malformed or incomplete JSON bodies become field-level validation errors.
pub(crate) fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

pub(crate) fn scheduling_context(state: &AppState) -> SchedulingContext {
    SchedulingContext {
        hours: state.config.hours,
        now: state.clock.now(),
    }
}
