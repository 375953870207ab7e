use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::db::queries::{self, AppointmentFilter};
use crate::db::SqliteStore;
use crate::errors::AppError;
use crate::handlers::{check_auth, parse_body, scheduling_context};
use crate::models::{
    Appointment, AppointmentDetails, AppointmentEvent, AppointmentEventKind, AppointmentPatch,
    AppointmentStatus, NewAppointment, PaymentStatus, TimeOfDay,
};
use crate::services::reschedule::{DragSession, DropOutcome};
use crate::services::scheduling;
use crate::state::AppState;

fn event(kind: AppointmentEventKind, appt: &Appointment) -> AppointmentEvent {
    AppointmentEvent {
        kind,
        appointment_id: appt.id.clone(),
        barber_id: appt.barber_id.clone(),
        appointment_date: appt.appointment_date,
    }
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("appointment {id}"))
}

// GET /api/appointments
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentsQuery {
    pub date: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub barber_id: Option<String>,
    pub status: Option<String>,
}

pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AppointmentsQuery>,
) -> Result<Json<Vec<AppointmentDetails>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let status = match query.status.as_deref() {
        Some(s) => Some(
            AppointmentStatus::parse(s)
                .ok_or_else(|| AppError::Validation(format!("unknown status: {s}")))?,
        ),
        None => None,
    };
    let filter = AppointmentFilter {
        date: query.date,
        from: query.from,
        to: query.to,
        barber_id: query.barber_id,
        status,
    };

    let appointments = {
        let db = state.conn()?;
        queries::list_appointments(&db, &filter)?
    };
    Ok(Json(appointments))
}

// GET /api/appointments/:id
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<AppointmentDetails>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.conn()?;
    queries::get_appointment_details(&db, &id)?
        .map(Json)
        .ok_or_else(|| not_found(&id))
}

// POST /api/appointments
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<NewAppointment>, JsonRejection>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let req = parse_body(payload)?;
    let ctx = scheduling_context(&state);

    let appt = {
        let mut db = state.conn()?;
        scheduling::book_appointment(&mut db, &ctx, req)?
    };

    state.notify(event(AppointmentEventKind::Created, &appt));
    Ok((StatusCode::CREATED, Json(appt)))
}

// PATCH /api/appointments/:id
pub async fn update_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<AppointmentPatch>, JsonRejection>,
) -> Result<Json<Appointment>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let patch = parse_body(payload)?;
    let ctx = scheduling_context(&state);

    let appt = {
        let mut db = state.conn()?;
        scheduling::apply_update(&mut db, &ctx, &id, patch)?
    };

    state.notify(event(AppointmentEventKind::Updated, &appt));
    Ok(Json(appt))
}

// POST /api/appointments/:id/move
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub appointment_date: NaiveDate,
    pub start_time: TimeOfDay,
}

pub async fn move_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<MoveRequest>, JsonRejection>,
) -> Result<Json<Appointment>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let req = parse_body(payload)?;
    let ctx = scheduling_context(&state);

    let (current, duration, snapshot) = {
        let db = state.conn()?;
        let current = queries::get_appointment(&db, &id)?.ok_or_else(|| not_found(&id))?;
        let service = scheduling::load_service(&db, &current.service_id)?;
        let snapshot =
            queries::active_appointments_for_barber(&db, &current.barber_id, req.appointment_date)?;
        (current, service.duration_minutes, snapshot)
    };

    let mut session = DragSession::new(snapshot);
    session.begin(current, duration);
    session.hover(req.appointment_date, req.start_time);

    let store = SqliteStore::new(Arc::clone(&state.db));
    match session.drop(&ctx, &store).await {
        DropOutcome::Accepted(moved) => {
            state.notify(event(AppointmentEventKind::Moved, &moved));
            Ok(Json(moved))
        }
        DropOutcome::Rejected(reason) => Err(reason),
    }
}

// POST /api/appointments/:id/cancel
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let appt = {
        let db = state.conn()?;
        let updated = queries::update_appointment_status(
            &db,
            &id,
            AppointmentStatus::Cancelled,
            Some(PaymentStatus::Cancelled),
        )?;
        if !updated {
            return Err(not_found(&id));
        }
        queries::get_appointment(&db, &id)?.ok_or_else(|| not_found(&id))?
    };

    tracing::info!(appointment_id = %id, "appointment cancelled");
    state.notify(event(AppointmentEventKind::Cancelled, &appt));
    Ok(Json(appt))
}

// POST /api/appointments/:id/complete
pub async fn complete_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let appt = {
        let db = state.conn()?;
        let current = queries::get_appointment(&db, &id)?.ok_or_else(|| not_found(&id))?;
        if !current.is_active() {
            return Err(AppError::Validation(
                "agendamentos cancelados não podem ser concluídos".to_string(),
            ));
        }
        if !queries::update_appointment_status(&db, &id, AppointmentStatus::Completed, None)? {
            return Err(not_found(&id));
        }
        queries::get_appointment(&db, &id)?.ok_or_else(|| not_found(&id))?
    };

    tracing::info!(appointment_id = %id, "appointment completed");
    state.notify(event(AppointmentEventKind::Completed, &appt));
    Ok(Json(appt))
}

// DELETE /api/appointments/:id?confirm=true
#[derive(Deserialize)]
pub struct DeleteQuery {
    pub confirm: Option<bool>,
}

pub async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    if query.confirm != Some(true) {
        return Err(AppError::Validation(
            "permanent delete requires confirm=true".to_string(),
        ));
    }

    let appt = {
        let db = state.conn()?;
        let current = queries::get_appointment(&db, &id)?.ok_or_else(|| not_found(&id))?;
        if !queries::delete_appointment(&db, &id)? {
            return Err(not_found(&id));
        }
        current
    };

    tracing::warn!(appointment_id = %id, "appointment permanently deleted");
    state.notify(event(AppointmentEventKind::Deleted, &appt));
    Ok(Json(serde_json::json!({"ok": true})))
}
