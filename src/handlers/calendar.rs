use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::BusinessHours;
use crate::db::queries::{self, AppointmentFilter};
use crate::errors::AppError;
use crate::handlers::check_auth;
use crate::models::TimeOfDay;
use crate::services::calendar::{week_grid, week_start_of, WeekGrid};
use crate::state::AppState;

// GET /api/calendar/week
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekQuery {
    pub start: Option<NaiveDate>,
    pub barber_id: Option<String>,
}

pub async fn week(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<WeekQuery>,
) -> Result<Json<WeekGrid>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let now = state.clock.now();
    let week_start = week_start_of(query.start.unwrap_or(now.date()));
    let filter = AppointmentFilter {
        from: Some(week_start),
        to: Some(week_start + Duration::days(6)),
        barber_id: query.barber_id,
        ..Default::default()
    };

    let appointments: Vec<_> = {
        let db = state.conn()?;
        queries::list_appointments(&db, &filter)?
    }
    .into_iter()
    .map(|details| details.appointment)
    .collect();

    Ok(Json(week_grid(&state.config.hours, week_start, now, &appointments)))
}

// GET /api/calendar/slots
#[derive(Serialize)]
pub struct SlotsResponse {
    hours: BusinessHours,
    slots: Vec<TimeOfDay>,
}

pub async fn slots(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SlotsResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    Ok(Json(SlotsResponse {
        hours: state.config.hours,
        slots: state.config.hours.slots(),
    }))
}
