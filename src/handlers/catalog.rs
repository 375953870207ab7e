use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::{check_auth, parse_body};
use crate::models::time::MINUTES_PER_DAY;
use crate::models::{
    Barber, Client, Location, NewBarber, NewClient, NewLocation, NewPlan, NewService, Plan,
    Service,
};
use crate::state::AppState;

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn require_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }
    Ok(name.to_string())
}

// ── Locations ──

pub async fn list_locations(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Location>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let db = state.conn()?;
    Ok(Json(queries::list_locations(&db)?))
}

pub async fn create_location(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<NewLocation>, JsonRejection>,
) -> Result<(StatusCode, Json<Location>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let body = parse_body(payload)?;

    let location = Location {
        id: new_id(),
        name: require_name(&body.name)?,
        address: body.address,
    };
    let db = state.conn()?;
    queries::insert_location(&db, &location)?;
    Ok((StatusCode::CREATED, Json(location)))
}

// ── Plans ──

pub async fn list_plans(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Plan>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let db = state.conn()?;
    Ok(Json(queries::list_plans(&db)?))
}

pub async fn create_plan(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<NewPlan>, JsonRejection>,
) -> Result<(StatusCode, Json<Plan>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let body = parse_body(payload)?;
    if body.price_cents < 0 {
        return Err(AppError::Validation("priceCents must not be negative".to_string()));
    }

    let plan = Plan {
        id: new_id(),
        name: require_name(&body.name)?,
        price_cents: body.price_cents,
        cuts_per_month: body.cuts_per_month,
    };
    let db = state.conn()?;
    queries::insert_plan(&db, &plan)?;
    Ok((StatusCode::CREATED, Json(plan)))
}

// ── Clients ──

pub async fn list_clients(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Client>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let db = state.conn()?;
    Ok(Json(queries::list_clients(&db)?))
}

pub async fn create_client(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<NewClient>, JsonRejection>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let body = parse_body(payload)?;

    let client = Client {
        id: new_id(),
        name: require_name(&body.name)?,
        phone: body.phone,
        plan_id: body.plan_id,
    };
    let db = state.conn()?;
    if let Some(plan_id) = &client.plan_id {
        if queries::get_plan(&db, plan_id)?.is_none() {
            return Err(AppError::NotFound(format!("plan {plan_id}")));
        }
    }
    queries::insert_client(&db, &client)?;
    Ok((StatusCode::CREATED, Json(client)))
}

// ── Barbers ──

pub async fn list_barbers(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Barber>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let db = state.conn()?;
    Ok(Json(queries::list_barbers(&db)?))
}

pub async fn create_barber(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<NewBarber>, JsonRejection>,
) -> Result<(StatusCode, Json<Barber>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let body = parse_body(payload)?;

    let barber = Barber {
        id: new_id(),
        name: require_name(&body.name)?,
        location_id: body.location_id,
        active: true,
    };
    let db = state.conn()?;
    if let Some(location_id) = &barber.location_id {
        if !queries::location_exists(&db, location_id)? {
            return Err(AppError::NotFound(format!("location {location_id}")));
        }
    }
    queries::insert_barber(&db, &barber)?;
    Ok((StatusCode::CREATED, Json(barber)))
}

// ── Services ──

pub async fn list_services(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Service>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let db = state.conn()?;
    Ok(Json(queries::list_services(&db)?))
}

pub async fn create_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<NewService>, JsonRejection>,
) -> Result<(StatusCode, Json<Service>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let body = parse_body(payload)?;
    if body.duration_minutes == 0 || body.duration_minutes > MINUTES_PER_DAY {
        return Err(AppError::Validation(format!(
            "durationMinutes must be between 1 and {MINUTES_PER_DAY}"
        )));
    }

    let service = Service {
        id: new_id(),
        name: require_name(&body.name)?,
        duration_minutes: body.duration_minutes,
        price_cents: body.price_cents,
        active: true,
    };
    let db = state.conn()?;
    queries::insert_service(&db, &service)?;
    Ok((StatusCode::CREATED, Json(service)))
}
