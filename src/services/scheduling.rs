use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};

use crate::config::BusinessHours;
use crate::db::queries;
use crate::errors::{AppError, SchedulingError};
use crate::models::time::format_minutes;
use crate::models::{
    Appointment, AppointmentPatch, AppointmentStatus, NewAppointment, PaymentStatus, Service,
    TimeInterval, TimeOfDay,
};

/// Policy and "now" for one validation run, passed in by the caller.
#[derive(Debug, Clone, Copy)]
pub struct SchedulingContext {
    pub hours: BusinessHours,
    pub now: NaiveDateTime,
}

/// First active appointment of `barber_id` whose interval overlaps `proposed`.
pub fn find_conflict<'a>(
    barber_id: &str,
    proposed: &TimeInterval,
    candidates: &'a [Appointment],
    exclude_id: Option<&str>,
) -> Option<&'a Appointment> {
    candidates.iter().find(|existing| {
        existing.barber_id == barber_id
            && existing.is_active()
            && exclude_id != Some(existing.id.as_str())
            && existing.interval().overlaps(proposed)
    })
}

pub fn has_conflict(
    barber_id: &str,
    proposed: &TimeInterval,
    candidates: &[Appointment],
    exclude_id: Option<&str>,
) -> bool {
    find_conflict(barber_id, proposed, candidates, exclude_id).is_some()
}

/// End of a `duration`-minute service starting at `start`, checked against opening hours.
pub fn end_time_for(
    hours: &BusinessHours,
    start: TimeOfDay,
    duration_minutes: u32,
) -> Result<TimeOfDay, SchedulingError> {
    if start < hours.open || start >= hours.close {
        return Err(SchedulingError::OutsideHours);
    }
    let too_late = || SchedulingError::TooLate {
        end: format_minutes(start.minutes().saturating_add(duration_minutes)),
    };
    match start.add_minutes(duration_minutes) {
        Some(end) if end < hours.close.minutes() => {
            TimeOfDay::from_minutes(end).ok_or_else(too_late)
        }
        _ => Err(too_late()),
    }
}

pub fn ensure_not_past(
    now: NaiveDateTime,
    date: NaiveDate,
    start: TimeOfDay,
) -> Result<(), SchedulingError> {
    if start.on(date) < now {
        return Err(SchedulingError::Past);
    }
    Ok(())
}

/// Fresh conflict check against stored data; run inside the write transaction.
pub fn ensure_slot_free(
    conn: &Connection,
    barber_id: &str,
    proposed: &TimeInterval,
    exclude_id: Option<&str>,
) -> Result<(), AppError> {
    let candidates = queries::active_appointments_for_barber(conn, barber_id, proposed.date)?;
    if let Some(existing) = find_conflict(barber_id, proposed, &candidates, exclude_id) {
        tracing::info!(
            barber_id,
            date = %proposed.date,
            start = %proposed.start,
            end = %proposed.end,
            conflicting_id = %existing.id,
            "rejected overlapping appointment"
        );
        return Err(SchedulingError::Conflict.into());
    }
    Ok(())
}

pub fn book_appointment(
    conn: &mut Connection,
    ctx: &SchedulingContext,
    req: NewAppointment,
) -> Result<Appointment, AppError> {
    require_id("clientId", &req.client_id)?;
    require_id("barberId", &req.barber_id)?;
    require_id("locationId", &req.location_id)?;
    require_id("serviceId", &req.service_id)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    ensure_references(&tx, &req.client_id, &req.barber_id, &req.location_id)?;
    let service = load_service(&tx, &req.service_id)?;

    let end = end_time_for(&ctx.hours, req.start_time, service.duration_minutes)?;
    if let Some(requested_end) = req.end_time {
        if requested_end != end {
            return Err(AppError::Validation(format!(
                "endTime {requested_end} does not match service duration ({} min from {})",
                service.duration_minutes, req.start_time
            )));
        }
    }
    ensure_not_past(ctx.now, req.appointment_date, req.start_time)?;

    let interval = TimeInterval::new(req.appointment_date, req.start_time, end);
    ensure_slot_free(&tx, &req.barber_id, &interval, None)?;

    let now = Utc::now().naive_utc();
    let appt = Appointment {
        id: uuid::Uuid::new_v4().to_string(),
        client_id: req.client_id,
        barber_id: req.barber_id,
        location_id: req.location_id,
        service_id: req.service_id,
        appointment_date: req.appointment_date,
        start_time: req.start_time,
        end_time: end,
        status: AppointmentStatus::Scheduled,
        payment_method: req.payment_method,
        payment_status: req.payment_status.unwrap_or(PaymentStatus::Pending),
        notes: req.notes,
        created_at: now,
        updated_at: now,
    };
    queries::insert_appointment(&tx, &appt)?;
    tx.commit()?;

    tracing::info!(
        appointment_id = %appt.id,
        barber_id = %appt.barber_id,
        date = %appt.appointment_date,
        start = %appt.start_time,
        "appointment booked"
    );
    Ok(appt)
}

/// Applies an edit. Interval rules are re-checked only when the slot itself
/// changes or a cancelled appointment comes back.
pub fn apply_update(
    conn: &mut Connection,
    ctx: &SchedulingContext,
    id: &str,
    patch: AppointmentPatch,
) -> Result<Appointment, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let current = queries::get_appointment(&tx, id)?
        .ok_or_else(|| AppError::NotFound(format!("appointment {id}")))?;
    let mut updated = current.clone();

    if let Some(client_id) = patch.client_id {
        updated.client_id = client_id;
    }
    if let Some(barber_id) = patch.barber_id {
        updated.barber_id = barber_id;
    }
    if let Some(location_id) = patch.location_id {
        updated.location_id = location_id;
    }
    if let Some(service_id) = patch.service_id {
        updated.service_id = service_id;
    }
    if let Some(date) = patch.appointment_date {
        updated.appointment_date = date;
    }
    if let Some(start) = patch.start_time {
        updated.start_time = start;
    }
    if let Some(status) = patch.status {
        updated.status = status;
    }
    if let Some(method) = patch.payment_method {
        updated.payment_method = Some(method);
    }
    if let Some(payment_status) = patch.payment_status {
        updated.payment_status = payment_status;
    }
    if let Some(notes) = patch.notes {
        updated.notes = Some(notes);
    }

    if updated.client_id != current.client_id
        || updated.barber_id != current.barber_id
        || updated.location_id != current.location_id
    {
        ensure_references(&tx, &updated.client_id, &updated.barber_id, &updated.location_id)?;
    }

    let slot_changed = updated.barber_id != current.barber_id
        || updated.appointment_date != current.appointment_date
        || updated.start_time != current.start_time
        || updated.service_id != current.service_id;
    let reactivated = !current.is_active() && updated.is_active();

    if slot_changed {
        let service = load_service(&tx, &updated.service_id)?;
        updated.end_time = end_time_for(&ctx.hours, updated.start_time, service.duration_minutes)?;
        if updated.is_active() {
            ensure_not_past(ctx.now, updated.appointment_date, updated.start_time)?;
        }
    }
    if updated.is_active() && (slot_changed || reactivated) {
        ensure_slot_free(&tx, &updated.barber_id, &updated.interval(), Some(&updated.id))?;
    }

    queries::update_appointment(&tx, &updated)?;
    tx.commit()?;

    tracing::info!(
        appointment_id = %updated.id,
        status = updated.status.as_str(),
        slot_changed,
        "appointment updated"
    );
    Ok(updated)
}

pub fn load_service(conn: &Connection, id: &str) -> Result<Service, AppError> {
    queries::get_service(conn, id)?.ok_or_else(|| AppError::NotFound(format!("service {id}")))
}

fn ensure_references(
    conn: &Connection,
    client_id: &str,
    barber_id: &str,
    location_id: &str,
) -> Result<(), AppError> {
    if queries::get_client(conn, client_id)?.is_none() {
        return Err(AppError::NotFound(format!("client {client_id}")));
    }
    if queries::get_barber(conn, barber_id)?.is_none() {
        return Err(AppError::NotFound(format!("barber {barber_id}")));
    }
    if !queries::location_exists(conn, location_id)? {
        return Err(AppError::NotFound(format!("location {location_id}")));
    }
    Ok(())
}

fn require_id(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}
