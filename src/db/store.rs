use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{Connection, TransactionBehavior};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Appointment, TimeInterval};
use crate::services::reschedule::AppointmentStore;
use crate::services::scheduling;

/// SQLite-backed persistence for accepted moves. Re-checks the slot against
/// stored data in the same transaction as the write, and writes only the
/// new date and interval so edits made since the grid was loaded survive.
pub struct SqliteStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AppointmentStore for SqliteStore {
    async fn update_appointment(&self, appointment: &Appointment) -> Result<Appointment, AppError> {
        let mut conn = self
            .db
            .lock()
            .map_err(|_| AppError::Internal("database lock poisoned".to_string()))?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let not_found = || AppError::NotFound(format!("appointment {}", appointment.id));
        let current = queries::get_appointment(&tx, &appointment.id)?.ok_or_else(not_found)?;
        if !current.is_active() {
            return Err(AppError::Validation(
                "agendamentos cancelados não podem ser remarcados".to_string(),
            ));
        }

        // The stored barber wins over the snapshot's.
        let target = TimeInterval::new(
            appointment.appointment_date,
            appointment.start_time,
            appointment.end_time,
        );
        scheduling::ensure_slot_free(&tx, &current.barber_id, &target, Some(&current.id))?;

        if !queries::reschedule_appointment(&tx, &current.id, &target)? {
            return Err(not_found());
        }
        let stored = queries::get_appointment(&tx, &current.id)?.ok_or_else(not_found)?;
        tx.commit()?;
        Ok(stored)
    }
}
