use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::AppointmentEvent;
use crate::services::clock::Clock;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub clock: Box<dyn Clock>,
    pub events_tx: broadcast::Sender<AppointmentEvent>,
}

impl AppState {
    pub fn conn(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Internal("database lock poisoned".to_string()))
    }

    pub fn notify(&self, event: AppointmentEvent) {
        // No subscribers is fine.
        let _ = self.events_tx.send(event);
    }
}
