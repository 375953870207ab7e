use chrono::NaiveDate;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentEventKind {
    Created,
    Updated,
    Moved,
    Cancelled,
    Completed,
    Deleted,
}

/// Change notification pushed to calendar subscribers so they refetch.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentEvent {
    pub kind: AppointmentEventKind,
    pub appointment_id: String,
    pub barber_id: String,
    pub appointment_date: NaiveDate,
}
