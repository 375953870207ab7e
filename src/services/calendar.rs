use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::config::BusinessHours;
use crate::models::{Appointment, TimeInterval, TimeOfDay};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekGrid {
    pub week_start: NaiveDate,
    pub slot_minutes: u32,
    pub days: Vec<DayColumn>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayColumn {
    pub date: NaiveDate,
    pub slots: Vec<SlotCell>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotCell {
    pub start: TimeOfDay,
    /// Slot start is before now; the grid does not accept drops here.
    pub past: bool,
    pub appointment_ids: Vec<String>,
}

/// Monday of the week containing `date`.
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Seven day columns of grid slots, each listing the active appointments
/// whose interval covers part of the slot.
pub fn week_grid(
    hours: &BusinessHours,
    week_start: NaiveDate,
    now: NaiveDateTime,
    appointments: &[Appointment],
) -> WeekGrid {
    let slots = hours.slots();
    let days = (0..7)
        .map(|offset| {
            let date = week_start + Duration::days(offset);
            let cells = slots
                .iter()
                .map(|&start| {
                    let end = start
                        .add_minutes(hours.slot_minutes)
                        .and_then(TimeOfDay::from_minutes)
                        .unwrap_or(hours.close);
                    let cell = TimeInterval::new(date, start, end);
                    SlotCell {
                        start,
                        past: start.on(date) < now,
                        appointment_ids: appointments
                            .iter()
                            .filter(|a| a.is_active() && a.interval().overlaps(&cell))
                            .map(|a| a.id.clone())
                            .collect(),
                    }
                })
                .collect();
            DayColumn { date, slots: cells }
        })
        .collect();

    WeekGrid {
        week_start,
        slot_minutes: hours.slot_minutes,
        days,
    }
}
