//! Drag-and-drop rescheduling on the weekly grid.
//!
//! A [`DragSession`] tracks one gesture at a time. Dropping runs the move
//! through [`plan_move`] against the session's snapshot of appointments and,
//! only when every rule passes, hands the updated appointment to an
//! [`AppointmentStore`]. The snapshot itself is never modified; callers
//! refetch after an accepted drop.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::{AppError, SchedulingError};
use crate::models::{Appointment, TimeInterval, TimeOfDay};
use crate::services::scheduling::{self, SchedulingContext};

/// Persistence collaborator for accepted moves (update by id).
///
/// Only the date and interval of `appointment` are applied; the stored row
/// as it stands after the write is returned.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn update_appointment(&self, appointment: &Appointment) -> Result<Appointment, AppError>;
}

/// Validates moving `appointment` to `target_start` on `target_date`.
///
/// Checks run in order: opening hours and the closing boundary on the
/// computed end, grid alignment, past moment, then overlap with `candidates` excluding the
/// appointment itself. On success the returned copy differs from the
/// original only in date, start and end.
pub fn plan_move(
    ctx: &SchedulingContext,
    appointment: &Appointment,
    duration_minutes: u32,
    target_date: NaiveDate,
    target_start: TimeOfDay,
    candidates: &[Appointment],
) -> Result<Appointment, SchedulingError> {
    let target_end = scheduling::end_time_for(&ctx.hours, target_start, duration_minutes)?;
    if !ctx.hours.is_aligned(target_start) {
        return Err(SchedulingError::Misaligned {
            start: target_start.to_string(),
        });
    }
    scheduling::ensure_not_past(ctx.now, target_date, target_start)?;

    let proposed = TimeInterval::new(target_date, target_start, target_end);
    if let Some(existing) = scheduling::find_conflict(
        &appointment.barber_id,
        &proposed,
        candidates,
        Some(&appointment.id),
    ) {
        tracing::debug!(
            appointment_id = %appointment.id,
            conflicting_id = %existing.id,
            "move overlaps existing appointment"
        );
        return Err(SchedulingError::Conflict);
    }

    Ok(Appointment {
        appointment_date: target_date,
        start_time: target_start,
        end_time: target_end,
        ..appointment.clone()
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct DraggedAppointment {
    pub appointment: Appointment,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragState {
    Idle,
    Dragging(DraggedAppointment),
    Hovering {
        dragged: DraggedAppointment,
        date: NaiveDate,
        start: TimeOfDay,
    },
}

#[derive(Debug)]
pub enum DropOutcome {
    Accepted(Appointment),
    Rejected(AppError),
}

impl DropOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, DropOutcome::Accepted(_))
    }
}

pub struct DragSession {
    state: DragState,
    snapshot: Vec<Appointment>,
}

impl DragSession {
    /// `snapshot` is the set of appointments currently loaded in the grid.
    pub fn new(snapshot: Vec<Appointment>) -> Self {
        Self {
            state: DragState::Idle,
            snapshot,
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn snapshot(&self) -> &[Appointment] {
        &self.snapshot
    }

    /// Captures an appointment. Starting a new drag replaces any previous one.
    pub fn begin(&mut self, appointment: Appointment, duration_minutes: u32) {
        tracing::debug!(appointment_id = %appointment.id, "drag started");
        self.state = DragState::Dragging(DraggedAppointment {
            appointment,
            duration_minutes,
        });
    }

    /// Tracks the slot under the pointer. Ignored when nothing is dragged.
    pub fn hover(&mut self, date: NaiveDate, start: TimeOfDay) -> bool {
        let dragged = match std::mem::replace(&mut self.state, DragState::Idle) {
            DragState::Idle => return false,
            DragState::Dragging(dragged) => dragged,
            DragState::Hovering { dragged, .. } => dragged,
        };
        self.state = DragState::Hovering {
            dragged,
            date,
            start,
        };
        true
    }

    pub fn abandon(&mut self) {
        self.state = DragState::Idle;
    }

    /// Validates and persists the hovered move. The session is idle afterwards
    /// whatever the outcome.
    pub async fn drop<S: AppointmentStore + ?Sized>(
        &mut self,
        ctx: &SchedulingContext,
        store: &S,
    ) -> DropOutcome {
        let (dragged, date, start) = match std::mem::replace(&mut self.state, DragState::Idle) {
            DragState::Hovering {
                dragged,
                date,
                start,
            } => (dragged, date, start),
            DragState::Dragging(dragged) => {
                tracing::debug!(appointment_id = %dragged.appointment.id, "dropped outside the grid");
                return DropOutcome::Rejected(AppError::Validation(
                    "nenhum horário selecionado".to_string(),
                ));
            }
            DragState::Idle => {
                return DropOutcome::Rejected(AppError::Validation(
                    "nenhum agendamento sendo arrastado".to_string(),
                ));
            }
        };

        if !dragged.appointment.is_active() {
            return DropOutcome::Rejected(AppError::Validation(
                "agendamentos cancelados não podem ser remarcados".to_string(),
            ));
        }

        let moved = match plan_move(
            ctx,
            &dragged.appointment,
            dragged.duration_minutes,
            date,
            start,
            &self.snapshot,
        ) {
            Ok(moved) => moved,
            Err(reason) => {
                tracing::info!(
                    appointment_id = %dragged.appointment.id,
                    reason = reason.kind(),
                    "move rejected"
                );
                return DropOutcome::Rejected(reason.into());
            }
        };

        match store.update_appointment(&moved).await {
            Ok(stored) => {
                tracing::info!(
                    appointment_id = %stored.id,
                    date = %stored.appointment_date,
                    start = %stored.start_time,
                    end = %stored.end_time,
                    "appointment moved"
                );
                DropOutcome::Accepted(stored)
            }
            Err(e) => {
                tracing::warn!(appointment_id = %moved.id, error = %e, "failed to persist move");
                DropOutcome::Rejected(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::NaiveDateTime;

    use super::*;
    use crate::config::BusinessHours;
    use crate::db::queries::fixtures::appointment;
    use crate::models::AppointmentStatus;

    #[derive(Default)]
    struct RecordingStore {
        updates: Mutex<Vec<Appointment>>,
        fail: bool,
    }

    #[async_trait]
    impl AppointmentStore for RecordingStore {
        async fn update_appointment(&self, appointment: &Appointment) -> Result<Appointment, AppError> {
            if self.fail {
                return Err(AppError::Internal("connection reset".to_string()));
            }
            self.updates.lock().unwrap().push(appointment.clone());
            Ok(appointment.clone())
        }
    }

    impl RecordingStore {
        fn calls(&self) -> usize {
            self.updates.lock().unwrap().len()
        }
    }

    fn t(s: &str) -> TimeOfDay {
        TimeOfDay::parse(s).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn ctx_at(now: &str) -> SchedulingContext {
        SchedulingContext {
            hours: BusinessHours::default(),
            now: NaiveDateTime::parse_from_str(now, "%Y-%m-%d %H:%M").unwrap(),
        }
    }

    fn ctx() -> SchedulingContext {
        ctx_at("2024-06-01 08:00")
    }

    #[test]
    fn test_plan_move_shifts_interval() {
        let x = appointment("x", "barber-1", "2024-06-10", "09:00", "09:30");
        let moved = plan_move(&ctx(), &x, 30, date("2024-06-10"), t("09:30"), &[x.clone()]).unwrap();
        assert_eq!(moved.start_time, t("09:30"));
        assert_eq!(moved.end_time, t("10:00"));
        assert_eq!(moved.appointment_date, date("2024-06-10"));
        assert_eq!(moved.client_id, x.client_id);
        assert_eq!(moved.service_id, x.service_id);
        assert_eq!(moved.payment_status, x.payment_status);
    }

    #[test]
    fn test_plan_move_same_slot_is_not_self_conflict() {
        let x = appointment("x", "barber-1", "2024-06-10", "10:00", "10:30");
        let moved = plan_move(&ctx(), &x, 30, x.appointment_date, x.start_time, &[x.clone()]).unwrap();
        assert_eq!(moved.interval(), x.interval());
    }

    #[test]
    fn test_plan_move_rejects_too_late() {
        let x = appointment("x", "barber-1", "2024-06-10", "09:00", "09:30");
        let result = plan_move(&ctx(), &x, 30, date("2024-06-10"), t("19:45"), &[]);
        assert_eq!(result, Err(SchedulingError::TooLate { end: "20:15".to_string() }));
    }

    #[test]
    fn test_plan_move_rejects_past() {
        let x = appointment("x", "barber-1", "2024-06-10", "15:00", "15:30");
        let ctx = ctx_at("2024-06-10 12:00");
        let result = plan_move(&ctx, &x, 30, date("2024-06-10"), t("11:00"), &[]);
        assert_eq!(result, Err(SchedulingError::Past));
    }

    #[test]
    fn test_plan_move_too_late_wins_over_past() {
        let x = appointment("x", "barber-1", "2024-06-10", "09:00", "09:30");
        let ctx = ctx_at("2024-06-11 08:00");
        let result = plan_move(&ctx, &x, 30, date("2024-06-10"), t("19:45"), &[]);
        assert!(matches!(result, Err(SchedulingError::TooLate { .. })));
    }

    #[test]
    fn test_plan_move_rejects_conflict() {
        let x = appointment("x", "barber-1", "2024-06-10", "09:00", "09:30");
        let y = appointment("y", "barber-1", "2024-06-10", "10:00", "10:30");
        let result = plan_move(&ctx(), &x, 30, date("2024-06-10"), t("09:45"), &[x.clone(), y]);
        assert_eq!(result, Err(SchedulingError::Conflict));
    }

    #[test]
    fn test_plan_move_ignores_cancelled_and_other_barbers() {
        let x = appointment("x", "barber-1", "2024-06-10", "09:00", "09:30");
        let mut cancelled = appointment("y", "barber-1", "2024-06-10", "10:00", "10:30");
        cancelled.status = AppointmentStatus::Cancelled;
        let other = appointment("z", "barber-2", "2024-06-10", "10:00", "10:30");
        let result = plan_move(&ctx(), &x, 30, date("2024-06-10"), t("10:00"), &[cancelled, other]);
        assert!(result.is_ok());
    }

    #[test]
    fn test_plan_move_rejects_off_grid() {
        let x = appointment("x", "barber-1", "2024-06-10", "09:00", "09:30");
        assert!(matches!(
            plan_move(&ctx(), &x, 30, date("2024-06-10"), t("09:10"), &[]),
            Err(SchedulingError::Misaligned { .. })
        ));
        assert_eq!(
            plan_move(&ctx(), &x, 30, date("2024-06-10"), t("08:30"), &[]),
            Err(SchedulingError::OutsideHours)
        );
    }

    #[test]
    fn test_plan_move_hours_checked_before_alignment() {
        let x = appointment("x", "barber-1", "2024-06-10", "09:00", "09:30");
        assert_eq!(
            plan_move(&ctx(), &x, 30, date("2024-06-10"), t("20:05"), &[]),
            Err(SchedulingError::OutsideHours)
        );
        assert_eq!(
            plan_move(&ctx(), &x, 30, date("2024-06-10"), t("19:50"), &[]),
            Err(SchedulingError::TooLate { end: "20:20".to_string() })
        );
    }

    #[tokio::test]
    async fn test_drag_drop_accepted() {
        let x = appointment("x", "barber-1", "2024-06-10", "09:00", "09:30");
        let store = RecordingStore::default();
        let mut session = DragSession::new(vec![x.clone()]);

        session.begin(x.clone(), 30);
        assert!(session.hover(date("2024-06-11"), t("09:15")));
        assert!(session.hover(date("2024-06-10"), t("09:30")));

        let outcome = session.drop(&ctx(), &store).await;
        match outcome {
            DropOutcome::Accepted(moved) => {
                assert_eq!(moved.start_time, t("09:30"));
                assert_eq!(moved.end_time, t("10:00"));
            }
            DropOutcome::Rejected(e) => panic!("expected accepted drop, got {e}"),
        }
        assert_eq!(store.calls(), 1);
        assert_eq!(session.state(), &DragState::Idle);
        // No optimistic change to the loaded snapshot.
        assert_eq!(session.snapshot()[0].start_time, t("09:00"));
    }

    #[tokio::test]
    async fn test_drag_rejections_never_persist() {
        let x = appointment("x", "barber-1", "2024-06-10", "09:00", "09:30");
        let y = appointment("y", "barber-1", "2024-06-10", "11:00", "11:30");
        let store = RecordingStore::default();
        let mut session = DragSession::new(vec![x.clone(), y]);
        let ctx = ctx_at("2024-06-10 10:00");

        for (day, start) in [
            ("2024-06-10", "19:45"), // too late
            ("2024-06-10", "09:30"), // past
            ("2024-06-10", "11:15"), // conflict
        ] {
            session.begin(x.clone(), 30);
            session.hover(date(day), t(start));
            let outcome = session.drop(&ctx, &store).await;
            assert!(!outcome.is_accepted(), "drop at {start} should be rejected");
            assert_eq!(session.state(), &DragState::Idle);
        }
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_drag_rejection_reasons() {
        let x = appointment("x", "barber-1", "2024-06-10", "09:00", "09:30");
        let store = RecordingStore::default();
        let mut session = DragSession::new(vec![x.clone()]);

        session.begin(x.clone(), 30);
        session.hover(date("2024-06-12"), t("19:45"));
        match session.drop(&ctx(), &store).await {
            DropOutcome::Rejected(AppError::Scheduling(SchedulingError::TooLate { end })) => {
                assert_eq!(end, "20:15")
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_drop_without_target_is_rejected() {
        let x = appointment("x", "barber-1", "2024-06-10", "09:00", "09:30");
        let store = RecordingStore::default();
        let mut session = DragSession::new(vec![]);

        assert!(!session.drop(&ctx(), &store).await.is_accepted());

        session.begin(x, 30);
        assert!(!session.drop(&ctx(), &store).await.is_accepted());
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_abandon_resets_without_side_effects() {
        let x = appointment("x", "barber-1", "2024-06-10", "09:00", "09:30");
        let store = RecordingStore::default();
        let mut session = DragSession::new(vec![x.clone()]);

        session.begin(x, 30);
        session.hover(date("2024-06-10"), t("10:00"));
        session.abandon();
        assert_eq!(session.state(), &DragState::Idle);
        assert!(!session.hover(date("2024-06-10"), t("10:00")));
        assert!(!session.drop(&ctx(), &store).await.is_accepted());
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_persistence_failure_is_rejection() {
        let x = appointment("x", "barber-1", "2024-06-10", "09:00", "09:30");
        let store = RecordingStore {
            fail: true,
            ..Default::default()
        };
        let mut session = DragSession::new(vec![x.clone()]);

        session.begin(x, 30);
        session.hover(date("2024-06-10"), t("10:00"));
        let outcome = session.drop(&ctx(), &store).await;
        assert!(matches!(outcome, DropOutcome::Rejected(AppError::Internal(_))));
        assert_eq!(session.state(), &DragState::Idle);
    }

    #[tokio::test]
    async fn test_cancelled_appointment_cannot_be_dragged() {
        let mut x = appointment("x", "barber-1", "2024-06-10", "09:00", "09:30");
        x.status = AppointmentStatus::Cancelled;
        let store = RecordingStore::default();
        let mut session = DragSession::new(vec![]);

        session.begin(x, 30);
        session.hover(date("2024-06-10"), t("10:00"));
        assert!(matches!(
            session.drop(&ctx(), &store).await,
            DropOutcome::Rejected(AppError::Validation(_))
        ));
        assert_eq!(store.calls(), 0);
    }
}
