pub mod calendar;
pub mod clock;
pub mod reschedule;
pub mod scheduling;
