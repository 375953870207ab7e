pub mod appointment;
pub mod barber;
pub mod client;
pub mod events;
pub mod location;
pub mod service;
pub mod time;

pub use appointment::{
    Appointment, AppointmentDetails, AppointmentPatch, AppointmentStatus, ClientWithPlan,
    NewAppointment, PaymentStatus,
};
pub use barber::{Barber, NewBarber};
pub use client::{Client, NewClient, NewPlan, Plan};
pub use events::{AppointmentEvent, AppointmentEventKind};
pub use location::{Location, NewLocation};
pub use service::{NewService, Service};
pub use time::{TimeInterval, TimeOfDay};
