pub mod appointment;
pub mod business;
pub mod customer;
pub mod event;
pub mod schedule;
pub mod service;
pub mod slot;
pub mod staff;

pub use appointment::{
    Actor, ActorKind, Appointment, AppointmentStatus, BookingSource, PaymentStatus, StatusChange,
};
pub use business::{Business, Clock};
pub use customer::Customer;
pub use event::{AppointmentEvent, CustomerContact, EventKind};
pub use schedule::{CancellationPolicy, ScheduleConfig, TimeWindow, WorkingHours};
pub use service::Service;
pub use slot::Slot;
pub use staff::Staff;
