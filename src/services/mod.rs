pub mod availability;
pub mod booking;
pub mod calendar;
pub mod catalog;
pub mod conflict;
pub mod events;
pub mod lifecycle;
pub mod payment;
pub mod pricing;
pub mod reschedule;
pub mod sweeper;
pub mod verification;

#[cfg(test)]
pub(crate) mod testing;
