use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
    Rescheduled,
}

impl AppointmentStatus {
    /// Statuses that hold a slot.
    pub const ACTIVE: [AppointmentStatus; 3] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::InProgress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::InProgress => "in_progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
            AppointmentStatus::Rescheduled => "rescheduled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AppointmentStatus::Pending),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "in_progress" => Some(AppointmentStatus::InProgress),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            "no_show" => Some(AppointmentStatus::NoShow),
            "rescheduled" => Some(AppointmentStatus::Rescheduled),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "partial" => PaymentStatus::Partial,
            "paid" => PaymentStatus::Paid,
            "refunded" => PaymentStatus::Refunded,
            _ => PaymentStatus::Pending,
        }
    }

    /// Status implied by the amounts alone.
    pub fn for_amounts(paid: i64, total: i64) -> Self {
        if paid <= 0 {
            PaymentStatus::Pending
        } else if paid >= total {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Partial
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingSource {
    Online,
    Staff,
    WalkIn,
}

impl BookingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingSource::Online => "online",
            BookingSource::Staff => "staff",
            BookingSource::WalkIn => "walk_in",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "online" => BookingSource::Online,
            "walk_in" => BookingSource::WalkIn,
            _ => BookingSource::Staff,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActorKind {
    Customer,
    Staff,
    Manager,
    Business,
    Admin,
    System,
}

impl ActorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorKind::Customer => "customer",
            ActorKind::Staff => "staff",
            ActorKind::Manager => "manager",
            ActorKind::Business => "business",
            ActorKind::Admin => "admin",
            ActorKind::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(ActorKind::Customer),
            "staff" => Some(ActorKind::Staff),
            "manager" => Some(ActorKind::Manager),
            "business" => Some(ActorKind::Business),
            "admin" => Some(ActorKind::Admin),
            "system" => Some(ActorKind::System),
            _ => None,
        }
    }
}

/// Who performed an action on an appointment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub kind: ActorKind,
    pub id: String,
}

impl Actor {
    pub fn new(kind: ActorKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn system() -> Self {
        Self::new(ActorKind::System, "system")
    }

    /// Staff-side actors may create bookings directly in `confirmed`.
    pub fn is_trusted(&self) -> bool {
        matches!(
            self.kind,
            ActorKind::Staff | ActorKind::Manager | ActorKind::Business | ActorKind::Admin
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub booking_number: String,
    pub business_id: String,
    pub customer_id: String,
    pub service_id: String,
    pub staff_id: Option<String>,

    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub source: BookingSource,
    pub notes: Option<String>,

    pub service_price: i64,
    pub additional_charges: i64,
    pub discount: i64,
    pub tax: i64,
    pub total_amount: i64,
    pub payment_status: PaymentStatus,
    pub paid_amount: i64,
    pub advance_amount: i64,
    pub cancellation_fee: i64,
    pub refund_amount: i64,

    pub created_by: Actor,
    pub confirmation_sent: bool,
    pub confirmed_at: Option<NaiveDateTime>,
    pub verification_expires_at: Option<NaiveDateTime>,
    pub verified_at: Option<NaiveDateTime>,
    /// Wrong codes entered so far.
    #[serde(default)]
    pub verification_attempts: i32,

    pub original_appointment_date: Option<NaiveDate>,
    pub reschedule_count: i32,
    pub rescheduled_by: Option<Actor>,
    pub rescheduled_at: Option<NaiveDateTime>,
    pub reschedule_reason: Option<String>,

    pub cancelled_by: Option<Actor>,
    pub cancelled_at: Option<NaiveDateTime>,
    pub cancellation_reason: Option<String>,

    pub check_in_time: Option<NaiveDateTime>,
    pub check_out_time: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub actual_duration: Option<i32>,

    pub rating: Option<u8>,
    pub review: Option<String>,
    pub review_date: Option<NaiveDateTime>,

    pub reminder_sent_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Appointment {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.appointment_date.and_time(self.start_time)
    }

    pub fn ends_at(&self) -> NaiveDateTime {
        self.appointment_date.and_time(self.end_time)
    }

    pub fn remaining_amount(&self) -> i64 {
        self.total_amount - self.paid_amount
    }

    /// A public booking still waiting for its one-time code.
    pub fn awaiting_verification(&self) -> bool {
        self.verified_at.is_none() && self.verification_expires_at.is_some()
    }

    pub fn hold_expired(&self, now: NaiveDateTime) -> bool {
        self.status == AppointmentStatus::Pending
            && self.awaiting_verification()
            && self.verification_expires_at.is_some_and(|exp| exp <= now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub appointment_id: String,
    pub from_status: Option<AppointmentStatus>,
    pub to_status: AppointmentStatus,
    pub actor: Actor,
    pub note: Option<String>,
    pub created_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            AppointmentStatus::InProgress,
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::NoShow,
            AppointmentStatus::Rescheduled,
        ] {
            assert_eq!(AppointmentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AppointmentStatus::parse("bogus"), None);
    }

    #[test]
    fn test_terminal_and_active_are_disjoint() {
        assert!(AppointmentStatus::Pending.is_active());
        assert!(AppointmentStatus::InProgress.is_active());
        assert!(!AppointmentStatus::Rescheduled.is_active());
        assert!(!AppointmentStatus::Rescheduled.is_terminal());
        assert!(AppointmentStatus::NoShow.is_terminal());
        assert!(!AppointmentStatus::NoShow.is_active());
    }

    #[test]
    fn test_payment_status_for_amounts() {
        assert_eq!(PaymentStatus::for_amounts(0, 1000), PaymentStatus::Pending);
        assert_eq!(PaymentStatus::for_amounts(400, 1000), PaymentStatus::Partial);
        assert_eq!(PaymentStatus::for_amounts(1000, 1000), PaymentStatus::Paid);
    }

    #[test]
    fn test_trusted_actors() {
        assert!(Actor::new(ActorKind::Manager, "m1").is_trusted());
        assert!(!Actor::new(ActorKind::Customer, "c1").is_trusted());
        assert!(!Actor::system().is_trusted());
    }
}
