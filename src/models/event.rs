use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::AppointmentStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Created,
    VerificationRequested,
    Confirmed,
    Started,
    Completed,
    Cancelled,
    Rescheduled,
    NoShow,
    ReminderDue,
    PaymentCompleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Created => "created",
            EventKind::VerificationRequested => "verification_requested",
            EventKind::Confirmed => "confirmed",
            EventKind::Started => "started",
            EventKind::Completed => "completed",
            EventKind::Cancelled => "cancelled",
            EventKind::Rescheduled => "rescheduled",
            EventKind::NoShow => "no_show",
            EventKind::ReminderDue => "reminder_due",
            EventKind::PaymentCompleted => "payment_completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerContact {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

/// Emitted after a committed appointment change, for notification and loyalty collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentEvent {
    /// Outbox row id; zero until persisted.
    #[serde(default)]
    pub id: i64,
    pub kind: EventKind,
    pub appointment_id: String,
    pub booking_number: String,
    pub business_id: String,
    pub customer: Option<CustomerContact>,
    pub status: AppointmentStatus,
    pub total_amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_code: Option<String>,
    pub occurred_at: NaiveDateTime,
}
