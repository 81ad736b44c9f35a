use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{Appointment, AppointmentStatus, EventKind, PaymentStatus};
use crate::services::booking::{self, Change, Mutation, Outcome};

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub amount: i64,
    #[serde(default)]
    pub method: Option<String>,
}

/// Adds `amount` to what has been paid. Returns true when this payment settled the total.
pub fn apply_payment(
    a: &mut Appointment,
    amount: i64,
    now: NaiveDateTime,
) -> Result<bool, AppError> {
    if amount <= 0 {
        return Err(AppError::validation("payment amount must be positive"));
    }
    if matches!(a.status, AppointmentStatus::Cancelled | AppointmentStatus::NoShow) {
        return Err(AppError::InvalidTransition {
            from: a.status,
            event: "take a payment for",
        });
    }
    let paid = a.paid_amount + amount;
    if paid > a.total_amount {
        return Err(AppError::validation(format!(
            "payment exceeds the remaining amount of {}",
            a.remaining_amount()
        )));
    }

    let was_paid = a.payment_status == PaymentStatus::Paid;
    a.paid_amount = paid;
    a.payment_status = PaymentStatus::for_amounts(paid, a.total_amount);
    a.updated_at = now;
    Ok(!was_paid && a.payment_status == PaymentStatus::Paid)
}

pub fn record_payment(
    conn: &mut Connection,
    m: &Mutation,
    req: &PaymentRequest,
) -> Result<Outcome, AppError> {
    booking::apply(conn, m, |_, _, a, now| {
        let settled = apply_payment(a, req.amount, now)?;
        tracing::info!(
            appointment_id = %a.id,
            amount = req.amount,
            method = req.method.as_deref().unwrap_or("unspecified"),
            paid = a.paid_amount,
            "payment recorded"
        );
        let events = if settled {
            vec![EventKind::PaymentCompleted]
        } else {
            vec![]
        };
        Ok(Change::new(vec![], events))
    })
}
