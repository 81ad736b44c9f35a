//! Appointment state machine.
//!
//! Every status change goes through one of the functions here. Each checks the
//! transition table first and only then mutates, so a rejected event leaves the
//! appointment exactly as it was.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::errors::AppError;
use crate::models::{Actor, Appointment, AppointmentStatus, CancellationPolicy, PaymentStatus};
use crate::services::pricing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Confirm,
    Reschedule,
    Start,
    Complete,
    Cancel,
    NoShow,
    Review,
    AssignStaff,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::Confirm => "confirm",
            Event::Reschedule => "reschedule",
            Event::Start => "start",
            Event::Complete => "complete",
            Event::Cancel => "cancel",
            Event::NoShow => "mark no-show",
            Event::Review => "review",
            Event::AssignStaff => "reassign staff on",
        }
    }
}

/// Status an event leads to from `from`, or `None` when the table forbids it.
pub fn next_status(from: AppointmentStatus, event: Event) -> Option<AppointmentStatus> {
    use AppointmentStatus::*;
    match (from, event) {
        (Pending, Event::Confirm) => Some(Confirmed),
        (Pending | Confirmed, Event::Reschedule) => Some(Rescheduled),
        (Confirmed, Event::Start) => Some(InProgress),
        (InProgress, Event::Complete) => Some(Completed),
        (Pending | Confirmed | InProgress, Event::Cancel) => Some(Cancelled),
        (Pending | Confirmed, Event::NoShow) => Some(NoShow),
        (Completed, Event::Review) => Some(Completed),
        (Pending | Confirmed, Event::AssignStaff) => Some(from),
        _ => None,
    }
}

pub fn ensure_allowed(
    from: AppointmentStatus,
    event: Event,
) -> Result<AppointmentStatus, AppError> {
    next_status(from, event).ok_or(AppError::InvalidTransition {
        from,
        event: event.as_str(),
    })
}

/// One recorded hop through the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub from: Option<AppointmentStatus>,
    pub to: AppointmentStatus,
    pub note: Option<String>,
}

impl Step {
    fn new(from: AppointmentStatus, to: AppointmentStatus) -> Self {
        Self {
            from: Some(from),
            to,
            note: None,
        }
    }
}

/// Initial status: trusted staff booking a walk-in skip straight to `confirmed`.
pub fn initial_status(created_by: &Actor, walk_in: bool) -> AppointmentStatus {
    if walk_in && created_by.is_trusted() {
        AppointmentStatus::Confirmed
    } else {
        AppointmentStatus::Pending
    }
}

pub fn confirm(a: &mut Appointment, now: NaiveDateTime) -> Result<Step, AppError> {
    let from = a.status;
    let to = ensure_allowed(from, Event::Confirm)?;
    if a.hold_expired(now) {
        return Err(AppError::policy("verification window expired"));
    }
    a.status = to;
    a.confirmation_sent = true;
    a.confirmed_at = Some(now);
    a.updated_at = now;
    Ok(Step::new(from, to))
}

pub fn start(a: &mut Appointment, now: NaiveDateTime) -> Result<Step, AppError> {
    let from = a.status;
    let to = ensure_allowed(from, Event::Start)?;
    a.status = to;
    a.check_in_time = Some(now);
    a.updated_at = now;
    Ok(Step::new(from, to))
}

pub fn complete(a: &mut Appointment, now: NaiveDateTime) -> Result<Step, AppError> {
    let from = a.status;
    let to = ensure_allowed(from, Event::Complete)?;
    let check_in = a.check_in_time.unwrap_or(now);
    a.status = to;
    a.check_out_time = Some(now);
    a.completed_at = Some(now);
    a.actual_duration = Some((now - check_in).num_minutes().max(0) as i32);
    a.updated_at = now;
    Ok(Step::new(from, to))
}

pub fn cancel(
    a: &mut Appointment,
    actor: &Actor,
    reason: Option<String>,
    policy: &CancellationPolicy,
    now: NaiveDateTime,
) -> Result<Step, AppError> {
    let from = a.status;
    let to = ensure_allowed(from, Event::Cancel)?;

    let fee = pricing::cancellation_fee(policy, a.total_amount, a.starts_at(), now);
    let refund = pricing::refund_amount(a.paid_amount, fee);

    a.status = to;
    a.cancellation_fee = fee;
    a.refund_amount = refund;
    if refund > 0 {
        a.payment_status = PaymentStatus::Refunded;
    }
    a.cancelled_by = Some(actor.clone());
    a.cancelled_at = Some(now);
    a.cancellation_reason = reason;
    a.updated_at = now;
    Ok(Step {
        from: Some(from),
        to,
        note: a.cancellation_reason.clone(),
    })
}

pub const HOLD_EXPIRED_REASON: &str = "verification expired";
pub const TOO_MANY_ATTEMPTS_REASON: &str = "too many incorrect verification codes";

/// Gives back the slot of a public booking that was never verified. No fee applies.
pub fn release_hold(
    a: &mut Appointment,
    reason: &str,
    now: NaiveDateTime,
) -> Result<Step, AppError> {
    let from = a.status;
    let to = ensure_allowed(from, Event::Cancel)?;
    a.status = to;
    a.cancelled_by = Some(Actor::system());
    a.cancelled_at = Some(now);
    a.cancellation_reason = Some(reason.to_string());
    a.updated_at = now;
    Ok(Step {
        from: Some(from),
        to,
        note: a.cancellation_reason.clone(),
    })
}

pub fn mark_no_show(
    a: &mut Appointment,
    policy: &CancellationPolicy,
    now: NaiveDateTime,
) -> Result<Step, AppError> {
    let from = a.status;
    let to = ensure_allowed(from, Event::NoShow)?;
    if now < a.starts_at() {
        return Err(AppError::policy("appointment has not started yet"));
    }
    a.status = to;
    a.cancellation_fee = pricing::no_show_fee(policy, a.total_amount);
    a.updated_at = now;
    Ok(Step::new(from, to))
}

pub fn add_review(
    a: &mut Appointment,
    rating: u8,
    review: Option<String>,
    now: NaiveDateTime,
) -> Result<(), AppError> {
    ensure_allowed(a.status, Event::Review)?;
    if !(1..=5).contains(&rating) {
        return Err(AppError::validation("rating must be between 1 and 5"));
    }
    if a.rating.is_some() {
        return Err(AppError::validation("appointment has already been reviewed"));
    }
    a.rating = Some(rating);
    a.review = review;
    a.review_date = Some(now);
    a.updated_at = now;
    Ok(())
}

pub fn assign_staff(
    a: &mut Appointment,
    staff_id: Option<String>,
    now: NaiveDateTime,
) -> Result<(), AppError> {
    ensure_allowed(a.status, Event::AssignStaff)?;
    a.staff_id = staff_id;
    a.updated_at = now;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewSlot {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Moves the appointment to `slot`. Passes through `rescheduled` and lands back in
/// `confirmed` only when it was confirmed and a trusted actor moved it.
pub fn reschedule(
    a: &mut Appointment,
    slot: NewSlot,
    actor: &Actor,
    reason: Option<String>,
    now: NaiveDateTime,
) -> Result<Vec<Step>, AppError> {
    let from = a.status;
    let flagged = ensure_allowed(from, Event::Reschedule)?;
    let settled = if from == AppointmentStatus::Confirmed && actor.is_trusted() {
        AppointmentStatus::Confirmed
    } else {
        AppointmentStatus::Pending
    };

    let moved_from = format!(
        "moved from {} {}-{}",
        a.appointment_date.format("%Y-%m-%d"),
        a.start_time.format("%H:%M"),
        a.end_time.format("%H:%M"),
    );

    if a.original_appointment_date.is_none() {
        a.original_appointment_date = Some(a.appointment_date);
    }
    a.appointment_date = slot.date;
    a.start_time = slot.start;
    a.end_time = slot.end;
    a.reschedule_count += 1;
    a.rescheduled_by = Some(actor.clone());
    a.rescheduled_at = Some(now);
    a.reschedule_reason = reason;
    a.reminder_sent_at = None;
    if settled == AppointmentStatus::Pending {
        a.confirmation_sent = false;
        a.confirmed_at = None;
    }
    a.status = settled;
    a.updated_at = now;

    Ok(vec![
        Step {
            from: Some(from),
            to: flagged,
            note: Some(moved_from),
        },
        Step::new(flagged, settled),
    ])
}
