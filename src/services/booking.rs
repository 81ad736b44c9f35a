//! Reservation and every other write to an appointment.
//!
//! Each operation runs as one immediate SQLite transaction: the availability check,
//! the write, the history rows and the outbox events commit together or not at all.
//! Events are returned to the caller for publishing once the transaction is committed.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{self, queries};
use crate::errors::AppError;
use crate::models::slot::{hhmm, hhmm_opt};
use crate::models::{
    Actor, ActorKind, Appointment, AppointmentEvent, AppointmentStatus, BookingSource, Business,
    Clock, Customer, EventKind, PaymentStatus, ScheduleConfig, Staff, StatusChange,
};
use crate::services::availability;
use crate::services::catalog;
use crate::services::conflict::{self, Candidate};
use crate::services::events;
use crate::services::lifecycle::{self, Step};
use crate::services::pricing::{self, PriceOverrides};
use crate::services::verification;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerInput {
    /// Existing customer; otherwise looked up or created by phone.
    pub id: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReservationRequest {
    #[serde(default)]
    pub business_id: String,
    pub service_id: String,
    #[serde(default)]
    pub staff_id: Option<String>,
    pub customer: CustomerInput,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(default, with = "hhmm_opt")]
    pub end_time: Option<NaiveTime>,
    #[serde(default = "default_source")]
    pub source: BookingSource,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub pricing: PriceOverrides,
    #[serde(default)]
    pub advance_amount: i64,
}

fn default_source() -> BookingSource {
    BookingSource::Staff
}

#[derive(Debug, Clone, Copy)]
pub struct Verification<'a> {
    pub secret: &'a str,
    pub window: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct ReserveOptions<'a> {
    /// Public booking: online rules and the advance window apply.
    pub online: bool,
    /// Hold the slot until the customer proves the contact details.
    pub verification: Option<Verification<'a>>,
    pub max_retries: u32,
    pub clock: Clock,
}

#[derive(Debug, Clone)]
pub struct Outcome {
    pub appointment: Appointment,
    pub events: Vec<AppointmentEvent>,
}

/// Creates an appointment if the slot is still free.
pub fn reserve(
    conn: &mut Connection,
    req: &ReservationRequest,
    actor: &Actor,
    opts: &ReserveOptions,
) -> Result<Outcome, AppError> {
    with_retries(opts.max_retries, || {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let business = catalog::load_business(&tx, &req.business_id)?;
        let now = opts.clock.now(&business);
        let mut published = release_expired_holds(&tx, &business.id, None, now)?;
        let outcome = reserve_in(&tx, &business, req, actor, opts, now)?;

        tx.commit()?;

        tracing::info!(
            appointment_id = %outcome.appointment.id,
            booking_number = %outcome.appointment.booking_number,
            business_id = %business.id,
            staff_id = ?outcome.appointment.staff_id,
            status = %outcome.appointment.status,
            "appointment reserved"
        );

        published.extend(outcome.events);
        Ok(Outcome {
            appointment: outcome.appointment,
            events: published,
        })
    })
}

fn reserve_in(
    conn: &Connection,
    business: &Business,
    req: &ReservationRequest,
    actor: &Actor,
    opts: &ReserveOptions,
    now: NaiveDateTime,
) -> Result<Outcome, AppError> {
    let schedule = &business.schedule;
    if opts.online && !schedule.allow_online_booking {
        return Err(AppError::policy("online booking is disabled for this business"));
    }

    let service = catalog::load_service(conn, &business.id, &req.service_id)?;
    let staff = req
        .staff_id
        .as_deref()
        .map(|id| catalog::load_staff(conn, &business.id, id))
        .transpose()?;

    let end = slot_end(req.start_time, service.duration_minutes, req.end_time)?;
    check_bookable(schedule, staff.as_ref(), req.date, req.start_time, end, opts.online, now)?;

    let candidate = Candidate {
        business_id: &business.id,
        staff_id: req.staff_id.as_deref(),
        date: req.date,
        start: req.start_time,
        end,
        exclude_id: None,
    };
    if let Some(existing) = conflict::find_conflict(conn, &candidate, &now)? {
        return Err(slot_unavailable(&existing));
    }

    let customer = resolve_customer(conn, &business.id, &req.customer)?;
    // Public requests only know the booker once the customer record is resolved.
    let booker;
    let actor = if actor.kind == ActorKind::Customer {
        booker = Actor::new(ActorKind::Customer, customer.id.clone());
        &booker
    } else {
        actor
    };
    let quote = pricing::quote(service.price, &req.pricing)?;
    if req.advance_amount < 0 || req.advance_amount > quote.total_amount {
        return Err(AppError::validation(
            "advance_amount must be between 0 and the total amount",
        ));
    }

    let status = if opts.verification.is_some() {
        AppointmentStatus::Pending
    } else {
        lifecycle::initial_status(actor, req.source == BookingSource::WalkIn)
    };
    let confirmed = status == AppointmentStatus::Confirmed;

    let appointment = Appointment {
        id: Uuid::new_v4().to_string(),
        booking_number: next_booking_number(conn, now.date())?,
        business_id: business.id.clone(),
        customer_id: customer.id.clone(),
        service_id: service.id.clone(),
        staff_id: req.staff_id.clone(),
        appointment_date: req.date,
        start_time: req.start_time,
        end_time: end,
        duration_minutes: service.duration_minutes,
        status,
        source: req.source,
        notes: req.notes.clone(),
        service_price: quote.service_price,
        additional_charges: quote.additional_charges,
        discount: quote.discount,
        tax: quote.tax,
        total_amount: quote.total_amount,
        payment_status: PaymentStatus::for_amounts(req.advance_amount, quote.total_amount),
        paid_amount: req.advance_amount,
        advance_amount: req.advance_amount,
        cancellation_fee: 0,
        refund_amount: 0,
        created_by: actor.clone(),
        confirmation_sent: confirmed,
        confirmed_at: confirmed.then_some(now),
        verification_expires_at: opts.verification.map(|v| now + v.window),
        verified_at: None,
        verification_attempts: 0,
        original_appointment_date: None,
        reschedule_count: 0,
        rescheduled_by: None,
        rescheduled_at: None,
        reschedule_reason: None,
        cancelled_by: None,
        cancelled_at: None,
        cancellation_reason: None,
        check_in_time: None,
        check_out_time: None,
        completed_at: None,
        actual_duration: None,
        rating: None,
        review: None,
        review_date: None,
        reminder_sent_at: None,
        created_at: now,
        updated_at: now,
    };

    queries::insert_appointment(conn, &appointment).map_err(storage_or_taken)?;
    record_step(
        conn,
        &appointment.id,
        &Step {
            from: None,
            to: status,
            note: None,
        },
        actor,
        now,
    )?;

    let mut published = vec![events::record(
        conn,
        events::event_for(EventKind::Created, &appointment, Some(&customer), now),
    )?];
    if let Some(v) = opts.verification {
        let mut event =
            events::event_for(EventKind::VerificationRequested, &appointment, Some(&customer), now);
        event.verification_code = Some(verification::verification_code(v.secret, &appointment.id)?);
        published.push(events::record(conn, event)?);
    }

    Ok(Outcome {
        appointment,
        events: published,
    })
}

/// End of an appointment starting at `start`. A caller-supplied end must agree with the duration.
pub fn slot_end(
    start: NaiveTime,
    duration_minutes: i32,
    requested_end: Option<NaiveTime>,
) -> Result<NaiveTime, AppError> {
    let (end, wrapped) = start.overflowing_add_signed(Duration::minutes(duration_minutes as i64));
    if wrapped != 0 {
        return Err(AppError::validation("appointment cannot cross midnight"));
    }
    match requested_end {
        Some(requested) if requested != end => Err(AppError::validation(format!(
            "end_time must be {} for a {duration_minutes} minute service",
            end.format("%H:%M")
        ))),
        _ => Ok(end),
    }
}

/// Rules a slot has to satisfy beyond being free.
pub fn check_bookable(
    schedule: &ScheduleConfig,
    staff: Option<&Staff>,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    online: bool,
    now: NaiveDateTime,
) -> Result<(), AppError> {
    let today = now.date();
    if date < today {
        return Err(AppError::InvalidDateRange(format!("{date} is in the past")));
    }
    if schedule.is_closed_on(date) {
        return Err(AppError::policy(format!("the business is closed on {date}")));
    }

    let inside_hours = availability::opening_windows(schedule, staff, date)
        .iter()
        .any(|(open, close)| start >= *open && end <= *close);
    if !inside_hours {
        return Err(AppError::policy("the requested time is outside working hours"));
    }

    if online {
        let starts_at = date.and_time(start);
        let (earliest, latest) = availability::advance_window(schedule, now);
        if starts_at < earliest {
            return Err(AppError::policy(format!(
                "bookings must be made at least {} hours in advance",
                schedule.min_advance_booking_hours
            )));
        }
        let last_day = availability::last_bookable_day(schedule, today);
        if latest.is_some_and(|l| starts_at > l) || last_day.is_some_and(|last| date > last) {
            return Err(AppError::policy("the requested date is too far in advance"));
        }
    }

    Ok(())
}

fn resolve_customer(
    conn: &Connection,
    business_id: &str,
    input: &CustomerInput,
) -> Result<Customer, AppError> {
    if let Some(id) = &input.id {
        return queries::get_customer(conn, id)?
            .filter(|c| c.business_id == business_id)
            .ok_or_else(|| AppError::not_found(format!("customer {id}")));
    }

    let phone = input
        .phone
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::validation("customer id or phone is required"))?;

    if let Some(existing) = queries::find_customer_by_phone(conn, business_id, phone)? {
        return Ok(existing);
    }

    let name = input
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::validation("customer name is required for new customers"))?;

    let customer = Customer {
        id: Uuid::new_v4().to_string(),
        business_id: business_id.to_string(),
        name: name.to_string(),
        phone: phone.to_string(),
        email: input.email.clone(),
    };
    queries::create_customer(conn, &customer)?;
    tracing::info!(customer_id = %customer.id, business_id, "customer created");
    Ok(customer)
}

/// `BK{YYYYMMDD}-{NNNN}-{XXXX}`: a per-day counter plus four random hex digits.
fn next_booking_number(conn: &Connection, day: NaiveDate) -> Result<String, AppError> {
    let sequence = queries::next_booking_sequence(conn, &day)?;
    let suffix = Uuid::new_v4().simple().to_string()[..4].to_uppercase();
    Ok(format!("BK{}-{sequence:04}-{suffix}", day.format("%Y%m%d")))
}

/// Cancels every expired hold of the business so its slot can be booked again.
/// `keep` is left alone; it is the appointment the caller is about to change.
pub fn release_expired_holds(
    conn: &Connection,
    business_id: &str,
    keep: Option<&str>,
    now: NaiveDateTime,
) -> Result<Vec<AppointmentEvent>, AppError> {
    let mut published = vec![];
    for mut hold in queries::get_expired_holds(conn, business_id, &now)? {
        if keep == Some(hold.id.as_str()) {
            continue;
        }
        let step = lifecycle::release_hold(&mut hold, lifecycle::HOLD_EXPIRED_REASON, now)?;
        queries::update_appointment(conn, &hold)?;
        record_step(conn, &hold.id, &step, &Actor::system(), now)?;
        let customer = queries::get_customer(conn, &hold.customer_id)?;
        published.push(events::record(
            conn,
            events::event_for(EventKind::Cancelled, &hold, customer.as_ref(), now),
        )?);
        tracing::info!(appointment_id = %hold.id, "released expired hold");
    }
    Ok(published)
}

// ── Changes to existing appointments ──

#[derive(Debug, Clone, Copy)]
pub enum AppointmentRef<'a> {
    Id(&'a str),
    BookingNumber(&'a str),
}

impl AppointmentRef<'_> {
    fn describe(&self) -> String {
        match self {
            AppointmentRef::Id(id) => format!("appointment {id}"),
            AppointmentRef::BookingNumber(n) => format!("booking {n}"),
        }
    }
}

pub fn find(conn: &Connection, target: AppointmentRef) -> Result<Appointment, AppError> {
    let found = match target {
        AppointmentRef::Id(id) => queries::get_appointment_by_id(conn, id)?,
        AppointmentRef::BookingNumber(n) => queries::get_appointment_by_booking_number(conn, n)?,
    };
    found.ok_or_else(|| AppError::not_found(target.describe()))
}

/// Who is changing which appointment.
#[derive(Debug, Clone, Copy)]
pub struct Mutation<'a> {
    pub target: AppointmentRef<'a>,
    pub actor: &'a Actor,
    pub clock: Clock,
    pub max_retries: u32,
}

/// What a change did: status hops for the history log and events to emit.
#[derive(Debug, Default)]
pub struct Change {
    pub steps: Vec<Step>,
    pub events: Vec<EventKind>,
}

impl Change {
    pub fn new(steps: Vec<Step>, events: Vec<EventKind>) -> Self {
        Self { steps, events }
    }
}

/// Loads the appointment, lets `f` change it and persists the result in one transaction.
/// Expired holds of the business are released first so their slots are free for `f`.
/// When `f` fails nothing is written.
pub fn apply<F>(conn: &mut Connection, m: &Mutation, mut f: F) -> Result<Outcome, AppError>
where
    F: FnMut(&Connection, &Business, &mut Appointment, NaiveDateTime) -> Result<Change, AppError>,
{
    with_retries(m.max_retries, || {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut appointment = find(&tx, m.target)?;
        let business = catalog::load_business(&tx, &appointment.business_id)?;
        let now = m.clock.now(&business);
        let mut published =
            release_expired_holds(&tx, &business.id, Some(appointment.id.as_str()), now)?;
        let change = f(&tx, &business, &mut appointment, now)?;

        queries::update_appointment(&tx, &appointment).map_err(storage_or_taken)?;
        for step in &change.steps {
            record_step(&tx, &appointment.id, step, m.actor, now)?;
        }
        let customer = queries::get_customer(&tx, &appointment.customer_id)?;
        for kind in &change.events {
            published.push(events::record(
                &tx,
                events::event_for(*kind, &appointment, customer.as_ref(), now),
            )?);
        }

        tx.commit()?;
        Ok(Outcome {
            appointment,
            events: published,
        })
    })
}

pub fn confirm(conn: &mut Connection, m: &Mutation) -> Result<Outcome, AppError> {
    apply(conn, m, |_, _, a, now| {
        let step = lifecycle::confirm(a, now)?;
        tracing::info!(appointment_id = %a.id, "appointment confirmed");
        Ok(Change::new(vec![step], vec![EventKind::Confirmed]))
    })
}

pub fn start(conn: &mut Connection, m: &Mutation) -> Result<Outcome, AppError> {
    apply(conn, m, |_, _, a, now| {
        let step = lifecycle::start(a, now)?;
        Ok(Change::new(vec![step], vec![EventKind::Started]))
    })
}

pub fn complete(conn: &mut Connection, m: &Mutation) -> Result<Outcome, AppError> {
    apply(conn, m, |_, _, a, now| {
        let step = lifecycle::complete(a, now)?;
        Ok(Change::new(vec![step], vec![EventKind::Completed]))
    })
}

pub fn cancel(
    conn: &mut Connection,
    m: &Mutation,
    reason: Option<String>,
) -> Result<Outcome, AppError> {
    apply(conn, m, |_, business, a, now| {
        if m.actor.kind == ActorKind::Customer && now >= a.starts_at() {
            return Err(AppError::policy(
                "appointments cannot be cancelled by the customer after they start",
            ));
        }
        let step = lifecycle::cancel(
            a,
            m.actor,
            reason.clone(),
            &business.schedule.cancellation_policy,
            now,
        )?;
        tracing::info!(
            appointment_id = %a.id,
            fee = a.cancellation_fee,
            refund = a.refund_amount,
            "appointment cancelled"
        );
        Ok(Change::new(vec![step], vec![EventKind::Cancelled]))
    })
}

pub fn mark_no_show(conn: &mut Connection, m: &Mutation) -> Result<Outcome, AppError> {
    apply(conn, m, |_, business, a, now| {
        let step = lifecycle::mark_no_show(a, &business.schedule.cancellation_policy, now)?;
        Ok(Change::new(vec![step], vec![EventKind::NoShow]))
    })
}

pub fn review(
    conn: &mut Connection,
    m: &Mutation,
    rating: u8,
    text: Option<String>,
) -> Result<Outcome, AppError> {
    apply(conn, m, |_, _, a, now| {
        lifecycle::add_review(a, rating, text.clone(), now)?;
        Ok(Change::default())
    })
}

/// Moves the appointment to another staff member, or detaches it with `None`.
pub fn assign_staff(
    conn: &mut Connection,
    m: &Mutation,
    staff_id: Option<String>,
) -> Result<Outcome, AppError> {
    apply(conn, m, |tx, business, a, now| {
        lifecycle::ensure_allowed(a.status, lifecycle::Event::AssignStaff)?;

        if let Some(id) = staff_id.as_deref() {
            let staff = catalog::load_staff(tx, &business.id, id)?;
            let inside_hours =
                availability::opening_windows(&business.schedule, Some(&staff), a.appointment_date)
                    .iter()
                    .any(|(open, close)| a.start_time >= *open && a.end_time <= *close);
            if !inside_hours {
                return Err(AppError::policy(format!("staff {id} is not working at that time")));
            }
            let candidate = Candidate {
                business_id: &business.id,
                staff_id: Some(id),
                date: a.appointment_date,
                start: a.start_time,
                end: a.end_time,
                exclude_id: Some(&a.id),
            };
            if let Some(existing) = conflict::find_conflict(tx, &candidate, &now)? {
                return Err(slot_unavailable(&existing));
            }
        }

        let note = match &staff_id {
            Some(id) => format!("assigned to {id}"),
            None => "staff unassigned".to_string(),
        };
        lifecycle::assign_staff(a, staff_id.clone(), now)?;
        Ok(Change::new(
            vec![Step {
                from: Some(a.status),
                to: a.status,
                note: Some(note),
            }],
            vec![],
        ))
    })
}

/// A verification attempt. A wrong code is committed too, so `outcome` holds what was
/// written (and the hold's release once guessing is exhausted) next to the refusal.
#[derive(Debug)]
pub struct Attempt {
    pub outcome: Outcome,
    pub rejection: Option<AppError>,
}

impl Attempt {
    pub fn into_result(self) -> Result<Outcome, AppError> {
        match self.rejection {
            Some(err) => Err(err),
            None => Ok(self.outcome),
        }
    }
}

/// Checks a public booking's one-time code.
pub fn verify(
    conn: &mut Connection,
    m: &Mutation,
    secret: &str,
    code: &str,
) -> Result<Attempt, AppError> {
    let mut rejection = None;
    let outcome = apply(conn, m, |_, _, a, now| {
        rejection = None;
        let tried = a.verification_attempts;
        match verification::verify(a, secret, code, now) {
            Ok(()) => {
                tracing::info!(appointment_id = %a.id, "booking verified");
                Ok(Change::default())
            }
            Err(err) if a.verification_attempts == tried => Err(err),
            Err(err) => {
                tracing::warn!(
                    appointment_id = %a.id,
                    attempts = a.verification_attempts,
                    "incorrect verification code"
                );
                rejection = Some(err);
                if !verification::attempts_exhausted(a) {
                    return Ok(Change::default());
                }
                let step = lifecycle::release_hold(a, lifecycle::TOO_MANY_ATTEMPTS_REASON, now)?;
                tracing::info!(appointment_id = %a.id, "hold released after failed verification");
                Ok(Change::new(vec![step], vec![EventKind::Cancelled]))
            }
        }
    })?;
    Ok(Attempt { outcome, rejection })
}

pub fn history(conn: &Connection, target: AppointmentRef) -> Result<Vec<StatusChange>, AppError> {
    let appointment = find(conn, target)?;
    Ok(queries::get_status_history(conn, &appointment.id)?)
}

fn record_step(
    conn: &Connection,
    appointment_id: &str,
    step: &Step,
    actor: &Actor,
    now: NaiveDateTime,
) -> Result<(), AppError> {
    queries::insert_status_change(
        conn,
        &StatusChange {
            appointment_id: appointment_id.to_string(),
            from_status: step.from,
            to_status: step.to,
            actor: actor.clone(),
            note: step.note.clone(),
            created_at: now,
        },
    )?;
    Ok(())
}

pub(crate) fn slot_unavailable(existing: &Appointment) -> AppError {
    AppError::SlotUnavailable(format!(
        "overlaps {} ({}-{})",
        existing.booking_number,
        existing.start_time.format("%H:%M"),
        existing.end_time.format("%H:%M")
    ))
}

/// The active-slot index firing means another writer won the slot.
pub(crate) fn storage_or_taken(err: anyhow::Error) -> AppError {
    if db::is_slot_taken(&err) {
        AppError::SlotUnavailable("the slot was just taken".to_string())
    } else {
        AppError::Storage(err)
    }
}

/// Retries `op` while the store reports lock contention, then gives up with `SlotUnavailable`.
pub(crate) fn with_retries<T>(
    max_retries: u32,
    mut op: impl FnMut() -> Result<T, AppError>,
) -> Result<T, AppError> {
    let mut attempt = 0;
    loop {
        match op() {
            Err(e) if e.is_contention() => {
                if attempt >= max_retries {
                    tracing::warn!(
                        attempts = attempt + 1,
                        error = %e,
                        "store still busy, giving up"
                    );
                    return Err(AppError::SlotUnavailable(
                        "the schedule is busy, please try again".to_string(),
                    ));
                }
                attempt += 1;
                tracing::warn!(attempt, error = %e, "store busy, retrying");
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier, Mutex};

    use crate::services::availability::AvailabilityQuery;
    use crate::services::reschedule::{self, RescheduleRequest};
    use crate::services::testing::{
        d, dt, salon_schedule, seed_appointment, seed_business, seed_business_with, t,
    };

    const SECRET: &str = "s3cret";

    fn setup_db() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        seed_business(&conn);
        conn
    }

    fn staff_actor() -> Actor {
        Actor::new(ActorKind::Staff, "staff-1")
    }

    fn customer_actor() -> Actor {
        Actor::new(ActorKind::Customer, "cust-1")
    }

    fn request(staff: Option<&str>, date: &str, start: &str) -> ReservationRequest {
        ReservationRequest {
            business_id: "biz-1".to_string(),
            service_id: "svc-30".to_string(),
            staff_id: staff.map(str::to_string),
            customer: CustomerInput {
                id: Some("cust-1".to_string()),
                ..Default::default()
            },
            date: d(date),
            start_time: t(start),
            end_time: None,
            source: BookingSource::Staff,
            notes: None,
            pricing: PriceOverrides::default(),
            advance_amount: 0,
        }
    }

    fn opts(now: &str) -> ReserveOptions<'static> {
        ReserveOptions {
            online: false,
            verification: None,
            max_retries: 3,
            clock: Clock::Fixed(dt(now)),
        }
    }

    fn public_opts(now: &str) -> ReserveOptions<'static> {
        ReserveOptions {
            online: true,
            verification: Some(Verification {
                secret: SECRET,
                window: Duration::minutes(15),
            }),
            ..opts(now)
        }
    }

    fn public_request(date: &str, start: &str) -> ReservationRequest {
        ReservationRequest {
            source: BookingSource::Online,
            ..request(Some("staff-1"), date, start)
        }
    }

    fn mutation<'a>(id: &'a str, actor: &'a Actor, now: &str) -> Mutation<'a> {
        Mutation {
            target: AppointmentRef::Id(id),
            actor,
            clock: Clock::Fixed(dt(now)),
            max_retries: 3,
        }
    }

    /// Unverified hold on 2024-06-01 that ran out at `expired_at`.
    fn expired_hold(conn: &Connection, id: &str, staff: &str, start: &str, expired_at: &str) {
        let status = AppointmentStatus::Pending;
        let end = (t(start) + Duration::minutes(30)).format("%H:%M").to_string();
        let mut hold = seed_appointment(conn, id, staff, d("2024-06-01"), start, &end, status);
        hold.verification_expires_at = Some(dt(expired_at));
        queries::update_appointment(conn, &hold).unwrap();
    }

    #[test]
    fn test_reserve_creates_pending_with_history_and_event() {
        let mut conn = setup_db();
        let req = request(Some("staff-1"), "2024-06-01", "11:00");
        let out = reserve(&mut conn, &req, &staff_actor(), &opts("2024-05-31 09:00")).unwrap();

        let a = &out.appointment;
        assert_eq!(a.status, AppointmentStatus::Pending);
        assert_eq!(a.end_time, t("11:30"));
        assert_eq!(a.total_amount, 1000);
        assert!(a.booking_number.starts_with("BK20240531-0001-"));
        assert_eq!(a.booking_number.len(), "BK20240531-0001-ABCD".len());
        assert_eq!(out.events.len(), 1);
        assert_eq!(out.events[0].kind, EventKind::Created);

        let history = queries::get_status_history(&conn, &a.id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].from_status, None);
        assert_eq!(history[0].to_status, AppointmentStatus::Pending);
    }

    #[test]
    fn test_booking_numbers_count_up_per_day() {
        let mut conn = setup_db();
        let now = opts("2024-05-31 09:00");
        let first_req = request(Some("staff-1"), "2024-06-01", "11:00");
        let first = reserve(&mut conn, &first_req, &staff_actor(), &now).unwrap();
        let second_req = request(Some("staff-1"), "2024-06-01", "12:00");
        let second = reserve(&mut conn, &second_req, &staff_actor(), &now).unwrap();
        assert!(first.appointment.booking_number.starts_with("BK20240531-0001-"));
        assert!(second.appointment.booking_number.starts_with("BK20240531-0002-"));
    }

    #[test]
    fn test_walk_in_by_staff_is_confirmed() {
        let mut conn = setup_db();
        let mut req = request(Some("staff-1"), "2024-06-01", "11:00");
        req.source = BookingSource::WalkIn;
        let out = reserve(&mut conn, &req, &staff_actor(), &opts("2024-06-01 10:55")).unwrap();
        assert_eq!(out.appointment.status, AppointmentStatus::Confirmed);
        assert!(out.appointment.confirmation_sent);
    }

    #[test]
    fn test_overlapping_reservation_rejected() {
        let mut conn = setup_db();
        let confirmed = AppointmentStatus::Confirmed;
        seed_appointment(&conn, "a1", "staff-1", d("2024-06-01"), "11:00", "11:30", confirmed);
        let now = opts("2024-05-31 09:00");

        let req = request(Some("staff-1"), "2024-06-01", "11:15");
        let err = reserve(&mut conn, &req, &staff_actor(), &now).unwrap_err();
        assert!(matches!(err, AppError::SlotUnavailable(_)));

        // another staff member is free
        let req = request(Some("staff-2"), "2024-06-01", "11:15");
        reserve(&mut conn, &req, &staff_actor(), &now).unwrap();
    }

    #[test]
    fn test_concurrent_requests_for_same_slot() {
        let conn = Arc::new(Mutex::new(setup_db()));
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let conn = Arc::clone(&conn);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    let mut conn = conn.lock().unwrap();
                    let req = request(Some("staff-1"), "2024-06-01", "11:00");
                    reserve(&mut conn, &req, &staff_actor(), &opts("2024-05-31 09:00"))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let won: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(won.len(), 1);
        assert_eq!(won[0].appointment.status, AppointmentStatus::Pending);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AppError::SlotUnavailable(_)))));
    }

    #[test]
    fn test_unique_index_backs_up_the_check() {
        let conn = setup_db();
        let pending = AppointmentStatus::Pending;
        seed_appointment(&conn, "a1", "staff-1", d("2024-06-01"), "11:00", "11:30", pending);

        let mut dup = crate::services::testing::sample_appointment(
            "a2",
            Some("staff-1"),
            AppointmentStatus::Confirmed,
        );
        dup.start_time = t("11:00");
        dup.end_time = t("11:30");
        let err = queries::insert_appointment(&conn, &dup).unwrap_err();
        assert!(matches!(storage_or_taken(err), AppError::SlotUnavailable(_)));
    }

    #[test]
    fn test_outside_hours_and_closed_days() {
        let mut conn = setup_db();
        let now = opts("2024-05-31 09:00");

        let req = request(Some("staff-1"), "2024-06-01", "17:45");
        let err = reserve(&mut conn, &req, &staff_actor(), &now).unwrap_err();
        assert!(matches!(err, AppError::PolicyViolation(_)));

        let req = request(Some("staff-1"), "2024-05-30", "11:00");
        let err = reserve(&mut conn, &req, &staff_actor(), &now).unwrap_err();
        assert!(matches!(err, AppError::InvalidDateRange(_)));
    }

    #[test]
    fn test_end_time_must_match_service() {
        assert_eq!(slot_end(t("10:00"), 30, None).unwrap(), t("10:30"));
        assert!(slot_end(t("10:00"), 30, Some(t("10:30"))).is_ok());
        assert!(matches!(
            slot_end(t("10:00"), 30, Some(t("10:45"))),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(slot_end(t("23:45"), 30, None), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_new_customer_created_once_by_phone() {
        let mut conn = setup_db();
        let now = opts("2024-05-31 09:00");
        let mut req = request(Some("staff-1"), "2024-06-01", "11:00");
        req.customer = CustomerInput {
            id: None,
            name: Some("Bob".to_string()),
            phone: Some("+15552220000".to_string()),
            email: None,
        };
        let first = reserve(&mut conn, &req, &staff_actor(), &now).unwrap();
        req.start_time = t("12:00");
        let second = reserve(&mut conn, &req, &staff_actor(), &now).unwrap();
        assert_eq!(first.appointment.customer_id, second.appointment.customer_id);

        req.customer.phone = None;
        req.start_time = t("13:00");
        let err = reserve(&mut conn, &req, &staff_actor(), &now).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_advance_payment_counts_as_paid() {
        let mut conn = setup_db();
        let now = opts("2024-05-31 09:00");
        let mut req = request(Some("staff-1"), "2024-06-01", "11:00");
        req.advance_amount = 300;
        let out = reserve(&mut conn, &req, &staff_actor(), &now).unwrap();
        assert_eq!(out.appointment.paid_amount, 300);
        assert_eq!(out.appointment.payment_status, PaymentStatus::Partial);

        req.start_time = t("12:00");
        req.advance_amount = 5000;
        assert!(matches!(
            reserve(&mut conn, &req, &staff_actor(), &now),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_public_hold_issues_code_and_expires() {
        let mut conn = setup_db();
        let req = public_request("2024-06-01", "11:00");
        let public = public_opts("2024-05-31 09:00");
        let held = reserve(&mut conn, &req, &customer_actor(), &public).unwrap();
        assert_eq!(held.appointment.verification_expires_at, Some(dt("2024-05-31 09:15")));
        let code_event = held
            .events
            .iter()
            .find(|e| e.kind == EventKind::VerificationRequested)
            .unwrap();
        assert_eq!(code_event.verification_code.as_ref().map(String::len), Some(6));

        // after expiry the same slot is bookable again and the hold is released
        let req = request(Some("staff-1"), "2024-06-01", "11:00");
        let out = reserve(&mut conn, &req, &staff_actor(), &opts("2024-05-31 09:20")).unwrap();
        assert!(out
            .events
            .iter()
            .any(|e| e.kind == EventKind::Cancelled && e.appointment_id == held.appointment.id));

        let released = find(&conn, AppointmentRef::Id(&held.appointment.id)).unwrap();
        assert_eq!(released.status, AppointmentStatus::Cancelled);
        assert_eq!(released.cancelled_by, Some(Actor::system()));
        assert_eq!(
            released.cancellation_reason.as_deref(),
            Some(lifecycle::HOLD_EXPIRED_REASON)
        );
    }

    #[test]
    fn test_public_booking_respects_online_rules() {
        let mut conn = setup_db();
        let mut public = opts("2024-06-01 10:00");
        public.online = true;

        // starts before now
        let req = request(Some("staff-1"), "2024-06-01", "09:00");
        let err = reserve(&mut conn, &req, &customer_actor(), &public).unwrap_err();
        assert!(matches!(err, AppError::PolicyViolation(_)));

        let mut business = catalog::load_business(&conn, "biz-1").unwrap();
        business.schedule.allow_online_booking = false;
        queries::upsert_business(&conn, &business).unwrap();
        let req = request(Some("staff-1"), "2024-06-01", "12:00");
        let err = reserve(&mut conn, &req, &customer_actor(), &public).unwrap_err();
        assert!(matches!(err, AppError::PolicyViolation(_)));
    }

    #[test]
    fn test_transition_flow_writes_history() {
        let mut conn = setup_db();
        let req = request(Some("staff-1"), "2024-06-01", "11:00");
        let out = reserve(&mut conn, &req, &staff_actor(), &opts("2024-05-31 09:00")).unwrap();
        let id = out.appointment.id.clone();
        let actor = staff_actor();

        confirm(&mut conn, &mutation(&id, &actor, "2024-05-31 10:00")).unwrap();
        start(&mut conn, &mutation(&id, &actor, "2024-06-01 11:02")).unwrap();
        let done = complete(&mut conn, &mutation(&id, &actor, "2024-06-01 11:35")).unwrap();
        assert_eq!(done.appointment.status, AppointmentStatus::Completed);
        assert_eq!(done.events[0].kind, EventKind::Completed);

        let statuses: Vec<_> = history(&conn, AppointmentRef::Id(&id))
            .unwrap()
            .into_iter()
            .map(|c| c.to_status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                AppointmentStatus::Pending,
                AppointmentStatus::Confirmed,
                AppointmentStatus::InProgress,
                AppointmentStatus::Completed,
            ]
        );

        let err = cancel(&mut conn, &mutation(&id, &actor, "2024-06-01 12:00"), None).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[test]
    fn test_late_cancel_charges_fee() {
        let mut conn = setup_db();
        let req = request(Some("staff-1"), "2024-06-01", "12:00");
        let out = reserve(&mut conn, &req, &staff_actor(), &opts("2024-05-31 09:00")).unwrap();
        let customer = customer_actor();

        let m = mutation(&out.appointment.id, &customer, "2024-06-01 10:00");
        let cancelled = cancel(&mut conn, &m, Some("running late".into())).unwrap();
        assert_eq!(cancelled.appointment.status, AppointmentStatus::Cancelled);
        assert_eq!(cancelled.appointment.cancellation_fee, 1000);
        assert_eq!(cancelled.appointment.cancelled_by, Some(customer));
    }

    #[test]
    fn test_customer_cannot_cancel_after_start() {
        let mut conn = setup_db();
        let req = request(Some("staff-1"), "2024-06-01", "12:00");
        let out = reserve(&mut conn, &req, &staff_actor(), &opts("2024-05-31 09:00")).unwrap();
        let customer = customer_actor();
        let m = mutation(&out.appointment.id, &customer, "2024-06-01 12:05");
        let err = cancel(&mut conn, &m, None).unwrap_err();
        assert!(matches!(err, AppError::PolicyViolation(_)));

        // staff still can
        let staff = staff_actor();
        let m = mutation(&out.appointment.id, &staff, "2024-06-01 12:05");
        cancel(&mut conn, &m, None).unwrap();
    }

    #[test]
    fn test_assign_staff_checks_new_staff_calendar() {
        let mut conn = setup_db();
        let confirmed = AppointmentStatus::Confirmed;
        seed_appointment(&conn, "busy", "staff-2", d("2024-06-01"), "11:00", "11:30", confirmed);
        let req = request(None, "2024-06-01", "11:00");
        let out = reserve(&mut conn, &req, &staff_actor(), &opts("2024-05-31 09:00")).unwrap();
        let actor = staff_actor();
        let m = mutation(&out.appointment.id, &actor, "2024-05-31 10:00");

        let err = assign_staff(&mut conn, &m, Some("staff-2".to_string())).unwrap_err();
        assert!(matches!(err, AppError::SlotUnavailable(_)));
        let unchanged = find(&conn, AppointmentRef::Id(&out.appointment.id)).unwrap();
        assert_eq!(unchanged.staff_id, None);

        let moved = assign_staff(&mut conn, &m, Some("staff-1".to_string())).unwrap();
        assert_eq!(moved.appointment.staff_id.as_deref(), Some("staff-1"));
    }

    #[test]
    fn test_assign_staff_onto_expired_hold() {
        let mut conn = setup_db();
        let req = request(None, "2024-06-01", "11:15");
        let out = reserve(&mut conn, &req, &staff_actor(), &opts("2024-05-31 09:00")).unwrap();
        expired_hold(&conn, "hold", "staff-2", "11:15", "2024-05-31 09:30");

        let actor = staff_actor();
        let m = mutation(&out.appointment.id, &actor, "2024-05-31 10:00");
        let moved = assign_staff(&mut conn, &m, Some("staff-2".to_string())).unwrap();
        assert_eq!(moved.appointment.staff_id.as_deref(), Some("staff-2"));
        assert!(moved
            .events
            .iter()
            .any(|e| e.kind == EventKind::Cancelled && e.appointment_id == "hold"));

        let released = find(&conn, AppointmentRef::Id("hold")).unwrap();
        assert_eq!(released.status, AppointmentStatus::Cancelled);
        assert_eq!(released.cancelled_by, Some(Actor::system()));
    }

    #[test]
    fn test_failed_change_keeps_expired_holds() {
        let mut conn = setup_db();
        let confirmed = AppointmentStatus::Confirmed;
        seed_appointment(&conn, "busy", "staff-2", d("2024-06-01"), "11:00", "11:30", confirmed);
        let req = request(None, "2024-06-01", "11:00");
        let out = reserve(&mut conn, &req, &staff_actor(), &opts("2024-05-31 09:00")).unwrap();
        expired_hold(&conn, "hold", "staff-1", "15:00", "2024-05-31 09:30");

        let actor = staff_actor();
        let m = mutation(&out.appointment.id, &actor, "2024-05-31 10:00");
        assign_staff(&mut conn, &m, Some("staff-2".to_string())).unwrap_err();

        // rolled back together with the refused change
        let hold = find(&conn, AppointmentRef::Id("hold")).unwrap();
        assert_eq!(hold.status, AppointmentStatus::Pending);
    }

    #[test]
    fn test_changing_an_expired_hold_reports_the_expiry() {
        let mut conn = setup_db();
        expired_hold(&conn, "hold", "staff-1", "11:00", "2024-05-31 09:30");
        let customer = customer_actor();

        let m = mutation("hold", &customer, "2024-05-31 10:00");
        let err = verify(&mut conn, &m, SECRET, "123456").unwrap_err();
        assert!(matches!(err, AppError::PolicyViolation(_)));
        let hold = find(&conn, AppointmentRef::Id("hold")).unwrap();
        assert_eq!(hold.status, AppointmentStatus::Pending);
        assert_eq!(hold.verification_attempts, 0);
    }

    #[test]
    fn test_verify_counts_wrong_codes_then_succeeds() {
        let mut conn = setup_db();
        let req = public_request("2024-06-01", "11:00");
        let public = public_opts("2024-05-31 09:00");
        let held = reserve(&mut conn, &req, &customer_actor(), &public).unwrap();
        let id = held.appointment.id.clone();
        let code = verification::verification_code(SECRET, &id).unwrap();
        let wrong = if code == "000000" { "000001" } else { "000000" };
        let customer = customer_actor();
        let m = mutation(&id, &customer, "2024-05-31 09:05");

        let refused = verify(&mut conn, &m, SECRET, wrong).unwrap();
        assert!(matches!(refused.rejection, Some(AppError::Validation(_))));
        assert_eq!(find(&conn, AppointmentRef::Id(&id)).unwrap().verification_attempts, 1);

        let verified = verify(&mut conn, &m, SECRET, &code).unwrap().into_result().unwrap();
        assert_eq!(verified.appointment.verified_at, Some(dt("2024-05-31 09:05")));
        assert_eq!(verified.appointment.verification_attempts, 1);
    }

    #[test]
    fn test_too_many_wrong_codes_release_the_hold() {
        let mut conn = setup_db();
        let req = public_request("2024-06-01", "11:00");
        let public = public_opts("2024-05-31 09:00");
        let held = reserve(&mut conn, &req, &customer_actor(), &public).unwrap();
        let id = held.appointment.id.clone();
        let code = verification::verification_code(SECRET, &id).unwrap();
        let wrong = if code == "000000" { "000001" } else { "000000" };
        let customer = customer_actor();
        let m = mutation(&id, &customer, "2024-05-31 09:05");

        for attempt in 1..verification::MAX_ATTEMPTS {
            let refused = verify(&mut conn, &m, SECRET, wrong).unwrap();
            assert!(matches!(refused.rejection, Some(AppError::Validation(_))));
            assert!(refused.outcome.events.is_empty());
            let stored = find(&conn, AppointmentRef::Id(&id)).unwrap();
            assert_eq!(stored.verification_attempts, attempt);
        }

        let last = verify(&mut conn, &m, SECRET, wrong).unwrap();
        assert!(matches!(last.rejection, Some(AppError::PolicyViolation(_))));
        assert_eq!(last.outcome.events.len(), 1);
        assert_eq!(last.outcome.events[0].kind, EventKind::Cancelled);

        let released = find(&conn, AppointmentRef::Id(&id)).unwrap();
        assert_eq!(released.status, AppointmentStatus::Cancelled);
        assert_eq!(
            released.cancellation_reason.as_deref(),
            Some(lifecycle::TOO_MANY_ATTEMPTS_REASON)
        );

        // the right code is too late now and the slot is free again
        let err = verify(&mut conn, &m, SECRET, &code).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
        let req = request(Some("staff-1"), "2024-06-01", "11:00");
        reserve(&mut conn, &req, &staff_actor(), &opts("2024-05-31 09:06")).unwrap();
    }

    #[test]
    fn test_unknown_appointment_is_not_found() {
        let mut conn = setup_db();
        let actor = staff_actor();
        let err = confirm(&mut conn, &mutation("ghost", &actor, "2024-05-31 10:00")).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_retries_stop_after_limit() {
        let mut calls = 0;
        let busy = || {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
                None,
            )
        };
        let result: Result<(), AppError> = with_retries(2, || {
            calls += 1;
            Err(AppError::Database(busy()))
        });
        assert!(matches!(result, Err(AppError::SlotUnavailable(_))));
        assert_eq!(calls, 3);
    }

    // ── Whatever availability offers can be booked ──

    /// 2024-06-03 for staff-1: an expired hold at 09:00, a confirmed booking at 12:00,
    /// a live hold at 14:15 and the appointment `mine` at 16:30.
    fn busy_day(schedule: &ScheduleConfig, now: &str) -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        seed_business_with(&conn, schedule.clone());
        let day = d("2024-06-03");
        let pending = AppointmentStatus::Pending;
        let confirmed = AppointmentStatus::Confirmed;

        let mut expired =
            seed_appointment(&conn, "expired", "staff-1", day, "09:00", "09:30", pending);
        expired.verification_expires_at = Some(dt(now) - Duration::hours(1));
        queries::update_appointment(&conn, &expired).unwrap();
        seed_appointment(&conn, "taken", "staff-1", day, "12:00", "12:30", confirmed);
        let mut live = seed_appointment(&conn, "live", "staff-1", day, "14:15", "14:45", pending);
        live.verification_expires_at = Some(dt(now) + Duration::hours(1));
        queries::update_appointment(&conn, &live).unwrap();
        seed_appointment(&conn, "mine", "staff-1", day, "16:30", "17:00", confirmed);
        conn
    }

    fn online_schedule() -> ScheduleConfig {
        ScheduleConfig {
            advance_booking_days: 7,
            min_advance_booking_hours: 2,
            max_advance_booking_hours: Some(8),
            ..salon_schedule()
        }
    }

    fn open_starts(conn: &Connection, staff: Option<&str>, online: bool, now: &str) -> Vec<String> {
        let business = catalog::load_business(conn, "biz-1").unwrap();
        let query = AvailabilityQuery {
            date: d("2024-06-03"),
            staff_id: staff,
            service_id: Some("svc-30"),
            online,
        };
        availability::available_slots(conn, &business, &query, dt(now))
            .unwrap()
            .into_iter()
            .filter(|s| s.available)
            .map(|s| s.start.format("%H:%M").to_string())
            .collect()
    }

    #[test]
    fn test_every_open_slot_can_be_reserved_by_staff() {
        let schedule = salon_schedule();
        let now = "2024-06-01 09:00";
        let starts = open_starts(&busy_day(&schedule, now), Some("staff-1"), false, now);
        assert_eq!(
            starts,
            vec!["09:00", "09:45", "10:30", "11:15", "12:45", "13:30", "15:00", "15:45", "17:15"]
        );

        for start in &starts {
            let mut conn = busy_day(&schedule, now);
            let req = request(Some("staff-1"), "2024-06-03", start);
            let result = reserve(&mut conn, &req, &staff_actor(), &opts(now));
            assert!(result.is_ok(), "{start}: {:?}", result.err());
        }
    }

    #[test]
    fn test_every_open_slot_can_be_reserved_online() {
        let schedule = online_schedule();
        let now = "2024-06-03 08:00";
        let starts = open_starts(&busy_day(&schedule, now), Some("staff-1"), true, now);
        // earliest 10:00, latest 16:00
        assert_eq!(starts, vec!["10:30", "11:15", "12:45", "13:30", "15:00", "15:45"]);

        for start in &starts {
            let mut conn = busy_day(&schedule, now);
            let req = public_request("2024-06-03", start);
            let result = reserve(&mut conn, &req, &customer_actor(), &public_opts(now));
            assert!(result.is_ok(), "{start}: {:?}", result.err());
        }
    }

    #[test]
    fn test_every_open_slot_can_be_reserved_without_staff() {
        let schedule = salon_schedule();
        let now = "2024-06-01 09:00";
        let starts = open_starts(&busy_day(&schedule, now), None, false, now);
        assert!(starts.contains(&"09:00".to_string()));
        assert!(!starts.contains(&"12:00".to_string()));

        for start in &starts {
            let mut conn = busy_day(&schedule, now);
            let req = request(None, "2024-06-03", start);
            let result = reserve(&mut conn, &req, &staff_actor(), &opts(now));
            assert!(result.is_ok(), "{start}: {:?}", result.err());
        }
    }

    #[test]
    fn test_every_open_slot_can_take_a_reschedule() {
        let cases = [
            (salon_schedule(), false, staff_actor(), "2024-06-01 09:00"),
            (online_schedule(), true, customer_actor(), "2024-06-03 08:00"),
        ];
        for (schedule, online, actor, now) in &cases {
            let starts = open_starts(&busy_day(schedule, now), Some("staff-1"), *online, now);
            assert!(!starts.is_empty());

            for start in &starts {
                let mut conn = busy_day(schedule, now);
                let req = RescheduleRequest {
                    date: d("2024-06-03"),
                    start_time: t(start),
                    end_time: None,
                    reason: None,
                };
                let m = mutation("mine", actor, now);
                let result = reschedule::reschedule(&mut conn, &m, &req, *online);
                assert!(result.is_ok(), "{start} (online {online}): {:?}", result.err());
            }
        }
    }
}
