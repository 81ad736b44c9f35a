use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::slot::hhmm;
use crate::models::{
    Actor, ActorKind, Appointment, AppointmentStatus, BookingSource, Clock, PaymentStatus,
};
use crate::services::booking::{
    self, AppointmentRef, CustomerInput, Mutation, Outcome, ReservationRequest, ReserveOptions,
    Verification,
};
use crate::services::pricing::PriceOverrides;
use crate::services::reschedule::{self, RescheduleRequest};
use crate::state::AppState;

/// What a customer sees of their booking. Internal ids and the code stay server-side.
#[derive(Debug, Serialize)]
pub struct PublicBooking {
    pub booking_number: String,
    pub business_id: String,
    pub service_id: String,
    pub staff_id: Option<String>,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    pub total_amount: i64,
    pub payment_status: PaymentStatus,
    pub cancellation_fee: i64,
    pub refund_amount: i64,
    pub verified: bool,
    pub verification_expires_at: Option<NaiveDateTime>,
}

impl From<Appointment> for PublicBooking {
    fn from(a: Appointment) -> Self {
        Self {
            verified: a.verified_at.is_some(),
            booking_number: a.booking_number,
            business_id: a.business_id,
            service_id: a.service_id,
            staff_id: a.staff_id,
            date: a.appointment_date,
            start_time: a.start_time,
            end_time: a.end_time,
            status: a.status,
            total_amount: a.total_amount,
            payment_status: a.payment_status,
            cancellation_fee: a.cancellation_fee,
            refund_amount: a.refund_amount,
            verification_expires_at: a.verification_expires_at,
        }
    }
}

// POST /api/public/businesses/:id/bookings
#[derive(Deserialize)]
pub struct PublicBookingRequest {
    pub service_id: String,
    #[serde(default)]
    pub staff_id: Option<String>,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Path(business_id): Path<String>,
    Json(body): Json<PublicBookingRequest>,
) -> Result<(StatusCode, Json<PublicBooking>), AppError> {
    let req = ReservationRequest {
        business_id,
        service_id: body.service_id,
        staff_id: body.staff_id,
        customer: CustomerInput {
            id: None,
            name: Some(body.name),
            phone: Some(body.phone),
            email: body.email,
        },
        date: body.date,
        start_time: body.start_time,
        end_time: None,
        source: BookingSource::Online,
        notes: body.notes,
        pricing: PriceOverrides::default(),
        advance_amount: 0,
    };
    // Replaced by the resolved customer's id inside the reservation.
    let actor = Actor::new(ActorKind::Customer, "");

    let outcome = {
        let mut db = state.conn()?;
        booking::reserve(
            &mut db,
            &req,
            &actor,
            &ReserveOptions {
                online: true,
                verification: Some(Verification {
                    secret: &state.config.verification_secret,
                    window: Duration::try_minutes(state.config.verification_window_minutes)
                        .unwrap_or_else(|| Duration::minutes(15)),
                }),
                max_retries: state.config.reservation_max_retries,
                clock: Clock::BusinessLocal,
            },
        )?
    };
    state.events.publish(outcome.events);

    Ok((StatusCode::CREATED, Json(outcome.appointment.into())))
}

// GET /api/public/bookings/:booking_number
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_number): Path<String>,
) -> Result<Json<PublicBooking>, AppError> {
    let db = state.conn()?;
    let appointment = booking::find(&db, AppointmentRef::BookingNumber(&booking_number))?;
    Ok(Json(appointment.into()))
}

/// Runs a change on behalf of the customer who owns the booking.
fn as_customer<T>(
    state: &AppState,
    booking_number: &str,
    op: impl FnOnce(&mut Connection, &Mutation) -> Result<T, AppError>,
) -> Result<T, AppError> {
    let mut db = state.conn()?;
    let owner = booking::find(&db, AppointmentRef::BookingNumber(booking_number))?;
    let actor = Actor::new(ActorKind::Customer, owner.customer_id);
    op(
        &mut db,
        &Mutation {
            target: AppointmentRef::BookingNumber(booking_number),
            actor: &actor,
            clock: Clock::BusinessLocal,
            max_retries: state.config.reservation_max_retries,
        },
    )
}

fn respond(state: &AppState, outcome: Outcome) -> Json<PublicBooking> {
    state.events.publish(outcome.events);
    Json(outcome.appointment.into())
}

// POST /api/public/bookings/:booking_number/verify
#[derive(Deserialize)]
pub struct VerifyBody {
    pub code: String,
}

pub async fn verify(
    State(state): State<Arc<AppState>>,
    Path(booking_number): Path<String>,
    Json(body): Json<VerifyBody>,
) -> Result<Json<PublicBooking>, AppError> {
    let secret = state.config.verification_secret.clone();
    let mut attempt = as_customer(&state, &booking_number, |db, m| {
        booking::verify(db, m, &secret, &body.code)
    })?;
    // A refused code may still have released the hold; that event goes out either way.
    state.events.publish(std::mem::take(&mut attempt.outcome.events));
    attempt.into_result().map(|outcome| Json(outcome.appointment.into()))
}

// POST /api/public/bookings/:booking_number/cancel
#[derive(Deserialize, Default)]
pub struct CancelBody {
    pub reason: Option<String>,
}

pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(booking_number): Path<String>,
    body: Option<Json<CancelBody>>,
) -> Result<Json<PublicBooking>, AppError> {
    let Json(body) = body.unwrap_or_default();
    let outcome = as_customer(&state, &booking_number, |db, m| {
        booking::cancel(db, m, body.reason)
    })?;
    Ok(respond(&state, outcome))
}

// POST /api/public/bookings/:booking_number/reschedule
pub async fn reschedule(
    State(state): State<Arc<AppState>>,
    Path(booking_number): Path<String>,
    Json(req): Json<RescheduleRequest>,
) -> Result<Json<PublicBooking>, AppError> {
    let outcome = as_customer(&state, &booking_number, |db, m| {
        reschedule::reschedule(db, m, &req, true)
    })?;
    Ok(respond(&state, outcome))
}
