use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Deserialize;

use crate::db::queries::{self, AppointmentFilter};
use crate::errors::AppError;
use crate::models::{Appointment, AppointmentStatus, Clock, StatusChange};
use crate::services::booking::{
    self, AppointmentRef, Mutation, Outcome, ReservationRequest, ReserveOptions,
};
use crate::services::payment::{self, PaymentRequest};
use crate::services::reschedule::{self, RescheduleRequest};
use crate::state::AppState;

use super::staff_actor;

/// Runs one change on `/api/appointments/:id`, publishing its events after commit.
fn mutate(
    state: &AppState,
    headers: &HeaderMap,
    id: &str,
    op: impl FnOnce(&mut Connection, &Mutation) -> Result<Outcome, AppError>,
) -> Result<Json<Appointment>, AppError> {
    let actor = staff_actor(headers, state)?;
    let outcome = {
        let mut db = state.conn()?;
        op(
            &mut db,
            &Mutation {
                target: AppointmentRef::Id(id),
                actor: &actor,
                clock: Clock::BusinessLocal,
                max_retries: state.config.reservation_max_retries,
            },
        )?
    };
    state.events.publish(outcome.events);
    Ok(Json(outcome.appointment))
}

// POST /api/appointments
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ReservationRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let actor = staff_actor(&headers, &state)?;

    let outcome = {
        let mut db = state.conn()?;
        booking::reserve(
            &mut db,
            &req,
            &actor,
            &ReserveOptions {
                online: false,
                verification: None,
                max_retries: state.config.reservation_max_retries,
                clock: Clock::BusinessLocal,
            },
        )?
    };
    state.events.publish(outcome.events);

    Ok((StatusCode::CREATED, Json(outcome.appointment)))
}

// GET /api/appointments
#[derive(Deserialize)]
pub struct ListQuery {
    pub business_id: Option<String>,
    pub staff_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    staff_actor(&headers, &state)?;

    let status = query
        .status
        .as_deref()
        .map(|s| {
            AppointmentStatus::parse(s)
                .ok_or_else(|| AppError::validation(format!("unknown status: {s}")))
        })
        .transpose()?;

    let db = state.conn()?;
    let appointments = queries::list_appointments(
        &db,
        &AppointmentFilter {
            business_id: query.business_id.as_deref(),
            staff_id: query.staff_id.as_deref(),
            date: query.date,
            status,
            limit: query.limit.unwrap_or(50).clamp(1, 500),
        },
    )?;
    Ok(Json(appointments))
}

// GET /api/appointments/:id
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    staff_actor(&headers, &state)?;
    let db = state.conn()?;
    Ok(Json(booking::find(&db, AppointmentRef::Id(&id))?))
}

// GET /api/appointments/:id/history
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Vec<StatusChange>>, AppError> {
    staff_actor(&headers, &state)?;
    let db = state.conn()?;
    Ok(Json(booking::history(&db, AppointmentRef::Id(&id))?))
}

pub async fn confirm(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    mutate(&state, &headers, &id, booking::confirm)
}

pub async fn start(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    mutate(&state, &headers, &id, booking::start)
}

pub async fn complete(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    mutate(&state, &headers, &id, booking::complete)
}

pub async fn no_show(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    mutate(&state, &headers, &id, booking::mark_no_show)
}

#[derive(Deserialize, Default)]
pub struct CancelBody {
    pub reason: Option<String>,
}

pub async fn cancel(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Option<Json<CancelBody>>,
) -> Result<Json<Appointment>, AppError> {
    let Json(body) = body.unwrap_or_default();
    mutate(&state, &headers, &id, |db, m| booking::cancel(db, m, body.reason))
}

pub async fn reschedule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<RescheduleRequest>,
) -> Result<Json<Appointment>, AppError> {
    mutate(&state, &headers, &id, |db, m| {
        reschedule::reschedule(db, m, &req, false)
    })
}

#[derive(Deserialize)]
pub struct ReviewBody {
    pub rating: u8,
    pub review: Option<String>,
}

pub async fn review(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ReviewBody>,
) -> Result<Json<Appointment>, AppError> {
    mutate(&state, &headers, &id, |db, m| {
        booking::review(db, m, body.rating, body.review)
    })
}

pub async fn record_payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<PaymentRequest>,
) -> Result<Json<Appointment>, AppError> {
    mutate(&state, &headers, &id, |db, m| payment::record_payment(db, m, &req))
}

#[derive(Deserialize)]
pub struct AssignStaffBody {
    pub staff_id: Option<String>,
}

pub async fn assign_staff(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<AssignStaffBody>,
) -> Result<Json<Appointment>, AppError> {
    mutate(&state, &headers, &id, |db, m| {
        booking::assign_staff(db, m, body.staff_id)
    })
}
