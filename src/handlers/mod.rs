pub mod admin;
pub mod appointments;
pub mod availability;
pub mod calendar;
pub mod events;
pub mod health;
pub mod public;

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;

use crate::errors::AppError;
use crate::models::{Actor, ActorKind};
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        // staff and admin
        .route(
            "/api/admin/businesses/:id",
            get(admin::get_business).put(admin::put_business),
        )
        .route("/api/admin/businesses/:id/services", post(admin::upsert_service))
        .route("/api/admin/businesses/:id/staff", post(admin::upsert_staff))
        .route(
            "/api/businesses/:id/availability",
            get(availability::staff_availability),
        )
        .route(
            "/api/appointments",
            get(appointments::list_appointments).post(appointments::create_appointment),
        )
        .route("/api/appointments/:id", get(appointments::get_appointment))
        .route("/api/appointments/:id/history", get(appointments::get_history))
        .route("/api/appointments/:id/confirm", post(appointments::confirm))
        .route("/api/appointments/:id/start", post(appointments::start))
        .route("/api/appointments/:id/complete", post(appointments::complete))
        .route("/api/appointments/:id/cancel", post(appointments::cancel))
        .route("/api/appointments/:id/no-show", post(appointments::no_show))
        .route("/api/appointments/:id/reschedule", post(appointments::reschedule))
        .route("/api/appointments/:id/review", post(appointments::review))
        .route("/api/appointments/:id/payments", post(appointments::record_payment))
        .route("/api/appointments/:id/assign-staff", post(appointments::assign_staff))
        .route("/api/events", get(events::events_stream))
        // public, keyed by booking number
        .route(
            "/api/public/businesses/:id/availability",
            get(availability::public_availability),
        )
        .route("/api/public/businesses/:id/bookings", post(public::create_booking))
        .route("/api/public/bookings/:booking_number", get(public::get_booking))
        .route("/api/public/bookings/:booking_number/verify", post(public::verify))
        .route("/api/public/bookings/:booking_number/cancel", post(public::cancel))
        .route(
            "/api/public/bookings/:booking_number/reschedule",
            post(public::reschedule),
        )
        .route(
            "/api/public/bookings/:booking_number/ics",
            get(calendar::download_ics),
        )
        .with_state(state)
}

fn bearer_token(headers: &HeaderMap) -> &str {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("")
}

pub(crate) fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    if expected_token.is_empty() || bearer_token(headers) != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

/// Authenticates a staff-side request and names who is acting.
/// `X-Actor-Kind`/`X-Actor-Id` default to the admin.
pub(crate) fn staff_actor(headers: &HeaderMap, state: &AppState) -> Result<Actor, AppError> {
    check_auth(headers, &state.config.admin_token)?;

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let kind = match header("x-actor-kind") {
        Some(raw) => ActorKind::parse(raw)
            .ok_or_else(|| AppError::validation(format!("unknown actor kind: {raw}")))?,
        None => ActorKind::Admin,
    };
    let id = header("x-actor-id").unwrap_or("admin");
    Ok(Actor::new(kind, id))
}
