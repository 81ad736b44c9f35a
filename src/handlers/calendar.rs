use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::db::queries;
use crate::errors::AppError;
use crate::services::booking::{self, AppointmentRef};
use crate::services::calendar::appointment_ics;
use crate::state::AppState;

// GET /api/public/bookings/:booking_number/ics
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> Result<Response, AppError> {
    let booking_number = raw.strip_suffix(".ics").unwrap_or(&raw);

    let (appointment, business_name, service_name) = {
        let db = state.conn()?;
        let appointment = booking::find(&db, AppointmentRef::BookingNumber(booking_number))?;
        let business_name = queries::get_business(&db, &appointment.business_id)?
            .map(|b| b.name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Appointment".to_string());
        let service_name = queries::get_service(&db, &appointment.service_id)?
            .map(|s| s.name)
            .unwrap_or_default();
        (appointment, business_name, service_name)
    };

    let ics = appointment_ics(&appointment, &business_name, &service_name);
    let filename = format!("{}.ics", appointment.booking_number);

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response())
}
