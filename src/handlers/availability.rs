use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::Slot;
use crate::services::availability::{self, AvailabilityQuery};
use crate::services::catalog;
use crate::state::AppState;

use super::check_auth;

#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
    pub staff_id: Option<String>,
    pub service_id: Option<String>,
}

// GET /api/businesses/:id/availability
pub async fn staff_availability(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(business_id): Path<String>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Vec<Slot>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    slots(&state, &business_id, &query, false).map(Json)
}

// GET /api/public/businesses/:id/availability
pub async fn public_availability(
    State(state): State<Arc<AppState>>,
    Path(business_id): Path<String>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Vec<Slot>>, AppError> {
    slots(&state, &business_id, &query, true).map(Json)
}

fn slots(
    state: &AppState,
    business_id: &str,
    query: &SlotsQuery,
    online: bool,
) -> Result<Vec<Slot>, AppError> {
    let db = state.conn()?;
    let business = catalog::load_business(&db, business_id)?;
    let now = business.local_now();
    availability::available_slots(
        &db,
        &business,
        &AvailabilityQuery {
            date: query.date,
            staff_id: query.staff_id.as_deref(),
            service_id: query.service_id.as_deref(),
            online,
        },
        now,
    )
}
