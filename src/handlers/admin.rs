use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Business, ScheduleConfig, Service, Staff, WorkingHours};
use crate::services::catalog;
use crate::state::AppState;

use super::check_auth;

// GET /api/admin/businesses/:id
pub async fn get_business(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Business>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let db = state.conn()?;
    Ok(Json(catalog::load_business(&db, &id)?))
}

// PUT /api/admin/businesses/:id
#[derive(Deserialize)]
pub struct BusinessBody {
    pub name: String,
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

pub async fn put_business(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<BusinessBody>,
) -> Result<Json<Business>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let business = Business {
        id,
        name: body.name,
        utc_offset_minutes: body.utc_offset_minutes,
        schedule: body.schedule,
    };
    let db = state.conn()?;
    catalog::save_business(&db, &business)?;
    Ok(Json(business))
}

// POST /api/admin/businesses/:id/services
#[derive(Deserialize)]
pub struct ServiceBody {
    pub id: Option<String>,
    pub name: String,
    pub duration_minutes: i32,
    pub price: i64,
    #[serde(default = "default_active")]
    pub active: bool,
}

pub async fn upsert_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(business_id): Path<String>,
    Json(body): Json<ServiceBody>,
) -> Result<Json<Service>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let service = Service {
        id: body.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        business_id,
        name: body.name,
        duration_minutes: body.duration_minutes,
        price: body.price,
        active: body.active,
    };
    let db = state.conn()?;
    catalog::save_service(&db, &service)?;
    Ok(Json(service))
}

// POST /api/admin/businesses/:id/staff
#[derive(Deserialize)]
pub struct StaffBody {
    pub id: Option<String>,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub working_hours: Option<WorkingHours>,
}

pub async fn upsert_staff(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(business_id): Path<String>,
    Json(body): Json<StaffBody>,
) -> Result<Json<Staff>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let staff = Staff {
        id: body.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        business_id,
        name: body.name,
        active: body.active,
        working_hours: body.working_hours,
    };
    let db = state.conn()?;
    catalog::save_staff(&db, &staff)?;
    Ok(Json(staff))
}

fn default_active() -> bool {
    true
}
