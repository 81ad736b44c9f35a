use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Business, Service, Staff};

pub fn load_business(conn: &Connection, id: &str) -> Result<Business, AppError> {
    queries::get_business(conn, id)?.ok_or_else(|| AppError::not_found(format!("business {id}")))
}

/// Service that belongs to `business_id` and is still offered.
pub fn load_service(conn: &Connection, business_id: &str, id: &str) -> Result<Service, AppError> {
    let service = queries::get_service(conn, id)?
        .filter(|s| s.business_id == business_id)
        .ok_or_else(|| AppError::not_found(format!("service {id}")))?;
    if !service.active {
        return Err(AppError::validation(format!("service {id} is not active")));
    }
    Ok(service)
}

pub fn load_staff(conn: &Connection, business_id: &str, id: &str) -> Result<Staff, AppError> {
    let staff = queries::get_staff(conn, id)?
        .filter(|s| s.business_id == business_id)
        .ok_or_else(|| AppError::not_found(format!("staff {id}")))?;
    if !staff.active {
        return Err(AppError::validation(format!("staff {id} is not active")));
    }
    Ok(staff)
}

pub fn save_business(conn: &Connection, business: &Business) -> Result<(), AppError> {
    if business.name.trim().is_empty() {
        return Err(AppError::validation("business name is required"));
    }
    business
        .schedule
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;
    queries::upsert_business(conn, business)?;
    tracing::info!(business_id = %business.id, "business saved");
    Ok(())
}

pub fn save_service(conn: &Connection, service: &Service) -> Result<(), AppError> {
    load_business(conn, &service.business_id)?;
    if service.duration_minutes <= 0 {
        return Err(AppError::validation("duration_minutes must be positive"));
    }
    if service.price < 0 {
        return Err(AppError::validation("price cannot be negative"));
    }
    queries::upsert_service(conn, service)?;
    tracing::info!(service_id = %service.id, business_id = %service.business_id, "service saved");
    Ok(())
}

pub fn save_staff(conn: &Connection, staff: &Staff) -> Result<(), AppError> {
    load_business(conn, &staff.business_id)?;
    if let Some(hours) = &staff.working_hours {
        hours.validate().map_err(|e| AppError::validation(e.to_string()))?;
    }
    queries::upsert_staff(conn, staff)?;
    tracing::info!(staff_id = %staff.id, business_id = %staff.business_id, "staff saved");
    Ok(())
}
