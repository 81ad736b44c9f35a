use chrono::{NaiveDate, NaiveTime};
use rusqlite::Connection;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::slot::{hhmm, hhmm_opt};
use crate::models::EventKind;
use crate::services::booking::{self, Change, Mutation, Outcome};
use crate::services::catalog;
use crate::services::conflict::{self, Candidate};
use crate::services::lifecycle::{self, Event, NewSlot};

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleRequest {
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(default, with = "hhmm_opt")]
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Moves an appointment to a new slot, keeping the same record.
///
/// The new slot goes through the same checks as a fresh booking, excluding the
/// appointment itself from the conflict scan. On any failure the appointment is
/// left exactly as it was.
pub fn reschedule(
    conn: &mut Connection,
    m: &Mutation,
    req: &RescheduleRequest,
    online: bool,
) -> Result<Outcome, AppError> {
    booking::apply(conn, m, |tx, business, a, now| {
        lifecycle::ensure_allowed(a.status, Event::Reschedule)?;

        let end = booking::slot_end(req.start_time, a.duration_minutes, req.end_time)?;
        let staff = a
            .staff_id
            .as_deref()
            .map(|id| catalog::load_staff(tx, &business.id, id))
            .transpose()?;
        booking::check_bookable(
            &business.schedule,
            staff.as_ref(),
            req.date,
            req.start_time,
            end,
            online,
            now,
        )?;

        let candidate = Candidate {
            business_id: &business.id,
            staff_id: a.staff_id.as_deref(),
            date: req.date,
            start: req.start_time,
            end,
            exclude_id: Some(&a.id),
        };
        if let Some(existing) = conflict::find_conflict(tx, &candidate, &now)? {
            return Err(booking::slot_unavailable(&existing));
        }

        let from = (a.appointment_date, a.start_time);
        let steps = lifecycle::reschedule(
            a,
            NewSlot {
                date: req.date,
                start: req.start_time,
                end,
            },
            m.actor,
            req.reason.clone(),
            now,
        )?;

        tracing::info!(
            appointment_id = %a.id,
            from_date = %from.0,
            from_time = %from.1.format("%H:%M"),
            to_date = %a.appointment_date,
            to_time = %a.start_time.format("%H:%M"),
            status = %a.status,
            "appointment rescheduled"
        );
        Ok(Change::new(steps, vec![EventKind::Rescheduled]))
    })
}
