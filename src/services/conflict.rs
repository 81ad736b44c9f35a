use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;

use crate::db::queries;
use crate::models::Appointment;

/// Half-open `[s1, e1)` / `[s2, e2)` overlap. Touching intervals do not overlap.
pub fn intervals_overlap(s1: NaiveTime, e1: NaiveTime, s2: NaiveTime, e2: NaiveTime) -> bool {
    s1 < e2 && s2 < e1
}

#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub business_id: &'a str,
    pub staff_id: Option<&'a str>,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// The appointment being moved, which must not conflict with itself.
    pub exclude_id: Option<&'a str>,
}

/// First slot-holding appointment that overlaps the candidate, if any.
///
/// A candidate without a staff member conflicts with nothing until one is attached.
pub fn find_conflict(
    conn: &Connection,
    candidate: &Candidate,
    now: &NaiveDateTime,
) -> anyhow::Result<Option<Appointment>> {
    let Some(staff_id) = candidate.staff_id else {
        return Ok(None);
    };

    let existing = queries::get_active_appointments_for_day(
        conn,
        candidate.business_id,
        Some(staff_id),
        &candidate.date,
        now,
    )?;

    Ok(first_overlap(&existing, candidate))
}

/// In-memory variant over an already-loaded day of appointments.
pub fn first_overlap(existing: &[Appointment], candidate: &Candidate) -> Option<Appointment> {
    existing
        .iter()
        .filter(|a| Some(a.id.as_str()) != candidate.exclude_id)
        .filter(|a| a.status.is_active())
        .filter(|a| candidate.staff_id.is_some() && a.staff_id.as_deref() == candidate.staff_id)
        .find(|a| intervals_overlap(candidate.start, candidate.end, a.start_time, a.end_time))
        .cloned()
}
