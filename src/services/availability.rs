use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Appointment, Business, ScheduleConfig, Slot, Staff};
use crate::services::catalog;
use crate::services::conflict::intervals_overlap;

#[derive(Debug, Clone)]
pub struct AvailabilityQuery<'a> {
    pub date: NaiveDate,
    pub staff_id: Option<&'a str>,
    pub service_id: Option<&'a str>,
    /// Public callers are subject to `allow_online_booking`.
    pub online: bool,
}

/// Bookable slots for one business day.
///
/// Candidates start at each opening time and step by `slot_duration + buffer_time`.
/// A candidate that collides with an existing appointment is reported unavailable and
/// the next candidate starts one buffer after the blocking appointment ends. Without a
/// staff member the whole business is treated as one resource.
pub fn available_slots(
    conn: &Connection,
    business: &Business,
    query: &AvailabilityQuery,
    now: NaiveDateTime,
) -> Result<Vec<Slot>, AppError> {
    let schedule = &business.schedule;
    let today = now.date();

    if query.date < today {
        return Err(AppError::InvalidDateRange(format!(
            "{} is in the past",
            query.date
        )));
    }

    let staff = query
        .staff_id
        .map(|id| catalog::load_staff(conn, &business.id, id))
        .transpose()?;
    let duration = match query.service_id {
        Some(id) => catalog::load_service(conn, &business.id, id)?.duration_minutes as i64,
        None => schedule.slot_duration,
    };

    if query.online && !schedule.allow_online_booking {
        return Ok(vec![]);
    }
    if schedule.is_closed_on(query.date)
        || last_bookable_day(schedule, today).is_some_and(|last| query.date > last)
    {
        return Ok(vec![]);
    }
    let (Some(length), Some(grid), Some(buffer)) = (
        Duration::try_minutes(duration),
        Duration::try_minutes(schedule.slot_duration),
        Duration::try_minutes(schedule.buffer_time),
    ) else {
        return Ok(vec![]);
    };

    let windows = opening_windows(schedule, staff.as_ref(), query.date);
    let existing = queries::get_active_appointments_for_day(
        conn,
        &business.id,
        query.staff_id,
        &query.date,
        &now,
    )?;

    let (earliest, latest) = advance_window(schedule, now);
    let slots = generate_slots(&windows, &existing, length, grid, buffer)
        .into_iter()
        .filter(|slot| {
            let starts_at = query.date.and_time(slot.start);
            starts_at >= earliest && latest.map_or(true, |l| starts_at <= l)
        })
        .collect();

    Ok(slots)
}

/// Staff hours win over business hours when the staff member has any.
pub fn opening_windows(
    schedule: &ScheduleConfig,
    staff: Option<&Staff>,
    date: NaiveDate,
) -> Vec<(NaiveTime, NaiveTime)> {
    match staff.and_then(|s| s.working_hours.as_ref()) {
        Some(hours) if !hours.slots.is_empty() => hours.windows_for(date),
        _ => schedule.working_hours.windows_for(date),
    }
}

/// Last date open for booking. `None` when the limit reaches past the calendar.
pub fn last_bookable_day(schedule: &ScheduleConfig, today: NaiveDate) -> Option<NaiveDate> {
    Duration::try_days(schedule.advance_booking_days)
        .and_then(|days| today.checked_add_signed(days))
}

/// Earliest and latest start allowed by the advance-booking settings.
pub fn advance_window(
    schedule: &ScheduleConfig,
    now: NaiveDateTime,
) -> (NaiveDateTime, Option<NaiveDateTime>) {
    let after = |hours: i64| Duration::try_hours(hours).and_then(|h| now.checked_add_signed(h));
    let earliest = after(schedule.min_advance_booking_hours).unwrap_or(NaiveDateTime::MAX);
    let latest = schedule.max_advance_booking_hours.and_then(after);
    (earliest, latest)
}

fn generate_slots(
    windows: &[(NaiveTime, NaiveTime)],
    existing: &[Appointment],
    length: Duration,
    grid: Duration,
    buffer: Duration,
) -> Vec<Slot> {
    let mut slots = vec![];

    for &(open, close) in windows {
        let mut cursor = open;
        loop {
            let Some(end) = add_within_day(cursor, length) else {
                break;
            };
            if end > close {
                break;
            }

            let blocking = existing
                .iter()
                .filter(|a| intervals_overlap(cursor, end, a.start_time, a.end_time))
                .map(|a| a.end_time)
                .max();

            slots.push(Slot {
                start: cursor,
                end,
                available: blocking.is_none(),
            });

            let next = match blocking {
                Some(blocked_until) => add_within_day(blocked_until, buffer),
                None => add_within_day(cursor, grid + buffer),
            };
            match next {
                Some(next) if next > cursor => cursor = next,
                _ => break,
            }
        }
    }

    slots
}

fn add_within_day(t: NaiveTime, d: Duration) -> Option<NaiveTime> {
    let (sum, wrapped) = t.overflowing_add_signed(d);
    (wrapped == 0).then_some(sum)
}
