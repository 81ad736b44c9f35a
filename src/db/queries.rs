use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    Actor, ActorKind, Appointment, AppointmentEvent, AppointmentStatus, BookingSource, Business,
    Customer, PaymentStatus, ScheduleConfig, Service, Staff, StatusChange, WorkingHours,
};

const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M";
const TS_FMT: &str = "%Y-%m-%d %H:%M:%S";

fn fmt_date(d: &NaiveDate) -> String {
    d.format(DATE_FMT).to_string()
}

fn fmt_time(t: &NaiveTime) -> String {
    t.format(TIME_FMT).to_string()
}

fn fmt_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FMT).to_string()
}

fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FMT).with_context(|| format!("bad date in store: {s}"))
}

fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(s, TIME_FMT).with_context(|| format!("bad time in store: {s}"))
}

fn parse_ts(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TS_FMT).with_context(|| format!("bad timestamp in store: {s}"))
}

fn parse_opt_ts(s: Option<String>) -> anyhow::Result<Option<NaiveDateTime>> {
    s.as_deref().map(parse_ts).transpose()
}

fn parse_actor(kind: Option<String>, id: Option<String>) -> anyhow::Result<Option<Actor>> {
    match (kind, id) {
        (Some(kind), Some(id)) => {
            let kind = ActorKind::parse(&kind)
                .with_context(|| format!("unknown actor kind in store: {kind}"))?;
            Ok(Some(Actor { kind, id }))
        }
        _ => Ok(None),
    }
}

// ── Businesses ──

pub fn upsert_business(conn: &Connection, business: &Business) -> anyhow::Result<()> {
    let schedule = serde_json::to_string(&business.schedule)?;
    conn.execute(
        "INSERT INTO businesses (id, name, utc_offset_minutes, schedule)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
           name = excluded.name,
           utc_offset_minutes = excluded.utc_offset_minutes,
           schedule = excluded.schedule,
           updated_at = datetime('now')",
        params![business.id, business.name, business.utc_offset_minutes, schedule],
    )?;
    Ok(())
}

pub fn get_business(conn: &Connection, id: &str) -> anyhow::Result<Option<Business>> {
    let row = conn
        .query_row(
            "SELECT id, name, utc_offset_minutes, schedule FROM businesses WHERE id = ?1",
            params![id],
            business_columns,
        )
        .optional()?;

    row.map(business_from_columns).transpose()
}

pub fn list_businesses(conn: &Connection) -> anyhow::Result<Vec<Business>> {
    let mut stmt =
        conn.prepare("SELECT id, name, utc_offset_minutes, schedule FROM businesses ORDER BY id")?;
    let rows = stmt.query_map([], business_columns)?;

    let mut businesses = vec![];
    for row in rows {
        businesses.push(business_from_columns(row?)?);
    }
    Ok(businesses)
}

type BusinessColumns = (String, String, i32, String);

fn business_columns(row: &rusqlite::Row) -> rusqlite::Result<BusinessColumns> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn business_from_columns(
    (id, name, utc_offset_minutes, schedule_json): BusinessColumns,
) -> anyhow::Result<Business> {
    let schedule: ScheduleConfig = serde_json::from_str(&schedule_json)
        .with_context(|| format!("bad schedule config for business {id}"))?;
    Ok(Business {
        id,
        name,
        utc_offset_minutes,
        schedule,
    })
}

// ── Services ──

pub fn upsert_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, business_id, name, duration_minutes, price, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
           name = excluded.name,
           duration_minutes = excluded.duration_minutes,
           price = excluded.price,
           active = excluded.active",
        params![
            service.id,
            service.business_id,
            service.name,
            service.duration_minutes,
            service.price,
            service.active as i32,
        ],
    )?;
    Ok(())
}

pub fn get_service(conn: &Connection, id: &str) -> anyhow::Result<Option<Service>> {
    let service = conn
        .query_row(
            "SELECT id, business_id, name, duration_minutes, price, active FROM services WHERE id = ?1",
            params![id],
            |row| {
                Ok(Service {
                    id: row.get(0)?,
                    business_id: row.get(1)?,
                    name: row.get(2)?,
                    duration_minutes: row.get(3)?,
                    price: row.get(4)?,
                    active: row.get::<_, i32>(5)? != 0,
                })
            },
        )
        .optional()?;
    Ok(service)
}

// ── Staff ──

pub fn upsert_staff(conn: &Connection, staff: &Staff) -> anyhow::Result<()> {
    let hours = staff
        .working_hours
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    conn.execute(
        "INSERT INTO staff (id, business_id, name, active, working_hours)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
           name = excluded.name,
           active = excluded.active,
           working_hours = excluded.working_hours",
        params![staff.id, staff.business_id, staff.name, staff.active as i32, hours],
    )?;
    Ok(())
}

pub fn get_staff(conn: &Connection, id: &str) -> anyhow::Result<Option<Staff>> {
    let row = conn
        .query_row(
            "SELECT id, business_id, name, active, working_hours FROM staff WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i32>(3)? != 0,
                    row.get::<_, Option<String>>(4)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((id, business_id, name, active, hours)) => Ok(Some(Staff {
            id,
            business_id,
            name,
            active,
            working_hours: hours.as_deref().map(WorkingHours::from_json).transpose()?,
        })),
        None => Ok(None),
    }
}

// ── Customers ──

pub fn find_customer_by_phone(
    conn: &Connection,
    business_id: &str,
    phone: &str,
) -> anyhow::Result<Option<Customer>> {
    let customer = conn
        .query_row(
            "SELECT id, business_id, name, phone, email FROM customers
             WHERE business_id = ?1 AND phone = ?2",
            params![business_id, phone],
            parse_customer_row,
        )
        .optional()?;
    Ok(customer)
}

pub fn get_customer(conn: &Connection, id: &str) -> anyhow::Result<Option<Customer>> {
    let customer = conn
        .query_row(
            "SELECT id, business_id, name, phone, email FROM customers WHERE id = ?1",
            params![id],
            parse_customer_row,
        )
        .optional()?;
    Ok(customer)
}

pub fn create_customer(conn: &Connection, customer: &Customer) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO customers (id, business_id, name, phone, email) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            customer.id,
            customer.business_id,
            customer.name,
            customer.phone,
            customer.email,
        ],
    )?;
    Ok(())
}

fn parse_customer_row(row: &rusqlite::Row) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: row.get(0)?,
        business_id: row.get(1)?,
        name: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
    })
}

// ── Appointments ──

const APPOINTMENT_COLUMNS: &str = "id, booking_number, business_id, customer_id, service_id, staff_id, \
     appointment_date, start_time, end_time, duration_minutes, status, source, notes, \
     service_price, additional_charges, discount, tax, total_amount, payment_status, paid_amount, \
     advance_amount, cancellation_fee, refund_amount, created_by_kind, created_by_id, \
     confirmation_sent, confirmed_at, verification_expires_at, verified_at, \
     original_appointment_date, reschedule_count, rescheduled_by_kind, rescheduled_by_id, \
     rescheduled_at, reschedule_reason, cancelled_by_kind, cancelled_by_id, cancelled_at, \
     cancellation_reason, check_in_time, check_out_time, completed_at, actual_duration, \
     rating, review, review_date, reminder_sent_at, created_at, updated_at, verification_attempts";

pub fn insert_appointment(conn: &Connection, a: &Appointment) -> anyhow::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO appointments ({APPOINTMENT_COLUMNS}) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30, ?31, ?32,
                ?33, ?34, ?35, ?36, ?37, ?38, ?39, ?40, ?41, ?42, ?43, ?44, ?45, ?46, ?47,
                ?48, ?49, ?50)"
        ),
        rusqlite::params_from_iter(appointment_values(a)),
    )?;
    Ok(())
}

/// Writes every mutable column of an existing appointment.
pub fn update_appointment(conn: &Connection, a: &Appointment) -> anyhow::Result<bool> {
    let mut values = appointment_values(a);
    // id goes last for the WHERE clause
    let id = values.remove(0);
    values.push(id);

    let count = conn.execute(
        "UPDATE appointments SET
            booking_number = ?1, business_id = ?2, customer_id = ?3, service_id = ?4,
            staff_id = ?5, appointment_date = ?6, start_time = ?7, end_time = ?8,
            duration_minutes = ?9, status = ?10, source = ?11, notes = ?12,
            service_price = ?13, additional_charges = ?14, discount = ?15, tax = ?16,
            total_amount = ?17, payment_status = ?18, paid_amount = ?19, advance_amount = ?20,
            cancellation_fee = ?21, refund_amount = ?22, created_by_kind = ?23,
            created_by_id = ?24, confirmation_sent = ?25, confirmed_at = ?26,
            verification_expires_at = ?27, verified_at = ?28, original_appointment_date = ?29,
            reschedule_count = ?30, rescheduled_by_kind = ?31, rescheduled_by_id = ?32,
            rescheduled_at = ?33, reschedule_reason = ?34, cancelled_by_kind = ?35,
            cancelled_by_id = ?36, cancelled_at = ?37, cancellation_reason = ?38,
            check_in_time = ?39, check_out_time = ?40, completed_at = ?41,
            actual_duration = ?42, rating = ?43, review = ?44, review_date = ?45,
            reminder_sent_at = ?46, created_at = ?47, updated_at = ?48,
            verification_attempts = ?49
         WHERE id = ?50",
        rusqlite::params_from_iter(values),
    )?;
    Ok(count > 0)
}

fn appointment_values(a: &Appointment) -> Vec<rusqlite::types::Value> {
    use rusqlite::types::Value;

    fn text(s: impl Into<String>) -> Value {
        Value::Text(s.into())
    }
    fn opt_text(s: Option<String>) -> Value {
        s.map(Value::Text).unwrap_or(Value::Null)
    }
    fn int(i: i64) -> Value {
        Value::Integer(i)
    }
    fn opt_int(i: Option<i64>) -> Value {
        i.map(Value::Integer).unwrap_or(Value::Null)
    }
    fn opt_ts(ts: &Option<NaiveDateTime>) -> Value {
        opt_text(ts.as_ref().map(fmt_ts))
    }

    vec![
        text(a.id.clone()),
        text(a.booking_number.clone()),
        text(a.business_id.clone()),
        text(a.customer_id.clone()),
        text(a.service_id.clone()),
        opt_text(a.staff_id.clone()),
        text(fmt_date(&a.appointment_date)),
        text(fmt_time(&a.start_time)),
        text(fmt_time(&a.end_time)),
        int(a.duration_minutes as i64),
        text(a.status.as_str()),
        text(a.source.as_str()),
        opt_text(a.notes.clone()),
        int(a.service_price),
        int(a.additional_charges),
        int(a.discount),
        int(a.tax),
        int(a.total_amount),
        text(a.payment_status.as_str()),
        int(a.paid_amount),
        int(a.advance_amount),
        int(a.cancellation_fee),
        int(a.refund_amount),
        text(a.created_by.kind.as_str()),
        text(a.created_by.id.clone()),
        int(a.confirmation_sent as i64),
        opt_ts(&a.confirmed_at),
        opt_ts(&a.verification_expires_at),
        opt_ts(&a.verified_at),
        opt_text(a.original_appointment_date.as_ref().map(fmt_date)),
        int(a.reschedule_count as i64),
        opt_text(a.rescheduled_by.as_ref().map(|x| x.kind.as_str().to_string())),
        opt_text(a.rescheduled_by.as_ref().map(|x| x.id.clone())),
        opt_ts(&a.rescheduled_at),
        opt_text(a.reschedule_reason.clone()),
        opt_text(a.cancelled_by.as_ref().map(|x| x.kind.as_str().to_string())),
        opt_text(a.cancelled_by.as_ref().map(|x| x.id.clone())),
        opt_ts(&a.cancelled_at),
        opt_text(a.cancellation_reason.clone()),
        opt_ts(&a.check_in_time),
        opt_ts(&a.check_out_time),
        opt_ts(&a.completed_at),
        opt_int(a.actual_duration.map(i64::from)),
        opt_int(a.rating.map(i64::from)),
        opt_text(a.review.clone()),
        opt_ts(&a.review_date),
        opt_ts(&a.reminder_sent_at),
        text(fmt_ts(&a.created_at)),
        text(fmt_ts(&a.updated_at)),
        int(a.verification_attempts as i64),
    ]
}

pub fn get_appointment_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Appointment>> {
    let result = conn
        .query_row(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
            params![id],
            |row| Ok(parse_appointment_row(row)),
        )
        .optional()?;
    result.transpose()
}

pub fn get_appointment_by_booking_number(
    conn: &Connection,
    booking_number: &str,
) -> anyhow::Result<Option<Appointment>> {
    let result = conn
        .query_row(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE booking_number = ?1"),
            params![booking_number],
            |row| Ok(parse_appointment_row(row)),
        )
        .optional()?;
    result.transpose()
}

/// Slot-holding appointments for one business and day, optionally narrowed to one staff member.
/// Unverified public holds past their expiry are left out.
pub fn get_active_appointments_for_day(
    conn: &Connection,
    business_id: &str,
    staff_id: Option<&str>,
    date: &NaiveDate,
    now: &NaiveDateTime,
) -> anyhow::Result<Vec<Appointment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE business_id = ?1
           AND appointment_date = ?2
           AND (?3 IS NULL OR staff_id = ?3)
           AND status IN ('pending', 'confirmed', 'in_progress')
           AND NOT (status = 'pending' AND verified_at IS NULL
                    AND verification_expires_at IS NOT NULL
                    AND verification_expires_at <= ?4)
         ORDER BY start_time ASC"
    ))?;

    let rows = stmt.query_map(
        params![business_id, fmt_date(date), staff_id, fmt_ts(now)],
        |row| Ok(parse_appointment_row(row)),
    )?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

pub struct AppointmentFilter<'a> {
    pub business_id: Option<&'a str>,
    pub staff_id: Option<&'a str>,
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
    pub limit: i64,
}

pub fn list_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> anyhow::Result<Vec<Appointment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE (?1 IS NULL OR business_id = ?1)
           AND (?2 IS NULL OR staff_id = ?2)
           AND (?3 IS NULL OR appointment_date = ?3)
           AND (?4 IS NULL OR status = ?4)
         ORDER BY appointment_date DESC, start_time DESC
         LIMIT ?5"
    ))?;

    let rows = stmt.query_map(
        params![
            filter.business_id,
            filter.staff_id,
            filter.date.as_ref().map(fmt_date),
            filter.status.map(|s| s.as_str()),
            filter.limit,
        ],
        |row| Ok(parse_appointment_row(row)),
    )?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

/// Pending public holds of one business whose verification window has closed.
pub fn get_expired_holds(
    conn: &Connection,
    business_id: &str,
    now: &NaiveDateTime,
) -> anyhow::Result<Vec<Appointment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE business_id = ?1
           AND status = 'pending'
           AND verified_at IS NULL
           AND verification_expires_at IS NOT NULL
           AND verification_expires_at <= ?2"
    ))?;

    let rows = stmt.query_map(params![business_id, fmt_ts(now)], |row| {
        Ok(parse_appointment_row(row))
    })?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

/// Confirmed appointments of one business starting in `[from, until]` that have not been
/// reminded yet.
pub fn get_due_reminders(
    conn: &Connection,
    business_id: &str,
    from: &NaiveDateTime,
    until: &NaiveDateTime,
) -> anyhow::Result<Vec<Appointment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE business_id = ?1
           AND status = 'confirmed'
           AND reminder_sent_at IS NULL
           AND (appointment_date || ' ' || start_time || ':00') BETWEEN ?2 AND ?3
         ORDER BY appointment_date ASC, start_time ASC"
    ))?;

    let rows = stmt.query_map(params![business_id, fmt_ts(from), fmt_ts(until)], |row| {
        Ok(parse_appointment_row(row))
    })?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

pub fn mark_reminder_sent(conn: &Connection, id: &str, at: &NaiveDateTime) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE appointments SET reminder_sent_at = ?1 WHERE id = ?2",
        params![fmt_ts(at), id],
    )?;
    Ok(())
}

fn parse_appointment_row(row: &rusqlite::Row) -> anyhow::Result<Appointment> {
    let status_str: String = row.get(10)?;
    let status = AppointmentStatus::parse(&status_str)
        .with_context(|| format!("unknown appointment status in store: {status_str}"))?;

    let created_by = parse_actor(row.get(23)?, row.get(24)?)?
        .context("appointment row without creator")?;

    Ok(Appointment {
        id: row.get(0)?,
        booking_number: row.get(1)?,
        business_id: row.get(2)?,
        customer_id: row.get(3)?,
        service_id: row.get(4)?,
        staff_id: row.get(5)?,
        appointment_date: parse_date(&row.get::<_, String>(6)?)?,
        start_time: parse_time(&row.get::<_, String>(7)?)?,
        end_time: parse_time(&row.get::<_, String>(8)?)?,
        duration_minutes: row.get(9)?,
        status,
        source: BookingSource::parse(&row.get::<_, String>(11)?),
        notes: row.get(12)?,
        service_price: row.get(13)?,
        additional_charges: row.get(14)?,
        discount: row.get(15)?,
        tax: row.get(16)?,
        total_amount: row.get(17)?,
        payment_status: PaymentStatus::parse(&row.get::<_, String>(18)?),
        paid_amount: row.get(19)?,
        advance_amount: row.get(20)?,
        cancellation_fee: row.get(21)?,
        refund_amount: row.get(22)?,
        created_by,
        confirmation_sent: row.get::<_, i32>(25)? != 0,
        confirmed_at: parse_opt_ts(row.get(26)?)?,
        verification_expires_at: parse_opt_ts(row.get(27)?)?,
        verified_at: parse_opt_ts(row.get(28)?)?,
        verification_attempts: row.get(49)?,
        original_appointment_date: row
            .get::<_, Option<String>>(29)?
            .as_deref()
            .map(parse_date)
            .transpose()?,
        reschedule_count: row.get(30)?,
        rescheduled_by: parse_actor(row.get(31)?, row.get(32)?)?,
        rescheduled_at: parse_opt_ts(row.get(33)?)?,
        reschedule_reason: row.get(34)?,
        cancelled_by: parse_actor(row.get(35)?, row.get(36)?)?,
        cancelled_at: parse_opt_ts(row.get(37)?)?,
        cancellation_reason: row.get(38)?,
        check_in_time: parse_opt_ts(row.get(39)?)?,
        check_out_time: parse_opt_ts(row.get(40)?)?,
        completed_at: parse_opt_ts(row.get(41)?)?,
        actual_duration: row.get(42)?,
        rating: row.get::<_, Option<i64>>(43)?.map(|r| r as u8),
        review: row.get(44)?,
        review_date: parse_opt_ts(row.get(45)?)?,
        reminder_sent_at: parse_opt_ts(row.get(46)?)?,
        created_at: parse_ts(&row.get::<_, String>(47)?)?,
        updated_at: parse_ts(&row.get::<_, String>(48)?)?,
    })
}

// ── Status History ──

pub fn insert_status_change(conn: &Connection, change: &StatusChange) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO appointment_history (appointment_id, from_status, to_status, actor_kind, actor_id, note, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            change.appointment_id,
            change.from_status.map(|s| s.as_str()),
            change.to_status.as_str(),
            change.actor.kind.as_str(),
            change.actor.id,
            change.note,
            fmt_ts(&change.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_status_history(
    conn: &Connection,
    appointment_id: &str,
) -> anyhow::Result<Vec<StatusChange>> {
    let mut stmt = conn.prepare(
        "SELECT appointment_id, from_status, to_status, actor_kind, actor_id, note, created_at
         FROM appointment_history WHERE appointment_id = ?1 ORDER BY id ASC",
    )?;

    let rows = stmt.query_map(params![appointment_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
            row.get::<_, String>(6)?,
        ))
    })?;

    let mut changes = vec![];
    for row in rows {
        let (appointment_id, from, to, actor_kind, actor_id, note, created_at) = row?;
        let to_status = AppointmentStatus::parse(&to)
            .with_context(|| format!("unknown status in history: {to}"))?;
        changes.push(StatusChange {
            appointment_id,
            from_status: from.as_deref().and_then(AppointmentStatus::parse),
            to_status,
            actor: parse_actor(Some(actor_kind), Some(actor_id))?
                .context("history row without actor")?,
            note,
            created_at: parse_ts(&created_at)?,
        });
    }
    Ok(changes)
}

// ── Booking Numbers ──

/// Next value of the per-day booking counter. Call inside the reservation transaction.
pub fn next_booking_sequence(conn: &Connection, day: &NaiveDate) -> anyhow::Result<i64> {
    let day = day.format("%Y%m%d").to_string();
    conn.execute(
        "INSERT INTO booking_counters (day, last_value) VALUES (?1, 1)
         ON CONFLICT(day) DO UPDATE SET last_value = last_value + 1",
        params![day],
    )?;
    let value: i64 = conn.query_row(
        "SELECT last_value FROM booking_counters WHERE day = ?1",
        params![day],
        |row| row.get(0),
    )?;
    Ok(value)
}

// ── Outbox ──

pub fn insert_outbox_event(conn: &Connection, event: &AppointmentEvent) -> anyhow::Result<i64> {
    let payload = serde_json::to_string(event)?;
    conn.execute(
        "INSERT INTO outbox_events (kind, appointment_id, payload) VALUES (?1, ?2, ?3)",
        params![event.kind.as_str(), event.appointment_id, payload],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Drops outbox rows written before `before` (UTC). Returns how many went.
pub fn prune_outbox_events(conn: &Connection, before: &NaiveDateTime) -> anyhow::Result<usize> {
    let count = conn.execute(
        "DELETE FROM outbox_events WHERE created_at < ?1",
        params![fmt_ts(before)],
    )?;
    Ok(count)
}

pub fn get_outbox_events_since(
    conn: &Connection,
    since_id: i64,
) -> anyhow::Result<Vec<AppointmentEvent>> {
    let mut stmt = conn.prepare(
        "SELECT id, payload FROM outbox_events WHERE id > ?1 ORDER BY id ASC",
    )?;

    let rows = stmt.query_map(params![since_id], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut events = vec![];
    for row in rows {
        let (id, payload) = row?;
        let mut event: AppointmentEvent = serde_json::from_str(&payload)?;
        event.id = id;
        events.push(event);
    }
    Ok(events)
}
