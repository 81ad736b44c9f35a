//! Fixtures shared by the service unit tests.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{
    Actor, ActorKind, Appointment, AppointmentStatus, BookingSource, Business, CancellationPolicy,
    Customer, PaymentStatus, ScheduleConfig, Service, Staff, TimeWindow, WorkingHours,
};

pub fn t(s: &str) -> NaiveTime {
    crate::models::schedule::parse_time(s).unwrap()
}

pub fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
}

pub fn every_day(start: &str, end: &str) -> WorkingHours {
    WorkingHours {
        slots: ["mon", "tue", "wed", "thu", "fri", "sat", "sun"]
            .iter()
            .map(|day| TimeWindow {
                day: day.to_string(),
                start: start.to_string(),
                end: end.to_string(),
            })
            .collect(),
    }
}

/// 09:00-18:00 every day, 30 minute grid, 15 minute buffer, bookable ten years out.
pub fn salon_schedule() -> ScheduleConfig {
    ScheduleConfig {
        working_hours: every_day("09:00", "18:00"),
        slot_duration: 30,
        buffer_time: 15,
        advance_booking_days: 3650,
        cancellation_policy: CancellationPolicy {
            min_cancellation_hours: 10,
            refund_percentage: 0,
            no_show_fee_percentage: 0,
        },
        ..ScheduleConfig::default()
    }
}

/// Business `biz-1` with service `svc-30`, staff `staff-1`/`staff-2` and customer `cust-1`.
pub fn seed_business(conn: &Connection) {
    seed_business_with(conn, salon_schedule());
}

pub fn seed_business_with(conn: &Connection, schedule: ScheduleConfig) {
    queries::upsert_business(
        conn,
        &Business {
            id: "biz-1".to_string(),
            name: "Cut & Colour".to_string(),
            utc_offset_minutes: 0,
            schedule,
        },
    )
    .unwrap();
    queries::upsert_service(
        conn,
        &Service {
            id: "svc-30".to_string(),
            business_id: "biz-1".to_string(),
            name: "Haircut".to_string(),
            duration_minutes: 30,
            price: 1000,
            active: true,
        },
    )
    .unwrap();
    for id in ["staff-1", "staff-2"] {
        queries::upsert_staff(
            conn,
            &Staff {
                id: id.to_string(),
                business_id: "biz-1".to_string(),
                name: id.to_uppercase(),
                active: true,
                working_hours: None,
            },
        )
        .unwrap();
    }
    queries::create_customer(
        conn,
        &Customer {
            id: "cust-1".to_string(),
            business_id: "biz-1".to_string(),
            name: "Alice".to_string(),
            phone: "+15551110000".to_string(),
            email: Some("alice@example.com".to_string()),
        },
    )
    .unwrap();
}

/// Unsaved appointment on 2024-06-01 10:00-10:30 worth 1000.
pub fn sample_appointment(
    id: &str,
    staff_id: Option<&str>,
    status: AppointmentStatus,
) -> Appointment {
    let created = dt("2024-05-20 12:00");
    Appointment {
        id: id.to_string(),
        booking_number: format!("BK-{id}"),
        business_id: "biz-1".to_string(),
        customer_id: "cust-1".to_string(),
        service_id: "svc-30".to_string(),
        staff_id: staff_id.map(str::to_string),
        appointment_date: d("2024-06-01"),
        start_time: t("10:00"),
        end_time: t("10:30"),
        duration_minutes: 30,
        status,
        source: BookingSource::Staff,
        notes: None,
        service_price: 1000,
        additional_charges: 0,
        discount: 0,
        tax: 0,
        total_amount: 1000,
        payment_status: PaymentStatus::Pending,
        paid_amount: 0,
        advance_amount: 0,
        cancellation_fee: 0,
        refund_amount: 0,
        created_by: Actor::new(ActorKind::Staff, "staff-1"),
        confirmation_sent: false,
        confirmed_at: None,
        verification_expires_at: None,
        verified_at: None,
        verification_attempts: 0,
        original_appointment_date: None,
        reschedule_count: 0,
        rescheduled_by: None,
        rescheduled_at: None,
        reschedule_reason: None,
        cancelled_by: None,
        cancelled_at: None,
        cancellation_reason: None,
        check_in_time: None,
        check_out_time: None,
        completed_at: None,
        actual_duration: None,
        rating: None,
        review: None,
        review_date: None,
        reminder_sent_at: None,
        created_at: created,
        updated_at: created,
    }
}

pub fn seed_appointment(
    conn: &Connection,
    id: &str,
    staff_id: &str,
    date: NaiveDate,
    start: &str,
    end: &str,
    status: AppointmentStatus,
) -> Appointment {
    let mut a = sample_appointment(id, Some(staff_id), status);
    a.appointment_date = date;
    a.start_time = t(start);
    a.end_time = t(end);
    a.duration_minutes = (a.end_time - a.start_time).num_minutes() as i32;
    queries::insert_appointment(conn, &a).unwrap();
    a
}
