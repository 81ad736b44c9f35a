use crate::models::{Appointment, AppointmentStatus};

const ICS_TS: &str = "%Y%m%dT%H%M%S";

/// Single-event iCalendar file for an appointment, in business wall-clock time.
pub fn appointment_ics(
    appointment: &Appointment,
    business_name: &str,
    service_name: &str,
) -> String {
    let dtstart = appointment.starts_at().format(ICS_TS);
    let dtend = appointment.ends_at().format(ICS_TS);
    let dtstamp = appointment.updated_at.format(ICS_TS);
    let uid = format!("{}@salonbook", appointment.id);

    let summary = escape(&format!("{service_name} at {business_name}"));
    let description = escape(&format!(
        "Booking {}{}",
        appointment.booking_number,
        appointment
            .notes
            .as_deref()
            .map(|n| format!("\n{n}"))
            .unwrap_or_default()
    ));
    let status = match appointment.status {
        AppointmentStatus::Confirmed
        | AppointmentStatus::InProgress
        | AppointmentStatus::Completed => "CONFIRMED",
        AppointmentStatus::Cancelled | AppointmentStatus::NoShow => "CANCELLED",
        AppointmentStatus::Pending | AppointmentStatus::Rescheduled => "TENTATIVE",
    };

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Salonbook//Appointments//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         SEQUENCE:{sequence}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         STATUS:{status}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n",
        sequence = appointment.reschedule_count,
    )
}

/// RFC 5545 TEXT escaping.
fn escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}
