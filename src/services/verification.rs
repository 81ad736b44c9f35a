use chrono::NaiveDateTime;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::errors::AppError;
use crate::models::{Appointment, AppointmentStatus};

const CODE_DIGITS: u32 = 6;

/// Wrong codes accepted before the hold is given up.
pub const MAX_ATTEMPTS: i32 = 5;

/// Six-digit one-time code for a public booking, HOTP-style over the appointment id.
pub fn verification_code(secret: &str, appointment_id: &str) -> Result<String, AppError> {
    let mut mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("invalid verification secret: {e}")))?;
    mac.update(appointment_id.as_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = ((digest[offset] as u32 & 0x7f) << 24)
        | ((digest[offset + 1] as u32) << 16)
        | ((digest[offset + 2] as u32) << 8)
        | digest[offset + 3] as u32;

    Ok(format!(
        "{:0width$}",
        binary % 10u32.pow(CODE_DIGITS),
        width = CODE_DIGITS as usize
    ))
}

pub fn attempts_exhausted(a: &Appointment) -> bool {
    a.verification_attempts >= MAX_ATTEMPTS
}

/// Marks a held booking as verified when `supplied` matches.
///
/// A mismatch counts against the booking. The caller has to persist the counter even
/// though an error comes back, and release the hold once [`attempts_exhausted`] says so.
pub fn verify(
    a: &mut Appointment,
    secret: &str,
    supplied: &str,
    now: NaiveDateTime,
) -> Result<(), AppError> {
    if a.verified_at.is_some() {
        return Err(AppError::validation("booking is already verified"));
    }
    if a.status != AppointmentStatus::Pending || !a.awaiting_verification() {
        return Err(AppError::InvalidTransition {
            from: a.status,
            event: "verify",
        });
    }
    if a.hold_expired(now) {
        return Err(AppError::policy("verification window expired"));
    }
    if attempts_exhausted(a) {
        return Err(AppError::policy("too many incorrect verification codes"));
    }
    if supplied.trim() != verification_code(secret, &a.id)? {
        a.verification_attempts += 1;
        a.updated_at = now;
        if attempts_exhausted(a) {
            return Err(AppError::policy(
                "too many incorrect verification codes, the booking was released",
            ));
        }
        return Err(AppError::validation(format!(
            "incorrect verification code, {} attempts left",
            MAX_ATTEMPTS - a.verification_attempts
        )));
    }

    a.verified_at = Some(now);
    a.verification_expires_at = None;
    a.updated_at = now;
    Ok(())
}
