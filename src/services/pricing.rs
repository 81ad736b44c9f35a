use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::CancellationPolicy;

/// Caller-supplied price adjustments. Anything left `None` falls back to the service price or zero.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceOverrides {
    pub service_price: Option<i64>,
    pub additional_charges: Option<i64>,
    pub discount: Option<i64>,
    pub tax: Option<i64>,
    /// Trusted as-is when present.
    pub total_amount: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub service_price: i64,
    pub additional_charges: i64,
    pub discount: i64,
    pub tax: i64,
    pub total_amount: i64,
}

pub fn quote(list_price: i64, overrides: &PriceOverrides) -> Result<Quote, AppError> {
    let service_price = overrides.service_price.unwrap_or(list_price);
    let additional_charges = overrides.additional_charges.unwrap_or(0);
    let discount = overrides.discount.unwrap_or(0);
    let tax = overrides.tax.unwrap_or(0);

    for (name, value) in [
        ("service_price", service_price),
        ("additional_charges", additional_charges),
        ("discount", discount),
        ("tax", tax),
    ] {
        if value < 0 {
            return Err(AppError::validation(format!("{name} cannot be negative")));
        }
    }

    let total_amount = match overrides.total_amount {
        Some(total) => total,
        None => service_price
            .checked_add(additional_charges)
            .and_then(|sum| sum.checked_sub(discount))
            .and_then(|sum| sum.checked_add(tax))
            .ok_or_else(|| AppError::validation("amounts are too large"))?,
    };
    if total_amount < 0 {
        return Err(AppError::validation("total amount cannot be negative"));
    }

    Ok(Quote {
        service_price,
        additional_charges,
        discount,
        tax,
        total_amount,
    })
}

/// Whether cancelling at `now` falls inside the charged notice window.
/// Exactly `min_cancellation_hours` of notice counts as on time.
pub fn is_late_cancellation(
    policy: &CancellationPolicy,
    starts_at: NaiveDateTime,
    now: NaiveDateTime,
) -> bool {
    let notice = starts_at - now;
    // a window too wide to represent covers any notice
    chrono::Duration::try_hours(policy.min_cancellation_hours).map_or(true, |min| notice < min)
}

pub fn cancellation_fee(
    policy: &CancellationPolicy,
    total_amount: i64,
    starts_at: NaiveDateTime,
    now: NaiveDateTime,
) -> i64 {
    if !is_late_cancellation(policy, starts_at, now) {
        return 0;
    }
    percentage_of(total_amount, 100 - policy.refund_percentage.min(100) as i64)
}

pub fn no_show_fee(policy: &CancellationPolicy, total_amount: i64) -> i64 {
    percentage_of(total_amount, policy.no_show_fee_percentage.min(100) as i64)
}

/// Money handed back after a fee is kept out of what was already paid.
pub fn refund_amount(paid_amount: i64, fee: i64) -> i64 {
    paid_amount.saturating_sub(fee).max(0)
}

fn percentage_of(amount: i64, pct: i64) -> i64 {
    let share = i128::from(amount) * i128::from(pct) / 100;
    share.clamp(0, i128::from(amount.max(0))) as i64
}
