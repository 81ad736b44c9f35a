use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveDateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{AppointmentEvent, Clock, EventKind};
use crate::services::booking;
use crate::services::events;
use crate::state::AppState;

#[derive(Debug, Clone, Copy)]
pub struct SweepSettings {
    pub reminder_lead: Duration,
    /// Outbox rows older than this are deleted.
    pub outbox_retention: Duration,
}

/// One pass over every business: release expired holds, then flag upcoming reminders.
/// Old outbox rows are pruned at the end.
pub fn sweep(
    conn: &mut Connection,
    clock: Clock,
    settings: SweepSettings,
) -> Result<Vec<AppointmentEvent>, AppError> {
    let mut published = vec![];

    for business in queries::list_businesses(conn)? {
        let now = clock.now(&business);
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        published.extend(booking::release_expired_holds(&tx, &business.id, None, now)?);

        let until = now
            .checked_add_signed(settings.reminder_lead)
            .unwrap_or(NaiveDateTime::MAX);
        for appointment in queries::get_due_reminders(&tx, &business.id, &now, &until)? {
            queries::mark_reminder_sent(&tx, &appointment.id, &now)?;
            let customer = queries::get_customer(&tx, &appointment.customer_id)?;
            published.push(events::record(
                &tx,
                events::event_for(EventKind::ReminderDue, &appointment, customer.as_ref(), now),
            )?);
        }

        tx.commit()?;
    }

    // The outbox is stamped by SQLite in UTC, whatever the business clocks say.
    if let Some(cutoff) = Utc::now().naive_utc().checked_sub_signed(settings.outbox_retention) {
        let pruned = queries::prune_outbox_events(conn, &cutoff)?;
        if pruned > 0 {
            tracing::info!(pruned, "pruned old outbox events");
        }
    }

    Ok(published)
}

/// Background task driving [`sweep`] on the configured interval.
pub async fn run_sweeper(state: Arc<AppState>) {
    let period = StdDuration::from_secs(state.config.sweep_interval_secs.max(1));
    let settings = SweepSettings {
        reminder_lead: Duration::try_hours(state.config.reminder_lead_hours)
            .unwrap_or_else(|| Duration::hours(24)),
        outbox_retention: Duration::try_days(state.config.outbox_retention_days.max(1))
            .unwrap_or_else(|| Duration::days(30)),
    };
    let mut interval = tokio::time::interval(period);

    loop {
        interval.tick().await;

        let result = state
            .conn()
            .and_then(|mut db| sweep(&mut db, Clock::BusinessLocal, settings));

        match result {
            Ok(published) => {
                if !published.is_empty() {
                    tracing::info!(events = published.len(), "sweeper pass");
                }
                state.events.publish(published);
            }
            Err(e) => tracing::error!(error = %e, "sweeper pass failed"),
        }
    }
}
