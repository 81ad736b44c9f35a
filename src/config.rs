use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    /// Key for the one-time codes sent to public bookers.
    pub verification_secret: String,
    pub verification_window_minutes: i64,
    pub reservation_max_retries: u32,
    /// Empty disables the webhook sink.
    pub event_webhook_url: String,
    pub event_webhook_secret: String,
    pub sweep_interval_secs: u64,
    pub reminder_lead_hours: i64,
    /// Outbox rows older than this are pruned by the sweeper.
    pub outbox_retention_days: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", 3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "salonbook.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            verification_secret: env::var("VERIFICATION_SECRET")
                .unwrap_or_else(|_| "change-this-secret".to_string()),
            verification_window_minutes: env_parse("VERIFICATION_WINDOW_MINUTES", 15),
            reservation_max_retries: env_parse("RESERVATION_MAX_RETRIES", 3),
            event_webhook_url: env::var("EVENT_WEBHOOK_URL").unwrap_or_default(),
            event_webhook_secret: env::var("EVENT_WEBHOOK_SECRET").unwrap_or_default(),
            sweep_interval_secs: env_parse("SWEEP_INTERVAL_SECS", 60),
            reminder_lead_hours: env_parse("REMINDER_LEAD_HOURS", 24),
            outbox_retention_days: env_parse("OUTBOX_RETENTION_DAYS", 30),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
