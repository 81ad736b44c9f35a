use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use chrono::NaiveDateTime;
use hmac::{Hmac, Mac};
use rusqlite::Connection;
use sha1::Sha1;
use tokio::sync::broadcast;

use crate::db::queries;
use crate::models::{Appointment, AppointmentEvent, Customer, CustomerContact, EventKind};

pub const SIGNATURE_HEADER: &str = "X-Salonbook-Signature";

pub fn event_for(
    kind: EventKind,
    appointment: &Appointment,
    customer: Option<&Customer>,
    now: NaiveDateTime,
) -> AppointmentEvent {
    AppointmentEvent {
        id: 0,
        kind,
        appointment_id: appointment.id.clone(),
        booking_number: appointment.booking_number.clone(),
        business_id: appointment.business_id.clone(),
        customer: customer.map(|c| CustomerContact {
            name: c.name.clone(),
            phone: c.phone.clone(),
            email: c.email.clone(),
        }),
        status: appointment.status,
        total_amount: appointment.total_amount,
        verification_code: None,
        occurred_at: now,
    }
}

/// Writes the event to the outbox. Call inside the transaction that made the change.
pub fn record(conn: &Connection, mut event: AppointmentEvent) -> anyhow::Result<AppointmentEvent> {
    event.id = queries::insert_outbox_event(conn, &event)?;
    Ok(event)
}

/// Downstream consumer of committed appointment events.
#[async_trait]
pub trait EventSink: Send + Sync {
    fn name(&self) -> &str;
    async fn deliver(&self, event: &AppointmentEvent) -> anyhow::Result<()>;
}

/// POSTs each event as JSON, signed with HMAC-SHA1 over the raw body.
pub struct WebhookSink {
    url: String,
    secret: String,
    client: reqwest::Client,
}

impl WebhookSink {
    pub fn new(url: String, secret: String) -> Self {
        Self {
            url,
            secret,
            client: reqwest::Client::new(),
        }
    }
}

pub fn sign_payload(secret: &str, body: &[u8]) -> anyhow::Result<String> {
    let mut mac =
        Hmac::<Sha1>::new_from_slice(secret.as_bytes()).context("invalid webhook secret")?;
    mac.update(body);
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

#[async_trait]
impl EventSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn deliver(&self, event: &AppointmentEvent) -> anyhow::Result<()> {
        let body = serde_json::to_vec(event)?;
        let signature = sign_payload(&self.secret, &body)?;

        self.client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await
            .context("failed to deliver event webhook")?
            .error_for_status()
            .context("event webhook returned error")?;

        Ok(())
    }
}

/// Fans committed events out to SSE subscribers and external sinks.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppointmentEvent>,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, sinks: vec![] }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppointmentEvent> {
        self.tx.subscribe()
    }

    /// Best effort; never fails the caller.
    /// Must run inside a tokio runtime when sinks are attached.
    pub fn publish(&self, events: Vec<AppointmentEvent>) {
        for event in events {
            tracing::info!(
                event_id = event.id,
                kind = event.kind.as_str(),
                appointment_id = %event.appointment_id,
                "appointment event"
            );

            for sink in &self.sinks {
                let sink = Arc::clone(sink);
                let event = event.clone();
                tokio::spawn(async move {
                    if let Err(e) = sink.deliver(&event).await {
                        tracing::error!(
                            sink = sink.name(),
                            event_id = event.id,
                            error = %e,
                            "event delivery failed"
                        );
                    }
                });
            }

            // no subscribers is fine
            let _ = self.tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::AppointmentStatus;
    use crate::services::testing::{dt, sample_appointment, seed_business};

    #[test]
    fn test_record_assigns_outbox_ids_in_order() {
        let conn = db::init_db(":memory:").unwrap();
        seed_business(&conn);
        let a = sample_appointment("a1", Some("staff-1"), AppointmentStatus::Pending);
        queries::insert_appointment(&conn, &a).unwrap();

        let at = dt("2024-05-20 12:00");
        let first = record(&conn, event_for(EventKind::Created, &a, None, at)).unwrap();
        let second = record(&conn, event_for(EventKind::Confirmed, &a, None, at)).unwrap();
        assert!(second.id > first.id);

        let since = queries::get_outbox_events_since(&conn, first.id).unwrap();
        assert_eq!(since.len(), 1);
        assert_eq!(since[0].kind, EventKind::Confirmed);
        assert_eq!(since[0].id, second.id);
    }

    #[test]
    fn test_event_carries_customer_contact() {
        let a = sample_appointment("a1", None, AppointmentStatus::Confirmed);
        let customer = Customer {
            id: "cust-1".to_string(),
            business_id: "biz-1".to_string(),
            name: "Alice".to_string(),
            phone: "+15551110000".to_string(),
            email: None,
        };
        let event = event_for(EventKind::Confirmed, &a, Some(&customer), dt("2024-05-20 12:00"));
        assert_eq!(event.customer.unwrap().phone, "+15551110000");
        assert_eq!(event.total_amount, 1000);
        let created = event_for(EventKind::Created, &a, None, dt("2024-05-20 12:00"));
        let json = serde_json::to_value(created).unwrap();
        assert!(json.get("verification_code").is_none());
    }

    #[test]
    fn test_signature_is_stable_and_keyed() {
        let a = sign_payload("secret", b"{\"kind\":\"created\"}").unwrap();
        let b = sign_payload("secret", b"{\"kind\":\"created\"}").unwrap();
        let c = sign_payload("other", b"{\"kind\":\"created\"}").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        // 20 byte SHA-1 digest in padded base64
        assert_eq!(a.len(), 28);
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let a = sample_appointment("a1", None, AppointmentStatus::Pending);
        bus.publish(vec![event_for(EventKind::Created, &a, None, dt("2024-05-20 12:00"))]);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind, EventKind::Created);
        assert_eq!(received.appointment_id, "a1");
    }
}
