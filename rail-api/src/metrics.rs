use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::State, http::header, response::IntoResponse};
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};
use rail_core::notify::{Notification, Notifier, NotifyError};
use rail_shared::{BookingStatus, InventoryEvent};
use tokio::sync::broadcast;
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

pub struct Metrics {
    registry: Registry,
    pub bookings_created: IntCounter,
    pub bookings_cancelled: IntCounter,
    pub capacity_rejections: IntCounter,
    pub notifications_sent: IntCounter,
    pub notifications_failed: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("rail".into()), None)?;
        let counter = |name: &str, help: &str| -> Result<IntCounter, prometheus::Error> {
            let c = IntCounter::new(name, help)?;
            registry.register(Box::new(c.clone()))?;
            Ok(c)
        };

        Ok(Self {
            bookings_created: counter("bookings_created_total", "Bookings confirmed")?,
            bookings_cancelled: counter("bookings_cancelled_total", "Bookings moved to cancelled")?,
            capacity_rejections: counter("capacity_rejections_total", "Bookings refused for lack of seats")?,
            notifications_sent: counter("notifications_sent_total", "Passenger notifications delivered")?,
            notifications_failed: counter("notifications_failed_total", "Passenger notifications that failed")?,
            registry,
        })
    }

    pub fn render(&self) -> Result<String, AppError> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| AppError::InternalServerError(e.to_string()))
    }

    /// Counts cancellations from the inventory event stream until it closes.
    pub fn track_cancellations(self: Arc<Self>, mut events: broadcast::Receiver<InventoryEvent>) {
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(InventoryEvent::BookingStatusChanged { status: BookingStatus::Cancelled, .. }) => {
                        self.bookings_cancelled.inc();
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => warn!(skipped = n, "metrics lagged behind events"),
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
}

/// Wraps a [`Notifier`] and counts outcomes.
pub struct CountingNotifier {
    inner: Arc<dyn Notifier>,
    metrics: Arc<Metrics>,
}

impl CountingNotifier {
    pub fn new(inner: Arc<dyn Notifier>, metrics: Arc<Metrics>) -> Self {
        Self { inner, metrics }
    }
}

#[async_trait]
impl Notifier for CountingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let result = self.inner.notify(notification).await;
        match &result {
            Ok(()) => self.metrics.notifications_sent.inc(),
            Err(NotifyError::NoRecipient) => {}
            Err(_) => self.metrics.notifications_failed.inc(),
        }
        result
    }
}

pub async fn metrics_handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state.metrics.render()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}
