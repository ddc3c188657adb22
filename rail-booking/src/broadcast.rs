use std::sync::Arc;

use chrono::Utc;
use rail_core::notify::NotificationKind;
use rail_core::repository::{BookingRepository, TrainRepository};
use rail_core::{CoreError, CoreResult};
use rail_shared::{BookingStatus, InventoryEvent, Train, TrainStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::notify::NotificationDispatcher;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayReport {
    pub notified_count: usize,
    pub affected_bookings: usize,
}

/// Body of `POST /api/trains/{id}/update-status`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainStatusUpdate {
    pub status: Option<String>,
    #[serde(default)]
    pub delay_minutes: Option<Value>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainStatusReport {
    pub train: Train,
    pub notified_count: usize,
}

/// Fans train-level disruptions out to every confirmed passenger.
#[derive(Clone)]
pub struct TrainBroadcaster {
    trains: Arc<dyn TrainRepository>,
    bookings: Arc<dyn BookingRepository>,
    dispatcher: NotificationDispatcher,
    events: broadcast::Sender<InventoryEvent>,
}

impl TrainBroadcaster {
    pub fn new(
        trains: Arc<dyn TrainRepository>,
        bookings: Arc<dyn BookingRepository>,
        dispatcher: NotificationDispatcher,
        events: broadcast::Sender<InventoryEvent>,
    ) -> Self {
        Self {
            trains,
            bookings,
            dispatcher,
            events,
        }
    }

    /// Tell every confirmed passenger of the train about a delay.
    pub async fn notify_train_delay(&self, train_id: Uuid, delay: Option<&Value>) -> CoreResult<DelayReport> {
        let delay_minutes = parse_delay_minutes(delay, false)?;
        let train = self.load_train(train_id).await?;
        let notified = self
            .fan_out(&train, NotificationKind::Delayed { delay_minutes })
            .await?;
        info!(
            %train_id,
            delay_minutes,
            notified = notified.notified_count,
            affected = notified.affected_bookings,
            "delay notifications sent"
        );
        Ok(notified)
    }

    pub async fn update_train_status(&self, train_id: Uuid, update: TrainStatusUpdate) -> CoreResult<TrainStatusReport> {
        let status: TrainStatus = update
            .status
            .as_deref()
            .ok_or_else(|| CoreError::validation("status is required"))?
            .parse()?;
        let delay = match update.delay_minutes.as_ref() {
            None | Some(Value::Null) => None,
            some => Some(parse_delay_minutes(some, true)?),
        };
        let delay = match status {
            TrainStatus::OnTime => Some(0),
            _ => delay,
        };
        let reason = update.reason.as_deref().map(str::trim);

        let train = self
            .trains
            .update_status(train_id, status, delay, reason)
            .await?
            .ok_or_else(|| CoreError::not_found("Train", train_id))?;

        let _ = self.events.send(InventoryEvent::TrainStatusChanged {
            train_id,
            status,
            delay_minutes: train.delay_minutes,
            at: Utc::now().timestamp(),
        });

        let kind = match status {
            TrainStatus::Delayed => Some(NotificationKind::Delayed {
                delay_minutes: train.delay_minutes,
            }),
            TrainStatus::Cancelled => Some(NotificationKind::TrainCancelled {
                reason: Some(train.status_reason.clone()).filter(|r| !r.is_empty()),
            }),
            TrainStatus::OnTime => None,
        };
        let notified_count = match kind {
            Some(kind) => self.fan_out(&train, kind).await?.notified_count,
            None => 0,
        };

        info!(%train_id, %status, delay_minutes = train.delay_minutes, notified_count, "train status updated");
        Ok(TrainStatusReport { train, notified_count })
    }

    async fn load_train(&self, id: Uuid) -> CoreResult<Train> {
        self.trains
            .get_train(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Train", id))
    }

    /// Sequential, awaited delivery; one failure does not stop the rest.
    async fn fan_out(&self, train: &Train, kind: NotificationKind) -> CoreResult<DelayReport> {
        let bookings = self
            .bookings
            .list_for_train(train.id, BookingStatus::Confirmed)
            .await?;
        let affected_bookings = bookings.len();

        let mut notified_count = 0;
        for booking in bookings {
            if self.dispatcher.deliver(kind.clone(), booking, train.clone()).await {
                notified_count += 1;
            }
        }
        Ok(DelayReport {
            notified_count,
            affected_bookings,
        })
    }
}

/// Delay in minutes from a JSON number or numeric string.
///
/// `allow_zero` admits `0`, used when an operator clears a delay.
pub fn parse_delay_minutes(value: Option<&Value>, allow_zero: bool) -> CoreResult<i32> {
    let invalid = || {
        CoreError::validation(if allow_zero {
            "delayMinutes must be a non-negative integer"
        } else {
            "Please provide a valid delay time in minutes"
        })
    };

    let minutes = match value {
        Some(Value::Number(n)) => n.as_i64().ok_or_else(invalid)?,
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };
    let minimum = if allow_zero { 0 } else { 1 };
    if minutes < minimum {
        return Err(invalid());
    }
    i32::try_from(minutes).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_delay_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_delay_minutes(Some(&json!(45)), false).unwrap(), 45);
        assert_eq!(parse_delay_minutes(Some(&json!(" 30 ")), false).unwrap(), 30);
        assert_eq!(parse_delay_minutes(Some(&json!(0)), true).unwrap(), 0);
    }

    #[test]
    fn test_delay_rejects_everything_else() {
        for bad in [json!("abc"), json!(0), json!(-5), json!(12.5), json!(null), json!(true), json!(["1"])] {
            assert!(
                matches!(parse_delay_minutes(Some(&bad), false), Err(CoreError::ValidationError(_))),
                "accepted {bad}"
            );
        }
        assert!(parse_delay_minutes(None, false).is_err());
        assert!(parse_delay_minutes(Some(&json!(-1)), true).is_err());
    }
}
