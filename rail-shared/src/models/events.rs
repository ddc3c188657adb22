use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::booking::BookingStatus;
use super::train::{SeatClass, TrainStatus};

/// Change notifications published to in-process subscribers (SSE streams).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InventoryEvent {
    #[serde(rename_all = "camelCase")]
    AvailabilityChanged {
        train_id: Uuid,
        seat_class: SeatClass,
        available_seats: i32,
        at: i64,
    },
    #[serde(rename_all = "camelCase")]
    BookingStatusChanged {
        booking_id: Uuid,
        train_id: Uuid,
        status: BookingStatus,
        at: i64,
    },
    #[serde(rename_all = "camelCase")]
    TrainStatusChanged {
        train_id: Uuid,
        status: TrainStatus,
        delay_minutes: i32,
        at: i64,
    },
}

impl InventoryEvent {
    pub fn train_id(&self) -> Uuid {
        match self {
            InventoryEvent::AvailabilityChanged { train_id, .. }
            | InventoryEvent::BookingStatusChanged { train_id, .. }
            | InventoryEvent::TrainStatusChanged { train_id, .. } => *train_id,
        }
    }

    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            InventoryEvent::AvailabilityChanged { .. } => "availability",
            InventoryEvent::BookingStatusChanged { .. } => "booking_status",
            InventoryEvent::TrainStatusChanged { .. } => "train_status",
        }
    }
}
