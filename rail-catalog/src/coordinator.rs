use std::sync::Arc;

use chrono::Utc;
use rail_core::repository::{ReleaseOutcome, ReserveOutcome, SeatStore, TransitionOutcome};
use rail_core::{CoreError, CoreResult};
use rail_shared::{Booking, BookingStatus, InventoryEvent, SeatClass, SeatSnapshot};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of committing a booking together with its seats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingReservation {
    Committed { remaining: i32 },
    /// Nothing was written; retry with another PNR.
    PnrTaken,
}

/// A status change that went through.
#[derive(Debug, Clone)]
pub struct AppliedTransition {
    pub previous: BookingStatus,
    pub booking: Booking,
    pub released: Option<i32>,
}

impl AppliedTransition {
    pub fn changed(&self) -> bool {
        self.previous != self.booking.status
    }
}

/// Seat Inventory Coordinator: every seat-count mutation goes through here.
#[derive(Clone)]
pub struct SeatInventory {
    store: Arc<dyn SeatStore>,
    events: broadcast::Sender<InventoryEvent>,
}

impl SeatInventory {
    pub fn new(store: Arc<dyn SeatStore>, events: broadcast::Sender<InventoryEvent>) -> Self {
        Self { store, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InventoryEvent> {
        self.events.subscribe()
    }

    pub async fn reserve(&self, train_id: Uuid, seat_class: SeatClass, count: i32) -> CoreResult<i32> {
        ensure_positive(count)?;
        match self.store.reserve(train_id, seat_class, count).await? {
            ReserveOutcome::Reserved { remaining } => {
                debug!(%train_id, %seat_class, count, remaining, "seats reserved");
                self.publish_availability(train_id, seat_class, remaining);
                Ok(remaining)
            }
            ReserveOutcome::TrainNotFound => Err(CoreError::not_found("Train", train_id)),
            ReserveOutcome::Insufficient { remaining } => Err(CoreError::CapacityExceeded { seat_class, remaining }),
            ReserveOutcome::DuplicatePnr => Err(CoreError::Storage("unexpected PNR conflict on bare reserve".into())),
        }
    }

    pub async fn release(&self, train_id: Uuid, seat_class: SeatClass, count: i32) -> CoreResult<i32> {
        ensure_positive(count)?;
        match self.store.release(train_id, seat_class, count).await? {
            ReleaseOutcome::Released { available } => {
                debug!(%train_id, %seat_class, count, available, "seats released");
                self.publish_availability(train_id, seat_class, available);
                Ok(available)
            }
            ReleaseOutcome::TrainNotFound => Err(CoreError::not_found("Train", train_id)),
        }
    }

    pub async fn query(&self, train_id: Uuid) -> CoreResult<SeatSnapshot> {
        self.store
            .snapshot(train_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Train", train_id))
    }

    /// Reserve the booking's seats and record it, as one atomic unit.
    pub async fn reserve_for_booking(&self, booking: &Booking) -> CoreResult<BookingReservation> {
        ensure_positive(booking.seat_count())?;
        match self.store.reserve_for_booking(booking).await? {
            ReserveOutcome::Reserved { remaining } => {
                info!(booking_id = %booking.id, pnr = %booking.pnr, remaining, "booking committed with seats");
                self.publish_availability(booking.train_id, booking.seat_class, remaining);
                Ok(BookingReservation::Committed { remaining })
            }
            ReserveOutcome::DuplicatePnr => {
                warn!(pnr = %booking.pnr, "PNR collision, booking not written");
                Ok(BookingReservation::PnrTaken)
            }
            ReserveOutcome::TrainNotFound => Err(CoreError::not_found("Train", booking.train_id)),
            ReserveOutcome::Insufficient { remaining } => Err(CoreError::CapacityExceeded {
                seat_class: booking.seat_class,
                remaining,
            }),
        }
    }

    /// Apply a status change; a first move into `cancelled` credits the seats back.
    pub async fn transition(&self, booking_id: Uuid, status: BookingStatus) -> CoreResult<AppliedTransition> {
        match self.store.transition_booking(booking_id, status).await? {
            TransitionOutcome::BookingNotFound => Err(CoreError::not_found("Booking", booking_id)),
            TransitionOutcome::Terminal(booking) => Err(CoreError::validation(format!(
                "Booking {} is cancelled and cannot move to {status}",
                booking.pnr
            ))),
            TransitionOutcome::Applied { previous, booking, released } => {
                if let Some(available) = released {
                    info!(%booking_id, seats = booking.seat_count(), available, "seats released on cancellation");
                    self.publish_availability(booking.train_id, booking.seat_class, available);
                }
                let applied = AppliedTransition { previous, booking, released };
                if applied.changed() {
                    let _ = self.events.send(InventoryEvent::BookingStatusChanged {
                        booking_id,
                        train_id: applied.booking.train_id,
                        status,
                        at: Utc::now().timestamp(),
                    });
                }
                Ok(applied)
            }
        }
    }

    /// Release the booking's seats if it still holds them, then delete it.
    pub async fn remove(&self, booking_id: Uuid) -> CoreResult<Booking> {
        let removed = self
            .store
            .release_and_remove(booking_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Booking", booking_id))?;

        if let Some(available) = removed.released {
            self.publish_availability(removed.booking.train_id, removed.booking.seat_class, available);
        }
        info!(%booking_id, released = removed.released.is_some(), "booking removed");
        Ok(removed.booking)
    }

    fn publish_availability(&self, train_id: Uuid, seat_class: SeatClass, available_seats: i32) {
        // No subscribers is fine.
        let _ = self.events.send(InventoryEvent::AvailabilityChanged {
            train_id,
            seat_class,
            available_seats,
            at: Utc::now().timestamp(),
        });
    }
}

fn ensure_positive(count: i32) -> CoreResult<()> {
    if count <= 0 {
        return Err(CoreError::validation(format!("Passenger count must be positive, got {count}")));
    }
    Ok(())
}
