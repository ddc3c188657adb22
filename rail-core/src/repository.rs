use async_trait::async_trait;
use rail_shared::{Booking, BookingStatus, PerClass, RunDay, SeatClass, SeatSnapshot, Train, TrainStatus, User};
use serde::Deserialize;
use uuid::Uuid;

pub type RepoError = Box<dyn std::error::Error + Send + Sync>;
pub type RepoResult<T> = Result<T, RepoError>;

/// Editable train details. Capacity is fixed once a train exists.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainDetails {
    pub number: String,
    pub name: String,
    pub source: String,
    pub destination: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub duration: String,
    pub distance: i32,
    pub days: Vec<RunDay>,
    pub fare: PerClass<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateTrainOutcome {
    Created,
    DuplicateNumber,
}

#[derive(Debug, Clone)]
pub enum UpdateTrainOutcome {
    Updated(Train),
    NotFound,
    DuplicateNumber,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTrainOutcome {
    Deleted,
    NotFound,
    /// Non-cancelled bookings still reference the train.
    HasActiveBookings(usize),
}

/// Repository trait for the train catalog. Never mutates seat availability.
#[async_trait]
pub trait TrainRepository: Send + Sync {
    async fn create_train(&self, train: &Train) -> RepoResult<CreateTrainOutcome>;

    async fn get_train(&self, id: Uuid) -> RepoResult<Option<Train>>;

    async fn list_trains(&self) -> RepoResult<Vec<Train>>;

    async fn find_by_route(&self, source: &str, destination: &str) -> RepoResult<Vec<Train>>;

    async fn update_details(&self, id: Uuid, details: &TrainDetails) -> RepoResult<UpdateTrainOutcome>;

    async fn update_status(
        &self,
        id: Uuid,
        status: TrainStatus,
        delay_minutes: Option<i32>,
        reason: Option<&str>,
    ) -> RepoResult<Option<Train>>;

    async fn delete_train(&self, id: Uuid) -> RepoResult<DeleteTrainOutcome>;
}

/// Read-only projections over recorded bookings.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn get_booking(&self, id: Uuid) -> RepoResult<Option<Booking>>;

    async fn find_by_pnr(&self, pnr: &str) -> RepoResult<Option<Booking>>;

    async fn list_for_user(&self, user_id: Uuid) -> RepoResult<Vec<Booking>>;

    async fn list_all(&self) -> RepoResult<Vec<Booking>>;

    async fn list_for_train(&self, train_id: Uuid, status: BookingStatus) -> RepoResult<Vec<Booking>>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;

    async fn upsert_user(&self, user: &User) -> RepoResult<User>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// Seats taken; `remaining` is the class availability afterwards.
    Reserved { remaining: i32 },
    TrainNotFound,
    Insufficient { remaining: i32 },
    /// The booking's PNR is already in use; nothing was written.
    DuplicatePnr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released { available: i32 },
    TrainNotFound,
}

#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    BookingNotFound,
    /// The booking is cancelled and cannot move to another status.
    Terminal(Booking),
    Applied {
        previous: BookingStatus,
        booking: Booking,
        /// Class availability after a release performed by this transition.
        released: Option<i32>,
    },
}

#[derive(Debug, Clone)]
pub struct RemovedBooking {
    pub booking: Booking,
    pub released: Option<i32>,
}

/// The only write path to per-class seat availability.
///
/// Implementations must make every method atomic: a conditional decrement that
/// cannot oversell, a capped increment, and booking writes committed together
/// with their seat delta.
#[async_trait]
pub trait SeatStore: Send + Sync {
    async fn reserve(&self, train_id: Uuid, seat_class: SeatClass, count: i32) -> RepoResult<ReserveOutcome>;

    async fn release(&self, train_id: Uuid, seat_class: SeatClass, count: i32) -> RepoResult<ReleaseOutcome>;

    async fn snapshot(&self, train_id: Uuid) -> RepoResult<Option<SeatSnapshot>>;

    /// Reserve `booking.seat_count()` seats and record the booking in one unit.
    async fn reserve_for_booking(&self, booking: &Booking) -> RepoResult<ReserveOutcome>;

    /// Move a booking to `status`, releasing its seats exactly once on cancellation.
    async fn transition_booking(&self, booking_id: Uuid, status: BookingStatus) -> RepoResult<TransitionOutcome>;

    /// Release the booking's seats if still held, then delete it.
    async fn release_and_remove(&self, booking_id: Uuid) -> RepoResult<Option<RemovedBooking>>;
}
