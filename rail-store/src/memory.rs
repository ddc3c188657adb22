use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rail_catalog::{InventoryError, SeatAccounting};
use rail_core::repository::{
    BookingRepository, CreateTrainOutcome, DeleteTrainOutcome, ReleaseOutcome, RemovedBooking, RepoResult,
    ReserveOutcome, SeatStore, TrainDetails, TrainRepository, TransitionOutcome, UpdateTrainOutcome, UserDirectory,
};
use rail_shared::{Booking, BookingStatus, SeatClass, SeatSnapshot, Train, TrainStatus, User};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct State {
    trains: HashMap<Uuid, Train>,
    bookings: HashMap<Uuid, Booking>,
    pnrs: HashMap<String, Uuid>,
    users: HashMap<Uuid, User>,
}

/// Process-local store. Each composite operation runs under one lock, which
/// gives it the same atomicity as a database transaction.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a train as-is, bypassing catalog validation.
    pub async fn insert_train(&self, train: Train) {
        self.state.lock().await.trains.insert(train.id, train);
    }

    pub async fn insert_user(&self, user: User) {
        self.state.lock().await.users.insert(user.id, user);
    }
}

impl State {
    fn reserve(&mut self, train_id: Uuid, class: SeatClass, count: i32) -> RepoResult<ReserveOutcome> {
        let Some(train) = self.trains.get_mut(&train_id) else {
            return Ok(ReserveOutcome::TrainNotFound);
        };
        match train.try_reserve(class, count) {
            Ok(remaining) => {
                train.updated_at = Utc::now();
                Ok(ReserveOutcome::Reserved { remaining })
            }
            Err(InventoryError::InsufficientSeats { available, .. }) => {
                Ok(ReserveOutcome::Insufficient { remaining: available })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Credits seats back. `None` when the train no longer exists.
    fn release(&mut self, train_id: Uuid, class: SeatClass, count: i32) -> RepoResult<Option<i32>> {
        let Some(train) = self.trains.get_mut(&train_id) else {
            return Ok(None);
        };
        let available = train.release(class, count)?;
        train.updated_at = Utc::now();
        Ok(Some(available))
    }

    fn release_booking_seats(&mut self, booking_id: Uuid) -> RepoResult<Option<i32>> {
        let Some(booking) = self.bookings.get(&booking_id) else {
            return Ok(None);
        };
        if !booking.holds_seats() {
            return Ok(None);
        }
        let (train_id, class, count) = (booking.train_id, booking.seat_class, booking.seat_count());
        let released = self.release(train_id, class, count)?;
        if let Some(booking) = self.bookings.get_mut(&booking_id) {
            booking.seats_released = true;
        }
        Ok(released)
    }
}

fn newest_first(mut bookings: Vec<Booking>) -> Vec<Booking> {
    bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    bookings
}

#[async_trait]
impl TrainRepository for MemoryStore {
    async fn create_train(&self, train: &Train) -> RepoResult<CreateTrainOutcome> {
        let mut state = self.state.lock().await;
        if state.trains.values().any(|t| t.number == train.number) {
            return Ok(CreateTrainOutcome::DuplicateNumber);
        }
        state.trains.insert(train.id, train.clone());
        Ok(CreateTrainOutcome::Created)
    }

    async fn get_train(&self, id: Uuid) -> RepoResult<Option<Train>> {
        Ok(self.state.lock().await.trains.get(&id).cloned())
    }

    async fn list_trains(&self) -> RepoResult<Vec<Train>> {
        let mut trains: Vec<Train> = self.state.lock().await.trains.values().cloned().collect();
        trains.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(trains)
    }

    async fn find_by_route(&self, source: &str, destination: &str) -> RepoResult<Vec<Train>> {
        let mut trains: Vec<Train> = self
            .state
            .lock()
            .await
            .trains
            .values()
            .filter(|t| t.source == source && t.destination == destination)
            .cloned()
            .collect();
        trains.sort_by(|a, b| a.departure_time.cmp(&b.departure_time));
        Ok(trains)
    }

    async fn update_details(&self, id: Uuid, details: &TrainDetails) -> RepoResult<UpdateTrainOutcome> {
        let mut state = self.state.lock().await;
        if state.trains.values().any(|t| t.id != id && t.number == details.number) {
            return Ok(UpdateTrainOutcome::DuplicateNumber);
        }
        let Some(train) = state.trains.get_mut(&id) else {
            return Ok(UpdateTrainOutcome::NotFound);
        };
        train.number = details.number.clone();
        train.name = details.name.clone();
        train.source = details.source.clone();
        train.destination = details.destination.clone();
        train.departure_time = details.departure_time.clone();
        train.arrival_time = details.arrival_time.clone();
        train.duration = details.duration.clone();
        train.distance = details.distance;
        train.days = details.days.clone();
        train.fare = details.fare;
        train.updated_at = Utc::now();
        Ok(UpdateTrainOutcome::Updated(train.clone()))
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: TrainStatus,
        delay_minutes: Option<i32>,
        reason: Option<&str>,
    ) -> RepoResult<Option<Train>> {
        let mut state = self.state.lock().await;
        let Some(train) = state.trains.get_mut(&id) else {
            return Ok(None);
        };
        train.status = status;
        if let Some(delay) = delay_minutes {
            train.delay_minutes = delay;
        }
        if let Some(reason) = reason {
            train.status_reason = reason.to_string();
        }
        train.updated_at = Utc::now();
        Ok(Some(train.clone()))
    }

    async fn delete_train(&self, id: Uuid) -> RepoResult<DeleteTrainOutcome> {
        let mut state = self.state.lock().await;
        if !state.trains.contains_key(&id) {
            return Ok(DeleteTrainOutcome::NotFound);
        }
        let active = state
            .bookings
            .values()
            .filter(|b| b.train_id == id && b.status != BookingStatus::Cancelled)
            .count();
        if active > 0 {
            return Ok(DeleteTrainOutcome::HasActiveBookings(active));
        }
        state.trains.remove(&id);
        Ok(DeleteTrainOutcome::Deleted)
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn get_booking(&self, id: Uuid) -> RepoResult<Option<Booking>> {
        Ok(self.state.lock().await.bookings.get(&id).cloned())
    }

    async fn find_by_pnr(&self, pnr: &str) -> RepoResult<Option<Booking>> {
        let state = self.state.lock().await;
        Ok(state.pnrs.get(pnr).and_then(|id| state.bookings.get(id)).cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> RepoResult<Vec<Booking>> {
        let state = self.state.lock().await;
        Ok(newest_first(
            state.bookings.values().filter(|b| b.user_id == user_id).cloned().collect(),
        ))
    }

    async fn list_all(&self) -> RepoResult<Vec<Booking>> {
        Ok(newest_first(self.state.lock().await.bookings.values().cloned().collect()))
    }

    async fn list_for_train(&self, train_id: Uuid, status: BookingStatus) -> RepoResult<Vec<Booking>> {
        let state = self.state.lock().await;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| b.train_id == train_id && b.status == status)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(bookings)
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn upsert_user(&self, user: &User) -> RepoResult<User> {
        self.state.lock().await.users.insert(user.id, user.clone());
        Ok(user.clone())
    }
}

#[async_trait]
impl SeatStore for MemoryStore {
    async fn reserve(&self, train_id: Uuid, seat_class: SeatClass, count: i32) -> RepoResult<ReserveOutcome> {
        self.state.lock().await.reserve(train_id, seat_class, count)
    }

    async fn release(&self, train_id: Uuid, seat_class: SeatClass, count: i32) -> RepoResult<ReleaseOutcome> {
        Ok(match self.state.lock().await.release(train_id, seat_class, count)? {
            Some(available) => ReleaseOutcome::Released { available },
            None => ReleaseOutcome::TrainNotFound,
        })
    }

    async fn snapshot(&self, train_id: Uuid) -> RepoResult<Option<SeatSnapshot>> {
        Ok(self.state.lock().await.trains.get(&train_id).map(SeatSnapshot::from))
    }

    async fn reserve_for_booking(&self, booking: &Booking) -> RepoResult<ReserveOutcome> {
        let mut state = self.state.lock().await;
        if state.pnrs.contains_key(&booking.pnr) {
            return Ok(ReserveOutcome::DuplicatePnr);
        }
        let outcome = state.reserve(booking.train_id, booking.seat_class, booking.seat_count())?;
        if matches!(outcome, ReserveOutcome::Reserved { .. }) {
            state.pnrs.insert(booking.pnr.clone(), booking.id);
            state.bookings.insert(booking.id, booking.clone());
        }
        Ok(outcome)
    }

    async fn transition_booking(&self, booking_id: Uuid, status: BookingStatus) -> RepoResult<TransitionOutcome> {
        let mut state = self.state.lock().await;
        let Some(current) = state.bookings.get(&booking_id).cloned() else {
            return Ok(TransitionOutcome::BookingNotFound);
        };
        if current.status.is_terminal() && status != current.status {
            return Ok(TransitionOutcome::Terminal(current));
        }
        if current.status == status {
            return Ok(TransitionOutcome::Applied {
                previous: status,
                booking: current,
                released: None,
            });
        }

        let released = if status == BookingStatus::Cancelled {
            state.release_booking_seats(booking_id)?
        } else {
            None
        };
        let Some(booking) = state.bookings.get_mut(&booking_id) else {
            return Ok(TransitionOutcome::BookingNotFound);
        };
        booking.status = status;
        booking.updated_at = Utc::now();
        Ok(TransitionOutcome::Applied {
            previous: current.status,
            booking: booking.clone(),
            released,
        })
    }

    async fn release_and_remove(&self, booking_id: Uuid) -> RepoResult<Option<RemovedBooking>> {
        let mut state = self.state.lock().await;
        if !state.bookings.contains_key(&booking_id) {
            return Ok(None);
        }
        let released = state.release_booking_seats(booking_id)?;
        let Some(booking) = state.bookings.remove(&booking_id) else {
            return Ok(None);
        };
        state.pnrs.remove(&booking.pnr);
        Ok(Some(RemovedBooking { booking, released }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rail_shared::{Passenger, PerClass, RunDay};

    fn train(seats: i32) -> Train {
        let per_class = PerClass { sleeper: seats, ac3_tier: seats, ac2_tier: seats, ac_first_class: seats };
        Train {
            id: Uuid::new_v4(),
            number: "12301".into(),
            name: "Howrah Rajdhani".into(),
            source: "Howrah".into(),
            destination: "New Delhi".into(),
            departure_time: "16:50".into(),
            arrival_time: "10:00".into(),
            duration: "17h 10m".into(),
            distance: 1451,
            days: vec![RunDay::Daily],
            fare: PerClass { sleeper: 900, ac3_tier: 2100, ac2_tier: 3000, ac_first_class: 5000 },
            available_seats: per_class,
            total_seats: per_class,
            status: TrainStatus::OnTime,
            delay_minutes: 0,
            status_reason: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn booking(train_id: Uuid, pnr: &str, passengers: usize) -> Booking {
        let passengers = (0..passengers)
            .map(|i| Passenger { name: format!("P{i}"), age: 40, gender: "M".into(), seat_number: None })
            .collect();
        Booking::new(
            pnr.into(),
            Uuid::new_v4(),
            train_id,
            SeatClass::Ac2Tier,
            NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
            passengers,
            6000,
        )
    }

    #[tokio::test]
    async fn test_duplicate_pnr_writes_nothing() {
        let store = MemoryStore::new();
        let t = train(10);
        store.insert_train(t.clone()).await;

        let first = booking(t.id, "1111111111", 2);
        assert_eq!(store.reserve_for_booking(&first).await.unwrap(), ReserveOutcome::Reserved { remaining: 8 });

        let clash = booking(t.id, "1111111111", 3);
        assert_eq!(store.reserve_for_booking(&clash).await.unwrap(), ReserveOutcome::DuplicatePnr);
        assert_eq!(store.snapshot(t.id).await.unwrap().unwrap().available_seats.ac2_tier, 8);
        assert!(store.get_booking(clash.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insufficient_seats_leaves_no_booking() {
        let store = MemoryStore::new();
        let t = train(1);
        store.insert_train(t.clone()).await;

        let b = booking(t.id, "2222222222", 2);
        assert_eq!(store.reserve_for_booking(&b).await.unwrap(), ReserveOutcome::Insufficient { remaining: 1 });
        assert!(store.find_by_pnr("2222222222").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancel_then_remove_releases_once() {
        let store = MemoryStore::new();
        let t = train(5);
        store.insert_train(t.clone()).await;
        let b = booking(t.id, "3333333333", 3);
        store.reserve_for_booking(&b).await.unwrap();

        match store.transition_booking(b.id, BookingStatus::Cancelled).await.unwrap() {
            TransitionOutcome::Applied { released, booking, .. } => {
                assert_eq!(released, Some(5));
                assert!(booking.seats_released);
            }
            other => panic!("unexpected {other:?}"),
        }
        let removed = store.release_and_remove(b.id).await.unwrap().unwrap();
        assert_eq!(removed.released, None);
        assert_eq!(store.snapshot(t.id).await.unwrap().unwrap().available_seats.ac2_tier, 5);
    }

    #[tokio::test]
    async fn test_cancelled_is_terminal() {
        let store = MemoryStore::new();
        let t = train(5);
        store.insert_train(t.clone()).await;
        let b = booking(t.id, "4444444444", 1);
        store.reserve_for_booking(&b).await.unwrap();
        store.transition_booking(b.id, BookingStatus::Cancelled).await.unwrap();

        assert!(matches!(
            store.transition_booking(b.id, BookingStatus::Confirmed).await.unwrap(),
            TransitionOutcome::Terminal(_)
        ));
    }

    #[tokio::test]
    async fn test_delete_train_refused_with_active_bookings() {
        let store = MemoryStore::new();
        let t = train(5);
        store.insert_train(t.clone()).await;
        let b = booking(t.id, "5555555555", 1);
        store.reserve_for_booking(&b).await.unwrap();

        assert_eq!(store.delete_train(t.id).await.unwrap(), DeleteTrainOutcome::HasActiveBookings(1));
        store.transition_booking(b.id, BookingStatus::Cancelled).await.unwrap();
        assert_eq!(store.delete_train(t.id).await.unwrap(), DeleteTrainOutcome::Deleted);
    }
}
