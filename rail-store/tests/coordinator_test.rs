use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rail_catalog::{BookingReservation, SeatInventory};
use rail_core::CoreError;
use rail_shared::{Booking, BookingStatus, InventoryEvent, Passenger, PerClass, RunDay, SeatClass, Train, TrainStatus};
use rail_store::MemoryStore;
use tokio::sync::broadcast;
use uuid::Uuid;

fn train(sleeper: i32) -> Train {
    Train {
        id: Uuid::new_v4(),
        number: "22691".into(),
        name: "Bengaluru Rajdhani".into(),
        source: "KSR Bengaluru".into(),
        destination: "Hazrat Nizamuddin".into(),
        departure_time: "20:00".into(),
        arrival_time: "05:30".into(),
        duration: "33h 30m".into(),
        distance: 2365,
        days: vec![RunDay::Daily],
        fare: PerClass { sleeper: 800, ac3_tier: 2500, ac2_tier: 3500, ac_first_class: 6000 },
        available_seats: PerClass { sleeper, ac3_tier: 10, ac2_tier: 10, ac_first_class: 4 },
        total_seats: PerClass { sleeper, ac3_tier: 10, ac2_tier: 10, ac_first_class: 4 },
        status: TrainStatus::OnTime,
        delay_minutes: 0,
        status_reason: String::new(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn booking(train_id: Uuid, pnr: &str, passengers: usize) -> Booking {
    Booking::new(
        pnr.to_string(),
        Uuid::new_v4(),
        train_id,
        SeatClass::Sleeper,
        NaiveDate::from_ymd_opt(2026, 12, 10).unwrap(),
        (0..passengers)
            .map(|i| Passenger { name: format!("Passenger {i}"), age: 25, gender: "M".into(), seat_number: None })
            .collect(),
        800 * passengers as i32,
    )
}

async fn setup(sleeper: i32) -> (Arc<MemoryStore>, SeatInventory, Train) {
    let store = Arc::new(MemoryStore::new());
    let t = train(sleeper);
    store.insert_train(t.clone()).await;
    let (tx, _) = broadcast::channel(64);
    (store.clone(), SeatInventory::new(store, tx), t)
}

#[tokio::test]
async fn reserve_and_release_track_availability() {
    let (_, inventory, t) = setup(10).await;

    assert_eq!(inventory.reserve(t.id, SeatClass::Sleeper, 3).await.unwrap(), 7);
    assert_eq!(inventory.release(t.id, SeatClass::Sleeper, 3).await.unwrap(), 10);

    let snapshot = inventory.query(t.id).await.unwrap();
    assert_eq!(snapshot.available_seats.sleeper, 10);
    assert_eq!(snapshot.total_seats.sleeper, 10);
}

#[tokio::test]
async fn reserve_beyond_capacity_reports_remaining() {
    let (_, inventory, t) = setup(2).await;

    let err = inventory.reserve(t.id, SeatClass::Sleeper, 3).await.unwrap_err();
    assert!(matches!(err, CoreError::CapacityExceeded { seat_class: SeatClass::Sleeper, remaining: 2 }));
    assert_eq!(inventory.query(t.id).await.unwrap().available_seats.sleeper, 2);
}

#[tokio::test]
async fn release_never_exceeds_total() {
    let (_, inventory, t) = setup(10).await;
    inventory.reserve(t.id, SeatClass::Sleeper, 1).await.unwrap();

    assert_eq!(inventory.release(t.id, SeatClass::Sleeper, 5).await.unwrap(), 10);
}

#[tokio::test]
async fn unknown_train_and_bad_counts() {
    let (_, inventory, t) = setup(10).await;
    let missing = Uuid::new_v4();

    assert!(matches!(inventory.reserve(missing, SeatClass::Sleeper, 1).await, Err(CoreError::NotFound(_))));
    assert!(matches!(inventory.release(missing, SeatClass::Sleeper, 1).await, Err(CoreError::NotFound(_))));
    assert!(matches!(inventory.query(missing).await, Err(CoreError::NotFound(_))));
    assert!(matches!(inventory.reserve(t.id, SeatClass::Sleeper, 0).await, Err(CoreError::ValidationError(_))));
    assert!(matches!(inventory.release(t.id, SeatClass::Sleeper, -2).await, Err(CoreError::ValidationError(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reservations_never_oversell() {
    let (_, inventory, t) = setup(10).await;
    let train_id = t.id;

    let handles: Vec<_> = (0..25)
        .map(|_| {
            let inventory = inventory.clone();
            tokio::spawn(async move { inventory.reserve(train_id, SeatClass::Sleeper, 1).await })
        })
        .collect();

    let mut granted = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => granted += 1,
            Err(CoreError::CapacityExceeded { .. }) => refused += 1,
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    assert_eq!(granted, 10);
    assert_eq!(refused, 15);
    assert_eq!(inventory.query(t.id).await.unwrap().available_seats.sleeper, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookings_of_mixed_sizes_fit_capacity() {
    let (store, inventory, t) = setup(12).await;

    let handles: Vec<_> = (0..12)
        .map(|i| {
            let inventory = inventory.clone();
            let b = booking(t.id, &format!("70000000{i:02}"), 1 + i % 3);
            tokio::spawn(async move { (b.seat_count(), inventory.reserve_for_booking(&b).await) })
        })
        .collect();

    let mut sold = 0;
    for handle in handles {
        let (seats, result) = handle.await.unwrap();
        match result {
            Ok(BookingReservation::Committed { .. }) => sold += seats,
            Ok(BookingReservation::PnrTaken) => panic!("PNRs are distinct"),
            Err(CoreError::CapacityExceeded { .. }) => {}
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    let available = inventory.query(t.id).await.unwrap().available_seats.sleeper;
    assert_eq!(available, 12 - sold);
    let recorded: i32 = rail_core::repository::BookingRepository::list_all(store.as_ref())
        .await
        .unwrap()
        .iter()
        .map(Booking::seat_count)
        .sum();
    assert_eq!(recorded, sold);
}

#[tokio::test]
async fn double_cancel_releases_once() {
    let (_, inventory, t) = setup(10).await;
    let b = booking(t.id, "1234509876", 4);
    inventory.reserve_for_booking(&b).await.unwrap();

    let first = inventory.transition(b.id, BookingStatus::Cancelled).await.unwrap();
    assert_eq!(first.released, Some(10));
    assert!(first.changed());

    let second = inventory.transition(b.id, BookingStatus::Cancelled).await.unwrap();
    assert_eq!(second.released, None);
    assert!(!second.changed());

    let removed = inventory.remove(b.id).await.unwrap();
    assert_eq!(removed.id, b.id);
    assert_eq!(inventory.query(t.id).await.unwrap().available_seats.sleeper, 10);
}

#[tokio::test]
async fn waiting_round_trip_has_no_seat_effect() {
    let (_, inventory, t) = setup(10).await;
    let b = booking(t.id, "5556667778", 2);
    inventory.reserve_for_booking(&b).await.unwrap();

    inventory.transition(b.id, BookingStatus::Waiting).await.unwrap();
    inventory.transition(b.id, BookingStatus::Confirmed).await.unwrap();
    assert_eq!(inventory.query(t.id).await.unwrap().available_seats.sleeper, 8);

    assert!(matches!(
        inventory.transition(b.id, BookingStatus::Cancelled).await,
        Ok(applied) if applied.released == Some(10)
    ));
    assert!(matches!(
        inventory.transition(b.id, BookingStatus::Confirmed).await,
        Err(CoreError::ValidationError(_))
    ));
}

#[tokio::test]
async fn mutations_publish_inventory_events() {
    let (_, inventory, t) = setup(10).await;
    let mut events = inventory.subscribe();

    let b = booking(t.id, "8889990001", 2);
    inventory.reserve_for_booking(&b).await.unwrap();
    inventory.transition(b.id, BookingStatus::Cancelled).await.unwrap();

    match events.recv().await.unwrap() {
        InventoryEvent::AvailabilityChanged { train_id, seat_class, available_seats, .. } => {
            assert_eq!(train_id, t.id);
            assert_eq!(seat_class, SeatClass::Sleeper);
            assert_eq!(available_seats, 8);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(matches!(
        events.recv().await.unwrap(),
        InventoryEvent::AvailabilityChanged { available_seats: 10, .. }
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        InventoryEvent::BookingStatusChanged { status: BookingStatus::Cancelled, .. }
    ));
}

#[tokio::test]
async fn delete_unknown_booking_is_not_found() {
    let (_, inventory, _) = setup(10).await;
    assert!(matches!(inventory.remove(Uuid::new_v4()).await, Err(CoreError::NotFound(_))));
}
