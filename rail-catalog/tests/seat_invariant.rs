//! Property tests for per-class seat accounting.

use chrono::Utc;
use proptest::prelude::*;
use rail_catalog::SeatAccounting;
use rail_shared::{PerClass, RunDay, SeatClass, Train, TrainStatus};
use uuid::Uuid;

#[derive(Debug, Clone)]
enum Op {
    Reserve(SeatClass, i32),
    Release(SeatClass, i32),
}

fn arb_class() -> impl Strategy<Value = SeatClass> {
    prop::sample::select(SeatClass::ALL.to_vec())
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (arb_class(), -2i32..20).prop_map(|(c, n)| Op::Reserve(c, n)),
        (arb_class(), -2i32..20).prop_map(|(c, n)| Op::Release(c, n)),
    ]
}

fn train(total: PerClass<i32>) -> Train {
    Train {
        id: Uuid::new_v4(),
        number: "12004".into(),
        name: "Tejas Express".into(),
        source: "Mumbai".into(),
        destination: "Goa".into(),
        departure_time: "05:50".into(),
        arrival_time: "14:40".into(),
        duration: "8h 50m".into(),
        distance: 552,
        days: vec![RunDay::Daily],
        fare: PerClass::default(),
        available_seats: total,
        total_seats: total,
        status: TrainStatus::OnTime,
        delay_minutes: 0,
        status_reason: String::new(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// 0 <= available <= total for every class after any operation sequence.
    #[test]
    fn availability_stays_within_bounds(
        totals in (0i32..60, 0i32..60, 0i32..60, 0i32..60),
        ops in prop::collection::vec(arb_op(), 0..64),
    ) {
        let total = PerClass { sleeper: totals.0, ac3_tier: totals.1, ac2_tier: totals.2, ac_first_class: totals.3 };
        let mut t = train(total);

        for op in ops {
            let _ = match op {
                Op::Reserve(class, n) => t.try_reserve(class, n),
                Op::Release(class, n) => t.release(class, n),
            };
            for class in SeatClass::ALL {
                let available = *t.available_seats.get(class);
                prop_assert!(available >= 0);
                prop_assert!(available <= *t.total_seats.get(class));
            }
        }
    }

    /// Reserve followed by Release of the same amount restores availability.
    #[test]
    fn reserve_then_release_round_trips(
        total in 1i32..100,
        taken in 0i32..100,
        n in 1i32..100,
        class in arb_class(),
    ) {
        let mut t = train(PerClass { sleeper: total, ac3_tier: total, ac2_tier: total, ac_first_class: total });
        let taken = taken.min(total);
        if taken > 0 {
            t.try_reserve(class, taken).unwrap();
        }
        let before = *t.available_seats.get(class);

        if t.try_reserve(class, n).is_ok() {
            t.release(class, n).unwrap();
        }
        prop_assert_eq!(*t.available_seats.get(class), before);
    }

    /// A failed reservation never changes the counts.
    #[test]
    fn failed_reserve_is_side_effect_free(available in 0i32..10, extra in 1i32..10) {
        let mut t = train(PerClass { sleeper: 10, ac3_tier: 10, ac2_tier: 10, ac_first_class: 10 });
        if available < 10 {
            t.try_reserve(SeatClass::Sleeper, 10 - available).unwrap();
        }
        let snapshot = t.available_seats;
        prop_assert!(t.try_reserve(SeatClass::Sleeper, available + extra).is_err());
        prop_assert_eq!(t.available_seats, snapshot);
    }
}
