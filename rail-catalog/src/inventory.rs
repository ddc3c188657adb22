use rail_shared::{PerClass, SeatClass, Train};

/// Seat arithmetic for one train's per-class counts.
///
/// Every mutation keeps `0 <= available <= total` for each class. Stores call
/// into this while holding whatever lock makes the read-modify-write atomic.
pub trait SeatAccounting {
    fn seat_counts(&self) -> (&PerClass<i32>, &PerClass<i32>);

    fn available_mut(&mut self) -> &mut PerClass<i32>;

    /// Take `count` seats of `class`. Returns the availability afterwards.
    fn try_reserve(&mut self, class: SeatClass, count: i32) -> Result<i32, InventoryError> {
        if count <= 0 {
            return Err(InventoryError::InvalidCount(count));
        }
        let available = *self.seat_counts().1.get(class);
        if available < count {
            return Err(InventoryError::InsufficientSeats {
                seat_class: class,
                requested: count,
                available,
            });
        }
        let slot = self.available_mut().get_mut(class);
        *slot -= count;
        Ok(*slot)
    }

    /// Give back `count` seats of `class`, never exceeding the class total.
    fn release(&mut self, class: SeatClass, count: i32) -> Result<i32, InventoryError> {
        if count <= 0 {
            return Err(InventoryError::InvalidCount(count));
        }
        let total = *self.seat_counts().0.get(class);
        let slot = self.available_mut().get_mut(class);
        *slot = slot.saturating_add(count).min(total);
        Ok(*slot)
    }
}

impl SeatAccounting for Train {
    fn seat_counts(&self) -> (&PerClass<i32>, &PerClass<i32>) {
        (&self.total_seats, &self.available_seats)
    }

    fn available_mut(&mut self) -> &mut PerClass<i32> {
        &mut self.available_seats
    }
}

/// Checks the seat invariant on a capacity/availability pair.
pub fn check_capacity(total: &PerClass<i32>, available: &PerClass<i32>) -> Result<(), InventoryError> {
    for class in SeatClass::ALL {
        let (t, a) = (*total.get(class), *available.get(class));
        if t < 0 || a < 0 || a > t {
            return Err(InventoryError::OutOfBounds {
                seat_class: class,
                available: a,
                total: t,
            });
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    #[error("Passenger count must be positive, got {0}")]
    InvalidCount(i32),

    #[error("Not enough {seat_class} seats: requested {requested}, available {available}")]
    InsufficientSeats {
        seat_class: SeatClass,
        requested: i32,
        available: i32,
    },

    #[error("{seat_class} availability {available} outside 0..={total}")]
    OutOfBounds {
        seat_class: SeatClass,
        available: i32,
        total: i32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn train(total: i32, available: i32) -> Train {
        let seats = PerClass { sleeper: total, ac3_tier: total, ac2_tier: total, ac_first_class: total };
        let mut free = seats;
        free.sleeper = available;
        Train {
            id: Uuid::new_v4(),
            number: "12001".into(),
            name: "Shatabdi Express".into(),
            source: "New Delhi".into(),
            destination: "Jaipur".into(),
            departure_time: "06:00".into(),
            arrival_time: "12:30".into(),
            duration: "6h 30m".into(),
            distance: 268,
            days: vec![rail_shared::RunDay::Daily],
            fare: PerClass { sleeper: 750, ac3_tier: 1200, ac2_tier: 1800, ac_first_class: 3200 },
            available_seats: free,
            total_seats: seats,
            status: Default::default(),
            delay_minutes: 0,
            status_reason: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_seat_lifecycle() {
        let mut t = train(50, 50);

        assert_eq!(t.try_reserve(SeatClass::Sleeper, 10).unwrap(), 40);
        assert_eq!(t.available_seats.sleeper, 40);

        assert_eq!(t.release(SeatClass::Sleeper, 10).unwrap(), 50);
        assert_eq!(t.available_seats, t.total_seats);
    }

    #[test]
    fn test_reserve_beyond_availability_leaves_counts_untouched() {
        let mut t = train(50, 2);
        let err = t.try_reserve(SeatClass::Sleeper, 3).unwrap_err();
        assert_eq!(
            err,
            InventoryError::InsufficientSeats { seat_class: SeatClass::Sleeper, requested: 3, available: 2 }
        );
        assert_eq!(t.available_seats.sleeper, 2);
    }

    #[test]
    fn test_release_is_capped_at_total() {
        let mut t = train(50, 49);
        assert_eq!(t.release(SeatClass::Sleeper, 5).unwrap(), 50);
    }

    #[test]
    fn test_non_positive_counts_rejected() {
        let mut t = train(10, 10);
        assert_eq!(t.try_reserve(SeatClass::Ac2Tier, 0), Err(InventoryError::InvalidCount(0)));
        assert_eq!(t.release(SeatClass::Ac2Tier, -1), Err(InventoryError::InvalidCount(-1)));
    }

    #[test]
    fn test_check_capacity() {
        let t = train(10, 10);
        assert!(check_capacity(&t.total_seats, &t.available_seats).is_ok());
        let mut over = t.available_seats;
        over.ac3_tier = 11;
        assert!(check_capacity(&t.total_seats, &over).is_err());
    }
}
