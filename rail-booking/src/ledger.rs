use std::sync::Arc;

use chrono::NaiveDate;
use rail_catalog::{BookingReservation, SeatInventory};
use rail_core::notify::NotificationKind;
use rail_core::repository::{BookingRepository, TrainRepository};
use rail_core::{CoreError, CoreResult};
use rail_shared::{Booking, BookingStatus, Passenger, Requester, SeatClass, Train, TrainStatus};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::notify::NotificationDispatcher;
use crate::pnr;

#[derive(Debug, Clone)]
pub struct BookingRules {
    pub max_passengers: usize,
    pub pnr_attempts: u32,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            max_passengers: 6,
            pnr_attempts: 5,
        }
    }
}

/// Booking request body. The owner comes from the authenticated caller.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub train_id: Uuid,
    #[serde(alias = "seatType")]
    pub seat_class: String,
    pub passengers: Vec<Passenger>,
    #[serde(alias = "date")]
    pub journey_date: NaiveDate,
    #[serde(default)]
    pub total_fare: Option<i32>,
}

/// Public view of a booking, looked up by PNR.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PnrStatus {
    pub pnr: String,
    pub status: BookingStatus,
    pub seat_class: SeatClass,
    pub journey_date: NaiveDate,
    pub passenger_count: usize,
    pub seat_numbers: Vec<String>,
    /// Absent when the train has since been removed from the catalog.
    pub train: Option<PnrTrain>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PnrTrain {
    pub number: String,
    pub name: String,
    pub source: String,
    pub destination: String,
    pub departure_time: String,
    pub status: TrainStatus,
    pub delay_minutes: i32,
}

impl PnrStatus {
    fn project(booking: Booking, train: Option<Train>) -> Self {
        Self {
            seat_numbers: booking
                .passengers
                .iter()
                .filter_map(|p| p.seat_number.clone())
                .collect(),
            passenger_count: booking.passengers.len(),
            pnr: booking.pnr,
            status: booking.status,
            seat_class: booking.seat_class,
            journey_date: booking.journey_date,
            train: train.map(|t| PnrTrain {
                number: t.number,
                name: t.name,
                source: t.source,
                destination: t.destination,
                departure_time: t.departure_time,
                status: t.status,
                delay_minutes: t.delay_minutes,
            }),
        }
    }
}

/// Booking lifecycle: creation, lookups, status changes and removal.
#[derive(Clone)]
pub struct BookingLedger {
    trains: Arc<dyn TrainRepository>,
    bookings: Arc<dyn BookingRepository>,
    inventory: SeatInventory,
    dispatcher: NotificationDispatcher,
    rules: BookingRules,
}

impl BookingLedger {
    pub fn new(
        trains: Arc<dyn TrainRepository>,
        bookings: Arc<dyn BookingRepository>,
        inventory: SeatInventory,
        dispatcher: NotificationDispatcher,
        rules: BookingRules,
    ) -> Self {
        Self {
            trains,
            bookings,
            inventory,
            dispatcher,
            rules,
        }
    }

    pub async fn create(&self, user_id: Uuid, input: NewBooking) -> CoreResult<Booking> {
        let seat_class: SeatClass = input.seat_class.parse()?;
        let passengers = self.validate_passengers(input.passengers)?;

        let train = self
            .trains
            .get_train(input.train_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Train", input.train_id))?;
        if train.status == TrainStatus::Cancelled {
            return Err(CoreError::validation(format!("Train {} is cancelled", train.number)));
        }

        let total_fare = match input.total_fare {
            Some(fare) if fare < 0 => return Err(CoreError::validation("totalFare must not be negative")),
            Some(fare) => fare,
            None => fare_for(&train, seat_class, passengers.len())?,
        };

        for attempt in 1..=self.rules.pnr_attempts {
            let booking = Booking::new(
                pnr::generate(),
                user_id,
                train.id,
                seat_class,
                input.journey_date,
                passengers.clone(),
                total_fare,
            );

            match self.inventory.reserve_for_booking(&booking).await? {
                BookingReservation::Committed { remaining } => {
                    info!(
                        booking_id = %booking.id,
                        pnr = %booking.pnr,
                        train = %train.number,
                        %seat_class,
                        seats = booking.seat_count(),
                        remaining,
                        "booking confirmed"
                    );
                    self.dispatcher
                        .dispatch(NotificationKind::BookingConfirmed, booking.clone(), train);
                    return Ok(booking);
                }
                BookingReservation::PnrTaken => {
                    warn!(attempt, "PNR already in use, regenerating");
                }
            }
        }

        Err(CoreError::Storage(format!(
            "could not allocate a unique PNR after {} attempts",
            self.rules.pnr_attempts
        )))
    }

    pub async fn get(&self, id: Uuid, requester: &Requester) -> CoreResult<Booking> {
        let booking = self.load(id).await?;
        authorize(&booking, requester, "view")?;
        Ok(booking)
    }

    pub async fn get_by_pnr(&self, pnr: &str) -> CoreResult<PnrStatus> {
        let pnr = pnr.trim();
        if !pnr::is_well_formed(pnr) {
            return Err(CoreError::validation(format!(
                "PNR must be {} digits, got '{pnr}'",
                pnr::PNR_LENGTH
            )));
        }
        let booking = self
            .bookings
            .find_by_pnr(pnr)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Booking not found with PNR {pnr}")))?;
        let train = self.trains.get_train(booking.train_id).await?;
        Ok(PnrStatus::project(booking, train))
    }

    /// Move a booking to `status`. Cancelling credits its seats back exactly once.
    pub async fn update_status(&self, id: Uuid, status: &str, requester: &Requester) -> CoreResult<Booking> {
        let current = self.load(id).await?;
        authorize(&current, requester, "update")?;
        let status: BookingStatus = status.parse()?;

        let applied = self.inventory.transition(id, status).await?;
        if !applied.changed() {
            return Ok(applied.booking);
        }

        info!(booking_id = %id, from = %applied.previous, to = %status, "booking status changed");
        match self.trains.get_train(applied.booking.train_id).await {
            Ok(Some(train)) => {
                self.dispatcher
                    .dispatch(NotificationKind::StatusChanged { status }, applied.booking.clone(), train);
            }
            Ok(None) => warn!(booking_id = %id, "train gone, status notification skipped"),
            Err(e) => warn!(booking_id = %id, error = %e, "train lookup failed, status notification skipped"),
        }
        Ok(applied.booking)
    }

    pub async fn delete(&self, id: Uuid, requester: &Requester) -> CoreResult<()> {
        let booking = self.load(id).await?;
        authorize(&booking, requester, "delete")?;
        self.inventory.remove(id).await?;
        Ok(())
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Booking>> {
        Ok(self.bookings.list_for_user(user_id).await?)
    }

    pub async fn list_all(&self) -> CoreResult<Vec<Booking>> {
        Ok(self.bookings.list_all().await?)
    }

    async fn load(&self, id: Uuid) -> CoreResult<Booking> {
        self.bookings
            .get_booking(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Booking", id))
    }

    fn validate_passengers(&self, passengers: Vec<Passenger>) -> CoreResult<Vec<Passenger>> {
        if passengers.is_empty() {
            return Err(CoreError::validation("At least one passenger is required"));
        }
        if passengers.len() > self.rules.max_passengers {
            return Err(CoreError::validation(format!(
                "A booking can have at most {} passengers",
                self.rules.max_passengers
            )));
        }
        passengers
            .into_iter()
            .enumerate()
            .map(|(i, mut p)| {
                p.name = p.name.trim().to_string();
                if p.name.is_empty() {
                    return Err(CoreError::validation(format!("Passenger {} has no name", i + 1)));
                }
                p.gender = p.gender.trim().to_string();
                Ok(p)
            })
            .collect()
    }
}

fn authorize(booking: &Booking, requester: &Requester, action: &str) -> CoreResult<()> {
    if requester.may_access(booking.user_id) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!(
            "User with ID {} is not authorized to {action} this booking",
            requester.id
        )))
    }
}

fn fare_for(train: &Train, class: SeatClass, passengers: usize) -> CoreResult<i32> {
    i32::try_from(passengers)
        .ok()
        .and_then(|n| train.fare.get(class).checked_mul(n))
        .ok_or_else(|| CoreError::validation("total fare out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rail_shared::{PerClass, Role, RunDay};

    fn passenger(name: &str) -> Passenger {
        Passenger {
            name: name.into(),
            age: 30,
            gender: "F".into(),
            seat_number: None,
        }
    }

    #[test]
    fn test_new_booking_accepts_aliases() {
        let json = serde_json::json!({
            "trainId": Uuid::nil(),
            "seatType": "ac3Tier",
            "date": "2026-11-02",
            "passengers": [{ "name": "Asha", "age": 29, "gender": "F" }]
        });
        let input: NewBooking = serde_json::from_value(json).unwrap();
        assert_eq!(input.seat_class, "ac3Tier");
        assert_eq!(input.journey_date, NaiveDate::from_ymd_opt(2026, 11, 2).unwrap());
        assert!(input.total_fare.is_none());
    }

    #[test]
    fn test_authorize_owner_and_admin() {
        let owner = Uuid::new_v4();
        let booking = Booking::new(
            "1234567890".into(),
            owner,
            Uuid::new_v4(),
            SeatClass::Sleeper,
            NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            vec![passenger("Asha")],
            750,
        );
        assert!(authorize(&booking, &Requester::new(owner, Role::User), "view").is_ok());
        assert!(authorize(&booking, &Requester::new(Uuid::new_v4(), Role::Admin), "view").is_ok());
        let err = authorize(&booking, &Requester::new(Uuid::new_v4(), Role::User), "delete").unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(msg) if msg.ends_with("not authorized to delete this booking")));
    }

    #[test]
    fn test_fare_scales_with_passengers() {
        let train = Train {
            id: Uuid::new_v4(),
            number: "12951".into(),
            name: "Mumbai Rajdhani".into(),
            source: "Mumbai Central".into(),
            destination: "New Delhi".into(),
            departure_time: "17:00".into(),
            arrival_time: "08:32".into(),
            duration: "15h 32m".into(),
            distance: 1384,
            days: vec![RunDay::Daily],
            fare: PerClass { sleeper: 755, ac3_tier: 1950, ac2_tier: 2800, ac_first_class: i32::MAX },
            available_seats: PerClass::default(),
            total_seats: PerClass::default(),
            status: TrainStatus::OnTime,
            delay_minutes: 0,
            status_reason: String::new(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        assert_eq!(fare_for(&train, SeatClass::Ac3Tier, 3).unwrap(), 5850);
        assert!(fare_for(&train, SeatClass::AcFirstClass, 2).is_err());
    }
}
