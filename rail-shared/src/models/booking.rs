use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::train::SeatClass;
use super::UnknownVariant;

/// Booking status in the lifecycle. `Cancelled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Waiting,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Waiting => "waiting",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "waiting" => Ok(BookingStatus::Waiting),
            _ => Err(UnknownVariant::new("booking status", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passenger {
    pub name: String,
    pub age: u8,
    pub gender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat_number: Option<String>,
}

/// A passenger reservation against one train, class and journey date.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub pnr: String,
    pub user_id: Uuid,
    pub train_id: Uuid,
    #[serde(alias = "seatType")]
    pub seat_class: SeatClass,
    pub journey_date: NaiveDate,
    pub passengers: Vec<Passenger>,
    pub total_fare: i32,
    pub status: BookingStatus,
    /// Set once when this booking's seats have been credited back to the train.
    #[serde(default)]
    pub seats_released: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        pnr: String,
        user_id: Uuid,
        train_id: Uuid,
        seat_class: SeatClass,
        journey_date: NaiveDate,
        passengers: Vec<Passenger>,
        total_fare: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            pnr,
            user_id,
            train_id,
            seat_class,
            journey_date,
            passengers,
            total_fare,
            status: BookingStatus::Confirmed,
            seats_released: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Number of seats this booking holds on its train.
    pub fn seat_count(&self) -> i32 {
        self.passengers.len() as i32
    }

    /// Whether the booking still holds seats that a cancellation must release.
    pub fn holds_seats(&self) -> bool {
        !self.seats_released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_round_trips_wire_fields() {
        let booking = Booking::new(
            "1234567890".to_string(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            SeatClass::Sleeper,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            vec![Passenger {
                name: "Asha".to_string(),
                age: 31,
                gender: "female".to_string(),
                seat_number: None,
            }],
            750,
        );

        let value = serde_json::to_value(&booking).unwrap();
        assert_eq!(value["pnr"], "1234567890");
        assert_eq!(value["status"], "confirmed");
        assert_eq!(value["seatClass"], "sleeper");
        assert_eq!(value["journeyDate"], "2024-01-01");
        assert_eq!(value["totalFare"], 750);

        let back: Booking = serde_json::from_value(value).unwrap();
        assert_eq!(back.pnr, booking.pnr);
        assert_eq!(back.seat_class, SeatClass::Sleeper);
    }

    #[test]
    fn test_seat_type_alias_accepted() {
        let mut value = serde_json::to_value(Booking::new(
            "0000000001".to_string(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            SeatClass::Ac2Tier,
            NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
            vec![],
            0,
        ))
        .unwrap();
        let object = value.as_object_mut().unwrap();
        let class = object.remove("seatClass").unwrap();
        object.insert("seatType".to_string(), class);

        let booking: Booking = serde_json::from_value(value).unwrap();
        assert_eq!(booking.seat_class, SeatClass::Ac2Tier);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Cancelled".parse::<BookingStatus>().unwrap(), BookingStatus::Cancelled);
        assert!("refunded".parse::<BookingStatus>().is_err());
        assert!(BookingStatus::Cancelled.is_terminal());
        assert!(!BookingStatus::Waiting.is_terminal());
    }
}
