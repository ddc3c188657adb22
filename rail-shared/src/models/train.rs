use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UnknownVariant;

/// The four independently priced and counted coach classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SeatClass {
    Sleeper,
    #[serde(rename = "ac3Tier")]
    Ac3Tier,
    #[serde(rename = "ac2Tier")]
    Ac2Tier,
    AcFirstClass,
}

impl SeatClass {
    pub const ALL: [SeatClass; 4] = [
        SeatClass::Sleeper,
        SeatClass::Ac3Tier,
        SeatClass::Ac2Tier,
        SeatClass::AcFirstClass,
    ];

    /// Wire name, identical to the JSON field names of [`PerClass`].
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatClass::Sleeper => "sleeper",
            SeatClass::Ac3Tier => "ac3Tier",
            SeatClass::Ac2Tier => "ac2Tier",
            SeatClass::AcFirstClass => "acFirstClass",
        }
    }

    /// Column suffix used by the relational schema.
    pub fn column_suffix(&self) -> &'static str {
        match self {
            SeatClass::Sleeper => "sleeper",
            SeatClass::Ac3Tier => "ac3_tier",
            SeatClass::Ac2Tier => "ac2_tier",
            SeatClass::AcFirstClass => "ac_first_class",
        }
    }
}

impl fmt::Display for SeatClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeatClass {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SeatClass::ALL
            .into_iter()
            .find(|class| {
                class.as_str().eq_ignore_ascii_case(s.trim())
                    || class.column_suffix().eq_ignore_ascii_case(s.trim())
            })
            .ok_or_else(|| UnknownVariant::new("seat class", s))
    }
}

/// One value per seat class. Serialized as `{sleeper, ac3Tier, ac2Tier, acFirstClass}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerClass<T> {
    pub sleeper: T,
    pub ac3_tier: T,
    pub ac2_tier: T,
    pub ac_first_class: T,
}

impl<T> PerClass<T> {
    pub fn get(&self, class: SeatClass) -> &T {
        match class {
            SeatClass::Sleeper => &self.sleeper,
            SeatClass::Ac3Tier => &self.ac3_tier,
            SeatClass::Ac2Tier => &self.ac2_tier,
            SeatClass::AcFirstClass => &self.ac_first_class,
        }
    }

    pub fn get_mut(&mut self, class: SeatClass) -> &mut T {
        match class {
            SeatClass::Sleeper => &mut self.sleeper,
            SeatClass::Ac3Tier => &mut self.ac3_tier,
            SeatClass::Ac2Tier => &mut self.ac2_tier,
            SeatClass::AcFirstClass => &mut self.ac_first_class,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SeatClass, &T)> {
        SeatClass::ALL.into_iter().map(move |class| (class, self.get(class)))
    }
}

/// A day on which a train runs. `Daily` matches every weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
    Daily,
}

impl RunDay {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunDay::Monday => "Monday",
            RunDay::Tuesday => "Tuesday",
            RunDay::Wednesday => "Wednesday",
            RunDay::Thursday => "Thursday",
            RunDay::Friday => "Friday",
            RunDay::Saturday => "Saturday",
            RunDay::Sunday => "Sunday",
            RunDay::Daily => "Daily",
        }
    }

    pub fn matches(&self, weekday: Weekday) -> bool {
        match self {
            RunDay::Daily => true,
            day => RunDay::from(weekday) == *day,
        }
    }
}

impl From<Weekday> for RunDay {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => RunDay::Monday,
            Weekday::Tue => RunDay::Tuesday,
            Weekday::Wed => RunDay::Wednesday,
            Weekday::Thu => RunDay::Thursday,
            Weekday::Fri => RunDay::Friday,
            Weekday::Sat => RunDay::Saturday,
            Weekday::Sun => RunDay::Sunday,
        }
    }
}

impl FromStr for RunDay {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const DAYS: [RunDay; 8] = [
            RunDay::Monday,
            RunDay::Tuesday,
            RunDay::Wednesday,
            RunDay::Thursday,
            RunDay::Friday,
            RunDay::Saturday,
            RunDay::Sunday,
            RunDay::Daily,
        ];
        DAYS.into_iter()
            .find(|day| day.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant::new("run day", s))
    }
}

/// Operational status set by administrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrainStatus {
    #[default]
    OnTime,
    Delayed,
    Cancelled,
}

impl TrainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainStatus::OnTime => "on-time",
            TrainStatus::Delayed => "delayed",
            TrainStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TrainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrainStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "on-time" => Ok(TrainStatus::OnTime),
            "delayed" => Ok(TrainStatus::Delayed),
            "cancelled" => Ok(TrainStatus::Cancelled),
            other => Err(UnknownVariant::new("train status", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Train {
    pub id: Uuid,
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
    pub available_seats: PerClass<i32>,
    pub total_seats: PerClass<i32>,
    pub status: TrainStatus,
    pub delay_minutes: i32,
    pub status_reason: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Train {
    pub fn runs_on(&self, weekday: Weekday) -> bool {
        self.days.iter().any(|day| day.matches(weekday))
    }
}

/// Capacity and availability of a train at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatSnapshot {
    pub train_id: Uuid,
    pub total_seats: PerClass<i32>,
    pub available_seats: PerClass<i32>,
}

impl From<&Train> for SeatSnapshot {
    fn from(train: &Train) -> Self {
        Self {
            train_id: train.id,
            total_seats: train.total_seats,
            available_seats: train.available_seats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_class_wire_names() {
        let json = serde_json::to_string(&SeatClass::Ac3Tier).unwrap();
        assert_eq!(json, "\"ac3Tier\"");
        let parsed: SeatClass = serde_json::from_str("\"acFirstClass\"").unwrap();
        assert_eq!(parsed, SeatClass::AcFirstClass);
        assert_eq!("ac2_tier".parse::<SeatClass>().unwrap(), SeatClass::Ac2Tier);
        assert!("business".parse::<SeatClass>().is_err());
    }

    #[test]
    fn test_per_class_field_names() {
        let counts = PerClass { sleeper: 1, ac3_tier: 2, ac2_tier: 3, ac_first_class: 4 };
        let value = serde_json::to_value(counts).unwrap();
        assert_eq!(value["sleeper"], 1);
        assert_eq!(value["ac3Tier"], 2);
        assert_eq!(value["ac2Tier"], 3);
        assert_eq!(value["acFirstClass"], 4);
        assert_eq!(*counts.get(SeatClass::Ac2Tier), 3);
    }

    #[test]
    fn test_train_status_kebab_case() {
        assert_eq!(serde_json::to_string(&TrainStatus::OnTime).unwrap(), "\"on-time\"");
        assert_eq!("delayed".parse::<TrainStatus>().unwrap(), TrainStatus::Delayed);
        assert!("late".parse::<TrainStatus>().is_err());
    }

    #[test]
    fn test_daily_matches_every_weekday() {
        assert!(RunDay::Daily.matches(Weekday::Sun));
        assert!(RunDay::Monday.matches(Weekday::Mon));
        assert!(!RunDay::Monday.matches(Weekday::Tue));
    }
}
