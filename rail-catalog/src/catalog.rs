use std::sync::Arc;

use chrono::Utc;
use rail_core::repository::{CreateTrainOutcome, DeleteTrainOutcome, TrainDetails, TrainRepository, UpdateTrainOutcome};
use rail_core::search::TrainSearch;
use rail_core::{CoreError, CoreResult};
use rail_shared::{PerClass, SeatClass, Train, TrainStatus};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::inventory::check_capacity;

/// Administrator input for a new train.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrain {
    #[serde(flatten)]
    pub details: TrainDetails,
    pub total_seats: PerClass<i32>,
    /// Defaults to `total_seats`.
    #[serde(default)]
    pub available_seats: Option<PerClass<i32>>,
}

/// Train catalog: administrator CRUD and public route search.
#[derive(Clone)]
pub struct TrainCatalog {
    trains: Arc<dyn TrainRepository>,
}

impl TrainCatalog {
    pub fn new(trains: Arc<dyn TrainRepository>) -> Self {
        Self { trains }
    }

    pub async fn create(&self, input: NewTrain) -> CoreResult<Train> {
        let details = normalize(input.details)?;
        let available = input.available_seats.unwrap_or(input.total_seats);
        check_capacity(&input.total_seats, &available).map_err(|e| CoreError::validation(e.to_string()))?;

        let now = Utc::now();
        let train = Train {
            id: Uuid::new_v4(),
            number: details.number,
            name: details.name,
            source: details.source,
            destination: details.destination,
            departure_time: details.departure_time,
            arrival_time: details.arrival_time,
            duration: details.duration,
            distance: details.distance,
            days: details.days,
            fare: details.fare,
            available_seats: available,
            total_seats: input.total_seats,
            status: TrainStatus::OnTime,
            delay_minutes: 0,
            status_reason: String::new(),
            created_at: now,
            updated_at: now,
        };

        match self.trains.create_train(&train).await? {
            CreateTrainOutcome::Created => {
                info!(train_id = %train.id, number = %train.number, "train created");
                Ok(train)
            }
            CreateTrainOutcome::DuplicateNumber => Err(duplicate_number(&train.number)),
        }
    }

    pub async fn update(&self, id: Uuid, details: TrainDetails) -> CoreResult<Train> {
        let details = normalize(details)?;
        match self.trains.update_details(id, &details).await? {
            UpdateTrainOutcome::Updated(train) => Ok(train),
            UpdateTrainOutcome::NotFound => Err(CoreError::not_found("Train", id)),
            UpdateTrainOutcome::DuplicateNumber => Err(duplicate_number(&details.number)),
        }
    }

    pub async fn delete(&self, id: Uuid) -> CoreResult<()> {
        match self.trains.delete_train(id).await? {
            DeleteTrainOutcome::Deleted => {
                info!(train_id = %id, "train deleted");
                Ok(())
            }
            DeleteTrainOutcome::NotFound => Err(CoreError::not_found("Train", id)),
            DeleteTrainOutcome::HasActiveBookings(n) => Err(CoreError::validation(format!(
                "Train {id} still has {n} active bookings"
            ))),
        }
    }

    pub async fn get(&self, id: Uuid) -> CoreResult<Train> {
        self.trains
            .get_train(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Train", id))
    }

    pub async fn list(&self) -> CoreResult<Vec<Train>> {
        Ok(self.trains.list_trains().await?)
    }

    /// Trains on the route that run on the search date's weekday (or daily).
    pub async fn search(&self, search: &TrainSearch) -> CoreResult<Vec<Train>> {
        let candidates = self.trains.find_by_route(&search.source, &search.destination).await?;
        let weekday = chrono::Datelike::weekday(&search.date);
        Ok(candidates.into_iter().filter(|t| t.runs_on(weekday)).collect())
    }
}

fn duplicate_number(number: &str) -> CoreError {
    CoreError::validation(format!("Train number {number} already exists"))
}

fn normalize(mut details: TrainDetails) -> CoreResult<TrainDetails> {
    for (field, value) in [
        ("number", &mut details.number),
        ("name", &mut details.name),
        ("source", &mut details.source),
        ("destination", &mut details.destination),
        ("departureTime", &mut details.departure_time),
        ("arrivalTime", &mut details.arrival_time),
        ("duration", &mut details.duration),
    ] {
        *value = value.trim().to_string();
        if value.is_empty() {
            return Err(CoreError::validation(format!("{field} is required")));
        }
    }
    if details.distance < 0 {
        return Err(CoreError::validation("distance must not be negative"));
    }
    if details.days.is_empty() {
        return Err(CoreError::validation("at least one running day is required"));
    }
    for class in SeatClass::ALL {
        if *details.fare.get(class) < 0 {
            return Err(CoreError::validation(format!("{class} fare must not be negative")));
        }
    }
    Ok(details)
}
