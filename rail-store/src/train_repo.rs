use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rail_core::repository::{
    CreateTrainOutcome, DeleteTrainOutcome, RepoResult, TrainDetails, TrainRepository, UpdateTrainOutcome,
};
use rail_shared::{PerClass, RunDay, Train, TrainStatus};
use sqlx::PgPool;
use uuid::Uuid;

pub(crate) const TRAIN_COLUMNS: &str = "id, number, name, source, destination, departure_time, arrival_time, \
    duration, distance, days, \
    fare_sleeper, fare_ac3_tier, fare_ac2_tier, fare_ac_first_class, \
    total_sleeper, total_ac3_tier, total_ac2_tier, total_ac_first_class, \
    available_sleeper, available_ac3_tier, available_ac2_tier, available_ac_first_class, \
    status, delay_minutes, status_reason, created_at, updated_at";

#[derive(sqlx::FromRow)]
pub(crate) struct TrainRow {
    id: Uuid,
    number: String,
    name: String,
    source: String,
    destination: String,
    departure_time: String,
    arrival_time: String,
    duration: String,
    distance: i32,
    days: Vec<String>,
    fare_sleeper: i32,
    fare_ac3_tier: i32,
    fare_ac2_tier: i32,
    fare_ac_first_class: i32,
    total_sleeper: i32,
    total_ac3_tier: i32,
    total_ac2_tier: i32,
    total_ac_first_class: i32,
    available_sleeper: i32,
    available_ac3_tier: i32,
    available_ac2_tier: i32,
    available_ac_first_class: i32,
    status: String,
    delay_minutes: i32,
    status_reason: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TrainRow {
    pub(crate) fn into_train(self) -> RepoResult<Train> {
        let days = self
            .days
            .iter()
            .map(|d| d.parse::<RunDay>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Train {
            id: self.id,
            number: self.number,
            name: self.name,
            source: self.source,
            destination: self.destination,
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            duration: self.duration,
            distance: self.distance,
            days,
            fare: PerClass {
                sleeper: self.fare_sleeper,
                ac3_tier: self.fare_ac3_tier,
                ac2_tier: self.fare_ac2_tier,
                ac_first_class: self.fare_ac_first_class,
            },
            total_seats: PerClass {
                sleeper: self.total_sleeper,
                ac3_tier: self.total_ac3_tier,
                ac2_tier: self.total_ac2_tier,
                ac_first_class: self.total_ac_first_class,
            },
            available_seats: PerClass {
                sleeper: self.available_sleeper,
                ac3_tier: self.available_ac3_tier,
                ac2_tier: self.available_ac2_tier,
                ac_first_class: self.available_ac_first_class,
            },
            status: self.status.parse::<TrainStatus>()?,
            delay_minutes: self.delay_minutes,
            status_reason: self.status_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn day_names(days: &[RunDay]) -> Vec<String> {
    days.iter().map(|d| d.as_str().to_string()).collect()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub struct PgTrainRepository {
    pool: PgPool,
}

impl PgTrainRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_many(&self, sql: &str, binds: &[&str]) -> RepoResult<Vec<Train>> {
        let mut query = sqlx::query_as::<_, TrainRow>(sql);
        for bind in binds {
            query = query.bind(*bind);
        }
        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(TrainRow::into_train)
            .collect()
    }
}

#[async_trait]
impl TrainRepository for PgTrainRepository {
    async fn create_train(&self, train: &Train) -> RepoResult<CreateTrainOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO trains (
                id, number, name, source, destination, departure_time, arrival_time, duration, distance, days,
                fare_sleeper, fare_ac3_tier, fare_ac2_tier, fare_ac_first_class,
                total_sleeper, total_ac3_tier, total_ac2_tier, total_ac_first_class,
                available_sleeper, available_ac3_tier, available_ac2_tier, available_ac_first_class,
                status, delay_minutes, status_reason, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22,
                    $23, $24, $25, $26, $27)
            ON CONFLICT (number) DO NOTHING
            "#,
        )
        .bind(train.id)
        .bind(&train.number)
        .bind(&train.name)
        .bind(&train.source)
        .bind(&train.destination)
        .bind(&train.departure_time)
        .bind(&train.arrival_time)
        .bind(&train.duration)
        .bind(train.distance)
        .bind(day_names(&train.days))
        .bind(train.fare.sleeper)
        .bind(train.fare.ac3_tier)
        .bind(train.fare.ac2_tier)
        .bind(train.fare.ac_first_class)
        .bind(train.total_seats.sleeper)
        .bind(train.total_seats.ac3_tier)
        .bind(train.total_seats.ac2_tier)
        .bind(train.total_seats.ac_first_class)
        .bind(train.available_seats.sleeper)
        .bind(train.available_seats.ac3_tier)
        .bind(train.available_seats.ac2_tier)
        .bind(train.available_seats.ac_first_class)
        .bind(train.status.as_str())
        .bind(train.delay_minutes)
        .bind(&train.status_reason)
        .bind(train.created_at)
        .bind(train.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(if result.rows_affected() == 0 {
            CreateTrainOutcome::DuplicateNumber
        } else {
            CreateTrainOutcome::Created
        })
    }

    async fn get_train(&self, id: Uuid) -> RepoResult<Option<Train>> {
        let sql = format!("SELECT {TRAIN_COLUMNS} FROM trains WHERE id = $1");
        sqlx::query_as::<_, TrainRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(TrainRow::into_train)
            .transpose()
    }

    async fn list_trains(&self) -> RepoResult<Vec<Train>> {
        let sql = format!("SELECT {TRAIN_COLUMNS} FROM trains ORDER BY number");
        self.fetch_many(&sql, &[]).await
    }

    async fn find_by_route(&self, source: &str, destination: &str) -> RepoResult<Vec<Train>> {
        let sql = format!(
            "SELECT {TRAIN_COLUMNS} FROM trains WHERE source = $1 AND destination = $2 ORDER BY departure_time"
        );
        self.fetch_many(&sql, &[source, destination]).await
    }

    async fn update_details(&self, id: Uuid, details: &TrainDetails) -> RepoResult<UpdateTrainOutcome> {
        let sql = format!(
            r#"
            UPDATE trains SET
                number = $2, name = $3, source = $4, destination = $5,
                departure_time = $6, arrival_time = $7, duration = $8, distance = $9, days = $10,
                fare_sleeper = $11, fare_ac3_tier = $12, fare_ac2_tier = $13, fare_ac_first_class = $14,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TRAIN_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, TrainRow>(&sql)
            .bind(id)
            .bind(&details.number)
            .bind(&details.name)
            .bind(&details.source)
            .bind(&details.destination)
            .bind(&details.departure_time)
            .bind(&details.arrival_time)
            .bind(&details.duration)
            .bind(details.distance)
            .bind(day_names(&details.days))
            .bind(details.fare.sleeper)
            .bind(details.fare.ac3_tier)
            .bind(details.fare.ac2_tier)
            .bind(details.fare.ac_first_class)
            .fetch_optional(&self.pool)
            .await;

        match result {
            Ok(Some(row)) => Ok(UpdateTrainOutcome::Updated(row.into_train()?)),
            Ok(None) => Ok(UpdateTrainOutcome::NotFound),
            Err(e) if is_unique_violation(&e) => Ok(UpdateTrainOutcome::DuplicateNumber),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: TrainStatus,
        delay_minutes: Option<i32>,
        reason: Option<&str>,
    ) -> RepoResult<Option<Train>> {
        let sql = format!(
            r#"
            UPDATE trains SET
                status = $2,
                delay_minutes = COALESCE($3, delay_minutes),
                status_reason = COALESCE($4, status_reason),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TRAIN_COLUMNS}
            "#
        );
        sqlx::query_as::<_, TrainRow>(&sql)
            .bind(id)
            .bind(status.as_str())
            .bind(delay_minutes)
            .bind(reason)
            .fetch_optional(&self.pool)
            .await?
            .map(TrainRow::into_train)
            .transpose()
    }

    async fn delete_train(&self, id: Uuid) -> RepoResult<DeleteTrainOutcome> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM trains WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(DeleteTrainOutcome::NotFound);
        }

        let (active,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM bookings WHERE train_id = $1 AND status <> 'cancelled'")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if active > 0 {
            return Ok(DeleteTrainOutcome::HasActiveBookings(active as usize));
        }

        sqlx::query("DELETE FROM trains WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(DeleteTrainOutcome::Deleted)
    }
}
