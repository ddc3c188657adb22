use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rail_core::repository::{
    BookingRepository, ReleaseOutcome, RemovedBooking, RepoResult, ReserveOutcome, SeatStore, TransitionOutcome,
};
use rail_shared::{Booking, BookingStatus, Passenger, SeatClass, SeatSnapshot};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use crate::train_repo::{TrainRow, TRAIN_COLUMNS};

const BOOKING_COLUMNS: &str = "id, pnr, user_id, train_id, seat_class, journey_date, passengers, total_fare, \
    status, seats_released, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    pnr: String,
    user_id: Uuid,
    train_id: Uuid,
    seat_class: String,
    journey_date: NaiveDate,
    passengers: Json<Vec<Passenger>>,
    total_fare: i32,
    status: String,
    seats_released: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> RepoResult<Booking> {
        Ok(Booking {
            id: self.id,
            pnr: self.pnr,
            user_id: self.user_id,
            train_id: self.train_id,
            seat_class: self.seat_class.parse()?,
            journey_date: self.journey_date,
            passengers: self.passengers.0,
            total_fare: self.total_fare,
            status: self.status.parse()?,
            seats_released: self.seats_released,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Conditional decrement: matches no row when the class has fewer than `$1` seats.
fn reserve_sql(class: SeatClass) -> String {
    let col = format!("available_{}", class.column_suffix());
    format!("UPDATE trains SET {col} = {col} - $1, updated_at = NOW() WHERE id = $2 AND {col} >= $1 RETURNING {col}")
}

fn release_sql(class: SeatClass) -> String {
    let suffix = class.column_suffix();
    format!(
        "UPDATE trains SET available_{suffix} = LEAST(available_{suffix} + $1, total_{suffix}), updated_at = NOW() \
         WHERE id = $2 RETURNING available_{suffix}"
    )
}

async fn try_reserve(conn: &mut PgConnection, train_id: Uuid, class: SeatClass, count: i32) -> RepoResult<ReserveOutcome> {
    let reserved: Option<(i32,)> = sqlx::query_as(&reserve_sql(class))
        .bind(count)
        .bind(train_id)
        .fetch_optional(&mut *conn)
        .await?;
    if let Some((remaining,)) = reserved {
        return Ok(ReserveOutcome::Reserved { remaining });
    }

    let current: Option<(i32,)> = sqlx::query_as(&format!(
        "SELECT available_{} FROM trains WHERE id = $1",
        class.column_suffix()
    ))
    .bind(train_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(match current {
        Some((remaining,)) => ReserveOutcome::Insufficient { remaining },
        None => ReserveOutcome::TrainNotFound,
    })
}

async fn credit_seats(conn: &mut PgConnection, train_id: Uuid, class: SeatClass, count: i32) -> RepoResult<Option<i32>> {
    let row: Option<(i32,)> = sqlx::query_as(&release_sql(class))
        .bind(count)
        .bind(train_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(|(available,)| available))
}

async fn lock_booking(conn: &mut PgConnection, id: Uuid) -> RepoResult<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE");
    sqlx::query_as::<_, BookingRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .map(BookingRow::into_booking)
        .transpose()
}

/// Releases the booking's seats unless already released. Marks the flag either way.
async fn release_held_seats(conn: &mut PgConnection, booking: &Booking) -> RepoResult<Option<i32>> {
    if !booking.holds_seats() {
        return Ok(None);
    }
    let available = credit_seats(conn, booking.train_id, booking.seat_class, booking.seat_count()).await?;
    sqlx::query("UPDATE bookings SET seats_released = TRUE, updated_at = NOW() WHERE id = $1")
        .bind(booking.id)
        .execute(&mut *conn)
        .await?;
    Ok(available)
}

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_bookings(&self, sql: &str, id: Uuid, status: Option<&str>) -> RepoResult<Vec<Booking>> {
        let mut query = sqlx::query_as::<_, BookingRow>(sql).bind(id);
        if let Some(status) = status {
            query = query.bind(status);
        }
        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(BookingRow::into_booking)
            .collect()
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn get_booking(&self, id: Uuid) -> RepoResult<Option<Booking>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(BookingRow::into_booking)
            .transpose()
    }

    async fn find_by_pnr(&self, pnr: &str) -> RepoResult<Option<Booking>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE pnr = $1");
        sqlx::query_as::<_, BookingRow>(&sql)
            .bind(pnr)
            .fetch_optional(&self.pool)
            .await?
            .map(BookingRow::into_booking)
            .transpose()
    }

    async fn list_for_user(&self, user_id: Uuid) -> RepoResult<Vec<Booking>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC");
        self.fetch_bookings(&sql, user_id, None).await
    }

    async fn list_all(&self) -> RepoResult<Vec<Booking>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC");
        sqlx::query_as::<_, BookingRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(BookingRow::into_booking)
            .collect()
    }

    async fn list_for_train(&self, train_id: Uuid, status: BookingStatus) -> RepoResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE train_id = $1 AND status = $2 ORDER BY created_at"
        );
        self.fetch_bookings(&sql, train_id, Some(status.as_str())).await
    }
}

#[async_trait]
impl SeatStore for PgBookingRepository {
    async fn reserve(&self, train_id: Uuid, seat_class: SeatClass, count: i32) -> RepoResult<ReserveOutcome> {
        let mut conn = self.pool.acquire().await?;
        try_reserve(&mut conn, train_id, seat_class, count).await
    }

    async fn release(&self, train_id: Uuid, seat_class: SeatClass, count: i32) -> RepoResult<ReleaseOutcome> {
        let mut conn = self.pool.acquire().await?;
        Ok(match credit_seats(&mut conn, train_id, seat_class, count).await? {
            Some(available) => ReleaseOutcome::Released { available },
            None => ReleaseOutcome::TrainNotFound,
        })
    }

    async fn snapshot(&self, train_id: Uuid) -> RepoResult<Option<SeatSnapshot>> {
        let sql = format!("SELECT {TRAIN_COLUMNS} FROM trains WHERE id = $1");
        let train = sqlx::query_as::<_, TrainRow>(&sql)
            .bind(train_id)
            .fetch_optional(&self.pool)
            .await?
            .map(TrainRow::into_train)
            .transpose()?;
        Ok(train.as_ref().map(SeatSnapshot::from))
    }

    async fn reserve_for_booking(&self, booking: &Booking) -> RepoResult<ReserveOutcome> {
        let mut tx = self.pool.begin().await?;

        let outcome = try_reserve(&mut tx, booking.train_id, booking.seat_class, booking.seat_count()).await?;
        if !matches!(outcome, ReserveOutcome::Reserved { .. }) {
            tx.rollback().await?;
            return Ok(outcome);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO bookings (id, pnr, user_id, train_id, seat_class, journey_date, passengers, total_fare,
                                  status, seats_released, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (pnr) DO NOTHING
            "#,
        )
        .bind(booking.id)
        .bind(&booking.pnr)
        .bind(booking.user_id)
        .bind(booking.train_id)
        .bind(booking.seat_class.as_str())
        .bind(booking.journey_date)
        .bind(Json(&booking.passengers))
        .bind(booking.total_fare)
        .bind(booking.status.as_str())
        .bind(booking.seats_released)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            debug!(pnr = %booking.pnr, "PNR conflict, rolling back reservation");
            tx.rollback().await?;
            return Ok(ReserveOutcome::DuplicatePnr);
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn transition_booking(&self, booking_id: Uuid, status: BookingStatus) -> RepoResult<TransitionOutcome> {
        let mut tx = self.pool.begin().await?;

        let Some(current) = lock_booking(&mut tx, booking_id).await? else {
            return Ok(TransitionOutcome::BookingNotFound);
        };
        if current.status.is_terminal() && status != current.status {
            return Ok(TransitionOutcome::Terminal(current));
        }
        if current.status == status {
            tx.commit().await?;
            return Ok(TransitionOutcome::Applied {
                previous: status,
                booking: current,
                released: None,
            });
        }

        let released = if status == BookingStatus::Cancelled {
            release_held_seats(&mut tx, &current).await?
        } else {
            None
        };

        let sql = format!(
            "UPDATE bookings SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {BOOKING_COLUMNS}"
        );
        let booking = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(booking_id)
            .bind(status.as_str())
            .fetch_one(&mut *tx)
            .await?
            .into_booking()?;

        tx.commit().await?;
        Ok(TransitionOutcome::Applied {
            previous: current.status,
            booking,
            released,
        })
    }

    async fn release_and_remove(&self, booking_id: Uuid) -> RepoResult<Option<RemovedBooking>> {
        let mut tx = self.pool.begin().await?;

        let Some(booking) = lock_booking(&mut tx, booking_id).await? else {
            return Ok(None);
        };
        let released = release_held_seats(&mut tx, &booking).await?;

        sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(booking_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Some(RemovedBooking { booking, released }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_sql_is_conditional() {
        let sql = reserve_sql(SeatClass::Ac3Tier);
        assert!(sql.contains("available_ac3_tier = available_ac3_tier - $1"));
        assert!(sql.contains("AND available_ac3_tier >= $1"));
    }

    #[test]
    fn test_release_sql_caps_at_total() {
        let sql = release_sql(SeatClass::AcFirstClass);
        assert!(sql.contains("LEAST(available_ac_first_class + $1, total_ac_first_class)"));
    }
}
