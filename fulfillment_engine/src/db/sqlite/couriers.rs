use chrono::{DateTime, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db::traits::FulfillmentError,
    db_types::{Courier, NewCourier, OrderId},
};

const COURIER_COLUMNS: &str =
    "id, name, phone, vehicle_number, is_available, current_order_id, latitude, longitude, created_at, updated_at";

pub async fn fetch_courier(courier_id: i64, conn: &mut SqliteConnection) -> Result<Option<Courier>, FulfillmentError> {
    let query = format!("SELECT {COURIER_COLUMNS} FROM couriers WHERE id = ? LIMIT 1");
    let courier = sqlx::query_as::<_, Courier>(&query).bind(courier_id).fetch_optional(&mut *conn).await?;
    Ok(courier)
}

pub async fn fetch_couriers(available_only: bool, conn: &mut SqliteConnection) -> Result<Vec<Courier>, FulfillmentError> {
    let query = if available_only {
        format!("SELECT {COURIER_COLUMNS} FROM couriers WHERE is_available = 1 ORDER BY id ASC")
    } else {
        format!("SELECT {COURIER_COLUMNS} FROM couriers ORDER BY id ASC")
    };
    let couriers = sqlx::query_as::<_, Courier>(&query).fetch_all(&mut *conn).await?;
    Ok(couriers)
}

/// The candidate list for an acquisition attempt. Selection policy is first-available by ascending id; there
/// is no ranking or geo-matching.
pub async fn available_courier_ids(conn: &mut SqliteConnection) -> Result<Vec<i64>, FulfillmentError> {
    let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM couriers WHERE is_available = 1 ORDER BY id ASC")
        .fetch_all(&mut *conn)
        .await?;
    Ok(ids)
}

/// Claims a courier for an order: marks it busy and records the back-reference. The guard
/// (`is_available = 1`) makes concurrent claims mutually exclusive; exactly one writer sees 1 row affected.
pub async fn claim_courier(
    courier_id: i64,
    order_id: &OrderId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<u64, FulfillmentError> {
    let result = sqlx::query(
        "UPDATE couriers SET is_available = 0, current_order_id = ?, updated_at = ? WHERE id = ? AND is_available = 1",
    )
    .bind(order_id)
    .bind(now)
    .bind(courier_id)
    .execute(&mut *conn)
    .await?;
    trace!("🗃️ Claim of courier {courier_id} for order {order_id} affected {} row(s)", result.rows_affected());
    Ok(result.rows_affected())
}

/// Releases a courier bound to the given order: available again, back-reference cleared. Guarded on the
/// back-reference still pointing at that order, so an unrelated rebinding is never clobbered.
pub async fn release_courier(
    courier_id: i64,
    order_id: &OrderId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<u64, FulfillmentError> {
    let result = sqlx::query(
        "UPDATE couriers SET is_available = 1, current_order_id = NULL, updated_at = ? \
         WHERE id = ? AND current_order_id = ?",
    )
    .bind(now)
    .bind(courier_id)
    .bind(order_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

/// Administrative availability override. Setting a courier available always clears the back-reference in the
/// same statement; setting it unavailable parks the courier off-shift without touching any bound order.
pub async fn set_availability(
    courier_id: i64,
    available: bool,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<u64, FulfillmentError> {
    let result = if available {
        sqlx::query("UPDATE couriers SET is_available = 1, current_order_id = NULL, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(courier_id)
            .execute(&mut *conn)
            .await?
    } else {
        sqlx::query("UPDATE couriers SET is_available = 0, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(courier_id)
            .execute(&mut *conn)
            .await?
    };
    Ok(result.rows_affected())
}

pub async fn insert_courier(
    courier: NewCourier,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Courier, FulfillmentError> {
    let id: i64 = sqlx::query_scalar(
        r#"
            INSERT INTO couriers (name, phone, vehicle_number, is_available, latitude, longitude, created_at, updated_at)
            VALUES (?, ?, ?, 1, ?, ?, ?, ?)
            RETURNING id
        "#,
    )
    .bind(&courier.name)
    .bind(&courier.phone)
    .bind(&courier.vehicle_number)
    .bind(courier.latitude)
    .bind(courier.longitude)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    fetch_courier(id, conn).await?.ok_or(FulfillmentError::CourierNotFound(id))
}
