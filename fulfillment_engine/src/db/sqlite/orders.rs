use chrono::{DateTime, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db::traits::FulfillmentError,
    db_types::{NewOrder, Order, OrderId, OrderItem, OrderStatusType},
};

const ORDER_COLUMNS: &str = "id, order_id, customer_id, customer_name, customer_phone, delivery_address, subtotal, \
                             discount, total, coupon_code, status, payment_id, courier_id, created_at, updated_at";

/// Inserts a new order and its line-item snapshot using the given connection. This is not atomic on its own.
/// Embed the call inside a transaction and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, FulfillmentError> {
    if order_exists(&order.order_id, conn).await? {
        return Err(FulfillmentError::OrderAlreadyExists(order.order_id));
    }
    let oid = order.order_id.clone();
    sqlx::query(
        r#"
            INSERT INTO orders (
                order_id, customer_id, customer_name, customer_phone, delivery_address,
                subtotal, discount, total, coupon_code, status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&order.order_id)
    .bind(&order.customer_id)
    .bind(&order.customer_name)
    .bind(&order.customer_phone)
    .bind(&order.delivery_address)
    .bind(order.subtotal)
    .bind(order.discount)
    .bind(order.total)
    .bind(&order.coupon_code)
    .bind(OrderStatusType::Pending)
    .bind(order.created_at)
    .bind(order.created_at)
    .execute(&mut *conn)
    .await?;
    for item in &order.items {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, name, quantity, unit_price) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&oid)
        .bind(&item.product_id)
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.unit_price)
        .execute(&mut *conn)
        .await?;
    }
    fetch_order_by_order_id(&oid, conn).await?.ok_or(FulfillmentError::OrderNotFound(oid))
}

/// Returns the order with the given `order_id`, with its line items attached.
pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, FulfillmentError> {
    let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = ? LIMIT 1");
    let order = sqlx::query_as::<_, Order>(&query).bind(order_id).fetch_optional(&mut *conn).await?;
    match order {
        Some(mut order) => {
            order.items = fetch_items(&order.order_id, conn).await?;
            Ok(Some(order))
        },
        None => Ok(None),
    }
}

/// Returns the order that recorded the given gateway payment id during verification, if any.
pub async fn fetch_order_by_payment_id(
    payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, FulfillmentError> {
    let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE payment_id = ? LIMIT 1");
    let order = sqlx::query_as::<_, Order>(&query).bind(payment_id).fetch_optional(&mut *conn).await?;
    match order {
        Some(mut order) => {
            order.items = fetch_items(&order.order_id, conn).await?;
            Ok(Some(order))
        },
        None => Ok(None),
    }
}

pub async fn order_exists(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<bool, FulfillmentError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE order_id = ?")
        .bind(order_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

/// All orders the customer has placed, most recent first, with line items attached.
pub async fn fetch_orders_for_customer(
    customer_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, FulfillmentError> {
    let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = ? ORDER BY created_at DESC, id DESC");
    let mut orders = sqlx::query_as::<_, Order>(&query).bind(customer_id).fetch_all(&mut *conn).await?;
    for order in &mut orders {
        order.items = fetch_items(&order.order_id, conn).await?;
    }
    Ok(orders)
}

/// The assignment scan's working set: confirmed orders with no courier bound, oldest first. Line items are
/// not attached; the scheduler only needs the fulfillment fields.
pub async fn fetch_unassigned_orders(conn: &mut SqliteConnection) -> Result<Vec<Order>, FulfillmentError> {
    let query = format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE status = ? AND courier_id IS NULL ORDER BY created_at ASC, id ASC"
    );
    let orders = sqlx::query_as::<_, Order>(&query).bind(OrderStatusType::Confirmed).fetch_all(&mut *conn).await?;
    Ok(orders)
}

/// Counts the customer's orders that have been through the assignment pipeline (courier bound at some point),
/// excluding the order under evaluation.
pub async fn count_assigned_orders_for_customer(
    customer_id: &str,
    excluding: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<i64, FulfillmentError> {
    let count: i64 = sqlx::query_scalar(
        r#"
            SELECT COUNT(*) FROM orders
            WHERE customer_id = ?
              AND courier_id IS NOT NULL
              AND status IN ('confirmed', 'out_for_delivery', 'delivered')
              AND order_id != ?
        "#,
    )
    .bind(customer_id)
    .bind(excluding)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

async fn fetch_items(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, FulfillmentError> {
    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT product_id, name, quantity, unit_price FROM order_items WHERE order_id = ? ORDER BY id ASC",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}

//--------------------------------  Guarded lifecycle updates  --------------------------------------------------------
// Each of these is a compare-and-swap: the WHERE clause names the state the order must still be in, and the
// caller inspects the returned row count to find out whether it won the write.

/// `pending` → `confirmed`, recording the gateway payment id when present. Returns the number of rows updated
/// (0 if the order was not `pending` at the moment of the write).
pub async fn mark_confirmed(
    order_id: &OrderId,
    payment_id: Option<&str>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<u64, FulfillmentError> {
    let result = sqlx::query("UPDATE orders SET status = ?, payment_id = ?, updated_at = ? WHERE order_id = ? AND status = ?")
        .bind(OrderStatusType::Confirmed)
        .bind(payment_id)
        .bind(now)
        .bind(order_id)
        .bind(OrderStatusType::Pending)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// `confirmed` → `out_for_delivery`, binding the courier. Guarded on the order still being confirmed with no
/// courier bound, so a racing tick or cancellation makes this a no-op.
pub async fn mark_out_for_delivery(
    order_id: &OrderId,
    courier_id: i64,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<u64, FulfillmentError> {
    let result = sqlx::query(
        "UPDATE orders SET status = ?, courier_id = ?, updated_at = ? \
         WHERE order_id = ? AND status = ? AND courier_id IS NULL",
    )
    .bind(OrderStatusType::OutForDelivery)
    .bind(courier_id)
    .bind(now)
    .bind(order_id)
    .bind(OrderStatusType::Confirmed)
    .execute(&mut *conn)
    .await?;
    trace!("🗃️ Order {order_id} out-for-delivery update affected {} row(s)", result.rows_affected());
    Ok(result.rows_affected())
}

/// `out_for_delivery` → `delivered`.
pub async fn mark_delivered(
    order_id: &OrderId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<u64, FulfillmentError> {
    let result = sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE order_id = ? AND status = ?")
        .bind(OrderStatusType::Delivered)
        .bind(now)
        .bind(order_id)
        .bind(OrderStatusType::OutForDelivery)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// `pending`/`confirmed` → `cancelled`.
pub async fn mark_cancelled(
    order_id: &OrderId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<u64, FulfillmentError> {
    let result = sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE order_id = ? AND status IN (?, ?)")
        .bind(OrderStatusType::Cancelled)
        .bind(now)
        .bind(order_id)
        .bind(OrderStatusType::Pending)
        .bind(OrderStatusType::Confirmed)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// `confirmed` → `refunded`, guarded on a verified payment being present.
pub async fn mark_refunded(
    order_id: &OrderId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<u64, FulfillmentError> {
    let result = sqlx::query(
        "UPDATE orders SET status = ?, updated_at = ? WHERE order_id = ? AND status = ? AND payment_id IS NOT NULL",
    )
    .bind(OrderStatusType::Refunded)
    .bind(now)
    .bind(order_id)
    .bind(OrderStatusType::Confirmed)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}
