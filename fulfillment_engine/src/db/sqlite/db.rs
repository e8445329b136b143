use std::fmt::Debug;

use chrono::Utc;
use log::*;
use sqlx::SqlitePool;

use crate::{
    db::{
        sqlite::{couriers, db_url, new_pool, orders},
        traits::{Assignment, CourierManagement, FulfillmentDatabase, FulfillmentError, OrderManagement},
    },
    db_types::{Courier, NewCourier, NewOrder, Order, OrderId, OrderStatusType},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL from the environment, or the default.
    pub async fn new(max_connections: u32) -> Result<Self, FulfillmentError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, FulfillmentError> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date. Safe to call on every startup.
    pub async fn run_migrations(&self) -> Result<(), FulfillmentError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl FulfillmentDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} has been saved in the DB with id {}", order.order_id, order.id);
        Ok(order)
    }

    async fn confirm_order_payment(&self, order_id: &OrderId, payment_id: Option<&str>) -> Result<Order, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let now = Utc::now();
        let updated = orders::mark_confirmed(order_id, payment_id, now, &mut conn).await?;
        if updated == 0 {
            return match orders::fetch_order_by_order_id(order_id, &mut conn).await? {
                None => Err(FulfillmentError::OrderNotFound(order_id.clone())),
                Some(order) => Err(FulfillmentError::TransitionNotAllowed {
                    order_id: order_id.clone(),
                    from: order.status,
                    to: OrderStatusType::Confirmed,
                }),
            };
        }
        debug!("🗃️ Order {order_id} confirmed (payment id: {payment_id:?})");
        orders::fetch_order_by_order_id(order_id, &mut conn)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id.clone()))
    }

    async fn fetch_unassigned_orders(&self) -> Result<Vec<Order>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_unassigned_orders(&mut conn).await
    }

    async fn count_assigned_orders_for_customer(&self, customer_id: &str, excluding: &OrderId) -> Result<i64, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        orders::count_assigned_orders_for_customer(customer_id, excluding, &mut conn).await
    }

    async fn try_assign_courier(&self, order_id: &OrderId) -> Result<Option<Assignment>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id.clone()))?;
        if !order.is_assignable() {
            return Err(FulfillmentError::TransitionNotAllowed {
                order_id: order_id.clone(),
                from: order.status,
                to: OrderStatusType::OutForDelivery,
            });
        }
        let now = Utc::now();
        let candidates = couriers::available_courier_ids(&mut conn).await?;
        for courier_id in candidates {
            if couriers::claim_courier(courier_id, order_id, now, &mut conn).await? == 0 {
                // Lost the race for this courier. Move on to the next candidate.
                trace!("🗃️ Courier {courier_id} was claimed concurrently; trying the next one");
                continue;
            }
            if orders::mark_out_for_delivery(order_id, courier_id, now, &mut conn).await? == 0 {
                // The order changed underneath us (cancelled, or bound by a concurrent tick).
                // Hand the courier back before reporting the conflict.
                couriers::release_courier(courier_id, order_id, now, &mut conn).await?;
                return match orders::fetch_order_by_order_id(order_id, &mut conn).await? {
                    None => Err(FulfillmentError::OrderNotFound(order_id.clone())),
                    Some(order) => Err(FulfillmentError::TransitionNotAllowed {
                        order_id: order_id.clone(),
                        from: order.status,
                        to: OrderStatusType::OutForDelivery,
                    }),
                };
            }
            let order = orders::fetch_order_by_order_id(order_id, &mut conn)
                .await?
                .ok_or(FulfillmentError::OrderNotFound(order_id.clone()))?;
            let courier = couriers::fetch_courier(courier_id, &mut conn)
                .await?
                .ok_or(FulfillmentError::CourierNotFound(courier_id))?;
            debug!("🗃️ Order {order_id} bound to courier {} ({})", courier.id, courier.name);
            return Ok(Some(Assignment::new(order, courier)));
        }
        Ok(None)
    }

    async fn complete_delivery(&self, order_id: &OrderId) -> Result<(Order, Option<Courier>), FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id.clone()))?;
        let now = Utc::now();
        if orders::mark_delivered(order_id, now, &mut tx).await? == 0 {
            return Err(FulfillmentError::TransitionNotAllowed {
                order_id: order_id.clone(),
                from: order.status,
                to: OrderStatusType::Delivered,
            });
        }
        let courier = match order.courier_id {
            Some(courier_id) => {
                couriers::release_courier(courier_id, order_id, now, &mut tx).await?;
                couriers::fetch_courier(courier_id, &mut tx).await?
            },
            None => None,
        };
        let order = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id.clone()))?;
        tx.commit().await?;
        debug!("🗃️ Order {order_id} delivered; courier released: {}", courier.is_some());
        Ok((order, courier))
    }

    async fn cancel_order(&self, order_id: &OrderId) -> Result<Order, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id.clone()))?;
        let now = Utc::now();
        if orders::mark_cancelled(order_id, now, &mut tx).await? == 0 {
            return Err(FulfillmentError::TransitionNotAllowed {
                order_id: order_id.clone(),
                from: order.status,
                to: OrderStatusType::Cancelled,
            });
        }
        // A pending or confirmed order should not hold a courier, but if one is bound, hand it back.
        if let Some(courier_id) = order.courier_id {
            couriers::release_courier(courier_id, order_id, now, &mut tx).await?;
        }
        let order = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id.clone()))?;
        tx.commit().await?;
        debug!("🗃️ Order {order_id} cancelled");
        Ok(order)
    }

    async fn refund_order(&self, order_id: &OrderId) -> Result<Order, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let now = Utc::now();
        if orders::mark_refunded(order_id, now, &mut conn).await? == 0 {
            return match orders::fetch_order_by_order_id(order_id, &mut conn).await? {
                None => Err(FulfillmentError::OrderNotFound(order_id.clone())),
                Some(order) if order.payment_id.is_none() => Err(FulfillmentError::NothingToRefund(order_id.clone())),
                Some(order) => Err(FulfillmentError::TransitionNotAllowed {
                    order_id: order_id.clone(),
                    from: order.status,
                    to: OrderStatusType::Refunded,
                }),
            };
        }
        debug!("🗃️ Order {order_id} refunded");
        orders::fetch_order_by_order_id(order_id, &mut conn)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id.clone()))
    }

    async fn set_courier_availability(&self, courier_id: i64, available: bool) -> Result<Courier, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let now = Utc::now();
        if couriers::set_availability(courier_id, available, now, &mut conn).await? == 0 {
            return Err(FulfillmentError::CourierNotFound(courier_id));
        }
        debug!("🗃️ Courier {courier_id} availability set to {available}");
        couriers::fetch_courier(courier_id, &mut conn).await?.ok_or(FulfillmentError::CourierNotFound(courier_id))
    }

    async fn close(&mut self) -> Result<(), FulfillmentError> {
        self.pool.close().await;
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_order_id(order_id, &mut conn).await
    }

    async fn order_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_payment_id(payment_id, &mut conn).await
    }

    async fn orders_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders_for_customer(customer_id, &mut conn).await
    }
}

impl CourierManagement for SqliteDatabase {
    async fn courier_by_id(&self, courier_id: i64) -> Result<Option<Courier>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        couriers::fetch_courier(courier_id, &mut conn).await
    }

    async fn fetch_couriers(&self, available_only: bool) -> Result<Vec<Courier>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        couriers::fetch_couriers(available_only, &mut conn).await
    }

    async fn insert_courier(&self, courier: NewCourier) -> Result<Courier, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        couriers::insert_courier(courier, Utc::now(), &mut conn).await
    }
}
