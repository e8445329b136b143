use std::fmt::Debug;

use crate::{
    db::traits::{CourierManagement, FulfillmentError, OrderManagement},
    db_types::{Courier, NewCourier, Order, OrderId},
    fe_api::order_objects::TrackingInfo,
};

/// `OrderQueryApi` is the read side of the engine: order lookups, customer history, tracking and courier
/// pool queries. It never mutates anything except courier onboarding.
pub struct OrderQueryApi<B> {
    db: B,
}

impl<B> Debug for OrderQueryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderQueryApi")
    }
}

impl<B> OrderQueryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrderQueryApi<B>
where B: OrderManagement + CourierManagement
{
    pub async fn order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, FulfillmentError> {
        self.db.order_by_id(order_id).await
    }

    pub async fn order_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, FulfillmentError> {
        self.db.order_by_payment_id(payment_id).await
    }

    /// All orders the customer has placed, most recent first.
    pub async fn orders_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, FulfillmentError> {
        self.db.orders_for_customer(customer_id).await
    }

    /// The customer-facing tracking view: status, courier contact details once one is on the road, and a
    /// delivery estimate.
    pub async fn track_order(&self, order_id: &OrderId) -> Result<TrackingInfo, FulfillmentError> {
        let order = self
            .db
            .order_by_id(order_id)
            .await?
            .ok_or_else(|| FulfillmentError::OrderNotFound(order_id.clone()))?;
        let courier = match order.courier_id {
            Some(courier_id) => self.db.courier_by_id(courier_id).await?,
            None => None,
        };
        Ok(TrackingInfo::new(&order, courier.as_ref()))
    }

    pub async fn courier_by_id(&self, courier_id: i64) -> Result<Option<Courier>, FulfillmentError> {
        self.db.courier_by_id(courier_id).await
    }

    pub async fn fetch_couriers(&self, available_only: bool) -> Result<Vec<Courier>, FulfillmentError> {
        self.db.fetch_couriers(available_only).await
    }

    pub async fn insert_courier(&self, courier: NewCourier) -> Result<Courier, FulfillmentError> {
        self.db.insert_courier(courier).await
    }
}
