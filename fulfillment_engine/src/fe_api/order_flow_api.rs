use std::fmt::Debug;

use gfs_common::Money;
use log::*;

use crate::{
    coupons::CouponTable,
    db::traits::{FulfillmentDatabase, FulfillmentError, OrderManagement},
    db_types::{Courier, CustomerDetails, NewOrder, Order, OrderId, OrderItem, OrderStatusType},
    events::{EventProducers, OrderAnnulledEvent, OrderConfirmedEvent, OrderDeliveredEvent},
    fe_api::order_objects::CouponCheckResult,
    helpers::{new_order_id, PaymentVerifier},
};

/// `OrderFlowApi` is the primary API for the mutating order flow: checkout, payment settlement, manual status
/// changes, cancellation, refunds and delivery completion.
pub struct OrderFlowApi<B> {
    db: B,
    coupons: CouponTable,
    verifier: PaymentVerifier,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, verifier: PaymentVerifier, producers: EventProducers) -> Self {
        Self { db, coupons: CouponTable::default(), verifier, producers }
    }

    /// Swaps in a custom coupon rule set. The default table carries the launch rules.
    pub fn with_coupon_table(mut self, coupons: CouponTable) -> Self {
        self.coupons = coupons;
        self
    }

    /// Runs a coupon code against a subtotal without creating anything. Unknown codes yield
    /// `valid: false` with a zero discount.
    pub fn validate_coupon(&self, code: &str, subtotal: Money) -> CouponCheckResult {
        match self.coupons.evaluate(code, subtotal) {
            Some(outcome) => CouponCheckResult { valid: true, discount: outcome.discount, final_amount: outcome.total },
            None => CouponCheckResult::invalid(subtotal),
        }
    }
}

impl<B> OrderFlowApi<B>
where B: FulfillmentDatabase
{
    /// Creates a new order from a checked-out cart snapshot.
    ///
    /// The cart must not be empty, every line must carry a positive quantity and a non-negative unit price,
    /// and a supplied coupon code must exist in the rule table. Totals are computed here, the line items are
    /// frozen, and the order is persisted as `pending` until payment is verified.
    pub async fn create_order(
        &self,
        customer_id: String,
        customer: CustomerDetails,
        items: Vec<OrderItem>,
        coupon_code: Option<String>,
    ) -> Result<Order, FulfillmentError> {
        if items.is_empty() {
            return Err(FulfillmentError::EmptyCart);
        }
        for item in &items {
            if item.quantity < 1 {
                return Err(FulfillmentError::InvalidOrderContents(format!(
                    "Line item {} has quantity {}",
                    item.product_id, item.quantity
                )));
            }
            if item.unit_price.is_negative() {
                return Err(FulfillmentError::InvalidOrderContents(format!(
                    "Line item {} has a negative unit price",
                    item.product_id
                )));
            }
        }
        let mut order = NewOrder::new(new_order_id(), customer_id, customer, items);
        if let Some(code) = coupon_code {
            match self.coupons.evaluate(&code, order.subtotal) {
                Some(outcome) => order = order.with_discount(code, outcome.discount),
                None => return Err(FulfillmentError::InvalidCoupon(code)),
            }
        }
        let order = self.db.insert_order(order).await?;
        info!(
            "🛒️ Order {} created for customer {}. {} item(s), total {}",
            order.order_id,
            order.customer_id,
            order.items.len(),
            order.total
        );
        Ok(order)
    }

    /// Verifies a gateway payment confirmation and settles the order.
    ///
    /// The signature must match the HMAC we compute locally over the gateway order and payment ids. On a
    /// match the order moves from `pending` to `confirmed` with the payment id recorded; on a mismatch
    /// nothing is written.
    pub async fn verify_payment(
        &self,
        order_id: &OrderId,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<Order, FulfillmentError> {
        if !self.verifier.is_configured() {
            warn!("💳️ Rejecting payment verification for order {order_id}: no gateway secret is configured");
            return Err(FulfillmentError::GatewayNotConfigured);
        }
        if !self.verifier.verify(gateway_order_id, gateway_payment_id, signature) {
            warn!("💳️ Invalid payment signature for order {order_id}. The order is unchanged.");
            return Err(FulfillmentError::InvalidPaymentSignature);
        }
        let order = self.db.confirm_order_payment(order_id, Some(gateway_payment_id)).await?;
        info!("💳️ Payment {gateway_payment_id} verified. Order {order_id} is confirmed.");
        self.call_order_confirmed_hook(&order).await;
        Ok(order)
    }

    /// Marks an out-for-delivery order as delivered and releases its courier back to the pool.
    pub async fn complete_delivery(&self, order_id: &OrderId) -> Result<(Order, Option<Courier>), FulfillmentError> {
        let (order, courier) = self.db.complete_delivery(order_id).await?;
        match &courier {
            Some(c) => info!("📦️ Order {order_id} delivered. Courier {} ({}) is available again.", c.id, c.name),
            None => info!("📦️ Order {order_id} delivered."),
        }
        self.call_order_delivered_hook(&order).await;
        Ok((order, courier))
    }

    /// Cancels an order that has not left for delivery yet.
    pub async fn cancel_order(&self, order_id: &OrderId) -> Result<Order, FulfillmentError> {
        let order = self.db.cancel_order(order_id).await?;
        info!("🛒️ Order {order_id} cancelled");
        self.call_order_annulled_hook(&order).await;
        Ok(order)
    }

    /// Refunds a confirmed order. Only the local state transition happens here; the money movement is the
    /// storefront's conversation with the gateway.
    pub async fn refund_order(&self, order_id: &OrderId) -> Result<Order, FulfillmentError> {
        let order = self.db.refund_order(order_id).await?;
        info!("💳️ Order {order_id} refunded");
        self.call_order_annulled_hook(&order).await;
        Ok(order)
    }

    /// Administrative availability override for a courier. Setting a courier available also clears its
    /// current-order back-reference; setting it unavailable parks it off-shift so the scheduler skips it.
    pub async fn set_courier_availability(&self, courier_id: i64, available: bool) -> Result<Courier, FulfillmentError> {
        let courier = self.db.set_courier_availability(courier_id, available).await?;
        info!("🚚️ Courier {} ({}) is now {}", courier.id, courier.name, if available { "available" } else { "off shift" });
        Ok(courier)
    }

    async fn call_order_confirmed_hook(&self, order: &Order) {
        for producer in &self.producers.order_confirmed_producer {
            producer.publish_event(OrderConfirmedEvent::new(order.clone())).await;
        }
    }

    async fn call_order_delivered_hook(&self, order: &Order) {
        for producer in &self.producers.order_delivered_producer {
            producer.publish_event(OrderDeliveredEvent::new(order.clone())).await;
        }
    }

    async fn call_order_annulled_hook(&self, order: &Order) {
        for producer in &self.producers.order_annulled_producer {
            producer.publish_event(OrderAnnulledEvent::new(order.clone())).await;
        }
    }
}

impl<B> OrderFlowApi<B>
where B: FulfillmentDatabase + OrderManagement
{
    /// Looks the order up by the gateway payment id recorded at verification time and refunds it.
    pub async fn refund_by_payment_id(&self, payment_id: &str) -> Result<Order, FulfillmentError> {
        let order = self
            .db
            .order_by_payment_id(payment_id)
            .await?
            .ok_or_else(|| FulfillmentError::PaymentNotFound(payment_id.to_string()))?;
        self.refund_order(&order.order_id).await
    }

    /// Administrative status override. The lifecycle still applies; this dispatches to the same flows the
    /// dedicated operations use, and rejects edges the lifecycle forbids.
    ///
    /// | From \ To          | confirmed | out_for_delivery | delivered | cancelled | refunded |
    /// |--------------------|-----------|------------------|-----------|-----------|----------|
    /// | pending            | 1         | Err              | Err       | ok        | Err      |
    /// | confirmed          | Err       | 2                | Err       | ok        | ok       |
    /// | out_for_delivery   | Err       | Err              | ok        | Err       | Err      |
    /// | terminal           | Err       | Err              | Err       | Err       | Err      |
    ///
    /// ### (1) `pending` → `confirmed`
    /// A manual confirmation records no gateway payment id. Use the payment verification flow when a real
    /// confirmation is in hand.
    ///
    /// ### (2) `confirmed` → `out_for_delivery`
    /// Rejected: binding a courier is the scheduler's job. Toggle courier availability instead and let the
    /// next tick assign.
    pub async fn update_order_status(
        &self,
        order_id: &OrderId,
        new_status: OrderStatusType,
    ) -> Result<Order, FulfillmentError> {
        let order = self
            .db
            .order_by_id(order_id)
            .await?
            .ok_or_else(|| FulfillmentError::OrderNotFound(order_id.clone()))?;
        let old_status = order.status;
        use OrderStatusType::*;
        match (old_status, new_status) {
            (old, new) if old == new => Err(FulfillmentError::StatusUnchanged(order_id.clone())),
            (Pending, Confirmed) => {
                let order = self.db.confirm_order_payment(order_id, None).await?;
                info!("🛒️ Order {order_id} manually confirmed");
                self.call_order_confirmed_hook(&order).await;
                Ok(order)
            },
            (Confirmed, OutForDelivery) => Err(FulfillmentError::ManualAssignmentForbidden(order_id.clone())),
            (OutForDelivery, Delivered) => Ok(self.complete_delivery(order_id).await?.0),
            (Pending | Confirmed, Cancelled) => self.cancel_order(order_id).await,
            (Confirmed, Refunded) => self.refund_order(order_id).await,
            (from, to) => Err(FulfillmentError::TransitionNotAllowed { order_id: order_id.clone(), from, to }),
        }
    }
}
