use thiserror::Error;

use crate::db::traits::Assignment;
use crate::db_types::{Courier, NewOrder, Order, OrderId, OrderStatusType};

/// This trait defines the highest level of behaviour for backends supporting the fulfillment engine.
///
/// This behaviour includes:
/// * Persisting checked-out orders
/// * Settling payment confirmations against pending orders
/// * Arbitrating exclusive access to the courier pool during assignment
/// * Releasing couriers when deliveries complete or orders are cancelled
///
/// Every mutating method is required to be a single atomic conditional update: the write succeeds only if the
/// record is still in the state the guard names at the moment of the write. Callers racing each other (two
/// scheduler ticks, a tick against a cancellation, a completion against an availability toggle) observe either
/// the full effect or no effect, never a torn one.
#[allow(async_fn_in_trait)]
pub trait FulfillmentDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a checked-out order. The order id must be fresh; a duplicate is an error rather than an upsert,
    /// since checkout generates a new id per attempt.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, FulfillmentError>;

    /// Transitions an order from `pending` to `confirmed`, recording the gateway payment id when one is
    /// supplied (the manual/administrative confirmation path passes `None`).
    ///
    /// The update is guarded on the order still being `pending`; if it has moved on (or never existed), no
    /// state is written and an error describes what was found.
    async fn confirm_order_payment(&self, order_id: &OrderId, payment_id: Option<&str>) -> Result<Order, FulfillmentError>;

    /// All orders that are `confirmed` with no courier bound, oldest first. This is the assignment scan's
    /// working set; the scheduler re-reads it every tick rather than carrying state across ticks.
    async fn fetch_unassigned_orders(&self) -> Result<Vec<Order>, FulfillmentError>;

    /// Counts the customer's orders that made it through the assignment pipeline at least once: status
    /// `confirmed`, `out_for_delivery` or `delivered`, with a courier bound. The order under evaluation is
    /// excluded so that it never counts itself.
    async fn count_assigned_orders_for_customer(&self, customer_id: &str, excluding: &OrderId) -> Result<i64, FulfillmentError>;

    /// Acquires one available courier and binds it to the given order, atomically marking the courier busy
    /// and moving the order to `out_for_delivery`.
    ///
    /// Acquisition is a compare-and-swap per courier: the claim succeeds only if the courier was still
    /// available at the moment of the write, and is retried against the next candidate on conflict. If the
    /// order stopped being assignable in the meantime (cancelled, or claimed by a concurrent tick), the
    /// acquired courier is released again and an error is returned.
    ///
    /// Returns `None`, without error, when no courier is available; the order stays `confirmed` for the next
    /// tick.
    async fn try_assign_courier(&self, order_id: &OrderId) -> Result<Option<Assignment>, FulfillmentError>;

    /// Transitions an order from `out_for_delivery` to `delivered` and releases the bound courier back to the
    /// pool (available, no current order) in the same transaction. Returns the updated order and the released
    /// courier, if one was bound.
    async fn complete_delivery(&self, order_id: &OrderId) -> Result<(Order, Option<Courier>), FulfillmentError>;

    /// Cancels an order that is still `pending` or `confirmed`. If a courier is somehow bound it is released
    /// as part of the same transaction.
    async fn cancel_order(&self, order_id: &OrderId) -> Result<Order, FulfillmentError>;

    /// Transitions an order from `confirmed` to `refunded`. Guarded on the payment having been verified; an
    /// order that never settled has nothing to refund.
    async fn refund_order(&self, order_id: &OrderId) -> Result<Order, FulfillmentError>;

    /// Administrative availability override. Setting a courier available clears its current-order
    /// back-reference in the same update; setting it unavailable parks it off-shift.
    async fn set_courier_availability(&self, courier_id: i64, available: bool) -> Result<Courier, FulfillmentError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), FulfillmentError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum FulfillmentError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The requested courier (id {0}) does not exist")]
    CourierNotFound(i64),
    #[error("No order carries payment id {0}")]
    PaymentNotFound(String),
    #[error("Cannot insert order, since it already exists: {0}")]
    OrderAlreadyExists(OrderId),
    #[error("Cannot create an order from an empty cart")]
    EmptyCart,
    #[error("Invalid coupon code: {0}")]
    InvalidCoupon(String),
    #[error("Invalid order contents: {0}")]
    InvalidOrderContents(String),
    #[error("The payment signature does not match")]
    InvalidPaymentSignature,
    #[error("No gateway secret is configured; payment verification is unavailable")]
    GatewayNotConfigured,
    #[error("Order {order_id} cannot move from {from} to {to}")]
    TransitionNotAllowed { order_id: OrderId, from: OrderStatusType, to: OrderStatusType },
    #[error("Order {0} already has the requested status")]
    StatusUnchanged(OrderId),
    #[error("Order {0} has no verified payment to refund")]
    NothingToRefund(OrderId),
    #[error("Order {0} cannot be moved to out_for_delivery by hand; the assignment scheduler binds couriers")]
    ManualAssignmentForbidden(OrderId),
}

impl From<sqlx::Error> for FulfillmentError {
    fn from(e: sqlx::Error) -> Self {
        FulfillmentError::DatabaseError(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for FulfillmentError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        FulfillmentError::DatabaseError(e.to_string())
    }
}
