use crate::db::traits::FulfillmentError;
use crate::db_types::{Order, OrderId};

/// The `OrderManagement` trait defines the behaviour for querying information about orders in the database
/// backend. Orders returned by these methods carry their line items.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, FulfillmentError>;

    /// The order that recorded the given gateway payment id during verification, if any.
    async fn order_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, FulfillmentError>;

    /// All orders placed by the customer, most recent first.
    async fn orders_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, FulfillmentError>;
}
