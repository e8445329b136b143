use crate::db::traits::FulfillmentError;
use crate::db_types::{Courier, NewCourier};

/// The `CourierManagement` trait defines the behaviour for querying the courier pool and onboarding new
/// couriers into it.
#[allow(async_fn_in_trait)]
pub trait CourierManagement {
    async fn courier_by_id(&self, courier_id: i64) -> Result<Option<Courier>, FulfillmentError>;

    /// All couriers, or only those currently available for assignment.
    async fn fetch_couriers(&self, available_only: bool) -> Result<Vec<Courier>, FulfillmentError>;

    /// Registers a new courier. New couriers start out available with no order bound.
    async fn insert_courier(&self, courier: NewCourier) -> Result<Courier, FulfillmentError>;
}
