use fulfillment_engine::{
    db_types::{Courier, NewCourier, Order, OrderId},
    CourierManagement,
    FulfillmentError,
    OrderManagement,
};
use mockall::mock;

mock! {
    pub Backend {}
    impl OrderManagement for Backend {
        async fn order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, FulfillmentError>;
        async fn order_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, FulfillmentError>;
        async fn orders_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, FulfillmentError>;
    }
    impl CourierManagement for Backend {
        async fn courier_by_id(&self, courier_id: i64) -> Result<Option<Courier>, FulfillmentError>;
        async fn fetch_couriers(&self, available_only: bool) -> Result<Vec<Courier>, FulfillmentError>;
        async fn insert_courier(&self, courier: NewCourier) -> Result<Courier, FulfillmentError>;
    }
}

pub fn sample_order(order_id: &str) -> Order {
    use chrono::Utc;
    use fulfillment_engine::db_types::{OrderItem, OrderStatusType};
    use gfs_common::Money;
    Order {
        id: 1,
        order_id: OrderId::from(order_id.to_string()),
        customer_id: "cust-1".to_string(),
        customer_name: "Asha Rao".to_string(),
        customer_phone: "98860-00000".to_string(),
        delivery_address: "14 Cunningham Rd".to_string(),
        subtotal: Money::from(17_000),
        discount: Money::from(0),
        total: Money::from(17_000),
        coupon_code: None,
        status: OrderStatusType::OutForDelivery,
        payment_id: Some("gw-pay-1".to_string()),
        courier_id: Some(7),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        items: vec![OrderItem {
            product_id: "prod-milk".to_string(),
            name: "Milk 1L".to_string(),
            quantity: 2,
            unit_price: Money::from(6_500),
        }],
    }
}

pub fn sample_courier(id: i64) -> Courier {
    use chrono::Utc;
    Courier {
        id,
        name: "Courier 7".to_string(),
        phone: "90000-00007".to_string(),
        vehicle_number: "KA-01-AB-0007".to_string(),
        is_available: false,
        current_order_id: Some(OrderId::from("ord-tracked".to_string())),
        latitude: 12.97,
        longitude: 77.59,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
