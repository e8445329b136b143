use serde::{Deserialize, Serialize};

use crate::db_types::{Courier, Order, OrderStatusType};

/// Emitted when a payment confirmation settles an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderConfirmedEvent {
    pub order: Order,
}

impl OrderConfirmedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Emitted when the scheduler binds a courier to an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAssignedEvent {
    pub order: Order,
    pub courier: Courier,
}

impl OrderAssignedEvent {
    pub fn new(order: Order, courier: Courier) -> Self {
        Self { order, courier }
    }
}

/// Emitted when a delivery completes and the courier returns to the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDeliveredEvent {
    pub order: Order,
}

impl OrderDeliveredEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Emitted when an order leaves the pipeline sideways: cancelled or refunded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAnnulledEvent {
    pub order: Order,
    pub status: OrderStatusType,
}

impl OrderAnnulledEvent {
    pub fn new(order: Order) -> Self {
        let status = order.status;
        Self { order, status }
    }
}
