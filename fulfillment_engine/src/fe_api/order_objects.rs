use gfs_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::{Courier, Order, OrderId, OrderStatusType};

/// The contact subset of a courier that customers get to see while tracking an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierInfo {
    pub name: String,
    pub phone: String,
    pub vehicle_number: String,
}

impl From<&Courier> for CourierInfo {
    fn from(courier: &Courier) -> Self {
        Self {
            name: courier.name.clone(),
            phone: courier.phone.clone(),
            vehicle_number: courier.vehicle_number.clone(),
        }
    }
}

/// What the tracking endpoint reports: status, the courier on the road (if any) and a delivery window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingInfo {
    pub order_id: OrderId,
    pub status: OrderStatusType,
    pub courier: Option<CourierInfo>,
    pub estimated_delivery: String,
}

impl TrackingInfo {
    pub fn new(order: &Order, courier: Option<&Courier>) -> Self {
        let courier_info = courier.map(CourierInfo::from);
        let estimated_delivery = match order.status {
            OrderStatusType::Delivered => "Delivered".to_string(),
            OrderStatusType::Cancelled | OrderStatusType::Refunded => "Not applicable".to_string(),
            _ if courier_info.is_some() => "10-15 minutes".to_string(),
            _ => "Waiting for assignment".to_string(),
        };
        Self { order_id: order.order_id.clone(), status: order.status, courier: courier_info, estimated_delivery }
    }
}

/// The result of running a coupon code against a subtotal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponCheckResult {
    pub valid: bool,
    pub discount: Money,
    pub final_amount: Money,
}

impl CouponCheckResult {
    pub fn invalid(subtotal: Money) -> Self {
        Self { valid: false, discount: Money::default(), final_amount: subtotal }
    }
}
