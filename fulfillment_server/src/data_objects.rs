use std::fmt::Display;

use fulfillment_engine::db_types::{CustomerDetails, OrderId, OrderItem, OrderStatusType};
use gfs_common::Money;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// Checkout payload. The storefront materializes the cart into a line-item snapshot before calling us; the
/// cart service itself stays outside this system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: String,
    pub user_details: CustomerDetails,
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// What the gateway's checkout page hands back to the storefront after the customer pays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentVerificationRequest {
    pub order_id: OrderId,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentVerificationResult {
    pub success: bool,
    pub order_id: OrderId,
    pub payment_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusResult {
    pub payment_id: String,
    pub order_id: OrderId,
    pub status: OrderStatusType,
    pub amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    pub payment_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatusType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityUpdateRequest {
    pub is_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponCheckRequest {
    pub coupon_code: String,
    pub subtotal: Money,
}
