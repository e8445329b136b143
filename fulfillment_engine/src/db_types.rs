use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use gfs_common::Money;
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------   OrderStatusType     -------------------------------------------------------
/// The lifecycle of an order. The happy path is `Pending` → `Confirmed` → `OutForDelivery` → `Delivered`.
/// `Cancelled` and `Refunded` are terminal side-exits reachable from the first two states only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// The order has been created at checkout, and payment has not been verified yet.
    Pending,
    /// Payment has been verified. The order is waiting for a courier.
    Confirmed,
    /// A courier has been bound to the order and is on the road.
    OutForDelivery,
    /// The courier has handed the order over. Terminal.
    Delivered,
    /// The order was cancelled by the customer or an admin. Terminal.
    Cancelled,
    /// The order's payment was refunded. Terminal.
    Refunded,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Refunded)
    }

    /// Whether the lifecycle permits moving from this status to `new`. Transitions are monotonic; there is no
    /// skipping ahead and no moving back.
    pub fn can_transition_to(&self, new: OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!(
            (self, new),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, OutForDelivery) | (Confirmed, Cancelled) | (Confirmed, Refunded) | (OutForDelivery, Delivered)
        )
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "pending"),
            OrderStatusType::Confirmed => write!(f, "confirmed"),
            OrderStatusType::OutForDelivery => write!(f, "out_for_delivery"),
            OrderStatusType::Delivered => write!(f, "delivered"),
            OrderStatusType::Cancelled => write!(f, "cancelled"),
            OrderStatusType::Refunded => write!(f, "refunded"),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to pending");
            OrderStatusType::Pending
        })
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "out_for_delivery" => Ok(Self::OutForDelivery),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------        OrderId        -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------      OrderItem        -------------------------------------------------------
/// A line item snapshotted at checkout. Name and unit price are frozen copies; later catalog edits never
/// change what the customer was charged.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
}

impl OrderItem {
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

//--------------------------------------   CustomerDetails     -------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub phone: String,
    pub address: String,
}

//--------------------------------------        Order          -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub delivery_address: String,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub coupon_code: Option<String>,
    pub status: OrderStatusType,
    pub payment_id: Option<String>,
    pub courier_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Line items live in their own table and are attached after the row fetch.
    #[sqlx(skip)]
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Confirmed and not yet bound to a courier, i.e. a candidate for the assignment scan.
    pub fn is_assignable(&self) -> bool {
        self.status == OrderStatusType::Confirmed && self.courier_id.is_none()
    }

    pub fn age_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_minutes()
    }
}

//--------------------------------------       NewOrder        -------------------------------------------------------
/// A checkout result, ready to be persisted. Totals are computed at construction so that
/// `total == subtotal - discount` holds by the time the order reaches the store.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub delivery_address: String,
    pub items: Vec<OrderItem>,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub coupon_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(order_id: OrderId, customer_id: String, customer: CustomerDetails, items: Vec<OrderItem>) -> Self {
        let subtotal = items.iter().map(OrderItem::line_total).sum::<Money>();
        Self {
            order_id,
            customer_id,
            customer_name: customer.name,
            customer_phone: customer.phone,
            delivery_address: customer.address,
            items,
            subtotal,
            discount: Money::default(),
            total: subtotal,
            coupon_code: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_discount(mut self, coupon_code: String, discount: Money) -> Self {
        self.coupon_code = Some(coupon_code);
        self.discount = discount;
        self.total = self.subtotal - discount;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

//--------------------------------------       Courier         -------------------------------------------------------
/// A delivery partner. A courier carries at most one active order; `current_order_id` is the back-reference
/// and must only ever be set together with clearing `is_available`, and vice versa.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Courier {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub vehicle_number: String,
    pub is_available: bool,
    pub current_order_id: Option<OrderId>,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      NewCourier       -------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourier {
    pub name: String,
    pub phone: String,
    pub vehicle_number: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lifecycle_edges() {
        use OrderStatusType::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(OutForDelivery));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Refunded));
        assert!(OutForDelivery.can_transition_to(Delivered));

        // No skipping, no reversing
        assert!(!Pending.can_transition_to(OutForDelivery));
        assert!(!Pending.can_transition_to(Delivered));
        assert!(!Pending.can_transition_to(Refunded));
        assert!(!Confirmed.can_transition_to(Pending));
        assert!(!Confirmed.can_transition_to(Delivered));
        assert!(!OutForDelivery.can_transition_to(Cancelled));
        assert!(!OutForDelivery.can_transition_to(Refunded));
        for terminal in [Delivered, Cancelled, Refunded] {
            assert!(terminal.is_terminal());
            for next in [Pending, Confirmed, OutForDelivery, Delivered, Cancelled, Refunded] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            OrderStatusType::Pending,
            OrderStatusType::Confirmed,
            OrderStatusType::OutForDelivery,
            OrderStatusType::Delivered,
            OrderStatusType::Cancelled,
            OrderStatusType::Refunded,
        ] {
            assert_eq!(status.to_string().parse::<OrderStatusType>().unwrap(), status);
        }
        assert!("in_the_van".parse::<OrderStatusType>().is_err());
    }

    #[test]
    fn checkout_totals() {
        let items = vec![
            OrderItem { product_id: "p-1".into(), name: "Milk 1L".into(), quantity: 2, unit_price: Money::from(6_500) },
            OrderItem { product_id: "p-2".into(), name: "Bread".into(), quantity: 1, unit_price: Money::from(4_000) },
        ];
        let order = NewOrder::new(
            OrderId::from("ord-test".to_string()),
            "cust-1".to_string(),
            CustomerDetails { name: "A".into(), phone: "99".into(), address: "12 Lane".into() },
            items,
        );
        assert_eq!(order.subtotal, Money::from(17_000));
        assert_eq!(order.total, order.subtotal);

        let discounted = order.with_discount("FLAT10".to_string(), Money::from(1_700));
        assert_eq!(discounted.total, Money::from(15_300));
        assert_eq!(discounted.total, discounted.subtotal - discounted.discount);
    }
}
