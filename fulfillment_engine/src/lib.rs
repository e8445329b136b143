//! Grocery Fulfillment Engine
//!
//! The fulfillment engine drives grocery orders from checkout to the customer's door: payment settlement against
//! the external gateway, periodic courier assignment, and delivery completion. This library contains the core
//! logic for the engine. It is transport-agnostic; the HTTP surface lives in the `fulfillment_server` crate.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@db`]). SQLite is the supported backend. You should never need to
//!    access the database directly. Instead, use the public API provided by the engine. The exception is the data
//!    types used in the database. These are defined in the [`db_types`] module and are public.
//! 2. The engine public API ([`mod@fe_api`]). This provides the public-facing functionality of the fulfillment
//!    engine: order flow (checkout, payment verification, cancellation, refunds, delivery completion), the
//!    courier assignment scheduler, and read-side queries. Specific backends need to implement the traits in
//!    [`mod@db`] in order to act as a backend for the fulfillment server.
//!
//! The engine also provides a set of events that can be subscribed to. These events are emitted when certain
//! actions occur within the engine, for example when an order's payment is verified, a courier is bound to an
//! order, or a delivery completes. Hook into these via [`events`] to perform custom actions (notifications,
//! analytics) without touching order logic.
mod db;

pub mod coupons;
pub mod db_types;
pub mod events;
pub mod helpers;
mod fe_api;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use db::traits::{
    Assignment,
    CourierManagement,
    FulfillmentDatabase,
    FulfillmentError,
    OrderManagement,
};
pub use fe_api::{
    assignment_api::{AssignmentApi, AssignmentConfig, TickSummary},
    order_flow_api::OrderFlowApi,
    order_objects,
    order_query_api::OrderQueryApi,
};
