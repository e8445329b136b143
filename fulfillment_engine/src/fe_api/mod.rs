//! # Fulfillment engine public API
//!
//! The `fe_api` module exposes the programmatic API for the fulfillment engine. The API is modular, so that
//! clients can pick and choose the functionality they need, and different parts (the scheduler, the order
//! flow, the read side) can run in separate processes against the same store.
//!
//! * [`order_flow_api`] handles the mutating order flow: checkout, payment verification, status changes,
//!   cancellation, refunds and delivery completion.
//! * [`assignment_api`] owns the periodic courier-assignment scan.
//! * [`order_query_api`] is the read side: order lookups, customer history, tracking, and courier queries.
//!
//! The pattern for using all the APIs is the same. An API instance is created by supplying a database backend
//! that implements the backend traits the API requires:
//!
//! ```rust,ignore
//! use fulfillment_engine::{OrderQueryApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/gfs_store.db", 25).await?;
//! // SqliteDatabase implements OrderManagement and CourierManagement
//! let api = OrderQueryApi::new(db);
//! let order = api.order_by_id(&oid).await?;
//! ```

pub mod assignment_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod order_query_api;
