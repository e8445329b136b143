//! Database management and control.
//!
//! This module provides the interfaces that define the contracts of the fulfillment engine database *backends*.
//!
//! ## Traits
//! * [`traits::FulfillmentDatabase`] defines the highest level of behaviour for backends supporting the engine:
//!   every mutation is a single atomic conditional update keyed on the fields being guarded, so the assignment
//!   scheduler and the request handlers can run against the same records without in-process locks.
//! * [`traits::OrderManagement`] defines the behaviour for querying orders.
//! * [`traits::CourierManagement`] defines the behaviour for querying and onboarding couriers.

#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;
