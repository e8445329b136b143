use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use log::*;
use tokio::time::timeout;

use crate::{
    db::traits::{Assignment, FulfillmentDatabase, FulfillmentError},
    db_types::Order,
    events::{EventProducers, OrderAssignedEvent},
};

/// Eligibility windows and safety limits for the assignment scan.
///
/// First-time customers are fast-tracked; returning customers are throttled so that a burst of repeat orders
/// does not drain the courier pool ahead of new customers' first impressions.
#[derive(Clone, Copy, Debug)]
pub struct AssignmentConfig {
    /// Minimum order age before a first-time customer's order is assigned.
    pub first_order_delay: Duration,
    /// Minimum order age before a returning customer's order is assigned.
    pub repeat_order_delay: Duration,
    /// Cap on the time spent on a single order, so one slow storage call cannot stall the rest of the tick.
    pub per_order_timeout: std::time::Duration,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            first_order_delay: Duration::minutes(3),
            repeat_order_delay: Duration::minutes(15),
            per_order_timeout: std::time::Duration::from_secs(5),
        }
    }
}

/// What one scan did. The counts partition the working set: every confirmed-and-unassigned order lands in
/// exactly one bucket.
#[derive(Debug, Default, Clone)]
pub struct TickSummary {
    /// Orders that were bound to a courier this tick.
    pub assigned: Vec<Assignment>,
    /// Orders whose eligibility window has not elapsed yet.
    pub waiting: usize,
    /// Orders that were eligible, but found no courier available. Retried next tick.
    pub starved: usize,
    /// Orders whose processing failed or timed out. Logged and retried next tick.
    pub failed: usize,
}

impl TickSummary {
    pub fn assigned_count(&self) -> usize {
        self.assigned.len()
    }

    pub fn scanned_count(&self) -> usize {
        self.assigned.len() + self.waiting + self.starved + self.failed
    }
}

enum TickOutcome {
    Assigned(Box<Assignment>),
    NotYetEligible,
    NoCourierFree,
}

/// `AssignmentApi` owns the periodic courier-assignment scan: pick up every confirmed order without a
/// courier, wait out its eligibility window, and bind it to one available courier.
///
/// The scan carries no state between ticks and takes no locks; all arbitration happens in the storage
/// layer's conditional updates. Interrupting a tick at any point leaves orders `confirmed` and re-evaluated
/// on the next tick.
pub struct AssignmentApi<B> {
    db: B,
    config: AssignmentConfig,
    producers: EventProducers,
}

impl<B> Debug for AssignmentApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AssignmentApi")
    }
}

impl<B> AssignmentApi<B> {
    pub fn new(db: B, config: AssignmentConfig, producers: EventProducers) -> Self {
        Self { db, config, producers }
    }
}

impl<B> AssignmentApi<B>
where B: FulfillmentDatabase
{
    /// Runs one scan over all confirmed, unassigned orders as of `now`.
    ///
    /// `now` is supplied by the caller (the worker passes the wall clock) so that eligibility decisions are
    /// consistent across one tick and testable with a fixed clock. A failure on one order never aborts the
    /// rest of the scan.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> Result<TickSummary, FulfillmentError> {
        let candidates = self.db.fetch_unassigned_orders().await?;
        trace!("🚚️ {} confirmed order(s) awaiting assignment", candidates.len());
        let mut summary = TickSummary::default();
        for order in candidates {
            match timeout(self.config.per_order_timeout, self.process_order(&order, now)).await {
                Ok(Ok(TickOutcome::Assigned(assignment))) => {
                    self.call_order_assigned_hook(&assignment).await;
                    summary.assigned.push(*assignment);
                },
                Ok(Ok(TickOutcome::NotYetEligible)) => summary.waiting += 1,
                Ok(Ok(TickOutcome::NoCourierFree)) => {
                    debug!("🚚️ Order {} is eligible but no courier is available", order.order_id);
                    summary.starved += 1;
                },
                Ok(Err(e)) => {
                    warn!("🚚️ Could not process order {}: {e}. It will be retried on the next tick.", order.order_id);
                    summary.failed += 1;
                },
                Err(_) => {
                    warn!(
                        "🚚️ Processing order {} timed out after {:?}. It will be retried on the next tick.",
                        order.order_id, self.config.per_order_timeout
                    );
                    summary.failed += 1;
                },
            }
        }
        Ok(summary)
    }

    async fn process_order(&self, order: &Order, now: DateTime<Utc>) -> Result<TickOutcome, FulfillmentError> {
        let prior = self.db.count_assigned_orders_for_customer(&order.customer_id, &order.order_id).await?;
        let threshold =
            if prior == 0 { self.config.first_order_delay } else { self.config.repeat_order_delay };
        let age = now - order.created_at;
        if age < threshold {
            trace!(
                "🚚️ Order {} is {}min old; eligible at {}min",
                order.order_id,
                age.num_minutes(),
                threshold.num_minutes()
            );
            return Ok(TickOutcome::NotYetEligible);
        }
        match self.db.try_assign_courier(&order.order_id).await? {
            Some(assignment) => {
                info!(
                    "🚚️ Order {} assigned to courier {} ({})",
                    assignment.order.order_id, assignment.courier.id, assignment.courier.name
                );
                Ok(TickOutcome::Assigned(Box::new(assignment)))
            },
            None => Ok(TickOutcome::NoCourierFree),
        }
    }

    async fn call_order_assigned_hook(&self, assignment: &Assignment) {
        for producer in &self.producers.order_assigned_producer {
            producer
                .publish_event(OrderAssignedEvent::new(assignment.order.clone(), assignment.courier.clone()))
                .await;
        }
    }
}
