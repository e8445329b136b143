//! Contention tests for the courier pool: many assignment attempts racing over few couriers must never
//! double-book, and must leave the availability flag and back-reference consistent on every courier.

use std::collections::HashSet;

use chrono::Duration;
use fulfillment_engine::{
    db_types::{OrderId, OrderStatusType},
    events::EventProducers,
    helpers::PaymentVerifier,
    test_utils::{prepare_test_env, random_db_path, sample_cart, sample_customer, seed_couriers},
    AssignmentApi,
    AssignmentConfig,
    CourierManagement,
    FulfillmentDatabase,
    OrderFlowApi,
    OrderManagement,
    SqliteDatabase,
};
use gfs_common::Secret;
use log::*;
use tokio::runtime::Runtime;

const NUM_ORDERS: usize = 8;
const NUM_COURIERS: usize = 3;

fn flow_api(db: &SqliteDatabase) -> OrderFlowApi<SqliteDatabase> {
    OrderFlowApi::new(db.clone(), PaymentVerifier::new(Secret::new("s3cret".to_string())), EventProducers::default())
}

async fn seed_confirmed_orders(db: &SqliteDatabase, count: usize) -> Vec<OrderId> {
    let flow = flow_api(db);
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let order = flow
            .create_order(format!("burst-cust-{i}"), sample_customer(), sample_cart(), None)
            .await
            .expect("Error creating order");
        flow.update_order_status(&order.order_id, OrderStatusType::Confirmed).await.expect("Error confirming");
        ids.push(order.order_id);
    }
    ids
}

async fn assert_pool_consistent(db: &SqliteDatabase) {
    for courier in db.fetch_couriers(false).await.unwrap() {
        assert_eq!(
            courier.is_available,
            courier.current_order_id.is_none(),
            "Courier {} is {}available but bound to {:?}",
            courier.id,
            if courier.is_available { "" } else { "un" },
            courier.current_order_id
        );
    }
}

#[test]
fn concurrent_acquisitions_never_double_book_a_courier() {
    info!("🚀️ Starting courier contention test");
    let sys = Runtime::new().unwrap();

    sys.block_on(async move {
        let db = prepare_test_env(&random_db_path()).await;
        seed_couriers(&db, NUM_COURIERS).await;
        let order_ids = seed_confirmed_orders(&db, NUM_ORDERS).await;

        // Fire every acquisition at once. More orders than couriers: exactly the pool size may win.
        let mut handles = Vec::with_capacity(NUM_ORDERS);
        for oid in order_ids.clone() {
            let db = db.clone();
            handles.push(tokio::spawn(async move { db.try_assign_courier(&oid).await }));
        }
        let mut bound_couriers = HashSet::new();
        let mut wins = 0;
        let mut losses = 0;
        for handle in handles {
            match handle.await.unwrap().expect("Acquisition returned an error") {
                Some(assignment) => {
                    wins += 1;
                    assert!(
                        bound_couriers.insert(assignment.courier.id),
                        "Courier {} was bound twice",
                        assignment.courier.id
                    );
                    assert_eq!(assignment.order.status, OrderStatusType::OutForDelivery);
                },
                None => losses += 1,
            }
        }
        assert_eq!(wins, NUM_COURIERS);
        assert_eq!(losses, NUM_ORDERS - NUM_COURIERS);
        assert_pool_consistent(&db).await;

        // The losers are untouched and stay in the working set for the next tick.
        let mut still_waiting = 0;
        for oid in &order_ids {
            let order = db.order_by_id(oid).await.unwrap().unwrap();
            match order.status {
                OrderStatusType::OutForDelivery => assert!(order.courier_id.is_some()),
                OrderStatusType::Confirmed => {
                    assert!(order.courier_id.is_none());
                    still_waiting += 1;
                },
                other => panic!("Order {oid} ended the burst in state {other}"),
            }
        }
        assert_eq!(still_waiting, NUM_ORDERS - NUM_COURIERS);
    });
    info!("🚀️ Contention test complete");
}

#[test]
fn concurrent_ticks_split_the_pool_without_overlap() {
    let sys = Runtime::new().unwrap();

    sys.block_on(async move {
        let db = prepare_test_env(&random_db_path()).await;
        seed_couriers(&db, NUM_COURIERS).await;
        seed_confirmed_orders(&db, NUM_ORDERS).await;
        let now = chrono::Utc::now() + Duration::minutes(5);

        // Two scheduler instances race over the same store, as two processes would.
        let a = AssignmentApi::new(db.clone(), AssignmentConfig::default(), EventProducers::default());
        let b = AssignmentApi::new(db.clone(), AssignmentConfig::default(), EventProducers::default());
        let (ra, rb) = tokio::join!(a.run_tick(now), b.run_tick(now));
        let (ra, rb) = (ra.expect("Tick A failed"), rb.expect("Tick B failed"));

        // Between them the ticks hand out the whole pool exactly once.
        let mut bound_couriers = HashSet::new();
        let mut bound_orders = HashSet::new();
        for assignment in ra.assigned.iter().chain(rb.assigned.iter()) {
            assert!(bound_couriers.insert(assignment.courier.id), "A courier was handed out twice");
            assert!(bound_orders.insert(assignment.order.order_id.clone()), "An order was assigned twice");
        }
        assert_eq!(bound_couriers.len(), NUM_COURIERS);
        assert_pool_consistent(&db).await;
    });
}
