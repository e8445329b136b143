use chrono::Duration;
use fulfillment_engine::{
    db_types::{Order, OrderStatusType},
    events::EventProducers,
    helpers::PaymentVerifier,
    test_utils::{prepare_test_env, random_db_path, sample_cart, sample_customer, seed_couriers},
    AssignmentApi,
    AssignmentConfig,
    OrderFlowApi,
    OrderQueryApi,
    SqliteDatabase,
};
use gfs_common::Secret;

fn flow_api(db: &SqliteDatabase) -> OrderFlowApi<SqliteDatabase> {
    OrderFlowApi::new(db.clone(), PaymentVerifier::new(Secret::new("s3cret".to_string())), EventProducers::default())
}

fn assigner(db: &SqliteDatabase) -> AssignmentApi<SqliteDatabase> {
    AssignmentApi::new(db.clone(), AssignmentConfig::default(), EventProducers::default())
}

/// Checkout plus manual confirmation, so the order sits in the scheduler's working set.
async fn confirmed_order(flow: &OrderFlowApi<SqliteDatabase>, customer_id: &str) -> Order {
    let order = flow
        .create_order(customer_id.to_string(), sample_customer(), sample_cart(), None)
        .await
        .expect("Error creating order");
    flow.update_order_status(&order.order_id, OrderStatusType::Confirmed).await.expect("Error confirming order")
}

#[tokio::test]
async fn first_time_customers_are_fast_tracked_after_three_minutes() {
    let db = prepare_test_env(&random_db_path()).await;
    seed_couriers(&db, 1).await;
    let flow = flow_api(&db);
    let scan = assigner(&db);

    let order = confirmed_order(&flow, "cust-first").await;

    // Two minutes in: the window has not elapsed, the order stays put.
    let summary = scan.run_tick(order.created_at + Duration::minutes(2)).await.unwrap();
    assert_eq!(summary.assigned_count(), 0);
    assert_eq!(summary.waiting, 1);
    let queries = OrderQueryApi::new(db.clone());
    assert_eq!(queries.order_by_id(&order.order_id).await.unwrap().unwrap().status, OrderStatusType::Confirmed);

    // Three minutes in: assigned.
    let summary = scan.run_tick(order.created_at + Duration::minutes(3)).await.unwrap();
    assert_eq!(summary.assigned_count(), 1);
    let order = queries.order_by_id(&order.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::OutForDelivery);
    assert!(order.courier_id.is_some());
}

#[tokio::test]
async fn returning_customers_wait_out_the_longer_window() {
    let db = prepare_test_env(&random_db_path()).await;
    seed_couriers(&db, 1).await;
    let flow = flow_api(&db);
    let scan = assigner(&db);

    // First order goes through the whole pipeline, so the customer now has assignment history.
    let first = confirmed_order(&flow, "cust-repeat").await;
    let summary = scan.run_tick(first.created_at + Duration::minutes(3)).await.unwrap();
    assert_eq!(summary.assigned_count(), 1);
    flow.complete_delivery(&first.order_id).await.expect("Error completing first delivery");

    let second = confirmed_order(&flow, "cust-repeat").await;

    // Ten minutes in: a first-timer would have been assigned long ago, a repeat customer is still throttled.
    let summary = scan.run_tick(second.created_at + Duration::minutes(10)).await.unwrap();
    assert_eq!(summary.assigned_count(), 0);
    assert_eq!(summary.waiting, 1);

    // Sixteen minutes in: assigned.
    let summary = scan.run_tick(second.created_at + Duration::minutes(16)).await.unwrap();
    assert_eq!(summary.assigned_count(), 1);
}

#[tokio::test]
async fn both_tiers_are_served_within_a_single_tick() {
    let db = prepare_test_env(&random_db_path()).await;
    seed_couriers(&db, 2).await;
    let flow = flow_api(&db);
    let scan = assigner(&db);

    // Give the repeat customer history first.
    let prior = confirmed_order(&flow, "cust-mixed-repeat").await;
    scan.run_tick(prior.created_at + Duration::minutes(3)).await.unwrap();
    flow.complete_delivery(&prior.order_id).await.unwrap();

    let repeat = confirmed_order(&flow, "cust-mixed-repeat").await;
    let newcomer = confirmed_order(&flow, "cust-mixed-new").await;

    // A single scan 16 minutes out clears both eligibility classes; arrival order does not matter.
    let summary = scan.run_tick(repeat.created_at + Duration::minutes(16)).await.unwrap();
    assert_eq!(summary.assigned_count(), 2);
    let queries = OrderQueryApi::new(db.clone());
    for oid in [&repeat.order_id, &newcomer.order_id] {
        assert_eq!(queries.order_by_id(oid).await.unwrap().unwrap().status, OrderStatusType::OutForDelivery);
    }
}

#[tokio::test]
async fn an_empty_pool_leaves_orders_for_the_next_tick() {
    let db = prepare_test_env(&random_db_path()).await;
    // No couriers seeded at all.
    let flow = flow_api(&db);
    let scan = assigner(&db);
    let order = confirmed_order(&flow, "cust-starved").await;

    let summary = scan.run_tick(order.created_at + Duration::minutes(5)).await.unwrap();
    assert_eq!(summary.assigned_count(), 0);
    assert_eq!(summary.starved, 1);
    assert_eq!(summary.failed, 0, "an empty pool is not an error");

    // The order is still waiting, and a courier coming online gets it picked up.
    seed_couriers(&db, 1).await;
    let summary = scan.run_tick(order.created_at + Duration::minutes(6)).await.unwrap();
    assert_eq!(summary.assigned_count(), 1);
}

#[tokio::test]
async fn a_tick_with_nothing_to_do_changes_nothing() {
    let db = prepare_test_env(&random_db_path()).await;
    let couriers = seed_couriers(&db, 2).await;
    let flow = flow_api(&db);
    let scan = assigner(&db);
    let order = confirmed_order(&flow, "cust-idem").await;

    let summary = scan.run_tick(order.created_at + Duration::minutes(3)).await.unwrap();
    assert_eq!(summary.assigned_count(), 1);

    // Re-running immediately finds an empty working set: same orders, same couriers, no new bindings.
    let summary = scan.run_tick(order.created_at + Duration::minutes(4)).await.unwrap();
    assert_eq!(summary.scanned_count(), 0);

    let queries = OrderQueryApi::new(db.clone());
    let busy: Vec<_> =
        queries.fetch_couriers(false).await.unwrap().into_iter().filter(|c| !c.is_available).collect();
    assert_eq!(busy.len(), 1);
    assert_eq!(couriers.len(), 2);
}

#[tokio::test]
async fn availability_toggle_takes_a_courier_off_shift() {
    let db = prepare_test_env(&random_db_path()).await;
    let couriers = seed_couriers(&db, 1).await;
    let flow = flow_api(&db);
    let scan = assigner(&db);
    let order = confirmed_order(&flow, "cust-offshift").await;

    // The only courier goes off shift; the eligible order starves rather than being bound.
    use fulfillment_engine::FulfillmentDatabase;
    let parked = db.set_courier_availability(couriers[0].id, false).await.unwrap();
    assert!(!parked.is_available);
    assert!(parked.current_order_id.is_none());

    let summary = scan.run_tick(order.created_at + Duration::minutes(5)).await.unwrap();
    assert_eq!(summary.starved, 1);

    // Back on shift, the next tick assigns. Setting available clears any stale back-reference.
    let back = db.set_courier_availability(couriers[0].id, true).await.unwrap();
    assert!(back.is_available);
    let summary = scan.run_tick(order.created_at + Duration::minutes(6)).await.unwrap();
    assert_eq!(summary.assigned_count(), 1);
}
