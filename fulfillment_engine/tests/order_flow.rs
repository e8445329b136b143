use chrono::Duration;
use fulfillment_engine::{
    db_types::{OrderId, OrderStatusType},
    events::EventProducers,
    helpers::PaymentVerifier,
    test_utils::{prepare_test_env, random_db_path, sample_cart, sample_customer, seed_couriers},
    AssignmentApi,
    AssignmentConfig,
    FulfillmentError,
    OrderFlowApi,
    OrderQueryApi,
    SqliteDatabase,
};
use gfs_common::{Money, Secret};

const GATEWAY_SECRET: &str = "s3cret";

fn verifier() -> PaymentVerifier {
    PaymentVerifier::new(Secret::new(GATEWAY_SECRET.to_string()))
}

fn flow_api(db: &SqliteDatabase) -> OrderFlowApi<SqliteDatabase> {
    OrderFlowApi::new(db.clone(), verifier(), EventProducers::default())
}

async fn checkout(flow: &OrderFlowApi<SqliteDatabase>, customer_id: &str) -> fulfillment_engine::db_types::Order {
    flow.create_order(customer_id.to_string(), sample_customer(), sample_cart(), None)
        .await
        .expect("Error creating order")
}

#[tokio::test]
async fn order_is_fulfilled_end_to_end() {
    let db = prepare_test_env(&random_db_path()).await;
    seed_couriers(&db, 1).await;
    let flow = flow_api(&db);
    let queries = OrderQueryApi::new(db.clone());

    // Checkout: totals computed from the snapshot, nothing assigned, nothing paid.
    let order = checkout(&flow, "cust-e2e").await;
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(order.subtotal, Money::from(17_000));
    assert_eq!(order.total, order.subtotal - order.discount);
    assert!(order.payment_id.is_none());
    assert!(order.courier_id.is_none());
    assert_eq!(order.items.len(), 2);

    // The gateway confirms; the signature checks out and the order settles.
    let signature = verifier().expected_signature("gw-ord-1", "gw-pay-1");
    let order = flow
        .verify_payment(&order.order_id, "gw-ord-1", "gw-pay-1", &signature)
        .await
        .expect("Error verifying payment");
    assert_eq!(order.status, OrderStatusType::Confirmed);
    assert_eq!(order.payment_id.as_deref(), Some("gw-pay-1"));

    // Three minutes later the scheduler picks the order up and binds the courier.
    let assigner = AssignmentApi::new(db.clone(), AssignmentConfig::default(), EventProducers::default());
    let summary = assigner.run_tick(order.created_at + Duration::minutes(3)).await.expect("Error running tick");
    assert_eq!(summary.assigned_count(), 1);
    let assignment = &summary.assigned[0];
    assert_eq!(assignment.order.status, OrderStatusType::OutForDelivery);
    assert_eq!(assignment.order.courier_id, Some(assignment.courier.id));
    assert!(!assignment.courier.is_available);
    assert_eq!(assignment.courier.current_order_id.as_ref(), Some(&order.order_id));

    let tracking = queries.track_order(&order.order_id).await.expect("Error tracking order");
    assert_eq!(tracking.status, OrderStatusType::OutForDelivery);
    assert_eq!(tracking.estimated_delivery, "10-15 minutes");
    assert!(tracking.courier.is_some());

    // Handover releases the courier back to the pool.
    let (order, courier) = flow.complete_delivery(&order.order_id).await.expect("Error completing delivery");
    assert_eq!(order.status, OrderStatusType::Delivered);
    let courier = courier.expect("A courier should have been bound");
    assert!(courier.is_available);
    assert!(courier.current_order_id.is_none());
    // The order keeps the historical courier reference.
    assert_eq!(order.courier_id, Some(courier.id));
}

#[tokio::test]
async fn forged_signatures_leave_the_order_untouched() {
    let db = prepare_test_env(&random_db_path()).await;
    let flow = flow_api(&db);
    let order = checkout(&flow, "cust-sig").await;

    let good = verifier().expected_signature("gw-ord-2", "gw-pay-2");
    let mut forged = good.clone().into_bytes();
    forged[0] = if forged[0] == b'a' { b'b' } else { b'a' };
    let forged = String::from_utf8(forged).unwrap();

    let err = flow.verify_payment(&order.order_id, "gw-ord-2", "gw-pay-2", &forged).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::InvalidPaymentSignature));

    let queries = OrderQueryApi::new(db.clone());
    let unchanged = queries.order_by_id(&order.order_id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, OrderStatusType::Pending);
    assert!(unchanged.payment_id.is_none());

    // The genuine signature still settles it afterwards.
    let order = flow.verify_payment(&order.order_id, "gw-ord-2", "gw-pay-2", &good).await.unwrap();
    assert_eq!(order.status, OrderStatusType::Confirmed);
}

#[tokio::test]
async fn verifying_an_unknown_order_is_not_found() {
    let db = prepare_test_env(&random_db_path()).await;
    let flow = flow_api(&db);
    let signature = verifier().expected_signature("gw-ord-x", "gw-pay-x");
    let missing = OrderId::from("ord-doesnotexist".to_string());
    let err = flow.verify_payment(&missing, "gw-ord-x", "gw-pay-x", &signature).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::OrderNotFound(_)));
}

#[tokio::test]
async fn coupons_discount_the_checkout_total() {
    let db = prepare_test_env(&random_db_path()).await;
    let flow = flow_api(&db);

    let order = flow
        .create_order("cust-coupon".to_string(), sample_customer(), sample_cart(), Some("FLAT10".to_string()))
        .await
        .expect("Error creating order");
    assert_eq!(order.subtotal, Money::from(17_000));
    assert_eq!(order.discount, Money::from(1_700));
    assert_eq!(order.total, Money::from(15_300));
    assert_eq!(order.coupon_code.as_deref(), Some("FLAT10"));

    let err = flow
        .create_order("cust-coupon".to_string(), sample_customer(), sample_cart(), Some("BOGUS".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, FulfillmentError::InvalidCoupon(_)));

    let check = flow.validate_coupon("FLAT10", Money::from(500));
    assert!(check.valid);
    assert_eq!(check.discount, Money::from(50));
    assert_eq!(check.final_amount, Money::from(450));

    let check = flow.validate_coupon("BOGUS", Money::from(500));
    assert!(!check.valid);
    assert_eq!(check.discount, Money::from(0));
    assert_eq!(check.final_amount, Money::from(500));
}

#[tokio::test]
async fn an_empty_cart_cannot_be_checked_out() {
    let db = prepare_test_env(&random_db_path()).await;
    let flow = flow_api(&db);
    let err = flow.create_order("cust-empty".to_string(), sample_customer(), vec![], None).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::EmptyCart));
}

#[tokio::test]
async fn cancellation_closes_the_order_for_good() {
    let db = prepare_test_env(&random_db_path()).await;
    let flow = flow_api(&db);
    let order = checkout(&flow, "cust-cancel").await;

    let cancelled = flow.cancel_order(&order.order_id).await.expect("Error cancelling");
    assert_eq!(cancelled.status, OrderStatusType::Cancelled);

    // Payment arriving after cancellation must not resurrect the order.
    let signature = verifier().expected_signature("gw-ord-3", "gw-pay-3");
    let err = flow.verify_payment(&order.order_id, "gw-ord-3", "gw-pay-3", &signature).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::TransitionNotAllowed { .. }));

    // And cancelling twice is a conflict, not a silent success.
    let err = flow.cancel_order(&order.order_id).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::TransitionNotAllowed { .. }));
}

#[tokio::test]
async fn refunds_require_a_settled_payment() {
    let db = prepare_test_env(&random_db_path()).await;
    let flow = flow_api(&db);

    // A pending order has nothing to refund.
    let order = checkout(&flow, "cust-refund").await;
    let err = flow.refund_order(&order.order_id).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::NothingToRefund(_)));

    // Once settled, the refund flows through and is terminal.
    let signature = verifier().expected_signature("gw-ord-4", "gw-pay-4");
    flow.verify_payment(&order.order_id, "gw-ord-4", "gw-pay-4", &signature).await.unwrap();
    let refunded = flow.refund_by_payment_id("gw-pay-4").await.expect("Error refunding");
    assert_eq!(refunded.status, OrderStatusType::Refunded);

    let err = flow.refund_by_payment_id("gw-pay-unknown").await.unwrap_err();
    assert!(matches!(err, FulfillmentError::PaymentNotFound(_)));
}

#[tokio::test]
async fn administrative_status_changes_respect_the_lifecycle() {
    let db = prepare_test_env(&random_db_path()).await;
    let flow = flow_api(&db);
    let order = checkout(&flow, "cust-admin").await;

    // Manual confirmation records no payment id.
    let confirmed = flow.update_order_status(&order.order_id, OrderStatusType::Confirmed).await.unwrap();
    assert_eq!(confirmed.status, OrderStatusType::Confirmed);
    assert!(confirmed.payment_id.is_none());

    // Fabricating an assignment by hand is refused; the scheduler owns that edge.
    let err = flow.update_order_status(&order.order_id, OrderStatusType::OutForDelivery).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::ManualAssignmentForbidden(_)));

    // Skipping ahead is refused.
    let err = flow.update_order_status(&order.order_id, OrderStatusType::Delivered).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::TransitionNotAllowed { .. }));

    // Setting the current status again is reported as a no-op.
    let err = flow.update_order_status(&order.order_id, OrderStatusType::Confirmed).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::StatusUnchanged(_)));

    let cancelled = flow.update_order_status(&order.order_id, OrderStatusType::Cancelled).await.unwrap();
    assert_eq!(cancelled.status, OrderStatusType::Cancelled);

    // Terminal means terminal, also for admins.
    let err = flow.update_order_status(&order.order_id, OrderStatusType::Pending).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::TransitionNotAllowed { .. }));
}

#[tokio::test]
async fn customer_history_is_most_recent_first() {
    let db = prepare_test_env(&random_db_path()).await;
    let flow = flow_api(&db);
    let queries = OrderQueryApi::new(db.clone());

    let first = checkout(&flow, "cust-history").await;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let second = checkout(&flow, "cust-history").await;
    checkout(&flow, "cust-other").await;

    let history = queries.orders_for_customer("cust-history").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].order_id, second.order_id);
    assert_eq!(history[1].order_id, first.order_id);
    assert_eq!(history[0].items.len(), 2, "history carries the line items");
}
