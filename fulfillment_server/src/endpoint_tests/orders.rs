use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use fulfillment_engine::{
    events::EventProducers,
    helpers::PaymentVerifier,
    test_utils::{prepare_test_env, random_db_path},
    OrderFlowApi,
    OrderQueryApi,
    SqliteDatabase,
};
use gfs_common::Secret;
use serde_json::{json, Value};

use crate::{
    endpoint_tests::mocks::{sample_courier, sample_order, MockBackend},
    routes::{CreateOrderRoute, OrderByIdRoute, TrackOrderRoute, ValidateCouponRoute, VerifyPaymentRoute},
};

const GATEWAY_SECRET: &str = "s3cret";

//-------------------------------------  Mock-backed query routes  ---------------------------------------------------

#[actix_web::test]
async fn missing_orders_are_a_404() {
    let mut mock = MockBackend::new();
    mock.expect_order_by_id().returning(|_| Ok(None));
    let api = OrderQueryApi::new(mock);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(api))
            .service(web::scope("/api").service(OrderByIdRoute::<MockBackend>::new())),
    )
    .await;
    let req = TestRequest::get().uri("/api/orders/ord-missing").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn tracking_surfaces_the_courier_contact_details() {
    let mut mock = MockBackend::new();
    mock.expect_order_by_id().returning(|_| Ok(Some(sample_order("ord-tracked"))));
    mock.expect_courier_by_id().returning(|id| Ok(Some(sample_courier(id))));
    let api = OrderQueryApi::new(mock);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(api))
            .service(web::scope("/api").service(TrackOrderRoute::<MockBackend>::new())),
    )
    .await;
    let req = TestRequest::get().uri("/api/orders/ord-tracked/track").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["status"], "out_for_delivery");
    assert_eq!(body["estimated_delivery"], "10-15 minutes");
    assert_eq!(body["courier"]["vehicle_number"], "KA-01-AB-0007");
}

//-------------------------------------  SQLite-backed flow routes  --------------------------------------------------

async fn sqlite_app(
    db: &SqliteDatabase,
) -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = actix_web::dev::ServiceResponse,
    Error = actix_web::Error,
> {
    let verifier = PaymentVerifier::new(Secret::new(GATEWAY_SECRET.to_string()));
    let flow = OrderFlowApi::new(db.clone(), verifier, EventProducers::default());
    let queries = OrderQueryApi::new(db.clone());
    test::init_service(
        App::new().app_data(web::Data::new(flow)).app_data(web::Data::new(queries)).service(
            web::scope("/api")
                .service(CreateOrderRoute::<SqliteDatabase>::new())
                .service(OrderByIdRoute::<SqliteDatabase>::new())
                .service(TrackOrderRoute::<SqliteDatabase>::new())
                .service(VerifyPaymentRoute::<SqliteDatabase>::new())
                .service(ValidateCouponRoute::<SqliteDatabase>::new()),
        ),
    )
    .await
}

fn checkout_payload() -> Value {
    json!({
        "customer_id": "cust-http",
        "user_details": { "name": "Asha Rao", "phone": "98860-00000", "address": "14 Cunningham Rd" },
        "items": [
            { "product_id": "prod-milk", "name": "Milk 1L", "quantity": 2, "unit_price": 6500 },
            { "product_id": "prod-bread", "name": "Whole Wheat Bread", "quantity": 1, "unit_price": 4000 }
        ],
        "coupon_code": "FLAT10"
    })
}

#[actix_web::test]
async fn checkout_verify_and_track_through_http() {
    let db = prepare_test_env(&random_db_path()).await;
    let app = sqlite_app(&db).await;

    // Checkout
    let req = TestRequest::post().uri("/api/orders").set_json(checkout_payload()).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let order: Value = test::read_body_json(res).await;
    assert_eq!(order["status"], "pending");
    assert_eq!(order["subtotal"], 17_000);
    assert_eq!(order["discount"], 1_700);
    assert_eq!(order["total"], 15_300);
    let order_id = order["order_id"].as_str().unwrap().to_string();

    // A wrong signature bounces with 400 and no state change.
    let req = TestRequest::post()
        .uri("/api/payments/verify")
        .set_json(json!({
            "order_id": order_id,
            "gateway_order_id": "gw-ord-1",
            "gateway_payment_id": "gw-pay-1",
            "signature": "deadbeef"
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // The genuine signature settles the order.
    let signature = PaymentVerifier::new(Secret::new(GATEWAY_SECRET.to_string()))
        .expected_signature("gw-ord-1", "gw-pay-1");
    let req = TestRequest::post()
        .uri("/api/payments/verify")
        .set_json(json!({
            "order_id": order_id,
            "gateway_order_id": "gw-ord-1",
            "gateway_payment_id": "gw-pay-1",
            "signature": signature
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["payment_id"], "gw-pay-1");

    // No courier yet, so tracking reports the wait.
    let req = TestRequest::get().uri(&format!("/api/orders/{order_id}/track")).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let tracking: Value = test::read_body_json(res).await;
    assert_eq!(tracking["status"], "confirmed");
    assert_eq!(tracking["estimated_delivery"], "Waiting for assignment");
    assert!(tracking["courier"].is_null());
}

#[actix_web::test]
async fn coupon_checks_report_validity_without_side_effects() {
    let db = prepare_test_env(&random_db_path()).await;
    let app = sqlite_app(&db).await;

    let req = TestRequest::post()
        .uri("/api/coupons/validate")
        .set_json(json!({ "coupon_code": "FLAT10", "subtotal": 500 }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["valid"], true);
    assert_eq!(body["discount"], 50);
    assert_eq!(body["final_amount"], 450);

    let req = TestRequest::post()
        .uri("/api/coupons/validate")
        .set_json(json!({ "coupon_code": "BOGUS", "subtotal": 500 }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["valid"], false);
    assert_eq!(body["discount"], 0);
    assert_eq!(body["final_amount"], 500);
}

#[actix_web::test]
async fn an_empty_cart_is_rejected_at_the_door() {
    let db = prepare_test_env(&random_db_path()).await;
    let app = sqlite_app(&db).await;
    let mut payload = checkout_payload();
    payload["items"] = json!([]);
    payload["coupon_code"] = Value::Null;
    let req = TestRequest::post().uri("/api/orders").set_json(payload).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
