//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will
//! cause the current worker to stop processing new requests. Any long, non-cpu-bound operation (I/O, database
//! operations, etc.) must be expressed as a future or an asynchronous function, so that worker threads keep
//! serving other requests while the operation completes.
use actix_web::{get, web, HttpResponse, Responder};
use fulfillment_engine::{
    db_types::OrderId,
    CourierManagement,
    FulfillmentDatabase,
    OrderFlowApi,
    OrderManagement,
    OrderQueryApi,
};
use log::*;

use crate::{
    data_objects::{
        AvailabilityUpdateRequest,
        CouponCheckRequest,
        CreateOrderRequest,
        PaymentStatusResult,
        PaymentVerificationRequest,
        PaymentVerificationResult,
        RefundRequest,
        StatusUpdateRequest,
    },
    errors::ServerError,
};

// Actix cannot handle generics in attribute-macro handlers, so routes over a generic backend are registered
// manually via the `route!` macro.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>); }
        paste::paste! { impl<B> [<$name:camel Route>]<B> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> B>)
            }
        }}
        paste::paste! { impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
        where
            B: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<B>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// ----------------------------------------------   Orders  ----------------------------------------------------

route!(create_order => Post "/orders" impl FulfillmentDatabase);
pub async fn create_order<B>(
    body: web::Json<CreateOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where B: FulfillmentDatabase {
    let req = body.into_inner();
    debug!("🛒️ POST create order for customer {}", req.customer_id);
    let order = api.create_order(req.customer_id, req.user_details, req.items, req.coupon_code).await?;
    Ok(HttpResponse::Created().json(order))
}

route!(order_by_id => Get "/orders/{order_id}" impl OrderManagement, CourierManagement);
pub async fn order_by_id<B>(
    path: web::Path<String>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError>
where B: OrderManagement + CourierManagement {
    let order_id = OrderId::from(path.into_inner());
    trace!("🛒️ GET order {order_id}");
    let order = api
        .order_by_id(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id}")))?;
    Ok(HttpResponse::Ok().json(order))
}

route!(track_order => Get "/orders/{order_id}/track" impl OrderManagement, CourierManagement);
pub async fn track_order<B>(
    path: web::Path<String>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError>
where B: OrderManagement + CourierManagement {
    let order_id = OrderId::from(path.into_inner());
    trace!("📦️ GET tracking for order {order_id}");
    let tracking = api.track_order(&order_id).await?;
    Ok(HttpResponse::Ok().json(tracking))
}

route!(update_order_status => Put "/orders/{order_id}/status" impl FulfillmentDatabase, OrderManagement);
pub async fn update_order_status<B>(
    path: web::Path<String>,
    body: web::Json<StatusUpdateRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where B: FulfillmentDatabase + OrderManagement {
    let order_id = OrderId::from(path.into_inner());
    let new_status = body.into_inner().status;
    debug!("🛒️ PUT order {order_id} status to {new_status}");
    let order = api.update_order_status(&order_id, new_status).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(complete_delivery => Put "/orders/{order_id}/complete" impl FulfillmentDatabase);
pub async fn complete_delivery<B>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where B: FulfillmentDatabase {
    let order_id = OrderId::from(path.into_inner());
    debug!("📦️ PUT complete delivery for order {order_id}");
    let (order, _courier) = api.complete_delivery(&order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(customer_orders => Get "/customers/{customer_id}/orders" impl OrderManagement, CourierManagement);
pub async fn customer_orders<B>(
    path: web::Path<String>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError>
where B: OrderManagement + CourierManagement {
    let customer_id = path.into_inner();
    trace!("🛒️ GET order history for customer {customer_id}");
    let orders = api.orders_for_customer(&customer_id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

// ---------------------------------------------   Payments  ---------------------------------------------------

route!(verify_payment => Post "/payments/verify" impl FulfillmentDatabase);
pub async fn verify_payment<B>(
    body: web::Json<PaymentVerificationRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where B: FulfillmentDatabase {
    let req = body.into_inner();
    debug!("💳️ POST verify payment {} for order {}", req.gateway_payment_id, req.order_id);
    let order =
        api.verify_payment(&req.order_id, &req.gateway_order_id, &req.gateway_payment_id, &req.signature).await?;
    let result = PaymentVerificationResult {
        success: true,
        order_id: order.order_id,
        payment_id: req.gateway_payment_id,
        message: "Payment verified successfully".to_string(),
    };
    Ok(HttpResponse::Ok().json(result))
}

route!(payment_status => Get "/payments/{payment_id}" impl OrderManagement, CourierManagement);
pub async fn payment_status<B>(
    path: web::Path<String>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError>
where B: OrderManagement + CourierManagement {
    let payment_id = path.into_inner();
    trace!("💳️ GET status of payment {payment_id}");
    let order = api
        .order_by_payment_id(&payment_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Payment {payment_id}")))?;
    let result =
        PaymentStatusResult { payment_id, order_id: order.order_id, status: order.status, amount: order.total };
    Ok(HttpResponse::Ok().json(result))
}

route!(refund_payment => Post "/payments/refund" impl FulfillmentDatabase, OrderManagement);
pub async fn refund_payment<B>(
    body: web::Json<RefundRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where B: FulfillmentDatabase + OrderManagement {
    let req = body.into_inner();
    debug!("💳️ POST refund payment {}", req.payment_id);
    let order = api.refund_by_payment_id(&req.payment_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

// ----------------------------------------------   Coupons  ---------------------------------------------------

route!(validate_coupon => Post "/coupons/validate" impl FulfillmentDatabase);
pub async fn validate_coupon<B>(
    body: web::Json<CouponCheckRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where B: FulfillmentDatabase {
    let req = body.into_inner();
    trace!("🏷️ POST validate coupon {}", req.coupon_code);
    let result = api.validate_coupon(&req.coupon_code, req.subtotal);
    Ok(HttpResponse::Ok().json(result))
}

// ----------------------------------------------   Couriers  --------------------------------------------------

route!(couriers => Get "/couriers" impl OrderManagement, CourierManagement);
pub async fn couriers<B>(api: web::Data<OrderQueryApi<B>>) -> Result<HttpResponse, ServerError>
where B: OrderManagement + CourierManagement {
    let couriers = api.fetch_couriers(false).await?;
    Ok(HttpResponse::Ok().json(couriers))
}

route!(available_couriers => Get "/couriers/available" impl OrderManagement, CourierManagement);
pub async fn available_couriers<B>(api: web::Data<OrderQueryApi<B>>) -> Result<HttpResponse, ServerError>
where B: OrderManagement + CourierManagement {
    let couriers = api.fetch_couriers(true).await?;
    Ok(HttpResponse::Ok().json(couriers))
}

route!(courier_by_id => Get "/couriers/{courier_id}" impl OrderManagement, CourierManagement);
pub async fn courier_by_id<B>(
    path: web::Path<i64>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError>
where B: OrderManagement + CourierManagement {
    let courier_id = path.into_inner();
    let courier = api
        .courier_by_id(courier_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Courier {courier_id}")))?;
    Ok(HttpResponse::Ok().json(courier))
}

route!(set_courier_availability => Put "/couriers/{courier_id}/availability" impl FulfillmentDatabase);
pub async fn set_courier_availability<B>(
    path: web::Path<i64>,
    body: web::Json<AvailabilityUpdateRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where B: FulfillmentDatabase {
    let courier_id = path.into_inner();
    let req = body.into_inner();
    debug!("🚚️ PUT courier {courier_id} availability to {}", req.is_available);
    let courier = api.set_courier_availability(courier_id, req.is_available).await?;
    Ok(HttpResponse::Ok().json(courier))
}
