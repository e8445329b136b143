use std::{future::Future, pin::Pin, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use fulfillment_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    helpers::PaymentVerifier,
    OrderFlowApi,
    OrderQueryApi,
    SqliteDatabase,
};
use log::*;

use crate::{
    assignment_worker::start_assignment_worker,
    config::ServerConfig,
    errors::ServerError,
    routes::{
        health,
        AvailableCouriersRoute,
        CompleteDeliveryRoute,
        CourierByIdRoute,
        CouriersRoute,
        CreateOrderRoute,
        CustomerOrdersRoute,
        OrderByIdRoute,
        PaymentStatusRoute,
        RefundPaymentRoute,
        SetCourierAvailabilityRoute,
        TrackOrderRoute,
        UpdateOrderStatusRoute,
        ValidateCouponRoute,
        VerifyPaymentRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(16, default_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let worker = if config.disable_assignment_worker {
        info!("🚚️ Assignment worker is disabled on this instance; another process must run the scan");
        None
    } else {
        Some(start_assignment_worker(
            db.clone(),
            producers.clone(),
            config.assignment_interval,
            config.assignment_config(),
        ))
    };
    let srv = create_server_instance(config, db, producers)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    if let Some(worker) = worker {
        worker.abort();
    }
    result
}

/// The stock event subscribers: milestone log lines for the fulfillment pipeline. Deployments that need
/// more (push notifications, analytics) register their own hooks here.
fn default_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_order_assigned(|ev| {
        Box::pin(async move {
            info!("📣️ Order {} is on its way with {} ({})", ev.order.order_id, ev.courier.name, ev.courier.vehicle_number);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks.on_order_delivered(|ev| {
        Box::pin(async move {
            info!("📣️ Order {} has been delivered", ev.order.order_id);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let verifier = PaymentVerifier::new(config.gateway_secret.clone());
        let orders_api = OrderFlowApi::new(db.clone(), verifier, producers.clone());
        let query_api = OrderQueryApi::new(db.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("gfs::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(query_api));
        // NB: the static courier routes must be registered before the `{courier_id}` matcher.
        let api_scope = web::scope("/api")
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(CompleteDeliveryRoute::<SqliteDatabase>::new())
            .service(TrackOrderRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(CustomerOrdersRoute::<SqliteDatabase>::new())
            .service(VerifyPaymentRoute::<SqliteDatabase>::new())
            .service(RefundPaymentRoute::<SqliteDatabase>::new())
            .service(PaymentStatusRoute::<SqliteDatabase>::new())
            .service(ValidateCouponRoute::<SqliteDatabase>::new())
            .service(AvailableCouriersRoute::<SqliteDatabase>::new())
            .service(CouriersRoute::<SqliteDatabase>::new())
            .service(SetCourierAvailabilityRoute::<SqliteDatabase>::new())
            .service(CourierByIdRoute::<SqliteDatabase>::new());
        app.service(health).service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    info!("🚀️ Fulfillment server is listening");
    Ok(srv)
}
