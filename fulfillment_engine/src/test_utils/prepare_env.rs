use gfs_common::Money;
use log::*;

use crate::{
    db::traits::CourierManagement,
    db_types::{Courier, CustomerDetails, NewCourier, OrderItem},
    SqliteDatabase,
};

/// Creates a fresh database at `url` (the file is created if missing), runs the migrations and initialises
/// logging. Returns the ready-to-use handle.
pub async fn prepare_test_env(url: &str) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    db.run_migrations().await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
    db
}

/// A unique throwaway database URL under the system temp directory, so parallel test binaries never share
/// state.
pub fn random_db_path() -> String {
    format!("sqlite://{}/gfs_test_store_{}.db", std::env::temp_dir().display(), rand::random::<u64>())
}

/// A small grocery cart: 2 × milk at ₹65.00, 1 × bread at ₹40.00. Subtotal ₹170.00.
pub fn sample_cart() -> Vec<OrderItem> {
    vec![
        OrderItem { product_id: "prod-milk".into(), name: "Milk 1L".into(), quantity: 2, unit_price: Money::from(6_500) },
        OrderItem { product_id: "prod-bread".into(), name: "Whole Wheat Bread".into(), quantity: 1, unit_price: Money::from(4_000) },
    ]
}

pub fn sample_customer() -> CustomerDetails {
    CustomerDetails { name: "Asha Rao".into(), phone: "98860-00000".into(), address: "14 Cunningham Rd".into() }
}

/// Registers `count` couriers, all available.
pub async fn seed_couriers(db: &SqliteDatabase, count: usize) -> Vec<Courier> {
    let mut couriers = Vec::with_capacity(count);
    for n in 1..=count {
        let courier = db
            .insert_courier(NewCourier {
                name: format!("Courier {n}"),
                phone: format!("90000-0000{n}"),
                vehicle_number: format!("KA-01-AB-{n:04}"),
                latitude: 12.97,
                longitude: 77.59,
            })
            .await
            .expect("Error seeding courier");
        couriers.push(courier);
    }
    couriers
}
