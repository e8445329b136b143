pub mod prepare_env;

pub use prepare_env::{prepare_test_env, random_db_path, sample_cart, sample_customer, seed_couriers};
