use std::{env, time::Duration as StdDuration};

use chrono::Duration;
use fulfillment_engine::AssignmentConfig;
use gfs_common::{parse_boolean_flag, Secret};
use log::*;

const DEFAULT_GFS_HOST: &str = "127.0.0.1";
const DEFAULT_GFS_PORT: u16 = 8380;
const DEFAULT_ASSIGNMENT_INTERVAL: StdDuration = StdDuration::from_secs(60);
const DEFAULT_FIRST_ORDER_DELAY_MINUTES: i64 = 3;
const DEFAULT_REPEAT_ORDER_DELAY_MINUTES: i64 = 15;
const DEFAULT_PER_ORDER_TIMEOUT_SECS: u64 = 5;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The secret shared with the payment gateway, used to verify confirmation signatures. When unset, the
    /// server runs but refuses all payment verifications.
    pub gateway_secret: Secret<String>,
    /// How often the assignment worker wakes up and scans for confirmed, unassigned orders.
    pub assignment_interval: StdDuration,
    /// Minimum order age before a first-time customer's order is assigned a courier.
    pub first_order_delay: Duration,
    /// Minimum order age before a returning customer's order is assigned a courier.
    pub repeat_order_delay: Duration,
    /// Cap on the time the scan spends on any single order.
    pub per_order_timeout: StdDuration,
    /// When true, this instance serves the API only and runs no assignment worker. Useful when the worker
    /// runs in a separate process against the same store.
    pub disable_assignment_worker: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_GFS_HOST.to_string(),
            port: DEFAULT_GFS_PORT,
            database_url: String::default(),
            gateway_secret: Secret::new(String::default()),
            assignment_interval: DEFAULT_ASSIGNMENT_INTERVAL,
            first_order_delay: Duration::minutes(DEFAULT_FIRST_ORDER_DELAY_MINUTES),
            repeat_order_delay: Duration::minutes(DEFAULT_REPEAT_ORDER_DELAY_MINUTES),
            per_order_timeout: StdDuration::from_secs(DEFAULT_PER_ORDER_TIMEOUT_SECS),
            disable_assignment_worker: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("GFS_HOST").ok().unwrap_or_else(|| DEFAULT_GFS_HOST.into());
        let port = env::var("GFS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for GFS_PORT. {e} Using the default, {DEFAULT_GFS_PORT}, instead."
                    );
                    DEFAULT_GFS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_GFS_PORT);
        let database_url = env::var("GFS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ GFS_DATABASE_URL is not set. Please set it to the URL for the fulfillment database.");
            String::default()
        });
        let gateway_secret = configure_gateway_secret();
        let assignment_interval = env::var("GFS_ASSIGNMENT_INTERVAL_SECS")
            .map_err(|_| {
                info!(
                    "🪛️ GFS_ASSIGNMENT_INTERVAL_SECS is not set. Using the default of {}s.",
                    DEFAULT_ASSIGNMENT_INTERVAL.as_secs()
                )
            })
            .and_then(|s| {
                s.parse::<u64>()
                    .map(StdDuration::from_secs)
                    .map_err(|e| warn!("🪛️ Invalid configuration value for GFS_ASSIGNMENT_INTERVAL_SECS. {e}"))
            })
            .ok()
            .unwrap_or(DEFAULT_ASSIGNMENT_INTERVAL);
        let (first_order_delay, repeat_order_delay) = configure_eligibility_windows();
        let per_order_timeout = env::var("GFS_ASSIGNMENT_ORDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(StdDuration::from_secs)
            .unwrap_or_else(|| StdDuration::from_secs(DEFAULT_PER_ORDER_TIMEOUT_SECS));
        let disable_assignment_worker =
            parse_boolean_flag(env::var("GFS_DISABLE_ASSIGNMENT_WORKER").ok(), false);
        Self {
            host,
            port,
            database_url,
            gateway_secret,
            assignment_interval,
            first_order_delay,
            repeat_order_delay,
            per_order_timeout,
            disable_assignment_worker,
        }
    }

    /// The slice of the configuration the assignment scan needs.
    pub fn assignment_config(&self) -> AssignmentConfig {
        AssignmentConfig {
            first_order_delay: self.first_order_delay,
            repeat_order_delay: self.repeat_order_delay,
            per_order_timeout: self.per_order_timeout,
        }
    }
}

fn configure_gateway_secret() -> Secret<String> {
    match env::var("GFS_GATEWAY_SECRET") {
        Ok(s) if !s.trim().is_empty() => Secret::new(s),
        _ => {
            warn!(
                "🚨️🚨️🚨️ GFS_GATEWAY_SECRET is not set. The server will run, but every payment verification \
                 will be refused until the secret shared with the payment gateway is configured. 🚨️🚨️🚨️"
            );
            Secret::new(String::default())
        },
    }
}

fn configure_eligibility_windows() -> (Duration, Duration) {
    let first_order_delay = env::var("GFS_FIRST_ORDER_DELAY_MINUTES")
        .map_err(|_| {
            info!(
                "🪛️ GFS_FIRST_ORDER_DELAY_MINUTES is not set. Using the default value of {} min.",
                DEFAULT_FIRST_ORDER_DELAY_MINUTES
            )
        })
        .and_then(|s| {
            s.parse::<i64>()
                .map(Duration::minutes)
                .map_err(|e| warn!("🪛️ Invalid configuration value for GFS_FIRST_ORDER_DELAY_MINUTES. {e}"))
        })
        .ok()
        .unwrap_or(Duration::minutes(DEFAULT_FIRST_ORDER_DELAY_MINUTES));
    let repeat_order_delay = env::var("GFS_REPEAT_ORDER_DELAY_MINUTES")
        .map_err(|_| {
            info!(
                "🪛️ GFS_REPEAT_ORDER_DELAY_MINUTES is not set. Using the default value of {} min.",
                DEFAULT_REPEAT_ORDER_DELAY_MINUTES
            )
        })
        .and_then(|s| {
            s.parse::<i64>()
                .map(Duration::minutes)
                .map_err(|e| warn!("🪛️ Invalid configuration value for GFS_REPEAT_ORDER_DELAY_MINUTES. {e}"))
        })
        .ok()
        .unwrap_or(Duration::minutes(DEFAULT_REPEAT_ORDER_DELAY_MINUTES));
    (first_order_delay, repeat_order_delay)
}
