use std::{env, time::Duration};

use anyhow::Context;
use chrono_tz::Tz;

/// Where and how guest orders are handed off for manual fulfilment.
#[derive(Debug, Clone)]
pub struct HandOffConfig {
    pub store_name: String,
    pub currency: String,
    pub phone: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub hand_off: HandOffConfig,
    pub timezone: Tz,
    pub checkout_max_attempts: u32,
    pub cart_idle_ttl: Duration,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = var_or("APP_HOST", "127.0.0.1");
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);

        let hand_off = HandOffConfig {
            store_name: var_or("STORE_NAME", "Pip Beach Plug"),
            currency: var_or("STORE_CURRENCY", "EGP"),
            phone: var_or("HANDOFF_PHONE", "201019284462"),
            base_url: var_or("HANDOFF_BASE_URL", "https://wa.me"),
        };

        let timezone = var_or("STORE_TIMEZONE", "Africa/Cairo");
        let timezone = timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("invalid STORE_TIMEZONE `{timezone}`: {e}"))?;

        let checkout_max_attempts = env::var("CHECKOUT_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(3)
            .max(1);
        let cart_idle_ttl = env::var("CART_IDLE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(2 * 60 * 60));

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            hand_off,
            timezone,
            checkout_max_attempts,
            cart_idle_ttl,
        })
    }
}
