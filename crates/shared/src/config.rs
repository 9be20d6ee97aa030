//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Pricing configuration.
    #[serde(default)]
    pub pricing: PricingConfig,
    /// Booking engine configuration.
    #[serde(default)]
    pub booking: BookingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Pricing configuration (single flat currency and tax model).
#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    /// ISO 4217 code of the platform currency, used for display only.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Flat tax rate applied to the taxable base, e.g. `0.19`.
    #[serde(default)]
    pub tax_rate: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            tax_rate: Decimal::ZERO,
        }
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Booking engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    /// Upper bound for any collaborator call (directory, discount policy).
    #[serde(default = "default_collaborator_timeout_ms")]
    pub collaborator_timeout_ms: u64,
    /// Role claim that may cancel bookings on behalf of any guest.
    #[serde(default = "default_admin_role")]
    pub admin_role: String,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            collaborator_timeout_ms: default_collaborator_timeout_ms(),
            admin_role: default_admin_role(),
        }
    }
}

fn default_collaborator_timeout_ms() -> u64 {
    2000
}

fn default_admin_role() -> String {
    "admin".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("STAYBOOK").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
