//! Configuration management for the Workshop ERP stock core
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with WERP_ prefix

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::BusinessCategory;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Stock rules configuration
    pub stock: StockConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Run pending migrations on startup
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StockConfig {
    /// Smallest difference reconciliation reports as a mismatch
    pub reconciliation_tolerance: Decimal,

    /// Days before expiry an item starts raising expiring-soon alerts
    pub expiry_warning_days: i64,

    /// Categories whose items are checked for expiry
    pub perishable_categories: Vec<BusinessCategory>,

    /// Raise an alert when reservations exceed stock on hand
    pub alert_on_over_reservation: bool,
}

impl StockConfig {
    pub fn is_perishable(&self, category: BusinessCategory) -> bool {
        self.perishable_categories.contains(&category)
    }
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            reconciliation_tolerance: Decimal::new(1, 2),
            expiry_warning_days: 7,
            perishable_categories: BusinessCategory::default_perishable(),
            alert_on_over_reservation: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when RUST_LOG is unset
    pub filter: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "workshop_erp=debug,workshop_maint=debug,sqlx=warn".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("WERP_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("database.run_migrations", environment == "development")?
            .set_default("stock.reconciliation_tolerance", "0.01")?
            .set_default("stock.expiry_warning_days", 7)?
            .set_default("stock.perishable_categories", vec!["food", "cosmetic"])?
            .set_default("stock.alert_on_over_reservation", true)?
            .set_default("logging.filter", LoggingConfig::default().filter)?
            .set_default("logging.json", false)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (WERP_ prefix)
            .add_source(
                Environment::with_prefix("WERP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("stock.perishable_categories")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
