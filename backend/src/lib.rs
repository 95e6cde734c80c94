//! Workshop ERP stock consistency core
//!
//! Keeps material stock, inventory reservations and available stock
//! consistent as sales, preparation and production orders move through their
//! lifecycles. The core modules (`ledger`, `reservation`, `lifecycle`,
//! `reconciliation`, `alerts`) work on in-memory values; `services` wraps them
//! in PostgreSQL transactions.

pub mod alerts;
pub mod config;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod lifecycle;
pub mod preparation;
pub mod reconciliation;
pub mod reservation;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};
