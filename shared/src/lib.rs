//! Shared types and models for the Workshop ERP stock core
//!
//! This crate contains the domain records and pure rules shared between the
//! backend services and the maintenance tooling.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
