//! Domain models for the Workshop ERP stock core

mod alert;
mod inventory;
mod material;
mod preparation;
mod production;
mod sales;

pub use alert::*;
pub use inventory::*;
pub use material::*;
pub use preparation::*;
pub use production::*;
pub use sales::*;
