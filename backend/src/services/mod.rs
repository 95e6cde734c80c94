//! Transactional workflow services for the stock core
//!
//! Each service opens one database transaction per event, locks the rows it
//! touches in id order and hands them to the in-memory core.

pub mod alert;
pub mod inventory;
pub mod material;
pub mod preparation;
pub mod production;
pub mod reconciliation;
pub mod sales_order;

pub use alert::{AlertService, SweepSummary};
pub use inventory::InventoryService;
pub use material::MaterialService;
pub use preparation::PreparationService;
pub use production::ProductionService;
pub use reconciliation::{ReconcileRun, ReconciliationService};
pub use sales_order::SalesOrderService;
