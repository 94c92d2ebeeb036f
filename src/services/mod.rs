// Numeric engines
pub mod investment;
pub mod predictive;
pub mod product_profit;
pub mod profit_history;
pub mod roi_history;

// Inventory valuation
pub mod inventory_roi;
pub mod inventory_snapshot;

// Orchestration
pub mod profit_analysis;

pub use inventory_snapshot::InventorySnapshotService;
pub use profit_analysis::ProfitAnalysisService;
