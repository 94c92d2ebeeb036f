use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Stored month-end inventory valuation for one tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySnapshot {
    pub year: i32,
    pub month: u32,
    pub total_inventory_value: Decimal,
}

/// Valuation of the current on-hand stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryValuation {
    pub total_inventory_value: Decimal,
    /// Products with positive on-hand stock
    pub total_products: u32,
    pub total_units: i64,
}

/// Row written by the snapshot service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    pub year: i32,
    pub month: u32,
    pub valuation: InventoryValuation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResult {
    pub year: i32,
    pub month: u32,
    pub total_inventory_value: Decimal,
    pub total_products: u32,
    pub total_units: i64,
    /// False when an existing snapshot for the month was overwritten
    pub created: bool,
}
