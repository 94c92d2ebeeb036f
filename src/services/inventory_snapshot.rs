use chrono::{DateTime, Datelike, Utc};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::common::round_money;
use crate::errors::ServiceError;
use crate::models::{SnapshotRecord, SnapshotResult};
use crate::repositories::{ProductReader, SnapshotWriter};
use crate::services::inventory_roi::value_inventory;
use crate::tenancy::TenantFilter;

/// Captures month-end inventory valuations consumed by the ROI history.
pub struct InventorySnapshotService<S> {
    store: Arc<S>,
}

impl<S> InventorySnapshotService<S>
where
    S: ProductReader + SnapshotWriter,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Values the tenant's current stock and stores it under `year`/`month`.
    ///
    /// An existing snapshot for the same tenant and month is overwritten.
    #[instrument(skip(self), fields(tenant = %filter))]
    pub async fn capture_snapshot(
        &self,
        year: i32,
        month: u32,
        filter: &TenantFilter,
    ) -> Result<SnapshotResult, ServiceError> {
        if !(1..=12).contains(&month) {
            return Err(ServiceError::ValidationError(format!(
                "Month must be between 1 and 12, got {}",
                month
            )));
        }

        let products = self
            .store
            .find_products(&filter.relaxed(), None)
            .await?;
        let mut valuation = value_inventory(&products);
        valuation.total_inventory_value = round_money(valuation.total_inventory_value);

        let created = self
            .store
            .upsert_snapshot(
                filter,
                SnapshotRecord {
                    year,
                    month,
                    valuation,
                },
            )
            .await?;

        info!(
            year,
            month,
            value = %valuation.total_inventory_value,
            products = valuation.total_products,
            units = valuation.total_units,
            created,
            "Inventory snapshot stored"
        );

        Ok(SnapshotResult {
            year,
            month,
            total_inventory_value: valuation.total_inventory_value,
            total_products: valuation.total_products,
            total_units: valuation.total_units,
            created,
        })
    }

    /// Captures the month containing `as_of`.
    pub async fn capture_current_month(
        &self,
        filter: &TenantFilter,
        as_of: DateTime<Utc>,
    ) -> Result<SnapshotResult, ServiceError> {
        self.capture_snapshot(as_of.year(), as_of.month(), filter)
            .await
    }
}
