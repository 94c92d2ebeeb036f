//! Read/write seams between the analytics engine and persistence.
//!
//! The services only ever see the traits below, so they can run against the
//! sea-orm backed [`AnalyticsRepository`] or any in-memory double.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::DateRange;
use crate::errors::ServiceError;
use crate::models::{InventorySnapshot, SnapshotRecord};
use crate::tenancy::TenantFilter;

pub mod sea_orm_store;

pub use sea_orm_store::AnalyticsRepository;

/// A sale with its lines, as needed for profit calculations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub total: Decimal,
    pub lines: Vec<SaleLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Decimal,
    /// Cost of the purchase line the units were drawn from, when known
    pub acquisition_price: Option<Decimal>,
}

impl SaleLine {
    pub fn unit_cost(&self) -> Decimal {
        self.acquisition_price.unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: i64,
    pub name: String,
    pub sku: Option<String>,
    /// One entry per store allocation, possibly negative
    pub store_stocks: Vec<i64>,
    /// Price of the most recent purchase line
    pub last_acquisition_price: Option<Decimal>,
}

impl ProductRecord {
    /// Net stock across every store.
    pub fn total_stock(&self) -> i64 {
        self.store_stocks.iter().sum()
    }

    /// Stock summed over stores holding a positive quantity.
    pub fn on_hand_stock(&self) -> i64 {
        self.store_stocks.iter().filter(|stock| **stock > 0).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub created_at: DateTime<Utc>,
    pub lines: Vec<PurchaseLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub quantity: i64,
    pub price: Decimal,
}

#[async_trait]
pub trait SalesReader: Send + Sync {
    /// Sales created within `range` (inclusive), oldest first.
    async fn find_sales(
        &self,
        filter: &TenantFilter,
        range: DateRange,
    ) -> Result<Vec<SaleRecord>, ServiceError>;
}

#[async_trait]
pub trait ProductReader: Send + Sync {
    /// Products in scope, optionally restricted to `ids`.
    async fn find_products(
        &self,
        filter: &TenantFilter,
        ids: Option<Vec<i64>>,
    ) -> Result<Vec<ProductRecord>, ServiceError>;
}

#[async_trait]
pub trait PurchaseReader: Send + Sync {
    async fn find_purchases(
        &self,
        filter: &TenantFilter,
        range: DateRange,
    ) -> Result<Vec<PurchaseRecord>, ServiceError>;
}

#[async_trait]
pub trait SnapshotReader: Send + Sync {
    /// Most recent snapshots first, at most `months_back` of them.
    async fn get_snapshots(
        &self,
        filter: &TenantFilter,
        months_back: u32,
    ) -> Result<Vec<InventorySnapshot>, ServiceError>;
}

#[async_trait]
pub trait SnapshotWriter: Send + Sync {
    /// Inserts or replaces the snapshot for the record's month. Returns true on insert.
    async fn upsert_snapshot(
        &self,
        filter: &TenantFilter,
        record: SnapshotRecord,
    ) -> Result<bool, ServiceError>;
}

/// Everything the profit analysis reads.
pub trait AnalyticsStore: SalesReader + ProductReader + PurchaseReader + SnapshotReader {}

impl<T> AnalyticsStore for T where T: SalesReader + ProductReader + PurchaseReader + SnapshotReader {}
