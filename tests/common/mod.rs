//! In-memory analytics store for integration tests.
#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use profit_analytics::common::DateRange;
use profit_analytics::errors::ServiceError;
use profit_analytics::models::{InventorySnapshot, SnapshotRecord};
use profit_analytics::repositories::{
    ProductReader, ProductRecord, PurchaseLine, PurchaseReader, PurchaseRecord, SaleLine,
    SaleRecord, SalesReader, SnapshotReader, SnapshotWriter,
};
use profit_analytics::tenancy::{TenantFilter, TenantKey};

/// Organization/company ownership of a stored row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Owner {
    pub organization: Option<i64>,
    pub company: Option<i64>,
}

impl Owner {
    pub fn new(organization: Option<i64>, company: Option<i64>) -> Self {
        Self {
            organization,
            company,
        }
    }

    fn matches(&self, filter: &TenantFilter) -> bool {
        key_matches(filter.organization, self.organization)
            && key_matches(filter.company, self.company)
    }
}

fn key_matches(key: TenantKey, value: Option<i64>) -> bool {
    match key {
        TenantKey::Any => true,
        TenantKey::Unassigned => value.is_none(),
        TenantKey::Id(id) => value == Some(id),
    }
}

#[derive(Debug, Clone)]
pub struct StoredSnapshot {
    pub owner: Owner,
    pub snapshot: InventorySnapshot,
    pub total_products: u32,
    pub total_units: i64,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    pub sales: Vec<(Owner, SaleRecord)>,
    pub products: Vec<(Owner, ProductRecord)>,
    pub purchases: Vec<(Owner, PurchaseRecord)>,
    pub snapshots: Mutex<Vec<StoredSnapshot>>,
    pub fail_sales: bool,
}

impl InMemoryStore {
    pub fn with_sale(mut self, owner: Owner, sale: SaleRecord) -> Self {
        self.sales.push((owner, sale));
        self
    }

    pub fn with_product(mut self, owner: Owner, product: ProductRecord) -> Self {
        self.products.push((owner, product));
        self
    }

    pub fn with_purchase(mut self, owner: Owner, purchase: PurchaseRecord) -> Self {
        self.purchases.push((owner, purchase));
        self
    }

    pub fn with_snapshot(self, owner: Owner, year: i32, month: u32, value: Decimal) -> Self {
        if let Ok(mut snapshots) = self.snapshots.lock() {
            snapshots.push(StoredSnapshot {
                owner,
                snapshot: InventorySnapshot {
                    year,
                    month,
                    total_inventory_value: value,
                },
                total_products: 0,
                total_units: 0,
            });
        }
        self
    }

    pub fn stored_snapshots(&self) -> Vec<StoredSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }
}

#[async_trait]
impl SalesReader for InMemoryStore {
    async fn find_sales(
        &self,
        filter: &TenantFilter,
        range: DateRange,
    ) -> Result<Vec<SaleRecord>, ServiceError> {
        if self.fail_sales {
            return Err(ServiceError::db_error("sales table unavailable"));
        }
        let mut sales: Vec<SaleRecord> = self
            .sales
            .iter()
            .filter(|(owner, sale)| owner.matches(filter) && range.contains(sale.created_at))
            .map(|(_, sale)| sale.clone())
            .collect();
        sales.sort_by_key(|s| (s.created_at, s.id));
        Ok(sales)
    }
}

#[async_trait]
impl ProductReader for InMemoryStore {
    async fn find_products(
        &self,
        filter: &TenantFilter,
        ids: Option<Vec<i64>>,
    ) -> Result<Vec<ProductRecord>, ServiceError> {
        Ok(self
            .products
            .iter()
            .filter(|(owner, product)| {
                owner.matches(filter)
                    && ids.as_ref().map_or(true, |ids| ids.contains(&product.id))
            })
            .map(|(_, product)| product.clone())
            .collect())
    }
}

#[async_trait]
impl PurchaseReader for InMemoryStore {
    async fn find_purchases(
        &self,
        filter: &TenantFilter,
        range: DateRange,
    ) -> Result<Vec<PurchaseRecord>, ServiceError> {
        Ok(self
            .purchases
            .iter()
            .filter(|(owner, purchase)| {
                owner.matches(filter) && range.contains(purchase.created_at)
            })
            .map(|(_, purchase)| purchase.clone())
            .collect())
    }
}

#[async_trait]
impl SnapshotReader for InMemoryStore {
    async fn get_snapshots(
        &self,
        filter: &TenantFilter,
        months_back: u32,
    ) -> Result<Vec<InventorySnapshot>, ServiceError> {
        let snapshots = self
            .snapshots
            .lock()
            .map_err(|_| ServiceError::InternalError("snapshot lock poisoned".into()))?;
        let mut found: Vec<InventorySnapshot> = snapshots
            .iter()
            .filter(|stored| stored.owner.matches(filter))
            .map(|stored| stored.snapshot)
            .collect();
        found.sort_by(|a, b| (b.year, b.month).cmp(&(a.year, a.month)));
        found.truncate(months_back as usize);
        Ok(found)
    }
}

#[async_trait]
impl SnapshotWriter for InMemoryStore {
    async fn upsert_snapshot(
        &self,
        filter: &TenantFilter,
        record: SnapshotRecord,
    ) -> Result<bool, ServiceError> {
        let owner = Owner::new(filter.organization.id(), filter.company.id());
        let mut snapshots = self
            .snapshots
            .lock()
            .map_err(|_| ServiceError::InternalError("snapshot lock poisoned".into()))?;
        let snapshot = InventorySnapshot {
            year: record.year,
            month: record.month,
            total_inventory_value: record.valuation.total_inventory_value,
        };

        if let Some(existing) = snapshots.iter_mut().find(|stored| {
            stored.owner == owner
                && stored.snapshot.year == record.year
                && stored.snapshot.month == record.month
        }) {
            existing.snapshot = snapshot;
            existing.total_products = record.valuation.total_products;
            existing.total_units = record.valuation.total_units;
            return Ok(false);
        }

        snapshots.push(StoredSnapshot {
            owner,
            snapshot,
            total_products: record.valuation.total_products,
            total_units: record.valuation.total_units,
        });
        Ok(true)
    }
}

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

pub fn line(product_id: i64, quantity: i64, price: Decimal, cost: Decimal) -> SaleLine {
    SaleLine {
        product_id,
        quantity,
        unit_price: price,
        acquisition_price: Some(cost),
    }
}

pub fn sale(id: i64, created_at: DateTime<Utc>, lines: Vec<SaleLine>) -> SaleRecord {
    let total = lines
        .iter()
        .map(|l| l.unit_price * Decimal::from(l.quantity))
        .sum();
    SaleRecord {
        id,
        created_at,
        total,
        lines,
    }
}

/// A single-line sale earning exactly `profit` on product 1.
pub fn profit_sale(id: i64, created_at: DateTime<Utc>, profit: Decimal) -> SaleRecord {
    sale(id, created_at, vec![line(1, 1, profit, Decimal::ZERO)])
}

pub fn product(id: i64, name: &str, stocks: Vec<i64>, last_price: Option<Decimal>) -> ProductRecord {
    ProductRecord {
        id,
        name: name.to_string(),
        sku: Some(format!("SKU-{id}")),
        store_stocks: stocks,
        last_acquisition_price: last_price,
    }
}

pub fn purchase(created_at: DateTime<Utc>, lines: Vec<(i64, Decimal)>) -> PurchaseRecord {
    PurchaseRecord {
        created_at,
        lines: lines
            .into_iter()
            .map(|(quantity, price)| PurchaseLine { quantity, price })
            .collect(),
    }
}
