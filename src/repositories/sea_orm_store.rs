use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Query, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbBackend,
    EntityTrait, IntoActiveModel, NotSet, QueryFilter, QueryOrder, QuerySelect, Set, Statement,
    TransactionTrait,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, instrument};

use super::{
    ProductReader, ProductRecord, PurchaseLine, PurchaseReader, PurchaseRecord, SaleLine,
    SaleRecord, SalesReader, SnapshotReader, SnapshotWriter,
};
use crate::common::DateRange;
use crate::entities::{
    entry, entry_detail, inventory, inventory_snapshot, product, sale, sale_detail, store,
    store_on_inventory,
};
use crate::errors::ServiceError;
use crate::models::{InventorySnapshot, SnapshotRecord};
use crate::tenancy::{TenantFilter, TenantKey};

/// Upper bound on ids bound into a single `IN (...)` list.
const IN_CLAUSE_CHUNK: usize = 1000;

/// Predicate for one tenant column. `Any` contributes nothing.
fn key_expr<C: ColumnTrait>(column: C, key: TenantKey) -> Option<SimpleExpr> {
    match key {
        TenantKey::Any => None,
        TenantKey::Unassigned => Some(column.is_null()),
        TenantKey::Id(id) => Some(column.eq(id)),
    }
}

/// Organization/company scope for tables that carry both columns.
pub(crate) fn tenant_condition<C: ColumnTrait>(
    organization: C,
    company: C,
    filter: &TenantFilter,
) -> Condition {
    Condition::all()
        .add_option(key_expr(organization, filter.organization))
        .add_option(key_expr(company, filter.company))
}

/// Exact key match used when writing, where "no filter" means a NULL column.
fn exact_key_expr<C: ColumnTrait>(column: C, key: TenantKey) -> SimpleExpr {
    match key.id() {
        Some(id) => column.eq(id),
        None => column.is_null(),
    }
}

/// Purchases only record an organization; the company comes from the receiving store.
pub(crate) fn purchase_condition(filter: &TenantFilter) -> Condition {
    let company = match filter.company {
        TenantKey::Any => None,
        key => {
            let stores = Query::select()
                .column(store::Column::Id)
                .from(store::Entity)
                .and_where(exact_key_expr(store::Column::CompanyId, key))
                .to_owned();
            Some(entry::Column::StoreId.in_subquery(stores))
        }
    };
    Condition::all()
        .add_option(key_expr(entry::Column::OrganizationId, filter.organization))
        .add_option(company)
}

/// Advisory lock name serializing snapshot writes for one tenant and month.
fn snapshot_lock_key(filter: &TenantFilter, year: i32, month: u32) -> String {
    let part = |key: TenantKey| key.id().map_or_else(|| "null".to_string(), |id| id.to_string());
    format!(
        "inventory_snapshot:{}:{}:{}:{}",
        part(filter.organization),
        part(filter.company),
        year,
        month
    )
}

/// Transaction-scoped Postgres lock on the snapshot key.
///
/// The key columns are nullable, so a unique index alone cannot reject a
/// second row for an unassigned tenant.
fn snapshot_lock_statement(filter: &TenantFilter, year: i32, month: u32) -> Statement {
    Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT pg_advisory_xact_lock(hashtext($1))",
        [snapshot_lock_key(filter, year, month).into()],
    )
}

fn unique_ids(ids: impl IntoIterator<Item = i64>) -> Vec<i64> {
    let mut ids: Vec<i64> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// sea-orm implementation of every analytics collaborator.
#[derive(Debug, Clone)]
pub struct AnalyticsRepository {
    db: Arc<DatabaseConnection>,
}

impl AnalyticsRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn sale_lines(&self, sale_ids: &[i64]) -> Result<HashMap<i64, Vec<SaleLine>>, ServiceError> {
        let mut details = Vec::new();
        for chunk in sale_ids.chunks(IN_CLAUSE_CHUNK) {
            let rows = sale_detail::Entity::find()
                .filter(sale_detail::Column::SaleId.is_in(chunk.to_vec()))
                .order_by_asc(sale_detail::Column::Id)
                .all(self.db())
                .await?;
            details.extend(rows);
        }

        let entry_ids = unique_ids(details.iter().filter_map(|d| d.entry_detail_id));
        let mut costs: HashMap<i64, Decimal> = HashMap::with_capacity(entry_ids.len());
        for chunk in entry_ids.chunks(IN_CLAUSE_CHUNK) {
            let rows: Vec<(i64, Decimal)> = entry_detail::Entity::find()
                .select_only()
                .column(entry_detail::Column::Id)
                .column(entry_detail::Column::Price)
                .filter(entry_detail::Column::Id.is_in(chunk.to_vec()))
                .into_tuple()
                .all(self.db())
                .await?;
            costs.extend(rows);
        }

        let mut lines: HashMap<i64, Vec<SaleLine>> = HashMap::new();
        for detail in details {
            lines.entry(detail.sale_id).or_default().push(SaleLine {
                product_id: detail.product_id,
                quantity: i64::from(detail.quantity),
                unit_price: detail.price,
                acquisition_price: detail
                    .entry_detail_id
                    .and_then(|id| costs.get(&id).copied()),
            });
        }
        Ok(lines)
    }

    /// Per-product store stock rows.
    async fn store_stocks(&self, product_ids: &[i64]) -> Result<HashMap<i64, Vec<i64>>, ServiceError> {
        let mut inventory_owner: HashMap<i64, i64> = HashMap::new();
        for chunk in product_ids.chunks(IN_CLAUSE_CHUNK) {
            let rows = inventory::Entity::find()
                .filter(inventory::Column::ProductId.is_in(chunk.to_vec()))
                .all(self.db())
                .await?;
            inventory_owner.extend(rows.into_iter().map(|row| (row.id, row.product_id)));
        }

        let inventory_ids = unique_ids(inventory_owner.keys().copied());
        let mut stocks: HashMap<i64, Vec<i64>> = HashMap::new();
        for chunk in inventory_ids.chunks(IN_CLAUSE_CHUNK) {
            let rows = store_on_inventory::Entity::find()
                .filter(store_on_inventory::Column::InventoryId.is_in(chunk.to_vec()))
                .order_by_asc(store_on_inventory::Column::Id)
                .all(self.db())
                .await?;
            for row in rows {
                if let Some(product_id) = inventory_owner.get(&row.inventory_id) {
                    stocks
                        .entry(*product_id)
                        .or_default()
                        .push(i64::from(row.stock));
                }
            }
        }
        Ok(stocks)
    }

    /// Price of the newest purchase line per product.
    async fn last_acquisition_prices(
        &self,
        product_ids: &[i64],
    ) -> Result<HashMap<i64, Decimal>, ServiceError> {
        let mut prices: HashMap<i64, Decimal> = HashMap::new();
        for chunk in product_ids.chunks(IN_CLAUSE_CHUNK) {
            let rows: Vec<(i64, Decimal)> = entry_detail::Entity::find()
                .select_only()
                .column(entry_detail::Column::ProductId)
                .column(entry_detail::Column::Price)
                .filter(entry_detail::Column::ProductId.is_in(chunk.to_vec()))
                .order_by_desc(entry_detail::Column::CreatedAt)
                .order_by_desc(entry_detail::Column::Id)
                .into_tuple()
                .all(self.db())
                .await?;
            for (product_id, price) in rows {
                prices.entry(product_id).or_insert(price);
            }
        }
        Ok(prices)
    }
}

#[async_trait]
impl SalesReader for AnalyticsRepository {
    #[instrument(skip(self), fields(tenant = %filter))]
    async fn find_sales(
        &self,
        filter: &TenantFilter,
        range: DateRange,
    ) -> Result<Vec<SaleRecord>, ServiceError> {
        let sales = sale::Entity::find()
            .filter(tenant_condition(
                sale::Column::OrganizationId,
                sale::Column::CompanyId,
                filter,
            ))
            .filter(sale::Column::CreatedAt.between(range.from, range.to))
            .order_by_asc(sale::Column::CreatedAt)
            .order_by_asc(sale::Column::Id)
            .all(self.db())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to load sales");
                ServiceError::DatabaseError(e)
            })?;

        if sales.is_empty() {
            return Ok(Vec::new());
        }

        let sale_ids: Vec<i64> = sales.iter().map(|s| s.id).collect();
        let mut lines = self.sale_lines(&sale_ids).await?;
        debug!(sales = sales.len(), "Loaded sales");

        Ok(sales
            .into_iter()
            .map(|s| SaleRecord {
                id: s.id,
                created_at: s.created_at,
                total: s.total,
                lines: lines.remove(&s.id).unwrap_or_default(),
            })
            .collect())
    }
}

#[async_trait]
impl ProductReader for AnalyticsRepository {
    #[instrument(skip(self, ids), fields(tenant = %filter))]
    async fn find_products(
        &self,
        filter: &TenantFilter,
        ids: Option<Vec<i64>>,
    ) -> Result<Vec<ProductRecord>, ServiceError> {
        let scope = tenant_condition(
            product::Column::OrganizationId,
            product::Column::CompanyId,
            filter,
        );

        let products = match ids {
            Some(ids) if ids.is_empty() => return Ok(Vec::new()),
            Some(ids) => {
                let mut rows = Vec::with_capacity(ids.len());
                for chunk in unique_ids(ids).chunks(IN_CLAUSE_CHUNK) {
                    let found = product::Entity::find()
                        .filter(scope.clone())
                        .filter(product::Column::Id.is_in(chunk.to_vec()))
                        .order_by_asc(product::Column::Id)
                        .all(self.db())
                        .await?;
                    rows.extend(found);
                }
                rows
            }
            None => {
                product::Entity::find()
                    .filter(scope)
                    .order_by_asc(product::Column::Id)
                    .all(self.db())
                    .await?
            }
        };

        let product_ids: Vec<i64> = products.iter().map(|p| p.id).collect();
        let mut stocks = self.store_stocks(&product_ids).await?;
        let prices = self.last_acquisition_prices(&product_ids).await?;

        Ok(products
            .into_iter()
            .map(|p| ProductRecord {
                id: p.id,
                store_stocks: stocks.remove(&p.id).unwrap_or_default(),
                last_acquisition_price: prices.get(&p.id).copied(),
                name: p.name,
                sku: p.barcode,
            })
            .collect())
    }
}

#[async_trait]
impl PurchaseReader for AnalyticsRepository {
    #[instrument(skip(self), fields(tenant = %filter))]
    async fn find_purchases(
        &self,
        filter: &TenantFilter,
        range: DateRange,
    ) -> Result<Vec<PurchaseRecord>, ServiceError> {
        let entries = entry::Entity::find()
            .filter(purchase_condition(filter))
            .filter(entry::Column::CreatedAt.between(range.from, range.to))
            .order_by_asc(entry::Column::CreatedAt)
            .order_by_asc(entry::Column::Id)
            .all(self.db())
            .await?;

        let entry_ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
        let mut lines: HashMap<i64, Vec<PurchaseLine>> = HashMap::new();
        for chunk in entry_ids.chunks(IN_CLAUSE_CHUNK) {
            let rows = entry_detail::Entity::find()
                .filter(entry_detail::Column::EntryId.is_in(chunk.to_vec()))
                .order_by_asc(entry_detail::Column::Id)
                .all(self.db())
                .await?;
            for row in rows {
                lines.entry(row.entry_id).or_default().push(PurchaseLine {
                    quantity: i64::from(row.quantity),
                    price: row.price,
                });
            }
        }

        Ok(entries
            .into_iter()
            .map(|e| PurchaseRecord {
                created_at: e.created_at,
                lines: lines.remove(&e.id).unwrap_or_default(),
            })
            .collect())
    }
}

#[async_trait]
impl SnapshotReader for AnalyticsRepository {
    #[instrument(skip(self), fields(tenant = %filter))]
    async fn get_snapshots(
        &self,
        filter: &TenantFilter,
        months_back: u32,
    ) -> Result<Vec<InventorySnapshot>, ServiceError> {
        let rows = inventory_snapshot::Entity::find()
            .filter(tenant_condition(
                inventory_snapshot::Column::OrganizationId,
                inventory_snapshot::Column::CompanyId,
                filter,
            ))
            .order_by_desc(inventory_snapshot::Column::Year)
            .order_by_desc(inventory_snapshot::Column::Month)
            .limit(u64::from(months_back))
            .all(self.db())
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let month = u32::try_from(row.month).ok()?;
                Some(InventorySnapshot {
                    year: row.year,
                    month,
                    total_inventory_value: row.total_inventory_value,
                })
            })
            .collect())
    }
}

#[async_trait]
impl SnapshotWriter for AnalyticsRepository {
    #[instrument(skip(self, record), fields(tenant = %filter, year = record.year, month = record.month))]
    async fn upsert_snapshot(
        &self,
        filter: &TenantFilter,
        record: SnapshotRecord,
    ) -> Result<bool, ServiceError> {
        let month = i32::try_from(record.month)
            .map_err(|_| ServiceError::ValidationError(format!("Invalid month {}", record.month)))?;
        let total_products = i32::try_from(record.valuation.total_products).map_err(|_| {
            ServiceError::InternalError("Product count does not fit the snapshot column".into())
        })?;
        let now = Utc::now();

        let txn = self.db().begin().await.map_err(|e| {
            error!(error = %e, "Failed to open snapshot transaction");
            ServiceError::db_error(e)
        })?;
        if txn.get_database_backend() == DbBackend::Postgres {
            txn.execute(snapshot_lock_statement(filter, record.year, record.month))
                .await?;
        }

        let existing = inventory_snapshot::Entity::find()
            .filter(exact_key_expr(
                inventory_snapshot::Column::OrganizationId,
                filter.organization,
            ))
            .filter(exact_key_expr(
                inventory_snapshot::Column::CompanyId,
                filter.company,
            ))
            .filter(inventory_snapshot::Column::Year.eq(record.year))
            .filter(inventory_snapshot::Column::Month.eq(month))
            .one(&txn)
            .await?;

        let created = match existing {
            Some(model) => {
                let mut active = model.into_active_model();
                active.total_inventory_value = Set(record.valuation.total_inventory_value);
                active.total_products = Set(total_products);
                active.total_units = Set(record.valuation.total_units);
                active.updated_at = Set(now);
                active.update(&txn).await?;
                false
            }
            None => {
                let active = inventory_snapshot::ActiveModel {
                    id: NotSet,
                    organization_id: Set(filter.organization.id()),
                    company_id: Set(filter.company.id()),
                    year: Set(record.year),
                    month: Set(month),
                    total_inventory_value: Set(record.valuation.total_inventory_value),
                    total_products: Set(total_products),
                    total_units: Set(record.valuation.total_units),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                active.insert(&txn).await?;
                true
            }
        };

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit inventory snapshot");
            ServiceError::db_error(e)
        })?;
        Ok(created)
    }
}
