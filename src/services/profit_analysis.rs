use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::common::DateRange;
use crate::config::AnalysisSettings;
use crate::errors::ServiceError;
use crate::models::{ProfitAnalysisRequest, ProfitAnalysisResponse};
use crate::repositories::{AnalyticsStore, ProductReader, PurchaseReader, SalesReader, SnapshotReader};
use crate::services::inventory_roi::{inventory_roi, value_inventory};
use crate::services::investment::top_recommendations;
use crate::services::predictive::{daily_profit, project_month};
use crate::services::product_profit::{
    accumulate, enrich, investment_data, product_ids, summaries, top_profitable, top_unprofitable,
};
use crate::services::profit_history::monthly_history;
use crate::services::roi_history::{roi_history, RoiHistoryInput};

/// Assembles the full profit analysis for one tenant.
///
/// Stateless between calls: identical inputs and `as_of` give identical output.
pub struct ProfitAnalysisService<R> {
    store: Arc<R>,
    settings: AnalysisSettings,
}

impl<R> Clone for ProfitAnalysisService<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            settings: self.settings.clone(),
        }
    }
}

impl<R: AnalyticsStore> ProfitAnalysisService<R> {
    pub fn new(store: Arc<R>, settings: AnalysisSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Runs the analysis against the wall clock.
    pub async fn analyze_now(
        &self,
        request: ProfitAnalysisRequest,
    ) -> Result<ProfitAnalysisResponse, ServiceError> {
        self.get_profit_analysis(request, Utc::now()).await
    }

    /// Full analysis for `request`, with every trailing window ending at `as_of`.
    ///
    /// # Errors
    /// `ValidationError` when `from` is after `to`; any collaborator failure is
    /// returned unchanged and no partial result is produced.
    #[instrument(skip(self, request), fields(tenant = %request.tenant_filter(), from = %request.from, to = %request.to))]
    pub async fn get_profit_analysis(
        &self,
        request: ProfitAnalysisRequest,
        as_of: DateTime<Utc>,
    ) -> Result<ProfitAnalysisResponse, ServiceError> {
        let range = DateRange::new(request.from, request.to)?;
        let tenant = request.tenant_filter();
        let relaxed = tenant.relaxed();
        let settings = &self.settings;
        let store = self.store.as_ref();

        info!("Generating profit analysis");

        let projection_window = DateRange::trailing_days(as_of, settings.projection_window_days);
        let history_window = DateRange::trailing_days(as_of, settings.history_window_days);

        let (recent_sales, history_sales, purchases, snapshots, tenant_products, range_sales) =
            tokio::try_join!(
                store.find_sales(&tenant, projection_window),
                store.find_sales(&tenant, history_window),
                store.find_purchases(&relaxed, history_window),
                store.get_snapshots(&relaxed, settings.snapshot_months),
                store.find_products(&relaxed, None),
                store.find_sales(&tenant, range),
            )
            .map_err(|e| {
                error!(error = %e, "Failed to load analysis inputs");
                e
            })?;

        let projection = project_month(&daily_profit(&recent_sales), as_of);
        let history = monthly_history(&daily_profit(&history_sales));

        let valuation = value_inventory(&tenant_products);
        let roi = inventory_roi(
            projection.breakdown.last30_days,
            valuation.total_inventory_value,
        );
        let roi_history = roi_history(RoiHistoryInput {
            history: &history,
            current_inventory_value: roi.total_inventory_value,
            snapshots: &snapshots,
            sales: &history_sales,
            purchases: &purchases,
        });

        let totals = accumulate(&range_sales);
        let ids = product_ids(&totals);
        let catalogue = if ids.is_empty() {
            Vec::new()
        } else {
            store.find_products(&relaxed, Some(ids)).await.map_err(|e| {
                error!(error = %e, "Failed to load products for enrichment");
                e
            })?
        };
        let products = enrich(totals, &catalogue);

        let by_profit = top_profitable(&products, products.len());
        let top50_profitable: Vec<_> = by_profit
            .iter()
            .take(settings.top_products_limit)
            .map(|p| p.summary())
            .collect();
        let top50_unprofitable =
            summaries(&top_unprofitable(&products, settings.top_products_limit));
        let recommendations = top_recommendations(
            &investment_data(&by_profit, settings.investment_days_analyzed),
            settings.recommendation_limit,
        );

        info!(
            products = products.len(),
            recommendations = recommendations.len(),
            months = history.months.len(),
            projected = %projection.projected,
            roi_status = ?roi.status,
            "Profit analysis complete"
        );

        Ok(ProfitAnalysisResponse {
            top50_profitable,
            top50_unprofitable,
            month_projection: projection,
            recommendations,
            monthly_history: history,
            inventory_roi: roi,
            roi_history,
        })
    }
}
