// Analysis payloads
pub mod profit_analysis;
pub mod snapshot;

pub use profit_analysis::{
    DailyProfitPoint, InventoryRoi, InvestmentRecommendation, MonthProjection, MonthlyHistory,
    MonthlyHistoryItem, Priority, ProductInvestmentData, ProductProfitSummary,
    ProfitAnalysisRequest, ProfitAnalysisResponse, ProfitBreakdown, RegressionResult,
    RoiHistory, RoiHistoryItem, RoiStatus, Trend,
};
pub use snapshot::{InventorySnapshot, InventoryValuation, SnapshotRecord, SnapshotResult};
