mod common;

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use common::{at, line, product, profit_sale, purchase, sale, InMemoryStore, Owner};
use profit_analytics::config::AnalysisSettings;
use profit_analytics::errors::ServiceError;
use profit_analytics::models::{Priority, ProductInvestmentData, ProfitAnalysisRequest, RoiStatus, Trend};
use profit_analytics::services::investment::score_product;
use profit_analytics::services::{InventorySnapshotService, ProfitAnalysisService};
use profit_analytics::tenancy::{TenantFilter, TenantKey};

fn org(id: i64) -> Owner {
    Owner::new(Some(id), None)
}

fn request_for(organization: TenantKey, from: (i32, u32, u32), to: (i32, u32, u32)) -> ProfitAnalysisRequest {
    ProfitAnalysisRequest {
        from: at(from.0, from.1, from.2, 0),
        to: at(to.0, to.1, to.2, 23),
        organization,
        company: TenantKey::Any,
    }
}

fn service(store: InMemoryStore) -> ProfitAnalysisService<InMemoryStore> {
    ProfitAnalysisService::new(Arc::new(store), AnalysisSettings::default())
}

#[tokio::test]
async fn rising_daily_profit_projects_to_month_end() {
    let store = InMemoryStore::default()
        .with_sale(org(1), profit_sale(1, at(2025, 3, 1, 10), dec!(100)))
        .with_sale(org(1), profit_sale(2, at(2025, 3, 2, 10), dec!(200)))
        .with_sale(org(1), profit_sale(3, at(2025, 3, 3, 10), dec!(300)));

    let response = service(store)
        .get_profit_analysis(
            request_for(TenantKey::Id(1), (2025, 3, 1), (2025, 3, 3)),
            at(2025, 3, 4, 12),
        )
        .await
        .unwrap();

    let projection = &response.month_projection;
    let extra: i64 = (1..=27).map(|i| 100 * (3 + i)).sum();
    assert_eq!(projection.current, dec!(600));
    assert_eq!(projection.projected, dec!(600) + Decimal::from(extra));
    assert_eq!(projection.trend, Trend::Up);
    assert_eq!(projection.confidence, 1.0);
    assert_eq!(projection.days_analyzed, 3);
    assert_eq!(projection.days_remaining, 27);
    assert_eq!(projection.breakdown.last30_days, dec!(600));
}

#[test]
fn modest_margin_with_low_stock_scores_baja() {
    let rec = score_product(&ProductInvestmentData {
        product_id: 1,
        name: "Fideos".into(),
        sku: None,
        avg_sale_price: dec!(150),
        avg_purchase_price: dec!(100),
        units_sold: 50,
        current_stock: 5,
        days_analyzed: 90,
    });
    assert_eq!(rec.profit_margin, dec!(0.5));
    assert_eq!(rec.score, dec!(33.33));
    assert_eq!(rec.priority, Priority::Baja);
}

#[test]
fn zero_purchase_price_scores_zero() {
    let rec = score_product(&ProductInvestmentData {
        product_id: 1,
        name: "Regalo".into(),
        sku: None,
        avg_sale_price: dec!(150),
        avg_purchase_price: Decimal::ZERO,
        units_sold: 10_000,
        current_stock: 1,
        days_analyzed: 90,
    });
    assert_eq!(rec.profit_margin, Decimal::ZERO);
    assert_eq!(rec.score, Decimal::ZERO);
}

#[tokio::test]
async fn tenant_without_sales_gets_neutral_response() {
    let response = service(InMemoryStore::default())
        .get_profit_analysis(
            request_for(TenantKey::Id(1), (2025, 1, 1), (2025, 3, 1)),
            at(2025, 3, 4, 12),
        )
        .await
        .unwrap();

    assert!(response.top50_profitable.is_empty());
    assert!(response.top50_unprofitable.is_empty());
    assert!(response.recommendations.is_empty());

    let projection = &response.month_projection;
    assert_eq!(projection.current, Decimal::ZERO);
    assert_eq!(projection.projected, Decimal::ZERO);
    assert_eq!(projection.confidence, 0.0);
    assert_eq!(projection.trend, Trend::Stable);
    assert_eq!(projection.days_analyzed, 0);
    assert_eq!(projection.days_remaining, 0);

    assert_eq!(response.inventory_roi.status, RoiStatus::Critical);
    assert_eq!(response.inventory_roi.roi_percent, Decimal::ZERO);
    assert!(response.inventory_roi.alert_message.is_some());
    assert!(response.monthly_history.months.is_empty());
    assert!(response.roi_history.months.is_empty());
}

#[tokio::test]
async fn roi_history_prefers_snapshot_and_falls_back_to_current_value() {
    let store = InMemoryStore::default()
        .with_sale(org(1), profit_sale(1, at(2025, 1, 10, 9), dec!(50)))
        .with_sale(org(1), profit_sale(2, at(2025, 2, 10, 9), dec!(100)))
        .with_product(org(1), product(1, "Arroz", vec![10], Some(dec!(100))))
        .with_snapshot(org(1), 2025, 2, dec!(500));

    let response = service(store)
        .get_profit_analysis(
            request_for(TenantKey::Id(1), (2025, 1, 1), (2025, 3, 15)),
            at(2025, 3, 15, 12),
        )
        .await
        .unwrap();

    let months = &response.roi_history.months;
    assert_eq!(months.len(), 2);

    let february = &months[0];
    assert_eq!((february.year, february.month_number), (2025, 2));
    assert_eq!(february.inventory_value, dec!(500));
    assert!(february.from_snapshot);
    assert_eq!(february.roi_percent, dec!(20));

    let january = &months[1];
    assert_eq!((january.year, january.month_number), (2025, 1));
    assert_eq!(january.inventory_value, dec!(1000));
    assert!(!january.from_snapshot);
    assert_eq!(january.roi_percent, dec!(5));

    assert_eq!(february.change_percent, dec!(300));
    assert_eq!(response.inventory_roi.total_inventory_value, dec!(1000));
}

#[tokio::test]
async fn repeated_analysis_is_identical() {
    let store = InMemoryStore::default()
        .with_sale(org(1), profit_sale(1, at(2025, 2, 1, 9), dec!(80)))
        .with_sale(
            org(1),
            sale(2, at(2025, 2, 20, 9), vec![line(7, 4, dec!(25), dec!(20))]),
        )
        .with_product(org(1), product(7, "Café", vec![12, 3], Some(dec!(20))))
        .with_purchase(org(1), purchase(at(2025, 2, 2, 9), vec![(10, dec!(20))]));
    let service = service(store);
    let request = request_for(TenantKey::Id(1), (2025, 1, 1), (2025, 2, 28));
    let as_of = at(2025, 3, 1, 8);

    let first = service.get_profit_analysis(request, as_of).await.unwrap();
    let second = service.get_profit_analysis(request, as_of).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn sales_read_failure_is_reported() {
    let store = InMemoryStore {
        fail_sales: true,
        ..InMemoryStore::default()
    };

    let result = service(store)
        .get_profit_analysis(
            request_for(TenantKey::Id(1), (2025, 1, 1), (2025, 2, 1)),
            at(2025, 3, 1, 8),
        )
        .await;
    match result {
        Err(err @ ServiceError::DatabaseError(_)) => assert!(err.is_upstream()),
        other => panic!("expected database error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn products_are_scoped_to_the_requested_tenant() {
    let store = InMemoryStore::default()
        .with_sale(org(1), sale(1, at(2025, 2, 3, 9), vec![line(1, 2, dec!(10), dec!(4))]))
        .with_sale(org(2), sale(2, at(2025, 2, 3, 9), vec![line(2, 5, dec!(10), dec!(4))]))
        .with_sale(
            Owner::default(),
            sale(3, at(2025, 2, 3, 9), vec![line(3, 1, dec!(10), dec!(4))]),
        );
    let service = service(store);
    let as_of = at(2025, 3, 1, 8);

    let scoped = service
        .get_profit_analysis(request_for(TenantKey::Id(1), (2025, 2, 1), (2025, 2, 28)), as_of)
        .await
        .unwrap();
    let ids: Vec<i64> = scoped.top50_profitable.iter().map(|p| p.product_id).collect();
    assert_eq!(ids, vec![1]);

    let unassigned = service
        .get_profit_analysis(
            request_for(TenantKey::Unassigned, (2025, 2, 1), (2025, 2, 28)),
            as_of,
        )
        .await
        .unwrap();
    let ids: Vec<i64> = unassigned.top50_profitable.iter().map(|p| p.product_id).collect();
    assert_eq!(ids, vec![3]);

    let everyone = service
        .get_profit_analysis(request_for(TenantKey::Any, (2025, 2, 1), (2025, 2, 28)), as_of)
        .await
        .unwrap();
    assert_eq!(everyone.top50_profitable.len(), 3);
    assert_eq!(everyone.top50_profitable[0].product_id, 2);
}

#[tokio::test]
async fn recommendations_and_lists_come_from_requested_range() {
    let store = InMemoryStore::default()
        // margin 0.3, rotation 2 per day over 90 days, stock 50: score 60
        .with_sale(
            org(1),
            sale(1, at(2025, 2, 5, 9), vec![line(7, 180, dec!(130), dec!(100))]),
        )
        // sold at a loss
        .with_sale(
            org(1),
            sale(2, at(2025, 2, 6, 9), vec![line(8, 2, dec!(10), dec!(15))]),
        )
        // outside the requested range
        .with_sale(
            org(1),
            sale(3, at(2024, 12, 6, 9), vec![line(9, 500, dec!(100), dec!(10))]),
        )
        .with_product(org(1), product(7, "Cerveza", vec![50], Some(dec!(100))))
        .with_product(org(1), product(8, "Pan", vec![3], Some(dec!(15))));

    let response = service(store)
        .get_profit_analysis(
            request_for(TenantKey::Id(1), (2025, 2, 1), (2025, 2, 28)),
            at(2025, 3, 1, 8),
        )
        .await
        .unwrap();

    let profitable: Vec<i64> = response.top50_profitable.iter().map(|p| p.product_id).collect();
    assert_eq!(profitable, vec![7, 8]);
    assert_eq!(response.top50_profitable[0].profit, dec!(5400));
    assert_eq!(response.top50_profitable[0].name, "Cerveza");
    assert_eq!(response.top50_profitable[0].sku.as_deref(), Some("SKU-7"));

    let unprofitable: Vec<i64> = response.top50_unprofitable.iter().map(|p| p.product_id).collect();
    assert_eq!(unprofitable, vec![8]);

    assert_eq!(response.recommendations.len(), 1);
    let rec = &response.recommendations[0];
    assert_eq!(rec.product_id, 7);
    assert_eq!(rec.score, dec!(60));
    assert_eq!(rec.priority, Priority::Media);
}

#[tokio::test]
async fn inverted_range_is_a_validation_error() {
    let result = service(InMemoryStore::default())
        .get_profit_analysis(
            request_for(TenantKey::Id(1), (2025, 3, 1), (2025, 1, 1)),
            at(2025, 3, 4, 12),
        )
        .await;
    assert!(matches!(result, Err(ServiceError::ValidationError(_))));
}

#[tokio::test]
async fn response_serializes_with_wire_field_names() {
    let response = service(InMemoryStore::default())
        .get_profit_analysis(
            request_for(TenantKey::Id(1), (2025, 1, 1), (2025, 3, 1)),
            at(2025, 3, 4, 12),
        )
        .await
        .unwrap();

    let json = serde_json::to_value(&response).unwrap();
    for key in [
        "top50Profitable",
        "top50Unprofitable",
        "monthProjection",
        "recommendations",
        "monthlyHistory",
        "inventoryROI",
        "roiHistory",
    ] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    assert_eq!(json["monthProjection"]["trend"], "stable");
    assert!(json["monthProjection"]["breakdown"].get("last30Days").is_some());
    assert_eq!(json["inventoryROI"]["status"], "critical");
}

#[tokio::test]
async fn captured_snapshot_feeds_later_roi_history() {
    let store = Arc::new(
        InMemoryStore::default()
            .with_product(org(1), product(1, "Atún", vec![4, -1], Some(dec!(12.5))))
            .with_sale(org(1), profit_sale(1, at(2025, 2, 10, 9), dec!(25))),
    );
    let filter = TenantFilter::new(TenantKey::Id(1), TenantKey::Any);
    let snapshots = InventorySnapshotService::new(store.clone());

    let first = snapshots
        .capture_current_month(&filter, at(2025, 2, 28, 20))
        .await
        .unwrap();
    assert!(first.created);
    assert_eq!(first.total_inventory_value, dec!(50));
    assert_eq!(first.total_units, 4);

    let again = snapshots.capture_snapshot(2025, 2, &filter).await.unwrap();
    assert!(!again.created);
    assert_eq!(store.stored_snapshots().len(), 1);

    let analysis = ProfitAnalysisService::new(store, AnalysisSettings::default());
    let response = analysis
        .get_profit_analysis(
            request_for(TenantKey::Id(1), (2025, 2, 1), (2025, 2, 28)),
            at(2025, 3, 10, 12),
        )
        .await
        .unwrap();

    let february = &response.roi_history.months[0];
    assert!(february.from_snapshot);
    assert_eq!(february.inventory_value, dec!(50));
    assert_eq!(february.roi_percent, dec!(50));
}

#[tokio::test]
async fn scoring_and_loss_filter_ignore_cent_rounding() {
    let store = InMemoryStore::default()
        // margin 0.000351 at 1000 units per day scores 35.1, rounding the price to 100.04 would give 40
        .with_sale(
            org(1),
            sale(1, at(2025, 2, 5, 9), vec![line(7, 90_000, dec!(100.0351), dec!(100))]),
        )
        // loses 0.004, which rounds to zero
        .with_sale(
            org(1),
            sale(2, at(2025, 2, 6, 9), vec![line(8, 1, dec!(1.001), dec!(1.005))]),
        )
        .with_product(org(1), product(7, "Gaseosa", vec![50], Some(dec!(100))))
        .with_product(org(1), product(8, "Chicle", vec![2], Some(dec!(1.005))));

    let response = service(store)
        .get_profit_analysis(
            request_for(TenantKey::Id(1), (2025, 2, 1), (2025, 2, 28)),
            at(2025, 3, 1, 8),
        )
        .await
        .unwrap();

    assert!(response.recommendations.is_empty());
    assert_eq!(response.top50_profitable[0].avg_sale_price, dec!(100.04));

    let unprofitable: Vec<i64> = response.top50_unprofitable.iter().map(|p| p.product_id).collect();
    assert_eq!(unprofitable, vec![8]);
    assert_eq!(response.top50_unprofitable[0].profit, Decimal::ZERO);
}
