use rust_decimal::Decimal;
use tracing::info;

use crate::common::{percent_of, round_money};
use crate::models::{InventoryRoi, InventoryValuation, RoiStatus};
use crate::repositories::ProductRecord;

const CRITICAL_ROI: Decimal = Decimal::from_parts(5, 0, 0, false, 0);
const WARNING_ROI: Decimal = Decimal::TEN;

pub const CRITICAL_ALERT: &str = "Capital inmovilizado - Inventario genera bajo retorno";
pub const WARNING_ALERT: &str = "ROI por debajo del objetivo - Monitorear rotación";

/// Values on-hand stock at each product's last acquisition price.
///
/// Only stores with positive stock count, and products missing a positive
/// stock or price contribute nothing to the value.
pub fn value_inventory(products: &[ProductRecord]) -> InventoryValuation {
    products
        .iter()
        .fold(InventoryValuation::default(), |mut valuation, product| {
            let stock = product.on_hand_stock();
            if stock <= 0 {
                return valuation;
            }
            valuation.total_products += 1;
            valuation.total_units = valuation.total_units.saturating_add(stock);

            let price = product.last_acquisition_price.unwrap_or(Decimal::ZERO);
            if price > Decimal::ZERO {
                let value = price
                    .checked_mul(Decimal::from(stock))
                    .unwrap_or(Decimal::ZERO);
                valuation.total_inventory_value =
                    valuation.total_inventory_value.saturating_add(value);
            }
            valuation
        })
}

pub fn classify_roi(roi_percent: Decimal) -> (RoiStatus, Option<String>) {
    if roi_percent < CRITICAL_ROI {
        (RoiStatus::Critical, Some(CRITICAL_ALERT.to_string()))
    } else if roi_percent < WARNING_ROI {
        (RoiStatus::Warning, Some(WARNING_ALERT.to_string()))
    } else {
        (RoiStatus::Healthy, None)
    }
}

/// Monthly return on the capital tied up in inventory.
pub fn inventory_roi(monthly_profit: Decimal, total_inventory_value: Decimal) -> InventoryRoi {
    let roi_percent = percent_of(monthly_profit, total_inventory_value);
    let (status, alert_message) = classify_roi(roi_percent);

    info!(
        inventory_value = %total_inventory_value,
        monthly_profit = %monthly_profit,
        roi_percent = %roi_percent,
        ?status,
        "Inventory ROI computed"
    );

    InventoryRoi {
        total_inventory_value: round_money(total_inventory_value),
        monthly_profit: round_money(monthly_profit),
        roi_percent: round_money(roi_percent),
        status,
        alert_message,
    }
}
