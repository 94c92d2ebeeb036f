//! Per-product investment scoring and ranking.

use rust_decimal::Decimal;
use tracing::warn;

use crate::common::round_money;
use crate::models::{InvestmentRecommendation, Priority, ProductInvestmentData};

/// Minimum score a product needs to be recommended.
pub const RECOMMENDATION_THRESHOLD: Decimal = Decimal::from_parts(40, 0, 0, false, 0);
const HIGH_PRIORITY: Decimal = Decimal::from_parts(70, 0, 0, false, 0);
const MAX_SCORE: Decimal = Decimal::ONE_HUNDRED;

const LOW_STOCK: i64 = 10;
const HIGH_STOCK: i64 = 100;
// 1.2 and 0.8
const LOW_STOCK_FACTOR: Decimal = Decimal::from_parts(12, 0, 0, false, 1);
const HIGH_STOCK_FACTOR: Decimal = Decimal::from_parts(8, 0, 0, false, 1);

const BALANCED_REASON: &str = "Producto con desempeño equilibrado";
const CAUTIOUS_REASON: &str = "Evaluar antes de invertir: margen y rotación moderados";

/// Score components before rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Metrics {
    profit_margin: Decimal,
    rotation_speed: Decimal,
    score: Decimal,
}

/// `(sale - purchase) / purchase`, zero when the purchase price is not positive.
pub fn profit_margin(avg_sale_price: Decimal, avg_purchase_price: Decimal) -> Option<Decimal> {
    if avg_purchase_price <= Decimal::ZERO {
        return Some(Decimal::ZERO);
    }
    avg_sale_price
        .checked_sub(avg_purchase_price)?
        .checked_div(avg_purchase_price)
}

/// Units sold per day, zero without an analysis window.
pub fn rotation_speed(units_sold: i64, days_analyzed: u32) -> Option<Decimal> {
    if days_analyzed == 0 {
        return Some(Decimal::ZERO);
    }
    Decimal::from(units_sold).checked_div(Decimal::from(days_analyzed))
}

pub fn stock_factor(current_stock: i64) -> Decimal {
    if current_stock < LOW_STOCK {
        LOW_STOCK_FACTOR
    } else if current_stock > HIGH_STOCK {
        HIGH_STOCK_FACTOR
    } else {
        Decimal::ONE
    }
}

pub fn priority_for(score: Decimal) -> Priority {
    if score >= HIGH_PRIORITY {
        Priority::Alta
    } else if score >= RECOMMENDATION_THRESHOLD {
        Priority::Media
    } else {
        Priority::Baja
    }
}

fn metrics(data: &ProductInvestmentData) -> Option<Metrics> {
    let profit_margin = profit_margin(data.avg_sale_price, data.avg_purchase_price)?;
    let rotation_speed = rotation_speed(data.units_sold, data.days_analyzed)?;
    let score = profit_margin
        .checked_mul(rotation_speed)?
        .checked_mul(Decimal::ONE_HUNDRED)?
        .checked_mul(stock_factor(data.current_stock))?
        .clamp(Decimal::ZERO, MAX_SCORE);
    Some(Metrics {
        profit_margin,
        rotation_speed,
        score,
    })
}

fn reason(metrics: &Metrics, current_stock: i64, priority: Priority) -> String {
    let half = Decimal::from_parts(5, 0, 0, false, 1);
    let fifth = Decimal::from_parts(2, 0, 0, false, 1);
    let tenth = Decimal::from_parts(1, 0, 0, false, 1);

    let margin = if metrics.profit_margin > half {
        Some("alto margen")
    } else if metrics.profit_margin > fifth {
        Some("buen margen")
    } else if metrics.profit_margin < tenth {
        Some("margen bajo")
    } else {
        None
    };

    let rotation = if metrics.rotation_speed > Decimal::from(5) {
        Some("rotación muy rápida")
    } else if metrics.rotation_speed > Decimal::TWO {
        Some("buena rotación")
    } else if metrics.rotation_speed < half {
        Some("rotación lenta")
    } else {
        None
    };

    let stock = if current_stock < LOW_STOCK {
        Some("requiere reposición")
    } else if current_stock > HIGH_STOCK {
        Some("stock elevado")
    } else {
        None
    };

    let notes: Vec<&str> = [margin, rotation, stock].into_iter().flatten().collect();
    if !notes.is_empty() {
        return notes.join(", ");
    }
    match priority {
        Priority::Baja => CAUTIOUS_REASON.to_string(),
        _ => BALANCED_REASON.to_string(),
    }
}

/// Scores one product. Arithmetic overflow degrades the score to zero.
pub fn score_product(data: &ProductInvestmentData) -> InvestmentRecommendation {
    let metrics = metrics(data).unwrap_or_else(|| {
        warn!(
            product_id = data.product_id,
            "Investment score overflowed, scoring product as zero"
        );
        Metrics {
            profit_margin: Decimal::ZERO,
            rotation_speed: Decimal::ZERO,
            score: Decimal::ZERO,
        }
    });
    let score = round_money(metrics.score);
    let priority = priority_for(score);

    InvestmentRecommendation {
        product_id: data.product_id,
        name: data.name.clone(),
        sku: data.sku.clone(),
        score,
        priority,
        reason: reason(&metrics, data.current_stock, priority),
        profit_margin: metrics.profit_margin.round_dp(4),
        rotation_speed: metrics.rotation_speed.round_dp(4),
        avg_sale_price: round_money(data.avg_sale_price),
        avg_purchase_price: round_money(data.avg_purchase_price),
        units_sold: data.units_sold,
        current_stock: data.current_stock,
    }
}

/// Scores every product, highest score first. Equal scores keep input order.
pub fn generate_recommendations(products: &[ProductInvestmentData]) -> Vec<InvestmentRecommendation> {
    let mut scored: Vec<InvestmentRecommendation> = products.iter().map(score_product).collect();
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// The `limit` best products scoring at least [`RECOMMENDATION_THRESHOLD`].
pub fn top_recommendations(
    products: &[ProductInvestmentData],
    limit: usize,
) -> Vec<InvestmentRecommendation> {
    generate_recommendations(products)
        .into_iter()
        .filter(|r| r.score >= RECOMMENDATION_THRESHOLD)
        .take(limit)
        .collect()
}
