//! 中央單位彙總視圖
//!
//! 以品項為單位合併所有單位的週次序列，重新計算統計與型態，
//! 並以中央提前期與全單位庫存加總計算補貨量。

use std::collections::BTreeMap;

use mtx_core::{AnalysisConfig, BalanceSnapshot, ItemMetrics};

use crate::aggregation::merge_series;
use crate::analyzer::{evaluate_series, MetricsContext};
use crate::replenishment::StockIndex;

/// 產生每個品項一筆的中央彙總指標（`unit_id` 為 `None`）
pub fn consolidate_central(
    items: &[ItemMetrics],
    snapshots: &[BalanceSnapshot],
    config: &AnalysisConfig,
    reference_year: i32,
) -> Vec<ItemMetrics> {
    let index = StockIndex::new(snapshots);

    let mut by_item: BTreeMap<&str, Vec<&ItemMetrics>> = BTreeMap::new();
    for item in items {
        by_item.entry(item.item_code.as_str()).or_default().push(item);
    }

    let consolidated: Vec<ItemMetrics> = by_item
        .into_iter()
        .filter_map(|(code, sources)| {
            let first = sources.first()?;
            let series = merge_series(sources.iter().map(|m| &m.weekly_series));

            let ctx = MetricsContext {
                item_code: code.to_string(),
                item_name: first.item_name.clone(),
                unit_id: None,
                unit: config.central_unit.clone(),
                classification: first.classification,
                lead_time_weeks: config.central_lead_time_weeks,
                current_stock: index.total_stock(code),
                unit_value: index.first_unit_value(code),
            };

            Some(evaluate_series(ctx, series, reference_year))
        })
        .collect();

    tracing::info!("中央彙總完成：{} 個品項", consolidated.len());

    consolidated
}
