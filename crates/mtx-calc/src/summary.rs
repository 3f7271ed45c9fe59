//! 執行摘要與警示

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use mtx_core::{AnalysisConfig, ItemMetrics, MovementPattern};

/// 補貨量排行筆數
pub const TOP_REPLENISHMENT_LIMIT: usize = 20;

/// 停滯品項警示列出的品項數
pub const INACTIVE_EXAMPLE_LIMIT: usize = 10;

/// 輸入規模
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub movement_files: usize,
    pub balance_files: usize,
    pub failed_files: usize,
    pub real_movements: usize,
    pub synthetic_movements: usize,
    pub rejected_records: usize,
    pub skipped_lines: usize,
    pub balance_rows: usize,
    pub units: usize,
}

/// 警示
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Alert {
    /// 建議補貨量超過門檻
    HighReplenishment {
        item_code: String,
        item_name: String,
        unit: String,
        quantity: Decimal,
        threshold: Decimal,
    },
    /// 停滯品項
    InactiveItems {
        count: usize,
        percentage: Decimal,
        examples: Vec<String>,
    },
}

/// 補貨量排行項目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopReplenishment {
    pub item_code: String,
    pub item_name: String,
    pub unit: String,
    pub quantity: Decimal,
    pub unit_value: Decimal,
    pub total_value: Decimal,
}

/// 分組彙總（分類或單位）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub items: usize,
    pub items_with_replenishment: usize,
    pub replenishment_value: Decimal,
}

/// 型態分布
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternShare {
    pub count: usize,
    pub percentage: Decimal,
}

/// 單次執行摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub counts: RunCounts,
    pub items_analyzed: usize,
    pub items_with_replenishment: usize,
    pub total_replenishment_value: Decimal,
    pub by_pattern: BTreeMap<String, PatternShare>,
    pub by_classification: BTreeMap<String, GroupSummary>,
    /// 非中央單位
    pub by_unit: BTreeMap<String, GroupSummary>,
    pub top_replenishments: Vec<TopReplenishment>,
    pub alerts: Vec<Alert>,
}

impl RunSummary {
    /// 由分析結果建立摘要
    pub fn build(items: &[ItemMetrics], counts: RunCounts, config: &AnalysisConfig) -> Self {
        let mut by_pattern: BTreeMap<String, PatternShare> = BTreeMap::new();
        let mut by_classification: BTreeMap<String, GroupSummary> = BTreeMap::new();
        let mut by_unit: BTreeMap<String, GroupSummary> = BTreeMap::new();

        for item in items {
            by_pattern.entry(item.pattern.label().to_string()).or_default().count += 1;

            accumulate(
                by_classification
                    .entry(item.classification.label().to_string())
                    .or_default(),
                item,
            );
            if !config.is_central(&item.unit) {
                accumulate(by_unit.entry(item.unit.clone()).or_default(), item);
            }
        }

        for share in by_pattern.values_mut() {
            share.percentage = percentage(share.count, items.len());
        }

        let mut top: Vec<&ItemMetrics> = items.iter().filter(|i| i.needs_replenishment()).collect();
        top.sort_by(|a, b| b.replenishment.cmp(&a.replenishment));
        let top_replenishments = top
            .iter()
            .take(TOP_REPLENISHMENT_LIMIT)
            .map(|i| TopReplenishment {
                item_code: i.item_code.clone(),
                item_name: i.item_name.clone(),
                unit: i.unit.clone(),
                quantity: i.replenishment,
                unit_value: i.unit_value,
                total_value: i.replenishment_value(),
            })
            .collect();

        let summary = Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            counts,
            items_analyzed: items.len(),
            items_with_replenishment: items.iter().filter(|i| i.needs_replenishment()).count(),
            total_replenishment_value: items.iter().map(|i| i.replenishment_value()).sum(),
            by_pattern,
            by_classification,
            by_unit,
            top_replenishments,
            alerts: build_alerts(items, config.high_replenishment_threshold),
        };

        tracing::info!(
            "摘要 {}：{} 個品項，{} 個需補貨，{} 則警示",
            summary.run_id,
            summary.items_analyzed,
            summary.items_with_replenishment,
            summary.alerts.len()
        );

        summary
    }
}

/// 產生警示：高補貨量逐筆列出，停滯品項合併為一則
pub fn build_alerts(items: &[ItemMetrics], threshold: Decimal) -> Vec<Alert> {
    let mut alerts: Vec<Alert> = items
        .iter()
        .filter(|i| i.replenishment > threshold)
        .map(|i| Alert::HighReplenishment {
            item_code: i.item_code.clone(),
            item_name: i.item_name.clone(),
            unit: i.unit.clone(),
            quantity: i.replenishment,
            threshold,
        })
        .collect();

    let inactive: Vec<&ItemMetrics> = items
        .iter()
        .filter(|i| i.pattern == MovementPattern::Inativos)
        .collect();
    if !inactive.is_empty() {
        alerts.push(Alert::InactiveItems {
            count: inactive.len(),
            percentage: percentage(inactive.len(), items.len()),
            examples: inactive
                .iter()
                .take(INACTIVE_EXAMPLE_LIMIT)
                .map(|i| format!("{} ({})", i.item_name, i.unit))
                .collect(),
        });
    }

    alerts
}

fn accumulate(summary: &mut GroupSummary, item: &ItemMetrics) {
    summary.items += 1;
    if item.needs_replenishment() {
        summary.items_with_replenishment += 1;
        summary.replenishment_value += item.replenishment_value();
    }
}

/// 百分比，四捨五入至小數一位
fn percentage(part: usize, whole: usize) -> Decimal {
    if whole == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(whole)).round_dp(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtx_core::{Classification, CountSet, MedianSet, WeeklySeries};

    fn item(code: &str, unit: &str, pattern: MovementPattern, replenishment: i64) -> ItemMetrics {
        ItemMetrics {
            item_code: code.to_string(),
            item_name: format!("ITEM {}", code),
            unit_id: Some(1),
            unit: unit.to_string(),
            classification: Classification::Remume,
            weekly_series: WeeklySeries::new(),
            total: Decimal::ZERO,
            medians: MedianSet::default(),
            counts: CountSet::default(),
            maxima: Decimal::ZERO,
            pattern,
            method: Decimal::ZERO,
            lead_time_weeks: 3,
            target_stock: Decimal::ZERO,
            current_stock: Decimal::ZERO,
            replenishment: Decimal::from(replenishment),
            unit_value: Decimal::new(5, 1),
        }
    }

    fn sample() -> Vec<ItemMetrics> {
        vec![
            item("325.023.001", "Farmácia Olavo", MovementPattern::Ordinarios, 1500),
            item("325.023.002", "Farmácia Olavo", MovementPattern::Inativos, 0),
            item("325.023.003", "CAF", MovementPattern::Recentes, 40),
            item("325.023.004", "Farmácia ESF3", MovementPattern::Inativos, 0),
        ]
    }

    #[test]
    fn test_build_summary() {
        let items = sample();
        let summary = RunSummary::build(&items, RunCounts::default(), &AnalysisConfig::default());

        assert_eq!(summary.items_analyzed, 4);
        assert_eq!(summary.items_with_replenishment, 2);
        assert_eq!(summary.total_replenishment_value, Decimal::from(770));
        assert_eq!(summary.by_pattern["INATIVOS"].count, 2);
        assert_eq!(summary.by_pattern["INATIVOS"].percentage, Decimal::from(50));
        assert_eq!(summary.by_classification["1 REMUME"].items, 4);
        assert!(!summary.by_unit.contains_key("CAF"));
        assert_eq!(summary.by_unit["Farmácia Olavo"].items_with_replenishment, 1);
        assert_eq!(summary.top_replenishments.len(), 2);
        assert_eq!(summary.top_replenishments[0].item_code, "325.023.001");
        assert_eq!(summary.top_replenishments[0].total_value, Decimal::from(750));
    }

    #[test]
    fn test_alerts() {
        let alerts = build_alerts(&sample(), Decimal::from(1000));

        assert_eq!(alerts.len(), 2);
        assert!(matches!(
            &alerts[0],
            Alert::HighReplenishment { item_code, .. } if item_code == "325.023.001"
        ));
        match &alerts[1] {
            Alert::InactiveItems { count, percentage, examples } => {
                assert_eq!(*count, 2);
                assert_eq!(*percentage, Decimal::from(50));
                assert_eq!(examples[0], "ITEM 325.023.002 (Farmácia Olavo)");
            }
            other => panic!("unexpected alert {:?}", other),
        }
    }

    #[test]
    fn test_no_items_no_alerts() {
        assert!(build_alerts(&[], Decimal::from(1000)).is_empty());
        let summary = RunSummary::build(&[], RunCounts::default(), &AnalysisConfig::default());
        assert_eq!(summary.total_replenishment_value, Decimal::ZERO);
        assert!(summary.by_pattern.is_empty());
    }
}
