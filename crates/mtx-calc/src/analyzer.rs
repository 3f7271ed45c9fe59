//! 補貨分析主流程

use chrono::Datelike;
use rayon::prelude::*;
use rust_decimal::Decimal;

use mtx_core::{
    AnalysisConfig, BalanceSnapshot, Classification, ItemMetrics, MovementRecord, WeeklySeries,
};

use crate::aggregation::{build_series, group_demand, history_span_weeks, SeriesStats};
use crate::classifier::classify_pattern;
use crate::replenishment::{method_value, suggested_replenishment, target_stock, StockIndex};
use crate::{AnalysisResult, AnalysisWarning};

/// 歷史少於此週數時發出警告
pub const MIN_HISTORY_WEEKS: usize = 4;

/// 指標計算所需的品項/單位資訊
#[derive(Debug, Clone)]
pub(crate) struct MetricsContext {
    pub item_code: String,
    pub item_name: String,
    pub unit_id: Option<u32>,
    pub unit: String,
    pub classification: Classification,
    pub lead_time_weeks: u32,
    pub current_stock: Decimal,
    pub unit_value: Decimal,
}

/// 由週次序列計算完整指標
pub(crate) fn evaluate_series(
    ctx: MetricsContext,
    weekly_series: WeeklySeries,
    reference_year: i32,
) -> ItemMetrics {
    let stats = SeriesStats::compute(&weekly_series, reference_year);
    let pattern = classify_pattern(&stats);
    let method = method_value(pattern, &stats);
    let target = target_stock(method, ctx.lead_time_weeks);
    let replenishment = suggested_replenishment(target, ctx.current_stock);

    ItemMetrics {
        item_code: ctx.item_code,
        item_name: ctx.item_name,
        unit_id: ctx.unit_id,
        unit: ctx.unit,
        classification: ctx.classification,
        weekly_series,
        total: stats.total,
        medians: stats.medians,
        counts: stats.counts,
        maxima: stats.maxima,
        pattern,
        method,
        lead_time_weeks: ctx.lead_time_weeks,
        target_stock: target,
        current_stock: ctx.current_stock,
        replenishment,
        unit_value: ctx.unit_value,
    }
}

/// 補貨分析器
pub struct MatricialeAnalyzer {
    config: AnalysisConfig,
    reference_year: i32,
}

impl MatricialeAnalyzer {
    /// 創建新的分析器（未設定參考年份時使用系統當年）
    pub fn new(config: AnalysisConfig) -> Self {
        let reference_year = config
            .reference_year
            .unwrap_or_else(|| chrono::Local::now().year());
        Self {
            config,
            reference_year,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    /// 分析所有 (品項, 單位)
    pub fn analyze(&self, records: &[MovementRecord], snapshots: &[BalanceSnapshot]) -> AnalysisResult {
        tracing::info!(
            "開始補貨分析：移動記錄 {} 筆，結存 {} 筆",
            records.len(),
            snapshots.len()
        );

        let start_time = std::time::Instant::now();

        // Step 1: 需求篩選與分組
        tracing::debug!("Step 1: 需求分組");
        let groups = group_demand(records, &self.config);
        tracing::debug!("分組數量: {}", groups.len());

        // Step 2: 結存索引
        tracing::debug!("Step 2: 建立結存索引");
        let index = StockIndex::new(snapshots);

        // Step 3: 逐組計算（平行）
        tracing::debug!("Step 3: 計算指標");
        let groups: Vec<_> = groups.into_iter().collect();
        let evaluated: Vec<(ItemMetrics, Vec<AnalysisWarning>)> = groups
            .par_iter()
            .map(|((item_code, unit), group)| self.evaluate_group(item_code, unit, group, &index))
            .collect();

        let mut result = AnalysisResult::empty();
        for (metrics, warnings) in evaluated {
            result.items.push(metrics);
            result.warnings.extend(warnings);
        }
        result
            .items
            .sort_by(|a, b| (&a.unit, &a.item_code).cmp(&(&b.unit, &b.item_code)));

        let elapsed = start_time.elapsed().as_millis();
        result.calculation_time_ms = Some(elapsed);

        tracing::info!(
            "補貨分析完成：{} 個品項，{} 個警告，耗時 {} ms",
            result.items.len(),
            result.warnings.len(),
            elapsed
        );

        result
    }

    fn evaluate_group(
        &self,
        item_code: &str,
        unit: &str,
        group: &[&MovementRecord],
        index: &StockIndex,
    ) -> (ItemMetrics, Vec<AnalysisWarning>) {
        let mut warnings = Vec::new();
        let series = build_series(group.iter().copied());

        let span = history_span_weeks(&series);
        if span < MIN_HISTORY_WEEKS {
            warnings.push(AnalysisWarning::warning(
                item_code.to_string(),
                unit.to_string(),
                format!("歷史僅涵蓋 {} 週，中位數可能不具代表性", span),
            ));
        }

        let central = self.config.is_central(unit);
        if !central && !index.contains(item_code, unit) {
            warnings.push(AnalysisWarning::info(
                item_code.to_string(),
                unit.to_string(),
                "結存表中沒有此品項，庫存以 0 計".to_string(),
            ));
        }
        let (current_stock, unit_value) = index.stock_and_value(item_code, unit, central);

        // 分組鍵來自記錄本身，群組不會為空
        let (unit_id, item_name, classification) = group
            .first()
            .map(|r| (Some(r.unit_id()), r.item_name().to_string(), r.classification()))
            .unwrap_or((None, String::new(), Classification::Unclassified));

        let ctx = MetricsContext {
            item_code: item_code.to_string(),
            item_name,
            unit_id,
            unit: unit.to_string(),
            classification,
            lead_time_weeks: self.config.lead_time_weeks(unit),
            current_stock,
            unit_value,
        };

        (evaluate_series(ctx, series, self.reference_year), warnings)
    }
}
