//! 補貨量計算

use rust_decimal::Decimal;
use std::collections::HashMap;

use mtx_core::{BalanceSnapshot, MovementPattern};

use crate::aggregation::SeriesStats;

/// 每週需求估計（方法值）
pub fn method_value(pattern: MovementPattern, stats: &SeriesStats) -> Decimal {
    match pattern {
        MovementPattern::Entrantes => stats.medians.md_all,
        MovementPattern::Inativos => Decimal::ZERO,
        MovementPattern::Intermitentes => (stats.maxima / Decimal::from(4)).floor().max(Decimal::ONE),
        MovementPattern::Recentes | MovementPattern::Ordinarios => stats.medians.max(),
    }
}

/// 目標庫存 = 方法值 × 提前期
pub fn target_stock(method: Decimal, lead_time_weeks: u32) -> Decimal {
    method * Decimal::from(lead_time_weeks)
}

/// 建議補貨量 = max(0, 目標 − 庫存)
pub fn suggested_replenishment(target: Decimal, current_stock: Decimal) -> Decimal {
    (target - current_stock).max(Decimal::ZERO)
}

/// 結存表索引：依品項與單位查詢庫存與單價
#[derive(Debug, Clone, Default)]
pub struct StockIndex {
    by_unit: HashMap<(String, String), (Decimal, Decimal)>,
    by_item: HashMap<String, (Decimal, Decimal)>,
}

impl StockIndex {
    pub fn new(snapshots: &[BalanceSnapshot]) -> Self {
        let mut index = Self::default();

        for snapshot in snapshots {
            let closing = snapshot.closing_or_zero();
            let unit_value = snapshot.unit_value.unwrap_or(Decimal::ZERO);

            index
                .by_unit
                .entry((snapshot.item_code.clone(), snapshot.unit.clone()))
                .or_insert((closing, unit_value));

            // 全單位加總；單價取第一筆
            index
                .by_item
                .entry(snapshot.item_code.clone())
                .and_modify(|(stock, _)| *stock += closing)
                .or_insert((closing, unit_value));
        }

        index
    }

    /// 是否有該單位的結存資料
    pub fn contains(&self, item_code: &str, unit: &str) -> bool {
        self.by_unit
            .contains_key(&(item_code.to_string(), unit.to_string()))
    }

    /// 單一單位的期末庫存（無資料為 0）
    pub fn unit_stock(&self, item_code: &str, unit: &str) -> Decimal {
        self.by_unit
            .get(&(item_code.to_string(), unit.to_string()))
            .map_or(Decimal::ZERO, |(stock, _)| *stock)
    }

    /// 全單位期末庫存加總
    pub fn total_stock(&self, item_code: &str) -> Decimal {
        self.by_item.get(item_code).map_or(Decimal::ZERO, |(stock, _)| *stock)
    }

    pub fn unit_value(&self, item_code: &str, unit: &str) -> Decimal {
        self.by_unit
            .get(&(item_code.to_string(), unit.to_string()))
            .map_or(Decimal::ZERO, |(_, value)| *value)
    }

    /// 第一筆結存的單價
    pub fn first_unit_value(&self, item_code: &str) -> Decimal {
        self.by_item.get(item_code).map_or(Decimal::ZERO, |(_, value)| *value)
    }

    /// 依單位角色取得 (庫存, 單價)：中央單位看全單位加總
    pub fn stock_and_value(&self, item_code: &str, unit: &str, central: bool) -> (Decimal, Decimal) {
        if central {
            (self.total_stock(item_code), self.first_unit_value(item_code))
        } else {
            (self.unit_stock(item_code, unit), self.unit_value(item_code, unit))
        }
    }
}
