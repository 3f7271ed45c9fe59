//! 分析結果模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::movement::Classification;
use crate::week::WeekKey;

/// 週次序列：週次鍵 → 該週數量絕對值總和
///
/// 沒有記錄的週次不存在於序列中，不會自動補 0。
pub type WeeklySeries = BTreeMap<WeekKey, Decimal>;

/// 分層中位數
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MedianSet {
    pub md04: Decimal,
    pub md08: Decimal,
    pub md12: Decimal,
    pub md16: Decimal,
    pub md26: Decimal,
    pub md52: Decimal,
    /// 本年度
    pub md_year: Decimal,
    /// 全期
    pub md_all: Decimal,
}

impl MedianSet {
    /// 8 個中位數中的最大值
    pub fn max(&self) -> Decimal {
        [
            self.md04,
            self.md08,
            self.md12,
            self.md16,
            self.md26,
            self.md52,
            self.md_year,
            self.md_all,
        ]
        .into_iter()
        .max()
        .unwrap_or(Decimal::ZERO)
    }
}

/// 分層非零週次計數
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CountSet {
    pub cont04: u32,
    pub cont08: u32,
    pub cont12: u32,
    pub cont16: u32,
    pub cont26: u32,
    pub cont52: u32,
    /// 本年度
    pub cont_year: u32,
    /// 全期
    pub cont_all: u32,
}

/// 移動型態
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MovementPattern {
    /// 新進：最近一週有量且全期僅出現一次
    #[serde(rename = "ENTRANTES")]
    Entrantes,
    /// 停滯：近 16 週無量
    #[serde(rename = "INATIVOS")]
    Inativos,
    /// 近期活躍
    #[serde(rename = "RECENTES")]
    Recentes,
    /// 常態
    #[serde(rename = "ORDINÁRIOS")]
    Ordinarios,
    /// 間歇
    #[serde(rename = "INTERMITENTES")]
    Intermitentes,
}

impl MovementPattern {
    pub fn label(&self) -> &'static str {
        match self {
            MovementPattern::Entrantes => "ENTRANTES",
            MovementPattern::Inativos => "INATIVOS",
            MovementPattern::Recentes => "RECENTES",
            MovementPattern::Ordinarios => "ORDINÁRIOS",
            MovementPattern::Intermitentes => "INTERMITENTES",
        }
    }
}

impl fmt::Display for MovementPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 單一 (品項, 單位) 的分析結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMetrics {
    /// 品項代碼
    pub item_code: String,

    /// 品項名稱
    pub item_name: String,

    /// 單位ID（中央彙總視圖為 None）
    pub unit_id: Option<u32>,

    /// 單位名稱
    pub unit: String,

    /// 分類
    pub classification: Classification,

    /// 週次序列
    pub weekly_series: WeeklySeries,

    /// 總量
    pub total: Decimal,

    /// 分層中位數
    pub medians: MedianSet,

    /// 分層計數
    pub counts: CountSet,

    /// 單週最大量
    pub maxima: Decimal,

    /// 移動型態
    pub pattern: MovementPattern,

    /// 預估每週需求（方法值）
    pub method: Decimal,

    /// 提前期（週）
    pub lead_time_weeks: u32,

    /// 目標庫存
    pub target_stock: Decimal,

    /// 系統庫存
    pub current_stock: Decimal,

    /// 建議補貨量
    pub replenishment: Decimal,

    /// 單價
    pub unit_value: Decimal,
}

impl ItemMetrics {
    /// 是否需要補貨
    pub fn needs_replenishment(&self) -> bool {
        self.replenishment > Decimal::ZERO
    }

    /// 補貨金額
    pub fn replenishment_value(&self) -> Decimal {
        self.replenishment * self.unit_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_set_max() {
        let medians = MedianSet {
            md04: Decimal::from(3),
            md26: Decimal::from(9),
            md_all: Decimal::new(45, 1),
            ..Default::default()
        };
        assert_eq!(medians.max(), Decimal::from(9));
        assert_eq!(MedianSet::default().max(), Decimal::ZERO);
    }

    #[test]
    fn test_pattern_labels() {
        assert_eq!(MovementPattern::Ordinarios.to_string(), "ORDINÁRIOS");
        assert_eq!(
            serde_json::to_string(&MovementPattern::Ordinarios).unwrap(),
            "\"ORDINÁRIOS\""
        );
    }
}
