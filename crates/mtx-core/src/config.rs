//! 分析設定模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::movement::TransactionSubtype;
use crate::{MtxError, Result};

/// 檔名無法對應任何庫存單位時使用的名稱
pub const UNKNOWN_UNIT: &str = "unknown";

/// 檔名 token 與庫存單位名稱的對應
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitToken {
    /// 檔名中出現的 token（不分大小寫）
    pub token: String,
    /// 單位顯示名稱
    pub name: String,
}

impl UnitToken {
    pub fn new(token: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            name: name.into(),
        }
    }
}

/// 補貨分析參數配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// 庫存單位 token 清單（依序比對，第一個命中者為準）
    pub unit_tokens: Vec<UnitToken>,

    /// 中央（彙總）單位名稱
    pub central_unit: String,

    /// 中央單位提前期（週）
    pub central_lead_time_weeks: u32,

    /// 其他單位提前期（週）
    pub unit_lead_time_weeks: u32,

    /// 視為需求訊號的交易子類型
    pub demand_subtypes: Vec<TransactionSubtype>,

    /// 是否回填合成歷史資料
    pub synthesize_history: bool,

    /// 合成歷史週數
    pub synthetic_weeks: u32,

    /// 「本年度」中位數所用的參考年份（未設定時使用系統當年）
    pub reference_year: Option<i32>,

    /// 高補貨量警示門檻
    pub high_replenishment_threshold: Decimal,

    /// 結存表 CSV 分隔字元
    pub balance_delimiter: char,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            unit_tokens: vec![
                UnitToken::new("CAF", "CAF"),
                UnitToken::new("Olavo", "Farmácia Olavo"),
                UnitToken::new("ESF3", "Farmácia ESF3"),
            ],
            central_unit: "CAF".to_string(),
            central_lead_time_weeks: 12,
            unit_lead_time_weeks: 3,
            demand_subtypes: vec![TransactionSubtype::SA, TransactionSubtype::SU],
            synthesize_history: true,
            synthetic_weeks: 52,
            reference_year: None,
            high_replenishment_threshold: Decimal::from(1000),
            balance_delimiter: ';',
        }
    }
}

impl AnalysisConfig {
    /// 創建預設配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 從 JSON 檔載入配置（缺少的欄位使用預設值）
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: AnalysisConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// 建構器模式：設置單位 token 清單
    pub fn with_unit_tokens(mut self, tokens: Vec<UnitToken>) -> Self {
        self.unit_tokens = tokens;
        self
    }

    /// 建構器模式：設置中央單位
    pub fn with_central_unit(mut self, name: impl Into<String>) -> Self {
        self.central_unit = name.into();
        self
    }

    /// 建構器模式：設置提前期（中央、其他單位）
    pub fn with_lead_times(mut self, central_weeks: u32, unit_weeks: u32) -> Self {
        self.central_lead_time_weeks = central_weeks;
        self.unit_lead_time_weeks = unit_weeks;
        self
    }

    /// 建構器模式：設置參考年份
    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.reference_year = Some(year);
        self
    }

    /// 建構器模式：設置是否回填合成歷史
    pub fn with_synthesize_history(mut self, enabled: bool) -> Self {
        self.synthesize_history = enabled;
        self
    }

    /// 建構器模式：設置高補貨量警示門檻
    pub fn with_high_replenishment_threshold(mut self, threshold: Decimal) -> Self {
        self.high_replenishment_threshold = threshold;
        self
    }

    /// 建構器模式：設置結存表分隔字元
    pub fn with_balance_delimiter(mut self, delimiter: char) -> Self {
        self.balance_delimiter = delimiter;
        self
    }

    /// 檢查配置是否合理
    pub fn validate(&self) -> Result<()> {
        if self.central_unit.trim().is_empty() {
            return Err(MtxError::Config("中央單位名稱不可為空".to_string()));
        }
        if self.unit_tokens.iter().any(|t| t.token.trim().is_empty()) {
            return Err(MtxError::Config("單位 token 不可為空".to_string()));
        }
        if self.demand_subtypes.is_empty() {
            return Err(MtxError::Config("至少需要一個需求子類型".to_string()));
        }
        if !self.balance_delimiter.is_ascii() {
            return Err(MtxError::Config(format!(
                "分隔字元必須是 ASCII: {:?}",
                self.balance_delimiter
            )));
        }
        Ok(())
    }

    /// 是否為中央單位
    pub fn is_central(&self, unit: &str) -> bool {
        unit == self.central_unit
    }

    /// 單位對應的提前期（週）
    pub fn lead_time_weeks(&self, unit: &str) -> u32 {
        if self.is_central(unit) {
            self.central_lead_time_weeks
        } else {
            self.unit_lead_time_weeks
        }
    }

    /// 子類型是否為需求訊號
    pub fn is_demand_subtype(&self, subtype: TransactionSubtype) -> bool {
        self.demand_subtypes.contains(&subtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::new();

        assert_eq!(config.central_unit, "CAF");
        assert_eq!(config.lead_time_weeks("CAF"), 12);
        assert_eq!(config.lead_time_weeks("Farmácia Olavo"), 3);
        assert_eq!(config.lead_time_weeks(UNKNOWN_UNIT), 3);
        assert!(config.is_demand_subtype(TransactionSubtype::SA));
        assert!(config.is_demand_subtype(TransactionSubtype::SU));
        assert!(!config.is_demand_subtype(TransactionSubtype::ST));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = AnalysisConfig::new()
            .with_central_unit("ALMOX")
            .with_lead_times(8, 2)
            .with_reference_year(2024)
            .with_synthesize_history(false)
            .with_balance_delimiter(',');

        assert!(config.is_central("ALMOX"));
        assert!(!config.is_central("CAF"));
        assert_eq!(config.lead_time_weeks("ALMOX"), 8);
        assert_eq!(config.lead_time_weeks("CAF"), 2);
        assert_eq!(config.reference_year, Some(2024));
        assert!(!config.synthesize_history);
        assert_eq!(config.balance_delimiter, ',');
    }

    #[test]
    fn test_config_validation() {
        let config = AnalysisConfig::new().with_central_unit("  ");
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::new();
        config.demand_subtypes.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{ "central_lead_time_weeks": 10, "demand_subtypes": ["SA"] }"#)
                .unwrap();

        assert_eq!(config.central_lead_time_weeks, 10);
        assert_eq!(config.unit_lead_time_weeks, 3);
        assert_eq!(config.demand_subtypes, vec![TransactionSubtype::SA]);
        assert_eq!(config.unit_tokens.len(), 3);
    }
}
