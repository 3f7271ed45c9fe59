//! # Matriciale Calculation Engine
//!
//! 合成歷史、週次統計、型態分類與補貨量計算

pub mod aggregation;
pub mod analyzer;
pub mod classifier;
pub mod consolidation;
pub mod replenishment;
pub mod summary;
pub mod synthesizer;

// Re-export 主要類型
pub use analyzer::MatricialeAnalyzer;
pub use consolidation::consolidate_central;
pub use replenishment::StockIndex;
pub use summary::{Alert, RunCounts, RunSummary};
pub use synthesizer::{HistorySynthesizer, SynthesisParams, SyntheticHistory, SyntheticValidation};

use mtx_core::ItemMetrics;
use serde::{Deserialize, Serialize};

/// 分析結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// 各 (品項, 單位) 指標，依 (單位, 品項代碼) 排序
    pub items: Vec<ItemMetrics>,

    /// 警告信息
    pub warnings: Vec<AnalysisWarning>,

    /// 計算耗時（毫秒）
    pub calculation_time_ms: Option<u128>,
}

impl AnalysisResult {
    /// 創建空的分析結果
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            warnings: Vec::new(),
            calculation_time_ms: None,
        }
    }

    /// 添加警告
    pub fn add_warning(&mut self, warning: AnalysisWarning) {
        self.warnings.push(warning);
    }
}

/// 分析警告
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWarning {
    pub item_code: String,
    pub unit: String,
    pub message: String,
    pub severity: WarningSeverity,
}

impl AnalysisWarning {
    pub fn new(item_code: String, unit: String, message: String, severity: WarningSeverity) -> Self {
        Self {
            item_code,
            unit,
            message,
            severity,
        }
    }

    pub fn info(item_code: String, unit: String, message: String) -> Self {
        Self::new(item_code, unit, message, WarningSeverity::Info)
    }

    pub fn warning(item_code: String, unit: String, message: String) -> Self {
        Self::new(item_code, unit, message, WarningSeverity::Warning)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningSeverity {
    Info,
    Warning,
}
