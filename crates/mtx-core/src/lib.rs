//! # Matriciale Core
//!
//! 核心資料模型、設定與數值/週次工具

pub mod balance;
pub mod config;
pub mod metrics;
pub mod movement;
pub mod numeric;
pub mod week;

// Re-export 主要類型
pub use balance::BalanceSnapshot;
pub use config::{AnalysisConfig, UnitToken, UNKNOWN_UNIT};
pub use metrics::{CountSet, ItemMetrics, MedianSet, MovementPattern, WeeklySeries};
pub use movement::{
    is_item_code, Classification, ItemRef, MovementRecord, TransactionGroup, TransactionSubtype,
};
pub use week::WeekKey;

/// Matriciale 錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum MtxError {
    /// 必要輸入類別完全缺失（整批中止）
    #[error("缺少必要輸入: {0}")]
    MissingInput(String),

    /// 單一來源檔案解析失敗（該檔案略過，批次繼續）
    #[error("檔案解析失敗 {path}: {reason}")]
    FileParse { path: String, reason: String },

    /// 正規化記錄未通過格式檢查
    #[error("記錄驗證失敗: {0}")]
    Validation(String),

    #[error("無效的日期: {0}")]
    InvalidDate(String),

    #[error("設定錯誤: {0}")]
    Config(String),

    #[error("序列化錯誤: {0}")]
    Serialization(String),

    #[error("I/O 錯誤: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for MtxError {
    fn from(err: serde_json::Error) -> Self {
        MtxError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MtxError>;
