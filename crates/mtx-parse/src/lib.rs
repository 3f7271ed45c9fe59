//! # Matriciale Parse
//!
//! 報表文字解析、結存表讀取與明細正規化

pub mod balance;
pub mod normalizer;
pub mod report;
pub mod unit;

pub use balance::{read_balance_file, read_balance_rows, BalanceBatch};
pub use normalizer::{classify_item, NormalizedBatch, Normalizer, UnitRegistry};
pub use report::{
    HeuristicReportParser, ParsedReport, ProductInfo, RawMovement, ReportHeader, ReportPage,
    ReportParser,
};
pub use unit::unit_from_filename;
