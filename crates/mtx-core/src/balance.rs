//! 結存表（balancete）模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::movement::is_item_code;
use crate::numeric::parse_br_decimal;
use crate::{MtxError, Result};

/// 結存表欄位數
pub const BALANCE_COLUMNS: usize = 13;

/// 單一品項在單一單位的期間結存
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// 品項代碼
    pub item_code: String,

    /// 品項描述
    pub description: String,

    /// 庫存單位
    pub unit: String,

    /// 計量單位（CP、AMP …）
    pub measure_unit: String,

    /// 期初數量
    pub opening_qty: Option<Decimal>,

    /// 期初金額
    pub opening_value: Option<Decimal>,

    /// 期間入庫數量
    pub inflow_qty: Option<Decimal>,

    /// 期間入庫金額
    pub inflow_value: Option<Decimal>,

    /// 期間出庫數量
    pub outflow_qty: Option<Decimal>,

    /// 期間出庫金額
    pub outflow_value: Option<Decimal>,

    /// 期末數量（目前庫存）
    pub closing_qty: Option<Decimal>,

    /// 期末單價
    pub unit_value: Option<Decimal>,

    /// 期末金額
    pub closing_value: Option<Decimal>,
}

impl BalanceSnapshot {
    /// 由 13 欄表格列建立結存記錄
    ///
    /// 欄位順序：代碼、描述、空白、計量單位、期初量、期初值、入庫量、入庫值、
    /// 出庫量、出庫值、期末量、單價、期末值。缺少的尾端欄位視為空白。
    pub fn from_columns(columns: &[&str], unit: &str) -> Result<Self> {
        let col = |idx: usize| columns.get(idx).map(|s| s.trim()).unwrap_or("");
        let num = |idx: usize| parse_br_decimal(col(idx));

        let item_code = col(0).to_string();
        let description = col(1).to_string();

        if item_code.is_empty() || description.is_empty() {
            return Err(MtxError::Validation("結存列缺少代碼或描述".to_string()));
        }
        if !is_item_code(&item_code) {
            return Err(MtxError::Validation(format!("代碼格式錯誤: {}", item_code)));
        }

        Ok(Self {
            item_code,
            description,
            unit: unit.to_string(),
            measure_unit: col(3).to_string(),
            opening_qty: num(4),
            opening_value: num(5),
            inflow_qty: num(6),
            inflow_value: num(7),
            outflow_qty: num(8),
            outflow_value: num(9),
            closing_qty: num(10),
            unit_value: num(11),
            closing_value: num(12),
        })
    }

    /// 期末數量（空值視為 0，僅用於庫存加總）
    pub fn closing_or_zero(&self) -> Decimal {
        self.closing_qty.unwrap_or(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_from_columns() {
        let row = [
            "325.023.001",
            "DIPIRONA 500MG",
            "",
            "CP",
            "1.000",
            "150,00",
            "500",
            "75,00",
            "1.200",
            "180,00",
            "300",
            "0,1500",
            "45,00",
        ];

        let snapshot = BalanceSnapshot::from_columns(&row, "Farmácia Olavo").unwrap();

        assert_eq!(snapshot.item_code, "325.023.001");
        assert_eq!(snapshot.unit, "Farmácia Olavo");
        assert_eq!(snapshot.measure_unit, "CP");
        assert_eq!(snapshot.opening_qty, Some(Decimal::from(1000)));
        assert_eq!(snapshot.outflow_qty, Some(Decimal::from(1200)));
        assert_eq!(snapshot.closing_qty, Some(Decimal::from(300)));
        assert_eq!(snapshot.unit_value, Some(Decimal::new(15, 2)));
        assert_eq!(snapshot.closing_or_zero(), Decimal::from(300));
    }

    #[test]
    fn test_unparseable_numbers_stay_null() {
        let row = ["325.023.001", "DIPIRONA", "", "CP", "", "-", "x"];
        let snapshot = BalanceSnapshot::from_columns(&row, "CAF").unwrap();

        assert_eq!(snapshot.opening_qty, None);
        assert_eq!(snapshot.opening_value, None);
        assert_eq!(snapshot.inflow_qty, None);
        assert_eq!(snapshot.closing_qty, None);
        assert_eq!(snapshot.closing_or_zero(), Decimal::ZERO);
    }

    #[test]
    fn test_invalid_rows_rejected() {
        assert!(BalanceSnapshot::from_columns(&["", "DIPIRONA"], "CAF").is_err());
        assert!(BalanceSnapshot::from_columns(&["325.023.001", ""], "CAF").is_err());
        assert!(BalanceSnapshot::from_columns(&["325023001", "DIPIRONA"], "CAF").is_err());
    }
}
