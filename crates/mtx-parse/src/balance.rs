//! 結存表（balancete）列讀取

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::io::Read;
use std::path::Path;

use mtx_core::balance::BALANCE_COLUMNS;
use mtx_core::{BalanceSnapshot, MtxError, Result};

/// 結存表讀取結果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BalanceBatch {
    pub snapshots: Vec<BalanceSnapshot>,
    /// 有代碼但未通過驗證的列數
    pub rejected: usize,
}

impl BalanceBatch {
    pub fn extend(&mut self, other: BalanceBatch) {
        self.snapshots.extend(other.snapshots);
        self.rejected += other.rejected;
    }
}

/// 讀取結存表檔案
pub fn read_balance_file(path: impl AsRef<Path>, unit: &str, delimiter: char) -> Result<BalanceBatch> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| MtxError::FileParse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    read_balance_rows(file, unit, delimiter).map_err(|e| match e {
        MtxError::FileParse { reason, .. } => MtxError::FileParse {
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })
}

/// 由任意來源讀取結存表列
///
/// 欄位以位元組讀入，非 UTF-8 內容（如 Windows-1252 標題）以替代字元處理。
/// 代碼或描述為空、或代碼欄沒有數字（標題列）的列直接略過；
/// 其餘未通過驗證的列計入 `rejected`。
pub fn read_balance_rows<R: Read>(reader: R, unit: &str, delimiter: char) -> Result<BalanceBatch> {
    let delimiter = u8::try_from(delimiter).map_err(|_| {
        MtxError::Config(format!("分隔字元必須是 ASCII: {:?}", delimiter))
    })?;

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(false)
        .from_reader(reader);

    let mut batch = BalanceBatch::default();

    for (line, result) in rdr.byte_records().enumerate() {
        let record = result.map_err(|e| MtxError::FileParse {
            path: String::new(),
            reason: e.to_string(),
        })?;
        let fields: Vec<Cow<'_, str>> = record.iter().map(String::from_utf8_lossy).collect();
        let columns: Vec<&str> = fields.iter().map(|f| f.as_ref()).collect();

        let code = columns.first().map(|c| c.trim()).unwrap_or("");
        let description = columns.get(1).map(|c| c.trim()).unwrap_or("");
        if code.is_empty() || description.is_empty() || !code.chars().any(|c| c.is_ascii_digit()) {
            continue;
        }

        if columns.len() < BALANCE_COLUMNS {
            tracing::debug!("第 {} 列只有 {} 欄", line + 1, columns.len());
        }

        match BalanceSnapshot::from_columns(&columns, unit) {
            Ok(snapshot) => batch.snapshots.push(snapshot),
            Err(e) => {
                tracing::warn!("捨棄結存列 {}: {}", line + 1, e);
                batch.rejected += 1;
            }
        }
    }

    Ok(batch)
}
