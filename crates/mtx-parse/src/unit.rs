//! 由檔名判斷庫存單位

use std::path::Path;

use mtx_core::{UnitToken, UNKNOWN_UNIT};

/// 取第一個出現在檔名中的 token（不分大小寫），找不到時回傳 `"unknown"`
pub fn unit_from_filename(path: impl AsRef<Path>, tokens: &[UnitToken]) -> String {
    let filename = path
        .as_ref()
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    tokens
        .iter()
        .find(|t| filename.contains(&t.token.to_lowercase()))
        .map(|t| t.name.clone())
        .unwrap_or_else(|| UNKNOWN_UNIT.to_string())
}
