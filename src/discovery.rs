//! 輸入檔案探索

use serde::Serialize;
use std::path::{Path, PathBuf};

use mtx_core::{MtxError, Result};

/// 移動報表檔名標記
pub const MOVEMENT_MARKER: &str = "Movimenta";
/// 結存表檔名標記
pub const BALANCE_MARKER: &str = "Balancete";

/// 探索到的輸入檔案（依檔名排序）
#[derive(Debug, Clone, Default, Serialize)]
pub struct InputFiles {
    pub movement: Vec<PathBuf>,
    pub balance: Vec<PathBuf>,
}

/// 掃描輸入目錄
///
/// 任一類別完全沒有檔案時回傳 `MissingInput`，整批中止。
pub fn discover_inputs(dir: impl AsRef<Path>) -> Result<InputFiles> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(MtxError::MissingInput(format!(
            "輸入目錄不存在: {}",
            dir.display()
        )));
    }

    let mut files = InputFiles::default();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if matches_category(&path, MOVEMENT_MARKER, "txt") {
            files.movement.push(path);
        } else if matches_category(&path, BALANCE_MARKER, "csv") {
            files.balance.push(path);
        }
    }

    files.movement.sort();
    files.balance.sort();

    if files.movement.is_empty() {
        return Err(MtxError::MissingInput(format!(
            "找不到移動報表（*{}*.txt）於 {}",
            MOVEMENT_MARKER,
            dir.display()
        )));
    }
    if files.balance.is_empty() {
        return Err(MtxError::MissingInput(format!(
            "找不到結存表（*{}*.csv）於 {}",
            BALANCE_MARKER,
            dir.display()
        )));
    }

    tracing::info!(
        "探索到 {} 個移動報表、{} 個結存表",
        files.movement.len(),
        files.balance.len()
    );

    Ok(files)
}

fn matches_category(path: &Path, marker: &str, extension: &str) -> bool {
    let name_matches = path
        .file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.contains(marker));
    let ext_matches = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case(extension));
    name_matches && ext_matches
}
