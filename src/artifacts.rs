//! 中間產物輸出

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use mtx_core::Result;

/// 中間產物檔名
pub mod names {
    pub const BALANCE: &str = "balancete_processado";
    pub const MOVEMENTS: &str = "movimentacao_processada";
    pub const SYNTHETIC: &str = "dados_sinteticos";
    pub const CONSOLIDATED: &str = "base_consolidada";
    pub const METRICS: &str = "metricas_calculadas";
    pub const CENTRAL: &str = "metricas_central";
    pub const SUMMARY: &str = "resumo_processamento";
}

/// 將各階段結果寫成 JSON：`{output}/{timestamp}_processamento/intermediarios/`
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    run_dir: PathBuf,
    dir: PathBuf,
}

impl ArtifactWriter {
    pub fn create(output_root: impl AsRef<Path>, started_at: DateTime<Local>) -> Result<Self> {
        let run_dir = output_root
            .as_ref()
            .join(format!("{}_processamento", started_at.format("%Y%m%d_%H%M%S")));
        let dir = run_dir.join("intermediarios");
        std::fs::create_dir_all(&dir)?;

        tracing::info!("輸出目錄: {}", run_dir.display());
        Ok(Self { run_dir, dir })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 寫出 `{name}.json`
    pub fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.dir.join(format!("{}.json", name));
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;

        tracing::debug!("已寫出 {}", path.display());
        Ok(path)
    }
}
