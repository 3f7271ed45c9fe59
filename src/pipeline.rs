//! 批次處理流程
//!
//! 探索 → 結存表 → 報表解析（平行）→ 正規化 → 合成歷史 → 分析 → 中央彙總 → 摘要。
//! 每個階段完成即寫出中間產物；單一檔案失敗只略過該檔。

use chrono::Local;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use mtx_calc::{
    consolidate_central, AnalysisResult, HistorySynthesizer, MatricialeAnalyzer, RunCounts,
    RunSummary, SyntheticHistory,
};
use mtx_core::{AnalysisConfig, ItemMetrics, MovementRecord, MtxError, Result};
use mtx_parse::{
    read_balance_file, unit_from_filename, BalanceBatch, HeuristicReportParser, NormalizedBatch,
    Normalizer, ParsedReport, ReportParser,
};

use crate::artifacts::{names, ArtifactWriter};
use crate::discovery::discover_inputs;

/// 執行選項
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub config: AnalysisConfig,
    /// 合成歷史的亂數種子（未設定時使用系統亂數）
    pub seed: Option<u64>,
}

impl PipelineOptions {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            config: AnalysisConfig::default(),
            seed: None,
        }
    }

    /// 建構器模式：設置分析配置
    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// 建構器模式：設置亂數種子
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// 執行結果
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub run_dir: PathBuf,
    pub analysis: AnalysisResult,
    pub central: Vec<ItemMetrics>,
    pub summary: RunSummary,
}

/// 執行完整批次
pub fn run_pipeline(options: &PipelineOptions) -> Result<PipelineOutcome> {
    let config = &options.config;
    config.validate()?;

    let inputs = discover_inputs(&options.input_dir)?;
    let artifacts = ArtifactWriter::create(&options.output_dir, Local::now())?;
    let mut counts = RunCounts {
        movement_files: inputs.movement.len(),
        balance_files: inputs.balance.len(),
        ..Default::default()
    };

    // Step 1: 結存表
    tracing::info!("Step 1: 讀取結存表");
    let (balance, failed) = load_balances(&inputs.balance, config);
    counts.failed_files += failed;
    counts.balance_rows = balance.snapshots.len();
    artifacts.write(names::BALANCE, &balance.snapshots)?;

    // Step 2: 報表解析與正規化
    tracing::info!("Step 2: 解析移動報表");
    let parser = HeuristicReportParser::new()?;
    let parsed = parse_reports(&parser, &inputs.movement, config);

    let mut normalizer = Normalizer::new();
    let mut batch = NormalizedBatch::default();
    for (path, unit, report) in parsed {
        match report {
            Ok(report) => {
                counts.skipped_lines += report.skipped_lines;
                batch.extend(normalizer.normalize(&report, &unit));
            }
            Err(e) => {
                tracing::error!("略過移動報表 {}: {}", path.display(), e);
                counts.failed_files += 1;
            }
        }
    }
    counts.real_movements = batch.records.len();
    counts.rejected_records = batch.rejected + balance.rejected;
    counts.units = normalizer.registry().len();
    artifacts.write(names::MOVEMENTS, &batch.records)?;

    // Step 3: 合成歷史
    let synthetic = if config.synthesize_history {
        tracing::info!("Step 3: 合成歷史資料");
        Some(synthesize(&batch.records, config, options.seed))
    } else {
        tracing::info!("Step 3: 已停用合成歷史");
        None
    };
    if let Some(history) = &synthetic {
        counts.synthetic_movements = history.len();
        artifacts.write(names::SYNTHETIC, history)?;
    }

    // Step 4: 合併
    let mut records: Vec<MovementRecord> = synthetic.map(|h| h.records).unwrap_or_default();
    records.extend(batch.records);
    artifacts.write(names::CONSOLIDATED, &records)?;

    // Step 5: 分析
    tracing::info!("Step 5: 補貨分析");
    let analyzer = MatricialeAnalyzer::new(config.clone());
    let analysis = analyzer.analyze(&records, &balance.snapshots);
    artifacts.write(names::METRICS, &analysis)?;

    // Step 6: 中央彙總
    tracing::info!("Step 6: 中央單位彙總");
    let central = consolidate_central(
        &analysis.items,
        &balance.snapshots,
        config,
        analyzer.reference_year(),
    );
    artifacts.write(names::CENTRAL, &central)?;

    // Step 7: 摘要
    let summary = RunSummary::build(&analysis.items, counts, config);
    artifacts.write(names::SUMMARY, &summary)?;

    tracing::info!(
        "處理完成：{} 個品項，{} 個需補貨，產物位於 {}",
        summary.items_analyzed,
        summary.items_with_replenishment,
        artifacts.run_dir().display()
    );

    Ok(PipelineOutcome {
        run_dir: artifacts.run_dir().to_path_buf(),
        analysis,
        central,
        summary,
    })
}

/// 逐檔讀取結存表，失敗的檔案記錄後略過；回傳 (結果, 失敗檔數)
fn load_balances(paths: &[PathBuf], config: &AnalysisConfig) -> (BalanceBatch, usize) {
    let mut batch = BalanceBatch::default();
    let mut failed = 0;

    for path in paths {
        let unit = unit_from_filename(path, &config.unit_tokens);
        match read_balance_file(path, &unit, config.balance_delimiter) {
            Ok(b) => {
                tracing::info!(
                    "結存表 {} ({}): {} 列",
                    path.display(),
                    unit,
                    b.snapshots.len()
                );
                batch.extend(b);
            }
            Err(e) => {
                tracing::error!("略過結存表 {}: {}", path.display(), e);
                failed += 1;
            }
        }
    }

    (batch, failed)
}

/// 平行解析所有報表，保留檔案順序
fn parse_reports<P: ReportParser>(
    parser: &P,
    paths: &[PathBuf],
    config: &AnalysisConfig,
) -> Vec<(PathBuf, String, Result<ParsedReport>)> {
    paths
        .par_iter()
        .map(|path| {
            let unit = unit_from_filename(path, &config.unit_tokens);
            let report = read_report_text(path).map(|text| {
                let report = parser.parse_text(&text);
                tracing::info!(
                    "報表 {} ({}): {} 頁，{} 筆明細",
                    path.display(),
                    unit,
                    report.pages.len(),
                    report.movement_count()
                );
                report
            });
            (path.clone(), unit, report)
        })
        .collect()
}

/// 讀取報表文字；非 UTF-8 位元組以替代字元處理
fn read_report_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| MtxError::FileParse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn synthesize(
    real: &[MovementRecord],
    config: &AnalysisConfig,
    seed: Option<u64>,
) -> SyntheticHistory {
    let history = match seed {
        Some(seed) => HistorySynthesizer::seeded(seed),
        None => HistorySynthesizer::from_entropy(),
    }
    .with_weeks(config.synthetic_weeks)
    .synthesize(real);

    let validation = history.validate();
    if !validation.is_valid() {
        tracing::warn!("合成歷史未通過檢查: {:?}", validation);
    }

    history
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreadable_report_is_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_report_text(&dir.path().join("Movimentacao_CAF.txt")).unwrap_err();
        assert!(matches!(err, MtxError::FileParse { .. }));
    }

    #[test]
    fn test_failed_balance_file_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("Balancete_CAF.csv");
        std::fs::write(
            &good,
            "325.023.001;AAS 100MG;;CP;0;0;0;0;0;0;100;0,10;10,00\n",
        )
        .unwrap();
        let missing = dir.path().join("Balancete_ESF3.csv");

        let (batch, failed) = load_balances(&[missing, good], &AnalysisConfig::default());

        assert_eq!(failed, 1);
        assert_eq!(batch.snapshots.len(), 1);
        assert_eq!(batch.snapshots[0].unit, "CAF");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let options = PipelineOptions::new(dir.path(), dir.path())
            .with_config(AnalysisConfig::new().with_central_unit(""));

        let err = run_pipeline(&options).unwrap_err();
        assert!(matches!(err, MtxError::Config(_)));
    }
}
