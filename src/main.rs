use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use matriciale::{run_pipeline, PipelineOptions};
use mtx_core::AnalysisConfig;

#[derive(Parser, Debug)]
#[command(name = "matriciale", version, about = "藥局補貨分析批次")]
struct Cli {
    /// 輸入目錄（Movimenta*.txt 與 Balancete*.csv）
    #[arg(long, short, default_value = "dados")]
    input: PathBuf,

    /// 輸出根目錄
    #[arg(long, short, default_value = "resultados")]
    output: PathBuf,

    /// JSON 設定檔（缺少的欄位使用預設值）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 合成歷史亂數種子
    #[arg(long)]
    seed: Option<u64>,

    /// 「本年度」中位數的參考年份
    #[arg(long)]
    reference_year: Option<i32>,

    /// 停用合成歷史
    #[arg(long)]
    no_synthetic: bool,

    /// 輸出 debug 日誌
    #[arg(long)]
    debug: bool,

    /// JSON 格式日誌
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(debug: bool, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug { "debug" } else { "info" };
    let default_directive = format!("matriciale={0},mtx_core={0},mtx_parse={0},mtx_calc={0}", level);
    let filter_directive = std::env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(EnvFilter::new(filter_directive)).json().try_init();
    } else {
        let _ = fmt().with_env_filter(EnvFilter::new(filter_directive)).try_init();
    }
}

fn load_config(cli: &Cli) -> Result<AnalysisConfig> {
    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::from_json_file(path)
            .with_context(|| format!("無法載入設定檔 {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    if let Some(year) = cli.reference_year {
        config = config.with_reference_year(year);
    }
    if cli.no_synthetic {
        config = config.with_synthesize_history(false);
    }

    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    let mut options = PipelineOptions::new(&cli.input, &cli.output).with_config(config);
    if let Some(seed) = cli.seed {
        options = options.with_seed(seed);
    }

    let outcome = run_pipeline(&options)
        .with_context(|| format!("處理失敗（輸入目錄 {}）", cli.input.display()))?;

    let summary = &outcome.summary;
    println!("執行編號: {}", summary.run_id);
    println!("分析品項: {}", summary.items_analyzed);
    println!("需補貨品項: {}", summary.items_with_replenishment);
    println!("補貨總值: {}", summary.total_replenishment_value.round_dp(2));
    println!("警示: {}", summary.alerts.len());
    println!("產物: {}", outcome.run_dir.display());

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug, cli.json_logs);

    if let Err(e) = run(cli) {
        tracing::error!("{:#}", e);
        eprintln!("錯誤: {:#}", e);
        std::process::exit(1);
    }
}
