//! # Matriciale
//!
//! 藥局補貨分析批次：讀取移動報表與結存表，計算每個 (品項, 單位) 的建議補貨量。
//!
//! ## 範例
//!
//! ```no_run
//! use matriciale::{run_pipeline, PipelineOptions};
//! use mtx_core::AnalysisConfig;
//!
//! let options = PipelineOptions::new("dados", "saida")
//!     .with_config(AnalysisConfig::new().with_reference_year(2025))
//!     .with_seed(42);
//! let outcome = run_pipeline(&options)?;
//! println!("{} 個品項需補貨", outcome.summary.items_with_replenishment);
//! # Ok::<(), mtx_core::MtxError>(())
//! ```

pub mod artifacts;
pub mod discovery;
pub mod pipeline;

pub use artifacts::ArtifactWriter;
pub use discovery::{discover_inputs, InputFiles};
pub use pipeline::{run_pipeline, PipelineOptions, PipelineOutcome};

pub use mtx_calc;
pub use mtx_core;
pub use mtx_parse;
