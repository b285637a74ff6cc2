#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(clippy::all)]

//! osintreport - OSINT notes to CRM case and PDF report
//!
//! A run reads a loosely structured text file, pulls out IP addresses,
//! company and contact mentions and usage statistics, asks a text-generation
//! model to organize them, renders a usage chart, opens a case in the CRM and
//! writes a PDF report.
//!
//! ## Usage
//! ```rust,ignore
//! use osintreport::{Config, Pipeline, DryRunSink, OfflineGenerator};
//! use std::path::Path;
//!
//! async fn example() -> osintreport::Result<()> {
//!     let config = Config::default();
//!     let sink = DryRunSink::new("case_record.json");
//!     let outcome = Pipeline::new(&config, &OfflineGenerator, &sink)
//!         .run(Path::new("sample.txt"))
//!         .await?;
//!     println!("{}", outcome.report_path.display());
//!     Ok(())
//! }
//! ```

/// Usage chart rendering
pub mod chart;
/// Configuration module for the application
pub mod config;
/// CRM case logging
pub mod crm;
/// Error handling types and utilities
pub mod error;
/// Pattern extraction of OSINT fragments
pub mod extract;
/// Text-generation clients
pub mod llm;
/// Logging configuration and utilities
pub mod logging;
/// End-to-end run
pub mod pipeline;
/// Prompt templates
pub mod prompts;
/// PDF report layout
pub mod report;
/// Model-assisted summarization
pub mod summarize;

// Re-export common types
pub use config::Config;
pub use error::{ReportError, Result};
pub use extract::{extract, extract_file, ExtractedRecord};
pub use chart::{render_usage_chart, ChartArtifact};
pub use summarize::{fallback_report, StructuredReport, Summarizer};
pub use llm::{HttpTextGenerator, OfflineGenerator, TextGenerator};
pub use crm::{CaseRecord, CaseSink, DryRunSink, SalesforceClient};
pub use report::ReportBuilder;
pub use pipeline::{Pipeline, PipelineOutcome};
