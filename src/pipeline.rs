use crate::chart::{render_usage_chart, ChartArtifact};
use crate::config::Config;
use crate::crm::{CaseReceipt, CaseRecord, CaseSink};
use crate::error::Result;
use crate::extract::{extract_file, ExtractedRecord};
use crate::llm::TextGenerator;
use crate::report::ReportBuilder;
use crate::summarize::{ReportSource, StructuredReport, Summarizer};
use chrono::NaiveDate;
use log::info;
use std::path::{Path, PathBuf};

/// Demo input with two of every fragment kind
pub const SAMPLE_DOCUMENT: &str = "
    IP: 192.168.1.1
    Company: XYZ Tech
    Usage: 50 times in 30 days
    Contact: John Doe
    IP: 10.0.0.1
    Usage: 30 times in 15 days
    Company: XYZ Tech Brazil
    Contact: Jane Smith
    ";

/// Writes [`SAMPLE_DOCUMENT`] to `path`
pub fn write_sample(path: &Path) -> Result<()> {
    std::fs::write(path, SAMPLE_DOCUMENT)?;
    info!("Sample input written to {}", path.display());
    Ok(())
}

/// Everything one run produced
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub record: ExtractedRecord,
    pub report: StructuredReport,
    pub source: ReportSource,
    pub chart: ChartArtifact,
    pub case: CaseReceipt,
    pub report_path: PathBuf,
}

/// Extract, chart, summarize, log the case, write the PDF; strictly in that order
pub struct Pipeline<'a> {
    config: &'a Config,
    generator: &'a dyn TextGenerator,
    sink: &'a dyn CaseSink,
    report_date: Option<NaiveDate>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, generator: &'a dyn TextGenerator, sink: &'a dyn CaseSink) -> Self {
        Self {
            config,
            generator,
            sink,
            report_date: None,
        }
    }

    /// Pins the date printed on the report
    pub fn with_report_date(mut self, date: NaiveDate) -> Self {
        self.report_date = Some(date);
        self
    }

    /// Processes one input document
    ///
    /// The first failing step ends the run; earlier outputs stay on disk.
    pub async fn run(&self, input: &Path) -> Result<PipelineOutcome> {
        self.config.validate().await?;

        let record = extract_file(input)?;
        let chart = render_usage_chart(&record.usage_mentions, &self.config.chart_path())?;

        let summarizer = Summarizer::new(self.generator, self.config.model.max_length);
        let (report, source) = summarizer.summarize_with_source(&record).await?;
        info!("Report sections ready ({:?})", source);

        let case = self.sink.create_case(&CaseRecord::from_report(&report)).await?;
        info!("Case {} created via {}", case.id, self.sink.name());

        let mut builder = ReportBuilder::new(self.config.output.case_id.clone());
        if let Some(date) = self.report_date {
            builder = builder.with_date(date);
        }
        let report_path = builder.build(&report, &chart, &self.config.report_path())?;

        Ok(PipelineOutcome {
            record,
            report,
            source,
            chart,
            case,
            report_path,
        })
    }
}
