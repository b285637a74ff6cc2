//! Model-assisted summarization with a deterministic baseline.
//!
//! Small general-purpose models rarely answer a zero-shot instruction with a
//! well-formed fenced JSON block, so [`fallback_report`] is the normal result
//! and a parsed model answer is the exception.

use crate::error::Result;
use crate::extract::ExtractedRecord;
use crate::llm::TextGenerator;
use crate::prompts;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Summary sentence used whenever the model output is unusable
pub const PLACEHOLDER_SUMMARY: &str = "Generated summary of investigation findings.";

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// The four report sections the case and PDF are built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredReport {
    pub summary: String,
    pub company_info: String,
    pub usage_data: String,
    pub contacts: String,
}

/// Where a [`StructuredReport`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSource {
    /// Parsed from the model's fenced JSON block
    Model,
    /// Assembled from the extracted record
    Fallback,
}

/// Asks a [`TextGenerator`] to organize an [`ExtractedRecord`]
pub struct Summarizer<'a> {
    generator: &'a dyn TextGenerator,
    max_length: usize,
}

impl<'a> Summarizer<'a> {
    /// Creates a summarizer that bounds generation at `max_length`
    pub fn new(generator: &'a dyn TextGenerator, max_length: usize) -> Self {
        Self { generator, max_length }
    }

    /// Builds the report, falling back when the model output can't be parsed
    ///
    /// Only generation errors (network, service) are returned as errors.
    pub async fn summarize(&self, record: &ExtractedRecord) -> Result<StructuredReport> {
        Ok(self.summarize_with_source(record).await?.0)
    }

    /// Like [`Summarizer::summarize`], also telling which branch produced the report
    pub async fn summarize_with_source(
        &self,
        record: &ExtractedRecord,
    ) -> Result<(StructuredReport, ReportSource)> {
        let prompt = build_prompt(record)?;
        let output = self.generator.generate(&prompt, self.max_length).await?;

        match parse_model_output(&output) {
            Some(report) => {
                info!("Using structured output from {}", self.generator.name());
                Ok((report, ReportSource::Model))
            }
            None => {
                debug!("{} returned no usable JSON block, using fallback", self.generator.name());
                Ok((fallback_report(record), ReportSource::Fallback))
            }
        }
    }
}

/// Fills the instruction prompt with the pretty-printed record
pub fn build_prompt(record: &ExtractedRecord) -> Result<String> {
    let data = serde_json::to_string_pretty(record)?;
    Ok(prompts::render(prompts::OSINT_ORGANIZE, &data))
}

/// Reads the first fenced JSON block of a model answer
///
/// Any problem (no fence, bad JSON, missing or non-string fields) yields `None`.
pub fn parse_model_output(output: &str) -> Option<StructuredReport> {
    let (_, after_marker) = output.split_once(JSON_FENCE)?;
    let body = after_marker
        .split_once(FENCE)
        .map_or(after_marker, |(body, _)| body);
    serde_json::from_str(body.trim()).ok()
}

/// Deterministic report built only from the extracted fields
pub fn fallback_report(record: &ExtractedRecord) -> StructuredReport {
    StructuredReport {
        summary: PLACEHOLDER_SUMMARY.to_string(),
        company_info: record.company_mentions.join(", "),
        usage_data: record.usage_mentions.join(", "),
        contacts: record.contact_mentions.join(", "),
    }
}
