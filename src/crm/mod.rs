//! Case records pushed to a CRM.

mod salesforce;

use async_trait::async_trait;
use crate::error::Result;
use crate::summarize::StructuredReport;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use salesforce::SalesforceClient;

/// Subject line of every case
pub const CASE_SUBJECT: &str = "OSINT Investigation Report";
/// Status of a freshly opened case
pub const CASE_STATUS: &str = "New";
/// Origin tag of every case
pub const CASE_ORIGIN: &str = "OSINT Investigation";
/// Priority of every case
pub const CASE_PRIORITY: &str = "Medium";

/// A `Case` object as the CRM REST API expects it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CaseRecord {
    pub subject: String,
    pub description: String,
    pub status: String,
    pub origin: String,
    pub priority: String,
}

impl CaseRecord {
    /// Builds the case for a finished report
    pub fn from_report(report: &StructuredReport) -> Self {
        Self {
            subject: CASE_SUBJECT.to_string(),
            description: format!(
                "Summary: {}\nCompany: {}\nUsage: {}\nContacts: {}",
                report.summary, report.company_info, report.usage_data, report.contacts
            ),
            status: CASE_STATUS.to_string(),
            origin: CASE_ORIGIN.to_string(),
            priority: CASE_PRIORITY.to_string(),
        }
    }
}

/// What the CRM handed back for a created case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseReceipt {
    /// Record id assigned by the CRM, or the file path for dry runs
    pub id: String,
}

/// Destination for case records
#[async_trait]
pub trait CaseSink: Send + Sync {
    /// Creates one case; errors are not retried
    async fn create_case(&self, case: &CaseRecord) -> Result<CaseReceipt>;
    /// Name used in logs
    fn name(&self) -> &'static str;
}

/// Writes the case as JSON instead of calling a CRM
pub struct DryRunSink {
    path: PathBuf,
}

impl DryRunSink {
    /// Writes to `path`, replacing any existing file
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl CaseSink for DryRunSink {
    async fn create_case(&self, case: &CaseRecord) -> Result<CaseReceipt> {
        let json = serde_json::to_string_pretty(case)?;
        tokio::fs::write(&self.path, json).await?;
        info!("Case record written to {}", self.path.display());
        Ok(CaseReceipt {
            id: self.path.display().to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }
}
