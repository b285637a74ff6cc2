mod credentials;

use std::fs;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::{ReportError, Result};

pub use credentials::{get_env_value, CrmCredentials};

/// Default file name of the rendered usage chart
pub const DEFAULT_CHART_FILE: &str = "usage_chart.png";
/// Default file name of the generated PDF report
pub const DEFAULT_REPORT_FILE: &str = "osint_report.pdf";
/// Case identifier printed on every report
pub const DEFAULT_CASE_ID: &str = "RVX-2025-001";

/// Main configuration struct for the application
///
/// Every section has defaults, so an empty or missing config file yields a
/// usable configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Where output files go and what the report header carries
    pub output: OutputConfig,
    /// Text-generation model settings
    pub model: ModelSettings,
    /// CRM connection settings
    pub crm: CrmSettings,
}

/// Configuration for output files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory relative output paths are resolved against
    pub output_dir: PathBuf,
    /// Chart image file
    pub chart_file: PathBuf,
    /// PDF report file
    pub report_file: PathBuf,
    /// Case identifier printed in the report header
    pub case_id: String,
}

/// Settings for the text-generation endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Text-generation endpoint URL
    pub endpoint: String,
    /// Model name, informational for logs
    pub model_name: String,
    /// Bearer token for the endpoint
    pub api_token: Option<String>,
    /// Maximum total length of the generated sequence
    pub max_length: usize,
    /// Request timeout; no timeout when unset
    pub timeout_seconds: Option<u64>,
}

/// Settings for the CRM the case record is pushed to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrmSettings {
    /// Login domain, `test` for sandboxes and `login` for production
    pub domain: String,
    /// REST/SOAP API version
    pub api_version: String,
    /// Overrides the login host derived from `domain`
    pub login_url: Option<String>,
    /// CRM user name
    pub username: Option<String>,
    /// CRM password
    pub password: Option<String>,
    /// CRM security token appended to the password
    pub security_token: Option<String>,
    /// Request timeout; no timeout when unset
    pub timeout_seconds: Option<u64>,
}

impl Config {
    /// Creates a new configuration with the specified output directory
    ///
    /// # Arguments
    /// * `output_dir` - The directory where the chart and report are written
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output: OutputConfig {
                output_dir,
                ..OutputConfig::default()
            },
            ..Self::default()
        }
    }

    /// Loads configuration from the default config file location
    ///
    /// If the config file doesn't exist, returns the default configuration.
    pub fn load() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ReportError::Config("Could not find config directory".into()))?;
        let config_path = config_dir.join("osintreport").join("config.toml");

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::from_file(&config_path)
    }

    /// Loads configuration from an explicit TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| ReportError::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;

        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ReportError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Ensures the output directory exists
    pub async fn validate(&self) -> Result<()> {
        if !tokio::fs::try_exists(&self.output.output_dir).await? {
            tokio::fs::create_dir_all(&self.output.output_dir).await?;
        }
        if self.model.max_length == 0 {
            return Err(ReportError::Config("model.max_length must be positive".into()));
        }
        Ok(())
    }

    /// Chart path resolved against the output directory
    pub fn chart_path(&self) -> PathBuf {
        self.resolve(&self.output.chart_file)
    }

    /// Report path resolved against the output directory
    pub fn report_path(&self) -> PathBuf {
        self.resolve(&self.output.report_file)
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.output.output_dir.join(file)
        }
    }

    /// Model token, preferring the `HF_API_TOKEN` environment variable
    pub fn model_token(&self) -> Option<String> {
        get_env_value("HF_API_TOKEN").or_else(|| self.model.api_token.clone())
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            chart_file: PathBuf::from(DEFAULT_CHART_FILE),
            report_file: PathBuf::from(DEFAULT_REPORT_FILE),
            case_id: DEFAULT_CASE_ID.to_string(),
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api-inference.huggingface.co/models/distilgpt2".to_string(),
            model_name: "distilgpt2".to_string(),
            api_token: None,
            max_length: 500,
            timeout_seconds: None,
        }
    }
}

impl Default for CrmSettings {
    fn default() -> Self {
        Self {
            domain: "test".to_string(),
            api_version: "59.0".to_string(),
            login_url: None,
            username: None,
            password: None,
            security_token: None,
            timeout_seconds: None,
        }
    }
}

impl CrmSettings {
    /// Base URL the SOAP login call goes to
    pub fn login_base(&self) -> String {
        match &self.login_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.salesforce.com", self.domain),
        }
    }
}
