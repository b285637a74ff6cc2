use crate::config::{Config, CrmCredentials, CrmSettings};
use crate::error::{ReportError, Result};
use super::{CaseReceipt, CaseRecord, CaseSink};
use async_trait::async_trait;
use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

lazy_static! {
    static ref SESSION_ID: Regex = Regex::new(r"<sessionId>([^<]+)</sessionId>").expect("valid pattern");
    static ref SERVER_URL: Regex = Regex::new(r"<serverUrl>([^<]+)</serverUrl>").expect("valid pattern");
    static ref FAULT: Regex = Regex::new(r"<faultstring>([^<]*)</faultstring>").expect("valid pattern");
}

/// Authenticated API session
#[derive(Debug, Clone)]
struct Session {
    id: String,
    instance_url: String,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    id: String,
    success: bool,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiError {
    message: String,
    error_code: String,
}

/// Creates cases through the Salesforce REST API
///
/// Each `create_case` logs in with the SOAP `login` call and then posts one
/// `Case` sObject. Nothing is retried.
pub struct SalesforceClient {
    client: Client,
    settings: CrmSettings,
    credentials: CrmCredentials,
}

impl SalesforceClient {
    /// Builds a client from the `[crm]` section and the environment
    pub fn new(config: &Config) -> Result<Self> {
        let credentials = CrmCredentials::resolve(&config.crm)?;
        Self::with_credentials(config.crm.clone(), credentials)
    }

    /// Builds a client with explicit credentials
    pub fn with_credentials(settings: CrmSettings, credentials: CrmCredentials) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = settings.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ReportError::Crm(e.to_string()))?;

        Ok(Self {
            client,
            settings,
            credentials,
        })
    }

    async fn login(&self) -> Result<Session> {
        let url = format!(
            "{}/services/Soap/u/{}",
            self.settings.login_base(),
            self.settings.api_version
        );
        debug!("Logging in to {} as {}", url, self.credentials.username);

        let response = self.client.post(&url)
            .header("Content-Type", "text/xml; charset=UTF-8")
            .header("SOAPAction", "login")
            .body(login_envelope(&self.credentials))
            .send()
            .await
            .map_err(|e| ReportError::Network(e.to_string()))?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let fault = FAULT
                .captures(&body)
                .and_then(|c| c.get(1))
                .map_or_else(|| format!("HTTP {}", status), |m| m.as_str().to_string());
            return Err(ReportError::Crm(format!("Login failed: {}", fault)));
        }

        let session_id = capture(&SESSION_ID, &body)
            .ok_or_else(|| ReportError::Crm("Login response has no sessionId".into()))?;
        let server_url = capture(&SERVER_URL, &body)
            .ok_or_else(|| ReportError::Crm("Login response has no serverUrl".into()))?;
        let instance_url = Url::parse(&server_url)?.origin().ascii_serialization();

        Ok(Session {
            id: session_id,
            instance_url,
        })
    }
}

#[async_trait]
impl CaseSink for SalesforceClient {
    async fn create_case(&self, case: &CaseRecord) -> Result<CaseReceipt> {
        let session = self.login().await?;
        let url = format!(
            "{}/services/data/v{}/sobjects/Case/",
            session.instance_url, self.settings.api_version
        );

        let response = self.client.post(&url)
            .bearer_auth(&session.id)
            .json(case)
            .send()
            .await
            .map_err(|e| ReportError::Network(e.to_string()))?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let detail = serde_json::from_str::<Vec<ApiError>>(&body)
                .ok()
                .and_then(|errors| errors.into_iter().next())
                .map_or_else(
                    || format!("HTTP {}", status),
                    |e| format!("{}: {}", e.error_code, e.message),
                );
            return Err(ReportError::Crm(format!("Case creation failed: {}", detail)));
        }

        let created: CreateResponse = serde_json::from_str(&body)?;
        if !created.success {
            return Err(ReportError::Crm(format!(
                "Case creation rejected: {}",
                serde_json::Value::Array(created.errors)
            )));
        }

        info!("Case logged to Salesforce successfully.");
        Ok(CaseReceipt { id: created.id })
    }

    fn name(&self) -> &'static str {
        "salesforce"
    }
}

fn capture(pattern: &Regex, body: &str) -> Option<String> {
    pattern
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn login_envelope(credentials: &CrmCredentials) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8" ?>
<env:Envelope xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:env="http://schemas.xmlsoap.org/soap/envelope/">
  <env:Body>
    <n1:login xmlns:n1="urn:partner.soap.sforce.com">
      <n1:username>{}</n1:username>
      <n1:password>{}</n1:password>
    </n1:login>
  </env:Body>
</env:Envelope>"#,
        xml_escape(&credentials.username),
        xml_escape(&credentials.login_password())
    )
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
