use serde::{Deserialize, Serialize};
use crate::config::CrmSettings;
use crate::error::{ReportError, Result};

/// Username / password / security-token triple for the CRM login
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrmCredentials {
    /// CRM user name
    pub username: String,
    /// CRM password
    pub password: String,
    /// Security token, appended to the password on login
    pub security_token: String,
}

impl CrmCredentials {
    /// Resolves credentials from the environment, falling back to the config file
    ///
    /// `SALESFORCE_USERNAME`, `SALESFORCE_PASSWORD` and `SALESFORCE_SECURITY_TOKEN`
    /// take precedence over the `[crm]` section.
    pub fn resolve(settings: &CrmSettings) -> Result<Self> {
        let username = get_env_value("SALESFORCE_USERNAME")
            .or_else(|| settings.username.clone())
            .ok_or_else(|| ReportError::Config("CRM username not configured".into()))?;
        let password = get_env_value("SALESFORCE_PASSWORD")
            .or_else(|| settings.password.clone())
            .ok_or_else(|| ReportError::Config("CRM password not configured".into()))?;
        // An empty token is valid for trusted IP ranges
        let security_token = get_env_value("SALESFORCE_SECURITY_TOKEN")
            .or_else(|| settings.security_token.clone())
            .unwrap_or_default();

        Ok(Self {
            username,
            password,
            security_token,
        })
    }

    /// The password field the login call expects
    pub fn login_password(&self) -> String {
        format!("{}{}", self.password, self.security_token)
    }
}

impl std::fmt::Debug for CrmCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrmCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("security_token", &"***")
            .finish()
    }
}

/// Reads an environment variable, treating empty values as unset
pub fn get_env_value(key: &str) -> Option<String> {
    let value = std::env::var(key).ok()?;
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
