use osintreport::config::{Config, CrmCredentials, CrmSettings};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub mod test_helpers {
    use super::*;

    pub const SCENARIO: &str = "Company: XYZ Tech\nUsage: 50 times in 30 days\nContact: John Doe";

    pub fn write_input(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).expect("failed to write input");
        path
    }

    pub fn create_test_config(output_dir: &Path) -> Config {
        Config::new(output_dir.to_path_buf())
    }

    pub fn crm_settings_for(url: &str) -> CrmSettings {
        CrmSettings {
            login_url: Some(url.to_string()),
            ..CrmSettings::default()
        }
    }

    pub fn test_credentials() -> CrmCredentials {
        CrmCredentials {
            username: "analyst@example.com".to_string(),
            password: "secret".to_string(),
            security_token: "TOKEN".to_string(),
        }
    }

    pub fn salesforce_login_body(server_url: &str) -> String {
        format!(
            "<soapenv:Envelope><soapenv:Body><loginResponse><result>\
             <serverUrl>{}/services/Soap/u/59.0/00Dxx0000001gEF</serverUrl>\
             <sessionId>00Dxx!SESSION</sessionId>\
             </result></loginResponse></soapenv:Body></soapenv:Envelope>",
            server_url
        )
    }

    pub fn setup_test_logger() {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    }
}
