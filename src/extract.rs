//! Pattern-based extraction of OSINT fragments.
//!
//! Each field is produced by one independent scan over the raw text. The
//! scans never look at each other's results, so an IP address is not tied to
//! the company mentioned next to it.

use crate::error::Result;
use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

lazy_static! {
    static ref IP_PATTERN: Regex =
        Regex::new(r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b").expect("valid IP pattern");
    static ref COMPANY_PATTERN: Regex =
        Regex::new(r"Company:?[ \t]*([A-Za-z][A-Za-z ]*)").expect("valid company pattern");
    static ref CONTACT_PATTERN: Regex =
        Regex::new(r"Contact:?[ \t]*([A-Za-z][A-Za-z ]*)").expect("valid contact pattern");
    static ref USAGE_PATTERN: Regex =
        Regex::new(r"Usage:?\s*(\d+\s*times.*)").expect("valid usage pattern");
}

/// Fields pulled out of an OSINT document, in order of appearance
///
/// The JSON keys match the ones the summarization prompt embeds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// Dotted-quad tokens, octets unvalidated
    pub ip_addresses: Vec<String>,
    /// Text after each `Company` label
    #[serde(rename = "company")]
    pub company_mentions: Vec<String>,
    /// Text after each `Contact` label
    #[serde(rename = "contacts")]
    pub contact_mentions: Vec<String>,
    /// Text after each `Usage` label, from the count through the end of the line
    #[serde(rename = "usage")]
    pub usage_mentions: Vec<String>,
}

impl ExtractedRecord {
    /// True when no scan matched anything
    pub fn is_empty(&self) -> bool {
        self.ip_addresses.is_empty()
            && self.company_mentions.is_empty()
            && self.contact_mentions.is_empty()
            && self.usage_mentions.is_empty()
    }
}

/// Reads a document from disk and extracts its fields
///
/// A missing file surfaces as `ReportError::IO`.
pub fn extract_file(path: &Path) -> Result<ExtractedRecord> {
    let raw = std::fs::read_to_string(path)?;
    info!("Read {} bytes from {}", raw.len(), path.display());
    Ok(extract(&raw))
}

/// Runs all four scans over raw text
pub fn extract(raw: &str) -> ExtractedRecord {
    let record = ExtractedRecord {
        ip_addresses: scan_ip_addresses(raw),
        company_mentions: scan_companies(raw),
        contact_mentions: scan_contacts(raw),
        usage_mentions: scan_usage(raw),
    };
    debug!(
        "Extracted {} IPs, {} companies, {} contacts, {} usage entries",
        record.ip_addresses.len(),
        record.company_mentions.len(),
        record.contact_mentions.len(),
        record.usage_mentions.len()
    );
    record
}

/// Dotted-quad numeric tokens
pub fn scan_ip_addresses(raw: &str) -> Vec<String> {
    IP_PATTERN
        .find_iter(raw)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Letters and spaces following each `Company` label
pub fn scan_companies(raw: &str) -> Vec<String> {
    labelled_captures(&COMPANY_PATTERN, raw)
}

/// Letters and spaces following each `Contact` label
pub fn scan_contacts(raw: &str) -> Vec<String> {
    labelled_captures(&CONTACT_PATTERN, raw)
}

/// `{count} times` and the rest of the line following each `Usage` label
pub fn scan_usage(raw: &str) -> Vec<String> {
    labelled_captures(&USAGE_PATTERN, raw)
}

fn labelled_captures(pattern: &Regex, raw: &str) -> Vec<String> {
    pattern
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    const SAMPLE: &str = "
    IP: 192.168.1.1
    Company: XYZ Tech
    Usage: 50 times in 30 days
    Contact: John Doe
    IP: 10.0.0.1
    Usage: 30 times in 15 days
    Company: XYZ Tech Brazil
    Contact: Jane Smith
    ";

    #[test]
    fn test_scenario_record() {
        let record = extract("Company: XYZ Tech\nUsage: 50 times in 30 days\nContact: John Doe");
        assert_eq!(
            record,
            ExtractedRecord {
                ip_addresses: vec![],
                company_mentions: vec!["XYZ Tech".into()],
                contact_mentions: vec!["John Doe".into()],
                usage_mentions: vec!["50 times in 30 days".into()],
            }
        );
    }

    #[test]
    fn test_sample_document_keeps_order() {
        let record = extract(SAMPLE);
        assert_eq!(record.ip_addresses, vec!["192.168.1.1", "10.0.0.1"]);
        assert_eq!(record.company_mentions, vec!["XYZ Tech", "XYZ Tech Brazil"]);
        assert_eq!(record.contact_mentions, vec!["John Doe", "Jane Smith"]);
        assert_eq!(
            record.usage_mentions,
            vec!["50 times in 30 days", "30 times in 15 days"]
        );
    }

    #[test_case("999.999.999.999", &["999.999.999.999"] ; "octets are not validated")]
    #[test_case("host 8.8.8.8, 1.1.1.1", &["8.8.8.8", "1.1.1.1"] ; "several per line")]
    #[test_case("1.2.3", &[] ; "three groups are not an address")]
    #[test_case("v1234.1.1.1", &[] ; "no match inside a word")]
    fn test_ip_scan(input: &str, expected: &[&str]) {
        assert_eq!(scan_ip_addresses(input), expected);
    }

    #[test_case("Company: ACME Corp\n", &["ACME Corp"] ; "newline terminates")]
    #[test_case("Company ACME", &["ACME"] ; "colon is optional")]
    #[test_case("Company: Acme2Go", &["Acme"] ; "digits end the capture")]
    #[test_case("Company: O'Brien Ltd", &["O"] ; "punctuation ends the capture")]
    #[test_case("Company:   Initech   \n", &["Initech"] ; "trailing blanks dropped")]
    #[test_case("Company: 42", &[] ; "no letters no match")]
    #[test_case("Company: Big\tCorp", &["Big"] ; "tab ends the capture")]
    fn test_company_scan(input: &str, expected: &[&str]) {
        assert_eq!(scan_companies(input), expected);
    }

    #[test]
    fn test_contact_scan_matches_company_shape() {
        assert_eq!(scan_contacts("Contact: Jane Smith\nContact Bob"), vec!["Jane Smith", "Bob"]);
    }

    #[test_case("Usage: 50 times in 30 days\n", &["50 times in 30 days"] ; "rest of line")]
    #[test_case("Usage 7 times a week", &["7 times a week"] ; "colon optional")]
    #[test_case("Usage: 12times daily\r\n", &["12times daily"] ; "carriage return dropped")]
    #[test_case("Usage: heavy", &[] ; "needs a leading count")]
    #[test_case("Usage: 7 logins, 2 failures", &[] ; "count must be followed by times")]
    #[test_case("Usage: 50 times\nUsage: 3 days", &["50 times"] ; "one line per entry")]
    fn test_usage_scan(input: &str, expected: &[&str]) {
        assert_eq!(scan_usage(input), expected);
    }

    #[test]
    fn test_empty_document() {
        let record = extract("nothing to see here");
        assert!(record.is_empty());
    }

    #[test]
    fn test_json_keys() {
        let record = extract("Company: XYZ Tech");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["company"][0], "XYZ Tech");
        assert!(value["ip_addresses"].as_array().unwrap().is_empty());
        assert!(value.get("contacts").is_some());
        assert!(value.get("usage").is_some());
    }

    #[test]
    fn test_missing_file() {
        let err = extract_file(Path::new("/definitely/not/here/sample.txt")).unwrap_err();
        assert!(matches!(err, crate::error::ReportError::IO(ref e) if e.kind() == std::io::ErrorKind::NotFound));
    }
}
