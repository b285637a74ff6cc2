pub const OSINT_ORGANIZE: &str = r#"
You are an OSINT assistant. Organize the following disordered data into a structured format for an investigation report. Categorize into Company Information, Usage Data, and Key Contacts. Provide a short summary (2-3 sentences). Data: {0}

Output format:
{
  "summary": "Summary text",
  "company_info": "Details about the company",
  "usage_data": "Details about usage",
  "contacts": "Key contacts identified"
}
"#;

/// Fills a prompt template's `{0}` slot
pub fn render(template: &str, value: &str) -> String {
    template.replace("{0}", value)
}
