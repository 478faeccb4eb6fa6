use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::report::{PolicyVerdict, Report};
use crate::ScanReport;

#[derive(Serialize)]
struct JsonReport<'a> {
    tool: &'static str,
    version: &'static str,
    generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    principal: Option<&'a str>,
    report: &'a Report,
    verdict: &'a PolicyVerdict,
}

/// Render a scan report as JSON.
pub fn render(scan: &ScanReport) -> Result<String> {
    let report = JsonReport {
        tool: "flowguard",
        version: env!("CARGO_PKG_VERSION"),
        generated_at: Utc::now(),
        principal: scan.principal.as_deref(),
        report: &scan.report,
        verdict: &scan.verdict,
    };
    let json = serde_json::to_string_pretty(&report)?;
    Ok(json)
}
