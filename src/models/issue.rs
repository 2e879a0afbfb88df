use serde::{Deserialize, Serialize};
use crate::models::ids::VersionId;
use crate::utils::formatting::escape_html;
use crate::utils::paths::{directory_part, short_file_name};

const ATTRIBUTE_VALUE_NONE: &str = "<none>";

/// One materialized issue of the issue browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRow {
    pub version_id: VersionId,
    pub issue_id: u64,
    pub instance_id: String,
    pub file_path: String,
    pub line_number: u32,
    pub category: String,
    pub severity: String,
    pub confidence: String,
    pub engine_type: String,
}

impl IssueRow {
    /// `<short file>:<line>`, HTML-escaped.
    pub fn display_name(&self) -> String {
        let short = short_file_name(&self.file_path);
        let short = if short.trim().is_empty() { ATTRIBUTE_VALUE_NONE } else { short };
        escape_html(&format!("{}:{}", short, self.line_number))
    }

    pub fn display_path(&self) -> String {
        escape_html(&directory_part(&self.file_path))
    }

    pub fn display_category(&self) -> String {
        escape_html(&self.category)
    }

    /// Deep link into the findings server's audit page for this issue.
    pub fn url(&self, server_url: &str, app_name: &str, app_version: &str) -> String {
        format!(
            "{}/html/ssc/version/{}/fix/{}/?projectName={}&projectVersionName={}&issue={}&engineType={}",
            server_url.trim_end_matches('/'),
            self.version_id,
            self.issue_id,
            encode_component(app_name),
            encode_component(app_version),
            self.instance_id,
            encode_component(&self.engine_type),
        )
    }
}

fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'*' => out.push(b as char),
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

/// Row plus the derived presentation fields, as served to viewers.
#[derive(Debug, Clone, Serialize)]
pub struct IssueRowView {
    #[serde(flatten)]
    pub row: IssueRow,
    pub display_name: String,
    pub display_path: String,
    pub url: String,
}

impl IssueRowView {
    pub fn new(row: &IssueRow, server_url: &str, app_name: &str, app_version: &str) -> Self {
        Self {
            display_name: row.display_name(),
            display_path: row.display_path(),
            url: row.url(server_url, app_name, app_version),
            row: row.clone(),
        }
    }
}
