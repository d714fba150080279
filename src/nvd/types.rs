use serde::Deserialize;

use crate::capabilities::RelatedRecord;

/// Top-level CVE search response. Only the fields the client reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CveSearchResponse {
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub vulnerabilities: Vec<VulnerabilityItem>,
}

/// Wrapper around a single CVE.
#[derive(Debug, Clone, Deserialize)]
pub struct VulnerabilityItem {
    pub cve: CveRecord,
}

/// A CVE entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CveRecord {
    pub id: String,
    #[serde(default)]
    pub descriptions: Vec<LangString>,
}

/// Localized description text.
#[derive(Debug, Clone, Deserialize)]
pub struct LangString {
    pub lang: String,
    pub value: String,
}

impl CveRecord {
    /// The English description, or empty if none is published.
    pub fn english_description(&self) -> &str {
        self.descriptions
            .iter()
            .find(|d| d.lang == "en")
            .map(|d| d.value.as_str())
            .unwrap_or("")
    }
}

impl From<&CveRecord> for RelatedRecord {
    fn from(cve: &CveRecord) -> Self {
        RelatedRecord {
            id: cve.id.clone(),
            description: cve.english_description().to_string(),
        }
    }
}

impl CveSearchResponse {
    /// Flatten into related records, at most `max`.
    pub fn into_records(self, max: usize) -> Vec<RelatedRecord> {
        self.vulnerabilities
            .iter()
            .take(max)
            .map(|v| RelatedRecord::from(&v.cve))
            .collect()
    }
}
