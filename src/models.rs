use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Application status as the backend stores it. Serialized names must match
/// the server's enum exactly ("Applied", "Interview", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum JobStatus {
    Applied,
    Interview,
    Offer,
    Rejected,
    Accepted,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Applied,
        JobStatus::Interview,
        JobStatus::Offer,
        JobStatus::Rejected,
        JobStatus::Accepted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Applied => "Applied",
            JobStatus::Interview => "Interview",
            JobStatus::Offer => "Offer",
            JobStatus::Rejected => "Rejected",
            JobStatus::Accepted => "Accepted",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked job application as returned by GET /jobs/. The id is an opaque
/// backend identifier; timestamps arrive as ISO strings.
#[derive(Debug, Clone, Deserialize)]
pub struct JobApplication {
    #[serde(rename = "_id")]
    pub id: String,
    pub company: String,
    pub role: String,
    pub status: JobStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl JobApplication {
    /// Creation date for display. The backend sends naive UTC timestamps
    /// like "2026-08-29T12:34:56.789000"; fall back to the raw string if
    /// the format ever changes.
    pub fn created_date(&self) -> String {
        self.created_at
            .parse::<chrono::NaiveDateTime>()
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|_| self.created_at.clone())
    }
}

/// One search result from the external postings API. Everything is optional
/// on the wire; defaults keep a sparse result displayable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalJobPosting {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub salary_min: Option<f64>,
    #[serde(default)]
    pub salary_max: Option<f64>,
    #[serde(default)]
    pub contract_type: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub job_url: Option<String>,
}

impl ExternalJobPosting {
    /// Description with HTML tags stripped and whitespace collapsed, for
    /// terminal display and import notes.
    pub fn plain_description(&self) -> String {
        strip_html(&self.description)
    }

    pub fn salary_range(&self) -> Option<String> {
        match (self.salary_min, self.salary_max) {
            (Some(min), Some(max)) => Some(format!("${:.0} - ${:.0}", min, max)),
            (Some(min), None) => Some(format!("${:.0}+", min)),
            (None, Some(max)) => Some(format!("up to ${:.0}", max)),
            (None, None) => None,
        }
    }
}

/// Aggregate counts computed server-side by GET /jobs/stats. The three
/// conversion rates are derived client-side.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Stats {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub applied: u64,
    #[serde(default)]
    pub interviews: u64,
    #[serde(default)]
    pub offers: u64,
    #[serde(default)]
    pub rejected: u64,
    #[serde(default)]
    pub accepted: u64,
}

impl Stats {
    pub fn interview_rate(&self) -> u32 {
        rate(self.interviews, self.total)
    }

    pub fn offer_rate(&self) -> u32 {
        rate(self.offers, self.total)
    }

    pub fn acceptance_rate(&self) -> u32 {
        rate(self.accepted, self.offers)
    }
}

/// Rounded percentage, clamped to 0 when the denominator is 0.
fn rate(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        0
    } else {
        (part as f64 / whole as f64 * 100.0).round() as u32
    }
}

/// Client-side status filter over the last-fetched list. `None` means "All".
/// Order is preserved.
pub fn filter_by_status(jobs: &[JobApplication], filter: Option<JobStatus>) -> Vec<JobApplication> {
    match filter {
        None => jobs.to_vec(),
        Some(status) => jobs.iter().filter(|j| j.status == status).cloned().collect(),
    }
}

/// External postings carry HTML in their descriptions; strip it down to
/// plain text for the terminal.
pub fn strip_html(html: &str) -> String {
    let fragment = scraper::Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
