use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::{ExternalJobPosting, JobApplication, JobStatus, Stats};

/// Bcrypt hashes at most 72 bytes of input; the backend truncates the same
/// way, so we must match it or long passwords silently stop verifying.
const BCRYPT_MAX_BYTES: usize = 72;

const REQUIRED_FIELDS_MSG: &str = "Please fill in all required fields";

/// Single choke point for every call to the JobSync backend. Non-2xx
/// responses are normalized to the server's `detail` message, or a fixed
/// per-operation fallback when the body has none.
pub struct ApiClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

// --- Wire types ---

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct MutationResponse {
    #[serde(default)]
    pub id: String,
    pub message: String,
}

/// Body for POST /jobs/ and PUT /jobs/{id}. Construction validates the
/// required fields, so an invalid submission never reaches the network.
#[derive(Debug, Clone, Serialize)]
pub struct JobPayload {
    pub company: String,
    pub role: String,
    pub status: JobStatus,
    pub notes: String,
}

impl JobPayload {
    pub fn new(company: String, role: String, status: JobStatus, notes: String) -> Result<Self> {
        if company.trim().is_empty() || role.trim().is_empty() {
            return Err(anyhow!(REQUIRED_FIELDS_MSG));
        }
        Ok(Self {
            company,
            role,
            status,
            notes,
        })
    }

    /// Full payload for an update, starting from the job's current fields.
    pub fn from_application(job: &JobApplication) -> Self {
        Self {
            company: job.company.clone(),
            role: job.role.clone(),
            status: job.status,
            notes: job.notes.clone(),
        }
    }

    /// Payload for importing a search result into the tracker. Notes are
    /// synthesized from the posting's fields, description tags stripped.
    pub fn from_posting(posting: &ExternalJobPosting) -> Result<Self> {
        let notes = format!(
            "Imported from job search\n\nLocation: {}\n\nDescription: {}\n\nURL: {}",
            posting.location,
            posting.plain_description(),
            posting.job_url.as_deref().unwrap_or("")
        );
        Self::new(
            posting.company.clone(),
            posting.title.clone(),
            JobStatus::Applied,
            notes,
        )
    }
}

#[derive(Debug, Serialize)]
pub struct CoverLetterRequest {
    pub job_title: String,
    pub company_name: String,
    pub job_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_skills: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoverLetterResponse {
    cover_letter: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub jobs: Vec<ExternalJobPosting>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::blocking::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // --- Authentication ---

    pub fn signup(&self, email: &str, password: &str) -> Result<SignupResponse> {
        let password = truncate_password(password);
        let response = self
            .http
            .post(self.url("/auth/signup"))
            .json(&Credentials {
                email,
                password: password.as_str(),
            })
            .send()
            .context("Failed to reach the backend")?;
        let response = check(response, "Signup failed")?;
        response.json().context("Failed to parse signup response")
    }

    /// Returns the bearer token on success.
    pub fn login(&self, email: &str, password: &str) -> Result<String> {
        let password = truncate_password(password);
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&Credentials {
                email,
                password: password.as_str(),
            })
            .send()
            .context("Failed to reach the backend")?;
        let response = check(response, "Login failed")?;
        let token: TokenResponse = response.json().context("Failed to parse login response")?;
        Ok(token.access_token)
    }

    // --- Tracked applications ---

    pub fn create_job(&self, token: &str, payload: &JobPayload) -> Result<MutationResponse> {
        let response = self
            .http
            .post(self.url("/jobs/"))
            .bearer_auth(token)
            .json(payload)
            .send()
            .context("Failed to reach the backend")?;
        let response = check(response, "Failed to create job")?;
        response.json().context("Failed to parse create response")
    }

    pub fn get_jobs(&self, token: &str) -> Result<Vec<JobApplication>> {
        let response = self
            .http
            .get(self.url("/jobs/"))
            .bearer_auth(token)
            .send()
            .context("Failed to reach the backend")?;
        let response = check(response, "Failed to fetch jobs")?;
        response.json().context("Failed to parse job list")
    }

    pub fn update_job(
        &self,
        token: &str,
        job_id: &str,
        payload: &JobPayload,
    ) -> Result<MutationResponse> {
        let response = self
            .http
            .put(self.url(&format!("/jobs/{}", job_id)))
            .bearer_auth(token)
            .json(payload)
            .send()
            .context("Failed to reach the backend")?;
        let response = check(response, "Failed to update job")?;
        response.json().context("Failed to parse update response")
    }

    pub fn delete_job(&self, token: &str, job_id: &str) -> Result<MutationResponse> {
        let response = self
            .http
            .delete(self.url(&format!("/jobs/{}", job_id)))
            .bearer_auth(token)
            .send()
            .context("Failed to reach the backend")?;
        let response = check(response, "Failed to delete job")?;
        response.json().context("Failed to parse delete response")
    }

    pub fn get_stats(&self, token: &str) -> Result<Stats> {
        let response = self
            .http
            .get(self.url("/jobs/stats"))
            .bearer_auth(token)
            .send()
            .context("Failed to reach the backend")?;
        let response = check(response, "Failed to fetch stats")?;
        response.json().context("Failed to parse stats")
    }

    // --- AI ---

    pub fn generate_cover_letter(&self, request: &CoverLetterRequest) -> Result<String> {
        if request.job_title.trim().is_empty()
            || request.company_name.trim().is_empty()
            || request.job_description.trim().is_empty()
        {
            return Err(anyhow!(REQUIRED_FIELDS_MSG));
        }

        let response = self
            .http
            .post(self.url("/ai/generate-cover-letter"))
            .json(request)
            .send()
            .context("Failed to reach the backend")?;
        let response = check(response, "Failed to generate cover letter")?;
        let letter: CoverLetterResponse = response
            .json()
            .context("Failed to parse cover letter response")?;
        Ok(letter.cover_letter)
    }

    // --- External search ---

    pub fn search_external(
        &self,
        keywords: &str,
        location: &str,
        page: u32,
        results_per_page: u32,
    ) -> Result<SearchResponse> {
        if keywords.trim().is_empty() {
            return Err(anyhow!("Please enter job keywords"));
        }

        let response = self
            .http
            .get(self.url("/jobs/search-external"))
            .query(&[("keywords", keywords), ("location", location)])
            .query(&[("page", page), ("results_per_page", results_per_page)])
            .send()
            .context("Failed to reach the backend")?;
        let response = check(response, "Failed to search external jobs")?;
        response.json().context("Failed to parse search results")
    }
}

/// Truncate a password to the bcrypt byte limit. Byte-level, not
/// character-level: a multi-byte character split by the 72-byte boundary is
/// dropped entirely rather than producing invalid UTF-8 or an error.
pub fn truncate_password(password: &str) -> String {
    if password.len() <= BCRYPT_MAX_BYTES {
        return password.to_string();
    }
    let mut end = BCRYPT_MAX_BYTES;
    while !password.is_char_boundary(end) {
        end -= 1;
    }
    password[..end].to_string()
}

fn check(
    response: reqwest::blocking::Response,
    fallback: &str,
) -> Result<reqwest::blocking::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(anyhow!(
        "{}",
        error_detail(&body).unwrap_or_else(|| fallback.to_string())
    ))
}

/// The backend reports failures as {"detail": "..."}. Only a string detail
/// is usable as a message; anything else falls back.
fn error_detail(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("detail")?
        .as_str()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_password_unchanged() {
        assert_eq!(truncate_password("hunter2"), "hunter2");
        let exactly_72 = "a".repeat(72);
        assert_eq!(truncate_password(&exactly_72), exactly_72);
    }

    #[test]
    fn test_truncate_long_ascii_password() {
        let long = "a".repeat(100);
        let truncated = truncate_password(&long);
        assert_eq!(truncated.len(), 72);
        assert!(long.starts_with(&truncated));
    }

    #[test]
    fn test_truncate_drops_split_multibyte_char() {
        // 70 ascii bytes then a 4-byte emoji straddling the 72-byte limit
        let password = format!("{}🦀x", "a".repeat(70));
        let truncated = truncate_password(&password);
        assert_eq!(truncated, "a".repeat(70));
        assert!(truncated.len() <= 72);
    }

    #[test]
    fn test_truncate_multibyte_heavy_password() {
        // 'é' is 2 bytes; 40 of them is 80 bytes, so 36 survive
        let password = "é".repeat(40);
        let truncated = truncate_password(&password);
        assert_eq!(truncated, "é".repeat(36));
        assert_eq!(truncated.len(), 72);
    }

    #[test]
    fn test_truncate_is_byte_prefix() {
        for password in ["日本語のパスワードは長いです".repeat(5), "ü".repeat(100)] {
            let truncated = truncate_password(&password);
            assert!(truncated.len() <= 72);
            assert!(password.as_bytes().starts_with(truncated.as_bytes()));
        }
    }

    #[test]
    fn test_error_detail_string() {
        let body = r#"{"detail": "Email already registered"}"#;
        assert_eq!(error_detail(body).unwrap(), "Email already registered");
    }

    #[test]
    fn test_error_detail_missing_or_invalid() {
        assert_eq!(error_detail("{}"), None);
        assert_eq!(error_detail("not json"), None);
        assert_eq!(error_detail(""), None);
        // FastAPI validation errors put a list in detail; not a usable message
        let body = r#"{"detail": [{"loc": ["body", "email"], "msg": "field required"}]}"#;
        assert_eq!(error_detail(body), None);
    }

    #[test]
    fn test_job_payload_requires_company_and_role() {
        let err = JobPayload::new(
            String::new(),
            "Engineer".to_string(),
            JobStatus::Applied,
            String::new(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Please fill in all required fields");

        let err = JobPayload::new(
            "Acme".to_string(),
            "   ".to_string(),
            JobStatus::Applied,
            String::new(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Please fill in all required fields");

        assert!(
            JobPayload::new(
                "Acme".to_string(),
                "Engineer".to_string(),
                JobStatus::Applied,
                String::new(),
            )
            .is_ok()
        );
    }

    #[test]
    fn test_create_job_with_empty_fields_never_hits_network() {
        // Building the payload fails before any request could be issued
        let result = JobPayload::new(
            String::new(),
            String::new(),
            JobStatus::Applied,
            "notes".to_string(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_import_payload_synthesizes_notes() {
        let posting = ExternalJobPosting {
            title: "Rust Engineer".to_string(),
            company: "Acme".to_string(),
            location: "Austin, TX".to_string(),
            description: "<p>Build <b>fast</b> things</p>".to_string(),
            job_url: Some("https://example.com/job/1".to_string()),
            ..ExternalJobPosting::default()
        };
        let payload = JobPayload::from_posting(&posting).unwrap();
        assert_eq!(payload.company, "Acme");
        assert_eq!(payload.role, "Rust Engineer");
        assert_eq!(payload.status, JobStatus::Applied);
        assert!(payload.notes.starts_with("Imported from job search"));
        assert!(payload.notes.contains("Location: Austin, TX"));
        assert!(payload.notes.contains("Description: Build fast things"));
        assert!(payload.notes.contains("URL: https://example.com/job/1"));
    }

    #[test]
    fn test_import_payload_rejects_nameless_posting() {
        let posting = ExternalJobPosting::default();
        assert!(JobPayload::from_posting(&posting).is_err());
    }

    #[test]
    fn test_search_requires_keywords() {
        let client = ApiClient::new("http://127.0.0.1:1");
        let err = client.search_external("  ", "us", 1, 10).unwrap_err();
        assert_eq!(err.to_string(), "Please enter job keywords");
    }

    #[test]
    fn test_cover_letter_requires_fields() {
        let client = ApiClient::new("http://127.0.0.1:1");
        let request = CoverLetterRequest {
            job_title: "Engineer".to_string(),
            company_name: String::new(),
            job_description: "desc".to_string(),
            user_name: None,
            user_skills: None,
        };
        let err = client.generate_cover_letter(&request).unwrap_err();
        assert_eq!(err.to_string(), "Please fill in all required fields");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ApiClient::new("http://127.0.0.1:8001/");
        assert_eq!(client.url("/jobs/"), "http://127.0.0.1:8001/jobs/");
    }

    #[test]
    fn test_cover_letter_request_omits_empty_optionals() {
        let request = CoverLetterRequest {
            job_title: "Engineer".to_string(),
            company_name: "Acme".to_string(),
            job_description: "desc".to_string(),
            user_name: None,
            user_skills: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("user_name"));
        assert!(!json.contains("user_skills"));
    }
}
