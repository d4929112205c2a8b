//! HTTP client for the issue analysis service.
//!
//! One call to [`AnalysisClient::analyze`] is exactly one `POST /analyze`.
//! There is no retry and no caching: the service is not assumed to be
//! deterministic, so a second call for the same URL is a second request.
//! Every failure comes back as an [`AnalysisError`]; reqwest and serde error
//! types never reach the caller.

use crate::config::{parse_api_url, ConfigError};
use issuelens_core::protocol::{AnalysisRecord, AnalysisRequest, AnalyzedIssue};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

const ANALYZE_PATH: &str = "analyze";

/// Maximum length for service-provided text echoed into error messages
const MAX_ERROR_CONTENT_LEN: usize = 200;

const MALFORMED_USER_MESSAGE: &str =
    "API Error: the analysis service returned a response that could not be read.";

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Empty issue URL; nothing was sent.
    #[error("A GitHub issue URL is required")]
    Validation,
    /// The request did not complete, or the service answered with a non-2xx status.
    #[error("{message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },
    /// A 2xx answer whose body is not the expected analysis JSON.
    #[error("Malformed analysis response: {message}")]
    MalformedResponse { message: String },
}

impl AnalysisError {
    /// Text to show the user. Transport and malformed-response failures
    /// share the `API Error:` form; parser detail stays out of it.
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::Validation => "Please enter a GitHub issue URL.".to_string(),
            AnalysisError::Transport { message, .. } => format!("API Error: {}", message),
            AnalysisError::MalformedResponse { .. } => MALFORMED_USER_MESSAGE.to_string(),
        }
    }

    /// HTTP status of the failed response, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            AnalysisError::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

/// Where and how to reach the analysis service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_api_url(base_url)?,
            timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// `{base_url}/analyze`, keeping any path prefix on the base URL.
    pub fn analyze_url(&self) -> Result<Url, ConfigError> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(ANALYZE_PATH)
            .map_err(|source| ConfigError::InvalidApiUrl {
                url: self.base_url.to_string(),
                source,
            })
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl AnalysisClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let endpoint = config.analyze_url()?;
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ConfigError::HttpClient)?;
        Ok(Self { http, endpoint })
    }

    /// Ask the service to analyze one issue and flatten its relevant files.
    pub async fn analyze(&self, issue_url: &str) -> Result<AnalyzedIssue, AnalysisError> {
        let issue_url = validate_issue_url(issue_url)?;
        debug!(endpoint = %self.endpoint, issue_url, "requesting issue analysis");

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .json(&AnalysisRequest::new(issue_url))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            let err = error_from_status(status, &text);
            warn!(status = status.as_u16(), error = %err, "analysis request failed");
            return Err(err);
        }

        let record = parse_record(&text)?;
        let issue = AnalyzedIssue::from(record);
        debug!(files = issue.flattened_files.len(), "analysis received");
        Ok(issue)
    }
}

/// Trimmed issue URL, or [`AnalysisError::Validation`] when it is blank.
///
/// GitHub URL syntax is left to the service.
pub fn validate_issue_url(issue_url: &str) -> Result<&str, AnalysisError> {
    let trimmed = issue_url.trim();
    if trimmed.is_empty() {
        Err(AnalysisError::Validation)
    } else {
        Ok(trimmed)
    }
}

fn parse_record(text: &str) -> Result<AnalysisRecord, AnalysisError> {
    serde_json::from_str::<AnalysisRecord>(text).map_err(|err| {
        let message = if err.is_data() {
            format!("response does not match the analysis schema: {}", err)
        } else {
            format!(
                "response is not valid JSON ({}): {}",
                err,
                truncate_str(text, MAX_ERROR_CONTENT_LEN)
            )
        };
        warn!(%message, "malformed analysis response");
        AnalysisError::MalformedResponse { message }
    })
}

/// Error body sent by the service alongside non-2xx statuses.
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<Value>,
}

fn error_from_status(status: StatusCode, text: &str) -> AnalysisError {
    let message = detail_message(text)
        .map(|detail| truncate_str(&detail, MAX_ERROR_CONTENT_LEN).to_string())
        .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));
    AnalysisError::Transport {
        status: Some(status.as_u16()),
        message,
    }
}

/// `detail` as text: a plain string, or the `msg` fields of a validation
/// error list joined together.
fn detail_message(text: &str) -> Option<String> {
    let body: ErrorBody = serde_json::from_str(text).ok()?;
    match body.detail? {
        Value::String(detail) if !detail.trim().is_empty() => Some(detail),
        Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}

fn map_transport_error(err: reqwest::Error) -> AnalysisError {
    warn!(error = %err, "analysis request did not complete");
    let message = if err.is_timeout() {
        "The analysis service timed out. Please try again.".to_string()
    } else if err.is_connect() {
        "Could not connect to the analysis service. Check that it is running and try again."
            .to_string()
    } else {
        format!("Network error: {}", err)
    };
    AnalysisError::Transport {
        status: err.status().map(|s| s.as_u16()),
        message,
    }
}

/// Truncate a string for display (Unicode-safe)
fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_issue_url_trims_and_rejects_blank() {
        assert_eq!(
            validate_issue_url("  https://github.com/org/repo/issues/1 \n").unwrap(),
            "https://github.com/org/repo/issues/1"
        );
        assert!(matches!(
            validate_issue_url("   "),
            Err(AnalysisError::Validation)
        ));
    }

    #[test]
    fn test_analyze_url_keeps_base_path() {
        let config = ClientConfig::new("http://localhost:8000").unwrap();
        assert_eq!(config.analyze_url().unwrap().as_str(), "http://localhost:8000/analyze");

        let config = ClientConfig::new("https://tools.example.com/api").unwrap();
        assert_eq!(
            config.analyze_url().unwrap().as_str(),
            "https://tools.example.com/api/analyze"
        );

        let config = ClientConfig::new("https://tools.example.com/api/").unwrap();
        assert_eq!(
            config.analyze_url().unwrap().as_str(),
            "https://tools.example.com/api/analyze"
        );
    }

    #[test]
    fn test_detail_string_is_used() {
        let err = error_from_status(StatusCode::BAD_REQUEST, r#"{"detail":"Validation error: bad url"}"#);
        assert_eq!(err.to_string(), "Validation error: bad url");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_detail_list_messages_are_joined() {
        let body = r#"{"detail":[{"loc":["body","github_url"],"msg":"invalid or missing URL scheme","type":"url_parsing"},{"msg":"second"}]}"#;
        let err = error_from_status(StatusCode::UNPROCESSABLE_ENTITY, body);
        assert_eq!(err.to_string(), "invalid or missing URL scheme; second");
    }

    #[test]
    fn test_missing_detail_falls_back_to_status() {
        for body in ["<html>Bad Gateway</html>", "{}", r#"{"detail":""}"#, r#"{"detail":42}"#] {
            let err = error_from_status(StatusCode::BAD_GATEWAY, body);
            assert_eq!(err.to_string(), "Request failed with status code 502");
        }
    }

    #[test]
    fn test_long_detail_is_truncated() {
        let long = "x".repeat(500);
        let err = error_from_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!(r#"{{"detail":"{}"}}"#, long),
        );
        assert_eq!(err.to_string().chars().count(), MAX_ERROR_CONTENT_LEN);
    }

    #[test]
    fn test_malformed_body_kinds() {
        let not_json = parse_record("<!doctype html>").unwrap_err();
        assert!(not_json.to_string().contains("not valid JSON"));

        let wrong_shape = parse_record(r#"{"relevant_files": []}"#).unwrap_err();
        assert!(wrong_shape.to_string().contains("does not match"));
        assert_eq!(wrong_shape.user_message(), MALFORMED_USER_MESSAGE);
    }

    #[test]
    fn test_truncate_str_is_char_safe() {
        assert_eq!(truncate_str("héllo", 2), "hé");
        assert_eq!(truncate_str("abc", 10), "abc");
    }
}
