use reqwest;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Default registry host. The v2 studies endpoint is appended per request.
pub const DEFAULT_BASE_URL: &str = "https://clinicaltrials.gov";

/// One set of user-supplied search filters, read from the form at
/// activation time and dropped when the request cycle completes.
///
/// Values are passed through verbatim - empty strings are valid and no
/// trimming or validation happens on this side of the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub condition: String,
    pub overall_status: String,
    pub location: String,
}

impl SearchCriteria {
    pub fn new(condition: &str, overall_status: &str, location: &str) -> Self {
        Self {
            condition: condition.to_string(),
            overall_status: overall_status.to_string(),
            location: location.to_string(),
        }
    }

    /// Maps the three filters 1:1 onto the registry's query keys, in the
    /// order they are sent on the wire.
    pub fn query_params(&self) -> [(&'static str, &str); 3] {
        [
            ("query.cond", self.condition.as_str()),
            ("filter.overallStatus", self.overall_status.as_str()),
            ("query.locn", self.location.as_str()),
        ]
    }

    /// Labeled (key, value) pairs for echoing the submitted parameters
    /// back to the user.
    pub fn echo_pairs(&self) -> Vec<(String, String)> {
        self.query_params()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

/// Failures a single fetch can produce. The shells branch on `Http` vs the
/// rest; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP Error: {status}: {message}")]
    Http { status: u16, message: String },
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("response body was not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl ApiClient {
    /// Client with no request timeout: a hung connection blocks until the
    /// transport gives up, matching the registry's observed usage. Use
    /// [`ApiClient::with_timeout`] to opt into a deadline.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, None)
    }

    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Transport)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// One GET against the v2 studies endpoint with the three filters as
    /// query parameters. Returns the decoded body unmodified on success.
    /// Single attempt - no retry, no backoff, no caching.
    pub fn fetch_studies(&self, criteria: &SearchCriteria) -> Result<Value, ApiError> {
        let url = format!("{}/api/v2/studies", self.base_url);
        tracing::info!(target: "api", "GET {} cond={:?} status={:?} locn={:?}",
            url, criteria.condition, criteria.overall_status, criteria.location);

        let response = self
            .client
            .get(&url)
            .query(&criteria.query_params())
            .send()
            .map_err(ApiError::Transport)?;

        let status = response.status();
        let body = response.text().map_err(ApiError::Transport)?;

        if !status.is_success() {
            tracing::warn!(target: "api", "registry returned {}: {}", status, body);
            let message = if body.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                body
            };
            return Err(ApiError::Http {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!(target: "api", "registry returned {} ({} bytes)", status, body.len());
        serde_json::from_str(&body).map_err(ApiError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criteria_map_verbatim_onto_query_keys() {
        let criteria = SearchCriteria::new("lung cancer", "RECRUITING", "Japan");
        assert_eq!(
            criteria.query_params(),
            [
                ("query.cond", "lung cancer"),
                ("filter.overallStatus", "RECRUITING"),
                ("query.locn", "Japan"),
            ]
        );
    }

    #[test]
    fn empty_criteria_map_to_empty_values() {
        let criteria = SearchCriteria::new("", "", "");
        assert_eq!(
            criteria.query_params(),
            [
                ("query.cond", ""),
                ("filter.overallStatus", ""),
                ("query.locn", ""),
            ]
        );
    }

    #[test]
    fn criteria_are_not_trimmed_or_rewritten() {
        let criteria = SearchCriteria::new("  lung cancer  ", "recruiting", " Japan\t");
        let params = criteria.query_params();
        assert_eq!(params[0].1, "  lung cancer  ");
        assert_eq!(params[1].1, "recruiting");
        assert_eq!(params[2].1, " Japan\t");
    }

    #[test]
    fn http_error_display_carries_prefix_status_and_message() {
        let err = ApiError::Http {
            status: 404,
            message: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP Error: 404: not found");
    }

    #[test]
    fn client_strips_trailing_slash_from_base_url() {
        let client = ApiClient::new("http://localhost:9999/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:9999");
    }
}
