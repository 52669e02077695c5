//! LeetCode handle verification through recent accepted submissions

use chrono::{Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Number of recent accepted submissions inspected when verifying
const VERIFY_LOOKBACK: usize = 50;

const RECENT_SUBMISSIONS_QUERY: &str = r#"
  query recentAcSubmissions($username: String!, $limit: Int!) {
    recentAcSubmissionList(username: $username, limit: $limit) {
      title
      titleSlug
      timestamp
    }
  }
"#;

/// Configuration for the LeetCode verifier
#[derive(Debug, Clone)]
pub struct LeetCodeConfig {
    /// GraphQL endpoint
    pub graphql_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for LeetCodeConfig {
    fn default() -> Self {
        Self {
            graphql_url: "https://leetcode.com/graphql".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// An accepted submission as reported by LeetCode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeetCodeSubmission {
    pub title: String,
    pub title_slug: String,
    /// Unix seconds, sent by LeetCode as a string
    pub timestamp: String,
}

impl LeetCodeSubmission {
    pub fn submitted_at(&self) -> Option<i64> {
        self.timestamp.parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub verified: bool,
    pub submission: Option<LeetCodeSubmission>,
}

#[derive(Debug, Error)]
pub enum VerifierError {
    #[error("LeetCode user \"{0}\" not found. Make sure the username is correct and the profile is public.")]
    UserNotFound(String),
    #[error("Failed to verify LeetCode submission: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Unexpected LeetCode response: {0}")]
    Response(String),
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<SubmissionData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionData {
    #[serde(default)]
    recent_ac_submission_list: Option<Vec<LeetCodeSubmission>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    #[serde(default)]
    message: String,
}

/// Client for LeetCode's public GraphQL API
#[derive(Clone)]
pub struct LeetCodeVerifier {
    client: Client,
    config: LeetCodeConfig,
}

impl LeetCodeVerifier {
    pub fn new(config: LeetCodeConfig) -> Result<Self, VerifierError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Fetch up to `limit` recent accepted submissions for a user
    pub async fn recent_submissions(
        &self,
        username: &str,
        limit: usize,
    ) -> Result<Vec<LeetCodeSubmission>, VerifierError> {
        let body = json!({
            "query": RECENT_SUBMISSIONS_QUERY,
            "variables": { "username": username, "limit": limit },
        });

        let response: GraphQlResponse = self
            .client
            .post(&self.config.graphql_url)
            .header("Referer", "https://leetcode.com")
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        parse_submissions(username, response)
    }

    /// Check that `username` solved `problem_slug` within `window` of now
    pub async fn verify_submission(
        &self,
        username: &str,
        problem_slug: &str,
        window: Duration,
    ) -> Result<Verification, VerifierError> {
        let submissions = self
            .recent_submissions(username, VERIFY_LOOKBACK)
            .await
            .inspect_err(|e| warn!("LeetCode verification error for {}: {}", username, e))?;

        let window = ChronoDuration::from_std(window).unwrap_or(ChronoDuration::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(window)
            .map(|t| t.timestamp())
            .unwrap_or(i64::MIN);

        let submission = find_recent_submission(&submissions, problem_slug, cutoff).cloned();
        debug!(
            "LeetCode user {} solved {} recently: {}",
            username,
            problem_slug,
            submission.is_some()
        );

        Ok(Verification {
            verified: submission.is_some(),
            submission,
        })
    }
}

fn parse_submissions(
    username: &str,
    response: GraphQlResponse,
) -> Result<Vec<LeetCodeSubmission>, VerifierError> {
    if let Some(error) = response.errors.first() {
        if error.message.contains("does not exist") {
            return Err(VerifierError::UserNotFound(username.to_string()));
        }
        if response.data.is_none() {
            return Err(VerifierError::Response(error.message.clone()));
        }
    }

    Ok(response
        .data
        .and_then(|d| d.recent_ac_submission_list)
        .unwrap_or_default())
}

/// First accepted submission of `problem_slug` at or after `cutoff` (unix seconds)
pub fn find_recent_submission<'a>(
    submissions: &'a [LeetCodeSubmission],
    problem_slug: &str,
    cutoff: i64,
) -> Option<&'a LeetCodeSubmission> {
    submissions.iter().find(|s| {
        s.title_slug == problem_slug && s.submitted_at().is_some_and(|t| t >= cutoff)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_user_maps_to_not_found() {
        let response: GraphQlResponse = serde_json::from_str(
            r#"{"data":{"recentAcSubmissionList":null},"errors":[{"message":"That user does not exist."}]}"#,
        )
        .unwrap();

        let err = parse_submissions("ghost", response).unwrap_err();
        assert!(matches!(err, VerifierError::UserNotFound(ref u) if u == "ghost"));
    }

    #[test]
    fn test_empty_list_parses() {
        let response: GraphQlResponse =
            serde_json::from_str(r#"{"data":{"recentAcSubmissionList":[]}}"#).unwrap();
        assert!(parse_submissions("alice", response).unwrap().is_empty());
    }
}
