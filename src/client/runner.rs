//! Code execution against the judge service.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{DuelError, RunnerError};
use crate::models::Language;
use crate::protocol::{CaseResult, FinishRequest, RunRequest, RunResponse};

/// Result of running a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionResult {
    /// Every test case passed.
    AllPassed,
    /// Per-case results in the order the judge reported them.
    PartialResults(Vec<CaseResult>),
    /// The request failed or the judge reported a top-level error.
    ExecutionError(String),
}

impl From<RunResponse> for SubmissionResult {
    fn from(response: RunResponse) -> Self {
        if let Some(error) = response.error {
            return SubmissionResult::ExecutionError(error);
        }
        match (response.all_passed, response.results) {
            (Some(true), _) => SubmissionResult::AllPassed,
            (_, Some(results)) => SubmissionResult::PartialResults(results),
            (Some(false), None) => SubmissionResult::PartialResults(Vec::new()),
            (None, None) => {
                SubmissionResult::ExecutionError("judge returned neither results nor an error".to_string())
            }
        }
    }
}

/// Client for `POST /run` and `POST /finish`.
///
/// Independent of the WebSocket: submissions may run at any time and
/// several may be in flight at once.
#[derive(Debug, Clone)]
pub struct CodeRunner {
    client: Client,
    base_url: String,
}

impl CodeRunner {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RunnerError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Validate a submission without touching the network.
    pub fn prepare(code: &str, language: &str, slug: &str) -> Result<RunRequest, DuelError> {
        if slug.trim().is_empty() {
            return Err(DuelError::InvalidInput("problem slug must not be empty".to_string()));
        }
        if code.trim().is_empty() {
            return Err(DuelError::InvalidInput("code must not be empty".to_string()));
        }
        let language: Language = language.parse()?;

        Ok(RunRequest {
            slug: slug.trim().to_string(),
            code: code.to_string(),
            language,
        })
    }

    /// Validate and run a submission.
    ///
    /// Input errors are returned before any request is issued; everything
    /// that goes wrong afterwards becomes [`SubmissionResult::ExecutionError`].
    pub async fn submit(
        &self,
        code: &str,
        language: &str,
        slug: &str,
    ) -> Result<SubmissionResult, DuelError> {
        let request = Self::prepare(code, language, slug)?;
        Ok(self.run(&request).await)
    }

    /// Run an already validated request.
    pub async fn run(&self, request: &RunRequest) -> SubmissionResult {
        match self.post_run(request).await {
            Ok(response) => response.into(),
            Err(e) => {
                warn!(slug = %request.slug, error = %e, "submission failed");
                SubmissionResult::ExecutionError(e.to_string())
            }
        }
    }

    /// Tell the judge a duel side timed out. The body is not inspected.
    pub async fn acknowledge_timeout(&self, username: &str, opponent: &str) -> Result<(), RunnerError> {
        let payload = FinishRequest {
            username: username.to_string(),
            opponent: opponent.to_string(),
        };
        let response = self
            .client
            .post(self.endpoint("finish"))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RunnerError::HttpStatus(response.status()));
        }
        Ok(())
    }

    async fn post_run(&self, request: &RunRequest) -> Result<RunResponse, RunnerError> {
        debug!(slug = %request.slug, language = %request.language, "running submission");
        let response = self
            .client
            .post(self.endpoint("run"))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // Error bodies are reported even when they come with a failure status.
        if let Ok(parsed) = serde_json::from_str::<RunResponse>(&body) {
            if parsed.error.is_some() {
                return Ok(parsed);
            }
        }
        if !status.is_success() {
            return Err(RunnerError::HttpStatus(status));
        }
        Ok(serde_json::from_str(&body)?)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}
