//! Log line rendering for failed and retried API requests
//!
//! [`RetryContext`] carries the attempt counters and the redacted URL so the
//! retry warning, the recovery notice and the final failure report all name the
//! same request.

use reqwest::Error as ReqwestError;
use std::fmt;
use std::time::Duration;

/// Why a request failed, as reported to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// HTTP 429
    RateLimited,
    /// HTTP 400
    BadRequest,
    /// HTTP 401 or 403
    Unauthorized(u16),
    /// HTTP 404
    NotFound,
    /// Any other 4xx
    ClientError(u16),
    /// HTTP 5xx
    ServerError(u16),
    /// Request exceeded `REQUEST_TIMEOUT_SECS`
    Timeout,
    /// TCP or TLS connection could not be established
    ConnectFailed,
    /// Anything else the transport reports
    Network,
}

impl RetryErrorType {
    /// Classify an HTTP status; `None` for 1xx-3xx
    pub fn from_status(status: u16) -> Option<Self> {
        let kind = match status {
            429 => Self::RateLimited,
            400 => Self::BadRequest,
            401 | 403 => Self::Unauthorized(status),
            404 => Self::NotFound,
            402..=499 => Self::ClientError(status),
            500..=599 => Self::ServerError(status),
            _ => return None,
        };
        Some(kind)
    }

    /// Short phrase used inside log lines
    pub fn description(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate limit exceeded",
            Self::BadRequest => "request rejected as malformed",
            Self::Unauthorized(401) => "API key rejected (401)",
            Self::Unauthorized(_) => "plan not entitled to endpoint (403)",
            Self::NotFound => "endpoint not found",
            Self::ClientError(_) => "client error",
            Self::ServerError(503) => "service unavailable",
            Self::ServerError(502 | 504) => "gateway error",
            Self::ServerError(_) => "server error",
            Self::Timeout => "request timed out",
            Self::ConnectFailed => "connection failed",
            Self::Network => "network error",
        }
    }

    /// Operator remediation hint
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::RateLimited => "Wait for the quota window to reset or upgrade the API plan",
            Self::BadRequest => "Check PAGE_LIMIT and the ticker query parameters",
            Self::Unauthorized(_) => "Verify POLYGON_API_KEY and the plan's endpoint entitlements",
            Self::NotFound | Self::ClientError(_) => "Review POLYGON_BASE_URL and the request parameters",
            Self::ServerError(_) => "The API is failing upstream; rerun the load later",
            Self::Timeout => "Raise REQUEST_TIMEOUT_SECS or check network latency",
            Self::ConnectFailed => "Verify DNS resolution and outbound HTTPS access",
            Self::Network => "Check network connectivity and rerun the load",
        }
    }

    /// Only rate limiting is retried; every other failure ends the run
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

impl fmt::Display for RetryErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Attempt counters and request details for one logged retry event
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// 1-based attempt that just finished
    pub attempt: u32,
    /// Attempt budget (`MAX_RETRIES`)
    pub max_attempts: u32,
    /// Failure classification
    pub error_type: RetryErrorType,
    /// Sleep before the next attempt
    pub backoff_duration: Duration,
    /// Request URL, API key redacted
    pub endpoint: String,
    /// Detail of the last failure
    pub error_message: String,
}

impl RetryContext {
    /// Build a context for attempt `attempt` of `max_attempts`
    pub fn new(
        attempt: u32,
        max_attempts: u32,
        error_type: RetryErrorType,
        backoff_duration: Duration,
        endpoint: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            error_type,
            backoff_duration,
            endpoint: endpoint.into(),
            error_message: error_message.into(),
        }
    }

    /// Warning logged before sleeping
    pub fn format_retry(&self) -> String {
        format!(
            "Retrying (attempt {}/{}) after {} - waiting {:.1} seconds... ({})",
            self.attempt,
            self.max_attempts,
            self.error_type,
            self.backoff_duration.as_secs_f64(),
            self.endpoint
        )
    }

    /// Notice logged when a retried request finally succeeds
    pub fn format_success(&self) -> String {
        format!(
            "Retry attempt {}/{} succeeded - resuming fetch ({})",
            self.attempt, self.max_attempts, self.endpoint
        )
    }

    /// Multi-line report logged when the attempt budget is spent
    pub fn format_failure(&self) -> String {
        let suggestions: String = self
            .format_suggestions()
            .iter()
            .map(|s| format!("\n    - {s}"))
            .collect();

        format!(
            "[FAILED] Request failed after {} attempts\n  Last error: {}\n  Endpoint: {}\n  Suggestions:{}",
            self.attempt, self.error_message, self.endpoint, suggestions
        )
    }

    /// Remediation hints, with a budget hint for retryable failures
    pub fn format_suggestions(&self) -> Vec<String> {
        let mut suggestions = vec![self.error_type.suggestion().to_string()];
        if self.error_type.is_retryable() {
            suggestions.push(format!(
                "Try increasing MAX_RETRIES (current: {})",
                self.max_attempts
            ));
        }
        suggestions
    }
}

/// Classify a failure from its HTTP status, falling back to the transport error
pub fn extract_error_type(status: Option<u16>, err: Option<&ReqwestError>) -> RetryErrorType {
    if let Some(kind) = status.and_then(RetryErrorType::from_status) {
        return kind;
    }

    match err {
        Some(e) if e.is_timeout() => RetryErrorType::Timeout,
        Some(e) if e.is_connect() => RetryErrorType::ConnectFailed,
        _ => RetryErrorType::Network,
    }
}
