use reqwest::StatusCode;
use thiserror::Error;

/// Closed taxonomy of call failures. Retry classification matches
/// `kind_name()` against the configured retryable set; timeouts are retryable
/// unconditionally.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("rate limit exceeded: {0}")]
    RateLimit(String),
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("authentication rejected ({status}): {message}")]
    Auth { status: u16, message: String },
    #[error("invalid request ({status}): {message}")]
    InvalidRequest { status: u16, message: String },
    #[error("failed to parse provider response: {0}")]
    Parse(String),
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ProviderError {
    /// Stable name used for config-driven retry classification.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ProviderError::Timeout => "TimeoutError",
            ProviderError::Connection(_) => "ConnectionError",
            ProviderError::RateLimit(_) => "RateLimitError",
            ProviderError::Server { .. } => "ServerError",
            ProviderError::Auth { .. } => "AuthError",
            ProviderError::InvalidRequest { .. } => "InvalidRequestError",
            ProviderError::Parse(_) => "ParseError",
            ProviderError::Unavailable(_) => "UnavailableError",
            ProviderError::Internal(_) => "InternalError",
        }
    }

    /// Maps a non-success HTTP status plus response body to an error kind.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status.as_u16() {
            429 => ProviderError::RateLimit(body),
            401 | 403 => ProviderError::Auth {
                status: status.as_u16(),
                message: body,
            },
            s if status.is_server_error() => ProviderError::Server { status: s, message: body },
            s => ProviderError::InvalidRequest { status: s, message: body },
        }
    }

    /// Maps a transport-level reqwest failure to an error kind.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_connect() {
            ProviderError::Connection(err.to_string())
        } else {
            ProviderError::Internal(err.to_string())
        }
    }
}

/// Failures surfaced by the provider manager. `NoProviders` is distinct from
/// per-provider exhaustion; `AllProvidersFailed` aggregates the last error of
/// every candidate tried, in attempt order.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("no LLM providers available")]
    NoProviders,
    #[error("all providers failed: {}", format_failures(.failures))]
    AllProvidersFailed {
        failures: Vec<(String, ProviderError)>,
    },
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

fn format_failures(failures: &[(String, ProviderError)]) -> String {
    failures
        .iter()
        .map(|(name, err)| format!("{}: {}", name, err))
        .collect::<Vec<_>>()
        .join("; ")
}
