use reqwest::StatusCode;
use thiserror::Error;

/// Failures surfaced by the catalog client.
///
/// Nothing in the client retries on its own. Callers hold on to the error
/// (it is `Clone`) and decide whether to re-issue the same request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport failure, or a non-success status other than 404/429.
    #[error("network error: {0}")]
    Network(String),

    /// The API asked us to slow down.
    #[error("rate limited by catalog API{}", retry_hint(.retry_after))]
    RateLimited { retry_after: Option<u64> },

    /// The response body was missing fields we rely on.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The requested id does not resolve.
    #[error("not found: {0}")]
    NotFound(String),
}

fn retry_hint(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(secs) => format!(" (retry after {secs}s)"),
        None => String::new(),
    }
}

impl FetchError {
    /// Errors worth offering a retry for without user changes.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited { .. })
    }

    /// Map a non-success HTTP status into the taxonomy.
    pub(crate) fn from_status(status: StatusCode, retry_after: Option<u64>, what: &str) -> Self {
        match status {
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited { retry_after },
            StatusCode::NOT_FOUND => Self::NotFound(what.to_string()),
            other => Self::Network(format!("{what}: unexpected status {other}")),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}
