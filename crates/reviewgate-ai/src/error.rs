use thiserror::Error;

/// Provider-side failure. Never produced by a malformed answer; those resolve
/// to a fallback verdict instead.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("classifier request timed out")]
    Timeout,

    #[error("classifier returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("classifier error {code}: {message}")]
    Api { code: i64, message: String },
}

impl From<reqwest::Error> for ClassifierError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}
