use thiserror::Error;

/// Errors raised while talking to the game site.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("login and password are required (set ELEVEN_LOGIN / ELEVEN_PASSWORD)")]
    MissingCredentials,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("not a recognised site URL: {0}")]
    InvalidUrl(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ScrapeError {
    /// Whether another attempt at the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ScrapeError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ScrapeError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transience() {
        let busy = ScrapeError::Status {
            url: "https://11x11.ru/".to_string(),
            status: 503,
        };
        let missing = ScrapeError::Status {
            url: "https://11x11.ru/".to_string(),
            status: 404,
        };
        assert!(busy.is_transient());
        assert!(!missing.is_transient());
        assert!(!ScrapeError::Authentication("no marker".to_string()).is_transient());
    }
}
