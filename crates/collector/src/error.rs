//! Error types for the HTTP collectors.

use thiserror::Error;

/// Errors raised while fetching or decoding remote data.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Transport failure before a response was received.
    #[error("network error: {0}")]
    Network(String),

    /// Non-success HTTP status.
    #[error("HTTP {status_code} from {url}")]
    Status {
        /// HTTP status code.
        status_code: u16,
        /// Requested URL.
        url: String,
    },

    /// The provider answered with an error payload.
    #[error("API error: {code} - {description}")]
    Api {
        /// Provider error code.
        code: String,
        /// Provider error text.
        description: String,
    },

    /// Response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// An expected HTML table was not on the page.
    #[error("table {index} not found on {url}")]
    MissingTable {
        /// Zero based table position.
        index: usize,
        /// Page URL.
        url: String,
    },

    /// A downloaded archive was unreadable.
    #[error("archive error: {0}")]
    Archive(String),
}

impl CollectorError {
    /// Creates a status error.
    pub fn status(status_code: u16, url: impl Into<String>) -> Self {
        Self::Status {
            status_code,
            url: url.into(),
        }
    }

    /// Creates a provider API error.
    pub fn api(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Api {
            code: code.into(),
            description: description.into(),
        }
    }

    /// Creates a missing table error.
    pub fn missing_table(index: usize, url: impl Into<String>) -> Self {
        Self::MissingTable {
            index,
            url: url.into(),
        }
    }

    /// Returns true if a later attempt may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status { status_code, .. } => *status_code == 429 || *status_code >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for CollectorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<zip::result::ZipError> for CollectorError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive(err.to_string())
    }
}

impl From<csv::Error> for CollectorError {
    fn from(err: csv::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
