use thiserror::Error;

/// Failures while pulling a page from the search API. None of these are retried.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status} from search API: {body}")]
    Http { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("Unexpected data shape: {0}")]
    UnexpectedShape(String),
}
