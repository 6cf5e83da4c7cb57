use thiserror::Error;

/// Failures surfaced by the CKAN connector.
#[derive(Error, Debug)]
pub enum CkanError {
    #[error("CKAN transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("CKAN rejected {action} (status {status}): {message}")]
    Rejected {
        action: &'static str,
        status: u16,
        message: String,
    },

    #[error("unexpected CKAN {action} response: {reason}")]
    UnexpectedResponse {
        action: &'static str,
        reason: String,
    },

    #[error("Invalid CKAN configuration: {0}")]
    Config(String),
}
