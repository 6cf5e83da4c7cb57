use thiserror::Error;

/// Failures surfaced by a storage backend.
///
/// Transport failures and remote rejections are kept distinct so that
/// operators can tell a network problem from a permission or path problem.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HDFS transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HDFS rejected {op} (status {status}): {message}")]
    Rejected {
        op: &'static str,
        status: u16,
        message: String,
    },

    #[error("HDFS {op} did not redirect to a data node")]
    MissingRedirect { op: &'static str },

    #[error("Invalid HDFS configuration: {0}")]
    Config(String),
}
