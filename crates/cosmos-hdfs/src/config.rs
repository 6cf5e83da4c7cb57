use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BackendError;

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    14000
}

fn default_username() -> String {
    "opendata".to_string()
}

fn default_dataset() -> String {
    "unknown".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Which flavour of the HDFS REST API the remote store speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HdfsApi {
    /// HttpFS gateway: data is sent in the first request.
    #[default]
    HttpFs,
    /// Native WebHDFS: the name node redirects data writes to a data node.
    WebHdfs,
}

impl HdfsApi {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HttpFs => "httpfs",
            Self::WebHdfs => "webhdfs",
        }
    }
}

impl fmt::Display for HdfsApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown HDFS API name.
#[derive(Debug, Clone)]
pub struct ParseHdfsApiError(pub String);

impl fmt::Display for ParseHdfsApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized HDFS API: {} (expected httpfs or webhdfs)", self.0)
    }
}

impl std::error::Error for ParseHdfsApiError {}

impl FromStr for HdfsApi {
    type Err = ParseHdfsApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "httpfs" => Ok(Self::HttpFs),
            "webhdfs" => Ok(Self::WebHdfs),
            _ => Err(ParseHdfsApiError(s.to_string())),
        }
    }
}

/// Connection settings for the remote HDFS store.
///
/// Files are written below `/user/{username}/{dataset}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HdfsConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_dataset")]
    pub dataset: String,
    #[serde(default)]
    pub api: HdfsApi,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HdfsConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: default_username(),
            dataset: default_dataset(),
            api: HdfsApi::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl HdfsConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        dataset: impl Into<String>,
        api: HdfsApi,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            dataset: dataset.into(),
            api,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// REST endpoint of the dataset directory.
    ///
    /// `username` and `dataset` are pushed as single path segments, so any
    /// reserved character in them is percent-encoded.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Config` when `host` and `port` do not form a
    /// valid HTTP authority.
    pub fn dataset_url(&self) -> Result<Url, BackendError> {
        let mut url = Url::parse(&format!("http://{}:{}/", self.host, self.port))
            .map_err(|e| BackendError::Config(format!("invalid HDFS host '{}': {e}", self.host)))?;
        url.path_segments_mut()
            .map_err(|()| {
                BackendError::Config(format!("HDFS host '{}' cannot be a base", self.host))
            })?
            .clear()
            .extend([
                "webhdfs",
                "v1",
                "user",
                self.username.as_str(),
                self.dataset.as_str(),
            ]);
        Ok(url)
    }
}
