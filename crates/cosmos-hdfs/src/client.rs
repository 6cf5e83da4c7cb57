use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

use crate::backend::StorageBackend;
use crate::config::{HdfsApi, HdfsConfig};
use crate::error::BackendError;

/// Longest remote error body kept in a `BackendError::Rejected` message.
const MAX_ERROR_BODY_CHARS: usize = 512;

const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RemoteExceptionBody {
    remote_exception: RemoteException,
}

#[derive(Deserialize)]
struct RemoteException {
    #[serde(default)]
    exception: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct BooleanBody {
    boolean: bool,
}

/// HDFS REST client implementing [`StorageBackend`].
///
/// The same client speaks HttpFS and WebHDFS; the flavours only differ in
/// how `create_file` and `append` ship data (see [`HdfsApi`]). Redirects
/// are never followed automatically so that WebHDFS data-node hops are
/// explicit.
#[derive(Debug, Clone)]
pub struct HdfsBackend {
    config: HdfsConfig,
    base: Url,
    client: Client,
}

impl HdfsBackend {
    /// Builds a backend with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Config` if the username or dataset is empty,
    /// or `BackendError::Transport` if the HTTP client cannot be built.
    pub fn new(config: HdfsConfig) -> Result<Self, BackendError> {
        if config.username.trim().is_empty() {
            return Err(BackendError::Config("username must not be empty".to_string()));
        }
        if config.dataset.trim().is_empty() {
            return Err(BackendError::Config("dataset must not be empty".to_string()));
        }

        let base = config.dataset_url()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            config,
            base,
            client,
        })
    }

    pub fn config(&self) -> &HdfsConfig {
        &self.config
    }

    pub fn api(&self) -> HdfsApi {
        self.config.api
    }

    /// Resolves `path` below the dataset directory. Each `/`-separated part
    /// becomes one percent-encoded segment; an empty path is the dataset
    /// directory itself.
    fn url(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.extend(path.split('/').filter(|part| !part.is_empty()));
        }
        url
    }

    fn request(&self, method: Method, url: &Url, op: &str) -> RequestBuilder {
        tracing::debug!(api = %self.config.api, %method, op, %url, "HDFS request");
        self.client
            .request(method, url.clone())
            .query(&[("op", op), ("user.name", self.config.username.as_str())])
    }

    /// Ships one newline-terminated line to `key` using `op` (CREATE or APPEND).
    async fn write(
        &self,
        method: Method,
        op: &'static str,
        key: &str,
        line: &str,
    ) -> Result<(), BackendError> {
        let url = self.url(key);
        let data = format!("{line}\n");

        let response = match self.config.api {
            HdfsApi::HttpFs => {
                self.request(method, &url, op)
                    .query(&[("data", "true")])
                    .header(header::CONTENT_TYPE, OCTET_STREAM)
                    .body(data)
                    .send()
                    .await?
            }
            HdfsApi::WebHdfs => {
                let first = self.request(method.clone(), &url, op).send().await?;
                let status = first.status();
                let location = first
                    .headers()
                    .get(header::LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string);

                match location {
                    Some(location) if status.is_redirection() => {
                        tracing::debug!(op, %location, "following data node redirect");
                        self.client
                            .request(method, location)
                            .header(header::CONTENT_TYPE, OCTET_STREAM)
                            .body(data)
                            .send()
                            .await?
                    }
                    _ if !status.is_success() && !status.is_redirection() => {
                        return Err(rejected(op, first).await);
                    }
                    _ => return Err(BackendError::MissingRedirect { op }),
                }
            }
        };

        if response.status().is_success() {
            Ok(())
        } else {
            Err(rejected(op, response).await)
        }
    }
}

/// Builds a `Rejected` error, preferring the message of an HDFS
/// `RemoteException` body over the raw body text.
async fn rejected(op: &'static str, response: Response) -> BackendError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    let message = match serde_json::from_str::<RemoteExceptionBody>(&body) {
        Ok(parsed) if !parsed.remote_exception.exception.is_empty() => format!(
            "{}: {}",
            parsed.remote_exception.exception, parsed.remote_exception.message
        ),
        Ok(parsed) => parsed.remote_exception.message,
        Err(_) => body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect(),
    };

    BackendError::Rejected {
        op,
        status,
        message,
    }
}

#[async_trait]
impl StorageBackend for HdfsBackend {
    async fn exists(&self, key: &str) -> Result<bool, BackendError> {
        let response = self
            .request(Method::GET, &self.url(key), "GETFILESTATUS")
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(rejected("GETFILESTATUS", response).await),
        }
    }

    async fn create_dir(&self, path: &str) -> Result<(), BackendError> {
        let response = self
            .request(Method::PUT, &self.url(path), "MKDIRS")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(rejected("MKDIRS", response).await);
        }

        // HDFS answers {"boolean": false} when the directory could not be made.
        let body = response.text().await?;
        match serde_json::from_str::<BooleanBody>(&body) {
            Ok(BooleanBody { boolean: false }) => Err(BackendError::Rejected {
                op: "MKDIRS",
                status: status.as_u16(),
                message: format!("directory '{}' was not created", self.url(path).path()),
            }),
            _ => Ok(()),
        }
    }

    async fn create_file(&self, key: &str, initial_line: &str) -> Result<(), BackendError> {
        self.write(Method::PUT, "CREATE", key, initial_line).await
    }

    async fn append(&self, key: &str, line: &str) -> Result<(), BackendError> {
        self.write(Method::POST, "APPEND", key, line).await
    }
}
