use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::error::CkanError;
use crate::split::{compute_splits, InputSplit};

/// Records requested per page when counting a resource.
pub const PAGE_SIZE: u64 = 1000;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Longest error body kept in a `CkanError::Rejected` message.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// The `{ "success": .., "result": .., "error": .. }` wrapper every CKAN
/// action answers with.
#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default = "default_true")]
    success: bool,
    result: Option<T>,
    #[serde(default)]
    error: Option<Value>,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct Identified {
    id: String,
}

#[derive(Deserialize)]
struct OrganizationResult {
    packages: Vec<Identified>,
}

#[derive(Deserialize)]
struct PackageResult {
    resources: Vec<Identified>,
}

#[derive(Deserialize)]
struct DatastoreResult {
    records: Vec<Value>,
}

/// Read-only client for the CKAN action API.
///
/// Every request carries the API key in the `Authorization` header.
#[derive(Debug, Clone)]
pub struct CkanClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl CkanClient {
    /// Builds a client rooted at `base_url` (e.g. `http://ckan.example.org:80`).
    ///
    /// # Errors
    ///
    /// Returns `CkanError::Config` for an empty or non-HTTP base URL, or
    /// `CkanError::Transport` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, CkanError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(CkanError::Config(format!(
                "base url must start with http:// or https://, got '{base_url}'"
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            base_url,
            api_key: api_key.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Package ids within an organization.
    pub async fn packages(&self, org_id: &str) -> Result<Vec<String>, CkanError> {
        tracing::info!(organization = org_id, "getting packages");
        let result: OrganizationResult = self
            .action("organization_show", &[("id", org_id.to_string())])
            .await?;
        Ok(result.packages.into_iter().map(|p| p.id).collect())
    }

    /// Resource ids within a package.
    pub async fn resources(&self, pkg_id: &str) -> Result<Vec<String>, CkanError> {
        tracing::info!(package = pkg_id, "getting resources");
        let result: PackageResult = self
            .action("package_show", &[("id", pkg_id.to_string())])
            .await?;
        Ok(result.resources.into_iter().map(|r| r.id).collect())
    }

    /// Counts the records of a resource by paging through the datastore
    /// until the first empty page.
    pub async fn num_records(&self, res_id: &str) -> Result<u64, CkanError> {
        tracing::info!(resource = res_id, "counting records");
        let mut total = 0u64;
        loop {
            let page = self.records(res_id, total, PAGE_SIZE).await?;
            if page.is_empty() {
                break;
            }
            total += page.len() as u64;
        }
        Ok(total)
    }

    /// Up to `limit` records of a resource starting at `offset`.
    pub async fn records(
        &self,
        res_id: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Value>, CkanError> {
        tracing::debug!(resource = res_id, offset, limit, "getting records");
        let result: DatastoreResult = self
            .action(
                "datastore_search",
                &[
                    ("resource_id", res_id.to_string()),
                    ("offset", offset.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(result.records)
    }

    /// Counts a resource and cuts it into splits of `split_size` records.
    pub async fn input_splits(
        &self,
        res_id: &str,
        split_size: u64,
    ) -> Result<Vec<InputSplit>, CkanError> {
        let total = self.num_records(res_id).await?;
        Ok(compute_splits(res_id, total, split_size))
    }

    async fn action<T: DeserializeOwned>(
        &self,
        action: &'static str,
        query: &[(&str, String)],
    ) -> Result<T, CkanError> {
        let url = format!("{}/api/3/action/{action}", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, &self.api_key)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(action, status = status.as_u16(), bytes = body.len(), "CKAN response");

        if !status.is_success() {
            return Err(rejected(action, status, &body));
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|err| CkanError::UnexpectedResponse {
                action,
                reason: err.to_string(),
            })?;

        if !envelope.success {
            return Err(CkanError::Rejected {
                action,
                status: status.as_u16(),
                message: envelope
                    .error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "success=false".to_string()),
            });
        }

        envelope.result.ok_or(CkanError::UnexpectedResponse {
            action,
            reason: "missing result".to_string(),
        })
    }
}

/// Prefers the CKAN `error.message` field over the raw body text.
fn rejected(action: &'static str, status: StatusCode, body: &str) -> CkanError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect());

    CkanError::Rejected {
        action,
        status: status.as_u16(),
        message,
    }
}
