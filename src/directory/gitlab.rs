use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{Directory, DirectoryError, Identity, IdentityId, DEFAULT_TIMEOUT};

/// Users requested per page of `/api/v4/users`.
const PER_PAGE: usize = 100;

/// GitLab REST API client for the user roster and SSH keys.
pub struct GitLabDirectory {
    base_url: String,
    token: String,
    timeout: Duration,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct KeyEntry {
    key: String,
}

impl GitLabDirectory {
    pub fn new(base_url: &str, token: &str) -> Result<Self, DirectoryError> {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        token: &str,
        timeout: Duration,
    ) -> Result<Self, DirectoryError> {
        if base_url.trim().is_empty() {
            return Err(DirectoryError::Config("GitLab URL is required".into()));
        }
        if token.trim().is_empty() {
            return Err(DirectoryError::Config("GitLab token is required".into()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DirectoryError::Http)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            timeout,
            client,
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, DirectoryError> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Status {
                status,
                url: url.to_string(),
            });
        }

        response.json().await.map_err(|e| self.request_error(e))
    }

    fn request_error(&self, err: reqwest::Error) -> DirectoryError {
        if err.is_timeout() {
            DirectoryError::Timeout(self.timeout)
        } else {
            DirectoryError::Http(err)
        }
    }
}

#[async_trait]
impl Directory for GitLabDirectory {
    async fn list_identities(&self) -> Result<Vec<Identity>, DirectoryError> {
        let mut users = Vec::new();

        for page in 1.. {
            let url = format!(
                "{}/api/v4/users?active=true&humans=true&exclude_external=true&page={}&per_page={}",
                self.base_url, page, PER_PAGE
            );
            let batch: Vec<Identity> = self.get(&url).await?;
            let last = batch.len() < PER_PAGE;
            users.extend(batch);
            if last {
                break;
            }
        }

        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn fetch_keys(&self, id: IdentityId) -> Result<Vec<String>, DirectoryError> {
        let url = format!("{}/api/v4/users/{}/keys", self.base_url, id);
        let entries: Vec<KeyEntry> = self.get(&url).await?;
        Ok(entries.into_iter().map(|k| k.key).collect())
    }
}
