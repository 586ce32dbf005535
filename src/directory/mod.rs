pub mod gitlab;
pub mod session;
#[cfg(test)]
pub(crate) mod testing;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Stable numeric identifier of a directory user.
pub type IdentityId = u64;

/// Default per-request timeout for directory calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A user registered in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub username: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory request timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("directory returned {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("directory request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("directory is not configured: {0}")]
    Config(String),
}

/// The remote roster of users and their published public keys.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Every active user, sorted by username.
    async fn list_identities(&self) -> Result<Vec<Identity>, DirectoryError>;

    /// Textual public keys registered for one user, in no particular order.
    async fn fetch_keys(&self, id: IdentityId) -> Result<Vec<String>, DirectoryError>;
}
