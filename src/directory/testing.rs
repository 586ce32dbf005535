//! In-memory directory for tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{Directory, DirectoryError, Identity, IdentityId};

#[derive(Default)]
pub struct MemoryDirectory {
    users: BTreeMap<IdentityId, (String, Vec<String>)>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, id: IdentityId, username: &str, keys: Vec<String>) -> Self {
        self.users.insert(id, (username.to_string(), keys));
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn list_identities(&self) -> Result<Vec<Identity>, DirectoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut users: Vec<Identity> = self
            .users
            .iter()
            .map(|(id, (username, _))| Identity {
                id: *id,
                username: username.clone(),
            })
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn fetch_keys(&self, id: IdentityId) -> Result<Vec<String>, DirectoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.users.get(&id) {
            Some((_, keys)) => Ok(keys.clone()),
            None => Err(DirectoryError::Status {
                status: reqwest::StatusCode::NOT_FOUND,
                url: format!("memory:///users/{}/keys", id),
            }),
        }
    }
}
