//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;

use agelab::directory::{Directory, DirectoryError, Identity, IdentityId};
use async_trait::async_trait;

#[path = "../../src/keys/testkeys.rs"]
mod testkeys;

pub use testkeys::SshKey;

/// Fixed roster and keys, no network.
#[derive(Default)]
pub struct StaticDirectory {
    users: BTreeMap<IdentityId, (String, Vec<String>)>,
}

impl StaticDirectory {
    pub fn user(mut self, id: IdentityId, username: &str, keys: Vec<String>) -> Self {
        self.users.insert(id, (username.to_string(), keys));
        self
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn list_identities(&self) -> Result<Vec<Identity>, DirectoryError> {
        Ok(self
            .users
            .iter()
            .map(|(id, (username, _))| Identity {
                id: *id,
                username: username.clone(),
            })
            .collect())
    }

    async fn fetch_keys(&self, id: IdentityId) -> Result<Vec<String>, DirectoryError> {
        self.users
            .get(&id)
            .map(|(_, keys)| keys.clone())
            .ok_or_else(|| DirectoryError::Config(format!("unknown user {}", id)))
    }
}
