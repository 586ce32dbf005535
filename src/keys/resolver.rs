use std::time::Duration;

use crate::directory::session::Selection;
use crate::directory::{Directory, DirectoryError, IdentityId, DEFAULT_TIMEOUT};

use super::recipient::{KeyError, Recipient};

#[derive(Debug, thiserror::Error)]
pub enum ResolutionCause {
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("no public keys registered")]
    NoKeys,

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Why one selected user (or one of their keys) could not be used.
#[derive(Debug, thiserror::Error)]
#[error("user {identity}: {cause}")]
pub struct ResolutionError {
    pub identity: IdentityId,
    #[source]
    pub cause: ResolutionCause,
}

/// Outcome of resolving a selection: every usable key plus every failure.
#[derive(Debug, Default)]
pub struct Resolution {
    pub recipients: Vec<Recipient>,
    pub errors: Vec<ResolutionError>,
}

/// Turns selected users into recipients, one directory call at a time.
pub struct Resolver<'a> {
    directory: &'a dyn Directory,
    timeout: Duration,
}

impl<'a> Resolver<'a> {
    pub fn new(directory: &'a dyn Directory) -> Self {
        Self {
            directory,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Per-request deadline for `fetch_keys`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch and parse keys for every selected user. Never aborts: a failing user or
    /// key is recorded and the rest are still processed.
    pub async fn resolve(&self, selection: &Selection) -> Resolution {
        let mut resolution = Resolution::default();

        for identity in selection.iter() {
            let keys = match self.fetch(identity).await {
                Ok(keys) => keys,
                Err(e) => {
                    resolution.errors.push(ResolutionError {
                        identity,
                        cause: e.into(),
                    });
                    continue;
                }
            };

            if keys.is_empty() {
                resolution.errors.push(ResolutionError {
                    identity,
                    cause: ResolutionCause::NoKeys,
                });
                continue;
            }

            for key in &keys {
                match Recipient::parse(key) {
                    Ok(recipient) => resolution.recipients.push(recipient),
                    Err(e) => resolution.errors.push(ResolutionError {
                        identity,
                        cause: e.into(),
                    }),
                }
            }
        }

        resolution
    }

    async fn fetch(&self, identity: IdentityId) -> Result<Vec<String>, DirectoryError> {
        tokio::time::timeout(self.timeout, self.directory.fetch_keys(identity))
            .await
            .map_err(|_| DirectoryError::Timeout(self.timeout))?
    }
}

/// Resolve `selection` against `directory` with the default timeout.
pub async fn resolve(directory: &dyn Directory, selection: &Selection) -> Resolution {
    Resolver::new(directory).resolve(selection).await
}
