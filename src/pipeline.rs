//! Selection in, envelope out.

use std::time::Duration;

use crate::crypto::{self, EncryptError, Envelope};
use crate::directory::session::Selection;
use crate::directory::{Directory, DEFAULT_TIMEOUT};
use crate::keys::{ResolutionError, Resolver};

/// What to do when some selected users could not be resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolutionPolicy {
    /// Encrypt to whatever resolved; report the rest.
    #[default]
    Tolerant,
    /// Refuse to encrypt if anything failed to resolve.
    Strict,
}

#[derive(Debug, thiserror::Error)]
pub enum SealError {
    #[error(transparent)]
    Encrypt(#[from] EncryptError),

    #[error("{} selected key(s) could not be resolved", .0.len())]
    Unresolved(Vec<ResolutionError>),
}

impl SealError {
    /// Resolution failures carried by this error, if any.
    pub fn resolution_errors(&self) -> &[ResolutionError] {
        match self {
            SealError::Unresolved(errors) => errors,
            SealError::Encrypt(_) => &[],
        }
    }
}

#[derive(Debug)]
pub struct Sealed {
    pub envelope: Envelope,
    pub recipient_count: usize,
    /// Failures skipped under [`ResolutionPolicy::Tolerant`].
    pub skipped: Vec<ResolutionError>,
}

pub struct SealOptions {
    pub policy: ResolutionPolicy,
    pub timeout: Duration,
}

impl Default for SealOptions {
    fn default() -> Self {
        Self {
            policy: ResolutionPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Resolve `selection` against `directory` and encrypt `plaintext` to every key found.
///
/// An empty selection fails before any directory call.
pub async fn seal(
    directory: &dyn Directory,
    selection: &Selection,
    plaintext: &[u8],
    options: &SealOptions,
) -> Result<Sealed, SealError> {
    if selection.is_empty() {
        return Err(EncryptError::NoRecipients.into());
    }

    let resolution = Resolver::new(directory)
        .with_timeout(options.timeout)
        .resolve(selection)
        .await;

    if options.policy == ResolutionPolicy::Strict && !resolution.errors.is_empty() {
        return Err(SealError::Unresolved(resolution.errors));
    }
    if resolution.recipients.is_empty() {
        return Err(SealError::Unresolved(resolution.errors));
    }

    let envelope = crypto::encrypt(plaintext, &resolution.recipients)?;
    Ok(Sealed {
        envelope,
        recipient_count: resolution.recipients.len(),
        skipped: resolution.errors,
    })
}
