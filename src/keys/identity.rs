use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use age::secrecy::SecretString;

use super::unlock::{KeyUnlocker, ScratchKey, SshKeygen, UnlockError};

/// A private key ready to unwrap file keys, whether or not it was passphrase
/// protected on disk.
pub enum UnlockedIdentity {
    Ssh(age::ssh::Identity),
    X25519(age::x25519::Identity),
}

impl UnlockedIdentity {
    pub(crate) fn as_age(&self) -> &dyn age::Identity {
        match self {
            UnlockedIdentity::Ssh(id) => id,
            UnlockedIdentity::X25519(id) => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            UnlockedIdentity::Ssh(_) => "ssh",
            UnlockedIdentity::X25519(_) => "X25519",
        }
    }
}

impl From<age::x25519::Identity> for UnlockedIdentity {
    fn from(identity: age::x25519::Identity) -> Self {
        UnlockedIdentity::X25519(identity)
    }
}

impl fmt::Debug for UnlockedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnlockedIdentity({})", self.kind())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read private key '{}': {source}", path.display())]
    CredentialRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("private key is passphrase protected, please provide passphrase")]
    PassphraseRequired,

    #[error("failed to decrypt private key with passphrase: {0}")]
    PassphraseInvalid(String),

    #[error("unsupported private key: {0}")]
    CredentialFormat(String),

    #[error(transparent)]
    Unlock(UnlockError),
}

enum Parsed {
    Unlocked(UnlockedIdentity),
    Locked,
}

/// Reads a private key from disk, unlocking it through a [`KeyUnlocker`] when it is
/// passphrase protected. The original file is never modified.
pub struct IdentityLoader<U = SshKeygen> {
    unlocker: U,
    scratch_root: Option<PathBuf>,
}

impl IdentityLoader<SshKeygen> {
    pub fn new() -> Self {
        Self::with_unlocker(SshKeygen::default())
    }
}

impl Default for IdentityLoader<SshKeygen> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: KeyUnlocker> IdentityLoader<U> {
    pub fn with_unlocker(unlocker: U) -> Self {
        Self {
            unlocker,
            scratch_root: None,
        }
    }

    /// Place the temporary unlocked copy under `root` instead of the system temp dir.
    pub fn scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    pub fn load(
        &self,
        path: &Path,
        passphrase: Option<&SecretString>,
    ) -> Result<UnlockedIdentity, LoadError> {
        let data = std::fs::read(path).map_err(|source| LoadError::CredentialRead {
            path: path.to_path_buf(),
            source,
        })?;

        match parse_credential(&data, path)? {
            Parsed::Unlocked(identity) => Ok(identity),
            Parsed::Locked => match passphrase {
                None => Err(LoadError::PassphraseRequired),
                Some(passphrase) => self.unlock(&data, path, passphrase),
            },
        }
    }

    fn unlock(
        &self,
        data: &[u8],
        path: &Path,
        passphrase: &SecretString,
    ) -> Result<UnlockedIdentity, LoadError> {
        let scratch =
            ScratchKey::create(self.scratch_root.as_deref(), data).map_err(LoadError::Unlock)?;

        self.unlocker
            .unlock(scratch.path(), passphrase)
            .map_err(|e| match e {
                UnlockError::Rejected(reason) => LoadError::PassphraseInvalid(reason),
                other => LoadError::Unlock(other),
            })?;

        let unlocked = scratch.read().map_err(LoadError::Unlock)?;
        drop(scratch);

        match parse_credential(&unlocked, path)? {
            Parsed::Unlocked(identity) => Ok(identity),
            Parsed::Locked => Err(LoadError::CredentialFormat(
                "key is still encrypted after removing passphrase".into(),
            )),
        }
    }
}

/// Read and unlock the private key at `path` with `ssh-keygen`.
pub fn load(
    path: &Path,
    passphrase: Option<&SecretString>,
) -> Result<UnlockedIdentity, LoadError> {
    IdentityLoader::new().load(path, passphrase)
}

fn parse_credential(data: &[u8], path: &Path) -> Result<Parsed, LoadError> {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Some(line) = text
            .lines()
            .map(str::trim)
            .find(|l| l.starts_with("AGE-SECRET-KEY-"))
        {
            let identity = line
                .parse::<age::x25519::Identity>()
                .map_err(|e: &str| LoadError::CredentialFormat(e.to_string()))?;
            return Ok(Parsed::Unlocked(identity.into()));
        }
    }

    let filename = path.display().to_string();
    let identity = age::ssh::Identity::from_buffer(Cursor::new(data), Some(filename))
        .map_err(|e| LoadError::CredentialFormat(e.to_string()))?;

    match identity {
        age::ssh::Identity::Unencrypted(_) => Ok(Parsed::Unlocked(UnlockedIdentity::Ssh(identity))),
        age::ssh::Identity::Encrypted(_) => Ok(Parsed::Locked),
        // Legacy PEM and OpenSSH ciphers age can't open; ssh-keygen can rewrite both.
        age::ssh::Identity::Unsupported(
            age::ssh::UnsupportedKey::EncryptedPem | age::ssh::UnsupportedKey::EncryptedSsh(_),
        ) => Ok(Parsed::Locked),
        age::ssh::Identity::Unsupported(_) => Err(LoadError::CredentialFormat(
            "key type or encryption is not supported".into(),
        )),
    }
}
