use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use age::secrecy::{ExposeSecret, SecretString};

#[derive(Debug, thiserror::Error)]
pub enum UnlockError {
    /// The passphrase was rejected or the key could not be re-encoded.
    #[error("key transformation was rejected: {0}")]
    Rejected(String),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("temporary key copy: {0}")]
    TempFile(#[source] std::io::Error),
}

/// Removes the passphrase from a private key file in place.
pub trait KeyUnlocker {
    fn unlock(&self, key_file: &Path, passphrase: &SecretString) -> Result<(), UnlockError>;
}

/// Runs `ssh-keygen -p -N "" -f <file>` without a shell.
///
/// On Unix the old passphrase reaches `ssh-keygen` through an `SSH_ASKPASS` helper
/// placed next to the key, so it never appears in the child's argv. Elsewhere it is
/// passed with `-P`.
#[derive(Debug, Clone)]
pub struct SshKeygen {
    program: PathBuf,
}

/// Environment variable the askpass helper echoes back.
#[cfg(unix)]
const PASSPHRASE_ENV: &str = "AGELAB_KEY_PASSPHRASE";

impl Default for SshKeygen {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ssh-keygen"),
        }
    }
}

impl SshKeygen {
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    #[cfg(unix)]
    fn command(&self, key_file: &Path, passphrase: &SecretString) -> Result<Command, UnlockError> {
        let dir = key_file.parent().ok_or_else(|| {
            UnlockError::TempFile(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "key file has no parent directory",
            ))
        })?;
        let askpass = write_askpass(dir).map_err(UnlockError::TempFile)?;

        let mut command = Command::new(&self.program);
        command
            .arg("-p")
            .arg("-N")
            .arg("")
            .arg("-f")
            .arg(key_file)
            .env("SSH_ASKPASS", askpass)
            .env("SSH_ASKPASS_REQUIRE", "force")
            .env(PASSPHRASE_ENV, passphrase.expose_secret());
        // Releases before 8.4 ignore SSH_ASKPASS_REQUIRE and only ask when DISPLAY is set.
        if std::env::var_os("DISPLAY").is_none() {
            command.env("DISPLAY", ":0");
        }
        Ok(command)
    }

    #[cfg(not(unix))]
    fn command(&self, key_file: &Path, passphrase: &SecretString) -> Result<Command, UnlockError> {
        let mut command = Command::new(&self.program);
        command
            .arg("-p")
            .arg("-P")
            .arg(passphrase.expose_secret())
            .arg("-N")
            .arg("")
            .arg("-f")
            .arg(key_file);
        Ok(command)
    }
}

impl KeyUnlocker for SshKeygen {
    fn unlock(&self, key_file: &Path, passphrase: &SecretString) -> Result<(), UnlockError> {
        let output = self
            .command(key_file, passphrase)?
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| UnlockError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(UnlockError::Rejected(stderr.trim().to_string()));
        }
        Ok(())
    }
}

/// Owner-only script that prints the passphrase from the environment.
#[cfg(unix)]
fn write_askpass(dir: &Path) -> std::io::Result<PathBuf> {
    use std::fs::OpenOptions;
    use std::os::unix::fs::OpenOptionsExt;

    let path = dir.join("askpass");
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o700)
        .open(&path)?;
    writeln!(file, "#!/bin/sh\nprintf '%s\\n' \"${}\"", PASSPHRASE_ENV)?;
    file.sync_all()?;
    Ok(path)
}

/// A private, process-owned copy of a key that is removed when dropped.
///
/// The directory is created 0700 and the file 0600; dropping the guard (including
/// during unwinding) deletes both.
pub(crate) struct ScratchKey {
    _dir: tempfile::TempDir,
    path: PathBuf,
}

impl ScratchKey {
    pub(crate) fn create(root: Option<&Path>, content: &[u8]) -> Result<Self, UnlockError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("agelab-key-");
        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(UnlockError::TempFile)?;

        let path = dir.path().join("id");
        write_private(&path, content).map_err(UnlockError::TempFile)?;
        Ok(Self { _dir: dir, path })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn read(&self) -> Result<Vec<u8>, UnlockError> {
        std::fs::read(&self.path).map_err(UnlockError::TempFile)
    }

    #[cfg(test)]
    pub(crate) fn dir(&self) -> &Path {
        self._dir.path()
    }
}

/// Write a file readable only by the owner (0600 on Unix).
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::fs::OpenOptions;
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(path)?;
        file.write_all(content)?;
        file.sync_all()?;
    }
    #[cfg(not(unix))]
    {
        let mut file = std::fs::File::create_new(path)?;
        file.write_all(content)?;
    }
    Ok(())
}
