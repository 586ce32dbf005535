use std::fmt;
use std::str::FromStr;

/// A public key that could not be turned into a [`Recipient`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("unsupported key type '{0}'")]
    UnsupportedKeyType(String),

    #[error("malformed public key: {0}")]
    Malformed(String),
}

#[derive(Clone)]
enum Kind {
    /// `ssh-ed25519` or `ssh-rsa`.
    Ssh(age::ssh::Recipient),
    /// Native age X25519 key (`age1...`).
    X25519(age::x25519::Recipient),
}

/// A single parsed public key, ready to receive a wrapped file key.
#[derive(Clone)]
pub struct Recipient {
    source: String,
    kind: Kind,
}

impl Recipient {
    /// Parse a public key as published by the directory (`ssh-ed25519 AAAA... comment`,
    /// `ssh-rsa AAAA...`, or `age1...`).
    pub fn parse(key: &str) -> Result<Self, KeyError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(KeyError::Malformed("empty key".into()));
        }

        let kind = if key.starts_with("age1") {
            let recipient = key
                .parse::<age::x25519::Recipient>()
                .map_err(|e: &str| KeyError::Malformed(e.to_string()))?;
            Kind::X25519(recipient)
        } else {
            let recipient = key.parse::<age::ssh::Recipient>().map_err(|e| match e {
                age::ssh::ParseRecipientKeyError::Unsupported(key_type) => {
                    KeyError::UnsupportedKeyType(key_type)
                }
                _ => KeyError::Malformed("invalid SSH public key".into()),
            })?;
            Kind::Ssh(recipient)
        };

        Ok(Self {
            source: key.to_string(),
            kind,
        })
    }

    /// Key algorithm name, e.g. `ssh-ed25519` or `X25519`.
    pub fn key_type(&self) -> &str {
        match self.kind {
            Kind::Ssh(_) => self.source.split_whitespace().next().unwrap_or("ssh"),
            Kind::X25519(_) => "X25519",
        }
    }

    pub(crate) fn as_age(&self) -> &dyn age::Recipient {
        match &self.kind {
            Kind::Ssh(r) => r,
            Kind::X25519(r) => r,
        }
    }
}

impl FromStr for Recipient {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl fmt::Debug for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recipient")
            .field("key_type", &self.key_type())
            .field("source", &self.source)
            .finish()
    }
}
