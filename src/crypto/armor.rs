use std::fmt;
use std::str::FromStr;

use super::envelope::DecryptError;

pub const BEGIN_MARKER: &str = "-----BEGIN AGE ENCRYPTED FILE-----";
pub const END_MARKER: &str = "-----END AGE ENCRYPTED FILE-----";

/// An ASCII-armored age file: fixed begin/end lines around 64-column base64.
///
/// Only produced by encryption or by [`Envelope::parse`], so it always carries both
/// markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope(String);

impl Envelope {
    pub(crate) fn from_armored(text: String) -> Self {
        Self(text)
    }

    /// Accept text that is exactly one armored block, ignoring surrounding whitespace.
    pub fn parse(text: &str) -> Result<Self, DecryptError> {
        let text = text.trim();
        if !text.starts_with(BEGIN_MARKER) {
            return Err(DecryptError::Malformed(format!("missing '{}' line", BEGIN_MARKER)));
        }
        if !text.ends_with(END_MARKER) || text.len() < BEGIN_MARKER.len() + END_MARKER.len() {
            return Err(DecryptError::Malformed(format!("missing '{}' line", END_MARKER)));
        }
        Ok(Self(format!("{}\n", text)))
    }

    /// Extract the first armored block embedded in a larger buffer (e.g. the clipboard).
    pub fn find_in(text: &str) -> Option<Self> {
        let start = text.find(BEGIN_MARKER)?;
        let rest = &text[start..];
        let end = rest.find(END_MARKER)? + END_MARKER.len();
        Self::parse(&rest[..end]).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl FromStr for Envelope {
    type Err = DecryptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
