use std::io::{Read, Write};

use age::armor::{ArmoredReader, ArmoredWriter, Format};

use super::armor::Envelope;
use crate::keys::{Recipient, UnlockedIdentity};

#[derive(Debug, thiserror::Error)]
pub enum EncryptError {
    #[error("at least one recipient is required for encryption")]
    NoRecipients,

    #[error("unsupported recipient key type: {0}")]
    UnsupportedKeyType(String),

    #[error("failed to write envelope: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DecryptError {
    #[error("malformed envelope: {0}")]
    Malformed(String),

    #[error("this key is not a recipient of the envelope")]
    NotARecipient,

    #[error("envelope failed authentication (altered or truncated)")]
    Tampered,
}

/// Encrypt `plaintext` so that any one of `recipients` can open it.
///
/// A fresh file key is generated on every call and wrapped once per recipient, so
/// encrypting the same input twice gives different envelopes.
pub fn encrypt(plaintext: &[u8], recipients: &[Recipient]) -> Result<Envelope, EncryptError> {
    if recipients.is_empty() {
        return Err(EncryptError::NoRecipients);
    }

    let encryptor = age::Encryptor::with_recipients(recipients.iter().map(Recipient::as_age))
        .map_err(|e| match e {
            age::EncryptError::Io(e) => EncryptError::Io(e),
            other => EncryptError::UnsupportedKeyType(other.to_string()),
        })?;

    let mut armored = vec![];
    let output = ArmoredWriter::wrap_output(&mut armored, Format::AsciiArmor)?;
    let mut writer = encryptor.wrap_output(output)?;
    writer.write_all(plaintext)?;
    writer.finish().and_then(|armor| armor.finish())?;

    let text = String::from_utf8(armored)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    Ok(Envelope::from_armored(text))
}

/// Recover the plaintext of `envelope` with `identity`.
pub fn decrypt(envelope: &Envelope, identity: &UnlockedIdentity) -> Result<Vec<u8>, DecryptError> {
    let mut binary = vec![];
    ArmoredReader::new(envelope.as_str().as_bytes())
        .read_to_end(&mut binary)
        .map_err(|e| DecryptError::Malformed(e.to_string()))?;

    let decryptor = age::Decryptor::new(&binary[..])
        .map_err(|e| DecryptError::Malformed(e.to_string()))?;

    let mut reader = decryptor
        .decrypt(std::iter::once(identity.as_age()))
        .map_err(|e| match e {
            age::DecryptError::NoMatchingKeys => DecryptError::NotARecipient,
            age::DecryptError::InvalidMac | age::DecryptError::DecryptionFailed => {
                DecryptError::Tampered
            }
            other => DecryptError::Malformed(other.to_string()),
        })?;

    let mut plaintext = vec![];
    reader
        .read_to_end(&mut plaintext)
        .map_err(|_| DecryptError::Tampered)?;

    Ok(plaintext)
}

/// Parse armored text and decrypt it in one step.
pub fn decrypt_text(text: &str, identity: &UnlockedIdentity) -> Result<Vec<u8>, DecryptError> {
    decrypt(&Envelope::parse(text)?, identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::armor::{BEGIN_MARKER, END_MARKER};
    use crate::keys::testkeys::SshKey;

    fn ssh_pair(comment: &str) -> (Recipient, UnlockedIdentity) {
        let key = SshKey::generate(comment);
        let recipient = Recipient::parse(&key.public).unwrap();
        let identity = age::ssh::Identity::from_buffer(key.private.as_bytes(), None).unwrap();
        (recipient, UnlockedIdentity::Ssh(identity))
    }

    fn age_pair() -> (Recipient, UnlockedIdentity) {
        let identity = age::x25519::Identity::generate();
        let recipient = Recipient::parse(&identity.to_public().to_string()).unwrap();
        (recipient, identity.into())
    }

    /// De-armor, flip one byte of the binary age file, re-armor.
    fn flip_byte(envelope: &Envelope, index: usize) -> Envelope {
        let mut binary = vec![];
        ArmoredReader::new(envelope.as_str().as_bytes())
            .read_to_end(&mut binary)
            .unwrap();
        binary[index] ^= 0x01;

        let mut out = vec![];
        let mut writer = ArmoredWriter::wrap_output(&mut out, Format::AsciiArmor).unwrap();
        writer.write_all(&binary).unwrap();
        writer.finish().unwrap();
        Envelope::parse(std::str::from_utf8(&out).unwrap()).unwrap()
    }

    /// Offset of the first payload byte (just past the `--- <mac>` line).
    fn body_start(envelope: &Envelope) -> (usize, usize) {
        let mut binary = vec![];
        ArmoredReader::new(envelope.as_str().as_bytes())
            .read_to_end(&mut binary)
            .unwrap();
        let mac_line = binary.windows(5).position(|w| w == b"\n--- ").unwrap() + 1;
        let newline = binary[mac_line..].iter().position(|b| *b == b'\n').unwrap();
        (mac_line + newline + 1, binary.len())
    }

    #[test]
    fn armored_with_fixed_markers() {
        let (recipient, _) = ssh_pair("alice@laptop");
        let envelope = encrypt(b"hello", &[recipient]).unwrap();
        let text = envelope.as_str();

        assert!(text.starts_with(BEGIN_MARKER));
        assert!(text.trim_end().ends_with(END_MARKER));
        assert!(text.lines().all(|l| l.len() <= 64 || l.starts_with("-----")));
    }

    #[test]
    fn round_trip_every_recipient() {
        let (r1, id1) = ssh_pair("alice@laptop");
        let (r2, id2) = ssh_pair("alice@desktop");
        let (r3, id3) = age_pair();
        let plaintext = b"DATABASE_URL=postgres://db/prod\n";

        let envelope = encrypt(plaintext, &[r1, r2, r3]).unwrap();
        for identity in [&id1, &id2, &id3] {
            assert_eq!(decrypt(&envelope, identity).unwrap(), plaintext);
        }
    }

    #[test]
    fn round_trip_empty_plaintext() {
        let (recipient, identity) = ssh_pair("alice@laptop");
        let envelope = encrypt(b"", &[recipient]).unwrap();
        assert!(decrypt(&envelope, &identity).unwrap().is_empty());
    }

    #[test]
    fn non_recipient_rejected() {
        let (recipient, _) = ssh_pair("alice@laptop");
        let (_, outsider) = ssh_pair("mallory@evil");
        let (_, age_outsider) = age_pair();

        let envelope = encrypt(b"secret", &[recipient]).unwrap();
        assert!(matches!(
            decrypt(&envelope, &outsider),
            Err(DecryptError::NotARecipient)
        ));
        assert!(matches!(
            decrypt(&envelope, &age_outsider),
            Err(DecryptError::NotARecipient)
        ));
    }

    #[test]
    fn fresh_randomness_every_call() {
        let (recipient, _) = ssh_pair("alice@laptop");
        let a = encrypt(b"same", &[recipient.clone()]).unwrap();
        let b = encrypt(b"same", &[recipient]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_recipients_refused() {
        assert!(matches!(encrypt(b"x", &[]), Err(EncryptError::NoRecipients)));
    }

    #[test]
    fn no_plaintext_in_output() {
        let (recipient, _) = age_pair();
        let envelope = encrypt(b"sk_live_should_not_appear", &[recipient]).unwrap();
        assert!(!envelope.as_str().contains("sk_live_should_not_appear"));
    }

    #[test]
    fn any_body_byte_flip_is_tampering() {
        let (recipient, identity) = ssh_pair("alice@laptop");
        let envelope = encrypt(b"attack at dawn", &[recipient]).unwrap();
        let (start, end) = body_start(&envelope);
        assert!(end > start);

        for index in start..end {
            let tampered = flip_byte(&envelope, index);
            assert!(
                matches!(decrypt(&tampered, &identity), Err(DecryptError::Tampered)),
                "byte {} not detected",
                index
            );
        }
    }

    #[test]
    fn header_mac_flip_is_tampering() {
        let (recipient, identity) = ssh_pair("alice@laptop");
        let envelope = encrypt(b"attack at dawn", &[recipient]).unwrap();
        let (start, _) = body_start(&envelope);

        // Last base64 character of the header MAC, just before its newline.
        let tampered = flip_byte(&envelope, start - 2);
        assert!(decrypt(&tampered, &identity).is_err());
    }

    #[test]
    fn truncated_body_is_tampering() {
        let (recipient, identity) = ssh_pair("alice@laptop");
        let envelope = encrypt(&[7u8; 200], &[recipient]).unwrap();

        let mut binary = vec![];
        ArmoredReader::new(envelope.as_str().as_bytes())
            .read_to_end(&mut binary)
            .unwrap();
        binary.truncate(binary.len() - 10);
        let mut out = vec![];
        let mut writer = ArmoredWriter::wrap_output(&mut out, Format::AsciiArmor).unwrap();
        writer.write_all(&binary).unwrap();
        writer.finish().unwrap();
        let truncated = Envelope::parse(std::str::from_utf8(&out).unwrap()).unwrap();

        assert!(matches!(
            decrypt(&truncated, &identity),
            Err(DecryptError::Tampered)
        ));
    }

    #[test]
    fn garbage_between_markers_is_malformed() {
        let (_, identity) = ssh_pair("alice@laptop");
        let text = format!("{}\n!!!not base64!!!\n{}\n", BEGIN_MARKER, END_MARKER);
        assert!(matches!(
            decrypt_text(&text, &identity),
            Err(DecryptError::Malformed(_))
        ));
        assert!(matches!(
            decrypt_text("not an envelope", &identity),
            Err(DecryptError::Malformed(_))
        ));
    }
}
