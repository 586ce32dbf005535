pub mod armor;
pub mod envelope;

pub use armor::Envelope;
pub use envelope::{decrypt, encrypt, DecryptError, EncryptError};
