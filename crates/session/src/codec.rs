//! Reversible storage obfuscation
//!
//! Every byte of the plain text is XOR-ed with the repeating bytes of a fixed
//! secret and written as two lowercase hex digits. For ASCII input this is
//! identical to the per-character transform used by the dashboard's earlier
//! web client, so previously persisted sessions stay readable.
//!
//! This is obfuscation, not encryption. Anyone who can read the store and
//! knows (or guesses) the secret recovers the session, tokens included. It
//! only keeps tokens out of casual plain-text inspection of storage.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("obfuscation secret is empty")]
    EmptySecret,

    #[error("encoded payload has odd length")]
    OddLength,

    #[error("encoded payload contains a non-hex character {0:?} at index {1}")]
    InvalidHex(char, usize),

    #[error("decoded payload is not valid UTF-8")]
    InvalidUtf8,
}

impl From<hex::FromHexError> for CodecError {
    fn from(err: hex::FromHexError) -> Self {
        match err {
            hex::FromHexError::InvalidHexCharacter { c, index } => Self::InvalidHex(c, index),
            hex::FromHexError::OddLength | hex::FromHexError::InvalidStringLength => {
                Self::OddLength
            }
        }
    }
}

/// XOR transform keyed by a fixed secret
#[derive(Clone)]
pub struct Obfuscator {
    secret: Vec<u8>,
}

impl std::fmt::Debug for Obfuscator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Obfuscator")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Obfuscator {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, CodecError> {
        let secret = secret.as_ref().to_vec();
        if secret.is_empty() {
            return Err(CodecError::EmptySecret);
        }
        Ok(Self { secret })
    }

    fn xor(&self, bytes: &mut [u8]) {
        for (byte, key) in bytes.iter_mut().zip(self.secret.iter().cycle()) {
            *byte ^= key;
        }
    }

    /// Obfuscate `plain` into a hex string
    pub fn encode(&self, plain: &str) -> String {
        let mut bytes = plain.as_bytes().to_vec();
        self.xor(&mut bytes);
        hex::encode(bytes)
    }

    /// Reverse [`Obfuscator::encode`]
    pub fn decode(&self, encoded: &str) -> Result<String, CodecError> {
        let mut bytes = hex::decode(encoded.trim())?;
        self.xor(&mut bytes);
        String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)
    }
}
