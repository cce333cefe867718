//! BIP-39 recovery phrases.

use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use crate::keys::KeyError;

/// Words in every phrase this wallet generates or accepts.
pub const MNEMONIC_WORDS: usize = 12;

const ENTROPY_BYTES: usize = 16;

/// A checksum-validated, normalized 12-word recovery phrase.
#[derive(Clone)]
pub struct Mnemonic {
    phrase: SecretString,
}

impl Mnemonic {
    /// Generate a phrase from 128 bits of OS randomness.
    pub fn generate() -> Result<Self, KeyError> {
        let mut entropy = Zeroizing::new([0u8; ENTROPY_BYTES]);
        OsRng.fill_bytes(&mut entropy[..]);

        let mnemonic =
            bip39::Mnemonic::from_entropy(&entropy[..]).map_err(|_| KeyError::InvalidMnemonic)?;
        Ok(Self {
            phrase: SecretString::from(mnemonic.to_string()),
        })
    }

    /// Normalize and validate user-supplied text.
    pub fn parse(text: &str) -> Result<Self, KeyError> {
        let normalized = normalize_phrase(text);
        if normalized.split(' ').count() != MNEMONIC_WORDS {
            return Err(KeyError::InvalidMnemonic);
        }
        bip39::Mnemonic::parse_in_normalized(bip39::Language::English, &normalized)
            .map_err(|_| KeyError::InvalidMnemonic)?;

        Ok(Self {
            phrase: SecretString::from(normalized.as_str().to_owned()),
        })
    }

    /// The normalized phrase. Handle with care.
    pub fn phrase(&self) -> &str {
        self.phrase.expose_secret()
    }

    pub fn word_count(&self) -> usize {
        self.phrase().split(' ').count()
    }
}

impl std::fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mnemonic").field("phrase", &"[REDACTED]").finish()
    }
}

/// Lowercase and collapse all whitespace to single spaces.
pub fn normalize_phrase(text: &str) -> Zeroizing<String> {
    let lowered = Zeroizing::new(text.to_lowercase());
    Zeroizing::new(lowered.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// True iff `text` is a 12-word English phrase with a valid checksum.
pub fn validate_mnemonic(text: &str) -> bool {
    Mnemonic::parse(text).is_ok()
}
