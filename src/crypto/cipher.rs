//! Password-based encryption of secret strings.
//!
//! AES-256-CBC with PKCS#7 padding, keyed by PBKDF2-HMAC-SHA256 over a fresh
//! random salt. An HMAC-SHA256 tag over `iv || ciphertext` makes a wrong
//! password or a flipped byte fail deterministically instead of relying on
//! padding errors alone.

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Lowest PBKDF2 round count accepted for encryption or decryption.
pub const MIN_KDF_ITERATIONS: u32 = 100_000;

const SALT_LEN: usize = 32;
const IV_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Errors from the cipher.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// Any decryption failure. Deliberately carries no detail.
    #[error("wrong password or corrupted data")]
    Decrypt,

    #[error("encryption failed")]
    Encrypt,

    #[error("refusing to encrypt an empty secret")]
    EmptyPlaintext,

    #[error("key derivation needs at least {MIN_KDF_ITERATIONS} iterations, got {0}")]
    WeakKdf(u32),
}

/// Ciphertext plus everything except the password needed to decrypt it.
///
/// All byte fields are hex encoded so the record survives any string-based
/// persistence backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedSecret {
    pub ciphertext: String,
    pub salt: String,
    pub iv: String,
    pub mac: String,
    /// PBKDF2 rounds used for this secret.
    pub iterations: u32,
}

/// Password-based cipher with a fixed work factor.
#[derive(Debug, Clone, Copy)]
pub struct Cipher {
    iterations: u32,
}

impl Default for Cipher {
    fn default() -> Self {
        Self {
            iterations: MIN_KDF_ITERATIONS,
        }
    }
}

impl Cipher {
    /// Create a cipher with the given PBKDF2 round count.
    pub fn new(iterations: u32) -> Result<Self, CipherError> {
        if iterations < MIN_KDF_ITERATIONS {
            return Err(CipherError::WeakKdf(iterations));
        }
        Ok(Self { iterations })
    }

    /// Configured PBKDF2 round count.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Encrypt `plaintext` under `password` with a fresh salt and IV.
    pub fn encrypt(&self, plaintext: &str, password: &str) -> Result<EncryptedSecret, CipherError> {
        if plaintext.is_empty() {
            return Err(CipherError::EmptyPlaintext);
        }

        let mut salt = [0u8; SALT_LEN];
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut iv);

        let keys = derive_keys(password, &salt, self.iterations);
        let (enc_key, mac_key) = keys.split_at(KEY_LEN);

        let ciphertext = Aes256CbcEnc::new_from_slices(enc_key, &iv)
            .map_err(|_| CipherError::Encrypt)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        let mac = tag(mac_key, &iv, &ciphertext)
            .ok_or(CipherError::Encrypt)?
            .finalize()
            .into_bytes();

        Ok(EncryptedSecret {
            ciphertext: hex::encode(&ciphertext),
            salt: hex::encode(salt),
            iv: hex::encode(iv),
            mac: hex::encode(mac),
            iterations: self.iterations,
        })
    }

    /// Decrypt a secret produced by [`Cipher::encrypt`].
    ///
    /// Uses the round count stored in the secret, not the configured one, so
    /// raising the work factor never strands existing vaults.
    pub fn decrypt(
        &self,
        secret: &EncryptedSecret,
        password: &str,
    ) -> Result<SecretString, CipherError> {
        if secret.iterations < MIN_KDF_ITERATIONS {
            return Err(CipherError::Decrypt);
        }

        let salt = hex::decode(&secret.salt).map_err(|_| CipherError::Decrypt)?;
        let iv = hex::decode(&secret.iv).map_err(|_| CipherError::Decrypt)?;
        let ciphertext = hex::decode(&secret.ciphertext).map_err(|_| CipherError::Decrypt)?;
        let expected = hex::decode(&secret.mac).map_err(|_| CipherError::Decrypt)?;
        if iv.len() != IV_LEN || salt.is_empty() || ciphertext.is_empty() {
            return Err(CipherError::Decrypt);
        }

        let keys = derive_keys(password, &salt, secret.iterations);
        let (enc_key, mac_key) = keys.split_at(KEY_LEN);

        tag(mac_key, &iv, &ciphertext)
            .ok_or(CipherError::Decrypt)?
            .verify_slice(&expected)
            .map_err(|_| CipherError::Decrypt)?;

        let plaintext = Zeroizing::new(
            Aes256CbcDec::new_from_slices(enc_key, &iv)
                .map_err(|_| CipherError::Decrypt)?
                .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
                .map_err(|_| CipherError::Decrypt)?,
        );

        let text = std::str::from_utf8(&plaintext).map_err(|_| CipherError::Decrypt)?;
        if text.is_empty() {
            return Err(CipherError::Decrypt);
        }
        Ok(SecretString::from(text.to_owned()))
    }
}

fn derive_keys(password: &str, salt: &[u8], iterations: u32) -> Zeroizing<[u8; 2 * KEY_LEN]> {
    let mut block = Zeroizing::new([0u8; 2 * KEY_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut block[..]);
    block
}

fn tag(mac_key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Option<HmacSha256> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(mac_key).ok()?;
    mac.update(iv);
    mac.update(ciphertext);
    Some(mac)
}
