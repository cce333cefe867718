//! BIP-32/44 key derivation and key pairs.
//!
//! # Security
//! - Private key bytes live in a zeroizing buffer and are never logged
//! - `Debug` output shows only the address

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, B256};
use alloy::signers::local::coins_bip39::English;
use alloy::signers::local::{MnemonicBuilder, PrivateKeySigner};
use zeroize::Zeroizing;

use crate::keys::{KeyError, Mnemonic};

/// SLIP-44 coin type for Ether.
pub const ETHEREUM_COIN_TYPE: u32 = 60;

/// First hardened child index. Every path component must stay below it.
pub const HARDENED_OFFSET: u32 = 1 << 31;

/// One position in the BIP-44 hierarchy: `m/44'/coin'/account'/change/index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DerivationPath {
    pub coin_type: u32,
    pub account: u32,
    pub change: u32,
    pub index: u32,
}

impl DerivationPath {
    /// BIP-44 purpose constant.
    pub const PURPOSE: u32 = 44;

    /// Whether every component fits below [`HARDENED_OFFSET`].
    pub fn is_valid(&self) -> bool {
        [self.coin_type, self.account, self.change, self.index]
            .iter()
            .all(|c| *c < HARDENED_OFFSET)
    }

    /// External chain address `index` of the first Ethereum account.
    pub fn ethereum(index: u32) -> Self {
        Self {
            coin_type: ETHEREUM_COIN_TYPE,
            account: 0,
            change: 0,
            index,
        }
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "m/{}'/{}'/{}'/{}/{}",
            Self::PURPOSE,
            self.coin_type,
            self.account,
            self.change,
            self.index
        )
    }
}

/// A secp256k1 private key and the address it controls.
#[derive(Clone)]
pub struct KeyPair {
    private_key: Zeroizing<[u8; 32]>,
    address: Address,
}

impl KeyPair {
    /// Parse a hex-encoded private key, with or without `0x` prefix.
    pub fn from_private_key_hex(private_key_hex: &str) -> Result<Self, KeyError> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer = PrivateKeySigner::from_str(key_hex)
            .map_err(|e| KeyError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self::from_signer(&signer))
    }

    /// Capture the key held by an alloy signer.
    pub fn from_signer(signer: &PrivateKeySigner) -> Self {
        Self {
            private_key: Zeroizing::new(signer.to_bytes().0),
            address: signer.address(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Rebuild a signer for one signing operation.
    pub fn signer(&self) -> Result<PrivateKeySigner, KeyError> {
        PrivateKeySigner::from_bytes(&B256::from(*self.private_key))
            .map_err(|e| KeyError::InvalidPrivateKey(e.to_string()))
    }

    /// `0x`-prefixed hex of the private key, for encryption at rest.
    pub fn private_key_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("0x{}", hex::encode(&self.private_key[..])))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// Derive the key pair at `m/44'/60'/0'/0/{index}`.
pub fn derive_key_pair(
    mnemonic: &Mnemonic,
    passphrase: Option<&str>,
    index: u32,
) -> Result<KeyPair, KeyError> {
    derive_at_path(mnemonic, passphrase, &DerivationPath::ethereum(index))
}

/// Derive the key pair at an arbitrary BIP-44 path.
pub fn derive_at_path(
    mnemonic: &Mnemonic,
    passphrase: Option<&str>,
    path: &DerivationPath,
) -> Result<KeyPair, KeyError> {
    if !path.is_valid() {
        return Err(KeyError::Derivation(format!("path out of range: {}", path)));
    }

    let mut builder = MnemonicBuilder::<English>::default()
        .phrase(mnemonic.phrase())
        .derivation_path(path.to_string())
        .map_err(|e| KeyError::Derivation(e.to_string()))?;
    if let Some(passphrase) = passphrase.filter(|p| !p.is_empty()) {
        builder = builder.password(passphrase);
    }

    let signer = builder
        .build()
        .map_err(|e| KeyError::Derivation(e.to_string()))?;
    Ok(KeyPair::from_signer(&signer))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Anvil's default development phrase and its first two accounts.
    const DEV_PHRASE: &str = "test test test test test test test test test test test junk";
    const DEV_ADDRESS_0: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
    const DEV_ADDRESS_1: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";
    const DEV_KEY_0: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn dev_mnemonic() -> Mnemonic {
        Mnemonic::parse(DEV_PHRASE).unwrap()
    }

    #[test]
    fn test_path_display() {
        assert_eq!(DerivationPath::ethereum(0).to_string(), "m/44'/60'/0'/0/0");
        assert_eq!(DerivationPath::ethereum(7).to_string(), "m/44'/60'/0'/0/7");
    }

    #[test]
    fn test_out_of_range_index() {
        let mnemonic = dev_mnemonic();
        assert!(!DerivationPath::ethereum(HARDENED_OFFSET).is_valid());
        assert!(matches!(
            derive_key_pair(&mnemonic, None, HARDENED_OFFSET),
            Err(KeyError::Derivation(_))
        ));
    }

    #[test]
    fn test_known_vectors() {
        let mnemonic = dev_mnemonic();
        let k0 = derive_key_pair(&mnemonic, None, 0).unwrap();
        let k1 = derive_key_pair(&mnemonic, None, 1).unwrap();
        assert_eq!(k0.address().to_string().to_lowercase(), DEV_ADDRESS_0);
        assert_eq!(k1.address().to_string().to_lowercase(), DEV_ADDRESS_1);
        assert_eq!(k0.private_key_hex().as_str(), format!("0x{}", DEV_KEY_0));
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let mnemonic = Mnemonic::generate().unwrap();
        let a = derive_key_pair(&mnemonic, None, 3).unwrap();
        let b = derive_key_pair(&mnemonic, None, 3).unwrap();
        assert_eq!(a.address(), b.address());
        assert_eq!(a.private_key_hex().as_str(), b.private_key_hex().as_str());
    }

    #[test]
    fn test_indices_and_passphrases_diverge() {
        let mnemonic = dev_mnemonic();
        let plain = derive_key_pair(&mnemonic, None, 0).unwrap();
        let other_index = derive_key_pair(&mnemonic, None, 2).unwrap();
        let with_passphrase = derive_key_pair(&mnemonic, Some("extra"), 0).unwrap();
        let empty_passphrase = derive_key_pair(&mnemonic, Some(""), 0).unwrap();

        assert_ne!(plain.address(), other_index.address());
        assert_ne!(plain.address(), with_passphrase.address());
        assert_eq!(plain.address(), empty_passphrase.address());
    }

    #[test]
    fn test_private_key_import() {
        let pair = KeyPair::from_private_key_hex(DEV_KEY_0).unwrap();
        assert_eq!(pair.address().to_string().to_lowercase(), DEV_ADDRESS_0);

        let prefixed = KeyPair::from_private_key_hex(&format!("0x{}", DEV_KEY_0)).unwrap();
        assert_eq!(prefixed.address(), pair.address());
        assert_eq!(pair.signer().unwrap().address(), pair.address());
    }

    #[test]
    fn test_invalid_private_key() {
        let result = KeyPair::from_private_key_hex("invalid_key");
        assert!(matches!(result, Err(KeyError::InvalidPrivateKey(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let pair = KeyPair::from_private_key_hex(DEV_KEY_0).unwrap();
        let debug = format!("{:?}", pair);
        assert!(!debug.contains("ac0974bec"));
        assert!(debug.contains("[REDACTED]"));
    }
}
