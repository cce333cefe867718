//! Ordered list of accounts and the next derivation index.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::keys::{derive_key_pair, KeyError, KeyPair, Mnemonic};

/// A derived account as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
    pub display_name: String,
    pub derivation_index: u32,
    /// Seconds since the Unix epoch.
    pub created_at: u64,
}

/// Result of a batch derivation.
///
/// `error` is set when derivation stopped early; `accounts` then holds the
/// pairs derived before the failing index.
#[derive(Debug)]
pub struct DeriveBatch {
    pub accounts: Vec<(Account, KeyPair)>,
    pub error: Option<(u32, KeyError)>,
}

impl DeriveBatch {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// In-memory account registry.
#[derive(Debug, Default)]
pub struct AccountRegistry {
    accounts: Vec<Account>,
    next_index: u32,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `address` at `index`, named `Account {index + 1}`.
    pub fn create_account(&mut self, address: Address, index: u32) -> Account {
        let account = Account {
            address,
            display_name: format!("Account {}", index.saturating_add(1)),
            derivation_index: index,
            created_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        };
        self.accounts.push(account.clone());
        self.next_index = self.next_index.max(index.saturating_add(1));
        account
    }

    /// Derive `count` consecutive key pairs starting at `start_index`.
    ///
    /// A failing index ends the batch; the accounts derived so far are
    /// returned alongside the error. Derived accounts are not registered.
    pub fn derive_many(
        mnemonic: &Mnemonic,
        passphrase: Option<&str>,
        count: u32,
        start_index: u32,
    ) -> DeriveBatch {
        let mut accounts = Vec::with_capacity(count as usize);
        for offset in 0..count {
            let index = start_index.saturating_add(offset);
            match derive_key_pair(mnemonic, passphrase, index) {
                Ok(pair) => {
                    let account = Account {
                        address: pair.address(),
                        display_name: format!("Account {}", index.saturating_add(1)),
                        derivation_index: index,
                        created_at: SystemTime::now()
                            .duration_since(UNIX_EPOCH)
                            .unwrap_or_default()
                            .as_secs(),
                    };
                    accounts.push((account, pair));
                }
                Err(e) => {
                    tracing::warn!(index, error = %e, "Derivation stopped early");
                    return DeriveBatch {
                        accounts,
                        error: Some((index, e)),
                    };
                }
            }
        }
        DeriveBatch {
            accounts,
            error: None,
        }
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn next_index(&self) -> u32 {
        self.next_index
    }

    pub fn get(&self, address: &Address) -> Option<&Account> {
        self.accounts.iter().find(|a| a.address == *address)
    }

    /// Case-insensitive lookup by hex address.
    pub fn is_address_exists(&self, address: &str) -> bool {
        is_address_exists(address, &self.accounts)
    }

    pub fn clear(&mut self) {
        self.accounts.clear();
        self.next_index = 0;
    }
}

/// True iff `address` matches any account's hex address, ignoring case.
pub fn is_address_exists(address: &str, accounts: &[Account]) -> bool {
    let needle = address.trim();
    accounts
        .iter()
        .any(|a| a.address.to_string().eq_ignore_ascii_case(needle))
}
