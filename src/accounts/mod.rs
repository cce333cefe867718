//! Catalog of derived accounts.
//!
//! The registry lives only in memory and is rebuilt from the vault on every
//! unlock; it never holds key material, only addresses and indices.

pub mod registry;

pub use registry::{is_address_exists, Account, AccountRegistry, DeriveBatch};
