//! Ether ⇄ wei conversion for the user-facing boundary.
//!
//! Everything below the wallet surface works in wei.

use alloy::primitives::utils::{
    format_ether as alloy_format_ether, parse_ether as alloy_parse_ether,
};
use alloy::primitives::U256;

use crate::error::{WalletError, WalletResult};

/// Parse a decimal ether amount such as `"0.25"` into wei.
pub fn parse_ether(amount: &str) -> WalletResult<U256> {
    let trimmed = amount.trim();
    if trimmed.is_empty() || trimmed.starts_with('-') {
        return Err(WalletError::Validation(format!("Invalid amount: '{}'", amount)));
    }
    alloy_parse_ether(trimmed)
        .map_err(|e| WalletError::Validation(format!("Invalid amount '{}': {}", amount, e)))
}

/// Render wei as a decimal ether string.
pub fn format_ether(wei: U256) -> String {
    alloy_format_ether(wei)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ether() {
        assert_eq!(parse_ether("1").unwrap(), U256::from(10u64).pow(U256::from(18u64)));
        assert_eq!(parse_ether("0.5").unwrap(), U256::from(500_000_000_000_000_000u64));
        assert_eq!(parse_ether("0").unwrap(), U256::ZERO);
        assert!(parse_ether("").is_err());
        assert!(parse_ether("-1").is_err());
        assert!(parse_ether("abc").is_err());
    }

    #[test]
    fn test_format_ether() {
        assert!(format_ether(U256::from(1_500_000_000_000_000_000u64)).starts_with("1.5"));
    }
}
