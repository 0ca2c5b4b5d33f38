//! Conversion between whole units (ether-style decimal strings) and wei.

use alloy::primitives::utils::{format_ether, parse_ether};
use alloy::primitives::U256;
use eyre::{eyre, Result};

use crate::math::Amount;

/// Parses a decimal string such as `"1.8"` into wei.
///
/// # Errors
/// * If the string is not a valid decimal with at most 18 fractional digits
/// * If the amount does not fit in 128 bits
pub fn to_wei(value: &str) -> Result<Amount> {
    let wei = parse_ether(value).map_err(|err| eyre!("invalid amount {value:?}: {err}"))?;
    Amount::try_from(wei).map_err(|_| eyre!("amount {value} does not fit in 128 bits"))
}

/// Formats wei as whole units with trailing zeros removed, e.g. `"11"` or
/// `"0.90909090909090909"`.
#[must_use]
pub fn from_wei(amount: Amount) -> String {
    let formatted = format_ether(U256::from(amount));
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_to_wei() {
        assert_eq!(to_wei("1").unwrap(), 1_000_000_000_000_000_000);
        assert_eq!(to_wei("1.8").unwrap(), 1_800_000_000_000_000_000);
        assert_eq!(to_wei("0").unwrap(), 0);
        assert!(to_wei("one").is_err());
    }

    #[test]
    fn test_from_wei() {
        for (wei, expected) in &[
            (1_818_181_818_181_818_181_u128, "1.818181818181818181"),
            (909_090_909_090_909_090, "0.90909090909090909"),
            (11_000_000_000_000_000_000, "11"),
            (18_181_818_181_818_181_819, "18.181818181818181819"),
            (0, "0"),
        ] {
            assert_eq!(from_wei(*wei), *expected);
        }
    }
}
