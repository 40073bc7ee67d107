//! Account identities used for role checks and stake lookups

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// A `0x`-prefixed, 20-byte hex identity, normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| anyhow!("Invalid address (missing 0x prefix): {}", s))?;

        if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow!("Invalid address (expected 40 hex digits): {}", s));
        }

        Ok(Address(format!("0x{}", hex.to_ascii_lowercase())))
    }
}

impl TryFrom<String> for Address {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_case() {
        let address: Address = "0xABCDEF0123456789abcdef0123456789ABCDEF01".parse().unwrap();
        assert_eq!(
            address.as_str(),
            "0xabcdef0123456789abcdef0123456789abcdef01"
        );
        assert_eq!(
            address,
            "0xabcdef0123456789ABCDEF0123456789abcdef01".parse().unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("".parse::<Address>().is_err());
        assert!("abcdef0123456789abcdef0123456789abcdef01".parse::<Address>().is_err());
        assert!("0x1234".parse::<Address>().is_err());
        assert!("0xzzzzzz0123456789abcdef0123456789abcdef01".parse::<Address>().is_err());
    }

    #[test]
    fn test_serde_uses_string_form() {
        let address: Address = "0x00000000000000000000000000000000000000aa".parse().unwrap();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, "\"0x00000000000000000000000000000000000000aa\"");

        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
        assert!(serde_json::from_str::<Address>("\"not-an-address\"").is_err());
    }
}
