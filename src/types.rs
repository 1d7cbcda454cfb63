/// SHARED VALUE TYPES
///
/// Addresses identify every actor in the system: creators, buyers, the
/// platform, and the deployed token/exchange instances themselves. Amounts
/// are plain `u128` fixed-point values; no floating point is used anywhere
/// in the accounting path.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Fixed-point scale: 1 whole token = 10^18 base units, 1 ether = 10^18 wei.
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Basis-point denominator used by every fee rate in the crate.
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Opaque 20-byte account identity.
///
/// Handles for deployed tokens and exchanges are also addresses, derived
/// deterministically by the factory (see [`Address::derive`]) so that two
/// deployments can never collide even with identical metadata.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub fn new(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Derive a fresh handle from a domain tag, the deploying factory's
    /// owner, and the assigned coin id.
    ///
    /// Sha256 over (tag || owner || coin_id) truncated to 20 bytes. The tag
    /// separates the token handle from the exchange handle of the same coin.
    pub fn derive(tag: &str, owner: &Address, coin_id: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(tag.as_bytes());
        hasher.update(owner.0);
        hasher.update(coin_id.to_le_bytes());
        let digest = hasher.finalize();
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest[..20]);
        Address(out)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid address literal: {0}")]
pub struct AddressParseError(String);

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw).map_err(|_| AddressParseError(s.to_string()))?;
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| AddressParseError(s.to_string()))?;
        Ok(Address(arr))
    }
}

// Addresses serialize as 0x-prefixed hex so registry snapshots stay readable
// and usable as JSON map keys.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
