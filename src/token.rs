/// CONTENT TOKEN LEDGER
///
/// One fungible balance map per published content item. Supply changes only
/// through its paired exchange: the minter address is fixed at construction
/// and every mint/burn call authenticates against it. Transfers between
/// holders are unrestricted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::types::Address;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("caller is not the paired exchange")]
    Unauthorized,
    #[error("balance too low: have {available}, need {required}")]
    InsufficientBalance { available: u128, required: u128 },
    #[error("burn exceeds total supply")]
    InsufficientSupply,
}

/// Display metadata for one content coin. The content URI is an opaque
/// pointer into external storage; it is never validated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinMetadata {
    pub name: String,
    pub symbol: String,
    pub content_uri: String,
}

impl CoinMetadata {
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        content_uri: impl Into<String>,
    ) -> Self {
        CoinMetadata {
            name: name.into(),
            symbol: symbol.into(),
            content_uri: content_uri.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentToken {
    address: Address,
    metadata: CoinMetadata,
    /// The paired exchange. Immutable; the only caller allowed to mint/burn.
    minter: Address,
    total_supply: u128,
    balances: HashMap<Address, u128>,
}

impl ContentToken {
    pub fn new(address: Address, metadata: CoinMetadata, minter: Address) -> Self {
        ContentToken {
            address,
            metadata,
            minter,
            total_supply: 0,
            balances: HashMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn symbol(&self) -> &str {
        &self.metadata.symbol
    }

    pub fn content_uri(&self) -> &str {
        &self.metadata.content_uri
    }

    pub fn metadata(&self) -> &CoinMetadata {
        &self.metadata
    }

    pub fn minter(&self) -> Address {
        self.minter
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn balance_of(&self, holder: &Address) -> u128 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    /// Mint `amount` to `to`. Only the paired exchange may call this.
    pub fn mint(&mut self, caller: Address, to: Address, amount: u128) -> Result<(), TokenError> {
        if caller != self.minter {
            return Err(TokenError::Unauthorized);
        }
        self.total_supply = self.total_supply.saturating_add(amount);
        *self.balances.entry(to).or_insert(0) += amount;
        Ok(())
    }

    /// Burn `amount` from `from`. Only the paired exchange may call this.
    pub fn burn(&mut self, caller: Address, from: Address, amount: u128) -> Result<(), TokenError> {
        if caller != self.minter {
            return Err(TokenError::Unauthorized);
        }
        let available = self.balance_of(&from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                available,
                required: amount,
            });
        }
        if self.total_supply < amount {
            return Err(TokenError::InsufficientSupply);
        }
        self.total_supply -= amount;
        if available == amount {
            self.balances.remove(&from);
        } else {
            self.balances.insert(from, available - amount);
        }
        Ok(())
    }

    /// Standard holder-to-holder transfer.
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let available = self.balance_of(&from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                available,
                required: amount,
            });
        }
        if from == to || amount == 0 {
            return Ok(());
        }
        self.balances.insert(from, available - amount);
        *self.balances.entry(to).or_insert(0) += amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WAD;

    fn addr(n: u8) -> Address {
        Address::new([n; 20])
    }

    fn test_token() -> ContentToken {
        let metadata = CoinMetadata::new("Test Content", "TEST", "ipfs://test-hash");
        ContentToken::new(addr(10), metadata, addr(99))
    }

    #[test]
    fn test_mint_requires_paired_exchange() {
        let mut token = test_token();
        assert_eq!(
            token.mint(addr(1), addr(2), WAD),
            Err(TokenError::Unauthorized)
        );
        assert_eq!(token.total_supply(), 0);

        assert!(token.mint(addr(99), addr(2), WAD).is_ok());
        assert_eq!(token.total_supply(), WAD);
        assert_eq!(token.balance_of(&addr(2)), WAD);
    }

    #[test]
    fn test_burn_requires_paired_exchange_and_balance() {
        let mut token = test_token();
        token.mint(addr(99), addr(2), 5 * WAD).unwrap();

        assert_eq!(
            token.burn(addr(2), addr(2), WAD),
            Err(TokenError::Unauthorized)
        );
        assert_eq!(
            token.burn(addr(99), addr(2), 6 * WAD),
            Err(TokenError::InsufficientBalance {
                available: 5 * WAD,
                required: 6 * WAD,
            })
        );

        token.burn(addr(99), addr(2), 2 * WAD).unwrap();
        assert_eq!(token.total_supply(), 3 * WAD);
        assert_eq!(token.balance_of(&addr(2)), 3 * WAD);
    }

    #[test]
    fn test_transfer_moves_balance() {
        let mut token = test_token();
        token.mint(addr(99), addr(2), 4 * WAD).unwrap();

        token.transfer(addr(2), addr(3), WAD).unwrap();
        assert_eq!(token.balance_of(&addr(2)), 3 * WAD);
        assert_eq!(token.balance_of(&addr(3)), WAD);
        // Supply is untouched by transfers.
        assert_eq!(token.total_supply(), 4 * WAD);
    }

    #[test]
    fn test_transfer_rejects_overdraw() {
        let mut token = test_token();
        token.mint(addr(99), addr(2), WAD).unwrap();
        let result = token.transfer(addr(2), addr(3), 2 * WAD);
        assert_eq!(
            result,
            Err(TokenError::InsufficientBalance {
                available: WAD,
                required: 2 * WAD,
            })
        );
        // Failed transfer leaves both balances unchanged.
        assert_eq!(token.balance_of(&addr(2)), WAD);
        assert_eq!(token.balance_of(&addr(3)), 0);
    }

    #[test]
    fn test_self_transfer_is_a_no_op() {
        let mut token = test_token();
        token.mint(addr(99), addr(2), WAD).unwrap();
        token.transfer(addr(2), addr(2), WAD).unwrap();
        assert_eq!(token.balance_of(&addr(2)), WAD);
    }
}
