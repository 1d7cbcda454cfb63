/// BONDING CURVE EXCHANGE
///
/// Trade settlement for exactly one content token. The exchange owns its
/// token (the mint/burn capability is wired once at construction and never
/// rebound), prices trades against a linear curve, holds the pooled reserve,
/// and accrues withdrawable creator/platform fee balances.
///
/// Every public operation is a single atomic transition: all preconditions
/// are checked before the first state write, so a failed call leaves the
/// (reserve, supply, volume, fees) tuple untouched. Withdrawals zero the
/// accrual before the amount is surrendered to the caller.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::curve::{CurveError, CurveParams, LinearCurve};
use crate::token::{CoinMetadata, ContentToken, TokenError};
use crate::types::{Address, BPS_DENOMINATOR, WAD};

/// Total fee withheld from every trade: 5% of gross value.
pub const TRADE_FEE_BPS: u128 = 500;

/// Creator's share of the withheld fee, in basis points of the fee itself.
/// The integer-truncation remainder of the split goes to the platform, so
/// the two accruals always grow by exactly the withheld amount.
pub const CREATOR_FEE_SHARE_BPS: u128 = 5_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("trade amount is zero")]
    ZeroAmount,
    #[error("trade amount rounds to zero tokens")]
    AmountTooSmall,
    #[error("balance too low: have {available}, need {required}")]
    InsufficientBalance { available: u128, required: u128 },
    #[error("sell of {requested} exceeds circulating supply {circulating}")]
    InsufficientSupply { circulating: u128, requested: u128 },
    #[error("caller is not the registered creator")]
    NotCreator,
    #[error("caller is not the registered platform")]
    NotPlatform,
    #[error("no fees available to withdraw")]
    NoFeesAvailable,
    #[error(transparent)]
    Curve(#[from] CurveError),
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Advisory buy estimate. May be stale by the time a buy executes if another
/// trade lands first; callers must tolerate that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyQuote {
    pub tokens_out: u128,
    pub fees: u128,
}

/// Advisory sell estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellQuote {
    pub eth_out: u128,
    pub fees: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeBeneficiary {
    Creator,
    Platform,
}

/// Append-only trade record, standing in for on-chain event emission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangeEvent {
    TokensBought {
        buyer: Address,
        reserve_in: u128,
        tokens_out: u128,
        new_price: u128,
    },
    TokensSold {
        seller: Address,
        tokens_in: u128,
        eth_out: u128,
        new_price: u128,
    },
    FeesWithdrawn {
        recipient: Address,
        beneficiary: FeeBeneficiary,
        amount: u128,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondingCurveExchange {
    address: Address,
    creator: Address,
    platform: Address,
    curve: LinearCurve,
    token: ContentToken,
    reserve_balance: u128,
    total_volume: u128,
    creator_fees: u128,
    platform_fees: u128,
    events: Vec<ExchangeEvent>,
}

/// Exact floor(amount * bps / 10_000) without intermediate overflow.
fn bps_share(amount: u128, bps: u128) -> u128 {
    amount / BPS_DENOMINATOR * bps + amount % BPS_DENOMINATOR * bps / BPS_DENOMINATOR
}

impl BondingCurveExchange {
    pub fn new(
        address: Address,
        creator: Address,
        platform: Address,
        params: CurveParams,
        token_address: Address,
        metadata: CoinMetadata,
    ) -> Result<Self, CurveError> {
        let curve = LinearCurve::new(params)?;
        let token = ContentToken::new(token_address, metadata, address);
        Ok(BondingCurveExchange {
            address,
            creator,
            platform,
            curve,
            token,
            reserve_balance: 0,
            total_volume: 0,
            creator_fees: 0,
            platform_fees: 0,
            events: Vec::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn creator(&self) -> Address {
        self.creator
    }

    pub fn platform(&self) -> Address {
        self.platform
    }

    pub fn token(&self) -> &ContentToken {
        &self.token
    }

    pub fn reserve_balance(&self) -> u128 {
        self.reserve_balance
    }

    pub fn circulating_supply(&self) -> u128 {
        self.token.total_supply()
    }

    pub fn total_volume(&self) -> u128 {
        self.total_volume
    }

    pub fn creator_fees(&self) -> u128 {
        self.creator_fees
    }

    pub fn platform_fees(&self) -> u128 {
        self.platform_fees
    }

    pub fn events(&self) -> &[ExchangeEvent] {
        &self.events
    }

    /// Marginal price at the current supply. Pure read.
    pub fn current_price(&self) -> u128 {
        self.curve.spot_price(self.token.total_supply())
    }

    /// Spot price times circulating supply. Saturates at `u128::MAX`.
    pub fn market_cap(&self) -> u128 {
        let cap = BigUint::from(self.current_price())
            * BigUint::from(self.token.total_supply())
            / BigUint::from(WAD);
        u128::try_from(cap).unwrap_or(u128::MAX)
    }

    /// Tokens received for `reserve_in` wei at the current supply, after
    /// the trade fee is withheld from the gross amount.
    pub fn buy_quote(&self, reserve_in: u128) -> Result<BuyQuote, ExchangeError> {
        if reserve_in == 0 {
            return Err(ExchangeError::ZeroAmount);
        }
        let fees = bps_share(reserve_in, TRADE_FEE_BPS);
        let net = reserve_in - fees;
        let tokens_out = self
            .curve
            .tokens_for_reserve(self.token.total_supply(), net)?;
        Ok(BuyQuote { tokens_out, fees })
    }

    /// Wei received for selling `tokens_in` at the current supply, after the
    /// trade fee is withheld from the gross proceeds. Gross proceeds are
    /// clamped to the pooled reserve so rounding can never drive it negative;
    /// that clamp is a defined policy, not an error.
    pub fn sell_quote(&self, tokens_in: u128) -> Result<SellQuote, ExchangeError> {
        if tokens_in == 0 {
            return Err(ExchangeError::ZeroAmount);
        }
        let circulating = self.token.total_supply();
        if tokens_in > circulating {
            return Err(ExchangeError::InsufficientSupply {
                circulating,
                requested: tokens_in,
            });
        }
        let gross = self
            .curve
            .reserve_between(circulating - tokens_in, circulating)?
            .min(self.reserve_balance);
        let fees = bps_share(gross, TRADE_FEE_BPS);
        Ok(SellQuote {
            eth_out: gross - fees,
            fees,
        })
    }

    /// Execute a buy: mint the quoted tokens to `caller`, grow the reserve by
    /// the net amount, and accrue the withheld fee.
    pub fn buy(&mut self, caller: Address, reserve_in: u128) -> Result<BuyQuote, ExchangeError> {
        let quote = self.buy_quote(reserve_in)?;
        if quote.tokens_out == 0 {
            return Err(ExchangeError::AmountTooSmall);
        }

        self.token.mint(self.address, caller, quote.tokens_out)?;
        self.reserve_balance = self
            .reserve_balance
            .saturating_add(reserve_in - quote.fees);
        self.accrue_fees(quote.fees);
        self.total_volume = self.total_volume.saturating_add(reserve_in);

        let new_price = self.current_price();
        self.events.push(ExchangeEvent::TokensBought {
            buyer: caller,
            reserve_in,
            tokens_out: quote.tokens_out,
            new_price,
        });
        tracing::debug!(
            buyer = %caller,
            reserve_in,
            tokens_out = quote.tokens_out,
            new_price,
            "tokens bought"
        );
        Ok(quote)
    }

    /// Execute a sell: burn `tokens_in` from `caller`, release the gross
    /// integral value from the reserve, pay out the net and accrue the fee.
    pub fn sell(&mut self, caller: Address, tokens_in: u128) -> Result<SellQuote, ExchangeError> {
        if tokens_in == 0 {
            return Err(ExchangeError::ZeroAmount);
        }
        let available = self.token.balance_of(&caller);
        if available < tokens_in {
            return Err(ExchangeError::InsufficientBalance {
                available,
                required: tokens_in,
            });
        }
        let quote = self.sell_quote(tokens_in)?;
        let gross = quote.eth_out + quote.fees;

        self.token.burn(self.address, caller, tokens_in)?;
        self.reserve_balance -= gross;
        self.accrue_fees(quote.fees);
        self.total_volume = self.total_volume.saturating_add(gross);

        let new_price = self.current_price();
        self.events.push(ExchangeEvent::TokensSold {
            seller: caller,
            tokens_in,
            eth_out: quote.eth_out,
            new_price,
        });
        tracing::debug!(
            seller = %caller,
            tokens_in,
            eth_out = quote.eth_out,
            new_price,
            "tokens sold"
        );
        Ok(quote)
    }

    /// Pay out the full creator accrual. The balance is zeroed before the
    /// amount is returned so a re-entrant caller observes nothing left.
    pub fn withdraw_creator_fees(&mut self, caller: Address) -> Result<u128, ExchangeError> {
        if caller != self.creator {
            return Err(ExchangeError::NotCreator);
        }
        let amount = self.creator_fees;
        if amount == 0 {
            return Err(ExchangeError::NoFeesAvailable);
        }
        self.creator_fees = 0;
        self.events.push(ExchangeEvent::FeesWithdrawn {
            recipient: caller,
            beneficiary: FeeBeneficiary::Creator,
            amount,
        });
        tracing::info!(recipient = %caller, amount, "creator fees withdrawn");
        Ok(amount)
    }

    /// Pay out the full platform accrual. Same ordering discipline as the
    /// creator withdrawal.
    pub fn withdraw_platform_fees(&mut self, caller: Address) -> Result<u128, ExchangeError> {
        if caller != self.platform {
            return Err(ExchangeError::NotPlatform);
        }
        let amount = self.platform_fees;
        if amount == 0 {
            return Err(ExchangeError::NoFeesAvailable);
        }
        self.platform_fees = 0;
        self.events.push(ExchangeEvent::FeesWithdrawn {
            recipient: caller,
            beneficiary: FeeBeneficiary::Platform,
            amount,
        });
        tracing::info!(recipient = %caller, amount, "platform fees withdrawn");
        Ok(amount)
    }

    /// Split a withheld fee between creator and platform. The truncation
    /// remainder is credited to the platform, keeping the sum of the two
    /// accrual increments exactly equal to `fees`.
    fn accrue_fees(&mut self, fees: u128) {
        let creator_cut = bps_share(fees, CREATOR_FEE_SHARE_BPS);
        self.creator_fees = self.creator_fees.saturating_add(creator_cut);
        self.platform_fees = self.platform_fees.saturating_add(fees - creator_cut);
    }
}
