/// COINPRESS: CONTENT COIN ENGINE
///
/// This crate implements the economic core of a content coin platform:
/// - A factory deploys one token+exchange pair per published content item,
///   charges a flat deployment fee, and keeps the append-only registry
/// - Each exchange prices buys and sells against a linear bonding curve,
///   minting and burning its paired token to back every trade
/// - Trading fees accrue into withdrawable creator and platform balances,
///   conserved exactly across arbitrary trade/withdrawal interleavings
///
/// All arithmetic is integer fixed-point (wei / 10^18 base units) with
/// documented round-down behavior; the round-trip and fee-conservation
/// guarantees depend on that determinism.

pub mod curve;
pub mod exchange;
pub mod factory;
pub mod token;
pub mod types;

// Re-export key types for easy access
pub use curve::{CurveError, CurveParams, LinearCurve, DEFAULT_BASE_PRICE, DEFAULT_SLOPE};
pub use exchange::{
    BondingCurveExchange, BuyQuote, ExchangeError, ExchangeEvent, FeeBeneficiary, SellQuote,
    CREATOR_FEE_SHARE_BPS, TRADE_FEE_BPS,
};
pub use factory::{
    BondingCurveFactory, CoinIdSource, CoinRecord, FactoryError, FactoryEvent, IdSequence,
    DEFAULT_DEPLOYMENT_FEE,
};
pub use token::{CoinMetadata, ContentToken, TokenError};
pub use types::{Address, BPS_DENOMINATOR, WAD};
