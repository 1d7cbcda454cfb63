/// BONDING CURVE FACTORY
///
/// Deploys one (ContentToken, BondingCurveExchange) pair per content item,
/// charges a flat deployment fee, and keeps the append-only registry: global
/// coin count, per-creator coin list, lookup by id. Registry entries are
/// never deleted and the (token, exchange, creator) triple of an entry never
/// changes after deployment.
///
/// Coin ids come from an injected [`CoinIdSource`] so tests can pin a
/// deterministic sequence; [`IdSequence`] is the production default.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::curve::{CurveError, CurveParams};
use crate::exchange::BondingCurveExchange;
use crate::token::CoinMetadata;
use crate::types::Address;

/// Flat fee charged per deployment: 0.001 ether. Overpayment is retained,
/// not refunded; the fee is a flat minimum charge.
pub const DEFAULT_DEPLOYMENT_FEE: u128 = 1_000_000_000_000_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FactoryError {
    #[error("insufficient deployment fee: required {required}, paid {paid}")]
    InsufficientFee { required: u128, paid: u128 },
    #[error("caller is not the factory owner")]
    NotOwner,
    #[error("coin id {0} already registered")]
    DuplicateCoinId(u64),
    #[error("coin id {0} not found")]
    CoinNotFound(u64),
    #[error("no fees available to withdraw")]
    NoFeesAvailable,
    #[error(transparent)]
    Curve(#[from] CurveError),
}

/// Supplies fresh coin ids. Injected so tests can pin the sequence.
pub trait CoinIdSource {
    fn next_coin_id(&mut self) -> u64;
}

/// Default id source: a monotone counter starting at 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdSequence {
    next: u64,
}

impl Default for IdSequence {
    fn default() -> Self {
        IdSequence { next: 1 }
    }
}

impl CoinIdSource for IdSequence {
    fn next_coin_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// One persisted registry record per deployed coin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinRecord {
    pub coin_id: u64,
    pub creator: Address,
    pub token: Address,
    pub exchange: Address,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactoryEvent {
    ContentCoinDeployed {
        coin_id: u64,
        token: Address,
        exchange: Address,
        creator: Address,
        symbol: String,
    },
    DeploymentFeeUpdated {
        old_fee: u128,
        new_fee: u128,
    },
    PlatformUpdated {
        old_platform: Address,
        new_platform: Address,
    },
    CollectedFeesWithdrawn {
        recipient: Address,
        amount: u128,
    },
}

#[derive(Debug, Clone)]
pub struct BondingCurveFactory<I: CoinIdSource = IdSequence> {
    owner: Address,
    platform: Address,
    deployment_fee: u128,
    curve_params: CurveParams,
    /// Deployment fees (including overpayment) accrued and not yet withdrawn.
    collected_fees: u128,
    ids: I,
    exchanges: BTreeMap<u64, BondingCurveExchange>,
    records: BTreeMap<u64, CoinRecord>,
    creator_index: HashMap<Address, Vec<u64>>,
    events: Vec<FactoryEvent>,
}

impl BondingCurveFactory<IdSequence> {
    pub fn new(owner: Address, platform: Address) -> Self {
        Self::with_id_source(owner, platform, IdSequence::default())
    }
}

impl<I: CoinIdSource> BondingCurveFactory<I> {
    pub fn with_id_source(owner: Address, platform: Address, ids: I) -> Self {
        BondingCurveFactory {
            owner,
            platform,
            deployment_fee: DEFAULT_DEPLOYMENT_FEE,
            curve_params: CurveParams::default(),
            collected_fees: 0,
            ids,
            exchanges: BTreeMap::new(),
            records: BTreeMap::new(),
            creator_index: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// Override the curve constants applied to future deployments.
    pub fn with_curve_params(mut self, params: CurveParams) -> Self {
        self.curve_params = params;
        self
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn platform(&self) -> Address {
        self.platform
    }

    pub fn deployment_fee(&self) -> u128 {
        self.deployment_fee
    }

    pub fn collected_fees(&self) -> u128 {
        self.collected_fees
    }

    pub fn events(&self) -> &[FactoryEvent] {
        &self.events
    }

    /// Deploy a token+exchange pair for one content item.
    ///
    /// The whole paid value is retained (flat minimum charge); the exchange
    /// is bound to the factory's platform address as of this call, and later
    /// `set_platform` calls do not touch it.
    pub fn deploy_content_coin(
        &mut self,
        caller: Address,
        name: impl Into<String>,
        symbol: impl Into<String>,
        content_uri: impl Into<String>,
        paid_value: u128,
    ) -> Result<CoinRecord, FactoryError> {
        if paid_value < self.deployment_fee {
            return Err(FactoryError::InsufficientFee {
                required: self.deployment_fee,
                paid: paid_value,
            });
        }

        let coin_id = self.ids.next_coin_id();
        if self.records.contains_key(&coin_id) {
            return Err(FactoryError::DuplicateCoinId(coin_id));
        }

        let token = Address::derive("coinpress/token", &self.owner, coin_id);
        let exchange_addr = Address::derive("coinpress/exchange", &self.owner, coin_id);
        let metadata = CoinMetadata::new(name, symbol, content_uri);
        let symbol = metadata.symbol.clone();

        let exchange = BondingCurveExchange::new(
            exchange_addr,
            caller,
            self.platform,
            self.curve_params,
            token,
            metadata,
        )?;

        let record = CoinRecord {
            coin_id,
            creator: caller,
            token,
            exchange: exchange_addr,
            created_at: Utc::now().timestamp(),
        };

        self.collected_fees = self.collected_fees.saturating_add(paid_value);
        self.exchanges.insert(coin_id, exchange);
        self.records.insert(coin_id, record.clone());
        self.creator_index.entry(caller).or_default().push(coin_id);
        self.events.push(FactoryEvent::ContentCoinDeployed {
            coin_id,
            token,
            exchange: exchange_addr,
            creator: caller,
            symbol: symbol.clone(),
        });
        tracing::info!(
            coin_id,
            token = %token,
            exchange = %exchange_addr,
            creator = %caller,
            symbol = %symbol,
            "content coin deployed"
        );
        Ok(record)
    }

    /// Coin ids created by `creator`, in insertion order. Empty if none.
    pub fn creator_coins(&self, creator: &Address) -> &[u64] {
        self.creator_index
            .get(creator)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of registry entries. Monotone.
    pub fn coin_count(&self) -> u64 {
        self.records.len() as u64
    }

    pub fn coin_record(&self, coin_id: u64) -> Result<&CoinRecord, FactoryError> {
        self.records
            .get(&coin_id)
            .ok_or(FactoryError::CoinNotFound(coin_id))
    }

    pub fn exchange(&self, coin_id: u64) -> Result<&BondingCurveExchange, FactoryError> {
        self.exchanges
            .get(&coin_id)
            .ok_or(FactoryError::CoinNotFound(coin_id))
    }

    pub fn exchange_mut(&mut self, coin_id: u64) -> Result<&mut BondingCurveExchange, FactoryError> {
        self.exchanges
            .get_mut(&coin_id)
            .ok_or(FactoryError::CoinNotFound(coin_id))
    }

    /// JSON snapshot of the registry, in coin id order. External tooling
    /// persists this alongside deployment runs.
    pub fn registry_json(&self) -> serde_json::Result<String> {
        let records: Vec<&CoinRecord> = self.records.values().collect();
        serde_json::to_string_pretty(&records)
    }

    /// Owner-only. Affects future deployments only.
    pub fn set_deployment_fee(&mut self, caller: Address, new_fee: u128) -> Result<(), FactoryError> {
        if caller != self.owner {
            return Err(FactoryError::NotOwner);
        }
        let old_fee = self.deployment_fee;
        self.deployment_fee = new_fee;
        self.events.push(FactoryEvent::DeploymentFeeUpdated { old_fee, new_fee });
        tracing::info!(old_fee, new_fee, "deployment fee updated");
        Ok(())
    }

    /// Owner-only. Forward-only: exchanges already deployed keep the
    /// platform address they were constructed with.
    pub fn set_platform(&mut self, caller: Address, new_platform: Address) -> Result<(), FactoryError> {
        if caller != self.owner {
            return Err(FactoryError::NotOwner);
        }
        let old_platform = self.platform;
        self.platform = new_platform;
        self.events.push(FactoryEvent::PlatformUpdated {
            old_platform,
            new_platform,
        });
        tracing::info!(old_platform = %old_platform, new_platform = %new_platform, "platform updated");
        Ok(())
    }

    /// Owner-only payout of accrued deployment fees. The balance is zeroed
    /// before the amount is surrendered, mirroring the exchange withdrawals.
    pub fn withdraw_collected_fees(&mut self, caller: Address) -> Result<u128, FactoryError> {
        if caller != self.owner {
            return Err(FactoryError::NotOwner);
        }
        let amount = self.collected_fees;
        if amount == 0 {
            return Err(FactoryError::NoFeesAvailable);
        }
        self.collected_fees = 0;
        self.events.push(FactoryEvent::CollectedFeesWithdrawn {
            recipient: caller,
            amount,
        });
        tracing::info!(recipient = %caller, amount, "collected deployment fees withdrawn");
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: Address = Address([1; 20]);
    const PLATFORM: Address = Address([2; 20]);
    const CREATOR: Address = Address([3; 20]);
    const BUYER: Address = Address([4; 20]);

    fn test_factory() -> BondingCurveFactory {
        BondingCurveFactory::new(OWNER, PLATFORM)
    }

    fn deploy(factory: &mut BondingCurveFactory) -> CoinRecord {
        factory
            .deploy_content_coin(
                CREATOR,
                "Test Content",
                "TEST",
                "ipfs://test-hash",
                DEFAULT_DEPLOYMENT_FEE,
            )
            .unwrap()
    }

    #[test]
    fn test_deployment_registers_coin() {
        let mut factory = test_factory();
        let record = deploy(&mut factory);

        assert_eq!(record.coin_id, 1);
        assert_eq!(record.creator, CREATOR);
        assert_eq!(factory.coin_count(), 1);
        assert_eq!(factory.creator_coins(&CREATOR), &[1]);
        assert_eq!(factory.coin_record(1).unwrap(), &record);

        let exchange = factory.exchange(1).unwrap();
        assert_eq!(exchange.creator(), CREATOR);
        assert_eq!(exchange.platform(), PLATFORM);
        assert_eq!(exchange.address(), record.exchange);
        assert_eq!(exchange.token().address(), record.token);
        assert_eq!(exchange.token().symbol(), "TEST");
        assert_eq!(exchange.circulating_supply(), 0);
    }

    #[test]
    fn test_deployment_requires_fee() {
        let mut factory = test_factory();
        let result = factory.deploy_content_coin(CREATOR, "Test", "TEST", "ipfs://x", 0);
        assert_eq!(
            result,
            Err(FactoryError::InsufficientFee {
                required: DEFAULT_DEPLOYMENT_FEE,
                paid: 0,
            })
        );
        assert_eq!(factory.coin_count(), 0);
        assert!(factory.creator_coins(&CREATOR).is_empty());
    }

    #[test]
    fn test_overpayment_is_retained() {
        let mut factory = test_factory();
        factory
            .deploy_content_coin(CREATOR, "Test", "TEST", "ipfs://x", 3 * DEFAULT_DEPLOYMENT_FEE)
            .unwrap();
        assert_eq!(factory.collected_fees(), 3 * DEFAULT_DEPLOYMENT_FEE);
    }

    #[test]
    fn test_identical_metadata_gets_distinct_handles() {
        let mut factory = test_factory();
        let first = deploy(&mut factory);
        let second = deploy(&mut factory);

        assert_ne!(first.coin_id, second.coin_id);
        assert_ne!(first.token, second.token);
        assert_ne!(first.exchange, second.exchange);
        assert_eq!(factory.creator_coins(&CREATOR), &[1, 2]);
    }

    #[test]
    fn test_deterministic_id_source_is_injectable() {
        struct FixedIds(Vec<u64>);
        impl CoinIdSource for FixedIds {
            fn next_coin_id(&mut self) -> u64 {
                self.0.remove(0)
            }
        }

        let mut factory =
            BondingCurveFactory::with_id_source(OWNER, PLATFORM, FixedIds(vec![42, 42]));
        let record = factory
            .deploy_content_coin(CREATOR, "A", "A", "ipfs://a", DEFAULT_DEPLOYMENT_FEE)
            .unwrap();
        assert_eq!(record.coin_id, 42);

        // A colliding id is rejected instead of clobbering the registry.
        let result =
            factory.deploy_content_coin(CREATOR, "B", "B", "ipfs://b", DEFAULT_DEPLOYMENT_FEE);
        assert_eq!(result, Err(FactoryError::DuplicateCoinId(42)));
        assert_eq!(factory.coin_count(), 1);
    }

    #[test]
    fn test_custom_curve_params_apply_to_deployments() {
        use crate::curve::CurveParams;
        use crate::types::WAD;

        let mut factory = BondingCurveFactory::new(OWNER, PLATFORM).with_curve_params(
            CurveParams {
                base_price: 2 * WAD,
                slope: 0,
            },
        );
        let record = deploy(&mut factory);
        assert_eq!(factory.exchange(record.coin_id).unwrap().current_price(), 2 * WAD);
    }

    #[test]
    fn test_admin_calls_are_owner_only() {
        let mut factory = test_factory();
        assert_eq!(
            factory.set_deployment_fee(CREATOR, 1),
            Err(FactoryError::NotOwner)
        );
        assert_eq!(
            factory.set_platform(CREATOR, CREATOR),
            Err(FactoryError::NotOwner)
        );
        assert_eq!(
            factory.withdraw_collected_fees(CREATOR),
            Err(FactoryError::NotOwner)
        );

        factory.set_deployment_fee(OWNER, 2 * DEFAULT_DEPLOYMENT_FEE).unwrap();
        assert_eq!(factory.deployment_fee(), 2 * DEFAULT_DEPLOYMENT_FEE);
    }

    #[test]
    fn test_set_platform_is_forward_only() {
        let mut factory = test_factory();
        deploy(&mut factory);

        let new_platform = Address([9; 20]);
        factory.set_platform(OWNER, new_platform).unwrap();
        assert_eq!(factory.platform(), new_platform);

        // The existing exchange keeps its construction-time platform.
        assert_eq!(factory.exchange(1).unwrap().platform(), PLATFORM);

        // A fresh deployment picks up the new address.
        let record = deploy(&mut factory);
        assert_eq!(
            factory.exchange(record.coin_id).unwrap().platform(),
            new_platform
        );
    }

    #[test]
    fn test_raised_fee_applies_to_future_deployments() {
        let mut factory = test_factory();
        factory.set_deployment_fee(OWNER, 2 * DEFAULT_DEPLOYMENT_FEE).unwrap();

        let result = factory.deploy_content_coin(
            CREATOR,
            "Test",
            "TEST",
            "ipfs://x",
            DEFAULT_DEPLOYMENT_FEE,
        );
        assert_eq!(
            result,
            Err(FactoryError::InsufficientFee {
                required: 2 * DEFAULT_DEPLOYMENT_FEE,
                paid: DEFAULT_DEPLOYMENT_FEE,
            })
        );
    }

    #[test]
    fn test_collected_fees_withdrawal_pays_once() {
        let mut factory = test_factory();
        deploy(&mut factory);

        assert_eq!(
            factory.withdraw_collected_fees(OWNER),
            Ok(DEFAULT_DEPLOYMENT_FEE)
        );
        assert_eq!(factory.collected_fees(), 0);
        assert_eq!(
            factory.withdraw_collected_fees(OWNER),
            Err(FactoryError::NoFeesAvailable)
        );
    }

    #[test]
    fn test_unknown_coin_lookup_fails() {
        let factory = test_factory();
        assert_eq!(factory.coin_record(7), Err(FactoryError::CoinNotFound(7)));
        assert!(matches!(
            factory.exchange(7),
            Err(FactoryError::CoinNotFound(7))
        ));
    }

    #[test]
    fn test_registry_snapshot_round_trips() {
        let mut factory = test_factory();
        deploy(&mut factory);
        deploy(&mut factory);

        let json = factory.registry_json().unwrap();
        let parsed: Vec<CoinRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].coin_id, 1);
        assert_eq!(parsed[1].coin_id, 2);
    }

    #[test]
    fn test_trading_through_the_factory_handle() {
        let mut factory = test_factory();
        let record = deploy(&mut factory);

        let exchange = factory.exchange_mut(record.coin_id).unwrap();
        let bought = exchange.buy(BUYER, 100_000_000_000_000_000).unwrap();
        assert!(bought.tokens_out > 0);
        assert_eq!(exchange.token().balance_of(&BUYER), bought.tokens_out);
        assert_eq!(exchange.token().total_supply(), exchange.circulating_supply());
    }

    #[test]
    fn test_deployment_event_carries_the_pair() {
        let mut factory = test_factory();
        let record = deploy(&mut factory);

        match &factory.events()[0] {
            FactoryEvent::ContentCoinDeployed {
                coin_id,
                token,
                exchange,
                creator,
                symbol,
            } => {
                assert_eq!(*coin_id, record.coin_id);
                assert_eq!(*token, record.token);
                assert_eq!(*exchange, record.exchange);
                assert_eq!(*creator, CREATOR);
                assert_eq!(symbol, "TEST");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
