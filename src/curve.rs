/// LINEAR BONDING CURVE
///
/// Pricing law: `price(s) = base_price + slope * s / WAD`, with `s` the
/// circulating supply in token base units and prices in wei per whole token.
/// The cost of moving supply between two levels is the definite integral of
/// the price over that range, which has the closed form
///
/// ```text
/// cost(s0, s1) = base_price * (s1 - s0) / WAD
///              + slope * (s1^2 - s0^2) / (2 * WAD^2)
/// ```
///
/// The curve is reversible and path-independent: selling the same amount at
/// the same supply level returns exactly the buy-side integral.
///
/// All results round down. Intermediate products (supply squared times slope)
/// exceed `u128`, so the integral and its inverse are evaluated in `BigUint`
/// and converted back at the edges.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::WAD;

/// Reference base price: 0.001 ether per whole token at zero supply.
pub const DEFAULT_BASE_PRICE: u128 = 1_000_000_000_000_000;

/// Reference slope: each whole token minted raises the spot price by
/// 0.0000001 ether.
pub const DEFAULT_SLOPE: u128 = 100_000_000_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CurveError {
    #[error("base price and slope cannot both be zero")]
    DegenerateCurve,
    #[error("curve arithmetic overflowed u128")]
    Overflow,
}

/// Curve constants, fixed at exchange construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveParams {
    /// Spot price at zero supply, in wei per whole token.
    pub base_price: u128,
    /// Price increase per whole token of supply, in wei per whole token.
    pub slope: u128,
}

impl Default for CurveParams {
    fn default() -> Self {
        CurveParams {
            base_price: DEFAULT_BASE_PRICE,
            slope: DEFAULT_SLOPE,
        }
    }
}

/// A validated linear curve. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearCurve {
    base_price: u128,
    slope: u128,
}

impl LinearCurve {
    pub fn new(params: CurveParams) -> Result<Self, CurveError> {
        if params.base_price == 0 && params.slope == 0 {
            return Err(CurveError::DegenerateCurve);
        }
        Ok(LinearCurve {
            base_price: params.base_price,
            slope: params.slope,
        })
    }

    pub fn base_price(&self) -> u128 {
        self.base_price
    }

    pub fn slope(&self) -> u128 {
        self.slope
    }

    /// Marginal price at the given supply, in wei per whole token.
    ///
    /// Saturates at `u128::MAX`; supplies anywhere near that magnitude are
    /// unreachable through trading because the integral overflows first.
    pub fn spot_price(&self, supply: u128) -> u128 {
        let price = BigUint::from(self.base_price)
            + BigUint::from(self.slope) * BigUint::from(supply) / BigUint::from(WAD);
        u128::try_from(price).unwrap_or(u128::MAX)
    }

    /// Integral cost of moving supply from `s0` up to `s1` (`s0 <= s1`),
    /// in wei, rounded down.
    pub fn reserve_between(&self, s0: u128, s1: u128) -> Result<u128, CurveError> {
        debug_assert!(s0 <= s1);
        let wad = BigUint::from(WAD);
        let delta = BigUint::from(s1 - s0);

        let linear = BigUint::from(self.base_price) * &delta / &wad;
        let quadratic = BigUint::from(self.slope)
            * (BigUint::from(s1) * BigUint::from(s1) - BigUint::from(s0) * BigUint::from(s0))
            / (&wad * &wad * 2u32);

        u128::try_from(linear + quadratic).map_err(|_| CurveError::Overflow)
    }

    /// Inverse of [`reserve_between`](Self::reserve_between): the largest
    /// `t` such that `reserve_between(supply, supply + t) <= net_reserve`.
    ///
    /// With `slope > 0` this is the positive root of
    /// `slope*t^2 + 2*(WAD*base_price + slope*supply)*t - 2*WAD^2*net = 0`,
    /// rounded down; with `slope == 0` it degenerates to a division.
    pub fn tokens_for_reserve(&self, supply: u128, net_reserve: u128) -> Result<u128, CurveError> {
        if net_reserve == 0 {
            return Ok(0);
        }
        let wad = BigUint::from(WAD);
        let net = BigUint::from(net_reserve);

        let tokens = if self.slope == 0 {
            // Flat curve: every token costs base_price.
            net * &wad / BigUint::from(self.base_price)
        } else {
            let a = BigUint::from(self.slope);
            let b = (&wad * BigUint::from(self.base_price) + &a * BigUint::from(supply)) * 2u32;
            let c = &wad * &wad * net * 2u32;
            let discriminant = &b * &b + &a * c * 4u32;
            let root = discriminant.sqrt();
            (root - b) / (a * 2u32)
        };

        u128::try_from(tokens).map_err(|_| CurveError::Overflow)
    }
}
