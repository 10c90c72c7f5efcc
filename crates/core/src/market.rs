//! Per-market open-interest and funding state machine.
//!
//! Incoming exposure queues first and settles into the live pools on
//! the periodic heartbeat, which also compounds funding and pulls a
//! fresh price point. Funding transfers value between the majority and
//! minority side by geometric decay of the imbalance; it never creates
//! aggregate exposure, and when only one side is open the decayed
//! exposure is burned instead of transferred.

use crate::comptroller::{Comptroller, ComptrollerParams};
use crate::error::EngineError;
use crate::math::{compound, mul_div, mul_down_signed, pow_down, WAD};
use crate::oracle::{OracleParams, PriceFeed, PricePointOracle};
use crate::AccountId;

pub type MarketId = usize;

/// Bound on funding periods compounded in one heartbeat. Elapsed time
/// past the bound carries forward to the next heartbeat.
pub const MAX_FUNDING_COMPOUND: u64 = 144;

#[derive(Clone, Copy, Debug)]
pub struct MarketParams {
    /// Funding rate constant per compounding period, WAD. The
    /// imbalance decays by `(1 - 2k)` each period.
    pub k: u128,
    /// Seconds between queue settlements / price points.
    pub update_period: u64,
    /// Seconds per funding compounding period.
    pub compounding_period: u64,
    pub leverage_max: u8,
    /// Maintenance margin as a WAD fraction of position shares.
    pub margin_maintenance: u128,
    /// Liquidator reward as a WAD fraction of remaining value.
    pub margin_reward_rate: u128,
}

/// What a heartbeat did, so the caller can apply token effects strictly
/// after state mutation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Queued OI was settled this call.
    pub settled: bool,
    /// Index of the price point created this call, if any.
    pub price_point: Option<usize>,
    /// Funding moved between sides; positive means the long side
    /// received it.
    pub funding_transferred: i128,
    /// OI decayed off a one-sided market. The holders realize the
    /// loss at exit, when value falls short of cost.
    pub funding_burned: u128,
}

#[derive(Clone, Debug)]
pub struct Market {
    pub id: MarketId,
    pub params: MarketParams,
    pub comptroller: Comptroller,
    pub oracle: PricePointOracle,
    governor: AccountId,

    oi_long: u128,
    oi_short: u128,
    oi_long_shares: u128,
    oi_short_shares: u128,
    queued_oi_long: u128,
    queued_oi_short: u128,
    queued_oi_long_shares: u128,
    queued_oi_short_shares: u128,

    last_update: u64,
    last_compound: u64,
}

impl Market {
    pub fn new(
        id: MarketId,
        governor: AccountId,
        params: MarketParams,
        comptroller_params: ComptrollerParams,
        mut oracle_params: OracleParams,
        now: u64,
    ) -> Self {
        // one settlement clock; the oracle gate always tracks the
        // market's update period
        oracle_params.update_period = params.update_period;
        Self {
            id,
            params,
            comptroller: Comptroller::new(comptroller_params, now),
            oracle: PricePointOracle::new(oracle_params),
            governor,
            oi_long: 0,
            oi_short: 0,
            oi_long_shares: 0,
            oi_short_shares: 0,
            queued_oi_long: 0,
            queued_oi_short: 0,
            queued_oi_long_shares: 0,
            queued_oi_short_shares: 0,
            last_update: now,
            last_compound: now,
        }
    }

    /// Permissionless capacity raise for the comptroller buffers.
    pub fn expand_rollers(&mut self, cardinality_next: u32) {
        self.comptroller.expand(cardinality_next);
    }

    pub fn oi(&self) -> (u128, u128) {
        (self.oi_long, self.oi_short)
    }

    pub fn queued_oi(&self) -> (u128, u128) {
        (self.queued_oi_long, self.queued_oi_short)
    }

    pub fn oi_side(&self, is_long: bool) -> u128 {
        if is_long {
            self.oi_long
        } else {
            self.oi_short
        }
    }

    pub fn oi_shares_side(&self, is_long: bool) -> u128 {
        if is_long {
            self.oi_long_shares
        } else {
            self.oi_short_shares
        }
    }

    /// Effective cap: the static cap faded by recent issuance.
    pub fn oi_cap(&self, now: u64) -> u128 {
        self.comptroller.oi_cap(now)
    }

    /// Proportional share of the settled pool on one side.
    pub fn pos_oi(&self, is_long: bool, shares: u128) -> u128 {
        let total_shares = self.oi_shares_side(is_long);
        if total_shares == 0 {
            return 0;
        }
        mul_div(shares, self.oi_side(is_long), total_shares)
    }

    /// Queue incoming exposure. Rejects with a capacity-exceeded signal
    /// if the side's settled + queued OI would exceed the effective
    /// cap; never silently clamps.
    pub fn enqueue_oi(
        &mut self,
        now: u64,
        is_long: bool,
        oi_adjusted: u128,
    ) -> Result<(), EngineError> {
        let cap = self.oi_cap(now);
        let (oi, queued) = if is_long {
            (self.oi_long, self.queued_oi_long)
        } else {
            (self.oi_short, self.queued_oi_short)
        };
        let total = oi
            .checked_add(queued)
            .and_then(|t| t.checked_add(oi_adjusted))
            .ok_or(EngineError::Overflow)?;
        if total > cap {
            return Err(EngineError::OiCapExceeded);
        }

        if is_long {
            self.queued_oi_long += oi_adjusted;
            self.queued_oi_long_shares += oi_adjusted;
        } else {
            self.queued_oi_short += oi_adjusted;
            self.queued_oi_short_shares += oi_adjusted;
        }
        Ok(())
    }

    /// Remove not-yet-settled exposure (unwind before the settlement
    /// boundary). Queued shares are 1:1 with queued OI.
    pub fn remove_queued(&mut self, is_long: bool, oi: u128, shares: u128) {
        if is_long {
            self.queued_oi_long = self.queued_oi_long.saturating_sub(oi);
            self.queued_oi_long_shares = self.queued_oi_long_shares.saturating_sub(shares);
        } else {
            self.queued_oi_short = self.queued_oi_short.saturating_sub(oi);
            self.queued_oi_short_shares = self.queued_oi_short_shares.saturating_sub(shares);
        }
    }

    /// Remove settled exposure on unwind or liquidation.
    pub fn remove_settled(&mut self, is_long: bool, oi: u128, shares: u128) {
        if is_long {
            self.oi_long = self.oi_long.saturating_sub(oi);
            self.oi_long_shares = self.oi_long_shares.saturating_sub(shares);
        } else {
            self.oi_short = self.oi_short.saturating_sub(oi);
            self.oi_short_shares = self.oi_short_shares.saturating_sub(shares);
        }
    }

    /// Periodic heartbeat: settle the queues and pull a fresh price
    /// point once per update period, then compound funding for however
    /// many whole periods elapsed (bounded). Early calls are no-ops.
    pub fn update(&mut self, feed: &dyn PriceFeed, now: u64) -> UpdateOutcome {
        let mut outcome = UpdateOutcome::default();

        if now.saturating_sub(self.last_update) >= self.params.update_period
            || self.oracle.is_empty()
        {
            self.oi_long += self.queued_oi_long;
            self.oi_short += self.queued_oi_short;
            self.oi_long_shares += self.queued_oi_long_shares;
            self.oi_short_shares += self.queued_oi_short_shares;
            self.queued_oi_long = 0;
            self.queued_oi_short = 0;
            self.queued_oi_long_shares = 0;
            self.queued_oi_short_shares = 0;

            outcome.price_point = self.oracle.update(feed, now);
            outcome.settled = true;
            self.last_update = now;
        }

        let elapsed = now.saturating_sub(self.last_compound);
        if self.params.compounding_period > 0 {
            let periods = (elapsed / self.params.compounding_period).min(MAX_FUNDING_COMPOUND);
            if periods > 0 {
                let (transferred, burned) = self.pay_funding(periods);
                outcome.funding_transferred = transferred;
                outcome.funding_burned = burned;
                // consume exactly the compounded interval; the
                // remainder carries forward and is never re-compounded
                self.last_compound += periods * self.params.compounding_period;
            }
        }

        outcome
    }

    fn pay_funding(&mut self, periods: u64) -> (i128, u128) {
        let base = WAD.saturating_sub(2 * self.params.k);

        match (self.oi_long, self.oi_short) {
            (0, 0) => (0, 0),
            (long, 0) => {
                let decayed = compound(long, base, periods);
                let burned = long - decayed;
                self.oi_long = decayed;
                (0, burned)
            }
            (0, short) => {
                let decayed = compound(short, base, periods);
                let burned = short - decayed;
                self.oi_short = decayed;
                (0, burned)
            }
            (long, short) => {
                let factor = pow_down(base, periods);
                let total = long + short;
                let imbalance = long as i128 - short as i128;
                let decayed = mul_down_signed(imbalance, factor);

                let new_long = ((total as i128 + decayed) / 2) as u128;
                let new_short = total - new_long;

                let transferred = new_long as i128 - long as i128;
                self.oi_long = new_long;
                self.oi_short = new_short;
                (transferred, 0)
            }
        }
    }

    fn require_governor(&self, caller: AccountId) -> Result<(), EngineError> {
        if caller != self.governor {
            return Err(EngineError::Unauthorized);
        }
        Ok(())
    }

    // Governance surface, gated to the market's governor.

    pub fn set_k(&mut self, caller: AccountId, k: u128) -> Result<(), EngineError> {
        self.require_governor(caller)?;
        self.params.k = k;
        Ok(())
    }

    pub fn set_spread(&mut self, caller: AccountId, spread: u128) -> Result<(), EngineError> {
        self.require_governor(caller)?;
        self.oracle.params.spread = spread;
        Ok(())
    }

    pub fn set_price_frame_cap(&mut self, caller: AccountId, cap: u128) -> Result<(), EngineError> {
        self.require_governor(caller)?;
        self.oracle.params.price_frame_cap = cap;
        Ok(())
    }

    pub fn set_update_period(&mut self, caller: AccountId, period: u64) -> Result<(), EngineError> {
        self.require_governor(caller)?;
        self.params.update_period = period;
        // settles and price points must stay in step, or settled
        // positions end up without an entry point to mark against
        self.oracle.params.update_period = period;
        Ok(())
    }

    pub fn set_compounding_period(
        &mut self,
        caller: AccountId,
        period: u64,
    ) -> Result<(), EngineError> {
        self.require_governor(caller)?;
        self.params.compounding_period = period;
        Ok(())
    }

    pub fn set_leverage_max(&mut self, caller: AccountId, max: u8) -> Result<(), EngineError> {
        self.require_governor(caller)?;
        self.params.leverage_max = max;
        Ok(())
    }

    pub fn set_static_cap(&mut self, caller: AccountId, cap: u128) -> Result<(), EngineError> {
        self.require_governor(caller)?;
        self.comptroller.params.static_cap = cap;
        Ok(())
    }

    pub fn set_lambda(&mut self, caller: AccountId, lambda: u128) -> Result<(), EngineError> {
        self.require_governor(caller)?;
        self.comptroller.params.lambda = lambda;
        Ok(())
    }

    pub fn set_impact_window(&mut self, caller: AccountId, window: u64) -> Result<(), EngineError> {
        self.require_governor(caller)?;
        self.comptroller.params.impact_window = window;
        Ok(())
    }

    pub fn set_brrrrd_expected(
        &mut self,
        caller: AccountId,
        expected: u128,
    ) -> Result<(), EngineError> {
        self.require_governor(caller)?;
        self.comptroller.params.brrrrd_expected = expected;
        Ok(())
    }

    pub fn set_brrrrd_windows(
        &mut self,
        caller: AccountId,
        window_macro: u64,
        window_micro: u64,
    ) -> Result<(), EngineError> {
        self.require_governor(caller)?;
        self.comptroller.params.brrrrd_window_macro = window_macro;
        self.comptroller.params.brrrrd_window_micro = window_micro;
        Ok(())
    }
}
