//! Collateral manager: the entry point for building, unwinding,
//! transferring and liquidating positions against a market.
//!
//! The manager owns its token account. Trader collateral, the trade
//! fee bucket and the liquidation pot all live in that account until a
//! heartbeat sweeps them. Every operation validates fully before
//! mutating, then applies market state, ledger state and token effects
//! in that order, so a failed call leaves nothing half-done.

use std::collections::HashMap;

use crate::error::EngineError;
use crate::market::{Market, MarketId, UpdateOutcome};
use crate::math::{mul_div, mul_down};
use crate::oracle::PriceFeed;
use crate::position::{Position, PositionId, ShareLedger};
use crate::registry::Registry;
use crate::token::Token;
use crate::AccountId;

/// Floor on post-fee collateral, absolute token units.
pub const MIN_COLLATERAL: u128 = 100_000_000_000_000;

/// A position slice priced for exit.
struct Valuation {
    pos_oi: u128,
    debt_slice: u128,
    cost_slice: u128,
    value: u128,
    queued: bool,
}

#[derive(Clone, Debug)]
pub struct CollateralManager {
    /// Token account holding backing collateral and the fee pots.
    pub account: AccountId,
    positions: Vec<Position>,
    shares: ShareLedger,
    /// Live pooling buckets: (market, side, leverage, entry point).
    open: HashMap<(MarketId, bool, u8, usize), PositionId>,
    fees: u128,
    liquidations: u128,
}

impl CollateralManager {
    pub fn new(account: AccountId) -> Self {
        Self {
            account,
            positions: Vec::new(),
            shares: ShareLedger::new(),
            open: HashMap::new(),
            fees: 0,
            liquidations: 0,
        }
    }

    pub fn position(&self, id: PositionId) -> Option<&Position> {
        self.positions.get(id)
    }

    /// Number of position records ever created, liquidated included.
    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn shares_of(&self, id: PositionId, holder: AccountId) -> u128 {
        self.shares.balance(id, holder)
    }

    pub fn fees(&self) -> u128 {
        self.fees
    }

    pub fn liquidations(&self) -> u128 {
        self.liquidations
    }

    fn live_position(
        &self,
        market: &Market,
        id: PositionId,
    ) -> Result<&Position, EngineError> {
        let pos = self.positions.get(id).ok_or(EngineError::PositionNotFound)?;
        if pos.liquidated {
            return Err(EngineError::PositionLiquidated);
        }
        if pos.market != market.id {
            return Err(EngineError::PositionNotFound);
        }
        Ok(pos)
    }

    /// Price a slice of `shares_amount` shares of a live position.
    /// Queued slices are worth their cost basis; settled slices are
    /// marked to the latest price point through the capped frame.
    fn valuation(
        &self,
        market: &Market,
        id: PositionId,
        shares_amount: u128,
    ) -> Result<Valuation, EngineError> {
        let pos = self.live_position(market, id)?;
        let total = pos.oi_shares;
        if total == 0 || shares_amount > total {
            return Err(EngineError::InsufficientShares);
        }

        let debt_slice = mul_div(pos.debt, shares_amount, total);
        let cost_slice = mul_div(pos.cost, shares_amount, total);

        if pos.price_index >= market.oracle.len() {
            // entry point not yet settled; exposure is still 1:1 with
            // shares and carries no mark-to-market
            return Ok(Valuation {
                pos_oi: shares_amount,
                debt_slice,
                cost_slice,
                value: cost_slice,
                queued: true,
            });
        }

        let pos_oi = market.pos_oi(pos.is_long, shares_amount);
        let exit = market.oracle.len() - 1;
        let frame = market
            .oracle
            .price_frame(pos.price_index, exit, pos.is_long)
            .ok_or(EngineError::PositionNotFound)?;

        let value = if pos.is_long {
            mul_down(pos_oi, frame).saturating_sub(debt_slice)
        } else {
            (2 * pos_oi).saturating_sub(debt_slice + mul_down(pos_oi, frame))
        };

        Ok(Valuation {
            pos_oi,
            debt_slice,
            cost_slice,
            value,
            queued: false,
        })
    }

    /// Current exit value of the whole position, before fees.
    pub fn value(&self, market: &Market, id: PositionId) -> Result<u128, EngineError> {
        let total = self.live_position(market, id)?.oi_shares;
        Ok(self.valuation(market, id, total)?.value)
    }

    /// Build exposure: take collateral, charge the trade and impact
    /// fees, queue the adjusted OI and mint shares 1:1 with it.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        &mut self,
        registry: &Registry,
        market: &mut Market,
        token: &mut Token,
        trader: AccountId,
        collateral: u128,
        leverage: u8,
        is_long: bool,
        min_oi: u128,
        now: u64,
    ) -> Result<PositionId, EngineError> {
        if !registry.is_market_active(market.id) {
            return Err(EngineError::MarketInactive);
        }
        if !registry.is_manager_active(self.account) {
            return Err(EngineError::Unauthorized);
        }
        if leverage == 0 || leverage > market.params.leverage_max {
            return Err(EngineError::LeverageTooHigh);
        }

        let oi = collateral
            .checked_mul(leverage as u128)
            .ok_or(EngineError::Overflow)?;
        let trade_fee = mul_down(oi, registry.fee_rate());
        let impact_rate = market.comptroller.view_impact(now, is_long, oi);
        let impact_fee = mul_down(oi, impact_rate);

        let collateral_adjusted = collateral
            .checked_sub(trade_fee + impact_fee)
            .ok_or(EngineError::CollateralBelowMinimum)?;
        if collateral_adjusted < MIN_COLLATERAL {
            return Err(EngineError::CollateralBelowMinimum);
        }
        let oi_adjusted = collateral_adjusted
            .checked_mul(leverage as u128)
            .ok_or(EngineError::Overflow)?;
        if oi_adjusted < min_oi {
            return Err(EngineError::Slippage);
        }
        if token.balance(trader) < collateral {
            return Err(EngineError::InsufficientBalance);
        }

        market.enqueue_oi(now, is_long, oi_adjusted)?;
        market.comptroller.impact(now, &[(is_long, oi_adjusted)]);

        token.transfer(trader, self.account, collateral)?;
        if impact_fee > 0 {
            token.burn(self.account, self.account, impact_fee)?;
            market.comptroller.brrrr(now, -(impact_fee as i128));
        }
        self.fees += trade_fee;

        let key = (
            market.id,
            is_long,
            leverage,
            market.oracle.index_next(),
        );
        let id = match self.open.get(&key) {
            Some(&id) if !self.positions[id].liquidated => id,
            _ => {
                let id = self.positions.len();
                self.positions.push(Position {
                    market: market.id,
                    is_long,
                    leverage,
                    price_index: key.3,
                    oi_shares: 0,
                    debt: 0,
                    cost: 0,
                    liquidated: false,
                });
                self.open.insert(key, id);
                id
            }
        };

        let pos = &mut self.positions[id];
        pos.oi_shares += oi_adjusted;
        pos.debt += oi_adjusted - collateral_adjusted;
        pos.cost += collateral_adjusted;
        self.shares.mint(id, trader, oi_adjusted);

        Ok(id)
    }

    /// Unwind a slice of shares at the current mark, paying the trade
    /// fee on notional. Mints or burns the settlement asset to cover
    /// the difference between exit value and cost basis.
    #[allow(clippy::too_many_arguments)]
    pub fn unwind(
        &mut self,
        registry: &Registry,
        market: &mut Market,
        token: &mut Token,
        trader: AccountId,
        id: PositionId,
        shares_amount: u128,
        now: u64,
    ) -> Result<u128, EngineError> {
        if !registry.is_market_active(market.id) {
            return Err(EngineError::MarketInactive);
        }
        if shares_amount == 0 || self.shares.balance(id, trader) < shares_amount {
            // distinguish a liquidated position from a plain shortfall
            self.live_position(market, id)?;
            return Err(EngineError::InsufficientShares);
        }

        let val = self.valuation(market, id, shares_amount)?;

        let notional = val.value + val.debt_slice;
        let fee = mul_down(notional, registry.fee_rate()).min(val.value);
        let payout = val.value - fee;

        if val.queued {
            let pos = &self.positions[id];
            market.remove_queued(pos.is_long, val.pos_oi, shares_amount);
        } else {
            let pos = &self.positions[id];
            market.remove_settled(pos.is_long, val.pos_oi, shares_amount);
        }

        self.shares.burn(id, trader, shares_amount)?;
        let pos = &mut self.positions[id];
        pos.oi_shares -= shares_amount;
        pos.debt -= val.debt_slice;
        pos.cost -= val.cost_slice;
        if pos.oi_shares == 0 {
            self.open
                .remove(&(pos.market, pos.is_long, pos.leverage, pos.price_index));
        }
        self.fees += fee;

        if val.value > val.cost_slice {
            let minted = val.value - val.cost_slice;
            token.mint(self.account, self.account, minted)?;
            market.comptroller.brrrr(now, minted as i128);
        } else {
            let burned = val.cost_slice - val.value;
            token.burn(self.account, self.account, burned)?;
            market.comptroller.brrrr(now, -(burned as i128));
        }
        token.transfer(self.account, trader, payout)?;

        Ok(payout)
    }

    /// Liquidate an undercollateralized position: zero every holder,
    /// burn the lost collateral, reward the caller with a fraction of
    /// the remaining value and pot the rest for the next sweep.
    pub fn liquidate(
        &mut self,
        registry: &Registry,
        market: &mut Market,
        token: &mut Token,
        caller: AccountId,
        id: PositionId,
        now: u64,
    ) -> Result<u128, EngineError> {
        if !registry.is_market_active(market.id) {
            return Err(EngineError::MarketInactive);
        }
        let pos = self.live_position(market, id)?;
        if pos.price_index >= market.oracle.len() || pos.oi_shares == 0 {
            return Err(EngineError::NotLiquidatable);
        }
        let total_shares = pos.oi_shares;

        let val = self.valuation(market, id, total_shares)?;
        let maintenance = mul_down(total_shares, market.params.margin_maintenance);
        if val.value >= maintenance {
            return Err(EngineError::NotLiquidatable);
        }

        let pos = &self.positions[id];
        market.remove_settled(pos.is_long, val.pos_oi, total_shares);

        self.shares.burn_all(id);
        let pos = &mut self.positions[id];
        self.open
            .remove(&(pos.market, pos.is_long, pos.leverage, pos.price_index));
        pos.oi_shares = 0;
        pos.debt = 0;
        pos.cost = 0;
        pos.liquidated = true;

        if val.cost_slice > val.value {
            let burned = val.cost_slice - val.value;
            token.burn(self.account, self.account, burned)?;
            market.comptroller.brrrr(now, -(burned as i128));
        } else {
            let minted = val.value - val.cost_slice;
            token.mint(self.account, self.account, minted)?;
            market.comptroller.brrrr(now, minted as i128);
        }

        let reward = mul_down(val.value, market.params.margin_reward_rate);
        token.transfer(self.account, caller, reward)?;
        self.liquidations += val.value - reward;

        Ok(reward)
    }

    /// Transfer shares of a live position between holders.
    pub fn transfer_shares(
        &mut self,
        market: &Market,
        from: AccountId,
        to: AccountId,
        id: PositionId,
        amount: u128,
    ) -> Result<(), EngineError> {
        self.live_position(market, id)?;
        self.shares.transfer(id, from, to, amount)
    }

    /// Transfer shares of several positions at once. Validates every
    /// leg first so a bad leg leaves no partial effect.
    pub fn transfer_shares_batch(
        &mut self,
        market: &Market,
        from: AccountId,
        to: AccountId,
        legs: &[(PositionId, u128)],
    ) -> Result<(), EngineError> {
        let mut required: HashMap<PositionId, u128> = HashMap::new();
        for &(id, amount) in legs {
            self.live_position(market, id)?;
            *required.entry(id).or_insert(0) += amount;
        }
        for (&id, &amount) in &required {
            if self.shares.balance(id, from) < amount {
                return Err(EngineError::InsufficientShares);
            }
        }
        for &(id, amount) in legs {
            self.shares.transfer(id, from, to, amount)?;
        }
        Ok(())
    }

    /// Heartbeat: drive the market, then sweep the fee bucket and
    /// liquidation pot on each settlement boundary. One-sided funding
    /// decay stays an OI-level event; holders realize it at exit.
    pub fn update(
        &mut self,
        registry: &Registry,
        market: &mut Market,
        token: &mut Token,
        feed: &dyn PriceFeed,
        now: u64,
    ) -> Result<UpdateOutcome, EngineError> {
        let outcome = market.update(feed, now);

        if outcome.settled {
            if self.fees > 0 {
                let burned = mul_down(self.fees, registry.fee_burn_rate());
                token.burn(self.account, self.account, burned)?;
                token.transfer(self.account, registry.fee_to(), self.fees - burned)?;
                market.comptroller.brrrr(now, -(burned as i128));
                self.fees = 0;
            }
            if self.liquidations > 0 {
                let burned = mul_down(self.liquidations, registry.margin_burn_rate());
                token.burn(self.account, self.account, burned)?;
                token.transfer(self.account, registry.fee_to(), self.liquidations - burned)?;
                market.comptroller.brrrr(now, -(burned as i128));
                self.liquidations = 0;
            }
        }

        Ok(outcome)
    }
}
