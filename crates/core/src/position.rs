//! Pooled positions and the fractional share ledger.
//!
//! Positions on the same (market, side, leverage, entry price point)
//! pool into a single record; each holder owns shares of the pool.
//! Shares are minted 1:1 with adjusted OI at build time and are freely
//! transferable while the position is live.

use std::collections::HashMap;

use crate::error::EngineError;
use crate::market::MarketId;
use crate::AccountId;

pub type PositionId = usize;

/// Pooled position state. `debt` and `cost` are aggregates over every
/// holder; a holder's slice is proportional to their share balance.
#[derive(Clone, Debug)]
pub struct Position {
    pub market: MarketId,
    pub is_long: bool,
    pub leverage: u8,
    /// Index of the entry price point. Indices at or past the oracle's
    /// length have not settled yet.
    pub price_index: usize,
    /// Total shares outstanding across all holders.
    pub oi_shares: u128,
    pub debt: u128,
    pub cost: u128,
    pub liquidated: bool,
}

/// Sparse balances of position shares, per position per holder.
#[derive(Clone, Debug, Default)]
pub struct ShareLedger {
    balances: HashMap<PositionId, HashMap<AccountId, u128>>,
    totals: HashMap<PositionId, u128>,
}

impl ShareLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, id: PositionId, holder: AccountId) -> u128 {
        self.balances
            .get(&id)
            .and_then(|holders| holders.get(&holder))
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self, id: PositionId) -> u128 {
        self.totals.get(&id).copied().unwrap_or(0)
    }

    pub fn mint(&mut self, id: PositionId, holder: AccountId, amount: u128) {
        if amount == 0 {
            return;
        }
        *self
            .balances
            .entry(id)
            .or_default()
            .entry(holder)
            .or_insert(0) += amount;
        *self.totals.entry(id).or_insert(0) += amount;
    }

    pub fn burn(
        &mut self,
        id: PositionId,
        holder: AccountId,
        amount: u128,
    ) -> Result<(), EngineError> {
        let holders = self
            .balances
            .get_mut(&id)
            .ok_or(EngineError::InsufficientShares)?;
        let balance = holders.get_mut(&holder).ok_or(EngineError::InsufficientShares)?;
        if *balance < amount {
            return Err(EngineError::InsufficientShares);
        }
        *balance -= amount;
        if *balance == 0 {
            holders.remove(&holder);
        }
        let total = self.totals.entry(id).or_insert(0);
        *total -= amount;
        if *total == 0 {
            self.totals.remove(&id);
            self.balances.remove(&id);
        }
        Ok(())
    }

    pub fn transfer(
        &mut self,
        id: PositionId,
        from: AccountId,
        to: AccountId,
        amount: u128,
    ) -> Result<(), EngineError> {
        if from == to || amount == 0 {
            // still reject if the sender does not hold enough
            if self.balance(id, from) < amount {
                return Err(EngineError::InsufficientShares);
            }
            return Ok(());
        }
        let holders = self
            .balances
            .get_mut(&id)
            .ok_or(EngineError::InsufficientShares)?;
        let balance = holders.get_mut(&from).ok_or(EngineError::InsufficientShares)?;
        if *balance < amount {
            return Err(EngineError::InsufficientShares);
        }
        *balance -= amount;
        if *balance == 0 {
            holders.remove(&from);
        }
        *holders.entry(to).or_insert(0) += amount;
        Ok(())
    }

    /// Zero every holder's balance for a liquidated position.
    pub fn burn_all(&mut self, id: PositionId) {
        self.balances.remove(&id);
        self.totals.remove(&id);
    }
}
