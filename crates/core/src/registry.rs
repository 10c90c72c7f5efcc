//! Protocol registry: global fee parameters and the activation status
//! of markets and collateral managers, all gated to the governor.

use std::collections::HashSet;

use crate::error::EngineError;
use crate::market::MarketId;
use crate::AccountId;

#[derive(Clone, Copy, Debug)]
pub struct RegistryParams {
    /// Trade fee as a WAD fraction of notional.
    pub fee_rate: u128,
    /// Fraction of swept trade fees burned; the rest goes to `fee_to`.
    pub fee_burn_rate: u128,
    /// Fraction of the swept liquidation pot burned.
    pub margin_burn_rate: u128,
    /// Recipient of non-burned fee and liquidation sweeps.
    pub fee_to: AccountId,
}

#[derive(Clone, Debug)]
pub struct Registry {
    governor: AccountId,
    params: RegistryParams,
    active_markets: HashSet<MarketId>,
    active_managers: HashSet<AccountId>,
}

impl Registry {
    pub fn new(governor: AccountId, params: RegistryParams) -> Self {
        Self {
            governor,
            params,
            active_markets: HashSet::new(),
            active_managers: HashSet::new(),
        }
    }

    pub fn fee_rate(&self) -> u128 {
        self.params.fee_rate
    }

    pub fn fee_burn_rate(&self) -> u128 {
        self.params.fee_burn_rate
    }

    pub fn margin_burn_rate(&self) -> u128 {
        self.params.margin_burn_rate
    }

    pub fn fee_to(&self) -> AccountId {
        self.params.fee_to
    }

    pub fn is_market_active(&self, market: MarketId) -> bool {
        self.active_markets.contains(&market)
    }

    pub fn is_manager_active(&self, manager: AccountId) -> bool {
        self.active_managers.contains(&manager)
    }

    fn require_governor(&self, caller: AccountId) -> Result<(), EngineError> {
        if caller != self.governor {
            return Err(EngineError::Unauthorized);
        }
        Ok(())
    }

    pub fn set_fee_rate(&mut self, caller: AccountId, rate: u128) -> Result<(), EngineError> {
        self.require_governor(caller)?;
        self.params.fee_rate = rate;
        Ok(())
    }

    pub fn set_fee_burn_rate(&mut self, caller: AccountId, rate: u128) -> Result<(), EngineError> {
        self.require_governor(caller)?;
        self.params.fee_burn_rate = rate;
        Ok(())
    }

    pub fn set_margin_burn_rate(
        &mut self,
        caller: AccountId,
        rate: u128,
    ) -> Result<(), EngineError> {
        self.require_governor(caller)?;
        self.params.margin_burn_rate = rate;
        Ok(())
    }

    pub fn set_fee_to(&mut self, caller: AccountId, to: AccountId) -> Result<(), EngineError> {
        self.require_governor(caller)?;
        self.params.fee_to = to;
        Ok(())
    }

    pub fn set_market_active(
        &mut self,
        caller: AccountId,
        market: MarketId,
        active: bool,
    ) -> Result<(), EngineError> {
        self.require_governor(caller)?;
        if active {
            self.active_markets.insert(market);
        } else {
            self.active_markets.remove(&market);
        }
        Ok(())
    }

    pub fn set_manager_active(
        &mut self,
        caller: AccountId,
        manager: AccountId,
        active: bool,
    ) -> Result<(), EngineError> {
        self.require_governor(caller)?;
        if active {
            self.active_managers.insert(manager);
        } else {
            self.active_managers.remove(&manager);
        }
        Ok(())
    }
}
