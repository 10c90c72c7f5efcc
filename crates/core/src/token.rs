//! Settlement asset ledger.
//!
//! Plain balance accounting plus role-gated supply changes: only
//! accounts granted authority by the governor may mint or burn.

use std::collections::{HashMap, HashSet};

use crate::error::EngineError;
use crate::AccountId;

#[derive(Clone, Debug)]
pub struct Token {
    governor: AccountId,
    balances: HashMap<AccountId, u128>,
    total_supply: u128,
    authorities: HashSet<AccountId>,
}

impl Token {
    pub fn new(governor: AccountId) -> Self {
        Self {
            governor,
            balances: HashMap::new(),
            total_supply: 0,
            authorities: HashSet::new(),
        }
    }

    pub fn balance(&self, account: AccountId) -> u128 {
        self.balances.get(&account).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn is_authority(&self, account: AccountId) -> bool {
        self.authorities.contains(&account)
    }

    pub fn grant_authority(
        &mut self,
        caller: AccountId,
        account: AccountId,
    ) -> Result<(), EngineError> {
        if caller != self.governor {
            return Err(EngineError::Unauthorized);
        }
        self.authorities.insert(account);
        Ok(())
    }

    pub fn revoke_authority(
        &mut self,
        caller: AccountId,
        account: AccountId,
    ) -> Result<(), EngineError> {
        if caller != self.governor {
            return Err(EngineError::Unauthorized);
        }
        self.authorities.remove(&account);
        Ok(())
    }

    pub fn transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: u128,
    ) -> Result<(), EngineError> {
        let balance = self.balance(from);
        if balance < amount {
            return Err(EngineError::InsufficientBalance);
        }
        if from == to || amount == 0 {
            return Ok(());
        }
        self.balances.insert(from, balance - amount);
        *self.balances.entry(to).or_insert(0) += amount;
        Ok(())
    }

    pub fn mint(
        &mut self,
        caller: AccountId,
        to: AccountId,
        amount: u128,
    ) -> Result<(), EngineError> {
        if !self.authorities.contains(&caller) {
            return Err(EngineError::NotMintAuthority);
        }
        *self.balances.entry(to).or_insert(0) += amount;
        self.total_supply += amount;
        Ok(())
    }

    pub fn burn(
        &mut self,
        caller: AccountId,
        from: AccountId,
        amount: u128,
    ) -> Result<(), EngineError> {
        if !self.authorities.contains(&caller) {
            return Err(EngineError::NotMintAuthority);
        }
        let balance = self.balance(from);
        if balance < amount {
            return Err(EngineError::InsufficientBalance);
        }
        self.balances.insert(from, balance - amount);
        self.total_supply -= amount;
        Ok(())
    }
}
