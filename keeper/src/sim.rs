//! In-process market simulation the keeper runs against.
//!
//! Stands in for a deployed instance: a random-walk reference feed,
//! a handful of synthetic traders opening leveraged positions, and the
//! periodic heartbeat. The keeper watches this world and liquidates.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use torsion_core::math::WAD;
use torsion_core::{
    AccountId, CollateralManager, ComptrollerParams, EngineError, Market, MarketParams,
    OracleParams, Registry, RegistryParams, SteppedFeed, Token, UpdateOutcome,
};

use crate::config::Config;

pub const GOVERNOR: AccountId = 1;
pub const MANAGER: AccountId = 2;
pub const KEEPER: AccountId = 3;
pub const FEE_TO: AccountId = 4;
const TRADERS: [AccountId; 4] = [10, 11, 12, 13];

pub struct Sim {
    pub registry: Registry,
    pub token: Token,
    pub market: Market,
    pub manager: CollateralManager,
    pub feed: SteppedFeed,
    pub now: u64,
    price_wad: u128,
    tick_secs: u64,
    walk_bps: u64,
    flow_percent: u8,
    leverage_max: u8,
    rng: StdRng,
}

impl Sim {
    pub fn new(config: &Config) -> Result<Self> {
        let mut registry = Registry::new(
            GOVERNOR,
            RegistryParams {
                fee_rate: config.fee_wad(),
                fee_burn_rate: WAD / 2,
                margin_burn_rate: WAD / 2,
                fee_to: FEE_TO,
            },
        );
        registry
            .set_market_active(GOVERNOR, 0, true)
            .map_err(|e| anyhow::anyhow!("registry setup: {e}"))?;
        registry
            .set_manager_active(GOVERNOR, MANAGER, true)
            .map_err(|e| anyhow::anyhow!("registry setup: {e}"))?;

        let mut token = Token::new(GOVERNOR);
        token
            .grant_authority(GOVERNOR, MANAGER)
            .map_err(|e| anyhow::anyhow!("token setup: {e}"))?;
        for trader in TRADERS {
            token
                .mint(MANAGER, trader, 100_000 * WAD)
                .map_err(|e| anyhow::anyhow!("token setup: {e}"))?;
        }

        let market = Market::new(
            0,
            GOVERNOR,
            MarketParams {
                k: config.k_wad(),
                update_period: config.update_period,
                compounding_period: config.compounding_period,
                leverage_max: config.leverage_max,
                margin_maintenance: config.maintenance_wad(),
                margin_reward_rate: WAD / 2,
            },
            ComptrollerParams {
                impact_window: 10 * config.update_period,
                brrrrd_window_macro: 60 * config.update_period,
                brrrrd_window_micro: 10 * config.update_period,
                lambda: config.lambda_wad(),
                static_cap: config.static_cap_wad(),
                brrrrd_expected: WAD / 4,
                cardinality: 60,
            },
            OracleParams {
                update_period: config.update_period,
                spread: WAD / 1000,
                window_macro: 10 * config.update_period,
                window_micro: config.update_period,
                price_frame_cap: 5 * WAD,
            },
            0,
        );

        Ok(Self {
            registry,
            token,
            market,
            manager: CollateralManager::new(MANAGER),
            feed: SteppedFeed::new(WAD),
            now: 0,
            price_wad: WAD,
            tick_secs: config.tick_secs,
            walk_bps: config.walk_bps,
            flow_percent: config.flow_percent,
            leverage_max: config.leverage_max,
            rng: StdRng::from_entropy(),
        })
    }

    /// Advance one tick: walk the feed, maybe admit synthetic flow,
    /// then heartbeat the market.
    pub fn tick(&mut self) -> Result<UpdateOutcome> {
        self.now += self.tick_secs;
        self.walk_feed();
        self.synthetic_flow();

        let outcome = self
            .manager
            .update(
                &self.registry,
                &mut self.market,
                &mut self.token,
                &self.feed,
                self.now,
            )
            .map_err(|e| anyhow::anyhow!("heartbeat: {e}"))?;
        Ok(outcome)
    }

    pub fn liquidate(&mut self, id: usize) -> Result<u128, EngineError> {
        self.manager.liquidate(
            &self.registry,
            &mut self.market,
            &mut self.token,
            KEEPER,
            id,
            self.now,
        )
    }

    pub fn price(&self) -> f64 {
        self.price_wad as f64 / WAD as f64
    }

    fn walk_feed(&mut self) {
        let bps = self.rng.gen_range(0..=2 * self.walk_bps) as i128 - self.walk_bps as i128;
        let delta = self.price_wad as i128 * bps / 10_000;
        let next = (self.price_wad as i128 + delta).max(WAD as i128 / 100);
        self.price_wad = next as u128;
        self.feed.set_price(self.now, self.price_wad);
    }

    fn synthetic_flow(&mut self) {
        if self.rng.gen_range(0..100) >= self.flow_percent {
            return;
        }
        let trader = TRADERS[self.rng.gen_range(0..TRADERS.len())];
        let collateral = self.rng.gen_range(1..=50) as u128 * WAD;
        let leverage = self.rng.gen_range(1..=self.leverage_max);
        let is_long = self.rng.gen_bool(0.5);

        match self.manager.build(
            &self.registry,
            &mut self.market,
            &mut self.token,
            trader,
            collateral,
            leverage,
            is_long,
            0,
            self.now,
        ) {
            Ok(id) => log::debug!(
                "trader {trader} built position {id}: {collateral} x{leverage} {}",
                if is_long { "long" } else { "short" }
            ),
            Err(EngineError::OiCapExceeded) => {
                log::debug!("build rejected, side at capacity");
            }
            Err(e) => log::warn!("synthetic build failed: {e}"),
        }
    }
}
