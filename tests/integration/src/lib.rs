//! Torsion integration tests
//!
//! End-to-end scenarios driving the whole stack: registry, token,
//! market heartbeat and the collateral manager together. A shared
//! harness lives here; the scenarios are under `tests/`.

use torsion_core::{
    AccountId, CollateralManager, ComptrollerParams, Market, MarketParams, OracleParams,
    Registry, RegistryParams, SteppedFeed, Token,
};

pub const WAD: u128 = torsion_core::math::WAD;

pub const GOVERNOR: AccountId = 1;
pub const MANAGER: AccountId = 2;
pub const ALICE: AccountId = 10;
pub const BOB: AccountId = 11;
pub const CAROL: AccountId = 12;
pub const FEE_TO: AccountId = 99;

pub struct Harness {
    pub registry: Registry,
    pub token: Token,
    pub market: Market,
    pub manager: CollateralManager,
    pub feed: SteppedFeed,
    pub now: u64,
}

#[derive(Clone, Copy)]
pub struct HarnessConfig {
    pub fee_rate: u128,
    pub lambda: u128,
    pub k: u128,
    pub static_cap: u128,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            fee_rate: 0,
            lambda: 0,
            k: 0,
            static_cap: 800_000 * WAD,
        }
    }
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        let mut registry = Registry::new(
            GOVERNOR,
            RegistryParams {
                fee_rate: config.fee_rate,
                fee_burn_rate: WAD / 2,
                margin_burn_rate: WAD / 2,
                fee_to: FEE_TO,
            },
        );
        registry.set_market_active(GOVERNOR, 0, true).unwrap();
        registry.set_manager_active(GOVERNOR, MANAGER, true).unwrap();

        let mut token = Token::new(GOVERNOR);
        token.grant_authority(GOVERNOR, MANAGER).unwrap();
        for trader in [ALICE, BOB, CAROL] {
            token.mint(MANAGER, trader, 10_000 * WAD).unwrap();
        }

        let market = Market::new(
            0,
            GOVERNOR,
            MarketParams {
                k: config.k,
                update_period: 100,
                compounding_period: 100,
                leverage_max: 100,
                margin_maintenance: WAD / 20,
                margin_reward_rate: WAD / 2,
            },
            ComptrollerParams {
                impact_window: 600,
                brrrrd_window_macro: 3600,
                brrrrd_window_micro: 600,
                lambda: config.lambda,
                static_cap: config.static_cap,
                brrrrd_expected: WAD / 4,
                cardinality: 16,
            },
            OracleParams {
                update_period: 100,
                spread: 0,
                window_macro: 600,
                window_micro: 60,
                price_frame_cap: 5 * WAD,
            },
            1000,
        );

        Self {
            registry,
            token,
            market,
            manager: CollateralManager::new(MANAGER),
            feed: SteppedFeed::new(WAD),
            now: 1000,
        }
    }

    /// Drive the heartbeat at the current clock.
    pub fn update(&mut self) {
        self.manager
            .update(
                &self.registry,
                &mut self.market,
                &mut self.token,
                &self.feed,
                self.now,
            )
            .unwrap();
    }

    /// Advance the clock, then heartbeat.
    pub fn advance(&mut self, dt: u64) {
        self.now += dt;
        self.update();
    }

    pub fn build(
        &mut self,
        trader: AccountId,
        collateral: u128,
        leverage: u8,
        is_long: bool,
    ) -> usize {
        self.manager
            .build(
                &self.registry,
                &mut self.market,
                &mut self.token,
                trader,
                collateral,
                leverage,
                is_long,
                0,
                self.now,
            )
            .unwrap()
    }

    pub fn unwind(&mut self, trader: AccountId, id: usize, shares: u128) -> u128 {
        self.manager
            .unwind(
                &self.registry,
                &mut self.market,
                &mut self.token,
                trader,
                id,
                shares,
                self.now,
            )
            .unwrap()
    }
}
