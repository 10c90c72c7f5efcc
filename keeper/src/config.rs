//! Keeper configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use torsion_core::math::WAD;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Wall-clock seconds between keeper ticks
    pub poll_interval_secs: u64,

    /// Simulated seconds each tick advances the market clock
    pub tick_secs: u64,

    /// Market settlement / price point period, seconds
    pub update_period: u64,

    /// Funding compounding period, seconds
    pub compounding_period: u64,

    /// Funding constant k, basis points
    pub k_bps: u64,

    /// Trade fee, basis points of notional
    pub fee_bps: u64,

    /// Impact sensitivity lambda, basis points
    pub lambda_bps: u64,

    /// Static OI cap, whole tokens per side
    pub static_cap_tokens: u64,

    /// Maintenance margin, basis points of shares
    pub maintenance_bps: u64,

    /// Maximum leverage offered
    pub leverage_max: u8,

    /// Maximum liquidations per tick
    pub max_liquidations_per_batch: usize,

    /// Per-tick feed drift bound, basis points
    pub walk_bps: u64,

    /// Chance per tick that a synthetic trader opens a position, percent
    pub flow_percent: u8,
}

impl Config {
    /// Load configuration from TOML file
    pub fn load() -> Result<Self> {
        let config_path =
            std::env::var("KEEPER_CONFIG").unwrap_or_else(|_| "keeper-config.toml".to_string());

        let config_str = std::fs::read_to_string(&config_path)
            .context(format!("Failed to read config file: {}", config_path))?;

        let config: Config = toml::from_str(&config_str).context("Failed to parse config TOML")?;

        Ok(config)
    }

    /// Create default configuration
    pub fn default_local() -> Self {
        Self {
            poll_interval_secs: 1,
            tick_secs: 15,
            update_period: 60,
            compounding_period: 60,
            k_bps: 10,
            fee_bps: 15,
            lambda_bps: 5_000,
            static_cap_tokens: 800_000,
            maintenance_bps: 500,
            leverage_max: 20,
            max_liquidations_per_batch: 5,
            walk_bps: 50,
            flow_percent: 40,
        }
    }

    /// Write default config to file
    pub fn write_default(path: &str) -> Result<()> {
        let config = Self::default_local();
        let toml_str = toml::to_string_pretty(&config).context("Failed to serialize config")?;

        std::fs::write(path, toml_str).context(format!("Failed to write config to {}", path))?;

        log::info!("Created default config at {}", path);
        Ok(())
    }

    pub fn k_wad(&self) -> u128 {
        self.k_bps as u128 * WAD / 10_000
    }

    pub fn fee_wad(&self) -> u128 {
        self.fee_bps as u128 * WAD / 10_000
    }

    pub fn lambda_wad(&self) -> u128 {
        self.lambda_bps as u128 * WAD / 10_000
    }

    pub fn maintenance_wad(&self) -> u128 {
        self.maintenance_bps as u128 * WAD / 10_000
    }

    pub fn static_cap_wad(&self) -> u128 {
        self.static_cap_tokens as u128 * WAD
    }
}
