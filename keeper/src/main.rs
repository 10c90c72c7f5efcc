//! Torsion liquidation keeper
//!
//! Service that heartbeats a market, monitors position health and
//! liquidates undercollateralized positions, collecting the margin
//! reward. Runs against an in-process simulated market instance.

mod config;
mod health;
mod priority_queue;
mod sim;

use anyhow::Result;
use config::Config;
use priority_queue::HealthQueue;
use sim::{Sim, KEEPER};
use std::time::Duration;
use tokio::time;
use torsion_core::math::WAD;
use torsion_core::EngineError;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting Torsion liquidation keeper");

    // Load configuration
    let config = Config::load().unwrap_or_else(|_| {
        log::warn!("Failed to load config, using default local config");
        Config::default_local()
    });

    let mut sim = Sim::new(&config)?;
    let mut queue = HealthQueue::new();

    log::info!(
        "Market up: update period {}s, k {} bps, maintenance {} bps",
        config.update_period,
        config.k_bps,
        config.maintenance_bps
    );
    log::info!("Keeper service started. Monitoring for liquidations...");

    // Main event loop
    let mut interval = time::interval(Duration::from_secs(config.poll_interval_secs));

    loop {
        interval.tick().await;

        let outcome = match sim.tick() {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Tick failed: {e}");
                continue;
            }
        };
        if outcome.settled {
            log::debug!(
                "Settled at t={}; price {:.4}, oi {:?}",
                sim.now,
                sim.price(),
                sim.market.oi()
            );
        }

        health::refresh_queue(&mut queue, &sim.manager, &sim.market, sim.now);

        if let Err(e) = process_liquidations(&mut queue, &mut sim, &config) {
            log::error!("Error processing liquidations: {e}");
        }

        if let Some(worst) = queue.peek() {
            log::debug!(
                "Tracking {} positions; worst health {:.4}",
                queue.len(),
                worst.health as f64 / WAD as f64
            );
        }
    }
}

/// Liquidate the worst positions in the queue, up to the batch bound
fn process_liquidations(queue: &mut HealthQueue, sim: &mut Sim, config: &Config) -> Result<()> {
    let liquidatable = queue.get_liquidatable();

    if liquidatable.is_empty() {
        return Ok(());
    }

    log::info!("Found {} positions below maintenance", liquidatable.len());

    for entry in liquidatable
        .iter()
        .take(config.max_liquidations_per_batch)
    {
        match sim.liquidate(entry.id) {
            Ok(reward) => {
                log::info!(
                    "Liquidated position {} (health {:.4}); reward {:.4}, keeper balance {:.4}",
                    entry.id,
                    entry.health as f64 / WAD as f64,
                    reward as f64 / WAD as f64,
                    sim.token.balance(KEEPER) as f64 / WAD as f64
                );
                queue.remove(entry.id);
            }
            Err(EngineError::NotLiquidatable) => {
                // the mark moved back above maintenance since scoring
                queue.remove(entry.id);
            }
            Err(e) => {
                log::error!("Failed to liquidate position {}: {e}", entry.id);
            }
        }
    }

    Ok(())
}
