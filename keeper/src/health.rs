//! Health calculation for open positions

use torsion_core::math::mul_down;
use torsion_core::{CollateralManager, Market, PositionId};

use crate::priority_queue::{HealthQueue, PositionHealth};

fn to_i128(x: u128) -> i128 {
    x.min(i128::MAX as u128) as i128
}

/// Snapshot one position's health: value minus maintenance.
///
/// Returns `None` for liquidated, emptied or still-queued positions;
/// those can never be liquidated so the queue should drop them.
pub fn assess(
    manager: &CollateralManager,
    market: &Market,
    id: PositionId,
    now: u64,
) -> Option<PositionHealth> {
    let pos = manager.position(id)?;
    if pos.liquidated || pos.oi_shares == 0 || pos.price_index >= market.oracle.len() {
        return None;
    }

    let value = manager.value(market, id).ok()?;
    let maintenance = mul_down(pos.oi_shares, market.params.margin_maintenance);

    Some(PositionHealth {
        id,
        health: to_i128(value) - to_i128(maintenance),
        value,
        maintenance,
        last_update: now,
    })
}

/// Re-score every known position and rebuild the queue entries.
pub fn refresh_queue(
    queue: &mut HealthQueue,
    manager: &CollateralManager,
    market: &Market,
    now: u64,
) {
    for id in 0..manager.position_count() {
        match assess(manager, market, id, now) {
            Some(health) => queue.push(health),
            None => {
                queue.remove(id);
            }
        }
    }
}
