//! Invariant checking helpers

use crate::math::*;
use crate::state::*;

/// Total settled OI across both sides
pub fn total_settled_oi(s: &State) -> u128 {
    add_u128(s.long.oi, s.short.oi)
}

/// Settled long minus short exposure
pub fn imbalance(s: &State) -> i128 {
    sub_i128(u128_to_i128(s.long.oi), u128_to_i128(s.short.oi))
}

/// Per-side cap covers settled plus queued exposure
pub fn cap_respected(s: &State) -> bool {
    add_u128(s.long.oi, s.queued_long.oi) <= s.params.cap
        && add_u128(s.short.oi, s.queued_short.oi) <= s.params.cap
}

/// Queued exposure always carries shares 1:1
pub fn queued_parity(s: &State) -> bool {
    s.queued_long.oi == s.queued_long.shares && s.queued_short.oi == s.queued_short.shares
}

/// Sum of live holders' cost basis
pub fn total_live_cost(s: &State) -> u128 {
    s.holders
        .iter()
        .filter(|h| !h.liquidated)
        .fold(0u128, |acc, h| add_u128(acc, h.cost))
}

/// Backing held by the ledger equals live cost basis plus the pot.
/// Exits move backing by exactly the exiting cost, so this is exact.
pub fn backing_consistent(s: &State) -> bool {
    s.backing == add_u128(total_live_cost(s), s.pot)
}

/// Share totals per side match the holders still standing
pub fn shares_accounted(s: &State) -> bool {
    let (mut long, mut short, mut queued_long, mut queued_short) = (0u128, 0u128, 0u128, 0u128);
    for h in s.holders.iter() {
        if h.liquidated || h.shares == 0 {
            continue;
        }
        match (h.is_long, h.settled) {
            (true, true) => long = add_u128(long, h.shares),
            (false, true) => short = add_u128(short, h.shares),
            (true, false) => queued_long = add_u128(queued_long, h.shares),
            (false, false) => queued_short = add_u128(queued_short, h.shares),
        }
    }
    long == s.long.shares
        && short == s.short.shares
        && queued_long == s.queued_long.shares
        && queued_short == s.queued_short.shares
}
