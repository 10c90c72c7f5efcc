//! Impact-pressure and money-supply comptroller.
//!
//! Three rolling accumulators back two read paths: per-side trade
//! pressure drives the exponential impact fee, and the signed net
//! mint/burn series ("brrrrd") drives the dynamic open-interest cap,
//! which fades the static cap after heavy recent issuance.

use crate::math::{clamp_pos, div_down, exp_neg_wad, mul_down, WAD};
use crate::rollers::RollingAccumulator;

#[derive(Clone, Copy, Debug)]
pub struct ComptrollerParams {
    /// Window over which trade pressure cools down, seconds.
    pub impact_window: u64,
    /// Issuance windows for the dynamic cap, seconds.
    pub brrrrd_window_macro: u64,
    pub brrrrd_window_micro: u64,
    /// Impact fee steepness, WAD.
    pub lambda: u128,
    /// Static open-interest cap per side, WAD.
    pub static_cap: u128,
    /// Expected issuance per macro window as a WAD fraction of the
    /// static cap; printing past it fades the cap, reaching zero at
    /// twice the expectation.
    pub brrrrd_expected: u128,
    /// Accumulator slots provisioned at construction. Must cover the
    /// writes that can land inside the longest window, or old samples
    /// get overwritten while still in scope.
    pub cardinality: u32,
}

#[derive(Clone, Debug)]
pub struct Comptroller {
    pub params: ComptrollerParams,
    pressure_long: RollingAccumulator,
    pressure_short: RollingAccumulator,
    brrrrd: RollingAccumulator,
}

impl Comptroller {
    /// Accumulators are seeded at `now` and provisioned to the
    /// configured cardinality up front, so windowed reads see history
    /// from the first write on.
    pub fn new(params: ComptrollerParams, now: u64) -> Self {
        let mut comptroller = Self {
            params,
            pressure_long: RollingAccumulator::new(now),
            pressure_short: RollingAccumulator::new(now),
            brrrrd: RollingAccumulator::new(now),
        };
        comptroller.expand(params.cardinality);
        comptroller
    }

    /// Raise the requested capacity of all three accumulators.
    pub fn expand(&mut self, cardinality_next: u32) {
        self.pressure_long.expand(cardinality_next);
        self.pressure_short.expand(cardinality_next);
        self.brrrrd.expand(cardinality_next);
    }

    /// Record trade pressure for a batch of entries. Each entry is
    /// scaled by the cap at write time; entries within one call land in
    /// the same period and merge into a single sample.
    pub fn impact(&mut self, now: u64, entries: &[(bool, u128)]) {
        let cap = self.oi_cap(now);
        for &(is_long, amount) in entries {
            let pressure = div_down(amount, cap);
            let pressure = i128::try_from(pressure).unwrap_or(i128::MAX);
            if is_long {
                self.pressure_long.write(now, pressure);
            } else {
                self.pressure_short.write(now, pressure);
            }
        }
    }

    /// Fee multiplier (WAD) for a pending trade of `extra_amount` on
    /// one side: `1 - e^(-lambda * pressure)` over the windowed
    /// pressure sum plus the pending trade's own contribution.
    pub fn view_impact(&self, now: u64, is_long: bool, extra_amount: u128) -> u128 {
        let acc = if is_long {
            &self.pressure_long
        } else {
            &self.pressure_short
        };
        let (roller_now, roller_then) = acc.scry(now, self.params.impact_window);
        let windowed = clamp_pos(roller_now.value.saturating_sub(roller_then.value));
        let pressure = windowed.saturating_add(div_down(extra_amount, self.oi_cap(now)));
        if pressure == 0 {
            return 0;
        }
        WAD - exp_neg_wad(mul_down(self.params.lambda, pressure))
    }

    /// Record a signed mint (positive) or burn (negative) of the
    /// settlement asset.
    pub fn brrrr(&mut self, now: u64, amount: i128) {
        self.brrrrd.write(now, amount);
    }

    /// Net issuance over a window, signed.
    pub fn brrrrd_over(&self, now: u64, window: u64) -> i128 {
        let (roller_now, roller_then) = self.brrrrd.scry(now, window);
        roller_now.value.saturating_sub(roller_then.value)
    }

    /// Dynamic open-interest cap: the static cap faded by recent
    /// issuance. The micro window catches a burst the macro window
    /// would dilute; net burn never raises the cap above static.
    pub fn oi_cap(&self, now: u64) -> u128 {
        let printed = self
            .brrrrd_over(now, self.params.brrrrd_window_macro)
            .max(self.brrrrd_over(now, self.params.brrrrd_window_micro));
        let printed = clamp_pos(printed);

        let expected = mul_down(self.params.static_cap, self.params.brrrrd_expected);
        if expected == 0 || printed <= expected {
            return self.params.static_cap;
        }

        let ratio = div_down(printed, expected);
        if ratio >= 2 * WAD {
            0
        } else {
            mul_down(self.params.static_cap, 2 * WAD - ratio)
        }
    }

    #[cfg(test)]
    pub(crate) fn pressure_accumulator(&self, is_long: bool) -> &RollingAccumulator {
        if is_long {
            &self.pressure_long
        } else {
            &self.pressure_short
        }
    }
}
