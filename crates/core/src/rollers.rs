//! Windowed rolling accumulator.
//!
//! A fixed-capacity, expandable circular buffer of cumulative samples
//! ("rollers"). Writes landing in the same settlement period merge into
//! one sample, so per-period storage stays bounded no matter how many
//! events arrive. `scry` answers "what was the cumulative value `window`
//! seconds ago" by scanning backward and linearly interpolating between
//! the two samples bracketing the target time, in O(cardinality).

use crate::math::mul_div;

/// One timestamped cumulative sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Roller {
    pub timestamp: u64,
    pub value: i128,
}

/// Circular buffer of rollers with deferred, one-slot-per-write growth.
///
/// Invariants: `cardinality <= cardinality_next`, `index < cardinality`,
/// and `rollers.len() == cardinality`.
#[derive(Clone, Debug)]
pub struct RollingAccumulator {
    rollers: Vec<Roller>,
    cardinality: u32,
    cardinality_next: u32,
    index: u32,
}

impl RollingAccumulator {
    /// Seed the series with a zero sample at `now`. Interpolation never
    /// reaches before the seed, so windowed reads span real history
    /// only; a target older than the seed resolves to the seed itself.
    pub fn new(now: u64) -> Self {
        Self {
            rollers: vec![Roller {
                timestamp: now,
                value: 0,
            }],
            cardinality: 1,
            cardinality_next: 1,
            index: 0,
        }
    }

    pub fn cardinality(&self) -> u32 {
        self.cardinality
    }

    pub fn cardinality_next(&self) -> u32 {
        self.cardinality_next
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// Sample at a raw buffer slot. Slots at or above `cardinality` do
    /// not exist yet.
    pub fn roller(&self, slot: u32) -> Option<Roller> {
        self.rollers.get(slot as usize).copied()
    }

    /// Raise the requested capacity. Never shrinks; takes effect one
    /// slot at a time on subsequent writes.
    pub fn expand(&mut self, cardinality_next: u32) {
        if cardinality_next > self.cardinality_next {
            self.cardinality_next = cardinality_next;
        }
    }

    /// Record `amount` at `now`. A write in the same period as the
    /// current sample merges into it; otherwise the cumulative series
    /// continues into the next slot, growing the buffer by one slot if
    /// an expansion is pending.
    pub fn write(&mut self, now: u64, amount: i128) {
        let current = self.rollers[self.index as usize];
        if current.timestamp == now {
            self.rollers[self.index as usize].value =
                current.value.saturating_add(amount);
            return;
        }

        if self.cardinality < self.cardinality_next {
            self.cardinality += 1;
        }
        self.index = (self.index + 1) % self.cardinality;

        let next = Roller {
            timestamp: now,
            value: current.value.saturating_add(amount),
        };
        if (self.index as usize) < self.rollers.len() {
            self.rollers[self.index as usize] = next;
        } else {
            self.rollers.push(next);
        }
    }

    /// Windowed read: the current sample, and the cumulative value at
    /// `now - window` interpolated between its bracketing samples.
    ///
    /// Cold start: if the earliest stored sample is more recent than
    /// the target, it is returned as the best approximation. No data
    /// precedes it, so this is a boundary value, not an error.
    pub fn scry(&self, now: u64, window: u64) -> (Roller, Roller) {
        let roller_now = self.rollers[self.index as usize];
        let target = now.saturating_sub(window);

        if roller_now.timestamp <= target {
            // everything in the buffer is older than the window
            return (roller_now, roller_now);
        }

        let mut after = roller_now;
        for back in 1..self.cardinality {
            let slot = (self.index + self.cardinality - back) % self.cardinality;
            let before = self.rollers[slot as usize];
            if before.timestamp <= target {
                return (roller_now, Self::interpolate(before, after, target));
            }
            after = before;
        }

        // earliest sample is still inside the window
        (roller_now, after)
    }

    fn interpolate(before: Roller, after: Roller, target: u64) -> Roller {
        let dt = after.timestamp - before.timestamp;
        if dt == 0 {
            return before;
        }
        let delta = after.value - before.value;
        let part = mul_div(
            delta.unsigned_abs(),
            (target - before.timestamp) as u128,
            dt as u128,
        );
        let part = i128::try_from(part).unwrap_or(i128::MAX);
        let value = if delta < 0 {
            before.value - part
        } else {
            before.value + part
        };
        Roller {
            timestamp: target,
            value,
        }
    }
}
