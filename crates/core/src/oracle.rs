//! Price-point construction from a dual-window TWAP feed.
//!
//! The external feed exposes raw cumulative observations; the oracle
//! composes them into macro- and micro-window averages itself
//! (observe-then-difference) and emits discrete, time-gated
//! `PricePoint` snapshots. Positions record the point index current at
//! enqueue time and settle against the index current at exit time.

use crate::math::{div_down, exp_neg_wad, exp_wad, mul_down};

/// External time-weighted price source.
pub trait PriceFeed {
    /// Cumulative price·seconds (WAD·s) observed up to `at`.
    fn cumulative(&self, at: u64) -> u128;
}

/// Immutable settlement snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PricePoint {
    pub bid: u128,
    pub ask: u128,
    /// Macro reading, for display/reference.
    pub price: u128,
}

#[derive(Clone, Copy, Debug)]
pub struct OracleParams {
    /// Minimum seconds between price points.
    pub update_period: u64,
    /// Half-spread applied as e^(±spread), WAD.
    pub spread: u128,
    /// TWAP windows, seconds.
    pub window_macro: u64,
    pub window_micro: u64,
    /// Bound on the long-side payout multiple between two points, WAD.
    pub price_frame_cap: u128,
}

/// Append-only, index-addressed sequence of price points.
#[derive(Clone, Debug)]
pub struct PricePointOracle {
    pub params: OracleParams,
    price_points: Vec<PricePoint>,
    last_update: u64,
}

impl PricePointOracle {
    pub fn new(params: OracleParams) -> Self {
        Self {
            params,
            price_points: Vec::new(),
            last_update: 0,
        }
    }

    pub fn point(&self, index: usize) -> Option<&PricePoint> {
        self.price_points.get(index)
    }

    pub fn len(&self) -> usize {
        self.price_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.price_points.is_empty()
    }

    /// Index the next created price point will receive. Recorded by
    /// positions at enqueue time.
    pub fn index_next(&self) -> usize {
        self.price_points.len()
    }

    pub fn last_update(&self) -> u64 {
        self.last_update
    }

    fn twap(&self, feed: &dyn PriceFeed, now: u64, window: u64) -> u128 {
        if window == 0 {
            return 0;
        }
        let from = now.saturating_sub(window);
        let delta = feed.cumulative(now).saturating_sub(feed.cumulative(from));
        delta / window as u128
    }

    /// Create a new price point if `update_period` has elapsed.
    /// Early calls are no-ops, not errors.
    pub fn update(&mut self, feed: &dyn PriceFeed, now: u64) -> Option<usize> {
        if !self.price_points.is_empty()
            && now.saturating_sub(self.last_update) < self.params.update_period
        {
            return None;
        }

        let micro = self.twap(feed, now, self.params.window_micro);
        let macr = self.twap(feed, now, self.params.window_macro);

        let point = PricePoint {
            bid: mul_down(micro.min(macr), exp_neg_wad(self.params.spread)),
            ask: mul_down(micro.max(macr), exp_wad(self.params.spread)),
            price: macr,
        };

        self.price_points.push(point);
        self.last_update = now;
        Some(self.price_points.len() - 1)
    }

    /// Payout multiple between entry and exit points. Long frames are
    /// capped; short payoff is already bounded by the 2x structure, so
    /// the short frame is not.
    pub fn price_frame(&self, entry: usize, exit: usize, is_long: bool) -> Option<u128> {
        let entry = self.price_points.get(entry)?;
        let exit = self.price_points.get(exit)?;
        let frame = if is_long {
            div_down(exit.bid, entry.ask).min(self.params.price_frame_cap)
        } else {
            div_down(exit.ask, entry.bid)
        };
        Some(frame)
    }
}

/// Piecewise-constant reference feed, for harnesses and tests. The
/// price at each step holds until the next one; the first price is
/// extended backward so windows are defined from t = 0.
#[derive(Clone, Debug)]
pub struct SteppedFeed {
    steps: Vec<(u64, u128)>,
}

impl SteppedFeed {
    pub fn new(initial_price: u128) -> Self {
        Self {
            steps: vec![(0, initial_price)],
        }
    }

    /// Record a new price taking effect at `at`. Steps must arrive in
    /// time order; out-of-order steps are ignored.
    pub fn set_price(&mut self, at: u64, price: u128) {
        if let Some(&(last, _)) = self.steps.last() {
            if at < last {
                return;
            }
        }
        self.steps.push((at, price));
    }

    pub fn price_at(&self, at: u64) -> u128 {
        let mut price = self.steps[0].1;
        for &(t, p) in &self.steps {
            if t > at {
                break;
            }
            price = p;
        }
        price
    }
}

impl PriceFeed for SteppedFeed {
    fn cumulative(&self, at: u64) -> u128 {
        let mut acc: u128 = 0;
        for (i, &(start, price)) in self.steps.iter().enumerate() {
            if start >= at {
                break;
            }
            let end = match self.steps.get(i + 1) {
                Some(&(next, _)) => next.min(at),
                None => at,
            };
            acc = acc.saturating_add(price.saturating_mul((end - start) as u128));
        }
        acc
    }
}
