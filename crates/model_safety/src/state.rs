//! Pure state model of one market's risk accounting

/// Fixed point scale for the model, matching the engine's WAD.
pub const WAD: u128 = 1_000_000_000_000_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Params {
    /// Per-period imbalance decay factor `(1 - 2k)`, WAD
    pub funding_factor_wad: u128,
    /// Maintenance margin as a WAD fraction of shares
    pub maintenance_wad: u128,
    /// Open-interest cap per side
    pub cap: u128,
}

/// One side of the book: settled or queued exposure with its shares
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Side {
    pub oi: u128,
    pub shares: u128,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Holder {
    pub is_long: bool,
    pub shares: u128,
    pub debt: u128,
    pub cost: u128,
    /// Whether this holder's exposure has settled into the live pools
    pub settled: bool,
    pub liquidated: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct State {
    pub long: Side,
    pub short: Side,
    pub queued_long: Side,
    pub queued_short: Side,
    /// Token supply floating with realized PnL
    pub supply: u128,
    /// Collateral backing held by the ledger, including the pot
    pub backing: u128,
    /// Remainder of liquidated value awaiting sweep
    pub pot: u128,
    pub holders: arrayvec::ArrayVec<Holder, 6>, // Small fixed bound
    pub params: Params,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            funding_factor_wad: WAD - WAD / 50, // k = 1%
            maintenance_wad: WAD / 20,
            cap: 1_000_000 * WAD,
        }
    }
}

impl Default for State {
    fn default() -> Self {
        Self {
            long: Side::default(),
            short: Side::default(),
            queued_long: Side::default(),
            queued_short: Side::default(),
            supply: 0,
            backing: 0,
            pot: 0,
            holders: arrayvec::ArrayVec::new(),
            params: Params::default(),
        }
    }
}
