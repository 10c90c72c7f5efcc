//! Risk-accounting core for a synthetic perpetual-exposure market.
//!
//! Traders deposit the settlement asset as collateral and take lever-
//! aged long or short exposure against an external reference feed.
//! There is no order book and no counterparty matching: the system
//! itself takes the other side, prices entry and exit off dual-window
//! TWAPs, throttles one-sided flow with an impact fee and a dynamic
//! open-interest cap, and rebalances the two sides with periodically
//! compounded funding. Profit is minted and loss is burned, so total
//! supply floats with trader PnL.
//!
//! All quantities are 1e18 fixed point ([`math::WAD`]). The state
//! types take `&mut self` on every mutation; callers serialize access,
//! and no operation observes another mid-flight.

pub mod collateral;
pub mod comptroller;
pub mod error;
pub mod market;
pub mod math;
pub mod oracle;
pub mod position;
pub mod registry;
pub mod rollers;
pub mod token;

/// Opaque account identifier for traders, governors and contracts.
pub type AccountId = u64;

pub use collateral::{CollateralManager, MIN_COLLATERAL};
pub use comptroller::{Comptroller, ComptrollerParams};
pub use error::EngineError;
pub use market::{Market, MarketId, MarketParams, UpdateOutcome, MAX_FUNDING_COMPOUND};
pub use oracle::{OracleParams, PriceFeed, PricePoint, PricePointOracle, SteppedFeed};
pub use position::{Position, PositionId, ShareLedger};
pub use registry::{Registry, RegistryParams};
pub use rollers::{Roller, RollingAccumulator};
pub use token::Token;
