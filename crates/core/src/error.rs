//! Engine error taxonomy.
//!
//! Every variant is a synchronously-reported precondition violation:
//! the failing operation aborts with no partial state change.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("collateral below minimum")]
    CollateralBelowMinimum,

    #[error("leverage above market maximum")]
    LeverageTooHigh,

    #[error("open interest cap exceeded")]
    OiCapExceeded,

    #[error("adjusted oi below accepted minimum")]
    Slippage,

    #[error("market inactive")]
    MarketInactive,

    #[error("insufficient position shares")]
    InsufficientShares,

    #[error("position not liquidatable")]
    NotLiquidatable,

    #[error("position already liquidated")]
    PositionLiquidated,

    #[error("position not found")]
    PositionNotFound,

    #[error("caller not authorized")]
    Unauthorized,

    #[error("insufficient token balance")]
    InsufficientBalance,

    #[error("caller lacks mint/burn authority")]
    NotMintAuthority,

    #[error("arithmetic overflow")]
    Overflow,
}
