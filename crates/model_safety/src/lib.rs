//! Pure Rust safety model of the market's risk accounting
//! No engine dependencies, no unwrap/panic, all functions total

pub mod state;
pub mod math;
pub mod helpers;
pub mod transitions;

// Re-export commonly used types
pub use state::*;
pub use helpers::*;
pub use transitions::*;
