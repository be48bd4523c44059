//! Pricing for the openrelay client — a thread-safe price table with
//! built-in defaults, flexible model matching, and an optional background
//! refresh task.
//!
//! Prices are USD per 1 million tokens. Cost estimation is advisory
//! throughout: an unknown model yields no price, never an error.

mod refresh;
mod table;

pub use refresh::{spawn_refresh, PriceSource};
pub use table::PriceTable;

#[doc(inline)]
pub use openrelay_core::pricing::{ModelPricing, PriceOracle};
