//! Nerkh Common Types
//!
//! This crate contains the value types shared by the rate engine and its
//! collaborators: currency codes, rate sources, quoted rates and the
//! supported-currency catalogue.

pub mod identifiers;
pub mod monetary;
pub mod catalogue;
pub mod error;
pub mod time;

pub use identifiers::*;
pub use monetary::*;
pub use catalogue::*;
pub use error::*;
pub use time::*;
