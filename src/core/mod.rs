//! Core invoice types, money arithmetic, totals, numbering and persistence
//! ports.
//!
//! Everything in this module is free of I/O except through the
//! [`Store`] traits.

pub mod amounts;
mod builder;
mod drafts;
mod error;
mod memory;
mod numbering;
mod store;
mod totals;
mod types;
mod validation;

pub use amounts::{checked_sum, format_amount, round2, sum};
pub use builder::*;
pub use drafts::*;
pub use error::*;
pub use memory::MemoryStore;
pub use numbering::*;
pub use store::*;
pub use totals::*;
pub use types::*;
pub use validation::*;
