//! Data models for giving-dashboard entities.
//!
//! This module contains the data structures used to represent fund data:
//!
//! - `ContributionRecord`: a single giving record from the provider
//! - `FundKey`, `FundSpec`: fund identity and configuration
//! - `FundSnapshot`: one fund's contributions plus its goal amount

pub mod contribution;
pub mod fund;

pub use contribution::ContributionRecord;
pub use fund::{FundKey, FundSnapshot, FundSpec};
