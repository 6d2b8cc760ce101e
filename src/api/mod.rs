//! HTTP client module for the fund data provider.
//!
//! This module provides the `FundClient` for fetching fund snapshots from
//! the spreadsheet-backed endpoint. The endpoint is unauthenticated; each
//! fund is addressed by a `fund` query parameter.

pub mod client;
pub mod error;

pub use client::FundClient;
pub use error::ApiError;
