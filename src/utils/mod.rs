pub mod format;

pub use format::{format_inr, format_month, truncate_string};
