//! Tracker retention rules and their lookup by tracker host name.

mod pattern;
mod types;

pub use pattern::PatternTrackerResolver;
pub use types::*;
