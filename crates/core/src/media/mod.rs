//! Media library side: titles and their files as reported by *arr managers.

mod arr;
mod manager;
mod types;

pub use arr::{ArrKind, ArrSource};
pub use manager::DefaultMediaManager;
pub use types::*;
