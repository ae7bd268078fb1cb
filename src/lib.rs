pub mod adapters;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use utils::error::{Result, TubularError};
