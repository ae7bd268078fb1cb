// Core layer: the decision logic behind each command, independent of the CLI.

pub mod base_ami;
pub mod frontend;
pub mod synthetic_tests;
pub mod test_gate;

pub use crate::utils::error::Result;
