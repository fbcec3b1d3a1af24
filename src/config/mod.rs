#[cfg(feature = "cli")]
pub mod cli;
pub mod test_config;

pub use test_config::{ConnectionSettings, TestConfig};
