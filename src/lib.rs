pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod platform;
pub mod utils;

pub use config::{ConnectionSettings, TestConfig};
pub use core::api::{ApiSettings, RestreamerApi};
pub use core::client::RestreamerClient;
pub use core::manager::{ManagerStatus, RestreamerManager};
pub use core::scenario::{Scenario, ScenarioContext, ScenarioSequence};
pub use platform::{ObsManager, PlatformInfo, SystemCommandRunner};
pub use utils::error::{HarnessError, Result};
