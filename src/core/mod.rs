pub mod api;
pub mod client;
pub mod http;
pub mod load;
pub mod manager;
pub mod scenario;

pub use crate::domain::model::{ProcessConfig, ProcessDescriptor, ProcessState};
pub use crate::domain::ports::{CommandRunner, ConnectionProvider};
pub use crate::utils::error::Result;
