//! End-to-end workflows run by `run-scenarios`. Each one works against the
//! `disk` filesystem and derives its resource ids from the run id, so
//! cleanup can find them even after a failed step.

pub mod basic_streaming;
pub mod content_creator;
pub mod multi_platform;
pub mod recording_management;
pub mod team_collaboration;

pub use basic_streaming::BasicStreamingScenario;
pub use content_creator::ContentCreatorScenario;
pub use multi_platform::MultiPlatformScenario;
pub use recording_management::RecordingManagementScenario;
pub use team_collaboration::TeamCollaborationScenario;

use crate::core::scenario::ScenarioSequence;
use crate::utils::error::{HarnessError, Result};

pub const DISK: &str = "disk";

pub(crate) fn ensure(condition: bool, step: &str, message: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(HarnessError::scenario(step, message))
    }
}

pub(crate) fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// All workflows in their usual order.
pub fn default_sequence(run_id: impl Into<String>) -> ScenarioSequence {
    let mut sequence = ScenarioSequence::new(run_id);
    sequence.add_scenario(Box::new(BasicStreamingScenario));
    sequence.add_scenario(Box::new(ContentCreatorScenario));
    sequence.add_scenario(Box::new(MultiPlatformScenario));
    sequence.add_scenario(Box::new(RecordingManagementScenario));
    sequence.add_scenario(Box::new(TeamCollaborationScenario));
    sequence
}
