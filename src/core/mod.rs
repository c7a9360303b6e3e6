pub mod artifact;
pub mod layout;
pub mod orchestrator;
pub mod process;
pub mod template;

pub use crate::domain::model::{RunSummary, StageKind, StageReport};
pub use crate::domain::ports::{ProcessRunner, ScenarioStage, StageContext};
pub use crate::utils::error::Result;
