pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliArgs;

pub use config::RunConfig;
pub use crate::core::layout::DirectoryLayout;
pub use crate::core::orchestrator::ScenarioPipeline;
pub use crate::core::process::{ProcessInvocation, RecordingProcessRunner, SystemProcessRunner};
pub use domain::model::{PipelineState, RunSummary, ScenarioIdentity, StageKind};
pub use utils::error::{Result, WorkflowError};
