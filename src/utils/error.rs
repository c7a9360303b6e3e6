use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration parse error: {message}")]
    ConfigParseError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("[{stage}] missing precondition {}: {reason}", .path.display())]
    MissingPrecondition {
        stage: String,
        path: PathBuf,
        reason: String,
    },

    #[error("No '{marker}' file with prefix '{prefix}' found in {}", .dir.display())]
    ArtifactNotFound {
        dir: PathBuf,
        marker: String,
        prefix: String,
    },

    #[error("{} files match '{marker}' and prefix '{prefix}' in {}: {}", .candidates.len(), .dir.display(), .candidates.join(", "))]
    AmbiguousArtifact {
        dir: PathBuf,
        marker: String,
        prefix: String,
        candidates: Vec<String>,
    },

    #[error("Path is not valid UTF-8: {}", .path.display())]
    NonUtf8Path { path: PathBuf },

    #[error("Template not found: {}", .path.display())]
    TemplateNotFound { path: PathBuf },

    #[error("Placeholder '{token}' does not occur in template {}", .template.display())]
    PlaceholderMissing { template: PathBuf, token: String },

    #[error("Output directory already exists: {}", .path.display())]
    DirectoryExists { path: PathBuf },

    #[error("Failed to launch '{program}': {source}")]
    ProcessSpawnError {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {}", describe_exit(.code))]
    ExternalProcessFailure { program: String, code: Option<i32> },

    #[error("Stage {stage} failed: {source}")]
    StageFailed {
        stage: String,
        #[source]
        source: Box<WorkflowError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Precondition,
    Artifact,
    Template,
    ExternalProcess,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl WorkflowError {
    /// 包裝為指定階段的錯誤
    pub fn in_stage(self, stage: impl Into<String>) -> Self {
        match self {
            // 已經帶有階段資訊的錯誤不重複包裝
            e @ WorkflowError::StageFailed { .. } => e,
            other => WorkflowError::StageFailed {
                stage: stage.into(),
                source: Box::new(other),
            },
        }
    }

    /// 取得最內層的錯誤
    pub fn root_cause(&self) -> &WorkflowError {
        match self {
            WorkflowError::StageFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self.root_cause() {
            WorkflowError::ConfigParseError { .. }
            | WorkflowError::MissingConfigError { .. }
            | WorkflowError::InvalidConfigValueError { .. }
            | WorkflowError::NonUtf8Path { .. } => ErrorCategory::Configuration,
            WorkflowError::MissingPrecondition { .. } | WorkflowError::DirectoryExists { .. } => {
                ErrorCategory::Precondition
            }
            WorkflowError::ArtifactNotFound { .. } | WorkflowError::AmbiguousArtifact { .. } => {
                ErrorCategory::Artifact
            }
            WorkflowError::TemplateNotFound { .. } | WorkflowError::PlaceholderMissing { .. } => {
                ErrorCategory::Template
            }
            WorkflowError::ProcessSpawnError { .. }
            | WorkflowError::ExternalProcessFailure { .. } => ErrorCategory::ExternalProcess,
            WorkflowError::IoError(_)
            | WorkflowError::SerializationError(_)
            | WorkflowError::StageFailed { .. } => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::Template => ErrorSeverity::High,
            ErrorCategory::Precondition | ErrorCategory::Artifact => ErrorSeverity::High,
            ErrorCategory::ExternalProcess => ErrorSeverity::Medium,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self.root_cause() {
            WorkflowError::ConfigParseError { .. } => {
                "Check the TOML syntax of the workflow configuration file".to_string()
            }
            WorkflowError::MissingConfigError { field } => {
                format!("Add '{}' to the workflow configuration", field)
            }
            WorkflowError::InvalidConfigValueError { field, .. } => {
                format!("Fix the value of '{}' in the workflow configuration", field)
            }
            WorkflowError::MissingPrecondition { stage, .. } => format!(
                "Provide the missing input, or enable the stage that produces it before {}",
                stage
            ),
            WorkflowError::ArtifactNotFound { .. } => {
                "Check that the upstream stage completed and used the same filter/resolution"
                    .to_string()
            }
            WorkflowError::AmbiguousArtifact { .. } => {
                "Remove stale files from the output directory so only one candidate matches"
                    .to_string()
            }
            WorkflowError::NonUtf8Path { .. } => {
                "Rename the file or directory so its path is valid UTF-8".to_string()
            }
            WorkflowError::TemplateNotFound { .. } => {
                "Place the template file in the stage input directory".to_string()
            }
            WorkflowError::PlaceholderMissing { .. } => {
                "Add the placeholder to the template or set strict_placeholders = false"
                    .to_string()
            }
            WorkflowError::DirectoryExists { .. } => {
                "Remove the existing output directory or set existing_dir_policy = \"reuse\""
                    .to_string()
            }
            WorkflowError::ProcessSpawnError { program, .. } => {
                format!("Make sure '{}' is installed and on PATH", program)
            }
            WorkflowError::ExternalProcessFailure { program, .. } => {
                format!("Inspect the output of '{}' above for the cause", program)
            }
            WorkflowError::IoError(_) | WorkflowError::SerializationError(_) => {
                "Check file permissions and available disk space".to_string()
            }
            WorkflowError::StageFailed { source, .. } => source.recovery_suggestion(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            WorkflowError::StageFailed { stage, source } => {
                format!("Workflow aborted in stage {}: {}", stage, source.root_cause())
            }
            other => format!("Workflow aborted: {}", other),
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_stage_wraps_once() {
        let err = WorkflowError::TemplateNotFound {
            path: PathBuf::from("inputs/setrun_template.py"),
        }
        .in_stage("BingClaw")
        .in_stage("InterfaceModule");

        match &err {
            WorkflowError::StageFailed { stage, .. } => assert_eq!(stage, "BingClaw"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.category(), ErrorCategory::Template);
        assert!(err.user_friendly_message().contains("BingClaw"));
    }

    #[test]
    fn test_process_failure_severity() {
        let err = WorkflowError::ExternalProcessFailure {
            program: "mpirun".to_string(),
            code: Some(2),
        };
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(err.to_string(), "'mpirun' exited with status 2");
    }
}
