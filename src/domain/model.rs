use crate::utils::error::{Result, WorkflowError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// 情境名稱，決定輸出目錄與 BingClaw 初始條件檔名
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScenarioIdentity(String);

impl ScenarioIdentity {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        crate::utils::validation::validate_file_name("scenario.name", &name)?;
        // 情境目錄會出現在容器掛載參數 host:target 中
        if name.contains(':') {
            return Err(WorkflowError::InvalidConfigValueError {
                field: "scenario.name".to_string(),
                value: name,
                reason: "Scenario name cannot contain ':'".to_string(),
            });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// BingClaw 預設的初始條件檔名 `<scenario>.tt3`
    pub fn topo_file_name(&self) -> String {
        format!("{}.tt3", self.0)
    }
}

impl fmt::Display for ScenarioIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ScenarioIdentity {
    type Error = WorkflowError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ScenarioIdentity> for String {
    fn from(value: ScenarioIdentity) -> Self {
        value.0
    }
}

/// 宣告順序即為執行順序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StageKind {
    BingClaw,
    InterfaceModule,
    HySea,
}

impl StageKind {
    pub const ALL: [StageKind; 3] = [StageKind::BingClaw, StageKind::InterfaceModule, StageKind::HySea];

    /// 輸出子目錄名稱，外部工具依賴這些名稱
    pub fn output_dir_name(self) -> &'static str {
        match self {
            StageKind::BingClaw => "bingclaw_out",
            StageKind::InterfaceModule => "intmod_out",
            StageKind::HySea => "hysea_out",
        }
    }

    pub fn input_dir_name(self) -> Option<&'static str> {
        match self {
            StageKind::BingClaw => Some("bingclaw_inputs"),
            StageKind::InterfaceModule => None,
            StageKind::HySea => Some("hysea_inputs"),
        }
    }

    /// 上游階段
    pub fn predecessor(self) -> Option<StageKind> {
        match self {
            StageKind::BingClaw => None,
            StageKind::InterfaceModule => Some(StageKind::BingClaw),
            StageKind::HySea => Some(StageKind::InterfaceModule),
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::BingClaw => "BingClaw",
            StageKind::InterfaceModule => "InterfaceModule",
            StageKind::HySea => "T-HySEA",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    #[serde(alias = "container")]
    Docker,
    #[serde(alias = "lightweight-vm")]
    Singularity,
}

impl ImageType {
    pub fn program(self) -> &'static str {
        match self {
            ImageType::Docker => "docker",
            ImageType::Singularity => "singularity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    Kajiura,
    None,
}

impl FilterType {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterType::Kajiura => "kajiura",
            FilterType::None => "none",
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 輸出目錄已存在時的處理方式，所有階段一致
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistingDirPolicy {
    /// 發出警告並沿用，外部工具會覆寫結果
    #[default]
    Reuse,
    Fail,
}

/// 流程狀態機
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Idle,
    BingClawStage,
    InterfaceModuleStage,
    HySeaStage,
    Done,
}

impl From<StageKind> for PipelineState {
    fn from(kind: StageKind) -> Self {
        match kind {
            StageKind::BingClaw => PipelineState::BingClawStage,
            StageKind::InterfaceModule => PipelineState::InterfaceModuleStage,
            StageKind::HySea => PipelineState::HySeaStage,
        }
    }
}

/// 單一階段執行結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: StageKind,
    pub output_dir: PathBuf,
    pub prefix: Option<String>,
    pub rendered_config: Option<PathBuf>,
    pub artifacts: Vec<PathBuf>,
    pub invocations: Vec<String>,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

impl StageReport {
    pub fn new(stage: StageKind, output_dir: PathBuf) -> Self {
        Self {
            stage,
            output_dir,
            prefix: None,
            rendered_config: None,
            artifacts: Vec::new(),
            invocations: Vec::new(),
            duration: Duration::ZERO,
        }
    }
}

/// 整個情境流程的執行摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub scenario: ScenarioIdentity,
    pub scenario_dir: PathBuf,
    pub state: PipelineState,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stages: Vec<StageReport>,
    pub skipped: Vec<StageKind>,
}

impl RunSummary {
    pub fn report_for(&self, kind: StageKind) -> Option<&StageReport> {
        self.stages.iter().find(|r| r.stage == kind)
    }

    pub fn total_invocations(&self) -> usize {
        self.stages.iter().map(|r| r.invocations.len()).sum()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
