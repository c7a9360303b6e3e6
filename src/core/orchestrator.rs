use crate::app::stages::standard_stages;
use crate::config::RunConfig;
use crate::core::layout::DirectoryLayout;
use crate::domain::model::{ExistingDirPolicy, PipelineState, RunSummary, StageKind};
use crate::domain::ports::{ProcessRunner, ScenarioStage, StageContext};
use crate::utils::error::Result;
use crate::utils::fs::{ensure_output_dir, DirStatus};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// 情境流程，依序執行 BingClaw -> Interface Module -> T-HySEA
///
/// 每個階段等待外部程式結束後才進入下一個階段；任何階段失敗立即中止整個流程，不重試。
pub struct ScenarioPipeline<'a> {
    config: &'a RunConfig,
    layout: DirectoryLayout,
    runner: Arc<dyn ProcessRunner>,
    stages: Vec<Box<dyn ScenarioStage>>,
    state: PipelineState,
}

impl<'a> ScenarioPipeline<'a> {
    pub fn new(config: &'a RunConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        Self::with_stages(config, runner, standard_stages())
    }

    /// 階段依 StageKind 排序，無論加入順序為何都不會違反相依順序
    pub fn with_stages(
        config: &'a RunConfig,
        runner: Arc<dyn ProcessRunner>,
        mut stages: Vec<Box<dyn ScenarioStage>>,
    ) -> Self {
        stages.sort_by_key(|stage| stage.kind());
        let layout = DirectoryLayout::resolve(
            &config.scenario.input_dir,
            &config.scenario.output_dir,
            &config.scenario.name,
        );

        Self {
            config,
            layout,
            runner,
            stages,
            state: PipelineState::Idle,
        }
    }

    pub fn layout(&self) -> &DirectoryLayout {
        &self.layout
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// 執行所有啟用的階段
    #[tracing::instrument(name = "scenario", skip_all, fields(scenario = %self.config.scenario.name))]
    pub async fn execute_all(&mut self) -> Result<RunSummary> {
        let started_at = Utc::now();
        let scenario = &self.config.scenario.name;
        self.state = PipelineState::Idle;

        tracing::info!("🚀 Running workflow for scenario '{}'", scenario);

        // 情境目錄一律沿用，目錄策略只套用在各階段的輸出目錄，否則無法只重跑下游階段
        let scenario_dir = self.layout.scenario_dir();
        if ensure_output_dir(scenario_dir, ExistingDirPolicy::Reuse)? == DirStatus::Created {
            tracing::info!("📂 Created scenario directory {}", scenario_dir.display());
        }

        let context = StageContext::new(self.config, &self.layout, self.runner.as_ref());
        let mut reports = Vec::new();
        let mut skipped: Vec<StageKind> = Vec::new();

        for stage in &self.stages {
            let kind = stage.kind();

            // 根據設定決定是否執行
            if !stage.should_execute(self.config) {
                tracing::info!(
                    "⏭️ Skipping {} because it is disabled",
                    stage.get_name()
                );
                skipped.push(kind);
                continue;
            }

            self.state = kind.into();
            let start_time = Instant::now();
            tracing::info!("▶️ Stage {} started", stage.get_name());

            let span = tracing::info_span!("stage", stage = %stage.get_name());
            match stage.execute(&context).instrument(span).await {
                Ok(mut report) => {
                    report.duration = start_time.elapsed();
                    tracing::info!(
                        "✅ Stage {} finished (outputs: {}, duration: {:?})",
                        stage.get_name(),
                        report.output_dir.display(),
                        report.duration
                    );
                    reports.push(report);
                }
                Err(e) => {
                    tracing::error!("❌ Stage {} failed: {}", stage.get_name(), e);
                    return Err(e.in_stage(stage.get_name()));
                }
            }
        }

        self.state = PipelineState::Done;
        let summary = RunSummary {
            scenario: scenario.clone(),
            scenario_dir: scenario_dir.to_path_buf(),
            state: self.state,
            started_at,
            finished_at: Utc::now(),
            stages: reports,
            skipped,
        };

        tracing::info!("🏁 Done running workflow for scenario '{}'", scenario);
        for report in &summary.stages {
            match &report.prefix {
                Some(prefix) => tracing::info!(
                    "📁 {} outputs are stored in {} and have prefix '{}'",
                    report.stage,
                    report.output_dir.display(),
                    prefix
                ),
                None => tracing::info!(
                    "📁 {} outputs are stored in {}",
                    report.stage,
                    report.output_dir.display()
                ),
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::process::RecordingProcessRunner;
    use crate::domain::model::StageReport;
    use crate::utils::error::WorkflowError;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// 只記錄執行順序的階段
    struct MockStage {
        kind: StageKind,
        enabled: bool,
        fail: bool,
        log: Arc<Mutex<Vec<StageKind>>>,
    }

    impl MockStage {
        fn new(kind: StageKind, log: &Arc<Mutex<Vec<StageKind>>>) -> Self {
            Self {
                kind,
                enabled: true,
                fail: false,
                log: Arc::clone(log),
            }
        }

        fn disabled(mut self) -> Self {
            self.enabled = false;
            self
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }
    }

    #[async_trait::async_trait]
    impl ScenarioStage for MockStage {
        fn kind(&self) -> StageKind {
            self.kind
        }

        fn should_execute(&self, _config: &RunConfig) -> bool {
            self.enabled
        }

        async fn execute(&self, context: &StageContext<'_>) -> Result<StageReport> {
            self.log.lock().unwrap().push(self.kind);
            if self.fail {
                return Err(WorkflowError::ExternalProcessFailure {
                    program: "mock".to_string(),
                    code: Some(1),
                });
            }
            Ok(StageReport::new(
                self.kind,
                context.layout.stage_output(self.kind).to_path_buf(),
            ))
        }
    }

    fn config_in(root: &std::path::Path) -> RunConfig {
        let mut config = RunConfig::from_toml_str("[scenario]\nname = \"demo\"\n").unwrap();
        config.scenario.input_dir = root.join("inputs");
        config.scenario.output_dir = root.join("outputs");
        config
    }

    #[tokio::test]
    async fn test_stages_run_in_dependency_order() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());
        let log = Arc::new(Mutex::new(Vec::new()));

        // 故意以相反順序加入
        let stages: Vec<Box<dyn ScenarioStage>> = vec![
            Box::new(MockStage::new(StageKind::HySea, &log)),
            Box::new(MockStage::new(StageKind::BingClaw, &log)),
            Box::new(MockStage::new(StageKind::InterfaceModule, &log)),
        ];
        let mut pipeline =
            ScenarioPipeline::with_stages(&config, Arc::new(RecordingProcessRunner::new()), stages);

        let summary = pipeline.execute_all().await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![StageKind::BingClaw, StageKind::InterfaceModule, StageKind::HySea]
        );
        assert_eq!(summary.state, PipelineState::Done);
        assert_eq!(pipeline.state(), PipelineState::Done);
        assert_eq!(summary.stages.len(), 3);
    }

    #[tokio::test]
    async fn test_disabled_stage_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());
        let log = Arc::new(Mutex::new(Vec::new()));

        let stages: Vec<Box<dyn ScenarioStage>> = vec![
            Box::new(MockStage::new(StageKind::BingClaw, &log).disabled()),
            Box::new(MockStage::new(StageKind::InterfaceModule, &log)),
            Box::new(MockStage::new(StageKind::HySea, &log)),
        ];
        let mut pipeline =
            ScenarioPipeline::with_stages(&config, Arc::new(RecordingProcessRunner::new()), stages);

        let summary = pipeline.execute_all().await.unwrap();

        assert_eq!(summary.skipped, vec![StageKind::BingClaw]);
        assert!(summary.report_for(StageKind::BingClaw).is_none());
        assert!(summary.report_for(StageKind::HySea).is_some());
    }

    #[tokio::test]
    async fn test_failure_aborts_and_names_stage() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());
        let log = Arc::new(Mutex::new(Vec::new()));

        let stages: Vec<Box<dyn ScenarioStage>> = vec![
            Box::new(MockStage::new(StageKind::BingClaw, &log)),
            Box::new(MockStage::new(StageKind::InterfaceModule, &log).failing()),
            Box::new(MockStage::new(StageKind::HySea, &log)),
        ];
        let mut pipeline =
            ScenarioPipeline::with_stages(&config, Arc::new(RecordingProcessRunner::new()), stages);

        let err = pipeline.execute_all().await.unwrap_err();

        match &err {
            WorkflowError::StageFailed { stage, source } => {
                assert_eq!(stage, "InterfaceModule");
                assert!(matches!(**source, WorkflowError::ExternalProcessFailure { .. }));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(pipeline.state(), PipelineState::InterfaceModuleStage);
        assert_eq!(
            *log.lock().unwrap(),
            vec![StageKind::BingClaw, StageKind::InterfaceModule]
        );
    }

    #[tokio::test]
    async fn test_existing_scenario_dir_is_reused_under_fail_policy() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_in(temp_dir.path());
        config.scenario.existing_dir_policy = ExistingDirPolicy::Fail;
        std::fs::create_dir_all(temp_dir.path().join("outputs").join("demo")).unwrap();

        let mut pipeline = ScenarioPipeline::with_stages(
            &config,
            Arc::new(RecordingProcessRunner::new()),
            Vec::new(),
        );

        let summary = pipeline.execute_all().await.unwrap();
        assert_eq!(summary.state, PipelineState::Done);
    }

    /// 寫入階段輸出目錄的階段，用來檢查目錄策略
    struct OutputStage(StageKind);

    #[async_trait::async_trait]
    impl ScenarioStage for OutputStage {
        fn kind(&self) -> StageKind {
            self.0
        }

        fn should_execute(&self, _config: &RunConfig) -> bool {
            true
        }

        async fn execute(&self, context: &StageContext<'_>) -> Result<StageReport> {
            let output_dir = context.ensure_stage_output(self.0)?;
            Ok(StageReport::new(self.0, output_dir.to_path_buf()))
        }
    }

    #[tokio::test]
    async fn test_fail_policy_applies_to_stage_output() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_in(temp_dir.path());
        config.scenario.existing_dir_policy = ExistingDirPolicy::Fail;
        std::fs::create_dir_all(temp_dir.path().join("outputs/demo/hysea_out")).unwrap();

        let stages: Vec<Box<dyn ScenarioStage>> = vec![Box::new(OutputStage(StageKind::HySea))];
        let mut pipeline =
            ScenarioPipeline::with_stages(&config, Arc::new(RecordingProcessRunner::new()), stages);

        let err = pipeline.execute_all().await.unwrap_err();
        assert!(matches!(err.root_cause(), WorkflowError::DirectoryExists { .. }));
        assert_eq!(pipeline.state(), PipelineState::HySeaStage);
    }
}
