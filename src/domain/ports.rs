use crate::config::RunConfig;
use crate::core::layout::DirectoryLayout;
use crate::core::process::ProcessInvocation;
use crate::core::template::TemplateRenderer;
use crate::domain::model::{StageKind, StageReport};
use crate::utils::error::Result;
use crate::utils::fs::{ensure_output_dir, DirStatus};
use async_trait::async_trait;
use std::path::Path;

/// 外部程式執行介面。呼叫端等待程式結束後才繼續
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, invocation: &ProcessInvocation) -> Result<()>;
}

/// 階段執行時可取得的共用資訊，整個流程中只讀
pub struct StageContext<'a> {
    pub config: &'a RunConfig,
    pub layout: &'a DirectoryLayout,
    pub runner: &'a dyn ProcessRunner,
    pub renderer: TemplateRenderer,
}

impl<'a> StageContext<'a> {
    pub fn new(config: &'a RunConfig, layout: &'a DirectoryLayout, runner: &'a dyn ProcessRunner) -> Self {
        Self {
            config,
            layout,
            runner,
            renderer: TemplateRenderer::new(config.scenario.strict_placeholders),
        }
    }

    /// 依設定的策略建立階段輸出目錄
    pub fn ensure_stage_output(&self, kind: StageKind) -> Result<&'a Path> {
        let dir = self.layout.stage_output(kind);
        if ensure_output_dir(dir, self.config.scenario.existing_dir_policy)? == DirStatus::Created {
            tracing::info!("📂 Created {} output directory {}", kind, dir.display());
        }
        Ok(dir)
    }

    /// 執行外部程式並記錄到報告
    pub async fn invoke(&self, invocation: ProcessInvocation, report: &mut StageReport) -> Result<()> {
        report.invocations.push(invocation.to_string());
        self.runner.run(&invocation).await
    }
}

/// 情境流程中的一個階段
#[async_trait]
pub trait ScenarioStage: Send + Sync {
    fn kind(&self) -> StageKind;

    /// 用於日誌的階段名稱
    fn get_name(&self) -> String {
        self.kind().to_string()
    }

    /// 根據設定決定是否執行
    fn should_execute(&self, config: &RunConfig) -> bool;

    async fn execute(&self, context: &StageContext<'_>) -> Result<StageReport>;
}
