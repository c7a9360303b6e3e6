use crate::config::RunConfig;
use crate::core::artifact::{discover_artifact, BATHYMETRY_MARKER, DEFORMATION_MARKER};
use crate::core::process::ProcessInvocation;
use crate::domain::model::{StageKind, StageReport};
use crate::domain::ports::{ScenarioStage, StageContext};
use crate::utils::error::Result;
use crate::utils::fs::{absolute_path, require_dir, require_file};
use crate::utils::validation::validate_required_field;
use serde::Serialize;
use std::path::Path;

/// Interface Module 參數紀錄的檔名
pub const RUN_RECORD_NAME: &str = "interface_module_config.json";

/// 寫入輸出目錄的參數紀錄，與實際傳給外部程式的參數一致
#[derive(Debug, Serialize)]
struct InterfaceModuleRun<'a> {
    scenario: &'a str,
    donor: &'a str,
    donor_output: &'a Path,
    bathymetry: &'a Path,
    resolution: f64,
    filter: &'a str,
    casename: &'a Path,
    prefix: &'a str,
}

/// 將 BingClaw 的產出內插並濾波到目標地形網格
#[derive(Debug, Default, Clone)]
pub struct InterfaceModuleStage;

#[async_trait::async_trait]
impl ScenarioStage for InterfaceModuleStage {
    fn kind(&self) -> StageKind {
        StageKind::InterfaceModule
    }

    fn should_execute(&self, config: &RunConfig) -> bool {
        config.interface_module.enabled
    }

    async fn execute(&self, context: &StageContext<'_>) -> Result<StageReport> {
        let kind = self.kind();
        let config = &context.config.interface_module;
        let donor_output = context.layout.stage_output(StageKind::BingClaw);

        // 上游輸出不存在時直接中止，不建立自己的輸出目錄
        require_dir(
            kind,
            donor_output,
            "BingClaw output directory does not exist, nothing to interpolate",
        )?;

        let bathymetry_name =
            validate_required_field("interface_module.bathymetry", &config.bathymetry)?;
        let bathymetry = context.layout.hysea_input().join(bathymetry_name);
        require_file(kind, &bathymetry, "target bathymetry for interpolation is missing")?;
        require_file(kind, &config.script, "Interface Module script not found")?;

        tracing::info!(
            "🌊 Running Interface Module with filter '{}' and resolution {} m",
            config.filter,
            config.resolution
        );
        let output_dir = context.ensure_stage_output(kind)?;
        let mut report = StageReport::new(kind, output_dir.to_path_buf());

        let prefix = config.filename_prefix();
        let casename = output_dir.join(&prefix);

        let record = InterfaceModuleRun {
            scenario: context.config.scenario.name.as_str(),
            donor: &config.donor,
            donor_output,
            bathymetry: &bathymetry,
            resolution: config.resolution,
            filter: config.filter.as_str(),
            casename: &casename,
            prefix: &prefix,
        };
        let record_path = output_dir.join(RUN_RECORD_NAME);
        std::fs::write(&record_path, serde_json::to_string_pretty(&record)?)?;
        report.rendered_config = Some(record_path);

        let invocation = ProcessInvocation::new(&config.program)
            .path_arg(&config.script)?
            .arg("--donor")
            .arg(&config.donor)
            .path_arg(donor_output)?
            .path_arg(&bathymetry)?
            .arg("--resolution")
            .arg(config.resolution.to_string())
            .arg("--filter")
            .arg(config.filter.as_str())
            .arg("--casename")
            .path_arg(&casename)?;
        context.invoke(invocation, &mut report).await?;

        // 確認產出與前綴一一對應，供 T-HySEA 使用
        report
            .artifacts
            .push(discover_artifact(output_dir, BATHYMETRY_MARKER, &prefix)?);
        let deformation = discover_artifact(output_dir, DEFORMATION_MARKER, &prefix)?;

        // 變形檔會被就地改寫，只能對本次剛產出的檔案執行一次
        if let Some(trim) = &config.deformation_trim {
            let target = absolute_path(&deformation)?;
            tracing::info!("✂️ Post-processing deformation file {}", target.display());
            let invocation = ProcessInvocation::new(&trim.program)
                .args(trim.args.iter().cloned())
                .path_arg(&target)?;
            context.invoke(invocation, &mut report).await?;
        }
        report.artifacts.push(deformation);
        tracing::info!(
            "📦 Interface Module outputs are stored in {} with prefix '{}'",
            output_dir.display(),
            prefix
        );
        report.prefix = Some(prefix);

        Ok(report)
    }
}
