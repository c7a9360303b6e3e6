use crate::config::RunConfig;
use crate::core::artifact::{discover_artifact, BATHYMETRY_MARKER, DEFORMATION_MARKER};
use crate::core::process::ProcessInvocation;
use crate::core::template::placeholders::{
    BATHYMETRY, DEFORMATION_FILE, HYSEA_OUTNAME, POIS_FILE, SCENARIO_NAME,
};
use crate::domain::model::{StageKind, StageReport};
use crate::domain::ports::{ScenarioStage, StageContext};
use crate::utils::error::Result;
use crate::utils::fs::{absolute_path, require_dir, require_file};
use crate::utils::validation::validate_required_field;
use std::fs;
use std::path::{Path, PathBuf};

/// 寫出問題清單，每行一個設定檔路徑
pub fn write_manifest(path: &Path, configs: &[PathBuf]) -> Result<()> {
    let mut content = String::new();
    for config in configs {
        content.push_str(&config.to_string_lossy());
        content.push('\n');
    }
    fs::write(path, content)?;
    Ok(())
}

/// 以 MPI 執行 T-HySEA 海嘯傳播模擬
#[derive(Debug, Default, Clone)]
pub struct HySeaStage;

#[async_trait::async_trait]
impl ScenarioStage for HySeaStage {
    fn kind(&self) -> StageKind {
        StageKind::HySea
    }

    fn should_execute(&self, config: &RunConfig) -> bool {
        config.hysea.enabled
    }

    async fn execute(&self, context: &StageContext<'_>) -> Result<StageReport> {
        let kind = self.kind();
        let config = &context.config.hysea;
        let scenario = &context.config.scenario.name;
        let upstream = context.layout.stage_output(StageKind::InterfaceModule);
        let input_dir = context.layout.hysea_input();

        require_dir(
            kind,
            upstream,
            "Interface Module output directory does not exist, cannot read its output",
        )?;
        require_dir(kind, input_dir, "T-HySEA input directory does not exist")?;

        let template = input_dir.join(config.selected_template());
        context.renderer.ensure_template(&template)?;

        let pois = if config.output_time_series {
            let name = validate_required_field("hysea.pois_file", &config.pois_file)?;
            let pois = input_dir.join(name);
            require_file(kind, &pois, "points-of-interest file is missing")?;
            Some(absolute_path(&pois)?)
        } else {
            None
        };

        let executable = validate_required_field("hysea.executable", &config.executable)?;

        // T-HySEA 以前綴對應 Interface Module 的產出
        let prefix = context.config.interface_module.filename_prefix();
        let bathymetry = absolute_path(&discover_artifact(upstream, BATHYMETRY_MARKER, &prefix)?)?;
        let deformation = absolute_path(&discover_artifact(upstream, DEFORMATION_MARKER, &prefix)?)?;

        tracing::info!("🌐 Running T-HySEA simulation for scenario {}", scenario);
        let output_dir = context.ensure_stage_output(kind)?;
        let mut report = StageReport::new(kind, output_dir.to_path_buf());
        let output_abs = absolute_path(output_dir)?;

        let outname = output_abs.join(&prefix).to_string_lossy().into_owned();
        let bathymetry_value = bathymetry.to_string_lossy().into_owned();
        let deformation_value = deformation.to_string_lossy().into_owned();
        let pois_value = pois.as_ref().map(|p| p.to_string_lossy().into_owned());

        let mut replacements = vec![
            (BATHYMETRY, bathymetry_value.as_str()),
            (SCENARIO_NAME, scenario.as_str()),
            (HYSEA_OUTNAME, outname.as_str()),
            (DEFORMATION_FILE, deformation_value.as_str()),
        ];
        if let Some(pois_value) = &pois_value {
            replacements.push((POIS_FILE, pois_value.as_str()));
        }

        let rendered = context.renderer.render(
            &template,
            &output_dir.join(format!("{}_config.txt", prefix)),
            &replacements,
        )?;
        let rendered_abs = absolute_path(&rendered.path)?;
        report.rendered_config = Some(rendered.path);

        let manifest = output_abs.join(&config.manifest_name);
        write_manifest(&manifest, &[rendered_abs])?;

        report.artifacts.push(bathymetry.clone());
        report.artifacts.push(deformation.clone());
        report.artifacts.push(manifest.clone());

        let invocation = ProcessInvocation::mpi_launch(&config.mpi_launcher, config.processes, executable)?
            .path_arg(&manifest)?
            .current_dir(output_abs);
        context.invoke(invocation, &mut report).await?;

        tracing::info!(
            "📦 T-HySEA outputs are stored in {} with prefix '{}'",
            output_dir.display(),
            prefix
        );
        report.prefix = Some(prefix);

        Ok(report)
    }
}
