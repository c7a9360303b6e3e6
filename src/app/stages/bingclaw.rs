use crate::config::RunConfig;
use crate::core::process::{Mount, ProcessInvocation};
use crate::core::template::placeholders::{BATHYMETRY, SCENARIO};
use crate::domain::model::{StageKind, StageReport};
use crate::domain::ports::{ScenarioStage, StageContext};
use crate::utils::error::Result;
use crate::utils::fs::{absolute_path, copy_into, require_dir, require_file};
use crate::utils::validation::validate_required_field;

/// 在容器中執行 BingClaw 山崩模擬
#[derive(Debug, Default, Clone)]
pub struct BingClawStage;

#[async_trait::async_trait]
impl ScenarioStage for BingClawStage {
    fn kind(&self) -> StageKind {
        StageKind::BingClaw
    }

    fn should_execute(&self, config: &RunConfig) -> bool {
        config.bingclaw.enabled
    }

    async fn execute(&self, context: &StageContext<'_>) -> Result<StageReport> {
        let kind = self.kind();
        let config = &context.config.bingclaw;
        let scenario = &context.config.scenario.name;
        let input_dir = context.layout.bingclaw_input();

        // 先檢查所有輸入，缺任何一個都不建立目錄也不啟動容器
        require_dir(kind, input_dir, "BingClaw input directory does not exist")?;
        let template = input_dir.join(&config.template);
        context.renderer.ensure_template(&template)?;

        let initial_condition_name = config.initial_condition_file(scenario);
        let initial_condition = input_dir.join(&initial_condition_name);
        require_file(kind, &initial_condition, "initial condition (.tt3) file is missing")?;

        let bathymetry_name = validate_required_field("bingclaw.bathymetry", &config.bathymetry)?;
        let bathymetry = input_dir.join(bathymetry_name);
        require_file(kind, &bathymetry, "BingClaw bathymetry file is missing")?;

        let image = validate_required_field("bingclaw.image", &config.image)?;

        tracing::info!("🏔️ Running BingClaw simulation {}", scenario);
        let output_dir = context.ensure_stage_output(kind)?;
        let mut report = StageReport::new(kind, output_dir.to_path_buf());

        let rendered = context.renderer.render(
            &template,
            &output_dir.join(&config.rendered_name),
            &[
                (BATHYMETRY, bathymetry_name.as_str()),
                (SCENARIO, initial_condition_name.as_str()),
            ],
        )?;
        report.rendered_config = Some(rendered.path);

        // 容器只看得到掛載的執行目錄，輸入檔需一併複製
        report.artifacts.push(copy_into(&initial_condition, output_dir)?);
        report.artifacts.push(copy_into(&bathymetry, output_dir)?);

        let mount = Mount {
            host: absolute_path(output_dir)?,
            target: config.run_path.clone(),
        };
        let invocation = ProcessInvocation::container_run(config.image_type, image, vec![mount])?;
        context.invoke(invocation, &mut report).await?;

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layout::DirectoryLayout;
    use crate::core::process::RecordingProcessRunner;
    use crate::utils::error::WorkflowError;
    use std::fs;
    use tempfile::TempDir;

    fn config_for(root: &std::path::Path) -> RunConfig {
        let mut config = RunConfig::from_toml_str(
            r#"
[scenario]
name = "demo"

[bingclaw]
bathymetry = "localMessinaBathy.tt3"
image_type = "docker"
image = "ngiacr.azurecr.io/bingclaw:latest"
"#,
        )
        .unwrap();
        config.scenario.input_dir = root.join("inputs");
        config.scenario.output_dir = root.join("outputs");
        config
    }

    fn seed_inputs(root: &std::path::Path) {
        let input_dir = root.join("inputs").join("bingclaw_inputs");
        fs::create_dir_all(&input_dir).unwrap();
        fs::write(
            input_dir.join("setrun_template.py"),
            "topofiles.append([3, 1, 1, 0., 1.e10, 'BATHYMETRY'])\nqinitfiles.append([1,1,'SCENARIO'])\n",
        )
        .unwrap();
        fs::write(input_dir.join("demo.tt3"), "initial surface").unwrap();
        fs::write(input_dir.join("localMessinaBathy.tt3"), "bathymetry").unwrap();
    }

    #[tokio::test]
    async fn test_renders_copies_and_mounts() {
        let temp_dir = TempDir::new().unwrap();
        seed_inputs(temp_dir.path());
        let config = config_for(temp_dir.path());
        let layout = DirectoryLayout::resolve(
            &config.scenario.input_dir,
            &config.scenario.output_dir,
            &config.scenario.name,
        );
        let runner = RecordingProcessRunner::new();
        let context = StageContext::new(&config, &layout, &runner);

        let report = BingClawStage.execute(&context).await.unwrap();

        let output_dir = layout.stage_output(StageKind::BingClaw);
        let setrun = fs::read_to_string(output_dir.join("setrun.py")).unwrap();
        assert!(setrun.contains("'localMessinaBathy.tt3'"));
        assert!(setrun.contains("'demo.tt3'"));
        assert!(output_dir.join("demo.tt3").is_file());
        assert!(output_dir.join("localMessinaBathy.tt3").is_file());
        assert_eq!(report.rendered_config, Some(output_dir.join("setrun.py")));

        let invocations = runner.invocations();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].program, "docker");
        assert_eq!(invocations[0].mounts[0].target, "/BingClaw/run");
        assert!(invocations[0].mounts[0].host.is_absolute());
        assert_eq!(
            invocations[0].args.last().map(String::as_str),
            Some("ngiacr.azurecr.io/bingclaw:latest")
        );
    }

    #[tokio::test]
    async fn test_missing_initial_condition_fails_before_anything_runs() {
        let temp_dir = TempDir::new().unwrap();
        seed_inputs(temp_dir.path());
        fs::remove_file(temp_dir.path().join("inputs/bingclaw_inputs/demo.tt3")).unwrap();
        let config = config_for(temp_dir.path());
        let layout = DirectoryLayout::resolve(
            &config.scenario.input_dir,
            &config.scenario.output_dir,
            &config.scenario.name,
        );
        let runner = RecordingProcessRunner::new();
        let context = StageContext::new(&config, &layout, &runner);

        let err = BingClawStage.execute(&context).await.unwrap_err();

        assert!(matches!(err, WorkflowError::MissingPrecondition { .. }));
        assert!(!layout.stage_output(StageKind::BingClaw).exists());
        assert!(runner.invocations().is_empty());
    }
}
