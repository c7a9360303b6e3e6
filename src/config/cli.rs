use crate::config::RunConfig;
use crate::domain::model::{ScenarioIdentity, StageKind};
use crate::utils::error::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "tsunami-workflow")]
#[command(about = "Run the BingClaw -> Interface Module -> T-HySEA scenario workflow")]
pub struct CliArgs {
    /// Path to the TOML workflow configuration
    #[arg(short, long, default_value = "workflow.toml")]
    pub config: PathBuf,

    /// Override the scenario name from the configuration
    #[arg(long)]
    pub scenario: Option<String>,

    #[arg(long, help = "Skip the BingClaw simulation")]
    pub skip_bingclaw: bool,

    #[arg(long, help = "Skip the Interface Module")]
    pub skip_interface_module: bool,

    #[arg(long, help = "Skip the T-HySEA simulation")]
    pub skip_hysea: bool,

    /// Show the resolved layout and planned stages without running anything
    #[arg(long)]
    pub dry_run: bool,

    /// Write the run summary as JSON to this path
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

impl CliArgs {
    /// 命令列覆蓋設定檔，只會關閉階段，不會開啟設定中已關閉的階段
    pub fn apply_overrides(&self, config: &mut RunConfig) -> Result<()> {
        if let Some(name) = &self.scenario {
            config.scenario.name = ScenarioIdentity::new(name.clone())?;
            tracing::info!("🔧 Scenario overridden to: {}", name);
        }

        let skips = [
            (StageKind::BingClaw, self.skip_bingclaw),
            (StageKind::InterfaceModule, self.skip_interface_module),
            (StageKind::HySea, self.skip_hysea),
        ];
        for (kind, skip) in skips {
            if skip {
                config.set_enabled(kind, false);
                tracing::info!("🔧 {} disabled from command line", kind);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[scenario]
name = "demo"

[bingclaw]
bathymetry = "bathy.tt3"
image = "bingclaw_latest.sif"

[interface_module]
bathymetry = "target.nc"

[hysea]
executable = "/opt/hysea/TsunamiHySEA"
"#;

    #[test]
    fn test_overrides() {
        let args = CliArgs::parse_from([
            "tsunami-workflow",
            "--config",
            "run.toml",
            "--scenario",
            "other",
            "--skip-hysea",
        ]);
        let mut config = RunConfig::from_toml_str(CONFIG).unwrap();
        args.apply_overrides(&mut config).unwrap();

        assert_eq!(args.config, PathBuf::from("run.toml"));
        assert_eq!(config.scenario.name.as_str(), "other");
        assert_eq!(
            config.enabled_stages(),
            vec![StageKind::BingClaw, StageKind::InterfaceModule]
        );
    }

    #[test]
    fn test_invalid_scenario_override() {
        let args = CliArgs::parse_from(["tsunami-workflow", "--scenario", "a/b"]);
        let mut config = RunConfig::from_toml_str(CONFIG).unwrap();
        assert!(args.apply_overrides(&mut config).is_err());
        assert_eq!(config.scenario.name.as_str(), "demo");
    }
}
