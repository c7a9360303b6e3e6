use crate::domain::model::{ScenarioIdentity, StageKind};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// 情境的目錄結構。純計算，不碰檔案系統，可在目錄建立前呼叫
///
/// ```text
/// <output_root>/<scenario>/{bingclaw_out,intmod_out,hysea_out}
/// <input_root>/{bingclaw_inputs,hysea_inputs}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryLayout {
    input_root: PathBuf,
    output_root: PathBuf,
    scenario_dir: PathBuf,
    bingclaw_input: PathBuf,
    hysea_input: PathBuf,
    bingclaw_output: PathBuf,
    intmod_output: PathBuf,
    hysea_output: PathBuf,
}

impl DirectoryLayout {
    pub fn resolve(input_root: &Path, output_root: &Path, scenario: &ScenarioIdentity) -> Self {
        let scenario_dir = output_root.join(scenario.as_str());
        let input_of = |kind: StageKind| {
            input_root.join(kind.input_dir_name().unwrap_or_default())
        };

        Self {
            input_root: input_root.to_path_buf(),
            output_root: output_root.to_path_buf(),
            bingclaw_input: input_of(StageKind::BingClaw),
            hysea_input: input_of(StageKind::HySea),
            bingclaw_output: scenario_dir.join(StageKind::BingClaw.output_dir_name()),
            intmod_output: scenario_dir.join(StageKind::InterfaceModule.output_dir_name()),
            hysea_output: scenario_dir.join(StageKind::HySea.output_dir_name()),
            scenario_dir,
        }
    }

    pub fn input_root(&self) -> &Path {
        &self.input_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn scenario_dir(&self) -> &Path {
        &self.scenario_dir
    }

    pub fn stage_output(&self, kind: StageKind) -> &Path {
        match kind {
            StageKind::BingClaw => &self.bingclaw_output,
            StageKind::InterfaceModule => &self.intmod_output,
            StageKind::HySea => &self.hysea_output,
        }
    }

    /// Interface Module 沒有自己的輸入目錄，它的目標地形放在 hysea_inputs
    pub fn stage_input(&self, kind: StageKind) -> Option<&Path> {
        match kind {
            StageKind::BingClaw => Some(&self.bingclaw_input),
            StageKind::InterfaceModule => None,
            StageKind::HySea => Some(&self.hysea_input),
        }
    }

    pub fn bingclaw_input(&self) -> &Path {
        &self.bingclaw_input
    }

    pub fn hysea_input(&self) -> &Path {
        &self.hysea_input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn layout_for(name: &str) -> DirectoryLayout {
        let scenario = ScenarioIdentity::new(name).unwrap();
        DirectoryLayout::resolve(Path::new("inputs"), Path::new("outputs"), &scenario)
    }

    #[test]
    fn test_stage_outputs_follow_convention() {
        let layout = layout_for("demo");

        assert_eq!(layout.scenario_dir(), Path::new("outputs/demo"));
        assert_eq!(
            layout.stage_output(StageKind::BingClaw),
            Path::new("outputs/demo/bingclaw_out")
        );
        assert_eq!(
            layout.stage_output(StageKind::InterfaceModule),
            Path::new("outputs/demo/intmod_out")
        );
        assert_eq!(
            layout.stage_output(StageKind::HySea),
            Path::new("outputs/demo/hysea_out")
        );
    }

    #[test]
    fn test_stage_inputs_follow_convention() {
        let layout = layout_for("demo");

        assert_eq!(layout.bingclaw_input(), Path::new("inputs/bingclaw_inputs"));
        assert_eq!(layout.hysea_input(), Path::new("inputs/hysea_inputs"));
        assert_eq!(layout.stage_input(StageKind::InterfaceModule), None);
    }

    #[test]
    fn test_outputs_are_distinct_and_deterministic() {
        for name in ["demo", "mscen_v0.141_x0_15.471_y0_38.004", "a"] {
            let first = layout_for(name);
            let second = layout_for(name);
            assert_eq!(first, second);

            let outputs: HashSet<&Path> = StageKind::ALL
                .iter()
                .map(|kind| first.stage_output(*kind))
                .collect();
            assert_eq!(outputs.len(), 3);
        }
    }

    #[test]
    fn test_resolve_does_not_touch_disk() {
        let layout = layout_for("never_created");
        assert!(!layout.scenario_dir().exists());
    }
}
