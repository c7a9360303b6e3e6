#[cfg(feature = "cli")]
pub mod cli;

use crate::domain::model::{ExistingDirPolicy, FilterType, ImageType, ScenarioIdentity, StageKind};
use crate::utils::error::{Result, WorkflowError};
use crate::utils::validation::{
    validate_file_name, validate_non_empty_string, validate_path, validate_positive_float,
    validate_positive_number, validate_required_field, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 一次情境流程的完整設定，載入後不再變動，以參考傳給所有階段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub scenario: ScenarioConfig,
    #[serde(default)]
    pub bingclaw: BingClawConfig,
    #[serde(default)]
    pub interface_module: InterfaceModuleConfig,
    #[serde(default)]
    pub hysea: HySeaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: ScenarioIdentity,
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub existing_dir_policy: ExistingDirPolicy,
    #[serde(default = "default_true")]
    pub strict_placeholders: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BingClawConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_setrun_template")]
    pub template: String,
    #[serde(default = "default_setrun_name")]
    pub rendered_name: String,
    /// BingClaw 使用的地形檔 (放在 bingclaw_inputs)
    pub bathymetry: Option<String>,
    /// 初始條件檔，預設 `<scenario>.tt3`
    pub initial_condition: Option<String>,
    #[serde(default = "default_image_type")]
    pub image_type: ImageType,
    pub image: Option<String>,
    #[serde(default = "default_run_path")]
    pub run_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceModuleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_python")]
    pub program: String,
    #[serde(default = "default_interface_script")]
    pub script: PathBuf,
    #[serde(default = "default_donor")]
    pub donor: String,
    /// 內插目標地形檔 (放在 hysea_inputs)
    pub bathymetry: Option<String>,
    /// 解析度 (m)
    #[serde(default = "default_resolution")]
    pub resolution: f64,
    #[serde(default = "default_filter")]
    pub filter: FilterType,
    /// 只在 Interface Module 剛產出變形檔後執行一次
    pub deformation_trim: Option<TrimCommand>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HySeaConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub executable: Option<PathBuf>,
    #[serde(default = "default_mpi_launcher")]
    pub mpi_launcher: String,
    #[serde(default = "default_processes")]
    pub processes: usize,
    #[serde(default)]
    pub output_time_series: bool,
    #[serde(default = "default_hysea_template")]
    pub template: String,
    #[serde(default = "default_hysea_template_ts")]
    pub template_time_series: String,
    /// 時間序列輸出點位檔 (放在 hysea_inputs)
    pub pois_file: Option<String>,
    #[serde(default = "default_manifest_name")]
    pub manifest_name: String,
}

/// 就地處理 Interface Module 變形檔的外部指令，變形檔路徑附加為最後一個參數
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrimCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("inputs")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_setrun_template() -> String {
    "setrun_template.py".to_string()
}

fn default_setrun_name() -> String {
    "setrun.py".to_string()
}

fn default_image_type() -> ImageType {
    ImageType::Singularity
}

fn default_run_path() -> String {
    "/BingClaw/run".to_string()
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_interface_script() -> PathBuf {
    PathBuf::from("Interface-module/interface_module.py")
}

fn default_donor() -> String {
    "bingclaw".to_string()
}

fn default_resolution() -> f64 {
    100.0
}

fn default_filter() -> FilterType {
    FilterType::None
}

fn default_mpi_launcher() -> String {
    "mpirun".to_string()
}

fn default_processes() -> usize {
    1
}

fn default_hysea_template() -> String {
    "hysea_template.txt".to_string()
}

fn default_hysea_template_ts() -> String {
    "hysea_template_ts.txt".to_string()
}

fn default_manifest_name() -> String {
    "problems.txt".to_string()
}

impl Default for BingClawConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            template: default_setrun_template(),
            rendered_name: default_setrun_name(),
            bathymetry: None,
            initial_condition: None,
            image_type: default_image_type(),
            image: None,
            run_path: default_run_path(),
        }
    }
}

impl Default for InterfaceModuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: default_python(),
            script: default_interface_script(),
            donor: default_donor(),
            bathymetry: None,
            resolution: default_resolution(),
            filter: default_filter(),
            deformation_trim: None,
        }
    }
}

impl Default for HySeaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            executable: None,
            mpi_launcher: default_mpi_launcher(),
            processes: default_processes(),
            output_time_series: false,
            template: default_hysea_template(),
            template_time_series: default_hysea_template_ts(),
            pois_file: None,
            manifest_name: default_manifest_name(),
        }
    }
}

impl BingClawConfig {
    pub fn initial_condition_file(&self, scenario: &ScenarioIdentity) -> String {
        self.initial_condition
            .clone()
            .unwrap_or_else(|| scenario.topo_file_name())
    }
}

impl InterfaceModuleConfig {
    /// Interface Module 產出檔名前綴，例如 `filterkajiura_res100`
    pub fn filename_prefix(&self) -> String {
        format!("filter{}_res{}", self.filter, self.resolution)
    }
}

impl HySeaConfig {
    pub fn selected_template(&self) -> &str {
        if self.output_time_series {
            &self.template_time_series
        } else {
            &self.template
        }
    }
}

impl RunConfig {
    /// 從 TOML 檔案載入設定
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(WorkflowError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析設定
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| WorkflowError::ConfigParseError {
            message: e.to_string(),
        })
    }

    /// 替換環境變數 (例如 ${HYSEA_HOME})，未定義的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| WorkflowError::ConfigParseError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn is_enabled(&self, kind: StageKind) -> bool {
        match kind {
            StageKind::BingClaw => self.bingclaw.enabled,
            StageKind::InterfaceModule => self.interface_module.enabled,
            StageKind::HySea => self.hysea.enabled,
        }
    }

    pub fn set_enabled(&mut self, kind: StageKind, enabled: bool) {
        match kind {
            StageKind::BingClaw => self.bingclaw.enabled = enabled,
            StageKind::InterfaceModule => self.interface_module.enabled = enabled,
            StageKind::HySea => self.hysea.enabled = enabled,
        }
    }

    pub fn enabled_stages(&self) -> Vec<StageKind> {
        StageKind::ALL
            .into_iter()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }

    /// 驗證設定的合理性，只檢查啟用的階段
    pub fn validate_config(&self) -> Result<()> {
        validate_path("scenario.input_dir", &self.scenario.input_dir)?;
        validate_path("scenario.output_dir", &self.scenario.output_dir)?;

        if self.bingclaw.enabled {
            let bingclaw = &self.bingclaw;
            validate_file_name("bingclaw.template", &bingclaw.template)?;
            validate_file_name("bingclaw.rendered_name", &bingclaw.rendered_name)?;
            validate_file_name(
                "bingclaw.bathymetry",
                validate_required_field("bingclaw.bathymetry", &bingclaw.bathymetry)?,
            )?;
            if let Some(initial) = &bingclaw.initial_condition {
                validate_file_name("bingclaw.initial_condition", initial)?;
            }
            validate_non_empty_string(
                "bingclaw.image",
                validate_required_field("bingclaw.image", &bingclaw.image)?,
            )?;
            validate_non_empty_string("bingclaw.run_path", &bingclaw.run_path)?;
        }

        if self.interface_module.enabled {
            let intmod = &self.interface_module;
            validate_non_empty_string("interface_module.program", &intmod.program)?;
            validate_path("interface_module.script", &intmod.script)?;
            validate_non_empty_string("interface_module.donor", &intmod.donor)?;
            validate_file_name(
                "interface_module.bathymetry",
                validate_required_field("interface_module.bathymetry", &intmod.bathymetry)?,
            )?;
            if let Some(trim) = &intmod.deformation_trim {
                validate_non_empty_string("interface_module.deformation_trim.program", &trim.program)?;
            }
        }

        // T-HySEA 依前綴尋找 Interface Module 的產出，即使 Interface Module 未啟用也需要合法的解析度
        if self.interface_module.enabled || self.hysea.enabled {
            validate_positive_float("interface_module.resolution", self.interface_module.resolution)?;
        }

        if self.hysea.enabled {
            let hysea = &self.hysea;
            validate_path(
                "hysea.executable",
                validate_required_field("hysea.executable", &hysea.executable)?,
            )?;
            validate_non_empty_string("hysea.mpi_launcher", &hysea.mpi_launcher)?;
            validate_positive_number("hysea.processes", hysea.processes, 1)?;
            validate_file_name("hysea.template", &hysea.template)?;
            validate_file_name("hysea.template_time_series", &hysea.template_time_series)?;
            validate_file_name("hysea.manifest_name", &hysea.manifest_name)?;
            if hysea.output_time_series {
                validate_file_name(
                    "hysea.pois_file",
                    validate_required_field("hysea.pois_file", &hysea.pois_file)?,
                )?;
            }
        }

        Ok(())
    }
}

impl Validate for RunConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
