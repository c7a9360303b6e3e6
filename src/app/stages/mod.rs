pub mod bingclaw;
pub mod hysea;
pub mod interface_module;

pub use bingclaw::BingClawStage;
pub use hysea::HySeaStage;
pub use interface_module::InterfaceModuleStage;

use crate::domain::ports::ScenarioStage;

/// 三個階段，依資料相依順序排列
pub fn standard_stages() -> Vec<Box<dyn ScenarioStage>> {
    vec![
        Box::new(BingClawStage),
        Box::new(InterfaceModuleStage),
        Box::new(HySeaStage),
    ]
}
