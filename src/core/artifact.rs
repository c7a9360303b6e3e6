use crate::utils::error::{Result, WorkflowError};
use std::fs;
use std::path::{Path, PathBuf};

pub const BATHYMETRY_MARKER: &str = "bathymetry";
pub const DEFORMATION_MARKER: &str = "deformation";

/// 檔名以 prefix 開頭，且 prefix 後面不是數字或小數點。
///
/// `filternone_res100` 不會匹配 `filternone_res1000_*` 或 `filternone_res100.5_*`，
/// 不同解析度的產出可以放在同一個目錄
fn has_prefix(name: &str, prefix: &str) -> bool {
    match name.strip_prefix(prefix) {
        Some(rest) => !rest.starts_with(|c: char| c.is_ascii_digit() || c == '.'),
        None => false,
    }
}

/// 列出目錄中以 prefix 開頭且其後包含 marker 的一般檔案，依檔名排序
pub fn list_matching(dir: &Path, marker: &str, prefix: &str) -> Result<Vec<String>> {
    let mut matches = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if has_prefix(&name, prefix) && name[prefix.len()..].contains(marker) {
            matches.push(name);
        }
    }

    matches.sort();
    Ok(matches)
}

/// 找出唯一符合的產出檔案。沒有或多於一個候選都是錯誤，不會默默取第一個
pub fn discover_artifact(dir: &Path, marker: &str, prefix: &str) -> Result<PathBuf> {
    let mut matches = list_matching(dir, marker, prefix)?;

    match matches.len() {
        0 => Err(WorkflowError::ArtifactNotFound {
            dir: dir.to_path_buf(),
            marker: marker.to_string(),
            prefix: prefix.to_string(),
        }),
        1 => {
            let found = dir.join(matches.remove(0));
            tracing::debug!("🔎 Found {} artifact {}", marker, found.display());
            Ok(found)
        }
        _ => Err(WorkflowError::AmbiguousArtifact {
            dir: dir.to_path_buf(),
            marker: marker.to_string(),
            prefix: prefix.to_string(),
            candidates: matches,
        }),
    }
}
