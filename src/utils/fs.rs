use crate::domain::model::{ExistingDirPolicy, StageKind};
use crate::utils::error::{Result, WorkflowError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirStatus {
    Created,
    Reused,
}

/// 建立輸出目錄。父目錄以 create_dir_all 建立，最後一層使用 create_dir，
/// 「不存在才建立」由作業系統原子完成
pub fn ensure_output_dir(path: &Path, policy: ExistingDirPolicy) -> Result<DirStatus> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    match fs::create_dir(path) {
        Ok(()) => {
            tracing::debug!("📂 Created directory {}", path.display());
            Ok(DirStatus::Created)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists && path.is_dir() => match policy {
            ExistingDirPolicy::Reuse => {
                tracing::warn!(
                    "⚠️ Directory {} already exists, results will be overwritten",
                    path.display()
                );
                Ok(DirStatus::Reused)
            }
            ExistingDirPolicy::Fail => Err(WorkflowError::DirectoryExists {
                path: path.to_path_buf(),
            }),
        },
        Err(e) => Err(WorkflowError::IoError(e)),
    }
}

pub fn require_dir(stage: StageKind, path: &Path, reason: &str) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(WorkflowError::MissingPrecondition {
            stage: stage.to_string(),
            path: path.to_path_buf(),
            reason: reason.to_string(),
        })
    }
}

pub fn require_file(stage: StageKind, path: &Path, reason: &str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(WorkflowError::MissingPrecondition {
            stage: stage.to_string(),
            path: path.to_path_buf(),
            reason: reason.to_string(),
        })
    }
}

/// 複製檔案到目錄內，保留原檔名
pub fn copy_into(src: &Path, dst_dir: &Path) -> Result<PathBuf> {
    let file_name = src.file_name().ok_or_else(|| WorkflowError::InvalidConfigValueError {
        field: "file".to_string(),
        value: src.display().to_string(),
        reason: "Path has no file name".to_string(),
    })?;
    let dst = dst_dir.join(file_name);
    fs::copy(src, &dst)?;
    Ok(dst)
}

/// 外部工具可能在其他工作目錄下執行，傳給它們的路徑一律轉為絕對路徑
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    Ok(std::path::absolute(path)?)
}
