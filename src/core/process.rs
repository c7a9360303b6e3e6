use crate::domain::model::ImageType;
use crate::domain::ports::ProcessRunner;
use crate::utils::error::{Result, WorkflowError};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// 容器掛載：主機目錄 -> 容器內路徑
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub host: PathBuf,
    pub target: String,
}

impl Mount {
    fn bind_arg(&self) -> Result<String> {
        Ok(format!("{}:{}", utf8_path(&self.host)?, self.target))
    }
}

/// 外部工具的參數以字串傳遞，非 UTF-8 路徑直接拒絕而不是默默改寫
fn utf8_path(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| WorkflowError::NonUtf8Path {
        path: path.to_path_buf(),
    })
}

/// 一次外部程式呼叫。參數逐一傳遞，不經過 shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub mounts: Vec<Mount>,
}

impl ProcessInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            mounts: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Result<Self> {
        let arg = utf8_path(path)?.to_string();
        Ok(self.arg(arg))
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// 以容器執行映像檔，掛載目錄作為執行目錄
    ///
    /// - docker: `docker run --rm -v <host>:<target> <image>`
    /// - singularity: `singularity run --bind <host>:<target> <image>`
    pub fn container_run(image_type: ImageType, image: &str, mounts: Vec<Mount>) -> Result<Self> {
        let mut invocation = Self::new(image_type.program()).arg("run");
        let mount_flag = match image_type {
            ImageType::Docker => {
                invocation = invocation.arg("--rm");
                "-v"
            }
            ImageType::Singularity => "--bind",
        };
        for mount in &mounts {
            invocation = invocation.arg(mount_flag).arg(mount.bind_arg()?);
        }
        invocation.mounts = mounts;
        Ok(invocation.arg(image))
    }

    /// MPI 啟動: `<launcher> -np <n> <executable> <args...>`
    pub fn mpi_launch(launcher: &str, processes: usize, executable: &Path) -> Result<Self> {
        Self::new(launcher)
            .arg("-np")
            .arg(processes.to_string())
            .path_arg(executable)
    }

    pub fn to_command(&self) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

impl fmt::Display for ProcessInvocation {
    /// 僅供日誌顯示，含空白的參數加上引號
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.chars().any(char::is_whitespace) {
                write!(f, " '{}'", arg.replace('\'', "'\\''"))?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// 實際執行外部程式，等待結束，標準輸出/錯誤直接繼承
#[derive(Debug, Default, Clone)]
pub struct SystemProcessRunner;

#[async_trait::async_trait]
impl ProcessRunner for SystemProcessRunner {
    async fn run(&self, invocation: &ProcessInvocation) -> Result<()> {
        tracing::info!("▶️ {}", invocation);
        if let Some(dir) = &invocation.working_dir {
            tracing::debug!("   working directory: {}", dir.display());
        }

        let status = invocation
            .to_command()
            .status()
            .await
            .map_err(|source| WorkflowError::ProcessSpawnError {
                program: invocation.program.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(WorkflowError::ExternalProcessFailure {
                program: invocation.program.clone(),
                code: status.code(),
            })
        }
    }
}

type RunHook = Box<dyn Fn(&ProcessInvocation) -> Result<()> + Send + Sync>;

/// 不啟動任何程式，只記錄呼叫。可掛上 hook 模擬外部工具的產出
#[derive(Default)]
pub struct RecordingProcessRunner {
    invocations: Mutex<Vec<ProcessInvocation>>,
    hook: Option<RunHook>,
}

impl RecordingProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hook<F>(hook: F) -> Self
    where
        F: Fn(&ProcessInvocation) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            invocations: Mutex::new(Vec::new()),
            hook: Some(Box::new(hook)),
        }
    }

    pub fn invocations(&self) -> Vec<ProcessInvocation> {
        self.invocations
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl ProcessRunner for RecordingProcessRunner {
    async fn run(&self, invocation: &ProcessInvocation) -> Result<()> {
        tracing::debug!("📼 Recorded {}", invocation);
        if let Ok(mut guard) = self.invocations.lock() {
            guard.push(invocation.clone());
        }
        match &self.hook {
            Some(hook) => hook(invocation),
            None => Ok(()),
        }
    }
}
