//! Copy executors.
//!
//! The sync director never spawns processes itself; it hands each
//! [`CopyRequest`] to a [`CopyExecutor`]. [`RsyncExecutor`] runs the real
//! `rsync` binary, [`DryRunExecutor`] only records what would happen.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;

use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use crate::errors::CopyError;
use crate::models::PathType;

/// One copy from `source` to `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRequest {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub kind: PathType,
    /// Only overwrite destination files older than the source.
    pub update_only: bool,
}

impl CopyRequest {
    pub fn file(source: &Path, destination: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            kind: PathType::File,
            update_only: false,
        }
    }

    pub fn dir(source: &Path, destination: &Path, update_only: bool) -> Self {
        Self {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            kind: PathType::Dir,
            update_only,
        }
    }
}

/// Capability to carry out a [`CopyRequest`].
pub trait CopyExecutor {
    fn copy(&self, request: &CopyRequest) -> impl Future<Output = Result<(), CopyError>> + Send;
}

// ---------------------------------------------------------------------------
// rsync
// ---------------------------------------------------------------------------

/// Runs `rsync -a` for every request, with the child's output inherited.
#[derive(Debug, Clone)]
pub struct RsyncExecutor {
    binary: String,
    progress: bool,
}

impl Default for RsyncExecutor {
    fn default() -> Self {
        Self {
            binary: "rsync".into(),
            progress: true,
        }
    }
}

impl RsyncExecutor {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            ..Self::default()
        }
    }

    /// Toggle `--progress`.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Arguments passed to rsync for `request`.
    pub fn args(&self, request: &CopyRequest) -> Vec<String> {
        let mut args = vec!["-a".to_string()];
        if self.progress {
            args.push("--progress".into());
        }
        match request.kind {
            PathType::Dir => {
                if request.update_only {
                    args.push("--update".into());
                }
                let source = request.source.to_string_lossy();
                args.push(format!("{}/", source.trim_end_matches('/')));
            }
            PathType::File => {
                args.push(request.source.to_string_lossy().into_owned());
            }
        }
        args.push(request.destination.to_string_lossy().into_owned());
        args
    }

    async fn prepare_destination(&self, request: &CopyRequest) -> Result<(), CopyError> {
        let dir = match request.kind {
            PathType::Dir => Some(request.destination.as_path()),
            PathType::File => request.destination.parent(),
        };
        if let Some(dir) = dir.filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        Ok(())
    }
}

impl CopyExecutor for RsyncExecutor {
    #[instrument(skip(self, request), fields(src = %request.source.display(), dest = %request.destination.display()))]
    async fn copy(&self, request: &CopyRequest) -> Result<(), CopyError> {
        self.prepare_destination(request).await?;

        let args = self.args(request);
        debug!(cmd = ?format!("{} {}", self.binary, args.join(" ")), "running copy");

        let status = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CopyError::BinaryNotFound(self.binary.clone())
                } else {
                    CopyError::IoError(e)
                }
            })?;

        if !status.success() {
            let exit_code = status.code().unwrap_or(-1);
            warn!(exit_code, "copy command failed");
            return Err(CopyError::Failed { exit_code });
        }
        info!(kind = %request.kind, "copy completed");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Dry run
// ---------------------------------------------------------------------------

/// Records requests without touching the filesystem.
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    requests: Mutex<Vec<CopyRequest>>,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests seen so far, in order.
    pub fn requests(&self) -> Vec<CopyRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl CopyExecutor for DryRunExecutor {
    async fn copy(&self, request: &CopyRequest) -> Result<(), CopyError> {
        info!(
            src = %request.source.display(),
            dest = %request.destination.display(),
            kind = %request.kind,
            update_only = request.update_only,
            "dry run: skipping copy"
        );
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        Ok(())
    }
}
