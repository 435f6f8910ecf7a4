use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use super::options::InvocationConfig;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("SQL analyzer not found at {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to launch SQL analyzer {}: {source}", path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error talking to SQL analyzer: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcessError {
    /// True for the spawn-time failures (missing or unrunnable executable).
    pub fn is_launch(&self) -> bool {
        matches!(self, ProcessError::NotFound { .. } | ProcessError::Launch { .. })
    }
}

/// One request/response exchange with an external analyzer.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Send `sql` and return everything the analyzer wrote to stdout.
    /// An analyzer that prints nothing yields an empty buffer, not an error.
    async fn invoke(&self, config: &InvocationConfig, sql: &str) -> Result<Vec<u8>, ProcessError>;
}

/// Prebuilt analyzer binaries shipped for each host family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Unix,
}

impl Platform {
    pub fn host() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Unix
        }
    }

    pub fn binary_name(self) -> &'static str {
        match self {
            Platform::Windows => "soar.windows-amd64.exe",
            Platform::MacOs => "soar.darwin-amd64",
            Platform::Unix => "soar.linux-amd64",
        }
    }

    pub fn resolve(self, bin_dir: &Path) -> PathBuf {
        bin_dir.join(self.binary_name())
    }
}

fn explain_prefix() -> &'static Regex {
    static EXPLAIN_PREFIX: OnceLock<Regex> = OnceLock::new();
    EXPLAIN_PREFIX.get_or_init(|| Regex::new(r"(?i)^explain").expect("valid regex"))
}

/// Trim the statement and drop a leading `EXPLAIN` keyword; the analyzer
/// mis-parses statements that already carry one.
pub fn strip_explain(sql: &str) -> String {
    explain_prefix().replace(sql.trim(), "").trim().to_string()
}

/// Runs the SOAR executable as a child process over stdin/stdout pipes.
#[derive(Debug, Clone)]
pub struct SoarProcess {
    executable: PathBuf,
}

impl SoarProcess {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Pick the binary for the current host from an installation directory.
    pub fn from_bin_dir(bin_dir: &Path) -> Self {
        Self::new(Platform::host().resolve(bin_dir))
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

#[async_trait]
impl Analyzer for SoarProcess {
    #[instrument(skip_all, fields(executable = %self.executable.display(), sql_bytes = sql.len()))]
    async fn invoke(&self, config: &InvocationConfig, sql: &str) -> Result<Vec<u8>, ProcessError> {
        debug!(flags = %config.flag_string(), "launching SQL analyzer");

        let mut child = Command::new(&self.executable)
            .args(config.to_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    ProcessError::NotFound {
                        path: self.executable.clone(),
                    }
                } else {
                    ProcessError::Launch {
                        path: self.executable.clone(),
                        source,
                    }
                }
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "analyzer stdin not captured")
        })?;
        let payload = sql.as_bytes().to_vec();

        // stdin is dropped at the end of this future whether or not the write
        // succeeded; stdout/stderr drain concurrently.
        let write = async move {
            let result = stdin.write_all(&payload).await;
            drop(stdin);
            result
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output?;

        if let Err(err) = written {
            warn!(error = %err, "analyzer closed stdin before the full statement was written");
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            warn!(status = %output.status, stderr = %stderr.trim(), "SQL analyzer exited with failure");
        } else if !stderr.trim().is_empty() {
            debug!(stderr = %stderr.trim(), "SQL analyzer stderr");
        }

        debug!(stdout_bytes = output.stdout.len(), "SQL analyzer finished");
        Ok(output.stdout)
    }
}
