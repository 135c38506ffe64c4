use crate::{CancelToken, ProcessRunner};
use dotrelay_core::{CommandLine, DotrelayError, ExecutionRequest, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// What the startup probe learned about the tool-chain driver.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub path: PathBuf,
    pub version: String,
}

/// Check that `executable` resolves and answers `--version` successfully.
///
/// Has no side effects beyond running the version query, so repeated calls
/// give the same answer.
pub async fn probe(executable: &str, runner: &ProcessRunner) -> Result<ProbeReport> {
    let path = which::which(executable)
        .map_err(|e| DotrelayError::ExecutableNotFound(format!("{}: {}", executable, e)))?;
    debug!(executable, path = %path.display(), "Resolved executable");

    let request = ExecutionRequest::new(executable, CommandLine::new().arg("--version"))
        .with_timeout(PROBE_TIMEOUT);
    let result = runner.execute(&request, &CancelToken::new()).await;

    if !result.succeeded() {
        let detail = result.stderr().trim();
        return Err(DotrelayError::ProbeFailed(format!(
            "`{}` exited with {}{}",
            result.command_line(),
            result.exit_code(),
            if detail.is_empty() {
                String::new()
            } else {
                format!(": {}", detail)
            }
        )));
    }

    let version = result.stdout().trim().to_string();
    info!(path = %path.display(), version = %version, "Tool-chain driver available");
    Ok(ProbeReport { path, version })
}
