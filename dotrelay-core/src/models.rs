use crate::CommandLine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

/// Exit code reported when the executable could not be started.
pub const LAUNCH_FAILURE_EXIT_CODE: i32 = 127;
/// Exit code reported when the process was killed for exceeding its timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;
/// Exit code reported when the caller cancelled the execution.
pub const CANCELLED_EXIT_CODE: i32 = 130;

/// One invocation of the external tool
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRequest {
    pub executable: String,
    pub arguments: CommandLine,
    pub working_directory: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl ExecutionRequest {
    pub fn new(executable: impl Into<String>, arguments: CommandLine) -> Self {
        Self {
            executable: executable.into(),
            arguments,
            working_directory: None,
            timeout: None,
        }
    }

    pub fn with_working_directory<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.working_directory = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The full command as shown to callers: executable then rendered arguments.
    pub fn command_line(&self) -> String {
        if self.arguments.is_empty() {
            self.executable.clone()
        } else {
            format!("{} {}", self.executable, self.arguments)
        }
    }
}

/// How an execution ended
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// The process exited on its own.
    Completed,
    /// The process was killed after running for `after_ms`.
    TimedOut { after_ms: u64 },
    /// The caller withdrew the request and the process was killed.
    Cancelled,
    /// The executable could not be started.
    LaunchFailed { reason: String },
}

/// Result of running the external tool. Built once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionResult {
    id: Uuid,
    command_line: String,
    exit_code: i32,
    stdout: String,
    stderr: String,
    outcome: Outcome,
    started_at: DateTime<Utc>,
    duration_ms: u64,
}

impl ExecutionResult {
    pub fn completed(
        request: &ExecutionRequest,
        exit_code: i32,
        stdout: String,
        stderr: String,
        started_at: DateTime<Utc>,
        duration_ms: u64,
    ) -> Self {
        Self::build(request, exit_code, stdout, stderr, Outcome::Completed, started_at, duration_ms)
    }

    pub fn timed_out(
        request: &ExecutionRequest,
        after: Duration,
        stdout: String,
        stderr: String,
        started_at: DateTime<Utc>,
        duration_ms: u64,
    ) -> Self {
        Self::build(
            request,
            TIMEOUT_EXIT_CODE,
            stdout,
            stderr,
            Outcome::TimedOut {
                after_ms: after.as_millis() as u64,
            },
            started_at,
            duration_ms,
        )
    }

    pub fn cancelled(
        request: &ExecutionRequest,
        stdout: String,
        stderr: String,
        started_at: DateTime<Utc>,
        duration_ms: u64,
    ) -> Self {
        Self::build(
            request,
            CANCELLED_EXIT_CODE,
            stdout,
            stderr,
            Outcome::Cancelled,
            started_at,
            duration_ms,
        )
    }

    pub fn launch_failed(request: &ExecutionRequest, reason: impl Into<String>) -> Self {
        Self::build(
            request,
            LAUNCH_FAILURE_EXIT_CODE,
            String::new(),
            String::new(),
            Outcome::LaunchFailed {
                reason: reason.into(),
            },
            Utc::now(),
            0,
        )
    }

    fn build(
        request: &ExecutionRequest,
        exit_code: i32,
        stdout: String,
        stderr: String,
        outcome: Outcome,
        started_at: DateTime<Utc>,
        duration_ms: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            command_line: request.command_line(),
            exit_code,
            stdout,
            stderr,
            outcome,
            started_at,
            duration_ms,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0 && self.outcome == Outcome::Completed
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "$ {}", self.command_line)?;
        match &self.outcome {
            Outcome::Completed => writeln!(
                f,
                "Exit code: {} ({} in {}ms)",
                self.exit_code,
                if self.exit_code == 0 { "succeeded" } else { "failed" },
                self.duration_ms
            )?,
            Outcome::TimedOut { after_ms } => writeln!(
                f,
                "Exit code: {} (terminated after exceeding the {}ms timeout)",
                self.exit_code, after_ms
            )?,
            Outcome::Cancelled => writeln!(
                f,
                "Exit code: {} (cancelled after {}ms)",
                self.exit_code, self.duration_ms
            )?,
            Outcome::LaunchFailed { reason } => writeln!(
                f,
                "Exit code: {} (failed to start: {})",
                self.exit_code, reason
            )?,
        }
        writeln!(f, "--- stdout ---")?;
        writeln!(f, "{}", block(&self.stdout))?;
        writeln!(f, "--- stderr ---")?;
        write!(f, "{}", block(&self.stderr))
    }
}

fn block(text: &str) -> &str {
    let trimmed = text.trim_end();
    if trimmed.is_empty() {
        "(empty)"
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_request() -> ExecutionRequest {
        ExecutionRequest::new(
            "dotnet",
            CommandLine::new().arg("ef").arg("migrations").arg("add").arg("InitialCreate"),
        )
    }

    #[test]
    fn test_request_defaults() {
        let request = create_test_request();
        assert!(request.working_directory.is_none());
        assert!(request.timeout.is_none());
        assert_eq!(request.command_line(), "dotnet ef migrations add InitialCreate");
    }

    #[test]
    fn test_request_builders() {
        let request = create_test_request()
            .with_working_directory("/tmp/app")
            .with_timeout(Duration::from_secs(30));
        assert_eq!(request.working_directory, Some(PathBuf::from("/tmp/app")));
        assert_eq!(request.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_bare_executable_command_line() {
        let request = ExecutionRequest::new("dotnet", CommandLine::new());
        assert_eq!(request.command_line(), "dotnet");
    }

    #[test]
    fn test_completed_success() {
        let result = ExecutionResult::completed(
            &create_test_request(),
            0,
            "Done.".to_string(),
            String::new(),
            Utc::now(),
            12,
        );
        assert!(result.succeeded());
        assert_eq!(result.outcome(), &Outcome::Completed);
        assert_eq!(result.duration_ms(), 12);
    }

    #[test]
    fn test_completed_failure() {
        let result = ExecutionResult::completed(
            &create_test_request(),
            1,
            String::new(),
            "Build failed".to_string(),
            Utc::now(),
            5,
        );
        assert!(!result.succeeded());
        assert_eq!(result.stderr(), "Build failed");
    }

    #[test]
    fn test_launch_failure_has_no_output() {
        let result = ExecutionResult::launch_failed(&create_test_request(), "not found");
        assert_eq!(result.exit_code(), LAUNCH_FAILURE_EXIT_CODE);
        assert!(result.stdout().is_empty());
        assert!(result.stderr().is_empty());
        assert!(!result.succeeded());
    }

    #[test]
    fn test_timed_out_is_distinguished() {
        let result = ExecutionResult::timed_out(
            &create_test_request(),
            Duration::from_secs(2),
            "partial".to_string(),
            String::new(),
            Utc::now(),
            2003,
        );
        assert_eq!(result.exit_code(), TIMEOUT_EXIT_CODE);
        assert_eq!(result.outcome(), &Outcome::TimedOut { after_ms: 2000 });
        assert_eq!(result.stdout(), "partial");
        assert!(!result.succeeded());
    }

    #[test]
    fn test_display_orders_command_exit_code_stdout_stderr() {
        let result = ExecutionResult::completed(
            &create_test_request(),
            0,
            "Done. To undo this action, use 'ef migrations remove'\n".to_string(),
            String::new(),
            Utc::now(),
            40,
        );
        let text = result.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "$ dotnet ef migrations add InitialCreate");
        assert_eq!(lines[1], "Exit code: 0 (succeeded in 40ms)");
        assert_eq!(lines[2], "--- stdout ---");
        assert_eq!(lines[3], "Done. To undo this action, use 'ef migrations remove'");
        assert_eq!(lines[4], "--- stderr ---");
        assert_eq!(lines[5], "(empty)");
    }

    #[test]
    fn test_display_reports_timeout() {
        let result = ExecutionResult::timed_out(
            &create_test_request(),
            Duration::from_millis(500),
            String::new(),
            String::new(),
            Utc::now(),
            510,
        );
        assert!(result
            .to_string()
            .contains("Exit code: 124 (terminated after exceeding the 500ms timeout)"));
    }

    #[test]
    fn test_json_round_trip_keeps_outcome() {
        let result = ExecutionResult::cancelled(
            &create_test_request(),
            String::new(),
            String::new(),
            Utc::now(),
            8,
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["outcome"]["kind"], "cancelled");
        assert_eq!(json["exit_code"], CANCELLED_EXIT_CODE);

        let back: ExecutionResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }
}
