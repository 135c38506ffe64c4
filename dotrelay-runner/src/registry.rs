use crate::{CancelToken, CommandRunner, ProcessConfig, ProcessRunner};
use dotrelay_compose::{Catalog, Parameters};
use dotrelay_core::{ExecutionRequest, ExecutionResult, Result, Settings};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// One caller request against a named operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    pub params: Parameters,
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(params: Parameters) -> Self {
        Self {
            params,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Owns the operation catalog and the runner that executes it.
#[derive(Clone)]
pub struct ToolRegistry {
    catalog: Catalog,
    runner: Arc<dyn CommandRunner>,
    executable: String,
}

impl ToolRegistry {
    pub fn new(
        catalog: Catalog,
        runner: Arc<dyn CommandRunner>,
        executable: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            runner,
            executable: executable.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let runner = ProcessRunner::new(ProcessConfig::from(settings));
        Self::new(Catalog::builtin(), Arc::new(runner), settings.executable.clone())
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Compose the request for `name` without running it.
    pub fn request_for(&self, name: &str, invocation: &Invocation) -> Result<ExecutionRequest> {
        let prepared = self.catalog.prepare(name, &invocation.params)?;
        let mut request = ExecutionRequest::new(self.executable.clone(), prepared.command_line);
        if let Some(dir) = prepared.working_directory {
            request = request.with_working_directory(dir);
        }
        if let Some(timeout) = invocation.timeout {
            request = request.with_timeout(timeout);
        }
        Ok(request)
    }

    /// Run a named operation. Only composition problems are returned as
    /// errors; everything that happens to the process is in the result.
    pub async fn invoke(
        &self,
        name: &str,
        invocation: Invocation,
        cancel: &CancelToken,
    ) -> Result<ExecutionResult> {
        let request = self.request_for(name, &invocation)?;

        info!(
            operation = name,
            command = %request.command_line(),
            "Invoking operation"
        );

        let result = self.runner.run(request, cancel.clone()).await;

        info!(
            operation = name,
            execution_id = %result.id(),
            exit_code = result.exit_code(),
            duration_ms = result.duration_ms(),
            "Operation finished"
        );

        Ok(result)
    }
}
