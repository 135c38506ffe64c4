pub mod command;
pub mod config;
pub mod error;
pub mod models;

pub use command::{Argument, CommandLine, Quote};
pub use config::Settings;
pub use error::{DotrelayError, Result};
pub use models::{
    ExecutionRequest, ExecutionResult, Outcome, CANCELLED_EXIT_CODE, LAUNCH_FAILURE_EXIT_CODE,
    TIMEOUT_EXIT_CODE,
};
