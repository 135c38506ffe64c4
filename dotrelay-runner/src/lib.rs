pub mod cancel;
pub mod executor;
pub mod probe;
pub mod process;
pub mod registry;

pub use cancel::CancelToken;
pub use executor::{CommandRunner, ProcessRunner};
pub use probe::{probe, ProbeReport};
pub use process::ProcessConfig;
pub use registry::{Invocation, ToolRegistry};
