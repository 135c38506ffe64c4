use clap::{Args, Parser, Subcommand};
use dotrelay_compose::{Catalog, Parameters, ToolDescriptor, WORKING_DIRECTORY};
use dotrelay_core::{ExecutionResult, Settings};
use dotrelay_runner::{probe, CancelToken, Invocation, ProcessConfig, ProcessRunner, ToolRegistry};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing::info;

mod server;

use server::ServerClient;

#[derive(Parser)]
#[command(name = "dotrelay")]
#[command(
    about = ".NET CLI operations from the command line or a dotrelay server",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Server URL
    #[arg(long, default_value = "http://localhost:3000")]
    server: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health
    Health,

    /// List the operations the server exposes
    Tools,

    /// Show the parameters of one operation
    Describe {
        /// Operation name (e.g., ef_migrations_add)
        name: String,
    },

    /// Invoke an operation on the server
    Call(InvokeArgs),

    /// Print the command line an operation would run, without running it
    Compose {
        /// Operation name
        name: String,

        /// Parameter as name=value, or a bare name to set a switch
        #[arg(short, long = "param")]
        params: Vec<String>,
    },

    /// Run an operation locally
    Run {
        #[command(flatten)]
        invoke: InvokeArgs,

        /// Path to a TOML settings file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Check that the .NET CLI is installed and report its version
    Probe {
        /// Tool-chain driver to check
        #[arg(long, default_value = "dotnet")]
        dotnet: String,
    },
}

#[derive(Args)]
struct InvokeArgs {
    /// Operation name
    name: String,

    /// Parameter as name=value, or a bare name to set a switch
    #[arg(short, long = "param")]
    params: Vec<String>,

    /// Working directory for the tool
    #[arg(long)]
    cwd: Option<String>,

    /// Timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

impl InvokeArgs {
    fn parameters(&self) -> anyhow::Result<Parameters> {
        let mut params = Parameters::from_pairs(&self.name, &self.params)?;
        if let Some(cwd) = &self.cwd {
            params.insert(WORKING_DIRECTORY, cwd.as_str());
        }
        Ok(params)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Health => {
            let client = ServerClient::new(&cli.server);
            if client.health().await? {
                println!("Server is healthy");
                process::exit(0);
            } else {
                eprintln!("Server is unhealthy");
                process::exit(1);
            }
        }
        Commands::Tools => {
            let client = ServerClient::new(&cli.server);
            let tools = client.tools().await?;
            println!("Found {} tool(s):\n", tools.len());
            for tool in tools {
                println!("  {:<28} {}", tool.name, tool.description);
            }
        }
        Commands::Describe { name } => {
            let client = ServerClient::new(&cli.server);
            print_descriptor(&client.describe(&name).await?);
        }
        Commands::Call(args) => {
            let params = Parameters::from_pairs(&args.name, &args.params)?;
            let arguments = match serde_json::to_value(&params)? {
                serde_json::Value::Object(map) => map,
                _ => serde_json::Map::new(),
            };
            let client = ServerClient::new(&cli.server);
            let result = client
                .call(&args.name, arguments, args.cwd.as_deref(), args.timeout)
                .await?;
            finish(&result);
        }
        Commands::Compose { name, params } => {
            let params = Parameters::from_pairs(&name, &params)?;
            let prepared = Catalog::builtin().prepare(&name, &params)?;
            println!("{} {}", Settings::default().executable, prepared.command_line);
            if let Some(dir) = prepared.working_directory {
                println!("(in {})", dir.display());
            }
        }
        Commands::Run { invoke, config } => {
            let settings = Settings::load(config.as_deref())?;
            let registry = ToolRegistry::from_settings(&settings);

            let cancel = CancelToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupted, cancelling");
                    on_interrupt.cancel();
                }
            });

            let mut invocation = Invocation::new(invoke.parameters()?);
            if let Some(secs) = invoke.timeout.filter(|s| *s > 0) {
                invocation = invocation.with_timeout(Duration::from_secs(secs));
            }
            let result = registry.invoke(&invoke.name, invocation, &cancel).await?;
            finish(&result);
        }
        Commands::Probe { dotnet } => {
            let runner = ProcessRunner::new(ProcessConfig::default());
            match probe(&dotnet, &runner).await {
                Ok(report) => {
                    println!("✓ .NET CLI {} at {}", report.version, report.path.display());
                }
                Err(e) => {
                    eprintln!(".NET CLI is not available: {}", e);
                    process::exit(1);
                }
            }
        }
    }

    Ok(())
}

fn print_descriptor(tool: &ToolDescriptor) {
    println!("{} [{:?}]", tool.name, tool.category);
    println!("{}", tool.description);
    if tool.parameters.is_empty() {
        return;
    }
    println!("\nParameters:");
    for param in &tool.parameters {
        let marker = if param.required { " (required)" } else { "" };
        println!(
            "  {:<26} {:<8} {}{}",
            param.name,
            format!("{:?}", param.kind).to_lowercase(),
            param.description,
            marker
        );
    }
}

/// Print the report and mirror the tool's exit code.
fn finish(result: &ExecutionResult) {
    println!("{}", result);
    if !result.succeeded() {
        process::exit(result.exit_code().clamp(1, 255));
    }
}
