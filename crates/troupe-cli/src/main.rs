//! Troupe CLI — register agents, run workflows and inspect their traces.
//!
//! Reuses the same engine (troupe-core) and server bootstrap
//! (troupe-server) that back the HTTP API.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use troupe_cli::commands::{self, agent::RegisterArgs, EngineOptions};

/// Troupe — agent orchestration engine
#[derive(Parser)]
#[command(name = "troupe", version, about = "Troupe — agent orchestration engine")]
pub struct Cli {
    /// Path to the SQLite database file
    #[arg(long, env = "TROUPE_DB_PATH", default_value = "troupe.db")]
    db: String,

    /// Answer with the deterministic echo gateway instead of calling providers
    #[arg(long, global = true)]
    offline: bool,

    /// Engine config YAML file
    #[arg(long, env = "TROUPE_CONFIG", global = true)]
    config: Option<String>,

    /// Supervisor iteration cap
    #[arg(long, global = true)]
    max_iterations: Option<usize>,

    /// Wall-clock limit per run, in seconds
    #[arg(long, global = true)]
    run_timeout_secs: Option<u64>,

    /// Directory closed spans are appended to as JSONL
    #[arg(long, global = true)]
    trace_dir: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the troupe HTTP backend server
    Server {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on
        #[arg(long, default_value_t = 3210)]
        port: u16,
    },

    /// Manage agents
    Agent {
        #[command(subcommand)]
        action: AgentAction,
    },

    /// Run YAML-defined workflows
    Workflow {
        #[command(subcommand)]
        action: WorkflowAction,
    },

    /// Inspect traces written to the trace directory
    Trace {
        #[command(subcommand)]
        action: TraceAction,
    },

    /// Send a raw JSON-RPC request
    Rpc {
        /// JSON-RPC method name (e.g. "agents.list"); omit to list methods
        #[arg(long)]
        method: Option<String>,
        /// JSON-RPC params as a JSON string
        #[arg(long, default_value = "{}")]
        params: String,
    },
}

#[derive(Subcommand)]
enum AgentAction {
    /// Register a new agent
    Register {
        /// Agent name
        #[arg(long)]
        name: String,
        /// Persona / system prompt
        #[arg(long)]
        role: String,
        #[arg(long)]
        description: Option<String>,
        /// Provider key (openai, anthropic, groq, gemini, ollama)
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        temperature: Option<f64>,
        /// Tool capabilities (comma-separated)
        #[arg(long, value_delimiter = ',')]
        tools: Vec<String>,
    },
    /// List agents in registration order
    List,
    /// Get an agent by id
    Get {
        /// Agent ID
        #[arg(long)]
        id: String,
    },
}

#[derive(Subcommand)]
enum WorkflowAction {
    /// Run a workflow from a YAML file
    Run {
        /// Path to the workflow YAML file
        file: String,
        /// Print the run's span tree after the result
        #[arg(long)]
        show_trace: bool,
    },
    /// Validate a workflow YAML file without executing it
    Validate {
        /// Path to the workflow YAML file
        file: String,
    },
}

#[derive(Subcommand)]
enum TraceAction {
    /// List the most recent traces
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show one trace as a waterfall
    Show {
        /// Trace ID
        trace_id: String,
        /// Print raw spans as JSON instead
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "troupe_core=warn,troupe_server=warn,troupe_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let options = EngineOptions {
        config_file: cli.config,
        max_iterations: cli.max_iterations,
        run_timeout_secs: cli.run_timeout_secs,
        trace_dir: cli.trace_dir,
    };
    let engine = commands::load_engine_config(&options)?;

    let Some(command) = cli.command else {
        // No subcommand — show help
        use clap::CommandFactory;
        Cli::command().print_help().ok();
        println!();
        return Ok(());
    };

    match command {
        Commands::Server { host, port } => {
            commands::server::run(host, port, cli.db, engine, cli.offline).await
        }

        Commands::Agent { action } => {
            let state = commands::init_state(&cli.db, engine, cli.offline)?;
            match action {
                AgentAction::Register {
                    name,
                    role,
                    description,
                    provider,
                    model,
                    temperature,
                    tools,
                } => {
                    let args = RegisterArgs {
                        name,
                        role,
                        description,
                        provider,
                        model,
                        temperature,
                        tools,
                    };
                    commands::agent::register(&state, &args).await
                }
                AgentAction::List => commands::agent::list(&state).await,
                AgentAction::Get { id } => commands::agent::get(&state, &id).await,
            }
        }

        Commands::Workflow { action } => match action {
            WorkflowAction::Run { file, show_trace } => {
                let state = commands::init_state(&cli.db, engine, cli.offline)?;
                commands::workflow::run(&state, &file, show_trace).await
            }
            WorkflowAction::Validate { file } => commands::workflow::validate(&file).await,
        },

        Commands::Trace { action } => {
            let trace_dir: Option<PathBuf> = engine.trace_dir.clone();
            match action {
                TraceAction::List { limit } => {
                    commands::trace::list(trace_dir.as_deref(), limit).await
                }
                TraceAction::Show { trace_id, json } => {
                    commands::trace::show(trace_dir.as_deref(), &trace_id, json).await
                }
            }
        }

        Commands::Rpc { method, params } => {
            let state = commands::init_state(&cli.db, engine, cli.offline)?;
            match method {
                Some(method) => commands::rpc::call(&state, &method, &params).await,
                None => {
                    commands::rpc::methods(&state);
                    Ok(())
                }
            }
        }
    }
}
