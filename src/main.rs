use anyhow::Result;
use clap::Parser;
use parking_lot::Mutex;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use ecomchat::repl::{ctrl_c, RustylineReader, SharedWriter};
use ecomchat::{create_session_store, setup_agent, ChatLoop, Config, ConfigError};

/// Chat with your e-commerce database using natural language.
#[derive(Parser, Debug)]
#[command(name = "ecomchat")]
#[command(version)]
#[command(about = "Chat with your e-commerce database using natural language", long_about = None)]
struct Cli {
    /// Show detailed background operations (SQL queries, agent reasoning)
    #[arg(short, long)]
    verbose: bool,

    /// Conversation identifier attached to every question
    #[arg(long, value_name = "ID")]
    session: Option<String>,

    /// Answer every question without earlier turns as context
    #[arg(long)]
    no_memory: bool,
}

fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "info"
    } else {
        "warn"
    }
}

fn init_logging(verbose: bool) {
    // Logs go to stderr so they never interleave with answers on stdout.
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_log_filter(verbose))),
        )
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to install logger: {e}");
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env()?;
    config.validate()?;

    let memory = (!cli.no_memory).then(create_session_store);
    let agent = setup_agent(&config, memory.clone())?;

    let display: SharedWriter = Arc::new(Mutex::new(std::io::stdout()));
    let reader = RustylineReader::new()?;

    ChatLoop::new(agent, Box::new(reader), display)
        .verbose(cli.verbose)
        .session(cli.session)
        .memory(memory)
        .interrupt_with(ctrl_c)
        .run()
        .await
}

/// The line printed for an error that ends the program.
fn report(e: &anyhow::Error) -> String {
    match e.downcast_ref::<ConfigError>() {
        Some(config_error) => format!("Configuration error: {config_error}"),
        None => format!("Fatal error: {e:#}"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", report(&e));
            ExitCode::FAILURE
        }
    }
}
