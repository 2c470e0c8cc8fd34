//! forgebridge CLI - serve the GitHub and GitLab tool catalogs
//!
//! Runs a stdio tool server for one forge, or invokes a single tool from the command line.

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use forgebridge_core::{init_logging, ForgeBridgeConfig};
use forgebridge_repo::{provider, Forge, ToolProvider};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{info, warn};

mod server;

use server::ToolServer;

#[derive(Parser)]
#[command(name = "forgebridge")]
#[command(about = "GitHub and GitLab REST APIs as compact JSON tools")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve a forge's tools as newline-delimited JSON-RPC over stdio
    Serve {
        /// Forge to serve (github or gitlab)
        forge: Forge,
    },

    /// Invoke one tool and print its output
    Call {
        /// Forge the tool belongs to (github or gitlab)
        forge: Forge,

        /// Tool name
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(short, long)]
        args: Option<String>,
    },

    /// Print a forge's tool catalog as JSON
    Tools {
        /// Forge whose catalog to print (github or gitlab)
        forge: Forge,
    },

    /// Inspect the effective configuration
    Config {
        /// Show current configuration (tokens redacted)
        #[arg(long)]
        show: bool,

        /// Validate current configuration
        #[arg(long)]
        validate: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ForgeBridgeConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?;

    let mut logging_config = config.logging.clone();
    if cli.verbose {
        logging_config.level = "debug".to_string();
    }
    init_logging(&logging_config).map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    info!("Starting forgebridge v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Serve { forge } => handle_serve(forge, &config).await?,
        Commands::Call { forge, tool, args } => handle_call(forge, &tool, args, &config).await?,
        Commands::Tools { forge } => handle_tools(forge, &config)?,
        Commands::Config { show, validate } => handle_config(show, validate, &config)?,
    }

    Ok(())
}

fn warn_if_unauthenticated(forge: Forge, config: &ForgeBridgeConfig) {
    let token = match forge {
        Forge::GitHub => &config.github.token,
        Forge::GitLab => &config.gitlab.token,
    };
    if token.is_none() {
        warn!(
            "No {} token configured; requests will be sent without credentials",
            forge
        );
    }
}

async fn handle_serve(forge: Forge, config: &ForgeBridgeConfig) -> anyhow::Result<()> {
    config.validate()?;
    warn_if_unauthenticated(forge, config);

    let server = ToolServer::new(provider(forge, config)?);
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    server
        .run(stdin, tokio::io::stdout())
        .await
        .context("Tool server I/O failed")?;

    Ok(())
}

async fn handle_call(
    forge: Forge,
    tool: &str,
    args: Option<String>,
    config: &ForgeBridgeConfig,
) -> anyhow::Result<()> {
    config.validate()?;
    warn_if_unauthenticated(forge, config);

    let arguments: Value = match args {
        Some(raw) => serde_json::from_str(&raw).context("--args must be a JSON object")?,
        None => Value::Null,
    };
    if !(arguments.is_object() || arguments.is_null()) {
        bail!("--args must be a JSON object");
    }

    let tools = provider(forge, config)?;
    let output = tools.call(tool, arguments).await?;
    println!("{}", output);

    Ok(())
}

fn handle_tools(forge: Forge, config: &ForgeBridgeConfig) -> anyhow::Result<()> {
    let tools = provider(forge, config)?;
    println!("{}", serde_json::to_string_pretty(&tools.tools())?);
    Ok(())
}

fn handle_config(show: bool, validate: bool, config: &ForgeBridgeConfig) -> anyhow::Result<()> {
    if validate {
        config.validate()?;
        println!("✅ Configuration is valid");
    }

    if show || !validate {
        let rendered = toml::to_string_pretty(&config.redacted())
            .context("Failed to render configuration")?;
        println!("{}", rendered);
    }

    Ok(())
}
