use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clientprops::config::{ClientConfig, ClientResolver, ConfigLoader, DEFAULT_PREFIX};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// Inspect per-client HTTP configuration
///
/// Loads the client registry the same way an application would (config
/// file, then environment overrides) and prints it.
#[derive(Parser, Debug)]
#[command(name = "clientprops")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML, JSON or .properties); repeat to layer files
    ///
    /// If not specified, the first of these that exists is used:
    /// 1. ./.clientprops.toml
    /// 2. $CLIENTPROPS_CONFIG
    /// 3. ~/.config/clientprops/config.toml
    #[arg(short, long)]
    config: Vec<PathBuf>,

    /// Property prefix the registry is bound under
    #[arg(long, default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// Environment variable prefix (derived from --prefix when omitted)
    #[arg(long)]
    env_prefix: Option<String>,

    /// Skip looking for a config file in the default locations
    #[arg(long)]
    no_discover: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: Level,

    /// Log to file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the loaded registry
    Show {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Toml)]
        format: OutputFormat,
    },

    /// Print the effective configuration of one client
    Resolve {
        /// Client name
        client: String,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Toml)]
        format: OutputFormat,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Toml,
    Json,
}

// Output goes to stdout, so logs always go to stderr or a file
fn setup_logging(level: Level, log_file: Option<PathBuf>) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    let subscriber = fmt().with_env_filter(filter).with_target(true);

    if let Some(log_path) = log_file {
        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file {}", log_path.display()))?;
        subscriber.with_writer(file).init();
    } else {
        subscriber.with_writer(std::io::stderr).init();
    }

    Ok(())
}

fn load_registry(args: &Args) -> Result<clientprops::ClientConfigRegistry> {
    let mut loader = ConfigLoader::new().with_prefix(args.prefix.clone());

    if !args.config.is_empty() {
        for path in &args.config {
            loader = loader
                .with_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
        }
    } else if !args.no_discover {
        loader = loader.discover()?;
    }

    loader = match &args.env_prefix {
        Some(prefix) => loader.with_env_prefix(prefix.clone()),
        None => loader.with_default_env_prefix(),
    };

    Ok(loader.load()?)
}

fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    let text = match format {
        OutputFormat::Toml => toml::to_string_pretty(value)?,
        OutputFormat::Json => serde_json::to_string_pretty(value)? + "\n",
    };
    Ok(text)
}

fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.log_level, args.log_file.clone())?;

    info!("Starting clientprops v{}", env!("CARGO_PKG_VERSION"));

    let registry = load_registry(&args)?;

    let output = match &args.command {
        Command::Show { format } => render(&registry, *format)?,
        Command::Resolve { client, format } => {
            let effective = ClientResolver::new(&registry).resolve(client, &ClientConfig::default());
            render(&effective, *format)?
        }
    };

    print!("{}", output);
    Ok(())
}
