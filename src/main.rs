//! Date Filter - command-line entry point
//!
//! Parses a date filter the way the dashboard does and prints the normalized
//! value together with the query variables it produces.

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use date_filter::{
    config::Config, error::Result, parse_json, parse_query_param, parse_str, DateFilterValue,
    Timestamp,
};

#[derive(Parser)]
#[command(name = "date-filter")]
#[command(author, version, about = "Parse dashboard date filters into query bounds")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Verbose output (logs why a filter was discarded)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a filter and show the normalized value and its bounds
    Parse(FilterArgs),

    /// Show only the query bounds for a filter
    Bounds(FilterArgs),

    /// Show or edit configuration
    Config {
        /// Print current configuration
        #[arg(long)]
        show: bool,

        /// Create default configuration file
        #[arg(long)]
        init: bool,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Legacy filter string, or a JSON document with --json
    input: String,

    /// Treat the input as JSON (object or quoted legacy string)
    #[arg(long, conflicts_with = "url_encoded")]
    json: bool,

    /// Percent-decode the input first, as taken from a URL query parameter
    #[arg(long)]
    url_encoded: bool,

    /// Reference time for relative filters (RFC 3339), defaults to now
    #[arg(long, env = "DATE_FILTER_NOW")]
    now: Option<Timestamp>,
}

impl FilterArgs {
    fn filter(&self) -> Option<DateFilterValue> {
        if self.json {
            parse_json(&self.input)
        } else if self.url_encoded {
            parse_query_param(&self.input)
        } else {
            parse_str(&self.input)
        }
    }

    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.now.map_or_else(chrono::Utc::now, Timestamp::get)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load and validate configuration
    let config = if let Some(ref path) = cli.config {
        Config::load_from(path)?
    } else {
        Config::load()?
    };
    config.validate()?;

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(&config.general.log_level)
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Parse(args) => {
            let filter = args.filter();
            let bounds = filter.as_ref().map(|f| f.to_query_bounds_at(args.now()));
            let mut output = json!({
                "filter": filter,
                "bounds": bounds,
            });
            if config.output.label {
                output["label"] = json!(filter.as_ref().map(ToString::to_string));
            }
            print_json(&output, config.output.pretty)
        }

        Commands::Bounds(args) => {
            let bounds = args.filter().map(|f| f.to_query_bounds_at(args.now()));
            print_json(&bounds, config.output.pretty)
        }

        Commands::Config { show, init } => {
            if init {
                Config::default().save()?;
                println!(
                    "Created default configuration at {}",
                    Config::config_path()?.display()
                );
            } else if show {
                let contents = toml::to_string_pretty(&config)?;
                println!("{contents}");
            } else {
                println!("Configuration path: {}", Config::config_path()?.display());
            }
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}
