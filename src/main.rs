use clap::{Parser as ClapParser, Subcommand};
use metaquery::Settings;
use metaquery::cli::{self, CheckOptions, CheckResult, CliError, CompileOptions, ExtractOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "metaquery")]
#[command(about = "metaquery - A query language for metadata repositories, compiled to graph traversals")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check query syntax, and types when a type file is given
    Check {
        /// The query to check
        query: String,

        /// JSON file with type definitions
        #[arg(short, long)]
        types: Option<PathBuf>,
    },

    /// Compile a query to a traversal script
    Compile {
        /// The query to compile
        query: String,

        /// JSON file with type definitions
        #[arg(short, long)]
        types: PathBuf,

        /// Settings file (JSON, TOML or YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Page size when the query has no limit clause
        #[arg(long)]
        limit: Option<u64>,

        /// Page offset when the query has no limit clause
        #[arg(long)]
        offset: Option<u64>,

        /// Put each traversal step on its own line
        #[arg(short, long)]
        pretty: bool,
    },

    /// Turn a raw engine result into a typed query result
    Extract {
        /// The query that produced the result
        query: String,

        /// JSON file with type definitions
        #[arg(short, long)]
        types: PathBuf,

        /// Settings file (JSON, TOML or YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Raw result JSON (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { query, types } => run_check(query, types.as_deref()),
        Commands::Compile {
            query,
            types,
            config,
            limit,
            offset,
            pretty,
        } => run_compile(query, &types, config.as_deref(), limit, offset, pretty),
        Commands::Extract {
            query,
            types,
            config,
            input,
            pretty,
        } => run_extract(query, &types, config.as_deref(), input, pretty),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_check(query: String, types: Option<&Path>) -> Result<(), CliError> {
    let types = types.map(std::fs::read_to_string).transpose()?;
    match cli::execute_check(&CheckOptions { query, types })? {
        CheckResult::SyntaxValid => println!("Syntax is valid"),
        CheckResult::Valid(canonical) => println!("Query is valid: {}", canonical),
    }
    Ok(())
}

fn run_compile(
    query: String,
    types: &Path,
    config: Option<&Path>,
    limit: Option<u64>,
    offset: Option<u64>,
    pretty: bool,
) -> Result<(), CliError> {
    let options = CompileOptions {
        query,
        types: std::fs::read_to_string(types)?,
        settings: Settings::load(config)?,
        limit,
        offset,
        pretty,
    };
    println!("{}", cli::execute_compile(&options)?);
    Ok(())
}

fn run_extract(
    query: String,
    types: &Path,
    config: Option<&Path>,
    input: Option<String>,
    pretty: bool,
) -> Result<(), CliError> {
    let input = match input {
        Some(s) => Some(s),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).map_err(CliError::Io)?;
            Some(buffer)
        }
        None => None,
    };

    let options = ExtractOptions {
        query,
        types: std::fs::read_to_string(types)?,
        settings: Settings::load(config)?,
        input,
    };

    let output = cli::execute_extract(&options)?;
    let json = if pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    }?;
    println!("{}", json);
    Ok(())
}
