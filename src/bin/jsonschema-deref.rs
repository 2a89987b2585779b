//! JSON Schema Dereferencer CLI
//!
//! Command-line interface for loading schemas and inlining their `$ref`s.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use jsonschema_deref::{
    classify, resolve_fragment, segments, RecursionPolicy, ResolveOptions, Resolver,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jsonschema-deref")]
#[command(about = "Inline every $ref of a JSON Schema")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dereference a schema into a single $ref-free document
    Resolve {
        /// Schema source: file path or URI (file://, http://, https://)
        schema: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Refuse to fetch http:// and https:// references
        #[arg(long)]
        no_remote: bool,

        /// HTTP request timeout in seconds
        #[arg(long, default_value_t = 10)]
        timeout: u64,

        /// Leave recursive references in place instead of failing
        #[arg(long)]
        keep_recursive: bool,
    },

    /// Load a schema document without dereferencing it
    Fetch {
        /// Schema source: file path or URI
        schema: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the structural kind of a schema node
    Classify {
        /// Schema source: file path or URI
        schema: String,

        /// JSON Pointer to the node (document root if not specified)
        #[arg(long, default_value = "")]
        pointer: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Resolve {
            schema,
            output,
            pretty,
            no_remote,
            timeout,
            keep_recursive,
        } => {
            let recursion = if keep_recursive {
                RecursionPolicy::KeepRef
            } else {
                RecursionPolicy::Fail
            };
            let options = ResolveOptions::new()
                .remote(!no_remote)
                .http_timeout(Duration::from_secs(timeout))
                .recursion(recursion);
            run_resolve(&schema, options, output, pretty).await
        }

        Commands::Fetch {
            schema,
            output,
            pretty,
        } => run_fetch(&schema, output, pretty).await,

        Commands::Classify { schema, pointer } => run_classify(&schema, &pointer).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolver(options: ResolveOptions) -> Result<Resolver, u8> {
    Resolver::new(options).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

async fn run_resolve(
    schema_source: &str,
    options: ResolveOptions,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let resolved = resolver(options)?
        .resolve(schema_source)
        .await
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;

    write_json(&resolved, output, pretty)
}

async fn run_fetch(schema_source: &str, output: Option<PathBuf>, pretty: bool) -> Result<(), u8> {
    let document = resolver(ResolveOptions::new())?
        .fetch(schema_source)
        .await
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;

    write_json(&document, output, pretty)
}

async fn run_classify(schema_source: &str, pointer: &str) -> Result<(), u8> {
    let document = resolver(ResolveOptions::new())?
        .fetch(schema_source)
        .await
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;

    let Some(node) = resolve_fragment(&document, &segments(pointer)) else {
        eprintln!("Error: pointer {:?} does not exist in {}", pointer, schema_source);
        return Err(2);
    };

    let kind = serde_json::to_value(classify(node)).map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    match kind {
        Value::String(name) => println!("{}", name),
        other => println!("{}", other),
    }
    Ok(())
}

fn write_json(value: &Value, output: Option<PathBuf>, pretty: bool) -> Result<(), u8> {
    let json_output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}
