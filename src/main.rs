//! edefter CLI - Flatten E-Defter ledgers into JSON rows

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, Subcommand, ValueEnum};
use colored::*;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use edefter::{extract_files, LedgerSummary, Parser, Record, Schema, SchemaVariant};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Flatten E-Defter (XBRL GL) ledgers into tabular records
#[derive(ClapParser)]
#[command(name = "edefter")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One JSON object per line
    Ndjson,
    /// A single JSON array
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Flatten ledger files into one record per entry detail
    Extract {
        /// Input files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Schema: "header", "detail" or a path to a JSON schema file
        #[arg(short, long, env = "EDEFTER_SCHEMA", default_value = "header")]
        schema: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "ndjson")]
        format: OutputFormat,

        /// Write records to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Show statistics on stderr
        #[arg(long)]
        stats: bool,
    },

    /// Summarise a ledger: period covered and entry counts
    Inspect {
        /// Input file
        input: PathBuf,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Print a built-in schema as JSON, as a starting point for custom schemas
    Schema {
        /// Built-in variant (header, detail)
        #[arg(default_value = "header")]
        variant: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Extract {
            inputs,
            schema,
            format,
            output,
            stats,
        } => {
            let schema = Schema::resolve(&schema)
                .with_context(|| format!("Failed to load schema {}", schema))?;

            let start = Instant::now();
            let results = extract_files(&inputs, &schema);
            let elapsed = start.elapsed();

            let mut records = Vec::new();
            let mut failed = 0;
            for (input, result) in inputs.iter().zip(results) {
                match result {
                    Ok(mut file_records) => {
                        eprintln!(
                            "{} {} ({} records)",
                            "✓".green().bold(),
                            input.display(),
                            file_records.len()
                        );
                        records.append(&mut file_records);
                    }
                    Err(err) => {
                        failed += 1;
                        eprintln!("{} {} - {}", "✗".red().bold(), input.display(), err);
                    }
                }
            }

            match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    write_records(BufWriter::new(file), &records, format)?;
                }
                None => write_records(io::stdout().lock(), &records, format)?,
            }

            if stats {
                eprintln!("  Schema: {} ({} columns)", schema.name(), schema.width());
                eprintln!("  Files: {} ({} failed)", inputs.len(), failed);
                eprintln!("  Records: {}", records.len());
                eprintln!("  Time: {:.2}ms", elapsed.as_secs_f64() * 1000.0);
            }

            if failed > 0 {
                std::process::exit(1);
            }
        }

        Commands::Inspect { input, json } => {
            let doc = Parser::new()
                .parse_file(&input)
                .with_context(|| format!("Failed to parse {}", input.display()))?;
            let summary = LedgerSummary::from_tree(&doc)
                .with_context(|| format!("Failed to read ledger {}", input.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&input, &summary);
            }
        }

        Commands::Schema { variant } => {
            let variant: SchemaVariant = variant.parse()?;
            println!("{}", serde_json::to_string_pretty(&Schema::variant(variant))?);
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn write_records<W: Write>(mut out: W, records: &[Record], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Ndjson => {
            for record in records {
                serde_json::to_writer(&mut out, record)?;
                out.write_all(b"\n")?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, records)?;
            out.write_all(b"\n")?;
        }
    }
    out.flush()?;
    Ok(())
}

fn print_summary(input: &std::path::Path, summary: &LedgerSummary) {
    println!("{} {}", "✓".green().bold(), input.display());
    println!(
        "  Ledger: {}",
        summary.unique_id.as_deref().unwrap_or("(no uniqueID)")
    );
    match (summary.period_start, summary.period_end) {
        (Some(start), Some(end)) => {
            let days = summary
                .period_days()
                .map(|d| format!(" ({} days)", d))
                .unwrap_or_default();
            println!("  Period: {} .. {}{}", start, end, days);
        }
        _ => println!("  Period: {}", "unknown".yellow()),
    }
    println!("  Entry headers: {}", summary.headers);
    println!("  Entry details: {}", summary.details);
    println!("  Max details per header: {}", summary.max_details_per_header);
    if summary.empty_headers > 0 {
        println!(
            "  {} {} headers without details",
            "WARNING:".yellow(),
            summary.empty_headers
        );
    }
}
