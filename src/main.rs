//! jsontable - inspect and scan newline-delimited JSON tables

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use jsontable::config::{ClientMode, Config, MissingFieldPolicy, OutputFormat};
use jsontable::output::{write_warning, OutputFactory};
use jsontable::TableService;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutputFormat {
    Table,
    Json,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(f: CliOutputFormat) -> Self {
        match f {
            CliOutputFormat::Table => OutputFormat::Table,
            CliOutputFormat::Json => OutputFormat::Json,
        }
    }
}

/// Query a directory of newline-delimited JSON files as typed tables
#[derive(Parser, Debug)]
#[command(name = "jsontable")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database base directory (holds _metadata/meta.json)
    #[arg(short, long)]
    base: PathBuf,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Pending-request capacity of the service queue
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Maximum records returned by a buffered scan
    #[arg(long)]
    max_results: Option<usize>,

    /// Run requests on the calling thread instead of the service worker
    #[arg(long)]
    embedded: bool,

    /// Fail a row when a declared column is missing from the record
    #[arg(long)]
    fail_on_missing: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    format: CliOutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List table names
    Tables {
        /// Only names containing this text
        #[arg(short, long)]
        pattern: Option<String>,
    },
    /// Show a table's columns
    Describe { table: String },
    /// Print a table's rows
    Scan {
        table: String,

        /// Column(s) to return (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Read lazily instead of buffering (not capped)
        #[arg(long)]
        stream: bool,

        /// Stop after this many rows
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// Logs go to stderr so rows on stdout stay machine-readable.
fn init_tracing() {
    // Enable ANSI colors only when stderr is a terminal and NO_COLOR is unset.
    let ansi = std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(ansi)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::new(&cli.base).with_env_overrides();
    if let Some(ms) = cli.timeout_ms {
        config = config.with_request_timeout(Duration::from_millis(ms));
    }
    if let Some(capacity) = cli.queue_capacity {
        config = config.with_queue_capacity(capacity);
    }
    if let Some(max) = cli.max_results {
        config = config.with_max_result_size(max);
    }
    if cli.embedded {
        config = config.with_client_mode(ClientMode::Embedded);
    }
    if cli.fail_on_missing {
        config = config.with_missing_fields(MissingFieldPolicy::FailFast);
    }

    let service = TableService::open(config)
        .with_context(|| format!("Failed to open database at {}", cli.base.display()))?;
    let client = service.client();
    let formatter = OutputFactory::create(cli.format.into());
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Command::Tables { pattern } => {
            let names = client
                .list_table_names(pattern.as_deref())
                .context("Failed to list tables")?;
            formatter.render_table_names(&names, &mut stdout)?;
        }
        Command::Describe { table } => {
            let meta = client
                .get_table(&table)
                .with_context(|| format!("Failed to describe table {}", table))?;
            formatter.render_schema(&meta, &mut stdout)?;
        }
        Command::Scan {
            table,
            columns,
            stream,
            limit,
        } => {
            let columns = (!columns.is_empty()).then_some(columns.as_slice());
            let limit = limit.unwrap_or(usize::MAX);

            if stream {
                let mut rows = client
                    .scan_table_as_stream(&table, columns)
                    .with_context(|| format!("Failed to scan table {}", table))?;
                let meta = rows.table().clone();
                formatter
                    .render_rows(&meta, &mut rows.by_ref().take(limit), &mut stdout)
                    .with_context(|| format!("Failed to scan table {}", table))?;
            } else {
                let rows = client
                    .scan_table(&table, columns)
                    .with_context(|| format!("Failed to scan table {}", table))?;
                formatter.render_rows(
                    &rows.table,
                    &mut rows.rows.iter().cloned().map(Ok::<_, jsontable::Error>).take(limit),
                    &mut stdout,
                )?;
                if rows.truncated {
                    write_warning(&format!(
                        "result reached the limit of {} rows; use --stream to read everything",
                        rows.row_count()
                    ))?;
                }
            }
        }
    }

    service.shutdown();
    Ok(())
}
