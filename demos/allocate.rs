//! Demo issuing identifiers from concurrent tasks and printing the counters.
//!
//! Run with:
//! ```bash
//! cargo run --example allocate --features demo -- --help
//! RUST_LOG=progressivi=debug cargo run --example allocate --features demo -- --tasks 4
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use progressivi::config::{Backend, SequencerConfig};
use progressivi::observers::json::JsonObserver;
use progressivi::observers::prometheus::{MetricType, PrometheusObserver};
use progressivi::observers::table::{TableObserver, TableStyle};
use progressivi::scope::{CounterKind, ScopeContext};
use progressivi::sequencer::Sequencer;
use progressivi::store::{CounterRecord, CounterStore};
use tracing_subscriber::EnvFilter;

/// Output format for the counter records.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Pretty ASCII table
    Table,
    /// Compact table with multiple columns
    Compact,
    /// JSON format
    Json,
    /// Prometheus exposition format
    Prometheus,
}

/// Table style selection.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum StyleChoice {
    Ascii,
    #[default]
    Rounded,
    Sharp,
    Modern,
    Markdown,
    Blank,
}

impl From<StyleChoice> for TableStyle {
    fn from(choice: StyleChoice) -> Self {
        match choice {
            StyleChoice::Ascii => TableStyle::Ascii,
            StyleChoice::Rounded => TableStyle::Rounded,
            StyleChoice::Sharp => TableStyle::Sharp,
            StyleChoice::Modern => TableStyle::Modern,
            StyleChoice::Markdown => TableStyle::Markdown,
            StyleChoice::Blank => TableStyle::Blank,
        }
    }
}

/// Demo application for progressivi - scoped sequence identifiers.
///
/// Spawns concurrent tasks that each issue identifiers for a sample of brands,
/// customers, employees and inventory items, then prints the counters.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Table style (for table/compact formats)
    #[arg(short, long, value_enum, default_value = "rounded")]
    style: StyleChoice,

    /// Number of columns (for compact format)
    #[arg(short, long, default_value = "2")]
    columns: usize,

    /// Pretty print JSON output
    #[arg(long)]
    pretty: bool,

    /// Include timestamp in JSON output
    #[arg(long)]
    timestamp: bool,

    /// Prometheus metric namespace (prefix)
    #[arg(long, default_value = "demo")]
    namespace: String,

    /// Export Prometheus samples as gauges instead of counters
    #[arg(long)]
    gauge: bool,

    /// Number of concurrent tasks
    #[arg(short, long, default_value = "8")]
    tasks: usize,

    /// Identifiers issued per task
    #[arg(short, long, default_value = "5")]
    iterations: usize,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use the Redis store at this URL (overrides the configuration backend)
    #[arg(long)]
    redis: Option<String>,

    /// Print every issued identifier
    #[arg(short, long)]
    verbose: bool,
}

/// The (kind, context) pairs each task cycles through.
fn workload() -> Vec<(CounterKind, ScopeContext)> {
    vec![
        (CounterKind::Brand, ScopeContext::geo("Sindh", "Karachi")),
        (CounterKind::Brand, ScopeContext::geo("Punjab", "Lahore")),
        (CounterKind::Brand, ScopeContext::geo("Sindh", "Larkana")),
        (CounterKind::Customer, ScopeContext::global()),
        (CounterKind::Employee, ScopeContext::global()),
        (CounterKind::Inventory, ScopeContext::keyed("WH-01")),
    ]
}

fn load_config(args: &Args) -> Result<SequencerConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => SequencerConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => SequencerConfig::default(),
    };
    if let Some(url) = &args.redis {
        config.store.backend = Backend::Redis {
            url: url.clone(),
            hash_key: None,
        };
    }
    config.validate()?;
    Ok(config)
}

async fn issue(
    sequencer: Arc<Sequencer<dyn CounterStore>>,
    tasks: usize,
    iterations: usize,
    verbose: bool,
) -> usize {
    let workload = Arc::new(workload());
    let mut handles = vec![];

    for task in 0..tasks {
        let sequencer = Arc::clone(&sequencer);
        let workload = Arc::clone(&workload);
        handles.push(tokio::spawn(async move {
            let mut issued = 0;
            for i in 0..iterations {
                let (kind, context) = &workload[(task + i) % workload.len()];
                match sequencer.allocate(*kind, context).await {
                    Ok(id) => {
                        issued += 1;
                        if verbose {
                            println!("task {task:>2}: {:<10} {id}", kind.as_str());
                        }
                    }
                    Err(e) => eprintln!("task {task:>2}: {e}"),
                }
            }
            issued
        }));
    }

    let mut total = 0;
    for handle in handles {
        total += handle.await.unwrap_or(0);
    }
    total
}

fn render_output(args: &Args, records: &[CounterRecord]) -> String {
    match args.format {
        OutputFormat::Table => TableObserver::new()
            .with_style(args.style.into())
            .with_title("Counters")
            .render(records),

        OutputFormat::Compact => TableObserver::new()
            .compact(true)
            .columns(args.columns)
            .with_style(args.style.into())
            .render(records),

        OutputFormat::Json => JsonObserver::new()
            .pretty(args.pretty)
            .wrap_in_snapshot(args.timestamp)
            .include_timestamp(args.timestamp)
            .to_json(records)
            .unwrap_or_else(|e| format!("Error: {}", e)),

        OutputFormat::Prometheus => PrometheusObserver::new()
            .with_namespace(&args.namespace)
            .with_type(if args.gauge {
                MetricType::Gauge
            } else {
                MetricType::Counter
            })
            .render(records)
            .unwrap_or_else(|e| format!("Error: {}", e)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let sequencer = Arc::new(config.open().await?);

    let issued = issue(Arc::clone(&sequencer), args.tasks, args.iterations, args.verbose).await;
    if args.verbose {
        println!();
    }

    let records = sequencer.records().await?;
    println!("{}", render_output(&args, &records));
    eprintln!("issued {issued} identifiers from {} tasks", args.tasks);

    Ok(())
}
