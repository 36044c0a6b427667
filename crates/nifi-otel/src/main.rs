//! NiFi OTel - Apache NiFi provenance to OpenTelemetry traces
//!
//! Listens for the JSON reports NiFi's reporting tasks send and forwards them
//! to a collector as spans.

use clap::{Parser, Subcommand, ValueEnum};
use nifi_otel_core::config::{ConfigLoader, ReceiverConfig};
use nifi_otel_core::events::{BulletinEvent, ProvenanceEvent};
use nifi_otel_core::metrics::create_metrics;
use nifi_otel_core::{EventTranslator, TraceBatch};
use nifi_otel_export::build_consumer;
use nifi_otel_server::ReceiverServer;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "nifi-otel")]
#[command(version)]
#[command(about = "NiFi provenance and bulletin receiver for OpenTelemetry", long_about = None)]
struct Cli {
    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format
    #[arg(short, long, value_enum, default_value_t = LogFormat::Text, global = true)]
    format: LogFormat,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "NIFI_OTEL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EventKind {
    Provenance,
    Bulletin,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP receiver
    Serve {
        /// Listen address, overrides the config file
        #[arg(short, long)]
        endpoint: Option<String>,
    },

    /// Translate a saved JSON report and print the OTLP/JSON request
    Translate {
        /// File holding a JSON array of events
        #[arg(short, long)]
        input: PathBuf,

        /// Which kind of events the file holds
        #[arg(short, long, value_enum)]
        kind: EventKind,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new()
        .with_cli_path(cli.config.clone())
        .load()?;

    init_logging(cli.verbose, cli.format, &config)?;
    info!("Configuration loaded successfully");

    match cli.command {
        Commands::Serve { endpoint } => serve_command(config, endpoint).await,
        Commands::Translate {
            input,
            kind,
            pretty,
        } => translate_command(&config, &input, kind, pretty),
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

/// CLI verbose flag takes precedence, then config, then default
fn log_level(verbose: u8, config: &ReceiverConfig) -> Level {
    if verbose > 0 {
        return match verbose {
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };
    }

    match config.receiver.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn init_logging(verbose: u8, format: LogFormat, config: &ReceiverConfig) -> anyhow::Result<()> {
    let builder = FmtSubscriber::builder()
        .with_max_level(log_level(verbose, config))
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
    }
    Ok(())
}

async fn serve_command(mut config: ReceiverConfig, endpoint: Option<String>) -> anyhow::Result<()> {
    if let Some(endpoint) = endpoint {
        config.server.endpoint = endpoint;
    }

    let settings = config.translator_settings()?;
    let consumer = build_consumer(&config.export)?;
    info!(consumer = consumer.name(), "Downstream consumer ready");

    let listener = tokio::net::TcpListener::bind(&config.server.endpoint).await?;
    let sweep_interval = Duration::from_secs(config.translator.sweep_interval_secs);

    ReceiverServer::new(
        config.server,
        EventTranslator::new(settings),
        consumer,
        create_metrics(),
    )
    .with_sweep_interval(Some(sweep_interval))
    .serve(listener, shutdown_signal())
    .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down..."),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}

fn translate_command(
    config: &ReceiverConfig,
    input: &Path,
    kind: EventKind,
    pretty: bool,
) -> anyhow::Result<()> {
    let batch = translate_file(config, input, kind)?;
    info!(
        spans = batch.span_count(),
        skipped = batch.skipped(),
        "Translated {}",
        input.display()
    );
    println!("{}", batch.to_json(pretty)?);
    Ok(())
}

/// Translate a file of events with a fresh translator
fn translate_file(
    config: &ReceiverConfig,
    input: &Path,
    kind: EventKind,
) -> anyhow::Result<TraceBatch> {
    let content = std::fs::read_to_string(input)?;
    let mut translator = EventTranslator::new(config.translator_settings()?);

    let batch = match kind {
        EventKind::Provenance => {
            let events: Vec<ProvenanceEvent> = serde_json::from_str(&content)?;
            translator.translate_provenance(&events)
        }
        EventKind::Bulletin => {
            let events: Vec<BulletinEvent> = serde_json::from_str(&content)?;
            translator.translate_bulletins(&events)
        }
    };
    Ok(batch)
}
