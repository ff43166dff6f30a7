//! Forward NDJSON log records from stdin to Kinesis as aggregated records.
//!
//! Build with: cargo build --release --features kinesis --bin kinesis-aggregation

use anyhow::Context;
use clap::Parser;
use kinesis_aggregation::{
    config::load_config_from_path, forward, kinesis::KinesisSender, logging::init_tracing,
    AggregationOutput, RetryingSender,
};
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing::info;

#[derive(Parser)]
#[command(name = "kinesis-aggregation")]
#[command(about = "Ship NDJSON log records to Kinesis as KPL aggregated records")]
#[command(version)]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, short, env = "KINESIS_AGGREGATION_CONFIG")]
    config: PathBuf,

    /// Routing tag injected into every record
    #[arg(long, default_value = "stdin")]
    tag: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config_from_path(&cli.config)?;
    init_tracing(config.debug, cli.json_logs);

    info!(
        stream = %config.stream_name,
        chunk_limit = config.buffer_chunk_limit,
        fixed_partition_key = config.fixed_partition_key.is_some(),
        "starting kinesis aggregation output"
    );

    let sender = RetryingSender::new(
        KinesisSender::from_config(&config.aws).await,
        config.retry.retry_config(),
    );
    let output = AggregationOutput::new(&config, sender);

    let stats = forward(
        BufReader::new(tokio::io::stdin()),
        &output,
        &cli.tag,
        config.buffer_chunk_limit,
        config.flush_interval(),
    )
    .await
    .context("Failed to read stdin")?;

    info!(
        records = stats.records,
        skipped = stats.skipped,
        chunks_sent = stats.chunks_sent,
        chunks_dropped = stats.chunks_dropped,
        chunks_failed = stats.chunks_failed,
        "stdin closed, output stopped"
    );
    Ok(())
}
