//! Projector binary
//!
//! Reads ledger events as JSON lines from stdin and projects them into the
//! configured SQLite database. The optional first argument is a TOML config
//! file; otherwise `JOURNAL_*` environment variables apply.

use anyhow::Context;
use journal_ledger::Event;
use journal_projector::metrics::Metrics;
use journal_projector::{spawn_consumer, Config, Outcome, Projector};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path).with_context(|| format!("loading {path}"))?,
        None => Config::from_env()?,
    };

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if config.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(service = %config.service_name, "Starting journal projector");

    let projector = Projector::connect(&config.database).await?;
    let metrics = Metrics::new().context("registering metrics")?;
    let (consumer, task) = spawn_consumer(projector, config.mailbox_capacity, Some(metrics.clone()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_number = 0u64;
    let mut failure = None;
    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        let event: Event = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                failure = Some(anyhow::anyhow!("line {line_number}: not an event: {e}"));
                break;
            }
        };
        match consumer.submit(event).await {
            Ok(Outcome::Projected { transaction_id, rows }) => {
                tracing::debug!(line = line_number, %transaction_id, rows, "Projected");
            }
            Ok(_) => {}
            Err(e) => {
                failure = Some(anyhow::Error::new(e).context(format!("line {line_number}")));
                break;
            }
        }
    }

    let status = consumer.status().await?;
    tracing::info!(
        projected = status.projected_transactions,
        pending = status.pending_transactions,
        last_block_id = ?status.last_block_id,
        rows = metrics.rows_written.get(),
        "Input exhausted"
    );
    consumer.shutdown().await?;
    task.await?;

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
