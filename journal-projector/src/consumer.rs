//! Single-owner event consumer
//!
//! One tokio task owns the reassembly buffer and the projector. Callers hold
//! a cloneable [`ConsumerHandle`] and talk to the task through a bounded
//! mailbox, so events are applied strictly in submission order.
//!
//! ```text
//!   ConsumerHandle (Clone) ──mpsc──▶ ConsumerActor
//!                                       │ ReassemblyBuffer::push
//!                                       ▼
//!                                    Projector::apply (one db transaction)
//! ```
//!
//! After a reassembly or projection failure the actor halts: it keeps
//! answering status requests but rejects every later event.

use crate::error::{Error, Result};
use crate::metrics::Metrics;
use crate::projector::Projector;
use crate::reassembly::ReassemblyBuffer;
use journal_ledger::event::BlockCommit;
use journal_ledger::Event;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

/// What happened to a submitted event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Waiting for the rest of its transaction
    Buffered,
    /// Completed its transaction, which is now committed
    Projected { transaction_id: String, rows: usize },
    /// Block boundary recorded
    BlockCommitted { block_id: String },
}

/// Consumer progress report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsumerStatus {
    /// Incomplete transactions in the buffer
    pub pending_transactions: usize,
    /// Transactions committed since start
    pub projected_transactions: u64,
    /// Last block seen
    pub last_block_id: Option<String>,
    /// Failure that halted the consumer
    pub halted: Option<String>,
}

impl ConsumerStatus {
    /// Whether the consumer stopped accepting events
    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }
}

/// Message sent to the consumer actor
#[derive(Debug)]
pub enum ConsumerMessage {
    /// Process one event
    Submit {
        event: Event,
        response: oneshot::Sender<Result<Outcome>>,
    },

    /// Report progress
    Status {
        response: oneshot::Sender<ConsumerStatus>,
    },

    /// Stop the loop
    Shutdown,
}

/// Actor that owns the read-side state
#[derive(Debug)]
pub struct ConsumerActor {
    projector: Projector,
    buffer: ReassemblyBuffer,
    mailbox: mpsc::Receiver<ConsumerMessage>,
    metrics: Option<Metrics>,
    projected_transactions: u64,
    last_block_id: Option<String>,
    halted: Option<String>,
}

impl ConsumerActor {
    /// Create new actor
    pub fn new(
        projector: Projector,
        mailbox: mpsc::Receiver<ConsumerMessage>,
        metrics: Option<Metrics>,
    ) -> Self {
        Self {
            projector,
            buffer: ReassemblyBuffer::new(),
            mailbox,
            metrics,
            projected_transactions: 0,
            last_block_id: None,
            halted: None,
        }
    }

    /// Run until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                ConsumerMessage::Submit { event, response } => {
                    let result = self.handle_event(event).await;
                    let _ = response.send(result);
                }
                ConsumerMessage::Status { response } => {
                    let _ = response.send(self.status());
                }
                ConsumerMessage::Shutdown => break,
            }
        }

        if self.buffer.pending_transactions() > 0 {
            tracing::warn!(
                pending = self.buffer.pending_transactions(),
                "Consumer stopped with incomplete transactions"
            );
        }
        tracing::info!(
            projected = self.projected_transactions,
            "Consumer stopped"
        );
    }

    fn status(&self) -> ConsumerStatus {
        ConsumerStatus {
            pending_transactions: self.buffer.pending_transactions(),
            projected_transactions: self.projected_transactions,
            last_block_id: self.last_block_id.clone(),
            halted: self.halted.clone(),
        }
    }

    async fn handle_event(&mut self, event: Event) -> Result<Outcome> {
        if let Some(reason) = &self.halted {
            return Err(Error::Halted(reason.clone()));
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_event();
        }

        let result = if event.is_block_commit() {
            self.block_commit(&event)
        } else {
            self.project(event).await
        };

        if let Err(e) = &result {
            if let Some(metrics) = &self.metrics {
                metrics.record_failure(e.kind());
            }
            if e.is_fatal() {
                tracing::error!(kind = e.kind(), error = %e, "Consumer halted");
                self.halted = Some(e.to_string());
            }
        }
        result
    }

    async fn project(&mut self, event: Event) -> Result<Outcome> {
        let completed = match self.buffer.push(event)? {
            Some(completed) => completed,
            None => return Ok(Outcome::Buffered),
        };

        let rows = self.projector.apply(&completed).await?;
        self.projected_transactions += 1;
        if let Some(metrics) = &self.metrics {
            metrics.record_projected(rows);
        }
        tracing::info!(
            transaction_id = %completed.transaction_id,
            rows,
            "Transaction committed"
        );
        Ok(Outcome::Projected {
            transaction_id: completed.transaction_id,
            rows,
        })
    }

    fn block_commit(&mut self, event: &Event) -> Result<Outcome> {
        let block = BlockCommit::from_event(event)
            .map_err(|e| Error::MalformedEvent(e.to_string()))?;

        if let Some(last) = &self.last_block_id {
            if *last != block.previous_block_id {
                tracing::warn!(
                    block_id = %block.block_id,
                    previous_block_id = %block.previous_block_id,
                    last_block_id = %last,
                    "Block does not extend the last seen block, possible fork"
                );
            }
        }
        tracing::debug!(block_id = %block.block_id, "Block committed");
        self.last_block_id = Some(block.block_id.clone());
        Ok(Outcome::BlockCommitted {
            block_id: block.block_id,
        })
    }
}

/// Handle for sending messages to the consumer
#[derive(Debug, Clone)]
pub struct ConsumerHandle {
    sender: mpsc::Sender<ConsumerMessage>,
}

impl ConsumerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<ConsumerMessage>) -> Self {
        Self { sender }
    }

    /// Submit one event and wait for its outcome
    pub async fn submit(&self, event: Event) -> Result<Outcome> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ConsumerMessage::Submit {
                event,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Current progress
    pub async fn status(&self) -> Result<ConsumerStatus> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ConsumerMessage::Status { response: tx })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Stop the consumer after the events already queued
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(ConsumerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the consumer actor
pub fn spawn_consumer(
    projector: Projector,
    mailbox_capacity: usize,
    metrics: Option<Metrics>,
) -> (ConsumerHandle, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(mailbox_capacity);
    let actor = ConsumerActor::new(projector, rx, metrics);

    let task = tokio::spawn(async move {
        actor.run().await;
    });

    (ConsumerHandle::new(tx), task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use journal_ledger::event::{keys, EventKind, TransactionControl};

    async fn consumer() -> (ConsumerHandle, tokio::task::JoinHandle<()>, Metrics) {
        let projector = Projector::connect(&DatabaseConfig::in_memory())
            .await
            .unwrap();
        let metrics = Metrics::new().unwrap();
        let (handle, task) = spawn_consumer(projector, 16, Some(metrics.clone()));
        (handle, task, metrics)
    }

    fn block(id: &str, previous: &str) -> Event {
        BlockCommit {
            block_id: id.to_string(),
            previous_block_id: previous.to_string(),
        }
        .to_event()
    }

    #[tokio::test]
    async fn test_spawn_and_shutdown() {
        let (handle, task, _) = consumer().await;
        assert_eq!(handle.status().await.unwrap(), ConsumerStatus::default());
        handle.shutdown().await.unwrap();
        task.await.unwrap();
        assert!(matches!(
            handle.status().await,
            Err(Error::Concurrency(_))
        ));
    }

    #[tokio::test]
    async fn test_block_commits_are_tracked() {
        let (handle, _task, _) = consumer().await;
        assert_eq!(
            handle.submit(block("b1", "b0")).await.unwrap(),
            Outcome::BlockCommitted {
                block_id: "b1".into()
            }
        );
        // A fork only warns
        handle.submit(block("b9", "b7")).await.unwrap();
        let status = handle.status().await.unwrap();
        assert_eq!(status.last_block_id.as_deref(), Some("b9"));
        assert!(!status.is_halted());
    }

    #[tokio::test]
    async fn test_halts_after_reassembly_error() {
        let (handle, _task, metrics) = consumer().await;
        let control = TransactionControl {
            transaction_id: "tx".into(),
            event_seq: 0,
            num_events: 2,
        }
        .to_event();
        assert_eq!(handle.submit(control.clone()).await.unwrap(), Outcome::Buffered);
        assert!(matches!(
            handle.submit(control).await,
            Err(Error::Reassembly { .. })
        ));

        let late = Event::new(EventKind::PersonModificationTime)
            .with(keys::TRANSACTION_ID, "other")
            .with(keys::EVENT_SEQ, 1);
        assert!(matches!(handle.submit(late).await, Err(Error::Halted(_))));

        let status = handle.status().await.unwrap();
        assert!(status.is_halted());
        assert_eq!(status.pending_transactions, 1);
        assert_eq!(
            metrics
                .projection_failures
                .with_label_values(&["reassembly"])
                .get(),
            1
        );
    }
}
