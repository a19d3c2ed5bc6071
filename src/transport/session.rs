//! Session context: the dedup cache, the document serializer and the event
//! stream, plus the single dispatch entry point for push messages.

use std::convert::Infallible;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    core::{dedup::DedupFilter, list},
    document::DocumentHost,
    engine::{
        ack::Ack,
        mutator::{BatchReport, DocumentMutator},
    },
    op::{Operation, normalize_batch},
    runtime::{
        events::DocEvent,
        serializer::{SerializerHandle, Ticket, spawn_serializer},
    },
    types::JobId,
};

use super::message::{BlockMessage, Inbound};

/// Result of dispatching one push message.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Coordinator greeting.
    Hello {
        /// Delivery group.
        group: Option<String>,
    },
    /// A batch was applied; `ack` goes back on the connection.
    Applied {
        /// Acknowledgment to send.
        ack: Ack,
        /// Mutations that failed inside the batch.
        failed: usize,
    },
    /// Every operation of the batch was a recent duplicate (or the batch was empty).
    Suppressed {
        /// Job of the batch, if named.
        job_id: Option<JobId>,
        /// Operations dropped.
        dropped: usize,
    },
    /// A bare paragraph/heading message was applied.
    Primitive,
    /// Unrecognized message.
    Ignored {
        /// Top-level keys, for logging.
        keys: Vec<String>,
    },
    /// The frame could not be parsed.
    Malformed {
        /// Parse error.
        reason: String,
    },
    /// The document serializer is gone.
    Unavailable,
}

/// Per-document session state shared by the adapters.
pub struct Session {
    dedup: DedupFilter,
    doc: SerializerHandle<DocumentMutator>,
    events_tx: broadcast::Sender<DocEvent>,
}

impl Session {
    /// Takes ownership of `host` and spawns its serializer.
    pub fn new(host: Box<dyn DocumentHost>, dedup: DedupFilter) -> Self {
        let (events_tx, _) = broadcast::channel::<DocEvent>(1024);
        let doc = spawn_serializer(DocumentMutator::new(host, events_tx.clone()));
        Self {
            dedup,
            doc,
            events_tx,
        }
    }

    /// Handle to the document serializer.
    pub fn document(&self) -> SerializerHandle<DocumentMutator> {
        self.doc.clone()
    }

    /// Subscribes to document events.
    pub fn subscribe(&self) -> broadcast::Receiver<DocEvent> {
        self.events_tx.subscribe()
    }

    /// Drops recent duplicates, keeping arrival order.
    pub fn filter_duplicates(&mut self, ops: Vec<Operation>) -> Vec<Operation> {
        ops.into_iter()
            .filter(|op| {
                let suppress = self.dedup.should_suppress(op);
                if suppress {
                    debug!(signature = %crate::core::dedup::signature(op), "dedup skip");
                }
                !suppress
            })
            .collect()
    }

    /// Plans `ops` and enqueues them as one serializer task.
    ///
    /// The whole batch is a single task so that no other batch can interleave
    /// with it.
    pub fn submit_batch(&self, ops: &[Operation]) -> Ticket<BatchReport, Infallible> {
        let plan = list::plan(ops.iter().cloned());
        self.doc.submit_with("batch", move |m| m.apply_batch(&plan))
    }

    /// Parses and handles one push frame.
    pub async fn dispatch(&mut self, raw: &str) -> Dispatch {
        let inbound = match Inbound::parse(raw) {
            Ok(inbound) => inbound,
            Err(err) => {
                warn!(error = %err, "dropping malformed push message");
                return Dispatch::Malformed {
                    reason: err.to_string(),
                };
            }
        };

        match inbound {
            Inbound::Hello { group } => {
                info!(group = group.as_deref().unwrap_or(""), "coordinator hello");
                Dispatch::Hello { group }
            }
            Inbound::Block(block) => self.apply_block(block).await,
            Inbound::Primitive(op) => match self
                .doc
                .submit_with("primitive", move |m| m.apply_primitive(&op))
                .wait()
                .await
            {
                Ok(_) => Dispatch::Primitive,
                Err(_) => Dispatch::Unavailable,
            },
            Inbound::Unknown { keys } => {
                warn!(?keys, "unknown push message");
                Dispatch::Ignored { keys }
            }
        }
    }

    async fn apply_block(&mut self, block: BlockMessage) -> Dispatch {
        let BlockMessage {
            job_id,
            trace_id,
            ops,
        } = block;

        let received = normalize_batch(&ops);
        let total = received.len();
        let ops = self.filter_duplicates(received);
        if ops.is_empty() {
            debug!(job_id = ?job_id, trace_id = ?trace_id, total, "nothing to apply after dedup");
            return Dispatch::Suppressed {
                job_id,
                dropped: total,
            };
        }

        debug!(job_id = ?job_id, trace_id = ?trace_id, ops = ops.len(), dropped = total - ops.len(), "applying pushed batch");
        let report = match self.submit_batch(&ops).wait().await {
            Ok(report) => report,
            Err(err) => {
                warn!(error = %err, "document serializer unavailable");
                return Dispatch::Unavailable;
            }
        };

        let ack = Ack::for_batch(job_id, trace_id, &ops, &report);
        info!(
            job_id = ?ack.job_id,
            applied_ops = ack.applied_ops,
            anchor_found = ack.anchor_found,
            selection_moved = ack.selection_moved,
            failed = report.failed,
            "batch applied"
        );
        Dispatch::Applied {
            ack,
            failed: report.failed,
        }
    }
}
