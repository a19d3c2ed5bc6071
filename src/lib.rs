//! Serialized application of remote document-edit batches.
//!
//! A coordinator delivers batches of operations either over a push socket or
//! through a claim/complete job queue. Each batch is normalized, deduplicated,
//! planned into list-aware mutations and applied to the document by a single
//! FIFO serializer, so no two batches ever interleave.
//!
//! # Examples
//!
//! Applying a batch through a [`transport::session::Session`]:
//! ```
//! use docops::{
//!     core::dedup::DedupFilter,
//!     document::MemoryDocument,
//!     transport::session::{Dispatch, Session},
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mut session = Session::new(Box::new(MemoryDocument::new("doc")), DedupFilter::default());
//! let raw = r#"{"type":"addin.block","jobId":"j1","blocks":[
//!     {"op":"paragraph.insert","text":"hello"},
//!     {"op":"list.start"},{"op":"list.item","text":"a"},{"op":"list.end"}]}"#;
//! match session.dispatch(raw).await {
//!     Dispatch::Applied { ack, .. } => assert_eq!(ack.applied_ops, 2),
//!     other => panic!("unexpected {other:?}"),
//! }
//! # }
//! ```
//!
//! Durable document with a SQLite sink:
//! ```no_run
//! use docops::{document::MemoryDocument, persist::sqlite::SqliteDocumentSink};
//!
//! let sink = SqliteDocumentSink::open("doc.db").expect("open sqlite");
//! let doc = MemoryDocument::open("https://host/doc.docx", Box::new(sink)).expect("load");
//! println!("{} paragraphs", doc.paragraphs().len());
//! ```
#![deny(missing_docs)]

/// Agent configuration.
pub mod config;
/// Dedup, list planning and completion markers.
pub mod core;
/// Document host surface and the in-memory document.
pub mod document;
/// Document mutator and acknowledgments.
pub mod engine;
/// Canonical operation model and payload normalization.
pub mod op;
/// Snapshot persistence.
pub mod persist;
/// Serializer actor and document events.
pub mod runtime;
/// Push and pull adapters.
pub mod transport;
/// Shared primitive types.
pub mod types;
