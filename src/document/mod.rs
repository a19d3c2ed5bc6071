//! The opaque document-editing surface.
//!
//! Everything the pipeline does to a document goes through [`DocumentHost`].
//! Implementations are plain synchronous objects; exclusivity comes from the
//! serializer that owns them, not from the host.

/// In-memory host with snapshot saves.
pub mod memory;

use crate::{
    persist::PersistError,
    types::{InsertLocation, ParagraphId, StyleRef},
};

pub use memory::{MemoryDocument, Paragraph};

/// Failures reported by a host.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The host does not know the requested style.
    #[error("unknown style: {0}")]
    UnknownStyle(String),
    /// A referenced paragraph does not exist.
    #[error("missing paragraph {0}")]
    MissingParagraph(ParagraphId),
    /// The host refused the mutation.
    #[error("host rejected mutation: {0}")]
    Rejected(String),
    /// Saving failed.
    #[error("save failed: {0}")]
    Persist(#[from] PersistError),
}

/// Result alias for host calls.
pub type HostResult<T> = Result<T, HostError>;

/// Mutation surface of one open document.
pub trait DocumentHost: Send {
    /// Identity used to scope pulled jobs to this document.
    fn url(&self) -> &str;

    /// Inserts a `Normal` paragraph and returns its id.
    ///
    /// A paragraph inserted after a list item continues that list.
    fn insert_paragraph(&mut self, text: &str, at: InsertLocation) -> HostResult<ParagraphId>;

    /// Applies a style to a paragraph.
    fn set_style(&mut self, id: ParagraphId, style: &StyleRef) -> HostResult<()>;

    /// Makes `id` the first item of a fresh list.
    fn start_new_list(&mut self, id: ParagraphId) -> HostResult<()>;

    /// Searches the body for a paragraph containing `needle`.
    fn find_paragraph(&self, needle: &str) -> Option<ParagraphId>;

    /// Whole-body text, one line per paragraph.
    fn body_text(&self) -> String;

    /// Commits the document.
    fn save(&mut self) -> HostResult<()>;

    /// Monotonic count of mutations applied so far.
    fn revision(&self) -> u64;
}
