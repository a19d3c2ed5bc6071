//! Document event stream payloads.

use crate::types::{JobId, ParagraphId};

/// Events emitted while the serializer applies mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocEvent {
    /// A paragraph was inserted.
    ParagraphInserted {
        /// New paragraph id.
        id: ParagraphId,
    },
    /// A whole list was inserted.
    ListInserted {
        /// First item's paragraph id.
        first: ParagraphId,
        /// Number of items.
        items: usize,
    },
    /// An anchor search moved the insert target.
    AnchorResolved {
        /// Paragraph holding the anchor.
        id: ParagraphId,
    },
    /// An anchor search found nothing.
    AnchorMissed,
    /// A completion marker was written.
    MarkerWritten {
        /// Completed job.
        job_id: JobId,
    },
    /// The document was saved.
    Saved,
}
