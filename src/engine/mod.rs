//! Document mutation and batch reporting.

/// Acknowledgment reporter.
pub mod ack;
/// Document mutator owned by the serializer.
pub mod mutator;
