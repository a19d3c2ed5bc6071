//! Transport-agnostic pipeline stages.

/// Time-windowed duplicate suppression.
pub mod dedup;
/// List run accumulation.
pub mod list;
/// Idempotency marker bookkeeping.
pub mod marker;
