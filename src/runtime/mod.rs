//! Single-writer async runtime and event stream APIs.

/// Event stream types emitted while mutating the document.
pub mod events;
/// FIFO serializer actor.
pub mod serializer;
