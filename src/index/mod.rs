//! Lazily built item indexes and native id reconciliation.
//!
//! Every list adapter owns a [`LazyIndex`] over an [`IndexTable`]. The table
//! maps dense ordinals to whatever the adapter needs to re-read an item and
//! ids back to ordinals. It is built on first access, published once, and
//! read without locking afterwards.

mod diagnostics;
mod lazy;
pub mod native_id;
mod table;

pub use diagnostics::{DiagnosticSink, Diagnostics, LogSink, RecordingSink};
pub use lazy::LazyIndex;
pub use table::{IndexEntry, IndexTable};
