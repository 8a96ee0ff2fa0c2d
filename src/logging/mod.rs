//! Structured logging.

mod format;

pub use format::{ReportEvent, StructuredLogger};
