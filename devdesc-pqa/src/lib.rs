//! Persisted quality analysis: archive, reconstruct, diff, score, ticket.
//!
//! Storage and ticketing are ports; the in-memory implementations back the
//! CLI and the tests, and a database-backed store can slot in unchanged.

pub mod hash;
pub mod orchestrator;
pub mod ports;

pub use hash::content_hash;
pub use orchestrator::{
    AnalysisError, AnalysisReport, AnalysisState, AnalysisThresholds, QualityOrchestrator,
    MAX_DIFF_ITEMS,
};
pub use ports::{
    AnalysisRecord, DeviceModel, DeviceStore, MemoryStore, MemoryTickets, SourceArchive, Ticket,
    TicketPort,
};
