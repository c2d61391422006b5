//! Storage and ticketing ports, plus in-memory implementations.
//!
//! The orchestrator is a pure function of its inputs and these two ports;
//! swapping the backing store never changes analysis semantics.

use std::collections::BTreeMap;
use std::sync::Mutex;

use devdesc_model::{DescriptionFormat, DiffItem, EdsDevice, IoddDevice, QualityMetrics};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Normalized model of either format, as persisted by the storage port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeviceModel {
    Eds(EdsDevice),
    Iodd(IoddDevice),
}

impl DeviceModel {
    pub fn format(&self) -> DescriptionFormat {
        match self {
            DeviceModel::Eds(_) => DescriptionFormat::Eds,
            DeviceModel::Iodd(_) => DescriptionFormat::Iodd,
        }
    }
}

/// Raw source bytes plus the parsed model, keyed by device id. The content
/// hash over the raw bytes is the re-import dedup key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceArchive {
    pub device_id: String,
    pub content_hash: String,
    pub source: Vec<u8>,
    pub model: DeviceModel,
}

/// One completed analysis: metrics plus a bounded diff item list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub device_id: String,
    pub content_hash: String,
    pub metrics: QualityMetrics,
    pub diff_items: Vec<DiffItem>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(String),
    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("ticket backend failure: {0}")]
    Backend(String),
}

/// Persistence port for archives and analysis results. Each device id holds
/// at most one archive and one analysis record; writes replace.
pub trait DeviceStore: Send + Sync {
    fn save_archive(&self, archive: SourceArchive) -> Result<(), StoreError>;
    fn load_archive(&self, device_id: &str) -> Result<Option<SourceArchive>, StoreError>;
    fn replace_analysis(&self, record: AnalysisRecord) -> Result<(), StoreError>;
    fn load_analysis(&self, device_id: &str) -> Result<Option<AnalysisRecord>, StoreError>;
    /// Delete the archive and analysis for a device. Missing rows are fine.
    fn delete_device(&self, device_id: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub device_id: String,
    pub title: String,
    pub body: String,
}

/// Ticketing port. Creation failures are reported but never fail an
/// analysis run; the metrics are already persisted by then.
pub trait TicketPort: Send + Sync {
    fn create(&self, ticket: Ticket) -> Result<(), TicketError>;
    /// Close all open tickets for a device, returning how many were closed.
    fn close_for_device(&self, device_id: &str) -> Result<u32, TicketError>;
}

// --- In-memory implementations ---

/// In-memory store for tests and single-process runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    archives: Mutex<BTreeMap<String, SourceArchive>>,
    analyses: Mutex<BTreeMap<String, AnalysisRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analysis_count(&self) -> usize {
        self.analyses.lock().expect("store poisoned").len()
    }
}

impl DeviceStore for MemoryStore {
    fn save_archive(&self, archive: SourceArchive) -> Result<(), StoreError> {
        self.archives
            .lock()
            .expect("store poisoned")
            .insert(archive.device_id.clone(), archive);
        Ok(())
    }

    fn load_archive(&self, device_id: &str) -> Result<Option<SourceArchive>, StoreError> {
        Ok(self.archives.lock().expect("store poisoned").get(device_id).cloned())
    }

    fn replace_analysis(&self, record: AnalysisRecord) -> Result<(), StoreError> {
        self.analyses
            .lock()
            .expect("store poisoned")
            .insert(record.device_id.clone(), record);
        Ok(())
    }

    fn load_analysis(&self, device_id: &str) -> Result<Option<AnalysisRecord>, StoreError> {
        Ok(self.analyses.lock().expect("store poisoned").get(device_id).cloned())
    }

    fn delete_device(&self, device_id: &str) -> Result<(), StoreError> {
        self.archives.lock().expect("store poisoned").remove(device_id);
        self.analyses.lock().expect("store poisoned").remove(device_id);
        Ok(())
    }
}

/// In-memory ticket sink for tests and single-process runs.
#[derive(Debug, Default)]
pub struct MemoryTickets {
    open: Mutex<Vec<Ticket>>,
}

impl MemoryTickets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_for_device(&self, device_id: &str) -> Vec<Ticket> {
        self.open
            .lock()
            .expect("tickets poisoned")
            .iter()
            .filter(|t| t.device_id == device_id)
            .cloned()
            .collect()
    }
}

impl TicketPort for MemoryTickets {
    fn create(&self, ticket: Ticket) -> Result<(), TicketError> {
        self.open.lock().expect("tickets poisoned").push(ticket);
        Ok(())
    }

    fn close_for_device(&self, device_id: &str) -> Result<u32, TicketError> {
        let mut open = self.open.lock().expect("tickets poisoned");
        let before = open.len();
        open.retain(|t| t.device_id != device_id);
        Ok((before - open.len()) as u32)
    }
}
