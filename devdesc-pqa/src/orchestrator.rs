//! Round-trip quality orchestrator.
//!
//! One analysis run per device id: archive the source, reconstruct from the
//! normalized model, diff against the original, persist metrics, and raise
//! a ticket when the score falls below the supplied thresholds. Retention is
//! latest-only: every run deletes whatever the previous run left behind.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use devdesc_eds::{analyze_eds, decode_eds_bytes, parse_eds_bytes, write_eds, EdsParseError};
use devdesc_iodd::{analyze_iodd, parse_iodd, write_iodd, IoddParseError, XmlReadError, XmlWriteError};
use devdesc_model::{DescriptionFormat, DiagnosticCollector, DiffItem, QualityMetrics};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hash::content_hash;
use crate::ports::{AnalysisRecord, DeviceModel, DeviceStore, SourceArchive, Ticket, TicketPort};

/// Bound on persisted diff items per analysis; the highest-severity findings
/// are kept when a diff exceeds it.
pub const MAX_DIFF_ITEMS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Pass/fail criteria supplied by the caller, not baked into the engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AnalysisThresholds {
    pub min_overall_score: f64,
    pub max_data_loss_pct: f64,
    pub auto_ticket_on_fail: bool,
}

impl Default for AnalysisThresholds {
    fn default() -> Self {
        AnalysisThresholds {
            min_overall_score: 90.0,
            max_data_loss_pct: 5.0,
            auto_ticket_on_fail: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("EDS parse failed: {0}")]
    EdsParse(#[from] EdsParseError),
    #[error("IODD parse failed: {0}")]
    IoddParse(#[from] IoddParseError),
    #[error("IODD reconstruction failed: {0}")]
    Reconstruct(#[from] XmlWriteError),
    #[error("diff failed: {0}")]
    Diff(#[from] XmlReadError),
    #[error("source is not valid UTF-8 for an IODD document")]
    IoddEncoding,
    #[error(transparent)]
    Store(#[from] crate::ports::StoreError),
}

/// Outcome of one orchestrator run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub state: AnalysisState,
    pub device_id: String,
    pub content_hash: String,
    pub metrics: QualityMetrics,
    pub diff_item_count: usize,
    pub ticket_created: bool,
    pub parse_diagnostics: DiagnosticCollector,
}

pub struct QualityOrchestrator<S, T> {
    store: S,
    tickets: T,
    thresholds: AnalysisThresholds,
    // Concurrent re-analysis of the same device id must serialize; different
    // ids share nothing and run freely.
    device_locks: Mutex<BTreeMap<String, Arc<Mutex<()>>>>,
}

impl<S: DeviceStore, T: TicketPort> QualityOrchestrator<S, T> {
    pub fn new(store: S, tickets: T, thresholds: AnalysisThresholds) -> Self {
        QualityOrchestrator {
            store,
            tickets,
            thresholds,
            device_locks: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tickets(&self) -> &T {
        &self.tickets
    }

    /// Run one full analysis for a device. Idempotent for the same bytes and
    /// thresholds, so at-least-once redelivery is safe to retry.
    pub fn analyze(
        &self,
        device_id: &str,
        format: DescriptionFormat,
        source: &[u8],
    ) -> Result<AnalysisReport, AnalysisError> {
        let device_lock = self.lock_for(device_id);
        let _guard = device_lock.lock().expect("device lock poisoned");

        log::info!("analysis {device_id}: {:?} -> Running", AnalysisState::Pending);
        match self.run_locked(device_id, format, source) {
            Ok(report) => {
                log::info!(
                    "analysis {device_id}: Completed, score {:.1}, {} findings",
                    report.metrics.overall_score,
                    report.diff_item_count
                );
                Ok(report)
            }
            Err(err) => {
                log::error!("analysis {device_id}: Failed: {err}");
                Err(err)
            }
        }
    }

    fn run_locked(
        &self,
        device_id: &str,
        format: DescriptionFormat,
        source: &[u8],
    ) -> Result<AnalysisReport, AnalysisError> {
        // Latest-only retention: clear prior archive, metrics, and tickets.
        self.store.delete_device(device_id)?;
        if let Err(err) = self.tickets.close_for_device(device_id) {
            log::warn!("analysis {device_id}: could not close stale tickets: {err}");
        }

        let hash = content_hash(source);
        let (model, original, reconstructed, parse_diagnostics) = round_trip(format, source)?;

        self.store.save_archive(SourceArchive {
            device_id: device_id.to_string(),
            content_hash: hash.clone(),
            source: source.to_vec(),
            model,
        })?;

        let (metrics, items) = match format {
            DescriptionFormat::Eds => analyze_eds(&original, &reconstructed),
            DescriptionFormat::Iodd => analyze_iodd(&original, &reconstructed)?,
        };
        let kept = bound_items(items);

        // Metrics persistence is the one fatal step: a run without a stored
        // result never happened as far as retention is concerned.
        self.store.replace_analysis(AnalysisRecord {
            device_id: device_id.to_string(),
            content_hash: hash.clone(),
            metrics: metrics.clone(),
            diff_items: kept.clone(),
        })?;

        let ticket_created = self.maybe_ticket(device_id, &metrics, &kept);

        Ok(AnalysisReport {
            state: AnalysisState::Completed,
            device_id: device_id.to_string(),
            content_hash: hash,
            metrics,
            diff_item_count: kept.len(),
            ticket_created,
            parse_diagnostics,
        })
    }

    fn maybe_ticket(&self, device_id: &str, metrics: &QualityMetrics, items: &[DiffItem]) -> bool {
        let below = metrics.overall_score < self.thresholds.min_overall_score
            || metrics.data_loss_pct > self.thresholds.max_data_loss_pct
            || metrics.critical_data_loss;
        if !below || !self.thresholds.auto_ticket_on_fail {
            return false;
        }

        let ticket = Ticket {
            device_id: device_id.to_string(),
            title: format!(
                "Round-trip fidelity below threshold ({:.1} < {:.1})",
                metrics.overall_score, self.thresholds.min_overall_score
            ),
            body: ticket_body(metrics, items),
        };
        match self.tickets.create(ticket) {
            Ok(()) => true,
            Err(err) => {
                // Ticket failure is reported, never fatal: the metrics row
                // is already persisted.
                log::warn!("analysis {device_id}: ticket creation failed: {err}");
                false
            }
        }
    }

    fn lock_for(&self, device_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.device_locks.lock().expect("lock table poisoned");
        locks.entry(device_id.to_string()).or_default().clone()
    }
}

type RoundTrip = (DeviceModel, String, String, DiagnosticCollector);

/// Parse, then reconstruct purely from the model.
fn round_trip(format: DescriptionFormat, source: &[u8]) -> Result<RoundTrip, AnalysisError> {
    match format {
        DescriptionFormat::Eds => {
            let original = decode_eds_bytes(source);
            let outcome = parse_eds_bytes(source)?;
            let reconstructed = write_eds(&outcome.device);
            Ok((
                DeviceModel::Eds(outcome.device),
                original,
                reconstructed,
                outcome.diagnostics,
            ))
        }
        DescriptionFormat::Iodd => {
            let original = std::str::from_utf8(source)
                .map_err(|_| AnalysisError::IoddEncoding)?
                .to_string();
            let outcome = parse_iodd(&original)?;
            let reconstructed = write_iodd(&outcome.device)?;
            Ok((
                DeviceModel::Iodd(outcome.device),
                original,
                reconstructed,
                outcome.diagnostics,
            ))
        }
    }
}

/// Keep the highest-severity findings when the diff exceeds the bound.
/// Within a severity the original diff order is preserved.
fn bound_items(mut items: Vec<DiffItem>) -> Vec<DiffItem> {
    if items.len() > MAX_DIFF_ITEMS {
        items.sort_by(|a, b| b.severity.cmp(&a.severity));
        items.truncate(MAX_DIFF_ITEMS);
    }
    items
}

fn ticket_body(metrics: &QualityMetrics, items: &[DiffItem]) -> String {
    use std::fmt::Write as _;

    let mut body = String::new();
    let _ = writeln!(
        body,
        "Format: {}\nOverall: {:.1} (structural {:.1}, attribute {:.1}, value {:.1})",
        metrics.format.as_str(),
        metrics.overall_score,
        metrics.structural_score,
        metrics.attribute_score,
        metrics.value_score
    );
    let _ = writeln!(
        body,
        "Data loss: {:.2}%{}",
        metrics.data_loss_pct,
        if metrics.critical_data_loss { " (critical)" } else { "" }
    );
    for (severity, count) in QualityMetrics::severity_counts(items) {
        let _ = writeln!(body, "{severity:?}: {count}");
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use devdesc_model::{DiffKind, DiffSeverity};

    fn item(severity: DiffSeverity) -> DiffItem {
        DiffItem {
            kind: DiffKind::ValueChanged,
            severity,
            path: "Device/ProdName".into(),
            expected: None,
            actual: None,
            description: String::new(),
            component: "device identity".into(),
        }
    }

    #[test]
    fn bounding_keeps_highest_severity() {
        let mut items = vec![item(DiffSeverity::Minor); MAX_DIFF_ITEMS];
        items.push(item(DiffSeverity::Critical));
        let kept = bound_items(items);
        assert_eq!(kept.len(), MAX_DIFF_ITEMS);
        assert_eq!(kept[0].severity, DiffSeverity::Critical);
    }

    #[test]
    fn bounding_leaves_small_diffs_untouched() {
        let items = vec![item(DiffSeverity::Critical), item(DiffSeverity::Minor)];
        let kept = bound_items(items.clone());
        assert_eq!(kept, items);
    }
}
