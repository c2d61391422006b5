//! Shared shapes for round-trip fidelity analysis.
//!
//! Both diff analyzers (INI and XML) produce the same `QualityMetrics` and
//! `DiffItem` types so the orchestrator and storage port are format-agnostic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DescriptionFormat {
    Eds,
    Iodd,
}

impl DescriptionFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            DescriptionFormat::Eds => "EDS",
            DescriptionFormat::Iodd => "IODD",
        }
    }
}

/// Closed set of difference kinds. Adding a variant is a compile error at
/// every match site, which is the point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffKind {
    // INI
    MissingSection,
    ExtraSection,
    MissingKey,
    ExtraKey,
    ValueChanged,
    // XML
    MissingElement,
    ExtraElement,
    TagMismatch,
    MissingAttribute,
    IncorrectAttribute,
    ExtraAttribute,
    MissingText,
    IncorrectText,
}

impl DiffKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiffKind::MissingSection => "MISSING_SECTION",
            DiffKind::ExtraSection => "EXTRA_SECTION",
            DiffKind::MissingKey => "MISSING_KEY",
            DiffKind::ExtraKey => "EXTRA_KEY",
            DiffKind::ValueChanged => "VALUE_CHANGED",
            DiffKind::MissingElement => "MISSING_ELEMENT",
            DiffKind::ExtraElement => "EXTRA_ELEMENT",
            DiffKind::TagMismatch => "TAG_MISMATCH",
            DiffKind::MissingAttribute => "MISSING_ATTRIBUTE",
            DiffKind::IncorrectAttribute => "INCORRECT_ATTRIBUTE",
            DiffKind::ExtraAttribute => "EXTRA_ATTRIBUTE",
            DiffKind::MissingText => "MISSING_TEXT",
            DiffKind::IncorrectText => "INCORRECT_TEXT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiffSeverity {
    Info,
    Minor,
    Major,
    Critical,
}

/// One finding from a diff run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffItem {
    pub kind: DiffKind,
    pub severity: DiffSeverity,
    /// Section/key path (INI) or element path (XML).
    pub path: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub description: String,
    /// Coarse functional bucket, best-effort, reporting only.
    pub component: String,
}

/// Structural unit counts, original vs reconstructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StructureCounts {
    pub elements_original: u32,
    pub elements_reconstructed: u32,
    pub sections_original: u32,
    pub sections_reconstructed: u32,
    pub attributes_original: u32,
    pub attributes_reconstructed: u32,
    pub keys_original: u32,
    pub keys_reconstructed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub format: DescriptionFormat,
    pub overall_score: f64,
    /// Elements (XML) or sections (INI).
    pub structural_score: f64,
    /// Attributes (XML) or keys (INI).
    pub attribute_score: f64,
    pub value_score: f64,
    pub counts: StructureCounts,
    /// Missing structural units / total original units, as a percentage.
    pub data_loss_pct: f64,
    pub critical_data_loss: bool,
    /// Per functional component; BTreeMap keeps iteration deterministic.
    pub component_scores: BTreeMap<String, f64>,
}

/// `max(0, 100 * (1 - issues/total))`. An empty original scores 100.
pub fn sub_score(issue_count: u32, total_count: u32) -> f64 {
    if total_count == 0 {
        return 100.0;
    }
    let score = 100.0 * (1.0 - f64::from(issue_count) / f64::from(total_count));
    score.max(0.0)
}

/// XML weighting: structure 0.40, attributes 0.35, values 0.25.
pub fn xml_overall(structural: f64, attribute: f64, value: f64) -> f64 {
    structural * 0.40 + attribute * 0.35 + value * 0.25
}

/// INI weighting: sections 0.35, keys 0.35, values 0.30.
pub fn ini_overall(section: f64, key: f64, value: f64) -> f64 {
    section * 0.35 + key * 0.35 + value * 0.30
}

/// Data-loss percentage: missing units over total original units.
pub fn data_loss_pct(missing: u32, total_original: u32) -> f64 {
    if total_original == 0 {
        return 0.0;
    }
    f64::from(missing) / f64::from(total_original) * 100.0
}

impl QualityMetrics {
    /// Severity counts over a diff item list, for ticket summaries.
    pub fn severity_counts(items: &[DiffItem]) -> BTreeMap<DiffSeverity, u32> {
        let mut counts = BTreeMap::new();
        for item in items {
            *counts.entry(item.severity).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_score_formula() {
        assert_eq!(sub_score(0, 10), 100.0);
        assert_eq!(sub_score(1, 2), 50.0);
        assert_eq!(sub_score(5, 4), 0.0);
        assert_eq!(sub_score(0, 0), 100.0);
    }

    #[test]
    fn weighting_sums_to_one() {
        assert!((xml_overall(100.0, 100.0, 100.0) - 100.0).abs() < 1e-9);
        assert!((ini_overall(100.0, 100.0, 100.0) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn data_loss_half() {
        assert_eq!(data_loss_pct(1, 2), 50.0);
        assert_eq!(data_loss_pct(0, 0), 0.0);
    }

    #[test]
    fn severity_counts_buckets() {
        let items = vec![
            DiffItem {
                kind: DiffKind::MissingKey,
                severity: DiffSeverity::Major,
                path: "Params/Param1".into(),
                expected: None,
                actual: None,
                description: String::new(),
                component: "parameters".into(),
            },
            DiffItem {
                kind: DiffKind::ValueChanged,
                severity: DiffSeverity::Major,
                path: "Device/ProdName".into(),
                expected: Some("A".into()),
                actual: Some("B".into()),
                description: String::new(),
                component: "device identity".into(),
            },
        ];
        let counts = QualityMetrics::severity_counts(&items);
        assert_eq!(counts.get(&DiffSeverity::Major), Some(&2));
    }
}
