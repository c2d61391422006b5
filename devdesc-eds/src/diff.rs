//! INI diff: original vs reconstructed EDS text -> metrics + findings.
//!
//! Both texts are reduced to section -> key -> value maps; sections and keys
//! are compared as sets, values after whitespace normalization so pure
//! re-formatting never counts as loss.

use std::collections::BTreeMap;

use devdesc_model::*;

use crate::sections::EdsDocument;

/// Sections whose loss means the reconstruction is structurally broken.
const CRITICAL_SECTIONS: &[&str] = &["Device", "Params", "Assembly"];

type SectionMap = BTreeMap<String, BTreeMap<String, String>>;

/// Compare original and reconstructed EDS text.
pub fn analyze_eds(original: &str, reconstructed: &str) -> (QualityMetrics, Vec<DiffItem>) {
    let orig = to_map(original);
    let recon = to_map(reconstructed);
    let mut items = Vec::new();

    let mut missing_sections = 0u32;
    let mut extra_sections = 0u32;
    let mut missing_keys = 0u32;
    let mut extra_keys = 0u32;
    let mut value_changes = 0u32;

    for (section, orig_keys) in &orig {
        match recon.get(section) {
            None => {
                missing_sections += 1;
                missing_keys += orig_keys.len() as u32;
                items.push(section_item(
                    DiffKind::MissingSection,
                    section,
                    section_severity(section),
                    format!("section [{section}] missing from reconstruction"),
                ));
            }
            Some(recon_keys) => {
                diff_keys(
                    section,
                    orig_keys,
                    recon_keys,
                    &mut items,
                    &mut missing_keys,
                    &mut extra_keys,
                    &mut value_changes,
                );
            }
        }
    }

    for section in recon.keys() {
        if !orig.contains_key(section) {
            extra_sections += 1;
            items.push(section_item(
                DiffKind::ExtraSection,
                section,
                DiffSeverity::Minor,
                format!("section [{section}] not present in original"),
            ));
        }
    }

    let counts = StructureCounts {
        sections_original: orig.len() as u32,
        sections_reconstructed: recon.len() as u32,
        keys_original: orig.values().map(|k| k.len() as u32).sum(),
        keys_reconstructed: recon.values().map(|k| k.len() as u32).sum(),
        ..Default::default()
    };

    let section_score = sub_score(missing_sections + extra_sections, counts.sections_original);
    let key_score = sub_score(missing_keys + extra_keys, counts.keys_original);
    let value_score = sub_score(value_changes, counts.keys_original);

    let metrics = QualityMetrics {
        format: DescriptionFormat::Eds,
        overall_score: ini_overall(section_score, key_score, value_score),
        structural_score: section_score,
        attribute_score: key_score,
        value_score,
        data_loss_pct: data_loss_pct(
            missing_sections + missing_keys,
            counts.sections_original + counts.keys_original,
        ),
        critical_data_loss: items.iter().any(|i| i.severity == DiffSeverity::Critical),
        component_scores: component_scores(&items),
        counts,
    };

    (metrics, items)
}

fn diff_keys(
    section: &str,
    orig_keys: &BTreeMap<String, String>,
    recon_keys: &BTreeMap<String, String>,
    items: &mut Vec<DiffItem>,
    missing_keys: &mut u32,
    extra_keys: &mut u32,
    value_changes: &mut u32,
) {
    for (key, orig_value) in orig_keys {
        let path = format!("{section}/{key}");
        match recon_keys.get(key) {
            None => {
                *missing_keys += 1;
                items.push(DiffItem {
                    kind: DiffKind::MissingKey,
                    severity: DiffSeverity::Major,
                    component: component_for(&path),
                    path,
                    expected: Some(orig_value.clone()),
                    actual: None,
                    description: format!("key '{key}' missing from reconstruction"),
                });
            }
            Some(recon_value) => {
                if normalize_ws(orig_value) != normalize_ws(recon_value) {
                    *value_changes += 1;
                    items.push(DiffItem {
                        kind: DiffKind::ValueChanged,
                        severity: DiffSeverity::Major,
                        component: component_for(&path),
                        path,
                        expected: Some(orig_value.clone()),
                        actual: Some(recon_value.clone()),
                        description: format!("value of '{key}' changed"),
                    });
                }
            }
        }
    }

    for key in recon_keys.keys() {
        if !orig_keys.contains_key(key) {
            *extra_keys += 1;
            let path = format!("{section}/{key}");
            items.push(DiffItem {
                kind: DiffKind::ExtraKey,
                severity: DiffSeverity::Minor,
                component: component_for(&path),
                path,
                expected: None,
                actual: recon_keys.get(key).cloned(),
                description: format!("key '{key}' not present in original"),
            });
        }
    }
}

/// Unsectionable text contributes an empty map; every original unit then
/// counts as missing, which is the honest answer.
fn to_map(text: &str) -> SectionMap {
    let Ok(document) = EdsDocument::parse(text) else {
        return SectionMap::new();
    };
    let mut map = SectionMap::new();
    for section in document.sections {
        let keys = map.entry(section.name).or_default();
        for entry in section.entries {
            keys.insert(entry.key, entry.value);
        }
    }
    map
}

/// Collapse whitespace runs and drop spacing around commas; field spacing
/// is formatting, not content.
fn normalize_ws(value: &str) -> String {
    value
        .split(',')
        .map(|part| part.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join(",")
}

fn section_severity(section: &str) -> DiffSeverity {
    if CRITICAL_SECTIONS
        .iter()
        .any(|c| c.eq_ignore_ascii_case(section))
    {
        DiffSeverity::Critical
    } else {
        DiffSeverity::Major
    }
}

fn section_item(kind: DiffKind, section: &str, severity: DiffSeverity, description: String) -> DiffItem {
    DiffItem {
        kind,
        severity,
        component: component_for(section),
        path: section.to_string(),
        expected: None,
        actual: None,
        description,
    }
}

/// Coarse functional bucket by substring match on the path. Best-effort,
/// used for reporting only, never for scoring.
fn component_for(path: &str) -> String {
    let lower = path.to_ascii_lowercase();
    let bucket = if lower.contains("device") {
        "device identity"
    } else if lower.contains("enum") || lower.contains("param") || lower.contains("group") {
        "parameters"
    } else if lower.contains("assem") {
        "assemblies"
    } else if lower.contains("connection") {
        "connections"
    } else if lower.contains("module") || lower.contains("port") {
        "modules"
    } else if lower.contains("capacity") || lower.contains("tspec") {
        "capacity"
    } else if lower.contains("file") {
        "file metadata"
    } else {
        "general"
    };
    bucket.to_string()
}

fn component_scores(items: &[DiffItem]) -> BTreeMap<String, f64> {
    let mut per_component: BTreeMap<String, u32> = BTreeMap::new();
    for item in items {
        *per_component.entry(item.component.clone()).or_insert(0) += 1;
    }
    per_component
        .into_iter()
        .map(|(component, issues)| (component, (100.0 - 10.0 * f64::from(issues)).max(0.0)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGINAL: &str = "[Device]\nVendCode = 1;\nProdName = \"Widget\";\n\n[Params]\nParam1 = 0,,,0x0000;\n";

    #[test]
    fn identical_text_scores_100() {
        let (metrics, items) = analyze_eds(ORIGINAL, ORIGINAL);
        assert!(items.is_empty());
        assert_eq!(metrics.overall_score, 100.0);
        assert_eq!(metrics.data_loss_pct, 0.0);
        assert!(!metrics.critical_data_loss);
    }

    #[test]
    fn whitespace_only_differences_are_not_value_changes() {
        let reformatted = "[Device]\nVendCode = 1;\nProdName = \"Widget\";\n\n[Params]\nParam1 = 0,  ,  , 0x0000;\n";
        let (_, items) = analyze_eds(ORIGINAL, reformatted);
        assert!(
            !items.iter().any(|i| i.kind == DiffKind::ValueChanged),
            "whitespace reformat flagged: {items:?}"
        );
    }

    #[test]
    fn missing_section_scores_50() {
        let original = "[Device]\nVendCode = 1;\n\n[Params]\nParam1 = 0;\n";
        let reconstructed = "[Device]\nVendCode = 1;\n";
        let (metrics, items) = analyze_eds(original, reconstructed);
        assert_eq!(metrics.counts.sections_original, 2);
        assert_eq!(metrics.structural_score, 50.0);
        assert!(items.iter().any(|i| i.kind == DiffKind::MissingSection));
        // Params is on the critical list.
        assert!(metrics.critical_data_loss);
    }

    #[test]
    fn changed_value_is_flagged() {
        let changed = ORIGINAL.replace("\"Widget\"", "\"Gadget\"");
        let (metrics, items) = analyze_eds(ORIGINAL, &changed);
        let item = items
            .iter()
            .find(|i| i.kind == DiffKind::ValueChanged)
            .expect("expected a VALUE_CHANGED item");
        assert_eq!(item.path, "Device/ProdName");
        assert_eq!(item.component, "device identity");
        assert!(metrics.value_score < 100.0);
    }

    #[test]
    fn deterministic_metrics() {
        let reconstructed = "[Device]\nVendCode = 2;\n";
        let first = analyze_eds(ORIGINAL, reconstructed);
        let second = analyze_eds(ORIGINAL, reconstructed);
        assert_eq!(first, second);
    }
}
