//! XML diff: original vs reconstructed IODD text -> metrics + findings.
//!
//! Recursive walk matching children by tag name and position among same-tag
//! siblings. A tag mismatch is reported once and halts that subtree; no
//! re-alignment is attempted.

use std::collections::BTreeMap;

use devdesc_model::*;

use crate::xml_tree::{read_tree, XmlElement, XmlReadError};

/// Elements whose attribute loss breaks the device description outright.
const CRITICAL_ELEMENTS: &[&str] = &[
    "DeviceIdentity",
    "ProcessData",
    "Datatype",
    "Variable",
    "VendorText",
    "DeviceName",
];

#[derive(Default)]
struct Tally {
    missing_elements: u32,
    extra_elements: u32,
    tag_mismatches: u32,
    attribute_issues: u32,
    text_issues: u32,
}

/// Compare original and reconstructed IODD text. Malformed XML on either
/// side is the one hard error.
pub fn analyze_iodd(
    original: &str,
    reconstructed: &str,
) -> Result<(QualityMetrics, Vec<DiffItem>), XmlReadError> {
    let orig = read_tree(original)?;
    let recon = read_tree(reconstructed)?;

    let mut items = Vec::new();
    let mut tally = Tally::default();
    diff_element(&orig, &recon, &orig.name, &mut items, &mut tally);

    let counts = StructureCounts {
        elements_original: orig.element_count(),
        elements_reconstructed: recon.element_count(),
        attributes_original: orig.attribute_count(),
        attributes_reconstructed: recon.attribute_count(),
        ..Default::default()
    };

    let structural_issues = tally.missing_elements + tally.extra_elements + tally.tag_mismatches;
    let structural_score = sub_score(structural_issues, counts.elements_original);
    let attribute_score = sub_score(tally.attribute_issues, counts.attributes_original);
    let value_score = sub_score(tally.text_issues, counts.elements_original);

    let metrics = QualityMetrics {
        format: DescriptionFormat::Iodd,
        overall_score: xml_overall(structural_score, attribute_score, value_score),
        structural_score,
        attribute_score,
        value_score,
        data_loss_pct: data_loss_pct(tally.missing_elements, counts.elements_original),
        critical_data_loss: items.iter().any(|i| i.severity == DiffSeverity::Critical),
        component_scores: component_scores(&items),
        counts,
    };

    Ok((metrics, items))
}

fn diff_element(
    orig: &XmlElement,
    recon: &XmlElement,
    path: &str,
    items: &mut Vec<DiffItem>,
    tally: &mut Tally,
) {
    if orig.name != recon.name {
        tally.tag_mismatches += 1;
        items.push(item(
            DiffKind::TagMismatch,
            DiffSeverity::Critical,
            path,
            Some(orig.name.clone()),
            Some(recon.name.clone()),
            format!("expected <{}>, found <{}>", orig.name, recon.name),
        ));
        // No re-alignment: the subtrees are incomparable from here.
        return;
    }

    diff_attributes(orig, recon, path, items, tally);
    diff_text(orig, recon, path, items, tally);

    // Pair children by tag name and position among same-tag siblings.
    let orig_groups = group_children(orig);
    let recon_groups = group_children(recon);

    for (name, orig_children) in &orig_groups {
        let empty = Vec::new();
        let recon_children = recon_groups.get(name).unwrap_or(&empty);
        for (i, orig_child) in orig_children.iter().enumerate() {
            let child_path = child_path(path, name, i, orig_children.len());
            match recon_children.get(i) {
                Some(recon_child) => {
                    diff_element(orig_child, recon_child, &child_path, items, tally);
                }
                None => {
                    tally.missing_elements += orig_child.element_count();
                    items.push(item(
                        DiffKind::MissingElement,
                        element_severity(name),
                        &child_path,
                        Some(format!("<{name}>")),
                        None,
                        format!("element <{name}> missing from reconstruction"),
                    ));
                }
            }
        }
        for _ in orig_children.len()..recon_children.len() {
            tally.extra_elements += 1;
            items.push(item(
                DiffKind::ExtraElement,
                DiffSeverity::Minor,
                path,
                None,
                Some(format!("<{name}>")),
                format!("extra <{name}> element in reconstruction"),
            ));
        }
    }

    for (name, recon_children) in &recon_groups {
        if !orig_groups.contains_key(name) {
            tally.extra_elements += recon_children.len() as u32;
            items.push(item(
                DiffKind::ExtraElement,
                DiffSeverity::Minor,
                path,
                None,
                Some(format!("<{name}>")),
                format!("element <{name}> not present in original"),
            ));
        }
    }
}

fn diff_attributes(
    orig: &XmlElement,
    recon: &XmlElement,
    path: &str,
    items: &mut Vec<DiffItem>,
    tally: &mut Tally,
) {
    let severity = attribute_severity(&orig.name);

    for (name, orig_value) in &orig.attributes {
        let attr_path = format!("{path}@{name}");
        match recon.attr(name) {
            None => {
                tally.attribute_issues += 1;
                items.push(item(
                    DiffKind::MissingAttribute,
                    severity,
                    &attr_path,
                    Some(orig_value.clone()),
                    None,
                    format!("attribute '{name}' missing from reconstruction"),
                ));
            }
            Some(recon_value) if recon_value != orig_value => {
                tally.attribute_issues += 1;
                items.push(item(
                    DiffKind::IncorrectAttribute,
                    severity,
                    &attr_path,
                    Some(orig_value.clone()),
                    Some(recon_value.to_string()),
                    format!("attribute '{name}' value changed"),
                ));
            }
            Some(_) => {}
        }
    }

    for (name, recon_value) in &recon.attributes {
        if orig.attr(name).is_none() {
            tally.attribute_issues += 1;
            items.push(item(
                DiffKind::ExtraAttribute,
                DiffSeverity::Minor,
                &format!("{path}@{name}"),
                None,
                Some(recon_value.clone()),
                format!("attribute '{name}' not present in original"),
            ));
        }
    }
}

fn diff_text(
    orig: &XmlElement,
    recon: &XmlElement,
    path: &str,
    items: &mut Vec<DiffItem>,
    tally: &mut Tally,
) {
    match (&orig.text, &recon.text) {
        (Some(orig_text), None) => {
            tally.text_issues += 1;
            items.push(item(
                DiffKind::MissingText,
                DiffSeverity::Major,
                path,
                Some(orig_text.clone()),
                None,
                "text content missing from reconstruction".into(),
            ));
        }
        (Some(orig_text), Some(recon_text)) if orig_text != recon_text => {
            tally.text_issues += 1;
            items.push(item(
                DiffKind::IncorrectText,
                DiffSeverity::Major,
                path,
                Some(orig_text.clone()),
                Some(recon_text.clone()),
                "text content changed".into(),
            ));
        }
        _ => {}
    }
}

fn group_children(element: &XmlElement) -> BTreeMap<&str, Vec<&XmlElement>> {
    let mut groups: BTreeMap<&str, Vec<&XmlElement>> = BTreeMap::new();
    for child in &element.children {
        groups.entry(child.name.as_str()).or_default().push(child);
    }
    groups
}

fn child_path(parent: &str, name: &str, index: usize, total: usize) -> String {
    if total > 1 {
        format!("{parent}/{name}[{index}]")
    } else {
        format!("{parent}/{name}")
    }
}

fn element_severity(name: &str) -> DiffSeverity {
    if CRITICAL_ELEMENTS.contains(&name) {
        DiffSeverity::Critical
    } else {
        DiffSeverity::Major
    }
}

fn attribute_severity(element_name: &str) -> DiffSeverity {
    if CRITICAL_ELEMENTS.contains(&element_name) {
        DiffSeverity::Critical
    } else {
        DiffSeverity::Major
    }
}

fn item(
    kind: DiffKind,
    severity: DiffSeverity,
    path: &str,
    expected: Option<String>,
    actual: Option<String>,
    description: String,
) -> DiffItem {
    DiffItem {
        kind,
        severity,
        component: component_for(path),
        path: path.to_string(),
        expected,
        actual,
        description,
    }
}

/// Coarse functional bucket by substring match on the element path.
/// Best-effort, used for reporting only, never for scoring.
fn component_for(path: &str) -> String {
    let lower = path.to_ascii_lowercase();
    let bucket = if lower.contains("menu") {
        "menus"
    } else if lower.contains("userinterface") || lower.contains("button") {
        "UI rendering"
    } else if lower.contains("datatype") {
        "datatypes"
    } else if lower.contains("processdata") {
        "process data"
    } else if lower.contains("variable") {
        "variables"
    } else if lower.contains("identity") || lower.contains("devicename") || lower.contains("vendor") {
        "device identity"
    } else if lower.contains("text") {
        "texts"
    } else if lower.contains("event") || lower.contains("errortype") {
        "events"
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

    const ORIGINAL: &str = r#"<IODevice xmlns="urn:x">
        <ProfileBody>
            <DeviceIdentity vendorId="1" vendorName="Acme" deviceId="2">
                <DeviceName textId="TI_DN"/>
            </DeviceIdentity>
        </ProfileBody>
    </IODevice>"#;

    #[test]
    fn identical_documents_score_100() {
        let (metrics, items) = analyze_iodd(ORIGINAL, ORIGINAL).unwrap();
        assert!(items.is_empty(), "{items:?}");
        assert_eq!(metrics.overall_score, 100.0);
        assert!(!metrics.critical_data_loss);
    }

    #[test]
    fn root_tag_mismatch_reports_once_and_stops() {
        let other = ORIGINAL.replace("IODevice", "SomethingElse");
        let (metrics, items) = analyze_iodd(ORIGINAL, &other).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, DiffKind::TagMismatch);
        assert_eq!(items[0].severity, DiffSeverity::Critical);
        assert!(metrics.critical_data_loss);
    }

    #[test]
    fn missing_attribute_on_critical_element_is_critical() {
        let missing = ORIGINAL.replace(r#" vendorName="Acme""#, "");
        let (metrics, items) = analyze_iodd(ORIGINAL, &missing).unwrap();
        let item = items
            .iter()
            .find(|i| i.kind == DiffKind::MissingAttribute)
            .expect("expected MISSING_ATTRIBUTE");
        assert_eq!(item.severity, DiffSeverity::Critical);
        assert!(item.path.ends_with("@vendorName"));
        assert!(metrics.critical_data_loss);
    }

    #[test]
    fn missing_element_counts_toward_data_loss() {
        let missing = ORIGINAL.replace(r#"<DeviceName textId="TI_DN"/>"#, "");
        let (metrics, items) = analyze_iodd(ORIGINAL, &missing).unwrap();
        assert!(items.iter().any(|i| i.kind == DiffKind::MissingElement));
        assert!(metrics.data_loss_pct > 0.0);
        assert!(metrics.structural_score < 100.0);
    }

    #[test]
    fn attribute_value_change_is_flagged() {
        let changed = ORIGINAL.replace(r#"deviceId="2""#, r#"deviceId="3""#);
        let (_, items) = analyze_iodd(ORIGINAL, &changed).unwrap();
        let item = items
            .iter()
            .find(|i| i.kind == DiffKind::IncorrectAttribute)
            .expect("expected INCORRECT_ATTRIBUTE");
        assert_eq!(item.expected.as_deref(), Some("2"));
        assert_eq!(item.actual.as_deref(), Some("3"));
    }

    #[test]
    fn same_tag_siblings_pair_by_position() {
        let orig = r#"<A><B v="1"/><B v="2"/></A>"#;
        let recon = r#"<A><B v="1"/><B v="9"/></A>"#;
        let (_, items) = analyze_iodd(orig, recon).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, DiffKind::IncorrectAttribute);
        assert_eq!(items[0].path, "A/B[1]@v");
    }

    #[test]
    fn component_bucketing_by_path() {
        assert_eq!(component_for("IODevice/ProfileBody/DeviceIdentity"), "device identity");
        assert_eq!(component_for("IODevice/.../MenuCollection/Menu"), "menus");
        assert_eq!(component_for("IODevice/.../Datatype"), "datatypes");
        assert_eq!(component_for("IODevice/CommNetworkProfile"), "general");
    }

    #[test]
    fn malformed_reconstruction_is_an_error() {
        assert!(analyze_iodd(ORIGINAL, "<broken").is_err());
    }
}
