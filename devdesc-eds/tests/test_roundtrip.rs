//! Round-trip tests: parse -> reconstruct -> diff against the original.
//!
//! The reconstruction is not byte-identical (whitespace and line wrapping
//! differ), but the INI diff must see no structural or value loss.

use devdesc_eds::{analyze_eds, parse_eds, write_eds};
use devdesc_model::DiffKind;

fn minimal() -> &'static str {
    include_str!("../../test-fixtures/eds/minimal.eds")
}

#[test]
fn test_roundtrip_parses_again() {
    let outcome = parse_eds(minimal()).unwrap();
    let regenerated = write_eds(&outcome.device);
    let reparsed = parse_eds(&regenerated).expect("reconstruction must be parseable");
    assert_eq!(reparsed.device, outcome.device);
}

#[test]
fn test_roundtrip_loses_no_sections_or_keys() {
    let outcome = parse_eds(minimal()).unwrap();
    let regenerated = write_eds(&outcome.device);
    let (metrics, items) = analyze_eds(minimal(), &regenerated);

    let lost: Vec<_> = items
        .iter()
        .filter(|i| {
            matches!(
                i.kind,
                DiffKind::MissingSection | DiffKind::MissingKey | DiffKind::ValueChanged
            )
        })
        .collect();
    assert!(lost.is_empty(), "round trip lost data: {lost:#?}");
    assert!(!metrics.critical_data_loss);
    assert_eq!(metrics.data_loss_pct, 0.0);
}

#[test]
fn test_roundtrip_score_is_high() {
    let outcome = parse_eds(minimal()).unwrap();
    let regenerated = write_eds(&outcome.device);
    let (metrics, _) = analyze_eds(minimal(), &regenerated);
    assert!(
        metrics.overall_score >= 99.0,
        "expected near-lossless reconstruction, got {}",
        metrics.overall_score
    );
}

#[test]
fn test_backfilled_capacity_does_not_leak_into_reconstruction() {
    let outcome = parse_eds(minimal()).unwrap();
    let regenerated = write_eds(&outcome.device);
    assert!(!regenerated.contains("MaxIOProducers"));
    assert!(!regenerated.contains("MaxIOConsumers"));
    // Re-parsing backfills again, so the model round-trips regardless.
    let reparsed = parse_eds(&regenerated).unwrap();
    assert_eq!(reparsed.device.capacity.max_io_producers, Some(4));
}

#[test]
fn test_simulated_section_loss_scores_half() {
    let original = "[Device]\nVendCode = 1;\n\n[Params]\nParam1 = 0;\n";
    let reconstructed = "[Device]\nVendCode = 1;\n";
    let (metrics, _) = analyze_eds(original, reconstructed);
    assert_eq!(metrics.counts.sections_original, 2);
    assert_eq!(metrics.structural_score, 50.0);
}
