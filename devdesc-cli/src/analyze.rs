use anyhow::{bail, Context, Result};
use std::path::Path;

use devdesc_pqa::{
    AnalysisReport, AnalysisThresholds, DeviceStore, MemoryStore, MemoryTickets,
    QualityOrchestrator,
};
use serde_json::json;

pub fn thresholds(min_score: f64, max_data_loss: f64) -> AnalysisThresholds {
    AnalysisThresholds {
        min_overall_score: min_score,
        max_data_loss_pct: max_data_loss,
        auto_ticket_on_fail: true,
    }
}

pub fn run_analyze(
    input: &Path,
    device_id: Option<&str>,
    min_score: f64,
    max_data_loss: f64,
    json: bool,
) -> Result<()> {
    let format = crate::detect_format(input).context("input file")?;
    let bytes =
        std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let device_id = crate::device_id_for(input, device_id);

    let orchestrator = QualityOrchestrator::new(
        MemoryStore::new(),
        MemoryTickets::new(),
        thresholds(min_score, max_data_loss),
    );
    let report = orchestrator
        .analyze(&device_id, format.into(), &bytes)
        .with_context(|| format!("analyzing {}", input.display()))?;

    for diagnostic in report.parse_diagnostics.iter() {
        log::warn!("{diagnostic}");
    }

    if json {
        print_json(&orchestrator, &report)?;
    } else {
        print_summary(input, &report);
    }

    if report.ticket_created {
        bail!(
            "{}: fidelity below threshold (score {:.1} < {:.1})",
            input.display(),
            report.metrics.overall_score,
            min_score
        );
    }
    Ok(())
}

fn print_summary(input: &Path, report: &AnalysisReport) {
    let metrics = &report.metrics;
    println!("File:        {}", input.display());
    println!("Device:      {}", report.device_id);
    println!("Format:      {}", metrics.format.as_str());
    println!("Hash:        {}", report.content_hash);
    println!(
        "Score:       {:.1} (structural {:.1}, attribute {:.1}, value {:.1})",
        metrics.overall_score,
        metrics.structural_score,
        metrics.attribute_score,
        metrics.value_score
    );
    println!(
        "Data loss:   {:.2}%{}",
        metrics.data_loss_pct,
        if metrics.critical_data_loss { " (CRITICAL)" } else { "" }
    );
    println!("Findings:    {}", report.diff_item_count);
    for (component, score) in &metrics.component_scores {
        println!("  {component}: {score:.1}");
    }
}

fn print_json(
    orchestrator: &QualityOrchestrator<MemoryStore, MemoryTickets>,
    report: &AnalysisReport,
) -> Result<()> {
    let record = orchestrator
        .store()
        .load_analysis(&report.device_id)
        .context("loading analysis record")?
        .context("analysis record missing after run")?;

    let out = json!({
        "device_id": report.device_id,
        "content_hash": report.content_hash,
        "metrics": record.metrics,
        "diff_items": record.diff_items,
        "ticket_created": report.ticket_created,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
