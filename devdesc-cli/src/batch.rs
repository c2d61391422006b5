use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use devdesc_eds::read_eds_package_bytes;
use devdesc_model::DescriptionFormat;
use devdesc_pqa::{MemoryStore, MemoryTickets, QualityOrchestrator};

use crate::analyze::thresholds;

/// Analyze every description in a directory or EDS package archive. Files
/// are independent, so the batch fans out across the rayon pool.
pub fn run_batch(input: &Path, min_score: f64, max_data_loss: f64) -> Result<()> {
    use rayon::prelude::*;

    let jobs = collect_jobs(input)?;
    if jobs.is_empty() {
        bail!("no device descriptions found in {}", input.display());
    }

    let orchestrator = QualityOrchestrator::new(
        MemoryStore::new(),
        MemoryTickets::new(),
        thresholds(min_score, max_data_loss),
    );

    let results: Vec<(String, Result<f64>)> = jobs
        .par_iter()
        .map(|job| {
            let result = orchestrator
                .analyze(&job.device_id, job.format, &job.bytes)
                .map(|report| report.metrics.overall_score)
                .map_err(anyhow::Error::from);
            (job.name.clone(), result)
        })
        .collect();

    let mut failed = 0;
    let mut below_threshold = 0;
    for (name, result) in &results {
        match result {
            Ok(score) if *score < min_score => {
                below_threshold += 1;
                println!("BELOW THRESHOLD {name}: {score:.1}");
            }
            Ok(score) => println!("OK {name}: {score:.1}"),
            Err(e) => {
                failed += 1;
                eprintln!("FAILED {name}: {e:#}");
            }
        }
    }

    println!(
        "Batch complete: {} analyzed, {below_threshold} below threshold, {failed} failed",
        results.len()
    );
    if failed > 0 {
        bail!("{failed} of {} files failed to analyze", results.len());
    }
    Ok(())
}

struct BatchJob {
    name: String,
    device_id: String,
    format: DescriptionFormat,
    bytes: Vec<u8>,
}

fn collect_jobs(input: &Path) -> Result<Vec<BatchJob>> {
    if input.is_dir() {
        return collect_dir_jobs(input);
    }

    match input.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("zip") => collect_package_jobs(input),
        _ => bail!(
            "{} is neither a directory nor a .zip package",
            input.display()
        ),
    }
}

fn collect_dir_jobs(dir: &Path) -> Result<Vec<BatchJob>> {
    let mut jobs = Vec::new();
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    paths.sort();

    for path in paths {
        let Ok(format) = crate::detect_format(&path) else {
            continue;
        };
        let bytes =
            std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        jobs.push(BatchJob {
            name: path.display().to_string(),
            device_id: crate::device_id_for(&path, None),
            format: format.into(),
            bytes,
        });
    }
    Ok(jobs)
}

fn collect_package_jobs(package: &Path) -> Result<Vec<BatchJob>> {
    let file = std::fs::File::open(package)
        .with_context(|| format!("opening package {}", package.display()))?;
    let entries = read_eds_package_bytes(file)
        .with_context(|| format!("reading EDS package {}", package.display()))?;

    Ok(entries
        .into_iter()
        .map(|(name, bytes)| {
            let device_id = crate::device_id_for(Path::new(&name), None);
            BatchJob {
                name,
                device_id,
                format: DescriptionFormat::Eds,
                bytes,
            }
        })
        .collect())
}
