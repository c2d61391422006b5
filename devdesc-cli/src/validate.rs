use anyhow::{bail, Context, Result};
use std::path::Path;

use devdesc_model::{
    validate_eds, validate_iodd, DiagnosticCollector, Severity, ValidationOptions,
};

use crate::Format;

pub fn run_validate(input: &Path, strict: bool, quiet: bool) -> Result<()> {
    let format = crate::detect_format(input).context("input file")?;
    let bytes = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let options = ValidationOptions { strict };

    let mut diagnostics = DiagnosticCollector::new();
    match format {
        Format::Eds => {
            let outcome = devdesc_eds::parse_eds_bytes(&bytes)
                .with_context(|| format!("parsing EDS from {}", input.display()))?;
            diagnostics.extend(outcome.diagnostics);
            validate_eds(&outcome.device, options, &mut diagnostics);
        }
        Format::Iodd => {
            let text = std::str::from_utf8(&bytes)
                .with_context(|| format!("{} is not valid UTF-8", input.display()))?;
            let outcome = devdesc_iodd::parse_iodd(text)
                .with_context(|| format!("parsing IODD from {}", input.display()))?;
            diagnostics.extend(outcome.diagnostics);
            validate_iodd(&outcome.device, options, &mut diagnostics);
        }
    }

    if diagnostics.is_empty() {
        println!("{}: valid", input.display());
        return Ok(());
    }

    if !quiet {
        for diagnostic in diagnostics.iter() {
            eprintln!("{}: {diagnostic}", input.display());
        }
    }

    let errors = diagnostics.count(Severity::Error) + diagnostics.count(Severity::Fatal);
    let warnings = diagnostics.count(Severity::Warning);
    println!(
        "{}: {errors} error{}, {warnings} warning{}",
        input.display(),
        if errors == 1 { "" } else { "s" },
        if warnings == 1 { "" } else { "s" }
    );

    if diagnostics.has_errors() {
        bail!("{errors} validation error{} in {}", if errors == 1 { "" } else { "s" }, input.display());
    }
    Ok(())
}
