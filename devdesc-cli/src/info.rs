use anyhow::{Context, Result};
use std::path::Path;

use crate::Format;

pub fn run_info(input: &Path) -> Result<()> {
    let format = crate::detect_format(input).context("input file")?;
    let bytes = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;

    match format {
        Format::Eds => print_eds_info(input, &bytes),
        Format::Iodd => print_iodd_info(input, &bytes),
    }
}

fn print_eds_info(input: &Path, bytes: &[u8]) -> Result<()> {
    let outcome = devdesc_eds::parse_eds_bytes(bytes)
        .with_context(|| format!("parsing EDS from {}", input.display()))?;
    let device = &outcome.device;

    println!("File:        {}", input.display());
    println!("Format:      EDS");
    if let Some(name) = &device.device_info.prod_name {
        println!("Product:     {name}");
    }
    if let Some(vendor) = &device.device_info.vend_name {
        println!("Vendor:      {vendor}");
    }
    if let (Some(maj), Some(min)) = (device.device_info.maj_rev, device.device_info.min_rev) {
        println!("Revision:    {maj}.{min}");
    }
    println!("Params:      {}", device.params.len());
    println!("Assemblies:  {}", device.assemblies.len());
    println!("Connections: {}", device.connections.len());
    if !device.modules.is_empty() {
        println!("Modules:     {}", device.modules.len());
    }
    if !device.cip_objects.is_empty() {
        let names: Vec<&str> = device
            .cip_objects
            .iter()
            .map(|c| c.kind.section_name())
            .collect();
        println!("CIP objects: {}", names.join(", "));
    }
    println!("Diagnostics: {}", outcome.diagnostics.len());
    Ok(())
}

fn print_iodd_info(input: &Path, bytes: &[u8]) -> Result<()> {
    let text = std::str::from_utf8(bytes)
        .with_context(|| format!("{} is not valid UTF-8", input.display()))?;
    let outcome = devdesc_iodd::parse_iodd(text)
        .with_context(|| format!("parsing IODD from {}", input.display()))?;
    let device = &outcome.device;

    println!("File:        {}", input.display());
    println!("Format:      IODD {:?}", device.schema_version);
    if let Some(name) = &device.device.device_name {
        println!("Device:      {name}");
    }
    println!("Vendor:      {} ({})", device.vendor.vendor_name, device.vendor.vendor_id);
    println!("Device id:   {}", device.device.device_id);
    println!("Variables:   {}", device.variables.len());
    println!("Std refs:    {}", device.std_variable_refs.len());
    println!("Events:      {}", device.events.len());
    println!("Menus:       {}", device.menus.len());
    let languages: Vec<&str> = device.text_table.languages();
    println!(
        "Languages:   {} (primary {})",
        languages.join(", "),
        device.text_table.primary_language
    );
    println!("Diagnostics: {}", outcome.diagnostics.len());
    Ok(())
}
