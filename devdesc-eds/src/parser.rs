//! EDS parser: sectioned text -> normalized EdsDevice.
//!
//! Section and field problems become diagnostics, never errors; the one
//! hard failure is a document that cannot be sectioned at all.

use std::collections::BTreeMap;

use devdesc_model::*;
use thiserror::Error;

use crate::sections::{split_fields, trim_trailing_empty, EdsDocument, EdsSection, EdsSplitError};

#[derive(Debug, Error)]
pub enum EdsParseError {
    #[error("EDS sectioning failed: {0}")]
    Split(#[from] EdsSplitError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdsParseOutcome {
    pub device: EdsDevice,
    pub diagnostics: DiagnosticCollector,
}

/// Decode EDS bytes as UTF-8 with a Latin-1 fallback.
pub fn decode_eds_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            log::debug!("EDS input is not UTF-8, decoded {} bytes as Latin-1", bytes.len());
            bytes.iter().map(|&b| b as char).collect()
        }
    }
}

/// Parse EDS bytes, decoding UTF-8 with a Latin-1 fallback.
pub fn parse_eds_bytes(bytes: &[u8]) -> Result<EdsParseOutcome, EdsParseError> {
    parse_eds(&decode_eds_bytes(bytes))
}

/// Parse EDS text into a normalized device model plus its diagnostic trail.
pub fn parse_eds(text: &str) -> Result<EdsParseOutcome, EdsParseError> {
    let document = EdsDocument::parse(text)?;
    let mut device = EdsDevice::default();
    let mut diagnostics = DiagnosticCollector::new();

    for section in &document.sections {
        for entry in &section.entries {
            if entry.unterminated {
                diagnostics.warning(
                    "EDS-P001",
                    SourceLocation::line(&section.name, entry.line),
                    format!("entry '{}' has no terminating ';'", entry.key),
                );
            }
        }

        let name = section.name.as_str();
        if name.eq_ignore_ascii_case("File") {
            parse_file_section(section, &mut device.file_info);
        } else if name.eq_ignore_ascii_case("Device") {
            parse_device_section(section, &mut device.device_info, &mut diagnostics);
        } else if name.eq_ignore_ascii_case("Device Classification") {
            parse_classification_section(section, &mut device.classifications);
        } else if name.eq_ignore_ascii_case("Params") {
            parse_params_section(section, &mut device.params, &mut diagnostics);
        } else if name.eq_ignore_ascii_case("Assembly") {
            parse_assembly_section(section, &mut device.assemblies, &mut diagnostics);
        } else if name.eq_ignore_ascii_case("Connection Manager") {
            parse_connection_section(section, &mut device.connections);
        } else if name.eq_ignore_ascii_case("Port") {
            parse_port_section(section, &mut device.ports);
        } else if name.eq_ignore_ascii_case("Modules") {
            parse_modules_section(section, &mut device.modules);
        } else if name.eq_ignore_ascii_case("Groups") {
            parse_groups_section(section, &mut device.groups, &mut diagnostics);
        } else if name.eq_ignore_ascii_case("Capacity") {
            parse_capacity_section(section, &mut device.capacity, &mut diagnostics);
        } else if let Some(kind) = CipObjectKind::from_section_name(name) {
            device.cip_objects.push(CipObjectSection {
                kind,
                entries: section
                    .entries
                    .iter()
                    .map(|e| (e.key.clone(), e.value.clone()))
                    .collect(),
            });
        } else {
            diagnostics.info(
                "EDS-P002",
                SourceLocation::line(name, section.line),
                "unrecognized section retained raw",
            );
            device.raw_sections.push(RawSection {
                name: section.name.clone(),
                lines: section.raw_lines.clone(),
            });
        }
    }

    Ok(EdsParseOutcome {
        device,
        diagnostics,
    })
}

// --- File and Device ---

fn parse_file_section(section: &EdsSection, info: &mut EdsFileInfo) {
    info.desc_text = string_value(section, "DescText");
    info.create_date = string_value(section, "CreateDate");
    info.create_time = string_value(section, "CreateTime");
    info.mod_date = string_value(section, "ModDate");
    info.mod_time = string_value(section, "ModTime");
    info.revision = string_value(section, "Revision");
    info.home_url = string_value(section, "HomeURL");
}

fn parse_device_section(
    section: &EdsSection,
    info: &mut EdsDeviceInfo,
    diagnostics: &mut DiagnosticCollector,
) {
    info.vend_code = numeric_value(section, "VendCode", diagnostics);
    info.vend_name = string_value(section, "VendName");
    info.prod_type = numeric_value(section, "ProdType", diagnostics);
    info.prod_type_str = string_value(section, "ProdTypeStr");
    info.prod_code = numeric_value(section, "ProdCode", diagnostics);
    info.maj_rev = numeric_value(section, "MajRev", diagnostics);
    info.min_rev = numeric_value(section, "MinRev", diagnostics);
    info.prod_name = string_value(section, "ProdName");
    info.catalog = string_value(section, "Catalog");
    info.icon = string_value(section, "Icon");
}

fn parse_classification_section(section: &EdsSection, classes: &mut Vec<Vec<String>>) {
    for entry in &section.entries {
        if numeric_suffix(&entry.key, "Class").is_some() {
            let values = split_fields(&entry.value)
                .into_iter()
                .map(|f| f.value)
                .collect();
            classes.push(values);
        }
    }
}

// --- Params ---

fn parse_params_section(
    section: &EdsSection,
    params: &mut Vec<EdsParameter>,
    diagnostics: &mut DiagnosticCollector,
) {
    let mut enums: BTreeMap<u32, Vec<EdsEnumValue>> = BTreeMap::new();

    for entry in &section.entries {
        if let Some(number) = numeric_suffix(&entry.key, "Param") {
            let fields = trim_trailing_empty(split_fields(&entry.value));
            params.push(EdsParameter {
                number,
                fields,
                enums: Vec::new(),
            });
        } else if let Some(number) = numeric_suffix(&entry.key, "Enum") {
            enums.insert(number, parse_enum_values(&entry.value));
        } else {
            diagnostics.info(
                "EDS-P010",
                SourceLocation::line(&section.name, entry.line),
                format!("unrecognized Params entry '{}'", entry.key),
            );
        }
    }

    // Enum values link to parameters by numeric suffix: Enum22 <-> Param22.
    for (number, values) in enums {
        match params.iter_mut().find(|p| p.number == number) {
            Some(param) => param.enums = values,
            None => diagnostics.warning(
                "EDS-P011",
                SourceLocation::section(&section.name),
                format!("Enum{number} has no matching Param{number}"),
            ),
        }
    }
}

const DEFAULT_MARKER: &str = "(default)";

fn parse_enum_values(value: &str) -> Vec<EdsEnumValue> {
    let fields = split_fields(value);
    let mut out = Vec::new();

    // Fields alternate value,label pairs; a trailing lone value or comma is
    // tolerated and dropped.
    let mut it = fields.into_iter();
    while let (Some(v), Some(l)) = (it.next(), it.next()) {
        if v.is_empty() && l.is_empty() {
            continue;
        }
        let mut label = l.value;
        let mut is_default = false;
        if let Some(pos) = label.to_ascii_lowercase().rfind(DEFAULT_MARKER) {
            label.truncate(pos);
            let trimmed = label.trim_end().len();
            label.truncate(trimmed);
            is_default = true;
        }
        out.push(EdsEnumValue {
            value: v.value,
            label,
            is_default,
        });
    }
    out
}

// --- Assemblies ---

fn parse_assembly_section(
    section: &EdsSection,
    assemblies: &mut Vec<EdsAssembly>,
    diagnostics: &mut DiagnosticCollector,
) {
    for entry in &section.entries {
        // "AssemExa" must be checked before "Assem": the two grammars are
        // distinct and a unified pattern silently misparses both.
        if let Some(number) = numeric_suffix(&entry.key, "AssemExa") {
            assemblies.push(EdsAssembly::Variable(parse_variable_assembly(
                number,
                &entry.value,
            )));
        } else if let Some(number) = numeric_suffix(&entry.key, "Assem") {
            assemblies.push(EdsAssembly::Fixed(parse_fixed_assembly(number, &entry.value)));
        } else {
            diagnostics.info(
                "EDS-P020",
                SourceLocation::line(&section.name, entry.line),
                format!("unrecognized Assembly entry '{}'", entry.key),
            );
        }
    }
}

/// Fixed grammar: name, path, size, descriptor, reserved, reserved,
/// then (size, member-reference) pairs.
fn parse_fixed_assembly(number: u32, value: &str) -> FixedAssembly {
    let fields = trim_trailing_empty(split_fields(value));
    let mut assembly = FixedAssembly {
        number,
        name: opt_field(&fields, 0),
        path: opt_field(&fields, 1),
        size: opt_field(&fields, 2),
        descriptor: opt_field(&fields, 3),
        reserved: fields.get(4..6.min(fields.len())).unwrap_or(&[]).to_vec(),
        members: Vec::new(),
    };
    assembly.members = parse_member_pairs(&fields, 6);
    assembly
}

/// Variable ("Exa") grammar: name, path, descriptor, then member pairs.
fn parse_variable_assembly(number: u32, value: &str) -> VariableAssembly {
    let fields = trim_trailing_empty(split_fields(value));
    let mut assembly = VariableAssembly {
        number,
        name: opt_field(&fields, 0),
        path: opt_field(&fields, 1),
        descriptor: opt_field(&fields, 2),
        members: Vec::new(),
    };
    assembly.members = parse_member_pairs(&fields, 3);
    assembly
}

fn parse_member_pairs(fields: &[EdsField], start: usize) -> Vec<AssemblyMember> {
    let mut members = Vec::new();
    let mut i = start;
    while i < fields.len() {
        let bit_size = fields.get(i).filter(|f| !f.is_empty()).map(|f| f.value.clone());
        let reference = fields
            .get(i + 1)
            .filter(|f| !f.is_empty())
            .map(|f| f.value.clone());
        if bit_size.is_some() || reference.is_some() {
            members.push(AssemblyMember {
                bit_size,
                reference,
            });
        }
        i += 2;
    }
    members
}

// --- Connections, ports, modules, groups ---

fn parse_connection_section(section: &EdsSection, connections: &mut Vec<EdsConnection>) {
    for entry in &section.entries {
        if let Some(number) = numeric_suffix(&entry.key, "Connection") {
            connections.push(EdsConnection {
                number,
                fields: trim_trailing_empty(split_fields(&entry.value)),
            });
        }
    }
}

fn parse_port_section(section: &EdsSection, ports: &mut Vec<EdsPort>) {
    for entry in &section.entries {
        if let Some(number) = numeric_suffix(&entry.key, "Port") {
            let fields = trim_trailing_empty(split_fields(&entry.value));
            ports.push(EdsPort {
                number,
                port_type: opt_field(&fields, 0),
                name: opt_field(&fields, 1),
                object_path: opt_field(&fields, 2),
                port_number: opt_field(&fields, 3),
            });
        }
    }
}

fn parse_modules_section(section: &EdsSection, modules: &mut Vec<EdsModule>) {
    for entry in &section.entries {
        if let Some(number) = numeric_suffix(&entry.key, "Module") {
            // Module values embed commas inside quoted sub-strings; the
            // quote-aware splitter is mandatory here.
            modules.push(EdsModule {
                number,
                fields: trim_trailing_empty(split_fields(&entry.value)),
            });
        }
    }
}

fn parse_groups_section(
    section: &EdsSection,
    groups: &mut Vec<EdsGroup>,
    diagnostics: &mut DiagnosticCollector,
) {
    for entry in &section.entries {
        let Some(number) = numeric_suffix(&entry.key, "Group") else {
            continue;
        };
        let fields = trim_trailing_empty(split_fields(&entry.value));
        let name = opt_field(&fields, 0);
        let declared = fields.get(1).and_then(|f| parse_number(&f.value));
        let param_numbers: Vec<u32> = fields
            .iter()
            .skip(2)
            .filter_map(|f| parse_number(&f.value))
            .collect();
        if let Some(declared) = declared {
            if declared as usize != param_numbers.len() {
                diagnostics.warning(
                    "EDS-P030",
                    SourceLocation::line(&section.name, entry.line),
                    format!(
                        "Group{number} declares {declared} members but lists {}",
                        param_numbers.len()
                    ),
                );
            }
        }
        groups.push(EdsGroup {
            number,
            name,
            param_numbers,
        });
    }
}

// --- Capacity ---

fn parse_capacity_section(
    section: &EdsSection,
    capacity: &mut EdsCapacity,
    diagnostics: &mut DiagnosticCollector,
) {
    for entry in &section.entries {
        let key = entry.key.as_str();
        if let Some(number) = numeric_suffix(key, "TSpec") {
            let fields = trim_trailing_empty(split_fields(&entry.value));
            capacity.tspecs.push(TSpec {
                number,
                direction: opt_field(&fields, 0),
                connection_size: opt_field(&fields, 1),
                packet_rate: opt_field(&fields, 2),
            });
        } else if key.eq_ignore_ascii_case("MaxIOConnections") {
            capacity.max_io_connections = parse_number(&entry.value);
        } else if key.eq_ignore_ascii_case("MaxIOProducers") {
            capacity.max_io_producers = parse_number(&entry.value);
        } else if key.eq_ignore_ascii_case("MaxIOConsumers") {
            capacity.max_io_consumers = parse_number(&entry.value);
        } else if key.eq_ignore_ascii_case("MaxMsgConnections") {
            capacity.max_msg_connections = parse_number(&entry.value);
        } else if key.eq_ignore_ascii_case("MaxCIPConnections") {
            capacity.max_cip_connections = parse_number(&entry.value);
        } else {
            // Vendor dialect key. Retain it; a diagnostic, not an error.
            diagnostics.warning(
                "EDS-P040",
                SourceLocation::line(&section.name, entry.line),
                format!("unrecognized Capacity key '{key}' retained"),
            );
            capacity
                .unrecognized_fields
                .push((entry.key.clone(), entry.value.clone()));
        }
    }

    // Vendor reconciliation: some dialects only declare the combined count.
    if capacity.max_io_connections.is_some()
        && capacity.max_io_producers.is_none()
        && capacity.max_io_consumers.is_none()
    {
        capacity.max_io_producers = capacity.max_io_connections;
        capacity.max_io_consumers = capacity.max_io_connections;
        capacity.io_counts_backfilled = true;
    }
}

// --- Helpers ---

/// `Param22` with prefix `Param` -> `22`. The match is case-insensitive and
/// requires the whole remainder to be digits.
fn numeric_suffix(key: &str, prefix: &str) -> Option<u32> {
    if key.len() <= prefix.len() || !key[..prefix.len()].eq_ignore_ascii_case(prefix) {
        return None;
    }
    let rest = &key[prefix.len()..];
    if rest.bytes().all(|b| b.is_ascii_digit()) {
        rest.parse().ok()
    } else {
        None
    }
}

fn parse_number(value: &str) -> Option<u32> {
    let v = value.trim().trim_matches('"').trim();
    if let Some(hex) = v.strip_prefix("0x").or_else(|| v.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        v.parse().ok()
    }
}

fn string_value(section: &EdsSection, key: &str) -> Option<String> {
    section.value(key).map(unquote)
}

fn numeric_value(
    section: &EdsSection,
    key: &str,
    diagnostics: &mut DiagnosticCollector,
) -> Option<u32> {
    let entry = section.entry(key)?;
    let parsed = parse_number(&entry.value);
    if parsed.is_none() {
        diagnostics.warning(
            "EDS-P003",
            SourceLocation::line(&section.name, entry.line),
            format!("'{key}' is not numeric: '{}'", entry.value),
        );
    }
    parsed
}

fn unquote(value: &str) -> String {
    let v = value.trim();
    if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') {
        v[1..v.len() - 1].to_string()
    } else {
        v.to_string()
    }
}

fn opt_field(fields: &[EdsField], idx: usize) -> Option<String> {
    fields
        .get(idx)
        .filter(|f| !f.is_empty())
        .map(|f| f.value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_suffix_matching() {
        assert_eq!(numeric_suffix("Param22", "Param"), Some(22));
        assert_eq!(numeric_suffix("param7", "Param"), Some(7));
        assert_eq!(numeric_suffix("Param", "Param"), None);
        assert_eq!(numeric_suffix("ParamX", "Param"), None);
        assert_eq!(numeric_suffix("AssemExa12", "Assem"), None);
    }

    #[test]
    fn parse_number_accepts_hex() {
        assert_eq!(parse_number("0x10"), Some(16));
        assert_eq!(parse_number(" 42 "), Some(42));
        assert_eq!(parse_number("\"3\""), Some(3));
        assert_eq!(parse_number("n/a"), None);
    }

    #[test]
    fn enum_default_marker_is_stripped() {
        let values = parse_enum_values("0,\"Default configuration (default)\",");
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].value, "0");
        assert_eq!(values[0].label, "Default configuration");
        assert!(values[0].is_default);
    }

    #[test]
    fn enum_without_marker() {
        let values = parse_enum_values("0,\"Off\",1,\"On\"");
        assert_eq!(values.len(), 2);
        assert!(!values[0].is_default);
        assert_eq!(values[1].label, "On");
    }
}
