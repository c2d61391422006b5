//! EDS reconstructor: normalized EdsDevice -> EDS text.
//!
//! Walks the model only, never the original text. Unset trailing positions
//! are omitted; missing optional data never fails, it just emits less.

use std::fmt::Write as _;

use devdesc_model::*;

/// Regenerate EDS text from the normalized model.
pub fn write_eds(device: &EdsDevice) -> String {
    let mut out = String::new();

    write_file_section(&mut out, &device.file_info);
    write_device_section(&mut out, &device.device_info);
    write_classification_section(&mut out, &device.classifications);
    write_params_section(&mut out, &device.params);
    write_assembly_section(&mut out, &device.assemblies);
    write_connection_section(&mut out, &device.connections);
    write_port_section(&mut out, &device.ports);
    write_modules_section(&mut out, &device.modules);
    write_groups_section(&mut out, &device.groups);
    write_capacity_section(&mut out, &device.capacity);
    for cip in &device.cip_objects {
        write_cip_section(&mut out, cip);
    }
    for raw in &device.raw_sections {
        write_raw_section(&mut out, raw);
    }

    out
}

fn section_header(out: &mut String, name: &str) {
    if !out.is_empty() {
        out.push('\n');
    }
    let _ = writeln!(out, "[{name}]");
}

fn write_entry(out: &mut String, key: &str, value: &str) {
    let _ = writeln!(out, "{key} = {value};");
}

fn write_opt_quoted(out: &mut String, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        let _ = writeln!(out, "{key} = \"{v}\";");
    }
}

fn write_opt_bare(out: &mut String, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        write_entry(out, key, v);
    }
}

fn write_opt_num(out: &mut String, key: &str, value: Option<u32>) {
    if let Some(v) = value {
        let _ = writeln!(out, "{key} = {v};");
    }
}

fn render_field(field: &EdsField) -> String {
    if field.quoted {
        format!("\"{}\"", field.value)
    } else {
        field.value.clone()
    }
}

fn render_fields(fields: &[EdsField]) -> String {
    fields.iter().map(render_field).collect::<Vec<_>>().join(",")
}

// --- Sections ---

fn write_file_section(out: &mut String, info: &EdsFileInfo) {
    section_header(out, "File");
    write_opt_quoted(out, "DescText", &info.desc_text);
    write_opt_bare(out, "CreateDate", &info.create_date);
    write_opt_bare(out, "CreateTime", &info.create_time);
    write_opt_bare(out, "ModDate", &info.mod_date);
    write_opt_bare(out, "ModTime", &info.mod_time);
    write_opt_bare(out, "Revision", &info.revision);
    write_opt_quoted(out, "HomeURL", &info.home_url);
}

fn write_device_section(out: &mut String, info: &EdsDeviceInfo) {
    section_header(out, "Device");
    write_opt_num(out, "VendCode", info.vend_code);
    write_opt_quoted(out, "VendName", &info.vend_name);
    write_opt_num(out, "ProdType", info.prod_type);
    write_opt_quoted(out, "ProdTypeStr", &info.prod_type_str);
    write_opt_num(out, "ProdCode", info.prod_code);
    write_opt_num(out, "MajRev", info.maj_rev);
    write_opt_num(out, "MinRev", info.min_rev);
    write_opt_quoted(out, "ProdName", &info.prod_name);
    write_opt_quoted(out, "Catalog", &info.catalog);
    write_opt_quoted(out, "Icon", &info.icon);
}

fn write_classification_section(out: &mut String, classes: &[Vec<String>]) {
    if classes.is_empty() {
        return;
    }
    section_header(out, "Device Classification");
    for (i, values) in classes.iter().enumerate() {
        write_entry(out, &format!("Class{}", i + 1), &values.join(","));
    }
}

fn write_params_section(out: &mut String, params: &[EdsParameter]) {
    if params.is_empty() {
        return;
    }
    section_header(out, "Params");
    for param in params {
        write_entry(out, &format!("Param{}", param.number), &render_fields(&param.fields));
        if !param.enums.is_empty() {
            let rendered: Vec<String> = param
                .enums
                .iter()
                .flat_map(|e| {
                    let label = if e.is_default {
                        format!("\"{} (default)\"", e.label)
                    } else {
                        format!("\"{}\"", e.label)
                    };
                    [e.value.clone(), label]
                })
                .collect();
            write_entry(out, &format!("Enum{}", param.number), &rendered.join(","));
        }
    }
}

fn write_assembly_section(out: &mut String, assemblies: &[EdsAssembly]) {
    if assemblies.is_empty() {
        return;
    }
    section_header(out, "Assembly");
    for assembly in assemblies {
        match assembly {
            EdsAssembly::Fixed(a) => {
                let mut fields = vec![
                    opt_quoted_field(&a.name),
                    opt_bare_field(&a.path),
                    opt_bare_field(&a.size),
                    opt_bare_field(&a.descriptor),
                ];
                fields.extend(a.reserved.iter().cloned());
                // Pad the reserved block so members always start at the
                // same position the parser read them from.
                while fields.len() < 6 && !a.members.is_empty() {
                    fields.push(EdsField::default());
                }
                push_member_fields(&mut fields, &a.members);
                let fields = crate::sections::trim_trailing_empty(fields);
                write_entry(out, &format!("Assem{}", a.number), &render_fields(&fields));
            }
            EdsAssembly::Variable(a) => {
                let mut fields = vec![
                    opt_quoted_field(&a.name),
                    opt_bare_field(&a.path),
                    opt_bare_field(&a.descriptor),
                ];
                push_member_fields(&mut fields, &a.members);
                let fields = crate::sections::trim_trailing_empty(fields);
                write_entry(out, &format!("AssemExa{}", a.number), &render_fields(&fields));
            }
        }
    }
}

fn push_member_fields(fields: &mut Vec<EdsField>, members: &[AssemblyMember]) {
    for member in members {
        fields.push(opt_bare_field(&member.bit_size));
        fields.push(opt_bare_field(&member.reference));
    }
}

fn write_connection_section(out: &mut String, connections: &[EdsConnection]) {
    if connections.is_empty() {
        return;
    }
    section_header(out, "Connection Manager");
    for conn in connections {
        write_entry(
            out,
            &format!("Connection{}", conn.number),
            &render_fields(&conn.fields),
        );
    }
}

fn write_port_section(out: &mut String, ports: &[EdsPort]) {
    if ports.is_empty() {
        return;
    }
    section_header(out, "Port");
    for port in ports {
        let fields = crate::sections::trim_trailing_empty(vec![
            opt_bare_field(&port.port_type),
            opt_quoted_field(&port.name),
            opt_quoted_field(&port.object_path),
            opt_bare_field(&port.port_number),
        ]);
        write_entry(out, &format!("Port{}", port.number), &render_fields(&fields));
    }
}

fn write_modules_section(out: &mut String, modules: &[EdsModule]) {
    if modules.is_empty() {
        return;
    }
    section_header(out, "Modules");
    for module in modules {
        write_entry(
            out,
            &format!("Module{}", module.number),
            &render_fields(&module.fields),
        );
    }
}

fn write_groups_section(out: &mut String, groups: &[EdsGroup]) {
    if groups.is_empty() {
        return;
    }
    section_header(out, "Groups");
    for group in groups {
        let mut fields = vec![
            opt_quoted_field(&group.name),
            EdsField::bare(group.param_numbers.len().to_string()),
        ];
        for n in &group.param_numbers {
            fields.push(EdsField::bare(n.to_string()));
        }
        write_entry(out, &format!("Group{}", group.number), &render_fields(&fields));
    }
}

fn write_capacity_section(out: &mut String, capacity: &EdsCapacity) {
    let empty = capacity.max_io_connections.is_none()
        && capacity.max_io_producers.is_none()
        && capacity.max_io_consumers.is_none()
        && capacity.max_msg_connections.is_none()
        && capacity.max_cip_connections.is_none()
        && capacity.tspecs.is_empty()
        && capacity.unrecognized_fields.is_empty();
    if empty {
        return;
    }

    section_header(out, "Capacity");
    write_opt_num(out, "MaxIOConnections", capacity.max_io_connections);
    write_opt_num(out, "MaxMsgConnections", capacity.max_msg_connections);
    if !capacity.io_counts_backfilled {
        write_opt_num(out, "MaxIOProducers", capacity.max_io_producers);
        write_opt_num(out, "MaxIOConsumers", capacity.max_io_consumers);
    }
    write_opt_num(out, "MaxCIPConnections", capacity.max_cip_connections);
    for tspec in &capacity.tspecs {
        let fields = crate::sections::trim_trailing_empty(vec![
            opt_bare_field(&tspec.direction),
            opt_bare_field(&tspec.connection_size),
            opt_bare_field(&tspec.packet_rate),
        ]);
        write_entry(out, &format!("TSpec{}", tspec.number), &render_fields(&fields));
    }
    for (key, value) in &capacity.unrecognized_fields {
        write_entry(out, key, value);
    }
}

fn write_cip_section(out: &mut String, cip: &CipObjectSection) {
    section_header(out, cip.kind.section_name());
    for (key, value) in &cip.entries {
        write_entry(out, key, value);
    }
}

fn write_raw_section(out: &mut String, raw: &RawSection) {
    section_header(out, &raw.name);
    for line in &raw.lines {
        out.push_str(line);
        out.push('\n');
    }
}

fn opt_bare_field(value: &Option<String>) -> EdsField {
    value.as_ref().map_or_else(EdsField::default, EdsField::bare)
}

fn opt_quoted_field(value: &Option<String>) -> EdsField {
    value.as_ref().map_or_else(EdsField::default, EdsField::quoted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_device_emits_file_and_device_headers() {
        let text = write_eds(&EdsDevice::default());
        assert!(text.contains("[File]"));
        assert!(text.contains("[Device]"));
        assert!(!text.contains("[Params]"));
    }

    #[test]
    fn backfilled_io_counts_are_not_emitted() {
        let mut device = EdsDevice::default();
        device.capacity.max_io_connections = Some(4);
        device.capacity.max_io_producers = Some(4);
        device.capacity.max_io_consumers = Some(4);
        device.capacity.io_counts_backfilled = true;
        let text = write_eds(&device);
        assert!(text.contains("MaxIOConnections = 4;"));
        assert!(!text.contains("MaxIOProducers"));
        assert!(!text.contains("MaxIOConsumers"));
    }

    #[test]
    fn explicit_io_counts_survive() {
        let mut device = EdsDevice::default();
        device.capacity.max_io_producers = Some(2);
        device.capacity.max_io_consumers = Some(3);
        let text = write_eds(&device);
        assert!(text.contains("MaxIOProducers = 2;"));
        assert!(text.contains("MaxIOConsumers = 3;"));
    }

    #[test]
    fn enum_default_marker_is_regenerated() {
        let mut device = EdsDevice::default();
        device.params.push(EdsParameter {
            number: 1,
            fields: vec![EdsField::bare("0")],
            enums: vec![
                EdsEnumValue {
                    value: "0".into(),
                    label: "Off".into(),
                    is_default: true,
                },
                EdsEnumValue {
                    value: "1".into(),
                    label: "On".into(),
                    is_default: false,
                },
            ],
        });
        let text = write_eds(&device);
        assert!(text.contains("Enum1 = 0,\"Off (default)\",1,\"On\";"));
    }
}
