use devdesc_iodd::parse_iodd;
use devdesc_model::*;
use pretty_assertions::assert_eq;

const FIXTURE: &str = include_str!("../../test-fixtures/iodd/minimal.xml");

fn parse_fixture() -> IoddDevice {
    let outcome = parse_iodd(FIXTURE).expect("fixture should parse");
    assert!(!outcome.diagnostics.has_errors(), "{:?}", outcome.diagnostics);
    outcome.device
}

#[test]
fn identity_and_document_info() {
    let device = parse_fixture();
    assert_eq!(device.schema_version, IoddSchemaVersion::V1_1);
    assert_eq!(device.document.version.as_deref(), Some("V1.1"));
    assert_eq!(device.vendor.vendor_id, 812);
    assert_eq!(device.vendor.vendor_name, "Exatron Automation");
    assert_eq!(device.device.device_id, 4210);
    assert_eq!(device.device.device_name.as_deref(), Some("ProSense 2000"));
    assert_eq!(device.device.product_variants.len(), 1);
    assert_eq!(device.device.product_variants[0].product_id, "EX-PS-2000");
}

#[test]
fn features_are_tri_state() {
    let device = parse_fixture();
    assert_eq!(device.features.block_parameter, TriState::True);
    assert_eq!(device.features.data_storage, TriState::False);
}

#[test]
fn variables_keep_text_ids_and_tri_states() {
    let device = parse_fixture();
    assert_eq!(device.variables.len(), 2);

    let mode = &device.variables[0];
    assert_eq!(mode.id, "V_OperatingMode");
    assert_eq!(mode.index, 64);
    assert_eq!(mode.access_rights, Some(AccessRights::ReadWrite));
    assert_eq!(mode.dynamic, TriState::False);
    assert_eq!(mode.excluded_from_data_storage, TriState::Absent);
    assert_eq!(mode.name_text_id.as_deref(), Some("TI_OperatingMode"));
    assert_eq!(mode.default_value.as_deref(), Some("0"));
}

#[test]
fn record_variable_keeps_nested_datatype_refs() {
    let device = parse_fixture();
    let switch_points = &device.variables[1];
    let IoddDatatype::Record(record) = &switch_points.datatype else {
        panic!("expected RecordT for V_SwitchPoints");
    };
    assert_eq!(record.bit_length, Some(32));
    assert_eq!(record.subindex_access_supported, TriState::True);
    assert_eq!(record.items.len(), 2);
    assert_eq!(record.items[0].subindex, 1);
    assert_eq!(record.items[0].bit_offset, 16);
    assert_eq!(
        *record.items[0].datatype,
        IoddDatatype::Reference { datatype_id: "DT_Threshold".into() }
    );
}

#[test]
fn custom_datatype_collection() {
    let device = parse_fixture();
    assert_eq!(device.custom_datatypes.len(), 1);
    let IoddDatatype::Simple(simple) = &device.custom_datatypes[0].datatype else {
        panic!("expected simple datatype");
    };
    assert_eq!(simple.kind, SimpleKind::UIntegerT);
    assert_eq!(simple.value_ranges.len(), 1);
    assert_eq!(simple.value_ranges[0].upper_value, "4000");
}

#[test]
fn std_refs_in_document_order_with_synthetic_indices() {
    let device = parse_fixture();
    let ids: Vec<&str> = device.std_variable_refs.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "V_VendorName",
            "V_ProductName",
            "V_SerialNumber",
            "V_ApplicationSpecificTag",
            "V_SystemCommand"
        ]
    );
    assert!(device.std_variable_refs.iter().all(|r| r.synthetic_index >= 9000));
    assert_eq!(device.std_variable_refs[3].fixed_length_restriction, Some(32));
    assert_eq!(device.std_variable_refs[4].children.len(), 1);
}

#[test]
fn process_data_record_tree() {
    let device = parse_fixture();
    assert_eq!(device.process_data.len(), 1);
    let input = device.process_data[0].input.as_ref().expect("input payload");
    assert_eq!(input.direction, ProcessDataDirection::In);
    assert_eq!(input.bit_length, 16);
    let IoddDatatype::Record(record) = &input.datatype else {
        panic!("expected RecordT process data");
    };
    assert_eq!(record.items.len(), 2);
    assert_eq!(record.items[1].subindex, 2);
    assert!(device.process_data[0].output.is_none());
}

#[test]
fn events_preserve_interleaving() {
    let device = parse_fixture();
    assert_eq!(device.events.len(), 3);
    assert_eq!(device.events[0].kind, EventKind::StdRef { code: 16912 });
    let EventKind::Custom(custom) = &device.events[1].kind else {
        panic!("expected custom event in the middle");
    };
    assert_eq!(custom.code, 6144);
    assert_eq!(custom.event_type, EventType::Warning);
    assert_eq!(custom.mode, Some(EventMode::AppearDisappear));
    assert_eq!(device.events[2].kind, EventKind::StdRef { code: 20753 });
}

#[test]
fn menus_and_role_sets() {
    let device = parse_fixture();
    assert_eq!(device.menus.len(), 2);
    let parameter = &device.menus[1];
    assert_eq!(parameter.items.len(), 3);
    assert!(matches!(
        parameter.items[1].kind,
        MenuItemKind::RecordItemRef { subindex: 1, .. }
    ));
    assert!(matches!(parameter.items[2].kind, MenuItemKind::MenuRef { .. }));

    assert_eq!(device.role_menus.len(), 2);
    assert_eq!(device.role_menus[0].role, MenuRole::Observer);
    assert_eq!(
        device.role_menus[1].parameter_menu_id.as_deref(),
        Some("M_Parameter")
    );
}

#[test]
fn communication_profile() {
    let device = parse_fixture();
    assert_eq!(device.comm_profile.iolink_revision, "1.1");
    assert_eq!(device.comm_profile.transport_rate.as_deref(), Some("COM2"));
    assert_eq!(device.comm_profile.min_cycle_time, Some(2300));
    assert_eq!(device.comm_profile.sio_supported, TriState::True);
}

#[test]
fn text_table_languages_and_duplicates() {
    let device = parse_fixture();
    assert_eq!(device.text_table.primary_language, "en");
    assert_eq!(device.text_table.languages(), vec!["de", "en"]);
    // TI_DeviceName and TI_Variant1Name both resolve to "ProSense 2000";
    // the earlier one wins reverse lookup.
    assert_eq!(device.text_table.reverse_lookup("ProSense 2000"), Some("TI_DeviceName"));
    assert_eq!(
        device.text_table.resolve_in("TI_OperatingMode", "de"),
        Some("Betriebsart")
    );
}

#[test]
fn validation_passes_on_fixture() {
    let device = parse_fixture();
    let mut diags = DiagnosticCollector::new();
    validate_iodd(&device, ValidationOptions::default(), &mut diags);
    assert!(!diags.has_errors(), "{diags:?}");
}
