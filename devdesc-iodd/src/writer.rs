//! IODD reconstructor: normalized [`IoddDevice`] -> XML text.
//!
//! Walks the model only. Tri-state attributes are emitted only when they
//! were recorded present; an absent flag never materializes as `"false"`.

use devdesc_model::*;

use crate::stdrefs;
use crate::xml_tree::{write_tree, XmlElement, XmlWriteError};

/// Regenerate IODD XML from the normalized model.
pub fn write_iodd(device: &IoddDevice) -> Result<String, XmlWriteError> {
    let mut root = XmlElement::new("IODevice");
    root.set_attr("xmlns", device.schema_version.namespace());
    root.set_attr("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance");

    if let Some(info) = document_info(&device.document) {
        root.add_child(info);
    }

    let mut body = XmlElement::new("ProfileBody");
    body.add_child(device_identity(device));
    body.add_child(device_function(device));
    root.add_child(body);

    root.add_child(comm_network_profile(&device.comm_profile));

    if !device.text_table.texts.is_empty() {
        root.add_child(text_collection(&device.text_table));
    }

    write_tree(&root)
}

fn document_info(info: &DocumentInfo) -> Option<XmlElement> {
    if info.version.is_none() && info.release_date.is_none() && info.copyright.is_none() {
        return None;
    }
    let mut element = XmlElement::new("DocumentInfo");
    element.set_opt_attr("version", info.version.clone());
    element.set_opt_attr("releaseDate", info.release_date.clone());
    element.set_opt_attr("copyright", info.copyright.clone());
    Some(element)
}

// --- Identity ---

fn device_identity(device: &IoddDevice) -> XmlElement {
    let mut identity = XmlElement::new("DeviceIdentity");
    identity.set_attr("vendorId", device.vendor.vendor_id.to_string());
    identity.set_attr("vendorName", device.vendor.vendor_name.clone());
    identity.set_attr("deviceId", device.device.device_id.to_string());

    push_text_ref(&mut identity, "VendorText", &device.vendor.vendor_text_id);
    push_text_ref(&mut identity, "VendorUrl", &device.vendor.vendor_url_id);
    if let Some(logo) = &device.vendor.vendor_logo {
        let mut element = XmlElement::new("VendorLogo");
        element.set_attr("name", logo.clone());
        identity.add_child(element);
    }

    if let Some(text_id) = device_name_text_id(device) {
        let mut element = XmlElement::new("DeviceName");
        element.set_attr("textId", text_id);
        identity.add_child(element);
    }
    push_text_ref(&mut identity, "DeviceFamily", &device.device.device_family_text_id);

    if !device.device.product_variants.is_empty() {
        let mut collection = XmlElement::new("DeviceVariantCollection");
        for variant in &device.device.product_variants {
            let mut element = XmlElement::new("DeviceVariant");
            element.set_attr("productId", variant.product_id.clone());
            element.set_opt_attr("deviceSymbol", variant.device_symbol.clone());
            element.set_opt_attr("deviceIcon", variant.device_icon.clone());
            push_text_ref(&mut element, "Name", &variant.name_text_id);
            push_text_ref(&mut element, "Description", &variant.description_text_id);
            collection.add_child(element);
        }
        identity.add_child(collection);
    }

    identity
}

/// Stored textId when present, otherwise reverse lookup from the resolved
/// name. Ties go to the textId with the lowest original order index.
fn device_name_text_id(device: &IoddDevice) -> Option<String> {
    if let Some(id) = &device.device.device_name_text_id {
        return Some(id.clone());
    }
    let name = device.device.device_name.as_deref()?;
    device.text_table.reverse_lookup(name).map(str::to_string)
}

// --- Device function ---

fn device_function(device: &IoddDevice) -> XmlElement {
    let mut function = XmlElement::new("DeviceFunction");

    if let Some(features) = features(&device.features) {
        function.add_child(features);
    }

    if !device.custom_datatypes.is_empty() {
        let mut collection = XmlElement::new("DatatypeCollection");
        for custom in &device.custom_datatypes {
            let mut element = datatype_node(&custom.datatype);
            element.attributes.insert(0, ("id".into(), custom.id.clone()));
            collection.add_child(element);
        }
        function.add_child(collection);
    }

    function.add_child(variable_collection(device));

    if !device.process_data.is_empty() {
        let mut collection = XmlElement::new("ProcessDataCollection");
        for set in &device.process_data {
            collection.add_child(process_data_set(set));
        }
        function.add_child(collection);
    }

    if !device.error_types.is_empty() {
        let mut collection = XmlElement::new("ErrorTypeCollection");
        for error_type in &device.error_types {
            let mut element = XmlElement::new("ErrorType");
            element.set_attr("code", error_type.code.to_string());
            element.set_opt_attr("additionalCode", error_type.additional_code.map(|c| c.to_string()));
            push_text_ref(&mut element, "Name", &error_type.name_text_id);
            push_text_ref(&mut element, "Description", &error_type.description_text_id);
            collection.add_child(element);
        }
        function.add_child(collection);
    }

    if !device.events.is_empty() {
        function.add_child(event_collection(&device.events));
    }

    if !device.menus.is_empty() || !device.role_menus.is_empty() {
        function.add_child(user_interface(device));
    }

    function
}

fn features(features: &DeviceFeatures) -> Option<XmlElement> {
    let empty = features.block_parameter == TriState::Absent
        && features.data_storage == TriState::Absent
        && features.profile_characteristics.is_empty();
    if empty {
        return None;
    }
    let mut element = XmlElement::new("Features");
    element.set_opt_attr("blockParameter", features.block_parameter.emit());
    element.set_opt_attr("dataStorage", features.data_storage.emit());
    for characteristic in &features.profile_characteristics {
        let mut child = XmlElement::new("ProfileCharacteristic");
        child.text = Some(characteristic.to_string());
        element.add_child(child);
    }
    Some(element)
}

// --- Variables ---

fn variable_collection(device: &IoddDevice) -> XmlElement {
    let mut collection = XmlElement::new("VariableCollection");

    if device.legacy_import && device.std_variable_refs.is_empty() {
        // Degraded path for models imported before standard references were
        // captured. Lower fidelity, but reconstruction still succeeds.
        log::warn!(
            "device {}: no captured standard references, emitting fallback set",
            device.device.device_id
        );
        for id in stdrefs::FALLBACK_IDS {
            let mut element = XmlElement::new("StdVariableRef");
            element.set_attr("id", *id);
            collection.add_child(element);
        }
    } else {
        let mut refs: Vec<&StdVariableRef> = device.std_variable_refs.iter().collect();
        refs.sort_by_key(|r| r.order);
        for std_ref in refs {
            collection.add_child(std_variable_ref(std_ref));
        }
    }

    for variable in &device.variables {
        collection.add_child(variable_element(variable));
    }

    collection
}

fn std_variable_ref(std_ref: &StdVariableRef) -> XmlElement {
    let mut element = XmlElement::new("StdVariableRef");
    element.set_attr("id", std_ref.id.clone());
    element.set_opt_attr("defaultValue", std_ref.default_value.clone());
    element.set_opt_attr(
        "fixedLengthRestriction",
        std_ref.fixed_length_restriction.map(|l| l.to_string()),
    );
    element.set_opt_attr(
        "excludedFromDataStorage",
        std_ref.excluded_from_data_storage.emit(),
    );

    for child in &std_ref.children {
        match child {
            StdRefChild::SingleValue { value, name_text_id } => {
                let mut sv = XmlElement::new("SingleValue");
                sv.set_attr("value", value.clone());
                push_text_ref(&mut sv, "Name", name_text_id);
                element.add_child(sv);
            }
            StdRefChild::StdSingleValueRef { value } => {
                let mut sv = XmlElement::new("StdSingleValueRef");
                sv.set_attr("value", value.clone());
                element.add_child(sv);
            }
            StdRefChild::StdRecordItemRef { subindex, default_value } => {
                let mut item = XmlElement::new("StdRecordItemRef");
                item.set_attr("subindex", subindex.to_string());
                item.set_opt_attr("defaultValue", default_value.clone());
                element.add_child(item);
            }
        }
    }

    element
}

fn variable_element(variable: &IoddVariable) -> XmlElement {
    let mut element = XmlElement::new("Variable");
    element.set_attr("id", variable.id.clone());
    element.set_attr("index", variable.index.to_string());
    element.set_opt_attr("subindex", variable.subindex.map(|s| s.to_string()));
    element.set_opt_attr("accessRights", variable.access_rights.map(AccessRights::as_str));
    element.set_opt_attr("dynamic", variable.dynamic.emit());
    element.set_opt_attr(
        "excludedFromDataStorage",
        variable.excluded_from_data_storage.emit(),
    );
    element.set_opt_attr(
        "modifiesOtherVariables",
        variable.modifies_other_variables.emit(),
    );
    element.set_opt_attr("defaultValue", variable.default_value.clone());

    element.add_child(datatype_child(&variable.datatype));
    push_text_ref(&mut element, "Name", &variable.name_text_id);
    push_text_ref(&mut element, "Description", &variable.description_text_id);
    element
}

// --- Datatypes ---

/// A reference becomes `<DatatypeRef>`, everything else an inline
/// `<Datatype>` with an `xsi:type`.
fn datatype_child(datatype: &IoddDatatype) -> XmlElement {
    match datatype {
        IoddDatatype::Reference { datatype_id } => {
            let mut element = XmlElement::new("DatatypeRef");
            element.set_attr("datatypeId", datatype_id.clone());
            element
        }
        other => datatype_node(other),
    }
}

fn datatype_node(datatype: &IoddDatatype) -> XmlElement {
    let mut element = XmlElement::new("Datatype");
    match datatype {
        IoddDatatype::Simple(simple) => {
            element.set_attr("xsi:type", simple.kind.as_str());
            element.set_opt_attr("bitLength", simple.bit_length.map(|l| l.to_string()));
            element.set_opt_attr("fixedLength", simple.fixed_length.map(|l| l.to_string()));
            element.set_opt_attr("encoding", simple.encoding.clone());
            element.set_opt_attr("minValue", simple.min_value.clone());
            element.set_opt_attr("maxValue", simple.max_value.clone());
            for single in &simple.single_values {
                let mut sv = XmlElement::new("SingleValue");
                sv.set_attr("value", single.value.clone());
                push_text_ref(&mut sv, "Name", &single.name_text_id);
                element.add_child(sv);
            }
            for range in &simple.value_ranges {
                let mut vr = XmlElement::new("ValueRange");
                vr.set_attr("lowerValue", range.lower_value.clone());
                vr.set_attr("upperValue", range.upper_value.clone());
                push_text_ref(&mut vr, "Name", &range.name_text_id);
                element.add_child(vr);
            }
        }
        IoddDatatype::Record(record) => {
            element.set_attr("xsi:type", "RecordT");
            element.set_opt_attr("bitLength", record.bit_length.map(|l| l.to_string()));
            element.set_opt_attr(
                "subindexAccessSupported",
                record.subindex_access_supported.emit(),
            );
            for item in &record.items {
                element.add_child(record_item(item));
            }
        }
        IoddDatatype::Array(array) => {
            element.set_attr("xsi:type", "ArrayT");
            element.set_attr("count", array.count.to_string());
            element.set_opt_attr("fixedLength", array.fixed_length.map(|l| l.to_string()));
            element.add_child(datatype_child(&array.element));
        }
        IoddDatatype::Reference { datatype_id } => {
            // Shouldn't reach here from datatype_child, but stay total.
            element = XmlElement::new("DatatypeRef");
            element.set_attr("datatypeId", datatype_id.clone());
        }
    }
    element
}

fn record_item(item: &RecordItem) -> XmlElement {
    let mut element = XmlElement::new("RecordItem");
    element.set_attr("subindex", item.subindex.to_string());
    element.set_attr("bitOffset", item.bit_offset.to_string());
    element.set_opt_attr("bitLength", item.bit_length.map(|l| l.to_string()));
    element.set_opt_attr("defaultValue", item.default_value.clone());
    element.add_child(datatype_child(&item.datatype));
    push_text_ref(&mut element, "Name", &item.name_text_id);
    push_text_ref(&mut element, "Description", &item.description_text_id);
    element
}

// --- Process data ---

fn process_data_set(set: &ProcessDataSet) -> XmlElement {
    let mut element = XmlElement::new("ProcessData");
    element.set_opt_attr("id", set.id.clone());

    if let Some(condition) = &set.condition {
        let mut cond = XmlElement::new("Condition");
        cond.set_attr("variableId", condition.variable_id.clone());
        cond.set_opt_attr("subindex", condition.subindex.map(|s| s.to_string()));
        cond.set_attr("value", condition.value.clone());
        element.add_child(cond);
    }
    if let Some(input) = &set.input {
        element.add_child(process_data("ProcessDataIn", input));
    }
    if let Some(output) = &set.output {
        element.add_child(process_data("ProcessDataOut", output));
    }
    element
}

fn process_data(tag: &str, pd: &ProcessData) -> XmlElement {
    let mut element = XmlElement::new(tag);
    element.set_attr("id", pd.id.clone());
    element.set_attr("bitLength", pd.bit_length.to_string());
    element.add_child(datatype_child(&pd.datatype));
    push_text_ref(&mut element, "Name", &pd.name_text_id);
    element
}

// --- Events ---

fn event_collection(events: &[IoddEvent]) -> XmlElement {
    let mut ordered: Vec<&IoddEvent> = events.iter().collect();
    ordered.sort_by_key(|e| e.order);

    let mut collection = XmlElement::new("EventCollection");
    for event in ordered {
        match &event.kind {
            EventKind::StdRef { code } => {
                let mut element = XmlElement::new("StdEventRef");
                element.set_attr("code", code.to_string());
                collection.add_child(element);
            }
            EventKind::Custom(custom) => {
                let mut element = XmlElement::new("Event");
                element.set_attr("code", custom.code.to_string());
                element.set_attr("type", custom.event_type.as_str());
                element.set_opt_attr("mode", custom.mode.map(EventMode::as_str));
                push_text_ref(&mut element, "Name", &custom.name_text_id);
                push_text_ref(&mut element, "Description", &custom.description_text_id);
                collection.add_child(element);
            }
        }
    }
    collection
}

// --- User interface ---

fn user_interface(device: &IoddDevice) -> XmlElement {
    let mut ui = XmlElement::new("UserInterface");

    if !device.menus.is_empty() {
        let mut collection = XmlElement::new("MenuCollection");
        for menu in &device.menus {
            collection.add_child(menu_element(menu));
        }
        ui.add_child(collection);
    }

    for role_set in &device.role_menus {
        let mut element = XmlElement::new(role_set.role.as_str());
        push_menu_ref(&mut element, "IdentificationMenu", &role_set.identification_menu_id);
        push_menu_ref(&mut element, "ParameterMenu", &role_set.parameter_menu_id);
        push_menu_ref(&mut element, "ObservationMenu", &role_set.observation_menu_id);
        push_menu_ref(&mut element, "DiagnosisMenu", &role_set.diagnosis_menu_id);
        ui.add_child(element);
    }

    ui
}

fn menu_element(menu: &Menu) -> XmlElement {
    let mut element = XmlElement::new("Menu");
    element.set_attr("id", menu.id.clone());
    push_text_ref(&mut element, "Name", &menu.name_text_id);

    let mut items: Vec<&MenuItem> = menu.items.iter().collect();
    items.sort_by_key(|i| i.order);
    for item in items {
        element.add_child(menu_item(&item.kind));
    }
    element
}

fn menu_item(kind: &MenuItemKind) -> XmlElement {
    match kind {
        MenuItemKind::VariableRef {
            variable_id,
            subindex,
            gradient,
            offset,
            unit_code,
            access_rights_restriction,
            display_format,
        } => {
            let mut element = XmlElement::new("VariableRef");
            element.set_attr("variableId", variable_id.clone());
            element.set_opt_attr("subindex", subindex.map(|s| s.to_string()));
            element.set_opt_attr("gradient", gradient.clone());
            element.set_opt_attr("offset", offset.clone());
            element.set_opt_attr("unitCode", unit_code.map(|u| u.to_string()));
            element.set_opt_attr(
                "accessRightRestriction",
                access_rights_restriction.map(AccessRights::as_str),
            );
            element.set_opt_attr("displayFormat", display_format.clone());
            element
        }
        MenuItemKind::RecordItemRef { variable_id, subindex, gradient, offset, unit_code } => {
            let mut element = XmlElement::new("RecordItemRef");
            element.set_attr("variableId", variable_id.clone());
            element.set_attr("subindex", subindex.to_string());
            element.set_opt_attr("gradient", gradient.clone());
            element.set_opt_attr("offset", offset.clone());
            element.set_opt_attr("unitCode", unit_code.map(|u| u.to_string()));
            element
        }
        MenuItemKind::MenuRef { menu_id } => {
            let mut element = XmlElement::new("MenuRef");
            element.set_attr("menuId", menu_id.clone());
            element
        }
        MenuItemKind::Button { button_value, description_text_id, action_started_text_id } => {
            let mut element = XmlElement::new("Button");
            element.set_opt_attr("buttonValue", button_value.clone());
            push_text_ref(&mut element, "Description", description_text_id);
            push_text_ref(&mut element, "ActionStartedMessage", action_started_text_id);
            element
        }
    }
}

// --- Communication profile ---

fn comm_network_profile(profile: &CommunicationProfile) -> XmlElement {
    let mut comm = XmlElement::new("CommNetworkProfile");
    comm.set_attr("iolinkRevision", profile.iolink_revision.clone());

    let mut physical = XmlElement::new("PhysicalLayer");
    physical.set_opt_attr("bitrate", profile.transport_rate.clone());
    physical.set_opt_attr("minCycleTime", profile.min_cycle_time.map(|t| t.to_string()));
    physical.set_opt_attr("sioSupported", profile.sio_supported.emit());
    physical.set_opt_attr(
        "mSequenceCapability",
        profile.m_sequence_capability.map(|c| c.to_string()),
    );

    let mut transport = XmlElement::new("TransportLayers");
    transport.add_child(physical);
    comm.add_child(transport);
    comm
}

// --- Texts ---

/// Texts are emitted in original first-appearance order, per language.
fn text_collection(table: &TextTable) -> XmlElement {
    let mut collection = XmlElement::new("ExternalTextCollection");

    let mut primary = XmlElement::new("PrimaryLanguage");
    primary.set_attr("xml:lang", table.primary_language.clone());
    push_texts(&mut primary, table, &table.primary_language);
    collection.add_child(primary);

    for lang in table.languages() {
        if lang == table.primary_language {
            continue;
        }
        let mut language = XmlElement::new("Language");
        language.set_attr("xml:lang", lang);
        push_texts(&mut language, table, lang);
        collection.add_child(language);
    }

    collection
}

fn push_texts(container: &mut XmlElement, table: &TextTable, lang: &str) {
    let mut entries: Vec<(&String, &TextEntry)> = table
        .texts
        .iter()
        .filter(|(_, entry)| entry.values.contains_key(lang))
        .collect();
    entries.sort_by_key(|(_, entry)| entry.order);

    for (id, entry) in entries {
        let mut text = XmlElement::new("Text");
        text.set_attr("id", id.clone());
        text.set_attr("value", entry.values[lang].clone());
        container.add_child(text);
    }
}

// --- Shared helpers ---

fn push_text_ref(parent: &mut XmlElement, tag: &str, text_id: &Option<String>) {
    if let Some(id) = text_id {
        let mut element = XmlElement::new(tag);
        element.set_attr("textId", id.clone());
        parent.add_child(element);
    }
}

fn push_menu_ref(parent: &mut XmlElement, tag: &str, menu_id: &Option<String>) {
    if let Some(id) = menu_id {
        let mut element = XmlElement::new(tag);
        element.set_attr("menuId", id.clone());
        parent.add_child(element);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variable(dynamic: TriState) -> IoddVariable {
        IoddVariable {
            id: "V_Test".into(),
            index: 100,
            subindex: None,
            datatype: IoddDatatype::default(),
            access_rights: Some(AccessRights::ReadWrite),
            dynamic,
            excluded_from_data_storage: TriState::Absent,
            modifies_other_variables: TriState::Absent,
            default_value: None,
            name_text_id: None,
            description_text_id: None,
        }
    }

    #[test]
    fn absent_tri_state_emits_no_attribute() {
        let mut device = IoddDevice::default();
        device.variables.push(variable(TriState::Absent));
        let xml = write_iodd(&device).unwrap();
        assert!(!xml.contains("dynamic"));
    }

    #[test]
    fn explicit_false_tri_state_emits_false() {
        let mut device = IoddDevice::default();
        device.variables.push(variable(TriState::False));
        let xml = write_iodd(&device).unwrap();
        assert!(xml.contains(r#"dynamic="false""#));
    }

    #[test]
    fn legacy_import_without_refs_emits_fallback_set() {
        let device = IoddDevice {
            legacy_import: true,
            ..Default::default()
        };
        let xml = write_iodd(&device).unwrap();
        for id in stdrefs::FALLBACK_IDS {
            assert!(xml.contains(id), "missing fallback ref {id}");
        }
    }

    #[test]
    fn device_name_falls_back_to_reverse_lookup() {
        let mut device = IoddDevice::default();
        device.text_table.primary_language = "en".into();
        device.text_table.insert("TI_First", "en", "ProSense");
        device.text_table.insert("TI_Second", "en", "ProSense");
        device.device.device_name = Some("ProSense".into());
        device.device.device_name_text_id = None;
        let xml = write_iodd(&device).unwrap();
        assert!(xml.contains(r#"<DeviceName textId="TI_First"/>"#));
    }

    #[test]
    fn namespace_follows_schema_version() {
        let device = IoddDevice {
            schema_version: IoddSchemaVersion::V1_0_1,
            ..Default::default()
        };
        let xml = write_iodd(&device).unwrap();
        assert!(xml.contains("http://www.io-link.com/IODD/2009/11"));
    }
}
