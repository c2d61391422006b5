//! IODD parser: XML text -> normalized [`IoddDevice`] + diagnostics.
//!
//! Tolerant by design. Malformed XML and a non-IODD root are the only hard
//! errors; everything else degrades to diagnostics on the collector.

use devdesc_model::*;
use thiserror::Error;

use crate::stdrefs;
use crate::xml_tree::{read_tree, XmlElement, XmlReadError};

#[derive(Debug, Error)]
pub enum IoddParseError {
    #[error(transparent)]
    Xml(#[from] XmlReadError),
    #[error("root element is <{root}>, expected <IODevice>")]
    NotIodd { root: String },
}

#[derive(Debug)]
pub struct IoddParseOutcome {
    pub device: IoddDevice,
    pub diagnostics: DiagnosticCollector,
}

pub fn parse_iodd(xml: &str) -> Result<IoddParseOutcome, IoddParseError> {
    let root = read_tree(xml)?;
    if root.name != "IODevice" {
        return Err(IoddParseError::NotIodd { root: root.name });
    }

    let mut diags = DiagnosticCollector::new();
    let mut device = IoddDevice {
        schema_version: detect_schema_version(&root, &mut diags),
        ..Default::default()
    };

    // Texts first so identity parsing can resolve the device name.
    if let Some(texts) = root.child("ExternalTextCollection") {
        device.text_table = parse_text_collection(texts, &mut diags);
    } else {
        diags.warning(
            "IODD-P003",
            SourceLocation::section("ExternalTextCollection"),
            "no ExternalTextCollection; textId references will not resolve",
        );
    }

    if let Some(info) = root.child("DocumentInfo") {
        device.document = DocumentInfo {
            version: attr_string(info, "version"),
            release_date: attr_string(info, "releaseDate"),
            copyright: attr_string(info, "copyright"),
        };
    }

    let Some(body) = root.child("ProfileBody") else {
        diags.error(
            "IODD-P002",
            SourceLocation::section("ProfileBody"),
            "missing ProfileBody element",
        );
        return Ok(IoddParseOutcome { device, diagnostics: diags });
    };

    if let Some(identity) = body.child("DeviceIdentity") {
        parse_device_identity(identity, &mut device, &mut diags);
    } else {
        diags.error(
            "IODD-P002",
            SourceLocation::section("DeviceIdentity"),
            "missing DeviceIdentity element",
        );
    }

    if let Some(function) = body.child("DeviceFunction") {
        parse_device_function(function, &mut device, &mut diags);
    } else {
        diags.error(
            "IODD-P002",
            SourceLocation::section("DeviceFunction"),
            "missing DeviceFunction element",
        );
    }

    if let Some(comm) = root.child("CommNetworkProfile") {
        parse_comm_profile(comm, &mut device, &mut diags);
    }

    Ok(IoddParseOutcome { device, diagnostics: diags })
}

fn detect_schema_version(root: &XmlElement, diags: &mut DiagnosticCollector) -> IoddSchemaVersion {
    let namespace = root
        .attributes
        .iter()
        .find(|(name, _)| name == "xmlns")
        .map(|(_, value)| value.as_str());

    match namespace {
        Some(uri) => IoddSchemaVersion::from_namespace(uri).unwrap_or_else(|| {
            diags.warning(
                "IODD-P001",
                SourceLocation::section("IODevice"),
                format!("unknown namespace '{uri}', assuming IODD 1.1 grammar"),
            );
            IoddSchemaVersion::V1_1
        }),
        None => {
            diags.warning(
                "IODD-P001",
                SourceLocation::section("IODevice"),
                "root element has no xmlns, assuming IODD 1.1 grammar",
            );
            IoddSchemaVersion::V1_1
        }
    }
}

// --- Texts ---

fn parse_text_collection(texts: &XmlElement, diags: &mut DiagnosticCollector) -> TextTable {
    let mut table = TextTable::default();

    if let Some(primary) = texts.child("PrimaryLanguage") {
        let lang = attr_string(primary, "xml:lang").unwrap_or_else(|| "en".into());
        insert_language(&mut table, primary, &lang);
        table.primary_language = lang;
    } else {
        diags.warning(
            "IODD-P004",
            SourceLocation::section("ExternalTextCollection"),
            "text collection has no PrimaryLanguage",
        );
        table.primary_language = "en".into();
    }

    for language in texts.children_named("Language") {
        let Some(lang) = attr_string(language, "xml:lang") else {
            diags.warning(
                "IODD-P004",
                SourceLocation::section("ExternalTextCollection"),
                "Language element without xml:lang, skipped",
            );
            continue;
        };
        insert_language(&mut table, language, &lang);
    }

    table
}

fn insert_language(table: &mut TextTable, container: &XmlElement, lang: &str) {
    for text in container.children_named("Text") {
        if let (Some(id), Some(value)) = (text.attr("id"), text.attr("value")) {
            table.insert(id, lang, value);
        }
    }
}

// --- Identity ---

fn parse_device_identity(
    identity: &XmlElement,
    device: &mut IoddDevice,
    diags: &mut DiagnosticCollector,
) {
    device.vendor = VendorInfo {
        vendor_id: attr_u32(identity, "vendorId", diags).unwrap_or(0),
        vendor_name: attr_string(identity, "vendorName").unwrap_or_default(),
        vendor_text_id: child_text_id(identity, "VendorText"),
        vendor_url_id: child_text_id(identity, "VendorUrl"),
        vendor_logo: identity
            .child("VendorLogo")
            .and_then(|l| attr_string(l, "name")),
    };

    device.device.device_id = attr_u32(identity, "deviceId", diags).unwrap_or(0);
    device.device.device_name_text_id = child_text_id(identity, "DeviceName");
    device.device.device_family_text_id = child_text_id(identity, "DeviceFamily");
    device.device.device_name = device
        .device
        .device_name_text_id
        .as_deref()
        .and_then(|id| device.text_table.resolve(id))
        .map(str::to_string);

    if let Some(variants) = identity.child("DeviceVariantCollection") {
        for variant in variants.children_named("DeviceVariant") {
            let Some(product_id) = attr_string(variant, "productId") else {
                diags.warning(
                    "IODD-P005",
                    SourceLocation::section("DeviceIdentity"),
                    "DeviceVariant without productId, skipped",
                );
                continue;
            };
            device.device.product_variants.push(ProductVariant {
                product_id,
                device_symbol: attr_string(variant, "deviceSymbol"),
                device_icon: attr_string(variant, "deviceIcon"),
                name_text_id: child_text_id(variant, "Name"),
                description_text_id: child_text_id(variant, "Description"),
            });
        }
    }
}

// --- Device function ---

fn parse_device_function(
    function: &XmlElement,
    device: &mut IoddDevice,
    diags: &mut DiagnosticCollector,
) {
    if let Some(features) = function.child("Features") {
        device.features = DeviceFeatures {
            block_parameter: TriState::parse(features.attr("blockParameter")),
            data_storage: TriState::parse(features.attr("dataStorage")),
            profile_characteristics: features
                .children_named("ProfileCharacteristic")
                .filter_map(|c| c.text.as_deref())
                .filter_map(|t| t.parse().ok())
                .collect(),
        };
    }

    if let Some(datatypes) = function.child("DatatypeCollection") {
        for datatype in datatypes.children_named("Datatype") {
            let Some(id) = attr_string(datatype, "id") else {
                diags.warning(
                    "IODD-P006",
                    SourceLocation::section("DatatypeCollection"),
                    "Datatype without id in DatatypeCollection, skipped",
                );
                continue;
            };
            device.custom_datatypes.push(CustomDatatype {
                id,
                datatype: parse_datatype_node(datatype, diags),
            });
        }
    }

    if let Some(variables) = function.child("VariableCollection") {
        parse_variable_collection(variables, device, diags);
    }

    if let Some(process_data) = function.child("ProcessDataCollection") {
        for set in process_data.children_named("ProcessData") {
            device.process_data.push(parse_process_data_set(set, diags));
        }
    }

    if let Some(error_types) = function.child("ErrorTypeCollection") {
        for error_type in error_types.children_named("ErrorType") {
            if let Some(code) = attr_u16(error_type, "code", diags) {
                device.error_types.push(ErrorType {
                    code,
                    additional_code: attr_u16(error_type, "additionalCode", diags),
                    name_text_id: child_text_id(error_type, "Name"),
                    description_text_id: child_text_id(error_type, "Description"),
                });
            }
        }
    }

    if let Some(events) = function.child("EventCollection") {
        parse_event_collection(events, device, diags);
    }

    if let Some(ui) = function.child("UserInterface") {
        parse_user_interface(ui, device, diags);
    }
}

// --- Variables ---

fn parse_variable_collection(
    variables: &XmlElement,
    device: &mut IoddDevice,
    diags: &mut DiagnosticCollector,
) {
    let mut std_ref_order = 0u32;
    for child in &variables.children {
        match child.name.as_str() {
            "StdVariableRef" => {
                if let Some(std_ref) = parse_std_variable_ref(child, std_ref_order, diags) {
                    device.std_variable_refs.push(std_ref);
                    std_ref_order += 1;
                }
            }
            "Variable" => {
                if let Some(variable) = parse_variable(child, diags) {
                    device.variables.push(variable);
                }
            }
            other => {
                diags.info(
                    "IODD-P007",
                    SourceLocation::section("VariableCollection"),
                    format!("unrecognized element <{other}> in VariableCollection"),
                );
            }
        }
    }
}

fn parse_variable(variable: &XmlElement, diags: &mut DiagnosticCollector) -> Option<IoddVariable> {
    let Some(id) = attr_string(variable, "id") else {
        diags.warning(
            "IODD-P008",
            SourceLocation::section("VariableCollection"),
            "Variable without id, skipped",
        );
        return None;
    };
    let Some(index) = attr_u16(variable, "index", diags) else {
        diags.warning(
            "IODD-P008",
            SourceLocation::section("VariableCollection"),
            format!("Variable '{id}' without a numeric index, skipped"),
        );
        return None;
    };

    let access_rights = variable.attr("accessRights").and_then(|raw| {
        let parsed = AccessRights::parse(raw);
        if parsed.is_none() {
            diags.warning(
                "IODD-P009",
                SourceLocation::section("VariableCollection"),
                format!("variable '{id}': unknown accessRights '{raw}'"),
            );
        }
        parsed
    });

    Some(IoddVariable {
        index,
        subindex: attr_u8(variable, "subindex", diags),
        datatype: resolve_datatype(variable, diags),
        access_rights,
        dynamic: TriState::parse(variable.attr("dynamic")),
        excluded_from_data_storage: TriState::parse(variable.attr("excludedFromDataStorage")),
        modifies_other_variables: TriState::parse(variable.attr("modifiesOtherVariables")),
        default_value: attr_string(variable, "defaultValue"),
        name_text_id: child_text_id(variable, "Name"),
        description_text_id: child_text_id(variable, "Description"),
        id,
    })
}

fn parse_std_variable_ref(
    element: &XmlElement,
    order: u32,
    diags: &mut DiagnosticCollector,
) -> Option<StdVariableRef> {
    let Some(id) = attr_string(element, "id") else {
        diags.warning(
            "IODD-P008",
            SourceLocation::section("VariableCollection"),
            "StdVariableRef without id, skipped",
        );
        return None;
    };
    if stdrefs::lookup(&id).is_none() {
        diags.info(
            "IODD-P010",
            SourceLocation::section("VariableCollection"),
            format!("standard reference '{id}' not in the well-known table"),
        );
    }

    let mut children = Vec::new();
    for child in &element.children {
        match child.name.as_str() {
            "SingleValue" => {
                if let Some(value) = attr_string(child, "value") {
                    children.push(StdRefChild::SingleValue {
                        value,
                        name_text_id: child_text_id(child, "Name"),
                    });
                }
            }
            "StdSingleValueRef" => {
                if let Some(value) = attr_string(child, "value") {
                    children.push(StdRefChild::StdSingleValueRef { value });
                }
            }
            "StdRecordItemRef" => {
                if let Some(subindex) = attr_u8(child, "subindex", diags) {
                    children.push(StdRefChild::StdRecordItemRef {
                        subindex,
                        default_value: attr_string(child, "defaultValue"),
                    });
                }
            }
            _ => {}
        }
    }

    Some(StdVariableRef {
        synthetic_index: stdrefs::synthetic_index(&id, order),
        order,
        default_value: attr_string(element, "defaultValue"),
        fixed_length_restriction: attr_u16(element, "fixedLengthRestriction", diags),
        excluded_from_data_storage: TriState::parse(element.attr("excludedFromDataStorage")),
        children,
        id,
    })
}

// --- Datatypes ---

/// Resolve the datatype of a variable-like element. The inline `<Datatype>`
/// child must win over `<DatatypeRef>`: RecordT variables carry DatatypeRef
/// elements nested inside their own RecordItems, and scanning for the
/// reference first would pick those up.
fn resolve_datatype(parent: &XmlElement, diags: &mut DiagnosticCollector) -> IoddDatatype {
    if let Some(inline) = parent.child("Datatype").or_else(|| parent.child("SimpleDatatype")) {
        return parse_datatype_node(inline, diags);
    }
    if let Some(reference) = parent.child("DatatypeRef") {
        if let Some(datatype_id) = attr_string(reference, "datatypeId") {
            return IoddDatatype::Reference { datatype_id };
        }
    }
    diags.warning(
        "IODD-P011",
        SourceLocation::section("VariableCollection"),
        format!("element <{}> has no resolvable datatype", parent.name),
    );
    IoddDatatype::default()
}

fn parse_datatype_node(node: &XmlElement, diags: &mut DiagnosticCollector) -> IoddDatatype {
    match type_attr(node) {
        Some("RecordT") => IoddDatatype::Record(parse_record(node, diags)),
        Some("ArrayT") => IoddDatatype::Array(parse_array(node, diags)),
        Some(simple) => {
            let kind = SimpleKind::parse(simple).unwrap_or_else(|| {
                diags.warning(
                    "IODD-P012",
                    SourceLocation::section("DatatypeCollection"),
                    format!("unknown datatype '{simple}', treated as UIntegerT"),
                );
                SimpleKind::default()
            });
            IoddDatatype::Simple(parse_simple(node, kind, diags))
        }
        None => {
            diags.warning(
                "IODD-P012",
                SourceLocation::section("DatatypeCollection"),
                "Datatype element without xsi:type",
            );
            IoddDatatype::default()
        }
    }
}

fn parse_simple(
    node: &XmlElement,
    kind: SimpleKind,
    diags: &mut DiagnosticCollector,
) -> SimpleDatatype {
    let mut single_values = Vec::new();
    for sv in node.children_named("SingleValue") {
        if let Some(value) = attr_string(sv, "value") {
            single_values.push(SingleValue {
                value,
                name_text_id: child_text_id(sv, "Name"),
            });
        }
    }

    let mut value_ranges = Vec::new();
    for range in node.children_named("ValueRange") {
        if let (Some(lower), Some(upper)) =
            (attr_string(range, "lowerValue"), attr_string(range, "upperValue"))
        {
            value_ranges.push(ValueRange {
                lower_value: lower,
                upper_value: upper,
                name_text_id: child_text_id(range, "Name"),
            });
        }
    }

    SimpleDatatype {
        kind,
        bit_length: attr_u16(node, "bitLength", diags),
        fixed_length: attr_u16(node, "fixedLength", diags),
        encoding: attr_string(node, "encoding"),
        min_value: attr_string(node, "minValue"),
        max_value: attr_string(node, "maxValue"),
        single_values,
        value_ranges,
    }
}

fn parse_record(node: &XmlElement, diags: &mut DiagnosticCollector) -> RecordDatatype {
    let mut items = Vec::new();
    for item in node.children_named("RecordItem") {
        let Some(subindex) = attr_u8(item, "subindex", diags) else {
            diags.warning(
                "IODD-P013",
                SourceLocation::section("DatatypeCollection"),
                "RecordItem without subindex, skipped",
            );
            continue;
        };
        items.push(RecordItem {
            subindex,
            bit_offset: attr_u16(item, "bitOffset", diags).unwrap_or(0),
            bit_length: attr_u16(item, "bitLength", diags),
            name_text_id: child_text_id(item, "Name"),
            description_text_id: child_text_id(item, "Description"),
            datatype: Box::new(resolve_datatype(item, diags)),
            default_value: attr_string(item, "defaultValue"),
        });
    }

    RecordDatatype {
        bit_length: attr_u16(node, "bitLength", diags),
        subindex_access_supported: TriState::parse(node.attr("subindexAccessSupported")),
        items,
    }
}

fn parse_array(node: &XmlElement, diags: &mut DiagnosticCollector) -> ArrayDatatype {
    let element = node
        .child("Datatype")
        .or_else(|| node.child("SimpleDatatype"))
        .map(|e| parse_datatype_node(e, diags))
        .unwrap_or_default();
    let element_bit_length = match &element {
        IoddDatatype::Simple(simple) => simple.bit_length,
        _ => None,
    };

    ArrayDatatype {
        count: attr_u16(node, "count", diags).unwrap_or(0),
        element: Box::new(element),
        element_bit_length,
        fixed_length: attr_u16(node, "fixedLength", diags),
    }
}

// --- Process data ---

fn parse_process_data_set(set: &XmlElement, diags: &mut DiagnosticCollector) -> ProcessDataSet {
    let condition = set.child("Condition").and_then(|c| {
        attr_string(c, "variableId").map(|variable_id| ProcessDataCondition {
            variable_id,
            subindex: attr_u8(c, "subindex", diags),
            value: attr_string(c, "value").unwrap_or_default(),
        })
    });

    ProcessDataSet {
        id: attr_string(set, "id"),
        condition,
        input: set
            .child("ProcessDataIn")
            .map(|pd| parse_process_data(pd, ProcessDataDirection::In, diags)),
        output: set
            .child("ProcessDataOut")
            .map(|pd| parse_process_data(pd, ProcessDataDirection::Out, diags)),
    }
}

fn parse_process_data(
    pd: &XmlElement,
    direction: ProcessDataDirection,
    diags: &mut DiagnosticCollector,
) -> ProcessData {
    ProcessData {
        id: attr_string(pd, "id").unwrap_or_default(),
        direction,
        bit_length: attr_u16(pd, "bitLength", diags).unwrap_or(0),
        name_text_id: child_text_id(pd, "Name"),
        datatype: resolve_datatype(pd, diags),
    }
}

// --- Events ---

/// Standard references and custom definitions share one document-ordered
/// list; the order index is what lets reconstruction reproduce the original
/// interleaving.
fn parse_event_collection(
    events: &XmlElement,
    device: &mut IoddDevice,
    diags: &mut DiagnosticCollector,
) {
    let mut order = 0u32;
    for child in &events.children {
        let kind = match child.name.as_str() {
            "StdEventRef" => attr_code(child, "code", diags).map(|code| EventKind::StdRef { code }),
            "Event" => parse_custom_event(child, diags).map(EventKind::Custom),
            other => {
                diags.info(
                    "IODD-P007",
                    SourceLocation::section("EventCollection"),
                    format!("unrecognized element <{other}> in EventCollection"),
                );
                None
            }
        };
        if let Some(kind) = kind {
            device.events.push(IoddEvent { order, kind });
            order += 1;
        }
    }
}

fn parse_custom_event(event: &XmlElement, diags: &mut DiagnosticCollector) -> Option<CustomEvent> {
    let code = attr_code(event, "code", diags)?;
    let event_type = event
        .attr("type")
        .and_then(EventType::parse)
        .unwrap_or_else(|| {
            diags.warning(
                "IODD-P014",
                SourceLocation::section("EventCollection"),
                format!("event {code}: missing or unknown type, assuming Notification"),
            );
            EventType::Notification
        });

    Some(CustomEvent {
        code,
        event_type,
        mode: event.attr("mode").and_then(EventMode::parse),
        name_text_id: child_text_id(event, "Name"),
        description_text_id: child_text_id(event, "Description"),
    })
}

// --- User interface ---

fn parse_user_interface(ui: &XmlElement, device: &mut IoddDevice, diags: &mut DiagnosticCollector) {
    if let Some(menus) = ui.child("MenuCollection") {
        for menu in menus.children_named("Menu") {
            let Some(id) = attr_string(menu, "id") else {
                diags.warning(
                    "IODD-P015",
                    SourceLocation::section("UserInterface"),
                    "Menu without id, skipped",
                );
                continue;
            };
            device.menus.push(Menu {
                id,
                name_text_id: child_text_id(menu, "Name"),
                items: parse_menu_items(menu, diags),
            });
        }
    }

    let roles = [
        (MenuRole::Observer, "ObserverRoleMenuSet"),
        (MenuRole::Maintenance, "MaintenanceRoleMenuSet"),
        (MenuRole::Specialist, "SpecialistRoleMenuSet"),
    ];
    for (role, tag) in roles {
        if let Some(set) = ui.child(tag) {
            device.role_menus.push(RoleMenuSet {
                role,
                identification_menu_id: menu_ref_id(set, "IdentificationMenu"),
                parameter_menu_id: menu_ref_id(set, "ParameterMenu"),
                observation_menu_id: menu_ref_id(set, "ObservationMenu"),
                diagnosis_menu_id: menu_ref_id(set, "DiagnosisMenu"),
            });
        }
    }
}

fn menu_ref_id(set: &XmlElement, tag: &str) -> Option<String> {
    set.child(tag).and_then(|m| attr_string(m, "menuId"))
}

fn parse_menu_items(menu: &XmlElement, diags: &mut DiagnosticCollector) -> Vec<MenuItem> {
    let mut items = Vec::new();
    let mut order = 0u32;
    for child in &menu.children {
        let kind = match child.name.as_str() {
            "Name" => continue,
            "VariableRef" => attr_string(child, "variableId").map(|variable_id| {
                MenuItemKind::VariableRef {
                    variable_id,
                    subindex: attr_u8(child, "subindex", diags),
                    gradient: attr_string(child, "gradient"),
                    offset: attr_string(child, "offset"),
                    unit_code: attr_u16(child, "unitCode", diags),
                    access_rights_restriction: child
                        .attr("accessRightRestriction")
                        .and_then(AccessRights::parse),
                    display_format: attr_string(child, "displayFormat"),
                }
            }),
            "RecordItemRef" => match (attr_string(child, "variableId"), attr_u8(child, "subindex", diags)) {
                (Some(variable_id), Some(subindex)) => Some(MenuItemKind::RecordItemRef {
                    variable_id,
                    subindex,
                    gradient: attr_string(child, "gradient"),
                    offset: attr_string(child, "offset"),
                    unit_code: attr_u16(child, "unitCode", diags),
                }),
                _ => None,
            },
            "MenuRef" => attr_string(child, "menuId").map(|menu_id| MenuItemKind::MenuRef { menu_id }),
            "Button" => Some(MenuItemKind::Button {
                button_value: attr_string(child, "buttonValue"),
                description_text_id: child_text_id(child, "Description"),
                action_started_text_id: child_text_id(child, "ActionStartedMessage"),
            }),
            other => {
                diags.info(
                    "IODD-P007",
                    SourceLocation::section("UserInterface"),
                    format!("unrecognized element <{other}> in Menu"),
                );
                None
            }
        };
        if let Some(kind) = kind {
            items.push(MenuItem { order, kind });
            order += 1;
        }
    }
    items
}

// --- Communication profile ---

fn parse_comm_profile(comm: &XmlElement, device: &mut IoddDevice, diags: &mut DiagnosticCollector) {
    device.comm_profile.iolink_revision =
        attr_string(comm, "iolinkRevision").unwrap_or_else(|| "1.1".into());

    if let Some(physical) = comm.find("TransportLayers/PhysicalLayer") {
        device.comm_profile.transport_rate = attr_string(physical, "bitrate");
        device.comm_profile.min_cycle_time = attr_u32(physical, "minCycleTime", diags);
        device.comm_profile.sio_supported = TriState::parse(physical.attr("sioSupported"));
        device.comm_profile.m_sequence_capability = attr_u32(physical, "mSequenceCapability", diags);
    }
}

// --- Attribute helpers ---

fn attr_string(element: &XmlElement, name: &str) -> Option<String> {
    element.attr(name).map(str::to_string)
}

/// `xsi:type`, tolerating a bare `type` from documents that drop the prefix.
fn type_attr(element: &XmlElement) -> Option<&str> {
    element.attr("xsi:type").or_else(|| element.attr("type"))
}

fn child_text_id(element: &XmlElement, child: &str) -> Option<String> {
    element.child(child).and_then(|c| attr_string(c, "textId"))
}

fn attr_u32(element: &XmlElement, name: &str, diags: &mut DiagnosticCollector) -> Option<u32> {
    attr_number(element, name, diags)
}

fn attr_u16(element: &XmlElement, name: &str, diags: &mut DiagnosticCollector) -> Option<u16> {
    attr_number(element, name, diags)
}

fn attr_u8(element: &XmlElement, name: &str, diags: &mut DiagnosticCollector) -> Option<u8> {
    attr_number(element, name, diags)
}

fn attr_number<T: std::str::FromStr>(
    element: &XmlElement,
    name: &str,
    diags: &mut DiagnosticCollector,
) -> Option<T> {
    let raw = element.attr(name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            diags.warning(
                "IODD-P016",
                SourceLocation::section(&element.name),
                format!("<{}> attribute {name}='{raw}' is not a valid number", element.name),
            );
            None
        }
    }
}

/// Event codes appear both decimal and hex in the wild.
fn attr_code(element: &XmlElement, name: &str, diags: &mut DiagnosticCollector) -> Option<u16> {
    let raw = element.attr(name)?;
    let parsed = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .map_or_else(|| raw.parse().ok(), |hex| u16::from_str_radix(hex, 16).ok());
    if parsed.is_none() {
        diags.warning(
            "IODD-P016",
            SourceLocation::section(&element.name),
            format!("<{}> attribute {name}='{raw}' is not a valid code", element.name),
        );
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn minimal(xml_body: &str) -> String {
        format!(
            r#"<IODevice xmlns="http://www.io-link.com/IODD/2010/10">{xml_body}</IODevice>"#
        )
    }

    #[test]
    fn rejects_non_iodd_root() {
        let err = parse_iodd("<NotIodd/>").unwrap_err();
        assert!(matches!(err, IoddParseError::NotIodd { .. }));
    }

    #[test]
    fn unknown_namespace_falls_back_to_v1_1_with_warning() {
        let xml = r#"<IODevice xmlns="http://example.com/unknown"><ProfileBody><DeviceIdentity vendorId="1" vendorName="X" deviceId="2"/><DeviceFunction/></ProfileBody></IODevice>"#;
        let outcome = parse_iodd(xml).unwrap();
        assert_eq!(outcome.device.schema_version, IoddSchemaVersion::V1_1);
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| d.code == "IODD-P001" && d.severity == Severity::Warning));
    }

    #[test]
    fn tri_state_attributes_keep_absent_distinct_from_false() {
        let xml = minimal(
            r#"<ProfileBody><DeviceIdentity vendorId="1" vendorName="X" deviceId="2"/>
            <DeviceFunction><VariableCollection>
              <Variable id="V_A" index="100" accessRights="rw" dynamic="false">
                <Datatype xsi:type="UIntegerT" bitLength="8"/>
              </Variable>
              <Variable id="V_B" index="101" accessRights="ro">
                <Datatype xsi:type="UIntegerT" bitLength="8"/>
              </Variable>
            </VariableCollection></DeviceFunction></ProfileBody>"#,
        );
        let device = parse_iodd(&xml).unwrap().device;
        assert_eq!(device.variables[0].dynamic, TriState::False);
        assert_eq!(device.variables[1].dynamic, TriState::Absent);
    }

    #[test]
    fn inline_datatype_wins_over_nested_record_item_refs() {
        // The variable's own type is the RecordT; the DatatypeRef belongs to
        // the record item, not the variable.
        let xml = minimal(
            r#"<ProfileBody><DeviceIdentity vendorId="1" vendorName="X" deviceId="2"/>
            <DeviceFunction><VariableCollection>
              <Variable id="V_Rec" index="200" accessRights="rw">
                <Datatype xsi:type="RecordT" bitLength="16">
                  <RecordItem subindex="1" bitOffset="0">
                    <DatatypeRef datatypeId="DT_Custom"/>
                  </RecordItem>
                </Datatype>
              </Variable>
            </VariableCollection></DeviceFunction></ProfileBody>"#,
        );
        let device = parse_iodd(&xml).unwrap().device;
        let IoddDatatype::Record(record) = &device.variables[0].datatype else {
            panic!("expected RecordT, got {:?}", device.variables[0].datatype);
        };
        assert_eq!(
            *record.items[0].datatype,
            IoddDatatype::Reference { datatype_id: "DT_Custom".into() }
        );
    }

    #[test]
    fn std_refs_get_synthetic_indices_in_the_reserved_band() {
        let xml = minimal(
            r#"<ProfileBody><DeviceIdentity vendorId="1" vendorName="X" deviceId="2"/>
            <DeviceFunction><VariableCollection>
              <StdVariableRef id="V_VendorName"/>
              <StdVariableRef id="V_SerialNumber"/>
            </VariableCollection></DeviceFunction></ProfileBody>"#,
        );
        let device = parse_iodd(&xml).unwrap().device;
        assert_eq!(device.std_variable_refs.len(), 2);
        assert!(device.std_variable_refs.iter().all(|r| r.synthetic_index >= 9000));
        assert_eq!(device.std_variable_refs[0].order, 0);
        assert_eq!(device.std_variable_refs[1].order, 1);
    }

    #[test]
    fn events_preserve_interleaved_document_order() {
        let xml = minimal(
            r#"<ProfileBody><DeviceIdentity vendorId="1" vendorName="X" deviceId="2"/>
            <DeviceFunction><EventCollection>
              <StdEventRef code="16912"/>
              <Event code="0x1800" type="Warning"/>
              <StdEventRef code="20753"/>
            </EventCollection></DeviceFunction></ProfileBody>"#,
        );
        let device = parse_iodd(&xml).unwrap().device;
        assert_eq!(device.events.len(), 3);
        assert_eq!(device.events[0].kind, EventKind::StdRef { code: 16912 });
        assert_eq!(device.events[1].order, 1);
        assert!(matches!(device.events[1].kind, EventKind::Custom(ref e) if e.code == 0x1800));
        assert_eq!(device.events[2].kind, EventKind::StdRef { code: 20753 });
    }

    #[test]
    fn text_table_builds_primary_and_secondary_languages() {
        let xml = minimal(
            r#"<ProfileBody><DeviceIdentity vendorId="1" vendorName="X" deviceId="2">
              <DeviceName textId="TI_DN"/>
            </DeviceIdentity><DeviceFunction/></ProfileBody>
            <ExternalTextCollection>
              <PrimaryLanguage xml:lang="en"><Text id="TI_DN" value="Sensor"/></PrimaryLanguage>
              <Language xml:lang="de"><Text id="TI_DN" value="Sensor DE"/></Language>
            </ExternalTextCollection>"#,
        );
        let device = parse_iodd(&xml).unwrap().device;
        assert_eq!(device.text_table.primary_language, "en");
        assert_eq!(device.text_table.resolve("TI_DN"), Some("Sensor"));
        assert_eq!(device.text_table.resolve_in("TI_DN", "de"), Some("Sensor DE"));
        assert_eq!(device.device.device_name.as_deref(), Some("Sensor"));
    }

    #[test]
    fn missing_profile_body_is_a_diagnostic_not_an_error() {
        let outcome = parse_iodd(&minimal("")).unwrap();
        assert!(outcome.diagnostics.has_errors());
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| d.code == "IODD-P002"));
    }
}
