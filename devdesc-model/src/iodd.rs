//! Normalized IODD (IO-Link Device Description) model.
//!
//! Everything the reconstructor needs to regenerate the source document is
//! kept explicit: original textId references (not just resolved strings),
//! tri-state attributes, and order indices on ordering-significant lists.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tristate::TriState;

/// Schema generation detected from the root namespace URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IoddSchemaVersion {
    V1_0_1,
    #[default]
    V1_1,
}

impl IoddSchemaVersion {
    pub fn namespace(self) -> &'static str {
        match self {
            IoddSchemaVersion::V1_0_1 => "http://www.io-link.com/IODD/2009/11",
            IoddSchemaVersion::V1_1 => "http://www.io-link.com/IODD/2010/10",
        }
    }

    pub fn from_namespace(uri: &str) -> Option<Self> {
        match uri {
            "http://www.io-link.com/IODD/2009/11" => Some(IoddSchemaVersion::V1_0_1),
            "http://www.io-link.com/IODD/2010/10" => Some(IoddSchemaVersion::V1_1),
            _ => None,
        }
    }
}

// --- Top-level ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IoddDevice {
    pub schema_version: IoddSchemaVersion,
    pub document: DocumentInfo,
    pub vendor: VendorInfo,
    pub device: IoddDeviceInfo,
    /// Document order.
    pub variables: Vec<IoddVariable>,
    pub process_data: Vec<ProcessDataSet>,
    pub error_types: Vec<ErrorType>,
    /// Standard references and custom definitions interleaved in document order.
    pub events: Vec<IoddEvent>,
    pub features: DeviceFeatures,
    pub comm_profile: CommunicationProfile,
    pub menus: Vec<Menu>,
    pub role_menus: Vec<RoleMenuSet>,
    pub custom_datatypes: Vec<CustomDatatype>,
    /// Document order; empty for legacy imports that predate this capture.
    pub std_variable_refs: Vec<StdVariableRef>,
    /// Set for devices imported before standard references were captured;
    /// reconstruction then falls back to a minimal hardcoded set.
    pub legacy_import: bool,
    pub text_table: TextTable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DocumentInfo {
    pub version: Option<String>,
    pub release_date: Option<String>,
    pub copyright: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VendorInfo {
    pub vendor_id: u32,
    pub vendor_name: String,
    pub vendor_text_id: Option<String>,
    pub vendor_url_id: Option<String>,
    pub vendor_logo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IoddDeviceInfo {
    pub device_id: u32,
    /// Resolved primary-language device name, kept alongside the textId so
    /// legacy models without the id can still regenerate a reference via
    /// reverse lookup.
    pub device_name: Option<String>,
    pub device_name_text_id: Option<String>,
    pub device_family_text_id: Option<String>,
    pub product_variants: Vec<ProductVariant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub product_id: String,
    pub device_symbol: Option<String>,
    pub device_icon: Option<String>,
    pub name_text_id: Option<String>,
    pub description_text_id: Option<String>,
}

// --- Variables ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessRights {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessRights {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ro" => Some(AccessRights::ReadOnly),
            "wo" => Some(AccessRights::WriteOnly),
            "rw" => Some(AccessRights::ReadWrite),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccessRights::ReadOnly => "ro",
            AccessRights::WriteOnly => "wo",
            AccessRights::ReadWrite => "rw",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoddVariable {
    pub id: String,
    pub index: u16,
    pub subindex: Option<u8>,
    pub datatype: IoddDatatype,
    pub access_rights: Option<AccessRights>,
    pub dynamic: TriState,
    pub excluded_from_data_storage: TriState,
    pub modifies_other_variables: TriState,
    pub default_value: Option<String>,
    pub name_text_id: Option<String>,
    pub description_text_id: Option<String>,
}

/// Datatype tree. RecordT/ArrayT stay nested, never flattened, because
/// RecordItems can carry their own DatatypeRef children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IoddDatatype {
    Simple(SimpleDatatype),
    Record(RecordDatatype),
    Array(ArrayDatatype),
    /// A `<DatatypeRef datatypeId="..."/>` into the custom datatype collection.
    Reference { datatype_id: String },
}

impl Default for IoddDatatype {
    fn default() -> Self {
        IoddDatatype::Simple(SimpleDatatype::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SimpleKind {
    BooleanT,
    #[default]
    UIntegerT,
    IntegerT,
    Float32T,
    StringT,
    OctetStringT,
    TimeT,
    TimeSpanT,
}

impl SimpleKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BooleanT" => Some(SimpleKind::BooleanT),
            "UIntegerT" => Some(SimpleKind::UIntegerT),
            "IntegerT" => Some(SimpleKind::IntegerT),
            "Float32T" => Some(SimpleKind::Float32T),
            "StringT" => Some(SimpleKind::StringT),
            "OctetStringT" => Some(SimpleKind::OctetStringT),
            "TimeT" => Some(SimpleKind::TimeT),
            "TimeSpanT" => Some(SimpleKind::TimeSpanT),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SimpleKind::BooleanT => "BooleanT",
            SimpleKind::UIntegerT => "UIntegerT",
            SimpleKind::IntegerT => "IntegerT",
            SimpleKind::Float32T => "Float32T",
            SimpleKind::StringT => "StringT",
            SimpleKind::OctetStringT => "OctetStringT",
            SimpleKind::TimeT => "TimeT",
            SimpleKind::TimeSpanT => "TimeSpanT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SimpleDatatype {
    pub kind: SimpleKind,
    pub bit_length: Option<u16>,
    pub fixed_length: Option<u16>,
    pub encoding: Option<String>,
    pub min_value: Option<String>,
    pub max_value: Option<String>,
    pub single_values: Vec<SingleValue>,
    pub value_ranges: Vec<ValueRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleValue {
    pub value: String,
    pub name_text_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub lower_value: String,
    pub upper_value: String,
    pub name_text_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RecordDatatype {
    pub bit_length: Option<u16>,
    pub subindex_access_supported: TriState,
    pub items: Vec<RecordItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordItem {
    pub subindex: u8,
    pub bit_offset: u16,
    pub bit_length: Option<u16>,
    pub name_text_id: Option<String>,
    pub description_text_id: Option<String>,
    pub datatype: Box<IoddDatatype>,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayDatatype {
    pub count: u16,
    pub element: Box<IoddDatatype>,
    pub element_bit_length: Option<u16>,
    pub fixed_length: Option<u16>,
}

// --- Process data ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessDataDirection {
    In,
    Out,
}

/// One `<ProcessData>` block: optional condition plus in/out payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProcessDataSet {
    pub id: Option<String>,
    pub condition: Option<ProcessDataCondition>,
    pub input: Option<ProcessData>,
    pub output: Option<ProcessData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDataCondition {
    pub variable_id: String,
    pub subindex: Option<u8>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessData {
    pub id: String,
    pub direction: ProcessDataDirection,
    pub bit_length: u16,
    pub name_text_id: Option<String>,
    pub datatype: IoddDatatype,
}

// --- Errors and events ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorType {
    pub code: u16,
    pub additional_code: Option<u16>,
    pub name_text_id: Option<String>,
    pub description_text_id: Option<String>,
}

/// Event entry with its position in the original interleaving of standard
/// references and custom definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoddEvent {
    pub order: u32,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// `<StdEventRef code="..."/>`
    StdRef { code: u16 },
    Custom(CustomEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomEvent {
    pub code: u16,
    pub event_type: EventType,
    pub mode: Option<EventMode>,
    pub name_text_id: Option<String>,
    pub description_text_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Notification,
    Warning,
    Error,
}

impl EventType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Notification" => Some(EventType::Notification),
            "Warning" => Some(EventType::Warning),
            "Error" => Some(EventType::Error),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Notification => "Notification",
            EventType::Warning => "Warning",
            EventType::Error => "Error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventMode {
    SingleShot,
    AppearDisappear,
}

impl EventMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SingleShot" => Some(EventMode::SingleShot),
            "AppearDisappear" => Some(EventMode::AppearDisappear),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventMode::SingleShot => "SingleShot",
            EventMode::AppearDisappear => "AppearDisappear",
        }
    }
}

// --- Features and communication ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DeviceFeatures {
    pub block_parameter: TriState,
    pub data_storage: TriState,
    pub profile_characteristics: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CommunicationProfile {
    pub iolink_revision: String,
    /// COM1 / COM2 / COM3.
    pub transport_rate: Option<String>,
    pub min_cycle_time: Option<u32>,
    pub sio_supported: TriState,
    pub m_sequence_capability: Option<u32>,
}

// --- UI menus ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Menu {
    pub id: String,
    pub name_text_id: Option<String>,
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub order: u32,
    pub kind: MenuItemKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MenuItemKind {
    VariableRef {
        variable_id: String,
        subindex: Option<u8>,
        gradient: Option<String>,
        offset: Option<String>,
        unit_code: Option<u16>,
        access_rights_restriction: Option<AccessRights>,
        display_format: Option<String>,
    },
    RecordItemRef {
        variable_id: String,
        subindex: u8,
        gradient: Option<String>,
        offset: Option<String>,
        unit_code: Option<u16>,
    },
    MenuRef {
        menu_id: String,
    },
    Button {
        button_value: Option<String>,
        description_text_id: Option<String>,
        action_started_text_id: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MenuRole {
    Observer,
    Maintenance,
    Specialist,
}

impl MenuRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MenuRole::Observer => "ObserverRoleMenuSet",
            MenuRole::Maintenance => "MaintenanceRoleMenuSet",
            MenuRole::Specialist => "SpecialistRoleMenuSet",
        }
    }
}

/// Menu ids assigned to one user role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleMenuSet {
    pub role: MenuRole,
    pub identification_menu_id: Option<String>,
    pub parameter_menu_id: Option<String>,
    pub observation_menu_id: Option<String>,
    pub diagnosis_menu_id: Option<String>,
}

// --- Custom datatypes and standard references ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomDatatype {
    pub id: String,
    pub datatype: IoddDatatype,
}

/// Reference to a well-known IO-Link standard variable.
///
/// Standard refs carry no index in the source; a synthetic index from the
/// 9000+ band keeps them out of the real variable index space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StdVariableRef {
    pub id: String,
    pub order: u32,
    pub synthetic_index: u16,
    pub default_value: Option<String>,
    pub fixed_length_restriction: Option<u16>,
    pub excluded_from_data_storage: TriState,
    pub children: Vec<StdRefChild>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StdRefChild {
    SingleValue {
        value: String,
        name_text_id: Option<String>,
    },
    StdSingleValueRef {
        value: String,
    },
    StdRecordItemRef {
        subindex: u8,
        default_value: Option<String>,
    },
}

// --- Text table ---

/// Multi-language text store: textId -> language -> string.
///
/// Per-entry order indices record first-appearance order in the source so
/// reverse lookup has a stable tie-break when two textIds share a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TextTable {
    pub primary_language: String,
    pub texts: BTreeMap<String, TextEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TextEntry {
    pub order: u32,
    pub values: BTreeMap<String, String>,
}

impl TextTable {
    pub fn insert(&mut self, text_id: &str, language: &str, value: &str) {
        let next_order = self.texts.len() as u32;
        let entry = self.texts.entry(text_id.to_string()).or_insert_with(|| TextEntry {
            order: next_order,
            values: BTreeMap::new(),
        });
        entry.values.insert(language.to_string(), value.to_string());
    }

    /// Primary-language fast path.
    pub fn resolve(&self, text_id: &str) -> Option<&str> {
        self.texts
            .get(text_id)?
            .values
            .get(&self.primary_language)
            .map(String::as_str)
    }

    pub fn resolve_in(&self, text_id: &str, language: &str) -> Option<&str> {
        self.texts
            .get(text_id)?
            .values
            .get(language)
            .map(String::as_str)
    }

    /// Find the textId whose primary-language value equals `value`.
    ///
    /// When several textIds map to the same string the one with the lowest
    /// original order index wins. Nothing in the source formats records
    /// which id the original author meant, so this is a stable convention,
    /// not a recovered fact.
    pub fn reverse_lookup(&self, value: &str) -> Option<&str> {
        self.texts
            .iter()
            .filter(|(_, entry)| {
                entry.values.get(&self.primary_language).map(String::as_str) == Some(value)
            })
            .min_by_key(|(_, entry)| entry.order)
            .map(|(id, _)| id.as_str())
    }

    pub fn languages(&self) -> Vec<&str> {
        let mut langs: Vec<&str> = self
            .texts
            .values()
            .flat_map(|e| e.values.keys().map(String::as_str))
            .collect();
        langs.sort_unstable();
        langs.dedup();
        langs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_table_resolve() {
        let mut t = TextTable {
            primary_language: "en".into(),
            ..Default::default()
        };
        t.insert("TI_Name", "en", "Sensor");
        t.insert("TI_Name", "de", "Sensor (DE)");
        assert_eq!(t.resolve("TI_Name"), Some("Sensor"));
        assert_eq!(t.resolve_in("TI_Name", "de"), Some("Sensor (DE)"));
        assert_eq!(t.resolve("TI_Missing"), None);
    }

    #[test]
    fn reverse_lookup_prefers_lowest_order() {
        let mut t = TextTable {
            primary_language: "en".into(),
            ..Default::default()
        };
        t.insert("TI_A", "en", "Duplicate");
        t.insert("TI_B", "en", "Duplicate");
        // TI_A was inserted first, so it carries the lower order index.
        assert_eq!(t.reverse_lookup("Duplicate"), Some("TI_A"));
    }

    #[test]
    fn schema_version_from_namespace() {
        assert_eq!(
            IoddSchemaVersion::from_namespace("http://www.io-link.com/IODD/2010/10"),
            Some(IoddSchemaVersion::V1_1)
        );
        assert_eq!(
            IoddSchemaVersion::from_namespace("http://www.io-link.com/IODD/2009/11"),
            Some(IoddSchemaVersion::V1_0_1)
        );
        assert_eq!(IoddSchemaVersion::from_namespace("http://example.com"), None);
    }
}
