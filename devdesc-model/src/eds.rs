//! Normalized EDS (Electronic Data Sheet) model for EtherNet/IP devices.
//!
//! Positional entry values keep their original field count and quoting so the
//! reconstructor can decide, per field, whether to emit an empty position or
//! stop the line early.

use serde::{Deserialize, Serialize};

// --- Top-level ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EdsDevice {
    pub file_info: EdsFileInfo,
    pub device_info: EdsDeviceInfo,
    pub classifications: Vec<Vec<String>>,
    pub params: Vec<EdsParameter>,
    pub connections: Vec<EdsConnection>,
    pub assemblies: Vec<EdsAssembly>,
    pub ports: Vec<EdsPort>,
    pub modules: Vec<EdsModule>,
    pub groups: Vec<EdsGroup>,
    pub capacity: EdsCapacity,
    pub cip_objects: Vec<CipObjectSection>,
    /// Sections nothing else recognized, raw lines preserved in order.
    pub raw_sections: Vec<RawSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EdsFileInfo {
    pub desc_text: Option<String>,
    pub create_date: Option<String>,
    pub create_time: Option<String>,
    pub mod_date: Option<String>,
    pub mod_time: Option<String>,
    pub revision: Option<String>,
    pub home_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EdsDeviceInfo {
    pub vend_code: Option<u32>,
    pub vend_name: Option<String>,
    pub prod_type: Option<u32>,
    pub prod_type_str: Option<String>,
    pub prod_code: Option<u32>,
    pub maj_rev: Option<u32>,
    pub min_rev: Option<u32>,
    pub prod_name: Option<String>,
    pub catalog: Option<String>,
    pub icon: Option<String>,
}

// --- Positional fields ---

/// One comma-separated field of a positional entry. `quoted` records whether
/// the source wrapped it in double quotes; an empty unquoted value is a
/// present-but-empty position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EdsField {
    pub value: String,
    pub quoted: bool,
}

impl EdsField {
    pub fn bare(value: impl Into<String>) -> Self {
        EdsField {
            value: value.into(),
            quoted: false,
        }
    }

    pub fn quoted(value: impl Into<String>) -> Self {
        EdsField {
            value: value.into(),
            quoted: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.quoted && self.value.is_empty()
    }
}

// --- Parameters ---

/// Well-known positions within a `ParamN` entry.
pub mod param_field {
    pub const LINK_PATH_SIZE: usize = 1;
    pub const LINK_PATH: usize = 2;
    pub const DESCRIPTOR: usize = 3;
    pub const DATA_TYPE: usize = 4;
    pub const DATA_SIZE: usize = 5;
    pub const NAME: usize = 6;
    pub const UNITS: usize = 7;
    pub const HELP_STRING: usize = 8;
    pub const MIN: usize = 9;
    pub const MAX: usize = 10;
    pub const DEFAULT: usize = 11;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EdsParameter {
    pub number: u32,
    /// Positional fields exactly as present in the source, truncated where
    /// the source line stopped.
    pub fields: Vec<EdsField>,
    /// From the matching `EnumN` entry, when one exists.
    pub enums: Vec<EdsEnumValue>,
}

impl EdsParameter {
    fn field(&self, idx: usize) -> Option<&str> {
        self.fields.get(idx).map(|f| f.value.as_str())
    }

    pub fn name(&self) -> Option<&str> {
        self.field(param_field::NAME)
    }

    pub fn units(&self) -> Option<&str> {
        self.field(param_field::UNITS)
    }

    pub fn help_string(&self) -> Option<&str> {
        self.field(param_field::HELP_STRING)
    }

    pub fn data_type(&self) -> Option<&str> {
        self.field(param_field::DATA_TYPE)
    }

    pub fn default_value(&self) -> Option<&str> {
        self.field(param_field::DEFAULT)
    }

    pub fn min_value(&self) -> Option<&str> {
        self.field(param_field::MIN)
    }

    pub fn max_value(&self) -> Option<&str> {
        self.field(param_field::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdsEnumValue {
    pub value: String,
    pub label: String,
    /// Set when the source label carried a "(default)" marker; the marker
    /// itself is stripped from `label`.
    pub is_default: bool,
}

// --- Connections, ports, modules, groups ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EdsConnection {
    pub number: u32,
    pub fields: Vec<EdsField>,
}

impl EdsConnection {
    /// The quoted connection name, conventionally the last quoted field.
    pub fn name(&self) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|f| f.quoted)
            .map(|f| f.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EdsPort {
    pub number: u32,
    pub port_type: Option<String>,
    pub name: Option<String>,
    pub object_path: Option<String>,
    pub port_number: Option<String>,
}

/// Module entries can carry commas inside quoted sub-strings, hence the
/// quote-aware splitter on the parse side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EdsModule {
    pub number: u32,
    pub fields: Vec<EdsField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EdsGroup {
    pub number: u32,
    pub name: Option<String>,
    pub param_numbers: Vec<u32>,
}

// --- Assemblies ---

/// Fixed (`AssemN`) and variable (`AssemExaN`) assemblies have different
/// positional grammars and are kept as distinct shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EdsAssembly {
    Fixed(FixedAssembly),
    Variable(VariableAssembly),
}

impl EdsAssembly {
    pub fn number(&self) -> u32 {
        match self {
            EdsAssembly::Fixed(a) => a.number,
            EdsAssembly::Variable(a) => a.number,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            EdsAssembly::Fixed(a) => a.name.as_deref(),
            EdsAssembly::Variable(a) => a.name.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FixedAssembly {
    pub number: u32,
    pub name: Option<String>,
    pub path: Option<String>,
    pub size: Option<String>,
    pub descriptor: Option<String>,
    /// Two reserved positions between descriptor and the member list.
    pub reserved: Vec<EdsField>,
    pub members: Vec<AssemblyMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VariableAssembly {
    pub number: u32,
    pub name: Option<String>,
    pub path: Option<String>,
    pub descriptor: Option<String>,
    pub members: Vec<AssemblyMember>,
}

/// One (size, reference) pair from an assembly member list. Either half may
/// be an empty position in the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AssemblyMember {
    pub bit_size: Option<String>,
    pub reference: Option<String>,
}

// --- Capacity ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EdsCapacity {
    pub max_io_connections: Option<u32>,
    pub max_io_producers: Option<u32>,
    pub max_io_consumers: Option<u32>,
    pub max_msg_connections: Option<u32>,
    pub max_cip_connections: Option<u32>,
    /// Set when producer/consumer counts were backfilled from
    /// `MaxIOConnections` rather than present in the source; reconstruction
    /// must then omit them again.
    pub io_counts_backfilled: bool,
    pub tspecs: Vec<TSpec>,
    /// Vendor-dialect keys nothing recognized. Kept for reconstruction and
    /// reported as a diagnostic, not an error.
    pub unrecognized_fields: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TSpec {
    pub number: u32,
    pub direction: Option<String>,
    pub connection_size: Option<String>,
    pub packet_rate: Option<String>,
}

// --- Advanced CIP object sections ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CipObjectKind {
    Dlr,
    TcpIp,
    EthernetLink,
    Qos,
    Lldp,
}

impl CipObjectKind {
    pub fn section_name(self) -> &'static str {
        match self {
            CipObjectKind::Dlr => "DLR Class",
            CipObjectKind::TcpIp => "TCP/IP Interface Class",
            CipObjectKind::EthernetLink => "Ethernet Link Class",
            CipObjectKind::Qos => "QoS Class",
            CipObjectKind::Lldp => "LLDP Management Class",
        }
    }

    pub fn from_section_name(name: &str) -> Option<Self> {
        match name {
            "DLR Class" => Some(CipObjectKind::Dlr),
            "TCP/IP Interface Class" => Some(CipObjectKind::TcpIp),
            "Ethernet Link Class" => Some(CipObjectKind::EthernetLink),
            "QoS Class" => Some(CipObjectKind::Qos),
            "LLDP Management Class" => Some(CipObjectKind::Lldp),
            _ => None,
        }
    }
}

/// Key-value body of one of the five advanced CIP object sections, in
/// original key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CipObjectSection {
    pub kind: CipObjectKind,
    pub entries: Vec<(String, String)>,
}

// --- Raw fallback ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RawSection {
    pub name: String,
    pub lines: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_field_accessors() {
        let p = EdsParameter {
            number: 3,
            fields: vec![
                EdsField::bare("0"),
                EdsField::bare(""),
                EdsField::bare(""),
                EdsField::bare("0x0000"),
                EdsField::bare("0xC6"),
                EdsField::bare("1"),
                EdsField::quoted("Output Mode"),
                EdsField::quoted(""),
                EdsField::quoted("Selects the output mode"),
                EdsField::bare("0"),
                EdsField::bare("2"),
                EdsField::bare("0"),
            ],
            enums: Vec::new(),
        };
        assert_eq!(p.name(), Some("Output Mode"));
        assert_eq!(p.data_type(), Some("0xC6"));
        assert_eq!(p.min_value(), Some("0"));
        assert_eq!(p.max_value(), Some("2"));
        assert_eq!(p.default_value(), Some("0"));
    }

    #[test]
    fn truncated_parameter_has_no_trailing_fields() {
        let p = EdsParameter {
            number: 1,
            fields: vec![EdsField::bare("0")],
            enums: Vec::new(),
        };
        assert_eq!(p.name(), None);
        assert_eq!(p.default_value(), None);
    }

    #[test]
    fn connection_name_is_last_quoted_field() {
        let c = EdsConnection {
            number: 1,
            fields: vec![
                EdsField::bare("0x04010002"),
                EdsField::quoted("Exclusive Owner"),
            ],
        };
        assert_eq!(c.name(), Some("Exclusive Owner"));
    }

    #[test]
    fn cip_object_section_names_round_trip() {
        for kind in [
            CipObjectKind::Dlr,
            CipObjectKind::TcpIp,
            CipObjectKind::EthernetLink,
            CipObjectKind::Qos,
            CipObjectKind::Lldp,
        ] {
            assert_eq!(CipObjectKind::from_section_name(kind.section_name()), Some(kind));
        }
    }
}
