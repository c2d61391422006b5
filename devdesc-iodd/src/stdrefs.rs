//! Well-known IO-Link standard variable definitions.
//!
//! `StdVariableRef` elements carry only an id in the document; the datatype
//! and access rights come from the IO-Link specification. This table covers
//! the ids that occur in practice so a reference can be resolved into a full
//! variable view without consulting the schema.

use devdesc_model::{AccessRights, SimpleKind};

/// Fixed properties of a standard variable, keyed by its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StdVariableDef {
    pub id: &'static str,
    pub kind: SimpleKind,
    pub access_rights: AccessRights,
    /// Bit length for scalar kinds, byte length for string kinds.
    pub length: u16,
}

const RO: AccessRights = AccessRights::ReadOnly;
const WO: AccessRights = AccessRights::WriteOnly;
const RW: AccessRights = AccessRights::ReadWrite;

/// Table order matches the index assignment band; do not reorder.
pub const STD_VARIABLES: &[StdVariableDef] = &[
    StdVariableDef { id: "V_DirectParameters_1", kind: SimpleKind::OctetStringT, access_rights: RO, length: 16 },
    StdVariableDef { id: "V_DirectParameters_2", kind: SimpleKind::OctetStringT, access_rights: RW, length: 16 },
    StdVariableDef { id: "V_SystemCommand", kind: SimpleKind::UIntegerT, access_rights: WO, length: 8 },
    StdVariableDef { id: "V_DataStorageIndex", kind: SimpleKind::OctetStringT, access_rights: RW, length: 140 },
    StdVariableDef { id: "V_DeviceAccessLocks", kind: SimpleKind::UIntegerT, access_rights: RW, length: 16 },
    StdVariableDef { id: "V_ProfileCharacteristic", kind: SimpleKind::OctetStringT, access_rights: RO, length: 64 },
    StdVariableDef { id: "V_PDInputDescriptor", kind: SimpleKind::OctetStringT, access_rights: RO, length: 96 },
    StdVariableDef { id: "V_PDOutputDescriptor", kind: SimpleKind::OctetStringT, access_rights: RO, length: 96 },
    StdVariableDef { id: "V_VendorName", kind: SimpleKind::StringT, access_rights: RO, length: 64 },
    StdVariableDef { id: "V_VendorText", kind: SimpleKind::StringT, access_rights: RO, length: 64 },
    StdVariableDef { id: "V_ProductName", kind: SimpleKind::StringT, access_rights: RO, length: 64 },
    StdVariableDef { id: "V_ProductID", kind: SimpleKind::StringT, access_rights: RO, length: 64 },
    StdVariableDef { id: "V_ProductText", kind: SimpleKind::StringT, access_rights: RO, length: 64 },
    StdVariableDef { id: "V_SerialNumber", kind: SimpleKind::StringT, access_rights: RO, length: 16 },
    StdVariableDef { id: "V_HardwareRevision", kind: SimpleKind::StringT, access_rights: RO, length: 64 },
    StdVariableDef { id: "V_FirmwareRevision", kind: SimpleKind::StringT, access_rights: RO, length: 64 },
    StdVariableDef { id: "V_ApplicationSpecificTag", kind: SimpleKind::StringT, access_rights: RW, length: 32 },
    StdVariableDef { id: "V_FunctionTag", kind: SimpleKind::StringT, access_rights: RW, length: 32 },
    StdVariableDef { id: "V_LocationTag", kind: SimpleKind::StringT, access_rights: RW, length: 32 },
    StdVariableDef { id: "V_ErrorCount", kind: SimpleKind::UIntegerT, access_rights: RO, length: 16 },
    StdVariableDef { id: "V_DeviceStatus", kind: SimpleKind::UIntegerT, access_rights: RO, length: 8 },
    StdVariableDef { id: "V_DetailedDeviceStatus", kind: SimpleKind::OctetStringT, access_rights: RO, length: 192 },
];

/// Base of the synthetic index band for known standard references.
const KNOWN_BASE: u16 = 9000;
/// Unknown ids get indices from a separate band so they stay distinguishable.
const UNKNOWN_BASE: u16 = 9500;

pub fn lookup(id: &str) -> Option<&'static StdVariableDef> {
    STD_VARIABLES.iter().find(|d| d.id == id)
}

/// Synthetic index for a standard reference. Known ids map by table
/// position, unknown ids by their document order in a separate band.
pub fn synthetic_index(id: &str, order: u32) -> u16 {
    match STD_VARIABLES.iter().position(|d| d.id == id) {
        Some(pos) => KNOWN_BASE + pos as u16,
        None => UNKNOWN_BASE + (order % 500) as u16,
    }
}

/// The minimal reference set every conformant device exposes. Used when a
/// legacy model predates reference capture and the list must be rebuilt.
pub const FALLBACK_IDS: &[&str] = &[
    "V_VendorName",
    "V_ProductName",
    "V_SerialNumber",
    "V_ApplicationSpecificTag",
    "V_SystemCommand",
];

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lookup_known_id() {
        let def = lookup("V_SerialNumber").unwrap();
        assert_eq!(def.kind, SimpleKind::StringT);
        assert_eq!(def.access_rights, AccessRights::ReadOnly);
    }

    #[test]
    fn synthetic_indices_are_stable_and_banded() {
        assert_eq!(synthetic_index("V_DirectParameters_1", 0), 9000);
        assert_eq!(synthetic_index("V_DirectParameters_1", 42), 9000);
        let unknown = synthetic_index("V_VendorSpecific_99", 3);
        assert_eq!(unknown, 9503);
    }

    #[test]
    fn table_ids_are_unique() {
        for (i, a) in STD_VARIABLES.iter().enumerate() {
            for b in &STD_VARIABLES[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }

    #[test]
    fn fallback_ids_are_all_known() {
        for id in FALLBACK_IDS {
            assert!(lookup(id).is_some(), "{id} missing from table");
        }
    }
}
