//! Declarative validation rules over finished models.
//!
//! Rules only annotate the diagnostic trail; they never abort a parse.
//! Required fields raise errors, recommended fields raise warnings (errors
//! under strict mode), per-entity sanity checks raise warnings.

use crate::diagnostics::{DiagnosticCollector, Severity, SourceLocation};
use crate::eds::EdsDevice;
use crate::iodd::IoddDevice;

#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationOptions {
    /// Elevate recommended-field findings from warning to error.
    pub strict: bool,
}

impl ValidationOptions {
    fn recommended_severity(self) -> Severity {
        if self.strict {
            Severity::Error
        } else {
            Severity::Warning
        }
    }
}

struct Rule<T> {
    code: &'static str,
    section: &'static str,
    message: &'static str,
    required: bool,
    check: fn(&T) -> bool,
}

fn run_rules<T>(
    rules: &[Rule<T>],
    model: &T,
    options: ValidationOptions,
    diagnostics: &mut DiagnosticCollector,
) {
    for rule in rules {
        if !(rule.check)(model) {
            let severity = if rule.required {
                Severity::Error
            } else {
                options.recommended_severity()
            };
            diagnostics.add(
                rule.code,
                severity,
                SourceLocation::section(rule.section),
                rule.message,
            );
        }
    }
}

const EDS_RULES: &[Rule<EdsDevice>] = &[
    Rule {
        code: "EDS-V001",
        section: "Device",
        message: "VendCode is required",
        required: true,
        check: |d| d.device_info.vend_code.is_some(),
    },
    Rule {
        code: "EDS-V002",
        section: "Device",
        message: "ProdCode is required",
        required: true,
        check: |d| d.device_info.prod_code.is_some(),
    },
    Rule {
        code: "EDS-V003",
        section: "Device",
        message: "ProdName is required",
        required: true,
        check: |d| d.device_info.prod_name.as_deref().is_some_and(|n| !n.is_empty()),
    },
    Rule {
        code: "EDS-V004",
        section: "File",
        message: "DescText is recommended",
        required: false,
        check: |d| d.file_info.desc_text.is_some(),
    },
    Rule {
        code: "EDS-V005",
        section: "File",
        message: "Revision is recommended",
        required: false,
        check: |d| d.file_info.revision.is_some(),
    },
    Rule {
        code: "EDS-V006",
        section: "Device",
        message: "VendName is recommended",
        required: false,
        check: |d| d.device_info.vend_name.is_some(),
    },
];

const IODD_RULES: &[Rule<IoddDevice>] = &[
    Rule {
        code: "IODD-V001",
        section: "DeviceIdentity",
        message: "vendorId is required",
        required: true,
        check: |d| d.vendor.vendor_id != 0,
    },
    Rule {
        code: "IODD-V002",
        section: "DeviceIdentity",
        message: "deviceId is required",
        required: true,
        check: |d| d.device.device_id != 0,
    },
    Rule {
        code: "IODD-V003",
        section: "DeviceIdentity",
        message: "vendorName is recommended",
        required: false,
        check: |d| !d.vendor.vendor_name.is_empty(),
    },
    Rule {
        code: "IODD-V004",
        section: "ExternalTextCollection",
        message: "a primary language should be designated",
        required: false,
        check: |d| !d.text_table.primary_language.is_empty(),
    },
    Rule {
        code: "IODD-V005",
        section: "CommNetworkProfile",
        message: "IO-Link revision is recommended",
        required: false,
        check: |d| !d.comm_profile.iolink_revision.is_empty(),
    },
];

/// Validate an EDS model, appending findings to the diagnostic trail.
pub fn validate_eds(
    device: &EdsDevice,
    options: ValidationOptions,
    diagnostics: &mut DiagnosticCollector,
) {
    run_rules(EDS_RULES, device, options, diagnostics);

    // Per-entity sanity: entries without a name are suspicious but legal.
    for param in &device.params {
        if param.name().unwrap_or("").is_empty() {
            diagnostics.warning(
                "EDS-V010",
                SourceLocation::section("Params"),
                format!("Param{} has no name", param.number),
            );
        }
    }
    for conn in &device.connections {
        if conn.name().unwrap_or("").is_empty() {
            diagnostics.warning(
                "EDS-V011",
                SourceLocation::section("Connection Manager"),
                format!("Connection{} has no name", conn.number),
            );
        }
    }
}

/// Validate an IODD model, appending findings to the diagnostic trail.
pub fn validate_iodd(
    device: &IoddDevice,
    options: ValidationOptions,
    diagnostics: &mut DiagnosticCollector,
) {
    run_rules(IODD_RULES, device, options, diagnostics);

    for variable in &device.variables {
        if variable.name_text_id.is_none() {
            diagnostics.warning(
                "IODD-V010",
                SourceLocation::section("VariableCollection"),
                format!("variable '{}' has no Name textId", variable.id),
            );
        } else if let Some(text_id) = &variable.name_text_id {
            if device.text_table.resolve(text_id).is_none() {
                diagnostics.warning(
                    "IODD-V011",
                    SourceLocation::section("VariableCollection"),
                    format!(
                        "variable '{}' references unresolved textId '{}'",
                        variable.id, text_id
                    ),
                );
            }
        }
    }

    for menu in &device.menus {
        if menu.items.is_empty() {
            diagnostics.warning(
                "IODD-V012",
                SourceLocation::section("UserInterface"),
                format!("menu '{}' has no items", menu.id),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eds::{EdsField, EdsParameter};

    #[test]
    fn eds_missing_required_fields_are_errors() {
        let device = EdsDevice::default();
        let mut diags = DiagnosticCollector::new();
        validate_eds(&device, ValidationOptions::default(), &mut diags);
        assert!(diags.has_errors());
        assert!(diags.iter().any(|d| d.code == "EDS-V001"));
    }

    #[test]
    fn strict_mode_elevates_recommended() {
        let mut device = EdsDevice::default();
        device.device_info.vend_code = Some(1);
        device.device_info.prod_code = Some(2);
        device.device_info.prod_name = Some("X".into());

        let mut lax = DiagnosticCollector::new();
        validate_eds(&device, ValidationOptions { strict: false }, &mut lax);
        assert!(!lax.has_errors());
        assert!(lax.has_warnings());

        let mut strict = DiagnosticCollector::new();
        validate_eds(&device, ValidationOptions { strict: true }, &mut strict);
        assert!(strict.has_errors());
    }

    #[test]
    fn unnamed_param_warns() {
        let mut device = EdsDevice::default();
        device.params.push(EdsParameter {
            number: 7,
            fields: vec![EdsField::bare("0")],
            enums: Vec::new(),
        });
        let mut diags = DiagnosticCollector::new();
        validate_eds(&device, ValidationOptions::default(), &mut diags);
        assert!(diags.iter().any(|d| d.code == "EDS-V010"));
    }

    #[test]
    fn iodd_unresolved_text_id_warns() {
        let mut device = IoddDevice::default();
        device.vendor.vendor_id = 1;
        device.device.device_id = 1;
        device.variables.push(crate::iodd::IoddVariable {
            id: "V_Test".into(),
            index: 64,
            subindex: None,
            datatype: crate::iodd::IoddDatatype::default(),
            access_rights: None,
            dynamic: crate::TriState::Absent,
            excluded_from_data_storage: crate::TriState::Absent,
            modifies_other_variables: crate::TriState::Absent,
            default_value: None,
            name_text_id: Some("TI_Missing".into()),
            description_text_id: None,
        });
        let mut diags = DiagnosticCollector::new();
        validate_iodd(&device, ValidationOptions::default(), &mut diags);
        assert!(diags.iter().any(|d| d.code == "IODD-V011"));
    }
}
