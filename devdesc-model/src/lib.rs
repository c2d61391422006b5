pub mod diagnostics;
pub mod eds;
pub mod iodd;
pub mod quality;
pub mod tristate;
pub mod validate;

pub use diagnostics::{Diagnostic, DiagnosticCollector, Severity, SourceLocation};
pub use eds::*;
pub use iodd::*;
pub use quality::*;
pub use tristate::TriState;
pub use validate::{validate_eds, validate_iodd, ValidationOptions};
