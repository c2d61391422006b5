pub mod diff;
pub mod package;
pub mod parser;
pub mod sections;
pub mod writer;

pub use diff::analyze_eds;
pub use package::{
    read_eds_package, read_eds_package_bytes, read_eds_package_from_reader, PackageEntry,
};
pub use parser::{decode_eds_bytes, parse_eds, parse_eds_bytes, EdsParseError, EdsParseOutcome};
pub use sections::{EdsDocument, EdsSection, EdsSplitError};
pub use writer::write_eds;
