//! IODD (IO-Link Device Description) parsing, reconstruction, and
//! round-trip diff analysis.
//!
//! The pipeline is parse -> normalized model -> reconstruct -> diff: the
//! writer walks only the model, and the diff compares original against
//! reconstructed text to measure what the parse/store round trip lost.

pub mod diff;
pub mod parser;
pub mod stdrefs;
pub mod writer;
pub mod xml_tree;

pub use diff::analyze_iodd;
pub use parser::{parse_iodd, IoddParseError, IoddParseOutcome};
pub use writer::write_iodd;
pub use xml_tree::{read_tree, write_tree, XmlElement, XmlReadError, XmlWriteError};
