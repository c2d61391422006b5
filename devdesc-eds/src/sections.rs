//! EDS text splitting: raw text -> named sections -> key/value entries.
//!
//! An explicit line scanner, not a regex chain. The grammar it tolerates:
//! `[Name]` section headers, `Key = value` entries terminated by `;`,
//! multi-line continuation values, inline `$` comments, and quoted strings
//! that may contain `,`, `;`, and `$`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EdsSplitError {
    #[error("no section headers found; document is not an EDS file")]
    NoSections,
    #[error("document is empty")]
    Empty,
}

/// One `Key = value` entry. The value keeps its original quoting and has
/// comments, the trailing `;`, and outer whitespace stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdsEntry {
    pub key: String,
    pub value: String,
    /// 1-based line of the key within the document.
    pub line: u32,
    /// Set when the entry was flushed without a terminating `;`.
    pub unterminated: bool,
}

/// A named section with both structured entries and the raw line content
/// (comments and blank lines included) for sub-parsers that need it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdsSection {
    pub name: String,
    /// 1-based line of the `[Name]` header.
    pub line: u32,
    pub raw_lines: Vec<String>,
    pub entries: Vec<EdsEntry>,
}

impl EdsSection {
    pub fn entry(&self, key: &str) -> Option<&EdsEntry> {
        self.entries
            .iter()
            .find(|e| e.key.eq_ignore_ascii_case(key))
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.entry(key).map(|e| e.value.as_str())
    }
}

/// Section-split EDS document, section order preserved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EdsDocument {
    pub sections: Vec<EdsSection>,
}

impl EdsDocument {
    /// Split raw EDS text into sections.
    ///
    /// Fails only when the text contains content but no section header at
    /// all; every lesser malformation is tolerated.
    pub fn parse(text: &str) -> Result<Self, EdsSplitError> {
        if text.trim().is_empty() {
            return Err(EdsSplitError::Empty);
        }

        let mut sections: Vec<EdsSection> = Vec::new();
        let mut current: Option<EdsSection> = None;
        let mut pending: Option<PendingEntry> = None;

        for (idx, raw_line) in text.lines().enumerate() {
            let line_no = (idx + 1) as u32;
            let stripped = strip_comment(raw_line);
            let trimmed = stripped.trim();

            if let Some(name) = parse_section_header(trimmed) {
                if let Some(section) = current.as_mut() {
                    if let Some(p) = pending.take() {
                        section.entries.push(p.finish(true));
                    }
                }
                if let Some(section) = current.take() {
                    sections.push(section);
                }
                current = Some(EdsSection {
                    name,
                    line: line_no,
                    raw_lines: Vec::new(),
                    entries: Vec::new(),
                });
                continue;
            }

            let Some(section) = current.as_mut() else {
                // Content before the first header: comments and blank lines
                // are normal, anything else is ignored here and the parser
                // decides whether the whole document was unsectionable.
                continue;
            };
            section.raw_lines.push(raw_line.to_string());

            if trimmed.is_empty() {
                continue;
            }

            if let Some(p) = pending.as_mut() {
                // Continuation of a multi-line value.
                p.append(trimmed);
                if p.terminated {
                    section.entries.push(pending.take().unwrap().finish(false));
                }
                continue;
            }

            if let Some((key, rest)) = split_key_value(trimmed) {
                let mut p = PendingEntry::new(key, line_no);
                p.append(rest);
                if p.terminated {
                    section.entries.push(p.finish(false));
                } else {
                    pending = Some(p);
                }
            }
            // A non-empty line that is neither a header, a key, nor a
            // continuation is tolerated noise.
        }

        if let Some(section) = current.as_mut() {
            if let Some(p) = pending.take() {
                section.entries.push(p.finish(true));
            }
        }
        if let Some(section) = current.take() {
            sections.push(section);
        }

        if sections.is_empty() {
            return Err(EdsSplitError::NoSections);
        }
        Ok(EdsDocument { sections })
    }

    pub fn section(&self, name: &str) -> Option<&EdsSection> {
        self.sections
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }
}

struct PendingEntry {
    key: String,
    value: String,
    line: u32,
    terminated: bool,
}

impl PendingEntry {
    fn new(key: &str, line: u32) -> Self {
        PendingEntry {
            key: key.to_string(),
            value: String::new(),
            line,
            terminated: false,
        }
    }

    fn append(&mut self, segment: &str) {
        let (body, terminated) = take_until_semicolon(segment);
        let body = body.trim();
        if !body.is_empty() {
            if !self.value.is_empty() && !self.value.ends_with(',') && !self.value.ends_with('=') {
                self.value.push(' ');
            }
            self.value.push_str(body);
        }
        if terminated {
            self.terminated = true;
        }
    }

    fn finish(self, unterminated: bool) -> EdsEntry {
        EdsEntry {
            key: self.key,
            value: self.value,
            line: self.line,
            unterminated: unterminated && !self.terminated,
        }
    }
}

/// Strip an inline `$` comment, honoring quotes.
fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '$' if !in_quotes => return &line[..i],
            _ => {}
        }
    }
    line
}

fn parse_section_header(line: &str) -> Option<String> {
    let rest = line.strip_prefix('[')?;
    let end = rest.find(']')?;
    Some(rest[..end].trim().to_string())
}

/// Split `Key = value` at the first `=` outside quotes.
fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let mut in_quotes = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '=' if !in_quotes => {
                let key = line[..i].trim();
                if key.is_empty() || key.contains('[') {
                    return None;
                }
                return Some((key, line[i + 1..].trim_start()));
            }
            _ => {}
        }
    }
    None
}

/// Take text up to a `;` outside quotes. Returns (body, saw_terminator).
fn take_until_semicolon(segment: &str) -> (&str, bool) {
    let mut in_quotes = false;
    for (i, c) in segment.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => return (&segment[..i], true),
            _ => {}
        }
    }
    (segment, false)
}

/// Split a value into positional fields at commas, quote-aware: commas
/// inside quoted sub-strings do not split. Quotes are stripped and the
/// quoted-ness of each field is recorded.
pub fn split_fields(value: &str) -> Vec<devdesc_model::EdsField> {
    let mut fields = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let mut quoted = false;

    for c in value.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            ',' if !in_quotes => {
                fields.push(make_field(&buf, quoted));
                buf.clear();
                quoted = false;
            }
            _ => buf.push(c),
        }
    }
    if !buf.trim().is_empty() || quoted || !fields.is_empty() {
        fields.push(make_field(&buf, quoted));
    }
    fields
}

fn make_field(buf: &str, quoted: bool) -> devdesc_model::EdsField {
    devdesc_model::EdsField {
        // Quoted content keeps interior whitespace; bare fields are trimmed.
        value: if quoted {
            buf.to_string()
        } else {
            buf.trim().to_string()
        },
        quoted,
    }
}

/// Drop trailing empty positions, the usual shape of `...,,,;` lines.
pub fn trim_trailing_empty(mut fields: Vec<devdesc_model::EdsField>) -> Vec<devdesc_model::EdsField> {
    while fields.last().is_some_and(devdesc_model::EdsField::is_empty) {
        fields.pop();
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_named_sections() {
        let doc = EdsDocument::parse("[File]\nDescText = \"x\";\n[Device]\nVendCode = 1;\n").unwrap();
        assert_eq!(doc.sections.len(), 2);
        assert_eq!(doc.sections[0].name, "File");
        assert_eq!(doc.sections[1].name, "Device");
    }

    #[test]
    fn entry_value_keeps_quoting_and_ignores_quoted_delimiters() {
        let doc = EdsDocument::parse("[File]\nDescText = \"A, B; $ C\";\n").unwrap();
        let entry = doc.section("File").unwrap().entry("DescText").unwrap();
        assert_eq!(entry.value, "\"A, B; $ C\"");
        assert!(!entry.unterminated);
    }

    #[test]
    fn dollar_comment_is_stripped_outside_quotes() {
        let doc = EdsDocument::parse("[Device]\nVendCode = 1; $ vendor id\n").unwrap();
        assert_eq!(doc.section("Device").unwrap().value("VendCode"), Some("1"));
    }

    #[test]
    fn multi_line_continuation() {
        let text = "[Params]\nParam1 =\n 0,,,0x0000,0xC6,\n 1,\"Speed\",\"rpm\",\"\",0,100,50;\n";
        let doc = EdsDocument::parse(text).unwrap();
        let entry = doc.section("Params").unwrap().entry("Param1").unwrap();
        assert!(entry.value.starts_with("0,,,0x0000,0xC6,1,"));
        assert!(!entry.unterminated);
    }

    #[test]
    fn missing_semicolon_is_tolerated() {
        let text = "[Device]\nVendCode = 1\n[File]\nRevision = 1.1;\n";
        let doc = EdsDocument::parse(text).unwrap();
        let entry = doc.section("Device").unwrap().entry("VendCode").unwrap();
        assert_eq!(entry.value, "1");
        assert!(entry.unterminated);
    }

    #[test]
    fn raw_lines_keep_comments_and_blanks() {
        let text = "[Params]\n$ a comment\n\nParam1 = 0;\n";
        let doc = EdsDocument::parse(text).unwrap();
        assert_eq!(
            doc.section("Params").unwrap().raw_lines,
            vec!["$ a comment", "", "Param1 = 0;"]
        );
    }

    #[test]
    fn unsectionable_text_fails() {
        assert!(matches!(
            EdsDocument::parse("just some text\nno headers\n"),
            Err(EdsSplitError::NoSections)
        ));
        assert!(matches!(EdsDocument::parse("  \n"), Err(EdsSplitError::Empty)));
    }

    #[test]
    fn split_fields_quote_aware() {
        let fields = split_fields("0,\"On, or Off\",20 Bytes");
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].value, "0");
        assert!(!fields[0].quoted);
        assert_eq!(fields[1].value, "On, or Off");
        assert!(fields[1].quoted);
        assert_eq!(fields[2].value, "20 Bytes");
    }

    #[test]
    fn split_fields_keeps_empty_positions() {
        let fields = split_fields("0,,,0x0000");
        assert_eq!(fields.len(), 4);
        assert!(fields[1].is_empty());
        assert!(fields[2].is_empty());
    }

    #[test]
    fn trim_trailing_empty_positions() {
        let fields = trim_trailing_empty(split_fields("1,2,,,"));
        assert_eq!(fields.len(), 2);
    }
}
