//! Tolerant XML tree with ordered attributes.
//!
//! quick-xml's serde layer cannot tell an absent attribute from a defaulted
//! one, and it does not preserve attribute order. Both matter here, so the
//! tree is built from an explicit event loop and written back the same way.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlReadError {
    #[error("XML parsing error at position {position}: {message}")]
    Malformed { position: u64, message: String },
    #[error("document has no root element")]
    NoRoot,
}

#[derive(Debug, Error)]
pub enum XmlWriteError {
    #[error("XML serialization failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialized XML is not valid UTF-8")]
    Encoding,
}

/// One element. Attribute order is the source order; `text` is the trimmed
/// character content, absent when the element held none.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: Option<String>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        XmlElement {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Add the attribute only when a value is present.
    pub fn set_opt_attr(&mut self, name: &str, value: Option<impl Into<String>>) -> &mut Self {
        if let Some(v) = value {
            self.attributes.push((name.to_string(), v.into()));
        }
        self
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn add_child(&mut self, child: XmlElement) -> &mut Self {
        self.children.push(child);
        self
    }

    /// Walk a `/`-separated path of child names.
    pub fn find(&self, path: &str) -> Option<&XmlElement> {
        let mut current = self;
        for part in path.split('/') {
            current = current.child(part)?;
        }
        Some(current)
    }

    /// Total element count of this subtree, itself included.
    pub fn element_count(&self) -> u32 {
        1 + self.children.iter().map(XmlElement::element_count).sum::<u32>()
    }

    /// Total attribute count of this subtree.
    pub fn attribute_count(&self) -> u32 {
        self.attributes.len() as u32
            + self.children.iter().map(XmlElement::attribute_count).sum::<u32>()
    }
}

/// Parse XML text into a tree. Unknown content is kept as-is; the only
/// failure is malformed XML or a document without a root element.
pub fn read_tree(xml: &str) -> Result<XmlElement, XmlReadError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                stack.push(element_from_start(e)?);
            }
            Ok(Event::Empty(ref e)) => {
                let element = element_from_start(e)?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::Text(ref t)) => {
                if let Some(current) = stack.last_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| malformed(&reader, &e.to_string()))?
                        .trim()
                        .to_string();
                    if !text.is_empty() {
                        current.text = Some(text);
                    }
                }
            }
            Ok(Event::End(_)) => {
                let element = stack.pop().ok_or_else(|| malformed(&reader, "unbalanced end tag"))?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(malformed(&reader, &e.to_string())),
        }
    }

    root.ok_or(XmlReadError::NoRoot)
}

fn element_from_start(e: &BytesStart<'_>) -> Result<XmlElement, XmlReadError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
    let mut element = XmlElement::new(local_name(&name));

    for attr in e.attributes().with_checks(false).flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = String::from_utf8_lossy(&attr.value).to_string();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(stack: &mut Vec<XmlElement>, root: &mut Option<XmlElement>, element: XmlElement) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_none() {
        *root = Some(element);
    }
    // Trailing garbage after the root element is tolerated and dropped.
}

fn malformed(reader: &Reader<&[u8]>, message: &str) -> XmlReadError {
    XmlReadError::Malformed {
        position: reader.buffer_position(),
        message: message.to_string(),
    }
}

/// Strip a namespace prefix; IODD documents are single-namespace and the
/// diff matches on local names.
fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// Serialize a tree back to indented XML with a declaration line.
pub fn write_tree(root: &XmlElement) -> Result<String, XmlWriteError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_element(&mut writer, root)?;
    let body = String::from_utf8(writer.into_inner()).map_err(|_| XmlWriteError::Encoding)?;
    Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}"))
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<(), XmlWriteError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (name, value) in &element.attributes {
        start.push_attribute((name.as_str(), value.as_str()));
    }

    if element.children.is_empty() && element.text.is_none() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if let Some(text) = &element.text {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_nested_elements_and_attributes_in_order() {
        let xml = r#"<Root b="2" a="1"><Child x="y"/><Child/></Root>"#;
        let tree = read_tree(xml).unwrap();
        assert_eq!(tree.name, "Root");
        assert_eq!(tree.attributes, vec![("b".into(), "2".into()), ("a".into(), "1".into())]);
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].attr("x"), Some("y"));
    }

    #[test]
    fn captures_text_content() {
        let tree = read_tree("<A><B> hello </B></A>").unwrap();
        assert_eq!(tree.child("B").unwrap().text.as_deref(), Some("hello"));
    }

    #[test]
    fn strips_namespace_prefixes() {
        let tree = read_tree(r#"<io:Device xmlns:io="urn:x"><io:Name/></io:Device>"#).unwrap();
        assert_eq!(tree.name, "Device");
        assert!(tree.child("Name").is_some());
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(read_tree("<A><B></A>").is_err());
        assert!(read_tree("plain text").is_err());
    }

    #[test]
    fn write_then_read_is_identity() {
        let mut root = XmlElement::new("Device");
        root.set_attr("id", "7");
        let mut name = XmlElement::new("Name");
        name.set_attr("textId", "TI_X");
        root.add_child(name);
        let mut desc = XmlElement::new("Description");
        desc.text = Some("hello".into());
        root.add_child(desc);

        let xml = write_tree(&root).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\""));
        let reread = read_tree(&xml).unwrap();
        assert_eq!(reread, root);
    }

    #[test]
    fn element_and_attribute_counts() {
        let tree = read_tree(r#"<A x="1"><B y="2" z="3"/><C/></A>"#).unwrap();
        assert_eq!(tree.element_count(), 3);
        assert_eq!(tree.attribute_count(), 3);
    }
}
