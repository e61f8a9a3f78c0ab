// XML to element-tree parser built on quick-xml
use crate::tree::{Content, Document, Element, NodeId};
use crate::{Error, Result};
use compact_str::CompactString;
#[cfg(feature = "mmap")]
use memmap2::Mmap;
use quick_xml::escape::unescape;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
#[cfg(feature = "mmap")]
use std::fs::File;
use std::path::Path;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

pub struct Parser {
    keep_whitespace: bool,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            keep_whitespace: true,
        }
    }

    /// Drop text runs made only of whitespace (usually indentation between
    /// elements). A leaf holding only whitespace then reads as empty text.
    pub fn keep_whitespace(mut self, keep: bool) -> Self {
        self.keep_whitespace = keep;
        self
    }

    #[cfg(not(feature = "mmap"))]
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Document> {
        let content = std::fs::read(path)?;
        self.parse_bytes(&content)
    }

    #[cfg(feature = "mmap")]
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Document> {
        let file = File::open(path)?;
        // SAFETY: reading the map is undefined behaviour if another process
        // truncates or modifies the file while it is mapped. The caller must
        // not point this at a ledger that is still being written.
        let map = unsafe { Mmap::map(&file)? };
        self.parse_bytes(&map)
    }

    pub fn parse_str(&self, xml: &str) -> Result<Document> {
        self.parse_bytes(xml.as_bytes())
    }

    pub fn parse_bytes(&self, data: &[u8]) -> Result<Document> {
        let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);

        let mut builder = TreeBuilder::new();
        let mut reader = Reader::from_reader(data);
        let mut buf = Vec::new();

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|e| {
                Error::Parse(format!(
                    "XML error at byte {}: {}",
                    reader.buffer_position(),
                    e
                ))
            })?;

            match event {
                Event::Start(e) => {
                    builder.open(tag_name(e.name().as_ref(), reader.buffer_position())?);
                }
                Event::Empty(e) => {
                    builder.open(tag_name(e.name().as_ref(), reader.buffer_position())?);
                    builder.close(reader.buffer_position())?;
                }
                Event::End(_) => builder.close(reader.buffer_position())?,
                Event::Text(e) => {
                    // Line endings are normalised before unescaping so that a
                    // `&#13;` reference still yields a literal carriage return.
                    let text = reader
                        .decoder()
                        .decode(&e)
                        .map_err(|err| err.to_string())
                        .and_then(|raw| {
                            unescape(&normalize_newlines(&raw))
                                .map(Cow::into_owned)
                                .map_err(|err| err.to_string())
                        })
                        .map_err(|err| {
                            Error::Parse(format!(
                                "bad text at byte {}: {}",
                                reader.buffer_position(),
                                err
                            ))
                        })?;
                    if self.keep_whitespace || !text.trim().is_empty() {
                        builder.text(&text);
                    }
                }
                Event::CData(e) => {
                    let raw = e.into_inner();
                    let text = std::str::from_utf8(&raw).map_err(|_| {
                        Error::Parse(format!(
                            "invalid UTF-8 in CDATA at byte {}",
                            reader.buffer_position()
                        ))
                    })?;
                    builder.text(&normalize_newlines(text));
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions and doctype
                // carry no ledger data.
                _ => {}
            }

            buf.clear();
        }

        let doc = builder.finish(reader.buffer_position())?;
        log::debug!("parsed {} elements from {} bytes", doc.len(), data.len());
        Ok(doc)
    }
}

/// XML end-of-line handling: `\r\n` and lone `\r` both read as `\n`.
fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}

fn tag_name(raw: &[u8], position: impl std::fmt::Display) -> Result<CompactString> {
    std::str::from_utf8(raw)
        .map(CompactString::from)
        .map_err(|_| Error::Parse(format!("invalid UTF-8 in tag name at byte {}", position)))
}

/// Assembles the pre-order arena while events stream past.
struct TreeBuilder {
    doc: Document,
    open: Vec<NodeId>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            doc: Document::new(),
            open: vec![NodeId(0)],
        }
    }

    fn current(&self) -> NodeId {
        // The parse root is never popped.
        self.open[self.open.len() - 1]
    }

    fn open(&mut self, name: CompactString) {
        let id = NodeId(self.doc.nodes.len());
        let parent = self.current();
        self.doc.nodes[parent.0].content.push(Content::Child(id));
        self.doc
            .index
            .entry(CompactString::from(name.to_lowercase()))
            .or_default()
            .push(id);
        self.doc.nodes.push(Element {
            name,
            end: id.0 + 1,
            content: Vec::new(),
        });
        self.open.push(id);
    }

    fn close(&mut self, position: impl std::fmt::Display) -> Result<()> {
        if self.open.len() == 1 {
            return Err(Error::Parse(format!(
                "closing tag without matching open tag at byte {}",
                position
            )));
        }
        if let Some(id) = self.open.pop() {
            self.doc.nodes[id.0].end = self.doc.nodes.len();
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        let node = self.current();
        let content = &mut self.doc.nodes[node.0].content;
        match content.last_mut() {
            Some(Content::Text(existing)) => existing.push_str(text),
            _ => content.push(Content::Text(text.to_string())),
        }
    }

    fn finish(mut self, position: impl std::fmt::Display) -> Result<Document> {
        if self.open.len() > 1 {
            let unclosed = self.current();
            return Err(Error::Parse(format!(
                "unclosed element <{}> at end of input (byte {})",
                self.doc.name(unclosed),
                position
            )));
        }
        self.doc.nodes[0].end = self.doc.nodes.len();
        Ok(self.doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QName;
    use crate::tree::ElementTree;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn first_text(doc: &Document, prefix: &str, local: &str) -> Option<String> {
        doc.find_first(doc.root(), &QName::new(prefix, local))
            .unwrap()
            .map(|n| doc.text(n).unwrap())
    }

    #[test]
    fn test_parse_nested_elements() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<edefter:defter xmlns:edefter="http://www.edefter.gov.tr">
  <!-- ledger -->
  <gl-cor:accountingEntries>
    <gl-cor:uniqueID>Y-2023-01</gl-cor:uniqueID>
  </gl-cor:accountingEntries>
</edefter:defter>"#;
        let doc = Parser::new().parse_str(xml).unwrap();
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.name(doc.document_element().unwrap()), "edefter:defter");
        assert_eq!(first_text(&doc, "gl-cor", "uniqueID").as_deref(), Some("Y-2023-01"));
    }

    #[test]
    fn test_entities_and_cdata() {
        let xml = "<r><x:a>A &amp; B &#x41;</x:a><x:b><![CDATA[<raw> & text]]></x:b></r>";
        let doc = Parser::new().parse_str(xml).unwrap();
        assert_eq!(first_text(&doc, "x", "a").as_deref(), Some("A & B A"));
        assert_eq!(first_text(&doc, "x", "b").as_deref(), Some("<raw> & text"));
    }

    #[test]
    fn test_empty_element_has_empty_text() {
        let doc = Parser::new()
            .parse_str("<r><x:a/><x:b></x:b></r>")
            .unwrap();
        assert_eq!(first_text(&doc, "x", "a").as_deref(), Some(""));
        assert_eq!(first_text(&doc, "x", "b").as_deref(), Some(""));
    }

    #[test]
    fn test_whitespace_is_kept_by_default() {
        let xml = "<r><x:a>  padded  </x:a><x:b>   </x:b></r>";
        let doc = Parser::new().parse_str(xml).unwrap();
        assert_eq!(first_text(&doc, "x", "a").as_deref(), Some("  padded  "));
        assert_eq!(first_text(&doc, "x", "b").as_deref(), Some("   "));

        let doc = Parser::new().keep_whitespace(false).parse_str(xml).unwrap();
        assert_eq!(first_text(&doc, "x", "a").as_deref(), Some("  padded  "));
        assert_eq!(first_text(&doc, "x", "b").as_deref(), Some(""));
    }

    #[test]
    fn test_line_endings_are_normalised() {
        let xml = "<r><x:a>1\r\n2\r3</x:a><x:b><![CDATA[c\r\nd]]></x:b><x:c>e&#13;f</x:c></r>";
        let doc = Parser::new().parse_str(xml).unwrap();
        assert_eq!(first_text(&doc, "x", "a").as_deref(), Some("1\n2\n3"));
        assert_eq!(first_text(&doc, "x", "b").as_deref(), Some("c\nd"));
        assert_eq!(first_text(&doc, "x", "c").as_deref(), Some("e\rf"));
    }

    #[test]
    fn test_skips_bom() {
        let mut data = UTF8_BOM.to_vec();
        data.extend_from_slice(b"<r><x:a>1</x:a></r>");
        let doc = Parser::new().parse_bytes(&data).unwrap();
        assert_eq!(first_text(&doc, "x", "a").as_deref(), Some("1"));
    }

    #[test]
    fn test_mismatched_tags_are_parse_errors() {
        let err = Parser::new().parse_str("<r><x:a>1</x:b></r>").unwrap_err();
        assert!(matches!(err, Error::Parse(_)), "got {:?}", err);
    }

    #[test]
    fn test_unclosed_element_is_parse_error() {
        let err = Parser::new().parse_str("<r><x:a>1</x:a>").unwrap_err();
        assert!(matches!(err, Error::Parse(_)), "got {:?}", err);
    }

    #[test]
    fn test_parse_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"<r><gl-cor:entryNumber>E7</gl-cor:entryNumber></r>")
            .unwrap();
        let doc = Parser::new().parse_file(file.path()).unwrap();
        assert_eq!(first_text(&doc, "gl-cor", "entryNumber").as_deref(), Some("E7"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Parser::new()
            .parse_file(dir.path().join("absent.xml"))
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
