//! XML document codec for [`RecordTree`].
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <root>
//!   <Category id=".." name="root" type="EMPTY" modified="0" picture="FOLDER" expanded="false">
//!     <records>
//!       <Card id=".." name="Mail" type="EMAIL" modified="0" picture="EMAIL">
//!         <fields><field name="Password" type="HIDDEN" value=".."/></fields>
//!         <note>..</note>
//!       </Card>
//!       <Note id=".." name=".." type="EMPTY" modified="0" picture="NOTE">body</Note>
//!       <Link id=".." name="" type="EMPTY" modified="0" picture="FOLDER" targetId=".."/>
//!     </records>
//!   </Category>
//! </root>
//! ```
//!
//! Decoding parses the whole document into a small element tree first and then
//! maps it to records, so a malformed document never yields a partial tree.

use std::collections::HashMap;

use log::{info, warn};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::core::error::{KeeperError, Result};
use crate::core::record::{
    Card, Category, Field, FieldType, Link, Note, Picture, Record, RecordKind,
};
use crate::core::tree::{Position, RecordTree};

const ROOT: &str = "root";
const RECORDS: &str = "records";
const FIELDS: &str = "fields";
const FIELD: &str = "field";
const NOTE: &str = "note";

fn malformed(msg: impl Into<String>) -> KeeperError {
    KeeperError::MalformedDocument(msg.into())
}

// ── encoding ────────────────────────────────────────────────────

/// Serializes `tree` to UTF-8 XML bytes.
pub fn encode(tree: &RecordTree) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    emit(&mut writer, Event::Start(BytesStart::new(ROOT)))?;
    encode_record(&mut writer, tree, tree.root_id())?;
    emit(&mut writer, Event::End(BytesEnd::new(ROOT)))?;
    let bytes = writer.into_inner();
    info!("encoded {} records ({} bytes)", tree.record_count(), bytes.len());
    Ok(bytes)
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| KeeperError::Io(std::io::Error::other(e.to_string())))
}

fn record_start(record: &Record) -> BytesStart<'static> {
    let modified = record.modified().to_string();
    let mut start = BytesStart::new(record.tag());
    start.push_attribute(("id", record.id()));
    start.push_attribute(("name", record.name()));
    start.push_attribute(("type", record.kind().as_str()));
    start.push_attribute(("modified", modified.as_str()));
    start.push_attribute(("picture", record.picture().as_str()));
    match record {
        Record::Category(c) => {
            start.push_attribute(("expanded", if c.expanded { "true" } else { "false" }));
        }
        Record::Link(l) => start.push_attribute(("targetId", l.target_id.as_str())),
        Record::Card(_) | Record::Note(_) => {}
    }
    start
}

fn encode_record(writer: &mut Writer<Vec<u8>>, tree: &RecordTree, id: &str) -> Result<()> {
    let record = tree.get(id)?;
    let start = record_start(record);
    let tag = record.tag();

    match record {
        Record::Category(_) => {
            let children = tree.children(id);
            if children.is_empty() {
                return emit(writer, Event::Empty(start));
            }
            emit(writer, Event::Start(start))?;
            emit(writer, Event::Start(BytesStart::new(RECORDS)))?;
            for child in children {
                encode_record(writer, tree, child)?;
            }
            emit(writer, Event::End(BytesEnd::new(RECORDS)))?;
        }
        Record::Card(card) => {
            emit(writer, Event::Start(start))?;
            if !card.fields.is_empty() {
                emit(writer, Event::Start(BytesStart::new(FIELDS)))?;
                for field in &card.fields {
                    let mut f = BytesStart::new(FIELD);
                    f.push_attribute(("name", field.name.as_str()));
                    f.push_attribute(("type", field.field_type.as_str()));
                    f.push_attribute(("value", field.value.as_str()));
                    emit(writer, Event::Empty(f))?;
                }
                emit(writer, Event::End(BytesEnd::new(FIELDS)))?;
            }
            emit(writer, Event::Start(BytesStart::new(NOTE)))?;
            emit(writer, Event::Text(BytesText::new(&card.note)))?;
            emit(writer, Event::End(BytesEnd::new(NOTE)))?;
        }
        Record::Note(note) => {
            emit(writer, Event::Start(start))?;
            emit(writer, Event::Text(BytesText::new(&note.text)))?;
        }
        Record::Link(_) => return emit(writer, Event::Empty(start)),
    }
    emit(writer, Event::End(BytesEnd::new(tag)))
}

// ── decoding ────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Element {
    name: String,
    attrs: HashMap<String, String>,
    children: Vec<XmlNode>,
}

#[derive(Debug)]
enum XmlNode {
    Element(Element),
    Text(String),
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8(start.name().as_ref().to_vec())
            .map_err(|e| malformed(e.to_string()))?;
        let mut attrs = HashMap::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| malformed(e.to_string()))?;
            let key = String::from_utf8(attr.key.as_ref().to_vec())
                .map_err(|e| malformed(e.to_string()))?;
            let value = attr
                .unescape_value()
                .map_err(|e| malformed(e.to_string()))?
                .into_owned();
            attrs.insert(key, value);
        }
        Ok(Self {
            name,
            attrs,
            children: Vec::new(),
        })
    }

    fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                XmlNode::Text(t) => Some(t.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    fn has_content_text(&self) -> bool {
        self.children
            .iter()
            .any(|c| matches!(c, XmlNode::Text(t) if !t.trim().is_empty()))
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    fn required(&self, key: &str) -> Result<&str> {
        self.attr(key).ok_or_else(|| {
            malformed(format!("<{}> is missing attribute '{}'", self.name, key))
        })
    }
}

fn parse_dom(text: &str) -> Result<Element> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut document: Option<Element> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| malformed(format!("at byte {}: {e}", reader.buffer_position())))?;
        match event {
            Event::Start(start) => stack.push(Element::from_start(&start)?),
            Event::Empty(start) => {
                let element = Element::from_start(&start)?;
                close(&mut stack, &mut document, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| malformed("unexpected closing tag"))?;
                close(&mut stack, &mut document, element)?;
            }
            Event::Text(t) => {
                let s = t.unescape().map_err(|e| malformed(e.to_string()))?;
                push_text(&mut stack, s.into_owned())?;
            }
            Event::CData(c) => {
                let s = String::from_utf8(c.into_inner().into_owned())
                    .map_err(|e| malformed(e.to_string()))?;
                push_text(&mut stack, s)?;
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => {}
        }
    }

    if !stack.is_empty() {
        return Err(malformed("unexpected end of document"));
    }
    document.ok_or_else(|| malformed("document is empty"))
}

fn close(stack: &mut [Element], document: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None if document.is_none() => *document = Some(element),
        None => return Err(malformed("more than one document element")),
    }
    Ok(())
}

fn push_text(stack: &mut [Element], text: String) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Text(text)),
        None if text.trim().is_empty() => {}
        None => return Err(malformed("text outside the document element")),
    }
    Ok(())
}

/// Parses UTF-8 XML bytes into a tree.
pub fn decode(bytes: &[u8]) -> Result<RecordTree> {
    let text = std::str::from_utf8(bytes).map_err(|e| malformed(e.to_string()))?;
    decode_str(text)
}

/// Parses an XML document into a tree.
pub fn decode_str(text: &str) -> Result<RecordTree> {
    let document = parse_dom(text)?;
    if document.name != ROOT {
        return Err(malformed(format!(
            "expected <{ROOT}> document element, found <{}>",
            document.name
        )));
    }

    let mut top = document.elements();
    let root_element = match (top.next(), top.next()) {
        (Some(e), None) if e.name == "Category" => e,
        (None, _) => return Err(malformed("document has no root category")),
        (Some(e), None) => {
            return Err(malformed(format!("root record must be a Category, found <{}>", e.name)))
        }
        (Some(_), Some(_)) => return Err(malformed("document has more than one root record")),
    };

    let root = match decode_record(root_element)? {
        Record::Category(c) => c,
        _ => return Err(malformed("root record must be a Category")),
    };
    let root_id = root.id.clone();
    let mut tree = RecordTree::new(root);
    decode_children(&mut tree, &root_id, root_element)?;
    let swept = tree.remove_dangling_links();
    if !swept.is_empty() {
        warn!("dropped {} link(s) to missing records", swept.len());
    }
    info!("decoded {} records", tree.record_count());
    Ok(tree)
}

fn decode_children(tree: &mut RecordTree, parent_id: &str, element: &Element) -> Result<()> {
    for child in element.elements() {
        if child.name != RECORDS {
            return Err(malformed(format!("unexpected <{}> in <Category>", child.name)));
        }
        for record_element in child.elements() {
            let record = decode_record(record_element)?;
            let id = record.id().to_string();
            if tree.contains(&id) {
                return Err(malformed(format!("duplicate record id '{id}'")));
            }
            let is_category = record.is_category();
            tree.insert(parent_id, record, Position::Append)?;
            if is_category {
                decode_children(tree, &id, record_element)?;
            }
        }
    }
    Ok(())
}

fn decode_record(element: &Element) -> Result<Record> {
    let id = element.required("id")?;
    if id.is_empty() {
        return Err(malformed(format!("<{}> has an empty id", element.name)));
    }
    let id = id.to_string();
    let modified = parse_modified(element)?;

    let record = match element.name.as_str() {
        "Category" => {
            let kind = parse_kind(element)?;
            Record::Category(Category {
                id,
                modified,
                name: element.required("name")?.to_string(),
                kind,
                picture: parse_picture(element, Picture::Generic),
                expanded: parse_expanded(element)?,
            })
        }
        "Card" => {
            let kind = parse_kind(element)?;
            let mut fields = Vec::new();
            let mut note = String::new();
            for child in element.elements() {
                match child.name.as_str() {
                    FIELDS => {
                        for f in child.elements() {
                            fields.push(decode_field(f)?);
                        }
                    }
                    NOTE => note = child.text(),
                    other => {
                        return Err(malformed(format!("unexpected <{other}> in <Card>")))
                    }
                }
            }
            Record::Card(Card {
                id,
                modified,
                name: element.required("name")?.to_string(),
                kind,
                picture: parse_picture(element, kind.default_picture()),
                fields,
                note,
            })
        }
        "Note" => {
            if let Some(child) = element.elements().next() {
                return Err(malformed(format!("unexpected <{}> in <Note>", child.name)));
            }
            Record::Note(Note {
                id,
                modified,
                name: element.required("name")?.to_string(),
                text: element.text(),
            })
        }
        "Link" => {
            if element.elements().next().is_some() || element.has_content_text() {
                return Err(malformed("<Link> cannot have content"));
            }
            Record::Link(Link {
                id,
                modified,
                target_id: element.required("targetId")?.to_string(),
            })
        }
        other => return Err(malformed(format!("unknown record element <{other}>"))),
    };
    Ok(record)
}

fn decode_field(element: &Element) -> Result<Field> {
    if element.name != FIELD {
        return Err(malformed(format!("unexpected <{}> in <fields>", element.name)));
    }
    let field_type: FieldType = element.required("type")?.parse()?;
    Ok(Field::new(
        field_type,
        element.required("name")?,
        element.attr("value").unwrap_or_default(),
    ))
}

fn parse_modified(element: &Element) -> Result<i64> {
    let raw = element.required("modified")?;
    raw.trim().parse().map_err(|_| {
        malformed(format!("<{}> has invalid modified '{}'", element.name, raw))
    })
}

fn parse_kind(element: &Element) -> Result<RecordKind> {
    match element.attr("type") {
        Some(raw) => raw.parse(),
        None => Ok(RecordKind::Empty),
    }
}

fn parse_expanded(element: &Element) -> Result<bool> {
    match element.attr("expanded") {
        None => Ok(false),
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(other) => Err(malformed(format!("invalid expanded value '{other}'"))),
    }
}

/// Pictures are cosmetic, so an unknown name degrades instead of failing.
fn parse_picture(element: &Element, fallback: Picture) -> Picture {
    match element.attr("picture") {
        None => fallback,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("unknown picture '{}' on <{}>, using GENERIC", raw, element.name);
            Picture::Generic
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> (RecordTree, String, String) {
        let mut tree = RecordTree::default();
        let root = tree.root_id().to_string();
        let bank = tree
            .insert(
                &root,
                Record::Category(Category::new("Bank", RecordKind::CreditCard, Picture::Bank)),
                Position::Append,
            )
            .unwrap();
        let mut card = Card::from_kind("Visa & <Co>", RecordKind::CreditCard);
        card.fields[2].value = "4111 1111 1111 1111".into();
        card.fields[4].value = "1234".into();
        card.note = "line one\nline \"two\"".into();
        let card_id = tree.insert(&bank, Record::Card(card), Position::Append).unwrap();
        tree.insert(&root, Record::Note(Note::new("Memo", "  body text\n")), Position::Append)
            .unwrap();
        tree.link_to(&card_id, &root, Position::Append).unwrap();
        tree.insert(&root, Record::Card(Card::from_kind("Bare", RecordKind::Empty)), Position::Append)
            .unwrap();
        tree.set_expanded(&bank, true).unwrap();
        (tree, bank, card_id)
    }

    #[test]
    fn test_roundtrip_all_variants() {
        let (tree, _, _) = sample_tree();
        let bytes = encode(&tree).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, tree);
    }

    #[test]
    fn test_hidden_field_survives() {
        let (tree, _, card_id) = sample_tree();
        let decoded = decode(&encode(&tree).unwrap()).unwrap();
        match decoded.get(&card_id).unwrap() {
            Record::Card(c) => {
                assert_eq!(c.fields[4].field_type, FieldType::Hidden);
                assert_eq!(c.fields[4].value, "1234");
            }
            other => panic!("Expected card, got {other:?}"),
        }
    }

    #[test]
    fn test_encoded_shape() {
        let (tree, _, _) = sample_tree();
        let xml = String::from_utf8(encode(&tree).unwrap()).unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<root><Category "));
        assert!(xml.contains("expanded=\"true\""));
        assert!(xml.contains("type=\"CREDIT_CARD_NUMBER\""));
        assert!(xml.contains("targetId="));
        assert!(xml.contains("<note></note>"));
        assert!(!xml.contains("<fields></fields>"));
    }

    #[test]
    fn test_missing_expanded_defaults_false() {
        let xml = r#"<root><Category id="r" name="root" type="EMPTY" modified="5" picture="FOLDER"/></root>"#;
        let tree = decode_str(xml).unwrap();
        match tree.root() {
            Record::Category(c) => {
                assert!(!c.expanded);
                assert_eq!(c.modified, 5);
            }
            _ => panic!("Expected category"),
        }
    }

    #[test]
    fn test_indented_document() {
        let xml = r#"<?xml version="1.0"?>
<root>
  <Category id="r" name="root" type="EMPTY" modified="1" picture="FOLDER" expanded="false">
    <records>
      <Card id="c" name="Mail" type="EMAIL" modified="2" picture="EMAIL">
        <fields>
          <field name="Password" type="HIDDEN" value="pw"/>
        </fields>
        <note>hi</note>
      </Card>
    </records>
  </Category>
</root>
"#;
        let tree = decode_str(xml).unwrap();
        assert_eq!(tree.record_count(), 2);
        match tree.get("c").unwrap() {
            Record::Card(c) => {
                assert_eq!(c.fields.len(), 1);
                assert_eq!(c.note, "hi");
            }
            _ => panic!("Expected card"),
        }
    }

    #[test]
    fn test_unknown_tag_is_malformed() {
        let xml = r#"<root><Category id="r" name="root" modified="1"><records><Secret id="x" name="x" modified="1"/></records></Category></root>"#;
        assert!(matches!(decode_str(xml), Err(KeeperError::MalformedDocument(_))));
    }

    #[test]
    fn test_missing_attribute_is_malformed() {
        let xml = r#"<root><Category id="r" name="root"/></root>"#;
        assert!(matches!(decode_str(xml), Err(KeeperError::MalformedDocument(_))));
    }

    #[test]
    fn test_bad_number_is_malformed() {
        let xml = r#"<root><Category id="r" name="root" modified="soon"/></root>"#;
        assert!(matches!(decode_str(xml), Err(KeeperError::MalformedDocument(_))));
    }

    #[test]
    fn test_bad_enum_is_malformed() {
        let xml = r#"<root><Category id="r" name="root" modified="1" type="BOAT"/></root>"#;
        assert!(matches!(decode_str(xml), Err(KeeperError::MalformedDocument(_))));
        let xml = r#"<root><Category id="r" name="root" modified="1" expanded="yes"/></root>"#;
        assert!(matches!(decode_str(xml), Err(KeeperError::MalformedDocument(_))));
    }

    #[test]
    fn test_duplicate_id_is_malformed() {
        let xml = r#"<root><Category id="r" name="root" modified="1"><records><Note id="n" name="a" modified="1"/><Note id="n" name="b" modified="1"/></records></Category></root>"#;
        assert!(matches!(decode_str(xml), Err(KeeperError::MalformedDocument(_))));
    }

    #[test]
    fn test_missing_root_category_is_malformed() {
        assert!(matches!(decode_str("<root></root>"), Err(KeeperError::MalformedDocument(_))));
        let xml = r#"<root><Note id="n" name="a" modified="1"/></root>"#;
        assert!(matches!(decode_str(xml), Err(KeeperError::MalformedDocument(_))));
        assert!(matches!(decode_str("<other/>"), Err(KeeperError::MalformedDocument(_))));
        assert!(matches!(decode(b"\xff\xfe"), Err(KeeperError::MalformedDocument(_))));
    }

    #[test]
    fn test_empty_id_is_malformed() {
        let xml = r#"<root><Category id="" name="root" modified="1"/></root>"#;
        assert!(matches!(decode_str(xml), Err(KeeperError::MalformedDocument(_))));
    }

    #[test]
    fn test_links_to_missing_records_are_dropped() {
        let xml = r#"<root><Category id="r" name="root" modified="1"><records>
            <Note id="n" name="kept" modified="1">x</Note>
            <Link id="ok" name="" modified="1" targetId="n"/>
            <Link id="l" name="" modified="1" targetId="ghost"/>
        </records></Category></root>"#;
        let tree = decode_str(xml).unwrap();
        assert!(tree.find_by_id("l").is_none());
        assert!(tree.find_by_id("ok").is_some());
        assert!(tree.dangling_links().is_empty());
        assert_eq!(tree.children("r").len(), 2);
    }

    #[test]
    fn test_forward_link_resolves() {
        let xml = r#"<root><Category id="r" name="root" modified="1"><records><Link id="l" name="" modified="1" targetId="n"/><Note id="n" name="later" modified="1"/></records></Category></root>"#;
        let tree = decode_str(xml).unwrap();
        assert!(tree.find_by_id("l").is_some());
    }

    #[test]
    fn test_unknown_picture_falls_back() {
        let xml = r#"<root><Category id="r" name="root" modified="1" picture="UNICORN"/></root>"#;
        let tree = decode_str(xml).unwrap();
        assert_eq!(tree.root().picture(), Picture::Generic);
    }
}
