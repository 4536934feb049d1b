//! Reader for the legacy line-oriented wallet export.
//!
//! The format is a sequence of sections separated by blank lines:
//!
//! ```text
//! Category: Banking
//!
//! Card Visa
//! Number: 4111 1111 1111 1111
//! PIN 1234
//! Card Notes
//! call the bank first
//!
//! Card Wifi code
//! Text the password is on the router
//! ```
//!
//! A `Category` header opens a folder under the root. A `Card <name>` header
//! starts an entry whose following lines become STRING fields, split at the
//! first colon or, failing that, the first space. `Card Notes` switches the
//! entry into multi-line note mode, and `Text` turns the entry into a note.
//! Headers are only recognised at the start of a section.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{info, warn};

use crate::core::error::{KeeperError, Result};
use crate::core::record::{Card, Category, Field, FieldType, Note, Picture, Record, RecordKind};
use crate::core::tree::{Position, RecordTree};

/// Accumulated state while walking the input.
struct Cursor {
    tree: RecordTree,
    category_id: Option<String>,
    card_name: Option<String>,
    fields: Vec<Field>,
    note: Option<String>,
    card_notes: Option<String>,
    end_of_section: bool,
}

impl Cursor {
    fn new() -> Self {
        Self {
            tree: RecordTree::default(),
            category_id: None,
            card_name: None,
            fields: Vec::new(),
            note: None,
            card_notes: None,
            end_of_section: true,
        }
    }

    fn parent_id(&self) -> String {
        self.category_id
            .clone()
            .unwrap_or_else(|| self.tree.root_id().to_string())
    }

    /// Emits the pending card or note, if any.
    fn finalize(&mut self) -> Result<()> {
        let note = self.note.take();
        let card_notes = self.card_notes.take();
        let fields = std::mem::take(&mut self.fields);
        let Some(name) = self.card_name.take() else {
            if note.is_some() {
                warn!("legacy import: dropping text block with no entry header");
            }
            return Ok(());
        };

        let record = match note {
            Some(text) => Record::Note(Note::new(name, text.trim_end())),
            None => Record::Card(Card::new(
                name,
                RecordKind::Empty,
                Picture::Password,
                fields,
                card_notes.as_deref().unwrap_or_default().trim_end(),
            )),
        };
        let parent = self.parent_id();
        self.tree.insert(&parent, record, Position::Append)?;
        self.end_of_section = false;
        Ok(())
    }

    fn feed(&mut self, raw: &str) -> Result<()> {
        let line = raw.trim();

        if self.end_of_section && line.starts_with("Category") {
            self.finalize()?;
            let name = match line.find(':') {
                Some(colon) => &line[colon + 1..],
                None => &line["Category".len()..],
            };
            let category = Category::new(name.trim(), RecordKind::Empty, Picture::Folder);
            let root = self.tree.root_id().to_string();
            let id = self.tree.insert(&root, Record::Category(category), Position::Append)?;
            self.category_id = Some(id);
            self.end_of_section = false;
            return Ok(());
        }

        if line.starts_with("Card Notes") {
            self.card_notes = Some(String::new());
            return Ok(());
        }

        if self.end_of_section && line.starts_with("Card") {
            self.finalize()?;
            self.card_name = Some(line["Card".len()..].trim().to_string());
            self.end_of_section = false;
            return Ok(());
        }

        if line == "Text" || line.starts_with("Text ") {
            let mut text = String::new();
            if let Some((_, rest)) = line.split_once(' ') {
                text.push_str(rest.trim());
                text.push('\n');
            }
            self.note = Some(text);
            return Ok(());
        }

        if let Some(buffer) = self.note.as_mut().or(self.card_notes.as_mut()) {
            buffer.push_str(line);
            buffer.push('\n');
            self.end_of_section = line.is_empty();
            return Ok(());
        }

        if line.is_empty() {
            self.end_of_section = true;
            return Ok(());
        }
        self.end_of_section = false;

        if self.card_name.is_some() {
            if let Some(field) = parse_field(line) {
                self.fields.push(field);
            }
        } else {
            warn!("legacy import: skipping line outside any entry");
        }
        Ok(())
    }
}

/// Splits `name: value` (colon wins) or `name value` into a STRING field.
fn parse_field(line: &str) -> Option<Field> {
    let (name, value) = line.split_once(':').or_else(|| line.split_once(' '))?;
    Some(Field::new(FieldType::String, name, value.trim()))
}

/// Builds a tree from a legacy export. Any read failure aborts the import.
pub fn import_legacy<R: BufRead>(reader: R) -> Result<RecordTree> {
    let mut cursor = Cursor::new();
    for line in reader.lines() {
        let line = line.map_err(KeeperError::ImportIo)?;
        cursor.feed(&line)?;
    }
    cursor.finalize()?;
    info!("legacy import produced {} records", cursor.tree.record_count());
    Ok(cursor.tree)
}

/// Opens `path` and runs [`import_legacy`] on it.
pub fn import_legacy_file(path: &Path) -> Result<RecordTree> {
    let file = File::open(path).map_err(KeeperError::ImportIo)?;
    import_legacy(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor as IoCursor, Read};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "\
Category: Banking

Card Visa
Number: 4111 1111 1111 1111
PIN 1234
Card Notes
call the bank first
  second line

Card Wifi
Text the password
is on the router

Category: Mail

Card Work
Server: imap.example.org:993
";

    fn only_card(tree: &RecordTree, name: &str) -> Card {
        tree.iter()
            .find_map(|r| match r {
                Record::Card(c) if c.name == name => Some(c.clone()),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_import_structure() {
        let tree = import_legacy(IoCursor::new(SAMPLE)).unwrap();
        let names: Vec<&str> = tree.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["root", "Banking", "Visa", "Wifi", "Mail", "Work"]);
        assert_eq!(tree.root().picture(), Picture::Folder);
    }

    #[test]
    fn test_fields_split_on_colon_then_space() {
        let tree = import_legacy(IoCursor::new(SAMPLE)).unwrap();
        let visa = only_card(&tree, "Visa");
        assert_eq!(visa.picture, Picture::Password);
        assert_eq!(visa.fields.len(), 2);
        assert_eq!(visa.fields[0], Field::new(FieldType::String, "Number", "4111 1111 1111 1111"));
        assert_eq!(visa.fields[1], Field::new(FieldType::String, "PIN", "1234"));
        assert_eq!(visa.note, "call the bank first\nsecond line");
    }

    #[test]
    fn test_text_block_becomes_note() {
        let tree = import_legacy(IoCursor::new(SAMPLE)).unwrap();
        let wifi = tree.iter().find(|r| r.name() == "Wifi").unwrap();
        match wifi {
            Record::Note(n) => assert_eq!(n.text, "the password\nis on the router"),
            other => panic!("Expected note, got {other:?}"),
        }
    }

    #[test]
    fn test_last_card_is_kept() {
        let tree = import_legacy(IoCursor::new(SAMPLE)).unwrap();
        let work = only_card(&tree, "Work");
        assert_eq!(work.fields[0].name, "Server");
        assert_eq!(work.fields[0].value, "imap.example.org:993");
    }

    #[test]
    fn test_card_before_category_goes_to_root() {
        let tree = import_legacy(IoCursor::new("Card Loose\nUser bob\n")).unwrap();
        assert_eq!(tree.children(tree.root_id()).len(), 1);
        assert_eq!(only_card(&tree, "Loose").fields[0].value, "bob");
    }

    #[test]
    fn test_empty_input() {
        let tree = import_legacy(IoCursor::new("")).unwrap();
        assert_eq!(tree.record_count(), 1);
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk gone"))
        }
    }

    #[test]
    fn test_io_failure_aborts() {
        let result = import_legacy(BufReader::new(FailingReader));
        assert!(matches!(result, Err(KeeperError::ImportIo(_))));
    }

    #[test]
    fn test_missing_file_is_import_io() {
        let result = import_legacy_file(Path::new("/nonexistent/wallet.txt"));
        assert!(matches!(result, Err(KeeperError::ImportIo(_))));
    }

    #[test]
    fn test_import_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let tree = import_legacy_file(file.path()).unwrap();
        assert_eq!(tree.record_count(), 6);
    }
}
