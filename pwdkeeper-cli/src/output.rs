//! Output formatting for the CLI
//!
//! Every command prints through [`Output`] so that `--json` and `--quiet`
//! behave the same everywhere.

use anyhow::Result;
use pwdkeeper_core::{Record, RecordTree};
use serde::Serialize;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - ids only
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Print the whole tree, indented, categories marked open or closed.
    pub fn print_tree(&self, tree: &RecordTree) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let records: Vec<Record> = tree.iter().map(|r| redacted(r, false)).collect();
                self.json(&records)
            }
            OutputFormat::Quiet => {
                for record in tree.iter() {
                    println!("{}", record.id());
                }
                Ok(())
            }
            OutputFormat::Human => {
                print_subtree(tree, tree.root_id(), 0);
                Ok(())
            }
        }
    }

    /// Print one record in full. Hidden values stay masked unless `reveal`.
    pub fn print_record(&self, tree: &RecordTree, record: &Record, reveal: bool) -> Result<()> {
        match self.format {
            OutputFormat::Json => self.json(&redacted(record, reveal)),
            OutputFormat::Quiet => {
                println!("{}", record.id());
                Ok(())
            }
            OutputFormat::Human => {
                println!("ID:       {}", record.id());
                println!("Type:     {}", record.tag());
                println!("Name:     {}", label(tree, record));
                println!("Path:     {}", path(tree, record.id()));
                println!("Kind:     {}", record.kind());
                println!("Picture:  {}", record.picture());
                println!("Modified: {}", format_millis(record.modified()));
                match record {
                    Record::Category(c) => {
                        println!("Expanded: {}", c.expanded);
                        println!("Children: {}", tree.children(&c.id).len());
                    }
                    Record::Card(card) => {
                        if !card.fields.is_empty() {
                            println!();
                            let width = card.fields.iter().map(|f| f.name.len()).max().unwrap_or(0);
                            for field in &card.fields {
                                let value = if reveal {
                                    field.value.clone()
                                } else {
                                    field.display_value()
                                };
                                println!("  {:width$}  {}", field.name, value);
                            }
                        }
                        if !card.note.is_empty() {
                            println!();
                            println!("{}", card.note);
                        }
                    }
                    Record::Note(note) => {
                        println!();
                        println!("{}", note.text);
                    }
                    Record::Link(link) => println!("Target:   {}", link.target_id),
                }
                Ok(())
            }
        }
    }

    /// Print a flat result list with each record's location.
    pub fn print_records(&self, tree: &RecordTree, records: &[&Record]) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let records: Vec<Record> = records.iter().map(|r| redacted(r, false)).collect();
                self.json(&records)
            }
            OutputFormat::Quiet => {
                for record in records {
                    println!("{}", record.id());
                }
                Ok(())
            }
            OutputFormat::Human => {
                if records.is_empty() {
                    println!("No records found.");
                    return Ok(());
                }
                for record in records {
                    println!("{} | {}", short_id(record.id()), path(tree, record.id()));
                }
                println!("\n{} record(s)", records.len());
                Ok(())
            }
        }
    }

    /// Report a newly placed record.
    pub fn print_created(&self, verb: &str, tree: &RecordTree, id: &str) -> Result<()> {
        match self.format {
            OutputFormat::Json => self.json(&serde_json::json!({ "id": id })),
            OutputFormat::Quiet => {
                println!("{id}");
                Ok(())
            }
            OutputFormat::Human => {
                println!("{verb} {} ({})", path(tree, id), short_id(id));
                Ok(())
            }
        }
    }

    /// Serialize any value as JSON, or print a plain message otherwise.
    pub fn print_value<T: Serialize + ?Sized>(&self, value: &T, human: &str) -> Result<()> {
        match self.format {
            OutputFormat::Json => self.json(value),
            _ => {
                println!("{human}");
                Ok(())
            }
        }
    }

    /// Print a success message (suppressed in quiet mode)
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("{message}"),
            OutputFormat::Json => println!("{}", serde_json::json!({ "status": "ok", "message": message })),
            OutputFormat::Quiet => {}
        }
    }
}

/// Copy of `record` for JSON output; masked field values stay masked unless
/// `reveal` is set.
fn redacted(record: &Record, reveal: bool) -> Record {
    let mut record = record.clone();
    if let Record::Card(card) = &mut record {
        if !reveal {
            for field in &mut card.fields {
                field.value = field.display_value();
            }
        }
    }
    record
}

fn print_subtree(tree: &RecordTree, id: &str, depth: usize) {
    let Some(record) = tree.find_by_id(id) else {
        return;
    };
    let marker = match record {
        Record::Category(c) if c.expanded => "[-]",
        Record::Category(_) => "[+]",
        Record::Link(_) => " ->",
        _ => "   ",
    };
    println!(
        "{}  {}{} {}",
        short_id(record.id()),
        "  ".repeat(depth),
        marker,
        label(tree, record)
    );
    for child in tree.children(id) {
        print_subtree(tree, child, depth + 1);
    }
}

/// Display name; links show their target's name.
fn label(tree: &RecordTree, record: &Record) -> String {
    match record {
        Record::Link(link) => match tree.find_by_id(&link.target_id) {
            Some(target) => target.name().to_string(),
            None => format!("<missing {}>", short_id(&link.target_id)),
        },
        other => other.name().to_string(),
    }
}

fn path(tree: &RecordTree, id: &str) -> String {
    let mut parts: Vec<String> = tree
        .ancestors(id)
        .iter()
        .skip(1)
        .map(|r| r.name().to_string())
        .collect();
    if let Some(record) = tree.find_by_id(id) {
        parts.push(label(tree, record));
    }
    format!("/{}", parts.join("/"))
}

pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| millis.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pwdkeeper_core::{Card, Field, FieldType, Picture, RecordKind};

    fn login() -> Record {
        Record::Card(Card::new(
            "Login",
            RecordKind::Empty,
            Picture::Password,
            vec![
                Field::new(FieldType::String, "User", "alice"),
                Field::new(FieldType::Hidden, "Password", "hunter2"),
            ],
            "",
        ))
    }

    #[test]
    fn test_json_masks_hidden_values() {
        let json = serde_json::to_string(&redacted(&login(), false)).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains("******"));
        assert!(json.contains("alice"));
    }

    #[test]
    fn test_json_reveals_on_request() {
        let json = serde_json::to_string(&redacted(&login(), true)).unwrap();
        assert!(json.contains("hunter2"));
    }

    #[test]
    fn test_redacted_keeps_identity() {
        let record = login();
        let copy = redacted(&record, false);
        assert_eq!(copy.id(), record.id());
        assert_eq!(copy.name(), "Login");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }
}
