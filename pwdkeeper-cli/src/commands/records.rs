//! Record command handlers

use anyhow::{bail, Context, Result};
use pwdkeeper_core::{
    cards_with_field_value, generate, search, Card, Category, DropPosition, Field, FieldType,
    GeneratorOptions, Note, PasteMode, Picture, Position, Record, RecordKind, SearchView,
};

use super::{resolve_id, resolve_parent, Session};
use crate::output::{short_id, Output};

/// Parses a kind or picture name, accepting lower case and dashes.
fn parse_wire<T: std::str::FromStr<Err = pwdkeeper_core::KeeperError>>(raw: &str) -> Result<T> {
    raw.trim()
        .to_uppercase()
        .replace('-', "_")
        .parse()
        .map_err(|e: pwdkeeper_core::KeeperError| anyhow::anyhow!(e.to_string()))
}

/// Parses `NAME=VALUE`, with an optional `:TYPE` suffix on the name.
fn parse_field(raw: &str) -> Result<Field> {
    let Some((name, value)) = raw.split_once('=') else {
        bail!("Field '{raw}' must look like NAME=VALUE or NAME:TYPE=VALUE");
    };
    let (name, field_type) = match name.rsplit_once(':') {
        Some((n, t)) => (n, parse_wire::<FieldType>(t)?),
        None => (name, FieldType::String),
    };
    Ok(Field::new(field_type, name, value))
}

/// Print the tree
pub fn tree(session: &Session, output: &Output) -> Result<()> {
    let vault = session.open()?;
    output.print_tree(vault.tree())
}

/// Show one record
pub fn show(session: &Session, id: &str, reveal: bool, output: &Output) -> Result<()> {
    let vault = session.open()?;
    let tree = vault.tree();
    let id = resolve_id(tree, id)?;
    let record = tree.get(&id)?;
    output.print_record(tree, record, reveal)
}

/// Search record names, or card field values with `fields`
pub fn find(session: &Session, query: &str, fields: bool, output: &Output) -> Result<()> {
    let vault = session.open()?;
    let tree = vault.tree();
    if fields {
        return output.print_records(tree, &cards_with_field_value(tree, query));
    }
    match search(tree, query) {
        SearchView::FullTree => output.print_tree(tree),
        SearchView::Matches(matches) => output.print_records(tree, &matches),
    }
}

/// Add a category
pub fn add_category(
    session: &Session,
    name: &str,
    parent: Option<&str>,
    kind: Option<&str>,
    picture: Option<&str>,
    output: &Output,
) -> Result<()> {
    let mut vault = session.open()?;
    let parent = resolve_parent(vault.tree(), parent)?;
    let kind = kind.map(parse_wire).transpose()?.unwrap_or(RecordKind::Empty);
    let picture = picture.map(parse_wire).transpose()?.unwrap_or(Picture::Folder);
    let record = Record::Category(Category::new(name, kind, picture));
    let id = vault.insert(&parent, record, Position::Append)?;
    output.print_created("Added", vault.tree(), &id)
}

/// Add a card. Without an explicit kind, the parent category's kind is used.
#[allow(clippy::too_many_arguments)]
pub fn add_card(
    session: &Session,
    name: &str,
    parent: Option<&str>,
    kind: Option<&str>,
    picture: Option<&str>,
    fields: &[String],
    note: Option<&str>,
    output: &Output,
) -> Result<()> {
    let mut vault = session.open()?;
    let parent = resolve_parent(vault.tree(), parent)?;
    let kind = match kind {
        Some(k) => parse_wire(k)?,
        None => vault.tree().get(&parent)?.kind(),
    };

    let mut card = Card::from_kind(name, kind);
    if let Some(p) = picture {
        card.picture = parse_wire(p)?;
    }
    for raw in fields {
        let field = parse_field(raw)?;
        match card.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => existing.value = field.value,
            None => card.fields.push(field),
        }
    }
    if let Some(n) = note {
        card.note = n.to_string();
    }
    let id = vault.insert(&parent, Record::Card(card), Position::Append)?;
    output.print_created("Added", vault.tree(), &id)
}

/// Add a note
pub fn add_note(
    session: &Session,
    name: &str,
    parent: Option<&str>,
    text: &str,
    output: &Output,
) -> Result<()> {
    let mut vault = session.open()?;
    let parent = resolve_parent(vault.tree(), parent)?;
    let id = vault.insert(&parent, Record::Note(Note::new(name, text)), Position::Append)?;
    output.print_created("Added", vault.tree(), &id)
}

/// Move, copy or link `source` relative to `target`
pub fn place(
    session: &Session,
    source: &str,
    target: &str,
    mode: PasteMode,
    position: Option<DropPosition>,
    output: &Output,
) -> Result<()> {
    let mut vault = session.open()?;
    let source = resolve_id(vault.tree(), source)?;
    let target = resolve_id(vault.tree(), target)?;

    let placed = match position {
        Some(position) => vault.drop_onto(&source, &target, mode, position),
        None => {
            let clipboard = pwdkeeper_core::Clipboard {
                source_id: source.clone(),
                mode,
            };
            if mode == PasteMode::Link {
                vault.paste_link(&clipboard, &target)
            } else {
                vault.paste(&clipboard, &target)
            }
        }
    }
    .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    match placed {
        Some(id) => {
            let verb = match mode {
                PasteMode::Cut => "Moved",
                PasteMode::Copy => "Copied",
                PasteMode::Link => "Linked",
            };
            output.print_created(verb, vault.tree(), &id)
        }
        None => {
            output.success("Nothing to do");
            Ok(())
        }
    }
}

/// Remove a record and its subtree
pub fn remove(session: &Session, id: &str, output: &Output) -> Result<()> {
    let mut vault = session.open()?;
    let id = resolve_id(vault.tree(), id)?;
    let result = vault.remove(&id).map_err(|e| anyhow::anyhow!(e.user_message()))?;
    output.print_value(
        &result,
        &format!(
            "Removed {} record(s) and {} link(s) under {}",
            result.deleted_ids.len(),
            result.swept_link_ids.len(),
            short_id(&id)
        ),
    )
}

/// Expand or collapse a category
pub fn expand(session: &Session, id: &str, expanded: bool, output: &Output) -> Result<()> {
    let mut vault = session.open()?;
    let id = resolve_id(vault.tree(), id)?;
    let changed = vault
        .set_expanded(&id, expanded)
        .context("Cannot change expansion")?;
    if changed {
        output.success(if expanded { "Expanded" } else { "Collapsed" });
    } else {
        output.success("Unchanged");
    }
    Ok(())
}

/// Print a generated password
pub fn generate_password(options: &GeneratorOptions, output: &Output) -> Result<()> {
    let password = generate(options).map_err(|e| anyhow::anyhow!(e.user_message()))?;
    output.print_value(&serde_json::json!({ "password": password }), &password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use pwdkeeper_core::{FileStore, KdfParams, RecordTree, Vault};
    use tempfile::TempDir;

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet)
    }

    /// A passphrase-protected document with root: [A: [card], B: []].
    fn setup() -> (TempDir, Session, String, String, String) {
        let dir = TempDir::new().unwrap();
        let session = Session {
            path: dir.path().join("vault.pwk"),
            passphrase: "pw".to_string(),
            kdf: KdfParams::low_memory(),
        };
        let mut vault =
            Vault::create(FileStore::new(&session.path), &session.passphrase, session.kdf).unwrap();
        let root = vault.tree().root_id().to_string();
        let a = vault
            .insert(&root, Record::Category(Category::new("A", RecordKind::Email, Picture::Folder)), Position::Append)
            .unwrap();
        let b = vault
            .insert(&root, Record::Category(Category::new("B", RecordKind::Empty, Picture::Folder)), Position::Append)
            .unwrap();
        let card = vault
            .insert(&a, Record::Card(Card::from_kind("Mail", RecordKind::Email)), Position::Append)
            .unwrap();
        (dir, session, a, b, card)
    }

    fn reload(session: &Session) -> RecordTree {
        session.open().unwrap().tree().clone()
    }

    #[test]
    fn test_place_cut_moves_and_persists() {
        let (_dir, session, a, b, card) = setup();
        place(&session, &card, &b, PasteMode::Cut, None, &quiet()).unwrap();
        let tree = reload(&session);
        assert!(tree.children(&a).is_empty());
        assert_eq!(tree.children(&b), &[card]);
    }

    #[test]
    fn test_place_copy_above_target() {
        let (_dir, session, a, _b, card) = setup();
        place(&session, &card, &card, PasteMode::Copy, Some(DropPosition::Above), &quiet())
            .unwrap();
        let tree = reload(&session);
        let children = tree.children(&a);
        assert_eq!(children.len(), 2);
        assert_eq!(children[1], card);
        assert_eq!(tree.get(&children[0]).unwrap().name(), "Mail");
    }

    #[test]
    fn test_place_rejects_cycle() {
        let (_dir, session, a, _b, _card) = setup();
        let before = reload(&session);
        let result = place(&session, "/", &a, PasteMode::Cut, Some(DropPosition::Into), &quiet());
        assert!(result.is_err());
        assert_eq!(reload(&session), before);
    }

    #[test]
    fn test_remove_sweeps_links() {
        let (_dir, session, _a, b, card) = setup();
        place(&session, &card, &b, PasteMode::Link, None, &quiet()).unwrap();
        assert_eq!(reload(&session).children(&b).len(), 1);

        remove(&session, &card, &quiet()).unwrap();
        let tree = reload(&session);
        assert!(tree.find_by_id(&card).is_none());
        assert!(tree.children(&b).is_empty());
        assert!(remove(&session, "/", &quiet()).is_err());
    }

    #[test]
    fn test_add_card_uses_parent_kind() {
        let (_dir, session, a, _b, _card) = setup();
        let fields = vec!["Password=secret".to_string(), "Extra:link=https://x".to_string()];
        add_card(&session, "Work", Some(&a), None, None, &fields, Some("n"), &quiet()).unwrap();

        let tree = reload(&session);
        let added = tree.get(&tree.children(&a)[1]).unwrap();
        match added {
            Record::Card(c) => {
                assert_eq!(c.kind, RecordKind::Email);
                let password = c.fields.iter().find(|f| f.name == "Password").unwrap();
                assert_eq!(password.value, "secret");
                assert_eq!(password.field_type, FieldType::Hidden);
                assert_eq!(c.fields.last().unwrap().field_type, FieldType::Link);
                assert_eq!(c.note, "n");
            }
            other => panic!("Expected card, got {other:?}"),
        }
    }

    #[test]
    fn test_expand_persists() {
        let (_dir, session, a, _b, _card) = setup();
        expand(&session, &a, true, &quiet()).unwrap();
        match reload(&session).get(&a).unwrap() {
            Record::Category(c) => assert!(c.expanded),
            _ => panic!("Expected category"),
        }
    }

    #[test]
    fn test_parse_field() {
        let f = parse_field("User=alice").unwrap();
        assert_eq!(f, Field::new(FieldType::String, "User", "alice"));
        let f = parse_field("Password:hidden=a=b").unwrap();
        assert_eq!(f, Field::new(FieldType::Hidden, "Password", "a=b"));
        assert!(parse_field("novalue").is_err());
    }

    #[test]
    fn test_parse_wire_accepts_lowercase() {
        assert_eq!(parse_wire::<RecordKind>("credit-card").unwrap(), RecordKind::CreditCard);
        assert_eq!(parse_wire::<Picture>("wifi").unwrap(), Picture::Wifi);
        assert!(parse_wire::<RecordKind>("boat").is_err());
    }
}
