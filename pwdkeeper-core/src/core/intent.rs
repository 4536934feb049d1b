//! Resolution of cut/copy/paste and drag-and-drop intents into tree operations.
//!
//! The front-end only captures gestures; it hands over a source id, a target
//! id, a transfer mode and (for drops) where relative to the target the user
//! released. This module turns that into `move_node`, `copy` or `link_to` with
//! the right parent and index.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::error::{KeeperError, Result};
use crate::core::tree::{Position, RecordTree};

/// What happens to the source record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PasteMode {
    /// Move the source.
    Cut,
    /// Deep-copy the source with fresh ids.
    Copy,
    /// Create a link to the source.
    Link,
}

/// Where a dragged record lands relative to the record under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DropPosition {
    /// Appended to the target's children; the target must be a category.
    Into,
    /// Before the target, in the target's parent.
    Above,
    /// After the target, in the target's parent.
    Below,
}

/// A record id placed on the clipboard by a cut or copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clipboard {
    pub source_id: String,
    pub mode: PasteMode,
}

impl Clipboard {
    pub fn cut(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            mode: PasteMode::Cut,
        }
    }

    pub fn copy(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            mode: PasteMode::Copy,
        }
    }

    /// Pastes the clipboard content onto `target_id`.
    pub fn paste(&self, tree: &mut RecordTree, target_id: &str) -> Result<Option<String>> {
        paste(tree, &self.source_id, target_id, self.mode)
    }

    /// Pastes a link to the clipboard source onto `target_id`.
    ///
    /// Not available after a cut: the source is about to move, so the user
    /// should paste it instead.
    pub fn paste_link(&self, tree: &mut RecordTree, target_id: &str) -> Result<Option<String>> {
        if self.mode == PasteMode::Cut {
            return Err(KeeperError::InvalidTarget(
                "cannot paste a link to a record that was cut".to_string(),
            ));
        }
        paste(tree, &self.source_id, target_id, PasteMode::Link)
    }
}

/// True when pasting `source_id` onto `target_id` keeps the tree acyclic.
///
/// Leaves can go anywhere. A category can go anywhere except below itself.
pub fn can_paste(tree: &RecordTree, source_id: &str, target_id: &str) -> bool {
    if !tree.contains(source_id) || !tree.contains(target_id) {
        return false;
    }
    if tree.children(source_id).is_empty() {
        return true;
    }
    match tree.parent_id(target_id) {
        Some(parent) => !tree.is_in_subtree(source_id, parent),
        None => true,
    }
}

/// Pastes `source_id` onto `target_id`.
///
/// A category target receives the record as its last child and is expanded;
/// pasting a category onto itself does nothing. Any other target gets the
/// record inserted right after it.
///
/// Returns the id of the placed record, or `None` when nothing changed.
pub fn paste(
    tree: &mut RecordTree,
    source_id: &str,
    target_id: &str,
    mode: PasteMode,
) -> Result<Option<String>> {
    let position = if tree.get(target_id)?.is_category() {
        if source_id == target_id {
            return Ok(None);
        }
        DropPosition::Into
    } else {
        DropPosition::Below
    };
    drop_onto(tree, source_id, target_id, mode, position)
}

/// Applies a drag-and-drop of `source_id` onto `target_id`.
///
/// Returns the id of the placed record, or `None` when a record is moved onto
/// itself.
pub fn drop_onto(
    tree: &mut RecordTree,
    source_id: &str,
    target_id: &str,
    mode: PasteMode,
    position: DropPosition,
) -> Result<Option<String>> {
    tree.get(source_id)?;
    let target_is_category = tree.get(target_id)?.is_category();
    if mode == PasteMode::Cut && source_id == target_id {
        return Ok(None);
    }
    debug!("{:?} {} {:?} {}", mode, source_id, position, target_id);

    let (parent_id, index) = match position {
        DropPosition::Into => {
            if !target_is_category {
                return Err(KeeperError::InvalidTarget(format!(
                    "cannot drop into '{target_id}', it is not a category"
                )));
            }
            (target_id.to_string(), Position::Append)
        }
        DropPosition::Above | DropPosition::Below => {
            let parent_id = tree
                .parent_id(target_id)
                .ok_or_else(|| {
                    KeeperError::InvalidTarget("cannot place a record beside the root".to_string())
                })?
                .to_string();
            let siblings = tree.children(&parent_id);
            // a moved source leaves its slot before the index is taken
            let slot = siblings
                .iter()
                .filter(|c| mode != PasteMode::Cut || c.as_str() != source_id)
                .position(|c| c == target_id)
                .unwrap_or(siblings.len());
            let offset = usize::from(position == DropPosition::Below);
            (parent_id, Position::At(slot + offset))
        }
    };

    let placed = match mode {
        PasteMode::Cut => {
            tree.move_node(source_id, &parent_id, index)?;
            source_id.to_string()
        }
        PasteMode::Copy => tree.copy(source_id, &parent_id, index)?,
        PasteMode::Link => tree.link_to(source_id, &parent_id, index)?,
    };
    if position == DropPosition::Into {
        tree.set_expanded(target_id, true)?;
    }
    Ok(Some(placed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::{Card, Category, Picture, Record, RecordKind};

    fn cat(name: &str) -> Record {
        Record::Category(Category::new(name, RecordKind::Empty, Picture::Folder))
    }

    fn card(name: &str) -> Record {
        Record::Card(Card::from_kind(name, RecordKind::Password))
    }

    /// root: [A: [x, y], B: [], z]
    fn setup() -> (RecordTree, [String; 5]) {
        let mut tree = RecordTree::default();
        let root = tree.root_id().to_string();
        let a = tree.insert(&root, cat("A"), Position::Append).unwrap();
        let x = tree.insert(&a, card("x"), Position::Append).unwrap();
        let y = tree.insert(&a, card("y"), Position::Append).unwrap();
        let b = tree.insert(&root, cat("B"), Position::Append).unwrap();
        let z = tree.insert(&root, card("z"), Position::Append).unwrap();
        (tree, [a, x, y, b, z])
    }

    #[test]
    fn test_cut_paste_into_category() {
        let (mut tree, [a, x, _, b, _]) = setup();
        let placed = Clipboard::cut(&x).paste(&mut tree, &b).unwrap();
        assert_eq!(placed, Some(x.clone()));
        assert_eq!(tree.children(&b), &[x]);
        assert_eq!(tree.children(&a).len(), 1);
        match tree.get(&b).unwrap() {
            Record::Category(c) => assert!(c.expanded),
            _ => panic!("Expected category"),
        }
    }

    #[test]
    fn test_paste_onto_leaf_inserts_after() {
        let (mut tree, [a, x, y, _, _]) = setup();
        let copy = Clipboard::copy(&y).paste(&mut tree, &x).unwrap().unwrap();
        assert_eq!(tree.children(&a), &[x, copy, y]);
    }

    #[test]
    fn test_cut_paste_after_later_sibling() {
        let (mut tree, [a, x, y, _, _]) = setup();
        Clipboard::cut(&x).paste(&mut tree, &y).unwrap();
        assert_eq!(tree.children(&a), &[y, x]);
    }

    #[test]
    fn test_paste_category_onto_itself_is_noop() {
        let (mut tree, [a, ..]) = setup();
        let before = tree.clone();
        assert_eq!(Clipboard::copy(&a).paste(&mut tree, &a).unwrap(), None);
        assert_eq!(tree, before);
    }

    #[test]
    fn test_paste_link() {
        let (mut tree, [_, x, _, b, _]) = setup();
        let link = Clipboard::copy(&x).paste_link(&mut tree, &b).unwrap().unwrap();
        match tree.get(&link).unwrap() {
            Record::Link(l) => assert_eq!(l.target_id, x),
            _ => panic!("Expected link"),
        }
    }

    #[test]
    fn test_paste_link_after_cut_rejected() {
        let (mut tree, [_, x, _, b, _]) = setup();
        let result = Clipboard::cut(&x).paste_link(&mut tree, &b);
        assert!(matches!(result, Err(KeeperError::InvalidTarget(_))));
    }

    #[test]
    fn test_drop_above_and_below() {
        let (mut tree, [a, _, _, b, z]) = setup();
        let root = tree.root_id().to_string();
        drop_onto(&mut tree, &z, &a, PasteMode::Cut, DropPosition::Above).unwrap();
        assert_eq!(tree.children(&root), &[z.clone(), a.clone(), b.clone()]);
        drop_onto(&mut tree, &z, &b, PasteMode::Cut, DropPosition::Below).unwrap();
        assert_eq!(tree.children(&root), &[a, b, z]);
    }

    #[test]
    fn test_drop_into_leaf_rejected() {
        let (mut tree, [_, x, _, _, z]) = setup();
        let result = drop_onto(&mut tree, &z, &x, PasteMode::Cut, DropPosition::Into);
        assert!(matches!(result, Err(KeeperError::InvalidTarget(_))));
    }

    #[test]
    fn test_drop_category_into_descendant_is_cyclic() {
        let (mut tree, [a, _, _, _, _]) = setup();
        let inner = tree.insert(&a, cat("inner"), Position::Append).unwrap();
        let before = tree.clone();
        let result = drop_onto(&mut tree, &a, &inner, PasteMode::Cut, DropPosition::Into);
        assert!(matches!(result, Err(KeeperError::CyclicMove(_))));
        assert_eq!(tree, before);
    }

    #[test]
    fn test_drop_beside_root_rejected() {
        let (mut tree, [_, _, _, _, z]) = setup();
        let root = tree.root_id().to_string();
        let result = drop_onto(&mut tree, &z, &root, PasteMode::Copy, DropPosition::Above);
        assert!(matches!(result, Err(KeeperError::InvalidTarget(_))));
    }

    #[test]
    fn test_can_paste() {
        let (mut tree, [a, x, _, b, z]) = setup();
        let inner = tree.insert(&a, cat("inner"), Position::Append).unwrap();
        assert!(can_paste(&tree, &x, &z));
        assert!(can_paste(&tree, &a, &b));
        assert!(can_paste(&tree, &a, &a));
        assert!(!can_paste(&tree, &a, &x));
        assert!(!can_paste(&tree, &a, &inner));
        assert!(!can_paste(&tree, "missing", &b));
    }
}
