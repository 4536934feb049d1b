//! In-memory record tree with structural-integrity operations.
//!
//! [`RecordTree`] is an arena keyed by record id. Each node remembers its
//! parent id and its ordered child ids; only categories ever have children.
//! Links store a plain target id and never own the record they point at.
//!
//! Every mutating operation validates its arguments before touching the arena,
//! so a failed call leaves the tree exactly as it was.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::core::delete::DeleteResult;
use crate::core::error::{KeeperError, Result};
use crate::core::record::{Category, Link, Picture, Record, RecordKind};

/// Where a record is placed among its new siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// After the last existing child.
    Append,
    /// At the given index; indexes past the end append.
    At(usize),
}

impl Position {
    fn resolve(self, len: usize) -> usize {
        match self {
            Position::Append => len,
            Position::At(index) => index.min(len),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Node {
    record: Record,
    parent: Option<String>,
    children: Vec<String>,
}

/// A single-rooted tree of records. The root is always a [`Category`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordTree {
    nodes: HashMap<String, Node>,
    root_id: String,
}

impl Default for RecordTree {
    /// An empty tree whose root is a category named `root`.
    fn default() -> Self {
        Self::new(Category::new("root", RecordKind::Empty, Picture::Folder))
    }
}

impl RecordTree {
    /// Creates a tree containing only `root`.
    pub fn new(root: Category) -> Self {
        let root_id = root.id.clone();
        let mut nodes = HashMap::new();
        nodes.insert(
            root_id.clone(),
            Node {
                record: Record::Category(root),
                parent: None,
                children: Vec::new(),
            },
        );
        Self { nodes, root_id }
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn root(&self) -> &Record {
        &self.nodes[&self.root_id].record
    }

    /// Number of records in the tree, root included.
    pub fn record_count(&self) -> usize {
        self.nodes.len()
    }

    /// Looks up a record by id. Unknown and empty ids yield `None`.
    pub fn find_by_id(&self, id: &str) -> Option<&Record> {
        if id.is_empty() {
            return None;
        }
        self.nodes.get(id).map(|n| &n.record)
    }

    /// Like [`find_by_id`](Self::find_by_id) but fails with `NotFound`.
    pub fn get(&self, id: &str) -> Result<&Record> {
        self.find_by_id(id)
            .ok_or_else(|| KeeperError::NotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find_by_id(id).is_some()
    }

    /// Id of the parent category; `None` for the root and unknown ids.
    pub fn parent_id(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).and_then(|n| n.parent.as_deref())
    }

    /// Ordered child ids. Leaves and unknown ids have none.
    pub fn children(&self, id: &str) -> &[String] {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Ordered child records.
    pub fn child_records<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a Record> + 'a {
        self.children(id)
            .iter()
            .filter_map(move |child| self.nodes.get(child).map(|n| &n.record))
    }

    /// Position of `id` among its siblings.
    pub fn index_in_parent(&self, id: &str) -> Option<usize> {
        let parent = self.parent_id(id)?;
        self.children(parent).iter().position(|c| c == id)
    }

    /// Ancestors of `id` from the root down, excluding `id` itself.
    pub fn ancestors(&self, id: &str) -> Vec<&Record> {
        let mut chain = Vec::new();
        let mut current = self.parent_id(id);
        while let Some(pid) = current {
            if let Some(node) = self.nodes.get(pid) {
                chain.push(&node.record);
            }
            current = self.parent_id(pid);
        }
        chain.reverse();
        chain
    }

    /// True when `node` is `ancestor` or lies somewhere below it.
    pub fn is_in_subtree(&self, ancestor: &str, node: &str) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent_id(id);
        }
        false
    }

    /// Records of the subtree rooted at `id`, in document (pre-)order.
    pub fn pre_order(&self, id: &str) -> Vec<&Record> {
        self.subtree_ids(id)
            .iter()
            .filter_map(|i| self.nodes.get(i).map(|n| &n.record))
            .collect()
    }

    /// Every record in document order, starting at the root.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.pre_order(&self.root_id).into_iter()
    }

    fn subtree_ids(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        if !self.nodes.contains_key(id) {
            return out;
        }
        let mut stack = vec![id.to_string()];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(&current) {
                stack.extend(node.children.iter().rev().cloned());
            }
            out.push(current);
        }
        out
    }

    fn require_category(&self, id: &str) -> Result<()> {
        match self.get(id)? {
            Record::Category(_) => Ok(()),
            other => Err(KeeperError::InvalidTarget(format!(
                "{} '{}' cannot hold children",
                other.tag(),
                id
            ))),
        }
    }

    fn attach(&mut self, record: Record, parent_id: &str, position: Position) -> String {
        let id = record.id().to_string();
        if let Some(parent) = self.nodes.get_mut(parent_id) {
            let index = position.resolve(parent.children.len());
            parent.children.insert(index, id.clone());
        }
        self.nodes.insert(
            id.clone(),
            Node {
                record,
                parent: Some(parent_id.to_string()),
                children: Vec::new(),
            },
        );
        id
    }

    fn detach(&mut self, id: &str) {
        let parent = self.nodes.get(id).and_then(|n| n.parent.clone());
        if let Some(pid) = parent {
            if let Some(p) = self.nodes.get_mut(&pid) {
                p.children.retain(|c| c != id);
            }
        }
    }

    /// Inserts `record` as a child of the category `parent_id`.
    ///
    /// Fails with `InvalidTarget` if the parent is not a category or if the
    /// record's id is empty or already present.
    pub fn insert(&mut self, parent_id: &str, record: Record, position: Position) -> Result<String> {
        self.require_category(parent_id)?;
        if record.id().is_empty() {
            return Err(KeeperError::InvalidTarget("record id is empty".to_string()));
        }
        if self.nodes.contains_key(record.id()) {
            return Err(KeeperError::InvalidTarget(format!(
                "duplicate record id '{}'",
                record.id()
            )));
        }
        debug!("insert {} {} under {}", record.tag(), record.id(), parent_id);
        Ok(self.attach(record, parent_id, position))
    }

    /// Moves `id` with its subtree under `new_parent_id`.
    ///
    /// `position` indexes the new parent's children after `id` has been taken
    /// out, so reordering within one parent behaves as expected.
    pub fn move_node(&mut self, id: &str, new_parent_id: &str, position: Position) -> Result<()> {
        self.get(id)?;
        if id == self.root_id {
            return Err(KeeperError::InvalidTarget("the root cannot be moved".to_string()));
        }
        self.require_category(new_parent_id)?;
        if self.is_in_subtree(id, new_parent_id) {
            return Err(KeeperError::CyclicMove(format!(
                "'{id}' cannot be moved into its own subtree"
            )));
        }

        debug!("move {} under {}", id, new_parent_id);
        self.detach(id);
        if let Some(parent) = self.nodes.get_mut(new_parent_id) {
            let index = position.resolve(parent.children.len());
            parent.children.insert(index, id.to_string());
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = Some(new_parent_id.to_string());
        }
        Ok(())
    }

    /// Deep-copies the subtree at `id` under `parent_id` and returns the id of
    /// the new top record. Every copied record gets a fresh id; links inside
    /// the copy keep their original targets.
    ///
    /// Copying a category into its own subtree is allowed: the source subtree
    /// is captured before anything is inserted.
    pub fn copy(&mut self, id: &str, parent_id: &str, position: Position) -> Result<String> {
        self.get(id)?;
        self.require_category(parent_id)?;

        let snapshot: Vec<(Record, Option<String>)> = self
            .subtree_ids(id)
            .iter()
            .filter_map(|i| self.nodes.get(i))
            .map(|n| (n.record.clone(), n.parent.clone()))
            .collect();

        let mut id_map: HashMap<String, String> = HashMap::new();
        let mut top_id = String::new();
        for (record, old_parent) in snapshot {
            let copy = record.clone_with_new_id();
            let (new_parent, pos) = if record.id() == id {
                top_id = copy.id().to_string();
                (parent_id.to_string(), position)
            } else {
                // pre-order guarantees the parent was copied already
                let mapped = old_parent
                    .and_then(|p| id_map.get(&p).cloned())
                    .unwrap_or_default();
                (mapped, Position::Append)
            };
            id_map.insert(record.id().to_string(), copy.id().to_string());
            self.attach(copy, &new_parent, pos);
        }
        debug!("copy {} as {} under {}", id, top_id, parent_id);
        Ok(top_id)
    }

    /// Creates a link to `target_id` under `parent_id` and returns its id.
    pub fn link_to(&mut self, target_id: &str, parent_id: &str, position: Position) -> Result<String> {
        self.get(target_id)?;
        self.require_category(parent_id)?;
        let link = Link::new(target_id);
        debug!("link {} to {} under {}", link.id, target_id, parent_id);
        Ok(self.attach(Record::Link(link), parent_id, position))
    }

    /// Removes `id` and its subtree, then sweeps links to every removed id.
    pub fn remove(&mut self, id: &str) -> Result<DeleteResult> {
        self.get(id)?;
        if id == self.root_id {
            return Err(KeeperError::InvalidTarget("the root cannot be removed".to_string()));
        }

        let deleted_ids = self.subtree_ids(id);
        self.detach(id);
        for removed in &deleted_ids {
            self.nodes.remove(removed);
        }

        let mut swept_link_ids = Vec::new();
        for removed in &deleted_ids {
            swept_link_ids.extend(self.sweep_broken_links(removed));
        }
        debug!(
            "removed {} records and {} links under {}",
            deleted_ids.len(),
            swept_link_ids.len(),
            id
        );
        Ok(DeleteResult {
            deleted_ids,
            swept_link_ids,
        })
    }

    /// Removes every link whose target is `target_id` and returns their ids.
    pub fn sweep_broken_links(&mut self, target_id: &str) -> Vec<String> {
        let broken: Vec<String> = self
            .iter()
            .filter_map(|r| match r {
                Record::Link(l) if l.target_id == target_id => Some(l.id.clone()),
                _ => None,
            })
            .collect();
        for link_id in &broken {
            self.detach(link_id);
            self.nodes.remove(link_id);
        }
        broken
    }

    /// Replaces the content of `id` with `record`, keeping the id and the
    /// position in the tree and refreshing `modified`.
    ///
    /// A replacement link must point at a record that exists.
    pub fn update(&mut self, id: &str, mut record: Record) -> Result<()> {
        if let Record::Link(link) = &record {
            if !self.nodes.contains_key(&link.target_id) {
                return Err(KeeperError::NotFound(link.target_id.clone()));
            }
        }
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| KeeperError::NotFound(id.to_string()))?;
        if !node.record.same_variant(&record) {
            return Err(KeeperError::InvalidTarget(format!(
                "cannot turn {} '{}' into a {}",
                node.record.tag(),
                id,
                record.tag()
            )));
        }
        record.set_id(id.to_string());
        record.touch();
        node.record = record;
        debug!("update {}", id);
        Ok(())
    }

    /// Sets a category's expanded flag; returns whether it changed.
    pub fn set_expanded(&mut self, id: &str, expanded: bool) -> Result<bool> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| KeeperError::NotFound(id.to_string()))?;
        match &mut node.record {
            Record::Category(c) => {
                let changed = c.expanded != expanded;
                c.expanded = expanded;
                Ok(changed)
            }
            other => Err(KeeperError::InvalidTarget(format!(
                "{} '{}' cannot be expanded",
                other.tag(),
                id
            ))),
        }
    }

    /// Removes every link whose target does not exist, including links left
    /// dangling by an earlier pass, and returns their ids.
    pub fn remove_dangling_links(&mut self) -> Vec<String> {
        let mut removed = Vec::new();
        loop {
            let dangling: Vec<String> =
                self.dangling_links().into_iter().map(str::to_string).collect();
            if dangling.is_empty() {
                return removed;
            }
            for link_id in dangling {
                self.detach(&link_id);
                self.nodes.remove(&link_id);
                removed.push(link_id);
            }
        }
    }

    /// Ids of links whose target does not exist.
    pub fn dangling_links(&self) -> Vec<&str> {
        let ids: HashSet<&str> = self.nodes.keys().map(String::as_str).collect();
        self.iter()
            .filter_map(|r| match r {
                Record::Link(l) if !ids.contains(l.target_id.as_str()) => Some(l.id.as_str()),
                _ => None,
            })
            .collect()
    }
}
