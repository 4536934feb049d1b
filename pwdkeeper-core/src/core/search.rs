//! Read-only queries over a [`RecordTree`].

use crate::core::record::Record;
use crate::core::tree::RecordTree;

/// Result of [`search`].
#[derive(Debug, PartialEq)]
pub enum SearchView<'a> {
    /// The query was empty; show the tree as it is.
    FullTree,
    /// Flattened matches in document order.
    Matches(Vec<&'a Record>),
}

impl<'a> SearchView<'a> {
    /// Matched records, or `None` for the full-tree view.
    pub fn matches(&self) -> Option<&[&'a Record]> {
        match self {
            SearchView::FullTree => None,
            SearchView::Matches(m) => Some(m.as_slice()),
        }
    }
}

/// Case-insensitive substring search on record names.
///
/// A category whose name matches contributes every card and note below it
/// without re-testing their names. A category that does not match is left out
/// but its children are searched. Links never match.
pub fn search<'a>(tree: &'a RecordTree, query: &str) -> SearchView<'a> {
    if query.is_empty() {
        return SearchView::FullTree;
    }
    let needle = query.to_lowercase();
    let mut out = Vec::new();
    search_under(tree, tree.root_id(), &needle, &mut out);
    SearchView::Matches(out)
}

fn search_under<'a>(tree: &'a RecordTree, id: &str, needle: &str, out: &mut Vec<&'a Record>) {
    for child in tree.child_records(id) {
        match child {
            Record::Category(c) => {
                if c.name.to_lowercase().contains(needle) {
                    collect_leaves(tree, &c.id, out);
                } else {
                    search_under(tree, &c.id, needle, out);
                }
            }
            Record::Link(_) => {}
            leaf => {
                if leaf.name().to_lowercase().contains(needle) {
                    out.push(leaf);
                }
            }
        }
    }
}

fn collect_leaves<'a>(tree: &'a RecordTree, id: &str, out: &mut Vec<&'a Record>) {
    for child in tree.child_records(id) {
        match child {
            Record::Category(c) => collect_leaves(tree, &c.id, out),
            Record::Link(_) => {}
            leaf => out.push(leaf),
        }
    }
}

/// Every card and note below `category_id`, flattened in document order.
/// Links and the categories themselves are skipped.
pub fn select_all_under<'a>(tree: &'a RecordTree, category_id: &str) -> Vec<&'a Record> {
    let mut out = Vec::new();
    collect_leaves(tree, category_id, &mut out);
    out
}

/// Cards having at least one field whose value contains `query`, ignoring case.
pub fn cards_with_field_value<'a>(tree: &'a RecordTree, query: &str) -> Vec<&'a Record> {
    let needle = query.to_lowercase();
    tree.iter()
        .filter(|r| match r {
            Record::Card(card) => card
                .fields
                .iter()
                .any(|f| f.value.to_lowercase().contains(&needle)),
            _ => false,
        })
        .collect()
}
