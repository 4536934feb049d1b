//! Result type for record removal.
//!
//! Removing a record always takes its whole subtree with it. Every removed id
//! is then swept from the tree: links pointing at any of them are deleted too,
//! and reported separately so callers can tell the two apart.
//!
//! ```rust
//! use pwdkeeper_core::DeleteResult;
//!
//! let result = DeleteResult {
//!     deleted_ids: vec!["card-1".to_string()],
//!     swept_link_ids: vec!["link-1".to_string()],
//! };
//! assert_eq!(result.total(), 2);
//! let json = serde_json::to_string(&result).unwrap();
//! assert!(json.contains("sweptLinkIds"));
//! ```

use serde::{Deserialize, Serialize};

/// The outcome of [`RecordTree::remove`](super::tree::RecordTree::remove).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    /// The removed record followed by its descendants, in pre-order.
    pub deleted_ids: Vec<String>,

    /// Links elsewhere in the tree removed because their target was deleted.
    pub swept_link_ids: Vec<String>,
}

impl DeleteResult {
    /// Number of records that left the tree.
    #[must_use]
    pub fn total(&self) -> usize {
        self.deleted_ids.len() + self.swept_link_ids.len()
    }
}
