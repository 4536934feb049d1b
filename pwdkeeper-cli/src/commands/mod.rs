//! Command handlers

pub mod config;
pub mod document;
pub mod records;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use pwdkeeper_core::{FileStore, KdfParams, RecordTree, Vault};

/// Everything needed to open the current document.
pub struct Session {
    pub path: PathBuf,
    pub passphrase: String,
    pub kdf: KdfParams,
}

impl Session {
    pub fn open(&self) -> Result<Vault<FileStore>> {
        Vault::open(FileStore::new(&self.path), &self.passphrase, self.kdf).map_err(|e| {
            anyhow::anyhow!("{} ({})", e.user_message(), self.path.display())
        })
    }
}

/// Resolves a full id, a unique id prefix, or `/` for the root.
pub fn resolve_id(tree: &RecordTree, arg: &str) -> Result<String> {
    if arg == "/" {
        return Ok(tree.root_id().to_string());
    }
    if tree.contains(arg) {
        return Ok(arg.to_string());
    }
    let matches: Vec<&str> = tree
        .iter()
        .map(|r| r.id())
        .filter(|id| id.starts_with(arg))
        .collect();
    match matches.as_slice() {
        [] => bail!("No record matches '{arg}'"),
        [one] => Ok((*one).to_string()),
        _ => bail!("'{arg}' is ambiguous ({} records match)", matches.len()),
    }
}

/// Resolves an optional parent argument, defaulting to the root.
pub fn resolve_parent(tree: &RecordTree, arg: Option<&str>) -> Result<String> {
    match arg {
        Some(a) => resolve_id(tree, a).context("Invalid parent"),
        None => Ok(tree.root_id().to_string()),
    }
}
