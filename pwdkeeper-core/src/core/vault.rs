//! An open document: the record tree, its passphrase and where it is stored.
//!
//! Every mutation made through a [`Vault`] is written back to its
//! [`DocumentStore`] before the call returns, so the persisted ciphertext
//! never lags behind the in-memory tree.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use zeroize::Zeroizing;

use crate::core::codec;
use crate::core::delete::DeleteResult;
use crate::core::envelope::{self, EnvelopeError, KdfParams};
use crate::core::error::{KeeperError, Result};
use crate::core::intent::{self, Clipboard, DropPosition, PasteMode};
use crate::core::record::Record;
use crate::core::tree::{Position, RecordTree};

/// Whole-document persistence backend.
pub trait DocumentStore {
    /// Returns the stored bytes.
    fn load(&self) -> Result<Vec<u8>>;

    /// Replaces the stored bytes.
    fn save(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Stores the document in a single file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentStore for FileStore {
    fn load(&self) -> Result<Vec<u8>> {
        Ok(fs::read(&self.path)?)
    }

    /// Writes a sibling temp file and renames it over the document.
    fn save(&mut self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Keeps the document in memory. Counts saves.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    bytes: Option<Vec<u8>>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Some(bytes),
            saves: 0,
        }
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }

    /// Number of times the document has been written.
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self) -> Result<Vec<u8>> {
        self.bytes.clone().ok_or_else(|| {
            KeeperError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no document stored",
            ))
        })
    }

    fn save(&mut self, bytes: &[u8]) -> Result<()> {
        self.bytes = Some(bytes.to_vec());
        self.saves += 1;
        Ok(())
    }
}

/// An open document session.
pub struct Vault<S: DocumentStore> {
    tree: RecordTree,
    passphrase: Zeroizing<String>,
    kdf: KdfParams,
    store: S,
}

impl<S: DocumentStore> std::fmt::Debug for Vault<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("records", &self.tree.record_count())
            .field("encrypted", &!self.passphrase.is_empty())
            .field("kdf", &self.kdf)
            .finish()
    }
}

impl<S: DocumentStore> Vault<S> {
    /// Starts a new, empty document and writes it immediately.
    pub fn create(store: S, passphrase: &str, kdf: KdfParams) -> Result<Self> {
        Self::from_tree(store, RecordTree::default(), passphrase, kdf)
    }

    /// Wraps an existing tree (e.g. from a legacy import) and writes it.
    pub fn from_tree(store: S, tree: RecordTree, passphrase: &str, kdf: KdfParams) -> Result<Self> {
        let mut vault = Self {
            tree,
            passphrase: Zeroizing::new(passphrase.to_string()),
            kdf,
            store,
        };
        vault.save()?;
        Ok(vault)
    }

    /// Loads, decrypts and decodes the stored document.
    ///
    /// `kdf` is only used for later saves; opening reads the parameters the
    /// document was sealed with.
    pub fn open(store: S, passphrase: &str, kdf: KdfParams) -> Result<Self> {
        let sealed = store.load()?;
        if passphrase.is_empty() && envelope::is_sealed(&sealed) {
            return Err(EnvelopeError::PassphraseRequired.into());
        }
        let plain = envelope::open(&sealed, passphrase)?;
        let tree = codec::decode(&plain)?;
        info!("opened document with {} records", tree.record_count());
        Ok(Self {
            tree,
            passphrase: Zeroizing::new(passphrase.to_string()),
            kdf,
            store,
        })
    }

    /// Encodes, seals and writes the whole tree.
    pub fn save(&mut self) -> Result<()> {
        let plain = Zeroizing::new(codec::encode(&self.tree)?);
        let sealed = envelope::seal_with(&plain, &self.passphrase, &self.kdf)?;
        self.store.save(&sealed)?;
        debug!("saved document ({} bytes)", sealed.len());
        Ok(())
    }

    pub fn tree(&self) -> &RecordTree {
        &self.tree
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_encrypted(&self) -> bool {
        !self.passphrase.is_empty()
    }

    /// Re-seals the document under `passphrase`. Empty stores plaintext.
    pub fn change_passphrase(&mut self, passphrase: &str) -> Result<()> {
        let previous = std::mem::replace(
            &mut self.passphrase,
            Zeroizing::new(passphrase.to_string()),
        );
        if let Err(e) = self.save() {
            self.passphrase = previous;
            return Err(e);
        }
        info!("passphrase changed");
        Ok(())
    }

    /// Plain XML of the current tree.
    pub fn export_xml(&self) -> Result<Vec<u8>> {
        codec::encode(&self.tree)
    }

    /// Applies `change` to the tree and writes the result when `persist` says
    /// so. If either step fails the tree is restored, so the session never
    /// holds a change the store did not accept.
    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut RecordTree) -> Result<T>,
        persist: impl FnOnce(&T) -> bool,
    ) -> Result<T> {
        let snapshot = self.tree.clone();
        let outcome = change(&mut self.tree).and_then(|value| {
            if persist(&value) {
                self.save()?;
            }
            Ok(value)
        });
        if let Err(e) = &outcome {
            warn!("change rolled back: {e}");
            self.tree = snapshot;
        }
        outcome
    }

    pub fn insert(&mut self, parent_id: &str, record: Record, position: Position) -> Result<String> {
        self.commit(|tree| tree.insert(parent_id, record, position), |_| true)
    }

    pub fn update(&mut self, id: &str, record: Record) -> Result<()> {
        self.commit(|tree| tree.update(id, record), |_| true)
    }

    pub fn move_node(&mut self, id: &str, new_parent_id: &str, position: Position) -> Result<()> {
        self.commit(|tree| tree.move_node(id, new_parent_id, position), |_| true)
    }

    pub fn copy(&mut self, id: &str, parent_id: &str, position: Position) -> Result<String> {
        self.commit(|tree| tree.copy(id, parent_id, position), |_| true)
    }

    pub fn link_to(&mut self, target_id: &str, parent_id: &str, position: Position) -> Result<String> {
        self.commit(|tree| tree.link_to(target_id, parent_id, position), |_| true)
    }

    pub fn remove(&mut self, id: &str) -> Result<DeleteResult> {
        self.commit(|tree| tree.remove(id), |_| true)
    }

    /// Records the expand/collapse state of a category; writes only on change.
    pub fn set_expanded(&mut self, id: &str, expanded: bool) -> Result<bool> {
        self.commit(|tree| tree.set_expanded(id, expanded), |changed| *changed)
    }

    pub fn paste(&mut self, clipboard: &Clipboard, target_id: &str) -> Result<Option<String>> {
        self.commit(|tree| clipboard.paste(tree, target_id), Option::is_some)
    }

    pub fn paste_link(&mut self, clipboard: &Clipboard, target_id: &str) -> Result<Option<String>> {
        self.commit(|tree| clipboard.paste_link(tree, target_id), Option::is_some)
    }

    pub fn drop_onto(
        &mut self,
        source_id: &str,
        target_id: &str,
        mode: PasteMode,
        position: DropPosition,
    ) -> Result<Option<String>> {
        self.commit(
            |tree| intent::drop_onto(tree, source_id, target_id, mode, position),
            Option::is_some,
        )
    }
}
