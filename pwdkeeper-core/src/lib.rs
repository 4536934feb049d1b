//! Core library for pwdkeeper, a hierarchical, encrypted password and notes store.
//!
//! The primary entry point is [`Vault`], which represents an open document:
//! a [`RecordTree`] plus the passphrase and [`DocumentStore`] it is persisted
//! with. All mutations made through `Vault` are written back immediately.
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use core::{
    codec::{decode, decode_str, encode},
    delete::DeleteResult,
    envelope::{
        is_sealed, open, open_reader, seal, seal_to_writer, seal_with, EnvelopeError, KdfParams,
    },
    error::{KeeperError, Result},
    generator::{generate, GeneratorOptions},
    import::{import_legacy, import_legacy_file},
    intent::{can_paste, drop_onto, paste, Clipboard, DropPosition, PasteMode},
    record::{Card, Category, Field, FieldType, Link, Note, Picture, Record, RecordKind},
    search::{cards_with_field_value, search, select_all_under, SearchView},
    tree::{Position, RecordTree},
    vault::{DocumentStore, FileStore, MemoryStore, Vault},
};
