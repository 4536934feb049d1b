//! Internal domain modules for the pwdkeeper core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod codec;
pub mod delete;
pub mod envelope;
pub mod error;
pub mod generator;
pub mod import;
pub mod intent;
pub mod record;
pub mod search;
pub mod tree;
pub mod vault;

#[doc(inline)]
pub use codec::{decode, decode_str, encode};
#[doc(inline)]
pub use delete::DeleteResult;
#[doc(inline)]
pub use envelope::{EnvelopeError, KdfParams};
#[doc(inline)]
pub use error::{KeeperError, Result};
#[doc(inline)]
pub use generator::{generate, GeneratorOptions};
#[doc(inline)]
pub use import::{import_legacy, import_legacy_file};
#[doc(inline)]
pub use intent::{can_paste, drop_onto, paste, Clipboard, DropPosition, PasteMode};
#[doc(inline)]
pub use record::{Card, Category, Field, FieldType, Link, Note, Picture, Record, RecordKind};
#[doc(inline)]
pub use search::{cards_with_field_value, search, select_all_under, SearchView};
#[doc(inline)]
pub use tree::{Position, RecordTree};
#[doc(inline)]
pub use vault::{DocumentStore, FileStore, MemoryStore, Vault};
