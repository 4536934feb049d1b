//! Whole-document command handlers

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use pwdkeeper_core::{import_legacy_file, FileStore, Vault};

use super::Session;
use crate::output::Output;

fn refuse_overwrite(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists; pass --force to replace it",
            path.display()
        );
    }
    Ok(())
}

/// Create a new, empty document
pub fn init(session: &Session, force: bool, output: &Output) -> Result<()> {
    refuse_overwrite(&session.path, force)?;
    Vault::create(FileStore::new(&session.path), &session.passphrase, session.kdf)
        .context("Failed to create document")?;
    if session.passphrase.is_empty() {
        log::warn!("document created without a passphrase; it is stored as plain XML");
    }
    output.success(&format!("Created {}", session.path.display()));
    Ok(())
}

/// Build a new document from a legacy wallet export
pub fn import_legacy(session: &Session, source: &Path, force: bool, output: &Output) -> Result<()> {
    refuse_overwrite(&session.path, force)?;
    let tree = import_legacy_file(source).map_err(|e| anyhow::anyhow!(e.user_message()))?;
    let count = tree.record_count() - 1;
    Vault::from_tree(FileStore::new(&session.path), tree, &session.passphrase, session.kdf)
        .context("Failed to write imported document")?;
    output.success(&format!(
        "Imported {count} records from {} into {}",
        source.display(),
        session.path.display()
    ));
    Ok(())
}

/// Write the decrypted XML document to a file or stdout
pub fn export_xml(session: &Session, target: Option<&Path>, output: &Output) -> Result<()> {
    let vault = session.open()?;
    let xml = vault.export_xml()?;
    match target {
        Some(path) => {
            fs::write(path, &xml).with_context(|| format!("Failed to write {}", path.display()))?;
            output.success(&format!("Exported to {}", path.display()));
        }
        None => println!("{}", String::from_utf8_lossy(&xml)),
    }
    Ok(())
}

/// Re-seal the document under a new passphrase
pub fn passwd(session: &Session, new_passphrase: &str, output: &Output) -> Result<()> {
    let mut vault = session.open()?;
    vault
        .change_passphrase(new_passphrase)
        .context("Failed to re-encrypt document")?;
    if new_passphrase.is_empty() {
        output.success("Passphrase removed; document is now stored as plain XML");
    } else {
        output.success("Passphrase changed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use pwdkeeper_core::{KdfParams, Record};
    use tempfile::TempDir;

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet)
    }

    fn session(dir: &TempDir, passphrase: &str) -> Session {
        Session {
            path: dir.path().join("vault.pwk"),
            passphrase: passphrase.to_string(),
            kdf: KdfParams::low_memory(),
        }
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir, "pw");
        init(&session, false, &quiet()).unwrap();
        assert!(init(&session, false, &quiet()).is_err());
        init(&session, true, &quiet()).unwrap();
        assert_eq!(session.open().unwrap().tree().record_count(), 1);
    }

    #[test]
    fn test_import_legacy_writes_sealed_document() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("wallet.txt");
        fs::write(
            &source,
            "Category: Web\n\nCard Forum\nUser: alice\nPassword: pw1\n\nCard Memo\nText remember\n",
        )
        .unwrap();
        let session = session(&dir, "pw");

        import_legacy(&session, &source, false, &quiet()).unwrap();
        let vault = session.open().unwrap();
        assert!(vault.is_encrypted());
        let names: Vec<&str> = vault.tree().iter().map(Record::name).collect();
        assert!(names.contains(&"Forum"));
        assert!(names.contains(&"Memo"));

        assert!(import_legacy(&session, &source, false, &quiet()).is_err());
    }

    #[test]
    fn test_import_legacy_missing_source() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir, "pw");
        let result = import_legacy(&session, &dir.path().join("none.txt"), false, &quiet());
        assert!(result.is_err());
        assert!(!session.path.exists());
    }

    #[test]
    fn test_passwd_reseals_document() {
        let dir = TempDir::new().unwrap();
        let old = session(&dir, "old");
        init(&old, false, &quiet()).unwrap();

        passwd(&old, "new", &quiet()).unwrap();
        assert!(old.open().is_err());
        assert!(session(&dir, "new").open().is_ok());

        passwd(&session(&dir, "new"), "", &quiet()).unwrap();
        assert!(fs::read(&old.path).unwrap().starts_with(b"<?xml"));
    }

    #[test]
    fn test_export_xml_to_file() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir, "pw");
        init(&session, false, &quiet()).unwrap();
        let target = dir.path().join("plain.xml");

        export_xml(&session, Some(&target), &quiet()).unwrap();
        let xml = fs::read_to_string(&target).unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<root>"));
    }
}
