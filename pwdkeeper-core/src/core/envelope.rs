//! Passphrase-keyed encryption wrapper for document bytes.
//!
//! A sealed document is laid out as:
//!
//! ```text
//! magic (8) | memory_kib (u32 LE) | iterations (u32 LE) | parallelism (u32 LE)
//!           | salt (32) | nonce (12) | AES-256-GCM ciphertext + tag
//! ```
//!
//! The key is derived from the passphrase with Argon2id using the parameters
//! stored in the header, so a document stays readable if the default profile
//! changes later. An empty passphrase is the identity transform in both
//! directions: the bytes are stored as plaintext and returned unchanged.
//!
//! Documents written by the earlier format (a 16-byte IV followed by
//! AES-256-CBC/PKCS#7 ciphertext, keyed with SHA-256 of the passphrase) can be
//! opened but are never written.

use std::io::{Read, Write};

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Leading bytes of every sealed document.
pub const MAGIC: &[u8; 8] = b"PWKEEP1\n";

const SALT_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const HEADER_LEN: usize = MAGIC.len() + 12 + SALT_LEN + NONCE_LEN;

/// Upper bound on the Argon2 memory cost accepted from a header (4 GiB).
const MAX_MEMORY_KIB: u32 = 4 * 1024 * 1024;

const LEGACY_IV_LEN: usize = 16;
const LEGACY_BLOCK_LEN: usize = 16;

type LegacyDecryptor = cbc::Decryptor<aes::Aes256>;

/// Failures specific to sealing or opening an envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The stream starts like an envelope but ends before the header or tag.
    #[error("Envelope is truncated")]
    Truncated,

    /// The passphrase is wrong or the ciphertext was modified.
    #[error("Authentication failed: wrong passphrase or corrupted data")]
    AuthenticationFailed,

    /// The document is sealed but no passphrase was supplied.
    #[error("Document is encrypted; a passphrase is required")]
    PassphraseRequired,

    /// A passphrase was supplied but the bytes are not an envelope.
    #[error("Document is not encrypted")]
    NotEncrypted,

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KdfParams {
    /// Memory in KiB.
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 19456, // 19 MiB
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    /// Cheap parameters for constrained machines and test suites.
    pub fn low_memory() -> Self {
        Self {
            memory_kib: 8192, // 8 MiB
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Derived key, wiped from memory on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct DerivedKey {
    key: [u8; 32],
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

fn derive_key(
    passphrase: &str,
    salt: &[u8; SALT_LEN],
    params: &KdfParams,
) -> Result<DerivedKey, EnvelopeError> {
    if params.memory_kib > MAX_MEMORY_KIB {
        return Err(EnvelopeError::KeyDerivation(format!(
            "memory cost {} KiB exceeds limit",
            params.memory_kib
        )));
    }
    let argon2_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(32),
    )
    .map_err(|e| EnvelopeError::KeyDerivation(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = DerivedKey { key: [0u8; 32] };
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key.key)
        .map_err(|e| EnvelopeError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::rng().fill_bytes(&mut bytes);
    bytes
}

/// True when `data` begins with the envelope magic.
#[must_use]
pub fn is_sealed(data: &[u8]) -> bool {
    data.starts_with(MAGIC)
}

/// Seals `plaintext` under `passphrase` with the default KDF profile.
///
/// An empty passphrase returns `plaintext` unchanged.
pub fn seal(plaintext: &[u8], passphrase: &str) -> Result<Vec<u8>, EnvelopeError> {
    seal_with(plaintext, passphrase, &KdfParams::default())
}

/// Seals `plaintext` under `passphrase` using explicit KDF parameters.
///
/// A fresh salt and nonce are drawn for every call, so sealing the same bytes
/// twice never yields the same output.
pub fn seal_with(
    plaintext: &[u8],
    passphrase: &str,
    params: &KdfParams,
) -> Result<Vec<u8>, EnvelopeError> {
    if passphrase.is_empty() {
        return Ok(plaintext.to_vec());
    }

    let salt: [u8; SALT_LEN] = random_bytes();
    let nonce: [u8; NONCE_LEN] = random_bytes();
    let key = derive_key(passphrase, &salt, params)?;

    let cipher = Aes256Gcm::new_from_slice(&key.key)
        .map_err(|e| EnvelopeError::Encryption(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| EnvelopeError::Encryption("AES-GCM encryption failed".into()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&params.memory_kib.to_le_bytes());
    out.extend_from_slice(&params.iterations.to_le_bytes());
    out.extend_from_slice(&params.parallelism.to_le_bytes());
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Opens bytes produced by [`seal`] or [`seal_with`], or by the earlier CBC
/// format.
///
/// With an empty passphrase the input is returned unchanged, whatever it
/// contains. Callers that need to tell a sealed document from plaintext check
/// [`is_sealed`] first.
pub fn open(data: &[u8], passphrase: &str) -> Result<Vec<u8>, EnvelopeError> {
    if passphrase.is_empty() {
        return Ok(data.to_vec());
    }
    if !is_sealed(data) {
        return open_legacy(data, passphrase);
    }
    if data.len() < HEADER_LEN + TAG_LEN {
        return Err(EnvelopeError::Truncated);
    }

    let (params, salt, nonce) = read_header(data);
    let key = derive_key(passphrase, &salt, &params)?;

    let cipher = Aes256Gcm::new_from_slice(&key.key)
        .map_err(|e| EnvelopeError::KeyDerivation(e.to_string()))?;
    cipher
        .decrypt(Nonce::from_slice(&nonce), &data[HEADER_LEN..])
        .map_err(|_| EnvelopeError::AuthenticationFailed)
}

/// True for bytes that start like an XML document rather than ciphertext.
fn looks_like_xml(data: &[u8]) -> bool {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    let data = &data[start..];
    data.starts_with(b"<?xml") || data.starts_with(b"<root")
}

/// Decrypts the earlier IV-prefixed AES-256-CBC format.
fn open_legacy(data: &[u8], passphrase: &str) -> Result<Vec<u8>, EnvelopeError> {
    if looks_like_xml(data)
        || data.len() < LEGACY_IV_LEN + LEGACY_BLOCK_LEN
        || (data.len() - LEGACY_IV_LEN) % LEGACY_BLOCK_LEN != 0
    {
        return Err(EnvelopeError::NotEncrypted);
    }

    let key = DerivedKey {
        key: Sha256::digest(passphrase.as_bytes()).into(),
    };
    let (iv, body) = data.split_at(LEGACY_IV_LEN);
    let mut buf = body.to_vec();
    let plain_len = LegacyDecryptor::new_from_slices(&key.key, iv)
        .map_err(|e| EnvelopeError::KeyDerivation(e.to_string()))?
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|_| EnvelopeError::AuthenticationFailed)?
        .len();
    buf.truncate(plain_len);
    log::info!("opened document in the legacy CBC format");
    Ok(buf)
}

/// Reads KDF parameters, salt and nonce from a header of known length.
fn read_header(data: &[u8]) -> (KdfParams, [u8; SALT_LEN], [u8; NONCE_LEN]) {
    let word = |offset: usize| {
        let mut b = [0u8; 4];
        b.copy_from_slice(&data[offset..offset + 4]);
        u32::from_le_bytes(b)
    };
    let base = MAGIC.len();
    let params = KdfParams {
        memory_kib: word(base),
        iterations: word(base + 4),
        parallelism: word(base + 8),
    };
    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&data[base + 12..base + 12 + SALT_LEN]);
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&data[base + 12 + SALT_LEN..HEADER_LEN]);
    (params, salt, nonce)
}

/// Reads the whole of `reader` and opens it.
pub fn open_reader<R: Read>(mut reader: R, passphrase: &str) -> crate::Result<Vec<u8>> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    Ok(open(&data, passphrase)?)
}

/// Seals `plaintext` and writes the result to `writer`.
pub fn seal_to_writer<W: Write>(
    mut writer: W,
    plaintext: &[u8],
    passphrase: &str,
    params: &KdfParams,
) -> crate::Result<()> {
    let sealed = seal_with(plaintext, passphrase, params)?;
    writer.write_all(&sealed)?;
    writer.flush()?;
    Ok(())
}
