//! Signing functions.
//!
//! This module provides functions for creating detached signatures with a
//! key whose private half lives on a FIDO2 authenticator.

use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::authenticator::{AssertionSigner, CredentialReference};
use crate::error::Result;
use crate::internal::resolve_timestamp;
use crate::key::parse_secret_stub;
use crate::signature::{begin_signature, DocumentHasher, SealedDigest};
use crate::types::SignatureClass;

/// Create a detached binary signature for bytes.
///
/// # Arguments
/// * `secret_key` - The signer's secret key stub (binary)
/// * `data` - The data to sign
/// * `creation_time` - Optional signature time (defaults to now)
/// * `signer` - Authenticator holding the credential
///
/// # Returns
/// The binary signature packet.
///
/// # Example
///
/// ```no_run
/// use fidopgp::authenticator::SoftwareAuthenticator;
/// use fidopgp::{create_key, sign_bytes_detached, verify_bytes_detached};
///
/// let mut token = SoftwareAuthenticator::new();
/// let registration = token.register("openpgp:");
/// let key = create_key(&registration, "Alice <alice@example.com>", None, &mut token).unwrap();
///
/// let data = b"File contents";
/// let signature = sign_bytes_detached(&key.secret_key, data, None, &mut token).unwrap();
///
/// let result = verify_bytes_detached(&key.public_key, data, &signature).unwrap();
/// assert!(result.is_good());
/// ```
pub fn sign_bytes_detached(
    secret_key: &[u8],
    data: &[u8],
    creation_time: Option<DateTime<Utc>>,
    signer: &mut dyn AssertionSigner,
) -> Result<Vec<u8>> {
    sign_reader_detached(
        secret_key,
        Cursor::new(data),
        SignatureClass::BinaryDocument,
        creation_time,
        signer,
    )
}

/// Create a detached text signature for bytes.
///
/// Line endings are canonicalized before hashing: every `\n` is hashed as
/// `\r\n`.
pub fn sign_text_detached(
    secret_key: &[u8],
    data: &[u8],
    creation_time: Option<DateTime<Utc>>,
    signer: &mut dyn AssertionSigner,
) -> Result<Vec<u8>> {
    sign_reader_detached(
        secret_key,
        Cursor::new(data),
        SignatureClass::TextDocument,
        creation_time,
        signer,
    )
}

/// Create a detached signature over everything `reader` yields.
///
/// The input is hashed in fixed-size chunks, so memory use does not depend
/// on its size.
///
/// # Arguments
/// * `secret_key` - The signer's secret key stub (binary)
/// * `reader` - Document source
/// * `class` - `BinaryDocument` or `TextDocument`
/// * `creation_time` - Optional signature time (defaults to now)
/// * `signer` - Authenticator holding the credential
pub fn sign_reader_detached(
    secret_key: &[u8],
    reader: impl Read,
    class: SignatureClass,
    creation_time: Option<DateTime<Utc>>,
    signer: &mut dyn AssertionSigner,
) -> Result<Vec<u8>> {
    let credential = parse_secret_stub(secret_key)?;
    let created = resolve_timestamp(creation_time)?;

    let mut hasher = DocumentHasher::new(class)?;
    let consumed = hasher.update_reader(reader)?;
    tracing::debug!(bytes = consumed, class = ?class, "document hashed");

    let context = begin_signature(class, created, &credential.fingerprint());
    hasher.seal(context)?.sign(&credential, signer)
}

/// Create a detached signature for a file.
///
/// # Arguments
/// * `secret_key` - The signer's secret key stub
/// * `input` - Path to the file to sign
/// * `class` - `BinaryDocument` or `TextDocument`
/// * `creation_time` - Optional signature time (defaults to now)
/// * `signer` - Authenticator holding the credential
///
/// # Returns
/// The binary signature packet.
pub fn sign_file_detached(
    secret_key: &[u8],
    input: impl AsRef<Path>,
    class: SignatureClass,
    creation_time: Option<DateTime<Utc>>,
    signer: &mut dyn AssertionSigner,
) -> Result<Vec<u8>> {
    let file = BufReader::new(File::open(input.as_ref())?);
    sign_reader_detached(secret_key, file, class, creation_time, signer)
}

/// Produce the self-signature binding `user_id` to the credential's key.
pub(crate) fn certify_user_id(
    credential: &CredentialReference,
    user_id: &str,
    created: u32,
    signer: &mut dyn AssertionSigner,
) -> Result<Vec<u8>> {
    let context = begin_signature(SignatureClass::KeyBinding, created, &credential.fingerprint());
    SealedDigest::key_binding(credential.public_key_body(), user_id, context)?
        .sign(credential, signer)
}
