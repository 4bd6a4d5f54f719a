//! Verification functions.
//!
//! This module provides functions for verifying detached signatures and
//! key binding self-signatures. Structural problems with the key or the
//! signature are errors; a signature that does not match is reported as
//! [`VerificationStatus::Bad`].

use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use crate::authenticator::adapter;
use crate::error::{Error, Result};
use crate::internal::timestamp_to_datetime;
use crate::parse::{load_certificate, load_public_key_file, Certificate};
use crate::signature::{key_binding_digest, parse_signature, DocumentHasher, SignatureInfo};
use crate::types::{SignatureClass, Verification, VerificationStatus};

/// Verify a detached signature on bytes.
///
/// # Arguments
/// * `public_key` - The signer's public key file (a secret key stub also works)
/// * `data` - The original data that was signed
/// * `signature` - The detached signature packet
///
/// # Returns
/// A [`Verification`] carrying GOOD or BAD, the key fingerprint, the
/// signature time and the authenticator counter.
///
/// # Example
/// ```ignore
/// let public_key = std::fs::read("alice.pub")?;
/// let signature = std::fs::read("document.sig")?;
/// let result = verify_bytes_detached(&public_key, b"document", &signature)?;
/// assert!(result.is_good());
/// ```
pub fn verify_bytes_detached(
    public_key: &[u8],
    data: &[u8],
    signature: &[u8],
) -> Result<Verification> {
    verify_reader_detached(public_key, Cursor::new(data), signature)
}

/// Verify a detached signature over everything `reader` yields.
///
/// The key and signature are parsed before any data is read.
pub fn verify_reader_detached(
    public_key: &[u8],
    reader: impl Read,
    signature: &[u8],
) -> Result<Verification> {
    let cert = load_certificate(public_key)?;
    let info = parse_signature(signature)?;
    if !info.class.is_document() {
        return Err(Error::UnsupportedSignatureClass(info.class.to_u8()));
    }

    let mut hasher = DocumentHasher::new(info.class)?;
    hasher.update_reader(reader)?;
    let digest = hasher.finish(&info.hashed_prefix);

    check_signature(&cert, &info, &digest)
}

/// Verify a detached signature on a file.
///
/// # Arguments
/// * `public_key` - The signer's public key file
/// * `file` - Path to the signed file
/// * `signature` - The detached signature packet
pub fn verify_file_detached(
    public_key: &[u8],
    file: impl AsRef<Path>,
    signature: &[u8],
) -> Result<Verification> {
    let input = BufReader::new(File::open(file.as_ref())?);
    verify_reader_detached(public_key, input, signature)
}

/// Verify the self-signature binding the user ID to the key.
///
/// # Arguments
/// * `public_key` - A public key file (public key, user ID and signature packets)
pub fn verify_key_binding(public_key: &[u8]) -> Result<Verification> {
    let cert = load_public_key_file(public_key)?;
    let Some((user_id, info)) = &cert.binding else {
        return Err(Error::MalformedInput("public key file has no self-signature".to_string()));
    };
    if info.class != SignatureClass::KeyBinding {
        return Err(Error::UnsupportedSignatureClass(info.class.to_u8()));
    }

    let digest = key_binding_digest(&cert.public_body, user_id, &info.hashed_prefix);
    check_signature(&cert, info, &digest)
}

fn check_signature(
    cert: &Certificate,
    info: &SignatureInfo,
    digest: &[u8; 32],
) -> Result<Verification> {
    let status = if digest[..2] != info.digest16 {
        tracing::debug!("digest check bytes differ");
        VerificationStatus::Bad
    } else if info
        .issuer
        .is_some_and(|issuer| issuer != cert.fingerprint.key_id())
    {
        tracing::debug!("issuer does not match key");
        VerificationStatus::Bad
    } else {
        let sig = &info.signature;
        let hash = adapter::reconstruct_authenticator_hash(
            &cert.public_key.relying_party,
            sig.flags,
            sig.counter,
            digest,
        );
        if adapter::verify(&cert.public_key.ec_point, &sig.r, &sig.s, &hash)? {
            VerificationStatus::Good
        } else {
            VerificationStatus::Bad
        }
    };

    let fingerprint = cert.fingerprint.to_hex();
    match status {
        VerificationStatus::Good => {
            tracing::debug!(
                fingerprint = %fingerprint,
                counter = info.signature.counter,
                "good signature"
            )
        }
        VerificationStatus::Bad => {
            tracing::warn!(fingerprint = %fingerprint, "bad signature")
        }
    }

    Ok(Verification {
        status,
        fingerprint,
        signed_at: timestamp_to_datetime(info.created),
        counter: info.signature.counter,
    })
}
