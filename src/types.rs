//! Public type definitions for the fidopgp library.
//!
//! This module contains the value types shared by key generation, signing
//! and verification.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// SHA-1 fingerprint of a public key packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub [u8; 20]);

impl Fingerprint {
    /// Raw fingerprint bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// The low 64 bits, used as the key ID in signatures.
    pub fn key_id(&self) -> KeyId {
        let mut id = [0u8; 8];
        id.copy_from_slice(&self.0[12..]);
        KeyId(id)
    }

    /// Upper-case hex, no spaces.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Eight-octet key ID (low bytes of the fingerprint).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyId(pub [u8; 8]);

impl KeyId {
    /// Raw key ID bytes.
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Upper-case hex, no spaces.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl std::fmt::Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Signature classes this crate produces and accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SignatureClass {
    /// Signature over a binary document (0x00)
    BinaryDocument = 0x00,
    /// Signature over a canonical text document (0x01)
    TextDocument = 0x01,
    /// Positive certification binding a user ID to the key (0x13)
    KeyBinding = 0x13,
}

impl SignatureClass {
    /// The signature type octet.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Whether this class signs a document rather than a key.
    pub fn is_document(self) -> bool {
        matches!(self, SignatureClass::BinaryDocument | SignatureClass::TextDocument)
    }
}

impl TryFrom<u8> for SignatureClass {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x00 => Ok(SignatureClass::BinaryDocument),
            0x01 => Ok(SignatureClass::TextDocument),
            0x13 => Ok(SignatureClass::KeyBinding),
            other => Err(Error::UnsupportedSignatureClass(other)),
        }
    }
}

/// Fields of a parsed public key packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    /// Creation time (unix seconds)
    pub created: u32,
    /// Uncompressed SEC1 P-256 point (0x04 || x || y)
    pub ec_point: [u8; 65],
    /// FIDO2 relying party the credential is scoped to
    pub relying_party: String,
}

impl PublicKey {
    /// Creation time as a DateTime.
    pub fn created_at(&self) -> DateTime<Utc> {
        crate::internal::timestamp_to_datetime(self.created)
    }
}

/// Information about a public key file.
#[derive(Debug, Clone)]
pub struct KeyInfo {
    /// Fingerprint as upper-case hex
    pub fingerprint: String,
    /// Key ID as upper-case hex
    pub key_id: String,
    /// User ID bound to the key
    pub user_id: String,
    /// FIDO2 relying party
    pub relying_party: String,
    /// Key creation time
    pub creation_time: DateTime<Utc>,
    /// Uncompressed SEC1 public point
    pub ec_point: Vec<u8>,
}

/// A newly generated key.
#[derive(Debug, Clone)]
pub struct GeneratedKey {
    /// Public key file: public key, user ID and self-signature packets
    pub public_key: Vec<u8>,
    /// Secret key file: a single secret key stub packet
    pub secret_key: Vec<u8>,
    /// Key fingerprint as hex string
    pub fingerprint: String,
}

/// Outcome of a signature check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    /// The signature is valid for the key and data
    Good,
    /// The signature does not match
    Bad,
}

/// Result of verifying a signature: always carries the key fingerprint,
/// also for a BAD signature.
#[derive(Debug, Clone)]
pub struct Verification {
    /// GOOD or BAD
    pub status: VerificationStatus,
    /// Fingerprint of the key the signature was checked against
    pub fingerprint: String,
    /// Signature creation time
    pub signed_at: DateTime<Utc>,
    /// Authenticator signature counter recorded in the signature
    pub counter: u32,
}

impl Verification {
    /// Whether the signature verified.
    pub fn is_good(&self) -> bool {
        self.status == VerificationStatus::Good
    }
}
