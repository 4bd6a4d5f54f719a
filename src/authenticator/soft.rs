//! Software authenticator.
//!
//! Behaves like a FIDO2 security key as far as this crate can observe: it
//! builds authenticator data from the relying party, its flags and a
//! monotonically increasing counter, and signs `authData || clientDataHash`
//! with ES256. The private keys live in process memory, so this is meant
//! for tests and for integrators without hardware.

use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use super::types::{Assertion, AssertionSigner, Registration, SignerError, FLAG_USER_PRESENT};
use crate::error::{Error, Result};

/// A P-256 private key held in software.
///
/// Distinct from [`super::CredentialReference`]: only this type can sign.
pub struct PrivateKeyMaterial(SigningKey);

impl PrivateKeyMaterial {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        Self(SigningKey::random(&mut OsRng))
    }

    /// Load a key from its 32-byte scalar.
    pub fn from_bytes(scalar: &[u8]) -> Result<Self> {
        SigningKey::from_slice(scalar)
            .map(Self)
            .map_err(|_| Error::InvalidInput("invalid P-256 private scalar".to_string()))
    }

    /// Uncompressed SEC1 public point.
    pub fn public_point(&self) -> [u8; 65] {
        let mut point = [0u8; 65];
        point.copy_from_slice(self.0.verifying_key().to_encoded_point(false).as_bytes());
        point
    }
}

impl std::fmt::Debug for PrivateKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKeyMaterial(..)")
    }
}

struct StoredCredential {
    id: Vec<u8>,
    relying_party: String,
    key: PrivateKeyMaterial,
}

/// In-memory FIDO2 authenticator.
#[derive(Default)]
pub struct SoftwareAuthenticator {
    credentials: Vec<StoredCredential>,
    counter: u32,
    user_absent: bool,
}

impl SoftwareAuthenticator {
    /// Create an authenticator with no credentials and counter 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new random credential for `relying_party`.
    pub fn register(&mut self, relying_party: &str) -> Registration {
        let id: [u8; 32] = rand::random();
        self.import(relying_party, &id, PrivateKeyMaterial::generate())
    }

    /// Store a credential with a caller-chosen handle and key.
    pub fn import(
        &mut self,
        relying_party: &str,
        credential_id: &[u8],
        key: PrivateKeyMaterial,
    ) -> Registration {
        let registration = Registration {
            relying_party: relying_party.to_string(),
            ec_point: key.public_point(),
            credential_id: credential_id.to_vec(),
        };
        self.credentials.push(StoredCredential {
            id: credential_id.to_vec(),
            relying_party: relying_party.to_string(),
            key,
        });
        registration
    }

    /// Current signature counter.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Set the signature counter, e.g. to replay a fixed sequence.
    pub fn set_counter(&mut self, counter: u32) {
        self.counter = counter;
    }

    /// Simulate assertions without user presence (UP flag cleared).
    pub fn set_user_absent(&mut self, absent: bool) {
        self.user_absent = absent;
    }
}

impl AssertionSigner for SoftwareAuthenticator {
    fn get_assertion(
        &mut self,
        pre_hashed: &[u8; 32],
        relying_party: &str,
        credential_id: &[u8],
    ) -> std::result::Result<Assertion, SignerError> {
        let credential = self
            .credentials
            .iter()
            .find(|c| c.id == credential_id && c.relying_party == relying_party)
            .ok_or(SignerError::CredentialNotFound)?;

        self.counter = self.counter.wrapping_add(1);
        let flags = if self.user_absent { 0 } else { FLAG_USER_PRESENT };

        let mut signed = Vec::with_capacity(37 + 32);
        signed.extend_from_slice(&Sha256::digest(relying_party.as_bytes()));
        signed.push(flags);
        signed.extend_from_slice(&self.counter.to_be_bytes());
        signed.extend_from_slice(pre_hashed);

        let signature: Signature = credential.key.0.sign(&signed);
        Ok(Assertion {
            signature_der: signature.to_der().to_bytes().to_vec(),
            flags,
            counter: self.counter,
        })
    }
}
