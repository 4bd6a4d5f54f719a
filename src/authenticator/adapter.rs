//! Translation between FIDO2 assertions and OpenPGP signature values.
//!
//! A security key never signs the OpenPGP digest directly. It signs
//! `authData || clientDataHash` with ECDSA-SHA256, where `authData` is
//! `SHA256(rp) || flags || counter` and the crate passes the OpenPGP digest
//! as `clientDataHash`. The signature value therefore carries the flags and
//! counter after the two MPIs so a verifier can rebuild that input:
//!
//! ```text
//! MPI(r) || MPI(s) || flags (1) || counter (4, big-endian)
//! ```

use p256::ecdsa::signature::hazmat::PrehashVerifier;
use p256::ecdsa::{Signature, VerifyingKey};
use sha2::{Digest, Sha256};

use super::types::{AssertionSigner, CredentialReference, FLAG_USER_PRESENT};
use crate::error::{Error, Result};
use crate::internal::Reader;
use crate::mpi::Mpi;

/// Size of a P-256 scalar in bytes.
const SCALAR_LEN: usize = 32;

/// An ECDSA signature produced through a FIDO2 assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fido2Signature {
    /// ECDSA r
    pub r: Mpi,
    /// ECDSA s
    pub s: Mpi,
    /// Authenticator data flags at signing time
    pub flags: u8,
    /// Authenticator signature counter at signing time
    pub counter: u32,
}

impl Fido2Signature {
    /// Encode as the signature value of a signature packet.
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_signature_value(&self.r, &self.s, self.flags, self.counter)
    }

    /// Decode a signature value; the input must contain nothing else.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(data);
        let sig = Self::read(&mut reader)?;
        reader.finish("signature value")?;
        Ok(sig)
    }

    pub(crate) fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let r = reader.mpi()?;
        let s = reader.mpi()?;
        let flags = reader.u8("authenticator flags")?;
        let counter = reader.u32("authenticator counter")?;
        Ok(Self { r, s, flags, counter })
    }
}

/// Obtain a signature over `digest` from the authenticator.
///
/// The authenticator's DER signature is split into (r, s); their ranges are
/// not checked beyond what DER decoding guarantees.
pub fn sign(
    digest: &[u8; 32],
    credential: &CredentialReference,
    signer: &mut dyn AssertionSigner,
) -> Result<Fido2Signature> {
    tracing::debug!(
        relying_party = credential.relying_party(),
        fingerprint = %credential.fingerprint(),
        "requesting assertion"
    );
    let assertion =
        signer.get_assertion(digest, credential.relying_party(), credential.credential_id())?;

    if credential.requires_user_presence() && assertion.flags & FLAG_USER_PRESENT == 0 {
        return Err(Error::SignerFailure(
            "authenticator did not report user presence".to_string(),
        ));
    }

    let signature = Signature::from_der(&assertion.signature_der)
        .map_err(|e| Error::MalformedSignature(format!("invalid DER signature: {}", e)))?;
    let (r, s) = signature.split_bytes();

    tracing::debug!(
        flags = assertion.flags,
        counter = assertion.counter,
        "assertion received"
    );
    Ok(Fido2Signature {
        r: Mpi::from_slice(&r),
        s: Mpi::from_slice(&s),
        flags: assertion.flags,
        counter: assertion.counter,
    })
}

/// Encode `MPI(r) || MPI(s) || flags || counter`.
pub fn encode_signature_value(r: &Mpi, s: &Mpi, flags: u8, counter: u32) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(2 * (2 + SCALAR_LEN) + 5);
    r.encode_into(&mut out)?;
    s.encode_into(&mut out)?;
    out.push(flags);
    out.extend_from_slice(&counter.to_be_bytes());
    Ok(out)
}

/// The value the authenticator's key actually signs:
/// `SHA256(SHA256(rp) || flags || counter || digest)`.
pub fn reconstruct_authenticator_hash(
    relying_party: &str,
    flags: u8,
    counter: u32,
    digest: &[u8; 32],
) -> [u8; 32] {
    let rp_hash = Sha256::digest(relying_party.as_bytes());

    let mut hasher = Sha256::new();
    hasher.update(rp_hash);
    hasher.update([flags]);
    hasher.update(counter.to_be_bytes());
    hasher.update(digest);
    hasher.finalize().into()
}

/// Check an ECDSA P-256 signature over an already hashed value.
///
/// Returns `Ok(false)` for any signature that simply does not verify,
/// including scalars the curve library rejects. Only input that cannot be
/// interpreted at all is an error: an invalid public point or scalars
/// wider than 32 bytes fail with [`Error::MalformedSignature`].
pub fn verify(ec_point: &[u8; 65], r: &Mpi, s: &Mpi, hash: &[u8; 32]) -> Result<bool> {
    let key = VerifyingKey::from_sec1_bytes(ec_point)
        .map_err(|_| {
            Error::MalformedSignature("public key is not a valid P-256 point".to_string())
        })?;

    if r.as_bytes().len() > SCALAR_LEN || s.as_bytes().len() > SCALAR_LEN {
        return Err(Error::MalformedSignature(format!(
            "scalar too wide ({} / {} bits)",
            r.bits(),
            s.bits()
        )));
    }

    let mut raw = [0u8; 2 * SCALAR_LEN];
    raw[..SCALAR_LEN].copy_from_slice(&r.to_padded(SCALAR_LEN));
    raw[SCALAR_LEN..].copy_from_slice(&s.to_padded(SCALAR_LEN));

    let signature = match Signature::from_slice(&raw) {
        Ok(sig) => sig,
        Err(_) => return Ok(false),
    };
    Ok(key.verify_prehash(hash, &signature).is_ok())
}
