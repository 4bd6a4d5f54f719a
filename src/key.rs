//! Key packet construction and parsing.
//!
//! A fidopgp key is an ordinary V4 public key packet whose algorithm is
//! security-key ECDSA P-256 and whose key material is the credential's EC
//! point followed by the relying party. The "secret key" is a stub that
//! adds the credential handle; the private key stays on the authenticator.
//!
//! Public key body:
//!
//! ```text
//! 0x04 | created (4) | algorithm (1) | MPI(ec_point) | rp_len (1) | rp
//! ```
//!
//! Secret key stub body:
//!
//! ```text
//! public body | 0x00 | MPI(credential_id) | flags (1) | checksum (2)
//! ```

use chrono::{DateTime, Utc};
use sha1::{Digest, Sha1};

use crate::authenticator::{AssertionSigner, CredentialReference, Registration};
use crate::error::{Error, Result};
use crate::internal::{
    check_algorithm, check_version, checksum16, resolve_timestamp, Reader, PACKET_VERSION,
    S2K_UNPROTECTED, SK_ECDSA_P256, STUB_USER_PRESENCE,
};
use crate::mpi::Mpi;
use crate::packet::{read_single, tag, write_packet};
use crate::sign::certify_user_id;
use crate::types::{Fingerprint, GeneratedKey, PublicKey};

/// Build the body of a public key packet.
pub fn public_key_body(created: u32, ec_point: &[u8; 65], relying_party: &str) -> Result<Vec<u8>> {
    if ec_point[0] != 0x04 {
        return Err(Error::InvalidInput(
            "EC point must be uncompressed (0x04 prefix)".to_string(),
        ));
    }
    let rp_len = u8::try_from(relying_party.len()).map_err(|_| {
        Error::InvalidInput(format!(
            "relying party is {} bytes, at most 255 allowed",
            relying_party.len()
        ))
    })?;

    let mut body = Vec::with_capacity(6 + 67 + 1 + relying_party.len());
    body.push(PACKET_VERSION);
    body.extend_from_slice(&created.to_be_bytes());
    body.push(SK_ECDSA_P256);
    Mpi::from_slice(ec_point).encode_into(&mut body)?;
    body.push(rp_len);
    body.extend_from_slice(relying_party.as_bytes());
    Ok(body)
}

/// Build a framed public key packet.
pub fn build_public_key(created: u32, ec_point: &[u8; 65], relying_party: &str) -> Result<Vec<u8>> {
    write_packet(tag::PUBLIC_KEY, &public_key_body(created, ec_point, relying_party)?)
}

/// Build a framed secret key stub packet for `credential_id`.
pub fn build_secret_stub(public_body: &[u8], credential_id: &[u8]) -> Result<Vec<u8>> {
    if credential_id.is_empty() {
        return Err(Error::InvalidInput("empty credential handle".to_string()));
    }
    let mut body = public_body.to_vec();
    body.push(S2K_UNPROTECTED);
    Mpi::from_slice(credential_id).encode_into(&mut body)?;
    body.push(STUB_USER_PRESENCE);
    let checksum = checksum16(&body);
    body.extend_from_slice(&checksum.to_be_bytes());
    write_packet(tag::SECRET_KEY, &body)
}

/// Build a framed user ID packet.
pub fn build_user_id(user_id: &str) -> Result<Vec<u8>> {
    write_packet(tag::USER_ID, user_id.as_bytes())
}

/// Fingerprint of a public key: `SHA1(0x99 || len16 || body)`.
///
/// Fails for a body too long for the two-octet length prefix.
pub fn fingerprint(public_body: &[u8]) -> Result<Fingerprint> {
    let len = u16::try_from(public_body.len()).map_err(|_| {
        Error::InvalidInput(format!(
            "public key body of {} bytes is too long to fingerprint",
            public_body.len()
        ))
    })?;
    let mut hasher = Sha1::new();
    hasher.update([0x99]);
    hasher.update(len.to_be_bytes());
    hasher.update(public_body);
    Ok(Fingerprint(hasher.finalize().into()))
}

/// Parse a framed public key packet.
pub fn parse_public_key(data: &[u8]) -> Result<PublicKey> {
    let body = read_single(data, tag::PUBLIC_KEY)?;
    parse_public_key_body(&body)
}

/// Parse the body of a public key packet.
pub fn parse_public_key_body(body: &[u8]) -> Result<PublicKey> {
    let mut reader = Reader::new(body);
    let key = read_public_fields(&mut reader)?;
    reader.finish("public key")?;
    Ok(key)
}

fn read_public_fields(reader: &mut Reader<'_>) -> Result<PublicKey> {
    check_version(reader.u8("key version")?)?;
    let created = reader.u32("key creation time")?;
    check_algorithm(reader.u8("key algorithm")?)?;

    let point = reader.mpi()?;
    let ec_point: [u8; 65] = point
        .as_bytes()
        .try_into()
        .ok()
        .filter(|p: &[u8; 65]| p[0] == 0x04)
        .ok_or_else(|| {
            Error::MalformedInput(format!(
                "EC point is not an uncompressed P-256 point ({} bits)",
                point.bits()
            ))
        })?;

    let rp_len = reader.u8("relying party length")?;
    let rp = reader.take(usize::from(rp_len), "relying party")?;
    let relying_party = std::str::from_utf8(rp)
        .map_err(|_| Error::MalformedInput("relying party is not UTF-8".to_string()))?
        .to_string();

    Ok(PublicKey {
        created,
        ec_point,
        relying_party,
    })
}

/// Parse a framed secret key stub packet.
///
/// The checksum is verified over the whole body before any field is
/// interpreted, so any corrupted byte reports [`Error::ChecksumMismatch`].
pub fn parse_secret_stub(data: &[u8]) -> Result<CredentialReference> {
    let body = read_single(data, tag::SECRET_KEY)?;
    if body.len() < 2 {
        return Err(Error::MalformedInput("secret key stub too short".to_string()));
    }
    let (content, tail) = body.split_at(body.len() - 2);
    let stored = u16::from_be_bytes([tail[0], tail[1]]);
    let computed = checksum16(content);
    if stored != computed {
        return Err(Error::ChecksumMismatch { stored, computed });
    }

    let mut reader = Reader::new(content);
    let public_key = read_public_fields(&mut reader)?;
    let public_body = content[..reader.position()].to_vec();

    let s2k_usage = reader.u8("S2K usage")?;
    if s2k_usage != S2K_UNPROTECTED {
        return Err(Error::UnsupportedEncryption(s2k_usage));
    }
    let credential = reader.mpi()?;
    if credential.is_zero() {
        return Err(Error::MalformedInput("empty credential handle".to_string()));
    }
    let flags = reader.u8("stub flags")?;
    reader.finish("secret key stub")?;

    Ok(CredentialReference {
        fingerprint: fingerprint(&public_body)?,
        public_key,
        public_body,
        credential_id: credential.as_bytes().to_vec(),
        user_presence: flags & STUB_USER_PRESENCE != 0,
    })
}

/// Generate a new key from a FIDO2 registration.
///
/// Builds the public key, binds `user_id` to it with a self-signature made
/// through `signer`, and builds the secret key stub.
///
/// # Arguments
/// * `registration` - Relying party, EC point and credential handle from the authenticator
/// * `user_id` - User ID (e.g., "Name <email@example.com>")
/// * `creation_time` - Optional creation time (defaults to now)
/// * `signer` - Authenticator holding the credential
///
/// # Returns
/// The public key file, the secret key file and the fingerprint.
///
/// # Example
/// ```ignore
/// let registration = token.register("openpgp:");
/// let key = create_key(&registration, "Alice <alice@example.com>", None, &mut token)?;
/// std::fs::write("alice.pub", &key.public_key)?;
/// std::fs::write("alice.sec", &key.secret_key)?;
/// ```
pub fn create_key(
    registration: &Registration,
    user_id: &str,
    creation_time: Option<DateTime<Utc>>,
    signer: &mut dyn AssertionSigner,
) -> Result<GeneratedKey> {
    let created = resolve_timestamp(creation_time)?;
    let public_body = public_key_body(
        created,
        &registration.ec_point,
        &registration.relying_party,
    )?;
    let secret_key = build_secret_stub(&public_body, &registration.credential_id)?;
    let credential = parse_secret_stub(&secret_key)?;
    // Everything that can fail on input is built before the authenticator
    // is asked for a signature.
    let mut public_key = write_packet(tag::PUBLIC_KEY, &public_body)?;
    public_key.extend(build_user_id(user_id)?);

    tracing::debug!(
        fingerprint = %credential.fingerprint(),
        relying_party = %registration.relying_party,
        "certifying user ID"
    );
    let binding = certify_user_id(&credential, user_id, created, signer)?;
    public_key.extend(binding);

    let fingerprint = credential.fingerprint().to_hex();
    tracing::info!(fingerprint = %fingerprint, "created key");
    Ok(GeneratedKey {
        public_key,
        secret_key,
        fingerprint,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_point() -> [u8; 65] {
        let mut point = [0u8; 65];
        point[0] = 0x04;
        for (i, b) in point[1..].iter_mut().enumerate() {
            *b = i as u8 + 1;
        }
        point
    }

    #[test]
    fn test_public_key_body_layout() {
        let body = public_key_body(1_700_000_000, &fixture_point(), "openpgp:").unwrap();
        assert_eq!(body.len(), 82);
        assert_eq!(&body[..6], &[4, 0x65, 0x53, 0xF1, 0x00, SK_ECDSA_P256]);
        assert_eq!(&body[6..8], &515u16.to_be_bytes());
        assert_eq!(body[73], 8);
        assert_eq!(&body[74..], b"openpgp:");
    }

    #[test]
    fn test_public_key_roundtrip() {
        let packet = build_public_key(1_700_000_000, &fixture_point(), "example.com").unwrap();
        let key = parse_public_key(&packet).unwrap();
        assert_eq!(key.created, 1_700_000_000);
        assert_eq!(key.ec_point, fixture_point());
        assert_eq!(key.relying_party, "example.com");
    }

    #[test]
    fn test_public_key_rejects_other_profiles() {
        let mut body = public_key_body(1, &fixture_point(), "openpgp:").unwrap();
        body[0] = 5;
        assert!(matches!(parse_public_key_body(&body), Err(Error::UnsupportedVersion(5))));

        let mut body = public_key_body(1, &fixture_point(), "openpgp:").unwrap();
        body[5] = 19;
        assert!(matches!(parse_public_key_body(&body), Err(Error::UnsupportedAlgorithm(19))));
    }

    #[test]
    fn test_public_key_rejects_short_point_and_trailing_bytes() {
        let mut body = public_key_body(1, &fixture_point(), "openpgp:").unwrap();
        body.push(0);
        assert!(matches!(parse_public_key_body(&body), Err(Error::MalformedInput(_))));

        let mut body = vec![4, 0, 0, 0, 1, SK_ECDSA_P256];
        Mpi::from_slice(&[0x04, 0x01]).encode_into(&mut body).unwrap();
        body.push(0);
        assert!(matches!(parse_public_key_body(&body), Err(Error::MalformedInput(_))));
    }

    #[test]
    fn test_build_rejects_bad_inputs() {
        let mut compressed = fixture_point();
        compressed[0] = 0x02;
        assert!(matches!(
            public_key_body(1, &compressed, "openpgp:"),
            Err(Error::InvalidInput(_))
        ));
        let long_rp = "x".repeat(256);
        assert!(matches!(
            public_key_body(1, &fixture_point(), &long_rp),
            Err(Error::InvalidInput(_))
        ));
        let body = public_key_body(1, &fixture_point(), "openpgp:").unwrap();
        assert!(matches!(build_secret_stub(&body, &[]), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_secret_stub_roundtrip() {
        let body = public_key_body(1_700_000_000, &fixture_point(), "openpgp:").unwrap();
        let stub = build_secret_stub(&body, b"credential-handle").unwrap();
        let credential = parse_secret_stub(&stub).unwrap();

        assert_eq!(credential.credential_id(), b"credential-handle");
        assert_eq!(credential.relying_party(), "openpgp:");
        assert_eq!(credential.public_key_body(), body.as_slice());
        assert_eq!(credential.fingerprint(), fingerprint(&body).unwrap());
        assert!(credential.requires_user_presence());
    }

    #[test]
    fn test_secret_stub_checksum_covers_every_body_byte() {
        let body = public_key_body(1_700_000_000, &fixture_point(), "openpgp:").unwrap();
        let stub = build_secret_stub(&body, &[0xAB; 48]).unwrap();
        // Two-byte header: tag octet and one-octet length.
        let header_len = 2;
        for i in header_len..stub.len() {
            let mut corrupt = stub.clone();
            corrupt[i] ^= 0x01;
            assert!(
                matches!(parse_secret_stub(&corrupt), Err(Error::ChecksumMismatch { .. })),
                "byte {} not covered",
                i
            );
        }
    }

    #[test]
    fn test_secret_stub_rejects_encrypted_material() {
        let mut body = public_key_body(1, &fixture_point(), "openpgp:").unwrap();
        body.push(0xFE);
        Mpi::from_slice(b"cred").encode_into(&mut body).unwrap();
        body.push(STUB_USER_PRESENCE);
        let sum = checksum16(&body);
        body.extend_from_slice(&sum.to_be_bytes());
        let stub = write_packet(tag::SECRET_KEY, &body).unwrap();

        assert!(matches!(parse_secret_stub(&stub), Err(Error::UnsupportedEncryption(0xFE))));
    }

    #[test]
    fn test_secret_stub_wrong_tag() {
        let packet = build_public_key(1, &fixture_point(), "openpgp:").unwrap();
        assert!(matches!(
            parse_secret_stub(&packet),
            Err(Error::UnexpectedPacket { expected: 5, found: 6 })
        ));
    }

    #[test]
    fn test_fingerprint_prefix() {
        let body = public_key_body(1_700_000_000, &fixture_point(), "openpgp:").unwrap();
        let mut hasher = Sha1::new();
        hasher.update([0x99, 0x00, 82]);
        hasher.update(&body);
        let expected: [u8; 20] = hasher.finalize().into();
        assert_eq!(fingerprint(&body).unwrap().0, expected);
    }

    #[test]
    fn test_fingerprint_rejects_oversized_body() {
        let body = vec![0u8; usize::from(u16::MAX) + 1];
        assert!(matches!(fingerprint(&body), Err(Error::InvalidInput(_))));
        assert!(fingerprint(&body[..usize::from(u16::MAX)]).is_ok());
    }
}
