//! Key file parsing functions.
//!
//! A public key file is the concatenation of three packets: public key,
//! user ID and the key binding self-signature. A secret key file is a single
//! secret key stub.

use std::path::Path;

use crate::authenticator::CredentialReference;
use crate::error::{Error, Result};
use crate::key::{fingerprint, parse_public_key_body, parse_secret_stub};
use crate::packet::{read_packet, read_packets, tag};
use crate::signature::{parse_signature_body, SignatureInfo};
use crate::types::{Fingerprint, KeyInfo, PublicKey};

/// A public key as loaded from a key file.
#[derive(Debug, Clone)]
pub(crate) struct Certificate {
    pub public_key: PublicKey,
    pub public_body: Vec<u8>,
    pub fingerprint: Fingerprint,
    /// Present only for public key files
    pub binding: Option<(String, SignatureInfo)>,
}

/// Load the key a signature should be checked against.
///
/// Accepts a public key file or a secret key stub; the stub carries the
/// full public key body.
pub(crate) fn load_certificate(data: &[u8]) -> Result<Certificate> {
    let (first, _) = read_packet(data)?;
    if first.tag == tag::SECRET_KEY {
        let credential = parse_secret_stub(data)?;
        return Ok(Certificate {
            public_key: credential.public_key().clone(),
            public_body: credential.public_key_body().to_vec(),
            fingerprint: credential.fingerprint(),
            binding: None,
        });
    }
    load_public_key_file(data)
}

/// Split a public key file into its packets.
pub(crate) fn load_public_key_file(data: &[u8]) -> Result<Certificate> {
    let packets = read_packets(data)?;
    let [key, uid, sig] = packets.as_slice() else {
        return Err(Error::MalformedInput(format!(
            "public key file must hold 3 packets, found {}",
            packets.len()
        )));
    };

    let public_body = key.expect_tag(tag::PUBLIC_KEY)?.to_vec();
    let public_key = parse_public_key_body(&public_body)?;
    let user_id = String::from_utf8(uid.expect_tag(tag::USER_ID)?.to_vec())
        .map_err(|_| Error::MalformedInput("user ID is not UTF-8".to_string()))?;
    let binding = parse_signature_body(sig.expect_tag(tag::SIGNATURE)?)?;

    Ok(Certificate {
        fingerprint: fingerprint(&public_body)?,
        public_key,
        public_body,
        binding: Some((user_id, binding)),
    })
}

/// Parse a public key file from bytes and extract its information.
///
/// # Arguments
/// * `data` - Public key file (binary)
///
/// # Returns
/// Key information including user ID, fingerprint and relying party.
///
/// # Example
/// ```ignore
/// let key_data = std::fs::read("alice.pub")?;
/// let info = parse_key_bytes(&key_data)?;
/// println!("Fingerprint: {}", info.fingerprint);
/// ```
pub fn parse_key_bytes(data: &[u8]) -> Result<KeyInfo> {
    let cert = load_public_key_file(data)?;
    let user_id = cert.binding.map(|(uid, _)| uid).unwrap_or_default();

    Ok(KeyInfo {
        fingerprint: cert.fingerprint.to_hex(),
        key_id: cert.fingerprint.key_id().to_hex(),
        user_id,
        relying_party: cert.public_key.relying_party.clone(),
        creation_time: cert.public_key.created_at(),
        ec_point: cert.public_key.ec_point.to_vec(),
    })
}

/// Parse a public key file and extract its information.
pub fn parse_key_file(path: impl AsRef<Path>) -> Result<KeyInfo> {
    let data = std::fs::read(path.as_ref())?;
    parse_key_bytes(&data)
}

/// Parse a secret key stub.
///
/// The result names the credential on the authenticator; it holds no
/// private key material.
pub fn parse_secret_key_bytes(data: &[u8]) -> Result<CredentialReference> {
    parse_secret_stub(data)
}

/// Parse a secret key stub from a file.
pub fn parse_secret_key_file(path: impl AsRef<Path>) -> Result<CredentialReference> {
    let data = std::fs::read(path.as_ref())?;
    parse_secret_key_bytes(&data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{build_public_key, build_secret_stub, build_user_id, public_key_body};
    use crate::packet::write_packet;

    fn point() -> [u8; 65] {
        let mut point = [0x07u8; 65];
        point[0] = 0x04;
        point
    }

    #[test]
    fn test_wrong_packet_count() {
        let key = build_public_key(1, &point(), "openpgp:").unwrap();
        let err = parse_key_bytes(&key).unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
    }

    #[test]
    fn test_wrong_packet_order() {
        let mut data = build_user_id("Alice").unwrap();
        data.extend(build_public_key(1, &point(), "openpgp:").unwrap());
        data.extend(write_packet(tag::SIGNATURE, &[4]).unwrap());
        let err = parse_key_bytes(&data).unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedPacket {
                expected: tag::PUBLIC_KEY,
                found: tag::USER_ID
            }
        ));
    }

    #[test]
    fn test_load_from_secret_stub() {
        let body = public_key_body(1_700_000_000, &point(), "openpgp:").unwrap();
        let stub = build_secret_stub(&body, b"cred").unwrap();

        let cert = load_certificate(&stub).unwrap();
        assert_eq!(cert.public_body, body);
        assert_eq!(cert.fingerprint, fingerprint(&body).unwrap());
        assert!(cert.binding.is_none());

        let credential = parse_secret_key_bytes(&stub).unwrap();
        assert_eq!(credential.credential_id(), b"cred");
        assert_eq!(credential.relying_party(), "openpgp:");
    }
}
