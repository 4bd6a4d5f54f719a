//! V4 signature packets.
//!
//! A signature packet body is
//!
//! ```text
//! hashed prefix:   0x04 | class | algorithm | hash | len16 | hashed subpackets
//! unhashed:        len16 | unhashed subpackets
//! digest check:    first two bytes of the digest
//! signature value: MPI(r) | MPI(s) | flags | counter32
//! ```
//!
//! The digest is SHA-256 over the signed data followed by the hashed prefix
//! and the trailer `0x04 | 0xFF | len32(hashed prefix)`. For document
//! signatures the signed data is the document (with `\n` expanded to
//! `\r\n` in text mode); for key binding signatures it is the public key
//! and user ID framed as `0x99 | len16 | key` and `0xB4 | len32 | uid`.
//!
//! Producing a document signature is a one-way sequence of owned values:
//! [`DocumentHasher`] accumulates the document, [`DocumentHasher::seal`]
//! folds in the signature prefix and trailer and yields a [`SealedDigest`],
//! and [`SealedDigest::sign`] waits on the authenticator and returns the
//! finished packet. Each step consumes the previous one, so a failure
//! leaves nothing to resume.

use std::io::Read;

use sha2::{Digest, Sha256};

use crate::authenticator::adapter::{self, Fido2Signature};
use crate::authenticator::{AssertionSigner, CredentialReference};
use crate::error::{Error, Result};
use crate::internal::{
    check_algorithm, check_hash, check_version, Reader, HASH_SHA256, PACKET_VERSION,
    SK_ECDSA_P256, SUBPACKET_CREATION_TIME, SUBPACKET_CRITICAL, SUBPACKET_ISSUER,
};
use crate::packet::{read_single, tag, write_packet};
use crate::types::{Fingerprint, KeyId, SignatureClass};

/// Chunk size used when hashing from a reader.
pub const CHUNK_SIZE: usize = 8192;

/// The hashed part of a signature under construction.
#[derive(Debug, Clone)]
pub struct SignatureContext {
    class: SignatureClass,
    created: u32,
    issuer: Fingerprint,
    hashed_prefix: Vec<u8>,
}

/// Start a signature: build the hashed prefix for `class` at `created`.
pub fn begin_signature(
    class: SignatureClass,
    created: u32,
    issuer: &Fingerprint,
) -> SignatureContext {
    let mut prefix = Vec::with_capacity(12);
    prefix.push(PACKET_VERSION);
    prefix.push(class.to_u8());
    prefix.push(SK_ECDSA_P256);
    prefix.push(HASH_SHA256);
    // One creation time subpacket: length 5, type, 4-byte time.
    prefix.extend_from_slice(&6u16.to_be_bytes());
    prefix.push(5);
    prefix.push(SUBPACKET_CREATION_TIME);
    prefix.extend_from_slice(&created.to_be_bytes());

    SignatureContext {
        class,
        created,
        issuer: *issuer,
        hashed_prefix: prefix,
    }
}

impl SignatureContext {
    /// Signature class.
    pub fn class(&self) -> SignatureClass {
        self.class
    }

    /// Creation time (unix seconds).
    pub fn created(&self) -> u32 {
        self.created
    }

    /// Fingerprint of the signing key.
    pub fn issuer(&self) -> &Fingerprint {
        &self.issuer
    }

    /// Version, class, algorithms and hashed subpackets.
    pub fn hashed_prefix(&self) -> &[u8] {
        &self.hashed_prefix
    }

    /// Hashed prefix followed by the version/length trailer.
    pub fn signed_context(&self) -> Vec<u8> {
        signed_context(&self.hashed_prefix)
    }
}

/// `0x04 | 0xFF | len32` for a hashed prefix of `len` bytes.
pub fn signature_trailer(len: usize) -> [u8; 6] {
    let len = (len as u32).to_be_bytes();
    [PACKET_VERSION, 0xFF, len[0], len[1], len[2], len[3]]
}

/// The exact bytes hashed after the signed data.
pub fn signed_context(hashed_prefix: &[u8]) -> Vec<u8> {
    let mut out = hashed_prefix.to_vec();
    out.extend_from_slice(&signature_trailer(hashed_prefix.len()));
    out
}

/// Assemble a signature packet from its parts.
pub fn finish_signature(
    hashed_prefix: &[u8],
    issuer: &KeyId,
    digest16: [u8; 2],
    signature_value: &[u8],
) -> Result<Vec<u8>> {
    let mut body = Vec::with_capacity(hashed_prefix.len() + 13 + signature_value.len());
    body.extend_from_slice(hashed_prefix);
    // One issuer subpacket: length 9, type, 8-byte key ID.
    body.extend_from_slice(&10u16.to_be_bytes());
    body.push(9);
    body.push(SUBPACKET_ISSUER);
    body.extend_from_slice(issuer.as_bytes());
    body.extend_from_slice(&digest16);
    body.extend_from_slice(signature_value);
    write_packet(tag::SIGNATURE, &body)
}

/// Pre-image prefix of a key binding signature.
pub fn key_binding_preimage(public_body: &[u8], user_id: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + public_body.len() + user_id.len());
    out.push(0x99);
    out.extend_from_slice(&(public_body.len() as u16).to_be_bytes());
    out.extend_from_slice(public_body);
    out.push(0xB4);
    out.extend_from_slice(&(user_id.len() as u32).to_be_bytes());
    out.extend_from_slice(user_id.as_bytes());
    out
}

/// A parsed signature packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureInfo {
    /// Signature class
    pub class: SignatureClass,
    /// Creation time (unix seconds)
    pub created: u32,
    /// Issuer key ID, if the packet names one
    pub issuer: Option<KeyId>,
    /// Hashed prefix exactly as stored
    pub hashed_prefix: Vec<u8>,
    /// Leading two bytes of the digest
    pub digest16: [u8; 2],
    /// Signature value
    pub signature: Fido2Signature,
}

/// Parse a framed signature packet.
///
/// Every field outside the supported profile is rejected here, before any
/// verification is attempted.
pub fn parse_signature(data: &[u8]) -> Result<SignatureInfo> {
    let body = read_single(data, tag::SIGNATURE)?;
    parse_signature_body(&body)
}

/// Parse the body of a signature packet.
pub fn parse_signature_body(body: &[u8]) -> Result<SignatureInfo> {
    let mut reader = Reader::new(body);
    check_version(reader.u8("signature version")?)?;
    let class = SignatureClass::try_from(reader.u8("signature class")?)?;
    check_algorithm(reader.u8("signature algorithm")?)?;
    check_hash(reader.u8("hash algorithm")?)?;

    let hashed_len = reader.u16("hashed subpacket length")?;
    let hashed = reader.take(usize::from(hashed_len), "hashed subpackets")?;
    let hashed_prefix = body[..reader.position()].to_vec();
    let mut subpackets = Subpackets::default();
    subpackets.read_area(hashed, true)?;

    let unhashed_len = reader.u16("unhashed subpacket length")?;
    let unhashed = reader.take(usize::from(unhashed_len), "unhashed subpackets")?;
    subpackets.read_area(unhashed, false)?;

    let check = reader.take(2, "digest check")?;
    let signature = Fido2Signature::read(&mut reader)?;
    reader.finish("signature")?;

    let created = subpackets
        .created
        .ok_or_else(|| Error::MalformedInput("signature has no creation time".to_string()))?;

    Ok(SignatureInfo {
        class,
        created,
        issuer: subpackets.issuer,
        hashed_prefix,
        digest16: [check[0], check[1]],
        signature,
    })
}

#[derive(Default)]
struct Subpackets {
    created: Option<u32>,
    issuer: Option<KeyId>,
}

impl Subpackets {
    fn read_area(&mut self, area: &[u8], hashed: bool) -> Result<()> {
        let mut reader = Reader::new(area);
        while reader.remaining() > 0 {
            let len = subpacket_length(&mut reader)?;
            if len == 0 {
                return Err(Error::MalformedInput("empty subpacket".to_string()));
            }
            let typ = reader.u8("subpacket type")?;
            let data = reader.take(len - 1, "subpacket data")?;

            match typ & !SUBPACKET_CRITICAL {
                // Only trusted when covered by the hash.
                SUBPACKET_CREATION_TIME if hashed => {
                    let data: [u8; 4] = data.try_into().map_err(|_| {
                        Error::MalformedInput("creation time subpacket must be 4 bytes".to_string())
                    })?;
                    self.created = Some(u32::from_be_bytes(data));
                }
                SUBPACKET_ISSUER => {
                    let data: [u8; 8] = data.try_into().map_err(|_| {
                        Error::MalformedInput("issuer subpacket must be 8 bytes".to_string())
                    })?;
                    self.issuer = Some(KeyId(data));
                }
                other if typ & SUBPACKET_CRITICAL != 0 => {
                    return Err(Error::UnsupportedSubpacket(other));
                }
                other => {
                    tracing::debug!(subpacket = other, hashed, "skipping subpacket");
                }
            }
        }
        Ok(())
    }
}

/// Subpacket lengths use one octet below 192 and two octets up to 255.
fn subpacket_length(reader: &mut Reader<'_>) -> Result<usize> {
    let first = reader.u8("subpacket length")?;
    match first {
        0..=191 => Ok(usize::from(first)),
        192..=254 => {
            let second = reader.u8("subpacket length")?;
            Ok((usize::from(first - 192) << 8) + usize::from(second) + 192)
        }
        255 => Err(Error::UnsupportedLength("five-octet subpacket length".to_string())),
    }
}

/// Running SHA-256 over a document.
pub struct DocumentHasher {
    class: SignatureClass,
    hasher: Sha256,
    consumed: u64,
}

impl DocumentHasher {
    /// Start hashing a document for a binary or text signature.
    pub fn new(class: SignatureClass) -> Result<Self> {
        if !class.is_document() {
            return Err(Error::InvalidInput(format!(
                "{:?} is not a document signature class",
                class
            )));
        }
        Ok(Self {
            class,
            hasher: Sha256::new(),
            consumed: 0,
        })
    }

    /// Hash the next piece of the document.
    pub fn update(&mut self, chunk: &[u8]) {
        self.consumed += chunk.len() as u64;
        if self.class != SignatureClass::TextDocument {
            self.hasher.update(chunk);
            return;
        }
        for line in chunk.split_inclusive(|&b| b == b'\n') {
            match line.split_last() {
                Some((&b'\n', head)) => {
                    self.hasher.update(head);
                    self.hasher.update(b"\r\n");
                }
                _ => self.hasher.update(line),
            }
        }
    }

    /// Hash everything `reader` yields, in fixed-size chunks.
    pub fn update_reader(&mut self, mut reader: impl Read) -> Result<u64> {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut total = 0u64;
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            self.update(&buf[..n]);
            total += n as u64;
        }
        Ok(total)
    }

    /// Document bytes consumed so far, before newline expansion.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Fold in the signature prefix and trailer.
    ///
    /// Fails if `context` was started for a different class than this
    /// hasher.
    pub fn seal(self, context: SignatureContext) -> Result<SealedDigest> {
        if self.class != context.class {
            return Err(Error::InvalidInput(format!(
                "{:?} context cannot seal a {:?} document hash",
                context.class, self.class
            )));
        }
        let consumed = self.consumed;
        let digest = self.finish(&context.hashed_prefix);
        tracing::debug!(class = ?context.class, bytes = consumed, "signature context sealed");
        Ok(SealedDigest { context, digest })
    }

    /// Digest over the document and `hashed_prefix` with its trailer.
    pub fn finish(mut self, hashed_prefix: &[u8]) -> [u8; 32] {
        self.hasher.update(signed_context(hashed_prefix));
        self.hasher.finalize().into()
    }
}

/// Digest of a key binding signature.
pub fn key_binding_digest(public_body: &[u8], user_id: &str, hashed_prefix: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(key_binding_preimage(public_body, user_id));
    hasher.update(signed_context(hashed_prefix));
    hasher.finalize().into()
}

/// A finished digest waiting for the authenticator's signature.
#[derive(Debug, Clone)]
pub struct SealedDigest {
    context: SignatureContext,
    digest: [u8; 32],
}

impl SealedDigest {
    /// Seal a key binding signature over `public_body` and `user_id`.
    pub fn key_binding(
        public_body: &[u8],
        user_id: &str,
        context: SignatureContext,
    ) -> Result<Self> {
        if context.class != SignatureClass::KeyBinding {
            return Err(Error::InvalidInput(format!(
                "{:?} is not a key binding signature class",
                context.class
            )));
        }
        let digest = key_binding_digest(public_body, user_id, &context.hashed_prefix);
        Ok(Self { context, digest })
    }

    /// The digest the authenticator will be asked to sign.
    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    /// The signature being built.
    pub fn context(&self) -> &SignatureContext {
        &self.context
    }

    /// Have the authenticator sign and assemble the signature packet.
    ///
    /// Blocks until the authenticator answers.
    pub fn sign(
        self,
        credential: &CredentialReference,
        signer: &mut dyn AssertionSigner,
    ) -> Result<Vec<u8>> {
        if credential.fingerprint() != self.context.issuer {
            return Err(Error::InvalidInput(
                "credential does not belong to the signing key".to_string(),
            ));
        }
        tracing::debug!(class = ?self.context.class, "signature pending on authenticator");
        let signature = adapter::sign(&self.digest, credential, signer)?;
        let packet = finish_signature(
            &self.context.hashed_prefix,
            &self.context.issuer.key_id(),
            [self.digest[0], self.digest[1]],
            &signature.encode()?,
        )?;
        tracing::debug!(counter = signature.counter, "signature complete");
        Ok(packet)
    }
}
