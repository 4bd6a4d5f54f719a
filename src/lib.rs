//! # fidopgp
//!
//! OpenPGP keys and detached signatures whose private key lives on a FIDO2
//! security key.
//!
//! This library provides a functional API for:
//!
//! - **Key Generation**: Turn a FIDO2 credential into an OpenPGP public key
//!   with a self-signed user ID, plus a secret key stub naming the credential
//! - **Signing**: Create detached binary and text signatures through an
//!   authenticator
//! - **Verification**: Check detached signatures and key binding signatures
//! - **Packet Codec**: Read and write the packets and MPIs involved
//!
//! ## Quick Start
//!
//! ```no_run
//! use fidopgp::authenticator::SoftwareAuthenticator;
//! use fidopgp::*;
//!
//! // Register a credential on the (software) authenticator
//! let mut token = SoftwareAuthenticator::new();
//! let registration = token.register("openpgp:");
//!
//! // Build the key files
//! let key = create_key(&registration, "Alice <alice@example.com>", None, &mut token).unwrap();
//!
//! // Sign and verify
//! let signature = sign_bytes_detached(&key.secret_key, b"Hello!", None, &mut token).unwrap();
//! let result = verify_bytes_detached(&key.public_key, b"Hello!", &signature).unwrap();
//! assert!(result.is_good());
//! ```
//!
//! ## Profile
//!
//! | Field | Value |
//! |-------|-------|
//! | Packet version | 4 |
//! | Public key algorithm | 100 (security-key ECDSA P-256) |
//! | Hash | SHA-256 (8) |
//! | Signature classes | 0x00 binary, 0x01 text, 0x13 key binding |
//! | Packet lengths | one- and two-octet new format (up to 8383 bytes) |
//!
//! Anything outside this profile is rejected while parsing.
//!
//! ## Features
//!
//! - `soft-authenticator` (default): an in-memory authenticator for tests
//!   and integrators without hardware
//!
//! ## Design
//!
//! All operations are standalone functions that take key and signature
//! data as `&[u8]`. Hardware access goes through the
//! [`authenticator::AssertionSigner`] trait.

// Modules
mod error;
mod types;
mod internal;

pub mod mpi;
pub mod packet;
pub mod key;
pub mod signature;
pub mod authenticator;

mod parse;
mod sign;
mod verify;

// Re-export error types
pub use error::{Error, Result};

// Re-export all public types
pub use types::{
    Fingerprint,
    KeyId,
    SignatureClass,
    PublicKey,
    KeyInfo,
    GeneratedKey,
    VerificationStatus,
    Verification,
};

// Re-export parsing functions
pub use parse::{
    parse_key_bytes,
    parse_key_file,
    parse_secret_key_bytes,
    parse_secret_key_file,
};

// Re-export signing functions
pub use sign::{
    sign_bytes_detached,
    sign_text_detached,
    sign_reader_detached,
    sign_file_detached,
};

// Re-export verification functions
pub use verify::{
    verify_bytes_detached,
    verify_reader_detached,
    verify_file_detached,
    verify_key_binding,
};

// Re-export key generation
pub use key::create_key;
