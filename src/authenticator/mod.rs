//! FIDO2 authenticator support.
//!
//! The private key of a fidopgp identity never leaves the security key.
//! Signing goes through the [`AssertionSigner`] capability: the crate hands
//! it a 32-byte digest in place of the WebAuthn client data hash, and the
//! authenticator signs its own authenticator data followed by that digest.
//! The [`adapter`] functions translate between that assertion and the MPI
//! encoding stored in an OpenPGP signature packet.
//!
//! Device discovery, PIN entry and touch prompts belong to the
//! `AssertionSigner` implementation, not to this crate.
//!
//! # Example
//!
//! ```
//! use fidopgp::authenticator::SoftwareAuthenticator;
//! use fidopgp::{create_key, sign_bytes_detached, verify_bytes_detached};
//!
//! let mut token = SoftwareAuthenticator::new();
//! let registration = token.register("openpgp:");
//! let key = create_key(&registration, "Alice <alice@example.com>", None, &mut token).unwrap();
//!
//! let signature = sign_bytes_detached(&key.secret_key, b"Hello!", None, &mut token).unwrap();
//! let result = verify_bytes_detached(&key.public_key, b"Hello!", &signature).unwrap();
//! assert!(result.is_good());
//! ```

mod types;
pub mod adapter;
#[cfg(feature = "soft-authenticator")]
mod soft;

pub use types::{
    Assertion, AssertionSigner, CredentialReference, Registration, SignerError, FLAG_USER_PRESENT,
};
pub use adapter::Fido2Signature;
#[cfg(feature = "soft-authenticator")]
pub use soft::{PrivateKeyMaterial, SoftwareAuthenticator};
