//! Error types for the fidopgp library.
//!
//! Every codec and format failure aborts the current operation. A signature
//! that merely does not verify is not an error; see [`crate::Verification`].

use thiserror::Error;

use crate::authenticator::SignerError;

/// The main error type for fidopgp operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Truncated or otherwise invalid byte stream
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Signature value that cannot be decoded (bad DER, oversized scalars)
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    /// Packet header is not in the new format
    #[error("Unsupported packet format (header octet {0:#04x})")]
    UnsupportedFormat(u8),

    /// Key or signature packet version other than 4
    #[error("Unsupported packet version {0}")]
    UnsupportedVersion(u8),

    /// Public key algorithm other than security-key ECDSA P-256
    #[error("Unsupported public key algorithm {0}")]
    UnsupportedAlgorithm(u8),

    /// Hash algorithm other than SHA-256
    #[error("Unsupported hash algorithm {0}")]
    UnsupportedHash(u8),

    /// Secret key stub with protected (encrypted) material
    #[error("Unsupported secret key protection (S2K usage {0:#04x})")]
    UnsupportedEncryption(u8),

    /// Signature class other than key binding or binary/text document
    #[error("Unsupported signature class {0:#04x}")]
    UnsupportedSignatureClass(u8),

    /// Packet or subpacket length outside the one- and two-octet forms
    #[error("Unsupported length: {0}")]
    UnsupportedLength(String),

    /// Unknown subpacket flagged as critical
    #[error("Unsupported critical subpacket type {0}")]
    UnsupportedSubpacket(u8),

    /// Packet tag other than the one expected at this position
    #[error("Unexpected packet tag {found} (expected {expected})")]
    UnexpectedPacket {
        /// Tag required at this position
        expected: u8,
        /// Tag actually read
        found: u8,
    },

    /// Secret key stub checksum does not match its contents
    #[error("Secret key checksum mismatch (stored {stored:#06x}, computed {computed:#06x})")]
    ChecksumMismatch {
        /// Checksum carried by the packet
        stored: u16,
        /// Checksum recomputed over the packet body
        computed: u16,
    },

    /// Invalid input provided by the caller
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No authenticator could be reached
    #[error("Authenticator unavailable: {0}")]
    DeviceUnavailable(String),

    /// The authenticator did not complete the assertion
    #[error("Authenticator failure: {0}")]
    SignerFailure(String),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for fidopgp operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<SignerError> for Error {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::NoDevice | SignerError::CommunicationError(_) => {
                Error::DeviceUnavailable(err.to_string())
            }
            _ => Error::SignerFailure(err.to_string()),
        }
    }
}
