//! Types for FIDO2 authenticator operations.

use crate::types::{Fingerprint, PublicKey};

/// Output of FIDO2 credential registration, the input to key generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Relying party the credential is scoped to
    pub relying_party: String,
    /// Uncompressed SEC1 P-256 public point (0x04 || x || y)
    pub ec_point: [u8; 65],
    /// Credential handle returned by the authenticator
    pub credential_id: Vec<u8>,
}

/// What an authenticator returns from a get-assertion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assertion {
    /// DER-encoded ECDSA signature over `authData || pre_hashed`
    pub signature_der: Vec<u8>,
    /// Authenticator data flags (bit 0: user present)
    pub flags: u8,
    /// Authenticator signature counter
    pub counter: u32,
}

/// Authenticator data flag: user present.
pub const FLAG_USER_PRESENT: u8 = 0x01;

/// Capability that performs a FIDO2 assertion with a stored credential.
///
/// `pre_hashed` stands in for the WebAuthn client data hash. The call may
/// block for as long as the user takes to touch the token or enter a PIN;
/// any timeout is the implementation's business. Implementations must use
/// `relying_party` as given and skip origin/RP-ID verification.
pub trait AssertionSigner {
    /// Sign `pre_hashed` with the credential `credential_id`.
    fn get_assertion(
        &mut self,
        pre_hashed: &[u8; 32],
        relying_party: &str,
        credential_id: &[u8],
    ) -> std::result::Result<Assertion, SignerError>;
}

/// Reference to a credential on a security key.
///
/// This is what a fidopgp secret key file holds: no private key, only what is
/// needed to ask the authenticator for a signature. It cannot sign by
/// itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialReference {
    pub(crate) public_key: PublicKey,
    pub(crate) public_body: Vec<u8>,
    pub(crate) fingerprint: Fingerprint,
    pub(crate) credential_id: Vec<u8>,
    pub(crate) user_presence: bool,
}

impl CredentialReference {
    /// Public key the credential belongs to.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Body of the corresponding public key packet.
    pub fn public_key_body(&self) -> &[u8] {
        &self.public_body
    }

    /// Fingerprint of the corresponding public key.
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Relying party the credential is scoped to.
    pub fn relying_party(&self) -> &str {
        &self.public_key.relying_party
    }

    /// Credential handle to pass to the authenticator.
    pub fn credential_id(&self) -> &[u8] {
        &self.credential_id
    }

    /// Whether assertions must carry the user-present flag.
    pub fn requires_user_presence(&self) -> bool {
        self.user_presence
    }
}

/// Errors reported by an [`AssertionSigner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    /// No authenticator is connected
    NoDevice,
    /// Transport error talking to the authenticator
    CommunicationError(String),
    /// The authenticator does not hold the requested credential
    CredentialNotFound,
    /// The user declined or did not confirm presence
    NotAllowed,
    /// A PIN is required but was not provided
    PinRequired,
    /// The PIN was wrong
    PinInvalid {
        /// Number of retry attempts remaining, if reported
        retries_remaining: Option<u8>,
    },
    /// The user did not respond in time
    Timeout,
    /// Any other authenticator error
    Other(String),
}

impl std::fmt::Display for SignerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignerError::NoDevice => write!(f, "No FIDO2 authenticator found"),
            SignerError::CommunicationError(msg) => write!(f, "Communication error: {}", msg),
            SignerError::CredentialNotFound => write!(f, "Credential not found on authenticator"),
            SignerError::NotAllowed => write!(f, "Operation not allowed by user"),
            SignerError::PinRequired => write!(f, "PIN required"),
            SignerError::PinInvalid {
                retries_remaining: Some(n),
            } => write!(f, "PIN invalid, {} retries remaining", n),
            SignerError::PinInvalid {
                retries_remaining: None,
            } => write!(f, "PIN invalid"),
            SignerError::Timeout => write!(f, "Operation timed out"),
            SignerError::Other(msg) => write!(f, "Authenticator error: {}", msg),
        }
    }
}

impl std::error::Error for SignerError {}
