//! The single supported algorithm profile.
//!
//! Only one combination is accepted anywhere in the crate: version 4
//! packets, the security-key ECDSA P-256 public key algorithm and SHA-256.
//! Everything else is rejected here, before any cryptography runs.

use crate::error::{Error, Result};

/// Key and signature packet version.
pub(crate) const PACKET_VERSION: u8 = 4;

/// Public key algorithm id for ECDSA P-256 keys living on a FIDO2 token.
/// Taken from the private/experimental range (100-110).
pub(crate) const SK_ECDSA_P256: u8 = 100;

/// Hash algorithm id for SHA-256.
pub(crate) const HASH_SHA256: u8 = 8;

/// S2K usage octet meaning "secret material is not encrypted".
pub(crate) const S2K_UNPROTECTED: u8 = 0x00;

/// Stub flag: the authenticator must see user presence.
pub(crate) const STUB_USER_PRESENCE: u8 = 0x01;

/// Signature subpacket: signature creation time.
pub(crate) const SUBPACKET_CREATION_TIME: u8 = 2;

/// Signature subpacket: issuer key ID.
pub(crate) const SUBPACKET_ISSUER: u8 = 16;

/// Critical bit of a subpacket type octet.
pub(crate) const SUBPACKET_CRITICAL: u8 = 0x80;

pub(crate) fn check_version(version: u8) -> Result<()> {
    if version != PACKET_VERSION {
        return Err(Error::UnsupportedVersion(version));
    }
    Ok(())
}

pub(crate) fn check_algorithm(algorithm: u8) -> Result<()> {
    if algorithm != SK_ECDSA_P256 {
        return Err(Error::UnsupportedAlgorithm(algorithm));
    }
    Ok(())
}

pub(crate) fn check_hash(hash: u8) -> Result<()> {
    if hash != HASH_SHA256 {
        return Err(Error::UnsupportedHash(hash));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_accepts_only_supported_values() {
        assert!(check_version(4).is_ok());
        assert!(matches!(check_version(5), Err(Error::UnsupportedVersion(5))));
        assert!(check_algorithm(SK_ECDSA_P256).is_ok());
        assert!(matches!(check_algorithm(19), Err(Error::UnsupportedAlgorithm(19))));
        assert!(check_hash(HASH_SHA256).is_ok());
        assert!(matches!(check_hash(10), Err(Error::UnsupportedHash(10))));
    }
}
