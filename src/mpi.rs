//! Multiprecision integers.
//!
//! OpenPGP stores every integer (EC points, signature scalars, credential
//! handles) as a two-octet bit count followed by the big-endian magnitude
//! with leading zero octets stripped. An [`Mpi`] only ever holds a
//! non-negative magnitude, so there is no negative input to reject.

use crate::error::{Error, Result};

/// Largest bit count a two-octet prefix can describe.
const MAX_MPI_BITS: usize = u16::MAX as usize;

/// A non-negative multiprecision integer.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Mpi {
    /// Big-endian magnitude, no leading zero octets.
    value: Vec<u8>,
}

impl Mpi {
    /// Create an MPI from a big-endian magnitude, trimming leading zeros.
    pub fn from_slice(value: &[u8]) -> Self {
        let offset = value.iter().take_while(|&&b| b == 0).count();
        Self {
            value: value[offset..].to_vec(),
        }
    }

    /// The minimal big-endian magnitude.
    pub fn as_bytes(&self) -> &[u8] {
        &self.value
    }

    /// Whether this MPI is zero.
    pub fn is_zero(&self) -> bool {
        self.value.is_empty()
    }

    /// Bit length of the magnitude, leading zero bits excluded.
    pub fn bits(&self) -> usize {
        match self.value.first() {
            Some(&first) => 8 * (self.value.len() - 1) + (8 - first.leading_zeros() as usize),
            None => 0,
        }
    }

    /// The magnitude left-padded with zeros to at least `min_bytes` octets.
    pub fn to_padded(&self, min_bytes: usize) -> Vec<u8> {
        if self.value.len() >= min_bytes {
            return self.value.clone();
        }
        let mut out = vec![0u8; min_bytes - self.value.len()];
        out.extend_from_slice(&self.value);
        out
    }

    /// Serialize as bit count followed by the magnitude.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(2 + self.value.len());
        self.encode_into(&mut out)?;
        Ok(out)
    }

    /// Append the serialized form to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<()> {
        let bits = self.bits();
        if bits > MAX_MPI_BITS {
            return Err(Error::InvalidInput(format!(
                "MPI of {} bits exceeds the {}-bit limit",
                bits, MAX_MPI_BITS
            )));
        }
        out.extend_from_slice(&(bits as u16).to_be_bytes());
        out.extend_from_slice(&self.value);
        Ok(())
    }

    /// Decode an MPI from the start of `data`.
    ///
    /// Returns the value and the number of bytes consumed. The stored bit
    /// count must describe the magnitude exactly: a zero leading octet or a
    /// count that disagrees with the first octet is malformed.
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < 2 {
            return Err(Error::MalformedInput("truncated MPI bit count".to_string()));
        }
        let bits = usize::from(u16::from_be_bytes([data[0], data[1]]));
        let len = bits.div_ceil(8);
        let value = data.get(2..2 + len).ok_or_else(|| {
            Error::MalformedInput(format!(
                "truncated MPI: {} bits declared, {} bytes available",
                bits,
                data.len() - 2
            ))
        })?;

        let mpi = Self {
            value: value.to_vec(),
        };
        if value.first() == Some(&0) || mpi.bits() != bits {
            return Err(Error::MalformedInput(format!(
                "MPI bit count {} does not match its magnitude",
                bits
            )));
        }
        Ok((mpi, 2 + len))
    }
}

impl From<&[u8]> for Mpi {
    fn from(value: &[u8]) -> Self {
        Self::from_slice(value)
    }
}

impl std::fmt::Debug for Mpi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Mpi({} bits, {})", self.bits(), hex::encode(&self.value))
    }
}
