//! Internal helper functions.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::mpi::Mpi;

/// Forward-only cursor over a packet body.
///
/// Every read names what it is reading so truncation errors say where the
/// input ran out.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::MalformedInput(format!(
                "truncated {}: need {} bytes, {} left",
                what,
                len,
                self.remaining()
            )));
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub(crate) fn u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }

    pub(crate) fn u16(&mut self, what: &str) -> Result<u16> {
        let b = self.take(2, what)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn u32(&mut self, what: &str) -> Result<u32> {
        let b = self.take(4, what)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn mpi(&mut self) -> Result<Mpi> {
        let (mpi, consumed) = Mpi::decode(&self.data[self.pos..])?;
        self.pos += consumed;
        Ok(mpi)
    }

    /// Fail if anything is left after the last field of `what`.
    pub(crate) fn finish(&self, what: &str) -> Result<()> {
        if self.remaining() != 0 {
            return Err(Error::MalformedInput(format!(
                "{} trailing bytes after {}",
                self.remaining(),
                what
            )));
        }
        Ok(())
    }
}

/// Resolve an optional creation time to a 32-bit unix timestamp.
pub(crate) fn resolve_timestamp(time: Option<DateTime<Utc>>) -> Result<u32> {
    let time = time.unwrap_or_else(Utc::now);
    u32::try_from(time.timestamp())
        .map_err(|_| Error::InvalidInput(format!("timestamp out of range: {}", time)))
}

/// Convert a packet timestamp to chrono DateTime.
pub(crate) fn timestamp_to_datetime(timestamp: u32) -> DateTime<Utc> {
    // Every u32 second count is representable.
    DateTime::from_timestamp(i64::from(timestamp), 0).unwrap_or_default()
}

/// Sum of all bytes modulo 65536, the legacy secret key checksum.
pub(crate) fn checksum16(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)))
}
