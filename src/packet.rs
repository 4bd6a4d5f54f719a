//! New-format packet framing.
//!
//! A packet is one header octet `0xC0 | tag`, a length, and the body. Only
//! the one-octet (0..=191) and two-octet (192..=8383) length forms are
//! produced or accepted; five-octet and partial body lengths fail.

use crate::error::{Error, Result};

/// Largest body length expressible with the two-octet form.
pub const MAX_BODY_LEN: usize = 8383;

/// Packet tags used by this crate.
pub mod tag {
    /// Signature packet
    pub const SIGNATURE: u8 = 2;
    /// Secret key packet
    pub const SECRET_KEY: u8 = 5;
    /// Public key packet
    pub const PUBLIC_KEY: u8 = 6;
    /// User ID packet
    pub const USER_ID: u8 = 13;
}

/// A framed packet: its tag and exact body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Packet type, 0..=63
    pub tag: u8,
    /// Packet body without header
    pub body: Vec<u8>,
}

impl Packet {
    /// Fail unless this packet carries `expected`.
    pub fn expect_tag(&self, expected: u8) -> Result<&[u8]> {
        if self.tag != expected {
            return Err(Error::UnexpectedPacket {
                expected,
                found: self.tag,
            });
        }
        Ok(&self.body)
    }
}

/// Encode a length in the one- or two-octet new-format form.
pub(crate) fn encode_length(len: usize, out: &mut Vec<u8>) -> Result<()> {
    match len {
        0..=191 => out.push(len as u8),
        192..=MAX_BODY_LEN => {
            let v = len - 192;
            out.push((v >> 8) as u8 + 192);
            out.push((v & 0xFF) as u8);
        }
        _ => {
            return Err(Error::UnsupportedLength(format!(
                "{} bytes exceeds the two-octet length form",
                len
            )))
        }
    }
    Ok(())
}

/// Decode a one- or two-octet new-format length.
///
/// Returns the length and the number of octets it occupied.
pub(crate) fn decode_length(data: &[u8]) -> Result<(usize, usize)> {
    let first = *data
        .first()
        .ok_or_else(|| Error::MalformedInput("missing length octet".to_string()))?;
    match first {
        0..=191 => Ok((usize::from(first), 1)),
        192..=223 => {
            let second = *data
                .get(1)
                .ok_or_else(|| Error::MalformedInput("truncated two-octet length".to_string()))?;
            Ok(((usize::from(first - 192) << 8) + usize::from(second) + 192, 2))
        }
        224..=254 => Err(Error::UnsupportedLength("partial body length".to_string())),
        255 => Err(Error::UnsupportedLength("five-octet length".to_string())),
    }
}

/// Frame `body` as a new-format packet with the given tag.
pub fn write_packet(tag: u8, body: &[u8]) -> Result<Vec<u8>> {
    if tag > 63 {
        return Err(Error::InvalidInput(format!("packet tag {} out of range", tag)));
    }
    let mut out = Vec::with_capacity(body.len() + 3);
    out.push(0xC0 | tag);
    encode_length(body.len(), &mut out)?;
    out.extend_from_slice(body);
    Ok(out)
}

/// Read one packet from the start of `data`.
///
/// Returns the packet and the number of bytes it occupied, so callers can
/// continue with the next packet.
pub fn read_packet(data: &[u8]) -> Result<(Packet, usize)> {
    let header = *data
        .first()
        .ok_or_else(|| Error::MalformedInput("empty packet stream".to_string()))?;
    if header & 0xC0 != 0xC0 {
        return Err(Error::UnsupportedFormat(header));
    }
    let tag = header & 0x3F;

    let (len, len_octets) = decode_length(&data[1..])?;
    let start = 1 + len_octets;
    let body = data.get(start..start + len).ok_or_else(|| {
        Error::MalformedInput(format!(
            "packet tag {} declares {} body bytes, {} available",
            tag,
            len,
            data.len() - start
        ))
    })?;

    Ok((
        Packet {
            tag,
            body: body.to_vec(),
        },
        start + len,
    ))
}

/// Read a concatenation of packets, such as a public key file.
pub fn read_packets(mut data: &[u8]) -> Result<Vec<Packet>> {
    let mut packets = Vec::new();
    while !data.is_empty() {
        let (packet, used) = read_packet(data)?;
        packets.push(packet);
        data = &data[used..];
    }
    Ok(packets)
}

/// Read exactly one packet with the given tag and nothing after it.
pub(crate) fn read_single(data: &[u8], expected: u8) -> Result<Vec<u8>> {
    let (packet, used) = read_packet(data)?;
    if used != data.len() {
        return Err(Error::MalformedInput(format!(
            "{} trailing bytes after packet",
            data.len() - used
        )));
    }
    packet.expect_tag(expected)?;
    Ok(packet.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    #[test]
    fn test_header_and_length_forms() {
        let one = write_packet(tag::USER_ID, &[0u8; 191]).unwrap();
        assert_eq!(&one[..2], &[0xCD, 191]);

        let two = write_packet(tag::SIGNATURE, &[0u8; 192]).unwrap();
        assert_eq!(&two[..3], &[0xC2, 192, 0]);

        let max = write_packet(tag::PUBLIC_KEY, &[0u8; MAX_BODY_LEN]).unwrap();
        assert_eq!(&max[..3], &[0xC6, 223, 255]);
        assert_eq!(max.len(), MAX_BODY_LEN + 3);
    }

    #[test]
    fn test_roundtrip_boundary_lengths() {
        for tag in 0..64u8 {
            for len in [0usize, 1, 191, 192, 8383] {
                let body = vec![tag; len];
                let framed = write_packet(tag, &body).unwrap();
                let (packet, used) = read_packet(&framed).unwrap();
                assert_eq!(packet, Packet { tag, body });
                assert_eq!(used, framed.len());
            }
        }
    }

    #[test]
    fn test_oversized_body_rejected() {
        let err = write_packet(tag::SIGNATURE, &vec![0u8; 8384]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedLength(_)));
    }

    #[test]
    fn test_tag_out_of_range() {
        assert!(matches!(write_packet(64, &[]), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_old_format_rejected() {
        // Old-format public key packet, one-octet length.
        let err = read_packet(&[0x98, 0x01, 0x00]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(0x98)));
    }

    #[test]
    fn test_long_length_forms_rejected() {
        assert!(matches!(
            read_packet(&[0xC2, 0xFF, 0, 0, 0x20, 0]),
            Err(Error::UnsupportedLength(_))
        ));
        assert!(matches!(
            read_packet(&[0xCB, 0xE0, 0]),
            Err(Error::UnsupportedLength(_))
        ));
    }

    #[test]
    fn test_truncated_body() {
        assert!(matches!(
            read_packet(&[0xC2, 5, 1, 2]),
            Err(Error::MalformedInput(_))
        ));
        assert!(matches!(read_packet(&[0xC2, 200]), Err(Error::MalformedInput(_))));
        assert!(matches!(read_packet(&[]), Err(Error::MalformedInput(_))));
    }

    #[test]
    fn test_read_packets_sequence() {
        let mut stream = write_packet(tag::PUBLIC_KEY, b"key").unwrap();
        stream.extend(write_packet(tag::USER_ID, b"alice").unwrap());
        stream.extend(write_packet(tag::SIGNATURE, &[]).unwrap());

        let packets = read_packets(&stream).unwrap();
        let tags: Vec<u8> = packets.iter().map(|p| p.tag).collect();
        assert_eq!(tags, vec![tag::PUBLIC_KEY, tag::USER_ID, tag::SIGNATURE]);
        assert_eq!(packets[1].body, b"alice");
    }

    #[test]
    fn test_read_single_checks_tag_and_trailing() {
        let framed = write_packet(tag::SIGNATURE, b"sig").unwrap();
        assert_eq!(read_single(&framed, tag::SIGNATURE).unwrap(), b"sig");
        assert!(matches!(
            read_single(&framed, tag::SECRET_KEY),
            Err(Error::UnexpectedPacket { expected: 5, found: 2 })
        ));
        let mut extra = framed.clone();
        extra.push(0);
        assert!(matches!(read_single(&extra, tag::SIGNATURE), Err(Error::MalformedInput(_))));
    }

    quickcheck! {
        fn prop_roundtrip(tag: u8, body: Vec<u8>) -> bool {
            let tag = tag & 0x3F;
            let framed = write_packet(tag, &body).unwrap();
            let (packet, used) = read_packet(&framed).unwrap();
            packet.tag == tag && packet.body == body && used == framed.len()
        }
    }
}
