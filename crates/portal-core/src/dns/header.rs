//! DNS message header (RFC 1035 §4.1.1)
//!
//! ```text
//!   0  1  2  3  4  5  6  7  8  9 10 11 12 13 14 15
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |                      ID                       |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |QR|   Opcode  |AA|TC|RD|RA| Z|AD|CD|   RCODE   |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |           QDCOUNT / ANCOUNT / NSCOUNT / ARCOUNT |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! ```

use crate::codec::ByteCursor;
use crate::error::Result;

/// Size of the fixed header
pub const HEADER_LEN: usize = 12;

/// Opcode for a standard query
pub const OPCODE_QUERY: u8 = 0;

/// Response codes this server emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseCode {
    NoError = 0,
    FormErr = 1,
    ServFail = 2,
    NxDomain = 3,
    NotImp = 4,
    Refused = 5,
}

/// Record types
pub const TYPE_A: u16 = 1;
pub const TYPE_ANY: u16 = 255;

/// Record classes
pub const CLASS_IN: u16 = 1;
pub const CLASS_ANY: u16 = 255;

/// Decoded flag word
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    /// Set in responses
    pub qr: bool,
    pub opcode: u8,
    /// Authoritative answer
    pub aa: bool,
    /// Truncated
    pub tc: bool,
    /// Recursion desired
    pub rd: bool,
    /// Recursion available
    pub ra: bool,
    /// Reserved, must be zero
    pub z: bool,
    /// Authentic data
    pub ad: bool,
    /// Checking disabled
    pub cd: bool,
    pub rcode: u8,
}

impl Flags {
    pub fn from_bits(bits: u16) -> Self {
        let bit = |n: u16| bits & (1 << n) != 0;
        Self {
            qr: bit(15),
            opcode: ((bits >> 11) & 0x0f) as u8,
            aa: bit(10),
            tc: bit(9),
            rd: bit(8),
            ra: bit(7),
            z: bit(6),
            ad: bit(5),
            cd: bit(4),
            rcode: (bits & 0x0f) as u8,
        }
    }

    pub fn to_bits(self) -> u16 {
        let bit = |set: bool, n: u16| if set { 1 << n } else { 0 };
        bit(self.qr, 15)
            | (u16::from(self.opcode & 0x0f) << 11)
            | bit(self.aa, 10)
            | bit(self.tc, 9)
            | bit(self.rd, 8)
            | bit(self.ra, 7)
            | bit(self.z, 6)
            | bit(self.ad, 5)
            | bit(self.cd, 4)
            | u16::from(self.rcode & 0x0f)
    }
}

/// Fixed 12-byte message header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    pub flags: Flags,
    pub qd_count: u16,
    pub an_count: u16,
    pub ns_count: u16,
    pub ar_count: u16,
}

impl Header {
    /// Read a header from the cursor
    pub fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            id: cursor.read_u16_be()?,
            flags: Flags::from_bits(cursor.read_u16_be()?),
            qd_count: cursor.read_u16_be()?,
            an_count: cursor.read_u16_be()?,
            ns_count: cursor.read_u16_be()?,
            ar_count: cursor.read_u16_be()?,
        })
    }

    /// Append the header in wire order
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.id.to_be_bytes());
        out.extend_from_slice(&self.flags.to_bits().to_be_bytes());
        out.extend_from_slice(&self.qd_count.to_be_bytes());
        out.extend_from_slice(&self.an_count.to_be_bytes());
        out.extend_from_slice(&self.ns_count.to_be_bytes());
        out.extend_from_slice(&self.ar_count.to_be_bytes());
    }

    /// Whether this is a plain single-question query
    pub fn is_standard_query(&self) -> bool {
        !self.flags.qr && self.flags.opcode == OPCODE_QUERY && self.qd_count == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_bit_positions() {
        // QR, opcode 2 (STATUS), RD, RCODE 3
        let bits = 0b1_0010_0_0_1_0_0_0_0_0011;
        let flags = Flags::from_bits(bits);
        assert!(flags.qr);
        assert_eq!(flags.opcode, 2);
        assert!(flags.rd);
        assert!(!flags.aa && !flags.tc && !flags.ra);
        assert_eq!(flags.rcode, 3);
        assert_eq!(flags.to_bits(), bits);
    }

    #[test]
    fn test_header_wire_layout() {
        let raw = [0xab, 0xcd, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01];
        let header = Header::decode(&mut ByteCursor::new(&raw)).unwrap();
        assert_eq!(header.id, 0xabcd);
        assert!(header.flags.rd);
        assert_eq!(header.qd_count, 1);
        assert_eq!(header.ar_count, 1);
        assert!(header.is_standard_query());

        let mut out = Vec::new();
        header.encode_into(&mut out);
        assert_eq!(out, raw);
    }

    #[test]
    fn test_short_header_fails() {
        let raw = [0u8; HEADER_LEN - 1];
        assert!(Header::decode(&mut ByteCursor::new(&raw)).is_err());
    }
}
