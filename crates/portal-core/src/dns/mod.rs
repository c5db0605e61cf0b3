//! Captive-portal DNS responder
//!
//! Answers every standard A/ANY query with one fixed IPv4 address, except
//! for names on a small block list, which get NXDOMAIN. Nothing is
//! resolved or forwarded.
//!
//! ## Reply rules
//!
//! 1. Datagrams shorter than the header, responses, non-QUERY opcodes and
//!    anything but exactly one question are dropped without a reply.
//! 2. A question containing the compression byte `0xC0` is answered with
//!    NXDOMAIN, echoing a two-byte name.
//! 3. A name with no terminator, or a question missing its type/class, is
//!    dropped.
//! 4. Type must be A or ANY and class IN or ANY, otherwise NXDOMAIN.
//! 5. A name matching a block-list entry byte for byte gets NXDOMAIN.
//! 6. Everything else gets one A record pointing at offset 12 with a TTL of
//!    7200 seconds.
//!
//! [`DnsResponder::handle_datagram`] is pure; the engine owns the socket.

pub mod header;

use std::net::Ipv4Addr;
use tracing::debug;

use crate::codec::{decode_name, encode_name, ByteCursor};
use crate::error::{Error, Result};
use header::{Header, ResponseCode, CLASS_ANY, CLASS_IN, HEADER_LEN, TYPE_A, TYPE_ANY};

/// Compression pointer marker; also the high byte of the answer's name pointer
pub const POINTER_BYTE: u8 = 0xc0;

/// Maximum number of blocked names
pub const MAX_BLOCKED: usize = 4;

/// TTL on synthesized answers, in seconds
pub const ANSWER_TTL: u32 = 7200;

/// Names answered with NXDOMAIN, stored pre-encoded
#[derive(Debug, Clone, Default)]
pub struct BlockList {
    entries: Vec<Vec<u8>>,
}

impl BlockList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode and add a name
    ///
    /// Fails when the list already holds [`MAX_BLOCKED`] names or when the
    /// name does not encode.
    pub fn add(&mut self, domain: &str) -> Result<()> {
        if self.entries.len() >= MAX_BLOCKED {
            return Err(Error::capacity(format!(
                "block list holds at most {} names",
                MAX_BLOCKED
            )));
        }
        let encoded = encode_name(domain)?;
        self.entries.push(encoded);
        Ok(())
    }

    /// Exact match against an encoded name, terminator included
    pub fn contains(&self, encoded: &[u8]) -> bool {
        self.entries.iter().any(|entry| entry.as_slice() == encoded)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What the responder decided for a datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Reply with the configured address
    Answer,
    /// Reply with NXDOMAIN
    NxDomain,
}

/// A reply datagram and the decision behind it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Query name in dotted form
    pub name: String,
    pub verdict: Verdict,
    /// Wire bytes to send back
    pub bytes: Vec<u8>,
}

/// Stateless query classifier and reply builder
#[derive(Debug, Clone)]
pub struct DnsResponder {
    address: Ipv4Addr,
    blocked: BlockList,
}

impl DnsResponder {
    /// Create a responder answering with `address`
    pub fn new(address: Ipv4Addr, blocked: BlockList) -> Self {
        Self { address, blocked }
    }

    /// Build a responder from a list of names to block
    pub fn with_blocked<'a>(
        address: Ipv4Addr,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self> {
        let mut blocked = BlockList::new();
        for name in names {
            blocked.add(name)?;
        }
        Ok(Self::new(address, blocked))
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn blocked(&self) -> &BlockList {
        &self.blocked
    }

    /// Classify a datagram and build the reply, if one is owed
    pub fn handle_datagram(&self, packet: &[u8]) -> Option<Vec<u8>> {
        self.respond(packet).map(|reply| reply.bytes)
    }

    /// Like [`handle_datagram`](Self::handle_datagram), also reporting the
    /// query name and verdict
    pub fn respond(&self, packet: &[u8]) -> Option<Reply> {
        let (header, question, verdict) = self.classify(packet)?;
        let name = decode_name(question).unwrap_or_else(|_| "<unparsed>".to_string());
        let bytes = self.build_reply(header, question, &verdict);
        Some(Reply {
            name,
            verdict,
            bytes,
        })
    }

    /// Decide how to answer, returning the header, the question bytes to echo
    /// and the verdict. `None` means drop.
    pub fn classify<'p>(&self, packet: &'p [u8]) -> Option<(Header, &'p [u8], Verdict)> {
        let mut cursor = ByteCursor::new(packet);
        let header = Header::decode(&mut cursor).ok()?;
        if !header.is_standard_query() {
            debug!(
                "Dropping datagram: qr={} opcode={} qdcount={}",
                header.flags.qr, header.flags.opcode, header.qd_count
            );
            return None;
        }

        let body = cursor.rest();
        let mut nx = false;
        let name_len = if body.contains(&POINTER_BYTE) {
            // Labels never exceed 63, so 0xC0 can only be a pointer (or garbage)
            nx = true;
            2
        } else {
            match body.iter().position(|&b| b == 0) {
                Some(end) => end + 1,
                None => {
                    nx = true;
                    body.len()
                }
            }
        };

        // Type and class must follow the name
        let mut question = ByteCursor::new(body);
        let name = question.read_bytes(name_len).ok()?;
        let qtype = question.read_u16_be().ok()?;
        let qclass = question.read_u16_be().ok()?;
        let echoed = &body[..question.position()];

        if !nx {
            if !matches!(qtype, TYPE_A | TYPE_ANY) || !matches!(qclass, CLASS_IN | CLASS_ANY) {
                nx = true;
            } else if self.blocked.contains(name) {
                nx = true;
            }
        }

        let verdict = if nx { Verdict::NxDomain } else { Verdict::Answer };
        debug!(
            "Query {} type={} class={} -> {:?}",
            decode_name(name).unwrap_or_else(|_| "<unparsed>".to_string()),
            qtype,
            qclass,
            verdict
        );
        Some((header, echoed, verdict))
    }

    fn build_reply(&self, query: Header, question: &[u8], verdict: &Verdict) -> Vec<u8> {
        let (rcode, an_count) = match verdict {
            Verdict::Answer => (ResponseCode::NoError, 1),
            Verdict::NxDomain => (ResponseCode::NxDomain, 0),
        };

        let mut flags = query.flags;
        flags.qr = true;
        flags.aa = true;
        flags.ra = true;
        flags.rcode = rcode as u8;

        let header = Header {
            id: query.id,
            flags,
            qd_count: 1,
            an_count,
            ns_count: 0,
            ar_count: 0,
        };

        let mut out = Vec::with_capacity(HEADER_LEN + question.len() + 16);
        header.encode_into(&mut out);
        out.extend_from_slice(question);

        if *verdict == Verdict::Answer {
            out.push(POINTER_BYTE);
            out.push(HEADER_LEN as u8);
            out.extend_from_slice(&TYPE_A.to_be_bytes());
            out.extend_from_slice(&CLASS_IN.to_be_bytes());
            out.extend_from_slice(&ANSWER_TTL.to_be_bytes());
            out.extend_from_slice(&4u16.to_be_bytes());
            out.extend_from_slice(&self.address.octets());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(id: u16, name: &str, qtype: u16, qclass: u16) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&id.to_be_bytes());
        out.extend_from_slice(&0x0100u16.to_be_bytes()); // RD
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
        out.extend_from_slice(&encode_name(name).unwrap());
        out.extend_from_slice(&qtype.to_be_bytes());
        out.extend_from_slice(&qclass.to_be_bytes());
        out
    }

    fn responder() -> DnsResponder {
        DnsResponder::with_blocked(Ipv4Addr::new(192, 168, 4, 1), ["blocked.example"]).unwrap()
    }

    #[test]
    fn test_answer_layout() {
        let packet = query(0x1234, "example.com", TYPE_A, CLASS_IN);
        let reply = responder().handle_datagram(&packet).unwrap();

        let question_len = packet.len() - HEADER_LEN;
        assert_eq!(reply.len(), HEADER_LEN + question_len + 16);
        assert_eq!(&reply[0..2], &[0x12, 0x34]);

        let flags = header::Flags::from_bits(u16::from_be_bytes([reply[2], reply[3]]));
        assert!(flags.qr && flags.aa && flags.ra && flags.rd);
        assert_eq!(flags.rcode, ResponseCode::NoError as u8);
        assert_eq!(&reply[4..12], &[0, 1, 0, 1, 0, 0, 0, 0]);
        assert_eq!(&reply[HEADER_LEN..HEADER_LEN + question_len], &packet[HEADER_LEN..]);

        let answer = &reply[HEADER_LEN + question_len..];
        assert_eq!(
            answer,
            &[0xc0, 0x0c, 0, 1, 0, 1, 0, 0, 0x1c, 0x20, 0, 4, 192, 168, 4, 1]
        );
    }

    #[test]
    fn test_blocked_name_is_nxdomain() {
        let packet = query(7, "blocked.example", TYPE_A, CLASS_IN);
        let reply = responder().handle_datagram(&packet).unwrap();

        assert_eq!(reply[3] & 0x0f, ResponseCode::NxDomain as u8);
        assert_eq!(&reply[6..8], &[0, 0]);
        assert_eq!(reply.len(), packet.len());
    }

    #[test]
    fn test_block_list_is_exact_match() {
        let packet = query(7, "sub.blocked.example", TYPE_A, CLASS_IN);
        let reply = responder().handle_datagram(&packet).unwrap();
        assert_eq!(reply[3] & 0x0f, ResponseCode::NoError as u8);
    }

    #[test]
    fn test_any_type_and_class_answered() {
        let packet = query(1, "example.com", TYPE_ANY, CLASS_ANY);
        let reply = responder().handle_datagram(&packet).unwrap();
        assert_eq!(reply[3] & 0x0f, ResponseCode::NoError as u8);
        assert_eq!(&reply[6..8], &[0, 1]);
    }

    #[test]
    fn test_unsupported_type_is_nxdomain() {
        let aaaa = query(1, "example.com", 28, CLASS_IN);
        let reply = responder().handle_datagram(&aaaa).unwrap();
        assert_eq!(reply[3] & 0x0f, ResponseCode::NxDomain as u8);

        let chaos = query(1, "example.com", TYPE_A, 3);
        let reply = responder().handle_datagram(&chaos).unwrap();
        assert_eq!(reply[3] & 0x0f, ResponseCode::NxDomain as u8);
    }

    #[test]
    fn test_dropped_datagrams() {
        let r = responder();
        assert!(r.handle_datagram(&[0u8; 11]).is_none());

        let mut response = query(1, "example.com", TYPE_A, CLASS_IN);
        response[2] |= 0x80;
        assert!(r.handle_datagram(&response).is_none());

        let mut two_questions = query(1, "example.com", TYPE_A, CLASS_IN);
        two_questions[5] = 2;
        assert!(r.handle_datagram(&two_questions).is_none());

        let mut iquery = query(1, "example.com", TYPE_A, CLASS_IN);
        iquery[2] |= 1 << 3;
        assert!(r.handle_datagram(&iquery).is_none());

        // Type/class cut off
        let full = query(1, "example.com", TYPE_A, CLASS_IN);
        assert!(r.handle_datagram(&full[..full.len() - 1]).is_none());

        // No terminator at all
        let mut unterminated = full[..HEADER_LEN].to_vec();
        unterminated.extend_from_slice(b"\x07example\x03com");
        assert!(r.handle_datagram(&unterminated).is_none());
    }

    #[test]
    fn test_compressed_name_is_nxdomain() {
        let mut packet = query(9, "", TYPE_A, CLASS_IN)[..HEADER_LEN].to_vec();
        packet.extend_from_slice(&[0xc0, 0x0c, 0, 1, 0, 1]);
        let reply = responder().handle_datagram(&packet).unwrap();

        assert_eq!(reply[3] & 0x0f, ResponseCode::NxDomain as u8);
        assert_eq!(&reply[HEADER_LEN..], &[0xc0, 0x0c, 0, 1, 0, 1]);
    }

    #[test]
    fn test_trailing_records_not_echoed() {
        let mut packet = query(3, "example.com", TYPE_A, CLASS_IN);
        packet[11] = 1; // ARCOUNT
        let question_end = packet.len();
        packet.extend_from_slice(&[0, 0, 41, 0x10, 0, 0, 0, 0, 0, 0, 0]);

        let reply = responder().handle_datagram(&packet).unwrap();
        assert_eq!(&reply[10..12], &[0, 0]);
        assert_eq!(reply.len(), question_end + 16);
    }

    #[test]
    fn test_block_list_capacity() {
        let mut list = BlockList::new();
        for name in ["a.test", "b.test", "c.test", "d.test"] {
            list.add(name).unwrap();
        }
        assert!(matches!(list.add("e.test"), Err(Error::Capacity(_))));
        assert_eq!(list.len(), MAX_BLOCKED);

        let mut list = BlockList::new();
        assert!(list.add(&format!("{}.test", "x".repeat(64))).is_err());
        assert!(list.is_empty());
    }

    #[test]
    fn test_respond_reports_name() {
        let r = responder();
        let reply = r.respond(&query(1, "www.example.com", TYPE_A, CLASS_IN)).unwrap();
        assert_eq!(reply.name, "www.example.com");
        assert_eq!(reply.verdict, Verdict::Answer);

        let reply = r.respond(&query(2, "blocked.example", TYPE_A, CLASS_IN)).unwrap();
        assert_eq!(reply.verdict, Verdict::NxDomain);
        assert_eq!(Some(reply.bytes), r.handle_datagram(&query(2, "blocked.example", TYPE_A, CLASS_IN)));
    }
}
