// # Name Codec
//
// Converts dotted domain names to and from the length-prefixed label
// format used in DNS messages (RFC 1035 §3.1). Only uncompressed names
// are handled.

use crate::error::{Error, Result};

/// Longest label a length byte may announce
pub const MAX_LABEL_LEN: usize = 63;

/// Longest encoded name, terminator included
const MAX_NAME_LEN: usize = 255;

/// Encode a dotted name into wire-format labels
///
/// `"example.com"` becomes `[7]example[3]com[0]`. One trailing dot is
/// accepted as the root. Fails if a label exceeds 63 bytes, if an interior
/// label is empty, or if the result would exceed 255 bytes.
///
/// # Example
///
/// ```rust
/// use portal_core::codec::encode_name;
///
/// let wire = encode_name("example.com").unwrap();
/// assert_eq!(wire, b"\x07example\x03com\x00");
/// ```
pub fn encode_name(name: &str) -> Result<Vec<u8>> {
    let name = name.strip_suffix('.').unwrap_or(name);
    let mut out = Vec::with_capacity(name.len() + 2);

    if !name.is_empty() {
        for label in name.split('.') {
            if label.is_empty() {
                return Err(Error::invalid_name(format!("empty label in '{}'", name)));
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(Error::invalid_name(format!(
                    "label of {} bytes exceeds {}",
                    label.len(),
                    MAX_LABEL_LEN
                )));
            }
            out.push(label.len() as u8);
            out.extend_from_slice(label.as_bytes());
        }
    }
    out.push(0);

    if out.len() > MAX_NAME_LEN {
        return Err(Error::invalid_name(format!(
            "encoded name is {} bytes",
            out.len()
        )));
    }
    Ok(out)
}

/// Decode wire-format labels back into a dotted name
///
/// Reads from the start of `wire` up to and including the zero terminator;
/// trailing bytes are ignored. Compression pointers are refused.
pub fn decode_name(wire: &[u8]) -> Result<String> {
    let mut labels: Vec<String> = Vec::new();
    let mut pos = 0;

    loop {
        let len = *wire
            .get(pos)
            .ok_or_else(|| Error::invalid_name("missing terminator"))? as usize;
        pos += 1;

        if len == 0 {
            break;
        }
        if len > MAX_LABEL_LEN {
            return Err(Error::invalid_name(format!(
                "length byte {:#04x} is not a plain label",
                len
            )));
        }

        let label = wire
            .get(pos..pos + len)
            .ok_or_else(|| Error::invalid_name("label runs past end of input"))?;
        labels.push(String::from_utf8_lossy(label).into_owned());
        pos += len;
    }

    Ok(labels.join("."))
}
