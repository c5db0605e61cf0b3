//! Wire-format helpers shared by the DNS responder
//!
//! - [`ByteCursor`]: bounded big-endian reads over a borrowed datagram
//! - [`encode_name`] / [`decode_name`]: dotted names to and from
//!   length-prefixed DNS labels

pub mod cursor;
pub mod name;

pub use cursor::ByteCursor;
pub use name::{decode_name, encode_name, MAX_LABEL_LEN};
