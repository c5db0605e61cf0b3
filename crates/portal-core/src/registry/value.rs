//! Typed values held by data points
//!
//! [`Value`] is a closed sum over every kind of device variable the registry
//! can expose. Each variant knows how to validate and parse text into
//! itself, render itself back to text and answer sign questions, so no
//! caller ever has to reinterpret raw memory.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use super::text::{decode_reserved, format_time, is_int, parse_time};

/// Type tag of a data point
///
/// The numeric values are part of the HTTP listing format and the `t`
/// filter grammar. Tags below [`DataType::Void`] are integer-like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    U8 = 0,
    U32 = 1,
    U64 = 2,
    Time = 3,
    Bool = 4,
    I8 = 50,
    I32 = 51,
    Void = 100,
    Str = 101,
    Ip = 102,
}

impl DataType {
    pub const ALL: [DataType; 10] = [
        DataType::U8,
        DataType::U32,
        DataType::U64,
        DataType::Time,
        DataType::Bool,
        DataType::I8,
        DataType::I32,
        DataType::Void,
        DataType::Str,
        DataType::Ip,
    ];

    /// Numeric tag
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Look up a type by its numeric tag
    pub fn from_tag(tag: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|t| u64::from(t.tag()) == tag)
    }

    /// Whether the raw value takes part in integer comparisons
    pub fn is_integer(self) -> bool {
        self.tag() < DataType::Void.tag()
    }

    pub fn is_signed(self) -> bool {
        matches!(self, DataType::I8 | DataType::I32)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Current value of a data point
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    U8(u8),
    U32(u32),
    U64(u64),
    /// Milliseconds
    Time(u64),
    Bool(bool),
    I8(i8),
    I32(i32),
    /// Opaque slot; renders as `null` and never accepts text
    Void,
    Str(String),
    Ip(Ipv4Addr),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::U8(_) => DataType::U8,
            Value::U32(_) => DataType::U32,
            Value::U64(_) => DataType::U64,
            Value::Time(_) => DataType::Time,
            Value::Bool(_) => DataType::Bool,
            Value::I8(_) => DataType::I8,
            Value::I32(_) => DataType::I32,
            Value::Void => DataType::Void,
            Value::Str(_) => DataType::Str,
            Value::Ip(_) => DataType::Ip,
        }
    }

    /// Validate `text` against the grammar of `ty` and convert it
    ///
    /// Returns `None` when the text is not a valid value of that type.
    /// Strings are percent-decoded; `Void` never parses.
    pub fn parse(ty: DataType, text: &str) -> Option<Value> {
        match ty {
            DataType::U8 => parse_unsigned(text).map(Value::U8),
            DataType::U32 => parse_unsigned(text).map(Value::U32),
            DataType::U64 => parse_unsigned(text).map(Value::U64),
            DataType::I8 => parse_signed(text).map(Value::I8),
            DataType::I32 => parse_signed(text).map(Value::I32),
            DataType::Bool => match text {
                "0" => Some(Value::Bool(false)),
                "1" => Some(Value::Bool(true)),
                _ => None,
            },
            DataType::Time => parse_time(text).map(Value::Time),
            DataType::Ip => match text.parse::<IpAddr>() {
                Ok(IpAddr::V4(ip)) => Some(Value::Ip(ip)),
                _ => None,
            },
            DataType::Str => Some(Value::Str(decode_reserved(text))),
            DataType::Void => None,
        }
    }

    /// Render as text; times are raw milliseconds unless `human_time` is set
    pub fn render(&self, human_time: bool) -> String {
        match self {
            Value::U8(v) => v.to_string(),
            Value::U32(v) => v.to_string(),
            Value::U64(v) => v.to_string(),
            Value::Time(ms) if human_time => format_time(*ms),
            Value::Time(ms) => ms.to_string(),
            Value::Bool(b) => u8::from(*b).to_string(),
            Value::I8(v) => v.to_string(),
            Value::I32(v) => v.to_string(),
            Value::Void => "null".to_string(),
            Value::Str(s) => s.clone(),
            Value::Ip(ip) => ip.to_string(),
        }
    }

    /// Whether the value is non-negative
    ///
    /// Unsigned kinds and addresses are always positive; `Void` and strings
    /// never are.
    pub fn is_positive(&self) -> bool {
        match self {
            Value::I8(v) => *v >= 0,
            Value::I32(v) => *v >= 0,
            Value::U8(_)
            | Value::U32(_)
            | Value::U64(_)
            | Value::Time(_)
            | Value::Bool(_)
            | Value::Ip(_) => true,
            Value::Void | Value::Str(_) => false,
        }
    }

    /// Like [`Value::is_positive`], but signed kinds must be strictly above zero
    pub fn is_positive_nonzero(&self) -> bool {
        match self {
            Value::I8(v) => *v > 0,
            Value::I32(v) => *v > 0,
            other => other.is_positive(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

fn parse_unsigned<T: std::str::FromStr>(text: &str) -> Option<T> {
    if !is_int(text, false) {
        return None;
    }
    text.parse().ok()
}

fn parse_signed<T: std::str::FromStr>(text: &str) -> Option<T> {
    if !is_int(text, true) {
        return None;
    }
    text.parse().ok()
}
