// # Text Grammar Helpers
//
// Small parsers shared by value validation: plain integers, millisecond
// time strings, and percent-decoding of query-string values.

/// Milliseconds per unit, largest first
const MS_PER_SECOND: u64 = 1000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// Reserved characters accepted in percent-encoded form
const ENCODED_CHARS: &[(&str, char)] = &[
    ("20", ' '), ("21", '!'), ("22", '"'), ("23", '#'), ("24", '$'), ("25", '%'),
    ("26", '&'), ("27", '\''), ("28", '('), ("29", ')'), ("2A", '*'), ("2B", '+'),
    ("2C", ','), ("2D", '-'), ("2E", '.'), ("2F", '/'), ("3A", ':'), ("3B", ';'),
    ("3C", '<'), ("3D", '='), ("3E", '>'), ("3F", '?'), ("40", '@'), ("5B", '['),
    ("5C", '\\'), ("5D", ']'), ("5E", '^'), ("5F", '_'), ("60", '`'), ("7B", '{'),
    ("7C", '|'), ("7D", '}'), ("7E", '~'),
];

/// Whether `s` is a run of ASCII digits with an optional leading `-`
///
/// No `+`, no whitespace, no empty string.
pub fn is_int(s: &str, allow_negative: bool) -> bool {
    let digits = match s.strip_prefix('-') {
        Some(rest) if allow_negative => rest,
        Some(_) => return false,
        None => s,
    };
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Parse a time string into milliseconds
///
/// Accepts raw milliseconds (`"90061001"`) or `[[[d:]h:]m:]s[.ms]` where each
/// colon-separated part is 0-99 and the millisecond part 0-999
/// (`"1:01:01:01.001"`).
pub fn parse_time(s: &str) -> Option<u64> {
    if s.starts_with('-') {
        return None;
    }
    if is_int(s, false) {
        return s.parse().ok();
    }

    let (clock, millis) = match s.split_once('.') {
        Some((clock, ms)) => {
            if !is_int(ms, false) {
                return None;
            }
            let ms: u64 = ms.parse().ok()?;
            if ms > 999 {
                return None;
            }
            (clock, ms)
        }
        None => (s, 0),
    };

    let parts: Vec<&str> = clock.split(':').collect();
    if parts.len() > 4 {
        return None;
    }

    let units = [MS_PER_SECOND, MS_PER_MINUTE, MS_PER_HOUR, MS_PER_DAY];
    let mut total = millis;
    for (part, unit) in parts.iter().rev().zip(units) {
        if !is_int(part, false) {
            return None;
        }
        let value: u64 = part.parse().ok()?;
        if value > 99 {
            return None;
        }
        total += value * unit;
    }
    Some(total)
}

/// Format milliseconds as `dd:hh:mm:SS.sss`
///
/// Leading zero units are omitted, later units are padded to two digits and
/// milliseconds always use three: `0.500`, `1:01.000`, `1:01:01:01.001`.
pub fn format_time(ms: u64) -> String {
    let mut out = String::with_capacity(16);
    let mut rest = ms;

    for unit in [MS_PER_DAY, MS_PER_HOUR, MS_PER_MINUTE, MS_PER_SECOND] {
        let count = rest / unit;
        rest -= count * unit;
        if out.is_empty() {
            if count > 0 || unit == MS_PER_SECOND {
                out.push_str(&count.to_string());
                out.push(':');
            }
        } else {
            out.push_str(&format!("{:02}:", count));
        }
    }

    out.pop();
    out.push_str(&format!(".{:03}", rest));
    out
}

/// Replace percent-encoded reserved characters in a single pass
///
/// Only the fixed reserved set is decoded; other escapes are kept as-is.
pub fn decode_reserved(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(idx) = rest.find('%') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx + 1..];
        let decoded = tail.get(..2).and_then(|code| {
            ENCODED_CHARS
                .iter()
                .find(|(hex, _)| hex.eq_ignore_ascii_case(code))
                .map(|(_, c)| *c)
        });
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[2..];
            }
            None => {
                out.push('%');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}
