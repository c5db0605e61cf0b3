// # Data Point Filters
//
// Filters select subsets of the registry for listing. The text form is
// `<kind>[!]<value>`:
//
// - `s0` / `s1`: settable or not
// - `t<tag>`: type tag (see `DataType`)
//
// A `!` right after the kind inverts the test. Lists are comma-separated and
// combine with AND.

use super::point::DataPoint;
use super::value::DataType;

/// Most filters parsed from one list
pub const MAX_FILTERS: usize = 8;

/// What a filter tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterKind {
    /// Matches nothing; the "no filter" sentinel
    #[default]
    None,
    /// Compare the type tag
    Type,
    /// Compare settability (value 0 or 1)
    Settable,
}

/// A single predicate over data points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Filter {
    pub kind: FilterKind,
    pub value: u8,
    pub inverse: bool,
}

impl Filter {
    pub fn new(kind: FilterKind, value: u8, inverse: bool) -> Self {
        Self {
            kind,
            value,
            inverse,
        }
    }

    pub fn by_type(ty: DataType, inverse: bool) -> Self {
        Self::new(FilterKind::Type, ty.tag(), inverse)
    }

    pub fn by_settable(settable: bool, inverse: bool) -> Self {
        Self::new(FilterKind::Settable, u8::from(settable), inverse)
    }

    pub fn is_none(&self) -> bool {
        self.kind == FilterKind::None
    }

    /// Parse one filter token
    ///
    /// Malformed tokens yield a filter of kind [`FilterKind::None`].
    pub fn parse(token: &str) -> Self {
        let mut chars = token.chars();
        let kind = chars.next();
        let rest = chars.as_str();
        let (inverse, value) = match rest.strip_prefix('!') {
            Some(value) => (true, value),
            None => (false, rest),
        };

        match kind {
            Some('s') => match value {
                "0" => Self::by_settable(false, inverse),
                "1" => Self::by_settable(true, inverse),
                _ => Self::default(),
            },
            Some('t') if super::text::is_int(value, false) => value
                .parse::<u64>()
                .ok()
                .and_then(DataType::from_tag)
                .map(|ty| Self::by_type(ty, inverse))
                .unwrap_or_default(),
            _ => Self::default(),
        }
    }

    /// Parse a comma-separated list
    ///
    /// Stops at the first malformed token (the rest cannot be trusted) and
    /// returns the filters parsed before it, at most [`MAX_FILTERS`].
    pub fn parse_list(list: &str) -> Vec<Filter> {
        list.split(',')
            .map(Filter::parse)
            .take_while(|f| !f.is_none())
            .take(MAX_FILTERS)
            .collect()
    }

    /// Evaluate the filter against a point
    pub fn matches(&self, point: &DataPoint) -> bool {
        let hit = match self.kind {
            FilterKind::None => return false,
            FilterKind::Type => point.data_type().tag() == self.value,
            FilterKind::Settable => point.is_settable() == (self.value != 0),
        };
        hit != self.inverse
    }

    /// Whether a point passes every filter in `filters`
    pub fn matches_all(filters: &[Filter], point: &DataPoint) -> bool {
        filters.iter().all(|f| f.matches(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::point::ValueSlot;
    use crate::registry::value::Value;

    #[test]
    fn test_parse_type_filter() {
        let f = Filter::parse("t4");
        assert_eq!(f.kind, FilterKind::Type);
        assert_eq!(f.value, DataType::Bool.tag());
        assert!(!f.inverse);

        assert_eq!(Filter::parse("t!101"), Filter::by_type(DataType::Str, true));
        assert!(Filter::parse("t5").is_none());
        assert!(Filter::parse("t").is_none());
        assert!(Filter::parse("t-1").is_none());
    }

    #[test]
    fn test_parse_settable_filter() {
        let f = Filter::parse("s!1");
        assert_eq!(f.kind, FilterKind::Settable);
        assert_eq!(f.value, 1);
        assert!(f.inverse);

        assert!(Filter::parse("s2").is_none());
        assert!(Filter::parse("s10").is_none());
        assert!(Filter::parse("s").is_none());
    }

    #[test]
    fn test_parse_unknown_kind() {
        assert!(Filter::parse("x9").is_none());
        assert!(Filter::parse("").is_none());
        assert!(Filter::parse("!s1").is_none());
    }

    #[test]
    fn test_parse_list_stops_at_garbage() {
        let filters = Filter::parse_list("s1,t2,bogus");
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0], Filter::by_settable(true, false));
        assert_eq!(filters[1], Filter::by_type(DataType::U64, false));

        assert!(Filter::parse_list("").is_empty());
        assert_eq!(Filter::parse_list("s1,,t2").len(), 1);
        assert_eq!(Filter::parse_list(&["s1"; 12].join(",")).len(), MAX_FILTERS);
    }

    #[test]
    fn test_matches() {
        let rw = DataPoint::settable("level", ValueSlot::new(Value::U8(3)));
        let ro = DataPoint::read_only("label", ValueSlot::new(Value::Str("x".into())));

        let settable = Filter::by_settable(true, false);
        assert!(settable.matches(&rw));
        assert!(!settable.matches(&ro));

        let not_settable = Filter::parse("s!1");
        assert!(!not_settable.matches(&rw));
        assert!(not_settable.matches(&ro));

        let is_str = Filter::by_type(DataType::Str, false);
        assert!(is_str.matches(&ro));
        assert!(!is_str.matches(&rw));

        assert!(!Filter::default().matches(&rw));
        assert!(Filter::matches_all(&[settable, Filter::parse("t0")], &rw));
        assert!(!Filter::matches_all(&[settable, is_str], &rw));
        assert!(Filter::matches_all(&[], &ro));
    }
}
