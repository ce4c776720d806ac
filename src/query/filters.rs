//! Filter values and the ordered filter mapping.

use std::fmt;

use jiff::civil::Date;

/// Query parameter names a date range is sent under
pub const RANGE_BEGIN_PARAM: &str = "begin";
pub const RANGE_END_PARAM: &str = "end";

/// Inclusive date range; either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub begin: Option<Date>,
    pub end: Option<Date>,
}

impl DateRange {
    pub fn new(begin: Option<Date>, end: Option<Date>) -> Self {
        Self { begin, end }
    }

    pub fn is_open(&self) -> bool {
        self.begin.is_none() && self.end.is_none()
    }
}

/// Value of a single filter dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    /// Free text, matched by the backend however it likes
    Text(String),
    /// One value out of an enumerated set, already in wire form
    Choice(String),
    Range(DateRange),
}

impl FilterValue {
    pub fn text(value: impl Into<String>) -> Self {
        FilterValue::Text(value.into())
    }

    pub fn choice(value: impl Into<String>) -> Self {
        FilterValue::Choice(value.into())
    }

    /// An empty value places no constraint on its dimension.
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::Text(s) | FilterValue::Choice(s) => s.trim().is_empty(),
            FilterValue::Range(range) => range.is_open(),
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Text(s) | FilterValue::Choice(s) => write!(f, "{s}"),
            FilterValue::Range(range) => {
                let begin = range.begin.map(|d| d.to_string()).unwrap_or_default();
                let end = range.end.map(|d| d.to_string()).unwrap_or_default();
                write!(f, "{begin}..{end}")
            }
        }
    }
}

/// Filter key to value mapping that keeps insertion order.
///
/// Inserting an existing key replaces its value in place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Filters {
    entries: Vec<(String, FilterValue)>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: FilterValue) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FilterValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<FilterValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when no entry places any constraint.
    pub fn is_unconstrained(&self) -> bool {
        self.entries.iter().all(|(_, v)| v.is_empty())
    }

    /// Query parameters for the constraining entries, in insertion order.
    ///
    /// Empty values are omitted; a range is sent as its bounds.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.entries.len());
        for (key, value) in &self.entries {
            if value.is_empty() {
                continue;
            }
            match value {
                FilterValue::Text(s) | FilterValue::Choice(s) => {
                    pairs.push((key.clone(), s.trim().to_string()));
                }
                FilterValue::Range(range) => {
                    if let Some(begin) = range.begin {
                        pairs.push((RANGE_BEGIN_PARAM.to_string(), begin.to_string()));
                    }
                    if let Some(end) = range.end {
                        pairs.push((RANGE_END_PARAM.to_string(), end.to_string()));
                    }
                }
            }
        }
        pairs
    }
}

impl<K: Into<String>> FromIterator<(K, FilterValue)> for Filters {
    fn from_iter<I: IntoIterator<Item = (K, FilterValue)>>(iter: I) -> Self {
        let mut filters = Filters::new();
        for (key, value) in iter {
            filters.insert(key, value);
        }
        filters
    }
}
