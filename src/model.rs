use crate::{Error, Result};
use compact_str::CompactString;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Qualified tag names
// ============================================================================

/// A `prefix:local` element name such as `gl-cor:entryNumber`.
///
/// Prefixes are matched literally; no namespace URI resolution takes place.
/// The lowercase lookup key is computed once at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QName {
    prefix: CompactString,
    local: CompactString,
    key: CompactString,
}

impl QName {
    pub fn new(prefix: &str, local: &str) -> Self {
        let key = format!("{}:{}", prefix, local).to_lowercase();
        Self {
            prefix: CompactString::from(prefix),
            local: CompactString::from(local),
            key: CompactString::from(key),
        }
    }

    #[inline]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Column name used for this tag in every [`Record`].
    #[inline]
    pub fn local(&self) -> &str {
        &self.local
    }

    /// Case-folded `prefix:local`, the form document lookups compare against.
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prefix, self.local)
    }
}

impl FromStr for QName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((prefix, local))
                if !prefix.is_empty() && !local.is_empty() && !local.contains(':') =>
            {
                Ok(Self::new(prefix, local))
            }
            _ => Err(Error::Schema(format!(
                "invalid qualified name '{}', expected prefix:local",
                s
            ))),
        }
    }
}

impl TryFrom<String> for QName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<QName> for String {
    fn from(name: QName) -> Self {
        name.to_string()
    }
}

// ============================================================================
// Flat output records
// ============================================================================

/// One flattened entry-detail row.
///
/// Columns keep schema order: accounting-entries fields first, then header
/// fields, then detail fields. A `None` value means the tag was not present in
/// the source; `Some("")` means it was present with no text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(CompactString, Option<String>)>,
}

impl Record {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, name: &str, value: Option<String>) {
        self.fields.push((CompactString::from(name), value));
    }

    /// `None` if the column does not exist, `Some(None)` if the tag was absent.
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.fields
            .iter()
            .find(|(key, _)| key.as_str() == name)
            .map(|(_, value)| value.as_deref())
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.fields.iter().any(|(key, _)| key.as_str() == name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key.as_str(), value)?;
        }
        map.end()
    }
}
