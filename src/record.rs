//! Parsing of individual SAM header lines.
//!
//! A header line is a tab-separated record whose first field is the record
//! type: `@` followed by two letters. Five types are recognized:
//!
//! | Type  | Payload |
//! |-------|---------|
//! | `@HD` | opaque content (version, sort order) |
//! | `@SQ` | opaque content (sequence name, length, ...) |
//! | `@RG` | `KEY:VALUE` fields, `ID` required |
//! | `@PG` | `KEY:VALUE` fields, `ID` required, closed key set |
//! | `@CO` | free-text comment |
//!
//! `@HD` and `@SQ` content is deliberately not decomposed: the merge never
//! needs to inspect it and must reproduce it byte for byte, including tags
//! this crate has never heard of.

use std::fmt;

use thiserror::Error;

/// Keys permitted on a `@PG` record.
const PROGRAM_KEYS: [&str; 6] = ["ID", "PN", "CL", "PP", "DS", "VN"];

#[derive(Error, Debug)]
pub enum RecordError {
    /// The line has no tab at all, so there is no record type field.
    #[error("Record type could not be determined: {0}")]
    TypeIndeterminate(String),

    /// The first field is not `@` plus two characters.
    #[error("Record type malformed: {0}")]
    TypeMalformed(String),

    /// The first field is shaped like a record type but is not one of the
    /// five types this merge understands.
    #[error("Unknown record type: {0}")]
    UnknownType(String),

    /// A structured field without a `KEY:VALUE` colon.
    #[error("{tag} with bad field '{field}'")]
    BadField { tag: &'static str, field: String },

    #[error("PG with bad key '{0}'")]
    BadProgramKey(String),

    /// A structured record without the mandatory `ID` field.
    #[error("{tag} with no ID: {rest}")]
    MissingId { tag: &'static str, rest: String },
}

/// Insertion-ordered `KEY:VALUE` field map for `@RG` and `@PG` records.
///
/// Setting an existing key rewrites its value in place; setting a new key
/// appends. Equality ignores key order, which is presentation only.
#[derive(Debug, Clone, Default, Eq)]
pub struct Fields(Vec<(String, String)>);

impl Fields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for Fields {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .all(|(k, v)| other.get(k) == Some(v.as_str()))
    }
}

impl fmt::Display for Fields {
    /// Canonical textual form: `KEY:VALUE` fields joined by tabs, in stored
    /// order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{key}:{value}")?;
        }
        Ok(())
    }
}

/// One parsed header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderRecord {
    Hd(String),
    Sq(String),
    Rg(Fields),
    Pg(Fields),
    Co(String),
}

/// Parse a single header line (no trailing newline) into a [`HeaderRecord`].
///
/// # Errors
///
/// Returns `RecordError::TypeIndeterminate` when the line has no tab,
/// `RecordError::TypeMalformed` when the first field is not `@` plus two
/// characters, `RecordError::UnknownType` for an unrecognized record type,
/// and the structured-field errors for bad `@RG`/`@PG` payloads.
pub fn parse_line(line: &str) -> Result<HeaderRecord, RecordError> {
    let Some((tag, rest)) = line.split_once('\t') else {
        return Err(RecordError::TypeIndeterminate(line.to_string()));
    };
    if tag.len() != 3 || !tag.starts_with('@') {
        return Err(RecordError::TypeMalformed(line.to_string()));
    }
    match tag {
        "@HD" => Ok(HeaderRecord::Hd(rest.to_string())),
        "@SQ" => Ok(HeaderRecord::Sq(rest.to_string())),
        "@RG" => Ok(HeaderRecord::Rg(parse_fields("RG", rest)?)),
        "@PG" => Ok(HeaderRecord::Pg(parse_fields("PG", rest)?)),
        "@CO" => Ok(HeaderRecord::Co(rest.to_string())),
        _ => Err(RecordError::UnknownType(line.to_string())),
    }
}

/// Split `KEY:VALUE` fields on the first colon only, so values may contain
/// colons. A repeated key keeps its original position, last value wins.
fn parse_fields(tag: &'static str, rest: &str) -> Result<Fields, RecordError> {
    let mut fields = Fields::new();
    for field in rest.split('\t') {
        let Some((key, value)) = field.split_once(':') else {
            return Err(RecordError::BadField {
                tag,
                field: field.to_string(),
            });
        };
        if tag == "PG" && !PROGRAM_KEYS.contains(&key) {
            return Err(RecordError::BadProgramKey(key.to_string()));
        }
        fields.set(key, value);
    }
    if fields.get("ID").is_none() {
        return Err(RecordError::MissingId {
            tag,
            rest: rest.to_string(),
        });
    }
    Ok(fields)
}
