//! Accumulation and serialization of merged SAM headers.
//!
//! [`SamHeader`] collects header records from several sources in turn (a
//! saved template, synthetic insertions, the live stream's own header) and
//! re-emits one canonical header. Along the way it:
//!
//! - keeps only the last `@HD` seen, falling back to a default;
//! - keeps only the most recent uninterrupted run of `@SQ` records: a
//!   `@HD` or `@PG` line marks the start of a new header fragment, and the
//!   next `@SQ` batch supersedes the previous one;
//! - de-duplicates `@RG` records by `ID`, rejecting conflicting reuse;
//! - renames colliding `@PG` IDs and rewrites `PP` references so the
//!   provenance chain stays intact, chaining parentless records onto
//!   whatever came before them.
//!
//! Insertion order across sources is the sole source of chain
//! linearization: records fed earlier are parents of records fed later.

use std::collections::HashMap;
use std::io::{self, Write};

use thiserror::Error;

use crate::record::{parse_line, Fields, HeaderRecord, RecordError};

/// Emitted when no `@HD` record was ever observed.
const DEFAULT_HD: &str = "VN:1.6\tSO:unknown";

#[derive(Error, Debug)]
pub enum HeaderError {
    #[error(transparent)]
    Record(#[from] RecordError),

    /// The same `@RG` ID arrived twice with different content.
    #[error("Duplicate RG with ID '{0}' conflicts with previously seen RG with same ID.")]
    DuplicateReadGroup(String),

    /// A `@PG` named a `PP` whose ID has not been inserted yet.
    #[error("Encountered PG.PP '{0}' before observing corresponding PG.ID")]
    UnresolvedProgramParent(String),

    /// A structured record reached the accumulator without an `ID` field.
    /// Unreachable through [`SamHeader::add_line`]; the parser rejects these.
    #[error("{0} record has no ID")]
    MissingId(&'static str),
}

/// Stateful aggregate of all header metadata seen so far.
///
/// Create one per merge, feed it every header line, then serialize exactly
/// once with [`SamHeader::write_header`].
#[derive(Debug, Default)]
pub struct SamHeader {
    hd: Option<String>,
    sq_records: Vec<String>,
    reset_sq: bool,
    rg_records: Vec<Fields>,
    pg_records: Vec<Fields>,
    /// Original `@PG` ID -> the resolved ID it was most recently assigned.
    pg_ids: HashMap<String, String>,
    last_pg_id: Option<String>,
    co_records: Vec<String>,
}

impl SamHeader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one raw header line and fold it into the accumulator.
    ///
    /// # Errors
    ///
    /// Returns the parser's error for an unparseable line, or the insertion
    /// errors documented on [`SamHeader::add_record`].
    pub fn add_line(&mut self, line: &str) -> Result<(), HeaderError> {
        self.add_record(parse_line(line)?)
    }

    /// Fold one parsed record into the accumulator.
    ///
    /// # Errors
    ///
    /// Returns `HeaderError::DuplicateReadGroup` for a conflicting `@RG`
    /// re-insert and `HeaderError::UnresolvedProgramParent` for a `@PG`
    /// whose `PP` names an ID not seen yet.
    pub fn add_record(&mut self, record: HeaderRecord) -> Result<(), HeaderError> {
        match record {
            HeaderRecord::Hd(content) => {
                self.hd = Some(content);
                self.reset_sq = true;
            }
            HeaderRecord::Sq(content) => {
                if self.reset_sq {
                    self.sq_records.clear();
                    self.reset_sq = false;
                }
                self.sq_records.push(content);
            }
            HeaderRecord::Rg(fields) => self.add_read_group(fields)?,
            HeaderRecord::Pg(fields) => {
                self.reset_sq = true;
                self.add_program(fields)?;
            }
            HeaderRecord::Co(content) => self.co_records.push(content),
        }
        Ok(())
    }

    /// Re-inserting an `@RG` with identical content is a no-op; the same ID
    /// with different content is fatal.
    fn add_read_group(&mut self, fields: Fields) -> Result<(), HeaderError> {
        let id = fields
            .get("ID")
            .ok_or(HeaderError::MissingId("RG"))?
            .to_string();
        match self
            .rg_records
            .iter()
            .find(|rg| rg.get("ID") == Some(id.as_str()))
        {
            Some(existing) if *existing == fields => Ok(()),
            Some(_) => Err(HeaderError::DuplicateReadGroup(id)),
            None => {
                self.rg_records.push(fields);
                Ok(())
            }
        }
    }

    /// Resolve a `@PG` record's identity and parent, then store it.
    ///
    /// A colliding ID is renamed to the smallest unused `<ID>-<n>`. An
    /// explicit `PP` must reference an already-seen original ID and is
    /// rewritten to that ID's current resolved form. A record without a `PP`
    /// chains onto the most recently stored record, so sequential insertion
    /// yields one linear chain; the first record ever stays parentless.
    fn add_program(&mut self, mut fields: Fields) -> Result<(), HeaderError> {
        let orig_id = fields
            .get("ID")
            .ok_or(HeaderError::MissingId("PG"))?
            .to_string();

        let resolved_id = if self.pg_ids.contains_key(&orig_id) {
            let mut n = 0usize;
            loop {
                let candidate = format!("{orig_id}-{n}");
                if !self
                    .pg_records
                    .iter()
                    .any(|pg| pg.get("ID") == Some(candidate.as_str()))
                {
                    break candidate;
                }
                n += 1;
            }
        } else {
            orig_id.clone()
        };

        match fields.get("PP").map(str::to_string) {
            Some(parent) => {
                let current = self
                    .pg_ids
                    .get(&parent)
                    .ok_or_else(|| HeaderError::UnresolvedProgramParent(parent.clone()))?;
                fields.set("PP", current.clone());
            }
            None => {
                if let Some(last) = &self.last_pg_id {
                    fields.set("PP", last.clone());
                }
            }
        }

        fields.set("ID", resolved_id.clone());
        self.pg_records.push(fields);
        self.pg_ids.insert(orig_id, resolved_id.clone());
        self.last_pg_id = Some(resolved_id);
        Ok(())
    }

    /// Serialize the accumulated header.
    ///
    /// Emission order is fixed: `@HD` (or its default), `@SQ`, `@RG`, `@PG`,
    /// `@CO`, each group in insertion order, one line terminator per record.
    /// The accumulator is not consumed; serializing twice without mutation
    /// produces byte-identical output.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn write_header<W: Write>(&self, out: &mut W) -> io::Result<()> {
        #[cfg(debug_assertions)]
        {
            let links: Vec<(&str, Option<&str>)> = self
                .pg_records
                .iter()
                .map(|pg| (pg.get("ID").unwrap_or_default(), pg.get("PP")))
                .collect();
            debug_assert!(
                crate::chain::resolve_pg_chain(&links).is_ok(),
                "accumulated PG records must form a rooted acyclic chain"
            );
        }

        writeln!(out, "@HD\t{}", self.hd.as_deref().unwrap_or(DEFAULT_HD))?;
        for sq in &self.sq_records {
            writeln!(out, "@SQ\t{sq}")?;
        }
        for rg in &self.rg_records {
            writeln!(out, "@RG\t{rg}")?;
        }
        for pg in &self.pg_records {
            writeln!(out, "@PG\t{pg}")?;
        }
        for co in &self.co_records {
            writeln!(out, "@CO\t{co}")?;
        }
        Ok(())
    }
}
