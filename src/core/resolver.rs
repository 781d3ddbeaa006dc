use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::iri::IriSanitizer;
use crate::core::schema::{ForeignReference, SchemaRow};
use crate::error::ExtractResult;
use crate::handlers::{CellValue, DataRow, Workbooks};
use crate::knowledge_graph::TripleSet;

/// Why a foreign key produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissReason {
    /// A key segment could not be read as an integer.
    NotAnInteger(String),
    /// No foreign row carries the key.
    NoMatchingRow,
    /// The matching row has no value in the value column or its backup.
    EmptyValue,
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissReason::NotAnInteger(raw) => write!(f, "key '{}' is not an integer", raw),
            MissReason::NoMatchingRow => write!(f, "no matching row"),
            MissReason::EmptyValue => write!(f, "matching row has no value"),
        }
    }
}

/// Outcome of looking up one key in a foreign sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(CellValue),
    Miss(MissReason),
}

/// A swallowed lookup failure with enough context to find the offending cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionMiss {
    pub file: String,
    pub sheet: String,
    pub column: String,
    pub key: String,
    pub foreign_file: String,
    pub foreign_sheet: String,
    pub reason: MissReason,
}

impl fmt::Display for ResolutionMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} column '{}' key '{}' -> {}/{}: {}",
            self.file, self.sheet, self.column, self.key, self.foreign_file, self.foreign_sheet,
            self.reason
        )
    }
}

/// Triples gathered for one subject from one data row, with the lookups that failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contribution {
    pub triples: TripleSet,
    pub misses: Vec<ResolutionMiss>,
}

impl Contribution {
    pub fn absorb(&mut self, other: Contribution) {
        self.triples.union(other.triples);
        self.misses.extend(other.misses);
    }
}

pub struct ForeignKeyResolver<'a> {
    workbooks: &'a Workbooks,
    sanitizer: &'a IriSanitizer,
}

impl<'a> ForeignKeyResolver<'a> {
    pub fn new(workbooks: &'a Workbooks, sanitizer: &'a IriSanitizer) -> Self {
        Self { workbooks, sanitizer }
    }

    /// Follow `rule`'s foreign-key column in `row` to the referenced values.
    ///
    /// Produces one triple per key and split value, all sharing the rule's predicate. Only a
    /// missing foreign sheet is an error.
    pub fn resolve(&self, row: &DataRow, rule: &SchemaRow) -> ExtractResult<Contribution> {
        let mut contribution = Contribution::default();

        let Some(reference) = rule.foreign_reference() else {
            return Ok(contribution);
        };
        let cell = row.get(&rule.column_header);
        if cell.is_empty() {
            return Ok(contribution);
        }
        let Some(predicate) = rule.definition.as_deref().and_then(|d| self.sanitizer.sanitize(d))
        else {
            tracing::debug!(
                "{}/{} column '{}' has no usable predicate",
                rule.file, rule.sheet, rule.column_header
            );
            return Ok(contribution);
        };

        for key in split_keys(cell, reference) {
            let miss = |key: &str, reason: MissReason| ResolutionMiss {
                file: rule.file.clone(),
                sheet: rule.sheet.clone(),
                column: rule.column_header.clone(),
                key: key.to_string(),
                foreign_file: reference.foreign_file.clone(),
                foreign_sheet: reference.foreign_sheet.clone(),
                reason,
            };

            let key = match key {
                Ok(key) => key,
                Err(raw) => {
                    contribution.misses.push(miss(&raw, MissReason::NotAnInteger(raw.clone())));
                    continue;
                }
            };

            match self.lookup(reference, key)? {
                Resolution::Resolved(value) => {
                    for object in split_values(&value, reference) {
                        if let Some(object) = self.sanitizer.sanitize(&object) {
                            contribution.triples.insert(predicate.clone(), object);
                        }
                    }
                }
                Resolution::Miss(reason) => {
                    contribution.misses.push(miss(&key.to_string(), reason));
                }
            }
        }

        Ok(contribution)
    }

    /// Value for `key` in the foreign sheet, falling back to the backup column when the
    /// primary value column is empty.
    pub fn lookup(&self, reference: &ForeignReference, key: i64) -> ExtractResult<Resolution> {
        let table = self
            .workbooks
            .table(&reference.foreign_file, &reference.foreign_sheet)?;

        let Some(row) = table
            .rows
            .iter()
            .find(|row| row.get(&reference.key_column).as_key() == Some(key))
        else {
            return Ok(Resolution::Miss(MissReason::NoMatchingRow));
        };

        let primary = row.get(&reference.value_column);
        if has_value(primary) {
            return Ok(Resolution::Resolved(primary.clone()));
        }

        if let Some(backup_column) = &reference.backup_column {
            let backup = row.get(backup_column);
            if has_value(backup) {
                return Ok(Resolution::Resolved(backup.clone()));
            }
        }

        Ok(Resolution::Miss(MissReason::EmptyValue))
    }
}

// Whitespace-only text counts as blank.
fn has_value(cell: &CellValue) -> bool {
    match cell {
        CellValue::Text(text) => !text.trim().is_empty(),
        other => !other.is_empty(),
    }
}

/// Integer keys in a foreign-key cell; unreadable segments come back as `Err(raw)`.
fn split_keys(cell: &CellValue, reference: &ForeignReference) -> Vec<Result<i64, String>> {
    match (cell, &reference.split_key_by) {
        (CellValue::Text(text), Some(separator)) => text
            .split(separator.as_str())
            .map(|segment| parse_key(segment.trim()))
            .collect(),
        (CellValue::Text(text), None) => vec![parse_key(text.trim())],
        (other, _) => vec![other
            .as_key()
            .ok_or_else(|| other.to_text().unwrap_or_default())],
    }
}

fn parse_key(raw: &str) -> Result<i64, String> {
    raw.parse::<i64>().map_err(|_| raw.to_string())
}

fn split_values(value: &CellValue, reference: &ForeignReference) -> Vec<String> {
    let values: Vec<String> = match (value, &reference.split_value_by) {
        (CellValue::Text(text), Some(separator)) => {
            text.split(separator.as_str()).map(str::to_string).collect()
        }
        _ => value.to_text().into_iter().collect(),
    };

    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}
