use std::collections::HashMap;

use log::{debug, warn};

pub use crate::config::*;

/// A row as read by a source reader, before validation.
///
/// Counts are signed so that the validation can tell a negative count apart from
/// a value the reader could not parse at all.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RawRecord {
    /// Position of the row in its source, for diagnostics.
    pub row: usize,
    pub section: Option<String>,
    pub municipality: Option<String>,
    pub local_district: Option<String>,
    pub federal_district: Option<String>,
    pub nominal_roll: Option<i64>,
    pub votes: Vec<(String, i64)>,
    pub reported_total_votes: Option<i64>,
}

/// A row refused at ingestion, with the reason.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RejectedRecord {
    pub row: usize,
    pub reason: EngineErrors,
}

/// The validated records of one ingestion, one per section.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Dataset {
    pub records: Vec<VoteRecord>,
    pub rejected: Vec<RejectedRecord>,
}

/// A builder for collecting section tallies.
///
/// All the validation of the engine happens here: the other modules assume
/// records that went through the builder.
///
/// ```
/// pub use electoral_goals::builder::{RawRecord, RecordBuilder};
///
/// let mut builder = RecordBuilder::new();
/// builder.add_raw(&RawRecord {
///     row: 1,
///     section: Some("0102".to_string()),
///     nominal_roll: Some(600),
///     votes: vec![("PAN".to_string(), 120), ("MORENA".to_string(), 210)],
///     ..Default::default()
/// })?;
/// // A second booth of the same section is merged into the first one.
/// builder.add_raw(&RawRecord {
///     row: 2,
///     section: Some("0102".to_string()),
///     nominal_roll: Some(580),
///     votes: vec![("PAN".to_string(), 80)],
///     ..Default::default()
/// })?;
///
/// let dataset = builder.build();
/// assert_eq!(dataset.records.len(), 1);
/// assert_eq!(dataset.records[0].votes_for("PAN"), 200);
/// assert_eq!(dataset.records[0].nominal_roll, 1180);
///
/// # Ok::<(), electoral_goals::EngineErrors>(())
/// ```
#[derive(Debug, Default)]
pub struct RecordBuilder {
    _records: Vec<VoteRecord>,
    _by_section: HashMap<String, usize>,
    _rejected: Vec<RejectedRecord>,
}

impl RecordBuilder {
    pub fn new() -> RecordBuilder {
        RecordBuilder::default()
    }

    /// Validates a raw row and adds it.
    ///
    /// A refused row is kept in the rejection list of the dataset and the reason is
    /// also returned, so that the caller can decide how loud to be about it.
    pub fn add_raw(&mut self, raw: &RawRecord) -> Result<(), EngineErrors> {
        match validate_raw(raw) {
            Ok(record) => {
                self.add_record(record);
                Ok(())
            }
            Err(reason) => {
                warn!("add_raw: rejecting row {}: {}", raw.row, reason);
                self._rejected.push(RejectedRecord {
                    row: raw.row,
                    reason: reason.clone(),
                });
                Err(reason)
            }
        }
    }

    /// Adds an already validated record. Records of a section seen before are summed
    /// into the existing one.
    pub fn add_record(&mut self, record: VoteRecord) {
        match self._by_section.get(&record.section) {
            Some(idx) => {
                let existing = &mut self._records[*idx];
                debug!("add_record: merging section {}", record.section);
                merge_into(existing, record);
            }
            None => {
                self._by_section
                    .insert(record.section.clone(), self._records.len());
                self._records.push(record);
            }
        }
    }

    pub fn len(&self) -> usize {
        self._records.len()
    }

    pub fn is_empty(&self) -> bool {
        self._records.is_empty()
    }

    pub fn build(self) -> Dataset {
        debug!(
            "build: {} records, {} rejected rows",
            self._records.len(),
            self._rejected.len()
        );
        Dataset {
            records: self._records,
            rejected: self._rejected,
        }
    }
}

fn clean_label(value: &Option<String>) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => UNSPECIFIED.to_string(),
    }
}

fn non_negative(row: usize, column: &str, value: i64) -> Result<u64, EngineErrors> {
    if value < 0 {
        Err(EngineErrors::NegativeCount {
            row,
            column: column.to_string(),
        })
    } else {
        Ok(value as u64)
    }
}

fn validate_raw(raw: &RawRecord) -> Result<VoteRecord, EngineErrors> {
    let section = match raw.section.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => return Err(EngineErrors::MissingSection { row: raw.row }),
    };
    let nominal_roll = non_negative(raw.row, "nominal roll", raw.nominal_roll.unwrap_or(0))?;
    let reported_total_votes = match raw.reported_total_votes {
        Some(t) => Some(non_negative(raw.row, "total votes", t)?),
        None => None,
    };
    let mut record = VoteRecord::new(&section);
    record.municipality = clean_label(&raw.municipality);
    record.local_district = clean_label(&raw.local_district);
    record.federal_district = clean_label(&raw.federal_district);
    record.nominal_roll = nominal_roll;
    record.reported_total_votes = reported_total_votes;
    for (code, count) in raw.votes.iter() {
        let code = code.trim();
        if code.is_empty() {
            continue;
        }
        let count = non_negative(raw.row, code, *count)?;
        *record.votes_by_option.entry(code.to_string()).or_insert(0) += count;
    }
    Ok(record)
}

fn merge_label(section: &str, existing: &mut String, incoming: String) {
    if *existing == UNSPECIFIED {
        *existing = incoming;
    } else if incoming != UNSPECIFIED && *existing != incoming {
        warn!(
            "merge: section {} is labelled both {} and {}, keeping {}",
            section, existing, incoming, existing
        );
    }
}

fn merge_into(existing: &mut VoteRecord, record: VoteRecord) {
    merge_label(&record.section, &mut existing.municipality, record.municipality);
    merge_label(
        &record.section,
        &mut existing.local_district,
        record.local_district,
    );
    merge_label(
        &record.section,
        &mut existing.federal_district,
        record.federal_district,
    );
    existing.nominal_roll += record.nominal_roll;
    for (code, count) in record.votes_by_option {
        *existing.votes_by_option.entry(code).or_insert(0) += count;
    }
    existing.reported_total_votes = match (existing.reported_total_votes, record.reported_total_votes) {
        (Some(a), Some(b)) => Some(a + b),
        (a, b) => a.or(b),
    };
}
