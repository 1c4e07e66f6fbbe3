use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::config::*;

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn matches_criterion(record: &VoteRecord, field: GeoField, wanted: &str) -> bool {
    normalize(record.geo(field)) == normalize(wanted)
}

/// Keeps the records that satisfy every active criterion of the filter.
///
/// The input order is preserved. A criterion set to "all" does not restrict anything,
/// and an empty filter returns all the records.
pub fn filter_records(records: &[VoteRecord], filter: &GeoFilter) -> Vec<VoteRecord> {
    let criteria = filter.active_criteria();
    let res: Vec<VoteRecord> = records
        .iter()
        .filter(|r| {
            criteria
                .iter()
                .all(|(field, wanted)| matches_criterion(r, *field, wanted))
        })
        .cloned()
        .collect();
    debug!(
        "filter_records: {:?} -> {} of {} records",
        criteria,
        res.len(),
        records.len()
    );
    res
}

// Integer labels (sections, district numbers) sort by value, anything else lexically.
fn compare_labels(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// The distinct values of a geographic level, sorted.
pub fn distinct_values(records: &[VoteRecord], field: GeoField) -> Vec<String> {
    let set: BTreeSet<&str> = records.iter().map(|r| r.geo(field)).collect();
    let mut values: Vec<String> = set.into_iter().map(|s| s.to_string()).collect();
    values.sort_by(|a, b| compare_labels(a, b));
    values
}

/// The choices offered at each level of the hierarchy, given the current selection.
///
/// Each level only offers the values compatible with the levels above it:
/// districts depend on the municipality, sections depend on the municipality and
/// both districts.
pub fn cascading_options(records: &[VoteRecord], filter: &GeoFilter) -> FilterOptions {
    let by_municipality = filter_records(
        records,
        &GeoFilter {
            municipality: filter.municipality.clone(),
            ..Default::default()
        },
    );
    let by_districts = filter_records(
        records,
        &GeoFilter {
            section: None,
            ..filter.clone()
        },
    );
    FilterOptions {
        municipalities: distinct_values(records, GeoField::Municipality),
        local_districts: distinct_values(&by_municipality, GeoField::LocalDistrict),
        federal_districts: distinct_values(&by_municipality, GeoField::FederalDistrict),
        sections: distinct_values(&by_districts, GeoField::Section),
    }
}

/// Partitions the records by the value of a geographic level.
pub fn group_by(records: &[VoteRecord], field: GeoField) -> BTreeMap<String, Vec<VoteRecord>> {
    let mut groups: BTreeMap<String, Vec<VoteRecord>> = BTreeMap::new();
    for r in records {
        groups
            .entry(r.geo(field).to_string())
            .or_default()
            .push(r.clone());
    }
    groups
}
