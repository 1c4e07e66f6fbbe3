use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::config::*;
use crate::{share_percent, VoteCount};

fn column_total(records: &[VoteRecord], code: &str) -> VoteCount {
    records.iter().map(|r| VoteCount(r.votes_for(code))).sum()
}

/// Sums the votes of each reporting unit over the records.
///
/// The percentages are relative to the votes of the distinct option columns the units
/// cover: a column listed by two units (a party and a coalition containing it, for
/// instance) is only counted once in the total. With no votes at all, every
/// percentage is zero.
pub fn aggregate(records: &[VoteRecord], units: &[ReportingUnit]) -> Aggregation {
    let columns: BTreeSet<&str> = units
        .iter()
        .flat_map(|u| u.members.iter().map(|m| m.as_str()))
        .collect();
    let column_votes: BTreeMap<&str, VoteCount> = columns
        .iter()
        .map(|c| (*c, column_total(records, c)))
        .collect();
    let total: VoteCount = column_votes.values().cloned().sum();

    let mut results: BTreeMap<String, AggregationResult> = BTreeMap::new();
    for unit in units {
        let votes: VoteCount = unit
            .members
            .iter()
            .map(|m| column_votes.get(m.as_str()).cloned().unwrap_or(VoteCount::EMPTY))
            .sum();
        results.insert(
            unit.code.clone(),
            AggregationResult {
                code: unit.code.clone(),
                votes: votes.0,
                percentage_of_total: share_percent(votes.0, total.0),
            },
        );
    }
    let total_nominal_roll: u64 = records.iter().map(|r| r.nominal_roll).sum();
    debug!(
        "aggregate: {} units over {} records, total {:?}",
        results.len(),
        records.len(),
        total
    );
    Aggregation {
        results,
        total_votes: total.0,
        total_nominal_roll,
        record_count: records.len(),
    }
}

/// Aggregates plain option columns, each being its own unit.
pub fn aggregate_codes(records: &[VoteRecord], codes: &[&str]) -> Aggregation {
    let units: Vec<ReportingUnit> = codes.iter().map(|c| ReportingUnit::party(c)).collect();
    aggregate(records, &units)
}

/// Every option code found in the records, sorted.
pub fn all_option_codes(records: &[VoteRecord]) -> Vec<String> {
    let codes: BTreeSet<&String> = records
        .iter()
        .flat_map(|r| r.votes_by_option.keys())
        .collect();
    codes.into_iter().cloned().collect()
}

/// The total of the votes cast, over every option of every record.
pub fn total_votes_cast(records: &[VoteRecord]) -> u64 {
    records.iter().map(|r| r.total_votes()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scenario() -> Vec<VoteRecord> {
        vec![
            VoteRecord::new("1")
                .with_nominal_roll(300)
                .with_votes("PAN", 100)
                .with_votes("MORENA", 150),
            VoteRecord::new("2")
                .with_nominal_roll(150)
                .with_votes("PAN", 50)
                .with_votes("MORENA", 50),
        ]
    }

    #[test]
    fn sums_parties() {
        let agg = aggregate_codes(&scenario(), &["PAN", "MORENA"]);
        assert_eq!(agg.votes("PAN"), 150);
        assert_eq!(agg.votes("MORENA"), 200);
        assert_eq!(agg.total_votes, 350);
        assert_eq!(agg.total_nominal_roll, 450);
        assert_eq!(agg.record_count, 2);
        let pan = agg.get("PAN").unwrap().percentage_of_total;
        assert!((pan - 42.857142857).abs() < 1e-6);
    }

    #[test]
    fn unknown_columns_count_zero() {
        let unit = ReportingUnit::from_coalition(&Coalition::new("Ghost", &["XYZ"], "#000000"));
        let agg = aggregate(&scenario(), &[unit]);
        assert_eq!(agg.votes("Ghost"), 0);
        assert_eq!(agg.get("Ghost").unwrap().percentage_of_total, 0.0);
        assert_eq!(agg.total_votes, 0);
    }

    #[test]
    fn shared_columns_are_counted_once() {
        let coalition =
            ReportingUnit::from_coalition(&Coalition::new("Alliance", &["PAN", "MORENA"], "#111111"));
        let agg = aggregate(
            &scenario(),
            &[
                coalition,
                ReportingUnit::party("PAN"),
                ReportingUnit::party("MORENA"),
            ],
        );
        assert_eq!(agg.total_votes, 350);
        assert_eq!(agg.votes("Alliance"), 350);
        assert_eq!(agg.get("Alliance").unwrap().percentage_of_total, 100.0);
    }

    #[test]
    fn empty_input_is_all_zero() {
        let agg = aggregate_codes(&[], &["PAN"]);
        assert_eq!(agg.votes("PAN"), 0);
        assert_eq!(agg.total_votes, 0);
        assert_eq!(agg.total_nominal_roll, 0);
        assert_eq!(agg.get("PAN").unwrap().percentage_of_total, 0.0);
        assert_eq!(aggregate(&scenario(), &[]).results.len(), 0);
    }

    #[test]
    fn option_codes_and_cast_votes() {
        let mut data = scenario();
        data.push(VoteRecord::new("3").with_votes("NULOS", 7));
        assert_eq!(all_option_codes(&data), vec!["MORENA", "NULOS", "PAN"]);
        assert_eq!(total_votes_cast(&data), 357);
    }

    fn arb_records() -> impl Strategy<Value = Vec<VoteRecord>> {
        prop::collection::vec(
            (0u64..500, 0u64..500, 0u64..500, 0u64..2000),
            0..12,
        )
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (a, b, c, roll))| {
                    VoteRecord::new(&i.to_string())
                        .with_nominal_roll(roll)
                        .with_votes("PAN", a)
                        .with_votes("PRI", b)
                        .with_votes("MORENA", c)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn coalition_is_sum_of_members(records in arb_records()) {
            let coalition = ReportingUnit::from_coalition(
                &Coalition::new("PAN-PRI", &["PAN", "PRI"], "#000000"));
            let with = aggregate(&records, &[coalition]);
            let alone = aggregate_codes(&records, &["PAN", "PRI"]);
            prop_assert_eq!(with.votes("PAN-PRI"), alone.votes("PAN") + alone.votes("PRI"));
        }

        #[test]
        fn percentages_are_bounded_and_sum_to_100(records in arb_records()) {
            let agg = aggregate_codes(&records, &["PAN", "PRI", "MORENA"]);
            let mut sum = 0.0;
            for r in agg.results.values() {
                prop_assert!(r.percentage_of_total >= 0.0 && r.percentage_of_total <= 100.0);
                sum += r.percentage_of_total;
            }
            if agg.total_votes > 0 {
                prop_assert!((sum - 100.0).abs() < 1e-6);
            } else {
                prop_assert_eq!(sum, 0.0);
            }
        }

        #[test]
        fn aggregation_is_idempotent(records in arb_records()) {
            let a = aggregate_codes(&records, &["PAN", "MORENA"]);
            let b = aggregate_codes(&records, &["PAN", "MORENA"]);
            prop_assert_eq!(a, b);
        }
    }
}
