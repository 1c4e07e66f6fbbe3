mod config;
use log::{debug, info};

use std::{
    collections::BTreeSet,
    ops::{Add, AddAssign},
};

pub use crate::config::*;

pub mod aggregate;
pub mod builder;
pub mod filter;
pub mod goals;
pub mod manual;
pub mod participation;
pub mod rank;

pub use crate::aggregate::{aggregate, aggregate_codes, all_option_codes, total_votes_cast};
pub use crate::filter::{cascading_options, distinct_values, filter_records, group_by};
pub use crate::goals::{compute_goal, evaluate_target, prioritize_sections, track_goal};
pub use crate::participation::{overall_participation, participation, participation_by};
pub use crate::rank::{municipality_wins, rank, rank_sections, unit_performance, win_counts};

// **** Private structures ****

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
pub(crate) struct VoteCount(pub(crate) u64);

impl VoteCount {
    pub(crate) const EMPTY: VoteCount = VoteCount(0);
}

impl std::iter::Sum for VoteCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        VoteCount(iter.map(|vc| vc.0).sum())
    }
}

impl AddAssign for VoteCount {
    fn add_assign(&mut self, rhs: VoteCount) {
        self.0 += rhs.0;
    }
}

impl Add for VoteCount {
    type Output = VoteCount;
    fn add(self: VoteCount, rhs: VoteCount) -> VoteCount {
        VoteCount(self.0 + rhs.0)
    }
}

/// `part` as a percentage of `total`, zero when the total is zero.
pub(crate) fn share_percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

/// The units ranked when the request does not name any: every party of the registry,
/// then every other option code present in the data.
pub fn default_units(records: &[VoteRecord], registry: &Registry) -> Vec<ReportingUnit> {
    let mut units = registry.party_units();
    let known: BTreeSet<String> = units.iter().map(|u| u.code.clone()).collect();
    for code in all_option_codes(records) {
        if !known.contains(&code) {
            units.push(ReportingUnit::party(&code));
        }
    }
    units
}

/// Runs a full analysis of a record set.
///
/// Arguments:
/// * `records` the validated records of the election
/// * `registry` the parties and coalitions of this election
/// * `request` the geographic filter, the units to rank and the optional goal and targets
///
/// The records are filtered once, and every figure of the report is computed from the
/// filtered set. The call has no side effect: the same inputs give the same report.
pub fn analyze(records: &[VoteRecord], registry: &Registry, request: &ReportRequest) -> ElectionReport {
    info!(
        "Analyzing {:?} records, filter: {:?}",
        records.len(),
        request.filter
    );
    let selected = filter_records(records, &request.filter);
    let units: Vec<ReportingUnit> = match &request.units {
        Some(u) => u.clone(),
        None => default_units(&selected, registry),
    };
    debug!(
        "analyze: {} records selected, ranking {:?}",
        selected.len(),
        units.iter().map(|u| u.code.as_str()).collect::<Vec<_>>()
    );

    let aggregation = aggregate(&selected, &units);
    let ranking = rank(&aggregation);
    if let Some(w) = &ranking.winner {
        info!(
            "Leader: {} with {} votes ({:.2}%), {}",
            w.code,
            w.votes,
            w.percentage_of_total,
            ranking.competitiveness.label()
        );
    }
    let overall = overall_participation(&selected);
    let goal = request
        .goal
        .as_ref()
        .map(|g| track_goal(&selected, &g.coalition, &g.params));
    // The goal coalition competes against the ranked units, even when it is not one of them.
    let (goal_performance, goal_municipality_wins) = match &request.goal {
        Some(g) => {
            let mut contenders = units.clone();
            if !contenders.iter().any(|u| u.code == g.coalition.code) {
                contenders.push(g.coalition.clone());
            }
            (
                Some(unit_performance(&selected, &contenders, &g.coalition.code)),
                municipality_wins(&selected, &contenders, &g.coalition.code),
            )
        }
        None => (None, Vec::new()),
    };
    let targets: Vec<TargetProgress> = request
        .targets
        .iter()
        .map(|t| evaluate_target(&selected, &units, t))
        .collect();

    ElectionReport {
        filter: request.filter.clone(),
        record_count: selected.len(),
        total_votes: overall.total_votes,
        total_nominal_roll: overall.total_nominal_roll,
        participation_percent: overall.participation_percent,
        ranking,
        section_rankings: rank_sections(&selected, &units),
        win_counts: win_counts(&selected, &units),
        participation_by_municipality: participation_by(&selected, GeoField::Municipality),
        goal,
        goal_performance,
        goal_municipality_wins,
        targets,
    }
}
