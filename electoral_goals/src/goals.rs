use log::{debug, info};

use crate::aggregate::total_votes_cast;
use crate::config::*;
use crate::rank::rank_sections;
use crate::share_percent;

// Targets are read with this many decimals, which keeps the ceiling exact in integers.
const PERCENT_SCALE: u128 = 1_000_000;

/// Ceiling of `basis × percentage / 100`.
///
/// Computed in integers on the percentage rounded to a millionth of a point, so that
/// 7% of 300 requires 21 votes and 82.4% of 10 485 875 requires 8 640 361.
pub fn required_votes(basis_value: u64, target_percentage: f64) -> u64 {
    let scaled_pct = (target_percentage * PERCENT_SCALE as f64).round().max(0.0) as u128;
    let numerator = basis_value as u128 * scaled_pct;
    let denominator = 100 * PERCENT_SCALE;
    let res = (numerator + denominator - 1) / denominator;
    u64::try_from(res).unwrap_or(u64::MAX)
}

fn basis_for(params: &GoalParams, coalition_votes: u64, total_votes: u64) -> u64 {
    match params.basis_mode() {
        BasisMode::CoalitionRelative => coalition_votes,
        BasisMode::TotalRelative => total_votes,
    }
}

fn signed_difference(current: u64, required: u64) -> i64 {
    current as i64 - required as i64
}

/// How far a coalition is from its goal over a set of records.
pub fn compute_goal(records: &[VoteRecord], unit: &ReportingUnit, params: &GoalParams) -> GoalSpec {
    let coalition_votes: u64 = records.iter().map(|r| unit.votes_in(r)).sum();
    let total_votes = total_votes_cast(records);
    let basis_value = basis_for(params, coalition_votes, total_votes);
    let required = required_votes(basis_value, params.target_percentage());
    let difference = signed_difference(coalition_votes, required);
    debug!(
        "compute_goal: {}: basis {} ({}), required {}, current {}, difference {}",
        unit.code,
        basis_value,
        params.basis_mode().label(),
        required,
        coalition_votes,
        difference
    );
    GoalSpec {
        coalition: unit.code.clone(),
        target_percentage: params.target_percentage(),
        basis_mode: params.basis_mode(),
        basis_value,
        coalition_votes,
        total_votes,
        required_votes: required,
        current_votes: coalition_votes,
        difference,
        coalition_share_percent: share_percent(coalition_votes, total_votes),
    }
}

fn section_status(total_votes: u64, coalition_votes: u64, required: u64, difference: i64) -> SectionStatus {
    if total_votes == 0 {
        SectionStatus::NoVotes
    } else if difference >= 0 {
        SectionStatus::Reached
    } else if coalition_votes as f64 >= 0.9 * required as f64 {
        SectionStatus::Close
    } else {
        SectionStatus::Far
    }
}

fn section_priority(status: SectionStatus, coalition_votes: u64, required: u64) -> PriorityLevel {
    // Reached sections are always Low, even when their share is near the target: only
    // unreached sections need work.
    match status {
        SectionStatus::Close => PriorityLevel::High,
        SectionStatus::Far if coalition_votes as f64 >= 0.7 * required as f64 => {
            PriorityLevel::Medium
        }
        _ => PriorityLevel::Low,
    }
}

/// Every section with its own requirement, weakest share first.
///
/// Each section uses its own basis: the coalition's votes in the section, or all the
/// votes cast in the section. Sections with the same share keep their input order.
pub fn prioritize_sections(
    records: &[VoteRecord],
    unit: &ReportingUnit,
    params: &GoalParams,
) -> Vec<SectionPriority> {
    let mut res: Vec<SectionPriority> = records
        .iter()
        .map(|r| {
            let coalition_votes = unit.votes_in(r);
            let total_votes = r.total_votes();
            let required = required_votes(
                basis_for(params, coalition_votes, total_votes),
                params.target_percentage(),
            );
            let difference = signed_difference(coalition_votes, required);
            let status = section_status(total_votes, coalition_votes, required, difference);
            SectionPriority {
                section: r.section.clone(),
                municipality: r.municipality.clone(),
                local_district: r.local_district.clone(),
                coalition_votes,
                total_votes,
                coalition_share_percent: share_percent(coalition_votes, total_votes),
                required_votes: required,
                difference,
                status,
                priority: section_priority(status, coalition_votes, required),
            }
        })
        .collect();
    // sort_by is stable.
    res.sort_by(|a, b| {
        a.coalition_share_percent
            .total_cmp(&b.coalition_share_percent)
    });
    res
}

/// The goal, the per-section worklist and a summary of both.
pub fn track_goal(records: &[VoteRecord], unit: &ReportingUnit, params: &GoalParams) -> GoalReport {
    let goal = compute_goal(records, unit, params);
    let sections = prioritize_sections(records, unit, params);
    let sections_without_votes = sections
        .iter()
        .filter(|s| s.status == SectionStatus::NoVotes)
        .count();
    let sections_with_votes = sections.len() - sections_without_votes;
    let sections_reached = sections
        .iter()
        .filter(|s| s.status == SectionStatus::Reached)
        .count();
    let sections_close = sections
        .iter()
        .filter(|s| s.status == SectionStatus::Close)
        .count();
    let additional_votes_needed: u64 = sections
        .iter()
        .map(|s| if s.difference < 0 { s.difference.unsigned_abs() } else { 0 })
        .sum();
    let summary = GoalSummary {
        total_sections: sections_with_votes,
        sections_without_votes,
        sections_reached,
        sections_close,
        success_rate_percent: share_percent(sections_reached as u64, sections_with_votes as u64),
        additional_votes_needed,
    };
    info!(
        "Goal for {}: {} of {} sections reached, {} close, {} votes missing",
        unit.code, sections_reached, summary.total_sections, sections_close, additional_votes_needed
    );
    GoalReport {
        goal,
        sections,
        summary,
    }
}

fn target_status(progress_percent: f64) -> TargetStatus {
    if progress_percent >= 100.0 {
        TargetStatus::Achieved
    } else if progress_percent >= 75.0 {
        TargetStatus::OnTrack
    } else {
        TargetStatus::Behind
    }
}

/// Progress of one unit toward a vote, percentage or section-count target.
///
/// Sections are counted as won against the other `units`.
pub fn evaluate_target(records: &[VoteRecord], units: &[ReportingUnit], target: &Target) -> TargetProgress {
    let unit = &target.unit;
    let votes: u64 = records.iter().map(|r| unit.votes_in(r)).sum();
    let (current, goal) = match target.kind {
        TargetKind::Votes(v) => (votes as f64, v as f64),
        TargetKind::Percentage(p) => (share_percent(votes, total_votes_cast(records)), p),
        TargetKind::Sections(n) => {
            let mut contenders: Vec<ReportingUnit> = units.to_vec();
            if !contenders.iter().any(|u| u.code == unit.code) {
                contenders.push(unit.clone());
            }
            let won = rank_sections(records, &contenders)
                .iter()
                .filter(|sr| {
                    sr.ranking
                        .winner
                        .as_ref()
                        .map(|w| w.code == unit.code)
                        .unwrap_or(false)
                })
                .count();
            (won as f64, n as f64)
        }
    };
    let progress_percent = if goal <= 0.0 {
        100.0
    } else {
        (current / goal * 100.0).min(100.0)
    };
    TargetProgress {
        unit: unit.code.clone(),
        description: target.description.clone(),
        kind: target.kind.clone(),
        current,
        target: goal,
        progress_percent,
        status: target_status(progress_percent),
    }
}
