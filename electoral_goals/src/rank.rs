use std::collections::BTreeMap;

use log::debug;

use crate::aggregate::aggregate;
use crate::config::*;
use crate::filter::group_by;
use crate::share_percent;

/// Orders the results of an aggregation and finds the winner.
///
/// Entries are sorted by decreasing votes, ties by code, so the ordering does not depend
/// on how the aggregation was requested. Units without any vote can't win: when nobody
/// received votes there is no winner, and the margin is zero without a runner-up.
pub fn rank(aggregation: &Aggregation) -> Ranking {
    let mut entries: Vec<AggregationResult> = aggregation.results.values().cloned().collect();
    entries.sort_by(|a, b| b.votes.cmp(&a.votes).then_with(|| a.code.cmp(&b.code)));

    let winner = entries.first().filter(|e| e.votes > 0).cloned();
    let runner_up = entries.get(1).filter(|e| e.votes > 0).cloned();
    let margin_percentage_points = match (&winner, &runner_up) {
        (Some(w), Some(r)) => w.percentage_of_total - r.percentage_of_total,
        _ => 0.0,
    };
    Ranking {
        entries,
        winner,
        runner_up,
        margin_percentage_points,
        competitiveness: Competitiveness::from_margin(margin_percentage_points),
        total_votes: aggregation.total_votes,
    }
}

/// The ranking of every section on its own, in record order.
pub fn rank_sections(records: &[VoteRecord], units: &[ReportingUnit]) -> Vec<SectionRanking> {
    records
        .iter()
        .map(|r| SectionRanking {
            section: r.section.clone(),
            municipality: r.municipality.clone(),
            ranking: rank(&aggregate(std::slice::from_ref(r), units)),
        })
        .collect()
}

/// Number of sections won by each unit. Units that won nothing are listed with zero.
pub fn win_counts(records: &[VoteRecord], units: &[ReportingUnit]) -> BTreeMap<String, u32> {
    let mut counts: BTreeMap<String, u32> = units.iter().map(|u| (u.code.clone(), 0)).collect();
    for sr in rank_sections(records, units) {
        if let Some(w) = sr.ranking.winner {
            *counts.entry(w.code).or_insert(0) += 1;
        }
    }
    counts
}

fn winner_code(sr: &SectionRanking) -> Option<&str> {
    sr.ranking.winner.as_ref().map(|w| w.code.as_str())
}

fn unit_for<'a>(units: &'a [ReportingUnit], code: &str) -> Option<&'a ReportingUnit> {
    units.iter().find(|u| u.code == code)
}

/// Sections won by one unit in every municipality, best municipalities first.
pub fn municipality_wins(
    records: &[VoteRecord],
    units: &[ReportingUnit],
    code: &str,
) -> Vec<MunicipalityWins> {
    let fallback = ReportingUnit::party(code);
    let unit = unit_for(units, code).unwrap_or(&fallback);
    let mut res: Vec<MunicipalityWins> = group_by(records, GeoField::Municipality)
        .into_iter()
        .map(|(municipality, group)| {
            let won = rank_sections(&group, units)
                .iter()
                .filter(|sr| winner_code(sr) == Some(code))
                .count() as u32;
            let total = group.len() as u32;
            MunicipalityWins {
                municipality,
                total_sections: total,
                sections_won: won,
                win_percentage: share_percent(won as u64, total as u64),
                votes: group.iter().map(|r| unit.votes_in(r)).sum(),
            }
        })
        .collect();
    res.sort_by(|a, b| {
        b.win_percentage
            .total_cmp(&a.win_percentage)
            .then_with(|| a.municipality.cmp(&b.municipality))
    });
    res
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Wins, losses and margins of one unit across the sections.
///
/// A section where nobody received votes is neither won nor lost.
pub fn unit_performance(
    records: &[VoteRecord],
    units: &[ReportingUnit],
    code: &str,
) -> UnitPerformance {
    let mut victory_margins: Vec<f64> = Vec::new();
    let mut defeat_margins: Vec<f64> = Vec::new();
    for sr in rank_sections(records, units) {
        let ranking = &sr.ranking;
        match &ranking.winner {
            Some(w) if w.code == code => victory_margins.push(ranking.margin_percentage_points),
            Some(w) => {
                let own = ranking
                    .entries
                    .iter()
                    .find(|e| e.code == code)
                    .map(|e| e.percentage_of_total)
                    .unwrap_or(0.0);
                defeat_margins.push(w.percentage_of_total - own);
            }
            None => {}
        }
    }
    let overall = aggregate(records, units);
    let result = overall.get(code);
    let total_sections = records.len() as u32;
    let won = victory_margins.len() as u32;
    debug!(
        "unit_performance: {}: won {} lost {} of {} sections",
        code,
        won,
        defeat_margins.len(),
        total_sections
    );
    UnitPerformance {
        code: code.to_string(),
        total_sections,
        sections_won: won,
        sections_lost: defeat_margins.len() as u32,
        win_percentage: share_percent(won as u64, total_sections as u64),
        votes: result.map(|r| r.votes).unwrap_or(0),
        total_votes: overall.total_votes,
        vote_share_percent: result.map(|r| r.percentage_of_total).unwrap_or(0.0),
        avg_victory_margin: mean(&victory_margins),
        avg_defeat_margin: mean(&defeat_margins),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_codes;

    fn scenario() -> Vec<VoteRecord> {
        vec![
            VoteRecord::new("1")
                .with_municipality("La Paz")
                .with_nominal_roll(300)
                .with_votes("PAN", 100)
                .with_votes("MORENA", 150),
            VoteRecord::new("2")
                .with_municipality("La Paz")
                .with_nominal_roll(150)
                .with_votes("PAN", 50)
                .with_votes("MORENA", 50),
        ]
    }

    fn parties(codes: &[&str]) -> Vec<ReportingUnit> {
        codes.iter().map(|c| ReportingUnit::party(c)).collect()
    }

    #[test]
    fn two_parties_two_sections() {
        let ranking = rank(&aggregate_codes(&scenario(), &["PAN", "MORENA"]));
        let w = ranking.winner.as_ref().unwrap();
        let r = ranking.runner_up.as_ref().unwrap();
        assert_eq!(w.code, "MORENA");
        assert_eq!(w.votes, 200);
        assert!((w.percentage_of_total - 57.142857).abs() < 1e-5);
        assert_eq!(r.code, "PAN");
        assert!((ranking.margin_percentage_points - 14.285714).abs() < 1e-5);
        assert_eq!(
            ranking.competitiveness,
            Competitiveness::ModeratelyCompetitive
        );
        assert_eq!(ranking.competitiveness.label(), "moderately competitive");
        assert_eq!(ranking.total_votes, 350);
    }

    #[test]
    fn ties_are_broken_by_code() {
        let data = vec![VoteRecord::new("1")
            .with_votes("PRI", 10)
            .with_votes("PAN", 10)
            .with_votes("MC", 3)];
        let ranking = rank(&aggregate_codes(&data, &["PRI", "MC", "PAN"]));
        let codes: Vec<&str> = ranking.entries.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["PAN", "PRI", "MC"]);
        assert_eq!(ranking.margin_percentage_points, 0.0);
        assert_eq!(ranking.competitiveness, Competitiveness::VeryCompetitive);
    }

    #[test]
    fn no_votes_no_winner() {
        let ranking = rank(&aggregate_codes(&[], &["PAN", "PRI"]));
        assert_eq!(ranking.winner, None);
        assert_eq!(ranking.runner_up, None);
        assert_eq!(ranking.margin_percentage_points, 0.0);
        assert_eq!(ranking.entries.len(), 2);
    }

    #[test]
    fn single_contender_has_no_runner_up() {
        let data = vec![VoteRecord::new("1").with_votes("PAN", 10)];
        let ranking = rank(&aggregate_codes(&data, &["PAN", "PRI"]));
        assert_eq!(ranking.winner.unwrap().code, "PAN");
        assert_eq!(ranking.runner_up, None);
        assert_eq!(ranking.margin_percentage_points, 0.0);
    }

    #[test]
    fn competitiveness_thresholds() {
        assert_eq!(
            Competitiveness::from_margin(4.99),
            Competitiveness::VeryCompetitive
        );
        assert_eq!(Competitiveness::from_margin(5.0), Competitiveness::Competitive);
        assert_eq!(
            Competitiveness::from_margin(10.0),
            Competitiveness::ModeratelyCompetitive
        );
        assert_eq!(
            Competitiveness::from_margin(20.0),
            Competitiveness::NotCompetitive
        );
        assert_eq!(Competitiveness::NotCompetitive.label(), "not competitive");
    }

    #[test]
    fn per_section_rankings_and_wins() {
        let units = parties(&["PAN", "MORENA", "PRI"]);
        let sections = rank_sections(&scenario(), &units);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].ranking.winner.as_ref().unwrap().code, "MORENA");
        // 50 against 50: the tie goes to the first code.
        assert_eq!(sections[1].ranking.winner.as_ref().unwrap().code, "MORENA");
        assert_eq!(sections[1].ranking.margin_percentage_points, 0.0);
        let wins = win_counts(&scenario(), &units);
        assert_eq!(wins["MORENA"], 2);
        assert_eq!(wins["PAN"], 0);
        assert_eq!(wins["PRI"], 0);
    }

    #[test]
    fn municipality_rollup_is_sorted() {
        let mut data = scenario();
        data.push(
            VoteRecord::new("3")
                .with_municipality("Loreto")
                .with_votes("PAN", 9)
                .with_votes("MORENA", 1),
        );
        let units = parties(&["PAN", "MORENA"]);
        let rollup = municipality_wins(&data, &units, "PAN");
        assert_eq!(rollup[0].municipality, "Loreto");
        assert_eq!(rollup[0].win_percentage, 100.0);
        assert_eq!(rollup[1].municipality, "La Paz");
        assert_eq!(rollup[1].sections_won, 0);
        assert_eq!(rollup[1].total_sections, 2);
        assert_eq!(rollup[1].votes, 150);
    }

    #[test]
    fn performance_margins() {
        let data = vec![
            VoteRecord::new("1")
                .with_votes("PAN", 100)
                .with_votes("MORENA", 50),
            VoteRecord::new("2")
                .with_votes("PAN", 50)
                .with_votes("MORENA", 150),
            VoteRecord::new("3"),
        ];
        let units = parties(&["PAN", "MORENA"]);
        let perf = unit_performance(&data, &units, "PAN");
        assert_eq!(perf.total_sections, 3);
        assert_eq!(perf.sections_won, 1);
        assert_eq!(perf.sections_lost, 1);
        assert!((perf.win_percentage - 33.333333).abs() < 1e-5);
        assert_eq!(perf.votes, 150);
        assert_eq!(perf.total_votes, 350);
        assert!((perf.avg_victory_margin - 33.333333).abs() < 1e-5);
        assert!((perf.avg_defeat_margin - 50.0).abs() < 1e-9);
    }
}
