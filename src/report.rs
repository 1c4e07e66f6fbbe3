mod config_reader;
mod export_csv;
mod io_common;
mod io_csv;
mod io_excel;

use log::{debug, info, warn};

use electoral_goals::builder::{Dataset, RawRecord, RecordBuilder};
use electoral_goals::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::report::config_reader::*;
use crate::report::io_common::SectionLookup;

#[derive(Debug, Snafu)]
pub enum ReportError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The workbook {path} has no worksheet to read"))]
    EmptyExcel { path: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading CSV line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Error writing CSV file {path}"))]
    CsvWrite { source: csv::Error, path: String },
    #[snafu(display("Error writing file {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Column {column} could not be found in {path}"))]
    MissingColumn { column: String, path: String },
    #[snafu(display("The summary differs from the reference {path}"))]
    ReferenceMismatch { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type ReportResult<T> = Result<T, ReportError>;

fn read_source_records(root_path: &Path, src: &RecordSource) -> ReportResult<Vec<RawRecord>> {
    let p: PathBuf = root_path.join(&src.file_path);
    let path = p.as_path().display().to_string();
    info!("Attempting to read results file {:?}", path);
    match src.provider.as_str() {
        "csv" | "" => io_csv::read_csv_records(&path, src),
        "xlsx" | "excel" => io_excel::read_excel_records(&path, src),
        x => whatever!("Provider not implemented {:?}", x),
    }
}

fn build_dataset(
    root_path: &Path,
    sources: &[RecordSource],
    lookup: Option<&SectionLookup>,
) -> ReportResult<Dataset> {
    let mut builder = RecordBuilder::new();
    for src in sources {
        let raws = read_source_records(root_path, src)?;
        info!("Read {} rows from {}", raws.len(), src.file_path);
        for mut raw in raws {
            if let Some(l) = lookup {
                l.enrich(&mut raw);
            }
            if let Err(e) = builder.add_raw(&raw) {
                debug!("build_dataset: {}: {}", src.file_path, e);
            }
        }
    }
    let dataset = builder.build();
    if !dataset.rejected.is_empty() {
        warn!("{} rows were rejected", dataset.rejected.len());
    }
    Ok(dataset)
}

fn validate_registry(config: &EgConfig) -> ReportResult<Registry> {
    let parties: Vec<Party> = config
        .parties
        .iter()
        .map(|p| {
            Party::new(
                p.code.trim(),
                p.name.as_deref().unwrap_or(p.code.as_str()),
                p.color.as_deref().unwrap_or(DEFAULT_COLOR),
            )
        })
        .collect();
    let mut registry = Registry::new(parties);
    for c in config.coalitions.iter() {
        let members: Vec<&str> = c.parties.iter().map(|s| s.as_str()).collect();
        if members.is_empty() {
            whatever!("Coalition {:?} has no member", c.name);
        }
        for m in members.iter() {
            if registry.party(m).is_none() {
                warn!(
                    "Coalition {:?}: {:?} is not a declared party, it will be read as an option column",
                    c.name, m
                );
            }
        }
        let coalition = Coalition::new(
            &c.name,
            &members,
            c.color.as_deref().unwrap_or(DEFAULT_COLOR),
        );
        registry = registry
            .with_coalition(coalition)
            .with_whatever_context(|e| format!("Invalid coalition: {}", e))?;
    }
    Ok(registry)
}

fn validate_basis(basis: &str) -> ReportResult<BasisMode> {
    match basis.trim().to_lowercase().as_str() {
        "coalition" | "coalitionrelative" => Ok(BasisMode::CoalitionRelative),
        "total" | "totalrelative" => Ok(BasisMode::TotalRelative),
        x => whatever!("Cannot use basis {:?}: expected 'coalition' or 'total'", x),
    }
}

fn validate_goal(goal: &GoalConfig, registry: &Registry) -> ReportResult<GoalRequest> {
    let coalition = match registry.resolve(&goal.coalition) {
        Some(u) => u,
        None => whatever!(
            "Goal: {:?} is neither a coalition nor a party",
            goal.coalition
        ),
    };
    let basis = validate_basis(goal.basis.as_deref().unwrap_or("total"))?;
    let params = GoalParams::new(goal.target_percentage, basis)
        .with_whatever_context(|e| format!("Invalid goal: {}", e))?;
    Ok(GoalRequest { coalition, params })
}

fn validate_target(target: &TargetConfig, registry: &Registry) -> ReportResult<Target> {
    let kind = match target.kind.as_str() {
        "votes" if target.value >= 0.0 => TargetKind::Votes(target.value.round() as u64),
        "percentage" if (0.0..=100.0).contains(&target.value) => {
            TargetKind::Percentage(target.value)
        }
        "sections" if target.value >= 0.0 => TargetKind::Sections(target.value.round() as u32),
        x => whatever!(
            "Cannot use target {:?} with value {}: expected votes, percentage or sections",
            x,
            target.value
        ),
    };
    Ok(Target {
        unit: registry.resolve_or_column(&target.unit),
        kind,
        description: target
            .description
            .clone()
            .unwrap_or_else(|| format!("{} {}", target.unit, target.kind)),
    })
}

fn merge_filter(config: &FilterConfig, args: &Args) -> GeoFilter {
    GeoFilter {
        municipality: args.municipality.clone().or_else(|| config.municipality.clone()),
        local_district: args
            .local_district
            .clone()
            .or_else(|| config.local_district.clone()),
        federal_district: args
            .federal_district
            .clone()
            .or_else(|| config.federal_district.clone()),
        section: args.section.clone().or_else(|| config.section.clone()),
    }
}

/// The goal from the command line wins over the one of the configuration.
fn merge_goal(config: &Option<GoalConfig>, args: &Args) -> ReportResult<Option<GoalConfig>> {
    match (&args.coalition, args.target, config) {
        (None, None, c) => Ok(c.clone().map(|g| GoalConfig {
            basis: args.basis.clone().or(g.basis),
            ..g
        })),
        (Some(coalition), Some(target), _) => Ok(Some(GoalConfig {
            coalition: coalition.clone(),
            target_percentage: target,
            basis: args.basis.clone(),
        })),
        (Some(coalition), None, Some(c)) => Ok(Some(GoalConfig {
            coalition: coalition.clone(),
            basis: args.basis.clone().or_else(|| c.basis.clone()),
            ..c.clone()
        })),
        (None, Some(target), Some(c)) => Ok(Some(GoalConfig {
            target_percentage: target,
            basis: args.basis.clone().or_else(|| c.basis.clone()),
            ..c.clone()
        })),
        (c, t, None) => whatever!(
            "A goal needs both a coalition and a target (coalition: {:?}, target: {:?})",
            c,
            t
        ),
    }
}

fn pct(x: f64) -> JSValue {
    json!((x * 100.0).round() / 100.0)
}

fn result_to_json(r: &AggregationResult, registry: &Registry) -> JSValue {
    json!({
        "code": r.code,
        "name": registry.display_name_of(&r.code),
        "color": registry.color_of(&r.code),
        "votes": r.votes,
        "percentage": pct(r.percentage_of_total),
    })
}

fn ranking_to_json(ranking: &Ranking, registry: &Registry) -> JSValue {
    let entries: Vec<JSValue> = ranking
        .entries
        .iter()
        .map(|r| result_to_json(r, registry))
        .collect();
    json!({
        "totalVotes": ranking.total_votes,
        "winner": ranking.winner.as_ref().map(|w| w.code.clone()),
        "runnerUp": ranking.runner_up.as_ref().map(|w| w.code.clone()),
        "margin": pct(ranking.margin_percentage_points),
        "competitiveness": ranking.competitiveness.label(),
        "results": entries,
    })
}

fn filter_to_json(filter: &GeoFilter) -> JSValue {
    let mut m: JSMap<String, JSValue> = JSMap::new();
    for (field, value) in filter.active_criteria() {
        m.insert(field.label().to_string(), json!(value));
    }
    JSValue::Object(m)
}

fn goal_to_json(g: &GoalReport) -> JSValue {
    let sections: Vec<JSValue> = g
        .sections
        .iter()
        .map(|s| {
            json!({
                "section": s.section,
                "municipality": s.municipality,
                "coalitionVotes": s.coalition_votes,
                "totalVotes": s.total_votes,
                "share": pct(s.coalition_share_percent),
                "requiredVotes": s.required_votes,
                "difference": s.difference,
                "status": s.status.label(),
                "priority": s.priority.label(),
            })
        })
        .collect();
    json!({
        "coalition": g.goal.coalition,
        "targetPercentage": g.goal.target_percentage,
        "basis": g.goal.basis_mode.label(),
        "basisValue": g.goal.basis_value,
        "requiredVotes": g.goal.required_votes,
        "currentVotes": g.goal.current_votes,
        "difference": g.goal.difference,
        "summary": {
            "sections": g.summary.total_sections,
            "withoutVotes": g.summary.sections_without_votes,
            "reached": g.summary.sections_reached,
            "close": g.summary.sections_close,
            "successRate": pct(g.summary.success_rate_percent),
            "additionalVotesNeeded": g.summary.additional_votes_needed,
        },
        "sections": sections,
    })
}

fn performance_to_json(p: &UnitPerformance, municipalities: &[MunicipalityWins]) -> JSValue {
    let by_municipality: Vec<JSValue> = municipalities
        .iter()
        .map(|m| {
            json!({
                "municipality": m.municipality,
                "sections": m.total_sections,
                "won": m.sections_won,
                "winRate": pct(m.win_percentage),
                "votes": m.votes,
            })
        })
        .collect();
    json!({
        "sectionsWon": p.sections_won,
        "sectionsLost": p.sections_lost,
        "winRate": pct(p.win_percentage),
        "voteShare": pct(p.vote_share_percent),
        "avgVictoryMargin": pct(p.avg_victory_margin),
        "avgDefeatMargin": pct(p.avg_defeat_margin),
        "municipalities": by_municipality,
    })
}

fn target_to_json(t: &TargetProgress) -> JSValue {
    let kind = match t.kind {
        TargetKind::Votes(_) => "votes",
        TargetKind::Percentage(_) => "percentage",
        TargetKind::Sections(_) => "sections",
    };
    json!({
        "unit": t.unit,
        "description": t.description,
        "kind": kind,
        "current": pct(t.current),
        "target": pct(t.target),
        "progress": pct(t.progress_percent),
        "status": t.status.label(),
    })
}

fn build_summary_js(
    settings: &OutputSettings,
    registry: &Registry,
    dataset: &Dataset,
    report: &ElectionReport,
) -> JSValue {
    let section_winners: Vec<JSValue> = report
        .section_rankings
        .iter()
        .map(|sr| {
            json!({
                "section": sr.section,
                "municipality": sr.municipality,
                "winner": sr.ranking.winner.as_ref().map(|w| w.code.clone()),
                "margin": pct(sr.ranking.margin_percentage_points),
                "competitiveness": sr.ranking.competitiveness.label(),
            })
        })
        .collect();
    let participation: Vec<JSValue> = report
        .participation_by_municipality
        .iter()
        .map(|p| {
            json!({
                "municipality": p.key,
                "sections": p.section_count,
                "totalVotes": p.total_votes,
                "nominalRoll": p.total_nominal_roll,
                "participation": pct(p.participation_percent),
            })
        })
        .collect();
    let rejected: Vec<JSValue> = dataset
        .rejected
        .iter()
        .map(|r| json!({"row": r.row, "reason": r.reason.to_string()}))
        .collect();
    let mut res = json!({
        "config": {
            "report": settings.report_name,
            "date": settings.election_date,
            "jurisdiction": settings.jurisdiction,
        },
        "filter": filter_to_json(&report.filter),
        "sections": report.record_count,
        "totalVotes": report.total_votes,
        "nominalRoll": report.total_nominal_roll,
        "participation": pct(report.participation_percent),
        "ranking": ranking_to_json(&report.ranking, registry),
        "winsBySection": report.win_counts,
        "sectionWinners": section_winners,
        "participationByMunicipality": participation,
        "rejectedRows": rejected,
    });
    if let Some(g) = &report.goal {
        res["goal"] = goal_to_json(g);
        if let Some(p) = &report.goal_performance {
            res["goal"]["performance"] = performance_to_json(p, &report.goal_municipality_wins);
        }
    }
    if !report.targets.is_empty() {
        let targets: Vec<JSValue> = report.targets.iter().map(target_to_json).collect();
        res["targets"] = JSValue::Array(targets);
    }
    res
}

fn write_output(out: &str, contents: &str) -> ReportResult<()> {
    if out == "stdout" {
        println!("{}", contents);
        Ok(())
    } else {
        info!("Writing summary to {}", out);
        fs::write(out, contents).context(WritingOutputSnafu { path: out })
    }
}

fn output_location(args: &Args, settings: &OutputSettings) -> String {
    match (&args.out, &settings.output_directory) {
        (Some(out), _) => out.clone(),
        (None, Some(dir)) => Path::new(dir)
            .join(format!("{}_summary.json", settings.report_name))
            .display()
            .to_string(),
        (None, None) => "stdout".to_string(),
    }
}

fn check_reference(reference_path: &str, pretty_js_stats: &str) -> ReportResult<()> {
    let summary_ref = read_summary(reference_path)?;
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference string");
        print_diff(pretty_js_summary_ref.as_str(), pretty_js_stats, "\n");
        return ReferenceMismatchSnafu {
            path: reference_path,
        }
        .fail();
    }
    info!("The summary matches the reference {}", reference_path);
    Ok(())
}

/// Runs one analysis from the command line arguments.
pub fn run_report(args: &Args) -> ReportResult<()> {
    let (config, root_path) = match &args.config {
        Some(path) => {
            let config = read_config(path)?;
            let root = Path::new(path)
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_default();
            (config, root)
        }
        None => {
            info!("No configuration provided, using the built-in catalog");
            (default_config(), PathBuf::new())
        }
    };
    debug!("run_report: config: {:?}", config);

    let sources: Vec<RecordSource> = match &args.input {
        Some(input) => {
            let mut src = config.record_sources.first().cloned().unwrap_or_default();
            src.file_path = input.clone();
            src.provider = args
                .input_type
                .clone()
                .unwrap_or_else(|| guess_provider(input));
            if args.excel_worksheet_name.is_some() {
                src.excel_worksheet_name = args.excel_worksheet_name.clone();
            }
            if src.municipality_names.is_none() {
                src.municipality_names = default_config()
                    .record_sources
                    .first()
                    .and_then(|s| s.municipality_names.clone());
            }
            vec![src]
        }
        None => config.record_sources.clone(),
    };
    if sources.is_empty() {
        whatever!("No record source: use --input or the recordSources block of the configuration");
    }

    let lookup = match &config.section_lookup {
        Some(sl) => Some(io_common::read_section_lookup(&root_path, sl)?),
        None => None,
    };
    // Paths given on the command line are relative to the working directory.
    let data_root = if args.input.is_some() {
        PathBuf::new()
    } else {
        root_path.clone()
    };
    let dataset = build_dataset(&data_root, &sources, lookup.as_ref())?;
    info!(
        "Dataset: {} sections, {} rejected rows",
        dataset.records.len(),
        dataset.rejected.len()
    );

    let registry = validate_registry(&config)?;
    let goal = match merge_goal(&config.goal, args)? {
        Some(g) => Some(validate_goal(&g, &registry)?),
        None => None,
    };
    let mut targets: Vec<Target> = Vec::new();
    for t in config.targets.iter() {
        targets.push(validate_target(t, &registry)?);
    }
    let units: Option<Vec<ReportingUnit>> = config
        .units
        .as_ref()
        .map(|codes| codes.iter().map(|c| registry.resolve_or_column(c)).collect());
    let request = ReportRequest {
        filter: merge_filter(&config.filters.clone().unwrap_or_default(), args),
        units,
        goal,
        targets,
    };

    let report = analyze(&dataset.records, &registry, &request);
    let settings = config.output_settings.clone().unwrap_or_default();
    let result_js = build_summary_js(&settings, &registry, &dataset, &report);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    write_output(&output_location(args, &settings), &pretty_js_stats)?;

    if let Some(worklist) = &args.worklist {
        match &report.goal {
            Some(g) => export_csv::write_worklist(worklist, &g.sections)?,
            None => whatever!("A worklist needs a goal: use --coalition and --target"),
        }
    }

    // The reference summary, if provided for comparison
    if let Some(reference) = &args.reference {
        check_reference(reference, &pretty_js_stats)?;
    }
    Ok(())
}

fn guess_provider(path: &str) -> String {
    let lower = path.to_lowercase();
    if lower.ends_with(".xlsx") || lower.ends_with(".xlsm") {
        "xlsx".to_string()
    } else {
        "csv".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn test_wrapper(name: &str) {
        let _ = env_logger::builder().is_test(true).try_init();
        let base = format!("{}/testdata/{}", env!("CARGO_MANIFEST_DIR"), name);
        let config = format!("{}/config.json", base);
        let reference = format!("{}/expected_summary.json", base);
        let args = Args::parse_from([
            "egtrack",
            "--config",
            config.as_str(),
            "--reference",
            reference.as_str(),
            "--out",
            "stdout",
        ]);
        let res = run_report(&args);
        if let Err(se) = res {
            panic!("test {} failed: {}", name, se);
        }
    }

    fn args(extra: &[&str]) -> Args {
        let mut v = vec!["egtrack"];
        v.extend_from_slice(extra);
        Args::parse_from(v)
    }

    #[test]
    fn basis_names() {
        assert_eq!(validate_basis("Total").unwrap(), BasisMode::TotalRelative);
        assert_eq!(
            validate_basis("coalition").unwrap(),
            BasisMode::CoalitionRelative
        );
        assert!(validate_basis("everything").is_err());
    }

    #[test]
    fn default_registry_has_presets() {
        let registry = validate_registry(&default_config()).unwrap();
        assert_eq!(registry.parties().len(), 7);
        let c = registry.resolve("juntos haremos historia").unwrap();
        assert_eq!(c.members, vec!["MORENA", "PT", "PVEM"]);
        assert_eq!(registry.color_of("PAN"), Some("#0066CC"));
    }

    #[test]
    fn goal_from_the_command_line() {
        let registry = validate_registry(&default_config()).unwrap();
        let a = args(&["--coalition", "MC", "--target", "40", "--basis", "coalition"]);
        let g = merge_goal(&None, &a).unwrap().unwrap();
        let req = validate_goal(&g, &registry).unwrap();
        assert_eq!(req.coalition, ReportingUnit::party("MC"));
        assert_eq!(req.params.basis_mode(), BasisMode::CoalitionRelative);

        let incomplete = args(&["--coalition", "MC"]);
        assert!(merge_goal(&None, &incomplete).is_err());

        let bad = args(&["--coalition", "MC", "--target", "120"]);
        let g = merge_goal(&None, &bad).unwrap().unwrap();
        assert!(validate_goal(&g, &registry).is_err());

        let unknown = args(&["--coalition", "Nobody", "--target", "50"]);
        let g = merge_goal(&None, &unknown).unwrap().unwrap();
        assert!(validate_goal(&g, &registry).is_err());
    }

    #[test]
    fn goal_merges_with_the_configuration() {
        let config = Some(GoalConfig {
            coalition: "Va por México".to_string(),
            target_percentage: 45.0,
            basis: Some("total".to_string()),
        });
        let g = merge_goal(&config, &args(&["--target", "30"]))
            .unwrap()
            .unwrap();
        assert_eq!(g.coalition, "Va por México");
        assert_eq!(g.target_percentage, 30.0);
        let g = merge_goal(&config, &args(&[])).unwrap().unwrap();
        assert_eq!(g.target_percentage, 45.0);
    }

    #[test]
    fn filter_arguments_override_configuration() {
        let config = FilterConfig {
            municipality: Some("La Paz".to_string()),
            local_district: Some("3".to_string()),
            federal_district: None,
            section: None,
        };
        let f = merge_filter(&config, &args(&["--municipality", "Loreto"]));
        assert_eq!(f.municipality.as_deref(), Some("Loreto"));
        assert_eq!(f.local_district.as_deref(), Some("3"));
        assert_eq!(f.section, None);
    }

    #[test]
    fn targets_are_validated() {
        let registry = validate_registry(&default_config()).unwrap();
        let t = TargetConfig {
            unit: "Va por México".to_string(),
            kind: "sections".to_string(),
            value: 12.0,
            description: None,
        };
        let target = validate_target(&t, &registry).unwrap();
        assert_eq!(target.kind, TargetKind::Sections(12));
        assert_eq!(target.unit.members, vec!["PAN", "PRI", "PRD"]);
        let bad = TargetConfig {
            kind: "percentage".to_string(),
            value: 140.0,
            ..t
        };
        assert!(validate_target(&bad, &registry).is_err());
    }

    #[test]
    fn coalition_names_must_be_unique() {
        let mut config = default_config();
        config.coalitions.push(CoalitionConfig {
            name: "MC".to_string(),
            parties: vec!["MC".to_string()],
            color: None,
        });
        assert!(validate_registry(&config).is_err());
    }

    #[test]
    fn summary_rounds_percentages() {
        assert_eq!(pct(57.142857), json!(57.14));
        assert_eq!(pct(0.0), json!(0.0));
    }

    #[test]
    fn providers_from_extensions() {
        assert_eq!(guess_provider("results.XLSX"), "xlsx");
        assert_eq!(guess_provider("results.csv"), "csv");
    }

    #[test]
    fn test_bcs_2021() {
        test_wrapper("bcs_2021");
    }
}
