// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;

/// Label carried by a record when the source did not provide a geographic level.
pub const UNSPECIFIED: &str = "unspecified";

/// Filter value that disables a geographic criterion.
pub const ALL: &str = "all";

/// The tally of one section, as handed over by the normalizer.
///
/// The geographic labels are never empty: missing values are replaced by
/// [`UNSPECIFIED`] when the record is built.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VoteRecord {
    pub section: String,
    pub municipality: String,
    pub local_district: String,
    pub federal_district: String,
    /// Registered voters of the section.
    pub nominal_roll: u64,
    /// Option code (party, coalition ballot, null votes, ...) to vote count.
    pub votes_by_option: BTreeMap<String, u64>,
    /// A total supplied by the source. Only used when `votes_by_option` is empty.
    pub reported_total_votes: Option<u64>,
}

impl VoteRecord {
    pub fn new(section: &str) -> VoteRecord {
        VoteRecord {
            section: section.to_string(),
            municipality: UNSPECIFIED.to_string(),
            local_district: UNSPECIFIED.to_string(),
            federal_district: UNSPECIFIED.to_string(),
            nominal_roll: 0,
            votes_by_option: BTreeMap::new(),
            reported_total_votes: None,
        }
    }

    pub fn with_municipality(mut self, municipality: &str) -> VoteRecord {
        self.municipality = municipality.to_string();
        self
    }

    pub fn with_local_district(mut self, district: &str) -> VoteRecord {
        self.local_district = district.to_string();
        self
    }

    pub fn with_federal_district(mut self, district: &str) -> VoteRecord {
        self.federal_district = district.to_string();
        self
    }

    pub fn with_nominal_roll(mut self, nominal_roll: u64) -> VoteRecord {
        self.nominal_roll = nominal_roll;
        self
    }

    pub fn with_votes(mut self, code: &str, count: u64) -> VoteRecord {
        self.votes_by_option.insert(code.to_string(), count);
        self
    }

    /// Votes recorded for an option code. A column absent from this record counts as zero.
    pub fn votes_for(&self, code: &str) -> u64 {
        self.votes_by_option.get(code).copied().unwrap_or(0)
    }

    /// Total votes cast in the section.
    ///
    /// Recomputed from the per-option counts; the reported total is a fallback for
    /// records that carry no per-option breakdown at all.
    pub fn total_votes(&self) -> u64 {
        if self.votes_by_option.is_empty() {
            self.reported_total_votes.unwrap_or(0)
        } else {
            self.votes_by_option.values().sum()
        }
    }

    pub fn geo(&self, field: GeoField) -> &str {
        match field {
            GeoField::Municipality => &self.municipality,
            GeoField::LocalDistrict => &self.local_district,
            GeoField::FederalDistrict => &self.federal_district,
            GeoField::Section => &self.section,
        }
    }
}

/// The levels of the geographic hierarchy, from the widest to the narrowest.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum GeoField {
    Municipality,
    LocalDistrict,
    FederalDistrict,
    Section,
}

impl GeoField {
    pub const ALL_FIELDS: [GeoField; 4] = [
        GeoField::Municipality,
        GeoField::LocalDistrict,
        GeoField::FederalDistrict,
        GeoField::Section,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            GeoField::Municipality => "municipality",
            GeoField::LocalDistrict => "localDistrict",
            GeoField::FederalDistrict => "federalDistrict",
            GeoField::Section => "section",
        }
    }
}

/// Geographic selection. Every criterion is optional; the criteria are combined with AND.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct GeoFilter {
    pub municipality: Option<String>,
    pub local_district: Option<String>,
    pub federal_district: Option<String>,
    pub section: Option<String>,
}

impl GeoFilter {
    pub fn municipality(mut self, value: &str) -> GeoFilter {
        self.municipality = Some(value.to_string());
        self
    }

    pub fn local_district(mut self, value: &str) -> GeoFilter {
        self.local_district = Some(value.to_string());
        self
    }

    pub fn federal_district(mut self, value: &str) -> GeoFilter {
        self.federal_district = Some(value.to_string());
        self
    }

    pub fn section(mut self, value: &str) -> GeoFilter {
        self.section = Some(value.to_string());
        self
    }

    pub fn criterion(&self, field: GeoField) -> Option<&str> {
        let value = match field {
            GeoField::Municipality => &self.municipality,
            GeoField::LocalDistrict => &self.local_district,
            GeoField::FederalDistrict => &self.federal_district,
            GeoField::Section => &self.section,
        };
        value.as_deref()
    }

    /// The criteria that actually restrict the record set.
    pub fn active_criteria(&self) -> Vec<(GeoField, &str)> {
        GeoField::ALL_FIELDS
            .iter()
            .filter_map(|field| match self.criterion(*field) {
                Some(v) if !is_all_sentinel(v) => Some((*field, v)),
                _ => None,
            })
            .collect()
    }
}

/// "all" disables a criterion. "todos" is kept for files produced by the older dashboards.
pub fn is_all_sentinel(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v.eq_ignore_ascii_case(ALL) || v.eq_ignore_ascii_case("todos")
}

// ********* Registry **********

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Party {
    pub code: String,
    pub display_name: String,
    pub color: String,
}

impl Party {
    pub fn new(code: &str, display_name: &str, color: &str) -> Party {
        Party {
            code: code.to_string(),
            display_name: display_name.to_string(),
            color: color.to_string(),
        }
    }
}

/// A named group of parties reported as one unit.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Coalition {
    pub name: String,
    /// Member party codes, in declaration order, without duplicates.
    pub parties: Vec<String>,
    pub color: String,
}

impl Coalition {
    pub fn new(name: &str, parties: &[&str], color: &str) -> Coalition {
        let mut members: Vec<String> = Vec::new();
        for p in parties {
            let code = p.trim().to_string();
            if !code.is_empty() && !members.contains(&code) {
                members.push(code);
            }
        }
        Coalition {
            name: name.trim().to_string(),
            parties: members,
            color: color.to_string(),
        }
    }
}

/// What gets aggregated: a code for display plus the option columns summed into it.
///
/// A party is a unit whose only member is itself.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct ReportingUnit {
    pub code: String,
    pub members: Vec<String>,
}

impl ReportingUnit {
    pub fn party(code: &str) -> ReportingUnit {
        ReportingUnit {
            code: code.to_string(),
            members: vec![code.to_string()],
        }
    }

    pub fn from_coalition(coalition: &Coalition) -> ReportingUnit {
        ReportingUnit {
            code: coalition.name.clone(),
            members: coalition.parties.clone(),
        }
    }

    pub fn votes_in(&self, record: &VoteRecord) -> u64 {
        self.members.iter().map(|m| record.votes_for(m)).sum()
    }
}

/// The catalog of parties and coalitions of one election configuration.
///
/// It is built by the caller and passed to the engine; nothing in the engine
/// refers to a particular election.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Registry {
    parties: Vec<Party>,
    coalitions: Vec<Coalition>,
}

impl Registry {
    pub fn new(parties: Vec<Party>) -> Registry {
        Registry {
            parties,
            coalitions: Vec::new(),
        }
    }

    /// Adds a coalition. The name must not collide with another coalition or a party code,
    /// otherwise a selection by name would be ambiguous.
    pub fn with_coalition(mut self, coalition: Coalition) -> Result<Registry, EngineErrors> {
        if self.coalition(&coalition.name).is_some() || self.party(&coalition.name).is_some() {
            return Err(EngineErrors::DuplicateReportingUnit(coalition.name));
        }
        self.coalitions.push(coalition);
        Ok(self)
    }

    pub fn parties(&self) -> &[Party] {
        &self.parties
    }

    pub fn coalitions(&self) -> &[Coalition] {
        &self.coalitions
    }

    pub fn party(&self, code: &str) -> Option<&Party> {
        self.parties.iter().find(|p| p.code == code.trim())
    }

    pub fn coalition(&self, name: &str) -> Option<&Coalition> {
        let name = name.trim();
        self.coalitions
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Resolves a user selection: coalition names first, then party codes.
    pub fn resolve(&self, code: &str) -> Option<ReportingUnit> {
        if let Some(c) = self.coalition(code) {
            return Some(ReportingUnit::from_coalition(c));
        }
        self.party(code).map(|p| ReportingUnit::party(&p.code))
    }

    /// Like `resolve`, but an unknown code is treated as a bare option column.
    pub fn resolve_or_column(&self, code: &str) -> ReportingUnit {
        self.resolve(code)
            .unwrap_or_else(|| ReportingUnit::party(code.trim()))
    }

    pub fn party_units(&self) -> Vec<ReportingUnit> {
        self.parties
            .iter()
            .map(|p| ReportingUnit::party(&p.code))
            .collect()
    }

    pub fn coalition_units(&self) -> Vec<ReportingUnit> {
        self.coalitions
            .iter()
            .map(ReportingUnit::from_coalition)
            .collect()
    }

    pub fn color_of(&self, code: &str) -> Option<&str> {
        if let Some(c) = self.coalition(code) {
            return Some(c.color.as_str());
        }
        self.party(code).map(|p| p.color.as_str())
    }

    pub fn display_name_of(&self, code: &str) -> String {
        if let Some(c) = self.coalition(code) {
            return c.name.clone();
        }
        self.party(code)
            .map(|p| p.display_name.clone())
            .unwrap_or_else(|| code.to_string())
    }
}

// ********* Goal configuration **********

/// What a goal percentage is measured against.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum BasisMode {
    /// A percentage of the coalition's own current votes.
    CoalitionRelative,
    /// A percentage of all the votes cast.
    TotalRelative,
}

impl BasisMode {
    pub fn label(&self) -> &'static str {
        match self {
            BasisMode::CoalitionRelative => "coalitionRelative",
            BasisMode::TotalRelative => "totalRelative",
        }
    }
}

/// Validated goal parameters. The target is a percentage between 1 and 100.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct GoalParams {
    target_percentage: f64,
    basis_mode: BasisMode,
}

impl GoalParams {
    pub fn new(target_percentage: f64, basis_mode: BasisMode) -> Result<GoalParams, EngineErrors> {
        if !target_percentage.is_finite() || !(1.0..=100.0).contains(&target_percentage) {
            return Err(EngineErrors::InvalidTargetPercentage(
                target_percentage.to_string(),
            ));
        }
        Ok(GoalParams {
            target_percentage,
            basis_mode,
        })
    }

    pub fn target_percentage(&self) -> f64 {
        self.target_percentage
    }

    pub fn basis_mode(&self) -> BasisMode {
        self.basis_mode
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum TargetKind {
    Votes(u64),
    Percentage(f64),
    Sections(u32),
}

/// A campaign target for a single reporting unit.
#[derive(PartialEq, Debug, Clone)]
pub struct Target {
    pub unit: ReportingUnit,
    pub kind: TargetKind,
    pub description: String,
}

#[derive(PartialEq, Debug, Clone)]
pub struct GoalRequest {
    pub coalition: ReportingUnit,
    pub params: GoalParams,
}

/// Everything `analyze` needs besides the records and the registry.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct ReportRequest {
    pub filter: GeoFilter,
    /// Units to rank. When not provided: all the registry parties plus every other
    /// option code found in the data.
    pub units: Option<Vec<ReportingUnit>>,
    pub goal: Option<GoalRequest>,
    pub targets: Vec<Target>,
}

// ******** Output data structures *********

#[derive(PartialEq, Debug, Clone)]
pub struct AggregationResult {
    pub code: String,
    pub votes: u64,
    pub percentage_of_total: f64,
}

#[derive(PartialEq, Debug, Clone, Default)]
pub struct Aggregation {
    pub results: BTreeMap<String, AggregationResult>,
    /// Sum over the distinct option codes summed by the requested units.
    pub total_votes: u64,
    pub total_nominal_roll: u64,
    pub record_count: usize,
}

impl Aggregation {
    pub fn get(&self, code: &str) -> Option<&AggregationResult> {
        self.results.get(code)
    }

    pub fn votes(&self, code: &str) -> u64 {
        self.get(code).map(|r| r.votes).unwrap_or(0)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Competitiveness {
    VeryCompetitive,
    Competitive,
    ModeratelyCompetitive,
    NotCompetitive,
}

impl Competitiveness {
    /// Classifies a margin expressed in percentage points.
    pub fn from_margin(margin_percentage_points: f64) -> Competitiveness {
        if margin_percentage_points < 5.0 {
            Competitiveness::VeryCompetitive
        } else if margin_percentage_points < 10.0 {
            Competitiveness::Competitive
        } else if margin_percentage_points < 20.0 {
            Competitiveness::ModeratelyCompetitive
        } else {
            Competitiveness::NotCompetitive
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Competitiveness::VeryCompetitive => "very competitive",
            Competitiveness::Competitive => "competitive",
            Competitiveness::ModeratelyCompetitive => "moderately competitive",
            Competitiveness::NotCompetitive => "not competitive",
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct Ranking {
    /// Descending by votes, ties broken by code.
    pub entries: Vec<AggregationResult>,
    pub winner: Option<AggregationResult>,
    pub runner_up: Option<AggregationResult>,
    pub margin_percentage_points: f64,
    pub competitiveness: Competitiveness,
    pub total_votes: u64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct SectionRanking {
    pub section: String,
    pub municipality: String,
    pub ranking: Ranking,
}

#[derive(PartialEq, Debug, Clone)]
pub struct MunicipalityWins {
    pub municipality: String,
    pub total_sections: u32,
    pub sections_won: u32,
    pub win_percentage: f64,
    pub votes: u64,
}

/// How one unit fares across the sections of a record set.
#[derive(PartialEq, Debug, Clone)]
pub struct UnitPerformance {
    pub code: String,
    pub total_sections: u32,
    pub sections_won: u32,
    pub sections_lost: u32,
    pub win_percentage: f64,
    pub votes: u64,
    pub total_votes: u64,
    pub vote_share_percent: f64,
    /// Mean margin over the runner-up in the sections won, in percentage points.
    pub avg_victory_margin: f64,
    /// Mean gap to the section winner in the sections lost, in percentage points.
    pub avg_defeat_margin: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ParticipationRow {
    pub key: String,
    pub section_count: usize,
    pub total_votes: u64,
    pub total_nominal_roll: u64,
    pub participation_percent: f64,
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct FilterOptions {
    pub municipalities: Vec<String>,
    pub local_districts: Vec<String>,
    pub federal_districts: Vec<String>,
    pub sections: Vec<String>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct GoalSpec {
    pub coalition: String,
    pub target_percentage: f64,
    pub basis_mode: BasisMode,
    pub basis_value: u64,
    pub coalition_votes: u64,
    pub total_votes: u64,
    pub required_votes: u64,
    pub current_votes: u64,
    /// `current_votes - required_votes`. Non-negative when the goal is met.
    pub difference: i64,
    pub coalition_share_percent: f64,
}

impl GoalSpec {
    pub fn is_met(&self) -> bool {
        self.difference >= 0
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum SectionStatus {
    Reached,
    Close,
    Far,
    /// Nobody voted in the section: there is nothing to reach.
    NoVotes,
}

impl SectionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SectionStatus::Reached => "reached",
            SectionStatus::Close => "close",
            SectionStatus::Far => "far",
            SectionStatus::NoVotes => "no votes",
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum PriorityLevel {
    High,
    Medium,
    Low,
}

impl PriorityLevel {
    pub fn label(&self) -> &'static str {
        match self {
            PriorityLevel::High => "high",
            PriorityLevel::Medium => "medium",
            PriorityLevel::Low => "low",
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct SectionPriority {
    pub section: String,
    pub municipality: String,
    pub local_district: String,
    pub coalition_votes: u64,
    pub total_votes: u64,
    pub coalition_share_percent: f64,
    pub required_votes: u64,
    pub difference: i64,
    pub status: SectionStatus,
    pub priority: PriorityLevel,
}

#[derive(PartialEq, Debug, Clone)]
pub struct GoalSummary {
    /// Sections with at least one vote. The success rate is relative to them.
    pub total_sections: usize,
    pub sections_without_votes: usize,
    pub sections_reached: usize,
    pub sections_close: usize,
    pub success_rate_percent: f64,
    /// Votes still missing, summed over the sections below their own requirement.
    pub additional_votes_needed: u64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct GoalReport {
    pub goal: GoalSpec,
    pub sections: Vec<SectionPriority>,
    pub summary: GoalSummary,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TargetStatus {
    Achieved,
    OnTrack,
    Behind,
}

impl TargetStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TargetStatus::Achieved => "achieved",
            TargetStatus::OnTrack => "on-track",
            TargetStatus::Behind => "behind",
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct TargetProgress {
    pub unit: String,
    pub description: String,
    pub kind: TargetKind,
    pub current: f64,
    pub target: f64,
    pub progress_percent: f64,
    pub status: TargetStatus,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ElectionReport {
    pub filter: GeoFilter,
    pub record_count: usize,
    pub total_votes: u64,
    pub total_nominal_roll: u64,
    pub participation_percent: f64,
    pub ranking: Ranking,
    pub section_rankings: Vec<SectionRanking>,
    pub win_counts: BTreeMap<String, u32>,
    pub participation_by_municipality: Vec<ParticipationRow>,
    pub goal: Option<GoalReport>,
    /// Wins and margins of the goal coalition, section by section.
    pub goal_performance: Option<UnitPerformance>,
    pub goal_municipality_wins: Vec<MunicipalityWins>,
    pub targets: Vec<TargetProgress>,
}

/// Errors reported by the engine.
///
/// Apart from goal parameter validation, they only describe records rejected
/// at the ingestion boundary; aggregations themselves never fail.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum EngineErrors {
    MissingSection { row: usize },
    NegativeCount { row: usize, column: String },
    InvalidTargetPercentage(String),
    DuplicateReportingUnit(String),
}

impl Error for EngineErrors {}

impl Display for EngineErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineErrors::MissingSection { row } => {
                write!(f, "row {}: missing section identifier", row)
            }
            EngineErrors::NegativeCount { row, column } => {
                write!(f, "row {}: negative count in column {}", row, column)
            }
            EngineErrors::InvalidTargetPercentage(t) => {
                write!(f, "target percentage {} is not between 1 and 100", t)
            }
            EngineErrors::DuplicateReportingUnit(name) => {
                write!(f, "reporting unit {} is already defined", name)
            }
        }
    }
}
