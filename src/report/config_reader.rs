use crate::report::*;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

/// Color given to the parties and coalitions declared without one.
pub const DEFAULT_COLOR: &str = "#808080";

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "reportName")]
    pub report_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "electionDate")]
    pub election_date: Option<String>,
    #[serde(rename = "jurisdiction")]
    pub jurisdiction: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordSource {
    #[serde(default)]
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "sectionColumn")]
    pub section_column: Option<String>,
    #[serde(rename = "municipalityColumn")]
    pub municipality_column: Option<String>,
    #[serde(rename = "localDistrictColumn")]
    pub local_district_column: Option<String>,
    #[serde(rename = "federalDistrictColumn")]
    pub federal_district_column: Option<String>,
    #[serde(rename = "nominalRollColumn")]
    pub nominal_roll_column: Option<String>,
    #[serde(rename = "totalVotesColumn")]
    pub total_votes_column: Option<String>,
    #[serde(rename = "ignoredColumns")]
    pub ignored_columns: Option<Vec<String>>,
    /// When present, only these columns are read as options.
    #[serde(rename = "optionColumns")]
    pub option_columns: Option<Vec<String>>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    /// Municipality codes found in the data, to their names.
    #[serde(rename = "municipalityNames")]
    pub municipality_names: Option<BTreeMap<String, String>>,
}

/// A table of the geography of every section, used to complete the rows that lack it.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SectionLookupSource {
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "sectionColumn")]
    pub section_column: Option<String>,
    #[serde(rename = "municipalityColumn")]
    pub municipality_column: Option<String>,
    #[serde(rename = "localDistrictColumn")]
    pub local_district_column: Option<String>,
    #[serde(rename = "federalDistrictColumn")]
    pub federal_district_column: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PartyConfig {
    pub code: String,
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CoalitionConfig {
    pub name: String,
    pub parties: Vec<String>,
    pub color: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    pub municipality: Option<String>,
    #[serde(rename = "localDistrict")]
    pub local_district: Option<String>,
    #[serde(rename = "federalDistrict")]
    pub federal_district: Option<String>,
    pub section: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct GoalConfig {
    /// Coalition name or party code.
    pub coalition: String,
    #[serde(rename = "targetPercentage")]
    pub target_percentage: f64,
    /// "coalition" or "total"
    pub basis: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub unit: String,
    /// "votes", "percentage" or "sections"
    pub kind: String,
    pub value: f64,
    pub description: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct EgConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: Option<OutputSettings>,
    #[serde(rename = "recordSources", default)]
    pub record_sources: Vec<RecordSource>,
    #[serde(rename = "sectionLookup")]
    pub section_lookup: Option<SectionLookupSource>,
    #[serde(default = "default_parties")]
    pub parties: Vec<PartyConfig>,
    #[serde(default = "default_coalitions")]
    pub coalitions: Vec<CoalitionConfig>,
    /// Codes of the parties or coalitions to rank. All the parties by default.
    pub units: Option<Vec<String>>,
    pub filters: Option<FilterConfig>,
    pub goal: Option<GoalConfig>,
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

fn party(code: &str, name: &str, color: &str) -> PartyConfig {
    PartyConfig {
        code: code.to_string(),
        name: Some(name.to_string()),
        color: Some(color.to_string()),
    }
}

fn coalition(name: &str, parties: &[&str], color: &str) -> CoalitionConfig {
    CoalitionConfig {
        name: name.to_string(),
        parties: parties.iter().map(|s| s.to_string()).collect(),
        color: Some(color.to_string()),
    }
}

pub fn default_parties() -> Vec<PartyConfig> {
    vec![
        party("PAN", "Partido Acción Nacional", "#0066CC"),
        party("PRI", "Partido Revolucionario Institucional", "#FF0000"),
        party("PRD", "Partido de la Revolución Democrática", "#FFFF00"),
        party("PVEM", "Partido Verde Ecologista de México", "#00AA00"),
        party("PT", "Partido del Trabajo", "#CC0000"),
        party("MC", "Movimiento Ciudadano", "#FF6600"),
        party("MORENA", "Movimiento Regeneración Nacional", "#8B4513"),
    ]
}

pub fn default_coalitions() -> Vec<CoalitionConfig> {
    vec![
        coalition("Va por México", &["PAN", "PRI", "PRD"], "#6B46C1"),
        coalition("Juntos Haremos Historia", &["MORENA", "PT", "PVEM"], "#9F7AEA"),
        coalition("Movimiento Ciudadano", &["MC"], "#F59E0B"),
    ]
}

fn default_municipality_names() -> BTreeMap<String, String> {
    [
        ("1", "Comondú"),
        ("2", "Mulegé"),
        ("3", "La Paz"),
        ("4", "Los Cabos"),
        ("5", "Loreto"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// The configuration used when none is given on the command line.
pub fn default_config() -> EgConfig {
    EgConfig {
        output_settings: None,
        record_sources: vec![RecordSource {
            provider: "csv".to_string(),
            municipality_names: Some(default_municipality_names()),
            ..Default::default()
        }],
        section_lookup: None,
        parties: default_parties(),
        coalitions: default_coalitions(),
        units: None,
        filters: None,
        goal: None,
        targets: Vec::new(),
    }
}

pub fn read_config(path: &str) -> ReportResult<EgConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: EgConfig = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(config)
}

pub fn read_summary(path: &str) -> ReportResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}
