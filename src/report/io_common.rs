// Primitives shared by the readers: header layout, cell parsing and section lookup.

use std::collections::{BTreeMap, HashMap};

use crate::report::*;

const SECTION_COLUMNS: [&str; 1] = ["SECCION"];
const MUNICIPALITY_COLUMNS: [&str; 2] = ["MUNICIPIO_NOMBRE", "MUNICIPIO"];
const LOCAL_DISTRICT_COLUMNS: [&str; 2] = ["DISTRITO_L", "DISTRITO_LOCAL"];
const FEDERAL_DISTRICT_COLUMNS: [&str; 2] = ["DISTRITO_F", "DISTRITO_FEDERAL"];
const NOMINAL_ROLL_COLUMNS: [&str; 1] = ["LISTA_NOMINAL"];
const TOTAL_VOTES_COLUMNS: [&str; 1] = ["TOTAL_VOTOS"];
// Booth metadata found in the published results, never vote counts.
const METADATA_COLUMNS: [&str; 8] = [
    "CASILLA",
    "ID_CASILLA",
    "TIPO_CASILLA",
    "LOCALIDAD",
    "ID",
    "ESTADO",
    "ID_ESTADO",
    "DISTRITO",
];

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

fn same_column(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// A count as written in the published results.
///
/// Blank cells and '-' are zero, thousands separators are ignored. Returns None when the
/// cell is not a number.
pub fn parse_count(cell: &str) -> Option<i64> {
    let s = cell.trim();
    if s.is_empty() || s == "-" {
        return Some(0);
    }
    let cleaned: String = s.chars().filter(|c| *c != ',' && *c != ' ').collect();
    if let Ok(x) = cleaned.parse::<i64>() {
        return Some(x);
    }
    match cleaned.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Some(f as i64),
        _ => None,
    }
}

/// Where the known fields are in a table, and which columns hold votes.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnLayout {
    pub section: usize,
    pub municipality: Option<usize>,
    pub local_district: Option<usize>,
    pub federal_district: Option<usize>,
    pub nominal_roll: Option<usize>,
    pub total_votes: Option<usize>,
    pub options: Vec<(usize, String)>,
}

fn find_column(header: &[String], configured: &Option<String>, defaults: &[&str]) -> Option<usize> {
    match configured {
        Some(name) => header.iter().position(|h| same_column(h, name)),
        None => defaults
            .iter()
            .find_map(|d| header.iter().position(|h| same_column(h, d))),
    }
}

impl ColumnLayout {
    pub fn from_header(header: &[String], src: &RecordSource, path: &str) -> ReportResult<ColumnLayout> {
        let section = match find_column(header, &src.section_column, &SECTION_COLUMNS) {
            Some(idx) => idx,
            None => {
                return MissingColumnSnafu {
                    column: src
                        .section_column
                        .clone()
                        .unwrap_or_else(|| SECTION_COLUMNS[0].to_string()),
                    path,
                }
                .fail()
            }
        };
        let municipality = find_column(header, &src.municipality_column, &MUNICIPALITY_COLUMNS);
        let local_district =
            find_column(header, &src.local_district_column, &LOCAL_DISTRICT_COLUMNS);
        let federal_district =
            find_column(header, &src.federal_district_column, &FEDERAL_DISTRICT_COLUMNS);
        let nominal_roll = find_column(header, &src.nominal_roll_column, &NOMINAL_ROLL_COLUMNS);
        let total_votes = find_column(header, &src.total_votes_column, &TOTAL_VOTES_COLUMNS);

        let known: Vec<usize> = [
            Some(section),
            municipality,
            local_district,
            federal_district,
            nominal_roll,
            total_votes,
        ]
        .iter()
        .flatten()
        .cloned()
        .collect();
        let ignored: Vec<&str> = src
            .ignored_columns
            .iter()
            .flatten()
            .map(|s| s.as_str())
            .chain(SECTION_COLUMNS.iter().cloned())
            .chain(MUNICIPALITY_COLUMNS.iter().cloned())
            .chain(LOCAL_DISTRICT_COLUMNS.iter().cloned())
            .chain(FEDERAL_DISTRICT_COLUMNS.iter().cloned())
            .chain(NOMINAL_ROLL_COLUMNS.iter().cloned())
            .chain(TOTAL_VOTES_COLUMNS.iter().cloned())
            .chain(METADATA_COLUMNS.iter().cloned())
            .collect();

        let mut options: Vec<(usize, String)> = Vec::new();
        match &src.option_columns {
            Some(cols) => {
                for c in cols {
                    match header.iter().position(|h| same_column(h, c)) {
                        Some(idx) => options.push((idx, c.trim().to_string())),
                        None => warn!("{}: option column {:?} not found", path, c),
                    }
                }
            }
            None => {
                for (idx, h) in header.iter().enumerate() {
                    let name = h.trim();
                    if name.is_empty()
                        || known.contains(&idx)
                        || ignored.iter().any(|i| same_column(i, name))
                    {
                        continue;
                    }
                    options.push((idx, name.to_string()));
                }
            }
        }
        debug!(
            "from_header: {}: section column {}, options {:?}",
            path, section, options
        );
        Ok(ColumnLayout {
            section,
            municipality,
            local_district,
            federal_district,
            nominal_roll,
            total_votes,
            options,
        })
    }

    /// Maps one data row. `row` is the position in the file, for the diagnostics.
    pub fn to_raw(
        &self,
        cells: &[String],
        row: usize,
        municipality_names: Option<&BTreeMap<String, String>>,
    ) -> RawRecord {
        let cell = |idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| cells.get(i))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let count = |idx: Option<usize>, what: &str| -> Option<i64> {
            let s = cell(idx)?;
            let res = parse_count(&s);
            if res.is_none() {
                warn!("row {}: cannot read {} {:?}", row, what, s);
            }
            res
        };
        let municipality = cell(self.municipality).map(|m| {
            municipality_names
                .and_then(|names| names.get(&m))
                .cloned()
                .unwrap_or(m)
        });
        let votes: Vec<(String, i64)> = self
            .options
            .iter()
            .map(|(idx, code)| {
                let raw = cells.get(*idx).map(|s| s.as_str()).unwrap_or("");
                let value = match parse_count(raw) {
                    Some(v) => v,
                    None => {
                        warn!("row {}: column {}: cannot read {:?}, counting 0", row, code, raw);
                        0
                    }
                };
                (code.clone(), value)
            })
            .collect();
        RawRecord {
            row,
            section: cell(Some(self.section)),
            municipality,
            local_district: cell(self.local_district),
            federal_district: cell(self.federal_district),
            nominal_roll: count(self.nominal_roll, "nominal roll"),
            votes,
            reported_total_votes: count(self.total_votes, "total votes"),
        }
    }
}

/// Geography of the sections, from a separate table.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct SectionLookup {
    by_section: HashMap<String, [Option<String>; 3]>,
}

impl SectionLookup {
    pub fn len(&self) -> usize {
        self.by_section.len()
    }

    /// Fills the labels missing from a row. Labels present in the row are kept.
    pub fn enrich(&self, raw: &mut RawRecord) {
        let section = match raw.section.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => return,
        };
        if let Some([m, l, f]) = self.by_section.get(section) {
            for (target, value) in [
                (&mut raw.municipality, m),
                (&mut raw.local_district, l),
                (&mut raw.federal_district, f),
            ] {
                let missing = target.as_deref().map(|s| s.trim().is_empty()).unwrap_or(true);
                if missing && value.is_some() {
                    *target = value.clone();
                }
            }
        }
    }
}

pub fn section_lookup_from_table(
    header: &[String],
    rows: &[Vec<String>],
    src: &SectionLookupSource,
    path: &str,
) -> ReportResult<SectionLookup> {
    let as_source = RecordSource {
        file_path: src.file_path.clone(),
        section_column: src.section_column.clone(),
        municipality_column: src.municipality_column.clone(),
        local_district_column: src.local_district_column.clone(),
        federal_district_column: src.federal_district_column.clone(),
        ..Default::default()
    };
    let layout = ColumnLayout::from_header(header, &as_source, path)?;
    let mut by_section: HashMap<String, [Option<String>; 3]> = HashMap::new();
    for (idx, cells) in rows.iter().enumerate() {
        let raw = layout.to_raw(cells, idx + 2, None);
        if let Some(section) = raw.section {
            by_section
                .entry(section)
                .or_insert([raw.municipality, raw.local_district, raw.federal_district]);
        }
    }
    Ok(SectionLookup { by_section })
}

pub fn read_section_lookup(root_path: &Path, src: &SectionLookupSource) -> ReportResult<SectionLookup> {
    let path = root_path.join(&src.file_path).display().to_string();
    info!("Reading section lookup {:?}", path);
    let (header, rows) = io_csv::read_table(&path)?;
    let lookup = section_lookup_from_table(&header, &rows, src, &path)?;
    info!("Section lookup: {} sections", lookup.len());
    Ok(lookup)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn counts() {
        assert_eq!(parse_count(""), Some(0));
        assert_eq!(parse_count(" - "), Some(0));
        assert_eq!(parse_count("1,234"), Some(1234));
        assert_eq!(parse_count("42"), Some(42));
        assert_eq!(parse_count("17.0"), Some(17));
        assert_eq!(parse_count("-3"), Some(-3));
        assert_eq!(parse_count("n/a"), None);
        assert_eq!(parse_count("2.5"), None);
    }

    #[test]
    fn layout_finds_known_columns() {
        let header = strings(&[
            "SECCION",
            "CASILLA",
            "MUNICIPIO",
            "DISTRITO_L",
            "PAN",
            "PAN-PRI",
            "NULOS",
            "LISTA_NOMINAL",
            "TOTAL_VOTOS",
        ]);
        let layout = ColumnLayout::from_header(&header, &RecordSource::default(), "test").unwrap();
        assert_eq!(layout.section, 0);
        assert_eq!(layout.municipality, Some(2));
        assert_eq!(layout.local_district, Some(3));
        assert_eq!(layout.federal_district, None);
        assert_eq!(layout.nominal_roll, Some(7));
        assert_eq!(layout.total_votes, Some(8));
        let options: Vec<&str> = layout.options.iter().map(|(_, c)| c.as_str()).collect();
        assert_eq!(options, vec!["PAN", "PAN-PRI", "NULOS"]);
    }

    #[test]
    fn layout_honors_configuration() {
        let header = strings(&["secc", "A", "B", "C", "notes"]);
        let src = RecordSource {
            section_column: Some("SECC".to_string()),
            ignored_columns: Some(vec!["notes".to_string()]),
            ..Default::default()
        };
        let layout = ColumnLayout::from_header(&header, &src, "test").unwrap();
        let options: Vec<&str> = layout.options.iter().map(|(_, c)| c.as_str()).collect();
        assert_eq!(options, vec!["A", "B", "C"]);

        let src = RecordSource {
            section_column: Some("SECC".to_string()),
            option_columns: Some(vec!["C".to_string(), "Z".to_string()]),
            ..Default::default()
        };
        let layout = ColumnLayout::from_header(&header, &src, "test").unwrap();
        assert_eq!(layout.options, vec![(3, "C".to_string())]);
    }

    #[test]
    fn layout_needs_a_section() {
        let header = strings(&["PAN", "PRI"]);
        let res = ColumnLayout::from_header(&header, &RecordSource::default(), "test");
        assert!(matches!(res, Err(ReportError::MissingColumn { .. })));
    }

    #[test]
    fn rows_become_raw_records() {
        let header = strings(&["SECCION", "MUNICIPIO", "PAN", "PRI", "LISTA_NOMINAL"]);
        let layout = ColumnLayout::from_header(&header, &RecordSource::default(), "test").unwrap();
        let names: BTreeMap<String, String> =
            [("3".to_string(), "La Paz".to_string())].into_iter().collect();
        let raw = layout.to_raw(&strings(&["0102", "3", "1,200", "x", "-"]), 2, Some(&names));
        assert_eq!(raw.section.as_deref(), Some("0102"));
        assert_eq!(raw.municipality.as_deref(), Some("La Paz"));
        assert_eq!(
            raw.votes,
            vec![("PAN".to_string(), 1200), ("PRI".to_string(), 0)]
        );
        assert_eq!(raw.nominal_roll, Some(0));
        assert_eq!(raw.local_district, None);

        // Short rows
        let raw = layout.to_raw(&strings(&["7"]), 3, None);
        assert_eq!(raw.municipality, None);
        assert_eq!(raw.votes[0], ("PAN".to_string(), 0));
    }

    #[test]
    fn lookup_fills_missing_labels() {
        let header = strings(&["SECCION", "MUNICIPIO", "DISTRITO_L", "DISTRITO_F"]);
        let rows = vec![strings(&["1", "La Paz", "2", "1"])];
        let src = SectionLookupSource {
            file_path: "lookup.csv".to_string(),
            section_column: None,
            municipality_column: None,
            local_district_column: None,
            federal_district_column: None,
        };
        let lookup = section_lookup_from_table(&header, &rows, &src, "test").unwrap();
        let mut raw = RawRecord {
            section: Some("1".to_string()),
            local_district: Some("9".to_string()),
            ..Default::default()
        };
        lookup.enrich(&mut raw);
        assert_eq!(raw.municipality.as_deref(), Some("La Paz"));
        assert_eq!(raw.local_district.as_deref(), Some("9"));
        assert_eq!(raw.federal_district.as_deref(), Some("1"));

        let mut other = RawRecord {
            section: Some("2".to_string()),
            ..Default::default()
        };
        lookup.enrich(&mut other);
        assert_eq!(other.municipality, None);
    }
}
