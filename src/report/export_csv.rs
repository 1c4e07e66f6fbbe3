// The goal worklist, one line per section, weakest sections first.

use std::io;

use serde::Serialize;

use crate::report::*;

#[derive(Debug, Serialize)]
struct WorklistRow<'a> {
    section: &'a str,
    municipality: &'a str,
    local_district: &'a str,
    coalition_votes: u64,
    total_votes: u64,
    share: String,
    required_votes: u64,
    difference: i64,
    status: &'static str,
    priority: &'static str,
}

pub fn write_worklist_to<W: io::Write>(wtr: &mut csv::Writer<W>, sections: &[SectionPriority]) -> Result<(), csv::Error> {
    for s in sections {
        wtr.serialize(WorklistRow {
            section: &s.section,
            municipality: &s.municipality,
            local_district: &s.local_district,
            coalition_votes: s.coalition_votes,
            total_votes: s.total_votes,
            share: format!("{:.2}", s.coalition_share_percent),
            required_votes: s.required_votes,
            difference: s.difference,
            status: s.status.label(),
            priority: s.priority.label(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_worklist(path: &str, sections: &[SectionPriority]) -> ReportResult<()> {
    info!("Writing {} sections to worklist {}", sections.len(), path);
    let mut wtr = csv::Writer::from_path(path).context(CsvWriteSnafu { path })?;
    write_worklist_to(&mut wtr, sections).context(CsvWriteSnafu { path })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worklist_lines() {
        let records = vec![
            VoteRecord::new("1")
                .with_municipality("La Paz")
                .with_votes("PAN", 100)
                .with_votes("MORENA", 150),
            VoteRecord::new("2")
                .with_municipality("La Paz")
                .with_votes("PAN", 50)
                .with_votes("MORENA", 50),
        ];
        let params = GoalParams::new(50.0, BasisMode::TotalRelative).unwrap();
        let sections = prioritize_sections(&records, &ReportingUnit::party("PAN"), &params);
        let mut wtr = csv::Writer::from_writer(vec![]);
        write_worklist_to(&mut wtr, &sections).unwrap();
        let text = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "section,municipality,local_district,coalition_votes,total_votes,share,required_votes,difference,status,priority"
        );
        assert_eq!(
            lines[1],
            "1,La Paz,unspecified,100,250,40.00,125,-25,far,medium"
        );
        assert_eq!(lines[2], "2,La Paz,unspecified,50,100,50.00,50,0,reached,low");
    }
}
