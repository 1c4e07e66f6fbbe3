use crate::config::*;
use crate::filter::group_by;
use crate::share_percent;

/// Turnout in percent. Zero when nobody is registered.
pub fn participation(total_votes: u64, total_nominal_roll: u64) -> f64 {
    share_percent(total_votes, total_nominal_roll)
}

fn row_for(key: &str, records: &[VoteRecord]) -> ParticipationRow {
    let total_votes: u64 = records.iter().map(|r| r.total_votes()).sum();
    let total_nominal_roll: u64 = records.iter().map(|r| r.nominal_roll).sum();
    ParticipationRow {
        key: key.to_string(),
        section_count: records.len(),
        total_votes,
        total_nominal_roll,
        participation_percent: participation(total_votes, total_nominal_roll),
    }
}

/// Turnout of every value of a geographic level.
pub fn participation_by(records: &[VoteRecord], field: GeoField) -> Vec<ParticipationRow> {
    group_by(records, field)
        .iter()
        .map(|(key, group)| row_for(key, group))
        .collect()
}

pub fn overall_participation(records: &[VoteRecord]) -> ParticipationRow {
    row_for(ALL, records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turnout_over_two_sections() {
        let p = participation(350, 450);
        assert!((p - 77.777777).abs() < 1e-5);
    }

    #[test]
    fn zero_roll_is_zero() {
        assert_eq!(participation(10, 0), 0.0);
        assert_eq!(participation(0, 0), 0.0);
    }

    #[test]
    fn grouped_turnout() {
        let data = vec![
            VoteRecord::new("1")
                .with_municipality("La Paz")
                .with_nominal_roll(200)
                .with_votes("PAN", 100)
                .with_votes("NULOS", 50),
            VoteRecord::new("2")
                .with_municipality("Loreto")
                .with_nominal_roll(100)
                .with_votes("PAN", 10),
            VoteRecord::new("3")
                .with_municipality("La Paz")
                .with_nominal_roll(100),
        ];
        let rows = participation_by(&data, GeoField::Municipality);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, "La Paz");
        assert_eq!(rows[0].section_count, 2);
        assert_eq!(rows[0].total_votes, 150);
        assert_eq!(rows[0].participation_percent, 50.0);
        assert_eq!(rows[1].participation_percent, 10.0);

        let all = overall_participation(&data);
        assert_eq!(all.total_votes, 160);
        assert_eq!(all.total_nominal_roll, 400);
        assert_eq!(all.participation_percent, 40.0);
    }

    #[test]
    fn reported_total_is_a_fallback() {
        let mut r = VoteRecord::new("1").with_nominal_roll(100);
        r.reported_total_votes = Some(60);
        assert_eq!(overall_participation(&[r.clone()]).participation_percent, 60.0);
        let r = r.with_votes("PAN", 30);
        assert_eq!(overall_participation(&[r]).participation_percent, 30.0);
    }
}
