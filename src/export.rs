use std::io;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::models::{StatusTier, StudentRecord};

#[derive(Serialize)]
struct ExportRow<'a> {
    rank: u32,
    accepted: usize,
    percent: f64,
    status: StatusTier,
    name: &'a str,
}

/// Serializes the filtered cohort as CSV. The engine imposes no format; the
/// column order here matches the dashboard's download.
pub fn write_cohort<W: io::Write>(cohort: &[StudentRecord], writer: W) -> anyhow::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for student in cohort {
        csv_writer.serialize(ExportRow {
            rank: student.position_rank,
            accepted: student.accepted,
            percent: student.percent,
            status: student.status,
            name: &student.name,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn export_csv(cohort: &[StudentRecord], out: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(out)
        .with_context(|| format!("failed to create {}", out.display()))?;
    write_cohort(cohort, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Acceptance;

    fn sample_record(name: &str, accepted: usize, rank: u32) -> StudentRecord {
        StudentRecord {
            name: name.to_string(),
            per_assignment: vec![Acceptance::Accepted; accepted],
            per_assignment_raw: vec!["1".to_string(); accepted],
            accepted,
            percent: accepted as f64 * 10.0,
            status: StatusTier::Mid,
            position_rank: rank,
        }
    }

    #[test]
    fn rows_keep_dashboard_column_order() {
        let cohort = vec![sample_record("Avery Lee", 3, 1)];
        let mut buffer = Vec::new();
        write_cohort(&cohort, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("rank,accepted,percent,status,name"));
        assert_eq!(lines.next(), Some("1,3,30.0,mid,Avery Lee"));
    }

    #[test]
    fn quotes_names_containing_commas() {
        let cohort = vec![sample_record("Lee, Avery", 2, 5)];
        let mut buffer = Vec::new();
        write_cohort(&cohort, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("\"Lee, Avery\""));
    }
}
