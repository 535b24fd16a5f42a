use std::fmt::Write;

use crate::engine;
use crate::models::{DistMode, FilterConfig, RankMode, RosterSnapshot};

fn rank_axis_heading(mode: RankMode) -> &'static str {
    match mode {
        RankMode::Position => "position in rating (1 = best)",
        RankMode::Dense => "rank by acceptance level (dense)",
        RankMode::Competition => "rank with ties shared (competition)",
    }
}

/// Renders the whole markdown report from one snapshot and one filter
/// configuration. Every number is recomputed here; nothing is cached between
/// invocations.
pub fn build_report(
    snapshot: &RosterSnapshot,
    config: &FilterConfig,
    dist_mode: DistMode,
    compare: &[String],
) -> String {
    let hw_count = snapshot.hw_count();
    let cohort = engine::filter_cohort(&snapshot.students, config);
    let stats = engine::cohort_stats(&cohort);
    let ranks = engine::rank_values(&cohort, config.rank_mode, &snapshot.histogram, hw_count);

    let mut output = String::new();

    let _ = writeln!(output, "# Homework Rating Report ({})", snapshot.hw_range());
    let _ = writeln!(
        output,
        "Generated {} over {} students and {} assignments.",
        snapshot.generated_at.format("%Y-%m-%d %H:%M UTC"),
        snapshot.students.len(),
        hw_count
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Cohort Summary");
    let _ = writeln!(output, "- visible: {} of {}", stats.n, snapshot.students.len());
    let statuses: Vec<&str> = config.active_statuses.iter().map(|s| s.as_str()).collect();
    let _ = writeln!(
        output,
        "- filters: statuses={}, min accepted={}, top N={}",
        statuses.join(","),
        config.min_accepted,
        config.top_n
    );
    if stats.n == 0 {
        let _ = writeln!(output, "- no students pass the current filters");
    } else {
        let _ = writeln!(output, "- mean accepted: {:.2}/{}", stats.mean, hw_count);
        let _ = writeln!(output, "- good-tier share: {:.1}%", stats.good_share * 100.0);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Standings ({})", rank_axis_heading(config.rank_mode));

    if cohort.is_empty() {
        let _ = writeln!(output, "No students to rank.");
    } else {
        for (student, rank) in cohort.iter().zip(ranks.iter()).take(10) {
            let _ = writeln!(
                output,
                "- #{rank} {} with {}/{} accepted ({}%, {})",
                student.name, student.accepted, hw_count, student.percent, student.status
            );
        }
    }

    let population = match dist_mode {
        DistMode::Filtered => &cohort,
        DistMode::Total => &snapshot.students,
    };
    let bins = engine::distribution(population, hw_count);
    let scope = match dist_mode {
        DistMode::Filtered => "filtered cohort",
        DistMode::Total => "whole roster",
    };

    let _ = writeln!(output);
    let _ = writeln!(output, "## Acceptance Distribution ({scope})");
    for (accepted, count) in bins.iter().enumerate() {
        let _ = writeln!(output, "- {accepted}/{hw_count} accepted: {count} students");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Cumulative Progress");
    let average = engine::average_series(&snapshot.students, hw_count);
    let _ = writeln!(output, "- group average: {}", join_series(&average));

    for name in compare {
        match snapshot.students.iter().find(|s| &s.name == name) {
            Some(student) => {
                let series = engine::cumulative_series(student, hw_count);
                let formatted: Vec<f64> = series.iter().map(|&v| v as f64).collect();
                let _ = writeln!(output, "- {}: {}", student.name, join_series(&formatted));
            }
            None => {
                let _ = writeln!(output, "- {name}: not found in roster");
            }
        }
    }

    output
}

fn join_series(values: &[f64]) -> String {
    if values.is_empty() {
        return "no assignments".to_string();
    }
    values
        .iter()
        .map(|v| format!("{v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::*;
    use crate::models::{Acceptance, AssignmentLabel, StatusTier, StudentRecord};

    fn sample_snapshot() -> RosterSnapshot {
        use Acceptance::{Accepted as A, NoSubmission as N, NotAccepted as R};
        let rows: [(&str, &[Acceptance], StatusTier); 3] = [
            ("Avery Lee", &[A, A, A], StatusTier::Good),
            ("Jules Moreno", &[A, R, N], StatusTier::Mid),
            ("Rowan Smith", &[R, N, R], StatusTier::Low),
        ];
        let mut students = Vec::new();
        let mut histogram = BTreeMap::new();
        for (rank, (name, results, status)) in rows.into_iter().enumerate() {
            let accepted = results.iter().filter(|a| a.is_accepted()).count();
            *histogram.entry(accepted).or_insert(0) += 1;
            students.push(StudentRecord {
                name: name.to_string(),
                per_assignment: results.to_vec(),
                per_assignment_raw: vec![String::new(); results.len()],
                accepted,
                percent: (accepted as f64 / 3.0 * 1000.0).round() / 10.0,
                status,
                position_rank: rank as u32 + 1,
            });
        }
        RosterSnapshot {
            generated_at: Utc::now(),
            assignment_labels: vec![
                AssignmentLabel { label: "HW01".into() },
                AssignmentLabel { label: "HW02".into() },
                AssignmentLabel { label: "HW03".into() },
            ],
            students,
            histogram,
        }
    }

    #[test]
    fn report_includes_summary_and_standings() {
        let snapshot = sample_snapshot();
        let report = build_report(&snapshot, &FilterConfig::default(), DistMode::Total, &[]);
        assert!(report.contains("# Homework Rating Report (HW01-HW03)"));
        assert!(report.contains("- visible: 3 of 3"));
        assert!(report.contains("- mean accepted: 1.33/3"));
        assert!(report.contains("- #1 Avery Lee with 3/3 accepted"));
        assert!(report.contains("- 0/3 accepted: 1 students"));
    }

    #[test]
    fn report_handles_empty_cohort() {
        let snapshot = sample_snapshot();
        let config = FilterConfig {
            min_accepted: 4,
            ..FilterConfig::default()
        };
        let report = build_report(&snapshot, &config, DistMode::Filtered, &[]);
        assert!(report.contains("no students pass the current filters"));
        assert!(report.contains("No students to rank."));
        assert!(report.contains("- 3/3 accepted: 0 students"));
    }

    #[test]
    fn compare_section_lists_series_and_flags_unknown_names() {
        let snapshot = sample_snapshot();
        let compare = vec!["Jules Moreno".to_string(), "Nobody".to_string()];
        let report = build_report(&snapshot, &FilterConfig::default(), DistMode::Total, &compare);
        assert!(report.contains("- Jules Moreno: 1, 1, 1"));
        assert!(report.contains("- Nobody: not found in roster"));
        assert!(report.contains("- group average: 0.67, 1, 1.33"));
    }
}
