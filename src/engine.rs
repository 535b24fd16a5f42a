use std::collections::BTreeMap;

use crate::models::{CohortStats, FilterConfig, RankMode, StatusTier, StudentRecord};

/// Applies the status, minimum-accepted and top-N predicates to the roster.
/// Roster order is preserved; an empty result is a valid outcome, not an
/// error.
pub fn filter_cohort(roster: &[StudentRecord], config: &FilterConfig) -> Vec<StudentRecord> {
    roster
        .iter()
        .filter(|record| {
            config.active_statuses.contains(&record.status)
                && record.accepted >= config.min_accepted
                && (config.top_n == 0 || record.position_rank <= config.top_n)
        })
        .cloned()
        .collect()
}

/// Maps every cohort member to a rank axis value, in cohort order.
///
/// Ranks are always derived from the full roster's histogram, never from the
/// filtered subset: filtering changes what is shown, not a student's
/// standing.
pub fn rank_values(
    cohort: &[StudentRecord],
    mode: RankMode,
    histogram: &BTreeMap<usize, usize>,
    hw_count: usize,
) -> Vec<u32> {
    match mode {
        RankMode::Position => cohort.iter().map(|s| s.position_rank).collect(),
        RankMode::Dense => cohort
            .iter()
            .map(|s| (hw_count + 1 - s.accepted) as u32)
            .collect(),
        RankMode::Competition => {
            let higher = higher_counts(histogram, hw_count);
            cohort
                .iter()
                .map(|s| 1 + higher.get(s.accepted).copied().unwrap_or(0) as u32)
                .collect()
        }
    }
}

/// For each acceptance count `a` in `[0, hw_count]`, the number of students
/// with a strictly higher count. One backward pass; levels missing from the
/// histogram contribute zero.
fn higher_counts(histogram: &BTreeMap<usize, usize>, hw_count: usize) -> Vec<usize> {
    let mut higher = vec![0usize; hw_count + 1];
    let mut running = 0usize;
    for a in (0..hw_count).rev() {
        running += histogram.get(&(a + 1)).copied().unwrap_or(0);
        higher[a] = running;
    }
    higher
}

pub fn cohort_stats(cohort: &[StudentRecord]) -> CohortStats {
    let n = cohort.len();
    if n == 0 {
        return CohortStats {
            n: 0,
            mean: 0.0,
            good_share: 0.0,
        };
    }
    let total: usize = cohort.iter().map(|s| s.accepted).sum();
    let good = cohort
        .iter()
        .filter(|s| s.status == StatusTier::Good)
        .count();
    CohortStats {
        n,
        mean: total as f64 / n as f64,
        good_share: good as f64 / n as f64,
    }
}

/// Buckets a population by acceptance count into `hw_count + 1` dense bins.
/// The caller picks the population (filtered cohort or whole roster).
pub fn distribution(population: &[StudentRecord], hw_count: usize) -> Vec<usize> {
    let mut bins = vec![0usize; hw_count + 1];
    for member in population {
        if let Some(bin) = bins.get_mut(member.accepted) {
            *bin += 1;
        }
    }
    bins
}

/// Running count of accepted assignments across the ordered homework
/// sequence. Monotone by construction; the final element equals
/// `student.accepted`.
pub fn cumulative_series(student: &StudentRecord, hw_count: usize) -> Vec<u32> {
    let mut series = Vec::with_capacity(hw_count);
    let mut acc = 0u32;
    for i in 0..hw_count {
        if student
            .per_assignment
            .get(i)
            .is_some_and(|a| a.is_accepted())
        {
            acc += 1;
        }
        series.push(acc);
    }
    series
}

/// Element-wise mean of the cumulative series across `students`, rounded to
/// two decimals for display stability. An empty list yields an all-zero
/// series (the denominator is treated as 1, same degenerate policy as
/// `cohort_stats`).
pub fn average_series(students: &[StudentRecord], hw_count: usize) -> Vec<f64> {
    let n = students.len().max(1) as f64;
    let mut totals = vec![0u64; hw_count];
    for student in students {
        for (i, value) in cumulative_series(student, hw_count).into_iter().enumerate() {
            totals[i] += value as u64;
        }
    }
    totals
        .into_iter()
        .map(|total| (total as f64 / n * 100.0).round() / 100.0)
        .collect()
}
