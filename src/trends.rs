//! Year-over-year movement of admission thresholds per program.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::records::{AdmissionRecord, RecordIndex};

/// Average moves beyond this many marks count as a trend.
pub const STABLE_BAND: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Rising,
    Falling,
    Stable,
}

impl TrendDirection {
    pub fn from_change(change: f64) -> Self {
        if change > STABLE_BAND {
            TrendDirection::Rising
        } else if change < -STABLE_BAND {
            TrendDirection::Falling
        } else {
            TrendDirection::Stable
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearStat {
    pub year: i32,
    pub average: f64,
    pub max: f64,
    pub min: f64,
    /// Number of threshold observations, one per offering institution.
    pub institutions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearChange {
    pub from: i32,
    pub to: i32,
    pub change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramTrend {
    pub program: String,
    pub category: String,
    /// Ascending by year.
    pub years: Vec<YearStat>,
    pub changes: Vec<YearChange>,
    /// Last year's average minus the first year's.
    pub total_change: f64,
    pub direction: TrendDirection,
    pub institution_change: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramMovement {
    pub program_code: String,
    pub change: f64,
    pub latest_average: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RisingPrograms {
    /// Largest increases first.
    pub rising: Vec<ProgramMovement>,
    /// Largest decreases first.
    pub declining: Vec<ProgramMovement>,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn matches_program(record: &AdmissionRecord, needle: &str) -> bool {
    record.program_code.trim().to_uppercase() == needle
        || record.program_name.to_uppercase().contains(needle)
}

fn thresholds_by_year<'a, I>(records: I, category: &str) -> BTreeMap<i32, Vec<f64>>
where
    I: IntoIterator<Item = &'a AdmissionRecord>,
{
    let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for record in records {
        if let Some(threshold) = record.threshold(category) {
            by_year.entry(record.year).or_default().push(threshold);
        }
    }
    by_year
}

/// Per-year threshold statistics for a program code or name fragment.
///
/// Returns `None` when no record for the program carries a threshold in
/// `category`.
pub fn program_trend(index: &RecordIndex, program: &str, category: &str) -> Option<ProgramTrend> {
    let needle = program.trim().to_uppercase();
    if needle.is_empty() {
        return None;
    }

    let by_year = thresholds_by_year(
        index.all_admissions().filter(|r| matches_program(r, &needle)),
        category,
    );
    if by_year.is_empty() {
        return None;
    }

    let years: Vec<YearStat> = by_year
        .into_iter()
        .map(|(year, values)| YearStat {
            year,
            average: round1(mean(&values)),
            max: round1(values.iter().copied().fold(f64::MIN, f64::max)),
            min: round1(values.iter().copied().fold(f64::MAX, f64::min)),
            institutions: values.len(),
        })
        .collect();

    let changes: Vec<YearChange> = years
        .windows(2)
        .map(|pair| YearChange {
            from: pair[0].year,
            to: pair[1].year,
            change: round1(pair[1].average - pair[0].average),
        })
        .collect();

    let (first, last) = (&years[0], &years[years.len() - 1]);
    let total_change = round1(last.average - first.average);
    let institution_change = last.institutions as i64 - first.institutions as i64;

    Some(ProgramTrend {
        program: needle,
        category: category.to_uppercase(),
        direction: TrendDirection::from_change(total_change),
        total_change,
        institution_change,
        changes,
        years,
    })
}

/// Program codes with at least two years of data, ranked by average change.
pub fn rising_programs(index: &RecordIndex, category: &str, top_n: usize) -> RisingPrograms {
    let mut by_program: BTreeMap<String, Vec<&AdmissionRecord>> = BTreeMap::new();
    for record in index.all_admissions() {
        let code = record.program_code.trim();
        if !code.is_empty() {
            by_program.entry(code.to_uppercase()).or_default().push(record);
        }
    }

    let mut movements: Vec<ProgramMovement> = by_program
        .into_iter()
        .filter_map(|(program_code, records)| {
            let by_year = thresholds_by_year(records, category);
            if by_year.len() < 2 {
                return None;
            }
            let first = by_year.values().next()?;
            let last = by_year.values().next_back()?;
            let latest_average = mean(last);
            Some(ProgramMovement {
                program_code,
                change: round1(latest_average - mean(first)),
                latest_average: round1(latest_average),
            })
        })
        .collect();

    // Stable sort over code-ordered input: ties stay alphabetical.
    movements.sort_by(|a, b| b.change.partial_cmp(&a.change).unwrap_or(Ordering::Equal));

    let rising = movements.iter().take(top_n).cloned().collect();
    let declining = movements.iter().rev().take(top_n).cloned().collect();
    RisingPrograms { rising, declining }
}
