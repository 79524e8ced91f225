//! Feedback export ingestion: row shape, validation, history grouping.
//!
//! Raw payload validation happens here, at the boundary, so the analysis
//! core can stay total. A row failing validation is an item-level error;
//! it never aborts the file or its sibling rows.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::pattern::{CompletionStatus, HistoricalOutcome};

/// One row of a weekly feedback export.
///
/// Aspect scores use the 1-5 survey scale, NPS the 0-10 scale. The outcome
/// columns are only present in historical exports.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackRow {
    pub student_id: String,
    pub course_id: String,
    pub week_number: u32,
    #[serde(default)]
    pub nps_score: Option<u8>,
    #[serde(default)]
    pub lms_usability_score: Option<u8>,
    #[serde(default)]
    pub instructor_quality_score: Option<u8>,
    #[serde(default)]
    pub content_difficulty_score: Option<u8>,
    #[serde(default)]
    pub support_quality_score: Option<u8>,
    #[serde(default)]
    pub course_pace_score: Option<u8>,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub completion_status: Option<String>,
    /// Semicolon-separated intervention labels that worked for this student.
    #[serde(default)]
    pub successful_interventions: Option<String>,
}

const ASPECT_COLUMNS: &[&str] = &[
    "lms_usability_score",
    "instructor_quality_score",
    "content_difficulty_score",
    "support_quality_score",
    "course_pace_score",
];

impl FeedbackRow {
    fn aspect_values(&self) -> [Option<u8>; 5] {
        [
            self.lms_usability_score,
            self.instructor_quality_score,
            self.content_difficulty_score,
            self.support_quality_score,
            self.course_pace_score,
        ]
    }
}

/// Shape validation for one row. Returns the offending column in the
/// error message.
pub fn validate_row(row: &FeedbackRow) -> Result<(), String> {
    if row.student_id.trim().is_empty() {
        return Err("student_id is empty".to_string());
    }
    if row.course_id.trim().is_empty() {
        return Err("course_id is empty".to_string());
    }
    if row.week_number == 0 {
        return Err("week_number must be at least 1".to_string());
    }
    if let Some(nps) = row.nps_score {
        if nps > 10 {
            return Err(format!("nps_score {nps} outside 0-10"));
        }
    }
    for (column, value) in ASPECT_COLUMNS.iter().zip(row.aspect_values()) {
        if let Some(score) = value {
            if !(1..=5).contains(&score) {
                return Err(format!("{column} {score} outside 1-5"));
            }
        }
    }
    Ok(())
}

/// The aspect scores present on a row, keyed by column name. Values are
/// passed through as-is; the analyzer ignores out-of-range entries.
pub fn aspect_scores(row: &FeedbackRow) -> HashMap<String, u8> {
    ASPECT_COLUMNS
        .iter()
        .zip(row.aspect_values())
        .filter_map(|(column, value)| value.map(|v| (column.to_string(), v)))
        .collect()
}

pub fn read_rows(path: &Path) -> anyhow::Result<Vec<FeedbackRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open feedback export {}", path.display()))?;
    let mut rows = Vec::new();
    for result in reader.deserialize::<FeedbackRow>() {
        rows.push(result.context("malformed feedback row")?);
    }
    Ok(rows)
}

/// Group rows by (student, course), deterministically ordered by key.
pub fn group_rows(rows: Vec<FeedbackRow>) -> Vec<((String, String), Vec<FeedbackRow>)> {
    let mut groups: BTreeMap<(String, String), Vec<FeedbackRow>> = BTreeMap::new();
    for row in rows {
        groups
            .entry((row.student_id.clone(), row.course_id.clone()))
            .or_default()
            .push(row);
    }
    groups.into_iter().collect()
}

/// Outcome metadata for a student's rows, if any row carries it. The most
/// recent week wins.
pub fn historical_outcome(rows: &[FeedbackRow]) -> Option<HistoricalOutcome> {
    let row = rows
        .iter()
        .filter(|r| r.completion_status.is_some())
        .max_by_key(|r| r.week_number)?;
    let status = row.completion_status.as_deref().map(CompletionStatus::parse)?;
    let successful_interventions = row
        .successful_interventions
        .as_deref()
        .map(|raw| {
            raw.split(';')
                .map(str::trim)
                .filter(|label| !label.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Some(HistoricalOutcome { completion_status: status, successful_interventions })
}
