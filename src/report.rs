//! Markdown cohort report assembly.

use std::fmt::Write;

use chrono::NaiveDate;

use crate::pattern::{self, HistoricalOutcome, OutcomePrediction, PatternCluster, PatternMatch, SimilarityCache};
use crate::profile::{EmotionHistory, EmotionProfile, FrustrationIntensity};
use crate::trajectory::{InterventionWindow, TrajectoryPrediction};

/// One scored student for reporting: their history and its prediction.
pub struct StudentReport {
    pub history: EmotionHistory,
    pub prediction: TrajectoryPrediction,
    pub outcome: Option<HistoricalOutcome>,
}

impl StudentReport {
    fn latest_profile(&self) -> Option<&EmotionProfile> {
        self.history
            .entries
            .iter()
            .max_by_key(|e| e.week_number)
            .map(|e| &e.profile)
    }
}

/// Pattern analysis anchored on the highest-risk student in the cohort.
pub struct CohortPatterns {
    pub query_student: String,
    pub clusters: Vec<PatternCluster>,
    pub outcomes: OutcomePrediction,
}

/// Cluster the rest of the cohort around the highest-frustration student
/// and aggregate their observed outcomes. `None` when fewer than two
/// students have any scored weeks.
pub fn cohort_patterns(students: &[StudentReport]) -> Option<CohortPatterns> {
    let query_index = students
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.latest_profile().map(|p| (i, p.frustration_level)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)?;
    let query_profile = students[query_index].latest_profile()?.clone();

    let mut candidates: Vec<PatternMatch> = students
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != query_index)
        .filter_map(|(_, s)| {
            s.latest_profile().map(|profile| PatternMatch {
                student_id: s.history.student_id.clone(),
                profile: profile.clone(),
                similarity_score: 0.0,
                outcome: s.outcome.clone(),
            })
        })
        .collect();
    if candidates.is_empty() {
        return None;
    }

    let mut cache = SimilarityCache::new();
    pattern::score_matches(&query_profile, &mut candidates, &mut cache);
    let clusters = pattern::cluster(&candidates);
    let outcomes = pattern::predict_outcomes(&clusters);

    Some(CohortPatterns {
        query_student: students[query_index].history.student_id.clone(),
        clusters,
        outcomes,
    })
}

pub fn build_report(
    course: Option<&str>,
    students: &[StudentReport],
    patterns: Option<&CohortPatterns>,
    as_of: NaiveDate,
) -> String {
    let mut output = String::new();
    let course_label = course.unwrap_or("all courses");

    let _ = writeln!(output, "# Course Emotion Report");
    let _ = writeln!(
        output,
        "Generated for {} on {} across {} students",
        course_label,
        as_of,
        students.len()
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Emotion Mix");
    let mix = intensity_mix(students);
    if mix.is_empty() {
        let _ = writeln!(output, "No scored feedback in this window.");
    } else {
        for (intensity, count) in mix {
            let _ = writeln!(output, "- {intensity} frustration: {count} students");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Risk Students");
    let mut ranked: Vec<&StudentReport> =
        students.iter().filter(|s| s.latest_profile().is_some()).collect();
    ranked.sort_by(|a, b| {
        let fa = a.latest_profile().map(|p| p.frustration_level).unwrap_or(0.0);
        let fb = b.latest_profile().map(|p| p.frustration_level).unwrap_or(0.0);
        fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal)
    });
    if ranked.is_empty() {
        let _ = writeln!(output, "No students with scored feedback.");
    } else {
        for student in ranked.iter().take(10) {
            let Some(profile) = student.latest_profile() else { continue };
            let _ = writeln!(
                output,
                "- {} ({}) frustration {:.2} ({}), urgency {}, trajectory {}",
                student.history.student_id,
                student.history.course_id,
                profile.frustration_level,
                profile.frustration_intensity,
                profile.urgency_level,
                profile.emotional_trajectory,
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Upcoming Intervention Windows");
    let mut windows: Vec<(&StudentReport, &InterventionWindow)> = students
        .iter()
        .map(|s| (s, &s.prediction.intervention_windows.primary))
        .collect();
    windows.sort_by_key(|(_, w)| w.target_date);
    if windows.is_empty() {
        let _ = writeln!(output, "No predictions available.");
    } else {
        for (student, window) in windows.iter().take(10) {
            let _ = writeln!(
                output,
                "- {}: {} by {} ({}, confidence {:.2})",
                student.history.student_id,
                window.kind,
                window.target_date,
                window.timing,
                window.confidence,
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Hidden Dissatisfaction Watchlist");
    let flagged: Vec<&StudentReport> = students
        .iter()
        .filter(|s| {
            s.latest_profile()
                .map(|p| p.hidden_dissatisfaction_flag)
                .unwrap_or(false)
        })
        .collect();
    if flagged.is_empty() {
        let _ = writeln!(output, "No hidden dissatisfaction detected.");
    } else {
        for student in flagged {
            let Some(profile) = student.latest_profile() else { continue };
            let _ = writeln!(
                output,
                "- {} ({}) confidence {:.2}, politeness mask {:.2}",
                student.history.student_id,
                student.history.course_id,
                profile.hidden_dissatisfaction_confidence,
                profile.politeness_mask_level,
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Similar Historical Patterns");
    match patterns {
        None => {
            let _ = writeln!(output, "Not enough students for pattern matching.");
        }
        Some(patterns) => {
            let _ = writeln!(
                output,
                "Anchored on {} (highest current frustration):",
                patterns.query_student
            );
            for cluster in &patterns.clusters {
                let _ = writeln!(
                    output,
                    "- cluster {}: {} students, average similarity {:.2}",
                    cluster.cluster_id,
                    cluster.members.len(),
                    cluster.average_similarity,
                );
            }
            let _ = writeln!(
                output,
                "Estimated dropout risk {:.2}, intervention success probability {:.2}",
                patterns.outcomes.dropout_risk,
                patterns.outcomes.intervention_success_probability,
            );
            if patterns.outcomes.recommended_interventions.is_empty() {
                let _ = writeln!(output, "No recorded interventions among matched students.");
            } else {
                let _ = writeln!(
                    output,
                    "Interventions that worked for similar students: {}",
                    patterns.outcomes.recommended_interventions.join(", "),
                );
            }
        }
    }

    output
}

fn intensity_mix(students: &[StudentReport]) -> Vec<(FrustrationIntensity, usize)> {
    let mut counts: Vec<(FrustrationIntensity, usize)> = [
        FrustrationIntensity::Mild,
        FrustrationIntensity::Moderate,
        FrustrationIntensity::Severe,
        FrustrationIntensity::Critical,
    ]
    .into_iter()
    .map(|intensity| (intensity, 0))
    .collect();
    for student in students {
        if let Some(profile) = student.latest_profile() {
            for entry in counts.iter_mut() {
                if entry.0 == profile.frustration_intensity {
                    entry.1 += 1;
                }
            }
        }
    }
    counts.retain(|(_, count)| *count > 0);
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}
