//! Trajectory forecasting over a weekly emotion history.
//!
//! Deterministic given the same history and `as_of` date. Fewer than two
//! observations yield the fixed default prediction; degenerate series fall
//! back to lower-degree fits instead of erroring.

use std::fmt;

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::fit::{self, Curve, CurveTrend};
use crate::profile::{clamp01, EmotionHistory, HistoryEntry};

/// Calibration parameters for forecasting and risk banding.
#[derive(Debug, Clone)]
pub struct TrajectoryTuning {
    /// Assumed course length in weeks.
    pub course_length_week: f64,
    /// Latest observed week at which the course-completion forecast
    /// switches to a fit over only the most recent points.
    pub recent_window_week: u32,
    pub recent_window_size: usize,
    /// Frustration level treated as the boiling point.
    pub frustration_threshold: f64,
    /// Engagement level treated as the disengagement floor.
    pub engagement_floor: f64,
    /// Routine check-in horizon when no risk is actionable.
    pub routine_check_in_days: i64,
}

impl Default for TrajectoryTuning {
    fn default() -> Self {
        Self {
            course_length_week: 12.0,
            recent_window_week: 10,
            recent_window_size: 3,
            frustration_threshold: 0.8,
            engagement_floor: 0.3,
            routine_check_in_days: 14,
        }
    }
}

/// Forecast of the primary levels at one horizon. Temperature is derived
/// from frustration and engagement, not independently fitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionForecast {
    pub frustration_level: f64,
    pub engagement_level: f64,
    pub confidence_level: f64,
    pub satisfaction_level: f64,
    pub emotional_temperature: f64,
}

impl EmotionForecast {
    fn neutral() -> Self {
        Self {
            frustration_level: 0.5,
            engagement_level: 0.5,
            confidence_level: 0.5,
            satisfaction_level: 0.5,
            emotional_temperature: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionPredictions {
    pub next_week: EmotionForecast,
    pub two_week: EmotionForecast,
    pub course_completion: EmotionForecast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Minimal,
    Low,
    Medium,
    High,
    Critical,
    Unknown,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minimal => write!(f, "minimal"),
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropoutRiskGrade {
    Low,
    Medium,
    High,
    Unknown,
}

/// How soon corrective action should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionTiming {
    Immediate,
    Within24Hours,
    ThisWeek,
    WithinWeek,
    NextWeek,
    Routine,
}

impl InterventionTiming {
    /// Sort rank; lower is more urgent. `ThisWeek` and `WithinWeek` tie.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Immediate => 0,
            Self::Within24Hours => 1,
            Self::ThisWeek | Self::WithinWeek => 2,
            Self::NextWeek => 3,
            Self::Routine => 4,
        }
    }
}

impl fmt::Display for InterventionTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate => write!(f, "immediate"),
            Self::Within24Hours => write!(f, "within 24 hours"),
            Self::ThisWeek => write!(f, "this week"),
            Self::WithinWeek => write!(f, "within the week"),
            Self::NextWeek => write!(f, "next week"),
            Self::Routine => write!(f, "routine"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionKind {
    FrustrationIntervention,
    EngagementIntervention,
    DissatisfactionIntervention,
    RoutineCheckIn,
}

impl fmt::Display for InterventionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FrustrationIntervention => write!(f, "frustration intervention"),
            Self::EngagementIntervention => write!(f, "engagement intervention"),
            Self::DissatisfactionIntervention => write!(f, "dissatisfaction intervention"),
            Self::RoutineCheckIn => write!(f, "routine check-in"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementSupport {
    IntensiveSupport,
    TargetedEngagement,
    PreventiveCheckIn,
    RoutineMonitoring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutreachApproach {
    EmpatheticOutreach,
    IndirectSupport,
    SubtleCheckIn,
    RoutineMonitoring,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrustrationEscalation {
    pub risk_level: RiskLevel,
    pub trend: CurveTrend,
    pub days_to_threshold: Option<i64>,
    pub intervention_urgency: InterventionTiming,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementEscalation {
    pub dropout_risk: DropoutRiskGrade,
    pub weeks_to_disengagement: Option<f64>,
    pub days_to_intervention: Option<i64>,
    pub intervention_type: EngagementSupport,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiddenExplosionEscalation {
    pub risk: RiskLevel,
    pub explosion_probability: f64,
    pub days_to_explosion: Option<i64>,
    pub intervention_approach: OutreachApproach,
    pub intervention_timing: InterventionTiming,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEscalations {
    pub frustration_boiling_point: FrustrationEscalation,
    pub engagement_dropout: EngagementEscalation,
    pub hidden_dissatisfaction_explosion: HiddenExplosionEscalation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionWindow {
    pub kind: InterventionKind,
    pub timing: InterventionTiming,
    pub days_from_now: i64,
    pub confidence: f64,
    pub target_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionWindows {
    pub primary: InterventionWindow,
    pub secondary: Option<InterventionWindow>,
}

/// Per-prediction-type confidence, each the shared base scaled and capped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScores {
    pub next_week: f64,
    pub two_week: f64,
    pub course_completion: f64,
    pub frustration_threshold: f64,
    pub engagement_dropout: f64,
    pub dissatisfaction_explosion: f64,
    pub intervention_windows: f64,
    pub overall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPrediction {
    pub emotion_predictions: EmotionPredictions,
    pub risk_escalations: RiskEscalations,
    pub intervention_windows: InterventionWindows,
    pub confidence_scores: ConfidenceScores,
}

pub fn predict(history: &EmotionHistory) -> TrajectoryPrediction {
    predict_as_of(history, Utc::now().date_naive())
}

pub fn predict_as_of(history: &EmotionHistory, as_of: NaiveDate) -> TrajectoryPrediction {
    predict_with(history, as_of, &TrajectoryTuning::default())
}

pub fn predict_with(
    history: &EmotionHistory,
    as_of: NaiveDate,
    tuning: &TrajectoryTuning,
) -> TrajectoryPrediction {
    let entries = history.sorted_by_week();
    let confidence_scores = confidence_scores(&entries);
    if entries.len() < 2 {
        return default_prediction(as_of, tuning, confidence_scores);
    }

    let latest_week = entries.last().map(|e| e.week_number).unwrap_or(0) as f64;
    let degree = if entries.len() < 3 { 1 } else { 2 };

    let frustration = dimension_series(&entries, |p| p.frustration_level);
    let engagement = dimension_series(&entries, |p| p.engagement_level);
    let confidence = dimension_series(&entries, |p| p.confidence_level);
    let satisfaction = dimension_series(&entries, |p| p.satisfaction_level);

    let frustration_fit = fit::fit(&frustration, degree);
    let engagement_fit = fit::fit(&engagement, degree);
    let confidence_fit = fit::fit(&confidence, degree);
    let satisfaction_fit = fit::fit(&satisfaction, degree);

    let forecast_at = |week: f64| {
        forecast(
            frustration_fit.eval(week),
            engagement_fit.eval(week),
            confidence_fit.eval(week),
            satisfaction_fit.eval(week),
        )
    };

    let course_completion = if latest_week >= tuning.recent_window_week as f64 {
        // Long-range extrapolation from stale early weeks is unreliable;
        // refit on the most recent points only.
        let window = tuning.recent_window_size;
        let recent = |series: &[(f64, f64)]| {
            let start = series.len().saturating_sub(window);
            fit::fit(&series[start..], 2)
        };
        let week = tuning.course_length_week;
        forecast(
            recent(&frustration).eval(week),
            recent(&engagement).eval(week),
            recent(&confidence).eval(week),
            recent(&satisfaction).eval(week),
        )
    } else {
        forecast_at(tuning.course_length_week)
    };

    let emotion_predictions = EmotionPredictions {
        next_week: forecast_at(latest_week + 1.0),
        two_week: forecast_at(latest_week + 2.0),
        course_completion,
    };

    let risk_escalations = RiskEscalations {
        frustration_boiling_point: frustration_escalation(
            &frustration_fit,
            &frustration,
            latest_week,
            tuning,
        ),
        engagement_dropout: engagement_escalation(
            &engagement_fit,
            &engagement,
            latest_week,
            tuning,
        ),
        hidden_dissatisfaction_explosion: hidden_explosion(&entries),
    };

    let intervention_windows = intervention_windows(&risk_escalations, as_of, tuning);

    TrajectoryPrediction {
        emotion_predictions,
        risk_escalations,
        intervention_windows,
        confidence_scores,
    }
}

fn dimension_series(entries: &[&HistoryEntry], value: impl Fn(&crate::profile::EmotionProfile) -> f64) -> Vec<(f64, f64)> {
    entries
        .iter()
        .map(|e| (e.week_number as f64, value(&e.profile)))
        .collect()
}

fn forecast(frustration: f64, engagement: f64, confidence: f64, satisfaction: f64) -> EmotionForecast {
    let frustration = clamp01(frustration);
    let engagement = clamp01(engagement);
    EmotionForecast {
        frustration_level: frustration,
        engagement_level: engagement,
        confidence_level: clamp01(confidence),
        satisfaction_level: clamp01(satisfaction),
        emotional_temperature: frustration * 0.7 + (1.0 - engagement) * 0.3,
    }
}

fn frustration_escalation(
    curve: &Curve,
    series: &[(f64, f64)],
    latest_week: f64,
    tuning: &TrajectoryTuning,
) -> FrustrationEscalation {
    let trend = curve.trend();
    let days_to_threshold = curve
        .crossing_after(tuning.frustration_threshold, latest_week)
        .map(|week| ((week - latest_week) * 7.0) as i64);

    let risk_level = match days_to_threshold {
        Some(days) if days <= 3 => RiskLevel::Critical,
        Some(days) if days <= 7 => RiskLevel::High,
        Some(days) if days <= 14 => RiskLevel::Medium,
        _ if trend.is_rising() => RiskLevel::Low,
        _ => RiskLevel::Minimal,
    };
    let intervention_urgency = match risk_level {
        RiskLevel::Critical => InterventionTiming::Immediate,
        RiskLevel::High => InterventionTiming::Within24Hours,
        RiskLevel::Medium => InterventionTiming::WithinWeek,
        _ => InterventionTiming::Routine,
    };
    FrustrationEscalation {
        risk_level,
        trend,
        days_to_threshold,
        intervention_urgency,
        confidence: fit_confidence(series, curve),
    }
}

fn engagement_escalation(
    curve: &Curve,
    series: &[(f64, f64)],
    latest_week: f64,
    tuning: &TrajectoryTuning,
) -> EngagementEscalation {
    let minimum_forecast = (1..=3)
        .map(|offset| clamp01(curve.eval(latest_week + offset as f64)))
        .fold(f64::INFINITY, f64::min);

    let dropout_risk = if minimum_forecast < tuning.engagement_floor {
        DropoutRiskGrade::High
    } else if minimum_forecast < 0.5 {
        DropoutRiskGrade::Medium
    } else {
        DropoutRiskGrade::Low
    };

    let weeks_to_disengagement = curve
        .crossing_after(tuning.engagement_floor, latest_week)
        .map(|week| week - latest_week);
    // Intervene a week ahead of the projected floor.
    let days_to_intervention =
        weeks_to_disengagement.map(|weeks| ((weeks * 7.0 - 7.0) as i64).max(1));

    let intervention_type = match dropout_risk {
        DropoutRiskGrade::High => EngagementSupport::IntensiveSupport,
        DropoutRiskGrade::Medium => EngagementSupport::TargetedEngagement,
        DropoutRiskGrade::Low => EngagementSupport::PreventiveCheckIn,
        DropoutRiskGrade::Unknown => EngagementSupport::RoutineMonitoring,
    };

    EngagementEscalation {
        dropout_risk,
        weeks_to_disengagement,
        days_to_intervention,
        intervention_type,
        confidence: fit_confidence(series, curve),
    }
}

fn hidden_explosion(entries: &[&HistoryEntry]) -> HiddenExplosionEscalation {
    let consecutive_hidden = entries
        .iter()
        .rev()
        .take_while(|e| e.profile.hidden_dissatisfaction_flag)
        .count();

    let last3: Vec<&HistoryEntry> = entries.iter().rev().take(3).rev().cloned().collect();
    let frustration_rising = last3.len() >= 3
        && last3
            .windows(2)
            .all(|pair| pair[1].profile.frustration_level > pair[0].profile.frustration_level);
    let satisfaction_stable = last3.len() >= 3 && {
        let values: Vec<f64> = last3.iter().map(|e| e.profile.satisfaction_level).collect();
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        max - min < 0.2 && min > 0.5
    };

    let weeks = consecutive_hidden as f64;
    let (risk, explosion_probability, days_to_explosion) =
        if consecutive_hidden >= 3 && frustration_rising && satisfaction_stable {
            (
                RiskLevel::High,
                (0.5 + weeks * 0.1).min(0.9),
                Some((14 - consecutive_hidden as i64 * 2).max(1)),
            )
        } else if consecutive_hidden >= 2 && frustration_rising {
            (
                RiskLevel::Medium,
                (0.3 + weeks * 0.1).min(0.7),
                Some((21 - consecutive_hidden as i64 * 2).max(3)),
            )
        } else if consecutive_hidden >= 1 {
            (
                RiskLevel::Low,
                (0.1 + weeks * 0.1).min(0.4),
                Some((28 - consecutive_hidden as i64 * 2).max(7)),
            )
        } else {
            (RiskLevel::Minimal, 0.1, None)
        };

    let intervention_approach = match risk {
        RiskLevel::High => OutreachApproach::EmpatheticOutreach,
        RiskLevel::Medium => OutreachApproach::IndirectSupport,
        RiskLevel::Low => OutreachApproach::SubtleCheckIn,
        _ => OutreachApproach::RoutineMonitoring,
    };
    let intervention_timing = match days_to_explosion {
        Some(days) if days <= 3 => InterventionTiming::Immediate,
        Some(days) if days <= 7 => InterventionTiming::ThisWeek,
        Some(_) => InterventionTiming::NextWeek,
        None => InterventionTiming::Routine,
    };

    let data_factor = (entries.len() as f64 / 10.0).min(1.0);
    let pattern_strength = if consecutive_hidden > 0 {
        (0.5 + 0.1 * weeks).min(1.0)
    } else {
        0.5
    };

    HiddenExplosionEscalation {
        risk,
        explosion_probability,
        days_to_explosion,
        intervention_approach,
        intervention_timing,
        confidence: data_factor * 0.5 + pattern_strength * 0.5,
    }
}

/// Fit quality blended with data quantity, for escalation records.
fn fit_confidence(series: &[(f64, f64)], curve: &Curve) -> f64 {
    let r2 = fit::r_squared(series, curve);
    let data_factor = (series.len() as f64 / 10.0).min(1.0);
    r2 * 0.7 + data_factor * 0.3
}

fn intervention_windows(
    escalations: &RiskEscalations,
    as_of: NaiveDate,
    tuning: &TrajectoryTuning,
) -> InterventionWindows {
    struct Candidate {
        kind: InterventionKind,
        timing: InterventionTiming,
        days: i64,
        confidence: f64,
    }

    let mut candidates = Vec::new();
    if let Some(days) = escalations.frustration_boiling_point.days_to_threshold {
        candidates.push(Candidate {
            kind: InterventionKind::FrustrationIntervention,
            timing: escalations.frustration_boiling_point.intervention_urgency,
            days,
            confidence: escalations.frustration_boiling_point.confidence,
        });
    }
    if let Some(days) = escalations.engagement_dropout.days_to_intervention {
        candidates.push(Candidate {
            kind: InterventionKind::EngagementIntervention,
            timing: if days <= 7 {
                InterventionTiming::WithinWeek
            } else {
                InterventionTiming::Routine
            },
            days,
            confidence: escalations.engagement_dropout.confidence,
        });
    }
    if let Some(days) = escalations.hidden_dissatisfaction_explosion.days_to_explosion {
        candidates.push(Candidate {
            kind: InterventionKind::DissatisfactionIntervention,
            timing: escalations.hidden_dissatisfaction_explosion.intervention_timing,
            days,
            confidence: escalations.hidden_dissatisfaction_explosion.confidence,
        });
    }

    candidates.sort_by(|left, right| {
        left.timing
            .rank()
            .cmp(&right.timing.rank())
            .then(left.days.cmp(&right.days))
            .then(
                right
                    .confidence
                    .partial_cmp(&left.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });

    let window = |candidate: &Candidate| InterventionWindow {
        kind: candidate.kind,
        timing: candidate.timing,
        days_from_now: candidate.days,
        confidence: candidate.confidence,
        target_date: as_of + Duration::days(candidate.days),
    };

    match candidates.first() {
        Some(first) => InterventionWindows {
            primary: window(first),
            secondary: candidates.get(1).map(window),
        },
        None => InterventionWindows {
            primary: routine_window(as_of, tuning),
            secondary: None,
        },
    }
}

fn routine_window(as_of: NaiveDate, tuning: &TrajectoryTuning) -> InterventionWindow {
    InterventionWindow {
        kind: InterventionKind::RoutineCheckIn,
        timing: InterventionTiming::Routine,
        days_from_now: tuning.routine_check_in_days,
        confidence: 0.5,
        target_date: as_of + Duration::days(tuning.routine_check_in_days),
    }
}

fn confidence_scores(entries: &[&HistoryEntry]) -> ConfidenceScores {
    let n = entries.len();
    let data_factor = (n as f64 / 10.0).min(1.0);
    let consistency = if n > 1 {
        let frustration: Vec<f64> = entries.iter().map(|e| e.profile.frustration_level).collect();
        let engagement: Vec<f64> = entries.iter().map(|e| e.profile.engagement_level).collect();
        1.0 - ((fit::variance(&frustration) + fit::variance(&engagement)) / 2.0).min(1.0)
    } else {
        0.0
    };
    let recency = if n >= 3 { 0.9 } else { 0.7 };
    let base = data_factor * 0.4 + consistency * 0.3 + recency * 0.3;

    ConfidenceScores {
        next_week: (base * 1.2).min(0.95),
        two_week: base.min(0.9),
        course_completion: (base * 0.8).min(0.8),
        frustration_threshold: (base * 1.1).min(0.9),
        engagement_dropout: base.min(0.85),
        dissatisfaction_explosion: (base * 0.9).min(0.8),
        intervention_windows: base.min(0.85),
        overall: base,
    }
}

fn default_prediction(
    as_of: NaiveDate,
    tuning: &TrajectoryTuning,
    confidence_scores: ConfidenceScores,
) -> TrajectoryPrediction {
    TrajectoryPrediction {
        emotion_predictions: EmotionPredictions {
            next_week: EmotionForecast::neutral(),
            two_week: EmotionForecast::neutral(),
            course_completion: EmotionForecast::neutral(),
        },
        risk_escalations: RiskEscalations {
            frustration_boiling_point: FrustrationEscalation {
                risk_level: RiskLevel::Unknown,
                trend: CurveTrend::Stable,
                days_to_threshold: None,
                intervention_urgency: InterventionTiming::Routine,
                confidence: 0.0,
            },
            engagement_dropout: EngagementEscalation {
                dropout_risk: DropoutRiskGrade::Unknown,
                weeks_to_disengagement: None,
                days_to_intervention: None,
                intervention_type: EngagementSupport::RoutineMonitoring,
                confidence: 0.0,
            },
            hidden_dissatisfaction_explosion: HiddenExplosionEscalation {
                risk: RiskLevel::Unknown,
                explosion_probability: 0.0,
                days_to_explosion: None,
                intervention_approach: OutreachApproach::RoutineMonitoring,
                intervention_timing: InterventionTiming::Routine,
                confidence: 0.0,
            },
        },
        intervention_windows: InterventionWindows {
            primary: routine_window(as_of, tuning),
            secondary: None,
        },
        confidence_scores,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{EmotionHistory, EmotionProfile};

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn entry(frustration: f64, engagement: f64, satisfaction: f64, hidden: bool) -> EmotionProfile {
        EmotionProfile {
            frustration_level: frustration,
            engagement_level: engagement,
            satisfaction_level: satisfaction,
            hidden_dissatisfaction_flag: hidden,
            ..EmotionProfile::neutral()
        }
    }

    fn history(entries: &[(u32, EmotionProfile)]) -> EmotionHistory {
        let mut history = EmotionHistory::new("s1", "c1");
        for (week, profile) in entries {
            history.push(*week, profile.clone());
        }
        history
    }

    #[test]
    fn short_history_returns_fixed_default() {
        let history = history(&[(1, entry(0.9, 0.1, 0.1, true))]);
        let prediction = predict_as_of(&history, as_of());

        let next = &prediction.emotion_predictions.next_week;
        assert_eq!(next.frustration_level, 0.5);
        assert_eq!(next.engagement_level, 0.5);
        assert_eq!(next.satisfaction_level, 0.5);
        assert_eq!(
            prediction.intervention_windows.primary.kind,
            InterventionKind::RoutineCheckIn
        );
        assert_eq!(prediction.intervention_windows.primary.days_from_now, 14);
        assert!(prediction.intervention_windows.secondary.is_none());
        assert_eq!(
            prediction.risk_escalations.frustration_boiling_point.risk_level,
            RiskLevel::Unknown
        );
        // Base confidence with one point: 0.1*0.4 + 0.0*0.3 + 0.7*0.3.
        assert!((prediction.confidence_scores.overall - 0.25).abs() < 1e-9);
    }

    #[test]
    fn rising_frustration_forecasts_past_threshold() {
        let history = history(&[
            (1, entry(0.3, 0.5, 0.7, false)),
            (2, entry(0.5, 0.5, 0.5, false)),
            (3, entry(0.7, 0.5, 0.3, false)),
        ]);
        let prediction = predict_as_of(&history, as_of());

        let next = &prediction.emotion_predictions.next_week;
        assert!(next.frustration_level > 0.7, "{}", next.frustration_level);
        assert!((next.engagement_level - 0.5).abs() < 1e-6);

        let boiling = &prediction.risk_escalations.frustration_boiling_point;
        // Line 0.1 + 0.2w crosses 0.8 at week 3.5: half a week out.
        assert_eq!(boiling.days_to_threshold, Some(3));
        assert_eq!(boiling.risk_level, RiskLevel::Critical);
        assert_eq!(boiling.intervention_urgency, InterventionTiming::Immediate);

        let primary = &prediction.intervention_windows.primary;
        assert_eq!(primary.kind, InterventionKind::FrustrationIntervention);
        assert_eq!(primary.days_from_now, 3);
        assert_eq!(primary.target_date, as_of() + Duration::days(3));
    }

    #[test]
    fn declining_engagement_grades_dropout_risk() {
        let history = history(&[
            (1, entry(0.2, 0.9, 0.7, false)),
            (2, entry(0.2, 0.75, 0.7, false)),
            (3, entry(0.2, 0.6, 0.7, false)),
        ]);
        let prediction = predict_as_of(&history, as_of());

        let dropout = &prediction.risk_escalations.engagement_dropout;
        // Line 1.05 - 0.15w reaches the 0.3 floor at week 5, two weeks out.
        assert_eq!(dropout.dropout_risk, DropoutRiskGrade::High);
        assert_eq!(dropout.intervention_type, EngagementSupport::IntensiveSupport);
        let weeks = dropout.weeks_to_disengagement.unwrap();
        assert!((weeks - 2.0).abs() < 1e-6);
        assert_eq!(dropout.days_to_intervention, Some(7));

        let primary = &prediction.intervention_windows.primary;
        assert_eq!(primary.kind, InterventionKind::EngagementIntervention);
        assert_eq!(primary.timing, InterventionTiming::WithinWeek);
    }

    #[test]
    fn sustained_hidden_dissatisfaction_escalates() {
        let history = history(&[
            (1, entry(0.3, 0.5, 0.7, true)),
            (2, entry(0.4, 0.5, 0.72, true)),
            (3, entry(0.5, 0.5, 0.68, true)),
        ]);
        let prediction = predict_as_of(&history, as_of());

        let hidden = &prediction.risk_escalations.hidden_dissatisfaction_explosion;
        assert_eq!(hidden.risk, RiskLevel::High);
        assert!((hidden.explosion_probability - 0.8).abs() < 1e-9);
        assert_eq!(hidden.days_to_explosion, Some(8));
        assert_eq!(hidden.intervention_approach, OutreachApproach::EmpatheticOutreach);
        assert_eq!(hidden.intervention_timing, InterventionTiming::NextWeek);
    }

    #[test]
    fn calm_history_falls_back_to_routine_window() {
        let history = history(&[
            (1, entry(0.2, 0.8, 0.8, false)),
            (2, entry(0.2, 0.8, 0.8, false)),
            (3, entry(0.2, 0.8, 0.8, false)),
        ]);
        let prediction = predict_as_of(&history, as_of());

        assert_eq!(
            prediction.intervention_windows.primary.kind,
            InterventionKind::RoutineCheckIn
        );
        assert_eq!(
            prediction.intervention_windows.primary.target_date,
            as_of() + Duration::days(14)
        );
        assert_eq!(
            prediction.risk_escalations.frustration_boiling_point.risk_level,
            RiskLevel::Minimal
        );
        assert_eq!(
            prediction.risk_escalations.engagement_dropout.dropout_risk,
            DropoutRiskGrade::Low
        );
    }

    #[test]
    fn forecasts_stay_clamped_under_steep_slopes() {
        let history = history(&[
            (1, entry(0.1, 0.9, 0.9, false)),
            (2, entry(0.5, 0.5, 0.5, false)),
            (3, entry(0.9, 0.1, 0.1, false)),
        ]);
        let prediction = predict_as_of(&history, as_of());
        for forecast in [
            &prediction.emotion_predictions.next_week,
            &prediction.emotion_predictions.two_week,
            &prediction.emotion_predictions.course_completion,
        ] {
            for value in [
                forecast.frustration_level,
                forecast.engagement_level,
                forecast.confidence_level,
                forecast.satisfaction_level,
                forecast.emotional_temperature,
            ] {
                assert!((0.0..=1.0).contains(&value));
            }
        }
    }

    #[test]
    fn late_course_forecast_uses_recent_window() {
        // Early weeks rising steeply; the last three weeks are flat at 0.4.
        // The full fit would overshoot, the recent-window fit stays flat.
        let mut entries = vec![
            (1, entry(0.05, 0.5, 0.5, false)),
            (2, entry(0.1, 0.5, 0.5, false)),
            (3, entry(0.2, 0.5, 0.5, false)),
            (4, entry(0.3, 0.5, 0.5, false)),
            (5, entry(0.35, 0.5, 0.5, false)),
            (6, entry(0.38, 0.5, 0.5, false)),
            (7, entry(0.39, 0.5, 0.5, false)),
        ];
        entries.push((9, entry(0.4, 0.5, 0.5, false)));
        entries.push((10, entry(0.4, 0.5, 0.5, false)));
        entries.push((11, entry(0.4, 0.5, 0.5, false)));
        let history = history(&entries);
        let prediction = predict_as_of(&history, as_of());
        let completion = &prediction.emotion_predictions.course_completion;
        assert!((completion.frustration_level - 0.4).abs() < 0.05);
    }

    #[test]
    fn prediction_is_deterministic_for_fixed_date() {
        let history = history(&[
            (1, entry(0.3, 0.6, 0.7, false)),
            (2, entry(0.45, 0.55, 0.6, true)),
            (3, entry(0.6, 0.5, 0.5, true)),
        ]);
        let first = predict_as_of(&history, as_of());
        let second = predict_as_of(&history, as_of());
        assert_eq!(first, second);
    }

    #[test]
    fn out_of_order_weeks_are_sorted_before_fitting() {
        let ordered = history(&[
            (1, entry(0.3, 0.5, 0.7, false)),
            (2, entry(0.5, 0.5, 0.5, false)),
            (3, entry(0.7, 0.5, 0.3, false)),
        ]);
        let shuffled = history(&[
            (3, entry(0.7, 0.5, 0.3, false)),
            (1, entry(0.3, 0.5, 0.7, false)),
            (2, entry(0.5, 0.5, 0.5, false)),
        ]);
        assert_eq!(predict_as_of(&ordered, as_of()), predict_as_of(&shuffled, as_of()));
    }

    #[test]
    fn confidence_map_respects_ceilings() {
        let history = history(&[
            (1, entry(0.4, 0.6, 0.6, false)),
            (2, entry(0.4, 0.6, 0.6, false)),
            (3, entry(0.4, 0.6, 0.6, false)),
            (4, entry(0.4, 0.6, 0.6, false)),
            (5, entry(0.4, 0.6, 0.6, false)),
            (6, entry(0.4, 0.6, 0.6, false)),
            (7, entry(0.4, 0.6, 0.6, false)),
            (8, entry(0.4, 0.6, 0.6, false)),
            (9, entry(0.4, 0.6, 0.6, false)),
            (10, entry(0.4, 0.6, 0.6, false)),
        ]);
        let scores = predict_as_of(&history, as_of()).confidence_scores;
        // Flat 10-point series: base = 0.4 + 0.3 + 0.27 = 0.97.
        assert!((scores.overall - 0.97).abs() < 1e-9);
        assert_eq!(scores.next_week, 0.95);
        assert_eq!(scores.two_week, 0.9);
        assert!((scores.course_completion - 0.776).abs() < 1e-9);
        assert_eq!(scores.frustration_threshold, 0.9);
        assert!(scores.dissatisfaction_explosion <= 0.8);
    }
}
