//! Value types produced and consumed by the emotion engine.
//!
//! An [`EmotionProfile`] is an immutable snapshot of one feedback
//! observation. Float fields are always within [0, 1], categorical fields
//! are closed enums, and tag lists never contain duplicates.

use std::fmt;

use serde::{Deserialize, Serialize};

pub fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrustrationType {
    Technical,
    Content,
    Pace,
    Support,
    Mixed,
}

impl FrustrationType {
    /// Three-letter code used in pattern signatures.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Technical => "tec",
            Self::Content => "con",
            Self::Pace => "pac",
            Self::Support => "sup",
            Self::Mixed => "mix",
        }
    }
}

impl fmt::Display for FrustrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Technical => write!(f, "technical"),
            Self::Content => write!(f, "content"),
            Self::Pace => write!(f, "pace"),
            Self::Support => write!(f, "support"),
            Self::Mixed => write!(f, "mixed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrustrationIntensity {
    Mild,
    Moderate,
    Severe,
    Critical,
}

impl FrustrationIntensity {
    /// Pure threshold function of the frustration level (0.3 / 0.6 / 0.85).
    pub fn from_level(level: f64) -> Self {
        if level < 0.3 {
            Self::Mild
        } else if level < 0.6 {
            Self::Moderate
        } else if level < 0.85 {
            Self::Severe
        } else {
            Self::Critical
        }
    }
}

impl fmt::Display for FrustrationIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mild => write!(f, "mild"),
            Self::Moderate => write!(f, "moderate"),
            Self::Severe => write!(f, "severe"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Direction of a single dimension across recent weekly observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
    Spiking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
    Critical,
    Immediate,
}

impl UrgencyLevel {
    /// Numeric rank on the fixed 0.2-step scale used by signatures and
    /// similarity scoring.
    pub fn rank(&self) -> f64 {
        match self {
            Self::Low => 0.2,
            Self::Medium => 0.4,
            Self::High => 0.6,
            Self::Critical => 0.8,
            Self::Immediate => 1.0,
        }
    }
}

impl fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
            Self::Immediate => write!(f, "immediate"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseUrgency {
    WithinHour,
    SameDay,
    WithinWeek,
    Routine,
}

impl ResponseUrgency {
    pub fn from_urgency(urgency: UrgencyLevel) -> Self {
        match urgency {
            UrgencyLevel::Immediate | UrgencyLevel::Critical => Self::WithinHour,
            UrgencyLevel::High => Self::SameDay,
            UrgencyLevel::Medium => Self::WithinWeek,
            UrgencyLevel::Low => Self::Routine,
        }
    }

    /// One step more urgent; saturates at `WithinHour`.
    pub fn escalated(&self) -> Self {
        match self {
            Self::WithinHour | Self::SameDay => Self::WithinHour,
            Self::WithinWeek => Self::SameDay,
            Self::Routine => Self::WithinWeek,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionalTrajectory {
    Improving,
    Declining,
    Neutral,
    Fluctuating,
}

impl EmotionalTrajectory {
    /// Numeric rank used in pattern signatures.
    pub fn rank(&self) -> f64 {
        match self {
            Self::Improving => 0.8,
            Self::Neutral => 0.5,
            Self::Fluctuating => 0.4,
            Self::Declining => 0.2,
        }
    }
}

impl fmt::Display for EmotionalTrajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Improving => write!(f, "improving"),
            Self::Declining => write!(f, "declining"),
            Self::Neutral => write!(f, "neutral"),
            Self::Fluctuating => write!(f, "fluctuating"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionalComplexity {
    Simple,
    Mixed,
    Complex,
    Conflicted,
}

/// Concrete situations in the text that call for a fast response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencySignal {
    ConsideringDropping,
    MissedDeadlines,
    HelpRequests,
    ProgressBlocked,
    TimelinePressure,
    RepeatedAttempts,
}

/// Ways dissatisfaction hides behind polite phrasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HiddenSignal {
    HedgedApproval,
    PraiseWithReservations,
    FaintPraise,
    DiplomaticLanguage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropoutEmotion {
    Helplessness,
    Overwhelm,
    Isolation,
    Despair,
    Frustration,
    Anxiety,
    Hopelessness,
    Defeat,
    Inadequacy,
    Disconnection,
}

impl DropoutEmotion {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Helplessness => "helplessness",
            Self::Overwhelm => "overwhelm",
            Self::Isolation => "isolation",
            Self::Despair => "despair",
            Self::Frustration => "frustration",
            Self::Anxiety => "anxiety",
            Self::Hopelessness => "hopelessness",
            Self::Defeat => "defeat",
            Self::Inadequacy => "inadequacy",
            Self::Disconnection => "disconnection",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryIndicator {
    Hope,
    Determination,
    Gratitude,
    Optimism,
    Relief,
    Confidence,
    Satisfaction,
    Enthusiasm,
    Motivation,
    Connection,
}

impl RecoveryIndicator {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Hope => "hope",
            Self::Determination => "determination",
            Self::Gratitude => "gratitude",
            Self::Optimism => "optimism",
            Self::Relief => "relief",
            Self::Confidence => "confidence",
            Self::Satisfaction => "satisfaction",
            Self::Enthusiasm => "enthusiasm",
            Self::Motivation => "motivation",
            Self::Connection => "connection",
        }
    }
}

/// What specifically sets negative emotions off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionalTrigger {
    DeadlinePressure,
    TechnicalIssues,
    ContentDifficulty,
    LackOfSupport,
    PeerComparison,
    FeedbackIssues,
    WorkloadIssues,
    InstructorIssues,
}

/// Structured emotional snapshot derived from one feedback observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionProfile {
    // Primary levels
    pub frustration_level: f64,
    pub engagement_level: f64,
    pub confidence_level: f64,
    pub satisfaction_level: f64,

    // Frustration classification
    pub frustration_type: FrustrationType,
    pub frustration_intensity: FrustrationIntensity,
    pub frustration_trend: Trend,

    // Urgency
    pub urgency_level: UrgencyLevel,
    pub urgency_signals: Vec<UrgencySignal>,
    pub response_urgency: ResponseUrgency,

    // Emotional dynamics
    pub emotional_temperature: f64,
    pub emotional_volatility: f64,
    pub emotional_trajectory: EmotionalTrajectory,

    // Hidden dissatisfaction
    pub hidden_dissatisfaction_flag: bool,
    pub hidden_dissatisfaction_confidence: f64,
    pub hidden_signals: Vec<HiddenSignal>,
    pub politeness_mask_level: f64,

    // Advanced markers
    pub dropout_risk_emotions: Vec<DropoutEmotion>,
    pub positive_recovery_indicators: Vec<RecoveryIndicator>,
    pub emotional_triggers: Vec<EmotionalTrigger>,

    // Meta-emotional
    pub emotion_coherence: f64,
    pub sentiment_authenticity: f64,
    pub emotional_complexity: EmotionalComplexity,
}

impl EmotionProfile {
    /// Profile returned for empty or whitespace-only text: all primary
    /// levels at 0.5, empty tag lists, neutral categoricals.
    pub fn neutral() -> Self {
        Self {
            frustration_level: 0.5,
            engagement_level: 0.5,
            confidence_level: 0.5,
            satisfaction_level: 0.5,
            frustration_type: FrustrationType::Mixed,
            frustration_intensity: FrustrationIntensity::from_level(0.5),
            frustration_trend: Trend::Stable,
            urgency_level: UrgencyLevel::Low,
            urgency_signals: Vec::new(),
            response_urgency: ResponseUrgency::Routine,
            emotional_temperature: 0.5,
            emotional_volatility: 0.3,
            emotional_trajectory: EmotionalTrajectory::Neutral,
            hidden_dissatisfaction_flag: false,
            hidden_dissatisfaction_confidence: 0.0,
            hidden_signals: Vec::new(),
            politeness_mask_level: 0.0,
            dropout_risk_emotions: Vec::new(),
            positive_recovery_indicators: Vec::new(),
            emotional_triggers: Vec::new(),
            emotion_coherence: 1.0,
            sentiment_authenticity: 0.8,
            emotional_complexity: EmotionalComplexity::Simple,
        }
    }

    /// Satisfaction minus frustration; the valence used for trajectory
    /// classification.
    pub fn valence(&self) -> f64 {
        self.satisfaction_level - self.frustration_level
    }
}

/// One weekly observation within a student's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub week_number: u32,
    pub profile: EmotionProfile,
}

/// Ordered weekly emotion observations for one (student, course) pair.
///
/// Owned by the caller. Week numbers are expected unique; consumers sort
/// internally and tolerate out-of-order input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionHistory {
    pub student_id: String,
    pub course_id: String,
    pub entries: Vec<HistoryEntry>,
}

impl EmotionHistory {
    pub fn new(student_id: impl Into<String>, course_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            course_id: course_id.into(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, week_number: u32, profile: EmotionProfile) {
        self.entries.push(HistoryEntry { week_number, profile });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by week, oldest first.
    pub fn sorted_by_week(&self) -> Vec<&HistoryEntry> {
        let mut entries: Vec<&HistoryEntry> = self.entries.iter().collect();
        entries.sort_by_key(|e| e.week_number);
        entries
    }

    /// Up to `count` most recent entries, latest first.
    pub fn recent(&self, count: usize) -> Vec<&HistoryEntry> {
        let mut entries = self.sorted_by_week();
        entries.reverse();
        entries.truncate(count);
        entries
    }

    pub fn latest_week(&self) -> Option<u32> {
        self.entries.iter().map(|e| e.week_number).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intensity_cut_points() {
        assert_eq!(FrustrationIntensity::from_level(0.1), FrustrationIntensity::Mild);
        assert_eq!(FrustrationIntensity::from_level(0.3), FrustrationIntensity::Moderate);
        assert_eq!(FrustrationIntensity::from_level(0.6), FrustrationIntensity::Severe);
        assert_eq!(FrustrationIntensity::from_level(0.85), FrustrationIntensity::Critical);
    }

    #[test]
    fn response_urgency_escalation_saturates() {
        assert_eq!(ResponseUrgency::Routine.escalated(), ResponseUrgency::WithinWeek);
        assert_eq!(ResponseUrgency::WithinWeek.escalated(), ResponseUrgency::SameDay);
        assert_eq!(ResponseUrgency::SameDay.escalated(), ResponseUrgency::WithinHour);
        assert_eq!(ResponseUrgency::WithinHour.escalated(), ResponseUrgency::WithinHour);
    }

    #[test]
    fn urgency_ranks_step_evenly() {
        let levels = [
            UrgencyLevel::Low,
            UrgencyLevel::Medium,
            UrgencyLevel::High,
            UrgencyLevel::Critical,
            UrgencyLevel::Immediate,
        ];
        for pair in levels.windows(2) {
            assert!((pair[1].rank() - pair[0].rank() - 0.2).abs() < 1e-9);
        }
    }

    #[test]
    fn history_sorts_out_of_order_weeks() {
        let mut history = EmotionHistory::new("s1", "c1");
        history.push(3, EmotionProfile::neutral());
        history.push(1, EmotionProfile::neutral());
        history.push(2, EmotionProfile::neutral());

        let weeks: Vec<u32> = history.sorted_by_week().iter().map(|e| e.week_number).collect();
        assert_eq!(weeks, vec![1, 2, 3]);

        let recent: Vec<u32> = history.recent(2).iter().map(|e| e.week_number).collect();
        assert_eq!(recent, vec![3, 2]);
    }

    #[test]
    fn neutral_profile_is_within_bounds() {
        let profile = EmotionProfile::neutral();
        for value in [
            profile.frustration_level,
            profile.engagement_level,
            profile.confidence_level,
            profile.satisfaction_level,
            profile.emotional_temperature,
            profile.emotional_volatility,
            profile.emotion_coherence,
            profile.sentiment_authenticity,
        ] {
            assert!((0.0..=1.0).contains(&value));
        }
        assert!(profile.urgency_signals.is_empty());
        assert!(!profile.hidden_dissatisfaction_flag);
        assert_eq!(profile.politeness_mask_level, 0.0);
    }
}
