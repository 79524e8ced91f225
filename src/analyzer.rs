//! Emotion profile extraction from free-text feedback.
//!
//! Pure and total: any string input yields a profile, malformed optional
//! inputs disable the dependent computation instead of failing.

use std::collections::HashMap;

use crate::lexicon::{
    Lexicon, CONFIDENCE_INDICATORS, COLD_EMOTION_WORDS, DROPOUT_PHRASES, EMOTION_WORDS,
    ENGAGEMENT_INDICATORS, FRUSTRATION_CATEGORIES, GENERAL_FRUSTRATION, HOT_EMOTION_WORDS,
    NEGATIVE_EMOTION_WORDS, NEGATIVE_SATISFACTION, POLITE_PHRASES, POSITIVE_EMOTION_WORDS,
    POSITIVE_SATISFACTION, RECOVERY_PHRASES, STRONG_INTENSIFIERS, TEMPERATURE_INTENSIFIERS,
    URGENCY_PHRASES,
};
use crate::profile::{
    clamp01, DropoutEmotion, EmotionHistory, EmotionProfile, EmotionalComplexity,
    EmotionalTrajectory, EmotionalTrigger, FrustrationIntensity, FrustrationType, HiddenSignal,
    RecoveryIndicator, ResponseUrgency, Trend, UrgencyLevel, UrgencySignal,
};

/// Calibration constants. These are tuned parameters, not derived values;
/// override them at construction when re-calibrating against labeled data.
#[derive(Debug, Clone)]
pub struct Tuning {
    /// Per-keyword contribution to a lexical score.
    pub lexical_scale: f64,
    /// Extra weight per strong adverb ("extremely", "very", ...).
    pub intensifier_bonus: f64,
    /// Floor applied when an explicit first-person distress phrase matches.
    pub explicit_frustration_floor: f64,
    /// Frustration above which response urgency escalates one step.
    pub urgency_escalation_threshold: f64,
    /// Text vs aspect-score weights in the satisfaction blend.
    pub text_satisfaction_weight: f64,
    pub aspect_satisfaction_weight: f64,
    /// A category must beat the combined rest by this ratio to win typing.
    pub type_dominance_ratio: f64,
    /// Latest-vs-prior-mean delta separating increasing/decreasing from stable.
    pub trend_delta: f64,
    /// Single-entry jump that classifies as spiking/fluctuating.
    pub spike_delta: f64,
    pub volatility_scale: f64,
    pub default_volatility: f64,
    /// Hidden-dissatisfaction confidence per fired signal, and its cap.
    pub hidden_confidence_step: f64,
    pub hidden_confidence_cap: f64,
    /// Confidence adjustment when satisfaction contradicts or confirms signals.
    pub hidden_high_satisfaction_penalty: f64,
    pub hidden_low_satisfaction_bonus: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            lexical_scale: 0.15,
            intensifier_bonus: 0.5,
            explicit_frustration_floor: 0.7,
            urgency_escalation_threshold: 0.8,
            text_satisfaction_weight: 0.6,
            aspect_satisfaction_weight: 0.4,
            type_dominance_ratio: 1.5,
            trend_delta: 0.15,
            spike_delta: 0.25,
            volatility_scale: 2.5,
            default_volatility: 0.3,
            hidden_confidence_step: 0.25,
            hidden_confidence_cap: 0.75,
            hidden_high_satisfaction_penalty: 0.2,
            hidden_low_satisfaction_bonus: 0.3,
        }
    }
}

pub struct EmotionAnalyzer {
    lexicon: Lexicon,
    tuning: Tuning,
}

fn count_hits(haystack: &str, words: &[&str]) -> usize {
    words.iter().filter(|word| haystack.contains(*word)).count()
}

impl Default for EmotionAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl EmotionAnalyzer {
    pub fn new() -> Self {
        Self::with_tuning(Tuning::default())
    }

    pub fn with_tuning(tuning: Tuning) -> Self {
        Self { lexicon: Lexicon::new(), tuning }
    }

    /// Analyze one feedback text into an [`EmotionProfile`].
    ///
    /// `aspect_scores` are 1-5 ratings; out-of-range values are ignored per
    /// key. `history` enables trend, volatility and trajectory; without it
    /// those fields take their documented defaults. Empty or whitespace-only
    /// text yields the neutral profile.
    pub fn analyze(
        &self,
        text: &str,
        aspect_scores: Option<&HashMap<String, u8>>,
        history: Option<&EmotionHistory>,
    ) -> EmotionProfile {
        if text.trim().is_empty() {
            return EmotionProfile::neutral();
        }
        let lower = text.to_lowercase();

        let frustration_level = self.frustration_level(&lower);
        let engagement_level = self.engagement_level(&lower);
        let confidence_level = self.confidence_level(&lower);
        let satisfaction_level = self.satisfaction_level(&lower, aspect_scores);

        let frustration_type = self.frustration_type(&lower);
        let frustration_intensity = FrustrationIntensity::from_level(frustration_level);
        let frustration_trend = self.frustration_trend(history);

        let urgency_level = self.urgency_level(&lower);
        let urgency_signals = self.urgency_signals(&lower);
        let response_urgency = self.response_urgency(urgency_level, frustration_level);

        let emotional_temperature = self.emotional_temperature(text, &lower);
        let emotional_volatility = self.emotional_volatility(history);
        let emotional_trajectory = self.emotional_trajectory(history);

        let (hidden_flag, hidden_confidence, hidden_signals) =
            self.hidden_dissatisfaction(&lower, satisfaction_level);
        let politeness_mask_level = self.politeness_mask(&lower, hidden_flag);

        let dropout_risk_emotions = self.dropout_risk_emotions(&lower);
        let positive_recovery_indicators = self.recovery_indicators(&lower);
        let emotional_triggers = self.emotional_triggers(&lower);

        let emotion_coherence = coherence(
            frustration_level,
            engagement_level,
            confidence_level,
            satisfaction_level,
        );
        let sentiment_authenticity = self.authenticity(&lower, hidden_flag);
        let emotional_complexity = self.complexity(&lower);

        EmotionProfile {
            frustration_level,
            engagement_level,
            confidence_level,
            satisfaction_level,
            frustration_type,
            frustration_intensity,
            frustration_trend,
            urgency_level,
            urgency_signals,
            response_urgency,
            emotional_temperature,
            emotional_volatility,
            emotional_trajectory,
            hidden_dissatisfaction_flag: hidden_flag,
            hidden_dissatisfaction_confidence: hidden_confidence,
            hidden_signals,
            politeness_mask_level,
            dropout_risk_emotions,
            positive_recovery_indicators,
            emotional_triggers,
            emotion_coherence,
            sentiment_authenticity,
            emotional_complexity,
        }
    }

    fn frustration_level(&self, lower: &str) -> f64 {
        let mut base_count = count_hits(lower, GENERAL_FRUSTRATION);
        for (_, words) in FRUSTRATION_CATEGORIES {
            base_count += count_hits(lower, words);
        }
        let intensifier_count = count_hits(lower, STRONG_INTENSIFIERS);
        let multiplier = 1.0 + self.tuning.intensifier_bonus * intensifier_count as f64;
        let mut score = (base_count as f64 * self.tuning.lexical_scale * multiplier).min(1.0);

        // Explicit first-person distress dominates the lexical estimate.
        if self.lexicon.explicit_frustration.iter().any(|p| p.is_match(lower)) {
            score = score.max(self.tuning.explicit_frustration_floor);
        }
        score
    }

    fn engagement_level(&self, lower: &str) -> f64 {
        let mut score = weighted_indicator_score(lower, &ENGAGEMENT_INDICATORS);
        if self.lexicon.explicit_engagement_high.is_match(lower) {
            score = score.max(0.8);
        }
        if self.lexicon.explicit_engagement_low.is_match(lower) {
            score = score.min(0.2);
        }
        score
    }

    fn confidence_level(&self, lower: &str) -> f64 {
        let mut score = weighted_indicator_score(lower, &CONFIDENCE_INDICATORS);
        if self.lexicon.explicit_confidence_high.is_match(lower) {
            score = score.max(0.8);
        }
        if self.lexicon.explicit_confidence_low.is_match(lower) {
            score = score.min(0.2);
        }
        score
    }

    fn satisfaction_level(&self, lower: &str, aspect_scores: Option<&HashMap<String, u8>>) -> f64 {
        let pos = count_hits(lower, POSITIVE_SATISFACTION);
        let neg = count_hits(lower, NEGATIVE_SATISFACTION);
        let text_satisfaction = if pos + neg > 0 {
            pos as f64 / (pos + neg) as f64
        } else {
            0.5
        };

        let valid: Vec<f64> = aspect_scores
            .map(|scores| {
                scores
                    .values()
                    .filter(|v| (1..=5).contains(*v))
                    .map(|v| f64::from(*v))
                    .collect()
            })
            .unwrap_or_default();

        if valid.is_empty() {
            return text_satisfaction;
        }
        let mean = valid.iter().sum::<f64>() / valid.len() as f64;
        let aspect_satisfaction = (mean - 1.0) / 4.0;
        clamp01(
            text_satisfaction * self.tuning.text_satisfaction_weight
                + aspect_satisfaction * self.tuning.aspect_satisfaction_weight,
        )
    }

    fn frustration_type(&self, lower: &str) -> FrustrationType {
        let counts: Vec<(FrustrationType, usize)> = FRUSTRATION_CATEGORIES
            .iter()
            .map(|(kind, words)| (*kind, count_hits(lower, words)))
            .collect();
        let total: usize = counts.iter().map(|(_, n)| n).sum();
        if total == 0 {
            return FrustrationType::Mixed;
        }
        let (winner, max) = counts
            .iter()
            .max_by_key(|(_, n)| *n)
            .map(|(kind, n)| (*kind, *n))
            .unwrap_or((FrustrationType::Mixed, 0));
        if max == 0 || total as f64 > max as f64 * self.tuning.type_dominance_ratio {
            FrustrationType::Mixed
        } else {
            winner
        }
    }

    fn frustration_trend(&self, history: Option<&EmotionHistory>) -> Trend {
        let Some(history) = history else { return Trend::Stable };
        if history.len() < 2 {
            return Trend::Stable;
        }
        let recent = history.recent(3);
        let levels: Vec<f64> = recent.iter().map(|e| e.profile.frustration_level).collect();
        let latest = levels[0];
        let prior = &levels[1..];
        let prior_mean = prior.iter().sum::<f64>() / prior.len() as f64;
        let diff = latest - prior_mean;
        if diff > self.tuning.trend_delta {
            Trend::Increasing
        } else if diff < -self.tuning.trend_delta {
            Trend::Decreasing
        } else if prior.iter().any(|v| (latest - v).abs() > self.tuning.spike_delta) {
            Trend::Spiking
        } else {
            Trend::Stable
        }
    }

    fn urgency_level(&self, lower: &str) -> UrgencyLevel {
        for (level, phrases) in URGENCY_PHRASES {
            if phrases.iter().any(|phrase| lower.contains(phrase)) {
                return *level;
            }
        }
        UrgencyLevel::Low
    }

    fn urgency_signals(&self, lower: &str) -> Vec<UrgencySignal> {
        self.lexicon
            .urgency_signal_patterns
            .iter()
            .filter(|(_, pattern)| pattern.is_match(lower))
            .map(|(signal, _)| *signal)
            .collect()
    }

    fn response_urgency(&self, urgency: UrgencyLevel, frustration: f64) -> ResponseUrgency {
        let base = ResponseUrgency::from_urgency(urgency);
        if frustration > self.tuning.urgency_escalation_threshold {
            base.escalated()
        } else {
            base
        }
    }

    fn emotional_temperature(&self, text: &str, lower: &str) -> f64 {
        let hot = count_hits(lower, HOT_EMOTION_WORDS);
        let cold = count_hits(lower, COLD_EMOTION_WORDS);
        let intensifiers = count_hits(lower, TEMPERATURE_INTENSIFIERS);

        let base = if hot + cold == 0 {
            0.5
        } else {
            hot as f64 / (hot + cold) as f64
        };
        let mut temperature = clamp01(base * (1.0 + 0.1 * intensifiers as f64));

        let exclamations = text.chars().filter(|c| *c == '!').count();
        let total_chars = text.chars().count().max(1);
        let caps_ratio =
            text.chars().filter(|c| c.is_uppercase()).count() as f64 / total_chars as f64;

        temperature += (exclamations as f64 * 0.05).min(0.25);
        temperature += (caps_ratio * 0.5).min(0.25);
        temperature.min(1.0)
    }

    fn emotional_volatility(&self, history: Option<&EmotionHistory>) -> f64 {
        let Some(history) = history else { return self.tuning.default_volatility };
        if history.len() < 2 {
            return self.tuning.default_volatility;
        }
        let recent = history.recent(5);
        let mut changes = Vec::new();
        for pair in recent.windows(2) {
            let (current, previous) = (&pair[0].profile, &pair[1].profile);
            changes.push((current.frustration_level - previous.frustration_level).abs());
            changes.push((current.satisfaction_level - previous.satisfaction_level).abs());
            changes.push((current.emotional_temperature - previous.emotional_temperature).abs());
        }
        if changes.is_empty() {
            return self.tuning.default_volatility;
        }
        let mean = changes.iter().sum::<f64>() / changes.len() as f64;
        (mean * self.tuning.volatility_scale).min(1.0)
    }

    fn emotional_trajectory(&self, history: Option<&EmotionHistory>) -> EmotionalTrajectory {
        let Some(history) = history else { return EmotionalTrajectory::Neutral };
        if history.len() < 2 {
            return EmotionalTrajectory::Neutral;
        }
        let recent = history.recent(3);
        let valences: Vec<f64> = recent.iter().map(|e| e.profile.valence()).collect();
        let latest = valences[0];
        let prior = &valences[1..];
        let prior_mean = prior.iter().sum::<f64>() / prior.len() as f64;
        let diff = latest - prior_mean;
        if diff > self.tuning.trend_delta {
            EmotionalTrajectory::Improving
        } else if diff < -self.tuning.trend_delta {
            EmotionalTrajectory::Declining
        } else if prior.iter().any(|v| (latest - v).abs() > self.tuning.spike_delta) {
            EmotionalTrajectory::Fluctuating
        } else {
            EmotionalTrajectory::Neutral
        }
    }

    fn hidden_dissatisfaction(&self, lower: &str, satisfaction: f64) -> (bool, f64, Vec<HiddenSignal>) {
        let mut fired = 0usize;
        let mut signals = Vec::new();
        let add = |signals: &mut Vec<HiddenSignal>, signal: HiddenSignal| {
            if !signals.contains(&signal) {
                signals.push(signal);
            }
        };

        for pattern in &self.lexicon.hedging_patterns {
            if pattern.is_match(lower) {
                fired += 1;
                add(&mut signals, HiddenSignal::HedgedApproval);
            }
        }
        for pattern in &self.lexicon.praise_with_reservations {
            if pattern.is_match(lower) {
                fired += 1;
                add(&mut signals, HiddenSignal::PraiseWithReservations);
            }
        }
        if self.lexicon.faint_praise.is_match(lower) {
            fired += 1;
            add(&mut signals, HiddenSignal::FaintPraise);
        }
        if self.lexicon.diplomatic_language.is_match(lower) {
            fired += 1;
            add(&mut signals, HiddenSignal::DiplomaticLanguage);
        }

        let flag = fired > 0;
        let base = (fired as f64 * self.tuning.hidden_confidence_step)
            .min(self.tuning.hidden_confidence_cap);
        // Signals against an already-low satisfaction confirm each other;
        // signals against glowing satisfaction are weaker evidence.
        let adjustment = if flag && satisfaction > 0.7 {
            -self.tuning.hidden_high_satisfaction_penalty
        } else if flag && satisfaction < 0.4 {
            self.tuning.hidden_low_satisfaction_bonus
        } else {
            0.0
        };
        (flag, clamp01(base + adjustment), signals)
    }

    fn politeness_mask(&self, lower: &str, hidden_flag: bool) -> f64 {
        if !hidden_flag {
            return 0.0;
        }
        let polite_count = count_hits(lower, POLITE_PHRASES);
        let mut mask = (polite_count as f64 * 0.2).min(0.8);
        if self.lexicon.excessive_gratitude.is_match(lower) {
            mask += 0.1;
        }
        if self.lexicon.apology.is_match(lower) {
            mask += 0.15;
        }
        mask.min(1.0)
    }

    fn dropout_risk_emotions(&self, lower: &str) -> Vec<DropoutEmotion> {
        let mut detected = Vec::new();
        for emotion in [
            DropoutEmotion::Helplessness,
            DropoutEmotion::Overwhelm,
            DropoutEmotion::Isolation,
            DropoutEmotion::Despair,
            DropoutEmotion::Frustration,
            DropoutEmotion::Anxiety,
            DropoutEmotion::Hopelessness,
            DropoutEmotion::Defeat,
            DropoutEmotion::Inadequacy,
            DropoutEmotion::Disconnection,
        ] {
            if lower.contains(emotion.keyword()) {
                detected.push(emotion);
            }
        }
        for (emotion, phrases) in DROPOUT_PHRASES {
            if !detected.contains(emotion) && phrases.iter().any(|p| lower.contains(p)) {
                detected.push(*emotion);
            }
        }
        detected
    }

    fn recovery_indicators(&self, lower: &str) -> Vec<RecoveryIndicator> {
        let mut detected = Vec::new();
        for indicator in [
            RecoveryIndicator::Hope,
            RecoveryIndicator::Determination,
            RecoveryIndicator::Gratitude,
            RecoveryIndicator::Optimism,
            RecoveryIndicator::Relief,
            RecoveryIndicator::Confidence,
            RecoveryIndicator::Satisfaction,
            RecoveryIndicator::Enthusiasm,
            RecoveryIndicator::Motivation,
            RecoveryIndicator::Connection,
        ] {
            if lower.contains(indicator.keyword()) {
                detected.push(indicator);
            }
        }
        for (indicator, phrases) in RECOVERY_PHRASES {
            if !detected.contains(indicator) && phrases.iter().any(|p| lower.contains(p)) {
                detected.push(*indicator);
            }
        }
        detected
    }

    fn emotional_triggers(&self, lower: &str) -> Vec<EmotionalTrigger> {
        self.lexicon
            .trigger_patterns
            .iter()
            .filter(|(_, patterns)| patterns.iter().any(|p| p.is_match(lower)))
            .map(|(trigger, _)| *trigger)
            .collect()
    }

    fn authenticity(&self, lower: &str, hidden_flag: bool) -> f64 {
        let mut authenticity = 0.8;
        if hidden_flag {
            authenticity -= 0.3;
        }
        if self.lexicon.authenticity_markers.iter().any(|p| p.is_match(lower)) {
            authenticity += 0.1;
        }
        if self.lexicon.mixed_message_patterns.iter().any(|p| p.is_match(lower)) {
            authenticity -= 0.15;
        }
        clamp01(authenticity)
    }

    fn complexity(&self, lower: &str) -> EmotionalComplexity {
        let distinct = count_hits(lower, EMOTION_WORDS);
        let has_positive = POSITIVE_EMOTION_WORDS.iter().any(|w| lower.contains(w));
        let has_negative = NEGATIVE_EMOTION_WORDS.iter().any(|w| lower.contains(w));
        let contradiction = has_positive && has_negative;
        let explicit_conflict = self.lexicon.mixed_feelings_patterns.iter().any(|p| p.is_match(lower));

        if explicit_conflict || (contradiction && distinct >= 3) {
            EmotionalComplexity::Conflicted
        } else if distinct >= 4 || (contradiction && distinct >= 2) {
            EmotionalComplexity::Complex
        } else if distinct >= 2 {
            EmotionalComplexity::Mixed
        } else {
            EmotionalComplexity::Simple
        }
    }
}

fn weighted_indicator_score(lower: &str, indicators: &crate::lexicon::IndicatorSet) -> f64 {
    let high = count_hits(lower, indicators.high);
    let medium = count_hits(lower, indicators.medium);
    let low = count_hits(lower, indicators.low);
    let total = high + medium + low;
    if total == 0 {
        return 0.5;
    }
    (high as f64 * 0.9 + medium as f64 * 0.5 + low as f64 * 0.1) / total as f64
}

/// Consistency of the four primary levels. High frustration with high
/// satisfaction, or engagement far from confidence, lowers coherence.
/// The frustration + satisfaction ~ 1 relationship is a heuristic only.
fn coherence(frustration: f64, engagement: f64, confidence: f64, satisfaction: f64) -> f64 {
    let valence_alignment = 1.0 - ((1.0 - satisfaction) - frustration).abs();
    let drive_alignment = 1.0 - (engagement - confidence).abs();
    clamp01(valence_alignment * 0.6 + drive_alignment * 0.4)
}
