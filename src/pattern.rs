//! Pattern signatures, similarity scoring and clustering over emotion
//! profiles, plus outcome prediction from historical cluster membership.
//!
//! Candidate historical profiles arrive from an external similarity-search
//! collaborator; everything here is pure computation over those values.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::profile::EmotionProfile;

/// Quantized, deterministic encoding of a profile's key dimensions.
///
/// Structurally identical profiles produce byte-identical signatures. Used
/// only for coarse bucketing, never parsed back into a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSignature {
    pub frustration: f64,
    pub engagement: f64,
    pub confidence: f64,
    pub satisfaction: f64,
    pub temperature: f64,
    pub volatility: f64,
    pub hidden: bool,
    pub urgency_rank: f64,
    pub frustration_code: String,
    pub trajectory_rank: f64,
}

fn quantize(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn signature(profile: &EmotionProfile) -> PatternSignature {
    PatternSignature {
        frustration: quantize(profile.frustration_level),
        engagement: quantize(profile.engagement_level),
        confidence: quantize(profile.confidence_level),
        satisfaction: quantize(profile.satisfaction_level),
        temperature: quantize(profile.emotional_temperature),
        volatility: quantize(profile.emotional_volatility),
        hidden: profile.hidden_dissatisfaction_flag,
        urgency_rank: profile.urgency_level.rank(),
        frustration_code: profile.frustration_type.code().to_string(),
        trajectory_rank: profile.emotional_trajectory.rank(),
    }
}

impl fmt::Display for PatternSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "f{:.2}_e{:.2}_c{:.2}_s{:.2}_t{:.2}_v{:.2}_h{}_u{:.1}_ft{}_tr{:.1}",
            self.frustration,
            self.engagement,
            self.confidence,
            self.satisfaction,
            self.temperature,
            self.volatility,
            u8::from(self.hidden),
            self.urgency_rank,
            self.frustration_code,
            self.trajectory_rank,
        )
    }
}

impl PatternSignature {
    const FIELD_COUNT: usize = 10;
    /// Numeric closeness tolerance for component matching.
    const NUMERIC_TOLERANCE: f64 = 0.2;
    /// Share of components that must match for two signatures to bucket
    /// together.
    const MATCH_RATIO: f64 = 0.7;

    /// Component-wise match: numeric fields within tolerance, categorical
    /// fields exact, at least 70% of fields close.
    pub fn matches(&self, other: &Self) -> bool {
        let numeric = [
            (self.frustration, other.frustration),
            (self.engagement, other.engagement),
            (self.confidence, other.confidence),
            (self.satisfaction, other.satisfaction),
            (self.temperature, other.temperature),
            (self.volatility, other.volatility),
            (f64::from(u8::from(self.hidden)), f64::from(u8::from(other.hidden))),
            (self.urgency_rank, other.urgency_rank),
        ];
        let mut matched = numeric
            .iter()
            .filter(|(a, b)| (a - b).abs() <= Self::NUMERIC_TOLERANCE)
            .count();
        if self.frustration_code == other.frustration_code {
            matched += 1;
        }
        if self.trajectory_rank == other.trajectory_rank {
            matched += 1;
        }
        matched as f64 / Self::FIELD_COUNT as f64 >= Self::MATCH_RATIO
    }
}

/// Component weights of the similarity score. The defaults sum to 1 so a
/// profile is always fully similar to itself.
#[derive(Debug, Clone)]
pub struct SimilarityWeights {
    pub primary_emotions: f64,
    pub temperature_volatility: f64,
    pub hidden_dissatisfaction: f64,
    pub urgency: f64,
    pub trajectory: f64,
    pub frustration_type: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            primary_emotions: 0.4,
            temperature_volatility: 0.2,
            hidden_dissatisfaction: 0.15,
            urgency: 0.15,
            trajectory: 0.05,
            frustration_type: 0.05,
        }
    }
}

pub fn similarity(a: &EmotionProfile, b: &EmotionProfile) -> f64 {
    similarity_with(a, b, &SimilarityWeights::default())
}

/// Weighted similarity in [0, 1]. Reflexive (`similarity(a, a) == 1`) and
/// symmetric.
pub fn similarity_with(a: &EmotionProfile, b: &EmotionProfile, weights: &SimilarityWeights) -> f64 {
    let primary_diff = ((a.frustration_level - b.frustration_level).abs()
        + (a.engagement_level - b.engagement_level).abs()
        + (a.confidence_level - b.confidence_level).abs()
        + (a.satisfaction_level - b.satisfaction_level).abs())
        / 4.0;
    let temp_vol_diff = ((a.emotional_temperature - b.emotional_temperature).abs()
        + (a.emotional_volatility - b.emotional_volatility).abs())
        / 2.0;

    let primary_sim = 1.0 - primary_diff;
    let temp_vol_sim = 1.0 - temp_vol_diff;
    let hidden_sim = if a.hidden_dissatisfaction_flag == b.hidden_dissatisfaction_flag {
        1.0
    } else {
        0.0
    };
    let urgency_sim = 1.0 - (a.urgency_level.rank() - b.urgency_level.rank()).abs();
    let trajectory_sim = if a.emotional_trajectory == b.emotional_trajectory { 1.0 } else { 0.0 };
    let type_sim = if a.frustration_type == b.frustration_type { 1.0 } else { 0.0 };

    weights.primary_emotions * primary_sim
        + weights.temperature_volatility * temp_vol_sim
        + weights.hidden_dissatisfaction * hidden_sim
        + weights.urgency * urgency_sim
        + weights.trajectory * trajectory_sim
        + weights.frustration_type * type_sim
}

/// Outcome metadata carried alongside a matched historical profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalOutcome {
    pub completion_status: CompletionStatus,
    pub successful_interventions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Completed,
    Dropped,
    InProgress,
    Unknown,
}

impl CompletionStatus {
    /// Permissive parse of caller-supplied status labels.
    pub fn parse(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        if lower.starts_with("dropped") {
            Self::Dropped
        } else if lower.starts_with("completed") {
            Self::Completed
        } else if lower.starts_with("in_progress") || lower.starts_with("active") {
            Self::InProgress
        } else {
            Self::Unknown
        }
    }
}

/// One candidate historical profile with its similarity to the query state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub student_id: String,
    pub profile: EmotionProfile,
    pub similarity_score: f64,
    pub outcome: Option<HistoricalOutcome>,
}

/// Transient group of mutually similar matches; recomputed per query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternCluster {
    pub cluster_id: usize,
    pub representative: PatternSignature,
    pub members: Vec<PatternMatch>,
    pub average_similarity: f64,
}

/// Greedy single-link clustering in input order. Every input lands in
/// exactly one cluster; clusters keep the order they were opened in.
pub fn cluster(matches: &[PatternMatch]) -> Vec<PatternCluster> {
    let signatures: Vec<PatternSignature> = matches.iter().map(|m| signature(&m.profile)).collect();
    let mut clustered = vec![false; matches.len()];
    let mut clusters = Vec::new();

    for i in 0..matches.len() {
        if clustered[i] {
            continue;
        }
        clustered[i] = true;
        let mut members = vec![matches[i].clone()];
        for j in (i + 1)..matches.len() {
            if !clustered[j] && signatures[i].matches(&signatures[j]) {
                clustered[j] = true;
                members.push(matches[j].clone());
            }
        }
        let average_similarity =
            members.iter().map(|m| m.similarity_score).sum::<f64>() / members.len() as f64;
        clusters.push(PatternCluster {
            cluster_id: clusters.len() + 1,
            representative: signatures[i].clone(),
            members,
            average_similarity,
        });
    }
    clusters
}

/// Aggregate outcome statistics across clusters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomePrediction {
    pub dropout_risk: f64,
    pub intervention_success_probability: f64,
    pub recommended_interventions: Vec<String>,
}

/// Weight each cluster by `member_count x average_similarity`, average the
/// per-cluster dropout fractions, and take the complement as intervention
/// success probability. Empty input yields the zeroed default.
pub fn predict_outcomes(clusters: &[PatternCluster]) -> OutcomePrediction {
    if clusters.is_empty() {
        return OutcomePrediction::default();
    }

    let mut total_weight = 0.0;
    let mut weighted_dropout = 0.0;
    let mut recommended: Vec<String> = Vec::new();

    for cluster in clusters {
        let weight = cluster.members.len() as f64 * cluster.average_similarity;
        total_weight += weight;

        let dropped = cluster
            .members
            .iter()
            .filter(|m| {
                m.outcome
                    .as_ref()
                    .is_some_and(|o| o.completion_status == CompletionStatus::Dropped)
            })
            .count();
        weighted_dropout += dropped as f64 / cluster.members.len() as f64 * weight;

        for member in &cluster.members {
            if let Some(outcome) = &member.outcome {
                for intervention in &outcome.successful_interventions {
                    if !recommended.contains(intervention) {
                        recommended.push(intervention.clone());
                    }
                }
            }
        }
    }

    let dropout_risk = if total_weight > 0.0 { weighted_dropout / total_weight } else { 0.0 };
    OutcomePrediction {
        dropout_risk,
        intervention_success_probability: 1.0 - dropout_risk,
        recommended_interventions: recommended,
    }
}

/// Memoizes pairwise similarity keyed by unordered signature pair. Purely
/// an optimization layer: presence or absence never changes any score.
#[derive(Debug, Default)]
pub struct SimilarityCache {
    entries: HashMap<(String, String), f64>,
}

impl SimilarityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn similarity(&mut self, a: &EmotionProfile, b: &EmotionProfile) -> f64 {
        let mut key = (signature(a).to_string(), signature(b).to_string());
        if key.0 > key.1 {
            std::mem::swap(&mut key.0, &mut key.1);
        }
        if let Some(score) = self.entries.get(&key) {
            return *score;
        }
        let score = similarity(a, b);
        self.entries.insert(key, score);
        score
    }
}

/// Re-score candidate matches against the current profile.
pub fn score_matches(
    current: &EmotionProfile,
    matches: &mut [PatternMatch],
    cache: &mut SimilarityCache,
) {
    for candidate in matches.iter_mut() {
        candidate.similarity_score = cache.similarity(current, &candidate.profile);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{EmotionalTrajectory, FrustrationType, UrgencyLevel};

    fn base_profile() -> EmotionProfile {
        EmotionProfile {
            frustration_level: 0.62,
            engagement_level: 0.41,
            satisfaction_level: 0.35,
            frustration_type: FrustrationType::Technical,
            urgency_level: UrgencyLevel::High,
            emotional_trajectory: EmotionalTrajectory::Declining,
            ..EmotionProfile::neutral()
        }
    }

    fn matched(id: &str, profile: EmotionProfile, score: f64) -> PatternMatch {
        PatternMatch { student_id: id.to_string(), profile, similarity_score: score, outcome: None }
    }

    fn with_outcome(m: PatternMatch, status: CompletionStatus, interventions: &[&str]) -> PatternMatch {
        PatternMatch {
            outcome: Some(HistoricalOutcome {
                completion_status: status,
                successful_interventions: interventions.iter().map(|s| s.to_string()).collect(),
            }),
            ..m
        }
    }

    #[test]
    fn identical_profiles_share_a_byte_identical_signature() {
        let a = signature(&base_profile());
        let b = signature(&base_profile());
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn signature_encoding_is_stable() {
        let rendered = signature(&EmotionProfile::neutral()).to_string();
        assert_eq!(rendered, "f0.50_e0.50_c0.50_s0.50_t0.50_v0.30_h0_u0.2_ftmix_tr0.5");
    }

    #[test]
    fn signature_survives_profile_serde_round_trip() {
        let profile = base_profile();
        let json = serde_json::to_string(&profile).unwrap();
        let restored: EmotionProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(signature(&profile).to_string(), signature(&restored).to_string());
    }

    #[test]
    fn similarity_is_reflexive_and_symmetric() {
        let a = base_profile();
        let b = EmotionProfile {
            frustration_level: 0.2,
            satisfaction_level: 0.8,
            hidden_dissatisfaction_flag: true,
            ..EmotionProfile::neutral()
        };
        assert!((similarity(&a, &a) - 1.0).abs() < 1e-9);
        assert!((similarity(&b, &b) - 1.0).abs() < 1e-9);
        assert!((similarity(&a, &b) - similarity(&b, &a)).abs() < 1e-9);
    }

    #[test]
    fn frustration_type_alone_separates_but_only_slightly() {
        let a = base_profile();
        let b = EmotionProfile { frustration_type: FrustrationType::Content, ..base_profile() };
        let score = similarity(&a, &b);
        assert!(score < 1.0);
        assert!(score > 0.8);
    }

    #[test]
    fn clustering_partitions_the_input_exactly() {
        let near = EmotionProfile { frustration_level: 0.6, ..base_profile() };
        let far = EmotionProfile {
            frustration_level: 0.05,
            engagement_level: 0.95,
            satisfaction_level: 0.95,
            emotional_temperature: 0.1,
            urgency_level: UrgencyLevel::Low,
            emotional_trajectory: EmotionalTrajectory::Improving,
            hidden_dissatisfaction_flag: true,
            ..EmotionProfile::neutral()
        };
        let matches = vec![
            matched("a", base_profile(), 0.9),
            matched("b", near, 0.8),
            matched("c", far, 0.4),
        ];
        let clusters = cluster(&matches);

        let total: usize = clusters.iter().map(|c| c.members.len()).sum();
        assert_eq!(total, matches.len());
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].cluster_id, 1);
        assert_eq!(clusters[1].cluster_id, 2);
        assert_eq!(clusters[0].members.len(), 2);
        assert!((clusters[0].average_similarity - 0.85).abs() < 1e-9);
        assert_eq!(clusters[1].members[0].student_id, "c");
    }

    #[test]
    fn empty_input_clusters_to_nothing() {
        assert!(cluster(&[]).is_empty());
        assert_eq!(predict_outcomes(&[]), OutcomePrediction::default());
    }

    #[test]
    fn outcome_prediction_weights_clusters_and_dedupes_interventions() {
        let dropped = with_outcome(
            matched("a", base_profile(), 0.9),
            CompletionStatus::Dropped,
            &["tutor_session"],
        );
        let completed = with_outcome(
            matched("b", base_profile(), 0.9),
            CompletionStatus::Completed,
            &["tutor_session", "pace_adjustment"],
        );
        let clusters = cluster(&[dropped, completed]);
        assert_eq!(clusters.len(), 1);

        let outcomes = predict_outcomes(&clusters);
        assert!((outcomes.dropout_risk - 0.5).abs() < 1e-9);
        assert!((outcomes.intervention_success_probability - 0.5).abs() < 1e-9);
        assert_eq!(
            outcomes.recommended_interventions,
            vec!["tutor_session".to_string(), "pace_adjustment".to_string()]
        );
    }

    #[test]
    fn members_without_outcomes_count_as_retained() {
        let matches = vec![
            with_outcome(matched("a", base_profile(), 1.0), CompletionStatus::Dropped, &[]),
            matched("b", base_profile(), 1.0),
            matched("c", base_profile(), 1.0),
            matched("d", base_profile(), 1.0),
        ];
        let clusters = cluster(&matches);
        let outcomes = predict_outcomes(&clusters);
        assert!((outcomes.dropout_risk - 0.25).abs() < 1e-9);
    }

    #[test]
    fn completion_status_parses_permissively() {
        assert_eq!(CompletionStatus::parse("dropped_week_6"), CompletionStatus::Dropped);
        assert_eq!(CompletionStatus::parse("Completed"), CompletionStatus::Completed);
        assert_eq!(CompletionStatus::parse("active"), CompletionStatus::InProgress);
        assert_eq!(CompletionStatus::parse("???"), CompletionStatus::Unknown);
    }

    #[test]
    fn cache_never_changes_scores_and_collapses_symmetric_pairs() {
        let a = base_profile();
        let b = EmotionProfile { frustration_level: 0.2, ..base_profile() };
        let mut cache = SimilarityCache::new();

        let ab = cache.similarity(&a, &b);
        let ba = cache.similarity(&b, &a);
        assert_eq!(ab, ba);
        assert_eq!(cache.len(), 1);
        assert!((ab - similarity(&a, &b)).abs() < 1e-12);
    }

    #[test]
    fn score_matches_rescales_against_current_state() {
        let current = base_profile();
        let mut matches = vec![
            matched("a", base_profile(), 0.0),
            matched("b", EmotionProfile::neutral(), 0.0),
        ];
        let mut cache = SimilarityCache::new();
        score_matches(&current, &mut matches, &mut cache);
        assert!((matches[0].similarity_score - 1.0).abs() < 1e-9);
        assert!(matches[1].similarity_score < 1.0);
    }
}
