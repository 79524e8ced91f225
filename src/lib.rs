//! Emotion intelligence engine for weekly student feedback.
//!
//! Three pure cores: text analysis into an [`profile::EmotionProfile`],
//! trajectory forecasting over a weekly [`profile::EmotionHistory`], and
//! pattern signature/similarity matching against historical profiles.
//! Concurrency exists only at the batch fan-out boundary in [`batch`];
//! persistence, transport and retrieval of candidates belong to callers.

pub mod analyzer;
pub mod batch;
pub mod fit;
pub mod ingest;
pub mod lexicon;
pub mod pattern;
pub mod profile;
pub mod report;
pub mod trajectory;

pub use analyzer::{EmotionAnalyzer, Tuning};
pub use batch::{BatchItemError, BatchOptions};
pub use pattern::{cluster, predict_outcomes, signature, similarity, SimilarityCache};
pub use profile::{EmotionHistory, EmotionProfile};
pub use trajectory::{predict, predict_as_of, TrajectoryPrediction};
