use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{ArgGroup, Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use course_emotion_engine::analyzer::EmotionAnalyzer;
use course_emotion_engine::batch::{self, BatchOptions};
use course_emotion_engine::ingest::{self, FeedbackRow};
use course_emotion_engine::report::{self, StudentReport};
use course_emotion_engine::trajectory::{self, TrajectoryPrediction};

#[derive(Parser)]
#[command(name = "course-emotion-engine")]
#[command(about = "Emotion early warning engine for weekly course feedback", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one feedback text into an emotion profile
    Analyze {
        text: String,
        /// Aspect scores as JSON, e.g. '{"course_pace_score":2}'
        #[arg(long)]
        aspects: Option<String>,
    },
    /// Score a feedback CSV export and list the highest-risk rows
    Score {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value_t = 4)]
        workers: usize,
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Predict per-student emotional trajectories from a feedback CSV
    #[command(group(
        ArgGroup::new("scope")
            .args(["course", "student"])
            .multiple(false)
    ))]
    Trajectory {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        course: Option<String>,
        #[arg(long)]
        student: Option<String>,
    },
    /// Generate a markdown cohort report
    #[command(group(
        ArgGroup::new("scope")
            .args(["course", "student"])
            .multiple(false)
    ))]
    Report {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        course: Option<String>,
        #[arg(long)]
        student: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[derive(Serialize)]
struct StudentPrediction {
    student_id: String,
    course_id: String,
    prediction: TrajectoryPrediction,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let analyzer = Arc::new(EmotionAnalyzer::new());

    match cli.command {
        Commands::Analyze { text, aspects } => {
            let aspect_scores: Option<HashMap<String, u8>> = aspects
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .context("aspects must be a JSON object of integer scores")?;
            let profile = analyzer.analyze(&text, aspect_scores.as_ref(), None);
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Commands::Score { csv, workers, timeout_secs, limit } => {
            let rows = ingest::read_rows(&csv)?;
            let labels: Vec<(String, u32)> = rows
                .iter()
                .map(|row| (row.student_id.clone(), row.week_number))
                .collect();
            let options = BatchOptions {
                max_concurrency: workers,
                timeout: Duration::from_secs(timeout_secs),
            };
            let cancel = CancellationToken::new();
            let results = batch::analyze_rows(Arc::clone(&analyzer), rows, &options, &cancel).await;

            let mut scored = Vec::new();
            let mut failures = Vec::new();
            for (result, (student_id, week)) in results.into_iter().zip(labels) {
                match result {
                    Ok(profile) => scored.push((student_id, week, profile)),
                    Err(error) => failures.push((student_id, week, error)),
                }
            }
            scored.sort_by(|a, b| {
                b.2.frustration_level
                    .partial_cmp(&a.2.frustration_level)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            println!("Highest risk feedback rows:");
            for (student_id, week, profile) in scored.iter().take(limit) {
                println!(
                    "- {student_id} week {week}: frustration {:.2} ({}), urgency {}, hidden dissatisfaction {}",
                    profile.frustration_level,
                    profile.frustration_intensity,
                    profile.urgency_level,
                    if profile.hidden_dissatisfaction_flag { "yes" } else { "no" },
                );
            }
            if !failures.is_empty() {
                println!("{} rows could not be scored:", failures.len());
                for (student_id, week, error) in failures {
                    println!("- {student_id} week {week}: {error}");
                }
            }
        }
        Commands::Trajectory { csv, course, student } => {
            let students =
                score_cohort(&analyzer, &csv, course.as_deref(), student.as_deref()).await?;
            let predictions: Vec<StudentPrediction> = students
                .into_iter()
                .map(|s| StudentPrediction {
                    student_id: s.history.student_id.clone(),
                    course_id: s.history.course_id.clone(),
                    prediction: s.prediction,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&predictions)?);
        }
        Commands::Report { csv, course, student, out } => {
            let students =
                score_cohort(&analyzer, &csv, course.as_deref(), student.as_deref()).await?;
            let patterns = report::cohort_patterns(&students);
            let rendered = report::build_report(
                course.as_deref().or(student.as_deref()),
                &students,
                patterns.as_ref(),
                Utc::now().date_naive(),
            );
            std::fs::write(&out, rendered)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

async fn score_cohort(
    analyzer: &Arc<EmotionAnalyzer>,
    csv: &PathBuf,
    course: Option<&str>,
    student: Option<&str>,
) -> anyhow::Result<Vec<StudentReport>> {
    let mut rows = ingest::read_rows(csv)?;
    if let Some(course) = course {
        rows.retain(|row: &FeedbackRow| row.course_id == course);
    } else if let Some(student) = student {
        rows.retain(|row: &FeedbackRow| row.student_id == student);
    }

    let groups = ingest::group_rows(rows);
    let outcomes: Vec<_> = groups
        .iter()
        .map(|(_, rows)| ingest::historical_outcome(rows))
        .collect();

    let options = BatchOptions::default();
    let cancel = CancellationToken::new();
    let results = batch::analyze_cohort(Arc::clone(analyzer), groups, &options, &cancel).await;

    let as_of = Utc::now().date_naive();
    let mut students = Vec::new();
    for (result, outcome) in results.into_iter().zip(outcomes) {
        match result {
            Ok(history) => {
                let prediction = trajectory::predict_as_of(&history, as_of);
                students.push(StudentReport { history, prediction, outcome });
            }
            Err(error) => {
                tracing::warn!(%error, "skipping student group");
            }
        }
    }
    Ok(students)
}
