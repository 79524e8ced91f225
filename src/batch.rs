//! Bounded-concurrency fan-out over independent feedback items.
//!
//! The core computations are synchronous and CPU-bound; concurrency lives
//! only here. Results come back in input order, per-item failures never
//! abort siblings, a batch deadline degrades items to `TimedOut`, and
//! cancellation reaches not-yet-started items without touching completed
//! results.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::analyzer::EmotionAnalyzer;
use crate::ingest::{self, FeedbackRow};
use crate::profile::{EmotionHistory, EmotionProfile};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub max_concurrency: usize,
    pub timeout: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self { max_concurrency: 4, timeout: Duration::from_secs(30) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchItemError {
    /// The item failed shape validation before any analysis ran.
    Invalid(String),
    /// The batch deadline passed before this item completed.
    TimedOut,
    /// The batch was cancelled before this item started.
    Cancelled,
    /// The worker failed mid-computation.
    Failed(String),
}

impl fmt::Display for BatchItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(reason) => write!(f, "invalid item: {reason}"),
            Self::TimedOut => write!(f, "batch deadline passed before item completed"),
            Self::Cancelled => write!(f, "batch cancelled before item started"),
            Self::Failed(reason) => write!(f, "worker failed: {reason}"),
        }
    }
}

impl std::error::Error for BatchItemError {}

/// Run `work` over every item with bounded concurrency. The result vector
/// lines up index-for-index with the input regardless of completion order.
pub async fn process_batch<T, R, F>(
    items: Vec<T>,
    options: &BatchOptions,
    cancel: &CancellationToken,
    work: F,
) -> Vec<Result<R, BatchItemError>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Result<R, BatchItemError> + Send + Sync + 'static,
{
    let total = items.len();
    if total == 0 {
        return Vec::new();
    }
    debug!(total, max_concurrency = options.max_concurrency, "starting batch");

    let semaphore = Arc::new(Semaphore::new(options.max_concurrency.max(1)));
    let work = Arc::new(work);
    let mut join_set = JoinSet::new();

    for (index, item) in items.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let work = Arc::clone(&work);
        let cancel = cancel.clone();
        join_set.spawn(async move {
            let permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return (index, Err(BatchItemError::Cancelled)),
            };
            if cancel.is_cancelled() {
                return (index, Err(BatchItemError::Cancelled));
            }
            let result = tokio::task::spawn_blocking(move || (*work)(item))
                .await
                .unwrap_or_else(|join_error| Err(BatchItemError::Failed(join_error.to_string())));
            drop(permit);
            (index, result)
        });
    }

    let mut results: Vec<Option<Result<R, BatchItemError>>> =
        (0..total).map(|_| None).collect();
    let deadline = tokio::time::sleep(options.timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => {
                warn!(total, "batch deadline reached, remaining items reported incomplete");
                cancel.cancel();
                break;
            }
            joined = join_set.join_next() => match joined {
                Some(Ok((index, result))) => results[index] = Some(result),
                Some(Err(join_error)) => {
                    warn!(error = %join_error, "batch worker task failed to join");
                }
                None => break,
            }
        }
    }
    join_set.abort_all();

    results
        .into_iter()
        .map(|slot| slot.unwrap_or(Err(BatchItemError::TimedOut)))
        .collect()
}

/// Score independent feedback rows. Each row is validated, then analyzed
/// without history context; results keep the input order.
pub async fn analyze_rows(
    analyzer: Arc<EmotionAnalyzer>,
    rows: Vec<FeedbackRow>,
    options: &BatchOptions,
    cancel: &CancellationToken,
) -> Vec<Result<EmotionProfile, BatchItemError>> {
    process_batch(rows, options, cancel, move |row| {
        ingest::validate_row(&row).map_err(BatchItemError::Invalid)?;
        let aspects = ingest::aspect_scores(&row);
        Ok(analyzer.analyze(&row.comments, Some(&aspects), None))
    })
    .await
}

/// Build per-(student, course) histories in parallel across groups. Weeks
/// within a group fold sequentially so each profile sees its predecessors;
/// rows failing validation are skipped with a warning rather than sinking
/// the whole group.
pub async fn analyze_cohort(
    analyzer: Arc<EmotionAnalyzer>,
    groups: Vec<((String, String), Vec<FeedbackRow>)>,
    options: &BatchOptions,
    cancel: &CancellationToken,
) -> Vec<Result<EmotionHistory, BatchItemError>> {
    process_batch(groups, options, cancel, move |((student_id, course_id), mut rows)| {
        rows.sort_by_key(|row| row.week_number);
        let mut history = EmotionHistory::new(student_id, course_id);
        for row in rows {
            if let Err(reason) = ingest::validate_row(&row) {
                warn!(
                    student_id = %history.student_id,
                    course_id = %history.course_id,
                    week = row.week_number,
                    %reason,
                    "skipping invalid feedback row"
                );
                continue;
            }
            let aspects = ingest::aspect_scores(&row);
            let profile = analyzer.analyze(&row.comments, Some(&aspects), Some(&history));
            history.push(row.week_number, profile);
        }
        Ok(history)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(student: &str, week: u32, text: &str) -> FeedbackRow {
        FeedbackRow {
            student_id: student.to_string(),
            course_id: "c1".to_string(),
            week_number: week,
            nps_score: Some(7),
            lms_usability_score: Some(4),
            instructor_quality_score: Some(4),
            content_difficulty_score: Some(3),
            support_quality_score: Some(4),
            course_pace_score: Some(3),
            comments: text.to_string(),
            completion_status: None,
            successful_interventions: None,
        }
    }

    #[tokio::test]
    async fn results_keep_input_order_under_concurrency() {
        let options = BatchOptions { max_concurrency: 8, timeout: Duration::from_secs(10) };
        let cancel = CancellationToken::new();
        let items: Vec<usize> = (0..32).collect();
        let results = process_batch(items, &options, &cancel, |n| {
            // Later items finish first.
            std::thread::sleep(Duration::from_millis((32 - n as u64) % 8));
            Ok(n * 2)
        })
        .await;

        let values: Vec<usize> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, (0..32).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn item_failures_do_not_abort_siblings() {
        let options = BatchOptions::default();
        let cancel = CancellationToken::new();
        let results = process_batch((0..5).collect(), &options, &cancel, |n: usize| {
            if n == 2 {
                Err(BatchItemError::Failed("boom".to_string()))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(results.len(), 5);
        assert!(results[2].is_err());
        for (index, result) in results.iter().enumerate() {
            if index != 2 {
                assert_eq!(*result, Ok(index));
            }
        }
    }

    #[tokio::test]
    async fn out_of_range_aspect_score_is_an_item_error_not_a_batch_failure() {
        let analyzer = Arc::new(EmotionAnalyzer::new());
        let mut rows: Vec<FeedbackRow> = (1..=5)
            .map(|week| row("s1", week, "the material is helpful"))
            .collect();
        rows[2].instructor_quality_score = Some(9);

        let options = BatchOptions::default();
        let cancel = CancellationToken::new();
        let results = analyze_rows(analyzer, rows, &options, &cancel).await;

        assert_eq!(results.len(), 5);
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 4);
        assert!(matches!(results[2], Err(BatchItemError::Invalid(_))));
    }

    #[tokio::test]
    async fn deadline_reports_unfinished_items_as_timed_out() {
        let options = BatchOptions {
            max_concurrency: 1,
            timeout: Duration::from_millis(100),
        };
        let cancel = CancellationToken::new();
        let results = process_batch((0..3).collect(), &options, &cancel, |n: usize| {
            std::thread::sleep(Duration::from_secs(2));
            Ok(n)
        })
        .await;

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.is_err()));
        assert!(results.iter().any(|r| *r == Err(BatchItemError::TimedOut)));
    }

    #[tokio::test]
    async fn cancelled_batch_reports_every_unstarted_item() {
        let options = BatchOptions::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let results = process_batch((0..4).collect(), &options, &cancel, |n: usize| Ok(n)).await;
        assert!(results.iter().all(|r| *r == Err(BatchItemError::Cancelled)));
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let options = BatchOptions::default();
        let cancel = CancellationToken::new();
        let results: Vec<Result<usize, _>> =
            process_batch(Vec::new(), &options, &cancel, |n: usize| Ok(n)).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn cohort_groups_fold_history_in_week_order() {
        let analyzer = Arc::new(EmotionAnalyzer::new());
        let groups = vec![(
            ("s1".to_string(), "c1".to_string()),
            vec![
                row("s1", 3, "I'm extremely frustrated, this is urgent"),
                row("s1", 1, "the material is helpful"),
                row("s1", 2, "okay but somewhat helpful I guess"),
            ],
        )];
        let options = BatchOptions::default();
        let cancel = CancellationToken::new();
        let results = analyze_cohort(analyzer, groups, &options, &cancel).await;

        assert_eq!(results.len(), 1);
        let history = results[0].as_ref().unwrap();
        let weeks: Vec<u32> = history.sorted_by_week().iter().map(|e| e.week_number).collect();
        assert_eq!(weeks, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn cohort_skips_invalid_rows_without_losing_the_group() {
        let analyzer = Arc::new(EmotionAnalyzer::new());
        let mut bad = row("s1", 2, "fine");
        bad.course_pace_score = Some(0);
        let groups = vec![(
            ("s1".to_string(), "c1".to_string()),
            vec![row("s1", 1, "helpful"), bad, row("s1", 3, "still helpful")],
        )];
        let options = BatchOptions::default();
        let cancel = CancellationToken::new();
        let results = analyze_cohort(analyzer, groups, &options, &cancel).await;

        let history = results[0].as_ref().unwrap();
        assert_eq!(history.len(), 2);
    }
}
