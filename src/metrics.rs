use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing enrichment activity.
#[derive(Default)]
pub struct EnrichmentMetrics {
    runs_started: AtomicU64,
    runs_completed: AtomicU64,
    runs_failed: AtomicU64,
    questions_inserted: AtomicU64,
    questions_dropped: AtomicU64,
    degraded_summaries: AtomicU64,
    empty_question_sets: AtomicU64,
}

impl EnrichmentMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of a pipeline run.
    pub fn record_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a run that reached `completed`, with the number of questions it persisted.
    pub fn record_completed(&self, questions_inserted: u64) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
        self.questions_inserted
            .fetch_add(questions_inserted, Ordering::Relaxed);
    }

    /// Record a run that ended `failed`.
    pub fn record_failed(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record generated questions rejected by shape validation.
    pub fn record_dropped_questions(&self, count: u64) {
        self.questions_dropped.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a summary that fell back to the raw backend text.
    pub fn record_degraded_summary(&self) {
        self.degraded_summaries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a question response that could not be parsed at all.
    pub fn record_empty_question_set(&self) {
        self.empty_question_sets.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            questions_inserted: self.questions_inserted.load(Ordering::Relaxed),
            questions_dropped: self.questions_dropped.load(Ordering::Relaxed),
            degraded_summaries: self.degraded_summaries.load(Ordering::Relaxed),
            empty_question_sets: self.empty_question_sets.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of enrichment counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Runs accepted since startup.
    pub runs_started: u64,
    /// Runs that ended with the document `completed`.
    pub runs_completed: u64,
    /// Runs that ended with the document `failed`.
    pub runs_failed: u64,
    /// Question rows written to the store.
    pub questions_inserted: u64,
    /// Generated questions discarded because of a malformed shape.
    pub questions_dropped: u64,
    /// Summaries that used the raw-text fallback.
    pub degraded_summaries: u64,
    /// Question responses that yielded no parsable items.
    pub empty_question_sets: u64,
}
