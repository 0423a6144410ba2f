use crate::session::{OutcomeEntry, SessionStatus, TypingSession};
use crate::util::{mean, ratio, std_dev};
use itertools::{Itertools, MinMaxResult};
use serde::Serialize;

const CHARS_PER_WORD: f64 = 5.0;
const MS_PER_MINUTE: f64 = 60_000.0;

/// Summary of a finished (or abandoned) session, computed once from its outcome log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatistics {
    pub status: SessionStatus,
    pub target_len: usize,
    pub cursor: usize,
    pub total_duration_ms: u64,
    pub total_key_count: usize,
    pub correct_count: usize,
    pub incorrect_count: usize,
    pub backspace_count: usize,
    pub accuracy_percent: f64,
    pub wpm_correct: f64,
    pub cpm_correct: f64,
    pub wpm_total: f64,
    pub cpm_total: f64,
    pub min_interval_ms: u64,
    pub avg_interval_ms: f64,
    pub max_interval_ms: u64,
    pub interval_std_dev_ms: f64,
}

pub fn summarize(session: &TypingSession) -> SessionStatistics {
    let log = session.log();
    let correct_count = session.correct_count();
    let incorrect_count = session.incorrect_count();

    let total_duration_ms = log.last().map_or(0, |e| e.timestamp_ms);

    let accuracy_percent =
        ratio(correct_count, correct_count + incorrect_count).map_or(0.0, |r| 100.0 * r);

    let cpm_correct = per_minute(correct_count, total_duration_ms);
    let cpm_total = per_minute(log.len(), total_duration_ms);

    let intervals = inter_key_intervals(log);
    let (min_interval_ms, max_interval_ms) = match intervals.iter().minmax() {
        MinMaxResult::NoElements => (0, 0),
        MinMaxResult::OneElement(&v) => (v, v),
        MinMaxResult::MinMax(&lo, &hi) => (lo, hi),
    };
    let as_f64: Vec<f64> = intervals.iter().map(|&v| v as f64).collect();

    SessionStatistics {
        status: session.status(),
        target_len: session.target_len(),
        cursor: session.cursor(),
        total_duration_ms,
        total_key_count: log.len(),
        correct_count,
        incorrect_count,
        backspace_count: session.backspace_count(),
        accuracy_percent,
        wpm_correct: cpm_correct / CHARS_PER_WORD,
        cpm_correct,
        wpm_total: cpm_total / CHARS_PER_WORD,
        cpm_total,
        min_interval_ms,
        avg_interval_ms: mean(&as_f64).unwrap_or(0.0),
        max_interval_ms,
        interval_std_dev_ms: std_dev(&as_f64).unwrap_or(0.0),
    }
}

fn per_minute(count: usize, duration_ms: u64) -> f64 {
    if duration_ms == 0 {
        return 0.0;
    }
    count as f64 / (duration_ms as f64 / MS_PER_MINUTE)
}

/// Gaps between consecutive correct forward keystrokes, in log order.
/// Out-of-order caller timestamps clamp to a zero gap.
pub fn inter_key_intervals(log: &[OutcomeEntry]) -> Vec<u64> {
    log.iter()
        .filter(|e| e.is_forward())
        .map(|e| e.timestamp_ms)
        .tuple_windows()
        .map(|(a, b)| b.saturating_sub(a))
        .collect()
}
