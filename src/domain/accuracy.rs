// ============================================================
// Layer 3 — Accuracy
// ============================================================
// Running tally of correct predictions over the test split and
// the final integer percentage reported to the user.
//
//   accuracy = floor(100 * correct / total)
//
// Integer division truncates, so 99.9% is reported as 99.

use std::fmt;

/// Accumulates (correct, total) counts batch by batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccuracyTally {
    correct: usize,
    total:   usize,
}

impl AccuracyTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one batch: `correct` matches out of `batch_size` examples.
    pub fn record(&mut self, correct: usize, batch_size: usize) {
        debug_assert!(correct <= batch_size);
        self.correct += correct;
        self.total   += batch_size;
    }

    /// Final result, or `None` if nothing was recorded.
    pub fn finish(self) -> Option<AccuracyResult> {
        if self.total == 0 {
            return None;
        }
        Some(AccuracyResult {
            correct: self.correct,
            total:   self.total,
            percent: (100 * self.correct / self.total) as u32,
        })
    }
}

/// Aggregate accuracy over a full pass of the test split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccuracyResult {
    pub correct: usize,
    pub total:   usize,
    /// Truncated percentage in [0, 100]
    pub percent: u32,
}

impl fmt::Display for AccuracyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Accuracy of the network on the {} test images: {} %",
            self.total, self.percent
        )
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_truncates() {
        let mut tally = AccuracyTally::new();
        tally.record(2, 3);
        // 66.67% → 66
        assert_eq!(tally.finish().unwrap().percent, 66);
    }

    #[test]
    fn test_percent_just_below_full_is_not_rounded_up() {
        let mut tally = AccuracyTally::new();
        tally.record(999, 1000);
        assert_eq!(tally.finish().unwrap().percent, 99);
    }

    #[test]
    fn test_accumulates_across_batches() {
        let mut tally = AccuracyTally::new();
        tally.record(4, 4);
        tally.record(0, 4);
        tally.record(1, 2); // final partial batch
        let result = tally.finish().unwrap();
        assert_eq!(result.correct, 5);
        assert_eq!(result.total, 10);
        assert_eq!(result.percent, 50);
    }

    #[test]
    fn test_empty_tally_has_no_result() {
        assert!(AccuracyTally::new().finish().is_none());
    }

    #[test]
    fn test_display_matches_summary_line() {
        let mut tally = AccuracyTally::new();
        tally.record(5_432, 10_000);
        assert_eq!(
            tally.finish().unwrap().to_string(),
            "Accuracy of the network on the 10000 test images: 54 %"
        );
    }
}
