use dynroute_core::TrialRecord;

/// A stimulus was presented and went unrewarded. Catch trials are never
/// incorrect.
pub fn is_incorrect(trial: &TrialRecord) -> bool {
    !trial.is_catch() && !trial.rewarded()
}

/// Repeat-on-incorrect, bounded by a run limit.
#[derive(Debug, Clone)]
pub struct RepeatPolicy {
    max_repeats: usize,
    count: usize,
}

impl RepeatPolicy {
    pub fn new(max_repeats: usize) -> Self {
        Self {
            max_repeats,
            count: 0,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns whether the next trial must repeat this one's stimulus.
    /// `block_complete` suppresses the repeat since the next trial opens a
    /// new block with its own stimulus set.
    pub fn evaluate(&mut self, incorrect: bool, block_complete: bool) -> bool {
        if incorrect && !block_complete && self.count < self.max_repeats {
            self.count += 1;
            true
        } else {
            self.count = 0;
            false
        }
    }
}
