#![forbid(unsafe_code)]

//! Diagnostic counters for a model-backed view.

/// Running totals kept by [`ModelBacked`](crate::backed::ModelBacked).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackedStats {
    /// Build tickets issued.
    pub requested: u64,
    /// Completions promoted to the displayed representation.
    pub promoted: u64,
    /// Completions discarded because a newer request superseded them.
    pub stale_discarded: u64,
    /// Builds reported as failed.
    pub failed: u64,
    /// Explicit clears via `set_model(None)`.
    pub cleared: u64,
    /// Representations passed to `Dispose::dispose`.
    pub disposed: u64,
    /// Change events dropped because nobody drained the queue.
    pub events_dropped: u64,
}

impl BackedStats {
    /// Builds that have reported back in any way.
    #[must_use]
    pub fn settled(&self) -> u64 {
        self.promoted + self.stale_discarded + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settled_sums_outcomes() {
        let stats = BackedStats {
            requested: 5,
            promoted: 2,
            stale_discarded: 1,
            failed: 1,
            ..Default::default()
        };
        assert_eq!(stats.settled(), 4);
    }
}
