//! "Substantially browsed" heuristic.

/// Largest contribution of a single position change.
const MAX_UNITS_PER_MOVE: usize = 2;
/// Share of the container that counts as browsed, before the absolute cap.
const BROWSED_SHARE: f64 = 0.5;
const BROWSED_CAP: f64 = 15.0;

/// Per-session counter of pages moved through.
///
/// Each position change adds its distance, capped at two units, so a long jump does not count
/// as reading. The metric trips once when it reaches `min(total * 0.5, 15)` and stays tripped.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowseMetric {
    accumulated: usize,
    threshold: f64,
    tripped: bool,
}

impl BrowseMetric {
    pub fn new(total_pages: usize) -> Self {
        Self {
            accumulated: 0,
            threshold: (total_pages as f64 * BROWSED_SHARE).min(BROWSED_CAP),
            tripped: false,
        }
    }

    pub fn accumulated(&self) -> usize {
        self.accumulated
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped
    }

    /// Feed one position change. Returns `true` only for the change that trips the metric.
    pub fn record(&mut self, delta: isize) -> bool {
        if delta == 0 || self.tripped {
            return false;
        }

        self.accumulated += delta.unsigned_abs().min(MAX_UNITS_PER_MOVE);
        if self.accumulated as f64 >= self.threshold {
            self.tripped = true;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_half_the_pages_capped_at_fifteen() {
        assert_eq!(BrowseMetric::new(20).threshold(), 10.0);
        assert_eq!(BrowseMetric::new(7).threshold(), 3.5);
        assert_eq!(BrowseMetric::new(400).threshold(), 15.0);
    }

    #[test]
    fn long_jumps_count_as_two() {
        let mut metric = BrowseMetric::new(100);
        metric.record(40);
        metric.record(-9);
        metric.record(1);
        assert_eq!(metric.accumulated(), 5);
    }

    #[test]
    fn trips_exactly_once() {
        let mut metric = BrowseMetric::new(4);
        assert!(!metric.record(1));
        assert!(metric.record(1));
        assert!(!metric.record(1));
        assert!(!metric.record(-1));
        assert!(metric.is_tripped());
    }

    #[test]
    fn zero_moves_are_ignored() {
        let mut metric = BrowseMetric::new(2);
        assert!(!metric.record(0));
        assert_eq!(metric.accumulated(), 0);
    }
}
