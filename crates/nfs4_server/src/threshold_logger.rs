use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::info;

const FIRST_THRESHOLD: usize = 10_000;

/// Logs when a growing collection crosses the next step of the 10k, 20k, 50k,
/// 100k, ... series, so table growth is visible without logging every insert.
#[derive(Debug)]
pub(crate) struct ThresholdLogger {
    name: &'static str,
    next_threshold: AtomicUsize,
}

impl ThresholdLogger {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self {
            name,
            next_threshold: AtomicUsize::new(FIRST_THRESHOLD),
        }
    }

    pub(crate) fn check_and_log(&self, size: usize) {
        let threshold = self.next_threshold.load(Ordering::Relaxed);
        if size < threshold {
            return;
        }

        let next = next_threshold(size);
        if self
            .next_threshold
            .compare_exchange(threshold, next, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
        {
            info!(table = self.name, size, next_threshold = next, "table size threshold reached");
        }
    }
}

/// Smallest step of the series that is greater than `size`.
fn next_threshold(size: usize) -> usize {
    let mut decade = FIRST_THRESHOLD;
    loop {
        for step in [1, 2, 5] {
            let threshold = decade.saturating_mul(step);
            if threshold > size {
                return threshold;
            }
        }
        match decade.checked_mul(10) {
            Some(next) => decade = next,
            None => return usize::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds() {
        assert_eq!(next_threshold(0), 10_000);
        assert_eq!(next_threshold(10_000), 20_000);
        assert_eq!(next_threshold(20_001), 50_000);
        assert_eq!(next_threshold(50_000), 100_000);
        assert_eq!(next_threshold(6_000_000), 10_000_000);
        assert_eq!(next_threshold(usize::MAX), usize::MAX);
    }

    #[test]
    fn logger_advances() {
        let logger = ThresholdLogger::new("test");
        logger.check_and_log(5);
        assert_eq!(logger.next_threshold.load(Ordering::Relaxed), 10_000);
        logger.check_and_log(15_000);
        assert_eq!(logger.next_threshold.load(Ordering::Relaxed), 20_000);
    }
}
