use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tracing::debug;

/// Shared state that expires entries over time.
pub trait Sweep: Send + Sync {
    fn sweep(&self, now: Instant);
}

/// Periodically sweeps `target` until `stop` is notified.
pub struct Cleaner<T> {
    name: &'static str,
    target: Arc<T>,
    interval: Duration,
    stop: Arc<Notify>,
}

impl<T: Sweep> Cleaner<T> {
    pub fn new(name: &'static str, target: Arc<T>, interval: Duration, stop: Arc<Notify>) -> Self {
        Self {
            name,
            target,
            interval,
            stop,
        }
    }

    pub async fn run(self) {
        debug!(cleaner = self.name, "cleaner started");
        loop {
            tokio::select! {
                () = self.stop.notified() => break,
                () = tokio::time::sleep(self.interval) => {
                    self.target.sweep(Instant::now());
                }
            }
        }
        debug!(cleaner = self.name, "cleaner stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl Sweep for Counter {
        fn sweep(&self, _now: Instant) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sweeps_until_stopped() {
        let counter = Arc::new(Counter::default());
        let stop = Arc::new(Notify::new());
        let cleaner = Cleaner::new("test", Arc::clone(&counter), Duration::from_secs(1), Arc::clone(&stop));
        let task = tokio::spawn(cleaner.run());

        tokio::time::sleep(Duration::from_millis(3500)).await;
        stop.notify_one();
        task.await.ok();
        assert_eq!(counter.0.load(Ordering::Relaxed), 3);
    }
}
