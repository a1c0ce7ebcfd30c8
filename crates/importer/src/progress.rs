use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

/// Progress tracker for import operations
pub struct ImportProgress {
    bar: ProgressBar,
    start: Instant,
    last_log: Instant,
    processed: u64,
}

impl ImportProgress {
    /// Create an unbounded progress spinner
    pub fn spinner() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {pos} cities imported {msg}")
                .unwrap(),
        );

        Self {
            bar,
            start: Instant::now(),
            last_log: Instant::now(),
            processed: 0,
        }
    }

    /// Increment progress by count
    pub fn inc(&mut self, count: u64) {
        self.processed += count;
        self.bar.inc(count);

        // Update message every 5 seconds
        if self.last_log.elapsed() > Duration::from_secs(5) {
            let rate = self.processed as f64 / self.start.elapsed().as_secs_f64();
            self.bar.set_message(format!("({rate:.0} rows/sec)"));
            self.last_log = Instant::now();
        }
    }

    /// Finish with a final message
    pub fn finish(&self) {
        let elapsed = self.start.elapsed();
        let rate = self.processed as f64 / elapsed.as_secs_f64();

        self.bar.finish_with_message(format!(
            "Done! {} cities in {:.1}s ({:.0} rows/sec)",
            self.processed,
            elapsed.as_secs_f64(),
            rate
        ));
    }

    /// Get current count
    pub fn count(&self) -> u64 {
        self.processed
    }
}
