use std::io::{self, Write};
use std::time::Instant;

/// Timestamped stderr reporting for the command-line driver. The
/// extraction engine itself never logs; all console output belongs to
/// the caller.
pub struct ConsoleProgress {
    enabled: bool,
    t0: Instant,
}

impl ConsoleProgress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            t0: Instant::now(),
        }
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        if !self.enabled {
            return;
        }
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "[{:>6.2}s] {}", self.elapsed(), msg.as_ref());
    }

    pub fn progress(&self, label: &str, current: usize, total: usize) {
        if !self.enabled {
            return;
        }
        let total = total.max(1);
        let current = current.min(total);
        let mut stderr = io::stderr().lock();
        let _ = writeln!(
            stderr,
            "[{:>6.2}s] {label} {current}/{total}",
            self.elapsed()
        );
    }

    fn elapsed(&self) -> f64 {
        self.t0.elapsed().as_secs_f64()
    }
}
