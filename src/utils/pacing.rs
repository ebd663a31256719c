use std::time::Duration;

use async_trait::async_trait;
use jiff::civil::Date;
use jiff::Zoned;

/// Source of "today", swapped for a fixed date in tests.
pub trait Clock: Send + Sync {
    fn today(&self) -> Date;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> Date {
        Zoned::now().date()
    }
}

pub struct FixedClock(pub Date);

impl Clock for FixedClock {
    fn today(&self) -> Date {
        self.0
    }
}

/// Suspends the batch loop between two downloads.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, duration: Duration);
}

pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A pause of `n` minutes, saturating instead of overflowing.
pub fn minutes(n: u64) -> Duration {
    Duration::from_secs(n.saturating_mul(60))
}

/// Format a pause for log messages, e.g. `15 minutes`.
pub fn describe(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        let minutes = secs / 60;
        format!("{} minute{}", minutes, if minutes == 1 { "" } else { "s" })
    } else {
        format!("{} seconds", duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    #[test]
    fn fixed_clock() {
        assert_eq!(FixedClock(date(2025, 4, 17)).today(), date(2025, 4, 17));
    }

    #[test]
    fn describe_pause() {
        assert_eq!(describe(Duration::from_secs(15 * 60)), "15 minutes");
        assert_eq!(describe(Duration::from_secs(60)), "1 minute");
        assert_eq!(describe(Duration::from_millis(1500)), "1.5 seconds");
    }

    #[test]
    fn minutes_saturate() {
        assert_eq!(minutes(15), Duration::from_secs(900));
        assert_eq!(minutes(0), Duration::ZERO);
        assert_eq!(minutes(u64::MAX), Duration::from_secs(u64::MAX));
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_pacer_sleeps() {
        let start = tokio::time::Instant::now();
        TokioPacer.pause(Duration::from_secs(15 * 60)).await;
        assert!(start.elapsed() >= Duration::from_secs(15 * 60));
    }
}
