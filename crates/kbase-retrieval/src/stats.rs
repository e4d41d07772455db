//! Running search totals kept by one `RetrievalEngine`.

use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

/// Every this many searches a summary line is logged.
const SUMMARY_EVERY: u64 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SearchStats {
    pub total_searches: u64,
    pub failed_searches: u64,
    /// Mean wall time of successful searches.
    pub avg_search_time: Duration,
    /// Successful share of all searches, in `[0, 1]`; 0 before the first search.
    pub success_rate: f64,
}

#[derive(Default)]
struct Totals {
    searches: u64,
    failures: u64,
    success_time: Duration,
}

#[derive(Default)]
pub struct SearchMetrics {
    totals: Mutex<Totals>,
}

impl SearchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, elapsed: Duration, succeeded: bool) {
        let snapshot = {
            let mut t = self.totals.lock();
            t.searches += 1;
            if succeeded {
                t.success_time += elapsed;
            } else {
                t.failures += 1;
            }
            Self::summarize(&t)
        };
        if snapshot.total_searches % SUMMARY_EVERY == 0 {
            tracing::info!(
                total = snapshot.total_searches,
                avg_ms = snapshot.avg_search_time.as_millis() as u64,
                success_rate = snapshot.success_rate,
                "search totals"
            );
        }
    }

    pub fn snapshot(&self) -> SearchStats {
        Self::summarize(&self.totals.lock())
    }

    fn summarize(t: &Totals) -> SearchStats {
        let successes = t.searches - t.failures;
        SearchStats {
            total_searches: t.searches,
            failed_searches: t.failures,
            avg_search_time: if successes == 0 { Duration::ZERO } else { t.success_time / successes as u32 },
            success_rate: if t.searches == 0 { 0.0 } else { successes as f64 / t.searches as f64 },
        }
    }
}
