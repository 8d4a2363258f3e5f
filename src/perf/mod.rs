/// Performance measurement utilities
/// Each pipeline stage can be timed and logged for tuning the frame budget
pub mod profiling;

pub use profiling::{CounterSnapshot, FunctionCounters, FUNCTION_COUNTERS};

use std::time::{Duration, Instant};

pub struct PerfTimer {
    name: &'static str,
    start: Instant,
}

impl PerfTimer {
    #[inline]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for PerfTimer {
    fn drop(&mut self) {
        log::debug!("[PERF] {}: {}μs", self.name, self.elapsed().as_micros());
    }
}

/// Rolling per-frame timing accumulator, reported every `report_every` frames
#[derive(Debug, Clone)]
pub struct FrameStats {
    pub frames: u64,
    pub setup_us: u64,
    pub wait_us: u64,
    pub total_us: u64,
    pub pixel_estimate: u64,
    pub records: u64,
    report_every: u64,
}

impl FrameStats {
    pub fn new(report_every: u64) -> Self {
        Self {
            frames: 0,
            setup_us: 0,
            wait_us: 0,
            total_us: 0,
            pixel_estimate: 0,
            records: 0,
            report_every: report_every.max(1),
        }
    }

    /// Fold one frame in; returns true when a summary was logged.
    pub fn record(
        &mut self,
        setup: Duration,
        wait: Duration,
        total: Duration,
        pixel_estimate: u32,
        records: usize,
    ) -> bool {
        self.frames += 1;
        self.setup_us += setup.as_micros() as u64;
        self.wait_us += wait.as_micros() as u64;
        self.total_us += total.as_micros() as u64;
        self.pixel_estimate += pixel_estimate as u64;
        self.records += records as u64;

        if self.frames % self.report_every == 0 {
            self.log_summary();
            true
        } else {
            false
        }
    }

    pub fn log_summary(&self) {
        if self.frames == 0 {
            return;
        }
        let n = self.frames as f64;
        log::info!(
            "frames {:6} | setup {:8.1}μs | wait {:8.1}μs | frame {:8.1}μs | est px {:8.0} | records {:6.0}",
            self.frames,
            self.setup_us as f64 / n,
            self.wait_us as f64 / n,
            self.total_us as f64 / n,
            self.pixel_estimate as f64 / n,
            self.records as f64 / n,
        );
    }
}
