/// Function call counters for the setup and raster hot paths.
/// Compiled to nothing unless the `profiling` feature is enabled.
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters shared by the world loop and the raster worker
pub struct FunctionCounters {
    // Triangle setup
    pub triangles_submitted: AtomicU64,
    pub triangles_culled: AtomicU64,
    pub triangles_rejected: AtomicU64,
    pub triangles_accepted: AtomicU64,
    pub triangles_must_clip: AtomicU64,
    pub faces_shaded: AtomicU64,
    pub tiles_skipped: AtomicU64,
    pub tiles_covered: AtomicU64,
    pub tiles_partial: AtomicU64,

    // Rasterization
    pub records_rasterized: AtomicU64,
    pub pixels_tested: AtomicU64,
    pub depth_passed: AtomicU64,
    pub depth_failed: AtomicU64,

    // Buffers
    pub pixel_clear_calls: AtomicU64,
    pub depth_clear_calls: AtomicU64,

    // Queries
    pub hit_queries: AtomicU64,
}

impl FunctionCounters {
    pub const fn new() -> Self {
        Self {
            triangles_submitted: AtomicU64::new(0),
            triangles_culled: AtomicU64::new(0),
            triangles_rejected: AtomicU64::new(0),
            triangles_accepted: AtomicU64::new(0),
            triangles_must_clip: AtomicU64::new(0),
            faces_shaded: AtomicU64::new(0),
            tiles_skipped: AtomicU64::new(0),
            tiles_covered: AtomicU64::new(0),
            tiles_partial: AtomicU64::new(0),
            records_rasterized: AtomicU64::new(0),
            pixels_tested: AtomicU64::new(0),
            depth_passed: AtomicU64::new(0),
            depth_failed: AtomicU64::new(0),
            pixel_clear_calls: AtomicU64::new(0),
            depth_clear_calls: AtomicU64::new(0),
            hit_queries: AtomicU64::new(0),
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        for counter in self.all() {
            counter.store(0, Ordering::Relaxed);
        }
    }

    fn all(&self) -> [&AtomicU64; 16] {
        [
            &self.triangles_submitted,
            &self.triangles_culled,
            &self.triangles_rejected,
            &self.triangles_accepted,
            &self.triangles_must_clip,
            &self.faces_shaded,
            &self.tiles_skipped,
            &self.tiles_covered,
            &self.tiles_partial,
            &self.records_rasterized,
            &self.pixels_tested,
            &self.depth_passed,
            &self.depth_failed,
            &self.pixel_clear_calls,
            &self.depth_clear_calls,
            &self.hit_queries,
        ]
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> CounterSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        CounterSnapshot {
            triangles_submitted: load(&self.triangles_submitted),
            triangles_culled: load(&self.triangles_culled),
            triangles_rejected: load(&self.triangles_rejected),
            triangles_accepted: load(&self.triangles_accepted),
            triangles_must_clip: load(&self.triangles_must_clip),
            faces_shaded: load(&self.faces_shaded),
            tiles_skipped: load(&self.tiles_skipped),
            tiles_covered: load(&self.tiles_covered),
            tiles_partial: load(&self.tiles_partial),
            records_rasterized: load(&self.records_rasterized),
            pixels_tested: load(&self.pixels_tested),
            depth_passed: load(&self.depth_passed),
            depth_failed: load(&self.depth_failed),
            pixel_clear_calls: load(&self.pixel_clear_calls),
            depth_clear_calls: load(&self.depth_clear_calls),
            hit_queries: load(&self.hit_queries),
        }
    }
}

impl Default for FunctionCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of counter values at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub triangles_submitted: u64,
    pub triangles_culled: u64,
    pub triangles_rejected: u64,
    pub triangles_accepted: u64,
    pub triangles_must_clip: u64,
    pub faces_shaded: u64,
    pub tiles_skipped: u64,
    pub tiles_covered: u64,
    pub tiles_partial: u64,
    pub records_rasterized: u64,
    pub pixels_tested: u64,
    pub depth_passed: u64,
    pub depth_failed: u64,
    pub pixel_clear_calls: u64,
    pub depth_clear_calls: u64,
    pub hit_queries: u64,
}

impl CounterSnapshot {
    /// Log a formatted report at info level
    pub fn log_report(&self) {
        log::info!("=== Function counters ===");
        log::info!(
            "setup: submitted {} culled {} shaded {} rejected {} accepted {} must-clip {}",
            self.triangles_submitted,
            self.triangles_culled,
            self.faces_shaded,
            self.triangles_rejected,
            self.triangles_accepted,
            self.triangles_must_clip
        );
        log::info!(
            "tiles: covered {} partial {} skipped {}",
            self.tiles_covered,
            self.tiles_partial,
            self.tiles_skipped
        );
        log::info!(
            "raster: records {} pixels tested {} depth pass {} fail {}",
            self.records_rasterized,
            self.pixels_tested,
            self.depth_passed,
            self.depth_failed
        );
        if self.pixels_tested > 0 {
            let pass_rate = self.depth_passed as f64 / self.pixels_tested as f64 * 100.0;
            log::info!("depth pass rate: {:.2}%", pass_rate);
        }
        log::info!(
            "clears: pixel {} depth {}; hit queries {}",
            self.pixel_clear_calls,
            self.depth_clear_calls,
            self.hit_queries
        );
    }
}

/// Global function counters instance
pub static FUNCTION_COUNTERS: FunctionCounters = FunctionCounters::new();

/// Increment a field of `FUNCTION_COUNTERS` (only when profiling is enabled)
#[macro_export]
macro_rules! count_call {
    ($counter:ident) => {
        #[cfg(feature = "profiling")]
        {
            $crate::perf::FUNCTION_COUNTERS
                .$counter
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    };
}

/// Add to a field of `FUNCTION_COUNTERS` (only when profiling is enabled)
#[macro_export]
macro_rules! count_add {
    ($counter:ident, $value:expr) => {
        #[cfg(feature = "profiling")]
        {
            $crate::perf::FUNCTION_COUNTERS
                .$counter
                .fetch_add($value as u64, std::sync::atomic::Ordering::Relaxed);
        }
    };
}
