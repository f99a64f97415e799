use serde::Serialize;

use crate::config::CacheConfig;

/// Final counters of one simulation run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SimulationStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Bytes of dirty data still resident at the end of the run.
    ///
    /// Byte counters are `u128`: with `s + b == 64` every line can be a
    /// `2^b` byte block and the cache spans the whole 64-bit space.
    pub dirty_bytes: u128,
    /// Bytes of dirty data written back by evictions.
    pub dirty_evictions: u128,
}

impl SimulationStats {
    pub fn accesses(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn miss_rate(&self) -> f64 {
        let total = self.accesses();
        if total == 0 {
            0.0
        } else {
            self.misses as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
pub struct StatsCollector {
    stats: SimulationStats,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit(&mut self) {
        self.stats.hits += 1;
    }

    pub fn miss(&mut self) {
        self.stats.misses += 1;
    }

    pub fn eviction(&mut self) {
        self.stats.evictions += 1;
    }

    pub fn dirtied(&mut self, bytes: u128) {
        self.stats.dirty_bytes += bytes;
    }

    /// Moves `bytes` from resident dirty data to written back.
    pub fn flushed(&mut self, bytes: u128) {
        debug_assert!(self.stats.dirty_bytes >= bytes, "dirty byte underflow");
        self.stats.dirty_bytes -= bytes;
        self.stats.dirty_evictions += bytes;
    }

    pub fn snapshot(&self) -> SimulationStats {
        self.stats
    }
}

/// One row of the `--json` output.
#[derive(Debug, Clone, Serialize)]
pub struct CacheReport {
    name: String,
    s: u32,
    #[serde(rename = "E")]
    e: usize,
    b: u32,
    #[serde(flatten)]
    stats: SimulationStats,
    miss_rate: f64,
}

impl CacheReport {
    pub fn new(config: &CacheConfig, stats: SimulationStats) -> Self {
        CacheReport {
            name: config.name.clone(),
            s: config.s,
            e: config.e,
            b: config.b,
            stats,
            miss_rate: stats.miss_rate(),
        }
    }
}
