use std::fmt;

use tracing::{debug, info, trace};

use crate::{
    cache::{AddressDecoder, CacheTable},
    config::CacheConfig,
    error::Result,
    stats::{SimulationStats, StatsCollector},
    trace::{MemoryAccess, Operation},
};

/// Outcome of a single access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessResult {
    Hit,
    /// Filled an empty line.
    Miss,
    /// Replaced the least recently used line of a full set.
    MissEviction,
}

impl fmt::Display for AccessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AccessResult::Hit => "hit",
            AccessResult::Miss => "miss",
            AccessResult::MissEviction => "miss eviction",
        })
    }
}

/// Write-back, write-allocate LRU cache replaying accesses in order.
#[derive(Debug)]
pub struct Simulator {
    config: CacheConfig,
    decoder: AddressDecoder,
    table: CacheTable,
    stats: StatsCollector,
    /// Index of the next access; the recency stamp given to touched lines.
    clock: u64,
    block_bytes: u128,
    heartbeat: u64,
}

impl Simulator {
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        let table = CacheTable::new(&config)?;
        Ok(Simulator {
            decoder: AddressDecoder::new(config.s, config.b),
            block_bytes: config.block_size(),
            table,
            config,
            stats: StatsCollector::new(),
            clock: 0,
            heartbeat: 0,
        })
    }

    /// Log progress every `interval` accesses; `0` disables it.
    pub fn with_heartbeat(mut self, interval: u64) -> Self {
        self.heartbeat = interval;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn table(&self) -> &CacheTable {
        &self.table
    }

    pub fn stats(&self) -> SimulationStats {
        self.stats.snapshot()
    }

    pub fn access(&mut self, access: &MemoryAccess) -> AccessResult {
        let now = self.clock;
        let addr = self.decoder.decode(access.address);
        let store = access.operation == Operation::Store;

        let result = if let Some(way) = self.table.find_hit(addr.set, addr.tag) {
            self.table.touch(addr.set, way, now);
            self.stats.hit();
            if store {
                self.dirty(addr.set, way);
            }
            AccessResult::Hit
        } else {
            self.stats.miss();
            let (way, result) = match self.table.find_empty(addr.set) {
                Some(way) => (way, AccessResult::Miss),
                None => {
                    self.stats.eviction();
                    let way = self.table.find_victim(addr.set);
                    let victim = self.table.line(addr.set, way);
                    trace!(
                        set = addr.set,
                        way,
                        tag = victim.tag,
                        dirty = victim.dirty,
                        "evict"
                    );
                    if victim.dirty {
                        self.stats.flushed(self.block_bytes);
                    }
                    (way, AccessResult::MissEviction)
                }
            };
            self.table.install(addr.set, way, addr.tag, now, false);
            if store {
                self.dirty(addr.set, way);
            }
            result
        };

        self.clock += 1;
        if self.heartbeat != 0 && self.clock % self.heartbeat == 0 {
            info!(cache = %self.config.name, accesses = self.clock, "heartbeat");
        }
        result
    }

    fn dirty(&mut self, set: usize, way: usize) {
        if self.table.mark_dirty(set, way) {
            self.stats.dirtied(self.block_bytes);
        }
    }

    /// Replays `accesses`, reporting each outcome to `observe`.
    pub fn run_with<'a, I, F>(&mut self, accesses: I, mut observe: F) -> SimulationStats
    where
        I: IntoIterator<Item = &'a MemoryAccess>,
        F: FnMut(&MemoryAccess, AccessResult),
    {
        debug!(
            cache = %self.config.name,
            sets = self.table.n_sets(),
            ways = self.table.n_ways(),
            block_bytes = self.block_bytes,
            "starting run"
        );
        for access in accesses {
            let result = self.access(access);
            observe(access, result);
        }
        let stats = self.stats();
        debug!(cache = %self.config.name, ?stats, "finished run");
        stats
    }

    pub fn run<'a, I>(&mut self, accesses: I) -> SimulationStats
    where
        I: IntoIterator<Item = &'a MemoryAccess>,
    {
        self.run_with(accesses, |_, _| {})
    }
}
