use csim::{AccessResult, CacheConfig, MemoryAccess, SimulationStats, Simulator, Trace};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn stats(
    hits: u64,
    misses: u64,
    evictions: u64,
    dirty_bytes: u128,
    dirty_evictions: u128,
) -> SimulationStats {
    SimulationStats {
        hits,
        misses,
        evictions,
        dirty_bytes,
        dirty_evictions,
    }
}

fn simulate(s: u32, e: usize, b: u32, trace: &str) -> SimulationStats {
    let trace: Trace = trace.parse().unwrap();
    Simulator::new(CacheConfig::new(s, e, b).unwrap())
        .unwrap()
        .run(&trace)
}

#[rstest]
#[case::conflict("L 0,1\nL 1,1\n", stats(0, 2, 1, 0, 0))]
#[case::dirty_hit("S 0,1\nL 0,1\n", stats(1, 1, 0, 1, 0))]
#[case::dirty_eviction("S 0,1\nL 1,1\n", stats(0, 2, 1, 0, 1))]
#[case::empty("", stats(0, 0, 0, 0, 0))]
fn single_line_cache(#[case] trace: &str, #[case] expected: SimulationStats) {
    assert_eq!(simulate(0, 1, 0, trace), expected);
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(4)]
#[case(16)]
fn capacity_law(#[case] ways: usize) {
    let mut sim = Simulator::new(CacheConfig::new(0, ways, 4).unwrap()).unwrap();
    let fill: Vec<_> = (0..ways as u64).map(|tag| MemoryAccess::load(tag << 4, 1)).collect();

    let after_fill = sim.run(&fill);
    assert_eq!(after_fill, stats(0, ways as u64, 0, 0, 0));

    let result = sim.access(&MemoryAccess::load((ways as u64) << 4, 1));
    assert_eq!(result, AccessResult::MissEviction);
    assert_eq!(sim.stats(), stats(0, ways as u64 + 1, 1, 0, 0));
}

#[test]
fn repeated_stores_dirty_once() {
    let trace = "S 40,4\nS 44,4\nS 48,8\nS 7c,4\n";
    assert_eq!(simulate(2, 1, 6, trace), stats(3, 1, 0, 64, 0));
}

#[test]
fn mixed_two_way_trace() {
    // s=1, E=2, b=2: bit 2 is the set index, tag is address >> 3.
    let trace = "\
L 0,4
S 8,4
L 10,4
S 4,4
L 0,4
L 18,4
S c,4
L 8,4
";
    // L 0   set 0 tag 0  miss
    // S 8   set 0 tag 1  miss, dirty
    // L 10  set 0 tag 2  miss eviction (tag 0)
    // S 4   set 1 tag 0  miss, dirty
    // L 0   set 0 tag 0  miss eviction (tag 1, dirty)
    // L 18  set 0 tag 3  miss eviction (tag 2)
    // S c   set 1 tag 1  miss, dirty
    // L 8   set 0 tag 1  miss eviction (tag 0)
    assert_eq!(simulate(1, 2, 2, trace), stats(0, 8, 4, 8, 4));
}

#[test]
fn outcomes_follow_trace_order() {
    let trace: Trace = "L 0,1\nL 0,1\nS 1,1\nL 2,1\n".parse().unwrap();
    let mut sim = Simulator::new(CacheConfig::new(0, 2, 0).unwrap()).unwrap();
    let mut seen = Vec::new();
    sim.run_with(&trace, |access, result| seen.push((access.address, result)));
    assert_eq!(
        seen,
        [
            (0, AccessResult::Miss),
            (0, AccessResult::Hit),
            (1, AccessResult::Miss),
            (2, AccessResult::MissEviction),
        ]
    );
}

#[test]
fn same_trace_many_configs() {
    let trace: Trace = (0..64u64)
        .map(|i| format!("L {:x},4\n", (i % 16) * 32))
        .collect::<String>()
        .parse()
        .unwrap();

    // 16 distinct 32-byte blocks, visited round robin four times.
    let fits = Simulator::new(CacheConfig::new(2, 4, 5).unwrap()).unwrap().run(&trace);
    assert_eq!(fits, stats(48, 16, 0, 0, 0));

    // Half the capacity under LRU misses on every access.
    let thrashes = Simulator::new(CacheConfig::new(1, 4, 5).unwrap()).unwrap().run(&trace);
    assert_eq!(thrashes, stats(0, 64, 56, 0, 0));
}
