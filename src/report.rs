use std::io::{self, Write};

use crate::{engine::AccessResult, stats::SimulationStats, trace::MemoryAccess};

pub fn summary(stats: &SimulationStats) -> String {
    format!(
        "hits:{} misses:{} evictions:{} dirty_bytes_in_cache:{} dirty_bytes_evicted:{}",
        stats.hits, stats.misses, stats.evictions, stats.dirty_bytes, stats.dirty_evictions
    )
}

/// `<op> <addr>,<size> <outcome> `, address and size in decimal.
pub fn verbose_line(access: &MemoryAccess, result: AccessResult) -> String {
    format!(
        "{} {},{} {} ",
        access.operation.as_char(),
        access.address,
        access.size,
        result
    )
}

pub fn write_verbose(
    out: &mut impl Write,
    prefix: Option<&str>,
    access: &MemoryAccess,
    result: AccessResult,
) -> io::Result<()> {
    if let Some(prefix) = prefix {
        write!(out, "{prefix}: ")?;
    }
    writeln!(out, "{}", verbose_line(access, result))
}
