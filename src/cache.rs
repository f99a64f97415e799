use std::ops::Range;

use crate::{config::CacheConfig, error::Error};

/// An address split into the fields the cache indexes by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Addr {
    pub set: usize,
    pub tag: u64,
}

#[derive(Debug, Clone, Copy)]
struct BitSection {
    shift: u32,
    mask: u64,
}

impl BitSection {
    fn apply(&self, num: u64) -> u64 {
        num.checked_shr(self.shift).unwrap_or(0) & self.mask
    }
}

/// Splits 64-bit addresses into `(set_index, tag)` for a fixed `(s, b)`.
///
/// `set_index` is the `s` bits directly above the `b` block-offset bits and
/// `tag` is everything above those. Shifts of 64 yield zero instead of
/// overflowing, so `s + b == 64` decodes every address to tag `0`.
#[derive(Debug, Clone, Copy)]
pub struct AddressDecoder {
    set_sec: BitSection,
    tag_sec: BitSection,
}

impl AddressDecoder {
    /// Caller guarantees `s + b <= 64`.
    pub fn new(s: u32, b: u32) -> Self {
        debug_assert!(s + b <= 64);
        let set_mask = if s >= 64 { u64::MAX } else { (1u64 << s) - 1 };
        AddressDecoder {
            set_sec: BitSection {
                shift: b,
                mask: set_mask,
            },
            tag_sec: BitSection {
                shift: s + b,
                mask: u64::MAX,
            },
        }
    }

    pub fn decode(&self, address: u64) -> Addr {
        // The set index is below 2^s and the table only exists if its
        // set count fits in usize, so this never truncates.
        let set = self.set_sec.apply(address) as usize;
        let tag = self.tag_sec.apply(address);
        Addr { set, tag }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    pub tag: u64,
    pub valid: bool,
    pub dirty: bool,
    /// Access index of the last hit or fill.
    pub recency: u64,
}

/// `n_sets` sets of `n_ways` lines each, stored row-major in one allocation.
#[derive(Debug)]
pub struct CacheTable {
    lines: Vec<Line>,
    n_sets: usize,
    n_ways: usize,
}

impl CacheTable {
    pub fn new(config: &CacheConfig) -> Result<Self, Error> {
        let n_sets = usize::try_from(config.set_num()).map_err(|_| Error::ResourceExhausted {
            what: "cache line table",
            source: None,
        })?;
        let n_ways = config.e;
        let total = n_sets
            .checked_mul(n_ways)
            .ok_or(Error::ResourceExhausted {
                what: "cache line table",
                source: None,
            })?;

        let mut lines = Vec::new();
        lines
            .try_reserve_exact(total)
            .map_err(|err| Error::ResourceExhausted {
                what: "cache line table",
                source: Some(err),
            })?;
        lines.resize(total, Line::default());

        Ok(CacheTable {
            lines,
            n_sets,
            n_ways,
        })
    }

    pub fn n_sets(&self) -> usize {
        self.n_sets
    }

    pub fn n_ways(&self) -> usize {
        self.n_ways
    }

    fn get_set(&self, set: usize) -> Range<usize> {
        set * self.n_ways..(set + 1) * self.n_ways
    }

    pub fn set(&self, set: usize) -> &[Line] {
        &self.lines[self.get_set(set)]
    }

    pub fn line(&self, set: usize, way: usize) -> &Line {
        &self.set(set)[way]
    }

    fn line_mut(&mut self, set: usize, way: usize) -> &mut Line {
        let range = self.get_set(set);
        &mut self.lines[range][way]
    }

    /// First valid line holding `tag`.
    pub fn find_hit(&self, set: usize, tag: u64) -> Option<usize> {
        self.set(set).iter().position(|l| l.valid && l.tag == tag)
    }

    /// First invalid line, or `None` once the set is full.
    pub fn find_empty(&self, set: usize) -> Option<usize> {
        self.set(set).iter().position(|l| !l.valid)
    }

    /// Least recently used line of a full set; ties go to the lowest way.
    pub fn find_victim(&self, set: usize) -> usize {
        let lines = self.set(set);
        let mut least_used = 0;
        for (way, line) in lines.iter().enumerate() {
            if line.recency < lines[least_used].recency {
                least_used = way;
            }
        }
        least_used
    }

    pub fn install(&mut self, set: usize, way: usize, tag: u64, recency: u64, dirty: bool) {
        let line = self.line_mut(set, way);
        line.tag = tag;
        line.valid = true;
        line.recency = recency;
        line.dirty = dirty;
    }

    pub fn touch(&mut self, set: usize, way: usize, recency: u64) {
        self.line_mut(set, way).recency = recency;
    }

    /// Marks a line dirty, returning whether it was clean before.
    pub fn mark_dirty(&mut self, set: usize, way: usize) -> bool {
        let line = self.line_mut(set, way);
        let was_clean = !line.dirty;
        line.dirty = true;
        was_clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(s: u32, e: usize, b: u32) -> CacheTable {
        CacheTable::new(&CacheConfig::new(s, e, b).unwrap()).unwrap()
    }

    #[test]
    fn decode_splits_fields() {
        let dec = AddressDecoder::new(2, 4);
        // tag 0b101, set 0b10, offset 0b0110
        let addr = dec.decode(0b101_10_0110);
        assert_eq!(addr, Addr { set: 0b10, tag: 0b101 });
    }

    #[test]
    fn decode_full_width() {
        let dec = AddressDecoder::new(0, 64);
        assert_eq!(dec.decode(u64::MAX), Addr { set: 0, tag: 0 });

        let dec = AddressDecoder::new(8, 56);
        assert_eq!(dec.decode(0xab00_0000_0000_0000), Addr { set: 0xab, tag: 0 });

        let dec = AddressDecoder::new(0, 0);
        assert_eq!(dec.decode(0x1234), Addr { set: 0, tag: 0x1234 });
    }

    #[test]
    fn new_table_is_empty() {
        let t = table(2, 3, 1);
        assert_eq!(t.n_sets(), 4);
        assert_eq!(t.n_ways(), 3);
        for set in 0..4 {
            assert_eq!(t.find_empty(set), Some(0));
            assert_eq!(t.find_hit(set, 0), None);
        }
    }

    #[test]
    fn hit_requires_valid_line() {
        let mut t = table(0, 2, 0);
        assert_eq!(t.find_hit(0, 0), None);
        t.install(0, 1, 7, 0, false);
        assert_eq!(t.find_hit(0, 7), Some(1));
        assert_eq!(t.find_empty(0), Some(0));
        t.install(0, 0, 9, 1, false);
        assert_eq!(t.find_empty(0), None);
    }

    #[test]
    fn victim_is_oldest_lowest_way_on_tie() {
        let mut t = table(0, 4, 0);
        t.install(0, 0, 1, 5, false);
        t.install(0, 1, 2, 3, false);
        t.install(0, 2, 3, 3, false);
        t.install(0, 3, 4, 9, false);
        assert_eq!(t.find_victim(0), 1);

        t.touch(0, 1, 10);
        assert_eq!(t.find_victim(0), 2);
    }

    #[test]
    fn mark_dirty_reports_transition() {
        let mut t = table(1, 1, 0);
        t.install(1, 0, 3, 0, false);
        assert!(t.mark_dirty(1, 0));
        assert!(!t.mark_dirty(1, 0));
        assert!(t.line(1, 0).dirty);
        assert!(!t.line(0, 0).dirty);
    }

    #[test]
    fn oversized_table_is_resource_error() {
        let config = CacheConfig::new(64, 1, 0).unwrap();
        assert!(matches!(
            CacheTable::new(&config),
            Err(Error::ResourceExhausted { .. })
        ));
    }
}
