use crate::block::Block;

/// Circular, address-ordered list of free [`Block`]s.
///
/// The ring is threaded through the free blocks themselves via
/// [`Block::next`]; no side storage exists. Walking the ring from any block
/// visits strictly increasing addresses until exactly one wraparound edge
/// closes the circle:
///
/// ```text
///         +------------------------------------------------+
///         |                                                |
///         |   +----------+     +-------+     +-------+     |
///         +-> | sentinel | --> | Block | --> | Block | ----+
///             | (size 0) |     +-------+     +-------+
///             +----------+        ^
///                                 |
///                               freep
/// ```
///
/// A size-0 sentinel bootstraps the ring and is never handed out or merged
/// away. `freep` is the rotating cursor: it names the block most recently
/// touched by an insertion or removal and is where the next scan starts,
/// which gives the first-fit strategy its next-fit locality.
pub(crate) struct FreeRing {
    /// The sentinel, or null until the ring is bootstrapped.
    base: *mut Block,
    /// Scan cursor. Always points at a block currently on the ring.
    freep: *mut Block,
}

impl FreeRing {
    pub const fn new() -> Self {
        Self { base: std::ptr::null_mut(), freep: std::ptr::null_mut() }
    }

    /// Whether the sentinel has been installed yet.
    pub fn is_ready(&self) -> bool {
        !self.base.is_null()
    }

    /// Writes the size-0 sentinel at `at` and closes the ring over it.
    ///
    /// SAFETY: `at` must point to one writable, properly aligned unit that
    /// stays valid for the life of the ring.
    pub unsafe fn install_sentinel(&mut self, at: *mut Block) {
        unsafe {
            (*at).size = 0;
            (*at).next = at;
        }
        self.base = at;
        self.freep = at;
    }

    /// Inserts `bp` at its address-ordered position, merging it with
    /// whichever memory-contiguous neighbors it has. This is the whole of
    /// the release path: user frees and freshly grown arena ranges both
    /// land here.
    ///
    /// The cursor is left on the block preceding the inserted (or merged)
    /// region.
    ///
    /// SAFETY: `bp` must be a live block owned by this allocator, not
    /// currently on the ring, with a valid `size`.
    pub unsafe fn insert(&mut self, bp: *mut Block) {
        let mut p = self.freep;

        // Find the block after which bp belongs. The second arm handles the
        // wraparound edge: bp sits above the ring's highest address or below
        // its lowest.
        unsafe {
            loop {
                let next = (*p).next;
                if bp > p && bp < next {
                    break;
                }
                if p >= next && (bp > p || bp < next) {
                    break;
                }
                p = next;
            }

            let next = (*p).next;
            if Block::end_addr(bp) == next as usize && next != self.base {
                // Absorb the upper neighbor. The sentinel is exempt: it may
                // happen to sit exactly past a block's end but must stay on
                // the ring.
                (*bp).size += (*next).size;
                (*bp).next = (*next).next;
            } else {
                (*bp).next = next;
            }

            if Block::end_addr(p) == bp as usize {
                // Lower neighbor is contiguous: fold bp into it.
                (*p).size += (*bp).size;
                (*p).next = (*bp).next;
            } else {
                (*p).next = bp;
            }
        }

        self.freep = p;
    }

    /// First-fit scan: starting just past the cursor, takes the first block
    /// of at least `nunits` units. An exact match is unlinked whole; a
    /// larger block is split, carving the allocated span off its tail so
    /// the remainder keeps its place on the ring untouched.
    ///
    /// Returns `None` after one fruitless revolution; the caller decides
    /// whether to grow the arena and rescan.
    pub unsafe fn take_first_fit(&mut self, nunits: usize) -> Option<*mut Block> {
        let mut prevp = self.freep;

        unsafe {
            let mut p = (*prevp).next;
            loop {
                if (*p).size >= nunits {
                    if (*p).size == nunits {
                        (*prevp).next = (*p).next;
                    } else {
                        (*p).size -= nunits;
                        p = p.add((*p).size);
                        (*p).size = nunits;
                    }
                    self.freep = prevp;
                    return Some(p);
                }
                if p == self.freep {
                    return None;
                }
                prevp = p;
                p = (*p).next;
            }
        }
    }

    /// Best-fit scan: one full revolution tracking the smallest block that
    /// still fits. An exact match short-circuits immediately. The winner is
    /// split exactly like in [`FreeRing::take_first_fit`].
    pub unsafe fn take_best_fit(&mut self, nunits: usize) -> Option<*mut Block> {
        let mut prevp = self.freep;
        let mut best: Option<(*mut Block, *mut Block)> = None;

        unsafe {
            let mut p = (*prevp).next;
            loop {
                if (*p).size == nunits {
                    (*prevp).next = (*p).next;
                    self.freep = prevp;
                    return Some(p);
                }
                if (*p).size > nunits
                    && best.is_none_or(|(_, b)| (*p).size < (*b).size)
                {
                    best = Some((prevp, p));
                }
                if p == self.freep {
                    break;
                }
                prevp = p;
                p = (*p).next;
            }

            let (best_prev, mut bp) = best?;
            (*bp).size -= nunits;
            bp = bp.add((*bp).size);
            (*bp).size = nunits;
            self.freep = best_prev;
            Some(bp)
        }
    }
}

#[cfg(test)]
impl FreeRing {
    /// All free blocks except the sentinel, as `(address, units)` pairs
    /// sorted by address.
    pub(crate) unsafe fn blocks(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        if !self.is_ready() {
            return out;
        }
        unsafe {
            let mut p = self.freep;
            loop {
                if p != self.base {
                    out.push((p as usize, (*p).size));
                }
                p = (*p).next;
                if p == self.freep {
                    break;
                }
            }
        }
        out.sort_unstable();
        out
    }

    /// One revolution from the cursor: `(blocks visited, wraparound edges,
    /// all addresses distinct)`. A well-formed ring has exactly one
    /// wraparound edge and no repeats.
    pub(crate) unsafe fn revolution(&self) -> (usize, usize, bool) {
        let mut visited = std::collections::HashSet::new();
        let mut count = 0;
        let mut wraps = 0;
        unsafe {
            let mut p = self.freep;
            loop {
                count += 1;
                if !visited.insert(p as usize) {
                    return (count, wraps, false);
                }
                let next = (*p).next;
                if next as usize <= p as usize {
                    wraps += 1;
                }
                p = next;
                if p == self.freep {
                    break;
                }
            }
        }
        (count, wraps, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::UNIT;

    /// A scratch arena of `n` uninitialized block headers.
    fn arena(n: usize) -> Vec<Block> {
        (0..n)
            .map(|_| Block { next: std::ptr::null_mut(), size: 0 })
            .collect()
    }

    fn at(buf: &mut [Block], i: usize) -> *mut Block {
        unsafe { buf.as_mut_ptr().add(i) }
    }

    unsafe fn put(ring: &mut FreeRing, block: *mut Block, units: usize) {
        unsafe {
            (*block).size = units;
            ring.insert(block);
        }
    }

    #[test]
    fn insert_keeps_address_order_across_the_wraparound() {
        let mut buf = arena(32);
        let mut ring = FreeRing::new();
        unsafe {
            ring.install_sentinel(at(&mut buf, 4));
            put(&mut ring, at(&mut buf, 8), 3);
            // Below the sentinel: exercises the wraparound arm of the search.
            put(&mut ring, at(&mut buf, 0), 2);

            let blocks = ring.blocks();
            assert_eq!(
                blocks,
                vec![(at(&mut buf, 0) as usize, 2), (at(&mut buf, 8) as usize, 3)]
            );
            let (count, wraps, distinct) = ring.revolution();
            assert_eq!(count, 3); // sentinel + two blocks
            assert_eq!(wraps, 1);
            assert!(distinct);
        }
    }

    #[test]
    fn insert_merges_lower_neighbor_but_never_the_sentinel() {
        let mut buf = arena(32);
        let mut ring = FreeRing::new();
        unsafe {
            ring.install_sentinel(at(&mut buf, 4));
            put(&mut ring, at(&mut buf, 8), 3);
            put(&mut ring, at(&mut buf, 0), 2);
            // Contiguous with the block at 0 below and with the sentinel at
            // 4 above. It must fold into the former and leave the latter.
            put(&mut ring, at(&mut buf, 2), 2);

            let blocks = ring.blocks();
            assert_eq!(
                blocks,
                vec![(at(&mut buf, 0) as usize, 4), (at(&mut buf, 8) as usize, 3)]
            );
            let (count, wraps, distinct) = ring.revolution();
            assert_eq!(count, 3);
            assert_eq!(wraps, 1);
            assert!(distinct);
        }
    }

    #[test]
    fn insert_merges_both_neighbors_into_one_block() {
        let mut buf = arena(32);
        let mut ring = FreeRing::new();
        unsafe {
            ring.install_sentinel(at(&mut buf, 0));
            put(&mut ring, at(&mut buf, 2), 4); // ends at 6
            put(&mut ring, at(&mut buf, 8), 3); // starts at 8
            // The gap: contiguous with both. One block must remain.
            put(&mut ring, at(&mut buf, 6), 2);

            let blocks = ring.blocks();
            assert_eq!(blocks, vec![(at(&mut buf, 2) as usize, 9)]);
        }
    }

    #[test]
    fn first_fit_unlinks_exact_matches_whole() {
        let mut buf = arena(32);
        let mut ring = FreeRing::new();
        unsafe {
            ring.install_sentinel(at(&mut buf, 0));
            put(&mut ring, at(&mut buf, 2), 4);
            put(&mut ring, at(&mut buf, 10), 6);

            let taken = ring.take_first_fit(6).unwrap();
            assert_eq!(taken, at(&mut buf, 10));
            assert_eq!((*taken).size, 6);
            assert_eq!(ring.blocks(), vec![(at(&mut buf, 2) as usize, 4)]);
        }
    }

    #[test]
    fn first_fit_splits_the_tail_of_a_larger_block() {
        let mut buf = arena(32);
        let mut ring = FreeRing::new();
        unsafe {
            ring.install_sentinel(at(&mut buf, 0));
            put(&mut ring, at(&mut buf, 2), 6);

            let taken = ring.take_first_fit(2).unwrap();
            // Tail split: the remainder keeps the low address.
            assert_eq!(taken, at(&mut buf, 6));
            assert_eq!((*taken).size, 2);
            assert_eq!(ring.blocks(), vec![(at(&mut buf, 2) as usize, 4)]);
            assert_eq!(
                Block::end_addr(at(&mut buf, 2)),
                at(&mut buf, 2) as usize + 4 * UNIT
            );
        }
    }

    #[test]
    fn first_fit_gives_up_after_one_revolution() {
        let mut buf = arena(32);
        let mut ring = FreeRing::new();
        unsafe {
            ring.install_sentinel(at(&mut buf, 0));
            put(&mut ring, at(&mut buf, 2), 4);

            assert!(ring.take_first_fit(5).is_none());
            // A failed scan mutates nothing.
            assert_eq!(ring.blocks(), vec![(at(&mut buf, 2) as usize, 4)]);
        }
    }

    #[test]
    fn best_fit_prefers_the_tightest_block() {
        let mut buf = arena(32);
        let mut ring = FreeRing::new();
        unsafe {
            ring.install_sentinel(at(&mut buf, 0));
            put(&mut ring, at(&mut buf, 2), 4);
            put(&mut ring, at(&mut buf, 10), 6);

            // Both fit; the 4-unit block is tighter. 4 - 3 = 1 unit remains.
            let taken = ring.take_best_fit(3).unwrap();
            assert_eq!(taken, at(&mut buf, 3));
            assert_eq!((*taken).size, 3);
            assert_eq!(
                ring.blocks(),
                vec![(at(&mut buf, 2) as usize, 1), (at(&mut buf, 10) as usize, 6)]
            );
        }
    }

    #[test]
    fn best_fit_short_circuits_on_exact_match() {
        let mut buf = arena(32);
        let mut ring = FreeRing::new();
        unsafe {
            ring.install_sentinel(at(&mut buf, 0));
            put(&mut ring, at(&mut buf, 2), 4);
            put(&mut ring, at(&mut buf, 10), 6);

            let taken = ring.take_best_fit(6).unwrap();
            assert_eq!(taken, at(&mut buf, 10));
            assert_eq!(ring.blocks(), vec![(at(&mut buf, 2) as usize, 4)]);
        }
    }

    #[test]
    fn best_fit_reports_exhaustion() {
        let mut buf = arena(32);
        let mut ring = FreeRing::new();
        unsafe {
            ring.install_sentinel(at(&mut buf, 0));
            put(&mut ring, at(&mut buf, 2), 4);

            assert!(ring.take_best_fit(4 + 1).is_none());
            assert_eq!(ring.blocks(), vec![(at(&mut buf, 2) as usize, 4)]);
        }
    }
}
