use std::ptr;

use log::{debug, error};

use crate::block::{Block, UNIT};
use crate::ring::FreeRing;
use crate::source::{MmapSource, RawMemorySource};

/// Minimum batch requested per arena growth, in units. Small growth
/// requests get rounded up to this to amortize system-call overhead.
pub const DEFAULT_MIN_GROWTH_UNITS: usize = 1024;

/// Block-placement strategy, fixed at construction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Placement {
    /// Scan from just past the cursor and take the first block that fits.
    /// Because the cursor rotates to wherever the last operation happened,
    /// this behaves like next-fit and tends to spread load over the ring.
    FirstFit,
    /// Scan one full revolution and take the smallest block that fits.
    BestFit,
}

/// A K&R-style dynamic allocator over a circular free ring.
///
/// State is an explicit value rather than process globals: independent
/// instances coexist, and tests can inject a deterministic
/// [`RawMemorySource`]. The ring is lazily bootstrapped on the first
/// allocation and arena memory is never returned to the source, only
/// recycled.
///
/// # Misuse
/// Passing [`release`](Self::release) or [`resize`](Self::resize) a pointer
/// that did not come from the same instance, or releasing one twice, is
/// undefined behavior: neither is detected, and either can corrupt the free
/// ring. This mirrors the contract of `free(3)`.
pub struct RingAllocator<S: RawMemorySource> {
    ring: FreeRing,
    source: S,
    placement: Placement,
    min_growth_units: usize,
}

// SAFETY: the ring's raw pointers target arena memory that this value owns
// exclusively and that stays valid for the life of the process; moving the
// allocator to another thread moves that exclusive ownership with it.
unsafe impl<S: RawMemorySource + Send> Send for RingAllocator<S> {}

impl RingAllocator<MmapSource> {
    /// An allocator backed by anonymous page mappings.
    pub const fn new(placement: Placement) -> Self {
        Self::with_source(MmapSource, placement)
    }
}

impl<S: RawMemorySource> RingAllocator<S> {
    /// An allocator drawing raw memory from `source`.
    pub const fn with_source(source: S, placement: Placement) -> Self {
        Self {
            ring: FreeRing::new(),
            source,
            placement,
            min_growth_units: DEFAULT_MIN_GROWTH_UNITS,
        }
    }

    /// Overrides the minimum growth batch, in units.
    pub const fn with_min_growth(mut self, units: usize) -> Self {
        self.min_growth_units = units;
        self
    }

    /// The raw memory source backing this allocator.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Allocates at least `nbytes` usable bytes, aligned for the widest
    /// scalar types. Returns null on a zero-size request, or when the raw
    /// memory source is exhausted; a null result leaves the allocator state
    /// untouched.
    pub unsafe fn allocate(&mut self, nbytes: usize) -> *mut u8 {
        if nbytes == 0 {
            return ptr::null_mut();
        }
        let Some(nunits) = Block::units_for(nbytes) else {
            return ptr::null_mut();
        };

        unsafe {
            if !self.ring.is_ready() && !self.bootstrap(nunits) {
                return ptr::null_mut();
            }
            if let Some(block) = self.take(nunits) {
                return Block::payload(block);
            }
            // The ring came up empty-handed: grow once and rescan with a
            // fresh full revolution. The grown block is at least nunits, so
            // a second miss means the source failed.
            if !self.grow(nunits) {
                return ptr::null_mut();
            }
            match self.take(nunits) {
                Some(block) => Block::payload(block),
                None => ptr::null_mut(),
            }
        }
    }

    /// Returns `ptr`'s block to the free ring, coalescing it with any
    /// memory-adjacent neighbor. A null `ptr` is a no-op.
    pub unsafe fn release(&mut self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        debug_assert!(self.ring.is_ready());

        unsafe { self.ring.insert(Block::from_payload(ptr)) }
    }

    /// Resizes `ptr`'s block to at least `nbytes`, preserving
    /// `min(nbytes, old usable size)` bytes of content. Null `ptr` behaves
    /// as [`allocate`](Self::allocate); `nbytes == 0` behaves as
    /// [`release`](Self::release) and returns null. On allocation failure
    /// the original block is left valid and unmodified.
    pub unsafe fn resize(&mut self, ptr: *mut u8, nbytes: usize) -> *mut u8 {
        unsafe {
            if ptr.is_null() {
                return self.allocate(nbytes);
            }
            if nbytes == 0 {
                self.release(ptr);
                return ptr::null_mut();
            }

            let new = self.allocate(nbytes);
            if new.is_null() {
                return ptr::null_mut();
            }

            let old_usable = ((*Block::from_payload(ptr)).size - 1) * UNIT;
            ptr::copy_nonoverlapping(ptr, new, nbytes.min(old_usable));
            self.release(ptr);
            new
        }
    }

    unsafe fn take(&mut self, nunits: usize) -> Option<*mut Block> {
        unsafe {
            match self.placement {
                Placement::FirstFit => self.ring.take_first_fit(nunits),
                Placement::BestFit => self.ring.take_best_fit(nunits),
            }
        }
    }

    /// First growth: one acquisition covers both the ring's sentinel and
    /// the initial free block, so a stable allocation pattern costs exactly
    /// one trip to the source even from a cold start.
    unsafe fn bootstrap(&mut self, nunits: usize) -> bool {
        let nu = nunits.max(self.min_growth_units) + 1;
        unsafe {
            let Some((start, units)) = self.acquire_units(nu) else {
                return false;
            };
            if units < nunits + 1 {
                return false;
            }

            self.ring.install_sentinel(start);
            let block = start.add(1);
            (*block).size = units - 1;
            self.ring.insert(block);
        }
        true
    }

    /// Asks the source for at least `max(nunits, min_growth_units)` units
    /// and folds whatever came back into the ring through the ordinary
    /// release path, so a contiguously extended arena merges with its
    /// neighbor automatically.
    unsafe fn grow(&mut self, nunits: usize) -> bool {
        let nu = nunits.max(self.min_growth_units);
        unsafe {
            let Some((block, units)) = self.acquire_units(nu) else {
                return false;
            };
            if units < nunits {
                return false;
            }

            (*block).size = units;
            self.ring.insert(block);
        }
        true
    }

    /// One trip to the raw source: requests `nu` whole units plus one spare
    /// unit to absorb any misalignment of the granted range, then trims the
    /// range to unit boundaries. Returns the aligned start and how many
    /// whole units fit.
    unsafe fn acquire_units(&mut self, nu: usize) -> Option<(*mut Block, usize)> {
        let Some(bytes) = nu.checked_add(1).and_then(|n| n.checked_mul(UNIT)) else {
            return None;
        };
        let Some(acq) = (unsafe { self.source.acquire(bytes) }) else {
            error!("raw memory source exhausted ({bytes} bytes requested)");
            return None;
        };

        let pad = acq.addr.as_ptr().align_offset(UNIT);
        let units = acq.len.saturating_sub(pad) / UNIT;
        if units == 0 {
            return None;
        }
        debug!("arena grown by {units} units at {:p}", acq.addr);
        Some((unsafe { acq.addr.as_ptr().add(pad).cast() }, units))
    }
}
