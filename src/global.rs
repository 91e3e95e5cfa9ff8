use std::alloc::{GlobalAlloc, Layout};
use std::mem;
use std::ptr;
use std::sync::{Mutex, MutexGuard};

use crate::allocator::{Placement, RingAllocator};
use crate::block::UNIT;
use crate::source::MmapSource;

/// A [`GlobalAlloc`] front over a page-mapped [`RingAllocator`], suitable
/// for `#[global_allocator]`:
///
/// ```rust,ignore
/// use ringalloc::{GlobalRingAlloc, Placement};
///
/// #[global_allocator]
/// static ALLOCATOR: GlobalRingAlloc = GlobalRingAlloc::new(Placement::FirstFit);
/// ```
///
/// The core allocator is single-threaded; this wrapper adds the one
/// permitted concurrency accommodation, a single mutex around every entry
/// point. The mutex is the futex/SRW-based `std` one, which never allocates
/// and is therefore safe to take inside the process allocator.
///
/// Every payload the core hands out is aligned to one allocation unit (16
/// bytes). Stricter layouts are served by over-allocating and handing out
/// an aligned address inside the block, with the block's true payload
/// address stashed in the pointer-sized slot right below it so release can
/// recover it.
pub struct GlobalRingAlloc {
    inner: Mutex<RingAllocator<MmapSource>>,
}

impl GlobalRingAlloc {
    pub const fn new(placement: Placement) -> Self {
        Self { inner: Mutex::new(RingAllocator::new(placement)) }
    }

    fn lock(&self) -> MutexGuard<'_, RingAllocator<MmapSource>> {
        // A panic mid-allocation leaves the ring unusable anyway; ignore
        // poisoning rather than panic inside the allocator.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Serves a layout stricter than one unit: over-allocate by `align`
    /// plus one pointer slot, hand out the first aligned address past the
    /// slot, and record the block's payload address in the slot for
    /// [`base_of`] to recover.
    unsafe fn alloc_overaligned(&self, layout: Layout) -> *mut u8 {
        let Some(span) = layout
            .size()
            .checked_add(layout.align())
            .and_then(|n| n.checked_add(mem::size_of::<*mut u8>()))
        else {
            return ptr::null_mut();
        };

        unsafe {
            let base = self.lock().allocate(span);
            if base.is_null() {
                return ptr::null_mut();
            }
            let offset = (base as usize + mem::size_of::<*mut u8>())
                .next_multiple_of(layout.align())
                - base as usize;
            let aligned = base.add(offset);
            // The slot sits at an align-8 address: `aligned` carries at
            // least 32-byte alignment here.
            aligned.sub(mem::size_of::<*mut u8>()).cast::<*mut u8>().write(base);
            aligned
        }
    }
}

/// Recovers the payload address stashed by
/// [`GlobalRingAlloc::alloc_overaligned`].
unsafe fn base_of(ptr: *mut u8) -> *mut u8 {
    unsafe { ptr.sub(mem::size_of::<*mut u8>()).cast::<*mut u8>().read() }
}

unsafe impl GlobalAlloc for GlobalRingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        unsafe {
            if layout.align() <= UNIT {
                self.lock().allocate(layout.size())
            } else {
                self.alloc_overaligned(layout)
            }
        }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe {
            let base = if layout.align() <= UNIT { ptr } else { base_of(ptr) };
            self.lock().release(base)
        }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        unsafe {
            if layout.align() <= UNIT {
                return self.lock().resize(ptr, new_size);
            }
            // The core's resize promises nothing beyond unit alignment;
            // move the content through the over-aligned path instead.
            let new = self
                .alloc_overaligned(Layout::from_size_align_unchecked(new_size, layout.align()));
            if new.is_null() {
                return ptr::null_mut();
            }
            ptr::copy_nonoverlapping(ptr, new, new_size.min(layout.size()));
            self.lock().release(base_of(ptr));
            new
        }
    }
}
