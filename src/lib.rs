//! A general-purpose dynamic memory allocator in the style of the classic
//! K&R storage allocator: malloc, free and realloc over a circular,
//! address-ordered free list with minimal per-block metadata.
//!
//! Every managed region carries a one-unit header right before the memory
//! handed to the caller:
//!
//! ```text
//! +--------------------------------+
//! | Header | Usable memory         |
//! +--------------------------------+
//!          ^
//!          +-- pointer returned to the caller
//! ```
//!
//! Free blocks are threaded into a single circular list ordered by address,
//! with a rotating cursor marking where the next scan starts:
//!
//! ```text
//!        +---------------------------------------------+
//!        |                                             |
//!        |   +----------+    +-------+    +-------+    |
//!        +-> | sentinel | -> | free  | -> | free  | ---+
//!            +----------+    +-------+    +-------+
//!                                ^
//!                              cursor
//! ```
//!
//! Releasing a block merges it with any memory-adjacent free neighbor, so
//! fragmentation never grows silently. When no free block satisfies a
//! request, a fresh range is acquired from a [`RawMemorySource`] (anonymous
//! page mappings by default, the program break as an alternative on unix)
//! and folded into the list through the same release path. Arena memory is
//! never returned to the system, only recycled.
//!
//! Scans are O(n) in the number of free blocks; that is the deliberate
//! price of one pointer-sized metadata field per block and no auxiliary
//! index. Placement is selectable at construction: first-fit from the
//! cursor (next-fit locality) or best-fit.
//!
//! # Quick start
//!
//! ```rust
//! use ringalloc::{Placement, RingAllocator};
//!
//! let mut alloc = RingAllocator::new(Placement::FirstFit);
//! unsafe {
//!     let p = alloc.allocate(64);
//!     assert!(!p.is_null());
//!     p.write_bytes(0xAB, 64);
//!
//!     let p = alloc.resize(p, 256);
//!     assert_eq!(*p, 0xAB);
//!
//!     alloc.release(p);
//! }
//! ```
//!
//! To replace the process allocator, register [`GlobalRingAlloc`] with
//! `#[global_allocator]`.
//!
//! # Safety
//!
//! The allocate/release/resize surface has the contract of `malloc(3)`:
//! releasing a pointer that did not come from the same allocator, or
//! releasing one twice, is undefined behavior and is not detected. The core
//! is single-threaded; [`GlobalRingAlloc`] serializes access with a single
//! lock.

mod allocator;
mod block;
mod global;
mod ring;
mod source;

pub use allocator::{DEFAULT_MIN_GROWTH_UNITS, Placement, RingAllocator};
pub use global::GlobalRingAlloc;
#[cfg(unix)]
pub use source::BrkSource;
pub use source::{Acquisition, MmapSource, RawMemorySource, page_size};
