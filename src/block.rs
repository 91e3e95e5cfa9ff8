use std::mem;

/// Size of one allocation unit in bytes.
///
/// A unit is exactly one [`Block`] header. Every block size, and every user
/// request after rounding, is a whole number of units, so all neighbor
/// arithmetic in the free ring can be done on `*mut Block` offsets.
pub(crate) const UNIT: usize = mem::size_of::<Block>();

/// Header prefixed to every managed memory region.
///
/// ```text
/// +---------------------+ <------+
/// |        next         |        |
/// +---------------------+        | -> Header (exactly one UNIT)
/// |    size (units)     |        |
/// +---------------------+ <------+
/// |       Payload       |        |
/// |         ...         |        | -> (size - 1) units handed to the caller
/// |         ...         |        |
/// +---------------------+ <------+
/// ```
///
/// `size` counts units and includes the header's own unit. `next` is only
/// meaningful while the block sits on the free ring; once the block is
/// allocated, the caller's data overwrites the payload and `next` keeps
/// whatever stale value it had.
///
/// The forced 16-byte alignment guarantees that every unit boundary, and
/// therefore every payload pointer handed out, satisfies the alignment of
/// the widest scalar types.
#[repr(C, align(16))]
pub(crate) struct Block {
    /// Next block in free-ring order. Meaningful only while free.
    pub next: *mut Block,
    /// Size of this block in units, header included. Always >= 1 except
    /// for the ring's size-0 sentinel.
    pub size: usize,
}

impl Block {
    /// Units needed to serve a request of `nbytes`: the payload rounded up
    /// to whole units, plus one unit for the header itself. `None` if the
    /// request is so large the arithmetic overflows.
    pub fn units_for(nbytes: usize) -> Option<usize> {
        Some(nbytes.checked_add(UNIT - 1)? / UNIT + 1)
    }

    /// Pointer to the usable memory right past the header.
    pub unsafe fn payload(block: *mut Block) -> *mut u8 {
        unsafe { block.add(1).cast() }
    }

    /// Recovers the header from a payload pointer previously produced by
    /// [`Block::payload`].
    pub unsafe fn from_payload(ptr: *mut u8) -> *mut Block {
        unsafe { ptr.cast::<Block>().sub(1) }
    }

    /// Address one past the end of `block`, as an integer. Used for the
    /// contiguity checks when coalescing.
    pub unsafe fn end_addr(block: *mut Block) -> usize {
        unsafe { block as usize + (*block).size * UNIT }
    }
}
