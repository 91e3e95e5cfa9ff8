use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A contiguous range of raw memory handed back by a [`RawMemorySource`].
///
/// `len` is the actual length granted, which may exceed what was asked for
/// when the underlying primitive only deals in page-sized chunks.
pub struct Acquisition {
    /// Start of the range.
    pub addr: NonNull<u8>,
    /// Actual length of the range in bytes, >= the requested minimum.
    pub len: usize,
}

/// The one capability the allocator needs from the outside world: a supply
/// of fresh addressable memory. The allocator never hands ranges back, so
/// no release call exists.
///
/// Implementations don't need to align or zero the range; the arena grower
/// trims to unit boundaries itself.
pub trait RawMemorySource {
    /// Returns a range of at least `min_len` bytes, or `None` when the
    /// system cannot supply one.
    ///
    /// # Safety
    /// The returned range must be readable, writable, and must stay valid
    /// for the life of the process.
    unsafe fn acquire(&mut self, min_len: usize) -> Option<Acquisition>;
}

/// Page-mapping source: anonymous private mappings via [`libc::mmap`] on
/// unix and `VirtualAlloc` on windows. Grants whole pages, so the actual
/// length is the request rounded up to the page size.
pub struct MmapSource;

/// Program-break source: extends the data segment with [`libc::sbrk`].
/// Grants exactly what was asked. Successive acquisitions are usually
/// contiguous, which lets grown arenas coalesce into one block.
#[cfg(unix)]
pub struct BrkSource;

/// Cached page size. Zero until the first query.
static PAGE_SIZE: AtomicUsize = AtomicUsize::new(0);

/// Virtual memory page size of the machine, queried once and cached.
pub fn page_size() -> usize {
    match PAGE_SIZE.load(Ordering::Relaxed) {
        0 => {
            let size = sys::page_size();
            PAGE_SIZE.store(size, Ordering::Relaxed);
            size
        }
        size => size,
    }
}

/// Rounds `len` up to a whole number of pages. `None` on overflow.
fn round_to_pages(len: usize) -> Option<usize> {
    let page = page_size();
    Some(len.checked_add(page - 1)? & !(page - 1))
}

impl RawMemorySource for MmapSource {
    unsafe fn acquire(&mut self, min_len: usize) -> Option<Acquisition> {
        let len = round_to_pages(min_len)?;
        let addr = unsafe { sys::map_pages(len)? };
        Some(Acquisition { addr, len })
    }
}

#[cfg(unix)]
impl RawMemorySource for BrkSource {
    unsafe fn acquire(&mut self, min_len: usize) -> Option<Acquisition> {
        let delta = libc::intptr_t::try_from(min_len).ok()?;

        unsafe {
            let addr = libc::sbrk(delta);
            if addr == usize::MAX as *mut libc::c_void {
                return None;
            }
            Some(Acquisition { addr: NonNull::new(addr.cast())?, len: min_len })
        }
    }
}

#[cfg(unix)]
mod sys {
    use std::os::raw::{c_int, c_void};
    use std::ptr::NonNull;

    use libc::{mmap, off_t, size_t};

    pub(super) unsafe fn map_pages(len: usize) -> Option<NonNull<u8>> {
        // mmap parameters.
        const ADDR: *mut c_void = std::ptr::null_mut::<c_void>();
        // Read-Write only memory.
        const PROT: c_int = libc::PROT_READ | libc::PROT_WRITE;
        const FLAGS: c_int = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;
        const FD: c_int = -1;
        const OFFSET: off_t = 0;

        unsafe {
            let addr = mmap(ADDR, len as size_t, PROT, FLAGS, FD, OFFSET);

            match addr {
                libc::MAP_FAILED => None,
                addr => Some(NonNull::new_unchecked(addr).cast::<u8>()),
            }
        }
    }

    pub(super) fn page_size() -> usize {
        unsafe { libc::sysconf(libc::_SC_PAGE_SIZE) as usize }
    }
}

#[cfg(windows)]
mod sys {
    use std::mem::MaybeUninit;
    use std::ptr::NonNull;

    use windows::Win32::System::{Memory, SystemInformation};

    pub(super) unsafe fn map_pages(len: usize) -> Option<NonNull<u8>> {
        // Read-Write only.
        let protection = Memory::PAGE_READWRITE;
        let flags = Memory::MEM_RESERVE | Memory::MEM_COMMIT;

        unsafe {
            let addr = Memory::VirtualAlloc(None, len, flags, protection);

            NonNull::new(addr.cast())
        }
    }

    pub(super) fn page_size() -> usize {
        unsafe {
            let mut system_info = MaybeUninit::uninit();
            SystemInformation::GetSystemInfo(system_info.as_mut_ptr());

            system_info.assume_init().dwPageSize as usize
        }
    }
}
