//! The program-break backend with best-fit placement. Successive sbrk
//! extensions are contiguous, so grown arenas coalesce into one block.

#[cfg(unix)]
fn main() {
    use ringalloc::{BrkSource, Placement, RingAllocator};

    env_logger::init();

    let mut alloc = RingAllocator::with_source(BrkSource, Placement::BestFit);

    unsafe {
        let p = alloc.allocate(100);
        println!("allocated 100 bytes from the program break at {p:?}");
        p.write_bytes(0x42, 100);

        let q = alloc.allocate(3000);
        println!("allocated 3000 bytes at {q:?}");

        alloc.release(p);
        alloc.release(q);

        // Both holes are back; best-fit picks the tighter one.
        let r = alloc.allocate(100);
        println!("best-fit reused {r:?} for another 100 bytes");
        alloc.release(r);
    }
}

#[cfg(not(unix))]
fn main() {
    println!("the program-break backend is unix-only");
}
