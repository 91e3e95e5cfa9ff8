//! Direct use of the allocator surface: allocate, fill, resize, release.
//! Run with `RUST_LOG=debug` to watch the arena grow.

use ringalloc::{Placement, RingAllocator};

fn main() {
    env_logger::init();

    let mut alloc = RingAllocator::new(Placement::FirstFit);

    unsafe {
        let p = alloc.allocate(24);
        println!("allocated 24 bytes at {p:?}");
        for i in 0..24 {
            p.add(i).write(i as u8);
        }

        let p = alloc.resize(p, 4096);
        println!("resized to 4096 bytes, now at {p:?}");
        for i in 0..24 {
            assert_eq!(*p.add(i), i as u8);
        }
        println!("first 24 bytes survived the resize");

        let q = alloc.allocate(128);
        println!("allocated 128 more bytes at {q:?}");

        alloc.release(p);
        alloc.release(q);
        println!("released everything");
    }
}
