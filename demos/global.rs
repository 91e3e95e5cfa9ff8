//! Runs ordinary std types on top of [`GlobalRingAlloc`] registered as the
//! process allocator.

use std::thread;

use ringalloc::{GlobalRingAlloc, Placement};

#[global_allocator]
static ALLOCATOR: GlobalRingAlloc = GlobalRingAlloc::new(Placement::FirstFit);

fn main() {
    // Box example
    let val_box = Box::new(22);
    println!("Box value: {}, at: {:p}", val_box, val_box);

    // Vec example: growth goes through realloc.
    let mut v = Vec::new();
    for i in 0..5 {
        v.push(i * 10);
        println!("added {}; capacity: {}; at: {:p}", v[i], v.capacity(), v.as_ptr());
    }

    // String example
    let msg = String::from("heap testing");
    println!("string '{}' at: {:p}", msg, msg.as_ptr());

    // Coalescing example: two adjacent boxes freed, one bigger box should
    // fit in the merged hole.
    let a = Box::new([0u8; 64]);
    let b = Box::new([0u8; 64]);
    let ptr_a = a.as_ptr();

    drop(a);
    drop(b);

    let c = Box::new([0u8; 128]);
    let ptr_c = c.as_ptr();

    if ptr_a == ptr_c {
        println!("merged hole reused at {ptr_c:p}");
    } else {
        println!("no reuse: a was at {ptr_a:p}, c is at {ptr_c:p}");
    }

    // The global lock makes concurrent use safe.
    let t1 = thread::spawn(|| {
        let _ = Box::new(222);
    });
    let t2 = thread::spawn(|| {
        let _ = Box::new(222);
    });

    t1.join().unwrap();
    t2.join().unwrap();
    println!("threads done");
}
