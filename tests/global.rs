//! Exercises [`GlobalRingAlloc`] registered as the process allocator:
//! every allocation these tests make, including the harness's own, goes
//! through the ring.

use std::alloc::{GlobalAlloc, Layout};
use std::collections::HashMap;

use ringalloc::{GlobalRingAlloc, Placement};

#[global_allocator]
static A: GlobalRingAlloc = GlobalRingAlloc::new(Placement::FirstFit);

#[test]
fn map() {
    let mut m = HashMap::new();
    for i in 0..100 {
        m.insert(i, i * 3);
    }
    assert_eq!(m.get(&40), Some(&120));
    drop(m);
}

#[test]
fn strings() {
    let s = format!("foo, bar, {}", "baz");
    assert_eq!(s.len(), 13);
}

#[test]
fn vec_growth_preserves_content() {
    // Repeated pushes reallocate; content must ride along.
    let mut v = Vec::new();
    for i in 0..10_000u64 {
        v.push(i);
    }
    for (i, x) in v.iter().enumerate() {
        assert_eq!(*x, i as u64);
    }
}

#[test]
fn threads() {
    assert!(std::thread::spawn(|| panic!()).join().is_err());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            std::thread::spawn(move || {
                let data = vec![t as u8; 4096];
                data.iter().map(|&b| b as usize).sum::<usize>()
            })
        })
        .collect();
    for (t, h) in handles.into_iter().enumerate() {
        assert_eq!(h.join().unwrap(), t * 4096);
    }
}

#[test]
fn huge_alloc_is_null() {
    let layout = Layout::from_size_align(isize::MAX as usize - 64, 8).unwrap();
    assert!(unsafe { A.alloc(layout) }.is_null());
}

#[test]
fn overaligned_layouts_round_trip() {
    #[repr(align(32))]
    struct Align32(u8);

    for _ in 0..1000 {
        let b = Box::new(Align32(42));
        let p = Box::into_raw(b);
        assert_eq!(p as usize % 32, 0, "{p:p} should be aligned to 32");
        unsafe {
            let b = Box::from_raw(p);
            assert_eq!(b.0, 42);
        }
    }

    unsafe {
        let layout = Layout::from_size_align(300, 128).unwrap();
        let p = A.alloc(layout);
        assert!(!p.is_null());
        assert_eq!(p as usize % 128, 0);
        p.write_bytes(0x5C, 300);

        let p = A.realloc(p, layout, 600);
        assert!(!p.is_null());
        assert_eq!(p as usize % 128, 0);
        assert_eq!(*p, 0x5C);
        assert_eq!(*p.add(299), 0x5C);

        A.dealloc(p, Layout::from_size_align(600, 128).unwrap());
    }
}

#[test]
fn channels() {
    // The channel runtime allocates its cache-padded internals with
    // 128-byte alignment; they must come back properly aligned.
    use std::sync::mpsc;

    let (tx, rx) = mpsc::channel();
    let sender = std::thread::spawn(move || {
        for i in 0..100u32 {
            tx.send(i).unwrap();
        }
    });
    let sum: u32 = rx.iter().sum();
    sender.join().unwrap();
    assert_eq!(sum, (0..100u32).sum());
}
