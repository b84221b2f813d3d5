// Unique behavioral suite.
//
// The core invariants exercised:
// - Single release: the deleter runs exactly once, on drop, and never
//   after into_raw().
// - Pluggable strategy: custom deleters observe the release; the default
//   BoxDeleter frees Box-owned payloads, sized or not.
// - Zero overhead: a Unique with a zero-sized deleter is pointer-sized.
use core::cell::Cell;
use core::mem::size_of;
use core::ptr::NonNull;
use rc_split::{BoxDeleter, Deleter, Unique};

struct Probe<'a> {
    value: i32,
    drops: &'a Cell<u32>,
}

impl Drop for Probe<'_> {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

// Test: ownership and access.
// Verifies: deref and deref_mut reach the payload; drop releases once.
#[test]
fn new_deref_and_drop() {
    let drops = Cell::new(0);
    {
        let mut u = Unique::new(Probe {
            value: 1,
            drops: &drops,
        });
        assert_eq!(u.value, 1);
        u.value += 10;
        assert_eq!(u.value, 11);
    }
    assert_eq!(drops.get(), 1);
}

// Deleter that counts its invocations before freeing the box.
struct CountingDeleter<'a> {
    hits: &'a Cell<u32>,
}

impl<T: ?Sized> Deleter<T> for CountingDeleter<'_> {
    unsafe fn delete(&mut self, ptr: NonNull<T>) {
        self.hits.set(self.hits.get() + 1);
        drop(Box::from_raw(ptr.as_ptr()));
    }
}

// Test: custom release strategy.
// Verifies: the supplied deleter is reachable through the accessor and
// runs exactly once, on drop.
#[test]
fn custom_deleter_runs_once() {
    let hits = Cell::new(0);
    {
        let ptr = NonNull::from(Box::leak(Box::new(5u64)));
        let u = unsafe { Unique::from_raw_with(ptr, CountingDeleter { hits: &hits }) };
        assert_eq!(*u, 5);
        assert_eq!(Unique::deleter(&u).hits.get(), 0);
    }
    assert_eq!(hits.get(), 1);
}

// Test: into_raw releases ownership without deleting.
// Verifies: no release happens at into_raw; the caller can free manually.
#[test]
fn into_raw_skips_deleter() {
    let drops = Cell::new(0);

    let u = Unique::new(Probe {
        value: 2,
        drops: &drops,
    });
    let raw = Unique::into_raw(u);
    assert_eq!(drops.get(), 0);

    // Reclaim through the default strategy to free the payload.
    let u = unsafe { Unique::from_raw_with(raw, BoxDeleter) };
    drop(u);
    assert_eq!(drops.get(), 1);
}

// Test: slice payloads (the array form).
// Verifies: element access and per-element destruction through one
// strategy; Box<[T]> carries its own length.
#[test]
fn slice_payload_drops_every_element() {
    let drops = Cell::new(0);
    {
        let mut u = Unique::from_vec(vec![
            Probe {
                value: 0,
                drops: &drops,
            },
            Probe {
                value: 1,
                drops: &drops,
            },
            Probe {
                value: 2,
                drops: &drops,
            },
        ]);
        assert_eq!(u.len(), 3);
        assert_eq!(u[2].value, 2);
        u[0].value = 7;
        assert_eq!(u[0].value, 7);
    }
    assert_eq!(drops.get(), 3);
}

// Test: zero-sized deleters cost nothing.
// Verifies: the handle collapses to a bare pointer, like the original's
// compressed-pair storage.
#[test]
fn default_deleter_is_free() {
    assert_eq!(size_of::<Unique<u32>>(), size_of::<NonNull<u32>>());
    assert_eq!(size_of::<Option<Unique<u32>>>(), size_of::<NonNull<u32>>());
}

// Test: unsized trait-object payloads.
// Verifies: from_box accepts a coerced Box<dyn ...> and releases it.
#[test]
fn trait_object_payload() {
    let u: Unique<dyn Fn(i32) -> i32> = Unique::from_box(Box::new(|x| x * 2));
    let f: &dyn Fn(i32) -> i32 = &*u;
    assert_eq!(f(21), 42);
}
