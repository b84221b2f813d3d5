//! Intrusive reference counting: the counter lives inside the payload.
//!
//! Unlike [`Strong`][crate::Strong] there is no control block and no weak
//! semantics: one counter, embedded in the object itself, and the handle is
//! a single pointer wide. The payload type opts in by embedding a
//! [`RefCount`] and implementing [`Counted`].

use core::cell::Cell;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::ops::Deref;
use core::ptr::NonNull;

/// Embedded single-threaded reference counter.
///
/// Starts at zero; handles increment it on construction and clone. `const`
/// constructor so it can sit in field initializers.
#[derive(Debug)]
pub struct RefCount {
    count: Cell<usize>,
    _nosend: PhantomData<*mut ()>,
}

impl RefCount {
    pub const fn new() -> Self {
        Self {
            count: Cell::new(0),
            _nosend: PhantomData,
        }
    }

    /// Current count. Zero only before the object is first handed to an
    /// [`Intrusive`] handle.
    pub fn get(&self) -> usize {
        self.count.get()
    }

    fn inc(&self) {
        let n = self.count.get().wrapping_add(1);
        if n == 0 {
            // Follow Rc semantics: abort on overflow rather than continue unsafely.
            std::process::abort();
        }
        self.count.set(n);
    }

    fn dec(&self) -> usize {
        let c = self.count.get();
        debug_assert!(c > 0, "RefCount underflow");
        let n = c - 1;
        self.count.set(n);
        n
    }
}

impl Default for RefCount {
    fn default() -> Self {
        Self::new()
    }
}

/// Payloads that embed their own [`RefCount`].
pub trait Counted {
    fn ref_count(&self) -> &RefCount;
}

/// A shared-ownership handle whose counter lives inside the payload.
///
/// Cloning increments the embedded count; dropping decrements it and
/// destroys the boxed payload when it reaches zero. The handle itself is one
/// pointer wide.
///
/// # Examples
///
/// ```
/// # use rc_split::{Counted, Intrusive, RefCount};
/// struct Session {
///     id: u32,
///     refs: RefCount,
/// }
/// impl Counted for Session {
///     fn ref_count(&self) -> &RefCount {
///         &self.refs
///     }
/// }
///
/// let a = Intrusive::new(Session { id: 7, refs: RefCount::new() });
/// let b = a.clone();
/// assert_eq!(Intrusive::use_count(&a), 2);
/// assert_eq!(b.id, 7);
/// ```
pub struct Intrusive<T: Counted> {
    ptr: NonNull<T>,
    _owns: PhantomData<T>,
    _nosend: PhantomData<*mut ()>,
}

impl<T: Counted> Intrusive<T> {
    /// Boxes `value` and returns the first handle to it (count becomes 1).
    pub fn new(value: T) -> Self {
        Self::from_box(Box::new(value))
    }

    /// Takes ownership of an already-boxed payload.
    pub fn from_box(payload: Box<T>) -> Self {
        let ptr = NonNull::from(Box::leak(payload));
        unsafe { ptr.as_ref() }.ref_count().inc();
        Intrusive {
            ptr,
            _owns: PhantomData,
            _nosend: PhantomData,
        }
    }

    /// Number of handles sharing the payload. Always at least 1.
    pub fn use_count(this: &Self) -> usize {
        this.deref().ref_count().get()
    }

    /// Raw pointer to the payload.
    pub fn as_ptr(this: &Self) -> *const T {
        this.ptr.as_ptr()
    }

    /// Pointer-identity comparison.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        this.ptr == other.ptr
    }
}

impl<T: Counted> Clone for Intrusive<T> {
    fn clone(&self) -> Self {
        self.deref().ref_count().inc();
        Intrusive {
            ptr: self.ptr,
            _owns: PhantomData,
            _nosend: PhantomData,
        }
    }
}

impl<T: Counted> Drop for Intrusive<T> {
    fn drop(&mut self) {
        let remaining = unsafe { self.ptr.as_ref() }.ref_count().dec();
        if remaining == 0 {
            drop(unsafe { Box::from_raw(self.ptr.as_ptr()) });
        }
    }
}

impl<T: Counted> Deref for Intrusive<T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: Counted> AsRef<T> for Intrusive<T> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T: Counted + fmt::Debug> fmt::Debug for Intrusive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T: Counted> PartialEq for Intrusive<T> {
    /// Pointer identity, consistent with [`Strong`][crate::Strong].
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl<T: Counted> Eq for Intrusive<T> {}

impl<T: Counted> Hash for Intrusive<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.ptr.as_ptr() as usize).hash(state);
    }
}
