//! Exclusive-ownership handle with a pluggable release strategy.

use core::fmt;
use core::marker::PhantomData;
use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;

/// Release strategy for a [`Unique`] payload.
///
/// The default [`BoxDeleter`] frees a `Box`-owned allocation; custom
/// deleters cover payloads owned by pools, arenas, or foreign allocators.
pub trait Deleter<T: ?Sized> {
    /// Release the payload.
    ///
    /// # Safety
    ///
    /// Called at most once, with the pointer the owning [`Unique`] was
    /// built from. The payload must not be used afterwards.
    unsafe fn delete(&mut self, ptr: NonNull<T>);
}

/// Default release strategy: the payload is owned as if by `Box<T>`.
///
/// Zero-sized, so a `Unique<T>` with this deleter is pointer-sized. Works
/// for unsized payloads too; `Box<[T]>` knows its length, so slices need no
/// separate array strategy.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BoxDeleter;

impl<T: ?Sized> Deleter<T> for BoxDeleter {
    unsafe fn delete(&mut self, ptr: NonNull<T>) {
        drop(Box::from_raw(ptr.as_ptr()));
    }
}

/// A single-owner handle: no counters, no sharing, one release.
///
/// The simpler sibling of [`Strong`][crate::Strong]: where `Strong` tracks
/// how many owners remain, `Unique` has exactly one, and spends the freed-up
/// type parameter on *how* the payload is released instead.
pub struct Unique<T: ?Sized, D: Deleter<T> = BoxDeleter> {
    ptr: NonNull<T>,
    deleter: D,
    _owns: PhantomData<T>,
    _nosend: PhantomData<*mut ()>,
}

impl<T> Unique<T> {
    /// Boxes `value` and takes ownership of it.
    pub fn new(value: T) -> Self {
        Self::from_box(Box::new(value))
    }
}

impl<T: ?Sized> Unique<T> {
    /// Takes ownership of an already-boxed payload.
    pub fn from_box(payload: Box<T>) -> Self {
        let ptr = NonNull::from(Box::leak(payload));
        unsafe { Self::from_raw_with(ptr, BoxDeleter) }
    }
}

impl<T> Unique<[T]> {
    /// Takes ownership of a vector's elements as a slice payload.
    ///
    /// # Examples
    ///
    /// ```
    /// # use rc_split::Unique;
    /// let u = Unique::from_vec(vec![1, 2, 3]);
    /// assert_eq!(u.len(), 3);
    /// assert_eq!(u[1], 2);
    /// ```
    pub fn from_vec(values: Vec<T>) -> Self {
        Self::from_box(values.into_boxed_slice())
    }
}

impl<T: ?Sized, D: Deleter<T>> Unique<T, D> {
    /// Takes ownership of a raw payload with an explicit release strategy.
    ///
    /// # Safety
    ///
    /// `ptr` must stay valid until `deleter.delete(ptr)` runs, and that
    /// call must actually release it. The pointer must not be owned by
    /// anything else.
    pub unsafe fn from_raw_with(ptr: NonNull<T>, deleter: D) -> Self {
        Unique {
            ptr,
            deleter,
            _owns: PhantomData,
            _nosend: PhantomData,
        }
    }

    /// Releases ownership without running the deleter and returns the raw
    /// payload pointer. The caller becomes responsible for the payload.
    pub fn into_raw(this: Self) -> NonNull<T> {
        let this = ManuallyDrop::new(this);
        // The deleter itself still gets dropped; the payload does not.
        unsafe { core::ptr::read(&this.deleter) };
        this.ptr
    }

    /// Raw pointer to the payload.
    pub fn as_ptr(this: &Self) -> *const T {
        this.ptr.as_ptr()
    }

    /// The release strategy that will run on drop.
    pub fn deleter(this: &Self) -> &D {
        &this.deleter
    }
}

impl<T: ?Sized, D: Deleter<T>> Drop for Unique<T, D> {
    fn drop(&mut self) {
        unsafe { self.deleter.delete(self.ptr) };
    }
}

impl<T: ?Sized, D: Deleter<T>> Deref for Unique<T, D> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: ?Sized, D: Deleter<T>> DerefMut for Unique<T, D> {
    fn deref_mut(&mut self) -> &mut T {
        // Exclusive ownership plus &mut self: no other path to the payload.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T: ?Sized, D: Deleter<T>> AsRef<T> for Unique<T, D> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T: fmt::Debug + ?Sized, D: Deleter<T>> fmt::Debug for Unique<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
