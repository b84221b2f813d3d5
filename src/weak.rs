//! Non-owning observer handle and its promotion error.

use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::block::Header;
use crate::strong::Strong;

/// Error returned when promoting a [`Weak`] whose payload has already been
/// dropped. [`Weak::upgrade`] reports the same condition as `None`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Expired;

impl fmt::Display for Expired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("weak handle target has already been dropped")
    }
}

impl std::error::Error for Expired {}

/// A non-owning observer of a [`Strong`] allocation.
///
/// A `Weak` keeps the control block alive but not the payload: it can
/// outlive the value and still answer [`expired`][Weak::expired] queries.
/// It can never be dereferenced; access goes through
/// [`upgrade`][Weak::upgrade], which only succeeds while at least one
/// strong handle remains.
pub struct Weak<T: ?Sized> {
    // `None` for blockless observers from `Weak::new`; those are expired
    // forever and never touch a counter.
    header: Option<NonNull<Header>>,
    ptr: NonNull<T>,
    _nosend: PhantomData<*mut ()>,
}

impl<T> Weak<T> {
    /// Creates an observer attached to nothing. It is expired from the
    /// start; [`upgrade`][Weak::upgrade] always returns `None`.
    pub fn new() -> Self {
        Weak {
            header: None,
            ptr: NonNull::dangling(),
            _nosend: PhantomData,
        }
    }
}

impl<T> Default for Weak<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Weak<T> {
    pub(crate) unsafe fn from_parts(header: NonNull<Header>, ptr: NonNull<T>) -> Self {
        Weak {
            header: Some(header),
            ptr,
            _nosend: PhantomData,
        }
    }

    /// True once the payload has been dropped (or if this observer was
    /// never attached to an allocation).
    pub fn expired(&self) -> bool {
        self.strong_count() == 0
    }

    /// Attempts to promote to a strong handle.
    ///
    /// Returns `None` exactly when [`expired`][Weak::expired] is true. The
    /// expiry check and the increment form one step here; a multi-threaded
    /// port would have to turn them into a single atomic
    /// compare-and-increment.
    ///
    /// # Examples
    ///
    /// ```
    /// # use rc_split::Strong;
    /// let s = Strong::new(5);
    /// let w = Strong::downgrade(&s);
    /// assert_eq!(*w.upgrade().unwrap(), 5);
    ///
    /// drop(s);
    /// assert!(w.upgrade().is_none());
    /// ```
    pub fn upgrade(&self) -> Option<Strong<T>> {
        let header = self.header?;
        let h = unsafe { header.as_ref() };
        if h.strong() == 0 {
            return None;
        }
        h.inc_strong();
        Some(unsafe { Strong::from_parts(header, self.ptr) })
    }

    /// Number of strong handles still sharing the allocation; 0 once the
    /// payload is gone. Advisory: tells whether a promotion would succeed
    /// right now.
    pub fn strong_count(&self) -> usize {
        match self.header {
            Some(header) => unsafe { header.as_ref() }.strong(),
            None => 0,
        }
    }

    /// Pointer-identity comparison; blockless observers compare equal only
    /// to other blockless observers.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self.header, other.header) {
            (Some(a), Some(b)) => a == b && self.ptr.cast::<u8>() == other.ptr.cast::<u8>(),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: ?Sized> Clone for Weak<T> {
    /// Adds one weak observer: increments the weak count only.
    fn clone(&self) -> Self {
        if let Some(header) = self.header {
            unsafe { header.as_ref() }.inc_weak();
        }
        Weak {
            header: self.header,
            ptr: self.ptr,
            _nosend: PhantomData,
        }
    }
}

impl<T: ?Sized> Drop for Weak<T> {
    fn drop(&mut self) {
        if let Some(header) = self.header {
            unsafe { Header::dec_weak(header) };
        }
    }
}

impl<T: ?Sized> From<&Strong<T>> for Weak<T> {
    fn from(strong: &Strong<T>) -> Self {
        Strong::downgrade(strong)
    }
}

impl<T: ?Sized> fmt::Debug for Weak<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(Weak)")
    }
}
