//! Shared-ownership handle over a split strong/weak control block.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::mem;
use core::ops::Deref;
use core::ptr::NonNull;

use crate::block::{BoxedBlock, Header, InlineBlock};
use crate::weak::{Expired, Weak};

/// A single-threaded shared-ownership pointer, similar to [`std::rc::Rc`].
///
/// The handle carries two independent fields: the control block that keeps
/// the payload alive, and the pointer it dereferences to. They usually refer
/// to the same object, but [`Strong::project`] produces handles whose
/// pointer targets a sub-object of the managed payload while ownership still
/// flows through the originating block. Collapsing the two fields into one
/// would make such aliased handles impossible.
///
/// Dropping the last `Strong` for a block destroys the payload immediately
/// and synchronously. The block itself survives until the last [`Weak`] is
/// gone, so observers can keep asking [`Weak::expired`] safely.
pub struct Strong<T: ?Sized> {
    header: NonNull<Header>,
    ptr: NonNull<T>,
    _owns: PhantomData<T>,
    // !Send + !Sync: counters are plain Cells.
    _nosend: PhantomData<*mut ()>,
}

impl<T> Strong<T> {
    /// Creates a handle with the payload constructed in place inside the
    /// control block: one allocation for both, instead of the two used by
    /// [`Strong::adopt`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use rc_split::Strong;
    /// let s = Strong::new(42);
    /// assert_eq!(*s, 42);
    /// assert_eq!(Strong::strong_count(&s), 1);
    /// ```
    pub fn new(value: T) -> Self {
        let (header, ptr) = InlineBlock::new(value);
        unsafe { Self::from_parts(header, ptr) }
    }

    /// Creates a handle whose payload may hold a [`Weak`] reference to
    /// itself.
    ///
    /// The closure receives a weak back-reference to the allocation before
    /// the payload exists; upgrading it inside the closure yields `None`.
    /// Once the closure returns, the allocation becomes owned and the weak
    /// reference behaves normally.
    ///
    /// # Examples
    ///
    /// ```
    /// # use rc_split::{Strong, Weak};
    /// struct Node {
    ///     me: Weak<Node>,
    /// }
    /// let node = Strong::new_cyclic(|me| Node { me: me.clone() });
    /// assert!(Strong::ptr_eq(&node, &node.me.upgrade().unwrap()));
    /// ```
    pub fn new_cyclic<F>(data_fn: F) -> Self
    where
        F: FnOnce(&Weak<T>) -> T,
    {
        let (header, ptr) = InlineBlock::<T>::new_uninit();
        // The weak handle owns the block's initial weak unit for now; if
        // `data_fn` panics, dropping it frees the block without running the
        // (never written) payload's destructor.
        let weak = unsafe { Weak::from_parts(header, ptr) };

        unsafe { ptr.as_ptr().write(data_fn(&weak)) };
        unsafe { header.as_ref() }.make_owned();

        // The weak unit now becomes the one owned collectively by strong
        // handles; don't run the weak handle's destructor.
        mem::forget(weak);
        unsafe { Self::from_parts(header, ptr) }
    }
}

impl<T: ?Sized> Strong<T> {
    /// Adopts an already-allocated payload. The payload and the control
    /// block remain two separate allocations; the payload's storage is
    /// released when the last strong handle goes away, the block's when the
    /// last weak handle does.
    ///
    /// # Examples
    ///
    /// ```
    /// # use rc_split::Strong;
    /// let s: Strong<[u8]> = Strong::adopt(vec![1, 2, 3].into_boxed_slice());
    /// assert_eq!(s.len(), 3);
    /// ```
    pub fn adopt(payload: Box<T>) -> Self {
        let (header, ptr) = BoxedBlock::new(payload);
        unsafe { Self::from_parts(header, ptr) }
    }

    /// Adopts a raw payload pointer, as produced by [`Box::into_raw`].
    ///
    /// # Safety
    ///
    /// `ptr` must be non-null, own its allocation as if by `Box<T>`, and
    /// must not be adopted twice: two independent handles over one pointer
    /// double-free the payload.
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        Self::adopt(Box::from_raw(ptr))
    }

    pub(crate) unsafe fn from_parts(header: NonNull<Header>, ptr: NonNull<T>) -> Self {
        Strong {
            header,
            ptr,
            _owns: PhantomData,
            _nosend: PhantomData,
        }
    }

    /// Creates a weak observer for the same allocation.
    pub fn downgrade(this: &Self) -> Weak<T> {
        unsafe { this.header.as_ref() }.inc_weak();
        unsafe { Weak::from_parts(this.header, this.ptr) }
    }

    /// Creates a handle that shares ownership with `this` but dereferences
    /// to a sub-object of the payload.
    ///
    /// The projected handle keeps the whole containing object alive; only
    /// its dereference target changes. Two handles over the same block but
    /// different sub-objects compare unequal (equality is pointer identity).
    ///
    /// # Examples
    ///
    /// ```
    /// # use rc_split::Strong;
    /// struct Pair {
    ///     left: u32,
    ///     right: u32,
    /// }
    /// let pair = Strong::new(Pair { left: 1, right: 2 });
    /// let right = Strong::project(&pair, |p| &p.right);
    /// drop(pair);
    /// assert_eq!(*right, 2); // the whole Pair is still alive
    /// ```
    pub fn project<U, F>(this: &Self, f: F) -> Strong<U>
    where
        U: ?Sized,
        F: FnOnce(&T) -> &U,
    {
        // Run the projection before touching the count, so a panicking
        // closure leaves the ownership accounting unchanged.
        let ptr = NonNull::from(f(&**this));
        unsafe { this.header.as_ref() }.inc_strong();
        unsafe { Strong::from_parts(this.header, ptr) }
    }

    /// Number of strong handles sharing this allocation. Always at least 1.
    pub fn strong_count(this: &Self) -> usize {
        unsafe { this.header.as_ref() }.strong()
    }

    /// Number of weak observers for this allocation, excluding the unit
    /// held collectively by the strong handles themselves.
    pub fn weak_count(this: &Self) -> usize {
        unsafe { this.header.as_ref() }.weak() - 1
    }

    /// Raw pointer to the dereference target. For projected handles this is
    /// the sub-object, not the managed payload.
    pub fn as_ptr(this: &Self) -> *const T {
        this.ptr.as_ptr()
    }

    /// Pointer-identity comparison across payload types. Projected handles
    /// to different sub-objects of one allocation compare unequal here.
    pub fn ptr_eq<U: ?Sized>(this: &Self, other: &Strong<U>) -> bool {
        this.ptr.cast::<u8>() == other.ptr.cast::<u8>()
    }

    pub(crate) fn header(&self) -> &Header {
        unsafe { self.header.as_ref() }
    }
}

impl<T: ?Sized> Clone for Strong<T> {
    /// Shares ownership: increments the strong count only. The weak count
    /// is untouched because all strong handles jointly own a single weak
    /// unit, minted when the block was created.
    fn clone(&self) -> Self {
        self.header().inc_strong();
        unsafe { Self::from_parts(self.header, self.ptr) }
    }
}

impl<T: ?Sized> Drop for Strong<T> {
    fn drop(&mut self) {
        unsafe { Header::dec_strong(self.header) };
    }
}

impl<T: ?Sized> Deref for Strong<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // The handle owns a strong unit, so the payload is alive.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: ?Sized> AsRef<T> for Strong<T> {
    fn as_ref(&self) -> &T {
        self
    }
}

/// Checked promotion from a weak observer; the fallible counterpart of
/// [`Weak::upgrade`]. Both use the same expiry test.
impl<T: ?Sized> TryFrom<&Weak<T>> for Strong<T> {
    type Error = Expired;

    fn try_from(weak: &Weak<T>) -> Result<Self, Expired> {
        weak.upgrade().ok_or(Expired)
    }
}

impl<T: fmt::Debug + ?Sized> fmt::Debug for Strong<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T: ?Sized> PartialEq for Strong<T> {
    /// Pointer identity, not value equality: two handles are equal iff they
    /// dereference to the same address.
    fn eq(&self, other: &Self) -> bool {
        Strong::ptr_eq(self, other)
    }
}

impl<T: ?Sized> Eq for Strong<T> {}

impl<T: ?Sized> Hash for Strong<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.ptr.cast::<u8>().as_ptr() as usize).hash(state);
    }
}
