//! Control blocks: split strong/weak bookkeeping for shared ownership.
//!
//! A `Header` carries the two counters plus two hooks that differ between
//! the block layouts: `drop_value` finalizes the payload and `drop_block`
//! frees the block's own storage. Keeping the hooks separate is what lets a
//! payload be destroyed while weak observers still need the block to answer
//! liveness queries.
//!
//! Exactly two layouts exist, so dispatch is closed: each layout installs
//! its monomorphized hook functions at construction.
//!
//! Ownership rules:
//! - The block is the only entity that frees its own storage, and only from
//!   inside `dec_weak` reaching zero. Handles never free block memory.
//! - All strong handles collectively own one unit of the weak count; it is
//!   minted at block creation and returned by the `dec_strong` that reaches
//!   zero. Cloning a strong handle therefore touches only `strong`.

use core::cell::Cell;
use core::mem::MaybeUninit;
use core::ptr::NonNull;

/// Counters and finalization hooks shared by both block layouts.
///
/// Lives at offset zero of each `#[repr(C)]` block struct, so a
/// `NonNull<Header>` can be cast back to the concrete layout inside the
/// hooks.
pub(crate) struct Header {
    strong: Cell<usize>,
    weak: Cell<usize>,
    drop_value: unsafe fn(NonNull<Header>),
    drop_block: unsafe fn(NonNull<Header>),
}

impl Header {
    fn new(
        initial_strong: usize,
        drop_value: unsafe fn(NonNull<Header>),
        drop_block: unsafe fn(NonNull<Header>),
    ) -> Self {
        Self {
            strong: Cell::new(initial_strong),
            weak: Cell::new(1),
            drop_value,
            drop_block,
        }
    }

    #[inline]
    pub(crate) fn strong(&self) -> usize {
        self.strong.get()
    }

    #[inline]
    pub(crate) fn weak(&self) -> usize {
        self.weak.get()
    }

    #[inline]
    pub(crate) fn inc_strong(&self) {
        let n = self.strong.get().wrapping_add(1);
        if n == 0 {
            // Follow Rc semantics: abort on overflow rather than continue unsafely.
            std::process::abort();
        }
        self.strong.set(n);
    }

    #[inline]
    pub(crate) fn inc_weak(&self) {
        let n = self.weak.get().wrapping_add(1);
        if n == 0 {
            std::process::abort();
        }
        self.weak.set(n);
    }

    /// Flip a cyclic block from `strong = 0` to `strong = 1` once its
    /// payload has been written.
    #[inline]
    pub(crate) fn make_owned(&self) {
        debug_assert_eq!(self.strong.get(), 0, "block already owned");
        self.strong.set(1);
    }

    /// Drop one strong reference. Reaching zero finalizes the payload and
    /// returns the collective weak unit, which may free the block.
    ///
    /// # Safety
    ///
    /// `this` must point to a live block and the caller must own one unit
    /// of the strong count. The block may be gone when this returns.
    pub(crate) unsafe fn dec_strong(this: NonNull<Header>) {
        let remaining = {
            let h = this.as_ref();
            let c = h.strong.get();
            debug_assert!(c > 0, "strong count underflow");
            h.strong.set(c - 1);
            c - 1
        };
        if remaining == 0 {
            // Copy the hook out before calling: the hook takes the block
            // pointer and must not alias a live `&Header`.
            let drop_value = this.as_ref().drop_value;
            drop_value(this);
            Self::dec_weak(this);
        }
    }

    /// Drop one weak reference. Reaching zero frees the block's storage.
    ///
    /// # Safety
    ///
    /// `this` must point to a live block and the caller must own one unit
    /// of the weak count. The block must not be touched after this returns.
    pub(crate) unsafe fn dec_weak(this: NonNull<Header>) {
        let (remaining, drop_block) = {
            let h = this.as_ref();
            let c = h.weak.get();
            debug_assert!(c > 0, "weak count underflow");
            h.weak.set(c - 1);
            (c - 1, h.drop_block)
        };
        if remaining == 0 {
            drop_block(this);
        }
    }
}

/// Block layout for an adopted, separately allocated payload.
///
/// The payload slot is cleared once the payload has been dropped, so the
/// finalize hook is idempotent even if a bug ever invoked it twice.
#[repr(C)]
pub(crate) struct BoxedBlock<T: ?Sized> {
    header: Header,
    payload: Option<NonNull<T>>,
}

impl<T: ?Sized> BoxedBlock<T> {
    /// Allocate a block adopting `payload`. Returns the header pointer and
    /// the payload pointer; the block starts at `strong = 1, weak = 1`.
    pub(crate) fn new(payload: Box<T>) -> (NonNull<Header>, NonNull<T>) {
        let payload = NonNull::from(Box::leak(payload));
        let block = Box::into_raw(Box::new(BoxedBlock {
            header: Header::new(1, drop_value_boxed::<T>, drop_block_boxed::<T>),
            payload: Some(payload),
        }));
        // `header` is the first field of a #[repr(C)] struct.
        (unsafe { NonNull::new_unchecked(block.cast()) }, payload)
    }
}

unsafe fn drop_value_boxed<T: ?Sized>(header: NonNull<Header>) {
    let block = header.cast::<BoxedBlock<T>>().as_ptr();
    if let Some(payload) = (*block).payload.take() {
        drop(Box::from_raw(payload.as_ptr()));
    }
}

unsafe fn drop_block_boxed<T: ?Sized>(header: NonNull<Header>) {
    drop(Box::from_raw(header.cast::<BoxedBlock<T>>().as_ptr()));
}

/// Block layout with the payload co-allocated in the block itself.
///
/// One allocation serves both the bookkeeping and the payload; the buffer
/// cannot be released separately, which is exactly why finalize and free are
/// distinct hooks.
#[repr(C)]
pub(crate) struct InlineBlock<T> {
    header: Header,
    value: MaybeUninit<T>,
}

impl<T> InlineBlock<T> {
    /// Allocate a block and construct `value` in place.
    pub(crate) fn new(value: T) -> (NonNull<Header>, NonNull<T>) {
        Self::alloc(1, MaybeUninit::new(value))
    }

    /// Allocate a block with an uninitialized payload buffer and
    /// `strong = 0, weak = 1`, for cyclic construction. The caller must
    /// write the payload through the returned pointer before calling
    /// `make_owned`; if it never does (e.g. on panic), dropping the last
    /// weak reference frees the block without running the payload's
    /// destructor.
    pub(crate) fn new_uninit() -> (NonNull<Header>, NonNull<T>) {
        Self::alloc(0, MaybeUninit::uninit())
    }

    fn alloc(initial_strong: usize, value: MaybeUninit<T>) -> (NonNull<Header>, NonNull<T>) {
        let block = Box::into_raw(Box::new(InlineBlock {
            header: Header::new(initial_strong, drop_value_inline::<T>, drop_block_inline::<T>),
            value,
        }));
        let value = unsafe { core::ptr::addr_of_mut!((*block).value).cast::<T>() };
        (
            unsafe { NonNull::new_unchecked(block.cast()) },
            unsafe { NonNull::new_unchecked(value) },
        )
    }
}

unsafe fn drop_value_inline<T>(header: NonNull<Header>) {
    let block = header.cast::<InlineBlock<T>>().as_ptr();
    core::ptr::drop_in_place(core::ptr::addr_of_mut!((*block).value).cast::<T>());
}

unsafe fn drop_block_inline<T>(header: NonNull<Header>) {
    // The payload was already finalized (or never written, for a cyclic
    // block abandoned before `make_owned`); `MaybeUninit` has no drop glue.
    drop(Box::from_raw(header.cast::<InlineBlock<T>>().as_ptr()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    struct Flag<'a>(&'a Cell<u32>);

    impl Drop for Flag<'_> {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn boxed_block_finalizes_before_freeing() {
        let drops = Cell::new(0);
        let (header, _payload) = BoxedBlock::new(Box::new(Flag(&drops)));

        // An observer keeps the block alive past payload finalization.
        unsafe { header.as_ref() }.inc_weak();

        unsafe { Header::dec_strong(header) };
        assert_eq!(drops.get(), 1);
        assert_eq!(unsafe { header.as_ref() }.strong(), 0);

        // Returning the observer unit frees the block.
        unsafe { Header::dec_weak(header) };
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn inline_block_single_allocation_lifecycle() {
        let drops = Cell::new(0);
        let (header, payload) = InlineBlock::new(Flag(&drops));
        assert_eq!(unsafe { header.as_ref() }.strong(), 1);
        assert_eq!(unsafe { payload.as_ref() }.0.get(), 0);

        unsafe { Header::dec_strong(header) };
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn strong_copies_leave_weak_count_alone() {
        let (header, _payload) = InlineBlock::new(7u32);
        let h = unsafe { header.as_ref() };
        h.inc_strong();
        h.inc_strong();
        assert_eq!(h.strong(), 3);
        assert_eq!(h.weak(), 1);

        unsafe { Header::dec_strong(header) };
        unsafe { Header::dec_strong(header) };
        unsafe { Header::dec_strong(header) };
    }

    #[test]
    fn abandoned_cyclic_block_skips_payload_drop() {
        let drops = Cell::new(0);
        let (header, _payload) = InlineBlock::<Flag>::new_uninit();
        assert_eq!(unsafe { header.as_ref() }.strong(), 0);

        // Never written, never owned: freeing the block must not run the
        // payload destructor.
        unsafe { Header::dec_weak(header) };
        assert_eq!(drops.get(), 0);
    }
}
