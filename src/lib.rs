//! rc-split: single-threaded shared-ownership pointers with split
//! strong/weak lifetimes, plus simpler exclusive and intrusive handles
//! built on the same ownership vocabulary.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: decouple "does the payload still exist" (strong count) from
//!   "is the bookkeeping memory still needed" (weak count), so observers
//!   can test liveness after the payload is gone.
//! - Layers:
//!   - block: crate-private control blocks. A `Header` holds both counters
//!     and two hooks: finalize the payload, free the block. Two layouts
//!     install them: `BoxedBlock` (adopted, separately allocated payload)
//!     and `InlineBlock` (payload co-allocated with the header, one
//!     allocation total).
//!   - `Strong<T>`: owning handle; clone/drop move the strong count.
//!     Carries the block pointer and the dereference pointer as two
//!     independent fields so `Strong::project` can hand out handles to
//!     sub-objects while ownership flows through the containing object.
//!   - `Weak<T>`: observer handle; clone/drop move the weak count only.
//!     `upgrade` promotes while the payload lives; `TryFrom<&Weak<T>>` is
//!     the fallible spelling of the same test.
//!   - `Unique<T, D>`: one owner, no counters, pluggable `Deleter`.
//!   - `Intrusive<T>`: one counter embedded in the payload via `Counted`,
//!     no block, no weak semantics.
//!
//! Lifecycle
//! - A block starts at `strong = 1, weak = 1`: the extra weak unit is owned
//!   collectively by all strong handles, so cloning a `Strong` touches only
//!   the strong count.
//! - The drop of the `Strong` that takes `strong` to zero finalizes the
//!   payload immediately, then returns the collective weak unit. The drop
//!   of the `Weak` that takes `weak` to zero frees the block. Finalize
//!   always precedes free; the block frees only itself, handles never free
//!   block memory.
//!
//! Constraints
//! - Single-threaded: every handle is `!Send`/`!Sync` (plain `Cell`
//!   counters, no atomics). A multi-threaded port would additionally have
//!   to make `Weak::upgrade`'s check-then-increment a single atomic step.
//! - Count overflow aborts the process, matching `std::rc::Rc`; underflow
//!   is a `debug_assert` (a caller can only reach it through unsafe
//!   adoption misuse).
//! - Destruction is immediate and synchronous when a count reaches zero;
//!   there is no deferred reclamation.
//!
//! Notes and non-goals
//! - No cycle detection: break cycles with `Weak` (see
//!   `Strong::new_cyclic`).
//! - Equality on handles is pointer identity, not value equality; projected
//!   handles to different sub-objects of one allocation compare unequal.
//! - Public surface is the four handle types plus their small helper types;
//!   the block layer is an implementation detail.

mod block;
mod intrusive;
mod strong;
mod unique;
mod weak;

// Public surface
pub use intrusive::{Counted, Intrusive, RefCount};
pub use strong::Strong;
pub use unique::{BoxDeleter, Deleter, Unique};
pub use weak::{Expired, Weak};
