//! # rallocator — a program-break + mmap backed memory allocator
//!
//! This crate replaces the standard allocation primitives
//! (`malloc`/`free`/`calloc`/`realloc`) with a custom implementation
//! built directly on two OS primitives: extending the program break
//! (`sbrk`) and anonymous memory mapping (`mmap`/`munmap`). It exposes
//! four operations — [`Allocator::allocate`], [`Allocator::free`],
//! [`Allocator::zero_allocate`], and [`Allocator::reallocate`] — and is
//! designed for a single-threaded mutator.
//!
//! ## Overview
//!
//! ```text
//!   Heap regime (sbrk)                    Mapped regime (mmap)
//!   ┌──────────────────────────┐          ┌───────────────────────┐
//!   │ [Free][Alloc][Alloc][...]│          │ one block per mapping │
//!   └──────────────────────────┘          └───────────────────────┘
//!            ▲                                      ▲
//!            └───────────── same circular ───────────┘
//!                      doubly-linked list,
//!                      sentinel head
//! ```
//!
//! Small requests (below `MMAP_THRESHOLD`, 128 KiB) are served from a
//! heap grown with `sbrk`; everything else gets its own anonymous
//! mapping. Both regimes share one list of block descriptors so `free`
//! and `reallocate` can locate a block from nothing but its payload
//! pointer.
//!
//! ## Crate structure
//!
//! ```text
//!   rallocator
//!   ├── align      - alignment helpers (align!, align_to!, align_up)
//!   ├── block      - Block descriptor, Status, META
//!   ├── list       - circular doubly-linked list with sentinel
//!   ├── os         - sbrk / mmap / munmap / page size adapter
//!   ├── placement  - best-fit search, split, coalesce, last-block growth
//!   ├── dispatch   - heap-vs-mapped threshold, heap pre-allocation
//!   ├── realloc    - grow/shrink/migrate engine
//!   └── allocator  - the four public operations + GlobalAlloc adapter
//! ```
//!
//! ## Quick start
//!
//! ```
//! use rallocator::Allocator;
//!
//! let mut allocator = Allocator::new();
//!
//! let p = allocator.allocate(64) as *mut u64;
//! assert!(!p.is_null());
//!
//! unsafe {
//!     p.write(42);
//!     assert_eq!(p.read(), 42);
//! }
//!
//! allocator.free(p as *mut u8);
//! ```
//!
//! ## Thread safety
//!
//! [`Allocator`] is single-threaded by design: every method
//! takes `&mut self`, so the borrow checker already rules out concurrent
//! mutation without external synchronization. [`GlobalRallocator`] wraps
//! an `Allocator` behind a `Mutex` for callers that need a
//! `#[global_allocator]`.
//!
//! ## Safety
//!
//! This crate is inherently unsafe: it places descriptors by raw
//! pointer arithmetic directly over memory obtained from the OS, and
//! every payload pointer it hands out is a raw `*mut u8`. Callers must
//! ensure pointers passed to `free`/`reallocate` were returned by this
//! same `Allocator` and not already freed by it.

pub mod align;
pub mod allocator;
pub mod block;
pub mod dispatch;
pub mod list;
pub mod os;
pub mod placement;
pub mod realloc;

pub use allocator::{Allocator, GlobalRallocator};
