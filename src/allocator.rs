//! The four public operations: `allocate`, `free`, `zero_allocate`,
//! `reallocate`. This module owns the [`Allocator`] instance, normalizes
//! every request, and delegates to [`crate::dispatch`],
//! [`crate::placement`], and [`crate::realloc`].

use std::alloc::{GlobalAlloc, Layout};
use std::ptr;
use std::sync::Mutex;

use crate::align::align;
use crate::block::{Block, Status};
use crate::dispatch;
use crate::list::BlockList;
use crate::realloc;

/// Owns the sentinel list and the two flags that track lazy
/// initialization, scoped to a single instance rather than a hidden
/// process-wide singleton.
///
/// Both the sentinel and the heap pre-allocation are lazily created on
/// first use; constructing an `Allocator` does nothing by itself. A
/// fresh `Allocator::new()` is all a test needs to start from a clean
/// state.
pub struct Allocator {
  list: Option<BlockList>,
  heap_preallocated: bool,
}

/// `Allocator` holds raw `*mut Block` pointers (via `BlockList`'s
/// intrusive links) and so is not `Send` by auto-trait inference, but
/// those pointers only ever address this process's own heap/mapped
/// memory and are never aliased from another allocator instance. Moving
/// an `Allocator` to another thread is sound; only *concurrent* access
/// needs guarding, which `GlobalRallocator`'s mutex provides.
unsafe impl Send for Allocator {}

impl Allocator {
  pub const fn new() -> Self {
    Self { list: None, heap_preallocated: false }
  }

  fn list(&mut self) -> &mut BlockList {
    self.list.get_or_insert_with(BlockList::new)
  }

  /// Returns null for `size == 0`.
  pub fn allocate(&mut self, size: usize) -> *mut u8 {
    if size == 0 {
      return ptr::null_mut();
    }

    let aligned_size = align(size);
    self.acquire(aligned_size).map(Block::payload).unwrap_or(ptr::null_mut())
  }

  fn acquire(&mut self, aligned_size: usize) -> Option<*mut Block> {
    if dispatch::is_heap_request(aligned_size) {
      let preallocated = &mut self.heap_preallocated;
      let list = self.list.get_or_insert_with(BlockList::new);
      dispatch::acquire_heap(list, preallocated, aligned_size)
    } else {
      dispatch::acquire_mapped(self.list(), aligned_size)
    }
  }

  /// No-op on null, no-op if already `Free`,
  /// unmaps `Mapped` blocks, marks `Allocated` heap blocks `Free`. Never
  /// coalesces eagerly — that happens on the next placement search.
  pub fn free(&mut self, p: *mut u8) {
    if p.is_null() {
      return;
    }

    let Some(list) = self.list.as_mut() else { return };
    let Some(block) = list.find_by_payload(p) else { return };

    match unsafe { (*block).status } {
      Status::Free => {}
      Status::Allocated => unsafe { (*block).status = Status::Free },
      Status::Mapped => {
        let region = crate::block::META + unsafe { (*block).size };
        list.unlink(block);
        crate::os::unmap(block as *mut u8, region);
      }
    }
  }

  /// Returns null if either operand is zero, or if `n * size` overflows.
  /// Uses the page-size threshold (not `MMAP_THRESHOLD`) to pick heap
  /// vs. mapped regime — an intentional asymmetry with `allocate`.
  pub fn zero_allocate(&mut self, n: usize, size: usize) -> *mut u8 {
    if n == 0 || size == 0 {
      return ptr::null_mut();
    }

    let Some(product) = n.checked_mul(size) else { return ptr::null_mut() };
    let aligned_size = align(product);
    if aligned_size < n || aligned_size < size {
      return ptr::null_mut();
    }

    let block = if dispatch::is_heap_zero_allocate(aligned_size) {
      let preallocated = &mut self.heap_preallocated;
      let list = self.list.get_or_insert_with(BlockList::new);
      dispatch::acquire_heap(list, preallocated, aligned_size)
    } else {
      dispatch::acquire_mapped(self.list(), aligned_size)
    };

    let Some(block) = block else { return ptr::null_mut() };

    let payload = Block::payload(block);
    unsafe { ptr::write_bytes(payload, 0, aligned_size) };
    payload
  }

  /// `p == null` delegates to `allocate`; `size == 0` delegates to
  /// `free` and returns null. Otherwise grows, shrinks, or migrates the
  /// owning block as needed, preserving its payload.
  pub fn reallocate(&mut self, p: *mut u8, size: usize) -> *mut u8 {
    if p.is_null() {
      return self.allocate(size);
    }

    if size == 0 {
      self.free(p);
      return ptr::null_mut();
    }

    let Some(list) = self.list.as_mut() else { return ptr::null_mut() };
    let Some(block) = list.find_by_payload(p) else { return ptr::null_mut() };

    if Block::is_free(block) {
      return ptr::null_mut();
    }

    let aligned_size = align(size);
    if aligned_size == unsafe { (*block).size } {
      return p;
    }

    realloc::reallocate_block(list, &mut self.heap_preallocated, block, aligned_size)
      .map(Block::payload)
      .unwrap_or(ptr::null_mut())
  }
}

impl Default for Allocator {
  fn default() -> Self {
    Self::new()
  }
}

/// `unsafe impl GlobalAlloc` adapter so the crate can be dropped in as a
/// process's `#[global_allocator]`. Contains no allocation logic of its
/// own: every method translates a `Layout` into a raw-size call on the
/// four operations above, under a single mutex — the one place this
/// crate admits a concurrent caller, since `GlobalAlloc` requires it.
pub struct GlobalRallocator {
  inner: Mutex<Allocator>,
}

impl GlobalRallocator {
  pub const fn new() -> Self {
    Self { inner: Mutex::new(Allocator::new()) }
  }
}

impl Default for GlobalRallocator {
  fn default() -> Self {
    Self::new()
  }
}

unsafe impl GlobalAlloc for GlobalRallocator {
  unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
    self.inner.lock().unwrap().allocate(layout.size())
  }

  unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
    self.inner.lock().unwrap().free(ptr);
  }

  unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
    self.inner.lock().unwrap().zero_allocate(1, layout.size())
  }

  unsafe fn realloc(&self, ptr: *mut u8, _layout: Layout, new_size: usize) -> *mut u8 {
    self.inner.lock().unwrap().reallocate(ptr, new_size)
  }
}
