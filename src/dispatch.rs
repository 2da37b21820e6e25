//! Front-end dispatch: classifies requests into heap-served vs.
//! map-served by size threshold, and performs heap pre-allocation on
//! first use.

use crate::block::{Block, META, Status};
use crate::list::BlockList;
use crate::os;
use crate::placement;

/// Fixed break extension performed once, on the first heap-regime
/// request.
pub const HEAP_PREALLOC: usize = 128 * 1024;

/// Threshold below which `allocate`/`reallocate` serve from the heap.
/// `zero_allocate` uses [`crate::os::page_size`] instead — an
/// intentional asymmetry preserved from the source.
pub const MMAP_THRESHOLD: usize = 128 * 1024;

/// Whether a request of `aligned_size` bytes should be served from the
/// heap, using `MMAP_THRESHOLD` as the cutoff.
pub fn is_heap_request(aligned_size: usize) -> bool {
  aligned_size + META < MMAP_THRESHOLD
}

/// Whether a zero-allocate request of `aligned_size` bytes should be
/// served from the heap, using the system page size as the cutoff.
pub fn is_heap_zero_allocate(aligned_size: usize) -> bool {
  aligned_size + META < os::page_size()
}

/// Performs the one-time heap pre-allocation: extends the break by
/// `HEAP_PREALLOC` bytes and installs a single `Free` block spanning
/// the whole region. A no-op if `*preallocated` is already set.
///
/// This flag is sticky: once set it is never cleared, even if every
/// pre-allocated block is later freed and coalesced back into one — the
/// heap is never fully relinquished once touched.
pub fn ensure_heap_preallocated(list: &mut BlockList, preallocated: &mut bool) -> Option<()> {
  if *preallocated {
    return Some(());
  }

  let base = os::extend_break(HEAP_PREALLOC)?;

  let block = base as *mut Block;
  unsafe {
    (*block).size = HEAP_PREALLOC - META;
    (*block).status = Status::Free;
  }

  list.append(block);
  *preallocated = true;
  Some(())
}

/// Acquires an `Allocated` heap block of at least `aligned_size` bytes,
/// pre-allocating the heap first if this is the first heap request.
pub fn acquire_heap(list: &mut BlockList, preallocated: &mut bool, aligned_size: usize) -> Option<*mut Block> {
  ensure_heap_preallocated(list, preallocated)?;
  placement::acquire_heap_block(list, aligned_size)
}

/// Obtains a fresh anonymous mapping of exactly `META + aligned_size`
/// bytes and appends a `Mapped` block to the list.
pub fn acquire_mapped(list: &mut BlockList, aligned_size: usize) -> Option<*mut Block> {
  let base = os::map_anon(META + aligned_size)?;

  let block = base as *mut Block;
  unsafe {
    (*block).size = aligned_size;
    (*block).status = Status::Mapped;
  }

  list.append(block);
  Some(block)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn heap_threshold_classification() {
    assert!(is_heap_request(MMAP_THRESHOLD - META - 1));
    assert!(!is_heap_request(MMAP_THRESHOLD - META));
    assert!(!is_heap_request(MMAP_THRESHOLD));
  }

  #[test]
  fn zero_allocate_threshold_uses_page_size_not_mmap_threshold() {
    let page = os::page_size();
    assert!(is_heap_zero_allocate(page.saturating_sub(META + 1)));
    assert!(!is_heap_zero_allocate(page));
  }
}
