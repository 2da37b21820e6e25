//! Best-fit search, split, coalesce, and in-place last-block expansion
//! over the heap regime.
//!
//! Every function here only touches heap-regime bookkeeping; the
//! mapped-regime path lives in [`crate::dispatch`] and
//! [`crate::realloc`].

use crate::block::{Block, META, Status};
use crate::list::BlockList;
use crate::os;

/// Walks the list from the head, merging each run of adjacent `Free`
/// heap blocks into its leftmost member.
///
/// `Allocated` blocks reset the "left" anchor. `Mapped` blocks are
/// skipped without resetting it: a mapped region can never sit physically
/// between two adjacent heap blocks, so skipping it during traversal
/// cannot merge blocks that aren't truly adjacent.
pub fn coalesce(list: &mut BlockList) {
  let mut left: Option<*mut Block> = None;

  for block in list.iter() {
    match unsafe { (*block).status } {
      Status::Mapped => continue,
      Status::Allocated => left = None,
      Status::Free => match left {
        None => left = Some(block),
        Some(left_block) => unsafe {
          (*left_block).size += META + (*block).size;
          list.unlink(block);
        },
      },
    }
  }
}

/// Scans the list for the smallest `Free` heap block whose size is at
/// least `aligned_size`, breaking ties by first occurrence.
pub fn best_fit(list: &BlockList, aligned_size: usize) -> Option<*mut Block> {
  let mut best: Option<*mut Block> = None;

  for block in list.iter() {
    let is_candidate = unsafe { (*block).status == Status::Free && (*block).size >= aligned_size };
    if !is_candidate {
      continue;
    }

    let smaller_than_current_best = match best {
      None => true,
      Some(current) => unsafe { (*block).size < (*current).size },
    };

    if smaller_than_current_best {
      best = Some(block);
    }
  }

  best
}

/// Splits `block` (already selected as a best-fit candidate of size
/// `>= aligned_size`) when the surplus can hold a new descriptor plus at
/// least one payload byte. Leaves `block` at exactly `aligned_size` and
/// inserted, immediately after it, a new `Free` trailing block when the
/// split threshold is met.
pub fn split(list: &mut BlockList, block: *mut Block, aligned_size: usize) {
  let original_size = unsafe { (*block).size };

  if original_size < aligned_size + META + 8 {
    return;
  }

  let trailing_size = original_size - aligned_size - META;
  let trailing = unsafe { (block as *mut u8).add(META + aligned_size) } as *mut Block;
  unsafe {
    (*trailing).size = trailing_size;
    (*trailing).status = Status::Free;
  }

  list.insert_after(block, trailing);
  unsafe { (*block).size = aligned_size };
}

/// Returns the last heap-regime block in list order, scanning backward
/// past any trailing `Mapped` blocks.
pub fn last_heap_block(list: &BlockList) -> Option<*mut Block> {
  let mut last_heap: Option<*mut Block> = None;

  for block in list.iter() {
    if !Block::is_mapped(block) {
      last_heap = Some(block);
    }
  }

  last_heap
}

/// If the last heap block is `Free`, extends the program break so it
/// grows to `aligned_size` in place and marks it `Allocated`.
///
/// Returns `None` if there is no free last heap block, or if the break
/// extension fails.
pub fn expand_last_in_place(list: &BlockList, aligned_size: usize) -> Option<*mut Block> {
  let last = last_heap_block(list)?;

  if !Block::is_free(last) {
    return None;
  }

  let current_size = unsafe { (*last).size };
  if aligned_size <= current_size {
    unsafe { (*last).status = Status::Allocated };
    return Some(last);
  }

  os::extend_break(aligned_size - current_size)?;

  unsafe {
    (*last).size = aligned_size;
    (*last).status = Status::Allocated;
  }

  Some(last)
}

/// Extends the program break by `META + aligned_size` and appends a
/// fresh `Allocated` heap block.
pub fn append_fresh_heap_block(list: &mut BlockList, aligned_size: usize) -> Option<*mut Block> {
  let base = os::extend_break(META + aligned_size)?;

  let block = base as *mut Block;
  unsafe {
    (*block).size = aligned_size;
    (*block).status = Status::Allocated;
  }

  list.append(block);
  Some(block)
}

/// Runs the full placement search in order: coalesce, best-fit (with
/// split), last-block expansion, then a fresh heap block. Always returns
/// an `Allocated` block on success.
pub fn acquire_heap_block(list: &mut BlockList, aligned_size: usize) -> Option<*mut Block> {
  coalesce(list);

  if let Some(block) = best_fit(list, aligned_size) {
    split(list, block, aligned_size);
    unsafe { (*block).status = Status::Allocated };
    return Some(block);
  }

  if let Some(block) = expand_last_in_place(list, aligned_size) {
    return Some(block);
  }

  append_fresh_heap_block(list, aligned_size)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::Status;

  fn leak(size: usize, status: Status) -> *mut Block {
    Box::into_raw(Box::new(Block { size, status, prev: std::ptr::null_mut(), next: std::ptr::null_mut() }))
  }

  /// Like `leak`, but backed by a real `META + size`-byte region rather
  /// than a single `Block`-sized allocation. `split` now carves its
  /// trailing descriptor out of the source block's own backing memory by
  /// pointer arithmetic, so tests that call `split` need a block whose
  /// backing storage actually spans its claimed payload size.
  fn leak_region(size: usize, status: Status) -> *mut Block {
    let storage = vec![0u8; META + size].into_boxed_slice();
    let block = Box::into_raw(storage) as *mut Block;
    unsafe {
      (*block).size = size;
      (*block).status = status;
      (*block).prev = std::ptr::null_mut();
      (*block).next = std::ptr::null_mut();
    }
    block
  }

  #[test]
  fn coalesce_merges_adjacent_free_runs_and_skips_mapped() {
    let mut list = BlockList::new();
    let a = leak(16, Status::Free);
    let m = leak(32, Status::Mapped);
    let b = leak(24, Status::Free);
    let c = leak(8, Status::Free);
    let d = leak(16, Status::Allocated);

    list.append(a);
    list.append(m);
    list.append(b);
    list.append(c);
    list.append(d);

    coalesce(&mut list);

    let visited: Vec<*mut Block> = list.iter().collect();
    assert_eq!(visited, vec![a, m, b, d]);
    unsafe {
      assert_eq!((*b).size, 24 + META + 8);
    }
  }

  #[test]
  fn best_fit_picks_smallest_sufficient_free_block() {
    let mut list = BlockList::new();
    let small = leak(16, Status::Free);
    let exact = leak(32, Status::Free);
    let big = leak(64, Status::Free);
    let busy = leak(16, Status::Allocated);

    list.append(small);
    list.append(busy);
    list.append(big);
    list.append(exact);

    let found = best_fit(&list, 32);
    assert_eq!(found, Some(exact));
  }

  #[test]
  fn best_fit_returns_none_when_nothing_fits() {
    let mut list = BlockList::new();
    let small = leak(8, Status::Free);
    list.append(small);

    assert_eq!(best_fit(&list, 64), None);
  }

  #[test]
  fn split_leaves_trailing_free_block_when_surplus_is_large_enough() {
    let mut list = BlockList::new();
    let block = leak_region(128, Status::Free);
    list.append(block);

    split(&mut list, block, 32);

    unsafe { assert_eq!((*block).size, 32) };

    let visited: Vec<*mut Block> = list.iter().collect();
    assert_eq!(visited.len(), 2);
    let trailing = visited[1];
    unsafe {
      assert_eq!((*trailing).status, Status::Free);
      assert_eq!((*trailing).size, 128 - 32 - META);
    }
  }

  #[test]
  fn split_does_nothing_when_surplus_is_too_small() {
    let mut list = BlockList::new();
    let block = leak_region(32 + META, Status::Free);
    list.append(block);

    split(&mut list, block, 32);

    unsafe { assert_eq!((*block).size, 32 + META) };
    assert_eq!(list.iter().count(), 1);
  }

  #[test]
  fn last_heap_block_skips_trailing_mapped_blocks() {
    let mut list = BlockList::new();
    let heap_block = leak(16, Status::Allocated);
    let mapped = leak(64, Status::Mapped);
    list.append(heap_block);
    list.append(mapped);

    assert_eq!(last_heap_block(&list), Some(heap_block));
  }
}
