//! Reallocation engine: decides grow-in-place vs. migrate, handles
//! transitions between heap and mapped regimes, and preserves payload
//! contents across either.
//!
//! The preamble checks (null pointer, zero size, unknown pointer,
//! already-free pointer, equal aligned size) are handled by the caller in
//! [`crate::allocator`]; everything here assumes `block` is a live block
//! and `aligned_size != block.size`.

use std::ptr;

use crate::block::{Block, META, Status};
use crate::dispatch::{self, MMAP_THRESHOLD};
use crate::list::BlockList;
use crate::os;
use crate::placement;

/// Copies `len` bytes from `src` to the payload of `dst`, using memmove
/// semantics: the fallback path in [`grow`] can leave source and
/// destination within the same heap region after forward coalescing, so
/// a plain non-overlapping copy would be unsound.
fn copy_payload(src: *mut u8, dst: *mut Block, len: usize) {
  let dst_payload = Block::payload(dst);
  unsafe { ptr::copy(src, dst_payload, len) };
}

/// Dispatches a reallocation of `block` to `aligned_size` bytes
/// (already confirmed different from `block`'s current size). Returns
/// the block whose payload the caller should return, or `None` if the
/// underlying OS call failed.
pub fn reallocate_block(
  list: &mut BlockList,
  preallocated: &mut bool,
  block: *mut Block,
  aligned_size: usize,
) -> Option<*mut Block> {
  let current_size = unsafe { (*block).size };

  if aligned_size < current_size {
    shrink(list, preallocated, block, aligned_size)
  } else {
    grow(list, block, aligned_size)
  }
}

fn shrink(list: &mut BlockList, preallocated: &mut bool, block: *mut Block, aligned_size: usize) -> Option<*mut Block> {
  let payload = Block::payload(block);

  if Block::is_mapped(block) {
    let old_size = unsafe { (*block).size };
    let old_region = META + old_size;

    return if aligned_size >= MMAP_THRESHOLD {
      let fresh = dispatch::acquire_mapped(list, aligned_size)?;
      copy_payload(payload, fresh, aligned_size.min(old_size));
      list.unlink(block);
      os::unmap(block as *mut u8, old_region);
      Some(fresh)
    } else {
      let fresh = dispatch::acquire_heap(list, preallocated, aligned_size)?;
      copy_payload(payload, fresh, aligned_size);
      list.unlink(block);
      os::unmap(block as *mut u8, old_region);
      Some(fresh)
    };
  }

  // Heap-regime: attempt a split at the smaller size, same pointer either way.
  placement::split(list, block, aligned_size);
  Some(block)
}

fn grow(list: &mut BlockList, block: *mut Block, aligned_size: usize) -> Option<*mut Block> {
  let payload = Block::payload(block);
  let original_size = unsafe { (*block).size };

  if Block::is_mapped(block) {
    let fresh = dispatch::acquire_mapped(list, aligned_size)?;
    copy_payload(payload, fresh, original_size);
    list.unlink(block);
    os::unmap(block as *mut u8, META + original_size);
    return Some(fresh);
  }

  if aligned_size >= MMAP_THRESHOLD {
    let fresh = dispatch::acquire_mapped(list, aligned_size)?;
    copy_payload(payload, fresh, original_size);
    unsafe { (*block).status = Status::Free };
    return Some(fresh);
  }

  if Some(block) == placement::last_heap_block(list) {
    os::extend_break(aligned_size - original_size)?;
    unsafe { (*block).size = aligned_size };
    return Some(block);
  }

  if forward_coalesce(list, block, aligned_size) {
    placement::split(list, block, aligned_size);
    return Some(block);
  }

  let fresh = placement::acquire_heap_block(list, aligned_size)?;
  copy_payload(payload, fresh, original_size);
  unsafe { (*block).status = Status::Free };
  Some(fresh)
}

/// Absorbs successive `Free` list neighbors of `block` into it, growing
/// `block.size` as it goes. Stops at the first non-`Free`, non-`Mapped`
/// neighbor, or once `block.size >= target`. `Mapped` neighbors are
/// skipped without being coalesced.
///
/// Returns whether `block.size >= target` after the pass.
fn forward_coalesce(list: &mut BlockList, block: *mut Block, target: usize) -> bool {
  let head = list.head();
  let mut neighbor = unsafe { (*block).next };

  while neighbor != head {
    if unsafe { (*block).size } >= target {
      break;
    }

    match unsafe { (*neighbor).status } {
      Status::Free => {
        let absorbed_size = unsafe { (*neighbor).size };
        unsafe { (*block).size += META + absorbed_size };
        let next = unsafe { (*neighbor).next };
        list.unlink(neighbor);
        neighbor = next;
      }
      Status::Mapped => {
        neighbor = unsafe { (*neighbor).next };
      }
      Status::Allocated => break,
    }
  }

  unsafe { (*block).size >= target }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::Status;

  fn leak(size: usize, status: Status) -> *mut Block {
    Box::into_raw(Box::new(Block { size, status, prev: ptr::null_mut(), next: ptr::null_mut() }))
  }

  #[test]
  fn forward_coalesce_absorbs_free_runs_and_skips_mapped() {
    let mut list = BlockList::new();
    let block = leak(16, Status::Allocated);
    let mapped = leak(8, Status::Mapped);
    let free1 = leak(16, Status::Free);
    let free2 = leak(16, Status::Free);
    let stop = leak(8, Status::Allocated);

    list.append(block);
    list.append(mapped);
    list.append(free1);
    list.append(free2);
    list.append(stop);

    let satisfied = forward_coalesce(&mut list, block, 16 + META + 16 + META + 16);
    assert!(satisfied);

    let visited: Vec<*mut Block> = list.iter().collect();
    assert_eq!(visited, vec![block, mapped, stop]);
  }

  #[test]
  fn forward_coalesce_stops_at_allocated_neighbor() {
    let mut list = BlockList::new();
    let block = leak(16, Status::Allocated);
    let busy = leak(16, Status::Allocated);
    list.append(block);
    list.append(busy);

    let satisfied = forward_coalesce(&mut list, block, 1000);
    assert!(!satisfied);
    unsafe { assert_eq!((*block).size, 16) };
  }
}
