//! Thin semantic wrapper over program-break extension and anonymous
//! memory mapping.
//!
//! Every raw interaction with `sbrk`/`mmap`/`munmap` funnels through this
//! module. Nothing above this layer ever calls `libc` directly.

use std::os::raw::c_void;
use std::sync::OnceLock;

use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE, intptr_t};

static PAGE_SIZE: OnceLock<usize> = OnceLock::new();

/// Returns the system's virtual memory page size, caching it after the
/// first call. This is immutable system information, not allocator
/// state, so it is cached process-wide rather than per-[`crate::allocator::Allocator`]
/// instance.
pub fn page_size() -> usize {
  *PAGE_SIZE.get_or_init(|| unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize })
}

/// Extends the program break by `delta` bytes and returns the *previous*
/// break (the base of the newly available region).
///
/// `delta` must be non-negative; the program break is never shrunk back.
///
/// Returns `None` if the OS refuses the extension (`sbrk` returning
/// `(void*)-1`).
pub fn extend_break(delta: usize) -> Option<*mut u8> {
  debug_assert!(delta > 0, "extend_break is never called with a zero delta");

  let previous = unsafe { libc::sbrk(delta as intptr_t) };
  if previous as isize == -1 {
    return None;
  }

  Some(previous as *mut u8)
}

/// Obtains a fresh anonymous private mapping of at least `n` bytes,
/// zero-filled by the kernel. Returns `None` on failure.
pub fn map_anon(n: usize) -> Option<*mut u8> {
  debug_assert!(n > 0, "map_anon is never called with a zero length");

  let addr = unsafe {
    libc::mmap(
      std::ptr::null_mut::<c_void>(),
      n,
      PROT_READ | PROT_WRITE,
      MAP_PRIVATE | MAP_ANONYMOUS,
      -1,
      0,
    )
  };

  if addr == MAP_FAILED {
    return None;
  }

  Some(addr as *mut u8)
}

/// Releases a previously mapped region of `n` bytes starting at `base`.
///
/// Failure here means the mapping was already corrupted or tampered with
/// externally, a fatal condition, so this panics instead of returning a
/// `Result`.
pub fn unmap(base: *mut u8, n: usize) {
  let result = unsafe { libc::munmap(base as *mut c_void, n) };
  assert_eq!(result, 0, "munmap failed for region at {base:p} of {n} bytes");
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn page_size_is_a_positive_power_of_two() {
    let size = page_size();
    assert!(size > 0);
    assert_eq!(size & (size - 1), 0);
  }

  #[test]
  fn extend_break_advances_monotonically() {
    let first = extend_break(64).expect("sbrk should succeed in tests");
    let second = extend_break(64).expect("sbrk should succeed in tests");
    assert!((second as usize) >= (first as usize) + 64);
  }

  #[test]
  fn map_and_unmap_roundtrip() {
    let size = page_size();
    let base = map_anon(size).expect("mmap should succeed in tests");
    unsafe {
      std::ptr::write_bytes(base, 0xAB, size);
      assert_eq!(*base, 0xAB);
    }
    unmap(base, size);
  }

  #[test]
  fn mapped_memory_is_zero_filled() {
    let size = page_size();
    let base = map_anon(size).expect("mmap should succeed in tests");
    let slice = unsafe { std::slice::from_raw_parts(base, size) };
    assert!(slice.iter().all(|&b| b == 0));
    unmap(base, size);
  }
}
