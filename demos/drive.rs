//! Command-line driver that exercises the allocator end to end.
//!
//! Prints the current program break before and after each step so the
//! effect of heap pre-allocation, splitting, coalescing, and mmap
//! migration can be watched with `pmap`/`htop` while the process is
//! paused.

use std::io::Read;

use rallocator::Allocator;

fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { libc::sbrk(0) },
  );
}

fn main() {
  let mut allocator = Allocator::new();

  print_program_break("start");
  block_until_enter_pressed();

  // 1) Small allocations reuse the 128 KiB heap pre-allocation.
  println!("\n[1] Allocate three 32-byte blocks");
  let a = allocator.allocate(32);
  let b = allocator.allocate(32);
  let c = allocator.allocate(32);
  print_program_break("after three 32-byte allocations");
  block_until_enter_pressed();

  // 2) Free the outer two, then reallocate — best-fit should reuse one
  //    of them without moving the program break.
  allocator.free(a);
  allocator.free(c);
  println!("\n[2] Freed the first and third block; reallocating 32 bytes");
  let break_before = unsafe { libc::sbrk(0) };
  let reused = allocator.allocate(32);
  let break_after = unsafe { libc::sbrk(0) };
  println!(
    "[2] reused = {:?}, break moved? {}",
    reused,
    break_before != break_after
  );
  block_until_enter_pressed();

  // 3) Free the middle block too, then ask for a larger run: coalescing
  //    of the two freed neighbors should satisfy it without growing the
  //    break.
  allocator.free(b);
  println!("\n[3] Freed the middle block; allocating 96 bytes");
  let break_before = unsafe { libc::sbrk(0) };
  let big = allocator.allocate(96);
  let break_after = unsafe { libc::sbrk(0) };
  println!(
    "[3] big = {:?}, break moved? {}",
    big,
    break_before != break_after
  );
  block_until_enter_pressed();

  // 4) A large request goes straight to a fresh anonymous mapping.
  println!("\n[4] Allocate 200 KiB (expect a fresh mmap, not sbrk growth)");
  let break_before = unsafe { libc::sbrk(0) };
  let mapped = allocator.allocate(200 * 1024);
  let break_after = unsafe { libc::sbrk(0) };
  println!(
    "[4] mapped = {:?}, break moved? {}",
    mapped,
    break_before != break_after
  );
  block_until_enter_pressed();

  // 5) Reallocating the mapped block down below the mmap threshold
  //    migrates it back onto the heap.
  println!("\n[5] Shrink the mapped block to 32 bytes");
  let shrunk = allocator.reallocate(mapped, 32);
  println!("[5] shrunk = {:?} (migrated back to the heap)", shrunk);
  block_until_enter_pressed();

  allocator.free(reused);
  allocator.free(big);
  allocator.free(shrunk);

  println!("\n[6] End of demo. Process will exit and the OS will reclaim all memory.");
}
