use std::io::Read;
use std::ptr;

use libc::sbrk;
use segalloc::{Sbrk, SegListAllocator};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`,
/// `htop`, `gdb`, or just visually track how allocations change the
/// program break.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break using `sbrk(0)`.
fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
}

/// Prints the allocator's bookkeeping counters.
fn print_stats<S: segalloc::HeapSource>(allocator: &SegListAllocator<S>) {
  println!(
    "    heap = {} bytes, free blocks = {}, mallocs = {}, extends = {}",
    allocator.heap_size(),
    allocator.free_blocks(),
    allocator.mallocs(),
    allocator.extends(),
  );
}

fn main() {
  // RUST_LOG=segalloc=debug shows every allocation decision,
  // RUST_LOG=segalloc=trace additionally shows each sbrk call.
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  let mut allocator = SegListAllocator::new(Sbrk::new());

  unsafe {
    print_program_break("start");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 1) Carve the initial chunk: one 2080-byte free block.
    // --------------------------------------------------------------------
    assert!(allocator.init(), "initial heap extension failed");
    println!("\n[1] init: initial chunk carved");
    print_stats(&allocator);
    print_program_break("after init");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 2) Allocate a few blocks; watch them split off the initial chunk.
    // --------------------------------------------------------------------
    let first = allocator.allocate(64);
    let second = allocator.allocate(200);
    let third = allocator.allocate(64);
    println!("\n[2] Allocate 64, 200, 64 bytes");
    println!("    first  = {first:?}");
    println!("    second = {second:?}");
    println!("    third  = {third:?}");
    print_stats(&allocator);

    first.write(0xAA);
    ptr::write_bytes(second, 0xBB, 200);
    third.write(0xCC);
    println!("    wrote patterns into all three blocks");

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 3) Free the middle block: it becomes a recyclable free block
    //    between two allocated neighbors.
    // --------------------------------------------------------------------
    allocator.deallocate(second);
    println!("\n[3] Freed the middle block");
    print_stats(&allocator);
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 4) Allocate 150 bytes: first-fit reuses the freed middle block.
    // --------------------------------------------------------------------
    let reused = allocator.allocate(150);
    println!("\n[4] Allocate 150 bytes (check reuse of the freed block)");
    println!(
      "    reused == second? {}",
      if reused == second {
        "Yes, it reused the freed block"
      } else {
        "No, it allocated somewhere else"
      }
    );
    print_stats(&allocator);
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 5) Free first and reused: neighbors coalesce as they go.
    // --------------------------------------------------------------------
    allocator.deallocate(first);
    allocator.deallocate(reused);
    println!("\n[5] Freed the first two blocks (they merge into one)");
    print_stats(&allocator);
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 6) Grow an allocation; the payload prefix moves along.
    // --------------------------------------------------------------------
    let grown = allocator.reallocate(third, 4096);
    println!("\n[6] reallocate(third, 4096)");
    println!("    third = {third:?} -> grown = {grown:?}");
    println!("    first payload byte = 0x{:X}", grown.read());
    print_stats(&allocator);
    print_program_break("after realloc");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 7) Zeroed allocation.
    // --------------------------------------------------------------------
    let zeroed = allocator.zero_allocate(100, 8);
    println!("\n[7] zero_allocate(100, 8)");
    let all_zero = (0..800).all(|i| zeroed.add(i).read() == 0);
    println!("    800 bytes all zero? {all_zero}");
    print_stats(&allocator);
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 8) Verify the heap and exit. The OS reclaims all memory when the
    //    process exits.
    // --------------------------------------------------------------------
    allocator.deallocate(grown);
    allocator.deallocate(zeroed);
    println!("\n[8] check_heap() -> {}", allocator.check_heap());
    print_stats(&allocator);
    println!("\nEnd of example.");
  }
}
