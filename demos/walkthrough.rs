use std::io::Read;

use libc::sbrk;
use rmalloc::{FreeListAllocator, print_alloc};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`,
/// `htop`, `gdb`, or just visually track how allocations move the program
/// break.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break using `sbrk(0)`.
/// The program break is the upper boundary of the heap managed via brk/sbrk.
unsafe fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
}

fn main() {
  // Run with RUST_LOG=debug to watch the allocator narrate heap growth and
  // tail give-back as it happens.
  env_logger::init();

  let mut allocator = FreeListAllocator::new();

  unsafe {
    print_program_break("start");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 1) Allocate three blocks. Each one extends the heap, so the break
    //    moves up three times.
    // --------------------------------------------------------------------
    let first = allocator.allocate(24);
    println!("\n[1] Allocate 24 bytes");
    print_alloc(24, first);

    let second = allocator.allocate(100);
    println!("[1] Allocate 100 bytes");
    print_alloc(100, second);

    let third = allocator.allocate(40);
    println!("[1] Allocate 40 bytes");
    print_alloc(40, third);

    println!("[1] Block list: {:?}", allocator.stats());
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 2) Write into the middle block to show the memory is usable.
    // --------------------------------------------------------------------
    let bytes = second;
    for i in 0..100 {
      bytes.add(i).write(i as u8);
    }
    println!("\n[2] Filled the 100-byte block with 0..99");
    println!("[2] second[42] = {}", bytes.add(42).read());
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 3) Release the middle block. It is not the tail, so the break does
    //    not move; the block becomes a reusable hole instead.
    // --------------------------------------------------------------------
    allocator.release(second);
    println!("\n[3] Released the middle block at {:?}", second);
    println!("[3] Block list: {:?}", allocator.stats());
    print_program_break("after middle release");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 4) Allocate 32 bytes. First fit lands in the hole, splitting it:
    //    the new block reuses the released address.
    // --------------------------------------------------------------------
    let reused = allocator.allocate(32);
    println!("\n[4] Allocate 32 bytes (check reuse of the hole)");
    print_alloc(32, reused);
    println!(
      "[4] reused == second? {}",
      if reused == second {
        "Yes, first fit reused the hole"
      } else {
        "No, it allocated somewhere else"
      }
    );
    println!("[4] Block list: {:?}", allocator.stats());
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 5) Resize the reused block while its right neighbor is a free
    //    remainder: it grows in place, keeping its address.
    // --------------------------------------------------------------------
    let grown = allocator.resize(reused, 60);
    println!("\n[5] Resize the 32-byte block to 60 bytes");
    println!(
      "[5] grown == reused? {}",
      if grown == reused {
        "Yes, it absorbed the free remainder next door"
      } else {
        "No, the payload moved"
      }
    );
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 6) Release everything back to front. Each release turns the current
    //    tail free, so the break walks back down to where it started.
    // --------------------------------------------------------------------
    allocator.release(third);
    print_program_break("after releasing the tail block");

    allocator.release(grown);
    allocator.release(first);
    print_program_break("after releasing everything");

    println!("\n[6] Block list: {:?}", allocator.stats());
    println!("[6] End of walkthrough. The break is back at its starting point.");
  }
}
