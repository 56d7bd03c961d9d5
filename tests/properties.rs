//! Randomized operation sequences against a fixed arena.
//!
//! A shadow list of live allocations tracks what the allocator handed out;
//! after every operation the block list must stay structurally sound and no
//! live payload may lose a byte.

#![cfg(not(feature = "passthrough"))]

use proptest::prelude::*;
use rmalloc::{FixedHeap, FreeListAllocator};

#[derive(Debug, Clone)]
enum Op {
  Allocate(usize),
  Release(usize),
  Resize(usize, usize),
}

fn ops() -> impl Strategy<Value = Vec<Op>> {
  proptest::collection::vec(
    prop_oneof![
      (0usize..200).prop_map(Op::Allocate),
      (0usize..16).prop_map(Op::Release),
      (0usize..16, 0usize..240).prop_map(|(slot, size)| Op::Resize(slot, size)),
    ],
    1..48,
  )
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(64))]

  #[test]
  fn the_list_survives_any_operation_sequence(ops in ops()) {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut heap = FreeListAllocator::with_source(FixedHeap::with_capacity(128 * 1024));
    let mut live: Vec<(*mut u8, usize, u8)> = Vec::new();
    let mut stamp: u8 = 1;

    for op in ops {
      match op {
        Op::Allocate(size) => unsafe {
          let p = heap.allocate(size);
          if !p.is_null() {
            std::ptr::write_bytes(p, stamp, size);
            live.push((p, size, stamp));
            stamp = stamp.wrapping_add(1).max(1);
          }
        },
        Op::Release(slot) => unsafe {
          if !live.is_empty() {
            let (p, _, _) = live.swap_remove(slot % live.len());
            heap.release(p);
          }
        },
        Op::Resize(slot, new_size) => unsafe {
          if !live.is_empty() {
            let index = slot % live.len();
            let (p, old_size, fill) = live[index];
            let r = heap.resize(p, new_size);

            if r.is_null() {
              // A failed resize must leave the old allocation intact.
              for i in 0..old_size {
                prop_assert_eq!(p.add(i).read(), fill);
              }
            } else {
              let kept = old_size.min(new_size);
              for i in 0..kept {
                prop_assert_eq!(r.add(i).read(), fill);
              }
              std::ptr::write_bytes(r, stamp, new_size);
              live[index] = (r, new_size, stamp);
              stamp = stamp.wrapping_add(1).max(1);
            }
          }
        },
      }

      heap.validate();
      for &(p, size, fill) in &live {
        for i in 0..size {
          unsafe {
            prop_assert_eq!(p.add(i).read(), fill);
          }
        }
      }
    }

    // Releasing every survivor, in whatever order they are left in, must
    // coalesce the heap away entirely and hand the region back.
    for (p, _, _) in live {
      unsafe { heap.release(p) };
    }
    heap.validate();
    prop_assert_eq!(heap.stats().blocks, 0);
    prop_assert_eq!(heap.source().break_offset(), 0);
  }
}
