use libc::{c_void, intptr_t, sbrk};

use crate::error::AllocError;

/// The single operating-system primitive the allocator consumes: a growable,
/// shrinkable break pointer delimiting one contiguous heap region.
///
/// Putting it behind a trait keeps the block engine testable. Production use
/// goes through [`Sbrk`]; unit and property tests run against [`FixedHeap`],
/// an owned arena with a software break, so they never fight over the
/// process-global break from parallel test threads.
pub trait HeapSource {
  /// Moves the break up by `bytes` and returns the previous break, which is
  /// the start of the newly usable region. On failure the break is
  /// unchanged.
  ///
  /// # Safety
  ///
  /// The caller takes ownership of the returned region and must not touch
  /// bytes past it until a later `grow` hands them out.
  unsafe fn grow(&mut self, bytes: usize) -> Result<*mut u8, AllocError>;

  /// Moves the break down to `addr`, giving the tail of the region back.
  ///
  /// # Safety
  ///
  /// `addr` must lie inside the grown region and nothing at or past it may
  /// be referenced again.
  unsafe fn shrink_to(&mut self, addr: *mut u8) -> Result<(), AllocError>;

  /// The current break: one past the last usable byte.
  fn current(&self) -> *mut u8;
}

/// Production source: the process break, moved with `sbrk(2)`.
#[derive(Debug, Default)]
pub struct Sbrk;

impl HeapSource for Sbrk {
  unsafe fn grow(&mut self, bytes: usize) -> Result<*mut u8, AllocError> {
    let previous = unsafe { sbrk(bytes as intptr_t) };

    if previous == usize::MAX as *mut c_void {
      return Err(AllocError::BreakFailed(bytes));
    }

    Ok(previous as *mut u8)
  }

  unsafe fn shrink_to(&mut self, addr: *mut u8) -> Result<(), AllocError> {
    let give_back = self.current() as usize - addr as usize;
    let moved = unsafe { sbrk(-(give_back as intptr_t)) };

    if moved == usize::MAX as *mut c_void {
      return Err(AllocError::BreakFailed(give_back));
    }

    Ok(())
  }

  fn current(&self) -> *mut u8 {
    unsafe { sbrk(0) as *mut u8 }
  }
}

/// Test source: a fixed arena with a software break.
///
/// The backing store is made of `u64` words so the first block header lands
/// on a well-aligned boundary, and the break position is observable through
/// [`break_offset`](FixedHeap::break_offset), which the give-back tests rely
/// on.
pub struct FixedHeap {
  arena: Box<[u64]>,
  brk: usize,
}

impl FixedHeap {
  /// Creates an arena of at least `bytes` capacity (rounded up to whole
  /// words) with the break at zero.
  pub fn with_capacity(bytes: usize) -> Self {
    Self {
      arena: vec![0u64; bytes.div_ceil(8)].into_boxed_slice(),
      brk: 0,
    }
  }

  /// Current break as a byte offset from the arena base.
  pub fn break_offset(&self) -> usize {
    self.brk
  }

  /// Total bytes this arena can hand out.
  pub fn capacity(&self) -> usize {
    self.arena.len() * 8
  }
}

impl HeapSource for FixedHeap {
  unsafe fn grow(&mut self, bytes: usize) -> Result<*mut u8, AllocError> {
    let available = self.capacity() - self.brk;

    if bytes > available {
      return Err(AllocError::Exhausted {
        requested: bytes,
        available,
      });
    }

    let previous = (self.arena.as_mut_ptr() as *mut u8).wrapping_add(self.brk);
    self.brk += bytes;
    Ok(previous)
  }

  unsafe fn shrink_to(&mut self, addr: *mut u8) -> Result<(), AllocError> {
    let base = self.arena.as_mut_ptr() as usize;

    assert!(
      addr as usize >= base && addr as usize - base <= self.brk,
      "break moved to an address outside the grown arena"
    );

    self.brk = addr as usize - base;
    Ok(())
  }

  fn current(&self) -> *mut u8 {
    (self.arena.as_ptr() as *mut u8).wrapping_add(self.brk)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_grow_hands_out_adjacent_regions() {
    let mut heap = FixedHeap::with_capacity(64);

    unsafe {
      let first = heap.grow(16).unwrap();
      let second = heap.grow(24).unwrap();

      assert_eq!(second as usize, first as usize + 16);
      assert_eq!(heap.break_offset(), 40);
      assert_eq!(heap.current() as usize, first as usize + 40);
    }
  }

  #[test]
  fn test_grow_past_capacity_fails_without_moving_the_break() {
    let mut heap = FixedHeap::with_capacity(32);

    unsafe {
      heap.grow(24).unwrap();

      let error = heap.grow(16).unwrap_err();
      assert_eq!(
        error,
        AllocError::Exhausted {
          requested: 16,
          available: 8,
        }
      );
      assert_eq!(heap.break_offset(), 24);
    }
  }

  #[test]
  fn test_shrink_returns_the_tail() {
    let mut heap = FixedHeap::with_capacity(64);

    unsafe {
      let first = heap.grow(48).unwrap();
      heap.shrink_to(first.add(16)).unwrap();

      assert_eq!(heap.break_offset(), 16);
    }
  }

  #[test]
  fn test_capacity_rounds_up_to_whole_words() {
    let heap = FixedHeap::with_capacity(20);

    assert_eq!(heap.capacity(), 24);
  }
}
