use std::ptr;

use libc::sbrk;
use log::{debug, warn};

use crate::align4;
use crate::block::{Block, HEADER_SIZE, header_of, payload_of};
use crate::brk::{HeapSource, Sbrk};
use crate::error::AllocError;

/// Smallest leftover that still earns its own header when a block is split.
const MIN_SPLIT: usize = HEADER_SIZE + 4;

/// Prints an allocation next to the live program break. Demo aid, only
/// meaningful when the allocator runs over [`Sbrk`].
pub fn print_alloc(
  size: usize,
  addr: *mut u8,
) {
  println!(
    "Allocated {} bytes, address = {:?}, program break = {:?}",
    size,
    addr,
    unsafe { sbrk(0) },
  );
}

/// Point-in-time totals over the block list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeapStats {
  pub blocks: usize,
  pub free_blocks: usize,
  pub allocated_bytes: usize,
  pub free_bytes: usize,
}

/// First-fit free-list allocator over one contiguous heap region.
///
/// Blocks are kept in a doubly linked list whose order is address order.
/// Allocation scans from the head and takes the first free block that fits,
/// splitting off the excess; releasing merges the block with free neighbors
/// and hands a freed tail back to the source by moving the break down.
///
/// All state lives in the instance. Independent allocators over independent
/// sources can coexist, which is how the tests run.
pub struct FreeListAllocator<S: HeapSource = Sbrk> {
  base: *mut Block,
  last: *mut Block,
  source: S,
}

impl FreeListAllocator<Sbrk> {
  pub fn new() -> Self {
    Self::with_source(Sbrk)
  }
}

impl Default for FreeListAllocator<Sbrk> {
  fn default() -> Self {
    Self::new()
  }
}

impl<S: HeapSource> FreeListAllocator<S> {
  /// Creates an allocator over an explicit source. The heap starts empty;
  /// the first allocation performs the first extension.
  pub fn with_source(source: S) -> Self {
    Self {
      base: ptr::null_mut(),
      last: ptr::null_mut(),
      source,
    }
  }

  /// Read access to the underlying source, mainly for break inspection.
  pub fn source(&self) -> &S {
    &self.source
  }

  /// Point-in-time totals over the block list.
  pub fn stats(&self) -> HeapStats {
    let mut stats = HeapStats::default();
    let mut current = self.base;

    while !current.is_null() {
      unsafe {
        let size = (*current).size;

        stats.blocks += 1;
        if (*current).free {
          stats.free_blocks += 1;
          stats.free_bytes += size;
        } else {
          stats.allocated_bytes += size;
        }

        current = (*current).next;
      }
    }

    stats
  }

  /// Walks the whole list and panics on any structural inconsistency:
  /// broken link symmetry, list order disagreeing with address order,
  /// overlapping neighbors, paired free neighbors, a size off the 4-byte
  /// grid, or a header that does not describe its own payload.
  ///
  /// Diagnostic aid; the tests run it after every operation.
  pub fn validate(&self) {
    let mut current = self.base;
    let mut previous: *mut Block = ptr::null_mut();

    while !current.is_null() {
      unsafe {
        let size = (*current).size;
        let data = (*current).data;
        let back = (*current).prev;
        let next = (*current).next;

        assert!(back == previous, "backward link out of sync");
        assert!(size >= 4 && size % 4 == 0, "block size off the 4-byte grid");
        assert!(
          data == payload_of(current),
          "header does not describe its own payload"
        );

        if next.is_null() {
          assert!(
            data.wrapping_add(size) as usize <= self.source.current() as usize,
            "tail block reaches past the break"
          );
        } else {
          assert!(
            (current as usize) < next as usize,
            "list order disagrees with address order"
          );
          assert!(
            data.wrapping_add(size) as usize <= next as usize,
            "neighboring blocks overlap"
          );
          assert!(
            !((*current).free && (*next).free),
            "paired free neighbors survived an operation"
          );
        }

        previous = current;
        current = next;
      }
    }
  }
}

#[cfg(feature = "passthrough")]
impl<S: HeapSource> FreeListAllocator<S> {
  /// Passthrough build: every operation goes straight to the platform
  /// allocator and the block list stays empty. Only sensible over [`Sbrk`].
  pub unsafe fn allocate(
    &mut self,
    size: usize,
  ) -> *mut u8 {
    unsafe { libc::calloc(1, size) as *mut u8 }
  }

  pub unsafe fn release(
    &mut self,
    address: *mut u8,
  ) {
    unsafe { libc::free(address as *mut libc::c_void) }
  }

  pub unsafe fn resize(
    &mut self,
    address: *mut u8,
    new_size: usize,
  ) -> *mut u8 {
    unsafe { libc::realloc(address as *mut libc::c_void, new_size) as *mut u8 }
  }
}

#[cfg(not(feature = "passthrough"))]
impl<S: HeapSource> FreeListAllocator<S> {
  /// Allocates `size` usable bytes and returns the payload address, or null
  /// when the source cannot grow the heap (in which case the block list is
  /// left untouched).
  ///
  /// Requests are rounded up to the 4-byte block granularity, so the
  /// returned region may be slightly larger than asked for; a zero-byte
  /// request takes the same path and yields a 4-byte block.
  ///
  /// # Safety
  ///
  /// The allocator must be the sole owner of its source's region; returned
  /// addresses are valid until passed to [`release`](Self::release).
  pub unsafe fn allocate(
    &mut self,
    size: usize,
  ) -> *mut u8 {
    unsafe {
      let size = align4!(size);

      let mut block = if self.base.is_null() {
        ptr::null_mut()
      } else {
        self.find_block(size)
      };

      if !block.is_null() {
        if (*block).size - size >= MIN_SPLIT {
          self.split_block(block, size);
        }
      } else {
        block = match self.extend_heap(size) {
          Ok(fresh) => fresh,
          Err(error) => {
            debug!("allocation of {} bytes failed: {}", size, error);
            return ptr::null_mut();
          }
        };
      }

      (*block).free = false;
      (*block).data
    }
  }

  /// Returns a block to the free list. Null, foreign, stale, and
  /// already-released addresses are ignored.
  ///
  /// The freed block is merged with free neighbors on the spot, and a freed
  /// tail block is spliced out entirely, with the break moved back down to
  /// its header.
  ///
  /// # Safety
  ///
  /// A released address must not be used again.
  pub unsafe fn release(
    &mut self,
    address: *mut u8,
  ) {
    unsafe {
      if address.is_null() {
        return;
      }

      let mut block = self.recover(address);
      if block.is_null() {
        debug!("ignoring release of unknown address {:?}", address);
        return;
      }
      if (*block).free {
        debug!("ignoring second release of {:?}", address);
        return;
      }

      (*block).free = true;

      // Fuse downward first, so a run of frees collapses onto the lowest
      // block, then fuse whatever survived with its successor.
      let prev = (*block).prev;
      if !prev.is_null() && (*prev).free {
        self.absorb_next(prev);
        block = prev;
      }

      if !(*block).next.is_null() {
        if (*(*block).next).free {
          self.absorb_next(block);
        }
        return;
      }

      // Freed tail: splice it out and move the break back to its header.
      let prev = (*block).prev;
      if prev.is_null() {
        self.base = ptr::null_mut();
        self.last = ptr::null_mut();
      } else {
        (*prev).next = ptr::null_mut();
        self.last = prev;
      }

      let header = block as *mut u8;
      let reclaimed = self.source.current() as usize - header as usize;
      match self.source.shrink_to(header) {
        Ok(()) => debug!("returned {} bytes from the heap tail", reclaimed),
        Err(error) => warn!("could not return {} bytes to the source: {}", reclaimed, error),
      }
    }
  }

  /// Grows or shrinks an existing allocation, preferring to keep it in
  /// place: an oversized block is trimmed, and a block with a free successor
  /// grows by absorbing it. Only when neither works does the payload move to
  /// a fresh block (the old bytes are copied over and the old block
  /// released).
  ///
  /// A null `address` behaves exactly like [`allocate`](Self::allocate). An
  /// address this allocator does not recognize (including one already
  /// released) yields null with nothing changed, as does a failed
  /// relocation, in which case the original block stays intact.
  ///
  /// # Safety
  ///
  /// Same contract as [`allocate`](Self::allocate); when the block moves,
  /// the old address must not be used again.
  pub unsafe fn resize(
    &mut self,
    address: *mut u8,
    new_size: usize,
  ) -> *mut u8 {
    unsafe {
      if address.is_null() {
        return self.allocate(new_size);
      }

      let block = self.recover(address);
      if block.is_null() || (*block).free {
        debug!("ignoring resize of unknown address {:?}", address);
        return ptr::null_mut();
      }

      let size = align4!(new_size);

      // In place: the block already holds enough.
      if (*block).size >= size {
        if (*block).size - size >= MIN_SPLIT {
          self.split_block(block, size);
        }
        return address;
      }

      // In place: the free successor makes up the difference.
      let next = (*block).next;
      if !next.is_null()
        && (*next).free
        && (*block).size + HEADER_SIZE + (*next).size >= size
      {
        self.absorb_next(block);
        if (*block).size - size >= MIN_SPLIT {
          self.split_block(block, size);
        }
        return address;
      }

      // Relocate. The old block is only released once the copy is done, and
      // not at all when the fresh allocation fails.
      let moved = self.allocate(new_size);
      if moved.is_null() {
        return ptr::null_mut();
      }

      let old_size = (*block).size;
      let moved_size = (*header_of(moved)).size;
      ptr::copy_nonoverlapping(address, moved, old_size.min(moved_size));
      self.release(address);

      moved
    }
  }

  /// First-fit scan from the head, leaving `self.last` at the last block
  /// visited so a failed scan records the tail for [`extend_heap`].
  unsafe fn find_block(
    &mut self,
    size: usize,
  ) -> *mut Block {
    unsafe {
      let mut current = self.base;

      while !current.is_null() {
        self.last = current;
        if (*current).free && (*current).size >= size {
          return current;
        }
        current = (*current).next;
      }

      ptr::null_mut()
    }
  }

  /// Appends a fresh block of exactly `size` payload bytes at the break.
  /// When the source refuses, nothing is linked and the list is untouched.
  unsafe fn extend_heap(
    &mut self,
    size: usize,
  ) -> Result<*mut Block, AllocError> {
    unsafe {
      let total = size + HEADER_SIZE;
      let block = self.source.grow(total)? as *mut Block;

      (*block).size = size;
      (*block).free = false;
      (*block).data = payload_of(block);
      (*block).next = ptr::null_mut();

      if self.base.is_null() {
        (*block).prev = ptr::null_mut();
        self.base = block;
      } else {
        let tail = self.last;
        assert!(
          !tail.is_null() && (*tail).next.is_null(),
          "heap tail lost between scan and extension"
        );
        (*block).prev = tail;
        (*tail).next = block;
      }

      debug!("extended heap by {} bytes, new block at {:?}", total, block);
      Ok(block)
    }
  }

  /// Splits `block` so its payload is exactly `size` bytes; the remainder
  /// becomes a free block spliced in right after it. When the remainder ends
  /// up next to a free successor the two are fused immediately, so free
  /// neighbors never survive in pairs. Callers check the leftover against
  /// `MIN_SPLIT` first.
  unsafe fn split_block(
    &mut self,
    block: *mut Block,
    size: usize,
  ) {
    unsafe {
      let remainder = (*block).data.add(size) as *mut Block;

      (*remainder).size = (*block).size - size - HEADER_SIZE;
      (*remainder).free = true;
      (*remainder).data = payload_of(remainder);
      (*remainder).prev = block;
      (*remainder).next = (*block).next;

      if !(*block).next.is_null() {
        (*(*block).next).prev = remainder;
      }
      (*block).next = remainder;
      (*block).size = size;

      if !(*remainder).next.is_null() && (*(*remainder).next).free {
        self.absorb_next(remainder);
      }
    }
  }

  /// Merges the free successor of `block` into `block` itself, header and
  /// all.
  unsafe fn absorb_next(
    &mut self,
    block: *mut Block,
  ) {
    unsafe {
      let next = (*block).next;
      assert!(
        !next.is_null() && (*next).free,
        "absorbing a neighbor that is not a free successor"
      );
      assert!((*next).prev == block, "neighbor links out of sync");

      (*block).size = (*block).size + HEADER_SIZE + (*next).size;

      let after = (*next).next;
      (*block).next = after;
      if !after.is_null() {
        (*after).prev = block;
      }
    }
  }

  /// Best-effort check that `address` is a payload pointer this allocator
  /// handed out: inside the managed region, with a header whose recorded
  /// payload address matches. A hostile pointer that happens to satisfy both
  /// tests is still trusted; this is debugging hygiene, not a security
  /// boundary.
  unsafe fn recover(
    &self,
    address: *mut u8,
  ) -> *mut Block {
    unsafe {
      if self.base.is_null() {
        return ptr::null_mut();
      }

      if address <= self.base as *mut u8 || address >= self.source.current() {
        return ptr::null_mut();
      }

      let block = header_of(address);
      if (*block).data != address {
        return ptr::null_mut();
      }

      block
    }
  }
}
