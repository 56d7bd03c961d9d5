use std::mem;

/// Bytes occupied by one block header. Every payload starts exactly this far
/// past its header address.
pub(crate) const HEADER_SIZE: usize = mem::size_of::<Block>();

/// Per-block metadata, stored in heap memory immediately before the payload
/// it describes.
///
/// `prev` and `next` mirror the heap's linear layout: list order is address
/// order, and the links are plain addresses rather than owning pointers. The
/// `data` field repeats the payload address so a caller-supplied pointer can
/// be cross-checked against the header it claims to sit behind.
///
/// Headers land on 4-byte boundaries, never better, because payload sizes
/// advance in 4-byte steps; `packed(4)` keeps field access through raw
/// pointers well-defined there. Take no references to these fields.
#[repr(C, packed(4))]
pub(crate) struct Block {
  pub size: usize,
  pub free: bool,
  pub prev: *mut Block,
  pub next: *mut Block,
  pub data: *mut u8,
}

/// Recovers the header address behind a payload pointer.
pub(crate) fn header_of(address: *mut u8) -> *mut Block {
  address.wrapping_sub(HEADER_SIZE) as *mut Block
}

/// Payload address for a header: the first byte past the header itself.
pub(crate) fn payload_of(block: *mut Block) -> *mut u8 {
  (block as *mut u8).wrapping_add(HEADER_SIZE)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_header_payload_round_trip() {
    let address = 0x4000 as *mut u8;
    let block = header_of(address);

    assert_eq!(block as usize, 0x4000 - HEADER_SIZE);
    assert_eq!(payload_of(block), address);
  }
}
