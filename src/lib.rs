//! # rmalloc - A First-Fit Free-List Memory Allocator
//!
//! This crate provides a **first-fit free-list allocator** in Rust that
//! manages one contiguous heap region obtained through the `sbrk` system
//! call.
//!
//! ## Overview
//!
//! The heap is a single run of variable-sized blocks, each led by a small
//! header, chained in address order:
//!
//! ```text
//!   Free-List Heap Concept:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                         HEAP MEMORY                                  │
//!   │                                                                      │
//!   │   ┌───┬─────┬───┬───────────┬───┬─────────┬───┬─────────────┐        │
//!   │   │ H │ A1  │ H │   free    │ H │   A2    │ H │     A3      │        │
//!   │   └───┴─────┴───┴───────────┴───┴─────────┴───┴─────────────┘        │
//!   │     ▲              ▲                                         ▲       │
//!   │     │              │                                         │       │
//!   │   base        reusable hole                             Program      │
//!   │                (first fit)                                Break      │
//!   │                                                                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Allocation scans left to right and takes the first free block that
//!   fits, splitting off the excess. Releasing merges a block with free
//!   neighbors, and a freed tail moves the program break back down.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   rmalloc
//!   ├── align      - Block granularity rounding (align4!)
//!   ├── block      - Block header layout (internal)
//!   ├── brk        - HeapSource trait, Sbrk and FixedHeap sources
//!   ├── error      - AllocError
//!   └── free_list  - FreeListAllocator implementation
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rmalloc::{FixedHeap, FreeListAllocator};
//!
//! let mut heap = FreeListAllocator::with_source(FixedHeap::with_capacity(4096));
//!
//! unsafe {
//!     let ptr = heap.allocate(core::mem::size_of::<u32>()) as *mut u32;
//!     ptr.write(42);
//!     assert_eq!(ptr.read(), 42);
//!
//!     heap.release(ptr as *mut u8);
//! }
//! ```
//!
//! Over the real program break the same code reads:
//!
//! ```rust,ignore
//! use rmalloc::FreeListAllocator;
//!
//! let mut heap = FreeListAllocator::new();
//!
//! unsafe {
//!     let ptr = heap.allocate(64);
//!     // ...
//!     heap.release(ptr);
//! }
//! ```
//!
//! ## How It Works
//!
//! Every block carries its metadata immediately before the bytes handed to
//! the caller:
//!
//! ```text
//!   Single Block:
//!   ┌────────────────────────┬────────────────────────────────┐
//!   │     Block Header       │         User Data              │
//!   │  ┌──────────────────┐  │                                │
//!   │  │ size: N          │  │  ┌──────────────────────────┐  │
//!   │  │ free: false      │  │  │                          │  │
//!   │  │ prev / next      │  │  │     N bytes usable       │  │
//!   │  │ data: ptr ───────┼──┼──▶                          │  │
//!   │  └──────────────────┘  │  └──────────────────────────┘  │
//!   └────────────────────────┴────────────────────────────────┘
//!                            ▲
//!                            └── Pointer returned to user
//! ```
//!
//! Payload sizes are multiples of 4, so a request is rounded up with
//! [`align4!`] before placement. Releasing recovers the header at a fixed
//! offset behind the pointer and cross-checks the recorded `data` address,
//! so null, foreign, and already-released pointers are quietly ignored.
//! Resizing prefers to stay in place, trimming an oversized block or
//! absorbing a free successor, and only copies to a fresh block as a last
//! resort.
//!
//! ## Features
//!
//! - **First fit with splitting**: holes are reused and trimmed to size
//! - **Eager coalescing**: free neighbors never survive in pairs
//! - **Tail give-back**: a freed tail block returns memory to the OS
//! - **Pluggable source**: `Sbrk` in production, `FixedHeap` in tests
//! - **`passthrough` feature**: route every call to the platform allocator
//!   for A/B comparisons
//!
//! ## Limitations
//!
//! - **Single-threaded only**: no synchronization; wrap the whole allocator
//!   in a lock before sharing it
//! - **Unix-only production source**: `Sbrk` requires `libc` and `sbrk`
//! - **4-byte payload alignment**: wider types need unaligned access or a
//!   request padded out to their alignment
//! - **Heuristic pointer validation**: the header cross-check catches
//!   accidents, not attacks
//!
//! ## Safety
//!
//! This crate is inherently unsafe as it deals with raw memory management.
//! Allocation, release, and resize all require `unsafe` blocks.

pub mod align;
mod block;
mod brk;
mod error;
mod free_list;

pub use brk::{FixedHeap, HeapSource, Sbrk};
pub use error::AllocError;
pub use free_list::{FreeListAllocator, HeapStats, print_alloc};
