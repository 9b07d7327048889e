//! # segalloc - A Segregated Free-List Memory Allocator
//!
//! This crate provides a malloc-style **segregated free-list allocator**
//! that services one contiguous heap region obtained from an sbrk-style
//! heap source.
//!
//! ## Overview
//!
//! Every byte of the heap belongs to exactly one block. Blocks carry a
//! boundary tag at each end, so both neighbors of any block are reachable
//! in constant time, and free blocks are indexed by size class for
//! sub-linear fit search:
//!
//! ```text
//!   Heap (one contiguous span):
//!
//!   ┌────────────────┬────────────────┬────────────────┬──────────────┐
//!   │   allocated    │      free      │   allocated    │     free     │
//!   │ [hdr│....│ftr] │ [hdr│....│ftr] │ [hdr│....│ftr] │ [hdr│..│ftr] │
//!   └────────────────┴───────┬────────┴────────────────┴──────┬───────┘
//!                            │                                │
//!   Size-class index:        │                                │
//!   ┌───────┬───────┬────────┴──┬─────────┐                   │
//!   │ 48..  │ 64..  │  128..    │   ...   │◄──────────────────┘
//!   │ class0│ class1│  class2   │ class15 │
//!   └───────┴───────┴───────────┴─────────┘
//!
//!   16 buckets, each a doubly-linked list of free blocks.
//! ```
//!
//! Allocation searches the bucket for the request's class first, falls
//! upward through larger buckets, splits the winning block, and extends
//! the heap only when every bucket comes up empty. Deallocation merges
//! the block with any free neighbor on the spot, so two free blocks are
//! never adjacent.
//!
//! ## Crate Structure
//!
//! ```text
//!   segalloc
//!   ├── align      - Alignment macro and constant (align16!, ALIGNMENT)
//!   ├── block      - Boundary tags and block navigation (internal)
//!   ├── classes    - Size-class mapping and bucket table (internal)
//!   ├── grow       - HeapSource trait, Sbrk and Arena sources
//!   ├── seglist    - SegListAllocator: the public allocation surface
//!   └── check      - Heap and free-list consistency verifier
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use segalloc::{Sbrk, SegListAllocator};
//!
//! fn main() {
//!   let mut allocator = SegListAllocator::new(Sbrk::new());
//!
//!   unsafe {
//!     // Carve the initial chunk
//!     assert!(allocator.init());
//!
//!     // Allocate, use, resize, free
//!     let p = allocator.allocate(64);
//!     p.write(42);
//!
//!     let q = allocator.reallocate(p, 4096);
//!     assert_eq!(42, q.read());
//!
//!     allocator.deallocate(q);
//!   }
//! }
//! ```
//!
//! ## Heap Sources
//!
//! The allocator is generic over [`HeapSource`]:
//!
//! - [`Sbrk`] extends the process data segment through `sbrk(2)`; this is
//!   the classic malloc setting. Unix-only, via `libc`.
//! - [`Arena`] serves spans from one fixed buffer; exhaustion is
//!   deterministic and nothing process-global is touched.
//!
//! ## Diagnostics
//!
//! Allocation, growth, and verifier events are emitted through the
//! [`tracing`] facade; install any subscriber to see them. The
//! [`check_heap`](SegListAllocator::check_heap) verifier walks the whole
//! heap and every free list and reports the first violated invariant.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: all operations take `&mut self`; wrap the
//!   allocator externally for concurrent use
//! - **Monotonic heap**: memory is recycled internally but never returned
//!   to the source
//! - **One heap per allocator**: blocks from different allocators are
//!   never merged
//! - **64-bit targets**: the tag layout is pinned to 16-byte tags at
//!   compile time
//!
//! ## Safety
//!
//! This crate is inherently unsafe as it deals with raw memory
//! management. All allocation and deallocation operations require
//! `unsafe` blocks; the documented contract of each method states what
//! the caller must uphold.

pub mod align;
mod block;
mod check;
mod classes;
mod grow;
mod seglist;

pub use block::{MIN_BLOCK, TAG_SIZE};
pub use grow::{Arena, HeapSource, Sbrk};
pub use seglist::{CHUNK_SIZE, SegListAllocator};
