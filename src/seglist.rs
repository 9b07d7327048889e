//! # Segregated Free-List Allocator
//!
//! A malloc-style allocator over one contiguous heap span obtained from a
//! [`HeapSource`]. Free blocks are indexed by size class; neighbors are
//! found through boundary tags, so freeing coalesces in constant time.
//!
//! ## Heap Layout
//!
//! ```text
//!                HEAP (one contiguous span, grows upward →)
//!
//!   heap_lo                                                     heap_hi
//!      │                                                           │
//!      ▼                                                           ▼
//!   ┌──────────────┬──────────────┬──────────────┬──────────────┐
//!   │  allocated   │     free     │  allocated   │     free     │
//!   │ [hdr|...|ft] │ [hdr|...|ft] │ [hdr|...|ft] │ [hdr|...|ft] │
//!   └──────────────┴──────┬───────┴──────────────┴──────┬───────┘
//!                         │                             │
//!              linked into a size-class      linked into a size-class
//!              bucket by the index           bucket by the index
//! ```
//!
//! Blocks tile the span exactly: the successor of a block always starts
//! `size` bytes after it, and the last block ends at `heap_hi`. Two free
//! blocks are never adjacent — every deallocation merges with free
//! neighbors on the spot.
//!
//! ## Allocation Path
//!
//! ```text
//!   allocate(n)
//!      │
//!      ├─ asize = align16(n + both tags)
//!      │
//!      ├─ find_fit: walk buckets from class_of(asize) upward,
//!      │            first block with size >= asize wins
//!      │
//!      ├─ hit ──► split_block: carve an allocated prefix of asize bytes;
//!      │          the remainder becomes a new free block when it can
//!      │          still hold tags plus a minimum payload
//!      │
//!      └─ miss ─► extend the heap:
//!                   tail block free  → request asize - tail.size
//!                                      (the coalesce that follows fuses
//!                                       tail and extension into exactly
//!                                       asize bytes)
//!                   tail allocated   → request max(asize, 2048)
//!                 then split as above
//! ```
//!
//! ## Deallocation Path
//!
//! ```text
//!   deallocate(p)
//!      │
//!      ├─ block = p - TAG_SIZE, mark both tags free
//!      │
//!      └─ coalesce with whichever neighbors are free:
//!
//!           case         merge                 survivor
//!           ──────────── ───────────────────── ────────
//!           none free    [ self ]              self
//!           prev free    [ prev + self ]       prev
//!           next free    [ self + next ]       self
//!           both free    [ prev + self + next] prev
//!
//!         the survivor carries the summed size and is inserted into the
//!         bucket for its new size; absorbed neighbors leave the index
//! ```
//!
//! ## Thread Safety
//!
//! This allocator is **NOT** thread-safe. All operations take `&mut self`
//! and run to completion in the caller; callers needing concurrent access
//! must serialize externally.

use std::{cmp, ptr};

use tracing::debug;

use crate::block::{self, Header, MIN_BLOCK, TAG_SIZE, alloc_size};
use crate::classes::{CLASS_COUNT, ClassIndex, class_of};
use crate::grow::HeapSource;

/// Default growth quantum: heap extensions are never smaller than this
/// unless a free tail block covers part of the request.
pub const CHUNK_SIZE: usize = 2048;

/// Largest payload request the allocator accepts. Anything above this is
/// rejected outright rather than treated as a huge allocation.
const MAX_REQUEST: usize = isize::MAX as usize;

/// A segregated free-list allocator over a [`HeapSource`].
///
/// # Lifecycle
///
/// [`init`](Self::init) carves the initial chunk; after that,
/// [`allocate`](Self::allocate), [`deallocate`](Self::deallocate),
/// [`reallocate`](Self::reallocate) and
/// [`zero_allocate`](Self::zero_allocate) may be called in any order.
/// The heap only ever grows; memory is recycled through the free lists,
/// never returned to the source.
pub struct SegListAllocator<S: HeapSource> {
  source: S,

  /// Bucket head table for the free lists.
  pub(crate) index: ClassIndex,

  /// First block of the heap; fixed once `init` succeeds.
  pub(crate) heap_lo: *mut Header,

  /// One past the last committed byte; advances on every extension.
  pub(crate) heap_hi: *mut u8,

  mallocs: usize,
  extends: usize,
}

impl<S: HeapSource> SegListAllocator<S> {
  /// Creates an allocator over the given source. No memory is requested
  /// until [`init`](Self::init) runs.
  pub fn new(source: S) -> Self {
    Self {
      source,
      index: ClassIndex::new(),
      heap_lo: ptr::null_mut(),
      heap_hi: ptr::null_mut(),
      mallocs: 0,
      extends: 0,
    }
  }

  /// Resets all internal state and carves the initial chunk as one free
  /// block.
  ///
  /// # Returns
  ///
  /// `false` when the source cannot supply the initial chunk; the
  /// allocator is then unusable until a later `init` succeeds.
  ///
  /// # Safety
  ///
  /// Re-initializing abandons every block of a previous heap; no pointer
  /// returned before the call may be used afterwards.
  pub unsafe fn init(&mut self) -> bool {
    unsafe {
      self.index.clear();
      self.mallocs = 0;
      self.extends = 0;
      self.heap_lo = ptr::null_mut();
      self.heap_hi = ptr::null_mut();

      let init_size = alloc_size(CHUNK_SIZE);
      let base = self.source.extend(init_size);
      if base.is_null() {
        return false;
      }

      let first = base.cast::<Header>();
      self.heap_lo = first;
      self.heap_hi = base.add(init_size);

      block::set_size(first, init_size);
      block::set_freed(first, true);
      self.index.insert(first, init_size);

      debug!(heap_lo = ?self.heap_lo, heap_hi = ?self.heap_hi, "heap initialized");
      true
    }
  }

  /// Allocates `size` payload bytes.
  ///
  /// # Returns
  ///
  /// A 16-byte-aligned payload pointer, or null when `size` is zero,
  /// `size` exceeds the request bound, or the heap cannot be extended.
  /// A null return leaves the heap unchanged.
  ///
  /// # Safety
  ///
  /// [`init`](Self::init) must have succeeded. The returned region is
  /// uninitialized and owned by the caller until passed to
  /// [`deallocate`](Self::deallocate).
  pub unsafe fn allocate(
    &mut self,
    size: usize,
  ) -> *mut u8 {
    unsafe {
      self.mallocs += 1;

      if size == 0 || size > MAX_REQUEST {
        return ptr::null_mut();
      }
      debug_assert!(!self.heap_lo.is_null(), "allocate before init");

      let asize = alloc_size(size);

      let fit = self.find_fit(asize);
      if !fit.is_null() {
        debug!(size, asize, block = ?fit, "serving from free list");
        self.split_block(fit, asize);
        return block::payload_of(fit);
      }

      // No bucket had a block this large. Grow the heap; a free tail
      // block covers part of the request, since the coalesce inside
      // extend_heap fuses it with the fresh span.
      let tail = self.last_block();
      let growth = if (*tail).freed {
        asize - (*tail).size
      } else {
        cmp::max(asize, CHUNK_SIZE)
      };

      let fresh = self.extend_heap(growth);
      if fresh.is_null() {
        return ptr::null_mut();
      }

      self.split_block(fresh, asize);
      block::payload_of(fresh)
    }
  }

  /// Returns the block at `address` to the free lists, merging it with
  /// any free neighbor. Null is a no-op.
  ///
  /// # Safety
  ///
  /// `address` must have been returned by an allocation method of this
  /// allocator and not deallocated since; double-freeing is undefined.
  pub unsafe fn deallocate(
    &mut self,
    address: *mut u8,
  ) {
    unsafe {
      if address.is_null() {
        return;
      }

      let freed = block::block_of(address);
      block::set_freed(freed, true);
      self.coalesce(freed);
    }
  }

  /// Resizes the allocation at `address` to `size` payload bytes.
  ///
  /// A null `address` behaves like [`allocate`](Self::allocate); a zero
  /// `size` frees the block and returns null. When the aligned size
  /// already matches the block, the original pointer comes straight back;
  /// otherwise the payload prefix moves into a fresh block and the old
  /// one is freed.
  ///
  /// # Returns
  ///
  /// The (possibly moved) payload pointer, or null when `size` exceeds
  /// the request bound or no new block can be obtained. On null the old
  /// allocation is untouched and still valid.
  ///
  /// # Safety
  ///
  /// Same contract as [`deallocate`](Self::deallocate) for `address`.
  pub unsafe fn reallocate(
    &mut self,
    address: *mut u8,
    size: usize,
  ) -> *mut u8 {
    unsafe {
      if address.is_null() {
        return self.allocate(size);
      }
      if size == 0 {
        self.deallocate(address);
        return ptr::null_mut();
      }
      if size > MAX_REQUEST {
        return ptr::null_mut();
      }

      let block = block::block_of(address);
      let old_size = (*block).size;

      if alloc_size(size) == old_size {
        return address;
      }

      let fresh = self.allocate(size);
      if fresh.is_null() {
        return ptr::null_mut();
      }

      let old_payload = old_size - TAG_SIZE - TAG_SIZE;
      ptr::copy_nonoverlapping(address, fresh, cmp::min(old_payload, size));
      self.deallocate(address);
      fresh
    }
  }

  /// Allocates `count * size` payload bytes and zeroes them.
  ///
  /// # Returns
  ///
  /// A pointer to the zeroed payload, or null when the product overflows
  /// or the allocation fails.
  ///
  /// # Safety
  ///
  /// Same contract as [`allocate`](Self::allocate).
  pub unsafe fn zero_allocate(
    &mut self,
    count: usize,
    size: usize,
  ) -> *mut u8 {
    unsafe {
      let total = match count.checked_mul(size) {
        Some(total) => total,
        None => return ptr::null_mut(),
      };

      let address = self.allocate(total);
      if !address.is_null() {
        ptr::write_bytes(address, 0, total);
      }
      address
    }
  }

  /// Total committed heap bytes, zero before a successful `init`.
  pub fn heap_size(&self) -> usize {
    if self.heap_lo.is_null() {
      0
    } else {
      self.heap_hi as usize - self.heap_lo as usize
    }
  }

  /// Number of blocks currently on the free lists.
  pub fn free_blocks(&self) -> usize {
    self.index.entries()
  }

  /// Allocation calls since the last `init`.
  pub fn mallocs(&self) -> usize {
    self.mallocs
  }

  /// Heap extensions since the last `init` (the initial carve not
  /// counted).
  pub fn extends(&self) -> usize {
    self.extends
  }

  /// Successor block, or null for the block ending at `heap_hi`.
  pub(crate) unsafe fn next_block(
    &self,
    block: *mut Header,
  ) -> *mut Header {
    unsafe {
      let next = block.cast::<u8>().add((*block).size);
      if next >= self.heap_hi {
        ptr::null_mut()
      } else {
        next.cast()
      }
    }
  }

  /// Predecessor block, reached through its footer, or null for the block
  /// at `heap_lo`.
  pub(crate) unsafe fn prev_block(
    &self,
    block: *mut Header,
  ) -> *mut Header {
    unsafe {
      if block <= self.heap_lo {
        return ptr::null_mut();
      }
      block::header_of(block.cast::<u8>().sub(TAG_SIZE).cast())
    }
  }

  /// The block ending at `heap_hi`.
  pub(crate) unsafe fn last_block(&self) -> *mut Header {
    unsafe { block::header_of(self.heap_hi.sub(TAG_SIZE).cast()) }
  }

  /// Whether `block` points inside the committed heap span.
  pub(crate) fn in_heap(
    &self,
    block: *mut Header,
  ) -> bool {
    let address = block as usize;
    address >= self.heap_lo as usize && address < self.heap_hi as usize
  }

  /// First-fit search: scan the bucket for `asize`, then every larger
  /// bucket, head to tail. Buckets below the starting class hold only
  /// strictly smaller blocks, so they are never visited.
  unsafe fn find_fit(
    &self,
    asize: usize,
  ) -> *mut Header {
    unsafe {
      for class in class_of(asize)..CLASS_COUNT {
        let mut current = self.index.head(class);

        while !current.is_null() {
          if (*current).size >= asize {
            return current;
          }
          current = (*current).next;
        }
      }
      ptr::null_mut()
    }
  }

  /// Carves an allocated block of `asize` bytes out of the free `block`.
  ///
  /// The remainder becomes a new free block when it can still hold two
  /// tags and a minimum payload; otherwise the whole block is handed out
  /// and the remainder stays as internal slack.
  unsafe fn split_block(
    &mut self,
    block: *mut Header,
    asize: usize,
  ) {
    unsafe {
      let old_size = (*block).size;
      let remainder = old_size - asize;

      self.index.remove(block, old_size);

      if remainder < MIN_BLOCK {
        block::set_freed(block, false);
        return;
      }

      block::set_size(block, asize);
      block::set_freed(block, false);

      let rest = block.cast::<u8>().add(asize).cast::<Header>();
      block::set_size(rest, remainder);
      block::set_freed(rest, true);
      self.index.insert(rest, remainder);
    }
  }

  /// Merges the freed `block` with whichever neighbors are free and
  /// inserts the survivor into the bucket for its final size.
  ///
  /// Absorbed neighbors are unlinked under their pre-merge sizes before
  /// any tag is rewritten.
  unsafe fn coalesce(
    &mut self,
    block: *mut Header,
  ) -> *mut Header {
    unsafe {
      let prev = self.prev_block(block);
      let next = self.next_block(block);

      let prev_free = !prev.is_null() && (*prev).freed;
      let next_free = !next.is_null() && (*next).freed;

      let (survivor, merged) = match (prev_free, next_free) {
        (false, false) => (block, (*block).size),
        (true, false) => {
          self.index.remove(prev, (*prev).size);
          (prev, (*prev).size + (*block).size)
        }
        (false, true) => {
          self.index.remove(next, (*next).size);
          (block, (*block).size + (*next).size)
        }
        (true, true) => {
          self.index.remove(prev, (*prev).size);
          self.index.remove(next, (*next).size);
          (prev, (*prev).size + (*block).size + (*next).size)
        }
      };

      block::set_size(survivor, merged);
      block::set_freed(survivor, true);
      self.index.insert(survivor, merged);
      survivor
    }
  }

  /// Requests `bytes` from the source, stamps the fresh span as one free
  /// block, and coalesces it with the previous tail.
  ///
  /// # Returns
  ///
  /// The (possibly merged) free block, or null when the source is
  /// exhausted.
  unsafe fn extend_heap(
    &mut self,
    bytes: usize,
  ) -> *mut Header {
    unsafe {
      self.extends += 1;

      let base = self.source.extend(bytes);
      if base.is_null() {
        return ptr::null_mut();
      }

      debug!(bytes, base = ?base, "heap extended");

      let fresh = base.cast::<Header>();
      self.heap_hi = base.add(bytes);

      block::set_size(fresh, bytes);
      block::set_freed(fresh, true);
      self.coalesce(fresh)
    }
  }
}

#[cfg(test)]
mod tests {
  use rand::rngs::StdRng;
  use rand::seq::SliceRandom;
  use rand::{Rng, SeedableRng};

  use super::*;
  use crate::align::ALIGNMENT;
  use crate::grow::{Arena, Sbrk};

  /// Helper: fresh allocator over an arena of `capacity` bytes, already
  /// initialized.
  fn arena_allocator(capacity: usize) -> SegListAllocator<Arena> {
    let mut allocator = SegListAllocator::new(Arena::with_capacity(capacity));
    assert!(unsafe { allocator.init() });
    allocator
  }

  /// Helper: check that a pointer is aligned to `align` bytes.
  fn is_aligned(
    ptr: *mut u8,
    align: usize,
  ) -> bool {
    (ptr as usize) % align == 0
  }

  const INIT_SIZE: usize = 2080; // alloc_size(CHUNK_SIZE)

  #[test]
  fn init_carves_one_free_block() {
    let allocator = arena_allocator(64 * 1024);

    assert_eq!(INIT_SIZE, allocator.heap_size());
    assert_eq!(1, allocator.free_blocks());
    assert!(unsafe { allocator.check_heap() });
  }

  #[test]
  fn init_fails_on_exhausted_source() {
    let mut allocator = SegListAllocator::new(Arena::with_capacity(0));

    assert!(!unsafe { allocator.init() });
    assert_eq!(0, allocator.heap_size());
  }

  #[test]
  fn basic_allocation_and_write_read() {
    let mut allocator = arena_allocator(64 * 1024);

    unsafe {
      let ptr_u64 = allocator.allocate(8) as *mut u64;
      assert!(!ptr_u64.is_null());

      *ptr_u64 = 0xDEADBEEFDEADBEEF;
      assert_eq!(*ptr_u64, 0xDEADBEEFDEADBEEF);

      let count = 8usize;
      let ptr_u16 = allocator.allocate(count * 2) as *mut u16;
      assert!(!ptr_u16.is_null());

      for i in 0..count {
        ptr_u16.add(i).write((i as u16) + 1);
      }

      // the first allocation must not be corrupted by the second
      assert_eq!(*ptr_u64, 0xDEADBEEFDEADBEEF);

      for i in 0..count {
        assert_eq!((i as u16) + 1, ptr_u16.add(i).read());
      }

      assert!(allocator.check_heap());
    }
  }

  #[test]
  fn allocation_splits_off_a_free_tail() {
    let mut allocator = arena_allocator(64 * 1024);

    unsafe {
      let ptr = allocator.allocate(24);
      assert!(!ptr.is_null());
      assert!(is_aligned(ptr, ALIGNMENT));

      // one allocated block up front, the trimmed remainder stays free
      assert_eq!(1, allocator.free_blocks());
      assert_eq!(INIT_SIZE, allocator.heap_size());
      assert!(allocator.check_heap());
    }
  }

  #[test]
  fn zero_size_and_oversize_requests_return_null() {
    let mut allocator = arena_allocator(64 * 1024);

    unsafe {
      assert!(allocator.allocate(0).is_null());
      assert!(allocator.allocate(isize::MAX as usize + 1).is_null());
      assert!(allocator.check_heap());
    }
  }

  #[test]
  fn deallocate_null_is_noop() {
    let mut allocator = arena_allocator(64 * 1024);

    unsafe {
      allocator.deallocate(ptr::null_mut());
      assert_eq!(1, allocator.free_blocks());
      assert!(allocator.check_heap());
    }
  }

  #[test]
  fn freeing_everything_restores_one_block() {
    let mut allocator = arena_allocator(64 * 1024);

    unsafe {
      let a = allocator.allocate(100);
      let b = allocator.allocate(100);
      assert!(!a.is_null() && !b.is_null());

      allocator.deallocate(a);
      allocator.deallocate(b);

      // both frees merge back into the initial chunk
      assert_eq!(1, allocator.free_blocks());
      assert_eq!(INIT_SIZE, allocator.heap_size());
      assert_eq!(0, allocator.extends());
      assert!(allocator.check_heap());

      // and the whole chunk is allocatable again without growth
      let c = allocator.allocate(CHUNK_SIZE);
      assert!(!c.is_null());
      assert_eq!(0, allocator.extends());
    }
  }

  #[test]
  fn middle_free_bridges_both_neighbors() {
    let mut allocator = arena_allocator(64 * 1024);

    unsafe {
      let a = allocator.allocate(40);
      let b = allocator.allocate(40);
      let c = allocator.allocate(40);
      assert!(!a.is_null() && !b.is_null() && !c.is_null());

      allocator.deallocate(a);
      assert!(allocator.check_heap());
      allocator.deallocate(c);
      assert!(allocator.check_heap());

      // freeing the middle block fuses all three regions with the tail
      allocator.deallocate(b);
      assert_eq!(1, allocator.free_blocks());
      assert!(allocator.check_heap());
    }
  }

  #[test]
  fn allocate_after_free_reuses_the_block() {
    let mut allocator = arena_allocator(64 * 1024);

    unsafe {
      let first = allocator.allocate(512);
      assert!(!first.is_null());

      allocator.deallocate(first);
      assert_eq!(INIT_SIZE, allocator.heap_size());

      let second = allocator.allocate(512);
      assert_eq!(first, second);
      assert_eq!(INIT_SIZE, allocator.heap_size());
      assert!(allocator.check_heap());
    }
  }

  #[test]
  fn growth_reuses_a_free_tail() {
    let mut allocator = arena_allocator(64 * 1024);

    unsafe {
      // the initial chunk is free, so the extension request only covers
      // the missing bytes and yields exactly one fitting block
      let big = allocator.allocate(4096);
      assert!(!big.is_null());
      assert_eq!(1, allocator.extends());
      assert_eq!(alloc_size(4096), allocator.heap_size());
      assert_eq!(0, allocator.free_blocks());
      assert!(allocator.check_heap());
    }
  }

  #[test]
  fn growth_after_allocated_tail_uses_chunks() {
    let mut allocator = arena_allocator(64 * 1024);

    unsafe {
      // pin the tail as allocated
      let fill = allocator.allocate(CHUNK_SIZE);
      assert!(!fill.is_null());
      assert_eq!(0, allocator.free_blocks());

      let small = allocator.allocate(24);
      assert!(!small.is_null());
      assert_eq!(1, allocator.extends());
      // a small request still grows by a whole chunk
      assert_eq!(INIT_SIZE + CHUNK_SIZE, allocator.heap_size());
      assert!(allocator.check_heap());
    }
  }

  #[test]
  fn exhausted_source_leaves_heap_consistent() {
    // capacity for the initial chunk only
    let mut allocator = arena_allocator(INIT_SIZE);

    unsafe {
      assert!(allocator.allocate(4096).is_null());
      assert!(allocator.check_heap());

      // smaller requests still succeed afterwards
      let ptr = allocator.allocate(1000);
      assert!(!ptr.is_null());
      assert!(allocator.check_heap());
    }
  }

  #[test]
  fn reallocate_same_aligned_size_keeps_pointer() {
    let mut allocator = arena_allocator(64 * 1024);

    unsafe {
      let ptr = allocator.allocate(40);
      // 33..=48 all align to the same block size
      let same = allocator.reallocate(ptr, 48);
      assert_eq!(ptr, same);
      assert!(allocator.check_heap());
    }
  }

  #[test]
  fn reallocate_grow_preserves_payload_prefix() {
    let mut allocator = arena_allocator(64 * 1024);

    unsafe {
      let old = allocator.allocate(16);
      assert!(!old.is_null());
      for i in 0..16 {
        old.add(i).write(i as u8 ^ 0x5A);
      }

      let new = allocator.reallocate(old, 4096);
      assert!(!new.is_null());
      assert_ne!(old, new);

      for i in 0..16 {
        assert_eq!(i as u8 ^ 0x5A, new.add(i).read());
      }
      assert!(allocator.check_heap());
    }
  }

  #[test]
  fn reallocate_shrink_copies_new_size() {
    let mut allocator = arena_allocator(64 * 1024);

    unsafe {
      let old = allocator.allocate(256);
      assert!(!old.is_null());
      for i in 0..256 {
        old.add(i).write(i as u8);
      }

      let new = allocator.reallocate(old, 32);
      assert!(!new.is_null());
      for i in 0..32 {
        assert_eq!(i as u8, new.add(i).read());
      }
      assert!(allocator.check_heap());
    }
  }

  #[test]
  fn reallocate_null_allocates() {
    let mut allocator = arena_allocator(64 * 1024);

    unsafe {
      let ptr = allocator.reallocate(ptr::null_mut(), 64);
      assert!(!ptr.is_null());
      assert!(is_aligned(ptr, ALIGNMENT));
      assert!(allocator.check_heap());
    }
  }

  #[test]
  fn reallocate_to_zero_frees() {
    let mut allocator = arena_allocator(64 * 1024);

    unsafe {
      let ptr = allocator.allocate(64);
      assert!(!ptr.is_null());

      assert!(allocator.reallocate(ptr, 0).is_null());
      assert_eq!(1, allocator.free_blocks());
      assert_eq!(INIT_SIZE, allocator.heap_size());
      assert!(allocator.check_heap());
    }
  }

  #[test]
  fn reallocate_oversize_returns_null_and_keeps_old_block() {
    let mut allocator = arena_allocator(64 * 1024);

    unsafe {
      let ptr = allocator.allocate(64);
      ptr.write(0xA7);

      assert!(allocator.reallocate(ptr, isize::MAX as usize + 1).is_null());
      assert_eq!(0xA7, ptr.read());
      assert!(allocator.check_heap());
    }
  }

  #[test]
  fn zero_allocate_zeroes_payload() {
    let mut allocator = arena_allocator(64 * 1024);

    unsafe {
      let ptr = allocator.zero_allocate(100, 8);
      assert!(!ptr.is_null());

      for i in 0..800 {
        assert_eq!(0, ptr.add(i).read());
      }
      assert!(allocator.check_heap());
    }
  }

  #[test]
  fn zero_allocate_guards_product_overflow() {
    let mut allocator = arena_allocator(64 * 1024);

    unsafe {
      assert!(allocator.zero_allocate(usize::MAX, 2).is_null());
      assert!(allocator.zero_allocate(0, 8).is_null());
      assert!(allocator.check_heap());
    }
  }

  #[test]
  fn random_workload_keeps_invariants() {
    let mut allocator = arena_allocator(4 * 1024 * 1024);
    let mut rng = StdRng::seed_from_u64(0x5e97_11f7);

    unsafe {
      let mut live: Vec<(*mut u8, usize, u8)> = Vec::new();

      for i in 0..1000 {
        let size = rng.gen_range(16..=2048);
        let ptr = allocator.allocate(size);
        assert!(!ptr.is_null());
        assert!(is_aligned(ptr, ALIGNMENT));

        let tag = (i % 251) as u8;
        ptr::write_bytes(ptr, tag, size);
        live.push((ptr, size, tag));

        if i % 16 == 0 {
          assert!(allocator.check_heap(), "corrupt after allocation {i}");
        }
      }

      live.shuffle(&mut rng);

      for (i, (ptr, size, tag)) in live.iter().enumerate() {
        // the payload must have survived every other operation
        for offset in [0, size / 2, size - 1] {
          assert_eq!(*tag, ptr.add(offset).read());
        }

        allocator.deallocate(*ptr);
        if i % 16 == 0 {
          assert!(allocator.check_heap(), "corrupt after free {i}");
        }
      }

      // with everything freed, full coalescing leaves a single block
      assert_eq!(1, allocator.free_blocks());
      assert!(allocator.check_heap());
    }
  }

  #[test]
  fn sbrk_allocator_smoke() {
    // the one test that touches the process break
    let mut allocator = SegListAllocator::new(Sbrk::new());

    unsafe {
      assert!(allocator.init());

      let ptr = allocator.allocate(128);
      assert!(!ptr.is_null());
      assert!(is_aligned(ptr, ALIGNMENT));

      ptr::write_bytes(ptr, 0xC3, 128);
      for i in 0..128 {
        assert_eq!(0xC3, ptr.add(i).read());
      }

      allocator.deallocate(ptr);
      assert_eq!(1, allocator.free_blocks());
      assert!(allocator.check_heap());
    }
  }
}
