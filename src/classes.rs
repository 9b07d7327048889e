//! The segregated free-list index.
//!
//! Sixteen buckets, each the head of a doubly-linked list of free blocks,
//! keyed by the floor of the block size's base-2 logarithm:
//!
//! ```text
//!   class:   0        1        2        ...      15
//!   sizes:  48..63   64..127  128..255  ...   1 MiB and up
//!
//!   heads ─►┌──────┐ ┌──────┐ ┌──────┐        ┌──────┐
//!           │ blk  │ │ null │ │ blk  │  ...   │ blk  │
//!           └──┬───┘ └──────┘ └──┬───┘        └──────┘
//!              ▼                 ▼
//!           ┌──────┐         ┌──────┐
//!           │ blk  │         │ null │
//!           └──────┘         └──────┘
//! ```
//!
//! The top bucket is an overflow bucket: every block of a mebibyte or more
//! lands there, whatever its size. Insertion and removal are O(1); the
//! links are the `prev`/`next` fields embedded in the free block itself.

use std::{cmp, ptr};

use crate::block::{Header, MIN_BLOCK};

/// Number of size classes.
pub const CLASS_COUNT: usize = 16;

/// log2 of the smallest class boundary; class 0 starts at 2^5 = 32, below
/// the minimum block size, so every legal block maps to a valid class.
const CLASS_SHIFT: usize = 5;

/// Maps a block size to its class index.
///
/// Sizes at the minimum block size land in class 0; each class upward
/// doubles the range; everything from 2^20 bytes lands in the top class.
pub fn class_of(size: usize) -> usize {
  debug_assert!(size >= MIN_BLOCK);
  let log2 = (usize::BITS - 1 - size.leading_zeros()) as usize;
  cmp::min(log2.saturating_sub(CLASS_SHIFT), CLASS_COUNT - 1)
}

/// The bucket head table.
///
/// Tracks the running count of insertions minus removals so the
/// consistency checker can compare it against a full heap walk.
pub struct ClassIndex {
  heads: [*mut Header; CLASS_COUNT],
  entries: usize,
}

impl ClassIndex {
  pub fn new() -> Self {
    Self {
      heads: [ptr::null_mut(); CLASS_COUNT],
      entries: 0,
    }
  }

  /// Empties every bucket and resets the entry count.
  pub fn clear(&mut self) {
    self.heads = [ptr::null_mut(); CLASS_COUNT];
    self.entries = 0;
  }

  /// Number of blocks currently linked across all buckets.
  pub fn entries(&self) -> usize {
    self.entries
  }

  /// Head of the given bucket's list, null when the bucket is empty.
  pub fn head(
    &self,
    class: usize,
  ) -> *mut Header {
    self.heads[class]
  }

  /// Pushes `block` at the head of the bucket for `size`.
  ///
  /// The caller passes the size explicitly so a block whose tags are
  /// mid-rewrite still files into a well-defined bucket; pass the size the
  /// block has (or is about to have) as a free block.
  ///
  /// # Safety
  ///
  /// `block` must point at a block that is not currently linked in any
  /// bucket, and its link fields must be writable (the block is free).
  pub unsafe fn insert(
    &mut self,
    block: *mut Header,
    size: usize,
  ) {
    unsafe {
      let class = class_of(size);
      let old_head = self.heads[class];

      (*block).prev = ptr::null_mut();
      (*block).next = old_head;

      if !old_head.is_null() {
        (*old_head).prev = block;
      }

      self.heads[class] = block;
      self.entries += 1;
    }
  }

  /// Unlinks `block` from the bucket it was inserted into.
  ///
  /// `size` must be the size the block had when it was inserted — never a
  /// size written afterwards — so the bucket head is fixed up in the same
  /// bucket the block actually lives in. Removing a block that is not
  /// linked corrupts the index; the consistency checker detects it.
  ///
  /// # Safety
  ///
  /// `block` must currently be linked in the bucket for `size`.
  pub unsafe fn remove(
    &mut self,
    block: *mut Header,
    size: usize,
  ) {
    unsafe {
      let class = class_of(size);
      let prev = (*block).prev;
      let next = (*block).next;

      (*block).prev = ptr::null_mut();
      (*block).next = ptr::null_mut();

      if prev.is_null() {
        self.heads[class] = next;
      } else {
        (*prev).next = next;
      }

      if !next.is_null() {
        (*next).prev = prev;
      }

      self.entries -= 1;
    }
  }
}
