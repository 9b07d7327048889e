//! Heap consistency verification.
//!
//! Two walks: every free list is checked block by block, then the whole
//! heap is traversed header to header. The first violation is reported
//! through a `tracing` error event and stops the check; nothing is
//! repaired.

use tracing::error;

use crate::align::ALIGNMENT;
use crate::block::{self, Header, MIN_BLOCK};
use crate::classes::{CLASS_COUNT, class_of};
use crate::grow::HeapSource;
use crate::seglist::SegListAllocator;

/// Do the two boundary tags of `block` agree?
unsafe fn tags_agree(block: *mut Header) -> bool {
  unsafe {
    let foot = block::footer_of(block);
    (*block).size == (*foot).size && (*block).freed == (*foot).freed
  }
}

impl<S: HeapSource> SegListAllocator<S> {
  /// Verifies every structural invariant of the heap and the free-list
  /// index.
  ///
  /// # Returns
  ///
  /// `true` when the heap is consistent. On the first violation an error
  /// event naming the offending block is emitted and `false` is returned.
  ///
  /// # Safety
  ///
  /// The heap must not be mutated while the walk runs; callers uphold
  /// this trivially since every operation takes `&mut self`.
  pub unsafe fn check_heap(&self) -> bool {
    unsafe { self.check_free_lists() && self.check_blocks() }
  }

  /// Walks every bucket: listed blocks must be free, filed under the
  /// class of their size, tag-consistent, and inside the heap; the total
  /// must match the index counter.
  unsafe fn check_free_lists(&self) -> bool {
    unsafe {
      let mut listed = 0usize;

      for class in 0..CLASS_COUNT {
        let mut current = self.index.head(class);

        while !current.is_null() {
          listed += 1;

          if !self.in_heap(current) {
            error!(block = ?current, class, "listed block lies outside the heap");
            return false;
          }
          if !(*current).freed {
            error!(block = ?current, class, "allocated block linked in a free list");
            return false;
          }
          if class_of((*current).size) != class {
            error!(
              block = ?current,
              class,
              expected = class_of((*current).size),
              "block filed in the wrong bucket"
            );
            return false;
          }
          if !tags_agree(current) {
            error!(block = ?current, class, "boundary tags disagree");
            return false;
          }

          current = (*current).next;
        }
      }

      if listed != self.index.entries() {
        error!(
          listed,
          tracked = self.index.entries(),
          "free-list counter out of sync"
        );
        return false;
      }

      true
    }
  }

  /// Walks the heap block by block: blocks must tile the span exactly,
  /// sit on aligned addresses, carry legal tag-consistent sizes, and
  /// never leave two free neighbors uncoalesced. The number of free
  /// blocks seen must match the index counter.
  unsafe fn check_blocks(&self) -> bool {
    unsafe {
      if self.heap_lo.is_null() {
        return true;
      }

      let hi = self.heap_hi as usize;
      let mut address = self.heap_lo as usize;
      let mut walked_free = 0usize;
      let mut prev_freed = false;

      while address < hi {
        let current = address as *mut Header;

        if address % ALIGNMENT != 0 {
          error!(block = ?current, "block address is misaligned");
          return false;
        }

        let size = (*current).size;
        if size % ALIGNMENT != 0 || size < MIN_BLOCK {
          error!(block = ?current, size, "illegal block size");
          return false;
        }

        let Some(after) = address.checked_add(size) else {
          error!(block = ?current, size, "block size wraps the address space");
          return false;
        };
        if after > hi {
          error!(block = ?current, size, "block overruns the heap end");
          return false;
        }

        if !tags_agree(current) {
          error!(block = ?current, "boundary tags disagree");
          return false;
        }

        if (*current).freed {
          walked_free += 1;

          if prev_freed {
            error!(block = ?current, "adjacent free blocks left uncoalesced");
            return false;
          }
        }

        prev_freed = (*current).freed;
        address = after;
      }

      if walked_free != self.index.entries() {
        error!(
          walked_free,
          tracked = self.index.entries(),
          "heap walk and free-list index disagree"
        );
        return false;
      }

      true
    }
  }
}
