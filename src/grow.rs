//! Heap sources.
//!
//! The allocator itself never talks to the operating system; it asks a
//! [`HeapSource`] for more bytes whenever the free lists come up empty.
//! Each extension must be contiguous with the last one, so the blocks the
//! allocator carves always tile one unbroken span.
//!
//! Two sources are provided:
//!
//! - [`Sbrk`] grows the process data segment with `sbrk(2)`, the classic
//!   route for a malloc-style allocator.
//! - [`Arena`] hands out slices of one fixed, 16-byte-aligned buffer.
//!   Exhaustion is deterministic, which makes out-of-memory paths easy to
//!   exercise, and nothing process-global is touched.

use std::{alloc, ptr};

use libc::{c_void, intptr_t, sbrk};
use tracing::trace;

use crate::align::ALIGNMENT;
use crate::align16;

/// A supplier of contiguous heap memory.
pub trait HeapSource {
  /// Extends the heap by exactly `bytes` and returns the start of the new
  /// region, or null when no more memory is available.
  ///
  /// The returned region is contiguous with the previous extension.
  ///
  /// # Safety
  ///
  /// The caller must treat the returned region as uninitialized and must
  /// not request more bytes than it is prepared to manage.
  unsafe fn extend(
    &mut self,
    bytes: usize,
  ) -> *mut u8;
}

/// Heap source backed by the program break.
///
/// The first extension pads the break up to a 16-byte boundary, so every
/// address handed to the allocator afterwards is aligned.
pub struct Sbrk {
  aligned: bool,
}

impl Sbrk {
  pub fn new() -> Self {
    Self { aligned: false }
  }
}

impl HeapSource for Sbrk {
  unsafe fn extend(
    &mut self,
    bytes: usize,
  ) -> *mut u8 {
    unsafe {
      if !self.aligned {
        let brk = sbrk(0) as usize;
        let pad = align16!(brk) - brk;

        if pad != 0 && sbrk(pad as intptr_t) == usize::MAX as *mut c_void {
          return ptr::null_mut();
        }
        self.aligned = true;
      }

      // sbrk returns the old break, i.e. the start of the fresh region,
      // or (void*)-1 on failure
      let base = sbrk(bytes as intptr_t);
      if base == usize::MAX as *mut c_void {
        return ptr::null_mut();
      }

      trace!(bytes, base = ?base, "program break advanced");
      base as *mut u8
    }
  }
}

/// Heap source backed by one fixed-capacity buffer.
pub struct Arena {
  base: *mut u8,
  capacity: usize,
  used: usize,
}

impl Arena {
  /// Creates an arena of (at least) `capacity` bytes, rounded up to the
  /// block alignment. A capacity of zero, or a failed buffer allocation,
  /// yields an arena that is already exhausted.
  pub fn with_capacity(capacity: usize) -> Self {
    let capacity = align16!(capacity);

    let base = match alloc::Layout::from_size_align(capacity, ALIGNMENT) {
      Ok(layout) if capacity > 0 => unsafe { alloc::alloc(layout) },
      _ => ptr::null_mut(),
    };

    Self {
      base,
      capacity: if base.is_null() { 0 } else { capacity },
      used: 0,
    }
  }

  /// Bytes not yet handed out.
  pub fn remaining(&self) -> usize {
    self.capacity - self.used
  }
}

impl HeapSource for Arena {
  unsafe fn extend(
    &mut self,
    bytes: usize,
  ) -> *mut u8 {
    if self.remaining() < bytes {
      return ptr::null_mut();
    }

    let span = unsafe { self.base.add(self.used) };
    self.used += bytes;

    trace!(bytes, remaining = self.remaining(), "arena span handed out");
    span
  }
}

impl Drop for Arena {
  fn drop(&mut self) {
    if !self.base.is_null() {
      unsafe {
        let layout = alloc::Layout::from_size_align_unchecked(self.capacity, ALIGNMENT);
        alloc::dealloc(self.base, layout);
      }
    }
  }
}
