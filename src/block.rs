//! Boundary-tagged blocks.
//!
//! Every byte of the heap belongs to exactly one block. A block starts with
//! a [`Header`] and ends with a [`Footer`]; both carry the block's total
//! size and its free flag, so a neighbor in either direction can be reached
//! in constant time:
//!
//! ```text
//!   ┌──────────────┬──────────────────────────────────┬──────────────┐
//!   │    Header    │             Payload              │    Footer    │
//!   │ size | freed │                                  │ size | freed │
//!   └──────────────┴──────────────────────────────────┴──────────────┘
//!   ▲              ▲                                                 ▲
//!   │              │                                                 │
//!   block start    payload (block + TAG_SIZE)        block + size ───┘
//! ```
//!
//! The `prev`/`next` free-list links live in the first 16 bytes of the
//! payload. While the block is allocated the caller owns those bytes and
//! the allocator never reads them; while the block is free the allocator
//! owns them. Because the size/flag pair occupies exactly [`TAG_SIZE`]
//! bytes, the payload of every block begins on a 16-byte boundary.

use std::mem;

use static_assertions::const_assert_eq;

use crate::align16;

/// Block header. The link fields are only meaningful while `freed` is true.
#[repr(C)]
pub struct Header {
  pub size: usize,
  pub freed: bool,
  pub prev: *mut Header,
  pub next: *mut Header,
}

/// Block footer, a copy of the header's size and free flag.
#[repr(C)]
pub struct Footer {
  pub size: usize,
  pub freed: bool,
}

/// Width of one boundary tag. Also the offset from a block to its payload.
pub const TAG_SIZE: usize = mem::size_of::<Footer>();

/// Smallest payload a block can carry; holds the two free-list links.
pub const MIN_PAYLOAD: usize = 16;

/// Smallest legal block: two tags around the minimum payload.
pub const MIN_BLOCK: usize = TAG_SIZE + MIN_PAYLOAD + TAG_SIZE;

// The layout below is what makes payload pointers 16-byte aligned and the
// link fields overlap the payload. Pinned here so a field reorder or an
// unexpected target can't silently break it.
const_assert_eq!(TAG_SIZE, 16);
const_assert_eq!(mem::offset_of!(Header, prev), TAG_SIZE);
const_assert_eq!(mem::size_of::<Header>(), TAG_SIZE + MIN_PAYLOAD);
const_assert_eq!(align16!(MIN_BLOCK), MIN_BLOCK);

/// Returns the total block size needed to serve a payload request of
/// `request` bytes: the request plus both tags, rounded up to the
/// alignment.
pub fn alloc_size(request: usize) -> usize {
  align16!(request + TAG_SIZE + TAG_SIZE)
}

/// Returns the footer of the block starting at `block`.
///
/// # Safety
///
/// `block` must point at a block whose header size is already written.
pub unsafe fn footer_of(block: *mut Header) -> *mut Footer {
  unsafe { block.cast::<u8>().add((*block).size - TAG_SIZE).cast() }
}

/// Returns the header of the block ending at `footer`.
///
/// # Safety
///
/// `footer` must point at a block footer whose size is already written.
pub unsafe fn header_of(footer: *mut Footer) -> *mut Header {
  unsafe { footer.cast::<u8>().sub((*footer).size - TAG_SIZE).cast() }
}

/// Writes `size` into both tags of the block.
///
/// The footer location is derived from the new size, so the header is
/// updated first and the footer lands at the block's new end.
///
/// # Safety
///
/// `block` must point at the start of a block spanning at least `size`
/// valid bytes.
pub unsafe fn set_size(
  block: *mut Header,
  size: usize,
) {
  unsafe {
    (*block).size = size;
    (*footer_of(block)).size = size;
  }
}

/// Writes the free flag into both tags of the block.
///
/// If the block's size is changing as well, change it first: the footer is
/// located through the current header size.
///
/// # Safety
///
/// `block` must point at a block with consistent size tags.
pub unsafe fn set_freed(
  block: *mut Header,
  freed: bool,
) {
  unsafe {
    (*block).freed = freed;
    (*footer_of(block)).freed = freed;
  }
}

/// Returns the payload address of the block.
///
/// # Safety
///
/// `block` must point at the start of a block.
pub unsafe fn payload_of(block: *mut Header) -> *mut u8 {
  unsafe { block.cast::<u8>().add(TAG_SIZE) }
}

/// Returns the block that owns the given payload address.
///
/// # Safety
///
/// `payload` must be an address previously produced by [`payload_of`].
pub unsafe fn block_of(payload: *mut u8) -> *mut Header {
  unsafe { payload.sub(TAG_SIZE).cast() }
}
