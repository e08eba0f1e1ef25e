//! Pluggable memory allocators.
//!
//! Every structure that owns memory in this crate is handed an [`Allocator`]
//! capability at construction and returns its memory through the same
//! capability. An allocator is driven through one operation,
//! [`RawAllocator::dispatch`], which receives an [`AllocRequest`] naming the
//! operation ([`AllocOp`]) and its sizes.
//!
//! Two allocators are provided:
//!
//! - [`HeapAllocator`] forwards to the global allocator. `FreeAll` is a no-op.
//! - [`ArenaAllocator`] bumps through one fixed block. `FreeAll` releases
//!   everything at once.
//!
//! Allocation failure is reported as `None`. The containers built on top
//! ([`Array`](crate::array::Array), [`U64Map`](crate::map::U64Map)) treat that
//! as fatal and call [`std::alloc::handle_alloc_error`].

use std::alloc::{self, Layout};
use std::cell::Cell;
use std::fmt;
use std::ptr::{self, NonNull};
use std::rc::Rc;

/// The operation an [`AllocRequest`] asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocOp {
    /// Allocate `size` bytes aligned to `align`.
    Alloc,
    /// Release the block at `old` (`old_size` bytes).
    Free,
    /// Release every block this allocator handed out, if it can.
    FreeAll,
    /// Grow or shrink the block at `old` from `old_size` to `size` bytes.
    Resize,
}

/// Arguments of a single [`RawAllocator::dispatch`] call.
#[derive(Debug, Clone, Copy)]
pub struct AllocRequest {
    /// Requested operation.
    pub op: AllocOp,
    /// Requested size in bytes (`Alloc`, `Resize`).
    pub size: usize,
    /// Size of the existing block in bytes (`Free`, `Resize`).
    pub old_size: usize,
    /// Alignment of the block. Must be a power of two.
    pub align: usize,
    /// The existing block (`Free`, `Resize`).
    pub old: Option<NonNull<u8>>,
}

impl AllocRequest {
    /// An `Alloc` request for `layout`.
    #[must_use]
    pub fn alloc(layout: Layout) -> Self {
        Self {
            op: AllocOp::Alloc,
            size: layout.size(),
            old_size: 0,
            align: layout.align(),
            old: None,
        }
    }

    /// A `Free` request for the block `ptr` described by `layout`.
    #[must_use]
    pub fn free(ptr: NonNull<u8>, layout: Layout) -> Self {
        Self {
            op: AllocOp::Free,
            size: 0,
            old_size: layout.size(),
            align: layout.align(),
            old: Some(ptr),
        }
    }

    /// A `FreeAll` request.
    #[must_use]
    pub fn free_all() -> Self {
        Self {
            op: AllocOp::FreeAll,
            size: 0,
            old_size: 0,
            align: 1,
            old: None,
        }
    }

    /// A `Resize` request moving `ptr` from `old_layout` to `new_size` bytes.
    #[must_use]
    pub fn resize(ptr: NonNull<u8>, old_layout: Layout, new_size: usize) -> Self {
        Self {
            op: AllocOp::Resize,
            size: new_size,
            old_size: old_layout.size(),
            align: old_layout.align(),
            old: Some(ptr),
        }
    }
}

/// A memory allocator driven through a single dispatch entry point.
pub trait RawAllocator {
    /// Perform `request`.
    ///
    /// Returns the new block for `Alloc` and `Resize`, and `None` for `Free`
    /// and `FreeAll`. `None` from `Alloc` or `Resize` means the allocator is
    /// exhausted; a failed `Resize` leaves the old block untouched.
    ///
    /// # Safety
    ///
    /// For `Free` and `Resize`, `request.old` must be a live block returned
    /// by this allocator, with `old_size` and `align` matching the request
    /// that produced it. After `Free`, a successful `Resize`, or `FreeAll`,
    /// the affected blocks must no longer be used.
    unsafe fn dispatch(&self, request: AllocRequest) -> Option<NonNull<u8>>;
}

/// A shareable allocator capability.
///
/// Cloning an `Allocator` clones the capability, not the memory: all clones
/// dispatch to the same underlying allocator.
#[derive(Clone)]
pub struct Allocator {
    inner: Rc<dyn RawAllocator>,
}

impl Allocator {
    /// Wrap any [`RawAllocator`] as a capability.
    pub fn new<A: RawAllocator + 'static>(allocator: A) -> Self {
        Self {
            inner: Rc::new(allocator),
        }
    }

    /// A capability backed by the global heap.
    #[must_use]
    pub fn heap() -> Self {
        Self::new(HeapAllocator)
    }

    /// A capability backed by a fresh [`ArenaAllocator`] of `capacity` bytes.
    #[must_use]
    pub fn arena(capacity: usize) -> Self {
        Self::new(ArenaAllocator::new(capacity))
    }

    /// Whether `a` and `b` dispatch to the same allocator.
    #[must_use]
    pub fn same(a: &Self, b: &Self) -> bool {
        ptr::addr_eq(Rc::as_ptr(&a.inner), Rc::as_ptr(&b.inner))
    }

    /// Allocate a block for `layout`. Returns `None` when exhausted.
    #[must_use]
    pub fn alloc(&self, layout: Layout) -> Option<NonNull<u8>> {
        // SAFETY: `Alloc` does not touch existing blocks.
        unsafe { self.inner.dispatch(AllocRequest::alloc(layout)) }
    }

    /// Release `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this capability for `layout` and must
    /// not be used afterwards.
    pub unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { self.inner.dispatch(AllocRequest::free(ptr, layout)) };
    }

    /// Ask the allocator to release everything it handed out.
    ///
    /// Best effort: the heap allocator ignores this, the arena allocator
    /// rewinds to empty.
    ///
    /// # Safety
    ///
    /// No block from this allocator may be used afterwards unless the
    /// concrete allocator documents `FreeAll` as a no-op.
    pub unsafe fn free_all(&self) {
        unsafe { self.inner.dispatch(AllocRequest::free_all()) };
    }

    /// Resize `ptr` from `old_layout` to `new_size` bytes, keeping the
    /// alignment. Returns `None` when exhausted, leaving `ptr` valid.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this capability for `old_layout`.
    /// On success the old pointer must no longer be used.
    pub unsafe fn resize(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        unsafe {
            self.inner
                .dispatch(AllocRequest::resize(ptr, old_layout, new_size))
        }
    }
}

impl fmt::Debug for Allocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocator")
            .field("inner", &Rc::as_ptr(&self.inner).cast::<()>())
            .finish()
    }
}

/// A dangling, well-aligned pointer standing in for zero-byte blocks.
fn empty_block(align: usize) -> NonNull<u8> {
    NonNull::new(ptr::without_provenance_mut(align)).unwrap_or(NonNull::dangling())
}

/// Allocator backed by the global heap.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapAllocator;

impl RawAllocator for HeapAllocator {
    unsafe fn dispatch(&self, request: AllocRequest) -> Option<NonNull<u8>> {
        match request.op {
            AllocOp::Alloc => {
                let layout = Layout::from_size_align(request.size, request.align).ok()?;
                if layout.size() == 0 {
                    return Some(empty_block(layout.align()));
                }
                // SAFETY: non-zero size checked above.
                NonNull::new(unsafe { alloc::alloc(layout) })
            }
            AllocOp::Free => {
                if let Some(old) = request.old {
                    if request.old_size != 0 {
                        // SAFETY: caller guarantees `old` came from this
                        // allocator with this layout.
                        unsafe {
                            alloc::dealloc(
                                old.as_ptr(),
                                Layout::from_size_align_unchecked(
                                    request.old_size,
                                    request.align,
                                ),
                            );
                        }
                    }
                }
                None
            }
            AllocOp::FreeAll => None,
            AllocOp::Resize => {
                let fresh = AllocRequest {
                    op: AllocOp::Alloc,
                    old: None,
                    ..request
                };
                let Some(old) = request.old else {
                    // SAFETY: `Alloc` does not touch existing blocks.
                    return unsafe { self.dispatch(fresh) };
                };
                if request.old_size == 0 {
                    // SAFETY: a zero-size block owns no memory, so this is a
                    // plain `Alloc`.
                    return unsafe { self.dispatch(fresh) };
                }
                if request.size == 0 {
                    // SAFETY: caller guarantees `old` is live with this
                    // layout and gives it up on success.
                    unsafe {
                        self.dispatch(AllocRequest {
                            op: AllocOp::Free,
                            ..request
                        })
                    };
                    return Some(empty_block(request.align));
                }
                Layout::from_size_align(request.size, request.align).ok()?;
                // SAFETY: caller guarantees `old` came from this allocator
                // with `old_size`/`align`; new size is non-zero and valid.
                NonNull::new(unsafe {
                    alloc::realloc(
                        old.as_ptr(),
                        Layout::from_size_align_unchecked(request.old_size, request.align),
                        request.size,
                    )
                })
            }
        }
    }
}

/// A bump allocator over one fixed block of memory.
///
/// Blocks are carved off the front in order. Freeing the most recent block
/// gives its bytes back; freeing any other block does nothing until the
/// next `FreeAll`. Resizing the most recent block happens in place when it
/// fits.
///
/// Not thread-safe; use one arena per thread.
pub struct ArenaAllocator {
    base: NonNull<u8>,
    capacity: usize,
    cursor: Cell<usize>,
    /// Offset of the most recent live block.
    last: Cell<Option<usize>>,
}

impl ArenaAllocator {
    /// Reserve `capacity` bytes up front.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let storage: Box<[u8]> = vec![0u8; capacity].into_boxed_slice();
        let base =
            NonNull::new(Box::into_raw(storage).cast::<u8>()).unwrap_or(NonNull::dangling());
        Self {
            base,
            capacity,
            cursor: Cell::new(0),
            last: Cell::new(None),
        }
    }

    /// Total capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently carved off, including alignment padding.
    #[must_use]
    pub fn used(&self) -> usize {
        self.cursor.get()
    }

    /// Bytes still available before alignment.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity - self.cursor.get()
    }

    fn offset_of(&self, ptr: NonNull<u8>) -> usize {
        ptr.as_ptr().addr().wrapping_sub(self.base.as_ptr().addr())
    }

    fn bump(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        let cursor = self.cursor.get();
        let padding = self.base.as_ptr().wrapping_add(cursor).align_offset(align);
        let start = cursor.checked_add(padding)?;
        let end = start.checked_add(size)?;
        if end > self.capacity {
            return None;
        }
        self.cursor.set(end);
        self.last.set(Some(start));
        // SAFETY: `start <= capacity`, so the result stays inside (or one
        // past the end of) the reserved block.
        Some(unsafe { self.base.add(start) })
    }
}

impl ArenaAllocator {
    fn alloc_block(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        if !align.is_power_of_two() {
            return None;
        }
        // Zero-size blocks never become `last`, so they cannot alias the
        // next real block.
        if size == 0 {
            return Some(empty_block(align));
        }
        self.bump(size, align)
    }

    fn release(&self, old: NonNull<u8>) {
        let offset = self.offset_of(old);
        if self.last.get() == Some(offset) {
            self.cursor.set(offset);
            self.last.set(None);
        }
    }
}

impl RawAllocator for ArenaAllocator {
    unsafe fn dispatch(&self, request: AllocRequest) -> Option<NonNull<u8>> {
        match request.op {
            AllocOp::Alloc => self.alloc_block(request.size, request.align),
            AllocOp::Free => {
                if let Some(old) = request.old {
                    if request.old_size != 0 {
                        self.release(old);
                    }
                }
                None
            }
            AllocOp::FreeAll => {
                self.cursor.set(0);
                self.last.set(None);
                None
            }
            AllocOp::Resize => {
                let Some(old) = request.old.filter(|_| request.old_size != 0) else {
                    return self.alloc_block(request.size, request.align);
                };
                if request.size == 0 {
                    self.release(old);
                    return Some(empty_block(request.align));
                }
                let offset = self.offset_of(old);
                if self.last.get() == Some(offset) {
                    let end = offset.checked_add(request.size)?;
                    if end <= self.capacity {
                        self.cursor.set(end);
                        return Some(old);
                    }
                    return None;
                }
                let new = self.bump(request.size, request.align)?;
                // SAFETY: both blocks live inside the arena and do not
                // overlap, since `new` was carved after `old`.
                unsafe {
                    ptr::copy_nonoverlapping(
                        old.as_ptr(),
                        new.as_ptr(),
                        request.old_size.min(request.size),
                    );
                }
                Some(new)
            }
        }
    }
}

impl Drop for ArenaAllocator {
    fn drop(&mut self) {
        if self.capacity == 0 {
            return;
        }
        // SAFETY: `base`/`capacity` came from `Box::into_raw` in `new`.
        unsafe {
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
                self.base.as_ptr(),
                self.capacity,
            )));
        }
    }
}

impl fmt::Debug for ArenaAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaAllocator")
            .field("capacity", &self.capacity)
            .field("used", &self.cursor.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn layout(size: usize, align: usize) -> Layout {
        Layout::from_size_align(size, align).unwrap()
    }

    #[test]
    fn heap_alloc_resize_free() {
        let heap = Allocator::heap();
        let l = layout(16, 8);
        let ptr = heap.alloc(l).unwrap();
        unsafe {
            ptr.as_ptr().write_bytes(0xAB, 16);
            let grown = heap.resize(ptr, l, 64).unwrap();
            assert_eq!(*grown.as_ptr().add(15), 0xAB);
            heap.free(grown, layout(64, 8));
        }
    }

    #[test]
    fn heap_free_all_is_noop() {
        let heap = Allocator::heap();
        let l = layout(8, 8);
        let ptr = heap.alloc(l).unwrap();
        unsafe {
            ptr.as_ptr().write(7);
            heap.free_all();
            assert_eq!(*ptr.as_ptr(), 7);
            heap.free(ptr, l);
        }
    }

    #[test]
    fn arena_respects_alignment() {
        let arena = ArenaAllocator::new(256);
        unsafe {
            arena.dispatch(AllocRequest::alloc(layout(3, 1))).unwrap();
            let p = arena.dispatch(AllocRequest::alloc(layout(8, 8))).unwrap();
            assert_eq!(p.as_ptr().addr() % 8, 0);
        }
    }

    #[test]
    fn arena_exhaustion_returns_none() {
        let arena = Allocator::arena(32);
        assert!(arena.alloc(layout(24, 1)).is_some());
        assert!(arena.alloc(layout(16, 1)).is_none());
    }

    #[test]
    fn arena_resizes_last_block_in_place() {
        let arena = ArenaAllocator::new(128);
        unsafe {
            let p = arena.dispatch(AllocRequest::alloc(layout(16, 8))).unwrap();
            let q = arena
                .dispatch(AllocRequest::resize(p, layout(16, 8), 48))
                .unwrap();
            assert_eq!(p, q);
            assert_eq!(arena.used(), 48);
        }
    }

    #[test]
    fn arena_resize_of_older_block_copies() {
        let arena = ArenaAllocator::new(128);
        unsafe {
            let a = arena.dispatch(AllocRequest::alloc(layout(4, 1))).unwrap();
            a.as_ptr().copy_from([1u8, 2, 3, 4].as_ptr(), 4);
            arena.dispatch(AllocRequest::alloc(layout(4, 1))).unwrap();
            let moved = arena
                .dispatch(AllocRequest::resize(a, layout(4, 1), 8))
                .unwrap();
            assert_ne!(a, moved);
            assert_eq!(std::slice::from_raw_parts(moved.as_ptr(), 4), &[1, 2, 3, 4]);
        }
    }

    #[test]
    fn arena_free_last_rewinds_and_free_all_resets() {
        let arena = ArenaAllocator::new(64);
        unsafe {
            arena.dispatch(AllocRequest::alloc(layout(8, 1))).unwrap();
            let b = arena.dispatch(AllocRequest::alloc(layout(8, 1))).unwrap();
            arena.dispatch(AllocRequest::free(b, layout(8, 1)));
            assert_eq!(arena.used(), 8);
            arena.dispatch(AllocRequest::free_all());
            assert_eq!(arena.used(), 0);
            assert_eq!(arena.remaining(), 64);
        }
    }

    #[test]
    fn arena_zero_size_alloc_leaves_cursor_alone() {
        let arena = ArenaAllocator::new(64);
        unsafe {
            let empty = arena.dispatch(AllocRequest::alloc(layout(0, 4))).unwrap();
            assert_eq!(empty.as_ptr().addr() % 4, 0);
            assert_eq!(arena.used(), 0);
            let real = arena.dispatch(AllocRequest::alloc(layout(8, 4))).unwrap();
            assert_ne!(empty, real);
            // Growing the empty block must not hand back `real`'s bytes.
            let grown = arena
                .dispatch(AllocRequest::resize(empty, layout(0, 4), 8))
                .unwrap();
            assert_ne!(grown, real);
            assert_eq!(arena.used(), 16);
        }
    }

    #[test]
    fn arena_zero_size_free_keeps_live_block() {
        let arena = ArenaAllocator::new(64);
        unsafe {
            let empty = arena.dispatch(AllocRequest::alloc(layout(0, 4))).unwrap();
            let live = arena.dispatch(AllocRequest::alloc(layout(8, 4))).unwrap();
            arena.dispatch(AllocRequest::free(empty, layout(0, 4)));
            assert_eq!(arena.used(), 8);
            let next = arena.dispatch(AllocRequest::alloc(layout(8, 4))).unwrap();
            assert_ne!(live, next);
        }
    }

    #[test]
    fn arena_resize_to_zero_releases_last_block() {
        let arena = ArenaAllocator::new(64);
        unsafe {
            let p = arena.dispatch(AllocRequest::alloc(layout(16, 8))).unwrap();
            arena
                .dispatch(AllocRequest::resize(p, layout(16, 8), 0))
                .unwrap();
            assert_eq!(arena.used(), 0);
        }
    }

    #[test]
    fn heap_resize_through_zero() {
        let heap = Allocator::heap();
        let l = layout(0, 8);
        let empty = heap.alloc(l).unwrap();
        unsafe {
            let grown = heap.resize(empty, l, 32).unwrap();
            grown.as_ptr().write_bytes(1, 32);
            let shrunk = heap.resize(grown, layout(32, 8), 0).unwrap();
            assert_eq!(shrunk.as_ptr().addr() % 8, 0);
            heap.free(shrunk, l);
        }
    }

    #[test]
    fn capability_identity() {
        let a = Allocator::heap();
        let b = a.clone();
        let c = Allocator::heap();
        assert!(Allocator::same(&a, &b));
        assert!(!Allocator::same(&a, &c));
    }
}
