//! A growable, contiguous sequence backed by an [`Allocator`].
//!
//! [`Array`] keeps its bookkeeping (length, capacity, owning allocator) next
//! to a single contiguous element block. Growth follows `2 * capacity + 8`
//! and goes through the owning allocator's `Resize`.
//!
//! # Aliasing
//!
//! Growing reallocates, which invalidates every element address taken
//! before the call. The borrow checker enforces this: no `&T` obtained
//! through [`Deref`] survives a `&mut self` call such as [`Array::push`].

use std::alloc::{handle_alloc_error, Layout};
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::slice;

use crate::allocator::Allocator;

/// Capacity an array grows to when it is full.
#[must_use]
pub const fn grow_capacity(capacity: usize) -> usize {
    2 * capacity + 8
}

/// A growable sequence of `Copy` elements.
pub struct Array<T: Copy> {
    ptr: NonNull<T>,
    len: usize,
    cap: usize,
    allocator: Allocator,
    _marker: PhantomData<T>,
}

impl<T: Copy> Array<T> {
    /// An empty array with the default reservation of
    /// `grow_capacity(0)` elements.
    #[must_use]
    pub fn new(allocator: Allocator) -> Self {
        Self::with_capacity(allocator, grow_capacity(0))
    }

    /// An empty array with room for `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized or the byte size overflows `isize`.
    /// Aborts through [`handle_alloc_error`] if the allocator is exhausted.
    #[must_use]
    pub fn with_capacity(allocator: Allocator, capacity: usize) -> Self {
        assert!(
            mem::size_of::<T>() != 0,
            "Array does not support zero-sized element types"
        );
        let layout = Self::layout_for(capacity);
        let ptr = allocator
            .alloc(layout)
            .unwrap_or_else(|| handle_alloc_error(layout))
            .cast::<T>();
        Self {
            ptr,
            len: 0,
            cap: capacity,
            allocator,
            _marker: PhantomData,
        }
    }

    /// An array of `len` copies of `value`, with capacity exactly `len`.
    #[must_use]
    pub fn filled(allocator: Allocator, len: usize, value: T) -> Self {
        let mut array = Self::with_capacity(allocator, len);
        for i in 0..len {
            // SAFETY: `i < cap`.
            unsafe { array.ptr.as_ptr().add(i).write(value) };
        }
        array.len = len;
        array
    }

    fn layout_for(capacity: usize) -> Layout {
        Layout::array::<T>(capacity).expect("array capacity overflows isize")
    }

    /// Number of elements.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the array holds no elements.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of elements the current block can hold.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// The allocator that owns the element block.
    #[must_use]
    pub fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    /// Append `value`, growing to `2 * capacity + 8` first if full.
    pub fn push(&mut self, value: T) {
        if self.len == self.cap {
            self.reallocate(grow_capacity(self.cap));
        }
        // SAFETY: `len < cap` after the grow above.
        unsafe { self.ptr.as_ptr().add(self.len).write(value) };
        self.len += 1;
    }

    /// Append every element of `values`, growing as many times as needed.
    pub fn extend_from_slice(&mut self, values: &[T]) {
        for &value in values {
            self.push(value);
        }
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: the slot at the old `len - 1` was initialized.
        Some(unsafe { self.ptr.as_ptr().add(self.len).read() })
    }

    /// Drop every element in O(1). The capacity is kept.
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    fn reallocate(&mut self, new_cap: usize) {
        let old_layout = Self::layout_for(self.cap);
        let new_layout = Self::layout_for(new_cap);
        // SAFETY: `ptr` was produced by `allocator` for `old_layout`.
        let ptr = unsafe {
            self.allocator
                .resize(self.ptr.cast(), old_layout, new_layout.size())
        }
        .unwrap_or_else(|| handle_alloc_error(new_layout));
        self.ptr = ptr.cast();
        self.cap = new_cap;
    }
}

impl<T: Copy> Deref for Array<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        // SAFETY: the first `len` slots are initialized and `ptr` is aligned.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Copy> DerefMut for Array<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        // SAFETY: as in `deref`, and `&mut self` guarantees uniqueness.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Copy> Drop for Array<T> {
    fn drop(&mut self) {
        // SAFETY: the block was produced by `allocator` for this layout.
        unsafe {
            self.allocator
                .free(self.ptr.cast(), Self::layout_for(self.cap));
        }
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for Array<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
