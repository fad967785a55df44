//! Query buffers and scoped views over them.
//!
//! A query takes its input buffer by value and hands it back, together with
//! the result buffer, only once the query has completed. Reading or writing
//! goes through `map` / `map_mut`, whose views end when they are dropped, so
//! a buffer can never be touched while a query owns it.

use std::fmt;
use std::ops::{Deref, DerefMut};

/// An owned, fixed-length buffer of query records.
pub struct Buffer<T> {
    label: &'static str,
    data: Vec<T>,
}

impl<T: Clone + Default> Buffer<T> {
    /// Allocate `len` default-initialized records.
    pub fn new(label: &'static str, len: usize) -> Self {
        Self {
            label,
            data: vec![T::default(); len],
        }
    }
}

impl<T> Buffer<T> {
    pub fn from_vec(label: &'static str, data: Vec<T>) -> Self {
        Self { label, data }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read-only view; released when the view is dropped.
    pub fn map(&self) -> BufferView<'_, T> {
        log::trace!("map {} ({} records)", self.label, self.data.len());
        BufferView {
            label: self.label,
            data: &self.data,
        }
    }

    /// Read/write view; released when the view is dropped.
    pub fn map_mut(&mut self) -> BufferViewMut<'_, T> {
        log::trace!("map_mut {} ({} records)", self.label, self.data.len());
        BufferViewMut {
            label: self.label,
            data: &mut self.data,
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl<T> fmt::Debug for Buffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("label", &self.label)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Scoped read access to a `Buffer`.
pub struct BufferView<'a, T> {
    label: &'static str,
    data: &'a [T],
}

impl<T> Deref for BufferView<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.data
    }
}

impl<T> Drop for BufferView<'_, T> {
    fn drop(&mut self) {
        log::trace!("unmap {}", self.label);
    }
}

/// Scoped read/write access to a `Buffer`.
pub struct BufferViewMut<'a, T> {
    label: &'static str,
    data: &'a mut [T],
}

impl<T> Deref for BufferViewMut<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.data
    }
}

impl<T> DerefMut for BufferViewMut<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.data
    }
}

impl<T> Drop for BufferViewMut<'_, T> {
    fn drop(&mut self) {
        log::trace!("unmap {}", self.label);
    }
}
