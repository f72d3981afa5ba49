//! Cache-line aligned backing storage.

use std::ops::{Deref, DerefMut};

pub const CACHE_LINE_BYTES: usize = 64;

/// One element per 64-byte cache line. Elements larger than a line are
/// rounded up to a multiple of 64 bytes.
#[repr(C, align(64))]
#[derive(Debug, Default)]
pub struct CacheLine<T>(pub T);

impl<T> Deref for CacheLine<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for CacheLine<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

/// Allocate `count` default-initialised cache lines in one contiguous block.
pub fn alloc_cache_lines<T: Default>(count: usize) -> Box<[CacheLine<T>]> {
    (0..count).map(|_| CacheLine::default()).collect()
}
