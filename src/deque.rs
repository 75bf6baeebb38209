// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A Chase–Lev work-stealing deque: one owner pushes and pops LIFO, any
//! number of stealers pop FIFO via compare-and-swap on `top`.
//!
//! `bottom` and `top` are monotonic counters, never reduced modulo the
//! buffer capacity; only the index into the backing array is. Only the
//! owning thread ever mutates `bottom`; stealers only ever advance `top`.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicIsize, AtomicPtr, Ordering};

use crossbeam_utils::CachePadded;

struct Buffer<T> {
    cap: usize,
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

impl<T> Buffer<T> {
    fn new(cap: usize) -> Box<Buffer<T>> {
        debug_assert!(cap.is_power_of_two());
        let slots = (0..cap).map(|_| UnsafeCell::new(MaybeUninit::uninit())).collect();
        Box::new(Buffer { cap, slots })
    }

    unsafe fn read(&self, index: isize) -> T {
        let slot = &self.slots[index as usize & (self.cap - 1)];
        (*slot.get()).as_ptr().read()
    }

    unsafe fn write(&self, index: isize, value: T) {
        let slot = &self.slots[index as usize & (self.cap - 1)];
        (*slot.get()).as_mut_ptr().write(value);
    }
}

/// A deque with a single owner. Clone [`Stealer`]s from it to hand to
/// other worker threads.
pub struct Worker<T> {
    bottom: CachePadded<AtomicIsize>,
    top: CachePadded<AtomicIsize>,
    buffer: AtomicPtr<Buffer<T>>,
    /// Buffers retired by growth, kept alive until the deque itself drops:
    /// a stealer may still be mid-read from an old buffer when the owner
    /// grows into a new one.
    garbage: UnsafeCell<Vec<Box<Buffer<T>>>>,
}

unsafe impl<T: Send> Send for Worker<T> {}
unsafe impl<T: Send> Sync for Worker<T> {}

const MIN_CAP: usize = 64;

impl<T> Worker<T> {
    pub fn new() -> Worker<T> {
        let buffer = Buffer::new(MIN_CAP);
        Worker {
            bottom: CachePadded::new(AtomicIsize::new(0)),
            top: CachePadded::new(AtomicIsize::new(0)),
            buffer: AtomicPtr::new(Box::into_raw(buffer)),
            garbage: UnsafeCell::new(Vec::new()),
        }
    }

    pub fn stealer(&self) -> Stealer<T> {
        Stealer {
            bottom: &self.bottom,
            top: &self.top,
            buffer: &self.buffer,
        }
    }

    /// Pushes `value` onto the bottom of the deque, growing the backing
    /// buffer first if it is full.
    pub fn push(&self, value: T) {
        let b = self.bottom.load(Ordering::Relaxed);
        let t = self.top.load(Ordering::Acquire);
        let buffer = unsafe { &*self.buffer.load(Ordering::Relaxed) };

        if b - t >= buffer.cap as isize {
            self.grow(b, t, buffer);
        }
        let buffer = unsafe { &*self.buffer.load(Ordering::Relaxed) };
        unsafe { buffer.write(b, value) };
        // Publishes the slot to stealers: any stealer that observes the
        // incremented `bottom` must also observe the write above.
        self.bottom.store(b + 1, Ordering::Release);
    }

    fn grow(&self, b: isize, t: isize, old: &Buffer<T>) {
        let new_cap = old.cap * 2;
        let new_buffer = Buffer::new(new_cap);
        for i in t..b {
            unsafe {
                let value = old.read(i);
                new_buffer.write(i, value);
            }
        }
        let new_ptr = Box::into_raw(new_buffer);
        let old_ptr = self.buffer.swap(new_ptr, Ordering::Release);
        unsafe {
            (*self.garbage.get()).push(Box::from_raw(old_ptr));
        }
    }

    /// Pops from the bottom (LIFO). Races with stealers only on the very
    /// last element, resolved with a CAS on `top`.
    pub fn pop(&self) -> Option<T> {
        let b = self.bottom.load(Ordering::Relaxed) - 1;
        let buffer = unsafe { &*self.buffer.load(Ordering::Relaxed) };
        self.bottom.store(b, Ordering::SeqCst);
        let t = self.top.load(Ordering::SeqCst);

        if t > b {
            // The deque was already empty; undo the speculative decrement.
            self.bottom.store(b + 1, Ordering::Relaxed);
            return None;
        }
        let value = unsafe { buffer.read(b) };
        if t == b {
            // This was the last element: race the stealers for it.
            let won = self
                .top
                .compare_exchange(t, t + 1, Ordering::SeqCst, Ordering::Relaxed)
                .is_ok();
            self.bottom.store(b + 1, Ordering::Relaxed);
            if !won {
                // A stealer already took it; `value` we read is a
                // duplicate read of memory the stealer also read, but
                // since we lost the race we must not return it.
                std::mem::forget(value);
                return None;
            }
        }
        Some(value)
    }
}

impl<T> Default for Worker<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Worker<T> {
    fn drop(&mut self) {
        let b = *self.bottom.get_mut();
        let t = *self.top.get_mut();
        let buffer = unsafe { &*self.buffer.load(Ordering::Relaxed) };
        for i in t..b {
            unsafe {
                drop(buffer.read(i));
            }
        }
        unsafe {
            drop(Box::from_raw(self.buffer.load(Ordering::Relaxed)));
        }
    }
}

/// A handle that may steal from the [`Worker`] it was created from. Cheap
/// to clone; pass one to every other worker thread.
pub struct Stealer<'a, T> {
    bottom: &'a CachePadded<AtomicIsize>,
    top: &'a CachePadded<AtomicIsize>,
    buffer: &'a AtomicPtr<Buffer<T>>,
}

impl<'a, T> Clone for Stealer<'a, T> {
    fn clone(&self) -> Self {
        Stealer { bottom: self.bottom, top: self.top, buffer: self.buffer }
    }
}

unsafe impl<'a, T: Send> Send for Stealer<'a, T> {}
unsafe impl<'a, T: Send> Sync for Stealer<'a, T> {}

/// Outcome of a steal attempt: distinguishing an empty deque from a lost
/// race lets the caller decide whether to move to the next victim
/// (`Empty`) or retry this one (`Retry`).
#[derive(Debug, PartialEq, Eq)]
pub enum Steal<T> {
    Empty,
    Retry,
    Success(T),
}

impl<'a, T> Stealer<'a, T> {
    pub fn steal(&self) -> Steal<T> {
        let t = self.top.load(Ordering::Acquire);
        // Sequentially consistent fence at the race window: this load of
        // `bottom` must not be reordered ahead of the `top` load above, or
        // a concurrent owner pop could be missed.
        let b = self.bottom.load(Ordering::SeqCst);
        if t >= b {
            return Steal::Empty;
        }
        let buffer = unsafe { &*self.buffer.load(Ordering::Acquire) };
        let value = unsafe { buffer.read(t) };
        match self.top.compare_exchange(t, t + 1, Ordering::SeqCst, Ordering::Relaxed) {
            Ok(_) => Steal::Success(value),
            Err(_) => {
                std::mem::forget(value);
                Steal::Retry
            }
        }
    }
}
