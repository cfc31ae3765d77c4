// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interrupt safe shared cells.
//!
//! State that is written from interrupt context and read from the main loop
//! lives in a [MutexCell]. Every access requires a [CriticalSection] token.
//! ISRs obtain the token from their context, the main loop obtains it from
//! `critical_section::with`.

use core::cell::Cell;

pub use critical_section::{CriticalSection, Mutex};

pub struct MutexCell<T> {
    inner: Mutex<Cell<T>>,
}

impl<T> MutexCell<T> {
    #[inline]
    pub const fn new(inner: T) -> Self {
        Self {
            inner: Mutex::new(Cell::new(inner)),
        }
    }

    #[inline]
    pub fn replace(&self, cs: CriticalSection<'_>, inner: T) -> T {
        self.inner.borrow(cs).replace(inner)
    }
}

impl<T: Copy> MutexCell<T> {
    #[inline]
    pub fn get(&self, cs: CriticalSection<'_>) -> T {
        self.inner.borrow(cs).get()
    }

    #[inline]
    pub fn set(&self, cs: CriticalSection<'_>, inner: T) {
        self.inner.borrow(cs).set(inner);
    }
}

impl<T: Copy + Default> MutexCell<T> {
    /// Read the value and reset it to its default.
    #[inline]
    pub fn take(&self, cs: CriticalSection<'_>) -> T {
        self.inner.borrow(cs).replace(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_clears() {
        let cell = MutexCell::new(5_u8);
        critical_section::with(|cs| {
            assert_eq!(cell.take(cs), 5);
            assert_eq!(cell.get(cs), 0);
            cell.set(cs, 7);
            assert_eq!(cell.replace(cs, 1), 7);
            assert_eq!(cell.get(cs), 1);
        });
    }
}

// vim: ts=4 sw=4 expandtab
