// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Debug value channel.
//!
//! The control loop logs values into a small table. The UART transmit
//! interrupt streams the table as `[id, lo, hi]` frames. A frame with the id
//! 0xFF and the value 0xFFFF ends each round.

use crate::{
    fixpt::Fixpt,
    mutex::{CriticalSection, MutexCell},
};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Debug {
    Rpm,
    QaSetpoint,
    QaPosition,
    QaDuty,
    BoostTarget,
    BoostDuty,
    LastDtc,
}
pub const NRVALUES: usize = 7;

/// Id byte of the end of round frame.
pub const END_OF_ROUND: u8 = 0xFF;

const INDEXSHIFT: usize = 2;
const INDEXMASK: u8 = (1 << INDEXSHIFT) - 1;

static VALUES: [MutexCell<u16>; NRVALUES] = [
    MutexCell::new(0),
    MutexCell::new(0),
    MutexCell::new(0),
    MutexCell::new(0),
    MutexCell::new(0),
    MutexCell::new(0),
    MutexCell::new(0),
];

/// Frame serializer state of the UART transmitter.
pub struct DebugStream {
    index: MutexCell<u8>,
}

impl DebugStream {
    pub const fn new() -> Self {
        Self {
            index: MutexCell::new(0),
        }
    }

    /// Next byte to transmit. Called from the transmit complete interrupt.
    pub fn next_byte(&self, cs: CriticalSection<'_>) -> u8 {
        let index = self.index.get(cs);
        let id = index >> INDEXSHIFT;
        let txindex = index & INDEXMASK;
        let valid = (id as usize) < NRVALUES;

        let value = if valid {
            VALUES[id as usize].get(cs)
        } else {
            0xFFFF
        };

        match txindex {
            0 => {
                self.index.set(cs, index + 1);
                if valid { id } else { END_OF_ROUND }
            }
            1 => {
                self.index.set(cs, index + 1);
                value as u8
            }
            _ => {
                let next = if valid { (id + 1) << INDEXSHIFT } else { 0 };
                self.index.set(cs, next);
                (value >> 8) as u8
            }
        }
    }
}

impl Default for DebugStream {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug {
    #[allow(unused_variables)]
    pub fn log_u16_cs(&self, cs: CriticalSection<'_>, value: u16) {
        #[cfg(feature = "debug")]
        VALUES[*self as usize].set(cs, value);
    }

    pub fn log_u16(&self, value: u16) {
        critical_section::with(|cs| self.log_u16_cs(cs, value));
    }

    pub fn log_u8(&self, value: u8) {
        self.log_u16(value.into())
    }

    /// Log a signed control value, saturated to the u16 range.
    pub fn log_i32(&self, value: i32) {
        self.log_u16(value.clamp(0, u16::MAX as i32) as u16)
    }

    pub fn log_fixpt(&self, value: Fixpt) {
        self.log_u16(value.to_q() as _);
    }
}


// vim: ts=4 sw=4 expandtab
