// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Diagnostic trouble codes.
//!
//! Each code is counted at most once per power cycle, unless the store is
//! cleared. The counters live in their own EEPROM region.

use crate::{
    eeprom::{EEPROM_SIZE, Eeprom, EepromError},
    timer::{RelTimestamp, Timestamp},
};
use core::fmt::{self, Write as _};

pub const DTC_MAX_CODES: usize = 64;
pub const DTC_EEPROM_OFFSET: usize = EEPROM_SIZE - 512;
const DTC_MAGIC: [u8; 4] = *b"DT01";

/// Minimum time between two EEPROM flushes.
pub const DTC_SAVE_INTERVAL: RelTimestamp = RelTimestamp::from_millis(5000);

pub const STATUS_LEN: usize = 60;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum DtcCode {
    NoError = 0,
    InternalError = 1,
    ConfigurationError = 2,
    Trap1 = 3,
    Trap2 = 4,
    Trap3 = 5,
    Trap4 = 6,
    Trap5 = 7,
    StorageMismatch = 9,
    TpsUnconnected = 10,
    Tps2Unconnected = 11,
    MapUnconnected = 12,
    QuantityAdjusterUnconnected = 13,
    NeedleSensorUnplausible = 14,
    RpmUnplausible = 15,
    EngineTempUnconnected = 16,
    FuelTempUnconnected = 17,
    AirTempUnconnected = 18,
    TpsUnplausible = 19,
    ConfigurationMismatch = 20,
}

impl DtcCode {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Display name of a raw code.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DtcName(pub u8);

impl fmt::Display for DtcName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.0 {
            0 => "No error.",
            1 => "Internal error.",
            2 => "Default settings loaded.",
            3 => "Diagnostic trap #1",
            4 => "Diagnostic trap #2",
            5 => "Diagnostic trap #3",
            6 => "Diagnostic trap #4",
            7 => "Diagnostic trap #5",
            9 => "DTC Storage mismatch",
            10 => "TPS#1 unconnected",
            11 => "TPS#2 unconnected",
            12 => "MAP unconnected",
            13 => "Quantity Adjuster unconnected",
            14 => "Unplausible needle lift sensor signal",
            15 => "Unplausible RPM sensor signal",
            16 => "Engine temperature sensor unconnected",
            17 => "Fuel temperature sensor unconnected",
            18 => "Air temperature sensor unconnected",
            19 => "TPS signal unplausible",
            20 => "Configuration mismatch",
            n => return write!(f, "Unknown DTC Code {n}"),
        };
        f.write_str(name)
    }
}

pub struct Dtc {
    startup: [u8; DTC_MAX_CODES],
    current: [u8; DTC_MAX_CODES],
    touched: bool,
    last_save: Timestamp,
    iterator: i8,
    last: Option<DtcCode>,
    status: heapless::String<STATUS_LEN>,
}

impl Dtc {
    pub fn new() -> Self {
        Self {
            startup: [0; DTC_MAX_CODES],
            current: [0; DTC_MAX_CODES],
            touched: false,
            last_save: Timestamp::new(),
            iterator: -1,
            last: None,
            status: heapless::String::new(),
        }
    }

    fn set_status(&mut self, args: fmt::Arguments<'_>) {
        self.status.clear();
        // Overlong messages are cut.
        let _ = self.status.write_fmt(args);
    }

    /// Most recent status message for the UI.
    pub fn status_message(&self) -> &str {
        &self.status
    }

    /// Count an error. Only the first occurrence per power cycle is counted.
    pub fn set_error(&mut self, code: DtcCode) {
        let i = code.code() as usize;
        if self.startup[i] < u8::MAX && self.current[i] == self.startup[i] {
            self.current[i] += 1;
            self.touched = true;
            self.last = Some(code);
            self.set_status(format_args!("{}", DtcName(code.code())));
        }
    }

    /// Most recently counted code.
    pub fn last_code(&self) -> Option<DtcCode> {
        self.last
    }

    pub fn is_error_active(&self, code: DtcCode) -> bool {
        self.current[code.code() as usize] != 0
    }

    pub fn is_touched(&self) -> bool {
        self.touched
    }

    fn save_to_eeprom(&mut self, ee: &mut impl Eeprom) -> Result<(), EepromError> {
        ee.write(DTC_EEPROM_OFFSET, &DTC_MAGIC)?;
        ee.write(DTC_EEPROM_OFFSET + DTC_MAGIC.len(), &self.current)?;
        self.touched = false;
        Ok(())
    }

    /// Flush changed counters, at most once per [DTC_SAVE_INTERVAL].
    pub fn save(&mut self, ee: &mut impl Eeprom, now: Timestamp) -> Result<(), EepromError> {
        if self.touched && now - self.last_save > DTC_SAVE_INTERVAL {
            self.last_save = now;
            self.save_to_eeprom(ee)?;
        }
        Ok(())
    }

    /// Restore the counters. An unknown format clears the store.
    pub fn load(&mut self, ee: &mut impl Eeprom) -> Result<(), EepromError> {
        let mut magic = [0; 4];
        ee.read(DTC_EEPROM_OFFSET, &mut magic)?;
        if magic == DTC_MAGIC {
            ee.read(DTC_EEPROM_OFFSET + DTC_MAGIC.len(), &mut self.startup)?;
            self.current = self.startup;
            self.touched = false;
        } else {
            self.reset_all(ee)?;
            self.set_error(DtcCode::StorageMismatch);
        }
        Ok(())
    }

    pub fn reset_all(&mut self, ee: &mut impl Eeprom) -> Result<(), EepromError> {
        self.startup = [0; DTC_MAX_CODES];
        self.current = [0; DTC_MAX_CODES];
        self.touched = true;
        self.save_to_eeprom(ee)?;
        self.set_status(format_args!("DTC Reset"));
        Ok(())
    }

    /// Advance the cursor to the next recorded error.
    pub fn seek_next_error(&mut self) -> bool {
        while (self.iterator as isize) < DTC_MAX_CODES as isize - 1 {
            self.iterator += 1;
            if self.current[self.iterator as usize] > 0 {
                return true;
            }
        }
        self.iterator = -1;
        false
    }

    pub fn index(&self) -> i8 {
        self.iterator
    }

    pub fn name(&self) -> Option<DtcName> {
        u8::try_from(self.iterator).ok().map(DtcName)
    }

    pub fn count(&self) -> u8 {
        usize::try_from(self.iterator)
            .ok()
            .map_or(0, |i| self.current[i])
    }
}

impl Default for Dtc {
    fn default() -> Self {
        Self::new()
    }
}


// vim: ts=4 sw=4 expandtab
