// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Electronic diesel control.
//!
//! Hardware independent control logic. The register level drivers and the
//! interrupt handlers live in the firmware crate.

#![cfg_attr(not(test), no_std)]

pub mod analog;
pub mod boost;
pub mod controls;
pub mod crank;
pub mod debounce;
pub mod debug;
pub mod dtc;
pub mod eeprom;
pub mod fixpt;
pub mod hal;
pub mod idle;
pub mod map;
pub mod maps;
pub mod mutex;
pub mod node;
pub mod persist;
pub mod pid;
pub mod qa;
pub mod registry;
pub mod system;
pub mod timer;
pub mod timing;
pub mod units;

// vim: ts=4 sw=4 expandtab
