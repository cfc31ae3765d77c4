// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Calibration lookup tables.
//!
//! Serialized layout of one map:
//!
//! ```text
//! 0      id low byte
//! 1      id high byte
//! 2      'M'
//! 3      dimension '1' or '2'
//! 4      'D' interpolated, 'N' cell at or below the position
//! 5      cell count X
//! 6      cell count Y (0 or 1: one dimensional)
//! 7..10  axis unit tags X, Y, result
//! 10..   cells, row major, Y outer
//! ..     last query X, last query Y, last value, last 10 bit value (LE)
//! ```

use crate::units::AxisUnit;

pub const MAP_HEADER_LEN: usize = 10;
pub const MAP_TRAILER_LEN: usize = 5;
pub const MAP_MAX_CELLS: usize = 64;
pub const MAP_MAX_BYTES: usize = MAP_HEADER_LEN + MAP_MAX_CELLS + MAP_TRAILER_LEN;

const MAP_TAG: u8 = b'M';
const INTERPOLATE_TAG: u8 = b'D';
const NEAREST_TAG: u8 = b'N';

/// Denominator of the bilinear weights.
const WEIGHT_DIV: u32 = 255 * 255;

#[derive(Clone, Copy, PartialEq, Eq, Debug, thiserror::Error)]
pub enum MapError {
    #[error("map data truncated")]
    Truncated,
    #[error("map data length does not match its dimensions")]
    LengthMismatch,
    #[error("bad map format tag")]
    BadTag,
    #[error("bad map dimensions")]
    BadDimensions,
    #[error("unknown axis unit tag {0:#04x}")]
    BadAxisUnit(u8),
    #[error("cell index out of range")]
    OutOfRange,
    #[error("output buffer too small")]
    BufferTooSmall,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MapAxes {
    pub x: AxisUnit,
    pub y: AxisUnit,
    pub result: AxisUnit,
}

impl MapAxes {
    pub const fn new(x: AxisUnit, y: AxisUnit, result: AxisUnit) -> Self {
        Self { x, y, result }
    }
}

/// The most recent lookup of a map. Shown by the live view.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct MapQuery {
    pub x: u8,
    pub y: u8,
    pub value: u8,
    pub value_10bit: u16,
}

const fn cell_count(size_x: u8, size_y: u8) -> usize {
    let rows = if size_y == 0 { 1 } else { size_y };
    size_x as usize * rows as usize
}

/// Position of an axis value between two cells.
#[derive(Clone, Copy)]
struct AxisPos {
    lo: usize,
    hi: usize,
    /// Weight of `hi` in 0..255.
    frac: u32,
}

impl AxisPos {
    fn new(v: u8, cells: u8) -> Self {
        let last = cells.max(1) as u32 - 1;
        let scaled = v as u32 * last;
        let lo = scaled / 255;
        Self {
            lo: lo as usize,
            hi: (lo + 1).min(last) as usize,
            frac: scaled % 255,
        }
    }

    /// Cell at or below the position.
    fn floor(&self) -> usize {
        self.lo
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CalibrationMap {
    id: u16,
    size_x: u8,
    size_y: u8,
    interpolate: bool,
    axes: MapAxes,
    cells: [u8; MAP_MAX_CELLS],
}

impl CalibrationMap {
    /// Build a map from its cells, row major.
    pub const fn new(
        id: u16,
        size_x: u8,
        size_y: u8,
        interpolate: bool,
        axes: MapAxes,
        cells: &[u8],
    ) -> Self {
        let count = cell_count(size_x, size_y);
        assert!(size_x > 0);
        assert!(count <= MAP_MAX_CELLS);
        assert!(cells.len() == count);
        let mut buf = [0; MAP_MAX_CELLS];
        let mut i = 0;
        while i < count {
            buf[i] = cells[i];
            i += 1;
        }
        Self {
            id,
            size_x,
            size_y,
            interpolate,
            axes,
            cells: buf,
        }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn size_x(&self) -> u8 {
        self.size_x
    }

    pub fn size_y(&self) -> u8 {
        self.size_y
    }

    /// Number of rows. One dimensional maps have one row.
    pub fn rows(&self) -> u8 {
        self.size_y.max(1)
    }

    pub fn is_2d(&self) -> bool {
        self.size_y > 1
    }

    pub fn interpolates(&self) -> bool {
        self.interpolate
    }

    pub fn axes(&self) -> MapAxes {
        self.axes
    }

    pub fn cell_count(&self) -> usize {
        cell_count(self.size_x, self.size_y)
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells[..self.cell_count()]
    }

    /// Size of the serialized map, header and trailer included.
    pub fn serialized_len(&self) -> usize {
        MAP_HEADER_LEN + self.cell_count() + MAP_TRAILER_LEN
    }

    fn index(&self, x: usize, y: usize) -> usize {
        y * self.size_x as usize + x
    }

    pub fn cell(&self, x: u8, y: u8) -> Option<u8> {
        if x < self.size_x && y < self.rows() {
            Some(self.cells[self.index(x as usize, y as usize)])
        } else {
            None
        }
    }

    pub fn set_cell(&mut self, x: u8, y: u8, value: u8) -> Result<(), MapError> {
        if x >= self.size_x || y >= self.rows() {
            return Err(MapError::OutOfRange);
        }
        let idx = self.index(x as usize, y as usize);
        self.cells[idx] = value;
        Ok(())
    }

    fn at(&self, x: usize, y: usize) -> u32 {
        self.cells[self.index(x, y)] as u32
    }

    /// Bilinear blend scaled by [WEIGHT_DIV].
    fn blend(&self, x: u8, y: u8) -> u32 {
        let px = AxisPos::new(x, self.size_x);
        let py = AxisPos::new(if self.is_2d() { y } else { 0 }, self.rows());
        let row = |r: usize| self.at(px.lo, r) * (255 - px.frac) + self.at(px.hi, r) * px.frac;
        row(py.lo) * (255 - py.frac) + row(py.hi) * py.frac
    }

    fn floor_cell(&self, x: u8, y: u8) -> u8 {
        let px = AxisPos::new(x, self.size_x);
        let py = AxisPos::new(if self.is_2d() { y } else { 0 }, self.rows());
        self.at(px.floor(), py.floor()) as u8
    }

    /// Look up the 8 bit result. `y` is ignored by one dimensional maps.
    pub fn lookup(&self, x: u8, y: u8) -> u8 {
        if self.interpolate {
            (self.blend(x, y) / WEIGHT_DIV) as u8
        } else {
            self.floor_cell(x, y)
        }
    }

    /// Look up the result with two extra bits of resolution (0..1020).
    pub fn lookup_10bit(&self, x: u8, y: u8) -> u16 {
        if self.interpolate {
            (self.blend(x, y) * 4 / WEIGHT_DIV) as u16
        } else {
            self.floor_cell(x, y) as u16 * 4
        }
    }

    pub fn query(&self, x: u8, y: u8) -> MapQuery {
        MapQuery {
            x,
            y,
            value: self.lookup(x, y),
            value_10bit: self.lookup_10bit(x, y),
        }
    }

    /// Write the map and its last query into `out`. Returns the length.
    pub fn serialize(&self, last: &MapQuery, out: &mut [u8]) -> Result<usize, MapError> {
        let len = self.serialized_len();
        let out = out.get_mut(..len).ok_or(MapError::BufferTooSmall)?;
        let [id_lo, id_hi] = self.id.to_le_bytes();
        out[..MAP_HEADER_LEN].copy_from_slice(&[
            id_lo,
            id_hi,
            MAP_TAG,
            if self.is_2d() { b'2' } else { b'1' },
            if self.interpolate {
                INTERPOLATE_TAG
            } else {
                NEAREST_TAG
            },
            self.size_x,
            self.size_y,
            self.axes.x.tag(),
            self.axes.y.tag(),
            self.axes.result.tag(),
        ]);
        let cells_end = MAP_HEADER_LEN + self.cell_count();
        out[MAP_HEADER_LEN..cells_end].copy_from_slice(self.cells());
        let [v10_lo, v10_hi] = last.value_10bit.to_le_bytes();
        out[cells_end..].copy_from_slice(&[last.x, last.y, last.value, v10_lo, v10_hi]);
        Ok(len)
    }

    /// Parse a serialized map.
    pub fn deserialize(buf: &[u8]) -> Result<(Self, MapQuery), MapError> {
        let header = buf.get(..MAP_HEADER_LEN).ok_or(MapError::Truncated)?;
        if header[2] != MAP_TAG {
            return Err(MapError::BadTag);
        }
        let interpolate = match header[4] {
            INTERPOLATE_TAG => true,
            NEAREST_TAG => false,
            _ => return Err(MapError::BadTag),
        };
        let (size_x, size_y) = (header[5], header[6]);
        let count = cell_count(size_x, size_y);
        let dim_ok = match header[3] {
            b'1' => size_y <= 1,
            b'2' => size_y > 1,
            _ => false,
        };
        if !dim_ok || size_x == 0 || count > MAP_MAX_CELLS {
            return Err(MapError::BadDimensions);
        }
        let unit = |tag| AxisUnit::from_tag(tag).ok_or(MapError::BadAxisUnit(tag));
        let axes = MapAxes::new(unit(header[7])?, unit(header[8])?, unit(header[9])?);

        let len = MAP_HEADER_LEN + count + MAP_TRAILER_LEN;
        if buf.len() < len {
            return Err(MapError::Truncated);
        }
        if buf.len() > len {
            return Err(MapError::LengthMismatch);
        }

        let mut cells = [0; MAP_MAX_CELLS];
        cells[..count].copy_from_slice(&buf[MAP_HEADER_LEN..MAP_HEADER_LEN + count]);
        let t = &buf[MAP_HEADER_LEN + count..];
        let map = Self {
            id: u16::from_le_bytes([header[0], header[1]]),
            size_x,
            size_y,
            interpolate,
            axes,
            cells,
        };
        let last = MapQuery {
            x: t[0],
            y: t[1],
            value: t[2],
            value_10bit: u16::from_le_bytes([t[3], t[4]]),
        };
        Ok((map, last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AxisUnit::*;

    #[rustfmt::skip]
    const TURBO_DUTY: [u8; 36] = [
        201, 227, 210, 201, 171, 158,
        201, 227, 208, 192, 169, 158,
        201, 182, 198, 180, 162, 158,
        201, 201, 195, 166, 153, 140,
        201, 182, 118, 151, 151, 28,
        201, 182, 156, 103, 59, 28,
    ];

    fn turbo(interpolate: bool) -> CalibrationMap {
        CalibrationMap::new(
            0xF0D0,
            6,
            6,
            interpolate,
            MapAxes::new(Rpm, InjectedFuel, DutyCycle),
            &TURBO_DUTY,
        )
    }

    fn glow() -> CalibrationMap {
        CalibrationMap::new(
            0xF0C0,
            6,
            1,
            true,
            MapAxes::new(Celsius, None, Seconds),
            &[30, 30, 20, 10, 0, 0],
        )
    }

    #[test]
    fn test_corners() {
        let map = turbo(true);
        assert_eq!(map.lookup(0, 0), 201);
        assert_eq!(map.lookup(255, 255), 28);
        assert_eq!(map.lookup(255, 0), 158);
        assert_eq!(map.lookup(0, 255), 201);
        assert_eq!(map.lookup_10bit(0, 0), 804);
        assert_eq!(map.lookup_10bit(255, 255), 112);
        // Exactly on the second column.
        assert_eq!(map.lookup(51, 0), 227);
    }

    #[test]
    fn test_interpolation() {
        let map = turbo(true);
        // Half way between 201 and 227 on the first row.
        let v = map.lookup(25, 0);
        assert!((213..=214).contains(&v));
        let v10 = map.lookup_10bit(25, 0);
        assert!(v10 / 4 == v as u16);
        assert!(v10 > 804 && v10 < 908);
    }

    #[test]
    fn test_floor_cell() {
        let map = turbo(false);
        for x in 0..=255_u32 {
            for y in (0..=255_u32).step_by(3) {
                let nx = ((x * 5) / 255) as usize;
                let ny = ((y * 5) / 255) as usize;
                let expected = TURBO_DUTY[ny * 6 + nx];
                assert_eq!(map.lookup(x as u8, y as u8), expected);
                assert_eq!(map.lookup_10bit(x as u8, y as u8), expected as u16 * 4);
            }
        }
        // No rounding up to the closer column.
        assert_eq!(map.lookup(30, 0), TURBO_DUTY[0]);
        assert_eq!(map.lookup(50, 0), TURBO_DUTY[0]);
        assert_eq!(map.lookup(51, 0), TURBO_DUTY[1]);
    }

    #[test]
    fn test_1d() {
        let map = glow();
        assert!(!map.is_2d());
        assert_eq!(map.lookup(0, 123), 30);
        assert_eq!(map.lookup(255, 7), 0);
        let mut prev = map.lookup(0, 0);
        for x in 1..=255 {
            let v = map.lookup(x, 0);
            assert!(v <= prev);
            prev = v;
        }
    }

    #[test]
    fn test_cells() {
        let mut map = turbo(true);
        assert_eq!(map.cell(5, 5), Some(28));
        assert_eq!(map.cell(6, 0), Option::None);
        map.set_cell(1, 0, 42).unwrap();
        assert_eq!(map.cell(1, 0), Some(42));
        assert_eq!(map.set_cell(0, 6, 1), Err(MapError::OutOfRange));
        assert_eq!(glow().set_cell(0, 1, 1), Err(MapError::OutOfRange));
    }

    #[test]
    fn test_serialize() {
        let map = glow();
        let last = map.query(128, 0);
        let mut buf = [0; MAP_MAX_BYTES];
        let len = map.serialize(&last, &mut buf).unwrap();
        assert_eq!(len, 6 + 15);
        assert_eq!(
            &buf[..MAP_HEADER_LEN],
            &[0xC0, 0xF0, b'M', b'1', b'D', 6, 1, 0x04, 0xFF, 0x10]
        );
        assert_eq!(&buf[10..16], &[30, 30, 20, 10, 0, 0]);
        assert_eq!(buf[16], 128);
        let (parsed, parsed_last) = CalibrationMap::deserialize(&buf[..len]).unwrap();
        assert_eq!(parsed, map);
        assert_eq!(parsed_last, last);

        let map = turbo(false);
        let len = map.serialize(&MapQuery::default(), &mut buf).unwrap();
        assert_eq!(len, 36 + 15);
        assert_eq!(&buf[2..5], b"M2N");
        assert_eq!(CalibrationMap::deserialize(&buf[..len]).unwrap().0, map);

        assert_eq!(
            map.serialize(&MapQuery::default(), &mut buf[..50]),
            Err(MapError::BufferTooSmall)
        );
    }

    #[test]
    fn test_deserialize_errors() {
        let map = glow();
        let mut buf = [0; MAP_MAX_BYTES];
        let len = map.serialize(&MapQuery::default(), &mut buf).unwrap();

        assert_eq!(
            CalibrationMap::deserialize(&buf[..len - 1]),
            Err(MapError::Truncated)
        );
        assert_eq!(
            CalibrationMap::deserialize(&buf[..len + 1]),
            Err(MapError::LengthMismatch)
        );
        let mut bad = buf;
        bad[2] = b'X';
        assert_eq!(CalibrationMap::deserialize(&bad[..len]), Err(MapError::BadTag));
        let mut bad = buf;
        bad[3] = b'2';
        assert_eq!(
            CalibrationMap::deserialize(&bad[..len]),
            Err(MapError::BadDimensions)
        );
        let mut bad = buf;
        bad[9] = 0x42;
        assert_eq!(
            CalibrationMap::deserialize(&bad[..len]),
            Err(MapError::BadAxisUnit(0x42))
        );
    }
}

// vim: ts=4 sw=4 expandtab
