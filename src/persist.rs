// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Configuration storage.
//!
//! The EEPROM starts with a 4 byte magic followed by a stream of records:
//!
//! ```text
//! file id (LE u16), size (LE u16), payload
//! ```
//!
//! Node payloads are the 16 bit value. Map payloads are the serialized map.
//! The stream ends with the file id 0xFFFF. Unknown and malformed records
//! are skipped.

use crate::{
    dtc::{DTC_EEPROM_OFFSET, Dtc, DtcCode},
    eeprom::{Eeprom, EepromError},
    map::{CalibrationMap, MAP_MAX_BYTES},
    registry::{
        FILE_ID_END, MAP_FILE_ID_FIRST, MAP_FILE_ID_LAST, NODE_FILE_ID_FIRST, NODE_FILE_ID_LAST,
        Registry,
    },
};

pub const CONFIG_MAGIC: [u8; 4] = *b"DC56";
const RECORD_HEADER_LEN: usize = 4;
const NODE_RECORD_SIZE: u16 = 2;

/// End of the configuration area. The DTC store follows.
pub const CONFIG_END: usize = DTC_EEPROM_OFFSET;

#[derive(Clone, Copy, PartialEq, Eq, Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no configuration found")]
    BadMagic,
    #[error("configuration does not fit into the EEPROM")]
    NoSpace,
    #[error(transparent)]
    Eeprom(#[from] EepromError),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct LoadStats {
    pub nodes: u16,
    pub maps: u16,
    /// Records rejected because of a size or format mismatch.
    pub mismatches: u16,
}

fn is_node_id(file_id: u16) -> bool {
    (NODE_FILE_ID_FIRST..=NODE_FILE_ID_LAST).contains(&file_id)
}

fn is_map_id(file_id: u16) -> bool {
    (MAP_FILE_ID_FIRST..=MAP_FILE_ID_LAST).contains(&file_id)
}

struct Writer<'a, E> {
    ee: &'a mut E,
    ofs: usize,
    end: usize,
}

impl<E: Eeprom> Writer<'_, E> {
    fn put(&mut self, data: &[u8]) -> Result<(), ConfigError> {
        if self.ofs + data.len() > self.end {
            return Err(ConfigError::NoSpace);
        }
        self.ee.write(self.ofs, data)?;
        self.ofs += data.len();
        Ok(())
    }

    fn record(&mut self, file_id: u16, payload: &[u8]) -> Result<(), ConfigError> {
        let [a, b] = file_id.to_le_bytes();
        let [c, d] = (payload.len() as u16).to_le_bytes();
        self.put(&[a, b, c, d])?;
        self.put(payload)
    }
}

/// Write all nodes and maps. Returns the number of bytes used.
pub fn save(reg: &Registry, ee: &mut impl Eeprom) -> Result<usize, ConfigError> {
    let end = ee.size().min(CONFIG_END);
    let mut w = Writer { ee, ofs: 0, end };
    w.put(&CONFIG_MAGIC)?;

    for node in reg.nodes().iter().filter(|n| is_node_id(n.file_id)) {
        w.record(node.file_id, &node.value.to_le_bytes())?;
    }

    let mut buf = [0; MAP_MAX_BYTES];
    for slot in reg.map_slots() {
        let len = slot
            .map
            .serialize(&slot.last, &mut buf)
            .map_err(|_| ConfigError::NoSpace)?;
        w.record(slot.map.id(), &buf[..len])?;
    }

    w.put(&FILE_ID_END.to_le_bytes())?;
    Ok(w.ofs)
}

/// Restore nodes and maps.
///
/// Mismatching records raise [DtcCode::ConfigurationMismatch] and are skipped.
/// A missing magic raises [DtcCode::ConfigurationError] and leaves the
/// registry untouched.
pub fn load(reg: &mut Registry, ee: &impl Eeprom, dtc: &mut Dtc) -> Result<LoadStats, ConfigError> {
    let mut magic = [0; 4];
    ee.read(0, &mut magic)?;
    if magic != CONFIG_MAGIC {
        dtc.set_error(DtcCode::ConfigurationError);
        return Err(ConfigError::BadMagic);
    }

    let end = ee.size().min(CONFIG_END);
    let mut stats = LoadStats::default();
    let mut mismatch = |stats: &mut LoadStats| {
        stats.mismatches += 1;
        dtc.set_error(DtcCode::ConfigurationMismatch);
    };

    let mut ofs = CONFIG_MAGIC.len();
    loop {
        if ofs + 2 > end {
            mismatch(&mut stats);
            break;
        }
        let file_id = ee.read_u16(ofs)?;
        if file_id == FILE_ID_END {
            break;
        }
        if ofs + RECORD_HEADER_LEN > end {
            mismatch(&mut stats);
            break;
        }
        let size = ee.read_u16(ofs + 2)? as usize;
        let data = ofs + RECORD_HEADER_LEN;
        if data + size > end {
            mismatch(&mut stats);
            break;
        }

        if is_node_id(file_id) {
            if size != NODE_RECORD_SIZE as usize {
                mismatch(&mut stats);
            } else if reg.restore_node(file_id, ee.read_u16(data)? as i16) {
                stats.nodes += 1;
            }
        } else if is_map_id(file_id) {
            if let Some(id) = reg.map_by_file_id(file_id) {
                let current = reg.map(id);
                let (size_x, size_y) = (current.size_x(), current.size_y());
                if size != current.serialized_len() {
                    mismatch(&mut stats);
                } else {
                    let mut buf = [0; MAP_MAX_BYTES];
                    ee.read(data, &mut buf[..size])?;
                    match CalibrationMap::deserialize(&buf[..size]) {
                        Ok((map, last))
                            if map.id() == file_id
                                && map.size_x() == size_x
                                && map.size_y() == size_y =>
                        {
                            reg.replace_map(id, map, last);
                            stats.maps += 1;
                        }
                        _ => mismatch(&mut stats),
                    }
                }
            }
        }

        ofs = data + size;
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{eeprom::RamEeprom, maps::MapId, node::NodeId};

    #[test]
    fn test_layout() {
        let reg = Registry::new();
        let mut ee: RamEeprom = RamEeprom::new();
        let len = save(&reg, &mut ee).unwrap();
        let b = ee.as_bytes();
        assert_eq!(&b[..4], b"DC56");
        // First node record: EngineRpm.
        assert_eq!(&b[4..10], &[0x01, 0x10, 2, 0, 0, 0]);
        assert_eq!(&b[len - 2..len], &[0xFF, 0xFF]);
        assert!(len < CONFIG_END);
    }

    #[test]
    fn test_truncated_stream() {
        let mut reg = Registry::new();
        reg.set_node_value(NodeId::IdleSpeedTarget, 1000);
        let mut ee: RamEeprom = RamEeprom::new();
        let len = save(&reg, &mut ee).unwrap();
        // Remove the end marker and fill the rest with a huge record.
        ee.write(len - 2, &[0x00, 0x10, 0xFF, 0x7F]).unwrap();

        let mut fresh = Registry::new();
        let mut dtc = Dtc::new();
        let stats = load(&mut fresh, &ee, &mut dtc).unwrap();
        assert_eq!(stats.mismatches, 1);
        assert_eq!(stats.maps as usize, MapId::COUNT);
        assert_eq!(fresh.value(NodeId::IdleSpeedTarget), 1000);
        assert!(dtc.is_error_active(DtcCode::ConfigurationMismatch));
    }

    #[test]
    fn test_unknown_records_skipped() {
        let mut ee = RamEeprom::<64>::new();
        ee.write(0, b"DC56").unwrap();
        ee.write(4, &[0x00, 0x20, 3, 0, 1, 2, 3]).unwrap();
        ee.write(11, &[0x99, 0x11, 2, 0, 5, 0]).unwrap();
        ee.write(17, &[0x19, 0x10, 2, 0, 0x84, 0x03]).unwrap();
        ee.write(23, &[0xFF, 0xFF]).unwrap();

        let mut reg = Registry::new();
        let mut dtc = Dtc::new();
        let stats = load(&mut reg, &ee, &mut dtc).unwrap();
        assert_eq!(
            stats,
            LoadStats {
                nodes: 1,
                maps: 0,
                mismatches: 0,
            }
        );
        assert_eq!(reg.value(NodeId::IdleSpeedTarget), 900);
        assert!(!dtc.is_error_active(DtcCode::ConfigurationMismatch));
    }

    #[test]
    fn test_no_space() {
        let reg = Registry::new();
        let mut ee = RamEeprom::<128>::new();
        assert_eq!(save(&reg, &mut ee), Err(ConfigError::NoSpace));
    }
}

// vim: ts=4 sw=4 expandtab
