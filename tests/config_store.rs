use edc::{
    dtc::{Dtc, DtcCode},
    eeprom::{Eeprom, RamEeprom},
    map::MAP_HEADER_LEN,
    maps::MapId,
    node::{NodeId, NodeProperty},
    persist::{self, CONFIG_MAGIC, ConfigError},
    registry::{FILE_ID_END, Registry},
};

fn tuned() -> Registry {
    let mut reg = Registry::new();
    reg.set_node_value(NodeId::IdleSpeedTarget, 910);
    reg.set_node_value(NodeId::BoostAdjusting, 2);
    reg.publish(NodeId::EngineRpm, 2345);
    reg.set_map_cell(MapId::Fuel, 3, 2, 99).unwrap();
    reg.set_map_cell(MapId::GlowPeriod, 1, 0, 45).unwrap();
    reg.map_lookup(MapId::TurboControl, 100, 200);
    reg
}

fn records(ee: &RamEeprom) -> Vec<(u16, Vec<u8>)> {
    let b = ee.as_bytes();
    let mut ofs = CONFIG_MAGIC.len();
    let mut out = Vec::new();
    loop {
        let id = u16::from_le_bytes([b[ofs], b[ofs + 1]]);
        if id == FILE_ID_END {
            return out;
        }
        let size = u16::from_le_bytes([b[ofs + 2], b[ofs + 3]]) as usize;
        out.push((id, b[ofs + 4..ofs + 4 + size].to_vec()));
        ofs += 4 + size;
    }
}

fn image(records: &[(u16, Vec<u8>)]) -> RamEeprom {
    let mut ee: RamEeprom = RamEeprom::new();
    ee.write(0, &CONFIG_MAGIC).unwrap();
    let mut ofs = CONFIG_MAGIC.len();
    for (id, data) in records {
        ee.write_u16(ofs, *id).unwrap();
        ee.write_u16(ofs + 2, data.len() as u16).unwrap();
        ee.write(ofs + 4, data).unwrap();
        ofs += 4 + data.len();
    }
    ee.write_u16(ofs, FILE_ID_END).unwrap();
    ee
}

#[test]
fn round_trip() {
    let reg = tuned();
    for prop in [NodeProperty::Hidden, NodeProperty::Editable, NodeProperty::Locked] {
        assert!(reg.nodes().iter().any(|n| n.property == prop));
    }
    assert!(reg.map(MapId::Fuel).is_2d());
    assert!(!reg.map(MapId::GlowPeriod).is_2d());

    let mut ee: RamEeprom = RamEeprom::new();
    let len = persist::save(&reg, &mut ee).unwrap();

    let mut loaded = Registry::new();
    let mut dtc = Dtc::new();
    let stats = persist::load(&mut loaded, &ee, &mut dtc).unwrap();
    assert_eq!(stats.nodes as usize, NodeId::COUNT - 1);
    assert_eq!(stats.maps as usize, MapId::COUNT);
    assert_eq!(stats.mismatches, 0);
    assert_eq!(loaded, reg);
    assert_eq!(loaded.value(NodeId::EngineRpm), 2345);
    assert_eq!(loaded.map_slot(MapId::TurboControl).last.x, 100);
    assert!(!dtc.is_error_active(DtcCode::ConfigurationMismatch));

    // Saving the restored state reproduces the image.
    let mut again: RamEeprom = RamEeprom::new();
    assert_eq!(persist::save(&loaded, &mut again).unwrap(), len);
    assert_eq!(ee.as_bytes()[..len], again.as_bytes()[..len]);
}

#[test]
fn corrupted_magic_keeps_defaults() {
    let mut ee: RamEeprom = RamEeprom::new();
    persist::save(&tuned(), &mut ee).unwrap();
    ee.write(0, b"XX56").unwrap();

    let mut reg = Registry::new();
    let mut dtc = Dtc::new();
    assert_eq!(
        persist::load(&mut reg, &ee, &mut dtc),
        Err(ConfigError::BadMagic)
    );
    assert_eq!(reg, Registry::new());
    assert!(dtc.is_error_active(DtcCode::ConfigurationError));
}

#[test]
fn mismatched_map_chunk_is_skipped() {
    let mut ee: RamEeprom = RamEeprom::new();
    persist::save(&tuned(), &mut ee).unwrap();
    let mut recs = records(&ee);
    let fuel = MapId::Fuel.defaults().id();
    let rec = recs.iter_mut().find(|(id, _)| *id == fuel).unwrap();
    rec.1.push(0);

    let mut reg = Registry::new();
    let mut dtc = Dtc::new();
    let stats = persist::load(&mut reg, &image(&recs), &mut dtc).unwrap();
    assert_eq!(stats.mismatches, 1);
    assert_eq!(stats.maps as usize, MapId::COUNT - 1);
    assert!(dtc.is_error_active(DtcCode::ConfigurationMismatch));
    assert_eq!(reg.map(MapId::Fuel), &MapId::Fuel.defaults());
    assert_eq!(reg.map(MapId::GlowPeriod).cell(1, 0), Some(45));
    assert_eq!(reg.value(NodeId::IdleSpeedTarget), 910);
}

#[test]
fn malformed_map_header_is_skipped() {
    let mut ee: RamEeprom = RamEeprom::new();
    persist::save(&tuned(), &mut ee).unwrap();
    let mut recs = records(&ee);
    let glow = MapId::GlowPeriod.defaults().id();
    let rec = recs.iter_mut().find(|(id, _)| *id == glow).unwrap();
    // Claims two dimensions.
    rec.1[3] = b'2';
    assert!(rec.1.len() > MAP_HEADER_LEN);

    let mut reg = Registry::new();
    let mut dtc = Dtc::new();
    let stats = persist::load(&mut reg, &image(&recs), &mut dtc).unwrap();
    assert_eq!(stats.mismatches, 1);
    assert_eq!(reg.map(MapId::GlowPeriod), &MapId::GlowPeriod.defaults());
    assert_eq!(reg.map(MapId::Fuel).cell(3, 2), Some(99));
}

#[test]
fn node_out_of_bounds_is_kept_verbatim() {
    let mut recs = vec![(NodeId::IdleSpeedTarget.defaults().file_id, 5000_i16.to_le_bytes().to_vec())];
    recs.push((0x1010, vec![1, 2, 3]));
    let mut reg = Registry::new();
    let mut dtc = Dtc::new();
    let stats = persist::load(&mut reg, &image(&recs), &mut dtc).unwrap();
    assert_eq!(stats.nodes, 1);
    assert_eq!(stats.mismatches, 1);
    assert_eq!(reg.value(NodeId::IdleSpeedTarget), 5000);
    assert_eq!(reg.value(NodeId::TpsMin), 201);
}

// vim: ts=4 sw=4 expandtab
