//! Node and map registry.
//!
//! Single owner of all tunable parameters. The UI moves a cursor over the
//! nodes and edits through the bounded setters. The control loop reads values
//! by [NodeId] and writes observables with [Registry::publish].

use crate::{
    map::{CalibrationMap, MapError, MapQuery},
    maps::{DEFAULT_MAPS, MapId},
    node::{ConfigNode, DEFAULT_NODES, NodeId, NodeProperty},
    units::DisplayScale,
};

/// Cursor value for "not positioned".
pub const LIST_RESET: i16 = -1;

pub const NODE_FILE_ID_FIRST: u16 = 0x1000;
pub const NODE_FILE_ID_LAST: u16 = 0x11FF;
pub const MAP_FILE_ID_FIRST: u16 = 0xF000;
pub const MAP_FILE_ID_LAST: u16 = 0xFFFE;
/// Terminates the configuration record stream.
pub const FILE_ID_END: u16 = 0xFFFF;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MapSlot {
    pub map: CalibrationMap,
    /// Most recent lookup done by the control loop.
    pub last: MapQuery,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Registry {
    nodes: [ConfigNode; NodeId::COUNT],
    maps: [MapSlot; MapId::COUNT],
    current: i16,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            nodes: DEFAULT_NODES,
            maps: core::array::from_fn(|i| MapSlot {
                map: DEFAULT_MAPS[i].clone(),
                last: MapQuery::default(),
            }),
            current: LIST_RESET,
        }
    }

    pub fn nodes(&self) -> &[ConfigNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &ConfigNode {
        &self.nodes[id.index()]
    }

    pub fn value(&self, id: NodeId) -> i32 {
        self.nodes[id.index()].value as i32
    }

    pub fn flag(&self, id: NodeId) -> bool {
        self.value(id) != 0
    }

    fn set_index(&mut self, index: usize, v: i32) {
        let node = &mut self.nodes[index];
        if !node.is_locked() {
            node.value = node.clamp(v);
        }
    }

    /// Bounded setter. Ignored for locked nodes.
    pub fn set_node_value(&mut self, id: NodeId, v: i32) {
        self.set_index(id.index(), v);
    }

    /// Control loop write path. Also updates locked nodes.
    pub fn publish(&mut self, id: NodeId, v: i32) {
        let node = &mut self.nodes[id.index()];
        node.value = node.clamp(v);
    }

    /// Store a persisted value verbatim. Returns false for unknown ids.
    pub fn restore_node(&mut self, file_id: u16, v: i16) -> bool {
        match self.nodes.iter_mut().find(|n| n.file_id == file_id) {
            Some(node) => {
                node.value = v;
                true
            }
            None => false,
        }
    }

    pub fn current_node(&self) -> i16 {
        self.current
    }

    /// Position the cursor. Out of range positions reset it.
    pub fn set_current_node(&mut self, start: i16) {
        self.current = if (0..NodeId::COUNT as i16).contains(&start) {
            start
        } else {
            LIST_RESET
        };
    }

    /// Advance to the next visible node. Wraps to [LIST_RESET] after the last.
    pub fn seek_next_node(&mut self) -> i16 {
        let mut next = self.current.saturating_add(1);
        while (next as usize) < NodeId::COUNT
            && self.nodes[next as usize].property == NodeProperty::Hidden
        {
            next += 1;
        }
        self.set_current_node(next);
        self.current
    }

    pub fn get_node_data(&self) -> Option<&ConfigNode> {
        usize::try_from(self.current)
            .ok()
            .and_then(|i| self.nodes.get(i))
    }

    pub fn get_node_id(&self) -> Option<NodeId> {
        usize::try_from(self.current)
            .ok()
            .and_then(|i| NodeId::ALL.get(i).copied())
    }

    pub fn set_value(&mut self, v: i32) {
        if let Ok(i) = usize::try_from(self.current) {
            self.set_index(i, v);
        }
    }

    pub fn inc_value(&mut self) {
        if let Some(node) = self.get_node_data() {
            let v = node.value as i32 + node.step as i32;
            self.set_value(v);
        }
    }

    pub fn dec_value(&mut self) {
        if let Some(node) = self.get_node_data() {
            let v = node.value as i32 - node.step as i32;
            self.set_value(v);
        }
    }

    pub fn map_slots(&self) -> &[MapSlot] {
        &self.maps
    }

    pub fn map_slot(&self, id: MapId) -> &MapSlot {
        &self.maps[id.index()]
    }

    pub fn map(&self, id: MapId) -> &CalibrationMap {
        &self.maps[id.index()].map
    }

    pub fn map_by_file_id(&self, file_id: u16) -> Option<MapId> {
        MapId::from_file_id(file_id)
    }

    /// Look up a map and record the query.
    pub fn map_lookup(&mut self, id: MapId, x: u8, y: u8) -> u8 {
        self.record(id, x, y).value
    }

    /// Look up a map at 10 bit resolution and record the query.
    pub fn map_lookup_10bit(&mut self, id: MapId, x: u8, y: u8) -> u16 {
        self.record(id, x, y).value_10bit
    }

    fn record(&mut self, id: MapId, x: u8, y: u8) -> MapQuery {
        let slot = &mut self.maps[id.index()];
        slot.last = slot.map.query(x, y);
        slot.last
    }

    /// Cell editor for the UI.
    pub fn set_map_cell(&mut self, id: MapId, x: u8, y: u8, value: u8) -> Result<(), MapError> {
        self.maps[id.index()].map.set_cell(x, y, value)
    }

    pub(crate) fn replace_map(&mut self, id: MapId, map: CalibrationMap, last: MapQuery) {
        self.maps[id.index()] = MapSlot { map, last };
    }

    pub fn display_scale(&self) -> DisplayScale {
        DisplayScale {
            map_kpa: self.value(NodeId::MapKpa),
            rpm_scale: self.value(NodeId::ControlMapScaleRpm),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}


// vim: ts=4 sw=4 expandtab
