use std::collections::HashMap;

use log::debug;

use crate::containers::{AssemblyLayout, Overlap, OverlapPlacement};

/// Read-level evidence consulted during unitig construction. Implementations
/// must present a fully populated, unchanging view for the whole pass.
pub trait PlacementEvidence {
    /// All overlaps involving the read, each with the read as the a side
    fn overlaps(&self, read_id: u32) -> &[Overlap];

    /// Candidate placements of the read against every tig
    fn place_read(&self, read_id: u32) -> Vec<OverlapPlacement>;

    /// Whether the read is trusted scaffolding in the best overlap graph
    fn is_backbone(&self, read_id: u32) -> bool;

    fn read_length(&self, read_id: u32) -> u32;
}

/// In-memory evidence built once from an assembly snapshot
#[derive(Debug, Default)]
pub struct ReadStore {
    read_lengths: HashMap<u32, u32>,
    backbone: HashMap<u32, bool>,
    overlaps: HashMap<u32, Vec<Overlap>>,
    placements: HashMap<u32, Vec<OverlapPlacement>>,
}

impl ReadStore {
    /// Index the snapshot by read. Every overlap is stored under both of its reads.
    pub fn from_layout(layout: &AssemblyLayout) -> Self {
        let mut store = ReadStore::default();
        for read in layout.reads.iter() {
            store.read_lengths.insert(read.id, read.length);
            store.backbone.insert(read.id, read.backbone);
        }
        for overlap in layout.overlaps.iter() {
            store
                .overlaps
                .entry(overlap.a_id)
                .or_default()
                .push(*overlap);
            store
                .overlaps
                .entry(overlap.b_id)
                .or_default()
                .push(overlap.swapped());
        }
        for placement in layout.placements.iter() {
            store
                .placements
                .entry(placement.read_id)
                .or_default()
                .push(*placement);
        }
        debug!(
            "Indexed {} reads, {} overlaps, {} placements",
            store.read_lengths.len(),
            layout.overlaps.len(),
            layout.placements.len()
        );
        store
    }
}

impl PlacementEvidence for ReadStore {
    fn overlaps(&self, read_id: u32) -> &[Overlap] {
        match self.overlaps.get(&read_id) {
            Some(overlaps) => overlaps.as_slice(),
            None => &[],
        }
    }

    fn place_read(&self, read_id: u32) -> Vec<OverlapPlacement> {
        self.placements.get(&read_id).cloned().unwrap_or_default()
    }

    fn is_backbone(&self, read_id: u32) -> bool {
        self.backbone.get(&read_id).copied().unwrap_or(false)
    }

    fn read_length(&self, read_id: u32) -> u32 {
        self.read_lengths.get(&read_id).copied().unwrap_or(0)
    }
}
