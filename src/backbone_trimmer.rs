use log::debug;

use crate::containers::{ReadPlacement, TigVector, Unitig};
use crate::evidence::PlacementEvidence;

/// Which end of a tig to trim from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimEnd {
    Start,
    End,
}

impl TrimEnd {
    fn label(&self) -> &'static str {
        match self {
            TrimEnd::Start => "first",
            TrimEnd::End => "last ",
        }
    }
}

/// Strip the run of non-backbone reads at one end of the tig, stopping at the
/// first backbone read. From the start, reads are visited in position order; from
/// the end, by falling end coordinate. A tig with no backbone reads is left alone.
/// Returns the removed reads; coordinates of the remaining reads are not touched.
pub fn trim_leading_non_backbone<E: PlacementEvidence>(
    tig: &mut Unitig,
    from_end: TrimEnd,
    evidence: &E,
) -> Vec<ReadPlacement> {
    if !tig.ufpath.iter().any(|read| evidence.is_backbone(read.id)) {
        return Vec::new();
    }
    match from_end {
        TrimEnd::Start => {
            let n_trim = tig
                .ufpath
                .iter()
                .take_while(|read| !evidence.is_backbone(read.id))
                .count();
            tig.ufpath.drain(..n_trim).collect()
        }
        TrimEnd::End => {
            // furthest-reaching reads first
            let mut by_end: Vec<usize> = (0..tig.ufpath.len()).collect();
            by_end.sort_by_key(|&idx| {
                let position = tig.ufpath[idx].position;
                std::cmp::Reverse((position.max(), position.min()))
            });
            let trim_idxs: Vec<usize> = by_end
                .into_iter()
                .take_while(|&idx| !evidence.is_backbone(tig.ufpath[idx].id))
                .collect();
            let removed: Vec<ReadPlacement> =
                trim_idxs.iter().map(|&idx| tig.ufpath[idx]).collect();
            let mut idx = 0;
            tig.ufpath.retain(|_| {
                let keep = !trim_idxs.contains(&idx);
                idx += 1;
                keep
            });
            removed
        }
    }
}

/// Remove non-backbone reads from both ends of every unitig that has at least one
/// backbone read. These are usually contained reads, and they confound graph
/// building because they can be missing overlaps. Trimmed unitigs are rebased to
/// zero. Returns (unitig id, read id) for every removed read.
pub fn trim_unitigs<E: PlacementEvidence>(unitigs: &mut TigVector, evidence: &E) -> Vec<(u32, u32)> {
    let mut trimmed_reads = Vec::new();

    for tig_id in 0..unitigs.len() as u32 {
        let mut removed = Vec::new();
        if let Some(tig) = unitigs.get_mut(tig_id) {
            if tig.is_unassembled || tig.is_empty() {
                continue;
            }
            let bb_reads = tig
                .ufpath
                .iter()
                .filter(|read| evidence.is_backbone(read.id))
                .count();
            if bb_reads == 0 {
                continue;
            }
            debug!(
                "unitig {} with {} reads, {} backbone and {} unplaced.",
                tig_id,
                tig.ufpath.len(),
                bb_reads,
                tig.ufpath.len() - bb_reads
            );

            for from_end in [TrimEnd::Start, TrimEnd::End] {
                for read in trim_leading_non_backbone(tig, from_end, evidence) {
                    debug!(
                        "WARNING: unitig {} {} read {:8} {:9}-{:9} is not backbone, removing.",
                        tig_id,
                        from_end.label(),
                        read.id,
                        read.position.bgn,
                        read.position.end
                    );
                    removed.push(read);
                }
            }
            if !removed.is_empty() {
                tig.clean_up();
            }
        }

        if removed.is_empty() {
            continue;
        }
        for read in removed {
            unitigs.unregister_read(read.id);
            trimmed_reads.push((tig_id, read.id));
        }
        unitigs.register_reads(tig_id);
    }

    debug!("{} non-backbone reads trimmed from unitig ends", trimmed_reads.len());
    trimmed_reads
}
