use std::time::SystemTime;

use log::{debug, info};

use crate::backbone_trimmer::trim_unitigs;
use crate::breakpoint_finder::check_read;
use crate::containers::{
    BreakPoint, BreakpointTally, ConfusedEdge, TigLoc, TigVector, UnitigConfig, UnitigError,
    UnitigResult, Unitig,
};
use crate::evidence::PlacementEvidence;
use crate::tig_splitter::split_tig;

/// Split every assembled contig into unitigs wherever contig-end reads, or
/// confused read ends, show the contig merged distinct paths.
///
/// Steps, in order: sentinel breaks at both ends of every contig, breaks at
/// confused read ends, breaks where the first or last read of a contig
/// intersects the middle of another contig, then per-contig splitting and,
/// optionally, trimming of non-backbone reads from the new unitig ends.
///
/// Unassembled contigs are neither split nor copied. Returns an error, and no
/// unitigs, if any read cannot be placed consistently.
pub fn create_unitigs<E: PlacementEvidence>(
    contigs: &TigVector,
    evidence: &E,
    confused_edges: &[ConfusedEdge],
    config: &UnitigConfig,
) -> Result<UnitigResult, UnitigError> {
    let start_time = SystemTime::now();

    debug!("Adding sentinel breaks at the ends of contigs.");
    let mut breaks = sentinel_breaks(contigs);
    let n_sentinel = breaks.len();

    debug!("Adding breaks at confused reads.");
    add_confused_breaks(contigs, confused_edges, &mut breaks);
    let n_confused = breaks.len() - n_sentinel;

    debug!("Finding contig-end to contig-middle intersections.");
    let placement_histogram = add_intersection_breaks(contigs, evidence, config, &mut breaks);
    let n_intersection = breaks.len() - n_sentinel - n_confused;

    let tally = BreakpointTally {
        sentinel: n_sentinel,
        confused: n_confused,
        intersection: n_intersection,
    };
    log_breakpoint_summary(&placement_histogram, &tally, breaks.len());
    debug!(
        "Finding breakpoints: {}s",
        start_time.elapsed().unwrap_or_default().as_secs()
    );

    let split_time = SystemTime::now();
    let mut unitigs = TigVector::new();
    let sources = split_contigs(contigs, breaks, &mut unitigs)?;
    debug!(
        "Splitting contigs: {}s",
        split_time.elapsed().unwrap_or_default().as_secs()
    );

    let trimmed_reads = if config.trim_non_backbone {
        trim_unitigs(&mut unitigs, evidence)
    } else {
        Vec::new()
    };

    info!(
        "{} contigs resolved into {} unitigs",
        contigs.iter().filter(|tig| !tig.is_unassembled).count(),
        unitigs.len()
    );

    Ok(UnitigResult {
        unitigs,
        sources,
        trimmed_reads,
        placement_histogram,
        tally,
    })
}

/// A begin break at zero and an end break at the length of every assembled tig.
/// These put every tig in the list even with no real breaks, and bound the pieces.
pub fn sentinel_breaks(contigs: &TigVector) -> Vec<BreakPoint> {
    let mut breaks = Vec::new();
    for tig in contigs.iter() {
        if tig.is_unassembled {
            continue;
        }
        breaks.push(BreakPoint::new(tig.id, 0, true));
        breaks.push(BreakPoint::new(tig.id, tig.length, false));
    }
    breaks
}

/// Break at the confused end of each read flagged by repeat detection. The cut is
/// at the high coordinate of the read when the confused end is there, as a 3'
/// end of a forward read or the 5' end of a reverse read, otherwise at the low
/// coordinate. A break equal to the one just added is skipped.
pub fn add_confused_breaks(
    contigs: &TigVector,
    confused_edges: &[ConfusedEdge],
    breaks: &mut Vec<BreakPoint>,
) {
    for edge in confused_edges {
        let (tig_id, read_idx) = match (contigs.in_unitig(edge.a_id), contigs.ufpath_idx(edge.a_id)) {
            (Some(tig_id), Some(read_idx)) => (tig_id, read_idx),
            _ => {
                debug!("createUnitigs()-- confused read {} is not in a contig, skipped", edge.a_id);
                continue;
            }
        };
        let tig = match contigs.get(tig_id) {
            Some(tig) if !tig.is_unassembled => tig,
            _ => continue,
        };
        let read = match tig.ufpath.get(read_idx) {
            Some(read) => read,
            None => continue,
        };

        let breakpoint = if read.position.is_forward() == edge.a3p {
            BreakPoint::new(tig_id, read.position.max(), false)
        } else {
            BreakPoint::new(tig_id, read.position.min(), true)
        };

        if breaks.last() == Some(&breakpoint) {
            continue;
        }
        debug!(
            "createUnitigs()-- add break tig {} pos {} isLow {}",
            tig_id,
            breakpoint.pos,
            if breakpoint.is_begin { 't' } else { 'f' }
        );
        breaks.push(breakpoint);
    }
}

/// Check the first and last read of every assembled contig for intersections
/// with other contigs, adding the breaks they imply. Returns the histogram of
/// breaks found per contig end, before ambiguous ends were discarded.
pub fn add_intersection_breaks<E: PlacementEvidence>(
    contigs: &TigVector,
    evidence: &E,
    config: &UnitigConfig,
    breaks: &mut Vec<BreakPoint>,
) -> Vec<u32> {
    let mut histogram: Vec<u32> = vec![0];

    for tig in contigs.iter() {
        if tig.is_unassembled {
            continue;
        }
        let (first_read, last_read) = match (tig.first_read(), tig.last_read()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => continue,
        };

        let first_placements = evidence.place_read(first_read.id);
        let last_placements = evidence.place_read(last_read.id);

        if first_placements.len() + last_placements.len() > 0 {
            debug!(
                "createUnitigs()-- tig {} len {} first read {} with {} placements - last read {} with {} placements",
                tig.id,
                tig.length,
                first_read.id,
                first_placements.len(),
                last_read.id,
                last_placements.len()
            );
        }

        for (read, placements, is_first) in [
            (first_read, first_placements, true),
            (last_read, last_placements, false),
        ] {
            let end_breaks = check_read(tig, &read, &placements, contigs, evidence, config, is_first);
            if histogram.len() <= end_breaks.num_breaks {
                histogram.resize(end_breaks.num_breaks + 1, 0);
            }
            histogram[end_breaks.num_breaks] += 1;
            breaks.extend(end_breaks.breakpoints);
        }
    }
    histogram
}

fn log_breakpoint_summary(histogram: &[u32], tally: &BreakpointTally, n_breaks: usize) {
    debug!("Histogram of number of placements per contig end:");
    debug!("numPlacements  numEnds");
    for (n_placements, n_ends) in histogram.iter().enumerate() {
        debug!("{:13}  {:7}", n_placements, n_ends);
    }
    info!("Found {} breakpoints (including duplicates).", n_breaks);
    info!("      {} from sentinels.", tally.sentinel);
    info!("      {} from confused edges.", tally.confused);
    info!("      {} from intersections.", tally.intersection);
}

/// Sort the breaks, then split each contig on its own run of them. Provenance is
/// returned for every unitig created, in unitig id order.
pub fn split_contigs(
    contigs: &TigVector,
    mut breaks: Vec<BreakPoint>,
    unitigs: &mut TigVector,
) -> Result<Vec<TigLoc>, UnitigError> {
    breaks.sort();

    let mut sources = Vec::new();
    let mut ss = 0;
    while ss < breaks.len() {
        let tig_id = breaks[ss].tig_id;
        let mut ee = ss;
        while ee < breaks.len() && breaks[ee].tig_id == tig_id {
            ee += 1;
        }

        let mut tig_breaks: Vec<BreakPoint> = breaks[ss..ee].to_vec();
        tig_breaks.dedup();
        ss = ee;

        let tig = match contigs.get(tig_id) {
            Some(tig) => tig,
            None => continue,
        };
        if tig_breaks.len() > 2 {
            debug!(
                "createUnitigs()-- contig {} found {} breakpoint{}",
                tig_id,
                tig_breaks.len() - 2,
                if tig_breaks.len() - 2 != 1 { "s" } else { "" }
            );
        }

        let tig_sources = split_tig(tig, &tig_breaks, unitigs)?;
        verify_read_coverage(tig, &tig_sources, unitigs)?;
        for source in tig_sources.iter() {
            debug!("createUnitigs()-- {}", source);
        }
        sources.extend(tig_sources);
    }
    Ok(sources)
}

/// Every read of the contig must be in exactly one of the unitigs cut from it
pub fn verify_read_coverage(
    tig: &Unitig,
    sources: &[TigLoc],
    unitigs: &TigVector,
) -> Result<(), UnitigError> {
    let mut expected: Vec<u32> = tig.ufpath.iter().map(|read| read.id).collect();
    let mut found: Vec<u32> = sources
        .iter()
        .filter_map(|source| unitigs.get(source.unitig_id))
        .flat_map(|unitig| unitig.ufpath.iter().map(|read| read.id))
        .collect();
    expected.sort_unstable();
    found.sort_unstable();
    if expected != found {
        return Err(UnitigError::ReadCoverageMismatch {
            tig_id: tig.id,
            expected: expected.len(),
            found: found.len(),
        });
    }
    Ok(())
}
