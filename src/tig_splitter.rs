use std::collections::HashMap;

use log::debug;

use crate::containers::{BreakPoint, ReadPlacement, TigLoc, TigVector, Unitig, UnitigError};

/// Find the pieces the two ends of a read fall in. A piece is the region between
/// two adjacent breakpoints; `lo` may sit on a piece's first boundary, `hi` on
/// its last. Zero-width pieces never contain an endpoint.
fn find_end_pieces(lo: i32, hi: i32, breakpoints: &[BreakPoint]) -> (Option<usize>, Option<usize>) {
    let mut bgn_piece = None;
    let mut end_piece = None;
    for (piece, pair) in breakpoints.windows(2).enumerate() {
        let (p, n) = (pair[0].pos, pair[1].pos);
        if p <= lo && lo < n {
            bgn_piece = Some(piece);
        }
        if p < hi && hi <= n {
            end_piece = Some(piece);
        }
    }
    (bgn_piece, end_piece)
}

/// Choose the piece a read is moved to.
///
/// Suppose we're placing the long read. It begins in piece 1 and ends in piece 6.
///
/// ```text
///   [----1---][----3----]---4---[--5---]------6-----]   piece and boundary condition
///   ------
///      --------------------------------------
///        -----
///             ------
///                  ------
///                               ----
///                                  -----
///                                          ----------
/// ```
///
/// It can't go in piece 1, it would span the end boundary. Piece 6 has no
/// restriction on where reads begin, so it goes there. Had piece 6 been bounded
/// too, the zero-width piece 2 between the end of 1 and the start of 3 is free.
pub fn select_piece(
    tig_id: u32,
    read: &ReadPlacement,
    breakpoints: &[BreakPoint],
) -> Result<usize, UnitigError> {
    let (bgn_piece, end_piece) =
        find_end_pieces(read.position.min(), read.position.max(), breakpoints);

    let unplaceable = || UnitigError::UnplaceableRead {
        tig_id,
        read_id: read.id,
        position: read.position,
        bgn_piece,
        end_piece,
    };

    let (bgn, end) = match (bgn_piece, end_piece) {
        (Some(bgn), Some(end)) => (bgn, end),
        _ => return Err(unplaceable()),
    };

    if bgn == end {
        return Ok(bgn);
    }

    // The next boundary only restricts where reads begin; the read may run past it.
    if breakpoints[bgn + 1].is_begin {
        return Ok(bgn);
    }

    // The end piece doesn't restrict where reads begin.
    if !breakpoints[end].is_begin {
        return Ok(end);
    }

    // bgn is closed by an end boundary and end is opened by a begin boundary, so
    // somewhere between them an end boundary is followed by a begin boundary.
    for piece in (bgn + 1)..end {
        if !breakpoints[piece].is_begin && breakpoints[piece + 1].is_begin {
            return Ok(piece);
        }
    }

    Err(unplaceable())
}

/// Piece index for every read of the tig, in ufpath order
pub fn assign_pieces(tig: &Unitig, breakpoints: &[BreakPoint]) -> Result<Vec<usize>, UnitigError> {
    tig.ufpath
        .iter()
        .map(|read| select_piece(tig.id, read, breakpoints))
        .collect()
}

/// Number of pieces that would receive at least one read
pub fn count_pieces(tig: &Unitig, breakpoints: &[BreakPoint]) -> Result<usize, UnitigError> {
    let mut pieces = assign_pieces(tig, breakpoints)?;
    pieces.sort_unstable();
    pieces.dedup();
    Ok(pieces.len())
}

/// Copy a tig read-for-read into the collection, coordinates untouched
pub fn copy_tig(unitigs: &mut TigVector, tig: &Unitig) -> u32 {
    let new_id = unitigs.new_unitig();
    for read in tig.ufpath.iter() {
        unitigs.add_read(new_id, *read, 0);
    }
    if let Some(new_tig) = unitigs.get_mut(new_id) {
        new_tig.is_unassembled = tig.is_unassembled;
        new_tig.is_repeat = tig.is_repeat;
        new_tig.length = tig.length;
    }
    new_id
}

/// Partition the reads of a tig over the pieces defined by its sorted, duplicate
/// free breakpoints and add one new unitig per occupied piece. Each unitig is
/// rebased so its lowest read starts at zero. A tig that would land in a single
/// piece is copied whole. Returns the provenance of every unitig made.
pub fn split_tig(
    tig: &Unitig,
    breakpoints: &[BreakPoint],
    unitigs: &mut TigVector,
) -> Result<Vec<TigLoc>, UnitigError> {
    debug!("splitTig()-- processing tig {}", tig.id);

    let assignments = assign_pieces(tig, breakpoints)?;

    // Group reads by piece, pieces ordered by the first read placed in them
    let mut piece_order: Vec<usize> = Vec::new();
    let mut piece_reads: HashMap<usize, Vec<ReadPlacement>> = HashMap::new();
    for (read, piece) in tig.ufpath.iter().zip(assignments.iter()) {
        if !piece_reads.contains_key(piece) {
            piece_order.push(*piece);
        }
        piece_reads.entry(*piece).or_default().push(*read);
    }

    for (piece, pair) in breakpoints.windows(2).enumerate() {
        debug!(
            "splitTig()-- piece {:2} from {:8} {} to {:8} {}",
            piece,
            pair[0].pos,
            if pair[0].is_begin { 't' } else { 'f' },
            pair[1].pos,
            if pair[1].is_begin { 't' } else { 'f' }
        );
    }

    if piece_order.len() <= 1 {
        let new_id = copy_tig(unitigs, tig);
        debug!("createUnitigs()-- contig {} copied into unitig {}.", tig.id, new_id);
        return Ok(vec![TigLoc {
            unitig_id: new_id,
            contig_id: tig.id,
            bgn: 0,
            end: tig.length,
        }]);
    }

    let mut sources = Vec::with_capacity(piece_order.len());
    for piece in piece_order {
        let reads = match piece_reads.get(&piece) {
            Some(reads) => reads,
            None => continue,
        };
        let low_coord = reads.iter().map(|r| r.position.min()).min().unwrap_or(0);
        let new_id = unitigs.new_unitig();
        debug!(
            "splitTig()-- new tig {} (piece={}) at read {} {}-{}",
            new_id,
            piece,
            reads[0].id,
            reads[0].position.min(),
            reads[0].position.max()
        );
        for read in reads.iter() {
            debug!(
                "splitTig()-- Move read {:8} {:8}-{:<8} to piece {:2} tig {:6}",
                read.id, read.position.bgn, read.position.end, piece, new_id
            );
            unitigs.add_read(new_id, *read, -low_coord);
        }
        let length = unitigs.get(new_id).map_or(0, |t| t.length);
        sources.push(TigLoc {
            unitig_id: new_id,
            contig_id: tig.id,
            bgn: low_coord,
            end: low_coord + length,
        });
    }

    debug!(
        "createUnitigs()-- contig {} was split into {} unitigs.",
        tig.id,
        sources.len()
    );
    Ok(sources)
}
