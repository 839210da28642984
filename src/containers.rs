use core::fmt;
use serde_derive::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::HashMap};

use crate::utils;

/// Position of a read or alignment on a tig. Orientation is carried by which bound
/// is larger: forward placements have bgn < end, reverse placements bgn > end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SeqInterval {
    pub bgn: i32,
    pub end: i32,
}

impl SeqInterval {
    pub fn new(bgn: i32, end: i32) -> Self {
        SeqInterval { bgn, end }
    }

    pub fn is_forward(&self) -> bool {
        self.bgn < self.end
    }

    pub fn min(&self) -> i32 {
        std::cmp::min(self.bgn, self.end)
    }

    pub fn max(&self) -> i32 {
        std::cmp::max(self.bgn, self.end)
    }

    /// True if the two intervals share at least one base, regardless of orientation
    pub fn is_overlapping(&self, other: &SeqInterval) -> bool {
        self.min() < other.max() && other.min() < self.max()
    }

    /// True if self lies entirely inside other
    pub fn is_contained(&self, other: &SeqInterval) -> bool {
        other.min() <= self.min() && self.max() <= other.max()
    }

    /// Same orientation, both bounds moved by offset
    pub fn shifted(&self, offset: i32) -> Self {
        SeqInterval {
            bgn: self.bgn + offset,
            end: self.end + offset,
        }
    }
}

impl fmt::Display for SeqInterval {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}-{}", self.bgn, self.end)
    }
}

/// A read laid out on a tig. Owned by exactly one tig at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReadPlacement {
    pub id: u32,
    pub position: SeqInterval,
}

impl ReadPlacement {
    pub fn new(id: u32, bgn: i32, end: i32) -> Self {
        ReadPlacement {
            id,
            position: SeqInterval::new(bgn, end),
        }
    }
}

impl fmt::Display for ReadPlacement {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "read {} {}", self.id, self.position)
    }
}

/// One segment of a tig's error profile: the erates of all intra-tig overlaps
/// covering [bgn, end), summarised as mean and standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorProfileSegment {
    pub bgn: i32,
    pub end: i32,
    pub mean: f64,
    pub stddev: f64,
}

impl ErrorProfileSegment {
    /// Largest erate still considered consistent with this segment
    pub fn max_erate(&self, deviations: f64) -> f64 {
        self.mean + deviations * self.stddev
    }
}

/// A contig or unitig: an ordered path of read placements plus flags.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Unitig {
    pub id: u32,
    pub length: i32,
    pub is_unassembled: bool,
    pub is_repeat: bool,
    pub ufpath: Vec<ReadPlacement>,

    #[serde(skip_serializing)]
    pub error_profile: Vec<ErrorProfileSegment>,
}

impl Unitig {
    pub fn new(id: u32) -> Self {
        Unitig {
            id,
            ..Default::default()
        }
    }

    pub fn first_read(&self) -> Option<&ReadPlacement> {
        self.ufpath.first()
    }

    pub fn last_read(&self) -> Option<&ReadPlacement> {
        self.ufpath.last()
    }

    pub fn is_empty(&self) -> bool {
        self.ufpath.is_empty()
    }

    /// Append a read moved by offset, extending the tig length to cover it.
    pub fn add_read(&mut self, read: ReadPlacement, offset: i32) {
        let moved = ReadPlacement {
            id: read.id,
            position: read.position.shifted(offset),
        };
        self.length = std::cmp::max(self.length, moved.position.max());
        self.ufpath.push(moved);
    }

    /// Re-sort reads into coordinate order, shift so the lowest coordinate is zero
    /// and recompute the length from the furthest read end.
    pub fn clean_up(&mut self) {
        self.ufpath.sort_by(|a, b| {
            (a.position.min(), a.position.max()).cmp(&(b.position.min(), b.position.max()))
        });
        let low = self.ufpath.iter().map(|r| r.position.min()).min().unwrap_or(0);
        let mut length = 0;
        for read in self.ufpath.iter_mut() {
            read.position = read.position.shifted(-low);
            length = std::cmp::max(length, read.position.max());
        }
        self.length = length;
    }
}

/// Append-only indexed collection of tigs with read-id lookups.
/// The tig id is always its index in the collection.
#[derive(Debug, Default)]
pub struct TigVector {
    tigs: Vec<Unitig>,
    read_locations: HashMap<u32, (u32, usize)>,
}

impl TigVector {
    pub fn new() -> Self {
        TigVector {
            tigs: Vec::new(),
            read_locations: HashMap::new(),
        }
    }

    /// Build a collection from tigs whose ids already match their index.
    pub fn from_unitigs(tigs: Vec<Unitig>) -> Self {
        let mut tig_vector = TigVector {
            tigs,
            read_locations: HashMap::new(),
        };
        for tig_idx in 0..tig_vector.tigs.len() {
            tig_vector.register_reads(tig_idx as u32);
        }
        tig_vector
    }

    /// Create an empty tig at the end of the collection and return its id
    pub fn new_unitig(&mut self) -> u32 {
        let id = self.tigs.len() as u32;
        self.tigs.push(Unitig::new(id));
        id
    }

    pub fn len(&self) -> usize {
        self.tigs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tigs.is_empty()
    }

    pub fn get(&self, tig_id: u32) -> Option<&Unitig> {
        self.tigs.get(tig_id as usize)
    }

    /// Mutable access. Callers that reorder or remove reads must follow up
    /// with register_reads() so the lookups stay current.
    pub fn get_mut(&mut self, tig_id: u32) -> Option<&mut Unitig> {
        self.tigs.get_mut(tig_id as usize)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Unitig> {
        self.tigs.iter()
    }

    /// Append a read to a tig, shifted by offset, and record where it lives.
    pub fn add_read(&mut self, tig_id: u32, read: ReadPlacement, offset: i32) {
        if let Some(tig) = self.tigs.get_mut(tig_id as usize) {
            tig.add_read(read, offset);
            self.read_locations
                .insert(read.id, (tig_id, tig.ufpath.len() - 1));
        }
    }

    /// Rebuild the read lookups for every read currently in the tig
    pub fn register_reads(&mut self, tig_id: u32) {
        if let Some(tig) = self.tigs.get(tig_id as usize) {
            for (idx, read) in tig.ufpath.iter().enumerate() {
                self.read_locations.insert(read.id, (tig_id, idx));
            }
        }
    }

    /// Forget which tig a read is in. The read itself is not touched.
    pub fn unregister_read(&mut self, read_id: u32) {
        self.read_locations.remove(&read_id);
    }

    pub fn in_unitig(&self, read_id: u32) -> Option<u32> {
        self.read_locations.get(&read_id).map(|(tig_id, _)| *tig_id)
    }

    pub fn ufpath_idx(&self, read_id: u32) -> Option<usize> {
        self.read_locations.get(&read_id).map(|(_, idx)| *idx)
    }
}

/// A place to cut a tig. `is_begin == true` means reads beginning at or after pos
/// are in the region that follows; `is_begin == false` means reads ending at or
/// before pos are in the region that precedes.
///
/// Ordered by tig, then position, then end-before-begin. Placing an end boundary
/// ahead of a begin boundary at the same position leaves a zero-width free region
/// between them for reads that straddle the cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BreakPoint {
    pub tig_id: u32,
    pub pos: i32,
    pub is_begin: bool,
}

impl BreakPoint {
    pub fn new(tig_id: u32, pos: i32, is_begin: bool) -> Self {
        BreakPoint {
            tig_id,
            pos,
            is_begin,
        }
    }
}

impl fmt::Display for BreakPoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "tig {} pos {} {}",
            self.tig_id,
            self.pos,
            if self.is_begin { 't' } else { 'f' }
        )
    }
}

impl Ord for BreakPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        let tig_cmp = self.tig_id.cmp(&other.tig_id);
        if tig_cmp == Ordering::Equal {
            let pos_cmp = self.pos.cmp(&other.pos);
            if pos_cmp == Ordering::Equal {
                self.is_begin.cmp(&other.is_begin)
            } else {
                pos_cmp
            }
        } else {
            tig_cmp
        }
    }
}

impl PartialOrd for BreakPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pairwise read overlap. Hangs follow the usual dovetail convention: a_hang is
/// where b starts relative to a's start, b_hang where b ends relative to a's end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Overlap {
    pub a_id: u32,
    pub b_id: u32,
    pub a_hang: i32,
    pub b_hang: i32,
    #[serde(default)]
    pub flipped: bool,
    pub erate: f64,
}

impl Overlap {
    /// The same overlap as seen from the b read
    pub fn swapped(&self) -> Self {
        let (a_hang, b_hang) = if self.flipped {
            (self.b_hang, self.a_hang)
        } else {
            (-self.a_hang, -self.b_hang)
        };
        Overlap {
            a_id: self.b_id,
            b_id: self.a_id,
            a_hang,
            b_hang,
            flipped: self.flipped,
            erate: self.erate,
        }
    }
}

/// Candidate alignment of a read against some tig, derived from its overlaps to
/// the reads in that tig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapPlacement {
    pub read_id: u32,
    pub tig_id: u32,

    /// where the read would be placed on the tig
    pub position: SeqInterval,

    /// the part of the placement supported by overlaps; orientation follows the read
    pub verified: SeqInterval,

    /// the part of the read covered by overlaps, in read coordinates (bgn < end)
    pub covered: SeqInterval,

    /// index range of tig reads spanned by the placement, inclusive
    pub tig_first_idx: usize,
    pub tig_last_idx: usize,
}

/// Evidence that one end of a read is ambiguous
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfusedEdge {
    /// read that is confused and needs to be split
    pub a_id: u32,
    /// confused end of that read
    pub a3p: bool,
    /// read causing the confusion
    pub b_id: u32,
}

impl ConfusedEdge {
    pub fn new(a_id: u32, a3p: bool, b_id: u32) -> Self {
        ConfusedEdge { a_id, a3p, b_id }
    }
}

/// Provenance of an output unitig: the contig it was cut from and the window in it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TigLoc {
    pub unitig_id: u32,
    pub contig_id: u32,
    pub bgn: i32,
    pub end: i32,
}

impl fmt::Display for TigLoc {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "unitig {} from contig {} {}-{}",
            self.unitig_id, self.contig_id, self.bgn, self.end
        )
    }
}

/// Thresholds for unitig construction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitigConfig {
    /// shortest verified overlap allowed to split another tig
    pub min_intersect_len: u32,
    /// a read end with more breaks than this is too ambiguous to use
    pub max_placements: u32,
    /// standard deviations allowed above a tig's mean erate
    pub deviation_graph: f64,
    /// evaluate every filter on each placement instead of stopping at the first
    pub evaluate_all_filters: bool,
    pub trim_non_backbone: bool,
}

impl Default for UnitigConfig {
    fn default() -> Self {
        UnitigConfig {
            min_intersect_len: utils::DEFAULT_MIN_INTERSECT_LEN,
            max_placements: utils::DEFAULT_MAX_PLACEMENTS,
            deviation_graph: utils::DEFAULT_DEVIATION_GRAPH,
            evaluate_all_filters: false,
            trim_non_backbone: true,
        }
    }
}

/// Count of breakpoints collected from each source, duplicates included
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BreakpointTally {
    pub sentinel: usize,
    pub confused: usize,
    pub intersection: usize,
}

/// Everything produced by one pass of unitig construction
#[derive(Debug)]
pub struct UnitigResult {
    pub unitigs: TigVector,
    pub sources: Vec<TigLoc>,
    /// (unitig id, read id) for every read removed by backbone trimming
    pub trimmed_reads: Vec<(u32, u32)>,
    /// number of contig ends (value) with a given number of breaks found (index)
    pub placement_histogram: Vec<u32>,
    pub tally: BreakpointTally,
}

/// Fatal conditions in unitig construction. Any of these means the split would
/// be inconsistent, so nothing may be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitigError {
    UnplaceableRead {
        tig_id: u32,
        read_id: u32,
        position: SeqInterval,
        bgn_piece: Option<usize>,
        end_piece: Option<usize>,
    },
    ReadCoverageMismatch {
        tig_id: u32,
        expected: usize,
        found: usize,
    },
}

impl fmt::Display for UnitigError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitigError::UnplaceableRead {
                tig_id,
                read_id,
                position,
                bgn_piece,
                end_piece,
            } => write!(
                formatter,
                "failed to place read {} {} of tig {} in a region, found bgn={:?} and end={:?}",
                read_id, position, tig_id, bgn_piece, end_piece
            ),
            UnitigError::ReadCoverageMismatch {
                tig_id,
                expected,
                found,
            } => write!(
                formatter,
                "contig {} had {} reads but its unitigs hold {}",
                tig_id, expected, found
            ),
        }
    }
}

impl std::error::Error for UnitigError {}

/// Per-read record of the assembly snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadInfo {
    pub id: u32,
    pub length: u32,
    #[serde(default)]
    pub backbone: bool,
}

/// Contig as it appears in the assembly snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContigRecord {
    pub id: u32,
    #[serde(default)]
    pub unassembled: bool,
    #[serde(default)]
    pub repeat: bool,
    pub reads: Vec<ReadPlacement>,
}

/// The full assembly snapshot consumed by unitig construction
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AssemblyLayout {
    #[serde(default)]
    pub reads: Vec<ReadInfo>,
    #[serde(default)]
    pub contigs: Vec<ContigRecord>,
    #[serde(default)]
    pub overlaps: Vec<Overlap>,
    #[serde(default)]
    pub placements: Vec<OverlapPlacement>,
}

/// Output form of a single unitig
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitigRecord {
    pub id: u32,
    pub contig_id: Option<u32>,
    pub length: i32,
    pub repeat: bool,
    pub reads: Vec<ReadPlacement>,
}

/// Top-level result document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitigCalls {
    /// Version of tigsplit used
    pub tigsplit_version: String,
    pub created: String,
    pub unitigs: Vec<UnitigRecord>,
    pub sources: Vec<TigLoc>,
    pub trimmed_reads: Vec<(u32, u32)>,
    pub placement_histogram: Vec<u32>,
    pub tally: BreakpointTally,
}

impl UnitigCalls {
    pub fn new(result: &UnitigResult) -> Self {
        let contig_of: HashMap<u32, u32> = result
            .sources
            .iter()
            .map(|source| (source.unitig_id, source.contig_id))
            .collect();
        let unitigs = result
            .unitigs
            .iter()
            .map(|tig| UnitigRecord {
                id: tig.id,
                contig_id: contig_of.get(&tig.id).copied(),
                length: tig.length,
                repeat: tig.is_repeat,
                reads: tig.ufpath.clone(),
            })
            .collect();
        UnitigCalls {
            tigsplit_version: env!("CARGO_PKG_VERSION").to_string(),
            created: chrono::Local::now().to_rfc3339(),
            unitigs,
            sources: result.sources.clone(),
            trimmed_reads: result.trimmed_reads.clone(),
            placement_histogram: result.placement_histogram.clone(),
            tally: result.tally,
        }
    }
}
