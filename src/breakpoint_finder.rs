use core::fmt;

use log::{debug, trace};

use crate::containers::{
    BreakPoint, OverlapPlacement, ReadPlacement, TigVector, UnitigConfig, Unitig,
};
use crate::evidence::PlacementEvidence;
use crate::utils::REPEAT_FRACTION;

/// Reasons a placement of a tig-end read was rejected as split evidence
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlacementFilters {
    pub to_self: bool,
    pub expected5: bool,
    pub expected3: bool,
    pub too_small: bool,
    pub no_overlaps: bool,
    pub not_similar: bool,
}

impl PlacementFilters {
    pub fn is_disqualified(&self) -> bool {
        self.to_self
            || self.expected5
            || self.expected3
            || self.too_small
            || self.no_overlaps
            || self.not_similar
    }
}

impl fmt::Display for PlacementFilters {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels = [
            (self.to_self, " SELF"),
            (self.expected5, " EXPECTED_5'"),
            (self.expected3, " EXPECTED_3'"),
            (self.too_small, " TOO_SMALL"),
            (self.no_overlaps, " NO_OVERLAPS"),
            (self.not_similar, " NOT_SIMILAR"),
        ];
        for (is_set, label) in labels {
            if is_set {
                write!(formatter, "{}", label)?;
            }
        }
        Ok(())
    }
}

/// Result of scanning the reads spanned by a placement for the read to cut at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorSearch {
    pub anchor: Option<ReadPlacement>,
    /// cut at the low coordinate of the anchor (a begin boundary) rather than the high
    pub is_low: bool,
    pub coord: i32,
    /// mean erate of every overlap found during the scan, 0 if none
    pub erate: f64,
}

/// Breaks found for one tig end. `num_breaks` counts every break that passed the
/// filters, even when all of them were discarded as too ambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EndBreaks {
    pub num_breaks: usize,
    pub breakpoints: Vec<BreakPoint>,
}

/// Decide which side of the invaded tig the invading tig hangs off of.
///
/// The verified interval carries the orientation of the placed read. Combined
/// with the read's orientation in its own tig and which end of that tig it sits
/// on, this tells whether the junction is at the low or high coordinate of the
/// anchor read. Returns (is_low, starting coordinate for the search).
pub fn find_end(placement: &OverlapPlacement, read_is_forward: bool, is_first: bool) -> (bool, i32) {
    let is_low = is_first != (read_is_forward == placement.verified.is_forward());
    if is_low {
        (true, i32::MAX)
    } else {
        (false, i32::MIN)
    }
}

/// Scan the invaded tig's reads inside the placement's index range, keeping only
/// those that have a real overlap to read_a. For a high cut, keep the read with
/// the largest end that still starts before the verified region and ends inside
/// it. For a low cut, keep the read with the smallest start that begins inside
/// the verified region and ends after it. Contained reads never qualify.
pub fn find_anchor<E: PlacementEvidence>(
    placement: &OverlapPlacement,
    read_a: &ReadPlacement,
    tig_b: &Unitig,
    evidence: &E,
    is_first: bool,
) -> AnchorSearch {
    let (is_low, mut coord) = find_end(placement, read_a.position.is_forward(), is_first);
    let verified = placement.verified;
    let overlaps = evidence.overlaps(read_a.id);

    trace!(
        "Scan reads from #{} to #{} for {} coordinate in verified region {}-{}",
        placement.tig_first_idx,
        placement.tig_last_idx,
        if is_low { "low" } else { "high" },
        verified.min(),
        verified.max()
    );

    let mut erate_sum = 0.0;
    let mut erate_count = 0;
    let mut anchor = None;

    let spanned = tig_b
        .ufpath
        .get(placement.tig_first_idx..=placement.tig_last_idx)
        .unwrap_or(&[]);

    for (offset, read_b) in spanned.iter().enumerate() {
        for overlap in overlaps.iter().filter(|o| o.b_id == read_b.id) {
            erate_sum += overlap.erate;
            erate_count += 1;

            let mut note = "";
            if !is_low && read_b.position.max() < verified.max() {
                note = " - CANDIDATE";
                if read_b.position.max() > coord && read_b.position.min() < verified.min() {
                    note = " - CANDIDATE - SAVED";
                    anchor = Some(*read_b);
                    coord = read_b.position.max();
                }
            }
            if is_low && read_b.position.min() > verified.min() {
                note = " - CANDIDATE";
                if read_b.position.min() < coord && read_b.position.max() > verified.max() {
                    note = " - CANDIDATE - SAVED";
                    anchor = Some(*read_b);
                    coord = read_b.position.min();
                }
            }
            trace!(
                "Test read #{:6} ident {:7} {:9}-{:9} against verified region {:9}-{:9} hangs {:7} {:7}{}",
                placement.tig_first_idx + offset,
                read_b.id,
                read_b.position.min(),
                read_b.position.max(),
                verified.min(),
                verified.max(),
                overlap.a_hang,
                overlap.b_hang,
                note
            );
        }
    }

    let erate = if erate_count > 0 {
        erate_sum / erate_count as f64
    } else {
        0.0
    };

    AnchorSearch {
        anchor,
        is_low,
        coord,
        erate,
    }
}

/// Common prefix for every placement decision logged by check_read
fn describe_placement(
    read_a: &ReadPlacement,
    placement_idx: usize,
    placement: &OverlapPlacement,
    tig_b: &Unitig,
) -> String {
    let first_ident = tig_b
        .ufpath
        .get(placement.tig_first_idx)
        .map_or(0, |r| r.id);
    let last_ident = tig_b
        .ufpath
        .get(placement.tig_last_idx)
        .map_or(0, |r| r.id);
    format!(
        "read {:6} place {:3} edgeTo tig {:5} reads #{:5} {:9}-{:9} verified {:9}-{:9} position {:9}-{:9} covered {:7}-{:7}",
        read_a.id,
        placement_idx,
        placement.tig_id,
        placement.tig_first_idx,
        first_ident,
        last_ident,
        placement.verified.bgn,
        placement.verified.end,
        placement.position.bgn,
        placement.position.end,
        placement.covered.bgn,
        placement.covered.end,
    )
}

/// Turn the placements of one tig-end read into breakpoints on the tigs it
/// invades. Placements are dropped when they point at an unassembled tig, at
/// the read's own location, extend past an end of the read already used by its
/// own tig, are shorter than the minimum intersection, have no dovetailing
/// anchor read, or look like repeat noise against the invaded tig's error
/// profile. If more breaks survive than the configured maximum, all of them
/// are discarded.
pub fn check_read<E: PlacementEvidence>(
    tig_a: &Unitig,
    read_a: &ReadPlacement,
    placements: &[OverlapPlacement],
    contigs: &TigVector,
    evidence: &E,
    config: &UnitigConfig,
    is_first: bool,
) -> EndBreaks {
    let short_circuit = !config.evaluate_all_filters;
    let mut breaks = Vec::new();

    for (placement_idx, placement) in placements.iter().enumerate() {
        let tig_b = match contigs.get(placement.tig_id) {
            Some(tig) => tig,
            None => {
                debug!(
                    "read {} placement {} to unknown tig {} ignored",
                    read_a.id, placement_idx, placement.tig_id
                );
                continue;
            }
        };

        if tig_b.is_unassembled {
            continue;
        }

        if placement.tig_first_idx > placement.tig_last_idx
            || placement.tig_last_idx >= tig_b.ufpath.len()
        {
            debug!(
                "read {} placement {} to tig {} spans reads #{}-#{} outside the tig, ignored",
                read_a.id,
                placement_idx,
                placement.tig_id,
                placement.tig_first_idx,
                placement.tig_last_idx
            );
            continue;
        }

        let mut filters = PlacementFilters::default();

        // Overlapping ourself is not a useful edge to split on
        if tig_a.id == tig_b.id && placement.verified.is_overlapping(&read_a.position) {
            filters.to_self = true;
        }

        // The end of the read already used in its own tig must not be part of the
        // placement:
        //           first read                  last read
        //  is5      fwd  ---------->            rev  <---------
        //  is3      rev  <----------            fwd  --------->
        let is5 = is_first == read_a.position.is_forward();
        if is5 && placement.covered.bgn != 0 {
            filters.expected5 = true;
        }
        if !is5 && placement.covered.end != evidence.read_length(read_a.id) as i32 {
            filters.expected3 = true;
        }

        if placement.verified.max() - placement.verified.min() < config.min_intersect_len as i32 {
            filters.too_small = true;
        }

        if short_circuit && filters.is_disqualified() {
            debug!(
                "{}{}",
                describe_placement(read_a, placement_idx, placement, tig_b),
                filters
            );
            continue;
        }

        // A self edge is disqualifying enough; skip the scan rather than add clutter.
        let search = if filters.to_self {
            None
        } else {
            let search = find_anchor(placement, read_a, tig_b, evidence, is_first);
            if search.anchor.is_none() {
                debug!(
                    "Failed to find appropriate intersecting read for read {} placement {}",
                    read_a.id, placement_idx
                );
                filters.no_overlaps = true;
            }
            Some(search)
        };

        if short_circuit && filters.is_disqualified() {
            debug!(
                "{}{}",
                describe_placement(read_a, placement_idx, placement, tig_b),
                filters
            );
            continue;
        }

        // We don't know the erate between the two tigs, so approximate it by the
        // mean erate of read_a's overlaps to the reads it spans here.
        let erate = search.map_or(0.0, |s| s.erate);
        let sim = tig_b.overlap_consistent_with_tig(
            config.deviation_graph,
            placement.verified.min(),
            placement.verified.max(),
            erate,
        );
        if sim < REPEAT_FRACTION {
            filters.not_similar = true;
        }

        if filters.is_disqualified() {
            debug!(
                "{}{}",
                describe_placement(read_a, placement_idx, placement, tig_b),
                filters
            );
            continue;
        }

        if let Some(AnchorSearch {
            anchor: Some(anchor),
            is_low,
            coord,
            ..
        }) = search
        {
            debug!(
                "{} BREAK at pos {:8} read {:6} isLow {} sim {:.4}",
                describe_placement(read_a, placement_idx, placement, tig_b),
                coord,
                anchor.id,
                is_low,
                sim
            );
            breaks.push(BreakPoint::new(placement.tig_id, coord, is_low));
        }
    }

    let num_breaks = breaks.len();
    if num_breaks > config.max_placements as usize {
        debug!(
            "read {} discarding {} breakpoints, more than {} allowed",
            read_a.id, num_breaks, config.max_placements
        );
        breaks.clear();
    } else if num_breaks > 0 {
        debug!(
            "read {} saving {} breakpoints to master list",
            read_a.id, num_breaks
        );
    }

    EndBreaks {
        num_breaks,
        breakpoints: breaks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containers::{ErrorProfileSegment, Overlap, SeqInterval};
    use crate::evidence::ReadStore;
    use crate::utils;

    // Target tig with four forward reads; read ids start at first_read_id
    fn create_test_target_tig(id: u32, first_read_id: u32) -> Unitig {
        utils::create_test_tig(
            id,
            &[
                (first_read_id, 0, 1000),
                (first_read_id + 1, 700, 1800),
                (first_read_id + 2, 1500, 2500),
                (first_read_id + 3, 2200, 3200),
            ],
        )
    }

    // Tig 0 is the invading tig (reads 1, 2); tigs 1..=3 are targets with reads 10.., 20.., 30..
    fn create_test_contigs() -> TigVector {
        TigVector::from_unitigs(vec![
            utils::create_test_tig(0, &[(1, 0, 1000), (2, 800, 2000)]),
            create_test_target_tig(1, 10),
            create_test_target_tig(2, 20),
            create_test_target_tig(3, 30),
        ])
    }

    fn create_test_placement(
        tig_id: u32,
        verified: (i32, i32),
        covered: (i32, i32),
        tig_idx: (usize, usize),
    ) -> OverlapPlacement {
        OverlapPlacement {
            read_id: 1,
            tig_id,
            position: SeqInterval::new(verified.0, verified.1),
            verified: SeqInterval::new(verified.0, verified.1),
            covered: SeqInterval::new(covered.0, covered.1),
            tig_first_idx: tig_idx.0,
            tig_last_idx: tig_idx.1,
        }
    }

    // Read 1 overlaps the middle reads of every target tig
    fn create_test_evidence(erate: f64) -> ReadStore {
        let mut overlaps = Vec::new();
        for base in [10, 20, 30] {
            for offset in 0..4 {
                overlaps.push(utils::create_test_overlap(1, base + offset, erate));
            }
        }
        utils::create_test_store(&[(1, 1000, true), (2, 1200, true)], overlaps, Vec::new())
    }

    fn create_test_config() -> UnitigConfig {
        UnitigConfig {
            min_intersect_len: 500,
            max_placements: 2,
            ..Default::default()
        }
    }

    fn check_first_read(placements: &[OverlapPlacement], contigs: &TigVector, store: &ReadStore, config: &UnitigConfig) -> EndBreaks {
        let tig_a = contigs.get(0).unwrap();
        let read_a = *tig_a.first_read().unwrap();
        check_read(tig_a, &read_a, placements, contigs, store, config, true)
    }

    #[test]
    fn test_find_end_truth_table() {
        let fwd = create_test_placement(1, (1600, 2500), (0, 900), (1, 2));
        let rev = create_test_placement(1, (2500, 1600), (0, 900), (1, 2));

        assert_eq!(find_end(&fwd, true, true), (false, i32::MIN));
        assert_eq!(find_end(&rev, false, true), (false, i32::MIN));
        assert_eq!(find_end(&fwd, false, false), (false, i32::MIN));
        assert_eq!(find_end(&rev, true, false), (false, i32::MIN));

        assert_eq!(find_end(&rev, true, true), (true, i32::MAX));
        assert_eq!(find_end(&fwd, false, true), (true, i32::MAX));
        assert_eq!(find_end(&fwd, true, false), (true, i32::MAX));
        assert_eq!(find_end(&rev, false, false), (true, i32::MAX));
    }

    #[test]
    fn test_find_anchor_high() {
        let contigs = create_test_contigs();
        let store = create_test_evidence(0.01);
        let placement = create_test_placement(1, (1600, 2500), (0, 900), (0, 2));
        let read_a = ReadPlacement::new(1, 0, 1000);
        let search = find_anchor(&placement, &read_a, contigs.get(1).unwrap(), &store, true);

        assert!(!search.is_low);
        assert_eq!(search.anchor.map(|r| r.id), Some(11));
        assert_eq!(search.coord, 1800);
        assert!((search.erate - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_find_anchor_low() {
        let contigs = create_test_contigs();
        let store = create_test_evidence(0.01);
        let placement = create_test_placement(1, (2500, 1600), (0, 900), (2, 3));
        let read_a = ReadPlacement::new(1, 0, 1000);
        let search = find_anchor(&placement, &read_a, contigs.get(1).unwrap(), &store, true);

        assert!(search.is_low);
        // read 12 starts before the verified region, so read 13 is the anchor
        assert_eq!(search.anchor.map(|r| r.id), Some(13));
        assert_eq!(search.coord, 2200);
    }

    #[test]
    fn test_find_anchor_without_overlaps() {
        let contigs = create_test_contigs();
        let store = utils::create_test_store(&[(1, 1000, true)], Vec::new(), Vec::new());
        let placement = create_test_placement(1, (1600, 2500), (0, 900), (1, 2));
        let read_a = ReadPlacement::new(1, 0, 1000);
        let search = find_anchor(&placement, &read_a, contigs.get(1).unwrap(), &store, true);
        assert!(search.anchor.is_none());
        assert_eq!(search.erate, 0.0);
    }

    #[test]
    fn test_check_read_accepts_break() {
        let contigs = create_test_contigs();
        let store = create_test_evidence(0.01);
        let placements = vec![create_test_placement(1, (1600, 2500), (0, 900), (1, 2))];
        let end_breaks = check_first_read(&placements, &contigs, &store, &create_test_config());
        assert_eq!(end_breaks.num_breaks, 1);
        assert_eq!(end_breaks.breakpoints, vec![BreakPoint::new(1, 1800, false)]);
    }

    #[test]
    fn test_check_read_too_small() {
        let contigs = create_test_contigs();
        let store = create_test_evidence(0.01);
        let config = UnitigConfig {
            min_intersect_len: 10,
            ..create_test_config()
        };
        let placements = vec![create_test_placement(1, (1600, 1608), (0, 8), (1, 2))];
        let end_breaks = check_first_read(&placements, &contigs, &store, &config);
        assert_eq!(end_breaks.num_breaks, 0);
        assert!(end_breaks.breakpoints.is_empty());
    }

    #[test]
    fn test_check_read_discards_over_ambiguous_end() {
        let contigs = create_test_contigs();
        let store = create_test_evidence(0.01);
        let placements = vec![
            create_test_placement(1, (1600, 2500), (0, 900), (1, 2)),
            create_test_placement(2, (1600, 2500), (0, 900), (1, 2)),
            create_test_placement(3, (1600, 2500), (0, 900), (1, 2)),
        ];
        let end_breaks = check_first_read(&placements, &contigs, &store, &create_test_config());
        assert_eq!(end_breaks.num_breaks, 3);
        assert!(end_breaks.breakpoints.is_empty());

        let config = UnitigConfig {
            max_placements: 3,
            ..create_test_config()
        };
        let end_breaks = check_first_read(&placements, &contigs, &store, &config);
        assert_eq!(end_breaks.breakpoints.len(), 3);
    }

    #[test]
    fn test_check_read_rejects_self_edge() {
        let contigs = create_test_contigs();
        let store = create_test_evidence(0.01);
        let placements = vec![create_test_placement(0, (0, 900), (0, 900), (0, 1))];
        let end_breaks = check_first_read(&placements, &contigs, &store, &create_test_config());
        assert_eq!(end_breaks.num_breaks, 0);
    }

    #[test]
    fn test_check_read_rejects_used_end() {
        let contigs = create_test_contigs();
        let store = create_test_evidence(0.01);
        // the 5' end of a forward first read is already used by its own tig
        let placements = vec![create_test_placement(1, (1600, 2500), (50, 950), (1, 2))];
        let end_breaks = check_first_read(&placements, &contigs, &store, &create_test_config());
        assert_eq!(end_breaks.num_breaks, 0);

        // for the last read the 3' end must reach the end of the read
        let tig_a = contigs.get(0).unwrap();
        let read_a = *tig_a.last_read().unwrap();
        let placements = vec![create_test_placement(1, (1600, 2500), (0, 1100), (1, 2))];
        let end_breaks = check_read(tig_a, &read_a, &placements, &contigs, &store, &create_test_config(), false);
        assert_eq!(end_breaks.num_breaks, 0);
    }

    #[test]
    fn test_check_read_ignores_unassembled_and_unknown_tigs() {
        let mut tigs: Vec<Unitig> = create_test_contigs().iter().cloned().collect();
        tigs[1].is_unassembled = true;
        let contigs = TigVector::from_unitigs(tigs);
        let store = create_test_evidence(0.01);
        let placements = vec![
            create_test_placement(1, (1600, 2500), (0, 900), (1, 2)),
            create_test_placement(9, (1600, 2500), (0, 900), (1, 2)),
            create_test_placement(2, (1600, 2500), (0, 900), (2, 7)),
        ];
        let end_breaks = check_first_read(&placements, &contigs, &store, &create_test_config());
        assert_eq!(end_breaks.num_breaks, 0);
    }

    #[test]
    fn test_check_read_without_anchor() {
        let contigs = create_test_contigs();
        let store = utils::create_test_store(&[(1, 1000, true)], Vec::new(), Vec::new());
        let placements = vec![create_test_placement(1, (1600, 2500), (0, 900), (1, 2))];
        let end_breaks = check_first_read(&placements, &contigs, &store, &create_test_config());
        assert_eq!(end_breaks.num_breaks, 0);
    }

    #[test]
    fn test_check_read_rejects_repeat_noise() {
        let mut tigs: Vec<Unitig> = create_test_contigs().iter().cloned().collect();
        tigs[1].error_profile = vec![ErrorProfileSegment {
            bgn: 0,
            end: 3200,
            mean: 0.001,
            stddev: 0.0,
        }];
        let contigs = TigVector::from_unitigs(tigs);
        let store = create_test_evidence(0.05);
        let placements = vec![create_test_placement(1, (1600, 2500), (0, 900), (1, 2))];
        let end_breaks = check_first_read(&placements, &contigs, &store, &create_test_config());
        assert_eq!(end_breaks.num_breaks, 0);
    }

    #[test]
    fn test_evaluate_all_filters_keeps_same_breaks() {
        let contigs = create_test_contigs();
        let store = create_test_evidence(0.01);
        let placements = vec![
            create_test_placement(1, (1600, 2500), (0, 900), (1, 2)),
            // both too small and on the used end
            create_test_placement(2, (1600, 1700), (30, 130), (1, 2)),
            create_test_placement(0, (0, 900), (0, 900), (0, 1)),
        ];
        let short = check_first_read(&placements, &contigs, &store, &create_test_config());
        let config = UnitigConfig {
            evaluate_all_filters: true,
            ..create_test_config()
        };
        let full = check_first_read(&placements, &contigs, &store, &config);
        assert_eq!(short, full);
        assert_eq!(full.breakpoints, vec![BreakPoint::new(1, 1800, false)]);
    }

    #[test]
    fn test_placement_filters_display() {
        let filters = PlacementFilters {
            to_self: true,
            too_small: true,
            ..Default::default()
        };
        assert!(filters.is_disqualified());
        assert_eq!(filters.to_string(), " SELF TOO_SMALL");
        assert!(!PlacementFilters::default().is_disqualified());
    }

    #[test]
    fn test_overlap_to_other_read_is_not_an_anchor() {
        let contigs = create_test_contigs();
        let store = utils::create_test_store(
            &[(1, 1000, true)],
            vec![Overlap {
                a_id: 2,
                b_id: 11,
                a_hang: 10,
                b_hang: 10,
                flipped: false,
                erate: 0.01,
            }],
            Vec::new(),
        );
        let placements = vec![create_test_placement(1, (1600, 2500), (0, 900), (1, 2))];
        let end_breaks = check_first_read(&placements, &contigs, &store, &create_test_config());
        assert_eq!(end_breaks.num_breaks, 0);
    }
}
